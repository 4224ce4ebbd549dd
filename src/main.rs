// BP Node: sovereign bitcoin wallet backend.
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2020-2025 by
//     Dr Maxim Orlovsky <orlovsky@lnp-bp.org>
//
// Copyright (C) 2020-2024 LNP/BP Standards Association. All rights reserved.
// Copyright (C) 2025 LNP/BP Labs, InDCS, Switzerland. All rights reserved.
// Copyright (C) 2020-2025 Dr Maxim Orlovsky. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Main executable: `build_pir_databases <tx_file> <output_directory>
//! <output_file_prefix>`.

#[macro_use]
extern crate log;

use std::path::PathBuf;
use std::process::ExitCode;

use bppir::config::read_skip_list;
use bppir::{Config, Processor};
use clap::Parser;

/// Builds the PIR transaction database and its two address indices from a
/// transaction file.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "builds the PIR transaction and address-index databases")]
struct Opts {
    /// Input transaction file, in the format described by the reader module.
    tx_file: PathBuf,

    /// Directory the output files are written into.
    output_directory: PathBuf,

    /// Filename prefix for the T-DB and the stats/manifest files.
    output_file_prefix: String,

    /// Increases logging verbosity; repeatable up to `-vvvv`.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Explicit T-DB block size override, in bytes. Defaults to the √N
    /// heuristic described in spec.md §4.5.
    #[arg(short = 'b', long)]
    block_size: Option<u64>,

    /// Newline-delimited, hex-encoded address file overriding the built-in
    /// (empty) static skip-list.
    #[arg(long)]
    skip_list: Option<PathBuf>,
}

fn init_logging(verbose: u8) {
    if std::env::var("RUST_LOG").is_err() {
        let level = match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        // SAFETY: single-threaded at this point, before any logger or other
        // thread that might read the environment concurrently has started.
        unsafe {
            std::env::set_var("RUST_LOG", level);
        }
    }
    env_logger::init();
}

fn run(opts: Opts) -> Result<(), bppir::BuildError> {
    let skip_list = match &opts.skip_list {
        Some(path) => read_skip_list(path)?,
        None => Default::default(),
    };

    let config = Config::new(opts.output_directory.clone(), opts.output_file_prefix.clone())
        .with_block_size(opts.block_size)
        .with_skip_list(skip_list);

    info!("Reading transactions from {}", opts.tx_file.display());
    let entries = bppir::reader::read_transactions(&opts.tx_file)?;
    info!("Read {} transactions", entries.len());

    let mut processor = Processor::new(config);
    for entry in entries {
        processor.add_tx(&entry.addresses, entry.bytes)?;
    }

    let output = processor.build()?;
    info!("T-DB written to {}", output.tx_db.data_path.display());
    info!("A1 written to {}", output.a1.data_path.display());
    info!("A2 written to {}", output.a2.data_path.display());
    Ok(())
}

fn main() -> ExitCode {
    let opts = Opts::parse();
    init_logging(opts.verbose);
    trace!("Command-line arguments: {opts:?}");

    match run(opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("build_pir_databases: build failed: {err}");
            ExitCode::FAILURE
        }
    }
}
