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

//! Final configuration resulting from command-line options, used to drive
//! one [`crate::processor::Processor`] run.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use amplify::ByteArray;

use crate::address::{Address, ShortAddress, ADDR_LEN};
use crate::error::BuildError;

/// Final configuration for a single build, assembled from the CLI's `Opts`.
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory the three output files and the stats/manifest files land
    /// in.
    pub out_dir: PathBuf,

    /// Filename prefix for the T-DB and the two stats/manifest files; A1
    /// and A2 use the fixed `addr_db.fmt1`/`addr_db.fmt2` stems regardless
    /// of this prefix.
    pub prefix: String,

    /// Explicit T-DB block size override; `None` uses the √N heuristic.
    pub block_size: Option<u64>,

    /// Addresses excluded from A1/A2/the address listing regardless of
    /// their block-set size, on top of the dynamic high-traffic heuristic
    /// `Processor` applies unconditionally.
    pub skip_list: BTreeSet<ShortAddress>,
}

impl Config {
    pub fn new(out_dir: PathBuf, prefix: String) -> Self {
        Self { out_dir, prefix, block_size: None, skip_list: BTreeSet::new() }
    }

    pub fn with_block_size(mut self, block_size: Option<u64>) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_skip_list(mut self, skip_list: BTreeSet<ShortAddress>) -> Self {
        self.skip_list = skip_list;
        self
    }
}

/// Reads a newline-delimited skip-list file: one hex-encoded, 35-byte
/// address per line (the same lowercase-hex encoding [`Address`]'s
/// `Display` impl produces), blank lines ignored.
pub fn read_skip_list(path: &Path) -> Result<BTreeSet<ShortAddress>, BuildError> {
    let text = fs::read_to_string(path)?;
    let mut skip_list = BTreeSet::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        skip_list.insert(parse_hex_address(line)?.to_short());
    }
    Ok(skip_list)
}

/// Parses a lowercase- or uppercase-hex-encoded [`Address`].
pub fn parse_hex_address(hex: &str) -> Result<Address, BuildError> {
    if hex.len() != ADDR_LEN * 2 {
        return Err(crate::error::InputError::AddressLength {
            line: 0,
            index: 0,
            found: hex.len() / 2,
            expected: ADDR_LEN,
        }
        .into());
    }
    let mut bytes = [0u8; ADDR_LEN];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .map_err(|_| crate::error::InputError::UnexpectedEof("a hex-encoded skip-list address"))?;
    }
    Ok(Address::from_byte_array(bytes))
}
