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

//! The block-packing engine shared by all three on-disk formats.
//!
//! A format is a small stateless-ish descriptor (see [`BlockFormat`]); the
//! engine owns the file handles, the cursor bookkeeping and the manifest.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Per-format hooks the [`BlockWriter`] engine calls at block edges.
///
/// `header_len`/`footer_len` are the nominal sizes used to size the opening
/// header and to compute `safe_len`; the bytes a format actually emits from
/// `write_header`/`write_footer` may exceed the nominal header length (the
/// A2 format inlines the in-flight address when no record boundary falls
/// within a block) — the engine tracks cursor advancement from the real
/// returned length, not the nominal one.
pub trait BlockFormat {
    fn header_len(&self) -> usize;

    fn footer_len(&self) -> usize { 0 }

    /// Whether `start_tx` should capture `address` into `cur_addr`.
    /// AutoDelimitedDB and TransactionDB both decline: the former captures
    /// the address on `end_tx` instead (so the manifest records the last
    /// address placed in each block), and the latter has no single
    /// per-block address in flight at all.
    fn start_tx_sets_addr(&self) -> bool { true }

    fn write_header(&mut self, remaining: u32, cur_addr: &[u8], block_size: u64) -> Vec<u8>;

    fn write_footer(&mut self, remaining: u32) -> Vec<u8> {
        let _ = remaining;
        Vec::new()
    }

    /// Called on `end_tx`; returning `Some` updates `cur_addr`.
    fn on_end_tx(&mut self, address: &[u8]) -> Option<Vec<u8>> {
        let _ = address;
        None
    }

    /// When `Some(r)`, `close` invokes `new_block(r)` as a final step
    /// (AutoDelimitedDB's trailing sentinel block of zeros). When `None`,
    /// `close` instead appends the final manifest line directly and counts
    /// the still-open block as complete, without writing a phantom header.
    fn closing_remaining(&self) -> Option<u32> { None }
}

/// A database that has been closed: its final, renamed paths and geometry.
#[derive(Clone, Debug)]
pub struct ClosedDb {
    pub data_path: PathBuf,
    pub manifest_path: PathBuf,
    pub block_count: u64,
    pub block_size: u64,
}

/// The block-packing engine. Generic over the concrete on-disk format.
pub struct BlockWriter<F: BlockFormat> {
    format: F,
    data: BufWriter<File>,
    manifest: BufWriter<File>,
    data_path: PathBuf,
    manifest_path: PathBuf,
    out_dir: PathBuf,
    prefix: String,

    block_size: u64,
    cur_distance: u64,
    cur_block: u64,
    blocks: u64,
    total_size: u64,
    cur_addr: Vec<u8>,
    blocks_used: BTreeSet<u64>,
    any_written: bool,
}

impl<F: BlockFormat> BlockWriter<F> {
    /// Opens a new database under `out_dir` named `<prefix>_<block_size>.pir`,
    /// writing a zero-filled opening header and the first (empty) manifest
    /// line.
    pub fn open(format: F, out_dir: &std::path::Path, prefix: &str, block_size: u64) -> io::Result<Self> {
        let data_path = out_dir.join(format!("{prefix}_{block_size}.pir"));
        let manifest_path = out_dir.join(format!("{prefix}_{block_size}.pir.manifest"));

        let mut data = BufWriter::new(File::create(&data_path)?);
        let manifest = BufWriter::new(File::create(&manifest_path)?);

        let header_len = format.header_len();
        data.write_all(&vec![0u8; header_len])?;

        let mut writer = BlockWriter {
            format,
            data,
            manifest,
            data_path,
            manifest_path,
            out_dir: out_dir.to_path_buf(),
            prefix: prefix.to_string(),
            block_size,
            cur_distance: header_len as u64,
            cur_block: 0,
            blocks: 0,
            total_size: header_len as u64,
            cur_addr: Vec::new(),
            blocks_used: BTreeSet::new(),
            any_written: false,
        };
        writer.push_manifest_line()?;
        Ok(writer)
    }

    pub fn block_size(&self) -> u64 { self.block_size }

    pub fn blocks_used(&self) -> &BTreeSet<u64> { &self.blocks_used }

    fn safe_len(&self) -> u64 {
        self.block_size - self.cur_distance - self.format.footer_len() as u64
    }

    fn push_manifest_line(&mut self) -> io::Result<()> {
        self.manifest.write_all(&self.cur_addr)?;
        self.manifest.write_all(b"\n")?;
        Ok(())
    }

    fn write_zeros(&mut self, len: u64) -> io::Result<()> {
        if len == 0 {
            return Ok(());
        }
        let zeros = vec![0u8; len as usize];
        self.data.write_all(&zeros)?;
        self.cur_distance += len;
        self.total_size += len;
        Ok(())
    }

    fn safe_write(&mut self, bytes: &[u8]) -> io::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.data.write_all(bytes)?;
        self.cur_distance += bytes.len() as u64;
        self.total_size += bytes.len() as u64;
        Ok(())
    }

    /// Closes out the current block and opens the next one.
    fn new_block(&mut self, remaining: u32) -> io::Result<()> {
        let footer = self.format.write_footer(remaining);
        self.data.write_all(&footer)?;
        self.total_size += footer.len() as u64;

        self.push_manifest_line()?;

        self.cur_block += 1;
        self.blocks += 1;
        self.cur_distance = 0;

        let header = self.format.write_header(remaining, &self.cur_addr, self.block_size);
        self.data.write_all(&header)?;
        self.cur_distance += header.len() as u64;
        self.total_size += header.len() as u64;

        Ok(())
    }

    /// Records the address of the entry about to be written.
    pub fn start_tx(&mut self, address: &[u8]) -> io::Result<()> {
        if self.format.start_tx_sets_addr() {
            self.cur_addr = address.to_vec();
        }
        if self.safe_len() < self.format.header_len() as u64 {
            let pad = self.safe_len();
            self.write_zeros(pad)?;
            self.new_block(0)?;
        }
        self.blocks_used.clear();
        Ok(())
    }

    /// Writes `data` to the logical payload stream, spanning blocks as
    /// needed. Every block touched is recorded in `blocks_used`.
    pub fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.any_written = true;
        if self.safe_len() == 0 {
            self.new_block(data.len() as u32)?;
        }
        let mut written = 0usize;
        let mut len = data.len();
        loop {
            let pivot = self.safe_len() as usize;
            if len <= pivot {
                self.safe_write(&data[written..written + len])?;
                self.blocks_used.insert(self.cur_block);
                return Ok(());
            }
            self.safe_write(&data[written..written + pivot])?;
            self.blocks_used.insert(self.cur_block);
            written += pivot;
            len -= pivot;
            self.new_block(len as u32)?;
        }
    }

    /// Marks the end of the in-flight entry.
    pub fn end_tx(&mut self, address: &[u8]) -> io::Result<()> {
        if let Some(addr) = self.format.on_end_tx(address) {
            self.cur_addr = addr;
        }
        Ok(())
    }

    /// Pads the final block, writes the closing footer, appends the final
    /// manifest line and renames both files to their final, block-count
    /// bearing names.
    pub fn close(mut self) -> io::Result<ClosedDb> {
        // AutoDelimitedDB opens one further, trailing block of zeros before
        // the generic finalization step below closes it like any other. Only
        // when something was actually written: with zero records, the opening
        // block was never touched, and the generic finalization step alone
        // already produces the single all-zero block a record-less index
        // needs, without a further phantom "just closed the last record"
        // transition.
        if self.any_written {
            if let Some(remaining) = self.format.closing_remaining() {
                let pad = self.safe_len();
                self.write_zeros(pad)?;
                self.new_block(remaining)?;
            }
        }

        let pad = self.safe_len();
        self.write_zeros(pad)?;
        let footer = self.format.write_footer(0);
        self.data.write_all(&footer)?;
        self.total_size += footer.len() as u64;
        self.blocks += 1;
        self.push_manifest_line()?;

        self.data.flush()?;
        self.manifest.flush()?;
        drop(self.data);
        drop(self.manifest);

        let final_data = self.out_dir.join(format!("{}_{}_{}.pir", self.prefix, self.blocks, self.block_size));
        let final_manifest = self.out_dir.join(format!(
            "{}_{}_{}.pir.manifest",
            self.prefix, self.blocks, self.block_size
        ));
        fs::rename(&self.data_path, &final_data)?;
        fs::rename(&self.manifest_path, &final_manifest)?;

        Ok(ClosedDb { data_path: final_data, manifest_path: final_manifest, block_count: self.blocks, block_size: self.block_size })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    struct FixedFormat;

    impl BlockFormat for FixedFormat {
        fn header_len(&self) -> usize { 0 }

        fn write_header(&mut self, _remaining: u32, _cur_addr: &[u8], _block_size: u64) -> Vec<u8> { Vec::new() }
    }

    #[test]
    fn single_record_per_block_closes_with_one_sentinel_and_right_manifest_len() {
        let dir = tempdir().unwrap();
        let mut writer = BlockWriter::open(FixedFormat, dir.path(), "t", 5).unwrap();
        writer.start_tx(b"addr").unwrap();
        writer.write(b"hello").unwrap();
        writer.end_tx(b"addr").unwrap();
        let closed = writer.close().unwrap();

        assert_eq!(closed.block_count, 1);
        let data = fs::read(&closed.data_path).unwrap();
        assert_eq!(data.len() as u64, closed.block_count * closed.block_size);

        let manifest = fs::read_to_string(&closed.manifest_path).unwrap();
        assert_eq!(manifest.lines().count() as u64, closed.block_count + 1);
    }

    struct TDbFormat;

    impl BlockFormat for TDbFormat {
        fn header_len(&self) -> usize { 4 }

        fn start_tx_sets_addr(&self) -> bool { false }

        fn write_header(&mut self, remaining: u32, _cur_addr: &[u8], _block_size: u64) -> Vec<u8> {
            remaining.to_le_bytes().to_vec()
        }
    }

    #[test]
    fn multi_block_write_tracks_blocks_used_and_manifest_len() {
        let dir = tempdir().unwrap();
        let mut writer = BlockWriter::open(TDbFormat, dir.path(), "tx", 10).unwrap();
        writer.start_tx(b"ignored").unwrap();
        writer.write(&[7u8; 21]).unwrap();
        writer.end_tx(b"ignored").unwrap();
        assert!(writer.blocks_used().len() >= 2);
        let closed = writer.close().unwrap();

        let data = fs::read(&closed.data_path).unwrap();
        assert_eq!(data.len() as u64, closed.block_count * closed.block_size);

        let manifest = fs::read_to_string(&closed.manifest_path).unwrap();
        assert_eq!(manifest.lines().count() as u64, closed.block_count + 1);
        // T-DB never sets cur_addr, so every manifest line is blank.
        assert!(manifest.lines().all(|line| line.is_empty()));
    }
}
