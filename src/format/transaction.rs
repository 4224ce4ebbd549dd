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

//! T-DB: the main, length-prefixed transaction database.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::BuildError;
use crate::writer::{BlockFormat, BlockWriter};

/// The length-prefix header doubles as the next block's "remaining" footer;
/// a transaction has no single address in flight, so the manifest never
/// records one.
pub struct TransactionFormat;

impl BlockFormat for TransactionFormat {
    fn header_len(&self) -> usize { 4 }

    fn start_tx_sets_addr(&self) -> bool { false }

    fn write_header(&mut self, remaining: u32, _cur_addr: &[u8], _block_size: u64) -> Vec<u8> {
        remaining.to_le_bytes().to_vec()
    }
}

/// The T-DB, built in a single pass over the caller's transactions.
pub struct TransactionDb {
    writer: BlockWriter<TransactionFormat>,
}

impl TransactionDb {
    pub fn open(out_dir: &Path, prefix: &str, block_size: u64) -> Result<Self, BuildError> {
        let writer = BlockWriter::open(TransactionFormat, out_dir, prefix, block_size)?;
        Ok(Self { writer })
    }

    /// Feeds every transaction in insertion order, returning a map from each
    /// transaction's ordinal position to the set of block indices its bytes
    /// touched.
    pub fn build_with_position_map(
        mut self,
        transactions: &[Vec<u8>],
    ) -> Result<(crate::writer::ClosedDb, BTreeMap<u64, Vec<u64>>), BuildError> {
        let mut position_map = BTreeMap::new();
        for (pos, tx) in transactions.iter().enumerate() {
            self.writer.start_tx(tx)?;
            let len = tx.len() as u32;
            self.writer.write(&len.to_le_bytes())?;
            self.writer.write(tx)?;
            self.writer.end_tx(tx)?;
            position_map.insert(pos as u64, self.writer.blocks_used().iter().copied().collect());
        }
        let closed = self.writer.close()?;
        Ok((closed, position_map))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn empty_transaction_is_a_bare_length_prefix() {
        let dir = tempdir().unwrap();
        let db = TransactionDb::open(dir.path(), "t", 32).unwrap();
        let (closed, position_map) = db.build_with_position_map(&[Vec::new()]).unwrap();
        assert_eq!(position_map.len(), 1);
        assert!(!position_map[&0].is_empty());
        let data = std::fs::read(&closed.data_path).unwrap();
        assert_eq!(data.len() as u64, closed.block_count * closed.block_size);
    }

    #[test]
    fn long_transaction_spans_multiple_blocks() {
        let dir = tempdir().unwrap();
        let db = TransactionDb::open(dir.path(), "t", 16).unwrap();
        let tx = vec![42u8; 3 * 16];
        let (closed, position_map) = db.build_with_position_map(&[tx]).unwrap();
        assert!(position_map[&0].len() >= 3);
        assert_eq!(closed.block_count, position_map[&0].len() as u64);
    }
}
