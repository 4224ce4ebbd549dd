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

//! A1: fixed-record address-to-bitmap index. One record per block.

use std::path::Path;

use crate::error::{BuildError, GeometryError};
use crate::writer::{BlockFormat, BlockWriter, ClosedDb};

/// Every record has identical length, so the block size is the record
/// length and header/footer are both empty. `end_tx` (not `start_tx`)
/// captures the address, so the manifest records the last address placed
/// in each block; close emits one trailing all-zero sentinel block.
pub struct AutoDelimitedFormat;

impl BlockFormat for AutoDelimitedFormat {
    fn header_len(&self) -> usize { 0 }

    fn start_tx_sets_addr(&self) -> bool { false }

    fn write_header(&mut self, _remaining: u32, _cur_addr: &[u8], _block_size: u64) -> Vec<u8> { Vec::new() }

    fn on_end_tx(&mut self, address: &[u8]) -> Option<Vec<u8>> { Some(address.to_vec()) }

    fn closing_remaining(&self) -> Option<u32> { Some(0) }
}

pub struct AutoDelimitedDb;

impl AutoDelimitedDb {
    /// Builds the database from `(address, record)` pairs already in their
    /// final iteration order. `record_len` is the fixed width every record
    /// must have; the caller supplies it (it is derivable from the address
    /// and bitmap lengths alone) rather than it being inferred from the
    /// first record, so a build with zero addresses — e.g. every address in
    /// this run landed on the skip-list — still produces a valid, empty
    /// index instead of failing to determine a record length.
    pub fn build(
        out_dir: &Path,
        prefix: &str,
        record_len: usize,
        records: &[(Vec<u8>, Vec<u8>)],
    ) -> Result<ClosedDb, BuildError> {
        if record_len == 0 {
            return Err(GeometryError::ZeroAddressLength(0).into());
        }
        for (_, data) in records {
            if data.len() != record_len {
                return Err(GeometryError::BlockTooSmall { block_size: data.len(), minimum: record_len }.into());
            }
        }

        let mut writer = BlockWriter::open(AutoDelimitedFormat, out_dir, prefix, record_len as u64)?;
        for (address, data) in records {
            writer.start_tx(address)?;
            writer.write(data)?;
            writer.end_tx(address)?;
        }
        Ok(writer.close()?)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn one_record_per_block_plus_trailing_sentinel() {
        let dir = tempdir().unwrap();
        let records = vec![(b"addr-a".to_vec(), vec![0x01u8, 0x02]), (b"addr-b".to_vec(), vec![0x03u8, 0x04])];
        let closed = AutoDelimitedDb::build(dir.path(), "a1", 2, &records).unwrap();
        assert_eq!(closed.block_count, 3);
        let data = std::fs::read(&closed.data_path).unwrap();
        assert_eq!(data.len() as u64, closed.block_count * closed.block_size);
        assert_eq!(&data[4..], &[0u8, 0u8]);
    }

    #[test]
    fn mismatched_record_lengths_are_rejected() {
        let dir = tempdir().unwrap();
        let records = vec![(b"a".to_vec(), vec![1u8]), (b"b".to_vec(), vec![1u8, 2u8])];
        assert!(AutoDelimitedDb::build(dir.path(), "a1", 1, &records).is_err());
    }

    #[test]
    fn zero_records_still_closes_with_a_single_sentinel_block() {
        let dir = tempdir().unwrap();
        let closed = AutoDelimitedDb::build(dir.path(), "a1", 2, &[]).unwrap();
        assert_eq!(closed.block_count, 1);
        let data = std::fs::read(&closed.data_path).unwrap();
        assert_eq!(data.len() as u64, closed.block_count * closed.block_size);
        assert!(data.iter().all(|&b| b == 0));
    }
}
