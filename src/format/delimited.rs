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

//! A2: variable-width address-to-block-list index. Entries may span blocks.

use std::path::Path;

use crate::error::BuildError;
use crate::geometry::delimited_block_size;
use crate::writer::{BlockFormat, BlockWriter, ClosedDb};

/// Each block opens with a 4-byte `remaining` count. When the record
/// currently in flight won't reach a boundary within this block, the
/// in-flight address is inlined right after the header so a client landing
/// mid-record can still identify its owner.
pub struct DelimitedFormat {
    address_len: usize,
}

impl DelimitedFormat {
    pub fn new(address_len: usize) -> Self { Self { address_len } }
}

impl BlockFormat for DelimitedFormat {
    fn header_len(&self) -> usize { 4 }

    fn write_header(&mut self, remaining: u32, cur_addr: &[u8], block_size: u64) -> Vec<u8> {
        let mut buf = remaining.to_le_bytes().to_vec();
        // Unsigned subtraction, wrapping on purpose: when the block is too
        // small to ever hold header + address, this wraps to a huge value so
        // the branch below never triggers, instead of inlining an address
        // into a block with no room for it.
        let threshold = block_size.wrapping_sub(4 + self.address_len as u64);
        if remaining as u64 > threshold {
            buf.extend_from_slice(cur_addr);
        }
        buf
    }
}

pub struct DelimitedDb;

impl DelimitedDb {
    /// Builds the database from `(address, record)` pairs, where `record`
    /// already has the address serialized at its front. The block size is
    /// derived from the total byte length of all records and is not
    /// rejected for being smaller than header + address: a database whose
    /// records are small enough to push the computed block size below that
    /// threshold still builds, one byte of payload per block, matching the
    /// behaviour of the original indexer (its inline-address condition is
    /// unsigned and simply never trips in that regime).
    pub fn build(
        out_dir: &Path,
        prefix: &str,
        address_len: usize,
        records: &[(Vec<u8>, Vec<u8>)],
    ) -> Result<ClosedDb, BuildError> {
        let total_bytes: u64 = records.iter().map(|(_, data)| data.len() as u64).sum();
        let block_size = delimited_block_size(total_bytes);

        let mut writer = BlockWriter::open(DelimitedFormat::new(address_len), out_dir, prefix, block_size)?;
        for (address, data) in records {
            writer.start_tx(address)?;
            writer.write(data)?;
            writer.end_tx(address)?;
        }
        Ok(writer.close()?)
    }
}
