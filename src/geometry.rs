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

//! Block geometry computation.
//!
//! Both formulas below are load-bearing: they fix the on-disk block size
//! and must reproduce bit-exactly across platforms, so integer floor-sqrt
//! is used throughout rather than floating point.

use crate::error::GeometryError;

/// Computed framing geometry for a block-structured database.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct BlockGeometry {
    pub block_size: u64,
    pub block_count: u64,
}

/// Integer floor of the square root of `n`, via Newton's method.
pub fn isqrt(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

/// Derives the T-DB geometry from the total transaction byte length.
///
/// When `explicit_block_size` is `None`, the block count is the floor-sqrt
/// of the bit length of the payload; the block size is then derived from
/// the post-inflation database size so that `block_count * block_size`
/// exactly covers payload plus one 4-byte header per block. When an
/// explicit block size is given, the block count is derived from it
/// instead, using the pre-inflation payload size.
pub fn t_db_geometry(
    byte_position: u64,
    explicit_block_size: Option<u64>,
) -> Result<BlockGeometry, GeometryError> {
    let db_size_bit = 8 * byte_position;

    let (block_size, block_count) = match explicit_block_size {
        None => {
            let pir_blocks = isqrt(db_size_bit);
            if pir_blocks == 0 {
                return Err(GeometryError::ZeroBlocks);
            }
            let db_size = byte_position + 4 * pir_blocks;
            (db_size / pir_blocks, pir_blocks)
        }
        Some(block_size) => {
            if block_size <= 4 {
                return Err(GeometryError::BlockTooSmall { block_size: block_size as usize, minimum: 5 });
            }
            let pir_blocks = byte_position / (block_size - 4) + 1;
            (block_size, pir_blocks)
        }
    };

    if block_size <= 4 {
        return Err(GeometryError::BlockTooSmall { block_size: block_size as usize, minimum: 5 });
    }
    if block_count == 0 {
        return Err(GeometryError::ZeroBlocks);
    }

    Ok(BlockGeometry { block_size, block_count })
}

/// Derives the DelimitedDB (A2) block size from the total byte length of
/// its serialized address records: `16 + floor(sqrt(8N + 256))` bits,
/// truncated to bytes.
pub fn delimited_block_size(total_record_bytes: u64) -> u64 {
    let db_size_bit = 8 * total_record_bytes;
    let pir_blocksize_bit = 16 + isqrt(db_size_bit + 256);
    pir_blocksize_bit / 8
}
