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

//! Error hierarchy for the PIR database builder.

use std::io;

use crate::address::ShortAddress;

/// Errors arising from malformed build input (the transaction file).
#[derive(Debug, Display, Error)]
#[display(doc_comments)]
pub enum InputError {
    /// unable to parse address count on line {0}
    AddressCount(usize),

    /// address {index} on line {line} has length {found}, expected {expected}
    AddressLength { line: usize, index: usize, found: usize, expected: usize },

    /// duplicate address within a single transaction's address set at line {0}
    DuplicateAddress(usize),

    /// unable to parse transaction length on line {0}
    TxLength(usize),

    /// transaction body at line {0} is truncated: expected {expected} bytes, found {found}
    TruncatedTx { line: usize, expected: usize, found: usize },

    /// trailing garbage found after transaction body at line {0}
    TrailingGarbage(usize),

    /// address length changed from {first} to {second} after the first transaction
    AddressLengthMismatch { first: usize, second: usize },

    /// input file ended unexpectedly while {0} was expected
    UnexpectedEof(&'static str),

    /// short-form address {0} is shared by two distinct long addresses
    ShortFormCollision(ShortAddress),
}

/// Errors arising from invalid block or database geometry.
#[derive(Debug, Display, Error)]
#[display(doc_comments)]
pub enum GeometryError {
    /// block size {block_size} is too small to hold a single record (minimum {minimum})
    BlockTooSmall { block_size: usize, minimum: usize },

    /// computed block count is zero for a non-empty database
    ZeroBlocks,

    /// address length {0} is zero, which cannot produce a valid index
    ZeroAddressLength(usize),
}

/// Top-level error returned by any build step.
#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum BuildError {
    /// invalid input: {0}
    #[from]
    Input(InputError),

    /// invalid geometry: {0}
    #[from]
    Geometry(GeometryError),

    /// I/O error: {0}
    #[from]
    Io(io::Error),
}
