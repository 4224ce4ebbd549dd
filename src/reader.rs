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

//! The transaction-file reader: the external collaborator described by the
//! build, not part of the core framing engine.
//!
//! The file is a sequence of records: a decimal address count, that many
//! fixed-width addresses, a decimal transaction length, and that many raw
//! transaction bytes. Counts and addresses are whitespace-delimited ASCII
//! tokens, mirroring the original `ifstream >>` tokenizer; only the
//! transaction body is read as a raw byte span, since it is not guaranteed
//! to avoid whitespace bytes.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use amplify::ByteArray;

use crate::address::{Address, ADDR_LEN};
use crate::error::{BuildError, InputError};

/// One parsed `(address_set, transaction_bytes)` entry from the input file.
pub struct InputTx {
    pub addresses: Vec<Address>,
    pub bytes: Vec<u8>,
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    record: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self { Self { data, pos: 0, record: 0 } }

    fn is_whitespace(b: u8) -> bool { b == b' ' || b == b'\t' || b == b'\r' || b == b'\n' }

    fn skip_whitespace(&mut self) {
        while self.pos < self.data.len() && Self::is_whitespace(self.data[self.pos]) {
            self.pos += 1;
        }
    }

    fn at_eof(&self) -> bool { self.pos >= self.data.len() }

    /// Reads one decimal token, delimited by the surrounding whitespace the
    /// original `ifstream >>` operator would have skipped.
    fn read_decimal(&mut self) -> Option<usize> {
        self.skip_whitespace();
        let start = self.pos;
        while self.pos < self.data.len() && self.data[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        std::str::from_utf8(&self.data[start..self.pos]).ok()?.parse().ok()
    }

    fn read_exact(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.pos + len > self.data.len() {
            return None;
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Some(slice)
    }

    /// Reads one whitespace-delimited token, mirroring the original
    /// `ifstream >>` tokenizer used for each address in the set.
    fn read_token(&mut self) -> Option<&'a [u8]> {
        self.skip_whitespace();
        let start = self.pos;
        while self.pos < self.data.len() && !Self::is_whitespace(self.data[self.pos]) {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        Some(&self.data[start..self.pos])
    }

    /// Consumes exactly one newline, if present, reporting trailing garbage
    /// otherwise. Tolerates EOF in place of the final newline.
    fn expect_newline_or_eof(&mut self) -> Result<(), InputError> {
        if self.at_eof() {
            return Ok(());
        }
        if self.data[self.pos] == b'\n' {
            self.pos += 1;
            return Ok(());
        }
        if self.data[self.pos] == b'\r' && self.data.get(self.pos + 1) == Some(&b'\n') {
            self.pos += 2;
            return Ok(());
        }
        Err(InputError::TrailingGarbage(self.record))
    }
}

/// Reads every `(address_set, transaction_bytes)` entry from `path`.
///
/// Address length is fixed by the first address encountered and must equal
/// [`ADDR_LEN`]; any later address of a different length is rejected with
/// [`InputError::AddressLengthMismatch`], preserving the original's
/// "per-build constant address length" invariant without the original's
/// process-wide `static` (the length is tracked in a local here, scoped to
/// this single read).
pub fn read_transactions(path: &Path) -> Result<Vec<InputTx>, BuildError> {
    let data = fs::read(path)?;
    let mut cursor = Cursor::new(&data);
    let mut entries = Vec::new();
    let mut observed_addr_len: Option<usize> = None;

    loop {
        cursor.skip_whitespace();
        if cursor.at_eof() {
            break;
        }

        let count = cursor.read_decimal().ok_or(InputError::AddressCount(cursor.record))?;
        let mut addresses = Vec::with_capacity(count);
        let mut seen_shorts = HashSet::with_capacity(count);
        for index in 0..count {
            let raw = cursor.read_token().ok_or(InputError::UnexpectedEof("an address"))?;
            if let Some(first) = observed_addr_len {
                if first != raw.len() {
                    return Err(InputError::AddressLengthMismatch { first, second: raw.len() }.into());
                }
            } else {
                observed_addr_len = Some(raw.len());
            }
            if raw.len() != ADDR_LEN {
                return Err(InputError::AddressLength {
                    line: cursor.record,
                    index,
                    found: raw.len(),
                    expected: ADDR_LEN,
                }
                .into());
            }
            let address = Address::from_byte_array(<[u8; ADDR_LEN]>::try_from(raw).expect("length checked above"));
            if !seen_shorts.insert(address.to_short()) {
                return Err(InputError::DuplicateAddress(cursor.record).into());
            }
            addresses.push(address);
        }

        let tx_len = cursor.read_decimal().ok_or(InputError::TxLength(cursor.record))?;
        cursor.expect_newline_or_eof()?;
        let body = cursor
            .read_exact(tx_len)
            .ok_or(InputError::TruncatedTx { line: cursor.record, expected: tx_len, found: data.len() - cursor.pos })?;
        cursor.expect_newline_or_eof()?;

        entries.push(InputTx { addresses, bytes: body.to_vec() });
        cursor.record += 1;
    }

    Ok(entries)
}
