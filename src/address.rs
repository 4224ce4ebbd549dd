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

//! Fixed-size address newtypes shared by the indices.
//!
//! `Address` is the 35-byte identifier as read from the input file;
//! `ShortAddress` is its canonical trailing-20-byte form used as the map
//! key, sort key and skip-list comparison basis.

use amplify::{ByteArray, FromSliceError};

/// Length of a long-form address, fixed for the lifetime of one build.
pub const ADDR_LEN: usize = 35;

/// Length of the canonical short-form address derived from the trailing
/// bytes of a long address.
pub const SHORT_ADDR_LEN: usize = 20;

/// A short, fixed-width address used for sorting, skip-list membership and
/// as the A1/A2 index key. Derived as the trailing [`SHORT_ADDR_LEN`] bytes
/// of an [`Address`] for higher entropy in the low-order bits.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ShortAddress([u8; SHORT_ADDR_LEN]);

impl std::fmt::Display for ShortAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl ShortAddress {
    pub fn as_bytes(&self) -> &[u8; SHORT_ADDR_LEN] { &self.0 }
}

impl ByteArray<SHORT_ADDR_LEN> for ShortAddress {
    fn from_byte_array(val: impl Into<[u8; SHORT_ADDR_LEN]>) -> Self { Self(val.into()) }

    fn from_slice(slice: impl AsRef<[u8]>) -> Result<Self, FromSliceError> {
        let len = slice.as_ref().len();
        if len != SHORT_ADDR_LEN {
            return Err(FromSliceError { expected: SHORT_ADDR_LEN, actual: len });
        }
        Ok(Self::from_slice_unsafe(slice))
    }

    fn from_slice_unsafe(slice: impl AsRef<[u8]>) -> Self {
        let mut buf = [0u8; SHORT_ADDR_LEN];
        buf.copy_from_slice(slice.as_ref());
        Self(buf)
    }

    fn to_byte_array(&self) -> [u8; SHORT_ADDR_LEN] { self.0 }
}

/// A full, fixed-length address as read from the input file.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Address([u8; ADDR_LEN]);

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl Address {
    pub fn as_bytes(&self) -> &[u8; ADDR_LEN] { &self.0 }

    /// Derives the canonical short form: the trailing [`SHORT_ADDR_LEN`]
    /// bytes, matching the way the original indexer keys its address maps
    /// by the low-entropy-free tail of the identifier.
    pub fn to_short(&self) -> ShortAddress {
        ShortAddress::from_slice_unsafe(&self.0[ADDR_LEN - SHORT_ADDR_LEN..])
    }
}

impl ByteArray<ADDR_LEN> for Address {
    fn from_byte_array(val: impl Into<[u8; ADDR_LEN]>) -> Self { Self(val.into()) }

    fn from_slice(slice: impl AsRef<[u8]>) -> Result<Self, FromSliceError> {
        let len = slice.as_ref().len();
        if len != ADDR_LEN {
            return Err(FromSliceError { expected: ADDR_LEN, actual: len });
        }
        Ok(Self::from_slice_unsafe(slice))
    }

    fn from_slice_unsafe(slice: impl AsRef<[u8]>) -> Self {
        let mut buf = [0u8; ADDR_LEN];
        buf.copy_from_slice(slice.as_ref());
        Self(buf)
    }

    fn to_byte_array(&self) -> [u8; ADDR_LEN] { self.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_address_is_trailing_bytes() {
        let mut bytes = [0u8; ADDR_LEN];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        let addr = Address::from_byte_array(bytes);
        let short = addr.to_short();
        assert_eq!(short.as_bytes(), &bytes[ADDR_LEN - SHORT_ADDR_LEN..]);
    }

    #[test]
    fn short_address_ordering_is_byte_lexicographic() {
        let a = ShortAddress::from_byte_array([0u8; SHORT_ADDR_LEN]);
        let mut buf = [0u8; SHORT_ADDR_LEN];
        buf[0] = 1;
        let b = ShortAddress::from_byte_array(buf);
        assert!(a < b);
    }
}
