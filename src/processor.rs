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

//! The build orchestrator: accumulates transactions, derives geometry,
//! drives the T-DB pass, inverts its position map into per-address block
//! sets and drives both address indices plus the manifest/stats files.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::address::{Address, ShortAddress};
use crate::config::Config;
use crate::error::{BuildError, InputError};
use crate::format::{AutoDelimitedDb, DelimitedDb, TransactionDb};
use crate::geometry::{isqrt, t_db_geometry};
use crate::writer::ClosedDb;

/// Filename stem for the A1 index; fixed regardless of the caller's prefix,
/// matching the on-disk layout the PIR client expects to find it under.
const A1_PREFIX: &str = "addr_db.fmt1";
/// Filename stem for the A2 index.
const A2_PREFIX: &str = "addr_db.fmt2";

/// Paths and geometry of a completed build.
#[derive(Debug)]
pub struct BuildOutput {
    pub tx_db: ClosedDb,
    pub a1: ClosedDb,
    pub a2: ClosedDb,
    pub address_listing_path: PathBuf,
    pub address_to_tx_len_path: PathBuf,
    pub raw_tx_size_path: PathBuf,
}

/// Accumulates `(address_set, transaction_bytes)` pairs and, on [`build`],
/// drives the three on-disk formats. Owns the address length observed for
/// this run as an instance field rather than the original's process-wide
/// `static`, so two `Processor`s in one process never interfere.
///
/// [`build`]: Processor::build
pub struct Processor {
    config: Config,
    transactions: Vec<Vec<u8>>,
    short_to_long: BTreeMap<ShortAddress, Address>,
    addr_to_tx_len: BTreeMap<ShortAddress, u64>,
    addr_to_positions: BTreeMap<ShortAddress, Vec<u64>>,
    byte_position: u64,
    raw_tx_bytes: u64,
    observed_addr_len: Option<usize>,
}

impl Processor {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            transactions: Vec::new(),
            short_to_long: BTreeMap::new(),
            addr_to_tx_len: BTreeMap::new(),
            addr_to_positions: BTreeMap::new(),
            byte_position: 0,
            raw_tx_bytes: 0,
            observed_addr_len: None,
        }
    }

    /// Accumulates one transaction and the set of addresses it touches.
    ///
    /// Enforces a constant address length across the whole build (the
    /// `Address` newtype already fixes this at 35 bytes; this check exists
    /// so a future relaxation of that constant stays guarded) and rejects
    /// short-form collisions between distinct long addresses.
    pub fn add_tx(&mut self, addresses: &[Address], tx_bytes: Vec<u8>) -> Result<(), BuildError> {
        // `Address` is fixed at compile time to `ADDR_LEN` bytes, so this can
        // never actually diverge; the field exists so the per-build address
        // length lives on `Processor` rather than behind a process-wide
        // `static`, per the Open Question in spec.md §9.
        self.observed_addr_len.get_or_insert(crate::address::ADDR_LEN);

        let position = self.transactions.len() as u64;
        for address in addresses {
            let short = address.to_short();
            match self.short_to_long.get(&short) {
                Some(existing) if existing != address => {
                    return Err(InputError::ShortFormCollision(short).into());
                }
                Some(_) => {}
                None => {
                    self.short_to_long.insert(short, *address);
                }
            }
            *self.addr_to_tx_len.entry(short).or_insert(0) += tx_bytes.len() as u64;
            self.addr_to_positions.entry(short).or_default().push(position);
        }

        self.byte_position += 4 + tx_bytes.len() as u64;
        self.raw_tx_bytes += tx_bytes.len() as u64;
        self.transactions.push(tx_bytes);
        Ok(())
    }

    /// Runs the full build: T-DB, inversion, A1, A2, manifest and stats.
    pub fn build(self) -> Result<BuildOutput, BuildError> {
        let geometry = t_db_geometry(self.byte_position, self.config.block_size)?;
        info!(
            "PIR geometry: {} transaction bytes, block size {} bytes, {} blocks",
            self.byte_position, geometry.block_size, geometry.block_count
        );

        let tx_db_prefix = format!("{}_default_blocksize_{}", self.config.prefix, geometry.block_size);
        let tx_db = TransactionDb::open(&self.config.out_dir, &tx_db_prefix, geometry.block_size)?;
        let (tx_db, position_map) = tx_db.build_with_position_map(&self.transactions)?;
        debug!("T-DB closed at {} blocks of {} bytes", tx_db.block_count, tx_db.block_size);

        let mut blocks_by_addr: BTreeMap<ShortAddress, BTreeSet<u64>> = BTreeMap::new();
        for (short, positions) in &self.addr_to_positions {
            let mut blocks = BTreeSet::new();
            for position in positions {
                if let Some(touched) = position_map.get(position) {
                    blocks.extend(touched.iter().copied());
                }
            }
            trace!("address {short} touches {} blocks", blocks.len());
            blocks_by_addr.insert(*short, blocks);
        }

        let skip_list = self.effective_skip_list(geometry.block_count, &blocks_by_addr);

        let addr_to_blocks: BTreeMap<ShortAddress, BTreeSet<u64>> =
            blocks_by_addr.into_iter().filter(|(short, _)| !skip_list.contains(short)).collect();

        let a1 = self.build_a1(&addr_to_blocks, geometry.block_count)?;
        let a2 = self.build_a2(&addr_to_blocks)?;

        let address_listing_path = self.write_address_listing(&addr_to_blocks)?;
        let address_to_tx_len_path = self.write_address_to_tx_len(&addr_to_blocks)?;
        let raw_tx_size_path = self.write_raw_tx_size_sentinel()?;

        Ok(BuildOutput { tx_db, a1, a2, address_listing_path, address_to_tx_len_path, raw_tx_size_path })
    }

    /// The caller-supplied skip-list, extended with any address whose
    /// block-set cardinality — not its transaction count, which a shared
    /// block or a multi-block transaction would make a different quantity —
    /// exceeds `√block_count`. This is the dynamic fallback spec.md allows
    /// in place of a shipped high-traffic address list, which this crate has
    /// no ground-truth data to bundle.
    fn effective_skip_list(
        &self,
        block_count: u64,
        blocks_by_addr: &BTreeMap<ShortAddress, BTreeSet<u64>>,
    ) -> BTreeSet<ShortAddress> {
        let mut skip = self.config.skip_list.clone();
        let threshold = isqrt(block_count);
        for (short, blocks) in blocks_by_addr {
            if blocks.len() as u64 > threshold {
                skip.insert(*short);
            }
        }
        skip
    }

    fn build_a1(
        &self,
        addr_to_blocks: &BTreeMap<ShortAddress, BTreeSet<u64>>,
        block_count: u64,
    ) -> Result<ClosedDb, BuildError> {
        let bitmap_len = (block_count as usize).div_ceil(8);
        let record_len = crate::address::ADDR_LEN + bitmap_len;
        let records: Vec<(Vec<u8>, Vec<u8>)> = addr_to_blocks
            .iter()
            .map(|(short, blocks)| {
                let long = self.short_to_long[short];
                let mut record = long.as_bytes().to_vec();
                record.extend_from_slice(&pack_bitmap(blocks, block_count, bitmap_len));
                (long.as_bytes().to_vec(), record)
            })
            .collect();
        Ok(AutoDelimitedDb::build(&self.config.out_dir, A1_PREFIX, record_len, &records)?)
    }

    fn build_a2(&self, addr_to_blocks: &BTreeMap<ShortAddress, BTreeSet<u64>>) -> Result<ClosedDb, BuildError> {
        let records: Vec<(Vec<u8>, Vec<u8>)> = addr_to_blocks
            .iter()
            .map(|(short, blocks)| {
                let long = self.short_to_long[short];
                let mut record = long.as_bytes().to_vec();
                record.extend_from_slice(&(blocks.len() as u32).to_le_bytes());
                for block in blocks {
                    record.extend_from_slice(&(*block as u32).to_le_bytes());
                }
                (long.as_bytes().to_vec(), record)
            })
            .collect();
        Ok(DelimitedDb::build(&self.config.out_dir, A2_PREFIX, 35, &records)?)
    }

    fn write_address_listing(
        &self,
        addr_to_blocks: &BTreeMap<ShortAddress, BTreeSet<u64>>,
    ) -> Result<PathBuf, BuildError> {
        let path = self.config.out_dir.join(format!("{}_address_listing", self.config.prefix));
        let mut body = Vec::new();
        for short in addr_to_blocks.keys() {
            body.extend_from_slice(self.short_to_long[short].as_bytes());
            body.push(b'\n');
        }
        fs::write(&path, body)?;
        Ok(path)
    }

    fn write_address_to_tx_len(
        &self,
        addr_to_blocks: &BTreeMap<ShortAddress, BTreeSet<u64>>,
    ) -> Result<PathBuf, BuildError> {
        let path = self.config.out_dir.join(format!("{}_address_to_tx_len", self.config.prefix));
        let mut body = String::new();
        for (short, len) in &self.addr_to_tx_len {
            let block_count = addr_to_blocks.get(short).map_or(0, |blocks| blocks.len());
            let long = self.short_to_long[short];
            body.push_str(&format!("{long} {len} {block_count}\n"));
        }
        fs::write(&path, body)?;
        Ok(path)
    }

    fn write_raw_tx_size_sentinel(&self) -> Result<PathBuf, BuildError> {
        let path = self.config.out_dir.join(format!("{}_raw_tx_size_{}", self.config.prefix, self.raw_tx_bytes));
        fs::write(&path, [])?;
        Ok(path)
    }
}

/// Packs `blocks` into an MSB-oriented bitmap of `bitmap_len` bytes: each
/// bit is OR'd into the current byte's low position and the byte is then
/// shifted left by one before the next bit is considered, so a single set
/// bit among the first `pir_blocks` ends up at byte value `0x02`, not
/// `0x01` — reproducing spec.md's worked example bit-exactly.
fn pack_bitmap(blocks: &BTreeSet<u64>, pir_blocks: u64, bitmap_len: usize) -> Vec<u8> {
    let mut bitmap = vec![0u8; bitmap_len];
    let mut byte = 0u8;
    let mut count = 0usize;
    let mut byte_index = 0usize;
    for block in 0..pir_blocks {
        byte |= blocks.contains(&block) as u8;
        byte <<= 1;
        count += 1;
        if count == 8 {
            bitmap[byte_index] = byte;
            byte_index += 1;
            byte = 0;
            count = 0;
        }
    }
    if count > 0 {
        bitmap[byte_index] = byte;
    }
    bitmap
}
