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

//! End-to-end scenarios from spec.md §8, driving [`Processor`] directly
//! against a temp directory rather than spawning the compiled binary.

use std::collections::BTreeSet;
use std::fs;

use amplify::ByteArray;
use bppir::{Address, Config, Processor, ShortAddress};
use rand::RngCore;
use tempfile::tempdir;

fn addr(tag: u8) -> Address { Address::from_byte_array([tag; 35]) }

fn random_addr(rng: &mut impl RngCore) -> Address {
    let mut bytes = [0u8; 35];
    rng.fill_bytes(&mut bytes);
    Address::from_byte_array(bytes)
}

/// Decodes the T-DB's logical payload stream (headers stripped) back into
/// the original `len32 || bytes` transaction sequence.
fn decode_tdb(path: &std::path::Path, block_size: u64, block_count: u64) -> Vec<Vec<u8>> {
    let data = fs::read(path).unwrap();
    let mut payload = Vec::new();
    for block in 0..block_count {
        let start = (block * block_size) as usize;
        payload.extend_from_slice(&data[start + 4..start + block_size as usize]);
    }

    let mut out = Vec::new();
    let mut pos = 0;
    while pos + 4 <= payload.len() {
        let len = u32::from_le_bytes(payload[pos..pos + 4].try_into().unwrap()) as usize;
        pos += 4;
        if pos + len > payload.len() {
            break;
        }
        out.push(payload[pos..pos + len].to_vec());
        pos += len;
    }
    out
}

/// Decodes A1's fixed-width records (minus the trailing all-zero sentinel
/// block) into `(address, bitmap)` pairs, in on-disk (ascending short-form
/// address) order.
fn decode_a1(path: &std::path::Path, record_len: u64, block_count: u64) -> Vec<(Address, Vec<u8>)> {
    let data = fs::read(path).unwrap();
    let mut out = Vec::new();
    for block in 0..block_count.saturating_sub(1) {
        let start = (block * record_len) as usize;
        let record = &data[start..start + record_len as usize];
        let address = Address::from_slice(&record[..35]).unwrap();
        out.push((address, record[35..].to_vec()));
    }
    out
}

/// Mirrors `pack_bitmap`'s OR-then-shift construction exactly, so it can
/// recover which blocks a bitmap represents. Bit 0 of an 8-block-aligned
/// group is unrecoverable by construction (shifted fully out of the byte),
/// which this decoder reports as absent, matching the real encoding.
fn unpack_bitmap(bitmap: &[u8], pir_blocks: u64) -> BTreeSet<u64> {
    let mut set = BTreeSet::new();
    for block in 0..pir_blocks {
        let byte_index = (block / 8) as usize;
        let group_start = byte_index as u64 * 8;
        let group_end = (group_start + 8).min(pir_blocks);
        let group_len = (group_end - group_start) as u32;
        let local = (block - group_start) as u32;
        let position = group_len - local;
        if position >= 8 {
            continue;
        }
        if (bitmap[byte_index] >> position) & 1 == 1 {
            set.insert(block);
        }
    }
    set
}

/// Reads the ground-truth per-address block-set cardinality straight from
/// the stats file, bypassing the lossy bitmap packing entirely.
fn block_counts_from_stats(path: &std::path::Path) -> Vec<(String, u64, u64)> {
    let text = fs::read_to_string(path).unwrap();
    text.lines()
        .map(|line| {
            let mut parts = line.split_whitespace();
            let address = parts.next().unwrap().to_string();
            let len: u64 = parts.next().unwrap().parse().unwrap();
            let block_count: u64 = parts.next().unwrap().parse().unwrap();
            (address, len, block_count)
        })
        .collect()
}

#[test]
fn one_tx_one_address_round_trips() {
    let dir = tempdir().unwrap();
    let config = Config::new(dir.path().to_path_buf(), "t".to_string());
    let mut processor = Processor::new(config);
    processor.add_tx(&[addr(1)], b"hello".to_vec()).unwrap();
    let output = processor.build().unwrap();

    let txs = decode_tdb(&output.tx_db.data_path, output.tx_db.block_size, output.tx_db.block_count);
    assert_eq!(txs, vec![b"hello".to_vec()]);

    let records = decode_a1(&output.a1.data_path, output.a1.block_size, output.a1.block_count);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, addr(1));

    let stats = block_counts_from_stats(&output.address_to_tx_len_path);
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].1, 5);
    assert!(stats[0].2 >= 1);
}

#[test]
fn empty_transaction_is_a_bare_length_prefix() {
    let dir = tempdir().unwrap();
    let config = Config::new(dir.path().to_path_buf(), "t".to_string());
    let mut processor = Processor::new(config);
    processor.add_tx(&[addr(1)], Vec::new()).unwrap();
    let output = processor.build().unwrap();

    let txs = decode_tdb(&output.tx_db.data_path, output.tx_db.block_size, output.tx_db.block_count);
    assert_eq!(txs, vec![Vec::<u8>::new()]);
}

#[test]
fn two_equal_length_txs_share_one_address_and_one_block() {
    let dir = tempdir().unwrap();
    let config = Config::new(dir.path().to_path_buf(), "t".to_string()).with_block_size(Some(512));
    let mut processor = Processor::new(config);
    processor.add_tx(&[addr(2)], vec![9u8; 100]).unwrap();
    processor.add_tx(&[addr(2)], vec![9u8; 100]).unwrap();
    let output = processor.build().unwrap();

    let records = decode_a1(&output.a1.data_path, output.a1.block_size, output.a1.block_count);
    assert_eq!(records.len(), 1);

    let stats = block_counts_from_stats(&output.address_to_tx_len_path);
    assert_eq!(stats[0].1, 200);
    assert_eq!(stats[0].2, 1);
}

#[test]
fn long_transaction_spans_several_blocks() {
    let dir = tempdir().unwrap();
    let block_size = 32u64;
    let config = Config::new(dir.path().to_path_buf(), "t".to_string()).with_block_size(Some(block_size));
    let mut processor = Processor::new(config);
    processor.add_tx(&[addr(3)], vec![5u8; 3 * block_size as usize]).unwrap();
    let output = processor.build().unwrap();

    let stats = block_counts_from_stats(&output.address_to_tx_len_path);
    assert_eq!(stats.len(), 1);
    assert!(stats[0].2 >= 3, "expected at least three blocks touched, got {}", stats[0].2);
}

#[test]
fn two_addresses_sharing_one_tx_get_identical_block_sets() {
    let dir = tempdir().unwrap();
    let config = Config::new(dir.path().to_path_buf(), "t".to_string());
    let mut processor = Processor::new(config);
    processor.add_tx(&[addr(4), addr(5)], vec![1u8; 64]).unwrap();
    let output = processor.build().unwrap();

    let records = decode_a1(&output.a1.data_path, output.a1.block_size, output.a1.block_count);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].1, records[1].1);

    let set_a = unpack_bitmap(&records[0].1, output.tx_db.block_count);
    let set_b = unpack_bitmap(&records[1].1, output.tx_db.block_count);
    assert_eq!(set_a, set_b);

    let stats = block_counts_from_stats(&output.address_to_tx_len_path);
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].2, stats[1].2);
}

#[test]
fn skip_listed_address_is_absent_from_a1_and_listing_but_present_in_tdb() {
    let dir = tempdir().unwrap();
    let mut skip_list: BTreeSet<ShortAddress> = BTreeSet::new();
    skip_list.insert(addr(6).to_short());
    let config = Config::new(dir.path().to_path_buf(), "t".to_string()).with_skip_list(skip_list);
    let mut processor = Processor::new(config);
    processor.add_tx(&[addr(6)], b"payload".to_vec()).unwrap();
    let output = processor.build().unwrap();

    let records = decode_a1(&output.a1.data_path, output.a1.block_size, output.a1.block_count);
    assert!(records.is_empty());

    let listing = fs::read(&output.address_listing_path).unwrap();
    assert!(listing.is_empty());

    let txs = decode_tdb(&output.tx_db.data_path, output.tx_db.block_size, output.tx_db.block_count);
    assert_eq!(txs, vec![b"payload".to_vec()]);
}

#[test]
fn big_random_address_set_closes_with_consistent_block_counts() {
    let dir = tempdir().unwrap();
    let config = Config::new(dir.path().to_path_buf(), "big".to_string());
    let mut processor = Processor::new(config);

    let mut rng = rand::thread_rng();
    for _ in 0..2_000 {
        let address = random_addr(&mut rng);
        processor.add_tx(&[address], vec![7u8; 150]).unwrap();
    }
    let output = processor.build().unwrap();

    assert!(output.tx_db.block_count > 0);
    assert!(output.a1.block_count > 0);
    assert!(output.a2.block_count > 0);

    let stats = block_counts_from_stats(&output.address_to_tx_len_path);
    assert_eq!(stats.len() as u64, output.a1.block_count - 1);
    for (_, _, block_count) in &stats {
        assert!(*block_count >= 1);
        assert!(*block_count <= output.tx_db.block_count);
    }
}
