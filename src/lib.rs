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

//! Offline builder for the PIR database pair: a block-packed transaction
//! database (T-DB) and the two address-to-blocks indices (A1, A2) a PIR
//! client queries to privately retrieve the transactions for one address.

#[macro_use]
extern crate amplify;
#[macro_use]
extern crate log;

pub mod address;
pub mod config;
pub mod error;
pub mod format;
pub mod geometry;
pub mod processor;
pub mod reader;
pub mod writer;

pub use address::{Address, ShortAddress};
pub use config::Config;
pub use error::{BuildError, GeometryError, InputError};
pub use processor::{BuildOutput, Processor};
