// Copyright 2017 The Grin Developers
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

//! The peer-to-peer transaction ingress and relay core.
//!
//! This crate owns the pieces of a full node's mempool gateway that sit
//! between the wire layer and consensus validation: a recent-rejects
//! filter, a short-lived relay cache, an orphan pool for transactions
//! whose parents haven't arrived yet, and the ingress/egress pipelines
//! that tie them together. It deliberately knows nothing about consensus
//! rules, transaction encoding, socket I/O or the mempool's own storage —
//! those are supplied by the caller through the traits in
//! [`collaborators`].

#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![warn(missing_docs)]

#[macro_use]
extern crate bitflags;
extern crate serde;
#[macro_use]
extern crate serde_derive;

mod bloom;
mod core;
mod egress;
mod eviction;
mod existence;
mod ingress;
mod orphan_pool;
mod relay_cache;
mod rejects;

pub mod collaborators;
pub mod config;
pub mod types;

pub use crate::core::RelayCore;
pub use crate::existence::exists;
