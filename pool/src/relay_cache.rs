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

//! The relay cache (component C2): a time-expiring `txid -> tx` map that
//! lets a peer fetch a transaction shortly after we advertised it even if
//! the mempool has since evicted it.

use std::collections::{HashMap, VecDeque};

use crate::types::{consts, Timestamp, TxRef, Txid};

/// Time-windowed map from txid to serialized transaction (§4.2).
pub struct RelayCache {
	entries: HashMap<Txid, TxRef>,
	// Strictly non-decreasing expiry order (invariant M1); insertion time is
	// monotonic in practice since `now` only ever grows across calls.
	expiries: VecDeque<(Timestamp, Txid)>,
}

impl RelayCache {
	/// An empty cache.
	pub fn new() -> RelayCache {
		RelayCache {
			entries: HashMap::new(),
			expiries: VecDeque::new(),
		}
	}

	/// Insert into the map if absent; on insertion, schedule expiry 15
	/// minutes (in caller-supplied microsecond units) from `now`.
	pub fn publish(&mut self, tx: TxRef, now: Timestamp) {
		let txid = tx.txid();
		if self.entries.contains_key(&txid) {
			return;
		}
		self.entries.insert(txid, tx);
		self.expiries
			.push_back((now + consts::RELAY_CACHE_TTL_MICROS, txid));
	}

	/// Look up a cached transaction by txid.
	pub fn lookup(&self, txid: Txid) -> Option<TxRef> {
		self.entries.get(&txid).cloned()
	}

	/// Pop every entry whose expiry is at or before `now`; this is the only
	/// path by which the cache shrinks (invariant M1).
	pub fn expire(&mut self, now: Timestamp) {
		while let Some(&(expiry, _)) = self.expiries.front() {
			if expiry > now {
				break;
			}
			let (_, txid) = self.expiries.pop_front().unwrap();
			self.entries.remove(&txid);
		}
	}

	/// Number of live entries. Exposed for tests and metrics only.
	pub fn len(&self) -> usize {
		self.entries.len()
	}
}

impl Default for RelayCache {
	fn default() -> RelayCache {
		RelayCache::new()
	}
}
