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

//! The recent-rejects filter (component C1): a rolling Bloom filter that
//! suppresses redundant re-requests of transactions we've already turned
//! down, reset whenever the chain tip moves so that a transaction rejected
//! against a stale UTXO view gets a fair second chance.

use crate::bloom::RollingBloomFilter;
use crate::types::{consts, BlockHash, Txid};

/// Probabilistic set of recently-rejected txids (§4.1).
pub struct RecentRejectsFilter {
	filter: RollingBloomFilter,
	chain_tip_at_reset: BlockHash,
}

impl RecentRejectsFilter {
	/// Build a filter sized per §6: 120,000 elements at false-positive rate
	/// 10⁻⁶, with no tip recorded yet.
	pub fn new() -> RecentRejectsFilter {
		RecentRejectsFilter {
			filter: RollingBloomFilter::new(
				consts::REJECTS_FILTER_ELEMENTS,
				consts::REJECTS_FILTER_FP_RATE,
			),
			chain_tip_at_reset: BlockHash::ZERO,
		}
	}

	/// Query membership (invariant R1): if the current tip differs from the
	/// tip recorded at the last reset, the filter is cleared and the new
	/// tip recorded *before* the query is answered.
	pub fn query(&mut self, current_tip: BlockHash, txid: Txid) -> bool {
		if current_tip != self.chain_tip_at_reset {
			self.filter.reset();
			self.chain_tip_at_reset = current_tip;
			return false;
		}
		self.filter.contains(&txid.0)
	}

	/// Unconditional insert. Callers must have already established the
	/// transaction is non-malleable (§4.5) before calling this.
	pub fn insert(&mut self, txid: Txid) {
		self.filter.insert(&txid.0);
	}
}

impl Default for RecentRejectsFilter {
	fn default() -> RecentRejectsFilter {
		RecentRejectsFilter::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn txid(b: u8) -> Txid {
		Txid([b; 32])
	}

	fn tip(b: u8) -> BlockHash {
		BlockHash([b; 32])
	}

	#[test]
	fn insert_then_query_same_tip_is_true() {
		let mut r = RecentRejectsFilter::new();
		assert!(!r.query(tip(1), txid(1)));
		r.insert(txid(1));
		assert!(r.query(tip(1), txid(1)));
	}

	#[test]
	fn tip_change_resets_membership() {
		let mut r = RecentRejectsFilter::new();
		r.query(tip(1), txid(1));
		r.insert(txid(1));
		assert!(r.query(tip(1), txid(1)));

		// P2: the first exists() after a tip change must be false.
		assert!(!r.query(tip(2), txid(1)));
		// And the filter stays empty under the new tip until re-inserted.
		assert!(!r.query(tip(2), txid(1)));
	}
}
