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

//! The existence oracle (component C4): a single predicate answering
//! "have we already considered this txid?" against every source that
//! matters, short-circuiting in the cheapest-first order (§4.4).

use crate::collaborators::{ChainView, Mempool};
use crate::orphan_pool::OrphanPool;
use crate::rejects::RecentRejectsFilter;
use crate::types::Txid;

/// Evaluate `exists(txid)` against the rejects filter, the mempool, the
/// orphan pool and the UTXO cache, in that order, short-circuiting on the
/// first source that answers true.
///
/// The rejects-filter query has a side effect (invariant R1): if the
/// chain tip has moved, it resets before answering. That makes this
/// function observably different from a plain read, which is why it's a
/// free function taking `&mut RecentRejectsFilter` rather than a method on
/// an immutable bundle.
pub fn exists<M: Mempool, C: ChainView>(
	rejects: &mut RecentRejectsFilter,
	mempool: &M,
	orphans: &OrphanPool,
	chain: &C,
	txid: Txid,
) -> bool {
	if rejects.query(chain.tip(), txid) {
		return true;
	}
	if mempool.exists(txid) {
		return true;
	}
	if orphans.contains(txid) {
		return true;
	}
	// Best-effort "already confirmed" shortcut; never authoritative.
	chain.have_coin_in_cache(txid, 0) || chain.have_coin_in_cache(txid, 1)
}
