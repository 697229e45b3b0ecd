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

//! Hooks the caller drives from events that originate outside a single
//! transaction's lifecycle: a peer going away, and a block landing on the
//! active chain (§4.7).

use log::trace;

use crate::collaborators::ChainView;
use crate::core::RelayCore;
use crate::types::{Outpoint, PeerId, Txid};

impl RelayCore {
	/// Drop every orphan that came from `peer_id`. Nothing else in this
	/// core is keyed by peer, so this is the entirety of disconnect
	/// handling on this side (invariant O3: no reference to a peer
	/// outlives its connection).
	pub fn on_peer_disconnect(&mut self, peer_id: PeerId) {
		let evicted = self.orphans.erase_for_peer(peer_id);
		if evicted > 0 {
			trace!("peer {:?} disconnected, dropped {} orphans", peer_id, evicted);
		}
	}

	/// React to a new block on the active chain: drop every orphan that
	/// spends one of the outpoints the block just consumed (whether the
	/// orphan's own transaction made it in, or one of its inputs was spent
	/// by something else and it can never be valid again), and make sure
	/// the next recent-rejects query notices the tip has moved rather than
	/// answering against a stale reset point (§4.7, invariant R1).
	pub fn on_block_connected<C: ChainView>(&mut self, chain: &C, spent_outputs: &[Outpoint]) {
		let evicted = self.orphans.erase_for_outpoints(spent_outputs);
		if evicted > 0 {
			trace!("block connected, dropped {} orphans", evicted);
		}
		// Touch the filter with a query against the new tip so the reset
		// happens now rather than being deferred to the next `on_tx`; the
		// probe txid is never inserted, only used to observe the tip.
		let _ = self.rejects.query(chain.tip(), Txid::ZERO);
	}
}
