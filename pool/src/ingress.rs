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

//! The ingress pipeline (component C5): `on_tx` is the single entry point
//! a peer-supplied transaction passes through. It is the busiest part of
//! this core (§2 gives it roughly a third of the implementation) because
//! it is where dependency resolution, bandwidth control and DoS scoring
//! all meet (§4.5).

use std::collections::{HashSet, VecDeque};

use log::{debug, trace, warn};

use crate::collaborators::{AcceptOutcome, ChainView, Mempool, NetOut, ValidationState};
use crate::core::RelayCore;
use crate::existence::exists;
use crate::types::{consts, truncate_reject_reason, Outpoint, PeerCtx, PeerOutFlags, PeerFlags, Timestamp, TxRef, Txid};

/// Whether a rejected transaction may safely be remembered in the
/// recent-rejects filter: only if its bytes are the only valid
/// serialization of it (§4.5 non-malleable rule, invariant P8).
fn is_non_malleable(tx: &TxRef, state: &ValidationState) -> bool {
	!tx.has_witness() && !state.corruption_possible
}

enum Branch {
	AlreadyKnown,
	Invalid(ValidationState),
}

impl RelayCore {
	/// Handle a transaction received from `peer`. `inputs` and
	/// `num_outputs` describe the transaction's topology (this core does
	/// not itself parse transaction bytes).
	pub fn on_tx<M: Mempool, C: ChainView, N: NetOut>(
		&mut self,
		mempool: &mut M,
		chain: &C,
		net: &N,
		peer: &mut PeerCtx,
		tx: TxRef,
		inputs: Vec<Outpoint>,
		num_outputs: u32,
		now: Timestamp,
	) {
		// Step 1: admission-control gate.
		let relay_allowed = peer.flags.contains(PeerFlags::RELAY_TX)
			|| (peer.flags.contains(PeerFlags::WHITELIST) && self.config.whitelistrelay);
		if !relay_allowed {
			debug!("tx {} dropped: relay disabled for peer", tx.txid());
			return;
		}

		let txid = tx.txid();

		// Step 2: de-dup.
		if exists(&mut self.rejects, mempool, &self.orphans, chain, txid) {
			self.finish(mempool, chain, net, peer, tx, txid, Branch::AlreadyKnown);
			return;
		}

		// Step 3: validation.
		match mempool.accept_to_mempool(&tx, &inputs) {
			AcceptOutcome::Accepted { evicted } => {
				self.on_accepted(mempool, chain, net, peer, txid, num_outputs);
				// Step 8: side channel for evicted mempool entries.
				for e in evicted {
					net.add_to_compact_extra_pool(&e);
				}
			}
			AcceptOutcome::MissingInputs { inputs } => {
				self.on_missing_inputs(chain, net, peer, tx, txid, inputs, num_outputs, now);
			}
			AcceptOutcome::Invalid(state) => {
				self.finish(mempool, chain, net, peer, tx, txid, Branch::Invalid(state));
			}
		}
	}

	fn on_accepted<M: Mempool, C: ChainView, N: NetOut>(
		&mut self,
		mempool: &mut M,
		chain: &C,
		net: &N,
		peer: &mut PeerCtx,
		txid: Txid,
		num_outputs: u32,
	) {
		// 4a: re-check mempool consistency against the UTXO view.
		mempool.check();
		// 4b/4c: broadcast and flag.
		net.broadcast(txid);
		peer.out_flags.insert(PeerOutFlags::NEW_TRANSACTION);

		// 4d: recursive orphan resolution over an explicit outpoint queue.
		let mut queue: VecDeque<Outpoint> = (0..num_outputs).map(|i| Outpoint::new(txid, i)).collect();
		let mut misbehaving: HashSet<crate::types::PeerId> = HashSet::new();
		let mut to_erase: HashSet<Txid> = HashSet::new();

		while let Some(outpoint) = queue.pop_front() {
			let children: Vec<(Txid, TxRef, Vec<Outpoint>, u32, crate::types::PeerId)> = self
				.orphans
				.find_children(outpoint)
				.into_iter()
				.map(|e| (e.tx.txid(), e.tx.clone(), e.inputs.clone(), e.num_outputs, e.from_peer))
				.collect();

			for (child_txid, child_tx, child_inputs, child_num_outputs, from_peer) in children {
				if misbehaving.contains(&from_peer) {
					continue;
				}

				// Re-validate with a discarded state: an attacker must not
				// be able to construct orphans whose rejection scores an
				// innocent relayer merely for having forwarded them.
				match mempool.accept_to_mempool(&child_tx, &child_inputs) {
					AcceptOutcome::Accepted { evicted } => {
						net.broadcast(child_txid);
						for i in 0..child_num_outputs {
							queue.push_back(Outpoint::new(child_txid, i));
						}
						to_erase.insert(child_txid);
						for e in evicted {
							net.add_to_compact_extra_pool(&e);
						}
					}
					AcceptOutcome::Invalid(state) => {
						to_erase.insert(child_txid);
						if state.dos_score > 0 {
							net.misbehave(from_peer, state.dos_score);
							misbehaving.insert(from_peer);
						}
						if is_non_malleable(&child_tx, &state) {
							self.rejects.insert(child_txid);
						}
					}
					AcceptOutcome::MissingInputs { .. } => {
						// Still missing something else; leave it parked.
					}
				}
			}
		}

		for txid in to_erase {
			self.orphans.erase(txid);
		}

		let _ = chain; // only used via `exists` upstream; kept for symmetry.
	}

	fn on_missing_inputs<C: ChainView, N: NetOut>(
		&mut self,
		chain: &C,
		net: &N,
		peer: &mut PeerCtx,
		tx: TxRef,
		txid: Txid,
		inputs: Vec<Outpoint>,
		num_outputs: u32,
		now: Timestamp,
	) {
		let tip = chain.tip();
		let parent_already_rejected = inputs.iter().any(|i| self.rejects.query(tip, i.txid));
		if parent_already_rejected {
			self.rejects.insert(txid);
			return;
		}

		let peer_witness = peer.flags.contains(PeerFlags::WITNESS);
		let flags = peer.fetch_flags(peer_witness);
		for input in &inputs {
			net.add_tx_inventory_known(peer.peer_id, input.txid, flags);
			if !self.known_or_unresolved(chain, input.txid) {
				net.ask_for_transaction(peer.peer_id, input.txid, flags);
			}
		}

		self.orphans.add(tx, &inputs, num_outputs, peer.peer_id, now);
		let evicted = self.orphans.limit(self.config.max_orphan_tx);
		if evicted > 0 {
			trace!("orphan pool over limit, evicted {} entries", evicted);
		}
	}

	/// Cheap existence probe used only to decide whether a missing parent
	/// is worth asking for; unlike the full `exists` oracle this does not
	/// consult the mempool, which the caller has no mutable access to at
	/// this point without re-entering itself. It still consults the
	/// rejects filter, the orphan pool and the UTXO cache, in the same
	/// order `exists` does (§4.4), so a parent already parked under its
	/// own orphan entry is not re-requested.
	fn known_or_unresolved<C: ChainView>(&mut self, chain: &C, txid: Txid) -> bool {
		self.rejects.query(chain.tip(), txid)
			|| self.orphans.contains(txid)
			|| chain.have_coin_in_cache(txid, 0)
			|| chain.have_coin_in_cache(txid, 1)
	}

	fn finish<M: Mempool, C: ChainView, N: NetOut>(
		&mut self,
		_mempool: &M,
		_chain: &C,
		net: &N,
		peer: &mut PeerCtx,
		tx: TxRef,
		txid: Txid,
		branch: Branch,
	) {
		// Step 6.
		match &branch {
			Branch::AlreadyKnown => {}
			Branch::Invalid(state) => {
				let non_malleable = is_non_malleable(&tx, state);
				if non_malleable {
					self.rejects.insert(txid);
					if tx.size() < consts::COMPACT_EXTRA_MAX_BYTES {
						net.add_to_compact_extra_pool(&tx);
					}
				}
				if tx.has_witness() && tx.size() < consts::COMPACT_EXTRA_MAX_BYTES {
					net.add_to_compact_extra_pool(&tx);
				}
			}
		}

		let validation_failed = matches!(branch, Branch::Invalid(_));
		let dos_zero = match &branch {
			Branch::Invalid(state) => state.dos_score == 0,
			Branch::AlreadyKnown => true,
		};
		if peer.flags.contains(PeerFlags::WHITELIST)
			&& self.config.whitelistforcerelay
			&& (!validation_failed || dos_zero)
		{
			net.broadcast(txid);
		}

		// Step 7: reporting.
		if let Branch::Invalid(state) = branch {
			if let Some(code) = state.reject_code {
				if code < consts::REJECT_INTERNAL {
					net.send_reject(peer.peer_id, code, truncate_reject_reason(&state.reason), txid);
				}
			}
			if state.dos_score > 0 {
				peer.out_misbehavior_score += state.dos_score;
				warn!(
					"peer {:?} misbehavior +{} for tx {}",
					peer.peer_id, state.dos_score, txid
				);
			}
		}
	}
}
