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

//! The orphan pool (component C3): transactions parked because one or more
//! of their inputs is not yet known. Implemented as an arena of entries
//! addressed by stable integer handles, per the design note that the
//! txid/outpoint/peer indices are cyclic in reference and therefore best
//! kept as handles rather than owning references (§9).

use std::collections::{HashMap, HashSet};

use rand::{thread_rng, Rng};

use crate::types::{Outpoint, PeerId, Timestamp, TxRef, Txid};

/// Stable handle into the orphan arena. Never reused while the entry it
/// named is still referenced from the secondary/tertiary indices.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct OrphanHandle(u64);

/// A parked transaction, owned by the orphan pool (§3).
pub struct OrphanEntry {
	/// The transaction itself.
	pub tx: TxRef,
	/// Every outpoint this transaction spends, kept alongside it so a
	/// later re-evaluation doesn't need to re-derive them.
	pub inputs: Vec<Outpoint>,
	/// Number of outputs the transaction creates, needed to seed the
	/// recursive resolution queue if it is later admitted.
	pub num_outputs: u32,
	/// The peer that handed it to us, used for bulk eviction on disconnect
	/// and for scoring if it later turns out invalid.
	pub from_peer: PeerId,
	/// When it was parked, for diagnostics; the design deliberately does
	/// not age out by time, only by the uniform-random size bound (O2).
	pub added_at: Timestamp,
}

/// Bounded, index-consistent store of orphan transactions (§4.3).
pub struct OrphanPool {
	arena: HashMap<OrphanHandle, OrphanEntry>,
	next_handle: u64,
	by_txid: HashMap<Txid, OrphanHandle>,
	by_outpoint: HashMap<Outpoint, HashSet<OrphanHandle>>,
	by_peer: HashMap<PeerId, HashSet<OrphanHandle>>,
}

impl OrphanPool {
	/// An empty pool.
	pub fn new() -> OrphanPool {
		OrphanPool {
			arena: HashMap::new(),
			next_handle: 0,
			by_txid: HashMap::new(),
			by_outpoint: HashMap::new(),
			by_peer: HashMap::new(),
		}
	}

	/// Number of parked transactions.
	pub fn len(&self) -> usize {
		self.arena.len()
	}

	/// Whether a transaction with this txid is currently parked.
	pub fn contains(&self, txid: Txid) -> bool {
		self.by_txid.contains_key(&txid)
	}

	/// Park a transaction. Returns false (no-op) if its txid is already
	/// present (§4.3 edge cases). The core doesn't parse transactions;
	/// callers supply the outpoints spent and the output count alongside
	/// the transaction itself.
	pub fn add(
		&mut self,
		tx: TxRef,
		inputs: &[Outpoint],
		num_outputs: u32,
		from_peer: PeerId,
		now: Timestamp,
	) -> bool {
		let txid = tx.txid();
		if self.by_txid.contains_key(&txid) {
			return false;
		}

		let handle = OrphanHandle(self.next_handle);
		self.next_handle += 1;

		self.arena.insert(
			handle,
			OrphanEntry {
				tx,
				inputs: inputs.to_vec(),
				num_outputs,
				from_peer,
				added_at: now,
			},
		);
		self.by_txid.insert(txid, handle);
		for input in inputs {
			self.by_outpoint
				.entry(*input)
				.or_insert_with(HashSet::new)
				.insert(handle);
		}
		self.by_peer
			.entry(from_peer)
			.or_insert_with(HashSet::new)
			.insert(handle);

		true
	}

	/// Every orphan whose inputs reference `outpoint`. Zero-cost if nothing
	/// depends on it (§4.3).
	pub fn find_children(&self, outpoint: Outpoint) -> Vec<&OrphanEntry> {
		match self.by_outpoint.get(&outpoint) {
			Some(handles) => handles.iter().filter_map(|h| self.arena.get(h)).collect(),
			None => Vec::new(),
		}
	}

	/// Remove a transaction by txid. Returns 1 if it was present, 0
	/// otherwise, mirroring the external interface's counting convention.
	pub fn erase(&mut self, txid: Txid) -> usize {
		let handle = match self.by_txid.remove(&txid) {
			Some(h) => h,
			None => return 0,
		};
		self.remove_handle(handle);
		1
	}

	/// Remove every orphan that came from `peer_id`, returning the count.
	pub fn erase_for_peer(&mut self, peer_id: PeerId) -> usize {
		let handles: Vec<OrphanHandle> = match self.by_peer.get(&peer_id) {
			Some(set) => set.iter().cloned().collect(),
			None => return 0,
		};
		let count = handles.len();
		for handle in handles {
			self.remove_handle(handle);
		}
		count
	}

	/// Remove every orphan that consumes any of the given outpoints; used
	/// on block connection to drop orphans that are now included,
	/// conflicted, or unresolvable (§4.7).
	pub fn erase_for_outpoints(&mut self, outpoints: &[Outpoint]) -> usize {
		let mut handles = HashSet::new();
		for op in outpoints {
			if let Some(set) = self.by_outpoint.get(op) {
				handles.extend(set.iter().cloned());
			}
		}
		let count = handles.len();
		for handle in handles {
			self.remove_handle(handle);
		}
		count
	}

	/// Enforce invariant O2: evict uniformly-random entries (never weighted
	/// by age, so a grinding attacker can't target a deterministic victim)
	/// until the pool holds at most `max` entries. Returns the number
	/// evicted.
	pub fn limit(&mut self, max: usize) -> usize {
		let mut evicted = 0;
		let mut rng = thread_rng();
		while self.arena.len() > max {
			let idx = rng.gen_range(0, self.arena.len());
			let victim = *self.arena.keys().nth(idx).expect("pool is non-empty");
			self.remove_handle(victim);
			evicted += 1;
		}
		evicted
	}

	fn remove_handle(&mut self, handle: OrphanHandle) {
		if let Some(entry) = self.arena.remove(&handle) {
			self.by_txid.remove(&entry.tx.txid());

			if let Some(set) = self.by_peer.get_mut(&entry.from_peer) {
				set.remove(&handle);
				if set.is_empty() {
					self.by_peer.remove(&entry.from_peer);
				}
			}

			let mut empty_outpoints = Vec::new();
			for (outpoint, set) in self.by_outpoint.iter_mut() {
				if set.remove(&handle) && set.is_empty() {
					empty_outpoints.push(*outpoint);
				}
			}
			for op in empty_outpoints {
				self.by_outpoint.remove(&op);
			}
		}
	}
}

impl Default for OrphanPool {
	fn default() -> OrphanPool {
		OrphanPool::new()
	}
}
