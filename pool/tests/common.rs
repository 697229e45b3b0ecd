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

//! In-memory stand-ins for the collaborators this crate never owns, so
//! the ingress/egress pipelines can be driven end to end without a real
//! consensus engine, UTXO set or socket layer.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;

use relay_pool::collaborators::{AcceptOutcome, BloomFilter, ChainView, Mempool, MempoolInfo, NetOut, ValidationState};
use relay_pool::types::{BlockHash, FetchFlags, Outpoint, PeerCtx, PeerFlags, PeerId, Timestamp, TxRef, Txid};

/// A mempool stand-in: admits anything whose inputs are all in
/// `confirmed_utxos` or already held by another entry in the mempool,
/// and otherwise reports the unresolved inputs as missing. Tests drive
/// rejection by pre-seeding `force_invalid`.
#[derive(Default)]
pub struct FakeMempool {
	held: RefCell<HashMap<Txid, (TxRef, Vec<Outpoint>, Timestamp)>>,
	confirmed_utxos: RefCell<std::collections::HashSet<Outpoint>>,
	force_invalid: RefCell<std::collections::HashSet<Txid>>,
	force_missing: RefCell<HashMap<Txid, Vec<Outpoint>>>,
	fee_rates: RefCell<HashMap<Txid, u64>>,
	accept_calls: RefCell<HashMap<Txid, usize>>,
}

impl FakeMempool {
	pub fn new() -> FakeMempool {
		FakeMempool::default()
	}

	/// Mark an outpoint as spendable, as if it were a confirmed UTXO.
	pub fn confirm_output(&self, outpoint: Outpoint) {
		self.confirmed_utxos.borrow_mut().insert(outpoint);
	}

	/// Force `accept_to_mempool` to reject this txid outright.
	pub fn force_invalid(&self, txid: Txid) {
		self.force_invalid.borrow_mut().insert(txid);
	}

	/// Force `accept_to_mempool` to report these specific inputs missing,
	/// regardless of what's confirmed.
	pub fn force_missing(&self, txid: Txid, inputs: Vec<Outpoint>) {
		self.force_missing.borrow_mut().insert(txid, inputs);
	}

	/// Override the fee rate `info`/`info_all` report for an already-held
	/// transaction, for exercising the egress fee floor.
	pub fn set_fee_rate(&self, txid: Txid, fee_rate: u64) {
		self.fee_rates.borrow_mut().insert(txid, fee_rate);
	}

	/// Override the admission time `info`/`info_all` report for an
	/// already-held transaction, for exercising `serve_fetch`'s timestamp
	/// gate and the egress depth/fee ordering.
	pub fn set_time(&self, txid: Txid, time: Timestamp) {
		if let Some(entry) = self.held.borrow_mut().get_mut(&txid) {
			entry.2 = time;
		}
	}

	/// Number of times `accept_to_mempool` was invoked for `txid`, so
	/// tests can tell a fresh (re-)validation apart from a call that
	/// short-circuited via the rejects filter or the orphan pool without
	/// ever reaching the validator.
	pub fn accept_call_count(&self, txid: Txid) -> usize {
		self.accept_calls.borrow().get(&txid).copied().unwrap_or(0)
	}

	fn input_available(&self, input: &Outpoint) -> bool {
		self.confirmed_utxos.borrow().contains(input) || self.held.borrow().contains_key(&input.txid)
	}
}

impl Mempool for FakeMempool {
	fn exists(&self, txid: Txid) -> bool {
		self.held.borrow().contains_key(&txid)
	}

	fn info(&self, txid: Txid) -> Option<MempoolInfo> {
		let fee_rate = self.fee_rates.borrow().get(&txid).copied().unwrap_or(1);
		self.held.borrow().get(&txid).map(|(tx, _, time)| MempoolInfo {
			tx: tx.clone(),
			time: *time,
			fee_rate,
		})
	}

	fn info_all(&self) -> Vec<MempoolInfo> {
		let fee_rates = self.fee_rates.borrow();
		self.held
			.borrow()
			.values()
			.map(|(tx, _, time)| MempoolInfo {
				tx: tx.clone(),
				time: *time,
				fee_rate: fee_rates.get(&tx.txid()).copied().unwrap_or(1),
			})
			.collect()
	}

	fn accept_to_mempool(&mut self, tx: &TxRef, inputs: &[Outpoint]) -> AcceptOutcome {
		let txid = tx.txid();
		*self.accept_calls.borrow_mut().entry(txid).or_insert(0) += 1;

		if self.force_invalid.borrow().contains(&txid) {
			return AcceptOutcome::Invalid(ValidationState::policy("forced invalid by test"));
		}
		if let Some(missing) = self.force_missing.borrow().get(&txid).cloned() {
			return AcceptOutcome::MissingInputs { inputs: missing };
		}

		let unresolved: Vec<Outpoint> = inputs
			.iter()
			.filter(|i| !self.input_available(i))
			.cloned()
			.collect();
		if !unresolved.is_empty() {
			return AcceptOutcome::MissingInputs { inputs: inputs.to_vec() };
		}

		self.held.borrow_mut().insert(txid, (tx.clone(), inputs.to_vec(), 0));
		AcceptOutcome::Accepted { evicted: Vec::new() }
	}

	fn check(&mut self) {}

	// A stand-in for "deeper in the dependency chain wins, fee rate breaks
	// ties": this harness has no notion of chain depth, so it orders by
	// fee rate alone (higher wins) with the txid as a deterministic
	// tiebreaker, which is enough to drive the egress ordering tests.
	fn compare_depth_and_score(&self, a: Txid, b: Txid) -> Ordering {
		let fee_rates = self.fee_rates.borrow();
		let fee_a = fee_rates.get(&a).copied().unwrap_or(1);
		let fee_b = fee_rates.get(&b).copied().unwrap_or(1);
		fee_a.cmp(&fee_b).then_with(|| a.cmp(&b))
	}

	fn size(&self) -> usize {
		self.held.borrow().len()
	}
}

/// A chain view stand-in with a mutable tip and a UTXO cache a test can
/// populate directly, independent of what `FakeMempool` considers spent.
pub struct FakeChain {
	tip: RefCell<BlockHash>,
	cache: RefCell<std::collections::HashSet<Outpoint>>,
}

impl FakeChain {
	pub fn new() -> FakeChain {
		FakeChain {
			tip: RefCell::new(BlockHash::ZERO),
			cache: RefCell::new(std::collections::HashSet::new()),
		}
	}

	pub fn set_tip(&self, tip: BlockHash) {
		*self.tip.borrow_mut() = tip;
	}

	pub fn mark_confirmed(&self, txid: Txid, index: u32) {
		self.cache.borrow_mut().insert(Outpoint::new(txid, index));
	}
}

impl ChainView for FakeChain {
	fn tip(&self) -> BlockHash {
		*self.tip.borrow()
	}

	fn have_coin_in_cache(&self, txid: Txid, index: u32) -> bool {
		self.cache.borrow().contains(&Outpoint::new(txid, index))
	}
}

/// Records every outbound action the pipelines take, so tests can assert
/// on what would have gone out over the wire without a real socket.
#[derive(Default)]
pub struct RecordingNet {
	pub sent_tx: RefCell<Vec<(PeerId, Txid)>>,
	pub rejects: RefCell<Vec<(PeerId, u16, String, Txid)>>,
	pub broadcasts: RefCell<Vec<Txid>>,
	pub asked: RefCell<Vec<(PeerId, Txid)>>,
	pub known: RefCell<Vec<(PeerId, Txid)>>,
	pub misbehavior: RefCell<Vec<(PeerId, u32)>>,
	pub compact_extra: RefCell<Vec<Txid>>,
	pub inv_batches: RefCell<Vec<(PeerId, Vec<Txid>)>>,
}

impl RecordingNet {
	pub fn new() -> RecordingNet {
		RecordingNet::default()
	}
}

impl NetOut for RecordingNet {
	fn send_tx(&self, peer: PeerId, tx: &TxRef, _flags: FetchFlags) {
		self.sent_tx.borrow_mut().push((peer, tx.txid()));
	}

	fn send_reject(&self, peer: PeerId, code: u16, reason: &str, txid: Txid) {
		self.rejects.borrow_mut().push((peer, code, reason.to_string(), txid));
	}

	fn broadcast(&self, txid: Txid) {
		self.broadcasts.borrow_mut().push(txid);
	}

	fn ask_for_transaction(&self, peer: PeerId, txid: Txid, _flags: FetchFlags) {
		self.asked.borrow_mut().push((peer, txid));
	}

	fn add_tx_inventory_known(&self, peer: PeerId, txid: Txid, _flags: FetchFlags) {
		self.known.borrow_mut().push((peer, txid));
	}

	fn misbehave(&self, peer: PeerId, score: u32) {
		self.misbehavior.borrow_mut().push((peer, score));
	}

	fn add_to_compact_extra_pool(&self, tx: &TxRef) {
		self.compact_extra.borrow_mut().push(tx.txid());
	}

	fn send_inv(&self, peer: PeerId, batch: &[Txid]) {
		self.inv_batches.borrow_mut().push((peer, batch.to_vec()));
	}
}

/// A bloom filter stand-in that matches an explicit allow-list of txids.
#[derive(Default)]
pub struct FakeBloom(pub std::collections::HashSet<Txid>);

impl FakeBloom {
	pub fn allow(txids: impl IntoIterator<Item = Txid>) -> FakeBloom {
		FakeBloom(txids.into_iter().collect())
	}
}

impl BloomFilter for FakeBloom {
	fn matches(&self, tx: &TxRef) -> bool {
		self.0.contains(&tx.txid())
	}
}

/// Build a distinct transaction from a byte tag, for readable test setup.
pub fn tx(tag: u8) -> TxRef {
	TxRef::new(vec![tag; 8], false)
}

/// Build an outpoint, for readable test setup.
pub fn op(tag: u8, index: u32) -> Outpoint {
	Outpoint::new(tx(tag).txid(), index)
}

/// An ordinary peer that has asked to relay transactions.
pub fn relaying_peer(id: u64) -> PeerCtx {
	PeerCtx::new(PeerId(id), PeerFlags::RELAY_TX, false)
}

/// A whitelisted peer that has not asked to relay transactions, for
/// exercising the whitelist gates independently of the relay flag.
pub fn whitelisted_peer(id: u64) -> PeerCtx {
	PeerCtx::new(PeerId(id), PeerFlags::WHITELIST, false)
}
