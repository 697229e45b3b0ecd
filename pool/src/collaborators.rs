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

//! Contracts for the collaborators this core consumes but does not own
//! (§6): the mempool, the chain/UTXO view, the outbound network sink and
//! the per-node configuration. Each is a trait, not a concrete type, so a
//! test harness can supply in-memory stubs (§9) without pulling in a real
//! consensus engine or socket layer.

use crate::types::{Outpoint, PeerId, Timestamp, TxRef, Txid};

/// Outcome of handing a transaction to the external validator.
pub enum AcceptOutcome {
	/// The transaction was admitted to the mempool.
	Accepted {
		/// Transactions the mempool evicted to make room, forwarded to the
		/// compact-block extra pool (§4.5.8).
		evicted: Vec<TxRef>,
	},
	/// One or more inputs could not be resolved against the mempool or
	/// UTXO set; the transaction is a candidate for the orphan pool. Carries
	/// every input of the transaction (not just the unresolved ones) since
	/// the ingress pipeline needs the full set to mark known inventory and
	/// to index the orphan by everything it depends on.
	MissingInputs {
		/// Every outpoint this transaction spends.
		inputs: Vec<Outpoint>,
	},
	/// The transaction was rejected.
	Invalid(ValidationState),
}

/// Validation failure detail (§4.5, §7).
#[derive(Clone)]
pub struct ValidationState {
	/// Misbehavior penalty to assign the originating peer; 0 means a pure
	/// policy/standardness failure rather than a protocol violation.
	pub dos_score: u32,
	/// Wire reject code, if one should be reported; codes at or above
	/// `consts::REJECT_INTERNAL` are never sent (§7).
	pub reject_code: Option<u16>,
	/// Human-readable reason, truncated to `MAX_REJECT_MESSAGE_LENGTH`
	/// bytes before it reaches the wire.
	pub reason: String,
	/// Set when the bytes we saw might not be the only valid serialization
	/// of this transaction (e.g. signature malleability); gates the
	/// rejects-filter insert (§4.5 non-malleable rule).
	pub corruption_possible: bool,
}

impl ValidationState {
	/// A validation failure with no DoS implication and no wire reason.
	pub fn policy(reason: impl Into<String>) -> ValidationState {
		ValidationState {
			dos_score: 0,
			reject_code: None,
			reason: reason.into(),
			corruption_possible: false,
		}
	}
}

/// A transaction's known standing for this node; accessed via `info`.
pub struct MempoolInfo {
	/// The transaction itself.
	pub tx: TxRef,
	/// When it was admitted, used to gate `serve_fetch`'s timestamp check.
	pub time: Timestamp,
	/// Fee rate, used for the egress fee floor.
	pub fee_rate: u64,
}

/// The external mempool (§6 `Mempool`).
pub trait Mempool {
	/// Whether `txid` is already held.
	fn exists(&self, txid: Txid) -> bool;

	/// Metadata for a held transaction, if any.
	fn info(&self, txid: Txid) -> Option<MempoolInfo>;

	/// Every entry currently held, for the egress mempool dump.
	fn info_all(&self) -> Vec<MempoolInfo>;

	/// Run full consensus validation and either admit the transaction or
	/// report why it was refused.
	fn accept_to_mempool(&mut self, tx: &TxRef, inputs: &[Outpoint]) -> AcceptOutcome;

	/// Re-check mempool consistency against the current UTXO view; called
	/// after every acceptance (§4.5.4a).
	fn check(&mut self);

	/// Ordering used to heapify the egress pending set: deeper in the
	/// mempool's dependency chain wins; ties break on higher fee rate.
	fn compare_depth_and_score(&self, a: Txid, b: Txid) -> std::cmp::Ordering;

	/// Number of transactions held.
	fn size(&self) -> usize;
}

/// The external chain/UTXO view (§6 `ChainView`).
pub trait ChainView {
	/// Hash of the current active tip.
	fn tip(&self) -> crate::types::BlockHash;

	/// Best-effort "already confirmed" check: whether the UTXO cache holds
	/// output `index` for `txid`. Never authoritative for validity (§4.4).
	fn have_coin_in_cache(&self, txid: Txid, index: u32) -> bool;
}

/// Everything the ingress/egress pipelines send back out to the network
/// (§6 `NetOut`). Calls are treated as non-blocking enqueues; nothing here
/// may suspend (§5).
pub trait NetOut {
	/// Send a transaction to a peer.
	fn send_tx(&self, peer: PeerId, tx: &TxRef, flags: crate::types::FetchFlags);

	/// Send a `REJECT(tx, code, reason, txid)` message.
	fn send_reject(&self, peer: PeerId, code: u16, reason: &str, txid: Txid);

	/// Announce a txid's availability to every connected peer's inventory
	/// pipeline; observed by every peer's next egress round (§5).
	fn broadcast(&self, txid: Txid);

	/// Ask a specific peer for a transaction we don't have yet.
	fn ask_for_transaction(&self, peer: PeerId, txid: Txid, flags: crate::types::FetchFlags);

	/// Record that a peer already knows about a txid, so we don't
	/// re-advertise or re-request it needlessly.
	fn add_tx_inventory_known(&self, peer: PeerId, txid: Txid, flags: crate::types::FetchFlags);

	/// Apply a misbehavior penalty to a peer.
	fn misbehave(&self, peer: PeerId, score: u32);

	/// Hand a transaction to the external compact-block extra pool.
	fn add_to_compact_extra_pool(&self, tx: &TxRef);

	/// Flush a batch of advertised txids to a peer as one `INV` message
	/// (§4.6); called once the batch reaches `consts::MAX_INV_SZ`, and
	/// once more at the end of a round for whatever remains.
	fn send_inv(&self, peer: PeerId, batch: &[Txid]);
}

/// A peer-installed transaction filter (BIP37-style), consulted by the
/// egress pipeline so advertisements only include transactions the peer
/// actually asked to see (§4.6).
pub trait BloomFilter {
	/// Whether `tx` matches the filter.
	fn matches(&self, tx: &TxRef) -> bool;
}
