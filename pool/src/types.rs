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

//! Base value types shared by every component of the ingress/egress core:
//! content-addressed transaction references, outpoints, peer context and
//! the handful of wire-compatible constants that callers must match exactly.

use std::fmt;
use std::sync::Arc;

use blake2_rfc::blake2b::blake2b;

/// Microseconds since the Unix epoch. Always supplied by the caller; this
/// core never samples the system clock itself, which keeps every operation
/// a pure function of its inputs and easy to drive from tests.
pub type Timestamp = i64;

/// A 256-bit content hash, used both for transaction ids and block hashes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
	/// The all-zero hash, used as a sentinel "no tip yet" value.
	pub const ZERO: Hash = Hash([0u8; 32]);

	/// Hash an arbitrary byte slice into a `Hash`, the same way every
	/// content-addressed identifier in this crate is derived.
	pub fn of(bytes: &[u8]) -> Hash {
		let digest = blake2b(32, &[], bytes);
		let mut out = [0u8; 32];
		out.copy_from_slice(digest.as_bytes());
		Hash(out)
	}
}

impl fmt::Display for Hash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for b in self.0.iter() {
			write!(f, "{:02x}", b)?;
		}
		Ok(())
	}
}

/// Identifies a transaction by the content hash of its serialized form.
pub type Txid = Hash;

/// Identifies a block, used only to detect chain-tip changes.
pub type BlockHash = Hash;

/// A transaction as seen by this core: an immutable, content-addressed,
/// reference-counted blob. The core never inspects or mutates the payload;
/// all it needs is the txid, the serialized bytes (for size and relay) and
/// whether the encoding carries witness data.
#[derive(Clone)]
pub struct TxRef(Arc<TxRefInner>);

struct TxRefInner {
	txid: Txid,
	bytes: Vec<u8>,
	has_witness: bool,
}

impl TxRef {
	/// Wrap a serialized transaction, deriving its txid from the bytes.
	pub fn new(bytes: Vec<u8>, has_witness: bool) -> TxRef {
		let txid = Hash::of(&bytes);
		TxRef(Arc::new(TxRefInner {
			txid,
			bytes,
			has_witness,
		}))
	}

	/// The transaction's id.
	pub fn txid(&self) -> Txid {
		self.0.txid
	}

	/// The serialized bytes, witness included.
	pub fn bytes(&self) -> &[u8] {
		&self.0.bytes
	}

	/// Size of the serialized transaction, as used by the 100 kB
	/// compact-extra-pool cutoff.
	pub fn size(&self) -> usize {
		self.0.bytes.len()
	}

	/// Whether the serialized encoding carries witness data.
	pub fn has_witness(&self) -> bool {
		self.0.has_witness
	}

	/// Serialized bytes to hand to the wire-serialization layer for a peer
	/// that may or may not want witness data; actual stripping happens
	/// there, this just threads the request through.
	pub fn bytes_for(&self, _want_witness: bool) -> &[u8] {
		&self.0.bytes
	}
}

impl PartialEq for TxRef {
	fn eq(&self, other: &TxRef) -> bool {
		self.txid() == other.txid()
	}
}
impl Eq for TxRef {}

/// A single consumable output: the transaction that created it and the
/// output index within that transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Outpoint {
	/// Txid of the transaction that created the output.
	pub txid: Txid,
	/// Output index within that transaction.
	pub index: u32,
}

impl Outpoint {
	/// Build an outpoint.
	pub fn new(txid: Txid, index: u32) -> Outpoint {
		Outpoint { txid, index }
	}
}

/// Opaque peer identifier, stable for the lifetime of a connection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u64);

bitflags! {
	/// Per-peer policy flags, mirroring the subset of peer state the
	/// ingress/egress pipelines need to make gating decisions.
	pub struct PeerFlags: u32 {
		/// Peer has asked to receive/relay transactions.
		const RELAY_TX = 0b0000_0001;
		/// Peer is on the node's whitelist.
		const WHITELIST = 0b0000_0010;
		/// Peer negotiated witness-carrying transaction relay.
		const WITNESS = 0b0000_0100;
	}
}

bitflags! {
	/// Output flags the ingress pipeline sets on a peer as a side effect of
	/// processing one message, for the caller to act on afterwards.
	pub struct PeerOutFlags: u32 {
		/// At least one new transaction was admitted to the mempool as a
		/// direct or recursive result of this call.
		const NEW_TRANSACTION = 0b0000_0001;
	}
}

bitflags! {
	/// Flags attached to a `GETDATA`-style fetch request, so the network
	/// layer knows whether to include witness data.
	pub struct FetchFlags: u32 {
		/// Requester wants witness-serialized data.
		const WITNESS = 0b0000_0001;
	}
}

/// Per-peer context supplied by the caller; this core never owns peer
/// bookkeeping, only reads and updates the fields it is responsible for.
pub struct PeerCtx {
	/// Stable peer identifier.
	pub peer_id: PeerId,
	/// Policy flags for this peer.
	pub flags: PeerFlags,
	/// Local node services relevant to fetch-flag negotiation (witness bit).
	pub local_services_witness: bool,
	/// Misbehavior accumulator; the caller disconnects once this crosses an
	/// external threshold. This core only ever adds to it.
	pub out_misbehavior_score: u32,
	/// Flags the ingress pipeline sets for the caller to observe.
	pub out_flags: PeerOutFlags,
}

impl PeerCtx {
	/// Construct a fresh peer context with no flags set.
	pub fn new(peer_id: PeerId, flags: PeerFlags, local_services_witness: bool) -> PeerCtx {
		PeerCtx {
			peer_id,
			flags,
			local_services_witness,
			out_misbehavior_score: 0,
			out_flags: PeerOutFlags::empty(),
		}
	}

	/// Negotiated fetch flags for requesting a transaction from this peer:
	/// witness data only if both sides support it.
	pub fn fetch_flags(&self, peer_witness: bool) -> FetchFlags {
		if self.local_services_witness && peer_witness {
			FetchFlags::WITNESS
		} else {
			FetchFlags::empty()
		}
	}
}

/// Configuration the external node provides (§6 `Config`).
pub struct RelayConfig {
	/// Relay to non-relaying whitelisted peers anyway.
	pub whitelistrelay: bool,
	/// Force-relay already-known transactions from whitelisted peers.
	pub whitelistforcerelay: bool,
	/// Maximum number of orphan transactions held at once (invariant O2).
	pub max_orphan_tx: usize,
}

impl Default for RelayConfig {
	fn default() -> RelayConfig {
		RelayConfig {
			whitelistrelay: false,
			whitelistforcerelay: false,
			max_orphan_tx: 100,
		}
	}
}

/// Truncate `reason` to at most `consts::MAX_REJECT_MESSAGE_LENGTH` bytes,
/// respecting UTF-8 character boundaries, the way a `REJECT` message's
/// reason field must be before it reaches the wire.
pub fn truncate_reject_reason(reason: &str) -> &str {
	if reason.len() <= consts::MAX_REJECT_MESSAGE_LENGTH {
		return reason;
	}
	let mut end = consts::MAX_REJECT_MESSAGE_LENGTH;
	while !reason.is_char_boundary(end) {
		end -= 1;
	}
	&reason[..end]
}

/// Wire-compatible constants; values are mandated by §6 of the design and
/// must not be tuned without breaking interoperability.
pub mod consts {
	use super::Timestamp;

	/// Number of elements the recent-rejects filter is sized for.
	pub const REJECTS_FILTER_ELEMENTS: usize = 120_000;
	/// False-positive rate the recent-rejects filter is sized for.
	pub const REJECTS_FILTER_FP_RATE: f64 = 0.000_001;

	/// Relay cache entry lifetime, expressed in the same microsecond units
	/// as `Timestamp`.
	pub const RELAY_CACHE_TTL_MICROS: Timestamp = 15 * 60 * 1_000_000;

	/// Maximum number of entries batched into one `INV` message.
	pub const MAX_INV_SZ: usize = 50_000;

	/// Per-round cap on transactions relayed from a peer's pending set, so
	/// one egress round can't be made to dump an unbounded backlog: 7
	/// transactions per second over a 5-second broadcast interval.
	pub const INVENTORY_BROADCAST_MAX: usize = 35;

	/// Maximum length of a `REJECT` message's human-readable reason string.
	pub const MAX_REJECT_MESSAGE_LENGTH: usize = 111;

	/// Reject codes at or above this value are internal bookkeeping and are
	/// never placed on the wire.
	pub const REJECT_INTERNAL: u16 = 0x100;
	/// Serialized-size cutoff under which a transaction may be handed to the
	/// compact-block extra pool.
	pub const COMPACT_EXTRA_MAX_BYTES: usize = 100_000;
}
