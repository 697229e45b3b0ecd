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

pub mod common;

use common::*;
use relay_pool::types::RelayConfig;
use relay_pool::RelayCore;

/// §4.7: a disconnecting peer's parked orphans are dropped, and only
/// theirs.
#[test]
fn peer_disconnect_drops_only_that_peers_orphans() {
	let mut core = RelayCore::new(RelayConfig::default());
	let mut mempool = FakeMempool::new();
	let chain = FakeChain::new();
	let net = RecordingNet::new();

	let mut peer_a = relaying_peer(1);
	let mut peer_b = relaying_peer(2);

	// Both orphans are missing a parent, so both park.
	core.on_tx(&mut mempool, &chain, &net, &mut peer_a, tx(1), vec![op(10, 0)], 1, 0);
	core.on_tx(&mut mempool, &chain, &net, &mut peer_b, tx(2), vec![op(11, 0)], 1, 0);
	assert_eq!(core.orphan_count(), 2);

	core.on_peer_disconnect(peer_a.peer_id);
	assert_eq!(core.orphan_count(), 1);

	core.on_peer_disconnect(peer_b.peer_id);
	assert_eq!(core.orphan_count(), 0);
}

/// §4.7: a newly connected block drops every orphan that spends one of
/// the outpoints the block just consumed, whether or not that orphan's
/// own transaction happened to be among the block's own contents.
#[test]
fn block_connected_drops_orphans_spending_its_consumed_outpoints() {
	let mut core = RelayCore::new(RelayConfig::default());
	let mut mempool = FakeMempool::new();
	let chain = FakeChain::new();
	let net = RecordingNet::new();
	let mut peer = relaying_peer(1);

	// Orphan spends an outpoint the incoming block will consume.
	core.on_tx(&mut mempool, &chain, &net, &mut peer, tx(1), vec![op(10, 0)], 1, 0);
	// An unrelated orphan, spending something the block never touches.
	core.on_tx(&mut mempool, &chain, &net, &mut peer, tx(2), vec![op(20, 0)], 1, 0);
	assert_eq!(core.orphan_count(), 2);

	core.on_block_connected(&chain, &[op(10, 0)]);

	assert_eq!(core.orphan_count(), 1);
}

/// §4.7 / invariant R1: `on_block_connected` touches the rejects filter
/// against the new tip, so the reset happens immediately rather than
/// being deferred to the next `on_tx`.
#[test]
fn block_connected_resets_rejects_filter_for_new_tip() {
	let mut core = RelayCore::new(RelayConfig::default());
	let mut mempool = FakeMempool::new();
	let chain = FakeChain::new();
	let net = RecordingNet::new();
	let mut peer = relaying_peer(1);

	let txid = tx(1).txid();
	mempool.force_invalid(txid);
	core.on_tx(&mut mempool, &chain, &net, &mut peer, tx(1), vec![], 1, 0);
	assert_eq!(mempool.accept_call_count(txid), 1);

	// Resending now short-circuits via the rejects filter under the old
	// tip: `exists` is true, so the ingress pipeline never calls the
	// validator a second time.
	core.on_tx(&mut mempool, &chain, &net, &mut peer, tx(1), vec![], 1, 1_000);
	assert_eq!(mempool.accept_call_count(txid), 1);

	// A new block moves the tip; the filter must reset immediately
	// rather than waiting for the next `on_tx`.
	chain.set_tip(relay_pool::types::BlockHash([7u8; 32]));
	core.on_block_connected(&chain, &[]);

	// `exists` is now false again, so the ingress pipeline re-validates
	// tx(1) from scratch -- a second call into the mempool.
	core.on_tx(&mut mempool, &chain, &net, &mut peer, tx(1), vec![], 1, 2_000);
	assert_eq!(mempool.accept_call_count(txid), 2);
}
