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

//! The egress pipeline (component C6): turning held state back into wire
//! traffic, on the three paths a peer drives — periodic inventory
//! announcements (a full mempool dump, a drain of the pending set, or
//! both combined in one round) and on-demand fetches (§4.6).

use log::trace;

use crate::collaborators::{BloomFilter, Mempool, NetOut};
use crate::core::RelayCore;
use crate::types::{consts, FetchFlags, PeerId, Timestamp, Txid};

/// Append `txid` to `batch`, flushing it as one `INV` message the moment
/// it reaches the wire maximum.
fn push_and_maybe_flush<N: NetOut>(net: &N, peer: PeerId, batch: &mut Vec<Txid>, txid: Txid) {
	batch.push(txid);
	if batch.len() >= consts::MAX_INV_SZ {
		net.send_inv(peer, batch);
		batch.clear();
	}
}

impl RelayCore {
	/// Build the next round of inventory to announce to `peer` (§4.6).
	///
	/// When `send_whole_mempool` is set, every mempool entry that survives
	/// `min_fee_rate` and the optional bloom filter is advertised and
	/// dropped from `to_send` so it isn't announced twice. Independently,
	/// whatever remains in `to_send` (the caller's per-peer pending set)
	/// is drained in topological order — deepest in the mempool's
	/// dependency chain first, fee rate breaking ties — up to
	/// `consts::INVENTORY_BROADCAST_MAX` transactions; anything left over
	/// stays in `to_send` for the next round. Both paths funnel into the
	/// same outbound batch, flushed at `consts::MAX_INV_SZ` and once more
	/// when the round ends.
	pub fn build_inventory<M: Mempool, N: NetOut>(
		&mut self,
		mempool: &M,
		net: &N,
		peer: PeerId,
		send_whole_mempool: bool,
		min_fee_rate: u64,
		bloom: Option<&dyn BloomFilter>,
		to_send: &mut Vec<Txid>,
		have_sent: &mut Vec<Txid>,
		now: Timestamp,
	) {
		let mut batch: Vec<Txid> = Vec::new();

		if send_whole_mempool {
			for info in mempool.info_all() {
				if info.fee_rate < min_fee_rate {
					continue;
				}
				if let Some(filter) = bloom {
					if !filter.matches(&info.tx) {
						continue;
					}
				}
				let txid = info.tx.txid();
				have_sent.push(txid);
				to_send.retain(|t| *t != txid);
				push_and_maybe_flush(net, peer, &mut batch, txid);
			}
		}

		if !to_send.is_empty() {
			// Step 1: expire is the only shrinking path for the cache, and
			// is called lazily at the start of each egress round.
			self.relay_cache.expire(now);

			// Step 2: heapify under "deeper wins, fee rate breaks ties".
			let mut pending = std::mem::take(to_send);
			pending.sort_by(|a, b| mempool.compare_depth_and_score(*b, *a));

			// Step 3/4: repeatedly pop the max element until the pending
			// set is empty or the per-round cap is reached.
			let mut relayed = 0usize;
			let mut idx = 0usize;
			while idx < pending.len() && relayed < consts::INVENTORY_BROADCAST_MAX {
				let txid = pending[idx];
				idx += 1;

				let info = match mempool.info(txid) {
					Some(info) => info,
					None => continue,
				};
				if info.fee_rate < min_fee_rate {
					continue;
				}
				if let Some(filter) = bloom {
					if !filter.matches(&info.tx) {
						continue;
					}
				}

				have_sent.push(txid);
				self.relay_cache.publish(info.tx.clone(), now);
				push_and_maybe_flush(net, peer, &mut batch, txid);
				relayed += 1;
			}

			if idx < pending.len() {
				trace!(
					"egress round for peer {:?} hit INVENTORY_BROADCAST_MAX, {} left pending",
					peer,
					pending.len() - idx
				);
			}
			*to_send = pending.split_off(idx);
		}

		if !batch.is_empty() {
			net.send_inv(peer, &batch);
		}
	}

	/// Serve a single `GETDATA`-style fetch for `txid` from `peer` (§4.6).
	///
	/// Tries the relay cache first, so a transaction we advertised but
	/// have since evicted from the mempool is still servable for up to
	/// its 15-minute window. Falls back to the mempool, but only if the
	/// transaction was admitted at or before `last_mempool_req_time` — the
	/// gate that keeps a peer that hasn't recently asked for the whole
	/// pool from being able to infer exactly when something new landed.
	pub fn serve_fetch<M: Mempool, N: NetOut>(
		&mut self,
		mempool: &M,
		net: &N,
		peer: PeerId,
		txid: Txid,
		want_witness: bool,
		last_mempool_req_time: Timestamp,
		now: Timestamp,
	) -> bool {
		self.relay_cache.expire(now);

		let flags = if want_witness {
			FetchFlags::WITNESS
		} else {
			FetchFlags::empty()
		};

		if let Some(tx) = self.relay_cache.lookup(txid) {
			net.send_tx(peer, &tx, flags);
			return true;
		}

		if let Some(info) = mempool.info(txid) {
			if info.time <= last_mempool_req_time {
				net.send_tx(peer, &info.tx, flags);
				return true;
			}
		}

		false
	}
}
