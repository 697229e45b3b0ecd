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

//! A rolling Bloom filter: a plain bit array addressed by `k` independent
//! hash functions, seeded so that the false-positive set correlates with
//! nothing outside this filter's own lifetime. Unlike a classic Bloom
//! filter it supports `reset`, which the recent-rejects filter uses every
//! time the chain tip moves (invariant R1).

use blake2_rfc::blake2b::blake2b;
use rand::{self, Rng};

/// A fixed-size Bloom filter sized for `n` elements at false-positive rate
/// `p`, with `k` hash functions derived by keying a single hash with a
/// rotating seed.
pub struct RollingBloomFilter {
	bits: Vec<u8>,
	num_bits: usize,
	num_hashes: u32,
	seed: u64,
}

impl RollingBloomFilter {
	/// Build a filter sized for `n` elements at false-positive rate `p`.
	pub fn new(n: usize, p: f64) -> RollingBloomFilter {
		let num_bits = optimal_num_bits(n, p);
		let num_hashes = optimal_num_hashes(n, num_bits);
		RollingBloomFilter {
			bits: vec![0u8; (num_bits + 7) / 8],
			num_bits,
			num_hashes,
			seed: random_seed(),
		}
	}

	/// Insert an element.
	pub fn insert(&mut self, data: &[u8]) {
		for i in 0..self.num_hashes {
			let bit = self.bit_index(data, i);
			self.bits[bit / 8] |= 1 << (bit % 8);
		}
	}

	/// Test membership. False positives are expected at the configured
	/// rate; false negatives never occur.
	pub fn contains(&self, data: &[u8]) -> bool {
		(0..self.num_hashes).all(|i| {
			let bit = self.bit_index(data, i);
			self.bits[bit / 8] & (1 << (bit % 8)) != 0
		})
	}

	/// Clear every bit and rotate the seed, so that the new filter's
	/// false-positive set is uncorrelated with the previous one's.
	pub fn reset(&mut self) {
		for b in self.bits.iter_mut() {
			*b = 0;
		}
		self.seed = random_seed();
	}

	fn bit_index(&self, data: &[u8], lane: u32) -> usize {
		let mut key = self.seed.to_le_bytes().to_vec();
		key.extend_from_slice(&lane.to_le_bytes());
		let digest = blake2b(8, &key, data);
		let bytes = digest.as_bytes();
		let mut buf = [0u8; 8];
		buf.copy_from_slice(&bytes[..8]);
		(u64::from_le_bytes(buf) % self.num_bits as u64) as usize
	}
}

fn random_seed() -> u64 {
	rand::thread_rng().gen()
}

/// Standard Bloom filter sizing formula: m = -(n ln p) / (ln 2)^2.
fn optimal_num_bits(n: usize, p: f64) -> usize {
	let n = n.max(1) as f64;
	let m = -(n * p.ln()) / (std::f64::consts::LN_2 * std::f64::consts::LN_2);
	m.ceil().max(8.0) as usize
}

/// Standard Bloom filter hash-count formula: k = (m / n) ln 2.
fn optimal_num_hashes(n: usize, num_bits: usize) -> u32 {
	let n = n.max(1) as f64;
	let k = (num_bits as f64 / n) * std::f64::consts::LN_2;
	k.round().max(1.0) as u32
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn inserted_elements_are_found() {
		let mut f = RollingBloomFilter::new(1000, 1e-6);
		for i in 0u32..200 {
			f.insert(&i.to_le_bytes());
		}
		for i in 0u32..200 {
			assert!(f.contains(&i.to_le_bytes()));
		}
	}

	#[test]
	fn reset_clears_membership() {
		let mut f = RollingBloomFilter::new(1000, 1e-6);
		f.insert(b"hello");
		assert!(f.contains(b"hello"));
		f.reset();
		assert!(!f.contains(b"hello"));
	}

	#[test]
	fn false_positive_rate_is_reasonable() {
		let mut f = RollingBloomFilter::new(10_000, 1e-6);
		for i in 0u32..10_000 {
			f.insert(&i.to_le_bytes());
		}
		let mut false_positives = 0u32;
		for i in 20_000u32..30_000 {
			if f.contains(&i.to_le_bytes()) {
				false_positives += 1;
			}
		}
		// Wildly generous bound so the test isn't flaky; a correct sizing
		// should keep this several orders of magnitude lower.
		assert!(false_positives < 50);
	}
}
