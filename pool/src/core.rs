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

//! `RelayCore` bundles the state this subsystem actually owns: the
//! recent-rejects filter, the relay cache and the orphan pool, plus the
//! node's policy configuration. Per the design notes (§9), this is a
//! composition decision, not a type-system one — nothing stops a caller
//! from holding several instances — but in practice one `RelayCore` per
//! node, guarded by the same coarse lock that guards the mempool and UTXO
//! view it's called alongside (§5), is the intended shape.

use crate::orphan_pool::OrphanPool;
use crate::relay_cache::RelayCache;
use crate::rejects::RecentRejectsFilter;
use crate::types::RelayConfig;

/// Owns every piece of mutable state this core is responsible for.
pub struct RelayCore {
	pub(crate) rejects: RecentRejectsFilter,
	pub(crate) relay_cache: RelayCache,
	pub(crate) orphans: OrphanPool,
	pub(crate) config: RelayConfig,
}

impl RelayCore {
	/// Build a fresh core with the given policy configuration.
	pub fn new(config: RelayConfig) -> RelayCore {
		RelayCore {
			rejects: RecentRejectsFilter::new(),
			relay_cache: RelayCache::new(),
			orphans: OrphanPool::new(),
			config,
		}
	}

	/// Number of orphans currently parked.
	pub fn orphan_count(&self) -> usize {
		self.orphans.len()
	}

	/// Number of live relay-cache entries.
	pub fn relay_cache_len(&self) -> usize {
		self.relay_cache.len()
	}

	/// Read-only access to the configuration.
	pub fn config(&self) -> &RelayConfig {
		&self.config
	}
}
