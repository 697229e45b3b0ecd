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

//! Loading `RelayConfig` (§6 `Config`) from the node's TOML configuration
//! file. The core itself never touches the filesystem; this is the
//! boundary the rest of the node crosses to hand us a `RelayConfig`.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::types::RelayConfig;

/// Error loading or parsing the `[relay]` section of the node's config.
#[derive(Debug)]
pub enum ConfigError {
	/// The file could not be read.
	FileIOError(String, String),
	/// The file's contents were not valid TOML, or didn't match the
	/// expected shape.
	ParseError(String, String),
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			ConfigError::FileIOError(ref file_name, ref message) => {
				write!(f, "{} {}", message, file_name)
			}
			ConfigError::ParseError(ref file_name, ref message) => write!(
				f,
				"Error parsing configuration file at {} - {}",
				file_name, message
			),
		}
	}
}

impl From<io::Error> for ConfigError {
	fn from(error: io::Error) -> ConfigError {
		ConfigError::FileIOError(String::new(), format!("Error loading config file: {}", error))
	}
}

#[derive(Debug, Deserialize)]
struct RelayConfigToml {
	#[serde(default)]
	whitelistrelay: bool,
	#[serde(default)]
	whitelistforcerelay: bool,
	#[serde(default = "default_max_orphan_tx")]
	max_orphan_tx: usize,
}

fn default_max_orphan_tx() -> usize {
	RelayConfig::default().max_orphan_tx
}

#[derive(Debug, Deserialize)]
struct GlobalConfig {
	relay: Option<RelayConfigToml>,
}

/// Read the `[relay]` table out of the node's TOML config file, falling
/// back to `RelayConfig::default()` field-by-field for anything the table
/// omits or for a missing `[relay]` section entirely.
pub fn load_relay_config(path: &Path) -> Result<RelayConfig, ConfigError> {
	let mut file = File::open(path)?;
	let mut contents = String::new();
	file.read_to_string(&mut contents)?;

	let parsed: GlobalConfig = toml::from_str(&contents).map_err(|e| {
		ConfigError::ParseError(path.display().to_string(), e.to_string())
	})?;

	Ok(match parsed.relay {
		Some(relay) => RelayConfig {
			whitelistrelay: relay.whitelistrelay,
			whitelistforcerelay: relay.whitelistforcerelay,
			max_orphan_tx: relay.max_orphan_tx,
		},
		None => RelayConfig::default(),
	})
}
