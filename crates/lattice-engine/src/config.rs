// Copyright 2025 eraflo
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

//! Engine configuration.

use lattice_pool::PoolConfig;
use serde::{Deserialize, Serialize};

/// Settings for a [`LinearAlgebraEngine`](crate::LinearAlgebraEngine).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Settings for the engine's worker pool.
    pub pool: PoolConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_pool_settings_load_from_json() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "pool": { "num_workers": 2, "fatigue_seed": 9 } }"#).unwrap();
        assert_eq!(config.pool.num_workers, 2);
        assert_eq!(config.pool.fatigue_seed, Some(9));
        assert_eq!(config.pool.thread_name_prefix, "lattice-worker");

        let empty: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, EngineConfig::default());
    }
}
