// Copyright 2026 Boundless Foundation, Inc.
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

use std::path::Path;

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};

use crate::{entities::address_id, error::ContextError};

/// Dampening point used before any fork applies.
pub const DEFAULT_DAMPENING_POINT: u64 = 1_000;
/// Dampening point on mainnet from [MAINNET_DAMPENING_FORK_BLOCK] on.
pub const FORKED_DAMPENING_POINT: u64 = 100_000;
pub const MAINNET_DAMPENING_FORK_BLOCK: u64 = 13_987_000;

/// Page size for chunked listings.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// Addresses of the contracts whose events feed the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    /// Emits producer and reward schedule events. Owns the producer set and reward schedule.
    pub governance: Address,
    /// Merkle distributor. Owns the distributor singleton.
    pub distributor: Address,
    /// Staking and slot auction contract. Owns the network singleton.
    pub network: Address,
    pub token: Address,
}

/// A block from which a new dampening point applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DampeningFork {
    pub from_block: u64,
    pub dampening_point: u64,
}

/// Dampening point as a function of block number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DampeningSchedule {
    #[serde(default = "default_dampening_point")]
    pub initial: u64,
    #[serde(default)]
    pub forks: Vec<DampeningFork>,
}

fn default_dampening_point() -> u64 {
    DEFAULT_DAMPENING_POINT
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for DampeningSchedule {
    fn default() -> Self {
        Self { initial: DEFAULT_DAMPENING_POINT, forks: Vec::new() }
    }
}

impl DampeningSchedule {
    pub fn dampening_point(&self, block_number: u64) -> u64 {
        self.forks
            .iter()
            .filter(|fork| fork.from_block <= block_number)
            .max_by_key(|fork| fork.from_block)
            .map_or(self.initial, |fork| fork.dampening_point)
    }
}

/// Immutable per-network parameters passed to every handler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerContext {
    pub network: String,
    pub contracts: ContractAddresses,
    #[serde(default)]
    pub dampening: DampeningSchedule,
    /// Treasury addresses excluded from circulating supply, besides the zero address.
    #[serde(default)]
    pub non_circulating: Vec<Address>,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

impl LedgerContext {
    pub fn mainnet() -> Self {
        Self {
            network: "mainnet".into(),
            contracts: ContractAddresses {
                governance: address!("0x726adc632871ff796379da14f9d5aeb199bed505"),
                distributor: address!("0xbf5cbdfc6ef9b56501edf1d4ac97bf021e595340"),
                network: address!("0x9e3382ca57f4404ac7bf435475eae37e87d1c453"),
                token: address!("0x1559fa1b8f28238fd5d76d9f434ad86fd20d1559"),
            },
            dampening: DampeningSchedule {
                initial: DEFAULT_DAMPENING_POINT,
                forks: vec![DampeningFork {
                    from_block: MAINNET_DAMPENING_FORK_BLOCK,
                    dampening_point: FORKED_DAMPENING_POINT,
                }],
            },
            non_circulating: vec![
                address!("0xae9687192c9a640b93b758818cc1ca3d0263cbb4"),
                address!("0xe30ff60c19a9abd1a45c8656bd9f180fc80e91d6"),
            ],
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn ropsten() -> Self {
        Self {
            network: "ropsten".into(),
            contracts: ContractAddresses {
                governance: address!("0x2ee6af00afd2470f4421f4f5198bd4b30efcbee2"),
                distributor: address!("0x7115c01915a5f48c6ee9135becba67ead4faf180"),
                network: address!("0xaa75de4acc8590cf8299106b24656cda2357c458"),
                token: address!("0x1559fa1b8f28238fd5d76d9f434ad86fd20d1559"),
            },
            dampening: DampeningSchedule::default(),
            non_circulating: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Lookup a built-in deployment by network name.
    pub fn for_network(name: &str) -> Result<Self, ContextError> {
        match name {
            "mainnet" => Ok(Self::mainnet()),
            "ropsten" => Ok(Self::ropsten()),
            other => Err(ContextError::UnknownNetwork(other.to_string())),
        }
    }

    /// Load a context from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContextError> {
        let data = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&data)?)
    }

    pub fn dampening_point(&self, block_number: u64) -> u64 {
        self.dampening.dampening_point(block_number)
    }

    pub fn is_non_circulating(&self, account: Address) -> bool {
        account == Address::ZERO || self.non_circulating.contains(&account)
    }

    pub fn network_id(&self) -> String {
        address_id(self.contracts.network)
    }

    pub fn governance_id(&self) -> String {
        address_id(self.contracts.governance)
    }

    pub fn distributor_id(&self) -> String {
        address_id(self.contracts.distributor)
    }

    pub fn token_id(&self) -> String {
        address_id(self.contracts.token)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_mainnet_dampening_fork() {
        let ctx = LedgerContext::mainnet();
        assert_eq!(ctx.dampening_point(0), 1_000);
        assert_eq!(ctx.dampening_point(MAINNET_DAMPENING_FORK_BLOCK - 1), 1_000);
        assert_eq!(ctx.dampening_point(MAINNET_DAMPENING_FORK_BLOCK), 100_000);
        assert_eq!(ctx.dampening_point(u64::MAX), 100_000);
    }

    #[test]
    fn test_other_networks_never_fork() {
        let ctx = LedgerContext::ropsten();
        assert_eq!(ctx.dampening_point(MAINNET_DAMPENING_FORK_BLOCK + 1), 1_000);
    }

    #[test]
    fn test_latest_applicable_fork_wins() {
        let schedule = DampeningSchedule {
            initial: 10,
            forks: vec![
                DampeningFork { from_block: 200, dampening_point: 30 },
                DampeningFork { from_block: 100, dampening_point: 20 },
            ],
        };
        assert_eq!(schedule.dampening_point(99), 10);
        assert_eq!(schedule.dampening_point(150), 20);
        assert_eq!(schedule.dampening_point(200), 30);
    }

    #[test]
    fn test_non_circulating() {
        let ctx = LedgerContext::mainnet();
        assert!(ctx.is_non_circulating(Address::ZERO));
        assert!(ctx.is_non_circulating(address!("0xae9687192c9a640b93b758818cc1ca3d0263cbb4")));
        assert!(!ctx.is_non_circulating(Address::repeat_byte(7)));
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
network = "devnet"
non_circulating = ["0x00000000000000000000000000000000000000aa"]

[contracts]
governance = "0x0000000000000000000000000000000000000001"
distributor = "0x0000000000000000000000000000000000000002"
network = "0x0000000000000000000000000000000000000003"
token = "0x0000000000000000000000000000000000000004"

[[dampening.forks]]
from_block = 50
dampening_point = 5000
"#
        )
        .unwrap();

        let ctx = LedgerContext::load(file.path()).unwrap();
        assert_eq!(ctx.network, "devnet");
        assert_eq!(ctx.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(ctx.dampening_point(49), DEFAULT_DAMPENING_POINT);
        assert_eq!(ctx.dampening_point(50), 5000);
        assert_eq!(ctx.network_id(), "0x0000000000000000000000000000000000000003");
        assert_eq!(ctx.non_circulating.len(), 1);
    }

    #[test]
    fn test_unknown_network() {
        assert!(matches!(
            LedgerContext::for_network("kovan"),
            Err(ContextError::UnknownNetwork(name)) if name == "kovan"
        ));
    }
}
