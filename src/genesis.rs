// File: src/genesis.rs
//
// Genesis Allocation
//
// The initial balance assignment seeded into the ledger at trust-delegate
// startup. Written once into the delegate's working directory before its
// process launches; the delegate reads it only at startup, so the file is
// immutable from the harness's point of view afterwards.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};
use crate::keys::KeyPair;

pub const GENESIS_FILE_NAME: &str = "genesis.json";

/// One (derived address, initial balance) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenesisEntry {
    pub address: String,
    pub amount: u64,
}

/// Ordered initial balance assignment, one entry per participant.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenesisAllocation {
    pub supply: u64,
    pub balances: Vec<GenesisEntry>,
}

impl GenesisAllocation {
    /// Build an allocation granting `amount_each` to every key's address.
    ///
    /// Fails if two keys derive the same address: the delegate would
    /// otherwise silently collapse the duplicate entries.
    pub fn for_keys(keys: &[KeyPair], amount_each: u64) -> Result<Self> {
        let mut allocation = Self::default();
        for keypair in keys {
            allocation.push(keypair.address(), amount_each)?;
        }
        Ok(allocation)
    }

    pub fn push(&mut self, address: String, amount: u64) -> Result<()> {
        if self.balances.iter().any(|entry| entry.address == address) {
            return Err(HarnessError::Protocol {
                endpoint: "genesis".to_string(),
                message: format!("duplicate genesis address {address}"),
            });
        }
        self.supply += amount;
        self.balances.push(GenesisEntry { address, amount });
        Ok(())
    }

    pub fn amount_for(&self, address: &str) -> Option<u64> {
        self.balances
            .iter()
            .find(|entry| entry.address == address)
            .map(|entry| entry.amount)
    }

    /// Write `genesis.json` into `dir` and return its path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(GENESIS_FILE_NAME);
        let file = std::fs::File::create(&path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(path)
    }
}
