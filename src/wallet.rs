// File: src/wallet.rs
//
// Pre-created Wallet Files
//
// Participant nodes would normally create their wallet interactively and
// prompt for passwords on first start. The harness sidesteps the prompt by
// writing the wallet file itself, with a blank wallet-level password and a
// fixed key-encryption passphrase. Test-only: a real deployment never
// writes plaintext wallet seeds.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const WALLET_FILE_NAME: &str = "wallet.json";
const WALLET_FORMAT_VERSION: u32 = 1;

/// Seed document a node loads instead of running its first-start prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletFile {
    pub version: u32,
    /// Wallet-level password; blank so the node opens it without asking.
    pub password: String,
    /// Passphrase protecting imported private keys.
    pub key_passphrase: String,
}

impl WalletFile {
    pub fn new(password: &str, key_passphrase: &str) -> Self {
        Self {
            version: WALLET_FORMAT_VERSION,
            password: password.to_string(),
            key_passphrase: key_passphrase.to_string(),
        }
    }

    /// Write `wallet.json` into `dir` and return its path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(WALLET_FILE_NAME);
        let file = std::fs::File::create(&path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(path)
    }
}
