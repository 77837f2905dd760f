// File: src/config.rs
//
// Harness Configuration
//
// The original test fixture kept executable paths and the base RPC port in
// static globals; here the whole configuration is an explicit value built
// once and passed into the harness, so independent harness instances can
// run side by side (e.g. parallel CI jobs on disjoint port ranges).

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Username presented to every node's control endpoint.
pub const CONTROL_USERNAME: &str = "test";
/// Password presented to every node's control endpoint.
pub const CONTROL_PASSWORD: &str = "test";
/// Key-encryption passphrase baked into every pre-created wallet file.
pub const WALLET_PASSPHRASE: &str = "testtest";

/// Balance allocated to each participant in the genesis file.
pub const INITIAL_BALANCE: u64 = 100_000_000;
/// Amount moved by each round-robin transfer.
pub const TRANSFER_AMOUNT: u64 = 1_000_000;

/// Interval between convergence polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Deadline for a single transfer to become visible on the destination node.
pub const CONVERGENCE_TIMEOUT: Duration = Duration::from_secs(35);

fn default_config_dir() -> PathBuf {
    std::env::temp_dir().join("ledger_harness")
}

/// Everything the harness needs to know about its environment.
///
/// Doubles as the CLI surface of the `ledger-harness` binary; tests build
/// it programmatically instead.
#[derive(Debug, Clone, clap::Parser, Serialize, Deserialize)]
#[command(name = "ledger-harness", version, about = "Distributed ledger-node fleet test harness")]
pub struct HarnessConfig {
    /// Full path to the participant node executable under test
    #[clap(long, default_value = "target/debug/ledger-node")]
    pub node_exe: PathBuf,
    /// Full path to the trust-delegate server executable
    #[clap(long, default_value = "target/debug/ledger-delegate")]
    pub delegate_exe: PathBuf,
    /// Directory that will hold every node's isolated working directory
    #[clap(long, default_value_os_t = default_config_dir())]
    pub config_dir: PathBuf,
    /// First control port; node i binds base_control_port + i
    #[clap(long, default_value_t = 20100)]
    pub base_control_port: u16,
    /// First peer-networking listen port (only used with --p2p)
    #[clap(long, default_value_t = 21100)]
    pub base_p2p_port: u16,
    /// Launch the fleet in peer-to-peer mode instead of hub-and-spoke
    #[clap(long)]
    pub p2p: bool,
    /// Number of participant nodes in the fleet
    #[clap(long, default_value_t = 10)]
    pub participants: usize,
    /// Seconds to let the network settle before teardown
    #[clap(long, default_value_t = 10)]
    pub settle_secs: u64,
}

impl HarnessConfig {
    /// Control port assigned to fleet slot `index` (0 = trust-delegate).
    pub fn control_port(&self, index: usize) -> u16 {
        self.base_control_port + index as u16
    }

    /// Peer-networking port assigned to fleet slot `index`.
    pub fn p2p_port(&self, index: usize) -> u16 {
        self.base_p2p_port + index as u16
    }

    /// Local control endpoint URL for fleet slot `index`.
    pub fn control_endpoint(&self, index: usize) -> String {
        format!("http://127.0.0.1:{}", self.control_port(index))
    }
}
