// File: src/scenario.rs
//
// End-to-End Transfer Scenario
//
// The top-level sequential script: provision the fleet, bootstrap every
// participant wallet, run a round-robin transfer across all participants
// and assert convergence for each hop. Strictly linear: one blocking
// control call at a time, never parallel requests across nodes. Teardown
// runs on every exit path.

use std::time::Duration;

use anyhow::{ensure, Context, Result};
use log::info;
use tokio::time::{sleep, Instant};

use crate::config::{
    HarnessConfig, CONTROL_PASSWORD, CONTROL_USERNAME, CONVERGENCE_TIMEOUT, INITIAL_BALANCE,
    POLL_INTERVAL, TRANSFER_AMOUNT, WALLET_PASSPHRASE,
};
use crate::control::ControlSession;
use crate::convergence::{wait_for_balance, wait_until};
use crate::fleet::NodeFleet;

/// How long a freshly launched node gets to open its control endpoint.
const CONTROL_READY_TIMEOUT: Duration = Duration::from_secs(35);

const ADDRESS_ACCOUNT: &str = "address_test_account";
const CIRCLE_ACCOUNT: &str = "circle_test";

/// One completed round-robin hop.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub from: usize,
    pub to: usize,
    pub amount: u64,
    pub elapsed: Duration,
}

/// What a successful scenario run produced.
#[derive(Debug)]
pub struct ScenarioReport {
    pub participants: usize,
    pub transfers: Vec<TransferOutcome>,
}

pub struct ScenarioDriver {
    config: HarnessConfig,
}

impl ScenarioDriver {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Run the full scenario. The fleet is torn down before this returns,
    /// whether the run succeeded, an assertion failed, or an operation
    /// errored; teardown never masks the original failure.
    pub async fn run(&self) -> Result<ScenarioReport> {
        let mut fleet =
            NodeFleet::provision(&self.config, self.config.participants, INITIAL_BALANCE).await?;
        let result = self.drive(&fleet).await;

        info!("settling for {}s before teardown", self.config.settle_secs);
        sleep(Duration::from_secs(self.config.settle_secs)).await;
        fleet.teardown().await;
        result
    }

    async fn drive(&self, fleet: &NodeFleet) -> Result<ScenarioReport> {
        let n = fleet.participants().len();

        info!("opening control sessions to all {} nodes", n + 1);
        let mut sessions = Vec::with_capacity(n + 1);
        for (slot, node) in fleet.nodes().iter().enumerate() {
            let endpoint = format!("http://127.0.0.1:{}", node.control_port);
            let session = connect_when_ready(&endpoint).await?;
            let accepted = session.login(CONTROL_USERNAME, CONTROL_PASSWORD).await?;
            ensure!(accepted, "node {} rejected the control credentials", slot);
            sessions.push(session);
        }
        // Slot 0 is the trust-delegate; the wallet checks below only
        // concern participants.
        let sessions = &sessions[1..];

        info!("verifying all participants start with zero balance");
        for (i, session) in sessions.iter().enumerate() {
            let balance = session.get_balance(0).await?;
            ensure!(
                balance == 0,
                "participant {} reports {} before any key import",
                i,
                balance
            );
        }

        info!("exercising wallet unlock");
        for (i, session) in sessions.iter().enumerate() {
            ensure!(
                !session.unlock_wallet("this is not the correct passphrase").await?,
                "participant {} unlocked with a wrong passphrase",
                i
            );
            ensure!(
                session.unlock_wallet(WALLET_PASSPHRASE).await?,
                "participant {} rejected the correct passphrase",
                i
            );
        }

        info!("exercising receive-address generation");
        for (i, session) in sessions.iter().enumerate() {
            let initial = session.list_receive_addresses().await?;
            let address = session.get_new_address(ADDRESS_ACCOUNT).await?;
            let updated = session.list_receive_addresses().await?;
            ensure!(
                updated.len() == initial.len() + 1,
                "participant {}: address set grew from {} to {}",
                i,
                initial.len(),
                updated.len()
            );
            for known in initial.keys() {
                ensure!(
                    updated.contains_key(known),
                    "participant {} dropped address {}",
                    i,
                    known
                );
            }
            ensure!(
                updated.get(&address).map(String::as_str) == Some(ADDRESS_ACCOUNT),
                "participant {}: new address {} not registered under '{}'",
                i,
                address,
                ADDRESS_ACCOUNT
            );
        }

        info!("importing genesis keys and verifying seeded balances");
        for (i, session) in sessions.iter().enumerate() {
            let node = &fleet.participants()[i];
            session.import_private_key(&node.keys.secret_hex()).await?;
            session.rescan(0).await?;
            let expected = fleet
                .genesis()
                .amount_for(&node.keys.address())
                .context("participant address missing from genesis allocation")?;
            let balance = session.get_balance(0).await?;
            ensure!(
                balance == expected,
                "participant {}: balance {} after rescan, genesis allocated {}",
                i,
                balance,
                expected
            );
        }

        info!("round-robin: each participant sends {} to the next", TRANSFER_AMOUNT);
        let mut transfers = Vec::with_capacity(n);
        for i in 0..n {
            let dest = (i + 1) % n;
            let destination_address = sessions[dest].get_new_address(CIRCLE_ACCOUNT).await?;
            let destination_initial = sessions[dest].get_balance(0).await?;

            sessions[i].transfer(TRANSFER_AMOUNT, &destination_address).await?;
            let issued = Instant::now();
            wait_for_balance(
                &sessions[dest],
                0,
                destination_initial + TRANSFER_AMOUNT,
                POLL_INTERVAL,
                CONVERGENCE_TIMEOUT,
                &format!(
                    "participant {} to observe {} units from participant {}",
                    dest, TRANSFER_AMOUNT, i
                ),
            )
            .await?;
            let elapsed = issued.elapsed();
            info!("participant {} received the transfer from {} in {:?}", dest, i, elapsed);
            transfers.push(TransferOutcome {
                from: i,
                to: dest,
                amount: TRANSFER_AMOUNT,
                elapsed,
            });
        }

        // Each participant sent and received exactly once, so with every
        // hop converged the cycle conserves every balance.
        info!("verifying round-robin conservation");
        for (i, session) in sessions.iter().enumerate() {
            let balance = session.get_balance(0).await?;
            ensure!(
                balance == INITIAL_BALANCE,
                "participant {}: final balance {} differs from initial {}",
                i,
                balance,
                INITIAL_BALANCE
            );
        }

        Ok(ScenarioReport {
            participants: n,
            transfers,
        })
    }
}

/// Connect to a control endpoint, polling until the freshly launched node
/// starts accepting connections.
async fn connect_when_ready(endpoint: &str) -> Result<ControlSession> {
    wait_until(
        move || async move { Ok(ControlSession::connect(endpoint).await.is_ok()) },
        POLL_INTERVAL,
        CONTROL_READY_TIMEOUT,
        &format!("control endpoint {} to accept connections", endpoint),
    )
    .await?;
    Ok(ControlSession::connect(endpoint).await?)
}
