// File: src/fleet.rs
//
// Node Fleet Provisioning and Teardown
//
// A fleet is one trust-delegate process plus N participant processes, each
// with an isolated working directory and control port. The fleet launches
// the delegate first (participants connect to it on startup) and tears
// everything down in reverse launch order, unconditionally.

use std::path::PathBuf;

use log::{debug, info};

use crate::config::{
    HarnessConfig, CONTROL_PASSWORD, CONTROL_USERNAME, WALLET_PASSPHRASE,
};
use crate::error::Result;
use crate::genesis::GenesisAllocation;
use crate::keys::KeyPair;
use crate::process::ProcessSupervisor;
use crate::wallet::WalletFile;

/// Which job a node holds within the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// The single node whose address the others trust for block production.
    TrustDelegate,
    Participant,
}

/// Pure port/directory allocation for a fleet of `participants` nodes.
///
/// Slot 0 is the trust-delegate, slots 1..=N the participants. Split out
/// from provisioning so the uniqueness invariants are testable without
/// launching a single process.
#[derive(Debug, Clone)]
pub struct FleetPlan {
    pub slots: Vec<FleetSlot>,
}

#[derive(Debug, Clone)]
pub struct FleetSlot {
    pub role: NodeRole,
    pub dir: PathBuf,
    pub control_port: u16,
    pub p2p_port: u16,
}

impl FleetPlan {
    pub fn new(config: &HarnessConfig, participants: usize) -> Self {
        let mut slots = Vec::with_capacity(participants + 1);
        slots.push(FleetSlot {
            role: NodeRole::TrustDelegate,
            dir: config.config_dir.join("delegate"),
            control_port: config.control_port(0),
            p2p_port: config.p2p_port(0),
        });
        for i in 0..participants {
            slots.push(FleetSlot {
                role: NodeRole::Participant,
                dir: config.config_dir.join(format!("node_{:03}", i)),
                control_port: config.control_port(i + 1),
                p2p_port: config.p2p_port(i + 1),
            });
        }
        Self { slots }
    }
}

/// One provisioned node: identity, endpoints, directory, live process.
#[derive(Debug)]
pub struct NodeDescriptor {
    pub role: NodeRole,
    pub keys: KeyPair,
    pub control_port: u16,
    pub dir: PathBuf,
    pub supervisor: ProcessSupervisor,
}

/// The complete set of node processes for one scenario run.
pub struct NodeFleet {
    nodes: Vec<NodeDescriptor>,
    genesis: GenesisAllocation,
}

impl NodeFleet {
    /// Provision a fleet: generate keys, seed the genesis allocation, then
    /// launch the trust-delegate followed by every participant.
    ///
    /// Participant 0 additionally receives the delegate's private key and
    /// acts as the block-producing process. If any launch fails, the nodes
    /// started so far are torn down before the error is returned.
    pub async fn provision(
        config: &HarnessConfig,
        participants: usize,
        initial_balance: u64,
    ) -> Result<Self> {
        info!("provisioning fleet: {} participants", participants);
        let participant_keys: Vec<KeyPair> =
            (0..participants).map(|_| KeyPair::generate()).collect();
        let delegate_keys = KeyPair::generate();
        let genesis = GenesisAllocation::for_keys(&participant_keys, initial_balance)?;

        let plan = FleetPlan::new(config, participants);
        let mut fleet = Self {
            nodes: Vec::with_capacity(participants + 1),
            genesis,
        };
        if let Err(e) = fleet
            .launch_all(config, &plan, participant_keys, delegate_keys)
            .await
        {
            fleet.teardown().await;
            return Err(e);
        }
        Ok(fleet)
    }

    async fn launch_all(
        &mut self,
        config: &HarnessConfig,
        plan: &FleetPlan,
        participant_keys: Vec<KeyPair>,
        delegate_keys: KeyPair,
    ) -> Result<()> {
        let delegate_slot = &plan.slots[0];
        std::fs::remove_dir_all(&delegate_slot.dir).ok();
        std::fs::create_dir_all(&delegate_slot.dir)?;
        self.genesis.write_to(&delegate_slot.dir)?;

        let mut args = control_args(delegate_slot.control_port);
        args.extend(["--delegate-address".to_string(), delegate_keys.address()]);
        if config.p2p {
            args.extend(["--p2p-port".to_string(), delegate_slot.p2p_port.to_string()]);
        }
        let supervisor =
            ProcessSupervisor::launch(&config.delegate_exe, &args, &delegate_slot.dir).await?;
        debug!("delegate up, pid {:?}", supervisor.id());
        self.nodes.push(NodeDescriptor {
            role: NodeRole::TrustDelegate,
            keys: delegate_keys.clone(),
            control_port: delegate_slot.control_port,
            dir: delegate_slot.dir.clone(),
            supervisor,
        });

        for (i, keys) in participant_keys.into_iter().enumerate() {
            let slot = &plan.slots[i + 1];
            std::fs::remove_dir_all(&slot.dir).ok();
            std::fs::create_dir_all(&slot.dir)?;

            // Pre-create the wallet so the node never prompts interactively.
            WalletFile::new("", WALLET_PASSPHRASE).write_to(&slot.dir)?;

            let mut args = vec![
                "--data-dir".to_string(),
                slot.dir.display().to_string(),
            ];
            args.extend(control_args(slot.control_port));
            args.extend(["--delegate-address".to_string(), delegate_keys.address()]);
            if i == 0 {
                // This single process produces blocks on the delegate's behalf.
                args.extend([
                    "--delegate-private-key".to_string(),
                    delegate_keys.secret_hex(),
                ]);
            }
            if config.p2p {
                args.extend([
                    "--p2p-port".to_string(),
                    slot.p2p_port.to_string(),
                    "--bootstrap-peer".to_string(),
                    format!("127.0.0.1:{}", plan.slots[0].p2p_port),
                ]);
            }

            let supervisor = ProcessSupervisor::launch(&config.node_exe, &args, &slot.dir).await?;
            debug!("participant {} up, pid {:?}", i, supervisor.id());
            self.nodes.push(NodeDescriptor {
                role: NodeRole::Participant,
                keys,
                control_port: slot.control_port,
                dir: slot.dir.clone(),
                supervisor,
            });
        }
        Ok(())
    }

    pub fn genesis(&self) -> &GenesisAllocation {
        &self.genesis
    }

    pub fn nodes(&self) -> &[NodeDescriptor] {
        &self.nodes
    }

    pub fn delegate(&self) -> &NodeDescriptor {
        &self.nodes[0]
    }

    pub fn participants(&self) -> &[NodeDescriptor] {
        &self.nodes[1..]
    }

    /// Kill every node in reverse launch order and join all drain tasks.
    ///
    /// Best-effort and idempotent: already-exited processes and repeated
    /// calls are fine, and it never masks the failure that triggered it.
    pub async fn teardown(&mut self) {
        info!("tearing down fleet of {} nodes", self.nodes.len());
        for node in self.nodes.iter_mut().rev() {
            node.supervisor.terminate().await;
        }
    }
}

fn control_args(port: u16) -> Vec<String> {
    vec![
        "--control-server".to_string(),
        "--control-user".to_string(),
        CONTROL_USERNAME.to_string(),
        "--control-password".to_string(),
        CONTROL_PASSWORD.to_string(),
        "--control-port".to_string(),
        port.to_string(),
    ]
}
