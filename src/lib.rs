//! # Ledger Harness
//!
//! Distributed end-to-end test harness for ledger-node fleets.
//!
//! The harness provisions a small fleet of independently running node
//! processes (one trust-delegate plus N participants), drives each through
//! wallet bootstrap over a control protocol, and verifies that value
//! transfers issued against one node are observed by another within a
//! bounded time. Cross-node effects are asynchronous, so convergence is
//! checked the only way it can be: by bounded polling.
//!
//! ## Architecture
//!
//! - [`process`] — per-process supervision with concurrent output capture
//! - [`fleet`] — fleet provisioning (directories, ports, wallets, genesis)
//!   and unconditional reverse-order teardown
//! - [`control`] — authenticated JSON-RPC session to one node
//! - [`convergence`] — poll-until-converge-or-timeout primitive
//! - [`scenario`] — the linear transfer scenario tying it all together
//!
//! The ledger engine, wallet internals, and control-protocol server are
//! external collaborators: the harness starts their processes and talks to
//! their documented interfaces, nothing more.

#![warn(clippy::all)]

/// Explicit harness configuration and shared test constants
pub mod config;
/// Poll-predicate convergence checking
pub mod convergence;
/// Authenticated control-protocol client sessions
pub mod control;
/// Error taxonomy for every failure the harness surfaces
pub mod error;
/// Fleet provisioning and teardown
pub mod fleet;
/// Genesis allocation file
pub mod genesis;
/// Key material and address derivation
pub mod keys;
/// Process supervision and output draining
pub mod process;
/// Pre-created wallet files for non-interactive bootstrap
pub mod wallet;
/// The end-to-end transfer scenario
pub mod scenario;

pub use config::HarnessConfig;
pub use control::ControlSession;
pub use convergence::{wait_for_balance, wait_until};
pub use error::HarnessError;
pub use fleet::{NodeDescriptor, NodeFleet, NodeRole};
pub use process::ProcessSupervisor;
pub use scenario::{ScenarioDriver, ScenarioReport};

/// Harness version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
