// File: src/control.rs
//
// Control Session
//
// An authenticated client connection to one node's control endpoint. The
// wire is JSON-RPC 2.0 over HTTP POST; the session issues one request at a
// time and tracks its own authentication state so privileged calls fail
// fast with AuthError before touching the network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use log::{debug, trace};
use serde_json::{json, Value};

use crate::error::{HarnessError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ControlSession {
    endpoint: String,
    client: reqwest::Client,
    authenticated: AtomicBool,
    next_id: AtomicU64,
}

impl ControlSession {
    /// Connect to a control endpoint such as `http://127.0.0.1:20100`.
    ///
    /// Probes the TCP endpoint before returning so a refused connection
    /// surfaces immediately as `ConnectionError` rather than on the first
    /// call.
    pub async fn connect(endpoint: &str) -> Result<Self> {
        let addr = endpoint
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();
        tokio::net::TcpStream::connect(&addr)
            .await
            .map_err(|e| HarnessError::Connection {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| HarnessError::Connection {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        debug!("connected control session to {}", endpoint);
        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
            authenticated: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        trace!("{} <- {}", self.endpoint, method);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| HarnessError::Connection {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;

        let value: Value = response.json().await.map_err(|e| self.protocol(e))?;
        if let Some(error) = value.get("error") {
            return Err(self.protocol(format!("{} failed: {}", method, error)));
        }
        value
            .get("result")
            .cloned()
            .ok_or_else(|| self.protocol(format!("{}: response carries no result", method)))
    }

    fn protocol(&self, message: impl ToString) -> HarnessError {
        HarnessError::Protocol {
            endpoint: self.endpoint.clone(),
            message: message.to_string(),
        }
    }

    fn ensure_auth(&self, operation: &'static str) -> Result<()> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(HarnessError::Auth(operation))
        }
    }

    fn expect_bool(&self, method: &str, value: Value) -> Result<bool> {
        value
            .as_bool()
            .ok_or_else(|| self.protocol(format!("{}: expected a boolean, got {}", method, value)))
    }

    /// Authenticate the session. Returns false on bad credentials without
    /// raising; transport problems still surface as errors.
    pub async fn login(&self, user: &str, password: &str) -> Result<bool> {
        let result = self.call("login", json!([user, password])).await?;
        let accepted = self.expect_bool("login", result)?;
        self.authenticated.store(accepted, Ordering::Release);
        Ok(accepted)
    }

    /// Wallet balance with at least `min_confirmations` confirmations.
    pub async fn get_balance(&self, min_confirmations: u32) -> Result<u64> {
        self.ensure_auth("getbalance")?;
        let result = self.call("getbalance", json!([min_confirmations])).await?;
        result
            .as_u64()
            .ok_or_else(|| self.protocol(format!("getbalance: expected an amount, got {}", result)))
    }

    /// Generate a fresh receive address registered under `account`.
    pub async fn get_new_address(&self, account: &str) -> Result<String> {
        self.ensure_auth("getnewaddress")?;
        let result = self.call("getnewaddress", json!([account])).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.protocol(format!("getnewaddress: expected an address, got {}", result)))
    }

    /// All receive addresses known to the node, keyed to account labels.
    pub async fn list_receive_addresses(&self) -> Result<HashMap<String, String>> {
        self.ensure_auth("listrecvaddresses")?;
        let result = self.call("listrecvaddresses", json!([])).await?;
        serde_json::from_value(result.clone())
            .map_err(|_| self.protocol(format!("listrecvaddresses: malformed mapping {}", result)))
    }

    /// Unlock the wallet's key store. Returns false on a wrong passphrase
    /// without changing lock state.
    pub async fn unlock_wallet(&self, passphrase: &str) -> Result<bool> {
        self.ensure_auth("walletpassphrase")?;
        let result = self.call("walletpassphrase", json!([passphrase])).await?;
        self.expect_bool("walletpassphrase", result)
    }

    /// Import a hex-encoded private key into the wallet.
    pub async fn import_private_key(&self, secret_hex: &str) -> Result<()> {
        self.ensure_auth("importprivatekey")?;
        self.call("importprivatekey", json!([secret_hex])).await?;
        Ok(())
    }

    /// Rescan the chain for wallet transactions from `from_height`.
    pub async fn rescan(&self, from_height: u64) -> Result<()> {
        self.ensure_auth("rescan")?;
        self.call("rescan", json!([from_height])).await?;
        Ok(())
    }

    /// Initiate an asynchronous transfer. Returns as soon as the node
    /// accepts it; propagation is observed only through balance polling.
    pub async fn transfer(&self, amount: u64, destination: &str) -> Result<()> {
        self.ensure_auth("transfer")?;
        self.call("transfer", json!([amount, destination])).await?;
        Ok(())
    }
}

impl std::fmt::Debug for ControlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlSession")
            .field("endpoint", &self.endpoint)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
