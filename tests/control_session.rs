// Integration tests for ControlSession against a mock control endpoint.
//
// The mock speaks just enough of the control protocol to exercise every
// session operation: login, balance queries, address generation, key
// import + rescan, wallet unlock, and asynchronous transfers. Two mock
// nodes share one in-memory chain so transfer propagation is genuinely
// asynchronous, the way it is between real node processes.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use serde_json::{json, Value};

use ledger_harness::config::{
    CONTROL_PASSWORD, CONTROL_USERNAME, INITIAL_BALANCE, TRANSFER_AMOUNT, WALLET_PASSPHRASE,
};
use ledger_harness::keys::KeyPair;
use ledger_harness::{wait_for_balance, ControlSession, HarnessError};

/// On-ledger balances, shared by every node of one mock network.
type Chain = Arc<Mutex<HashMap<String, u64>>>;

/// Per-node wallet state behind the mock control endpoint.
#[derive(Default)]
struct Wallet {
    locked: bool,
    /// receive address -> account label
    addresses: HashMap<String, String>,
    /// imported keys' addresses awaiting a rescan
    pending: Vec<String>,
    /// addresses whose chain balance the wallet reports
    scanned: HashSet<String>,
}

impl Wallet {
    fn new() -> Self {
        Self {
            locked: true,
            ..Default::default()
        }
    }
}

#[derive(Clone)]
struct NodeState {
    wallet: Arc<Mutex<Wallet>>,
    chain: Chain,
}

fn dispatch(state: &NodeState, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "login" => {
            let user = params[0].as_str().unwrap_or_default();
            let password = params[1].as_str().unwrap_or_default();
            Ok(json!(user == CONTROL_USERNAME && password == CONTROL_PASSWORD))
        }
        "getbalance" => {
            let wallet = state.wallet.lock().unwrap();
            let chain = state.chain.lock().unwrap();
            let total: u64 = wallet
                .scanned
                .iter()
                .map(|address| chain.get(address).copied().unwrap_or(0))
                .sum();
            Ok(json!(total))
        }
        "getnewaddress" => {
            let account = params[0].as_str().unwrap_or_default().to_string();
            let address = KeyPair::generate().address();
            let mut wallet = state.wallet.lock().unwrap();
            wallet.addresses.insert(address.clone(), account);
            wallet.scanned.insert(address.clone());
            Ok(json!(address))
        }
        "listrecvaddresses" => {
            let wallet = state.wallet.lock().unwrap();
            Ok(json!(wallet.addresses))
        }
        "walletpassphrase" => {
            let passphrase = params[0].as_str().unwrap_or_default();
            if passphrase == WALLET_PASSPHRASE {
                state.wallet.lock().unwrap().locked = false;
                Ok(json!(true))
            } else {
                Ok(json!(false))
            }
        }
        "importprivatekey" => {
            let secret_hex = params[0].as_str().ok_or("missing secret")?;
            let bytes: [u8; 32] = hex::decode(secret_hex)
                .map_err(|e| e.to_string())?
                .try_into()
                .map_err(|_| "secret must be 32 bytes".to_string())?;
            let address = KeyPair::from_secret(bytes).address();
            state.wallet.lock().unwrap().pending.push(address);
            Ok(json!(null))
        }
        "rescan" => {
            let mut wallet = state.wallet.lock().unwrap();
            let pending: Vec<String> = wallet.pending.drain(..).collect();
            wallet.scanned.extend(pending);
            Ok(json!(null))
        }
        "transfer" => {
            let amount = params[0].as_u64().ok_or("missing amount")?;
            let destination = params[1].as_str().ok_or("missing destination")?.to_string();

            let wallet = state.wallet.lock().unwrap();
            if wallet.locked {
                return Err("wallet is locked".to_string());
            }
            let mut chain = state.chain.lock().unwrap();
            let available: u64 = wallet
                .scanned
                .iter()
                .map(|address| chain.get(address).copied().unwrap_or(0))
                .sum();
            if available < amount {
                return Err("insufficient funds".to_string());
            }
            let mut remaining = amount;
            for address in &wallet.scanned {
                if remaining == 0 {
                    break;
                }
                let entry = chain.entry(address.clone()).or_insert(0);
                let debit = remaining.min(*entry);
                *entry -= debit;
                remaining -= debit;
            }
            drop(chain);

            // Credit lands later, like a transfer confirming in a block.
            let chain = state.chain.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(250));
                *chain.lock().unwrap().entry(destination).or_insert(0) += amount;
            });
            Ok(json!(null))
        }
        other => Err(format!("unknown method '{}'", other)),
    }
}

async fn rpc(state: web::Data<NodeState>, body: web::Json<Value>) -> web::Json<Value> {
    let id = body["id"].clone();
    let method = body["method"].as_str().unwrap_or_default().to_string();
    let params = body["params"].clone();
    match dispatch(&state, &method, &params) {
        Ok(result) => web::Json(json!({ "jsonrpc": "2.0", "id": id, "result": result })),
        Err(message) => web::Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32000, "message": message },
        })),
    }
}

/// Stand up one mock node on an ephemeral port; returns its endpoint URL.
fn spawn_mock_node(chain: Chain) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let state = NodeState {
        wallet: Arc::new(Mutex::new(Wallet::new())),
        chain,
    };

    std::thread::spawn(move || {
        actix_web::rt::System::new().block_on(async move {
            HttpServer::new(move || {
                App::new()
                    .app_data(web::Data::new(state.clone()))
                    .route("/", web::post().to(rpc))
            })
            .workers(1)
            .disable_signals()
            .listen(listener)
            .unwrap()
            .run()
            .await
            .unwrap();
        });
    });

    format!("http://127.0.0.1:{}", port)
}

fn fresh_chain() -> Chain {
    Arc::new(Mutex::new(HashMap::new()))
}

#[tokio::test]
async fn login_reports_bad_credentials_without_raising() {
    let endpoint = spawn_mock_node(fresh_chain());
    let session = ControlSession::connect(&endpoint).await.unwrap();

    assert!(!session.login(CONTROL_USERNAME, "wrong").await.unwrap());
    assert!(!session.is_authenticated());

    assert!(session.login(CONTROL_USERNAME, CONTROL_PASSWORD).await.unwrap());
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn wallet_starts_empty_and_locked() {
    let endpoint = spawn_mock_node(fresh_chain());
    let session = ControlSession::connect(&endpoint).await.unwrap();
    session.login(CONTROL_USERNAME, CONTROL_PASSWORD).await.unwrap();

    assert_eq!(session.get_balance(0).await.unwrap(), 0);
    assert!(!session.unlock_wallet("not the passphrase").await.unwrap());
    assert!(session.unlock_wallet(WALLET_PASSPHRASE).await.unwrap());
}

#[tokio::test]
async fn address_generation_grows_listing_by_one_with_label() {
    let endpoint = spawn_mock_node(fresh_chain());
    let session = ControlSession::connect(&endpoint).await.unwrap();
    session.login(CONTROL_USERNAME, CONTROL_PASSWORD).await.unwrap();

    let initial = session.list_receive_addresses().await.unwrap();
    assert!(initial.is_empty());

    let first = session.get_new_address("address_test_account").await.unwrap();
    let listing = session.list_receive_addresses().await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing.get(&first).unwrap(), "address_test_account");

    // Repeated calls keep producing distinct addresses.
    let second = session.get_new_address("other_account").await.unwrap();
    assert_ne!(first, second);
    let listing = session.list_receive_addresses().await.unwrap();
    assert_eq!(listing.len(), 2);
    assert!(listing.contains_key(&first));
    assert_eq!(listing.get(&second).unwrap(), "other_account");
}

#[tokio::test]
async fn import_then_rescan_reveals_genesis_balance() {
    let keys = KeyPair::generate();
    let chain = fresh_chain();
    chain.lock().unwrap().insert(keys.address(), INITIAL_BALANCE);

    let endpoint = spawn_mock_node(chain);
    let session = ControlSession::connect(&endpoint).await.unwrap();
    session.login(CONTROL_USERNAME, CONTROL_PASSWORD).await.unwrap();

    // Seeded on the ledger, but the wallet has not imported the key yet.
    assert_eq!(session.get_balance(0).await.unwrap(), 0);

    session.import_private_key(&keys.secret_hex()).await.unwrap();
    session.rescan(0).await.unwrap();
    assert_eq!(session.get_balance(0).await.unwrap(), INITIAL_BALANCE);
}

#[tokio::test]
async fn transfer_converges_on_the_destination_node() {
    let chain = fresh_chain();
    let sender_keys = KeyPair::generate();
    chain.lock().unwrap().insert(sender_keys.address(), INITIAL_BALANCE);

    let sender = ControlSession::connect(&spawn_mock_node(chain.clone())).await.unwrap();
    let receiver = ControlSession::connect(&spawn_mock_node(chain)).await.unwrap();
    for session in [&sender, &receiver] {
        assert!(session.login(CONTROL_USERNAME, CONTROL_PASSWORD).await.unwrap());
    }

    sender.import_private_key(&sender_keys.secret_hex()).await.unwrap();
    sender.rescan(0).await.unwrap();
    assert!(sender.unlock_wallet(WALLET_PASSPHRASE).await.unwrap());

    let destination = receiver.get_new_address("circle_test").await.unwrap();
    let destination_initial = receiver.get_balance(0).await.unwrap();

    sender.transfer(TRANSFER_AMOUNT, &destination).await.unwrap();

    // The credit is asynchronous; only polling can observe it.
    wait_for_balance(
        &receiver,
        0,
        destination_initial + TRANSFER_AMOUNT,
        Duration::from_millis(50),
        Duration::from_secs(5),
        "destination node to observe the transfer",
    )
    .await
    .unwrap();

    assert_eq!(
        sender.get_balance(0).await.unwrap(),
        INITIAL_BALANCE - TRANSFER_AMOUNT
    );
}

#[tokio::test]
async fn locked_wallet_rejects_transfer_as_protocol_error() {
    let chain = fresh_chain();
    let keys = KeyPair::generate();
    chain.lock().unwrap().insert(keys.address(), INITIAL_BALANCE);

    let endpoint = spawn_mock_node(chain);
    let session = ControlSession::connect(&endpoint).await.unwrap();
    session.login(CONTROL_USERNAME, CONTROL_PASSWORD).await.unwrap();
    session.import_private_key(&keys.secret_hex()).await.unwrap();
    session.rescan(0).await.unwrap();

    let result = session.transfer(1, "lda1deadbeef").await;
    assert!(matches!(result, Err(HarnessError::Protocol { .. })));
}
