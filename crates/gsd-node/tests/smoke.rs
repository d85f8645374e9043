//! End-to-end smoke test for gsd-node.
//!
//! Starts a real node process on a fresh database, delivers notifications
//! through the webhook, and reads the indexed state back over JSON-RPC.
//!
//! Run with:
//!   cargo test -p gsd-node --test smoke

use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use gsd_codec::encode_instruction_data;
use gsd_core::constants::GSD_PROGRAM_ID;

const SECRET: &str = "smoke-secret";

// ── Node lifecycle ────────────────────────────────────────────────────────────

struct NodeGuard {
    child: Child,
    data_dir: PathBuf,
}

impl Drop for NodeGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}

/// Find a free TCP port on loopback.
fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

// ── RPC helpers ───────────────────────────────────────────────────────────────

async fn rpc_call(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1
    });
    let resp = client
        .post(url)
        .json(&body)
        .send()
        .await
        .unwrap_or_else(|e| panic!("RPC call {method} failed: {e}"));
    let json: serde_json::Value = resp.json().await.expect("parse RPC JSON");
    if let Some(err) = json.get("error") {
        panic!("RPC error from {method}: {err}");
    }
    json["result"].clone()
}

/// Poll until the RPC server responds or the timeout elapses.
async fn wait_for_rpc(client: &reqwest::Client, url: &str, timeout: Duration) -> bool {
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "gsd_getIndexerStats",
        "params": [],
        "id": 1
    });
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Ok(resp) = client.post(url).json(&body).send().await {
            if resp.status().is_success() {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    false
}

// ── Notification builders ─────────────────────────────────────────────────────

fn instruction(name: &str, args: &[u8], accounts: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "programId": GSD_PROGRAM_ID,
        "accounts": accounts,
        "data": encode_instruction_data(name, args),
    })
}

fn create_round_args() -> Vec<u8> {
    let mut args = Vec::new();
    args.extend_from_slice(&1_700_000_000i64.to_le_bytes());
    args.extend_from_slice(&1_700_086_400i64.to_le_bytes());
    args.extend_from_slice(&1_700_172_800i64.to_le_bytes());
    args.push(0);
    args.extend_from_slice(&[7u8; 32]);
    args
}

// ── Smoke test ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn smoke_webhook_to_rpc() {
    let data_dir = std::env::temp_dir().join(format!("gsd_e2e_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&data_dir);

    let rpc_port = free_port();
    let webhook_port = free_port();
    let rpc_url = format!("http://127.0.0.1:{rpc_port}");
    let webhook_url = format!("http://127.0.0.1:{webhook_port}");

    let node_bin = env!("CARGO_BIN_EXE_gsd-node");
    let child = Command::new(node_bin)
        .args([
            "--data-dir",     data_dir.to_str().unwrap(),
            "--rpc-addr",     &format!("127.0.0.1:{rpc_port}"),
            "--webhook-addr", &format!("127.0.0.1:{webhook_port}"),
            "--webhook-auth", SECRET,
            "--workers",      "2",
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn gsd-node");

    let _guard = NodeGuard { child, data_dir };

    let http = reqwest::Client::new();
    assert!(
        wait_for_rpc(&http, &rpc_url, Duration::from_secs(20)).await,
        "gsd-node did not become ready within 20 seconds"
    );

    let health = http.get(format!("{webhook_url}/health")).send().await.unwrap();
    assert_eq!(health.text().await.unwrap(), "ok");

    // ── Deliver a round, an idea and a deposit ───────────────────────────────
    let batch = serde_json::json!([
        {
            "signature": "sig-round",
            "timestamp": 1_700_000_000,
            "instructions": [instruction("create_round", &create_round_args(), &["authority", "round-1"])],
        },
        {
            "signature": "sig-deposit",
            "timestamp": 1_700_000_100,
            "instructions": [instruction("deposit_tokens", &250u64.to_le_bytes(), &["config", "vault", "alice"])],
        },
    ]);

    let unauthorized = http.post(format!("{webhook_url}/webhooks/helius")).json(&batch).send().await.unwrap();
    assert_eq!(unauthorized.status().as_u16(), 401);

    let resp = http
        .post(format!("{webhook_url}/webhooks/helius"))
        .header("Authorization", SECRET)
        .json(&batch)
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["received"], true);
    assert_eq!(body["total"], 2);
    assert_eq!(body["processed"], 2);

    let idea = serde_json::json!({
        "signature": "sig-idea",
        "timestamp": 1_700_000_200,
        "instructions": [instruction("submit_idea", &[9u8; 32], &["round-1", "idea-1", "alice"])],
    });
    let resp = http
        .post(format!("{webhook_url}/webhooks/helius"))
        .header("Authorization", SECRET)
        .json(&idea)
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    // ── Read it back ──────────────────────────────────────────────────────────
    let deposit = rpc_call(&http, &rpc_url, "gsd_getDeposit", serde_json::json!(["alice"])).await;
    assert_eq!(deposit["deposited_amount"], 250);

    let rounds = rpc_call(&http, &rpc_url, "gsd_listRounds", serde_json::json!([])).await;
    assert_eq!(rounds.as_array().unwrap().len(), 1);
    let round = rpc_call(&http, &rpc_url, "gsd_getRound", serde_json::json!(["round-1"])).await;
    assert_eq!(round["idea_count"], 1);

    let ideas = rpc_call(&http, &rpc_url, "gsd_listIdeas", serde_json::json!(["round-1"])).await;
    assert_eq!(ideas[0]["on_chain_address"], "idea-1");

    let stats = rpc_call(&http, &rpc_url, "gsd_getIndexerStats", serde_json::json!([])).await;
    assert_eq!(stats["transactions"], 3);
    assert_eq!(stats["totals"]["processed"], 3);

    let backfill = rpc_call(&http, &rpc_url, "gsd_getBackfillStatus", serde_json::json!([])).await;
    assert_eq!(backfill["state"], "idle");
}
