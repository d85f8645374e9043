//! gsd-node: the GSD indexer daemon.
//!
//! Usage:
//!   gsd-node [OPTIONS]
//!
//! Options:
//!   --data-dir <PATH>        State database directory [default: ~/.gsd/data]
//!   --rpc-addr <ADDR>        JSON-RPC listen address [default: 127.0.0.1:8645]
//!   --webhook-addr <ADDR>    Webhook listen address [default: 0.0.0.0:3000]
//!   --webhook-auth <SECRET>  Expected Authorization header for deliveries
//!   --burn-authority <KEY>   Enables buy-and-burn (base58 secret or key file)
//!
//! Every option can also be set through its environment variable.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use gsd_backfill::{BackfillConfig, BackfillRunner, NoArtifacts, NoScorer};
use gsd_core::constants::{BACKFILL_BATCH_DELAY_MS, BACKFILL_BATCH_SIZE, GSD_PROGRAM_ID, USDC_MINT};
use gsd_indexer::{Dispatcher, IndexerConfig};
use gsd_revenue::jupiter::DEFAULT_JUPITER_URL;
use gsd_revenue::solana::DEFAULT_SOLANA_RPC_URL;
use gsd_revenue::{
    JupiterClient, KeypairSigner, RevenueDistributor, SettlementConfig, SettlementEngine, SolanaRpcClient,
};
use gsd_rpc::{RpcServer, RpcServerState, WebhookServer, WebhookState};
use gsd_state::StateDb;

#[derive(Parser, Debug)]
#[command(name = "gsd-node", about = "GSD hub off-chain indexer", version)]
struct Args {
    /// Directory for the persistent state database.
    #[arg(long, env = "GSD_DATA_DIR", default_value = "~/.gsd/data")]
    data_dir: PathBuf,

    /// JSON-RPC listen address.
    #[arg(long, env = "GSD_RPC_ADDR", default_value = "127.0.0.1:8645")]
    rpc_addr: SocketAddr,

    /// Webhook HTTP listen address.
    #[arg(long, env = "GSD_WEBHOOK_ADDR", default_value = "0.0.0.0:3000")]
    webhook_addr: SocketAddr,

    /// Shared secret the relay sends in the Authorization header.
    #[arg(long, env = "GSD_WEBHOOK_AUTH", hide_env_values = true)]
    webhook_auth: Option<String>,

    /// Program whose instructions are indexed.
    #[arg(long, env = "GSD_PROGRAM_ID", default_value = GSD_PROGRAM_ID)]
    program_id: String,

    /// Treasury wallet watched for inflows. Detection is off when unset.
    #[arg(long, env = "GSD_TREASURY_ADDRESS")]
    treasury_address: Option<String>,

    #[arg(long, env = "GSD_USDC_MINT", default_value = USDC_MINT)]
    usdc_mint: String,

    /// Mint bought and burned with the burn share of revenue.
    #[arg(long, env = "GSD_MINT")]
    gsd_mint: Option<String>,

    #[arg(long, env = "GSD_JUPITER_URL", default_value = DEFAULT_JUPITER_URL)]
    jupiter_url: String,

    #[arg(long, env = "GSD_JUPITER_API_KEY", hide_env_values = true)]
    jupiter_api_key: Option<String>,

    #[arg(long, env = "GSD_SOLANA_RPC_URL", default_value = DEFAULT_SOLANA_RPC_URL)]
    solana_rpc_url: String,

    /// Burn authority key: base58 secret or path to a JSON byte-array file.
    #[arg(long, env = "GSD_BURN_AUTHORITY", hide_env_values = true)]
    burn_authority: Option<String>,

    /// Notifications dispatched concurrently.
    #[arg(long, env = "GSD_WORKERS", default_value_t = 8)]
    workers: usize,

    #[arg(long, env = "GSD_BACKFILL_BATCH_SIZE", default_value_t = BACKFILL_BATCH_SIZE)]
    backfill_batch_size: usize,

    #[arg(long, env = "GSD_BACKFILL_DELAY_MS", default_value_t = BACKFILL_BATCH_DELAY_MS)]
    backfill_delay_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,gsd=debug")),
        )
        .init();

    let args = Args::parse();
    info!(program_id = %args.program_id, "GSD indexer starting");

    // ── State database ────────────────────────────────────────────────────────
    let data_dir = expand_tilde(&args.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let db = Arc::new(StateDb::open(&data_dir).context("opening state database")?);

    // ── Indexer ───────────────────────────────────────────────────────────────
    if args.treasury_address.is_none() {
        info!("no treasury address configured; inflow detection off");
    }
    let indexer_config = IndexerConfig {
        program_id: args.program_id.clone(),
        treasury_address: args.treasury_address.clone(),
        usdc_mint: args.usdc_mint.clone(),
        ..IndexerConfig::default()
    };
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&db), indexer_config));

    // ── Settlement ────────────────────────────────────────────────────────────
    let settlement = build_settlement(&args)?;
    let distributor = Arc::new(RevenueDistributor::new(Arc::clone(&db), settlement));

    // ── Backfill ──────────────────────────────────────────────────────────────
    let backfill = BackfillRunner::new(
        Arc::clone(&db),
        Arc::new(NoScorer),
        Arc::new(NoArtifacts),
        BackfillConfig {
            batch_size: args.backfill_batch_size,
            batch_delay: Duration::from_millis(args.backfill_delay_ms),
            ..BackfillConfig::default()
        },
    );

    // ── RPC server ────────────────────────────────────────────────────────────
    let rpc_state = Arc::new(RpcServerState {
        db: Arc::clone(&db),
        dispatcher: Arc::clone(&dispatcher),
        distributor,
        backfill,
    });
    let rpc_handle = RpcServer::new(rpc_state)
        .start(args.rpc_addr)
        .await
        .context("starting RPC server")?;

    // ── Webhook ───────────────────────────────────────────────────────────────
    if args.webhook_auth.is_none() {
        warn!("GSD_WEBHOOK_AUTH not set; webhook deliveries will be refused");
    }
    let webhook_state = WebhookState::new(dispatcher, args.webhook_auth.clone(), args.workers);
    let webhook = WebhookServer::new(webhook_state)
        .start(args.webhook_addr)
        .await
        .context("starting webhook server")?;

    info!(workers = args.workers, "node ready");
    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;

    info!("shutting down");
    webhook.abort();
    let _ = rpc_handle.stop();
    db.flush().context("flushing state database")?;
    Ok(())
}

/// Buy-and-burn needs both a burn authority and the mint to buy.
fn build_settlement(args: &Args) -> anyhow::Result<Option<Arc<SettlementEngine>>> {
    let (Some(authority), Some(gsd_mint)) = (&args.burn_authority, &args.gsd_mint) else {
        if args.burn_authority.is_some() || args.gsd_mint.is_some() {
            warn!("buy-and-burn needs both --burn-authority and --gsd-mint; disabled");
        } else {
            info!("buy-and-burn disabled");
        }
        return Ok(None);
    };

    let signer = KeypairSigner::load(authority).context("loading burn authority")?;
    let mut config = SettlementConfig::new(gsd_mint.clone());
    config.usdc_mint = args.usdc_mint.clone();

    let engine = SettlementEngine::new(
        Arc::new(JupiterClient::new(&args.jupiter_url, args.jupiter_api_key.clone())),
        Arc::new(SolanaRpcClient::new(&args.solana_rpc_url)),
        Arc::new(signer),
        config,
    );
    info!(gsd_mint = %gsd_mint, venue = %args.jupiter_url, "buy-and-burn enabled");
    Ok(Some(Arc::new(engine)))
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
