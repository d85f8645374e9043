//! gsd-rpc
//!
//! Network surface of the indexer node.
//!
//! JSON-RPC 2.0, namespace "gsd":
//!   gsd_getRound / gsd_listRounds / gsd_getIdea / gsd_listIdeas
//!   gsd_getVote / gsd_getDeposit
//!   gsd_getDelegationsForWallet / gsd_getDelegateStats
//!   gsd_getRevenueEvent / gsd_listRevenueEvents
//!   gsd_listPendingRevenue / gsd_promotePendingRevenue
//!   gsd_getReport / gsd_listPeerReviews / gsd_getConsensus
//!   gsd_assignReviewers
//!   gsd_startBackfill / gsd_cancelBackfill / gsd_getBackfillStatus
//!   gsd_getContributionScore / gsd_getIndexerStats
//!
//! Webhook (axum): `POST /webhooks/helius`, `GET /health`.

pub mod api;
pub mod server;
pub mod types;
pub mod webhook;

pub use server::{RpcServer, RpcServerState};
pub use types::{RpcAssignment, RpcDelegateStats};
pub use webhook::{WebhookResponse, WebhookServer, WebhookState};
