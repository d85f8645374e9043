/// ─── GSD Hub Indexer Constants ──────────────────────────────────────────────
///
/// Values mirror the deployed gsd-hub program and the off-chain review rules.
/// Amounts are in base units (lamports for SOL, 10^-6 for USDC).

// ── Program identity ─────────────────────────────────────────────────────────

/// Default gsd-hub program id watched by the dispatcher.
pub const GSD_PROGRAM_ID: &str = "Gn3kafdEiBZ51T5ewMTtXLUDYzECk87kPwxDAjspqYhw";

/// SPL noop program that carries contribution leaves as inner instructions.
pub const NOOP_PROGRAM_ID: &str = "noopb9bkMVfRPU8AsbpTUg8AQkHtKwMYZiFUjNRtMmV";

/// Wrapped SOL mint (swap source for SOL revenue).
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// Mainnet USDC mint.
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// USDC has 6 decimals.
pub const USDC_BASE_UNITS: f64 = 1_000_000.0;

// ── Instruction encoding ─────────────────────────────────────────────────────

/// Length of the Anchor instruction discriminator prefix.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Namespace prepended to instruction names before hashing.
pub const DISCRIMINATOR_NAMESPACE: &str = "global:";

/// Upper bound accepted for a length-prefixed origin signature.
pub const MAX_ORIGIN_SIGNATURE_LEN: usize = 200;

/// Serialized size of a contribution leaf emitted through the noop program.
pub const CONTRIBUTION_LEAF_LEN: usize = 106;

// ── Governance ───────────────────────────────────────────────────────────────

/// Deposits become vote-eligible 7 days after the deposit timestamp.
pub const VOTE_TIMELOCK_SECS: i64 = 604_800;

// ── Revenue split (basis points of 10_000) ───────────────────────────────────

pub const BPS_DENOMINATOR: u64 = 10_000;
pub const DEVELOPER_POOL_BPS: u64 = 6_000;
pub const TREASURY_RESERVE_BPS: u64 = 2_000;
pub const BURN_BPS: u64 = 1_000;
pub const MAINTENANCE_BPS: u64 = 1_000;

/// Slippage tolerance used when quoting the buy-and-burn swap.
pub const BURN_SLIPPAGE_BPS: u16 = 150;

// ── Verification & peer review ───────────────────────────────────────────────

/// Scores and confidences are carried on a 0–10_000 scale.
pub const SCORE_SCALE: u32 = 10_000;

/// Reports below this confidence stay pending and are routed to peer review.
pub const CONFIDENCE_THRESHOLD: u16 = 6_000;

/// Minimum number of reviews before consensus can be reached.
pub const MIN_REVIEWERS: usize = 3;

/// Share of total weight (in bps) one side needs to reach consensus.
pub const CONSENSUS_THRESHOLD_BPS: u64 = 7_000;

/// Subtracted from the weighted score when reviewers disagree.
pub const CONFIDENCE_PENALTY: u32 = 1_000;

/// A reviewer who covered this many of an author's latest submissions in a
/// row is not assigned to the next one.
pub const MAX_CONSECUTIVE_REVIEWS: usize = 3;

/// Days a reviewer has to submit before the assignment lapses.
pub const REVIEW_TIMEOUT_DAYS: u32 = 7;

pub const BUILDER_MIN_CONTRIBUTIONS: u64 = 10;
pub const BUILDER_MIN_DOMAIN_CONTRIBUTIONS: u64 = 3;
pub const ARCHITECT_MIN_CONTRIBUTIONS: u64 = 50;
pub const ARCHITECT_MIN_DOMAIN_CONTRIBUTIONS: u64 = 10;

// ── Contribution scoring ─────────────────────────────────────────────────────

/// Fixed-point precision for the square-root terms of the contribution score.
pub const SCORE_PRECISION: u128 = 1_000_000;

/// Half-life applied to verification scores when computing decayed totals.
pub const DECAY_HALF_LIFE_DAYS: f64 = 180.0;

// ── Backfill ─────────────────────────────────────────────────────────────────

pub const BACKFILL_BATCH_SIZE: usize = 15;

/// Pause between batches; keeps the external scorer under its rate limit.
pub const BACKFILL_BATCH_DELAY_MS: u64 = 240_000;
