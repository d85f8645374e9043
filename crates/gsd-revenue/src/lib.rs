pub mod distributor;
pub mod jupiter;
pub mod settlement;
pub mod signer;
pub mod solana;
pub mod split;

pub use distributor::{Distribution, RevenueDistributor};
pub use jupiter::JupiterClient;
pub use settlement::{
    BurnResult, ChainClient, QuoteRequest, SettlementConfig, SettlementEngine, SwapQuote, SwapVenue,
    TransactionSigner,
};
pub use signer::KeypairSigner;
pub use solana::SolanaRpcClient;
pub use split::{compute_split, recorded_event, RevenueSplit};
