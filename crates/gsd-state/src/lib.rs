pub mod db;
mod governance;
mod revenue;
mod verification;

pub use db::StateDb;
pub use governance::{TransitionOutcome, VoteOutcome};
