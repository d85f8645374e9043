//! gsd-codec: decoding of gsd-hub instruction data.
//!
//! Base58 transport encoding, Anchor discriminators, fixed-offset field
//! reads, and the typed instruction set built on top of them.

pub mod base58;
pub mod discriminator;
pub mod instruction;
pub mod reader;

pub use base58::{decode_base58, encode_base58};
pub use discriminator::{discriminator_of, encode_instruction_data, name_of, name_of_bytes, sha256, INSTRUCTION_NAMES};
pub use instruction::{
    ContributionIx, ContributionLeaf, DelegationIx, GovernanceIx, Instruction, RevenueIx, VerificationIx,
};
pub use reader::FieldReader;
