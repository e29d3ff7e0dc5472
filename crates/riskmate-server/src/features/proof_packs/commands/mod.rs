pub mod generate;

pub use generate::{GenerateProofPackError, GeneratedProofPack, PROOF_PACK_MIN_ROLE};
