//! Proof packs: ZIP bundles of reports, the raw ledger segment and a
//! manifest of file hashes, handed to insurers and auditors

pub mod archive;
pub mod commands;
pub mod queries;
pub mod routes;
pub mod types;

pub use archive::{build_pack, BuiltPack, PackContents};
pub use routes::proof_packs_routes;
pub use types::{ProofPackRecord, ProofPackScope};
