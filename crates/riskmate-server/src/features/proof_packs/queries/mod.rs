pub mod list;

pub use list::ListProofPacksResult;
