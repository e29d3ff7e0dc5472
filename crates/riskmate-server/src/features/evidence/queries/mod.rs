pub mod download;
pub mod list;

pub use download::DownloadEvidenceError;
