pub mod upload;

pub use upload::UploadEvidenceError;
