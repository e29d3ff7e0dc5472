pub mod response;

pub use response::{attachment, ApiResponse, ErrorResponse};
