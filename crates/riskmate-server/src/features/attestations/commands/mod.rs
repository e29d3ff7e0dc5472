pub mod sign;

pub use sign::{SignAttestationCommand, SignAttestationError};
