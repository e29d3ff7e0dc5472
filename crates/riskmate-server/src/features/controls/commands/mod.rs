pub mod complete;
pub mod create;

pub use complete::CompleteControlError;
pub use create::{CreateControlCommand, CreateControlError};
