pub mod get;
pub mod list;

pub use get::{fetch_job, lock_job, require_job, require_open_job, GetJobError, JobAccessError};
pub use list::{ListJobsQuery, ListJobsResult};
