mod job_id;
mod status;

pub use job_id::{JobId, JobIdParseError};
pub use status::{JobResult, StatusDecodeError, StatusResponse};
