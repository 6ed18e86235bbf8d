mod http;

pub use http::{HttpStatusApi, RawStatus, StatusApi, TransportError};

#[cfg(test)]
pub use http::MockStatusApi;
