pub mod file_source;
pub mod http_client;
pub mod signer;

pub use file_source::FileSource;
pub use http_client::{ReqwestSink, ReqwestSource, RetryPolicy};
pub use signer::sign_payload;
