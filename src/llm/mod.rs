pub mod chunk;
pub mod client;
mod error;
pub mod prompt;
pub mod providers;
pub mod retry;

pub use client::{create_client, LlmClient};
pub use error::RequestError;
pub use prompt::{OperationKind, Prompt};
pub use retry::{complete_with_retry, RetryPolicy};
