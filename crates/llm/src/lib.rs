pub mod provider;
pub mod providers;

pub use provider::{LlmError, LlmErrorKind, LlmProvider};
pub use providers::create_provider;
