pub mod error;
pub mod factory;
pub mod service;
pub mod strategy;
pub mod types;
pub mod validation;

pub use error::{ErrorKind, StrategyError, SummaryError};
pub use factory::{classify_label, FactoryBuilder, SummaryStrategyFactory};
pub use service::DocumentSummaryService;
pub use strategy::{
    DocumentStrategy, RetryPolicy, StrategyKind, StrategyOutput, SummaryEngine, SummaryStrategy,
};
pub use types::{RequestPhase, SummaryRequest, SummaryResponse};
pub use validation::{validate_summary, SummaryValidation};
