pub mod engine;
pub mod error;
pub mod matcher;
pub mod types;
pub mod validator;

pub use engine::{ContentTitleLookup, WarmingConfig, WarmingEngine};
pub use error::{WarmingError, WarmingErrorKind};
pub use types::{EpinetAnalysis, EpinetConfig, EpinetStep};
pub use validator::{CacheValidator, RangeAction, RangeStatus};
