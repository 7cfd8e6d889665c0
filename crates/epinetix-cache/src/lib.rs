pub mod entity_cache;
pub mod error;
pub mod store;
pub mod types;

pub use entity_cache::{deserialize, serialize, EntityCache};
pub use error::{CacheError, CacheErrorKind};
pub use store::CacheStore;
pub use types::{
    BeliefState, FingerprintState, GateType, HourlyEpinetBin, HtmlFragment, HtmlVariant,
    PaneBeliefData, StepInfo, StoryfragmentBeliefRegistry, TransitionInfo,
};
