pub mod broadcaster;
pub mod error;
pub mod evaluation;
pub mod registry;
pub mod types;

pub use broadcaster::{BeliefBroadcaster, ViewerTracker};
pub use error::{BeliefError, BeliefErrorKind};
pub use evaluation::BeliefEvaluationEngine;
pub use registry::BeliefRegistryService;
pub use types::{BroadcastTarget, PaneInput, Visibility};
