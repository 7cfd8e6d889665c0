pub mod error;
pub mod repository;
pub mod timestamp;
pub mod types;

pub use error::{EventRepositoryError, EventRepositoryErrorKind};
pub use repository::EventRepository;
pub use timestamp::parse_tolerant;
pub use types::{ActionEvent, BeliefEvent};
