//! Session/viewer fan-out: tracks who is watching a storyfragment and
//! publishes belief-change broadcasts for them to pick up over SSE.

pub mod bus;
pub mod error;
pub mod key_expr;
pub mod stream;
pub mod viewers;

pub use bus::{BeliefChangeMessage, SessionFanout, open_embedded_session};
pub use error::{FanoutError, FanoutErrorKind};
pub use key_expr::{ALL_BELIEF_EVENTS, EVENTS_ROOT, belief_broadcast_key, belief_broadcast_pattern};
pub use stream::{DEFAULT_KEEP_ALIVE_SECS, KeepAliveStream, build_belief_change_stream};
pub use viewers::ViewerRegistry;
