//! Banter session synchronization
//!
//! The session record lives server-side; this crate keeps the one local
//! mirror of it:
//! - The session id is cached in local settings and reused across restarts
//! - Each mutator issues one field-scoped write, then updates only that
//!   field group in the mirror on success
//! - Mutators are silent no-ops until a session id is known
//! - Failures are recorded in a last-error slot so the host view can render
//!   them instead of crashing
//! - Two rapid writes to the same field are last-response-wins

mod error;
mod sync;

pub use error::SessionError;
pub use sync::SessionSync;

pub type Result<T> = std::result::Result<T, SessionError>;
