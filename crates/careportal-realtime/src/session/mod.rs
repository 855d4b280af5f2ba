//! Login-scoped lifecycle on top of [`crate::RealtimeClient`].
//!
//! [`PortalSession`] connects on login, subscribes to the user's
//! notifications, disconnects on logout, and turns inbound traffic into
//! [`SessionEvent`]s and toasts.

mod portal;
mod types;


pub use portal::PortalSession;
pub use types::{PortalUser, SessionEvent, SessionStatus, CONNECTION_LOST_TOAST};
