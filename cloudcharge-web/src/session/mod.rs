//! Login session.
//!
//! The session is the only client-side state that outlives a page: the auth
//! token and the logged-in user's summary. It is held by one process-wide
//! [`SessionHandle`] that is loaded explicitly at startup, injected into the
//! web layer through application state, and cleared on logout. A
//! [`SessionStore`] persists it as a small JSON file.

mod error;
mod handle;
mod store;

pub use error::SessionError;
pub use handle::SessionHandle;
pub use store::{SessionData, SessionStore};
