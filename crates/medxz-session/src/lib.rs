//! Session controller for the medxz client.
//!
//! Owns the authentication lifecycle: verifying a stored session, signing in
//! and out, and switching organization. The UI layer drives it through a
//! [`SessionHandle`] and renders the published [`AuthSnapshot`].

pub mod effects;
pub mod events;
pub mod runtime;
pub mod state;
pub mod task;
pub mod update;

pub use effects::{Toast, ToastKind};
pub use events::CallFailure;
pub use runtime::{SessionController, SessionHandle, ToastReceiver};
pub use state::{AuthSnapshot, Phase};
pub use update::RECHECK_DEBOUNCE;
