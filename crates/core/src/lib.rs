//! Session lifecycle for a single headless WhatsApp Web session.
//!
//! The crate owns everything between "a browser can be launched" and
//! "operators can see whether the session is usable":
//!
//! - [`store`]: durable, atomically written cookie sessions
//! - [`automation`]: the browser capability contract the lifecycle drives
//! - [`detect`]: racing page markers to tell a logged-in page from a login challenge
//! - [`lifecycle`]: the state machine, retry policy, and keep-alive loop
//! - [`status`]: the published snapshot read by the HTTP layer
//!
//! No browser engine is linked here. `wak-runtime` provides the Chromium
//! implementation of [`AutomationEngine`], and the `fake` feature adds
//! `wak::fake`, a scripted one for tests.

pub mod automation;
pub mod config;
pub mod detect;
pub mod error;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
pub mod health;
pub mod lifecycle;
pub mod retry;
pub mod session;
pub mod status;
pub mod store;

pub use automation::{AutomationEngine, AutomationHandle, LaunchOptions};
pub use config::LifecycleConfig;
pub use detect::{Marker, MarkerSet};
pub use error::{AutomationError, LifecycleError, Result, StoreError};
pub use lifecycle::LifecycleController;
pub use retry::RetryPolicy;
pub use session::Session;
pub use status::{LifecycleState, StatusReader, StatusSnapshot};
pub use store::{FileSessionStore, SessionStore, StoredSession};
pub use wak_protocol::{CookieRecord, SameSite};
