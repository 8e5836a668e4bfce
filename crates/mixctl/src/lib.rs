//! Remote-control client core for the mixplay daemon.
//!
//! [`core::ClientCore`] owns the session, the command dispatcher, the status
//! poller, the popup coordinator and the reorder protocol, and talks to the
//! outside world through two seams: a [`transport::Transport`] for HTTP and a
//! [`renderer::ViewRenderer`] for the view.

pub mod core;
pub mod dispatcher;
pub mod intent;
pub mod menus;
pub mod poller;
pub mod popup;
pub mod prefs;
pub mod renderer;
pub mod reorder;
pub mod session;
pub mod transport;

pub use crate::core::{ClientCore, CoreOptions};
pub use intent::Intent;
pub use renderer::ViewRenderer;
pub use transport::{HttpTransport, Transport};
