//! Bot module - Core bot functionality.

pub mod dispatcher;
pub mod keepalive;
pub mod maintenance;
pub mod rate_limit;
mod runtime;

pub use dispatcher::{AppState, build_dispatcher};
pub use runtime::run;
