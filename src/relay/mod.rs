//! Data relay between a client connection and its upstream target.

pub mod pump;
pub mod session;

pub use pump::{pipe, Direction};
pub use session::RelaySession;
