//! SOCKS5 wire protocol.
//!
//! Typed frames and their byte-exact codecs for the four message groups:
//! method negotiation, username/password sub-negotiation, request/reply,
//! and address encoding.

pub mod addr;
pub mod auth;
pub mod constants;
pub mod method;
pub mod request;

pub use addr::Address;
pub use auth::UserPassword;
pub use constants::*;
pub use method::Method;
pub use request::{Command, Reply, ReplyCode, Request};
