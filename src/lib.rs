//! SOCKS5 client and server implementations.
//!
//! Wire protocol per RFC 1928, with username/password sub-negotiation per
//! RFC 1929. The library exposes a [`Client`] for dialing through a proxy,
//! a [`Server`] with pluggable method selection, authentication, and
//! request handling, and the relay pump that joins the two sides of a
//! CONNECT.

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod server;
pub mod stream;

pub use client::Client;
pub use error::{Error, Result};
pub use protocol::{Address, Command, Method, Reply, ReplyCode, Request, UserPassword};
pub use server::Server;
pub use stream::{BoxedStream, ProxyStream};
