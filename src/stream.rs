//! Byte-stream abstraction consumed by the protocol core.

use tokio::io::{AsyncRead, AsyncWrite};

/// Capability set the core needs from a connection: exact reads, complete
/// writes, close on drop. Implemented by `TcpStream` and anything else that
/// is a bidirectional tokio stream.
pub trait ProxyStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ProxyStream for T {}

/// Owned, type-erased stream handed back by request handlers.
pub type BoxedStream = Box<dyn ProxyStream>;

impl std::fmt::Debug for dyn ProxyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn ProxyStream")
    }
}
