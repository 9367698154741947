//! Default CONNECT request handler.

use std::io;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::debug;

use super::RequestHandler;
use crate::error::{Error, Result};
use crate::protocol::{Address, Command, Reply, ReplyCode, Request, UserPassword};
use crate::stream::BoxedStream;

/// Default request handler: CONNECT dials the destination over TCP; every
/// other command is answered with *command not supported*. Domain-name
/// destinations are resolved by the OS at dial time.
pub struct TcpConnect;

#[async_trait]
impl RequestHandler for TcpConnect {
    async fn handle(
        &self,
        _auth: Option<&UserPassword>,
        req: &Request,
    ) -> Result<(Reply, BoxedStream)> {
        match req.cmd {
            Command::Connect => connect_tcp(&req.dst).await,
            other => Err(Error::CommandUnsupported(other.as_u8())),
        }
    }
}

async fn connect_tcp(dst: &Address) -> Result<(Reply, BoxedStream)> {
    let stream = match dst {
        Address::Ipv4(ip, port) => TcpStream::connect((*ip, *port)).await,
        Address::Ipv6(ip, port) => TcpStream::connect((*ip, *port)).await,
        Address::Domain(name, port) => {
            let host = String::from_utf8_lossy(name);
            TcpStream::connect((host.as_ref(), *port)).await
        }
    }
    .map_err(|e| Error::Dial {
        code: dial_reply_code(&e),
        source: e,
    })?;

    let local = Address::from_socket_addr(stream.local_addr()?);
    debug!(target = %dst, bound = %local, "target connected");
    Ok((Reply::new(ReplyCode::Succeeded, local), Box::new(stream)))
}

/// Pick the reply code for a failed dial. Structured error kinds first; the
/// error text carries the distinction on platforms that report the rest as
/// `Other`.
fn dial_reply_code(err: &io::Error) -> ReplyCode {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => ReplyCode::ConnectionRefused,
        io::ErrorKind::NetworkUnreachable => ReplyCode::NetworkUnreachable,
        io::ErrorKind::HostUnreachable => ReplyCode::HostUnreachable,
        io::ErrorKind::TimedOut => ReplyCode::TtlExpired,
        _ => {
            let text = err.to_string();
            if text.contains("refused") {
                ReplyCode::ConnectionRefused
            } else if text.contains("unreachable") {
                ReplyCode::NetworkUnreachable
            } else {
                ReplyCode::HostUnreachable
            }
        }
    }
}
