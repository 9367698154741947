//! Method negotiation codec.
//!
//! Client sends `VER NMETHODS METHODS...`; server answers `VER METHOD`.
//! Unrecognized method bytes are carried through opaquely so selectors can
//! see everything the client offered.

use std::fmt;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::protocol::constants::*;

/// Authentication method tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// No authentication required (0x00)
    NoAuth,
    /// Username/password sub-negotiation (0x02)
    UsernamePassword,
    /// No acceptable methods (0xFF)
    NoAcceptable,
    /// Any other value, passed through opaquely
    Other(u8),
}

impl Method {
    pub fn from_u8(code: u8) -> Self {
        match code {
            SOCKS5_AUTH_NONE => Method::NoAuth,
            SOCKS5_AUTH_USERPASS => Method::UsernamePassword,
            SOCKS5_AUTH_NO_ACCEPTABLE => Method::NoAcceptable,
            other => Method::Other(other),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Method::NoAuth => SOCKS5_AUTH_NONE,
            Method::UsernamePassword => SOCKS5_AUTH_USERPASS,
            Method::NoAcceptable => SOCKS5_AUTH_NO_ACCEPTABLE,
            Method::Other(code) => *code,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Method::NoAuth => "no authentication required",
            Method::UsernamePassword => "username/password",
            Method::NoAcceptable => "no acceptable methods",
            Method::Other(code) => return write!(f, "unknown method: {:#04x}", code),
        };
        f.write_str(text)
    }
}

/// Send the client's method list. Fails locally on an empty or oversize
/// list; nothing is written in that case.
pub async fn send_methods<W: AsyncWrite + Unpin>(w: &mut W, methods: &[Method]) -> Result<()> {
    if methods.is_empty() || methods.len() > 255 {
        return Err(Error::InvalidMethods);
    }
    let mut buf = Vec::with_capacity(2 + methods.len());
    buf.push(SOCKS5_VERSION);
    buf.push(methods.len() as u8);
    buf.extend(methods.iter().map(Method::as_u8));
    w.write_all(&buf).await?;
    Ok(())
}

/// Read the client's method list, checking the version byte.
pub async fn read_methods<R: AsyncRead + Unpin>(r: &mut R) -> Result<Vec<Method>> {
    let version = r.read_u8().await?;
    if version != SOCKS5_VERSION {
        return Err(Error::InvalidVersion(version));
    }
    let count = r.read_u8().await? as usize;
    let mut buf = vec![0u8; count];
    r.read_exact(&mut buf).await?;
    Ok(buf.into_iter().map(Method::from_u8).collect())
}

/// Send the server's method selection.
pub async fn send_selection<W: AsyncWrite + Unpin>(w: &mut W, method: Method) -> Result<()> {
    w.write_all(&[SOCKS5_VERSION, method.as_u8()]).await?;
    Ok(())
}

/// Read the server's method selection, checking the version byte.
pub async fn read_selection<R: AsyncRead + Unpin>(r: &mut R) -> Result<Method> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf).await?;
    if buf[0] != SOCKS5_VERSION {
        return Err(Error::InvalidVersion(buf[0]));
    }
    Ok(Method::from_u8(buf[1]))
}
