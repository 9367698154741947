//! Request and reply codec.
//!
//! Request: `VER CMD RSV DST`. Reply: `VER REP RSV BND`. The reserved byte
//! is written as 0x00 and tolerated as any value on read.

use std::fmt;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::protocol::addr::Address;
use crate::protocol::constants::*;

/// SOCKS5 command tag. Unknown bytes are carried through so a request
/// handler can decide what to do with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Bind,
    UdpAssociate,
    Other(u8),
}

impl Command {
    pub fn from_u8(code: u8) -> Self {
        match code {
            SOCKS5_CMD_CONNECT => Command::Connect,
            SOCKS5_CMD_BIND => Command::Bind,
            SOCKS5_CMD_UDP_ASSOCIATE => Command::UdpAssociate,
            other => Command::Other(other),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Command::Connect => SOCKS5_CMD_CONNECT,
            Command::Bind => SOCKS5_CMD_BIND,
            Command::UdpAssociate => SOCKS5_CMD_UDP_ASSOCIATE,
            Command::Other(code) => *code,
        }
    }

    /// Map a dial network name to the command it implies.
    pub fn from_network(network: &str) -> Result<Self> {
        match network {
            "tcp" | "tcp4" | "tcp6" => Ok(Command::Connect),
            "udp" | "udp4" | "udp6" => Ok(Command::UdpAssociate),
            other => Err(Error::NetworkUnsupported(other.to_string())),
        }
    }
}

/// Reply code of a SOCKS5 reply frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCode {
    Succeeded,
    GeneralFailure,
    ConnectionNotAllowed,
    NetworkUnreachable,
    HostUnreachable,
    ConnectionRefused,
    TtlExpired,
    CommandNotSupported,
    AddressNotSupported,
    /// Sentinel used when a request failed for an unknown reason (0xFF)
    Failure,
    Other(u8),
}

impl ReplyCode {
    pub fn from_u8(code: u8) -> Self {
        match code {
            SOCKS5_REPLY_SUCCESS => ReplyCode::Succeeded,
            SOCKS5_REPLY_GENERAL_FAILURE => ReplyCode::GeneralFailure,
            SOCKS5_REPLY_CONNECTION_NOT_ALLOWED => ReplyCode::ConnectionNotAllowed,
            SOCKS5_REPLY_NETWORK_UNREACHABLE => ReplyCode::NetworkUnreachable,
            SOCKS5_REPLY_HOST_UNREACHABLE => ReplyCode::HostUnreachable,
            SOCKS5_REPLY_CONNECTION_REFUSED => ReplyCode::ConnectionRefused,
            SOCKS5_REPLY_TTL_EXPIRED => ReplyCode::TtlExpired,
            SOCKS5_REPLY_COMMAND_NOT_SUPPORTED => ReplyCode::CommandNotSupported,
            SOCKS5_REPLY_ADDRESS_TYPE_NOT_SUPPORTED => ReplyCode::AddressNotSupported,
            SOCKS5_REPLY_FAILURE => ReplyCode::Failure,
            other => ReplyCode::Other(other),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            ReplyCode::Succeeded => SOCKS5_REPLY_SUCCESS,
            ReplyCode::GeneralFailure => SOCKS5_REPLY_GENERAL_FAILURE,
            ReplyCode::ConnectionNotAllowed => SOCKS5_REPLY_CONNECTION_NOT_ALLOWED,
            ReplyCode::NetworkUnreachable => SOCKS5_REPLY_NETWORK_UNREACHABLE,
            ReplyCode::HostUnreachable => SOCKS5_REPLY_HOST_UNREACHABLE,
            ReplyCode::ConnectionRefused => SOCKS5_REPLY_CONNECTION_REFUSED,
            ReplyCode::TtlExpired => SOCKS5_REPLY_TTL_EXPIRED,
            ReplyCode::CommandNotSupported => SOCKS5_REPLY_COMMAND_NOT_SUPPORTED,
            ReplyCode::AddressNotSupported => SOCKS5_REPLY_ADDRESS_TYPE_NOT_SUPPORTED,
            ReplyCode::Failure => SOCKS5_REPLY_FAILURE,
            ReplyCode::Other(code) => *code,
        }
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ReplyCode::Succeeded => "succeeded",
            ReplyCode::GeneralFailure => "general SOCKS server failure",
            ReplyCode::ConnectionNotAllowed => "connection not allowed by ruleset",
            ReplyCode::NetworkUnreachable => "network unreachable",
            ReplyCode::HostUnreachable => "host unreachable",
            ReplyCode::ConnectionRefused => "connection refused",
            ReplyCode::TtlExpired => "TTL expired",
            ReplyCode::CommandNotSupported => "command not supported",
            ReplyCode::AddressNotSupported => "address type not supported",
            ReplyCode::Failure => "failure",
            ReplyCode::Other(code) => return write!(f, "unknown code: {:#04x}", code),
        };
        f.write_str(text)
    }
}

/// Client request: a command and its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub cmd: Command,
    pub dst: Address,
}

impl Request {
    /// Build a request from a dial-style `(network, address)` pair.
    pub fn new(network: &str, address: &str) -> Result<Self> {
        Ok(Request {
            cmd: Command::from_network(network)?,
            dst: address.parse()?,
        })
    }

    pub async fn read_from<R: AsyncRead + Unpin>(r: &mut R) -> Result<Self> {
        let mut head = [0u8; 3];
        r.read_exact(&mut head).await?;
        if head[0] != SOCKS5_VERSION {
            return Err(Error::InvalidVersion(head[0]));
        }
        let dst = Address::read_from(r).await?;
        Ok(Request {
            cmd: Command::from_u8(head[1]),
            dst,
        })
    }

    pub async fn write_to<W: AsyncWrite + Unpin>(&self, w: &mut W) -> Result<()> {
        let addr = self.dst.to_bytes()?;
        let mut buf = Vec::with_capacity(3 + addr.len());
        buf.extend_from_slice(&[SOCKS5_VERSION, self.cmd.as_u8(), SOCKS5_RESERVED]);
        buf.extend_from_slice(&addr);
        w.write_all(&buf).await?;
        Ok(())
    }
}

/// Server reply: a code and the bound address (local endpoint of the
/// upstream connection on success, `0.0.0.0:0` otherwise).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: ReplyCode,
    pub bind: Address,
}

impl Reply {
    pub fn new(code: ReplyCode, bind: Address) -> Self {
        Reply { code, bind }
    }

    /// Failure reply with the canonical placeholder bound address.
    pub fn failure(code: ReplyCode) -> Self {
        Reply {
            code,
            bind: Address::unspecified(),
        }
    }

    pub async fn read_from<R: AsyncRead + Unpin>(r: &mut R) -> Result<Self> {
        let mut head = [0u8; 3];
        r.read_exact(&mut head).await?;
        if head[0] != SOCKS5_VERSION {
            return Err(Error::InvalidVersion(head[0]));
        }
        let bind = Address::read_from(r).await?;
        Ok(Reply {
            code: ReplyCode::from_u8(head[1]),
            bind,
        })
    }

    pub async fn write_to<W: AsyncWrite + Unpin>(&self, w: &mut W) -> Result<()> {
        let addr = self.bind.to_bytes()?;
        let mut buf = Vec::with_capacity(3 + addr.len());
        buf.extend_from_slice(&[SOCKS5_VERSION, self.code.as_u8(), SOCKS5_RESERVED]);
        buf.extend_from_slice(&addr);
        w.write_all(&buf).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn connect_request_bytes() {
        let req = Request::new("tcp", "192.0.2.1:245").unwrap();
        let mut buf = Vec::new();
        req.write_to(&mut buf).await.unwrap();
        assert_eq!(
            buf,
            [0x05, 0x01, 0x00, 0x01, 0xC0, 0x00, 0x02, 0x01, 0x00, 0xF5]
        );
    }

    #[tokio::test]
    async fn domain_request_bytes() {
        let req = Request::new("tcp", "hello.com:16").unwrap();
        let mut buf = Vec::new();
        req.write_to(&mut buf).await.unwrap();
        assert_eq!(
            &buf[3..],
            [0x03, 0x09, 0x68, 0x65, 0x6C, 0x6C, 0x6F, 0x2E, 0x63, 0x6F, 0x6D, 0x00, 0x10]
        );
    }

    #[tokio::test]
    async fn request_roundtrip() {
        let req = Request::new("udp", "[2001:db8::1]:53").unwrap();
        assert_eq!(req.cmd, Command::UdpAssociate);
        let mut buf = Vec::new();
        req.write_to(&mut buf).await.unwrap();
        let decoded = Request::read_from(&mut buf.as_slice()).await.unwrap();
        assert_eq!(decoded, req);
    }

    #[tokio::test]
    async fn reserved_byte_tolerated_on_read() {
        let bytes = [0x05u8, 0x01, 0x7A, 0x01, 127, 0, 0, 1, 0x00, 0x50];
        let req = Request::read_from(&mut bytes.as_slice()).await.unwrap();
        assert_eq!(req.cmd, Command::Connect);
        assert_eq!(req.dst, Address::Ipv4(Ipv4Addr::LOCALHOST, 80));
    }

    #[tokio::test]
    async fn reply_roundtrip() {
        let reply = Reply::new(
            ReplyCode::Succeeded,
            Address::Ipv4(Ipv4Addr::new(10, 1, 2, 3), 4321),
        );
        let mut buf = Vec::new();
        reply.write_to(&mut buf).await.unwrap();
        let decoded = Reply::read_from(&mut buf.as_slice()).await.unwrap();
        assert_eq!(decoded, reply);
    }

    #[tokio::test]
    async fn failure_reply_bytes() {
        let reply = Reply::failure(ReplyCode::CommandNotSupported);
        let mut buf = Vec::new();
        reply.write_to(&mut buf).await.unwrap();
        assert_eq!(buf, [0x05, 0x07, 0x00, 0x01, 0, 0, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn reply_rejects_bad_version() {
        let bytes = [0x04u8, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            Reply::read_from(&mut bytes.as_slice()).await.unwrap_err(),
            Error::InvalidVersion(0x04)
        ));
    }

    #[test]
    fn unknown_network_rejected() {
        assert!(matches!(
            Command::from_network("unix").unwrap_err(),
            Error::NetworkUnsupported(_)
        ));
    }

    #[test]
    fn reply_code_text() {
        assert_eq!(ReplyCode::ConnectionRefused.to_string(), "connection refused");
        assert_eq!(ReplyCode::from_u8(0x42).to_string(), "unknown code: 0x42");
    }
}
