//! SOCKS5 address representation and wire codec.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::protocol::constants::*;

/// Destination or bound address of a SOCKS5 request/reply.
///
/// Every variant carries its port. Domain names are 1 to 255 raw bytes,
/// intended to be ASCII but not validated; they are forwarded verbatim and
/// resolution is left to whoever dials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Ipv4(Ipv4Addr, u16),
    Ipv6(Ipv6Addr, u16),
    Domain(Vec<u8>, u16),
}

impl Address {
    /// Create a domain-name address, enforcing the 1..=255 byte bound.
    pub fn domain(name: impl Into<Vec<u8>>, port: u16) -> Result<Self> {
        let name = name.into();
        if name.is_empty() || name.len() > 255 {
            return Err(Error::InvalidDomainName(
                String::from_utf8_lossy(&name).into_owned(),
            ));
        }
        Ok(Address::Domain(name, port))
    }

    /// The canonical `0.0.0.0:0` placeholder used in failure replies.
    pub fn unspecified() -> Self {
        Address::Ipv4(Ipv4Addr::UNSPECIFIED, 0)
    }

    pub fn from_socket_addr(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(v4) => Address::Ipv4(*v4.ip(), v4.port()),
            SocketAddr::V6(v6) => Address::Ipv6(*v6.ip(), v6.port()),
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            Address::Ipv4(_, port) | Address::Ipv6(_, port) | Address::Domain(_, port) => *port,
        }
    }

    /// Address-type byte for this variant.
    pub fn atyp(&self) -> u8 {
        match self {
            Address::Ipv4(..) => SOCKS5_ADDR_IPV4,
            Address::Ipv6(..) => SOCKS5_ADDR_IPV6,
            Address::Domain(..) => SOCKS5_ADDR_DOMAIN,
        }
    }

    /// Read an address (type byte, payload, port) from the stream.
    pub async fn read_from<R: AsyncRead + Unpin>(r: &mut R) -> Result<Self> {
        let atyp = r.read_u8().await?;
        match atyp {
            SOCKS5_ADDR_IPV4 => {
                let mut octets = [0u8; 4];
                r.read_exact(&mut octets).await?;
                let port = r.read_u16().await?;
                Ok(Address::Ipv4(Ipv4Addr::from(octets), port))
            }
            SOCKS5_ADDR_IPV6 => {
                let mut octets = [0u8; 16];
                r.read_exact(&mut octets).await?;
                let port = r.read_u16().await?;
                Ok(Address::Ipv6(Ipv6Addr::from(octets), port))
            }
            SOCKS5_ADDR_DOMAIN => {
                let len = r.read_u8().await? as usize;
                if len == 0 {
                    return Err(Error::InvalidDomainName(String::new()));
                }
                let mut name = vec![0u8; len];
                r.read_exact(&mut name).await?;
                let port = r.read_u16().await?;
                Ok(Address::Domain(name, port))
            }
            other => Err(Error::BadAddressType(other)),
        }
    }

    /// Serialize to the SOCKS5 wire format (type byte, payload, port).
    ///
    /// A domain name outside 1..=255 bytes is a contract violation and fails
    /// here without touching the stream.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(1 + 16 + 2);
        buf.push(self.atyp());
        match self {
            Address::Ipv4(ip, _) => buf.extend_from_slice(&ip.octets()),
            Address::Ipv6(ip, _) => buf.extend_from_slice(&ip.octets()),
            Address::Domain(name, _) => {
                if name.is_empty() || name.len() > 255 {
                    return Err(Error::InvalidDomainName(
                        String::from_utf8_lossy(name).into_owned(),
                    ));
                }
                buf.push(name.len() as u8);
                buf.extend_from_slice(name);
            }
        }
        buf.extend_from_slice(&self.port().to_be_bytes());
        Ok(buf)
    }

    /// Serialize and write to the stream in one go.
    pub async fn write_to<W: AsyncWrite + Unpin>(&self, w: &mut W) -> Result<()> {
        let buf = self.to_bytes()?;
        w.write_all(&buf).await?;
        Ok(())
    }
}

impl FromStr for Address {
    type Err = Error;

    /// Parse a textual `host:port`. The host is tried as an IP literal
    /// first (IPv6 in brackets); anything that does not parse as an IP
    /// becomes a domain name. IPv4-mapped IPv6 literals collapse to IPv4.
    fn from_str(s: &str) -> Result<Self> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidAddress(s.to_string()))?;
        if host.is_empty() || port.is_empty() {
            return Err(Error::InvalidAddress(s.to_string()));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| Error::InvalidAddress(s.to_string()))?;

        let host = match host.strip_prefix('[') {
            Some(inner) => inner
                .strip_suffix(']')
                .ok_or_else(|| Error::InvalidAddress(s.to_string()))?,
            None if host.contains(':') => return Err(Error::InvalidAddress(s.to_string())),
            None => host,
        };

        match host.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) => Ok(Address::Ipv4(ip, port)),
            Ok(IpAddr::V6(ip)) => match ip.to_ipv4_mapped() {
                Some(v4) => Ok(Address::Ipv4(v4, port)),
                None => Ok(Address::Ipv6(ip, port)),
            },
            Err(_) => Address::domain(host, port),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Ipv4(ip, port) => write!(f, "{}:{}", ip, port),
            Address::Ipv6(ip, port) => write!(f, "[{}]:{}", ip, port),
            Address::Domain(name, port) => {
                write!(f, "{}:{}", String::from_utf8_lossy(name), port)
            }
        }
    }
}
