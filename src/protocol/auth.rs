//! Username/password sub-negotiation codec (RFC 1929).
//!
//! Auth frame: `VER ULEN UNAME PLEN PASSWD`. Status frame: `VER STATUS`,
//! 0x00 success, anything else failure. Both frames open with 0x05 here
//! rather than the 0x01 RFC 1929 specifies; peers of this implementation
//! expect 0x05.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::protocol::constants::*;

/// Credentials for the username/password method. Each field is a byte
/// string of at most 255 bytes, enforced on construction and on send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPassword {
    pub username: Vec<u8>,
    pub password: Vec<u8>,
}

impl UserPassword {
    pub fn new(username: impl Into<Vec<u8>>, password: impl Into<Vec<u8>>) -> Result<Self> {
        let auth = UserPassword {
            username: username.into(),
            password: password.into(),
        };
        if auth.username.len() > 255 || auth.password.len() > 255 {
            return Err(Error::InvalidAuth);
        }
        Ok(auth)
    }

    /// Compare against an expected username/password pair.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.username == username.as_bytes() && self.password == password.as_bytes()
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.username.len() > 255 || self.password.len() > 255 {
            return Err(Error::InvalidAuth);
        }
        let mut buf = Vec::with_capacity(3 + self.username.len() + self.password.len());
        buf.push(SOCKS5_VERSION);
        buf.push(self.username.len() as u8);
        buf.extend_from_slice(&self.username);
        buf.push(self.password.len() as u8);
        buf.extend_from_slice(&self.password);
        Ok(buf)
    }
}

/// Send the auth frame. Oversize credentials fail locally without touching
/// the stream.
pub async fn send_auth<W: AsyncWrite + Unpin>(w: &mut W, auth: &UserPassword) -> Result<()> {
    let buf = auth.to_bytes()?;
    w.write_all(&buf).await?;
    Ok(())
}

/// Read the auth frame, checking the version byte.
pub async fn read_auth<R: AsyncRead + Unpin>(r: &mut R) -> Result<UserPassword> {
    let version = r.read_u8().await?;
    if version != SOCKS5_VERSION {
        return Err(Error::InvalidVersion(version));
    }
    let ulen = r.read_u8().await? as usize;
    let mut username = vec![0u8; ulen];
    r.read_exact(&mut username).await?;
    let plen = r.read_u8().await? as usize;
    let mut password = vec![0u8; plen];
    r.read_exact(&mut password).await?;
    Ok(UserPassword { username, password })
}

/// Send the auth status frame.
pub async fn send_auth_status<W: AsyncWrite + Unpin>(w: &mut W, success: bool) -> Result<()> {
    let status = if success {
        SOCKS5_AUTH_STATUS_SUCCESS
    } else {
        SOCKS5_AUTH_STATUS_FAILURE
    };
    w.write_all(&[SOCKS5_VERSION, status]).await?;
    Ok(())
}

/// Read the auth status frame; any non-zero status is a failure.
pub async fn read_auth_status<R: AsyncRead + Unpin>(r: &mut R) -> Result<()> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf).await?;
    if buf[0] != SOCKS5_VERSION {
        return Err(Error::InvalidVersion(buf[0]));
    }
    if buf[1] != SOCKS5_AUTH_STATUS_SUCCESS {
        return Err(Error::AuthFailed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn auth_frame_bytes() {
        let auth = UserPassword::new("abc", "12345678").unwrap();
        let mut buf = Vec::new();
        send_auth(&mut buf, &auth).await.unwrap();
        assert_eq!(
            buf,
            [
                0x05, 0x03, 0x61, 0x62, 0x63, 0x08, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38
            ]
        );
    }

    #[tokio::test]
    async fn auth_frame_roundtrip() {
        let auth = UserPassword::new("user", "pass").unwrap();
        let mut buf = Vec::new();
        send_auth(&mut buf, &auth).await.unwrap();
        let decoded = read_auth(&mut buf.as_slice()).await.unwrap();
        assert_eq!(decoded, auth);
    }

    #[test]
    fn credential_length_bounds() {
        assert!(UserPassword::new("", "").is_ok());
        assert!(UserPassword::new("a".repeat(255), "b".repeat(255)).is_ok());
        assert!(UserPassword::new("a".repeat(256), "pw").is_err());
        assert!(UserPassword::new("user", "b".repeat(256)).is_err());
    }

    #[tokio::test]
    async fn empty_credentials_roundtrip() {
        let auth = UserPassword::new("", "").unwrap();
        let mut buf = Vec::new();
        send_auth(&mut buf, &auth).await.unwrap();
        assert_eq!(buf, [0x05, 0x00, 0x00]);
        let decoded = read_auth(&mut buf.as_slice()).await.unwrap();
        assert_eq!(decoded, auth);
    }

    #[tokio::test]
    async fn status_success_bytes() {
        let mut buf = Vec::new();
        send_auth_status(&mut buf, true).await.unwrap();
        assert_eq!(buf, [0x05, 0x00]);
        assert!(read_auth_status(&mut buf.as_slice()).await.is_ok());
    }

    #[tokio::test]
    async fn any_nonzero_status_is_failure() {
        for status in [0x01u8, 0x7F, 0xFF] {
            let bytes = [0x05, status];
            assert!(matches!(
                read_auth_status(&mut bytes.as_slice()).await.unwrap_err(),
                Error::AuthFailed
            ));
        }
    }
}
