//! SOCKS5 client-side dialer.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{auth, method, Address, Method, Reply, ReplyCode, Request, UserPassword};

/// A SOCKS5 client bound to one proxy address.
///
/// `new` offers only "no authentication required"; `with_auth` offers
/// username/password as well.
#[derive(Debug, Clone)]
pub struct Client {
    proxy: String,
    methods: Vec<Method>,
    auth: Option<UserPassword>,
}

impl Client {
    /// Client that negotiates without authentication.
    pub fn new(proxy: impl Into<String>) -> Self {
        Self {
            proxy: proxy.into(),
            methods: vec![Method::NoAuth],
            auth: None,
        }
    }

    /// Client that offers username/password alongside no-auth.
    pub fn with_auth(proxy: impl Into<String>, username: &str, password: &str) -> Result<Self> {
        let auth = UserPassword::new(username, password)?;
        Ok(Self {
            proxy: proxy.into(),
            methods: vec![Method::UsernamePassword, Method::NoAuth],
            auth: Some(auth),
        })
    }

    /// Dial `address` through the proxy. `network` selects the command:
    /// tcp/tcp4/tcp6 map to CONNECT, udp/udp4/udp6 to UDP ASSOCIATE.
    ///
    /// On success the returned stream is the negotiated connection and the
    /// caller owns it outright. Any handshake failure closes the proxy
    /// connection before returning.
    pub async fn dial(&self, network: &str, address: &str) -> Result<TcpStream> {
        let req = Request::new(network, address)?;
        let mut conn = TcpStream::connect(&self.proxy).await?;
        match handshake(&mut conn, &self.methods, self.auth.as_ref(), &req).await {
            Ok(bind) => {
                debug!(proxy = %self.proxy, target = %req.dst, bound = %bind, "dial succeeded");
                Ok(conn)
            }
            Err(err) => {
                // Dropping the stream closes it.
                debug!(proxy = %self.proxy, target = %req.dst, error = %err, "dial failed");
                Err(err)
            }
        }
    }
}

/// Drive the client side of the handshake over an already-connected stream.
/// Returns the bound address from the proxy's reply.
pub async fn handshake<S>(
    conn: &mut S,
    methods: &[Method],
    auth: Option<&UserPassword>,
    req: &Request,
) -> Result<Address>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    method::send_methods(conn, methods).await?;
    let selected = method::read_selection(conn).await?;
    if !methods.contains(&selected) {
        return Err(Error::MethodNotAcceptable(selected.as_u8()));
    }

    match selected {
        Method::NoAuth => {}
        Method::UsernamePassword => {
            let auth = auth.ok_or(Error::InvalidAuth)?;
            auth::send_auth(conn, auth).await?;
            auth::read_auth_status(conn).await?;
        }
        other => return Err(Error::MethodNotAcceptable(other.as_u8())),
    }

    req.write_to(conn).await?;
    let reply = Reply::read_from(conn).await?;
    if reply.code != ReplyCode::Succeeded {
        return Err(Error::Reply(reply.code));
    }
    Ok(reply.bind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn rejects_selection_outside_offer() {
        let (mut near, far) = tokio::io::duplex(64);
        let driver = tokio::spawn(async move {
            let mut far = far;
            let mut greeting = [0u8; 3];
            far.read_exact(&mut greeting).await.unwrap();
            assert_eq!(greeting, [0x05, 0x01, 0x00]);
            // Select username/password even though it was not offered.
            far.write_all(&[0x05, 0x02]).await.unwrap();
        });

        let req = Request::new("tcp", "127.0.0.1:80").unwrap();
        let err = handshake(&mut near, &[Method::NoAuth], None, &req)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MethodNotAcceptable(0x02)));
        driver.await.unwrap();
    }

    #[tokio::test]
    async fn surfaces_reply_code_on_failure() {
        let (mut near, far) = tokio::io::duplex(64);
        let driver = tokio::spawn(async move {
            let mut far = far;
            let mut greeting = [0u8; 3];
            far.read_exact(&mut greeting).await.unwrap();
            far.write_all(&[0x05, 0x00]).await.unwrap();
            let mut request = [0u8; 10];
            far.read_exact(&mut request).await.unwrap();
            // Connection refused, bound 0.0.0.0:0.
            far.write_all(&[0x05, 0x05, 0x00, 0x01, 0, 0, 0, 0, 0, 0])
                .await
                .unwrap();
        });

        let req = Request::new("tcp", "192.0.2.1:245").unwrap();
        let err = handshake(&mut near, &[Method::NoAuth], None, &req)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Reply(ReplyCode::ConnectionRefused)));
        driver.await.unwrap();
    }
}
