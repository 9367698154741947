//! SOCKS5 server: handshake state machine, pluggable hooks, acceptor loop.
//!
//! The handshake advances through four stages (method selection,
//! authentication, request handling, relay) and consults the cancellation
//! token at each stage boundary. Method selection, authentication, request
//! handling, and the relay itself are all pluggable; the defaults negotiate
//! no-auth and CONNECT over TCP.

pub mod connect;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use crate::error::{Error, Result};
use crate::protocol::{auth, method, Method, Reply, ReplyCode, Request, UserPassword};
use crate::relay::{self, RelaySession};
use crate::stream::{BoxedStream, ProxyStream};

pub use connect::TcpConnect;

/// Picks the authentication method from the client's offer.
pub trait MethodSelector: Send + Sync {
    fn select(&self, offered: &[Method]) -> Method;
}

/// Verifies username/password credentials.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, auth: &UserPassword) -> bool;
}

/// Turns a request into a reply and, on success, the target stream the
/// relay joins to the client.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(
        &self,
        auth: Option<&UserPassword>,
        req: &Request,
    ) -> Result<(Reply, BoxedStream)>;
}

/// Override for the relay stage.
#[async_trait]
pub trait RelayHandler: Send + Sync {
    async fn relay(
        &self,
        cancel: &CancellationToken,
        client: BoxedStream,
        target: BoxedStream,
    ) -> Result<()>;
}

/// Receives one record per failed connection: the negotiated method and
/// whatever credentials/request were read before the failure.
pub type ErrorSink =
    dyn Fn(Method, Option<&UserPassword>, Option<&Request>, &Error) + Send + Sync;

/// Default selector: no authentication if the client offers it.
pub struct NoAuthSelector;

impl MethodSelector for NoAuthSelector {
    fn select(&self, offered: &[Method]) -> Method {
        if offered.contains(&Method::NoAuth) {
            Method::NoAuth
        } else {
            Method::NoAcceptable
        }
    }
}

/// Selector that accepts only username/password.
pub struct UserPassSelector;

impl MethodSelector for UserPassSelector {
    fn select(&self, offered: &[Method]) -> Method {
        if offered.contains(&Method::UsernamePassword) {
            Method::UsernamePassword
        } else {
            Method::NoAcceptable
        }
    }
}

/// Authenticator backed by a username-to-password map. The map is read-only
/// after construction.
pub struct CredentialMap {
    users: HashMap<String, String>,
}

impl CredentialMap {
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }
}

impl Authenticator for CredentialMap {
    fn authenticate(&self, auth: &UserPassword) -> bool {
        let Ok(username) = std::str::from_utf8(&auth.username) else {
            return false;
        };
        match self.users.get(username) {
            Some(expected) => constant_time_eq(expected.as_bytes(), &auth.password),
            None => false,
        }
    }
}

// Comparison time depends only on the stored password's length.
fn constant_time_eq(expected: &[u8], given: &[u8]) -> bool {
    if expected.len() != given.len() {
        return false;
    }
    expected
        .iter()
        .zip(given)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// What the handshake has learned so far, handed to the error sink when a
/// connection fails.
struct HandshakeLog {
    method: Method,
    auth: Option<UserPassword>,
    req: Option<Request>,
}

/// A SOCKS5 proxy server.
pub struct Server {
    select_method: Box<dyn MethodSelector>,
    authenticator: Option<Box<dyn Authenticator>>,
    request_handler: Box<dyn RequestHandler>,
    relay_handler: Option<Box<dyn RelayHandler>>,
    error_sink: Option<Box<ErrorSink>>,
    shutdown: CancellationToken,
}

impl Server {
    /// Server with the defaults: no authentication, CONNECT over TCP.
    pub fn new() -> Self {
        Self {
            select_method: Box::new(NoAuthSelector),
            authenticator: None,
            request_handler: Box::new(TcpConnect),
            relay_handler: None,
            error_sink: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Server that requires username/password, validated against `users`.
    pub fn with_auth(users: HashMap<String, String>) -> Self {
        let mut server = Self::new();
        server.select_method = Box::new(UserPassSelector);
        server.authenticator = Some(Box::new(CredentialMap::new(users)));
        server
    }

    pub fn set_method_selector(&mut self, selector: impl MethodSelector + 'static) -> &mut Self {
        self.select_method = Box::new(selector);
        self
    }

    pub fn set_authenticator(&mut self, authenticator: impl Authenticator + 'static) -> &mut Self {
        self.authenticator = Some(Box::new(authenticator));
        self
    }

    pub fn set_request_handler(&mut self, handler: impl RequestHandler + 'static) -> &mut Self {
        self.request_handler = Box::new(handler);
        self
    }

    pub fn set_relay_handler(&mut self, handler: impl RelayHandler + 'static) -> &mut Self {
        self.relay_handler = Some(Box::new(handler));
        self
    }

    pub fn set_error_sink(
        &mut self,
        sink: impl Fn(Method, Option<&UserPassword>, Option<&Request>, &Error) + Send + Sync + 'static,
    ) -> &mut Self {
        self.error_sink = Some(Box::new(sink));
        self
    }

    /// Token cancelled by [`Server::shutdown`]; per-connection tokens are
    /// children of it.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop accepting and cancel every in-flight connection.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Bind a TCP listener on `address` and serve from it.
    pub async fn listen_and_serve(self: Arc<Self>, address: &str) -> Result<()> {
        let listener = TcpListener::bind(address).await?;
        info!(addr = %listener.local_addr()?, "listening");
        self.serve(listener).await
    }

    /// Accept connections and spawn one handshake task per connection.
    /// Accept errors terminate the loop; per-connection failures do not.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    debug!(%peer, "accepted connection");
                    let server = Arc::clone(&self);
                    let cancel = self.shutdown.child_token();
                    let span = tracing::info_span!("conn", %peer);
                    tokio::spawn(
                        async move { server.serve_conn(cancel, stream).await }.instrument(span),
                    );
                }
                _ = self.shutdown.cancelled() => {
                    info!("acceptor stopped by shutdown");
                    return Ok(());
                }
            }
        }
    }

    /// Run the handshake (and relay) for one already-accepted stream. The
    /// stream is closed when this returns; failures go to the error sink.
    pub async fn serve_conn<S: ProxyStream + 'static>(
        &self,
        cancel: CancellationToken,
        stream: S,
    ) {
        let mut log = HandshakeLog {
            method: Method::NoAcceptable,
            auth: None,
            req: None,
        };
        match self.handle(&cancel, stream, &mut log).await {
            Ok(()) => debug!("connection finished"),
            Err(err) => {
                if let Some(sink) = &self.error_sink {
                    sink(log.method, log.auth.as_ref(), log.req.as_ref(), &err);
                }
                if err.is_cancelled() {
                    debug!("connection cancelled");
                } else {
                    warn!(error = %err, "connection failed");
                }
            }
        }
    }

    async fn handle<S: ProxyStream + 'static>(
        &self,
        cancel: &CancellationToken,
        mut stream: S,
        log: &mut HandshakeLog,
    ) -> Result<()> {
        // Stage 1: method selection.
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let offered = method::read_methods(&mut stream).await?;
        let selected = self.select_method.select(&offered);
        log.method = selected;
        method::send_selection(&mut stream, selected).await?;

        // Stage 2: authentication.
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match selected {
            Method::NoAuth => {}
            Method::UsernamePassword => {
                let creds = auth::read_auth(&mut stream).await?;
                let accepted = self
                    .authenticator
                    .as_ref()
                    .map_or(false, |a| a.authenticate(&creds));
                log.auth = Some(creds);
                // The status frame goes on the wire before the handshake
                // errors out.
                auth::send_auth_status(&mut stream, accepted).await?;
                if !accepted {
                    return Err(Error::AuthFailed);
                }
            }
            other => return Err(Error::MethodNotAcceptable(other.as_u8())),
        }

        // Stage 3: request.
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let req = Request::read_from(&mut stream).await?;
        debug!(cmd = req.cmd.as_u8(), dst = %req.dst, "request received");
        log.req = Some(req.clone());
        let (reply, target) = match self.request_handler.handle(log.auth.as_ref(), &req).await {
            Ok(pair) => pair,
            Err(err) => {
                Reply::failure(err.reply_code()).write_to(&mut stream).await?;
                return Err(err);
            }
        };
        reply.write_to(&mut stream).await?;
        if reply.code != ReplyCode::Succeeded {
            return Err(Error::Reply(reply.code));
        }

        // Stage 4: relay.
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let session = RelaySession::new(req.dst.to_string());
        debug!(session_id = %session.id, "starting relay");
        let result = match &self.relay_handler {
            Some(handler) => handler.relay(cancel, Box::new(stream), target).await,
            None => relay::pipe(cancel, stream, target)
                .await
                .map(|(direction, bytes)| session.record(direction, bytes)),
        };
        session.log_stats();
        result
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

/// Serve with the defaults on `address`.
pub async fn listen_and_serve(address: &str) -> Result<()> {
    Arc::new(Server::new()).listen_and_serve(address).await
}

/// Serve on `address` requiring the single username/password pair.
pub async fn listen_and_serve_with_auth(
    address: &str,
    username: &str,
    password: &str,
) -> Result<()> {
    let mut users = HashMap::new();
    users.insert(username.to_string(), password.to_string());
    Arc::new(Server::with_auth(users)).listen_and_serve(address).await
}
