//! Error taxonomy for the SOCKS5 core.

use std::io;

use thiserror::Error;

use crate::protocol::ReplyCode;

/// Common result type for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong during a SOCKS5 exchange.
#[derive(Debug, Error)]
pub enum Error {
    /// A frame opened with something other than 0x05.
    #[error("invalid socks version: {0:#04x}")]
    InvalidVersion(u8),

    /// Unknown address-type byte on the wire.
    #[error("bad address type: {0:#04x}")]
    BadAddressType(u8),

    /// Domain name empty or longer than 255 bytes.
    #[error("invalid domain name: {0}")]
    InvalidDomainName(String),

    /// Textual `host:port` that could not be parsed.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Method list empty or longer than 255 entries.
    #[error("invalid methods")]
    InvalidMethods,

    /// The peer selected (or offered only) methods we cannot use.
    #[error("method no acceptable: {0:#04x}")]
    MethodNotAcceptable(u8),

    /// Credentials missing, or a username/password over 255 bytes.
    #[error("invalid authentication")]
    InvalidAuth,

    /// The username/password exchange completed with a failure status.
    #[error("username/password authentication failed")]
    AuthFailed,

    /// Request frame missing its destination.
    #[error("invalid request")]
    InvalidRequest,

    /// `network` passed to a dial was not tcp/tcp4/tcp6/udp/udp4/udp6.
    #[error("network not implemented: {0}")]
    NetworkUnsupported(String),

    /// Command the request handler does not implement.
    #[error("command not supported: {0:#04x}")]
    CommandUnsupported(u8),

    /// The peer answered the request with a non-success reply code.
    #[error("reply: {0}")]
    Reply(ReplyCode),

    /// Dialing the requested target failed; `code` is what goes on the wire.
    #[error("dial target failed: {source}")]
    Dial {
        code: ReplyCode,
        #[source]
        source: io::Error,
    },

    /// The cancellation signal fired.
    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Reply code the server sends on the wire when a request fails with
    /// this error.
    pub fn reply_code(&self) -> ReplyCode {
        match self {
            Error::CommandUnsupported(_) => ReplyCode::CommandNotSupported,
            Error::BadAddressType(_) => ReplyCode::AddressNotSupported,
            Error::Dial { code, .. } => *code,
            Error::Reply(code) => *code,
            _ => ReplyCode::Failure,
        }
    }

    /// Whether this error came from the cancellation signal rather than the
    /// peer or the network.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
