//! Bidirectional relay pump.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};

/// Which copy direction finished first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToTarget,
    TargetToClient,
}

/// Run both copy directions concurrently and return as soon as either one
/// finishes or errors, or the cancellation signal fires. Bytes within one
/// direction arrive in order and in full; there is no ordering between
/// directions. The caller closes both streams by dropping them.
pub async fn pipe<A, B>(
    cancel: &CancellationToken,
    client: A,
    target: B,
) -> Result<(Direction, u64)>
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (mut client_rd, mut client_wr) = tokio::io::split(client);
    let (mut target_rd, mut target_wr) = tokio::io::split(target);

    tokio::select! {
        res = tokio::io::copy(&mut client_rd, &mut target_wr) => {
            let n = res?;
            debug!(bytes = n, "client-to-target copy finished");
            Ok((Direction::ClientToTarget, n))
        }
        res = tokio::io::copy(&mut target_rd, &mut client_wr) => {
            let n = res?;
            debug!(bytes = n, "target-to-client copy finished");
            Ok((Direction::TargetToClient, n))
        }
        _ = cancel.cancelled() => {
            debug!("relay cancelled");
            Err(Error::Cancelled)
        }
    }
}
