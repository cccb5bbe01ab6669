//! Response relay.
//!
//! # Responsibilities
//! - Turn the backend response into the client response
//! - Copy headers (message tier, then content tier) and strip `Transfer-Encoding`
//! - Stream the backend body to the client in bounded chunks
//!
//! # Design Decisions
//! - Streaming responses avoid buffering the entire body
//! - Framing is left to the server side, so the backend's chunked marker is dropped
//! - Client disconnect ends the copy quietly with a debug log
//! - Shutdown and backend body failures after headers went out end the body
//!   with an error, so the connection is aborted instead of looking complete
//! - Only an explicit shutdown cancels a relay; the body may outlive the
//!   dispatcher that produced it

use std::future::Future;
use std::pin::Pin;

use axum::{
    body::{Body, BodyDataStream, Bytes},
    http::{header, Response},
};
use futures_util::{stream, Stream, StreamExt};
use thiserror::Error;

use crate::http::headers::{copy_tier, HeaderTier};
use crate::lifecycle::ShutdownSignal;

/// Largest chunk handed to the client connection.
pub const RELAY_CHUNK_SIZE: usize = 80 * 1024;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay invoked without a backend response")]
    NullResponse,

    #[error("relay cancelled by shutdown after {bytes} bytes")]
    Cancelled { bytes: u64 },

    #[error("backend body failed after {bytes} bytes: {source}")]
    Streaming {
        bytes: u64,
        #[source]
        source: axum::Error,
    },
}

/// Build the client response from the backend response.
///
/// The body is streamed lazily; copying stops early if `cancel` fires or the
/// client connection drops the body.
pub fn relay(
    backend: Option<Response<Body>>,
    cancel: ShutdownSignal,
) -> Result<Response<Body>, RelayError> {
    let (parts, body) = backend.ok_or(RelayError::NullResponse)?.into_parts();

    let mut response = Response::new(Body::from_stream(relay_stream(body, cancel)));
    *response.status_mut() = parts.status;

    let headers = response.headers_mut();
    copy_tier(&parts.headers, headers, HeaderTier::Message);
    copy_tier(&parts.headers, headers, HeaderTier::Content);
    headers.remove(header::TRANSFER_ENCODING);

    Ok(response)
}

struct RelayState {
    body: BodyDataStream,
    pending: Bytes,
    cancel: Pin<Box<dyn Future<Output = ()> + Send>>,
    progress: RelayProgress,
}

/// Set `finished` on every path that ends the stream itself. Dropped
/// unfinished, the body was released by the client connection.
#[derive(Default)]
struct RelayProgress {
    bytes: u64,
    finished: bool,
}

impl Drop for RelayProgress {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(bytes = self.bytes, "Client went away, backend body copy abandoned");
        }
    }
}

fn relay_stream(
    body: Body,
    cancel: ShutdownSignal,
) -> impl Stream<Item = Result<Bytes, RelayError>> + Send + 'static {
    let state = RelayState {
        body: body.into_data_stream(),
        pending: Bytes::new(),
        cancel: Box::pin(cancel.cancelled()),
        progress: RelayProgress::default(),
    };

    stream::unfold(Some(state), |state| async move {
        let mut state = state?;
        loop {
            if !state.pending.is_empty() {
                let len = state.pending.len().min(RELAY_CHUNK_SIZE);
                let chunk = state.pending.split_to(len);
                state.progress.bytes += len as u64;
                return Some((Ok(chunk), Some(state)));
            }

            let next = tokio::select! {
                biased;
                _ = &mut state.cancel => {
                    state.progress.finished = true;
                    let err = RelayError::Cancelled {
                        bytes: state.progress.bytes,
                    };
                    tracing::debug!(error = %err, "Relay cancelled, client response truncated");
                    return Some((Err(err), None));
                }
                next = state.body.next() => next,
            };

            match next {
                Some(Ok(bytes)) => state.pending = bytes,
                Some(Err(source)) => {
                    state.progress.finished = true;
                    let err = RelayError::Streaming {
                        bytes: state.progress.bytes,
                        source,
                    };
                    tracing::warn!(error = %err, "Backend body failed, client response truncated");
                    return Some((Err(err), None));
                }
                None => {
                    state.progress.finished = true;
                    return None;
                }
            }
        }
    })
}
