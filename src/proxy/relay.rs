//! Chunk-by-chunk body relay.
//!
//! The upstream body is pulled one chunk at a time, only when the server is
//! ready to write the previous one, so memory stays bounded by a single
//! chunk regardless of file size. Order is preserved: chunks are yielded
//! exactly as they arrive.
//!
//! # Termination
//! - upstream ends → relay ends cleanly
//! - upstream errors → relay yields one error, hyper aborts the caller's
//!   connection (bytes already flushed are not recalled)
//! - upstream silent for `idle` → treated as an upstream error
//! - caller disconnects → the stream is dropped, which drops the upstream
//!   response and closes its connection

use std::error::Error as StdError;
use std::pin::Pin;
use std::time::Duration;

use axum::body::Bytes;
use futures_util::{stream, Stream, StreamExt};
use thiserror::Error;

use crate::observability::metrics;

type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("upstream body failed after {relayed} bytes: {source}")]
    Upstream {
        relayed: u64,
        #[source]
        source: BoxError,
    },

    #[error("upstream stalled for {idle:?} after {relayed} bytes")]
    Stalled { relayed: u64, idle: Duration },
}

/// Per-relay bookkeeping, reported when the relay ends however it ends.
#[derive(Debug)]
pub struct RelayTracker {
    url: String,
    request_id: String,
    relayed: u64,
    finished: bool,
}

impl RelayTracker {
    pub fn new(url: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            request_id: request_id.into(),
            relayed: 0,
            finished: false,
        }
    }

    fn finish(&mut self, outcome: &'static str) {
        self.finished = true;
        metrics::record_stream_outcome(outcome);
    }
}

impl Drop for RelayTracker {
    fn drop(&mut self) {
        if !self.finished {
            tracing::info!(
                request_id = %self.request_id,
                url = %self.url,
                bytes = self.relayed,
                "Caller disconnected, upstream download cancelled"
            );
            metrics::record_stream_outcome("cancelled");
        }
    }
}

struct RelayState<S> {
    upstream: Pin<Box<S>>,
    tracker: RelayTracker,
}

/// Relay `upstream` with an idle timeout between chunks.
pub fn relay<S, E>(
    upstream: S,
    idle: Duration,
    tracker: RelayTracker,
) -> impl Stream<Item = Result<Bytes, RelayError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: StdError + Send + Sync + 'static,
{
    let state = RelayState {
        upstream: Box::pin(upstream),
        tracker,
    };

    stream::unfold(Some(state), move |state| async move {
        let mut state = state?;

        match tokio::time::timeout(idle, state.upstream.next()).await {
            Ok(Some(Ok(chunk))) => {
                let len = chunk.len() as u64;
                state.tracker.relayed += len;
                metrics::record_relayed_bytes(len);
                Some((Ok(chunk), Some(state)))
            }
            Ok(Some(Err(source))) => {
                let relayed = state.tracker.relayed;
                tracing::warn!(
                    request_id = %state.tracker.request_id,
                    url = %state.tracker.url,
                    bytes = relayed,
                    error = %source,
                    "Upstream body failed mid-stream"
                );
                state.tracker.finish("upstream_error");
                let err = RelayError::Upstream {
                    relayed,
                    source: Box::new(source),
                };
                Some((Err(err), None))
            }
            Ok(None) => {
                tracing::info!(
                    request_id = %state.tracker.request_id,
                    url = %state.tracker.url,
                    bytes = state.tracker.relayed,
                    "Download relayed"
                );
                state.tracker.finish("completed");
                None
            }
            Err(_) => {
                let relayed = state.tracker.relayed;
                tracing::warn!(
                    request_id = %state.tracker.request_id,
                    url = %state.tracker.url,
                    bytes = relayed,
                    idle = ?idle,
                    "Upstream stalled, abandoning download"
                );
                state.tracker.finish("stalled");
                Some((Err(RelayError::Stalled { relayed, idle }), None))
            }
        }
    })
}
