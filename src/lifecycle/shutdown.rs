//! Shutdown coordination for the relay.

use tokio::sync::broadcast;

/// Fans a single stop request out to the HTTP server and anything else that
/// serves traffic. A closed channel reads the same as a stop request.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Ask every subscriber to stop; returns how many were told.
    pub fn trigger(&self, reason: &'static str) -> usize {
        match self.tx.send(()) {
            Ok(notified) => {
                tracing::info!(reason, notified, "Shutdown requested");
                notified
            }
            Err(_) => {
                tracing::warn!(reason, "Shutdown requested but no server is listening");
                0
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_every_subscriber() {
        let shutdown = Shutdown::new();
        let mut server = shutdown.subscribe();
        let mut metrics = shutdown.subscribe();

        assert_eq!(shutdown.trigger("SIGTERM"), 2);
        assert!(server.recv().await.is_ok());
        assert!(metrics.recv().await.is_ok());
    }

    #[test]
    fn test_trigger_without_subscribers_reports_zero() {
        assert_eq!(Shutdown::default().trigger("SIGINT"), 0);
    }

    #[tokio::test]
    async fn test_dropped_coordinator_reads_as_stop() {
        let shutdown = Shutdown::new();
        let mut server = shutdown.subscribe();
        drop(shutdown);
        assert!(server.recv().await.is_err());
    }
}
