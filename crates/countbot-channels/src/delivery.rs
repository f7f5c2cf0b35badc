//! Delivery engine: sends text to a chat under a retry policy.

use countbot_core::error::Result;
use countbot_core::traits::GroupTransport;
use std::sync::Arc;

use crate::retry::{run_with_retry, RetryPolicy};

/// Sends messages through a transport, retrying per policy.
///
/// Delivery is at-least-once: a message either lands, keeps being
/// retried (unbounded), or its last error is returned (bounded).
#[derive(Clone)]
pub struct DeliveryEngine {
    transport: Arc<dyn GroupTransport>,
}

impl DeliveryEngine {
    pub fn new(transport: Arc<dyn GroupTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn GroupTransport> {
        &self.transport
    }

    /// Deliver `text` to `destination`. `label` is a human name for logs
    /// (falls back to the id).
    pub async fn deliver(
        &self,
        destination: &str,
        text: &str,
        label: Option<&str>,
        policy: RetryPolicy,
    ) -> Result<()> {
        let name = label.unwrap_or(destination);
        let what = format!("Send to {name}");
        run_with_retry(policy, &what, || self.transport.send_text(destination, text)).await?;
        tracing::info!("Message sent to group: {name}");
        Ok(())
    }
}
