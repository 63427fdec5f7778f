use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::mail::Mail;
use crate::transport::MailTransport;

/// How the worker retries a failed delivery.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per mail, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1 << (attempt.saturating_sub(1)).min(16))
    }
}

/// Producer side of the outbound mail queue. Cheap to clone.
#[derive(Clone)]
pub struct MailQueue {
    tx: mpsc::UnboundedSender<Mail>,
}

impl MailQueue {
    /// Create a queue. The receiver goes to [`run_worker`].
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Mail>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a mail for delivery. Returns false if the worker has stopped;
    /// the mail is dropped in that case.
    pub fn enqueue(&self, mail: Mail) -> bool {
        debug!(to = %mail.recipient, "Queueing mail");
        match self.tx.send(mail) {
            Ok(()) => true,
            Err(e) => {
                warn!(to = %e.0.recipient, "Mail worker is gone, dropping mail");
                false
            }
        }
    }
}

/// Background task that drains the queue until every [`MailQueue`] handle
/// is dropped.
pub async fn run_worker<T: MailTransport>(
    mut rx: mpsc::UnboundedReceiver<Mail>,
    transport: T,
    policy: RetryPolicy,
) {
    info!("Mail worker started");
    while let Some(mail) = rx.recv().await {
        deliver(&transport, &mail, policy).await;
    }
    info!("Mail worker stopped");
}

/// Returns true once the transport accepted the mail.
async fn deliver<T: MailTransport>(transport: &T, mail: &Mail, policy: RetryPolicy) -> bool {
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match transport.send(mail).await {
            Ok(()) => {
                info!(to = %mail.recipient, attempt, "Mail delivered");
                return true;
            }
            Err(e) if attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(to = %mail.recipient, attempt, "Mail delivery failed, retrying in {:?}: {}", delay, e);
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                error!(to = %mail.recipient, attempt, "Giving up on mail: {}", e);
            }
        }
    }

    false
}
