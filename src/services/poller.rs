use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::gateway::{ChargeStatus, PixGateway};

/// Resolution of a payment watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Provider reported the charge as paid
    Paid,
    /// Provider reported the charge as expired
    Expired,
    /// The watch gave up before the charge resolved; the charge may
    /// still settle out-of-band
    TimedOut,
}

/// Invoked at most once per watch with the final outcome.
pub type OutcomeHandler = Box<dyn FnOnce(PaymentOutcome) -> BoxFuture<'static, ()> + Send>;

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    /// Time between status checks
    pub interval: Duration,
    /// Maximum wall-clock time before declaring a timeout
    pub timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(900),
        }
    }
}

/// Watches a single charge until it resolves, without blocking the
/// submitting flow. One watcher per transaction id; watchers for
/// different orders never interfere.
#[derive(Clone)]
pub struct PaymentPoller {
    gateway: Arc<dyn PixGateway>,
    config: PollerConfig,
}

/// Cancels a running watch. Safe to call repeatedly and from any task;
/// cancellation stops future ticks and suppresses the outcome handler,
/// but never rolls back an already-applied transition.
pub struct PollHandle {
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// Waits for the watch task to finish. Test and shutdown helper.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

impl PaymentPoller {
    pub fn new(gateway: Arc<dyn PixGateway>, config: PollerConfig) -> Self {
        Self { gateway, config }
    }

    /// Starts watching `transaction_id`. The handler fires exactly once
    /// with `Paid`, `Expired` or `TimedOut`; a terminal status observed
    /// on a tick wins over a simultaneous deadline. Individual status
    /// check failures are logged and do not stop the watch.
    pub fn start(
        &self,
        transaction_id: String,
        order_id: Uuid,
        handler: OutcomeHandler,
    ) -> PollHandle {
        let gateway = self.gateway.clone();
        let interval = self.config.interval;
        let timeout = self.config.timeout;
        let (cancel_tx, mut cancel_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let deadline = Instant::now() + timeout;
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let outcome = loop {
                tokio::select! {
                    changed = cancel_rx.changed() => {
                        if changed.is_err() || *cancel_rx.borrow() {
                            debug!(%order_id, %transaction_id, "Payment watch cancelled");
                            break None;
                        }
                    }
                    _ = time::sleep_until(deadline) => {
                        warn!(%order_id, %transaction_id, "Payment watch timed out");
                        break Some(PaymentOutcome::TimedOut);
                    }
                    _ = ticker.tick() => {
                        match gateway.get_charge_status(&transaction_id).await {
                            Ok(ChargeStatus::Paid) => break Some(PaymentOutcome::Paid),
                            Ok(ChargeStatus::Expired) => break Some(PaymentOutcome::Expired),
                            Ok(status) => {
                                debug!(%order_id, ?status, "Charge still unresolved");
                            }
                            Err(e) => {
                                // Transient noise; the watch continues.
                                debug!(%order_id, error = %e, "Status check failed");
                            }
                        }
                    }
                }
            };

            // A cancellation that raced the final status check still
            // suppresses the callback.
            let cancelled = *cancel_rx.borrow();
            if let Some(outcome) = outcome.filter(|_| !cancelled) {
                info!(%order_id, ?outcome, "Payment watch resolved");
                handler(outcome).await;
            }
        });

        PollHandle { cancel_tx, task }
    }
}
