//! Relay service
//!
//! Polls both feeds and prints what is new.
//!
//! # Feeds
//!
//! - **Auto feed** (configurable interval): an order is printed at most once
//!   per run. After a successful send it is recorded in `printed_orders`
//!   first and acknowledged second, so a failed acknowledgment never causes a
//!   reprint within the run. A restart forgets the set.
//! - **Manual queue** (every 2s): completion is the dequeue call. A job is
//!   held in `printing_in_progress` while it prints and for 5s afterwards, so
//!   the next polls skip it while the remote queue catches up.
//!
//! Each feed runs in its own task; ticks of one feed never overlap and the
//! two feeds never wait on each other.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashSet;
use parking_lot::Mutex;
use relay_printer::{Printer, RetryPolicy, send_with_retry};
use shared::{Order, format_money};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::OrderSource;
use crate::receipt::ReceiptRenderer;
use crate::throttle::LogThrottle;

/// Manual queue poll interval
pub const MANUAL_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How long a manual job stays blocked after its print attempt
pub const IN_PROGRESS_HOLD: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
enum Feed {
    Auto,
    Manual,
}

/// Long-lived relay instance
pub struct RelayService {
    source: Arc<dyn OrderSource>,
    printer: Arc<dyn Printer>,
    renderer: ReceiptRenderer,
    retry: RetryPolicy,
    auto_interval: Duration,
    manual_interval: Duration,
    in_progress_hold: Duration,
    /// Auto-fed order ids printed this run, never evicted
    printed_orders: DashSet<String>,
    /// Manual job ids being printed or recently printed
    printing_in_progress: Arc<DashSet<String>>,
    auto_errors: Mutex<LogThrottle>,
    manual_errors: Mutex<LogThrottle>,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RelayService {
    pub fn new(
        source: Arc<dyn OrderSource>,
        printer: Arc<dyn Printer>,
        renderer: ReceiptRenderer,
        auto_interval: Duration,
    ) -> Self {
        Self {
            source,
            printer,
            renderer,
            retry: RetryPolicy::default(),
            auto_interval,
            manual_interval: MANUAL_POLL_INTERVAL,
            in_progress_hold: IN_PROGRESS_HOLD,
            printed_orders: DashSet::new(),
            printing_in_progress: Arc::new(DashSet::new()),
            auto_errors: Mutex::new(LogThrottle::new("auto")),
            manual_errors: Mutex::new(LogThrottle::new("manual")),
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_manual_interval(mut self, interval: Duration) -> Self {
        self.manual_interval = interval;
        self
    }

    pub fn with_in_progress_hold(mut self, hold: Duration) -> Self {
        self.in_progress_hold = hold;
        self
    }

    /// Test print, one immediate poll of each feed, then the interval loops
    ///
    /// A failed test print is logged and does not stop the service.
    pub async fn start(self: &Arc<Self>) {
        let started = !self.tasks.lock().is_empty();
        if started {
            warn!("Relay service already started");
            return;
        }

        self.print_test_page().await;

        info!(
            auto_interval_ms = self.auto_interval.as_millis() as u64,
            manual_interval_ms = self.manual_interval.as_millis() as u64,
            "Starting order polling"
        );
        self.poll_auto_feed().await;
        self.poll_manual_queue().await;

        let auto = tokio::spawn(Arc::clone(self).run_poller(Feed::Auto));
        let manual = tokio::spawn(Arc::clone(self).run_poller(Feed::Manual));
        self.tasks.lock().extend([auto, manual]);
    }

    /// Stop polling; in-flight prints are abandoned
    pub fn stop(&self) {
        self.shutdown.cancel();
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        info!("Relay service stopped");
    }

    pub fn is_printed(&self, order_id: &str) -> bool {
        self.printed_orders.contains(order_id)
    }

    pub fn is_printing(&self, order_id: &str) -> bool {
        self.printing_in_progress.contains(order_id)
    }

    /// Print the connectivity test page; returns whether it went through
    pub async fn print_test_page(&self) -> bool {
        info!("Testing printer connection");
        let data = self.renderer.render_test_page(Utc::now());

        match send_with_retry(self.printer.as_ref(), &data, &self.retry).await {
            Ok(()) => {
                info!("Printer test successful");
                true
            }
            Err(e) => {
                warn!(error = %e, "Printer test failed, will retry when orders come in");
                false
            }
        }
    }

    /// One auto feed tick
    pub async fn poll_auto_feed(&self) {
        let orders = match self.source.fetch_auto_print_feed().await {
            Ok(orders) => {
                self.auto_errors.lock().success();
                orders
            }
            Err(e) => {
                self.auto_errors.lock().failure(&e.to_string());
                return;
            }
        };

        for order in orders {
            if self.printed_orders.contains(&order.id) {
                continue;
            }

            info!(
                order_id = %order.id,
                number = %order.short_id(),
                customer = order.customer_label(),
                total = %format_money(order.total()),
                method = order.fulfillment_method.as_str(),
                "New order"
            );

            if let Err(e) = self.send_order(&order).await {
                error!(order_id = %order.id, error = %e, "Print failed, retrying on next poll");
                continue;
            }

            self.printed_orders.insert(order.id.clone());
            info!(order_id = %order.id, "Printed successfully");

            if let Err(e) = self.source.acknowledge_auto_printed(&order.id).await {
                warn!(order_id = %order.id, error = %e, "Failed to acknowledge printed order");
            }
        }
    }

    /// One manual queue tick
    pub async fn poll_manual_queue(&self) {
        let orders = match self.source.fetch_manual_queue().await {
            Ok(orders) => {
                self.manual_errors.lock().success();
                orders
            }
            Err(e) => {
                self.manual_errors.lock().failure(&e.to_string());
                return;
            }
        };

        for order in orders {
            // Atomic check-and-claim
            if !self.printing_in_progress.insert(order.id.clone()) {
                debug!(order_id = %order.id, "Already printing, skipped");
                continue;
            }

            info!(
                order_id = %order.id,
                number = %order.short_id(),
                customer = order.customer_label(),
                "Manual print"
            );

            match self.send_order(&order).await {
                Ok(()) => match self.source.dequeue_manual(&order.id).await {
                    Ok(()) => info!(order_id = %order.id, "Printed from queue"),
                    Err(e) => {
                        warn!(order_id = %order.id, error = %e, "Printed but not removed from queue")
                    }
                },
                Err(e) => error!(order_id = %order.id, error = %e, "Manual print failed"),
            }

            self.release_later(order.id);
        }
    }

    async fn send_order(&self, order: &Order) -> relay_printer::PrintResult<()> {
        let data = self.renderer.render(order, Utc::now());
        send_with_retry(self.printer.as_ref(), &data, &self.retry).await
    }

    /// Drop the in-progress claim once the hold has passed
    fn release_later(&self, order_id: String) {
        let in_progress = Arc::clone(&self.printing_in_progress);
        let hold = self.in_progress_hold;
        tokio::spawn(async move {
            tokio::time::sleep(hold).await;
            in_progress.remove(&order_id);
        });
    }

    async fn run_poller(self: Arc<Self>, feed: Feed) {
        let period = match feed {
            Feed::Auto => self.auto_interval,
            Feed::Manual => self.manual_interval,
        };
        // The immediate poll already ran in start()
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => match feed {
                    Feed::Auto => self.poll_auto_feed().await,
                    Feed::Manual => self.poll_manual_queue().await,
                },
            }
        }

        debug!(?feed, "Poller stopped");
    }
}
