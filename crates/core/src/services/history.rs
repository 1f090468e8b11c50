//! Purchase-history aggregation: background recorder and read side.
//!
//! Recording is decoupled from the purchase command: `MarkPurchased` pushes a
//! [`PurchaseEvent`] onto a bounded queue and returns; the recorder folds it
//! into the aggregate with bounded retries. A failing or slow recorder never
//! fails or delays a purchase.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::models::{GroupAction, PurchaseHistory, PurchaseSuggestion};
use persistence::repositories::{
    GroupMemberRepository, GroupRepository, PurchaseHistoryRepository,
};
use shared::pagination::PageParams;
use sqlx::PgPool;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::capabilities::{Clock, SystemClock};
use crate::config::HistoryConfig;
use crate::error::CoreError;
use crate::services::access;

/// One purchase to fold into the aggregate.
///
/// `item_name` must already be normalized (trimmed, lowercased).
#[derive(Debug, Clone)]
pub struct PurchaseEvent {
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub item_name: String,
    pub category: Option<String>,
    pub purchased_at: DateTime<Utc>,
}

/// Handle for enqueueing events and shutting the recorder down.
#[derive(Clone)]
pub struct RecorderHandle {
    tx: mpsc::Sender<PurchaseEvent>,
    shutdown: watch::Sender<bool>,
}

impl RecorderHandle {
    /// Enqueues an event without blocking the command path.
    ///
    /// A full queue drops the event with a warning; history is advisory and
    /// must never back-pressure purchases.
    pub fn enqueue(&self, event: PurchaseEvent) {
        if let Err(err) = self.tx.try_send(event) {
            tracing::warn!(error = %err, "purchase history queue full, event dropped");
        }
    }

    /// Signals the recorder to stop after the current event.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Background task folding purchase events into the aggregate table.
pub struct PurchaseRecorder {
    history: PurchaseHistoryRepository,
    config: HistoryConfig,
    clock: Arc<dyn Clock>,
}

impl PurchaseRecorder {
    /// Spawns the recorder, returning the enqueue handle and the task handle.
    pub fn spawn(pool: PgPool, config: HistoryConfig) -> (RecorderHandle, JoinHandle<()>) {
        Self::spawn_with_clock(pool, config, Arc::new(SystemClock))
    }

    pub fn spawn_with_clock(
        pool: PgPool,
        config: HistoryConfig,
        clock: Arc<dyn Clock>,
    ) -> (RecorderHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let recorder = Self {
            history: PurchaseHistoryRepository::new(pool),
            config,
            clock,
        };
        let task = tokio::spawn(recorder.run(rx, shutdown_rx));
        (
            RecorderHandle {
                tx,
                shutdown: shutdown_tx,
            },
            task,
        )
    }

    async fn run(
        self,
        mut rx: mpsc::Receiver<PurchaseEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::info!("purchase history recorder started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                event = rx.recv() => {
                    match event {
                        Some(event) => self.process(event).await,
                        None => break,
                    }
                }
            }
        }
        tracing::info!("purchase history recorder stopped");
    }

    async fn process(&self, event: PurchaseEvent) {
        let now = self.clock.now();
        for attempt in 1..=self.config.max_attempts {
            match self
                .history
                .record_purchase(
                    event.user_id,
                    event.group_id,
                    &event.item_name,
                    event.category.as_deref(),
                    event.purchased_at,
                    now,
                )
                .await
            {
                Ok(row) => {
                    tracing::debug!(
                        item = %event.item_name,
                        purchase_count = row.purchase_count,
                        "purchase recorded"
                    );
                    return;
                }
                Err(err) => {
                    tracing::warn!(
                        item = %event.item_name,
                        attempt,
                        max_attempts = self.config.max_attempts,
                        error = %err,
                        "failed to record purchase"
                    );
                    if attempt < self.config.max_attempts {
                        tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms))
                            .await;
                    }
                }
            }
        }
        tracing::error!(item = %event.item_name, "purchase event dropped after retries");
    }
}

/// Read side of the purchase history aggregate.
pub struct HistoryService {
    groups: GroupRepository,
    members: GroupMemberRepository,
    history: PurchaseHistoryRepository,
    clock: Arc<dyn Clock>,
}

impl HistoryService {
    pub fn new(pool: PgPool) -> Self {
        Self::with_capabilities(pool, Arc::new(SystemClock))
    }

    pub fn with_capabilities(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self {
            groups: GroupRepository::new(pool.clone()),
            members: GroupMemberRepository::new(pool.clone()),
            history: PurchaseHistoryRepository::new(pool),
            clock,
        }
    }

    /// The caller's purchase aggregates in a group, most bought first.
    pub async fn list_history(
        &self,
        group_id: Uuid,
        acting_user_id: Uuid,
        page: PageParams,
    ) -> Result<Vec<PurchaseHistory>, CoreError> {
        self.authorize(group_id, acting_user_id).await?;
        let rows = self
            .history
            .list_for_user(acting_user_id, group_id, page.per_page(), page.offset())
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Items whose projected next purchase is due, most overdue first.
    pub async fn suggestions(
        &self,
        group_id: Uuid,
        acting_user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<PurchaseSuggestion>, CoreError> {
        self.authorize(group_id, acting_user_id).await?;
        let now = self.clock.now();
        let rows = self
            .history
            .due_suggestions(acting_user_id, group_id, now, limit.clamp(1, 100))
            .await?;
        Ok(rows.iter().map(|r| r.to_suggestion()).collect())
    }

    async fn authorize(&self, group_id: Uuid, user_id: Uuid) -> Result<(), CoreError> {
        let group = self
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or(CoreError::NotFound("group"))?;
        access::require(&self.members, &group, user_id, GroupAction::ViewLists).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_handle(
        capacity: usize,
    ) -> (
        RecorderHandle,
        mpsc::Receiver<PurchaseEvent>,
        watch::Receiver<bool>,
    ) {
        let (tx, rx) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        (
            RecorderHandle {
                tx,
                shutdown: shutdown_tx,
            },
            rx,
            shutdown_rx,
        )
    }

    fn event(name: &str) -> PurchaseEvent {
        PurchaseEvent {
            user_id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            item_name: name.to_string(),
            category: None,
            purchased_at: Utc::now(),
        }
    }

    #[test]
    fn test_enqueue_drops_when_queue_full() {
        tokio_test::block_on(async {
            let (handle, mut rx, _shutdown) = make_handle(1);
            handle.enqueue(event("milk"));
            handle.enqueue(event("bread"));
            let received = rx.recv().await.unwrap();
            assert_eq!(received.item_name, "milk");
            assert!(rx.try_recv().is_err());
        });
    }

    #[test]
    fn test_shutdown_flips_signal() {
        let (handle, _rx, shutdown_rx) = make_handle(1);
        assert!(!*shutdown_rx.borrow());
        handle.shutdown();
        assert!(*shutdown_rx.borrow());
    }
}
