//! # Audit Service
//!
//! A bounded, non-blocking event pipeline with a single drainer task
//! (spec.md §4.9). `log` never blocks the caller: a saturated queue drops
//! the event and increments a counter rather than applying back-pressure,
//! because a slow database must never be allowed to stall the request
//! path (spec.md §9).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, instrument, warn};

use crate::audit::models::{AuditEntry, AuditEvent, AuditListQuery, AuditListResult};
use crate::errors::Result;
use crate::observability::metrics;

struct Inner {
    pool: PgPool,
    sender: Mutex<Option<mpsc::Sender<AuditEvent>>>,
    drainer: Mutex<Option<JoinHandle<()>>>,
    dropped: AtomicU64,
}

/// Orchestrates the audit pipeline: `log` enqueues without blocking,
/// `shutdown` closes the queue and waits for the drainer to finish, and
/// `list` is the separate synchronous read path.
#[derive(Clone)]
pub struct AuditService {
    inner: Arc<Inner>,
}

impl AuditService {
    /// Spawn the background drainer and return a handle to the service.
    /// `capacity` is the fixed queue size (spec.md §5: 256).
    pub fn spawn(pool: PgPool, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        let drainer_pool = pool.clone();
        let handle = tokio::spawn(Self::drain(rx, drainer_pool));

        Self {
            inner: Arc::new(Inner {
                pool,
                sender: Mutex::new(Some(tx)),
                drainer: Mutex::new(Some(handle)),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// `Log(event)` (spec.md §4.9). Never blocks and never fails the
    /// caller; a full or already-closed queue increments the dropped
    /// counter instead.
    pub fn log(&self, event: AuditEvent) {
        metrics::audit_enqueued();

        let sender = self.inner.sender.lock().expect("audit sender mutex poisoned").clone();
        let delivered = match sender {
            Some(tx) => tx.try_send(event).is_ok(),
            None => false,
        };

        if !delivered {
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            metrics::audit_dropped();
        }
    }

    /// Total events dropped since this service was spawned, for
    /// diagnostics/tests (spec.md §8: the dropped counter is the only
    /// signal a saturated queue gives).
    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    async fn drain(mut receiver: mpsc::Receiver<AuditEvent>, pool: PgPool) {
        while let Some(event) = receiver.recv().await {
            if let Err(err) = Self::persist(&pool, &event).await {
                error!(error = %err, action = %event.action, "failed to persist audit event");
            }
        }
    }

    async fn persist(pool: &PgPool, event: &AuditEvent) -> Result<()> {
        sqlx::query(
            "INSERT INTO audit_log (action, actor_id, resource, resource_id, payload) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&event.action)
        .bind(event.actor_id)
        .bind(event.normalized_resource())
        .bind(event.normalized_resource_id())
        .bind(&event.payload)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// `Shutdown(ctx)` (spec.md §4.9). Closes the queue so the drainer
    /// exits once it has drained every already-enqueued event, then waits
    /// for it. If `wait_timeout` elapses first, a warning is logged but
    /// the wait continues — writes must never race with process exit
    /// (spec.md §9).
    #[instrument(skip(self))]
    pub async fn shutdown(&self, wait_timeout: Duration) {
        self.inner.sender.lock().expect("audit sender mutex poisoned").take();

        let handle = self.inner.drainer.lock().expect("audit drainer mutex poisoned").take();
        let Some(mut handle) = handle else { return };

        if tokio::time::timeout(wait_timeout, &mut handle).await.is_err() {
            warn!("audit drainer did not finish within the shutdown deadline, continuing to wait");
            if let Err(join_err) = (&mut handle).await {
                error!(error = %join_err, "audit drainer task panicked");
            }
        }
    }

    /// The audit-entry read path (spec.md §4.9): filter by `action`
    /// and/or `resource` (both exact match), newest first, paginated.
    pub async fn list(&self, query: &AuditListQuery) -> Result<AuditListResult> {
        let page = query.normalized_page();
        let per_page = query.normalized_per_page();

        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM audit_log \
             WHERE ($1::text IS NULL OR action = $1) AND ($2::text IS NULL OR resource = $2)",
        )
        .bind(&query.action)
        .bind(&query.resource)
        .fetch_one(&self.inner.pool)
        .await?;

        let entries = sqlx::query_as::<_, AuditEntry>(
            "SELECT id, action, actor_id, resource, resource_id, payload, created_at \
             FROM audit_log \
             WHERE ($1::text IS NULL OR action = $1) AND ($2::text IS NULL OR resource = $2) \
             ORDER BY created_at DESC \
             LIMIT $3 OFFSET $4",
        )
        .bind(&query.action)
        .bind(&query.resource)
        .bind(per_page as i64)
        .bind(((page - 1) as i64) * per_page as i64)
        .fetch_all(&self.inner.pool)
        .await?;

        Ok(AuditListResult { total: total.0, entries })
    }
}
