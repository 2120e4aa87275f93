//! Quota reconciliation.
//!
//! The server is authoritative: every reported field overwrites the local
//! copy and nothing is decremented or predicted client-side. That includes
//! the daily boundary, which only the server knows.

use tokio::sync::watch;
use tracing::{debug, info};
use versesync_core::{QuotaFields, QuotaKind, QuotaSnapshot};

/// Holds the latest server-reported quota snapshot.
pub struct QuotaReconciler {
    snapshot: watch::Sender<QuotaSnapshot>,
}

impl Default for QuotaReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl QuotaReconciler {
    /// Creates a reconciler with an empty snapshot.
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(QuotaSnapshot::default());
        Self { snapshot }
    }

    /// Merges newly reported fields into the snapshot.
    pub fn absorb(&self, fields: &QuotaFields) {
        if fields.is_empty() {
            return;
        }
        self.snapshot.send_modify(|snap| snap.merge(fields));
        debug!(?fields, "Quota absorbed");
    }

    /// Records a `429` naming `kind` as the server reporting zero remaining.
    pub fn absorb_exhausted(&self, kind: QuotaKind) {
        info!(%kind, "Quota exhausted");
        self.absorb(&QuotaFields::exhausted(kind));
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> QuotaSnapshot {
        self.snapshot.borrow().clone()
    }

    /// True when either reported remainder is at or below zero.
    pub fn is_exhausted(&self) -> bool {
        self.snapshot.borrow().is_exhausted()
    }

    /// Which limit is exhausted, trial first.
    pub fn exhaustion(&self) -> Option<QuotaKind> {
        self.snapshot.borrow().exhaustion()
    }

    /// Forgets everything the server reported.
    pub fn on_session_reset(&self) {
        debug!("Quota snapshot reset");
        self.snapshot.send_replace(QuotaSnapshot::default());
    }

    /// Subscribes to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<QuotaSnapshot> {
        self.snapshot.subscribe()
    }
}
