//! Object accounting for the host runtime.
//!
//! Every handle handed out by [`CpuBackend`](super::CpuBackend) carries a
//! token that records its creation and, on drop, its release. Tests use the
//! ledger to prove that teardown released everything exactly once and in the
//! expected order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

/// Kind of device object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Context,
    Queue,
    Program,
    Kernel,
    Image,
    Sampler,
}

impl ObjectKind {
    const ALL: [ObjectKind; 6] = [
        Self::Context,
        Self::Queue,
        Self::Program,
        Self::Kernel,
        Self::Image,
        Self::Sampler,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Creation/release counters plus the global release order.
#[derive(Debug, Default)]
pub struct ObjectLedger {
    created: [AtomicUsize; 6],
    released: [AtomicUsize; 6],
    release_order: Mutex<Vec<ObjectKind>>,
    dispatches: AtomicUsize,
    barriers: AtomicUsize,
}

impl ObjectLedger {
    /// Objects of `kind` created so far.
    pub fn created(&self, kind: ObjectKind) -> usize {
        self.created[kind.index()].load(Ordering::SeqCst)
    }

    /// Objects of `kind` released so far.
    pub fn released(&self, kind: ObjectKind) -> usize {
        self.released[kind.index()].load(Ordering::SeqCst)
    }

    /// Objects of `kind` still alive.
    pub fn live(&self, kind: ObjectKind) -> usize {
        self.created(kind) - self.released(kind)
    }

    /// Objects of any kind still alive.
    pub fn live_total(&self) -> usize {
        ObjectKind::ALL.iter().map(|&k| self.live(k)).sum()
    }

    /// Every release so far, oldest first.
    pub fn release_order(&self) -> Vec<ObjectKind> {
        self.release_order.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Kernel ranges enqueued.
    pub fn dispatches(&self) -> usize {
        self.dispatches.load(Ordering::SeqCst)
    }

    /// Completion barriers executed.
    pub fn barriers(&self) -> usize {
        self.barriers.load(Ordering::SeqCst)
    }

    pub(crate) fn record_dispatch(&self) {
        self.dispatches.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_barrier(&self) {
        self.barriers.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn issue(self: &Arc<Self>, kind: ObjectKind) -> LiveToken {
        self.created[kind.index()].fetch_add(1, Ordering::SeqCst);
        debug!(?kind, "created");
        LiveToken {
            kind,
            ledger: Arc::clone(self),
        }
    }

    fn release(&self, kind: ObjectKind) {
        self.released[kind.index()].fetch_add(1, Ordering::SeqCst);
        if let Ok(mut order) = self.release_order.lock() {
            order.push(kind);
        }
        debug!(?kind, "released");
    }
}

/// Proof of a live object. Dropping it records the release.
#[derive(Debug)]
pub(crate) struct LiveToken {
    kind: ObjectKind,
    ledger: Arc<ObjectLedger>,
}

impl Drop for LiveToken {
    fn drop(&mut self) {
        self.ledger.release(self.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_lifecycle() {
        let ledger = Arc::new(ObjectLedger::default());
        let ctx = ledger.issue(ObjectKind::Context);
        let queue = ledger.issue(ObjectKind::Queue);
        assert_eq!(ledger.live_total(), 2);

        drop(queue);
        drop(ctx);
        assert_eq!(ledger.live_total(), 0);
        assert_eq!(ledger.release_order(), vec![ObjectKind::Queue, ObjectKind::Context]);
    }
}
