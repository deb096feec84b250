// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live query handle.

use futures_util::stream::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use crate::db::store::Snapshot;

type CancelHook = Box<dyn FnOnce() + Send + Sync>;

/// Stream of full result sets for a watched query.
///
/// Every delivery is the complete, ordered result of the query at that
/// moment. Once cancelled (explicitly or by dropping the handle) no
/// further deliveries are observed.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Vec<Snapshot>>,
    cancelled: bool,
    on_cancel: Option<CancelHook>,
}

impl Subscription {
    pub fn new(
        receiver: mpsc::UnboundedReceiver<Vec<Snapshot>>,
        on_cancel: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            receiver,
            cancelled: false,
            on_cancel: Some(Box::new(on_cancel)),
        }
    }

    /// Wait for the next result set. `None` once cancelled or when the
    /// backend has stopped.
    pub async fn next_snapshot(&mut self) -> Option<Vec<Snapshot>> {
        if self.cancelled {
            return None;
        }
        self.receiver.recv().await
    }

    /// Stop receiving updates. Idempotent.
    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        self.receiver.close();
        if let Some(hook) = self.on_cancel.take() {
            hook();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl Stream for Subscription {
    type Item = Vec<Snapshot>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.cancelled {
            return Poll::Ready(None);
        }
        this.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.cancelled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_cancel_stops_delivery_and_runs_hook_once() {
        let (tx, rx) = mpsc::unbounded_channel();
        let calls = Arc::new(AtomicUsize::new(0));
        let hook_calls = calls.clone();
        let mut sub = Subscription::new(rx, move || {
            hook_calls.fetch_add(1, Ordering::SeqCst);
        });

        tx.send(Vec::new()).unwrap();
        assert_eq!(sub.next_snapshot().await, Some(Vec::new()));

        sub.cancel();
        sub.cancel();
        assert!(sub.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(tx.send(Vec::new()).is_err());
        assert_eq!(sub.next_snapshot().await, None);
    }

    #[tokio::test]
    async fn test_drop_runs_hook() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let calls = Arc::new(AtomicUsize::new(0));
        let hook_calls = calls.clone();
        let sub = Subscription::new(rx, move || {
            hook_calls.fetch_add(1, Ordering::SeqCst);
        });

        drop(sub);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
