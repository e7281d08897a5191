//! Deadline and cancellation carried into every remote call.
//!
//! A [`Context`] is cheap to clone and is passed by reference through the
//! registry, providers and reconciler. [`Context::run`] races a future
//! against the deadline and the cancel signal; the losing future is dropped,
//! which aborts whatever it was waiting on (child processes are spawned with
//! `kill_on_drop`).

use crate::error::{ProviderError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Clone, Debug)]
pub struct Context {
    deadline: Option<(Instant, Duration)>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Cancels every [`Context`] derived from the one it was created with.
#[derive(Debug)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // send_replace never fails even when every receiver is gone
        self.tx.send_replace(true);
    }
}

impl Context {
    /// Never expires, never cancelled.
    pub fn background() -> Self {
        Context {
            deadline: None,
            cancel: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Context::background().timeout(timeout)
    }

    pub fn with_cancel() -> (Self, CancelHandle) {
        Context::background().cancellable()
    }

    /// Derive a context that also expires after `timeout`; the earlier of the
    /// two deadlines wins.
    pub fn timeout(&self, timeout: Duration) -> Self {
        let candidate = (Instant::now() + timeout, timeout);
        let deadline = match self.deadline {
            Some(existing) if existing.0 <= candidate.0 => existing,
            _ => candidate,
        };
        Context {
            deadline: Some(deadline),
            cancel: self.cancel.clone(),
        }
    }

    /// Derive a child context with its own cancel handle. Cancelling the
    /// parent also cancels the child.
    pub fn cancellable(&self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let tx = Arc::new(tx);
        if let Some(mut parent) = self.cancel.clone() {
            let child_tx = Arc::clone(&tx);
            tokio::spawn(async move {
                loop {
                    if *parent.borrow_and_update() {
                        child_tx.send_replace(true);
                        return;
                    }
                    tokio::select! {
                        changed = parent.changed() => {
                            if changed.is_err() {
                                return;
                            }
                        }
                        _ = child_tx.closed() => return,
                    }
                }
            });
        }
        let ctx = Context {
            deadline: self.deadline,
            cancel: Some(rx),
        };
        (ctx, CancelHandle { tx })
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Error for a context that is already done, checked before starting work.
    pub fn err(&self) -> Option<ProviderError> {
        if self.is_cancelled() {
            return Some(ProviderError::Cancelled);
        }
        match self.deadline {
            Some((at, d)) if Instant::now() >= at => Some(ProviderError::Timeout(d)),
            _ => None,
        }
    }

    /// Run `fut` until it completes, the deadline passes or the context is
    /// cancelled, whichever comes first.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if let Some(e) = self.err() {
            return Err(e);
        }

        let cancelled = async {
            match self.cancel.clone() {
                Some(mut rx) => {
                    // a dropped handle can never cancel
                    if rx.wait_for(|c| *c).await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };

        let expired = async {
            match self.deadline {
                Some((at, _)) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            res = fut => res,
            _ = cancelled => Err(ProviderError::Cancelled),
            _ = expired => Err(ProviderError::Timeout(self.deadline.map(|d| d.1).unwrap_or_default())),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_runs_to_completion() {
        let ctx = Context::background();
        let v = ctx.run(async { Ok(7) }).await.unwrap();
        assert_eq!(v, 7);
        assert!(ctx.err().is_none());
    }

    #[tokio::test]
    async fn test_timeout_aborts_slow_future() {
        let ctx = Context::with_timeout(Duration::from_millis(20));
        let started = std::time::Instant::now();
        let res: Result<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;
        assert!(matches!(res, Err(ProviderError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_future() {
        let (ctx, handle) = Context::with_cancel();
        let task = tokio::spawn({
            let ctx = ctx.clone();
            async move {
                ctx.run(async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Ok(())
                })
                .await
            }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();
        let res = task.await.unwrap();
        assert!(matches!(res, Err(ProviderError::Cancelled)));
        assert!(matches!(ctx.err(), Some(ProviderError::Cancelled)));
    }

    #[tokio::test]
    async fn test_already_cancelled_never_polls() {
        let (ctx, handle) = Context::with_cancel();
        handle.cancel();
        let polled = std::sync::atomic::AtomicBool::new(false);
        let res: Result<()> = ctx
            .run(async {
                polled.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(res, Err(ProviderError::Cancelled)));
        assert!(!polled.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_parent_cancel_reaches_child() {
        let (parent, handle) = Context::with_cancel();
        let (child, _child_handle) = parent.timeout(Duration::from_secs(30)).cancellable();
        handle.cancel();
        let res: Result<()> = child
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;
        assert!(matches!(res, Err(ProviderError::Cancelled)));
    }

    #[tokio::test]
    async fn test_earlier_deadline_wins() {
        let ctx = Context::with_timeout(Duration::from_millis(10)).timeout(Duration::from_secs(60));
        let res: Result<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;
        assert!(matches!(res, Err(ProviderError::Timeout(d)) if d == Duration::from_millis(10)));
    }
}
