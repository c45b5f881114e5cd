use futures::future::{ AbortHandle, Abortable };
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// An action that runs once `delay` has elapsed, unless it is cancelled
/// first.
///
/// Dropping the handle cancels it. Cancellation only reaches the timer:
/// once the delay is over the action runs to completion.
#[derive(Debug)]
pub struct DeferredTask {
    abort: AbortHandle,
    handle: JoinHandle<()>,
}

impl DeferredTask {
    pub fn schedule<F>(delay: Duration, action: F) -> Self
        where F: Future<Output = ()> + Send + 'static
    {
        let (abort, registration) = AbortHandle::new_pair();
        let handle = tokio::spawn(async move {
            if Abortable::new(tokio::time::sleep(delay), registration).await.is_ok() {
                action.await;
            }
        });
        Self { abort, handle }
    }

    pub fn cancel(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for DeferredTask {
    fn drop(&mut self) {
        self.abort.abort();
    }
}
