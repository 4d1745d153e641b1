use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::LocalBoxFuture;
use tokio::sync::Mutex;

/// Serial job queue: jobs run one at a time, in submission order, each with
/// exclusive access to the shared state.
pub struct RenderQueue<S> {
    state: Mutex<S>,
    submitted: AtomicU64,
    completed: AtomicU64,
}

impl<S> RenderQueue<S> {
    pub fn new(state: S) -> Self {
        Self {
            state: Mutex::new(state),
            submitted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
        }
    }

    pub async fn submit<T, F>(&self, job: F) -> T
    where
        F: for<'a> FnOnce(&'a mut S) -> LocalBoxFuture<'a, T>,
    {
        let ticket = self.submitted.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().await;
        log::trace!("render queue running job {ticket}");
        let output = job(&mut *state).await;
        drop(state);
        self.completed.fetch_add(1, Ordering::SeqCst);
        output
    }

    pub fn pending(&self) -> u64 {
        self.submitted
            .load(Ordering::SeqCst)
            .saturating_sub(self.completed.load(Ordering::SeqCst))
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn into_inner(self) -> S {
        self.state.into_inner()
    }
}
