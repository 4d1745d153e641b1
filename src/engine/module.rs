use std::future::Future;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::error::AppResult;

use super::vector::VectorEngine;

/// Process-wide engine handle, initialized at most once. Concurrent callers
/// await the same in-flight initialization.
pub struct EngineModule<E> {
    cell: OnceCell<Arc<E>>,
}

pub static VECTOR_MODULE: EngineModule<VectorEngine> = EngineModule::new();

impl<E> EngineModule<E> {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    pub fn get(&self) -> Option<Arc<E>> {
        self.cell.get().cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    /// A failed initialization leaves the module empty so a later call retries.
    pub async fn init<F, Fut>(&self, init: F) -> AppResult<Arc<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<E>>,
    {
        let engine = self
            .cell
            .get_or_try_init(|| async move {
                let engine = init().await?;
                log::info!("render engine initialized");
                Ok::<_, crate::error::AppError>(Arc::new(engine))
            })
            .await?;
        Ok(Arc::clone(engine))
    }
}

impl<E> Default for EngineModule<E> {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn vector_engine() -> AppResult<Arc<VectorEngine>> {
    VECTOR_MODULE.init(|| async { Ok(VectorEngine::new()) }).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::future::join_all;

    use super::{EngineModule, vector_engine};
    use crate::error::AppError;

    #[tokio::test]
    async fn concurrent_callers_share_one_initialization() {
        let module: Arc<EngineModule<usize>> = Arc::new(EngineModule::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let calls = (0..8).map(|_| {
            let module = Arc::clone(&module);
            let runs = Arc::clone(&runs);
            async move {
                module
                    .init(|| async move {
                        tokio::task::yield_now().await;
                        Ok(runs.fetch_add(1, Ordering::SeqCst) + 41)
                    })
                    .await
            }
        });
        let results = join_all(calls).await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(*result.expect("init should succeed"), 41);
        }
    }

    #[tokio::test]
    async fn failed_initialization_can_be_retried() {
        let module: EngineModule<u8> = EngineModule::new();
        let err = module
            .init(|| async { Err(AppError::invalid_argument("module bytes missing")) })
            .await
            .expect_err("first init fails");
        assert!(matches!(err, AppError::InvalidArgument(_)));
        assert!(!module.is_initialized());

        let value = module.init(|| async { Ok(7) }).await.expect("retry");
        assert_eq!(*value, 7);
        assert_eq!(module.get().as_deref(), Some(&7));
    }

    #[tokio::test]
    async fn vector_engine_is_a_shared_singleton() {
        let first = vector_engine().await.expect("engine");
        let second = vector_engine().await.expect("engine");
        assert!(Arc::ptr_eq(&first, &second));
    }
}
