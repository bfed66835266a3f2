use std::fmt;
use std::sync::Arc;

use crate::Error;

/// Worker for handling filesystem operations.
///
/// Filesystem operations are not truly asynchronous, so instead we run the blocking operations
/// on either a dedicated thread-pool or the blocking pool of a tokio runtime.
#[derive(Clone)]
pub struct FilesystemWorker {
    /// Thread pool for spawning I/O.
    pool: Arc<WorkerPool>,
}

impl FilesystemWorker {
    /// Create a [`FilesystemWorker`] backed by a dedicated pool of `num_threads`.
    pub fn new(num_threads: usize) -> Result<Self, Error> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads.max(1))
            .thread_name(|idx| format!("srm-fs-{idx}"))
            .build()?;
        tracing::debug!(num_threads, "started filesystem worker");

        Ok(FilesystemWorker {
            pool: Arc::new(WorkerPool::Rayon { pool }),
        })
    }

    /// Create a [`FilesystemWorker`] that runs work on the blocking pool of `runtime`.
    pub fn tokio(runtime: tokio::runtime::Handle) -> Self {
        FilesystemWorker {
            pool: Arc::new(WorkerPool::Tokio { runtime }),
        }
    }

    /// Run fallible `work` on the pool, returning its result.
    pub async fn run<T, W>(&self, work: W) -> Result<T, Error>
    where
        T: Send + 'static,
        W: FnOnce() -> Result<T, Error> + Send + 'static,
    {
        self.run_typed(work)
            .await
            .map_err(|_| Error::WorkerShutdown)?
    }

    /// Spawn `work` on the pool, returning a one-shot channel that resolves with its result.
    ///
    /// The work starts immediately and runs to completion whether or not the receiver is ever
    /// polled, which makes this the way to run something in the background and join it later.
    pub fn run_typed<T, W>(&self, work: W) -> tokio::sync::oneshot::Receiver<T>
    where
        T: Send + 'static,
        W: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = tokio::sync::oneshot::channel();
        match &*self.pool {
            WorkerPool::Tokio { runtime } => {
                runtime.spawn_blocking(|| {
                    let result = work();
                    // We don't care about the receiver going away.
                    let _ = tx.send(result);
                });
            }
            WorkerPool::Rayon { pool } => {
                pool.spawn(|| {
                    let result = work();
                    // We don't care about the receiver going away.
                    let _ = tx.send(result);
                });
            }
        }
        rx
    }
}

impl fmt::Debug for FilesystemWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilesystemWorker").finish()
    }
}

#[derive(Debug)]
enum WorkerPool {
    Tokio { runtime: tokio::runtime::Handle },
    Rayon { pool: rayon::ThreadPool },
}
