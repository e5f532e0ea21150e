use std::{
    sync::{
        mpsc::{self, Sender},
        Arc, Mutex, PoisonError,
    },
    thread::{self, JoinHandle},
};

use tracing::error;

use crate::error::Error;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Threads that highlight code blocks so the parser never waits on them.
pub(crate) struct HighlightPool {
    tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl HighlightPool {
    pub fn new(num_threads: usize) -> Result<Self, Error> {
        let (tx, rx) = mpsc::channel::<Job>();

        let rx = Arc::new(Mutex::new(rx));
        let mut workers = Vec::with_capacity(num_threads);
        for i in 0..num_threads {
            let rx = rx.clone();
            let worker = thread::Builder::new()
                .name(format!("md-blocks-highlight-{i}"))
                .spawn(move || loop {
                    let job = {
                        let unlocked = rx.lock().unwrap_or_else(PoisonError::into_inner);
                        let Ok(job) = unlocked.recv() else {
                            return;
                        };

                        job
                    };

                    job();
                })?;
            workers.push(worker);
        }

        Ok(Self {
            tx: Some(tx),
            workers,
        })
    }

    /// Queue `job`. False once the pool is shutting down.
    pub fn schedule(&self, job: impl FnOnce() + Send + 'static) -> bool {
        self.tx
            .as_ref()
            .is_some_and(|tx| tx.send(Box::new(job)).is_ok())
    }
}

impl Drop for HighlightPool {
    fn drop(&mut self) {
        // closing the channel ends every worker loop once the queue drains
        self.tx.take();

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("highlight thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn test_jobs_run_before_drop_returns() {
        let pool = HighlightPool::new(2).unwrap();
        let (tx, rx) = channel();

        for i in 0..8 {
            let tx = tx.clone();
            assert!(pool.schedule(move || {
                let _ = tx.send(i);
            }));
        }
        drop(pool);
        drop(tx);

        let mut seen: Vec<i32> = rx.iter().collect();
        seen.sort();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
    }
}
