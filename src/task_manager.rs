//! Tracks the background tasks of the `procwatch` binary and awaits them on shutdown.
use futures::future::join_all;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Named `JoinHandle`s sharing one shutdown channel.
#[derive(Clone, Debug)]
pub struct TaskManager {
    handles: Arc<Mutex<Vec<(&'static str, JoinHandle<()>)>>>,
    shutdown_rx: watch::Receiver<()>,
}

impl TaskManager {
    pub fn new(shutdown_rx: watch::Receiver<()>) -> Self {
        Self {
            handles: Arc::new(Mutex::new(Vec::new())),
            shutdown_rx,
        }
    }

    /// Spawns `future` and keeps its handle under `name`.
    pub fn spawn<F>(&self, name: &'static str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        debug!(task_name = name, "Spawning task");
        self.track(name, tokio::spawn(future));
    }

    /// Keeps a handle to a task spawned elsewhere.
    pub fn track(&self, name: &'static str, handle: JoinHandle<()>) {
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((name, handle));
    }

    pub fn shutdown_rx(&self) -> watch::Receiver<()> {
        self.shutdown_rx.clone()
    }

    /// Waits for every tracked task, returning the names of those that panicked.
    pub async fn shutdown(self) -> Vec<&'static str> {
        let handles: Vec<_> = self
            .handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect();
        info!(
            "TaskManager shutting down. Waiting for {} tasks to complete...",
            handles.len()
        );

        let (names, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let results = join_all(handles).await;

        let mut panicked = Vec::new();
        for (task_name, result) in names.into_iter().zip(results) {
            match result {
                Ok(()) => debug!(task_name, "Task shut down gracefully."),
                Err(e) => {
                    error!(task_name, error = %e, "Task panicked during shutdown.");
                    panicked.push(task_name);
                }
            }
        }

        if panicked.is_empty() {
            info!("All tasks shut down gracefully.");
        }
        panicked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_waits_for_tasks_that_observe_the_signal() {
        let (tx, rx) = watch::channel(());
        let manager = TaskManager::new(rx);

        let mut task_rx = manager.shutdown_rx();
        manager.spawn("waiter", async move {
            let _ = task_rx.changed().await;
        });
        manager.spawn("panicker", async {
            panic!("boom");
        });

        tx.send(()).unwrap();
        let panicked = tokio::time::timeout(Duration::from_secs(1), manager.shutdown())
            .await
            .unwrap();
        assert_eq!(panicked, vec!["panicker"]);
    }
}
