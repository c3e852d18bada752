//! NATS consumer for incoming prediction requests

use crate::processor::RequestProcessor;
use crate::producer::ReplyProducer;
use anyhow::Result;
use async_nats::{Client, Message, Subscriber};
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Consumer answering prediction requests published on a NATS subject
pub struct RequestConsumer {
    client: Client,
    subject: String,
}

impl RequestConsumer {
    /// Create a new request consumer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the prediction subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to prediction subject");
        Ok(subscriber)
    }

    /// Process requests until the subscription ends or `shutdown` flips.
    ///
    /// At most `workers` requests are in flight at once. Returns only after
    /// every accepted request has been answered.
    pub async fn run(
        &self,
        processor: RequestProcessor,
        workers: usize,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let producer = ReplyProducer::new(self.client.clone());
        let mut pool = WorkerPool::new(workers);
        let mut subscription = self.subscribe().await?;

        info!(subject = %self.subject, workers = workers, "Processing NATS prediction requests");

        loop {
            let message = tokio::select! {
                message = subscription.next() => match message {
                    Some(message) => message,
                    None => break,
                },
                _ = shutdown.changed() => break,
            };

            let processor = processor.clone();
            let producer = producer.clone();
            pool.spawn(async move {
                handle_message(&processor, &producer, message).await;
            })
            .await?;
        }

        let pending = pool.in_flight();
        if pending > 0 {
            info!(pending = pending, "Waiting for in-flight requests");
        }
        pool.drain().await;

        info!(subject = %self.subject, "NATS subscription closed");
        Ok(())
    }
}

/// Bounded set of request tasks that can be drained on shutdown
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<()>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
            tasks: JoinSet::new(),
        }
    }

    /// Spawn `task` once a worker slot is free
    pub async fn spawn<F>(&mut self, task: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = self.semaphore.clone().acquire_owned().await?;

        // Reap finished tasks so the set does not grow with uptime
        while let Some(joined) = self.tasks.try_join_next() {
            log_join(joined);
        }

        self.tasks.spawn(async move {
            task.await;
            drop(permit);
        });
        Ok(())
    }

    /// Tasks spawned and not yet reaped
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every spawned task to finish
    pub async fn drain(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            log_join(joined);
        }
    }
}

fn log_join(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "Request task failed");
    }
}

async fn handle_message(processor: &RequestProcessor, producer: &ReplyProducer, message: Message) {
    let outcome = processor.process_payload_blocking(&message.payload).await;

    match message.reply {
        Some(reply_to) => {
            if let Err(e) = producer.reply(reply_to, &outcome).await {
                error!(error = %e, "Failed to publish prediction reply");
            }
        }
        None if outcome.is_ok() => debug!("Request had no reply subject, result dropped"),
        None => warn!("Request had no reply subject, error dropped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_drain_waits_for_running_tasks() {
        let mut pool = WorkerPool::new(4);
        let finished = Arc::new(AtomicUsize::new(0));

        for delay_ms in [30, 60, 90] {
            let finished = finished.clone();
            pool.spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                finished.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        }

        pool.drain().await;

        assert_eq!(finished.load(Ordering::SeqCst), 3);
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_spawn_waits_for_free_slot() {
        let mut pool = WorkerPool::new(1);
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let finished = Arc::new(AtomicUsize::new(0));

        let first = finished.clone();
        pool.spawn(async move {
            let _ = release_rx.await;
            first.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

        // The only slot is held, so a second spawn must not complete yet
        let second = finished.clone();
        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            pool.spawn(async move {
                second.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .await;
        assert!(blocked.is_err());

        release_tx.send(()).unwrap();
        pool.drain().await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }
}
