//! FIFO hand-off between the batch producer and the single poster

/// Producer side of the transaction queue
///
/// Dropping every sender closes the queue, which is how the drain loop learns
/// that nothing more is coming.
#[derive(Debug)]
pub(crate) struct QueueSender<T> {
    tx: flume::Sender<T>,
}

/// Consumer side, owned by the one task that posts transactions
#[derive(Debug)]
pub(crate) struct QueueReceiver<T> {
    rx: flume::Receiver<T>,
}

pub(crate) fn transaction_queue<T>() -> (QueueSender<T>, QueueReceiver<T>) {
    let (tx, rx) = flume::unbounded();
    (QueueSender { tx }, QueueReceiver { rx })
}

impl<T> QueueSender<T> {
    /// Enqueue an entry, handing it back if the consumer is gone
    pub fn push(&self, entry: T) -> Result<(), T> {
        self.tx.send(entry).map_err(|e| e.into_inner())
    }
}

impl<T> QueueReceiver<T> {
    /// Next entry in enqueue order, `None` once the queue is closed and drained
    pub async fn next(&self) -> Option<T> {
        self.rx.recv_async().await.ok()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_fifo_until_closed() {
        let (tx, rx) = transaction_queue();
        for i in 0..5 {
            tx.push(i).unwrap();
        }
        drop(tx);

        let mut seen = Vec::new();
        while let Some(i) = rx.next().await {
            seen.push(i);
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_push_after_consumer_dropped() {
        let (tx, rx) = transaction_queue();
        drop(rx);
        assert_eq!(tx.push("late"), Err("late"));
    }
}
