//! The channel here is similar to `futures::channel::mpsc::channel` but
//! allows non-blocking send (and looses message when buffer is full)

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use futures::stream::{Fuse};
use futures::channel::mpsc::{unbounded, UnboundedSender, UnboundedReceiver};

use crate::element::{Metric};

#[derive(Clone)]
pub struct Sender {
    channel: UnboundedSender<Metric>,
    buffered: Arc<AtomicUsize>,
    max_metrics_buffered: usize,
}

pub struct Receiver {
    channel: Fuse<UnboundedReceiver<Metric>>,
    buffered: Arc<AtomicUsize>,
}

pub fn channel(max_metrics_buffered: usize) -> (Sender, Receiver) {
    let (tx, rx) = unbounded();
    let counter = Arc::new(AtomicUsize::new(0));
    (Sender {
        channel: tx,
        buffered: counter.clone(),
        max_metrics_buffered: max_metrics_buffered,
    }, Receiver {
        channel: rx.fuse(),
        buffered: counter,
    })
}

impl Sender {
    pub fn send(&self, metric: Metric) {
        let max = self.max_metrics_buffered;
        if self.buffered.load(Ordering::Relaxed) >= max {
            trace!("Warning can't send metric {}, buffer is full",
                String::from_utf8_lossy(&metric.0).trim_end());
            return;
        }
        self.buffered.fetch_add(1, Ordering::Relaxed);
        self.channel.unbounded_send(metric)
        // only happens when the connection future is dropped
        .map_err(|_| {
            self.buffered.fetch_sub(1, Ordering::Relaxed);
            debug!("Can't send metric, connection has been shut down")
        })
        // but we don't want it to be fatal
        .ok();
    }
    pub fn buffered(&self) -> (usize, usize) {
        return (
            self.buffered.load(Ordering::Relaxed),
            self.max_metrics_buffered,
        )
    }
}

impl Stream for Receiver {
    type Item = Metric;
    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context)
        -> Poll<Option<Metric>>
    {
        match self.channel.poll_next_unpin(cx) {
            Poll::Ready(Some(x)) => {
                self.buffered.fetch_sub(1, Ordering::Relaxed);
                Poll::Ready(Some(x))
            }
            y => y,
        }
    }
}

impl Receiver {
    pub fn is_done(&self) -> bool {
        self.channel.is_done()
    }
}

#[cfg(test)]
mod test {
    use futures::StreamExt;
    use futures::executor::block_on;

    use super::channel;
    use crate::element::Metric;

    fn metric(name: &str) -> Metric {
        Metric(format!("{} 1 2\n", name).into_bytes())
    }

    #[test]
    fn drops_when_full() {
        let (tx, mut rx) = channel(2);
        tx.send(metric("a"));
        tx.send(metric("b"));
        tx.send(metric("c"));
        assert_eq!(tx.buffered(), (2, 2));
        assert_eq!(block_on(rx.next()), Some(metric("a")));
        assert_eq!(tx.buffered(), (1, 2));
        tx.send(metric("d"));
        assert_eq!(block_on(rx.next()), Some(metric("b")));
        assert_eq!(block_on(rx.next()), Some(metric("d")));
        assert_eq!(tx.buffered(), (0, 2));
    }

    #[test]
    fn done_when_senders_dropped() {
        let (tx, mut rx) = channel(10);
        let tx2 = tx.clone();
        tx2.send(metric("a"));
        drop(tx);
        drop(tx2);
        assert!(!rx.is_done());
        assert_eq!(block_on(rx.next()), Some(metric("a")));
        assert_eq!(block_on(rx.next()), None);
        assert!(rx.is_done());
    }

    #[test]
    fn send_after_receiver_dropped() {
        let (tx, rx) = channel(10);
        drop(rx);
        tx.send(metric("a"));
        assert_eq!(tx.buffered(), (0, 10));
    }
}
