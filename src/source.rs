use std::collections::VecDeque;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TryRecvError};



/// Non-blocking provider of raw payloads.
///
/// Shared by every worker of a pool, so implementations
/// must tolerate concurrent `try_take` calls.
pub trait MessageSource: Send + Sync + 'static {

    /// return `None` immediately if nothing is available, never wait
    fn try_take(&self) -> Option<Bytes>;
}



/// Source fed through a bounded tokio channel
///
/// ```ignore
///     let (tx, source) = ChannelSource::bounded(1024);
///     tx.send(Bytes::from_static(b"hello")).await?;
/// ```
pub struct ChannelSource {
    recv: Mutex<mpsc::Receiver<Bytes>>
}

impl ChannelSource {

    pub fn new(recv: mpsc::Receiver<Bytes>) -> Self {
        ChannelSource {
            recv: Mutex::new(recv)
        }
    }

    pub fn bounded(capacity: usize) -> (mpsc::Sender<Bytes>, Self) {
        let (sx, rx) = mpsc::channel(capacity);
        (sx, ChannelSource::new(rx))
    }
}

impl MessageSource for ChannelSource {
    fn try_take(&self) -> Option<Bytes> {
        match self.recv.lock().try_recv() {
            Ok(payload) => Some(payload),

            // disconnected behaves like an empty source,
            // workers keep ticking until stopped
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None
        }
    }
}



/// In-process FIFO source, handy to preload or refill from another task
#[derive(Default)]
pub struct QueueSource {
    queue: Mutex<VecDeque<Bytes>>
}

impl QueueSource {

    pub fn new() -> Self {
        QueueSource::default()
    }

    pub fn push(&self, payload: impl Into<Bytes>) {
        self.queue.lock().push_back(payload.into());
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl<P> FromIterator<P> for QueueSource
where
    P: Into<Bytes>
{
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        QueueSource {
            queue: Mutex::new(iter.into_iter().map(Into::into).collect())
        }
    }
}

impl MessageSource for QueueSource {
    fn try_take(&self) -> Option<Bytes> {
        self.queue.lock().pop_front()
    }
}
