use std::{
    sync::{Arc, atomic::{AtomicUsize, Ordering}},
    time::Duration
};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::{
    broker::{Connection, Connector},
    error::BrokerError,
    message::OutboundMessage
};



/// One batch as received by the in-memory broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBatch {
    pub connection : usize,
    pub topic      : String,
    pub payloads   : Vec<Bytes>,
}


#[derive(Debug, thiserror::Error)]
pub enum MemoryBrokerError {
    #[error("connection #{0} refused")]
    Refused(usize),

    #[error("send rejected (injected failure)")]
    Rejected,

    #[error("connection #{0} is closed")]
    Closed(usize),
}


#[derive(Default)]
struct State {
    opened: AtomicUsize,
    closed: AtomicUsize,
    send_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,

    fail_open_at: Option<usize>,
    fail_first_sends: usize,
    send_delay: Option<Duration>,

    batches: Mutex<Vec<RecordedBatch>>
}



/// In-process broker: records every accepted batch and can be told
/// to refuse connections or reject sends.
///
/// Cloning shares the recorded state, so keep a clone around to
/// inspect what the pool sent.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    state: Arc<State>
}

impl MemoryConnector {

    pub fn new() -> Self {
        MemoryConnector::default()
    }

    /// refuse to open connection slot `index` (and only that one)
    pub fn fail_open_at(self, index: usize) -> Self {
        self.configure(|s| s.fail_open_at = Some(index))
    }

    /// reject the first `n` `send_batch` calls, over all connections
    pub fn fail_first_sends(self, n: usize) -> Self {
        self.configure(|s| s.fail_first_sends = n)
    }

    /// simulate broker round-trip latency
    pub fn with_send_delay(self, delay: Duration) -> Self {
        self.configure(|s| s.send_delay = Some(delay))
    }

    // builder methods only run before the connector is shared
    fn configure(mut self, f: impl FnOnce(&mut State)) -> Self {
        match Arc::get_mut(&mut self.state) {
            Some(state) => f(state),
            None => {
                let mut state = State {
                    fail_open_at: self.state.fail_open_at,
                    fail_first_sends: self.state.fail_first_sends,
                    send_delay: self.state.send_delay,
                    ..State::default()
                };
                f(&mut state);
                self.state = Arc::new(state);
            }
        }
        self
    }


    pub fn opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// every `send_batch` call, accepted or rejected
    pub fn send_calls(&self) -> usize {
        self.state.send_calls.load(Ordering::SeqCst)
    }

    /// highest number of sends observed running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> Vec<RecordedBatch> {
        self.state.batches.lock().clone()
    }
}


#[async_trait]
impl Connector for MemoryConnector {

    type Conn = MemoryConnection;

    async fn open(&self, _endpoints: &[String], index: usize) -> Result<MemoryConnection, BrokerError> {

        if self.state.fail_open_at == Some(index) {
            return Err(Box::new(MemoryBrokerError::Refused(index)))
        }

        self.state.opened.fetch_add(1, Ordering::SeqCst);

        Ok(MemoryConnection {
            index,
            state: self.state.clone(),
            closed: false
        })
    }
}



pub struct MemoryConnection {
    index: usize,
    state: Arc<State>,
    closed: bool
}

#[async_trait]
impl Connection for MemoryConnection {

    async fn send_batch(&mut self, topic: &str, batch: &[OutboundMessage]) -> Result<(), BrokerError> {

        if self.closed {
            return Err(Box::new(MemoryBrokerError::Closed(self.index)))
        }

        let call = self.state.send_calls.fetch_add(1, Ordering::SeqCst);

        let running = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.state.send_delay {
            tokio::time::sleep(delay).await;
        }

        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);

        if call < self.state.fail_first_sends {
            return Err(Box::new(MemoryBrokerError::Rejected))
        }

        self.state.batches.lock().push(RecordedBatch {
            connection: self.index,
            topic: topic.to_owned(),
            payloads: batch.iter().map(|m| m.payload.clone()).collect()
        });

        Ok(())
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.state.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}
