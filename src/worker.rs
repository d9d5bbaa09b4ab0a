use std::{sync::Arc, time::Duration};

use tokio::time::{self, Instant, MissedTickBehavior};

use crate::{
    broker::Connection,
    connection_pool::ConnectionHandle,
    error::SendError,
    message::OutboundMessage,
    metrics::Metrics,
    shutdown_manager::{StopListener, WorkerGuard},
    source::MessageSource
};



#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Draining,
    Stopped
}


/// Result of one tick of the worker loop
#[derive(Debug)]
pub enum TickOutcome {

    /// source had nothing to give, not an error
    SourceEmpty,

    /// message appended, batch not full yet
    Buffered { pending: usize },

    /// full batch accepted by the broker
    Delivered { messages: usize },

    /// full batch rejected, its messages are dropped
    SendFailed(SendError)
}


/// What a worker left behind when it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerExit {
    pub worker: usize,
    pub ticks: u64,
    pub dropped: usize
}



/// One independently paced producing task
///
/// ## Loop
/// ```text
///     wait tick -> poll source -> append -> flush if full -> check stop
/// ```
///
/// a batch is flushed only when it reaches `batch_size`,
/// there is no time based flush of a partial batch
pub struct ProducerWorker<S, C> {
    id: usize,
    topic: Arc<str>,
    batch_size: usize,
    tick_interval: Duration,

    source: Arc<S>,
    connection: ConnectionHandle<C>,
    metrics: Arc<Metrics>,
    stop: StopListener,

    state: WorkerState,
    batch: Vec<OutboundMessage>
}

impl<S, C> ProducerWorker<S, C>
where
    S: MessageSource,
    C: Connection
{

    #[allow(clippy::too_many_arguments)]
    pub fn new(id: usize,
               topic: Arc<str>,
               batch_size: usize,
               tick_interval: Duration,
               source: Arc<S>,
               connection: ConnectionHandle<C>,
               metrics: Arc<Metrics>,
               stop: StopListener) -> Self
    {
        ProducerWorker {
            id,
            topic,
            batch_size,
            tick_interval,
            source,
            connection,
            metrics,
            stop,
            state: WorkerState::Idle,
            batch: Vec::with_capacity(batch_size)
        }
    }


    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// messages waiting in the current, not yet full batch
    pub fn pending(&self) -> usize {
        self.batch.len()
    }


    /// One poll/append/flush round, without pacing and stop handling
    pub async fn step(&mut self) -> TickOutcome {

        let payload = match self.source.try_take() {
            Some(payload) => payload,
            None => {
                self.metrics.record_empty_poll();
                return TickOutcome::SourceEmpty
            }
        };

        self.batch.push(OutboundMessage::new(self.topic.clone(), payload, self.id));

        if self.batch.len() < self.batch_size {
            return TickOutcome::Buffered { pending: self.batch.len() }
        }

        self.flush().await
    }


    async fn flush(&mut self) -> TickOutcome {

        let batch_len = self.batch.len();

        let res = {
            let mut conn = self.connection.lock().await;
            conn.send_batch(&self.topic, &self.batch).await
        };

        // cleared whatever the outcome, a failed batch is never resent
        self.batch.clear();

        match res {
            Ok(()) => {
                self.metrics.record_sent(batch_len);
                TickOutcome::Delivered { messages: batch_len }
            }
            Err(source) => {
                self.metrics.record_send_error();
                TickOutcome::SendFailed(SendError {
                    connection: self.connection.index(),
                    batch_len,
                    source
                })
            }
        }
    }


    /// Run until the stop signal is observed, the partial batch is dropped.
    pub async fn run(mut self) -> WorkerExit {

        self.state = WorkerState::Running;

        // first tick one interval from now, like a plain ticker
        let mut ticker = time::interval_at(Instant::now() + self.tick_interval, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut ticks = 0u64;

        while self.state == WorkerState::Running {

            ticker.tick().await;
            ticks += 1;

            match self.step().await {
                TickOutcome::SourceEmpty => {
                    tracing::trace!(worker = self.id, "source empty");
                }
                TickOutcome::Buffered { .. } => (),
                TickOutcome::Delivered { messages } => {
                    tracing::debug!(worker = self.id, messages, "batch sent");
                }
                TickOutcome::SendFailed(e) => {
                    tracing::warn!(worker = self.id, error = %e, "error while sending batch");
                }
            }

            // the only point where stop is observed
            if self.stop.is_stopped() {
                self.state = WorkerState::Draining;
            }
        }

        drop(ticker);

        let dropped = self.batch.len();
        if dropped > 0 {
            self.metrics.record_dropped(dropped);
            self.batch.clear();
        }

        self.state = WorkerState::Stopped;

        tracing::debug!(worker = self.id, ticks, dropped, "stopped producer");

        WorkerExit {
            worker: self.id,
            ticks,
            dropped
        }
    }


    /// Spawn the run loop, `guard` is released when the worker exits.
    ///
    /// A panicking worker is reported and counted, the handle then yields `None`.
    pub fn spawn(self, guard: WorkerGuard) -> tokio::task::JoinHandle<Option<WorkerExit>> {
        let id = self.id;
        let metrics = self.metrics.clone();

        let run = tokio::spawn(self.run());

        tokio::spawn(async move {
            let _guard = guard;

            match run.await {
                Ok(exit) => Some(exit),
                Err(e) => {
                    metrics.record_worker_panic();
                    tracing::warn!(worker = id, error = %e, "producer worker died before stop, its partial batch is lost");
                    None
                }
            }
        })
    }
}
