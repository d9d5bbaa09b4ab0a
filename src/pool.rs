use std::sync::{Arc, atomic::{AtomicBool, Ordering}};

use parking_lot::Mutex;

use crate::{
    broker::{Connection, Connector},
    config::ProducerConfig,
    connection_pool::BrokerConnectionPool,
    error::ProducerError,
    metrics::{Metrics, MetricsSnapshot},
    pacing::PacingPlan,
    shutdown_manager::{JoinBarrier, StopSignal},
    source::MessageSource,
    worker::ProducerWorker
};



/// Owns N paced workers, their stop signal, join barrier and metrics.
///
///
/// ```text
///                              /  worker-0 \
///      MessageSource  ------  -   worker-1  -----  connection-0
///                              \  worker-2 /
///                                 ...
/// ```
///
/// ```ignore
///     let pool = ProducerPool::new(config, &connector, source).await?;
///     pool.start()?;
///     ...
///     let report = pool.stop().await?;
/// ```
pub struct ProducerPool<S, C> {
    config: ProducerConfig,
    plan: PacingPlan,
    topic: Arc<str>,

    source: Arc<S>,
    connections: BrokerConnectionPool<C>,
    metrics: Arc<Metrics>,

    stop_signal: Mutex<Option<StopSignal>>,
    barrier: Arc<JoinBarrier>,

    started: AtomicBool,
    stopped: AtomicBool
}

impl<S, C> ProducerPool<S, C>
where
    S: MessageSource,
    C: Connection
{

    /// Validate config, derive pacing and open every broker connection.
    ///
    /// Nothing is spawned yet, see `start`.
    pub async fn new<K>(config: ProducerConfig,
                        connector: &K,
                        source: Arc<S>) -> Result<Self, ProducerError>
    where
        K: Connector<Conn = C>
    {
        let plan = PacingPlan::derive(&config)?;
        let connections = BrokerConnectionPool::open(connector, &config.brokers, &plan).await?;

        Ok(Self::assemble(config, plan, connections, source))
    }


    /// Same as `new`, over connections opened elsewhere.
    ///
    /// The pool must be sized and mapped exactly as the config's pacing plan.
    pub fn with_connections(config: ProducerConfig,
                            connections: BrokerConnectionPool<C>,
                            source: Arc<S>) -> Result<Self, ProducerError>
    {
        let plan = PacingPlan::derive(&config)?;

        if connections.len() != plan.connection_count {
            return Err(ProducerError::config(format!(
                "expected {} connections for {} workers, got {}",
                plan.connection_count, config.workers, connections.len()
            )))
        }

        if connections.workers_per_connection() != plan.workers_per_connection {
            return Err(ProducerError::config(format!(
                "connection pool maps {} workers per connection, config says {}",
                connections.workers_per_connection(), plan.workers_per_connection
            )))
        }

        Ok(Self::assemble(config, plan, connections, source))
    }


    fn assemble(config: ProducerConfig,
                plan: PacingPlan,
                connections: BrokerConnectionPool<C>,
                source: Arc<S>) -> Self
    {
        ProducerPool {
            topic: Arc::from(config.topic.as_str()),
            stop_signal: Mutex::new(Some(StopSignal::with_capacity(config.workers))),
            config,
            plan,
            source,
            connections,
            metrics: Arc::new(Metrics::new()),
            barrier: JoinBarrier::new(),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false)
        }
    }


    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    pub fn plan(&self) -> &PacingPlan {
        &self.plan
    }

    pub fn connections(&self) -> &BrokerConnectionPool<C> {
        &self.connections
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    /// workers that have not reached `Stopped` yet
    pub fn live_workers(&self) -> usize {
        self.barrier.pending()
    }


    /// Spawn `workers` run loops and return immediately.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(&self) -> Result<(), ProducerError> {

        if self.stopped.load(Ordering::SeqCst) {
            return Err(ProducerError::AlreadyStopped)
        }

        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ProducerError::AlreadyStarted)
        }

        let mut guard = self.stop_signal.lock();
        let signal = match guard.as_mut() {
            Some(signal) => signal,
            None => return Err(ProducerError::AlreadyStopped)
        };

        for id in 0..self.config.workers {

            let worker = ProducerWorker::new(id,
                                             self.topic.clone(),
                                             self.config.batch_size,
                                             self.plan.tick_interval,
                                             self.source.clone(),
                                             self.connections.assign(id),
                                             self.metrics.clone(),
                                             signal.subscribe());

            // fire and forget, completion is tracked by the barrier
            let _ = worker.spawn(self.barrier.enter());
        }

        tracing::info!(
            topic = %self.topic,
            workers = self.config.workers,
            connections = self.connections.len(),
            tick_interval = ?self.plan.tick_interval,
            batch_size = self.config.batch_size,
            "started producers"
        );

        Ok(())
    }


    /// Broadcast stop to every worker, wait for all of them to exit,
    /// close the connections and report the counters.
    ///
    /// Shutdown takes up to one tick interval plus the longest in-flight send.
    pub async fn stop(&self) -> Result<MetricsSnapshot, ProducerError> {

        if self.stopped.swap(true, Ordering::SeqCst) {
            return Err(ProducerError::AlreadyStopped)
        }

        let signal = self.stop_signal.lock().take();
        if let Some(signal) = signal {
            let notified = signal.broadcast();
            tracing::debug!(notified, "stop signal broadcast");
        }

        self.barrier.wait().await;

        self.connections.close_all().await;

        let report = self.metrics.snapshot();

        tracing::info!(
            sent_batches = report.sent_batches,
            send_errors = report.send_errors,
            messages_sent = report.messages_sent,
            dropped_at_shutdown = report.dropped_at_shutdown,
            "stopped producers"
        );

        if report.worker_panics > 0 {
            tracing::warn!(worker_panics = report.worker_panics, "some producers died before stop");
        }

        Ok(report)
    }
}
