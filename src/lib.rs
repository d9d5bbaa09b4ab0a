/// ProducerConfig & defaults
mod config;

/// tick interval & connection count derivation
mod pacing;

/// error types
mod error;

/// outbound message envelope
mod message;

/// trait MessageSource & built-in sources
mod source;

/// trait Connector & Connection
mod broker;

/// broker connections shared by blocks of workers
mod connection_pool;

/// stop signal & join barrier
mod shutdown_manager;

/// atomic counters
mod metrics;

/// paced poll -> batch -> flush loop
mod worker;

/// worker pool lifecycle (start & stop)
mod pool;





pub use async_trait::async_trait;

/// Built-in broker connectors
pub mod builtin;


pub use config::{
    ProducerConfig,

    MESSAGE_RATE,
    WORKERS,
    BATCH_SIZE,
    WORKERS_PER_CONNECTION,
    BROKERS
};

pub use pacing::{compute_tick_interval, compute_connection_count, PacingPlan};

pub use error::{ProducerError, SendError, BrokerError};

pub use message::OutboundMessage;

pub use source::{MessageSource, ChannelSource, QueueSource};

pub use broker::{Connection, Connector};

pub use connection_pool::{BrokerConnectionPool, ConnectionHandle};

pub use shutdown_manager::{StopSignal, StopListener, JoinBarrier, WorkerGuard};

pub use metrics::{Metrics, MetricsSnapshot};

pub use worker::{ProducerWorker, WorkerState, TickOutcome, WorkerExit};

pub use pool::ProducerPool;
