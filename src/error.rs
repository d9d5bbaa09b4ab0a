use thiserror::Error;



/// Error type returned by broker integrations (`Connector::open`, `Connection::send_batch`)
pub type BrokerError = Box<dyn std::error::Error + Send + Sync + 'static>;



/// Construction and lifecycle errors of the producer pool
#[derive(Debug, Error)]
pub enum ProducerError {

    /// invalid pacing or batching inputs, raised before any worker starts
    #[error("invalid producer configuration: {0}")]
    Configuration(String),

    /// a broker connection could not be opened, no partial pool is kept
    #[error("failed to open broker connection #{index}: {source}")]
    Connection {
        index: usize,
        #[source]
        source: BrokerError
    },

    #[error("producer pool already started")]
    AlreadyStarted,

    #[error("producer pool already stopped")]
    AlreadyStopped,
}

impl ProducerError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        ProducerError::Configuration(msg.into())
    }
}



/// A batch flush that the broker rejected.
///
/// The batch is dropped, the worker keeps running.
#[derive(Debug, Error)]
#[error("sending batch of {batch_len} messages over connection #{connection} failed: {source}")]
pub struct SendError {
    pub connection: usize,
    pub batch_len: usize,
    #[source]
    pub source: BrokerError
}
