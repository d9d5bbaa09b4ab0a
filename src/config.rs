use crate::error::ProducerError;



pub const MESSAGE_RATE: u64 = 1000;
pub const WORKERS: usize = 1;
pub const BATCH_SIZE: usize = 100;
pub const WORKERS_PER_CONNECTION: usize = 5;
pub const BROKERS: &[&str] = &["localhost:9092"];



/// Immutable producer settings, validated before the pool is built
///
/// ## message_rate
/// ```text
///     target aggregate rate (messages/second) over all workers
/// ```
///
/// ## workers
/// ```text
///     number of independently paced producing tasks
/// ```
///
/// ## batch_size
/// ```text
///     a batch is flushed only once it holds exactly this many messages
/// ```
///
/// ## workers_per_connection
/// ```text
///     how many workers share one broker connection,
///     connection count is `ceil(workers / workers_per_connection)`
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerConfig {
    pub topic: String,
    pub message_rate: u64,
    pub workers: usize,
    pub batch_size: usize,
    pub workers_per_connection: usize,
    pub brokers: Vec<String>,
}

impl ProducerConfig {

    pub fn new(topic: impl Into<String>) -> Self {
        ProducerConfig {
            topic: topic.into(),
            message_rate: MESSAGE_RATE,
            workers: WORKERS,
            batch_size: BATCH_SIZE,
            workers_per_connection: WORKERS_PER_CONNECTION,
            brokers: BROKERS.iter().map(|b| b.to_string()).collect()
        }
    }

    pub fn with_message_rate(mut self, message_rate: u64) -> Self {
        self.message_rate = message_rate;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_workers_per_connection(mut self, workers_per_connection: usize) -> Self {
        self.workers_per_connection = workers_per_connection;
        self
    }

    pub fn with_brokers<I, B>(mut self, brokers: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<String>
    {
        self.brokers = brokers.into_iter().map(Into::into).collect();
        self
    }


    pub fn validate(&self) -> Result<(), ProducerError> {

        if self.topic.trim().is_empty() {
            return Err(ProducerError::config("topic must not be empty"))
        }

        if self.message_rate == 0 {
            return Err(ProducerError::config("message_rate must be greater than zero"))
        }

        if self.workers == 0 {
            return Err(ProducerError::config("workers must be at least 1"))
        }

        if self.batch_size == 0 {
            return Err(ProducerError::config("batch_size must be at least 1"))
        }

        if self.workers_per_connection == 0 {
            return Err(ProducerError::config("workers_per_connection must be at least 1"))
        }

        if self.brokers.is_empty() {
            return Err(ProducerError::config("at least one broker endpoint is required"))
        }

        Ok(())
    }
}
