use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use rdkafka::{
    ClientConfig,
    producer::{FutureProducer, FutureRecord, Producer},
    util::Timeout
};

use crate::{
    broker::{Connection, Connector},
    error::BrokerError,
    message::OutboundMessage
};



pub const MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);
pub const QUEUE_TIMEOUT: Duration = Duration::from_secs(1);
pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);



/// Opens one rdkafka `FutureProducer` per connection slot
///
/// extra librdkafka properties can be set with `set`,
/// `bootstrap.servers` and `client.id` are filled per connection.
#[derive(Clone)]
pub struct KafkaConnector {
    client_id: String,
    message_timeout: Duration,
    queue_timeout: Duration,
    properties: Vec<(String, String)>
}

impl KafkaConnector {

    pub fn new(client_id: &str) -> Self {
        KafkaConnector {
            client_id: client_id.to_owned(),
            message_timeout: MESSAGE_TIMEOUT,
            queue_timeout: QUEUE_TIMEOUT,
            properties: Vec::new()
        }
    }

    pub fn message_timeout(mut self, timeout: Duration) -> Self {
        self.message_timeout = timeout;
        self
    }

    pub fn queue_timeout(mut self, timeout: Duration) -> Self {
        self.queue_timeout = timeout;
        self
    }

    pub fn set(mut self, key: &str, value: &str) -> Self {
        self.properties.push((key.to_owned(), value.to_owned()));
        self
    }
}


#[async_trait]
impl Connector for KafkaConnector {

    type Conn = KafkaConnection;

    async fn open(&self, endpoints: &[String], index: usize) -> Result<KafkaConnection, BrokerError> {

        let mut cfg = ClientConfig::new();

        cfg.set("bootstrap.servers", endpoints.join(","))
           .set("client.id", format!("{}-{}", self.client_id, index))
           .set("message.timeout.ms", self.message_timeout.as_millis().to_string());

        for (key, value) in self.properties.iter() {
            cfg.set(key, value);
        }

        let producer: FutureProducer = cfg.create()?;

        Ok(KafkaConnection {
            producer,
            queue_timeout: self.queue_timeout
        })
    }
}



pub struct KafkaConnection {
    producer: FutureProducer,
    queue_timeout: Duration
}

#[async_trait]
impl Connection for KafkaConnection {

    /// Enqueue every record, then wait for all delivery reports.
    /// One failed record fails the whole batch.
    async fn send_batch(&mut self, topic: &str, batch: &[OutboundMessage]) -> Result<(), BrokerError> {

        let deliveries = batch.iter().map(|msg| {
            let rec = FutureRecord::<(), [u8]>::to(topic).payload(&msg.payload[..]);
            self.producer.send(rec, Timeout::After(self.queue_timeout))
        });

        for res in join_all(deliveries).await {
            if let Err((ke, _)) = res {
                return Err(Box::new(ke))
            }
        }

        Ok(())
    }

    async fn close(&mut self) {
        let producer = self.producer.clone();

        // flush blocks on librdkafka, keep it off the runtime threads
        let res = tokio::task::spawn_blocking(move || {
            producer.flush(Timeout::After(FLUSH_TIMEOUT))
        }).await;

        match res {
            Ok(Ok(())) => tracing::debug!("kafka producer flushed"),
            Ok(Err(ke)) => {
                tracing::warn!(error = %ke, "kafka producer flush failed, undelivered records are lost");
            }
            Err(e) => {
                tracing::warn!(error = %e, "kafka producer flush did not complete");
            }
        }
    }
}
