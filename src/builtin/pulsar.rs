use async_trait::async_trait;
use indexmap::IndexMap;
use pulsar::{producer::SendFuture, Producer, Pulsar, TokioExecutor};

use crate::{
    broker::{Connection, Connector},
    error::BrokerError,
    message::OutboundMessage
};



/// Opens one pulsar client per connection slot,
/// producers are created lazily, one per topic.
#[derive(Clone)]
pub struct PulsarConnector {
    instance_name: String
}

impl PulsarConnector {
    pub fn new(instance_name: &str) -> Self {
        PulsarConnector {
            instance_name: instance_name.to_owned()
        }
    }
}


#[async_trait]
impl Connector for PulsarConnector {

    type Conn = PulsarConnection;

    async fn open(&self, endpoints: &[String], index: usize) -> Result<PulsarConnection, BrokerError> {

        // pulsar url accepts a comma separated host list
        let url = endpoints.join(",");

        let pulsar: Pulsar<TokioExecutor> = Pulsar::builder(url, TokioExecutor)
            .build()
            .await?;

        Ok(PulsarConnection {
            pulsar,
            name: format!("{}-{}", self.instance_name, index),
            producers: IndexMap::new()
        })
    }
}



pub struct PulsarConnection {
    pulsar: Pulsar<TokioExecutor>,
    name: String,
    producers: IndexMap<String, Producer<TokioExecutor>>
}

impl PulsarConnection {

    async fn producer(&mut self, topic: &str) -> Result<&mut Producer<TokioExecutor>, BrokerError> {

        if !self.producers.contains_key(topic) {
            let producer = self.pulsar
                .producer()
                .with_topic(topic)
                .with_name(format!("{}-{}", self.name, self.producers.len()))
                .build()
                .await?;

            self.producers.insert(topic.to_owned(), producer);
        }

        match self.producers.get_mut(topic) {
            Some(producer) => Ok(producer),
            None => Err(format!("no producer for topic `{}`", topic).into())
        }
    }
}


#[async_trait]
impl Connection for PulsarConnection {

    async fn send_batch(&mut self, topic: &str, batch: &[OutboundMessage]) -> Result<(), BrokerError> {

        let producer = self.producer(topic).await?;

        let mut receipts: Vec<SendFuture> = Vec::with_capacity(batch.len());
        for msg in batch {
            receipts.push(producer.send(msg.payload.to_vec()).await?);
        }

        // all-or-nothing, first failed receipt fails the batch
        for receipt in receipts {
            receipt.await?;
        }

        Ok(())
    }

    async fn close(&mut self) {
        for (topic, mut producer) in self.producers.drain(..) {
            if let Err(e) = producer.close().await {
                tracing::warn!(%topic, error = %e, "pulsar producer close failed");
            }
        }
    }
}
