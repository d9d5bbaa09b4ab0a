use async_trait::async_trait;

use crate::{error::BrokerError, message::OutboundMessage};



/// One open session to the broker.
///
/// `send_batch` is all-or-nothing from the caller's point of view:
/// an `Err` means the whole batch counts as failed.
#[async_trait]
pub trait Connection: Send + 'static {

    // resolves once the broker acknowledged (or rejected) the batch
    async fn send_batch(&mut self, topic: &str, batch: &[OutboundMessage]) -> Result<(), BrokerError>;

    // Call once, after every worker using this connection exited
    async fn close(&mut self);
}



/// Opens broker sessions for a `BrokerConnectionPool`
#[async_trait]
pub trait Connector: Send + Sync {

    type Conn: Connection;

    /// `index` is the connection slot being opened, in `0..connection_count`
    async fn open(&self, endpoints: &[String], index: usize) -> Result<Self::Conn, BrokerError>;
}
