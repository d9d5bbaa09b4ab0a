use std::sync::Arc;

use bytes::Bytes;



/// Broker-ready envelope wrapping one payload taken from the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic   : Arc<str>,
    pub payload : Bytes,

    /// worker that polled this payload
    pub worker  : usize,
}

impl OutboundMessage {
    pub fn new(topic: Arc<str>, payload: Bytes, worker: usize) -> Self {
        OutboundMessage {
            topic,
            payload,
            worker
        }
    }
}
