use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use tokio_pace::{builtin::kafka::KafkaConnector, ProducerConfig, ProducerPool, QueueSource};



#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {

    tracing_subscriber::fmt::init();


    // Kafka Config
    let brokers = ["localhost:9092"];
    let topic = "paced-topic";

    let config = ProducerConfig::new(topic)
        .with_brokers(brokers)
        .with_message_rate(10_000)
        .with_workers(12)
        .with_batch_size(100)
        .with_workers_per_connection(5);


    let connector = KafkaConnector::new("tokio-pace")
        .message_timeout(Duration::from_secs(5))
        .set("acks", "1")
        .set("compression.type", "lz4");


    // preload 10s worth of messages
    let source: QueueSource = (0..100_000)
        .map(|i| Bytes::from(format!("{{\"seq\":{}}}", i)))
        .collect();


    let pool = ProducerPool::new(config, &connector, Arc::new(source)).await?;

    println!("==> connection assignment: {:?}", pool.connections().assignments(12));

    pool.start()?;

    tokio::time::sleep(Duration::from_secs(10)).await;

    let report = pool.stop().await?;

    println!("==> Sent batches: {}", report.sent_batches);
    println!("==> Errors while sending: {}", report.send_errors);

    Ok(())
}
