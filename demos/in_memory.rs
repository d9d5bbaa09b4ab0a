use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use tokio_pace::{builtin::memory::MemoryConnector, ChannelSource, ProducerConfig, ProducerPool};



#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {

    tracing_subscriber::fmt::init();


    // Producer Config
    let config = ProducerConfig::new("clicks")
        .with_message_rate(2_000)
        .with_workers(8)
        .with_batch_size(50)
        .with_workers_per_connection(3);


    let connector = MemoryConnector::new();
    let (tx, source) = ChannelSource::bounded(10_000);



    // 1. open ceil(8 / 3) = 3 connections
    //
    // 2. start 8 workers, each polling every 4ms
    //
    // 3. feed the source from another task
    //
    //                          /  worker-0..2  ---  connection-0
    //   creator  --> source   -   worker-3..5  ---  connection-1
    //                          \  worker-6..7  ---  connection-2

    let pool = ProducerPool::new(config, &connector, Arc::new(source)).await?;
    pool.start()?;


    let creator = tokio::spawn(async move {
        for i in 0u64.. {
            if tx.send(Bytes::from(format!("click-{}", i))).await.is_err() {
                break
            }
            tokio::time::sleep(Duration::from_micros(400)).await;
        }
    });


    tokio::time::sleep(Duration::from_secs(3)).await;


    // Safe Shutdown, waits for every worker
    let report = pool.stop().await?;
    creator.abort();

    println!("==> Sent batches: {}", report.sent_batches);
    println!("==> Errors while sending: {}", report.send_errors);
    println!("==> Dropped at shutdown: {}", report.dropped_at_shutdown);
    println!("==> Recorded by broker: {}", connector.batches().len());

    Ok(())
}
