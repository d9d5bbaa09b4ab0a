use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use tokio_pace::{
    builtin::memory::{MemoryConnection, MemoryConnector},
    BrokerConnectionPool,
    ChannelSource,
    Connector,
    MessageSource,
    ProducerConfig,
    ProducerError,
    ProducerPool,
    QueueSource
};



fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn config(workers: usize, batch_size: usize) -> ProducerConfig {
    ProducerConfig::new("events")
        .with_workers(workers)
        .with_batch_size(batch_size)
        // 1ms tick per worker
        .with_message_rate(1000 * workers as u64)
        .with_brokers(vec!["memory:9092"])
}

fn payloads(items: &[&'static str]) -> QueueSource {
    items.iter().copied().map(|p| Bytes::from_static(p.as_bytes())).collect()
}



#[tokio::test(start_paused = true)]
async fn single_worker_sends_full_batches_in_order() {
    init_tracing();

    let connector = MemoryConnector::new();
    let source = Arc::new(payloads(&["A", "B", "C", "D", "E", "F"]));

    let pool = ProducerPool::new(config(1, 3), &connector, source.clone()).await.unwrap();
    pool.start().unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    let report = pool.stop().await.unwrap();

    let batches = connector.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].payloads, vec!["A", "B", "C"]);
    assert_eq!(batches[1].payloads, vec!["D", "E", "F"]);

    assert_eq!(report.sent_batches, 2);
    assert_eq!(report.send_errors, 0);
    assert_eq!(report.messages_sent, 6);
    assert_eq!(report.dropped_at_shutdown, 0);
    assert!(source.is_empty());
}


#[tokio::test(start_paused = true)]
async fn first_failed_send_is_not_retried() {
    let connector = MemoryConnector::new().fail_first_sends(1);
    let source = Arc::new(payloads(&["A", "B", "C", "D", "E", "F", "G", "H", "I"]));

    let pool = ProducerPool::new(config(1, 3), &connector, source).await.unwrap();
    pool.start().unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    let report = pool.stop().await.unwrap();

    assert_eq!(report.send_errors, 1);
    assert_eq!(report.sent_batches, 2);
    assert_eq!(connector.send_calls(), 3);

    let sent: Vec<_> = connector.batches().into_iter().flat_map(|b| b.payloads).collect();
    assert_eq!(sent, vec!["D", "E", "F", "G", "H", "I"]);
}


#[tokio::test(start_paused = true)]
async fn empty_source_never_flushes() {
    let connector = MemoryConnector::new();
    let pool = ProducerPool::new(config(3, 1), &connector, Arc::new(QueueSource::new())).await.unwrap();

    pool.start().unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    let report = pool.stop().await.unwrap();

    assert_eq!(connector.send_calls(), 0);
    assert_eq!(report.sent_batches, 0);
    assert_eq!(report.send_errors, 0);
    assert!(report.empty_polls >= 3 * 1000);
}


#[tokio::test(start_paused = true)]
async fn partial_batches_are_dropped_and_counted() {
    let connector = MemoryConnector::new();
    let source = Arc::new(payloads(&["A", "B", "C", "D"]));

    let pool = ProducerPool::new(config(1, 3), &connector, source).await.unwrap();
    pool.start().unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    let report = pool.stop().await.unwrap();

    assert_eq!(report.sent_batches, 1);
    assert_eq!(report.dropped_at_shutdown, 1);
    assert_eq!(connector.batches().len(), 1);
}


#[tokio::test(start_paused = true)]
async fn stop_waits_for_every_worker() {
    let connector = MemoryConnector::new().with_send_delay(Duration::from_millis(7));
    let source = Arc::new(QueueSource::new());
    for i in 0..200 {
        source.push(format!("m-{}", i));
    }

    let pool = ProducerPool::new(config(6, 2).with_workers_per_connection(4), &connector, source)
        .await
        .unwrap();

    assert_eq!(pool.live_workers(), 0);
    pool.start().unwrap();
    assert_eq!(pool.live_workers(), 6);

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(pool.live_workers(), 6);

    let report = pool.stop().await.unwrap();

    assert_eq!(pool.live_workers(), 0);
    assert_eq!(connector.opened(), 2);
    assert_eq!(connector.closed(), 2);
    assert!(report.sent_batches > 0);
}


#[tokio::test(start_paused = true)]
async fn shared_connection_serializes_sends() {
    let connector = MemoryConnector::new().with_send_delay(Duration::from_millis(3));
    let source = Arc::new(QueueSource::new());
    for i in 0..100 {
        source.push(format!("m-{}", i));
    }

    // 4 workers, one connection
    let pool = ProducerPool::new(config(4, 1).with_workers_per_connection(4), &connector, source)
        .await
        .unwrap();

    assert_eq!(pool.connections().len(), 1);

    pool.start().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let report = pool.stop().await.unwrap();

    assert!(report.sent_batches > 1);
    assert_eq!(connector.max_in_flight(), 1);
    assert!(connector.batches().iter().all(|b| b.connection == 0));
}


#[tokio::test(start_paused = true)]
async fn workers_share_connections_in_blocks() {
    let connector = MemoryConnector::new();

    let cfg = config(12, 1).with_workers_per_connection(5);
    let pool = ProducerPool::new(cfg, &connector, Arc::new(QueueSource::new())).await.unwrap();

    assert_eq!(pool.plan().connection_count, 3);
    assert_eq!(connector.opened(), 3);

    let table = pool.connections().assignments(12);
    assert_eq!(table[&2], vec![10, 11]);

    pool.stop().await.unwrap();
}


#[tokio::test]
async fn lifecycle_is_guarded() {
    let connector = MemoryConnector::new();
    let pool = ProducerPool::new(config(2, 1), &connector, Arc::new(QueueSource::new())).await.unwrap();

    pool.start().unwrap();
    assert!(matches!(pool.start(), Err(ProducerError::AlreadyStarted)));

    pool.stop().await.unwrap();
    assert!(matches!(pool.stop().await, Err(ProducerError::AlreadyStopped)));
    assert!(matches!(pool.start(), Err(ProducerError::AlreadyStopped)));

    assert_eq!(connector.closed(), 1);
}


#[tokio::test]
async fn stop_before_start_closes_connections() {
    let connector = MemoryConnector::new();
    let pool = ProducerPool::new(config(2, 1), &connector, Arc::new(QueueSource::new())).await.unwrap();

    let report = pool.stop().await.unwrap();

    assert_eq!(report, Default::default());
    assert_eq!(connector.closed(), 1);
}


#[tokio::test]
async fn invalid_config_opens_nothing() {
    let connector = MemoryConnector::new();

    let res = ProducerPool::new(config(2, 1).with_message_rate(0), &connector, Arc::new(QueueSource::new())).await;

    assert!(matches!(res, Err(ProducerError::Configuration(_))));
    assert_eq!(connector.opened(), 0);
}


#[tokio::test]
async fn connection_failure_aborts_construction() {
    let connector = MemoryConnector::new().fail_open_at(1);

    let cfg = config(10, 1).with_workers_per_connection(2);
    let res = ProducerPool::new(cfg, &connector, Arc::new(QueueSource::new())).await;

    assert!(matches!(res, Err(ProducerError::Connection { index: 1, .. })));
    assert_eq!(connector.opened(), 1);
    assert_eq!(connector.closed(), 1);
}


#[tokio::test(start_paused = true)]
async fn channel_source_feeds_workers() {
    let connector = MemoryConnector::new();
    let (tx, source) = ChannelSource::bounded(64);

    let pool = ProducerPool::new(config(2, 4), &connector, Arc::new(source)).await.unwrap();
    pool.start().unwrap();

    for i in 0..16 {
        tx.send(Bytes::from(format!("c-{}", i))).await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    let report = pool.stop().await.unwrap();

    assert_eq!(report.messages_sent + report.dropped_at_shutdown, 16);
    assert!(report.sent_batches >= 3);
    assert!(connector.batches().iter().all(|b| b.payloads.len() == 4));
}


async fn open_connections(connector: &MemoryConnector, n: usize) -> Vec<MemoryConnection> {
    let mut conns = Vec::with_capacity(n);
    for index in 0..n {
        conns.push(connector.open(&[], index).await.unwrap());
    }
    conns
}


#[tokio::test]
async fn with_connections_rejects_mismatched_pool() {
    let connector = MemoryConnector::new();

    // 12 workers, 5 per connection -> 3 connections
    let cfg = config(12, 1).with_workers_per_connection(5);

    let too_few = BrokerConnectionPool::from_connections(open_connections(&connector, 2).await, 5).unwrap();
    let res = ProducerPool::with_connections(cfg.clone(), too_few, Arc::new(QueueSource::new()));
    assert!(matches!(res, Err(ProducerError::Configuration(_))));

    let other_ratio = BrokerConnectionPool::from_connections(open_connections(&connector, 3).await, 4).unwrap();
    let res = ProducerPool::with_connections(cfg.clone(), other_ratio, Arc::new(QueueSource::new()));
    assert!(matches!(res, Err(ProducerError::Configuration(_))));

    let matching = BrokerConnectionPool::from_connections(open_connections(&connector, 3).await, 5).unwrap();
    let pool = ProducerPool::with_connections(cfg, matching, Arc::new(QueueSource::new())).unwrap();
    assert_eq!(pool.connections().assign(11).index(), 2);
}


struct FailingSource;

impl MessageSource for FailingSource {
    fn try_take(&self) -> Option<Bytes> {
        panic!("source backend gone")
    }
}


#[tokio::test(start_paused = true)]
async fn dead_workers_show_up_in_report() {
    let connector = MemoryConnector::new();
    let pool = ProducerPool::new(config(2, 1), &connector, Arc::new(FailingSource)).await.unwrap();

    pool.start().unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(pool.live_workers(), 0);

    let report = pool.stop().await.unwrap();
    assert_eq!(report.worker_panics, 2);
    assert_eq!(report.sent_batches, 0);
    assert_eq!(connector.closed(), 1);
}
