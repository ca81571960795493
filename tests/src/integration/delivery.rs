//! # Delivery Confirmation
//!
//! A 201 means "queued". These tests follow the message past the response:
//! the delivery report is matched to its in-flight entry and counted as
//! delivered or failed, shutdown flushes what is still queued, and entries
//! that never get a report are swept.

#[cfg(test)]
mod tests {
    use crate::harness::*;
    use ingest_bus::{InMemoryLog, LogConfig};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_delivery_reports_are_counted() {
        let gateway = TestGateway::start().await;

        for n in 0..5 {
            assert_eq!(gateway.post(TOKEN, format!("{{\"n\":{n}}}")).await.status, 201);
        }

        let tracker = gateway.service.tracker();
        assert!(eventually(WAIT, || tracker.snapshot().delivered == 5).await);
        assert_eq!(tracker.in_flight_count(), 0);

        let metrics = gateway.admin_json("/metrics").await;
        assert_eq!(metrics["deliveries"]["delivered"], 5);
        assert_eq!(metrics["deliveries"]["failed"], 0);
        assert_eq!(metrics["deliveries"]["bytes"], 35);

        let deliveries = gateway.admin_json("/deliveries").await;
        assert_eq!(deliveries["submitted"], 5);
        assert_eq!(deliveries["delivered"], 5);

        gateway.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_topic_counts_as_failed() {
        let config = test_config();
        // The log only knows a different topic.
        let log = InMemoryLog::start(LogConfig {
            topics: vec!["Elsewhere".into()],
            ..config.log_config()
        });
        let gateway = TestGateway::start_with(config, seeded_directory(), log.clone()).await;

        let reply = gateway.post(TOKEN, r#"{"x":1}"#).await;
        assert_eq!(reply.status, 201);

        let tracker = gateway.service.tracker();
        assert!(eventually(WAIT, || tracker.snapshot().failed == 1).await);

        let metrics = gateway.admin_json("/metrics").await;
        assert_eq!(metrics["deliveries"]["failed"], 1);
        assert_eq!(metrics["deliveries"]["delivered"], 0);

        gateway.stop().await.unwrap();
        assert_eq!(log.appended(), 0);
    }

    #[tokio::test]
    async fn test_oversized_message_counts_as_failed() {
        let mut config = test_config();
        config.bus.max_message_bytes = 16;
        let gateway = TestGateway::start_with_config(config).await;

        // Fits the request limit, exceeds the log's message limit.
        let small = gateway.post(TOKEN, r#"{"ok":1}"#).await;
        let large = gateway.post(TOKEN, r#"{"padding":"xxxxxxxxxxxxxxxx"}"#).await;
        assert_eq!(small.status, 201);
        assert_eq!(large.status, 201);

        let tracker = gateway.service.tracker();
        assert!(
            eventually(WAIT, || {
                let s = tracker.snapshot();
                s.delivered == 1 && s.failed == 1
            })
            .await
        );

        let log = gateway.log.clone();
        gateway.stop().await.unwrap();

        let records = log.topic_records(TOPIC);
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0].value[..], br#"{"ok":1}"#);
    }

    #[tokio::test]
    async fn test_shutdown_flushes_queued_messages() {
        let config = test_config();
        // Broker starts late so messages are still buffered when shutdown begins.
        let log = Arc::new(InMemoryLog::new(config.log_config()));
        let gateway = TestGateway::start_with(config, seeded_directory(), log.clone()).await;

        for n in 0..10 {
            assert_eq!(gateway.post(TOKEN, format!("[{n}]")).await.status, 201);
        }
        assert!(log.topic_records(TOPIC).is_empty());

        let service = Arc::clone(&gateway.service);
        let broker_log = log.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            broker_log.spawn_broker();
        });
        gateway.stop().await.unwrap();

        assert_eq!(log.topic_records(TOPIC).len(), 10);
        assert!(log.is_closed());
        let snapshot = service.tracker().snapshot();
        assert_eq!(snapshot.delivered, 10);
        assert_eq!(snapshot.failed, 0);
        assert_eq!(snapshot.in_flight, 0);
    }

    #[tokio::test]
    async fn test_unreported_entries_are_swept() {
        let mut config = test_config();
        config.delivery.confirm_timeout = Duration::from_millis(50);
        config.delivery.sweep_interval = Duration::from_millis(20);
        config.bus.flush_timeout = Duration::from_millis(100);
        let log = Arc::new(InMemoryLog::new(config.log_config()));
        let gateway = TestGateway::start_with(config, seeded_directory(), log.clone()).await;

        assert_eq!(gateway.post(TOKEN, "[1]").await.status, 201);

        let tracker = gateway.service.tracker();
        assert!(eventually(WAIT, || tracker.snapshot().unconfirmed == 1).await);
        assert_eq!(tracker.in_flight_count(), 0);

        let metrics = gateway.service.metrics();
        gateway.stop().await.unwrap();

        // The purge report arrives for an entry that was already swept.
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.unknown, 1);
        assert_eq!(snapshot.failed, 0);
        assert_eq!(metrics.delivery_failed.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_partitions_spread_and_offsets_increase() {
        let mut config = test_config();
        config.bus.partitions = 3;
        let gateway = TestGateway::start_with_config(config).await;

        for n in 0..9 {
            assert_eq!(gateway.post(TOKEN, format!("[{n}]")).await.status, 201);
        }

        let log = gateway.log.clone();
        gateway.stop().await.unwrap();

        for partition in 0..3 {
            let records = log.records(TOPIC, partition);
            assert_eq!(records.len(), 3);
            let offsets: Vec<u64> = records.iter().map(|r| r.offset).collect();
            assert_eq!(offsets, vec![0, 1, 2]);
        }
    }
}
