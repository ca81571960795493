//! # Request Scenarios
//!
//! One request per outcome, checked over real HTTP:
//!
//! | Case                 | Status | Body                                     |
//! |----------------------|--------|------------------------------------------|
//! | accepted             | 201    | echo                                     |
//! | unknown token        | 401    | `{"error":true,"message":"Unknown Client"}` |
//! | key mismatch         | 401    | echo                                     |
//! | malformed payload    | 400    | echo                                     |
//! | buffer full          | 503    | `Retry-After: 1`                         |
//! | body over the limit  | 413    |                                          |

#[cfg(test)]
mod tests {
    use crate::harness::*;
    use ingest_bus::InMemoryLog;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_accepted_event_is_published_with_auth_header() {
        let gateway = TestGateway::start().await;

        let reply = gateway.post(TOKEN, r#"{"x":1}"#).await;
        assert_eq!(reply.status, 201);
        assert_eq!(reply.body, br#"{"x":1}"#);
        assert_eq!(reply.content_type.as_deref(), Some("application/json"));

        let log = gateway.log.clone();
        gateway.stop().await.unwrap();

        let records = log.topic_records(TOPIC);
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0].value[..], br#"{"x":1}"#);
        assert_eq!(records[0].header("AlertKey"), Some(TOKEN.as_bytes()));
    }

    #[tokio::test]
    async fn test_unknown_token_is_rejected() {
        let gateway = TestGateway::start().await;

        let reply = gateway.post("wrong", r#"{"x":1}"#).await;
        assert_eq!(reply.status, 401);
        assert_eq!(
            reply.json(),
            serde_json::json!({"error": true, "message": "Unknown Client"})
        );

        let log = gateway.log.clone();
        gateway.stop().await.unwrap();
        assert!(log.topic_records(TOPIC).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tokens_never_accepted() {
        let gateway = TestGateway::start().await;

        let near_misses = [
            "",
            "ABC123",
            "abc12",
            "abc1234",
            " abc123",
            "abc123 ",
            "abc\u{0}123",
            "abc123abc123",
            "\u{e9}bc123",
        ];
        for token in near_misses {
            let reply = gateway.post(token, r#"{"x":1}"#).await;
            assert_eq!(reply.status, 401, "token {token:?} was not refused");
        }

        let missing = gateway
            .send(reqwest::Method::POST, None, r#"{"x":1}"#)
            .await;
        assert_eq!(missing.status, 401);

        let log = gateway.log.clone();
        gateway.stop().await.unwrap();
        assert!(log.topic_records(TOPIC).is_empty());
    }

    #[tokio::test]
    async fn test_key_mismatch_echoes_body() {
        let config = test_config();
        let log = InMemoryLog::start(config.log_config());
        let gateway =
            TestGateway::start_with(config, Arc::new(MismatchedDirectory), log.clone()).await;

        let reply = gateway.post(TOKEN, r#"{"x":1}"#).await;
        assert_eq!(reply.status, 401);
        assert_eq!(reply.body, br#"{"x":1}"#);

        gateway.stop().await.unwrap();
        assert!(log.topic_records(TOPIC).is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_rejected() {
        let gateway = TestGateway::start().await;

        let reply = gateway.post(TOKEN, "not-json").await;
        assert_eq!(reply.status, 400);
        assert_eq!(reply.body, b"not-json");

        for body in ["", "{", r#"{"x":1}}"#, "[1,2,]", "{'x':1}"] {
            let reply = gateway.post(TOKEN, body).await;
            assert_eq!(reply.status, 400, "body {body:?} was accepted");
        }

        let log = gateway.log.clone();
        gateway.stop().await.unwrap();
        assert!(log.topic_records(TOPIC).is_empty());
    }

    #[tokio::test]
    async fn test_full_buffer_is_backpressure() {
        let mut config = test_config();
        config.bus.queue_capacity = 1;
        config.bus.flush_timeout = Duration::from_millis(200);
        // Broker not started: the single buffer slot stays occupied.
        let log = Arc::new(InMemoryLog::new(config.log_config()));
        let gateway = TestGateway::start_with(config, seeded_directory(), log.clone()).await;

        let first = gateway.post(TOKEN, r#"{"n":1}"#).await;
        assert_eq!(first.status, 201);

        let second = gateway.post(TOKEN, r#"{"n":2}"#).await;
        assert_eq!(second.status, 503);
        assert_eq!(second.retry_after.as_deref(), Some("1"));
        assert_eq!(
            second.json(),
            serde_json::json!({"error": true, "message": "Event Queue Full"})
        );

        let metrics = gateway.admin_json("/metrics").await;
        assert_eq!(metrics["requests"]["accepted"], 1);
        assert_eq!(metrics["requests"]["backpressure"], 1);

        let service = Arc::clone(&gateway.service);
        gateway.stop().await.unwrap();

        // The queued message was purged on close, never silently dropped.
        assert!(log.topic_records(TOPIC).is_empty());
        let snapshot = service.tracker().snapshot();
        assert_eq!(snapshot.submitted, 1);
        assert_eq!(snapshot.cancelled, 1);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.in_flight, 0);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let mut config = test_config();
        config.limits.max_request_size = 32;
        let gateway = TestGateway::start_with_config(config).await;

        let body = format!(r#"{{"padding":"{}"}}"#, "x".repeat(64));
        let reply = gateway.post(TOKEN, body).await;
        assert_eq!(reply.status, 413);

        let log = gateway.log.clone();
        gateway.stop().await.unwrap();
        assert!(log.topic_records(TOPIC).is_empty());
    }

    #[tokio::test]
    async fn test_payload_bytes_published_verbatim() {
        let gateway = TestGateway::start().await;

        let body = "{ \"msg\" : \"caf\u{e9}\\u00e9\",\n  \"n\":[1, 2.50, -0] }\n";
        let reply = gateway.post(TOKEN, body).await;
        assert_eq!(reply.status, 201);
        assert_eq!(reply.body, body.as_bytes());

        let log = gateway.log.clone();
        gateway.stop().await.unwrap();

        let records = log.topic_records(TOPIC);
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0].value[..], body.as_bytes());
    }

    #[tokio::test]
    async fn test_any_method_is_accepted() {
        let gateway = TestGateway::start().await;

        for method in [
            reqwest::Method::POST,
            reqwest::Method::PUT,
            reqwest::Method::PATCH,
            reqwest::Method::GET,
        ] {
            let reply = gateway.send(method.clone(), Some(TOKEN), "[]").await;
            assert_eq!(reply.status, 201, "{method} was not accepted");
        }

        let log = gateway.log.clone();
        gateway.stop().await.unwrap();
        assert_eq!(log.topic_records(TOPIC).len(), 4);
    }

    #[tokio::test]
    async fn test_identical_requests_are_not_deduplicated() {
        let gateway = TestGateway::start().await;

        for _ in 0..3 {
            assert_eq!(gateway.post(TOKEN, r#"{"same":true}"#).await.status, 201);
        }

        let log = gateway.log.clone();
        gateway.stop().await.unwrap();

        let records = log.topic_records(TOPIC);
        assert_eq!(records.len(), 3);
        let ids: HashSet<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), 3);
        assert!(records.iter().all(|r| &r.value[..] == br#"{"same":true}"#));
    }
}
