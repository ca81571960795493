//! Parallel submissions: every accepted request publishes exactly its own payload.

#[cfg(test)]
mod tests {
    use crate::harness::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tokio::task::JoinSet;

    const REQUESTS: usize = 64;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_publish_each_payload_once() {
        let gateway = Arc::new(TestGateway::start().await);

        let mut requests = JoinSet::new();
        for seq in 0..REQUESTS {
            let gateway = Arc::clone(&gateway);
            requests.spawn(async move {
                let body = format!(r#"{{"seq":{seq}}}"#);
                let reply = gateway.post(TOKEN, body.clone()).await;
                (reply, body)
            });
        }

        while let Some(joined) = requests.join_next().await {
            let (reply, body) = joined.unwrap();
            assert_eq!(reply.status, 201);
            assert_eq!(reply.body, body.as_bytes());
        }

        let gateway = Arc::into_inner(gateway).expect("all request tasks finished");
        let log = gateway.log.clone();
        let service = Arc::clone(&gateway.service);
        gateway.stop().await.unwrap();

        let published: HashSet<String> = log
            .topic_records(TOPIC)
            .iter()
            .map(|r| String::from_utf8(r.value.to_vec()).unwrap())
            .collect();
        let expected: HashSet<String> = (0..REQUESTS)
            .map(|seq| format!(r#"{{"seq":{seq}}}"#))
            .collect();
        assert_eq!(log.topic_records(TOPIC).len(), REQUESTS);
        assert_eq!(published, expected);

        let snapshot = service.tracker().snapshot();
        assert_eq!(snapshot.delivered, REQUESTS as u64);
        assert_eq!(snapshot.in_flight, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mixed_outcomes() {
        let gateway = Arc::new(TestGateway::start().await);

        let mut requests = JoinSet::new();
        for seq in 0..REQUESTS {
            let gateway = Arc::clone(&gateway);
            requests.spawn(async move {
                match seq % 3 {
                    0 => (gateway.post(TOKEN, format!("[{seq}]")).await.status, 201),
                    1 => (gateway.post("intruder", format!("[{seq}]")).await.status, 401),
                    _ => (gateway.post(TOKEN, format!("[{seq}")).await.status, 400),
                }
            });
        }

        while let Some(joined) = requests.join_next().await {
            let (actual, expected) = joined.unwrap();
            assert_eq!(actual, expected);
        }

        let accepted = (0..REQUESTS).filter(|seq| seq % 3 == 0).count();
        let metrics = gateway.admin_json("/metrics").await;
        assert_eq!(metrics["requests"]["total"], REQUESTS as u64);
        assert_eq!(metrics["requests"]["accepted"], accepted as u64);

        let gateway = Arc::into_inner(gateway).expect("all request tasks finished");
        let log = gateway.log.clone();
        gateway.stop().await.unwrap();
        assert_eq!(log.topic_records(TOPIC).len(), accepted);
    }
}
