mod common;

use common::spawn_endpoint;
use hookshaper_client::Deliverer;
use hookshaper_config::delivery::DeliveryConfig;
use serde_json::json;

#[tokio::test]
async fn test_single_payload_delivered() {
    let (endpoint, mut rx) = spawn_endpoint("202 Accepted", "").await;
    let deliverer = Deliverer::new(&DeliveryConfig::default()).unwrap();

    let report = deliverer
        .deliver(&json!({"email": "a@x.com"}), &endpoint, None)
        .await;

    assert!(report.success);
    assert_eq!(report.status, Some(202));
    assert_eq!(report.status_text, "202 Accepted");
    assert_eq!(report.index, None);

    let captured = rx.recv().await.unwrap();
    assert!(captured.head.starts_with("POST / HTTP/1.1"));
    assert!(
        captured
            .head
            .to_lowercase()
            .contains("user-agent: bloomreach-test-client/1.0")
    );
    assert_eq!(captured.body, json!({"email": "a@x.com"}));
}

#[tokio::test]
async fn test_rejection_is_reported_not_raised() {
    let (endpoint, _rx) = spawn_endpoint("500 Internal Server Error", "").await;
    let deliverer = Deliverer::new(&DeliveryConfig::default()).unwrap();

    let report = deliverer.deliver(&json!({}), &endpoint, None).await;
    assert!(!report.success);
    assert_eq!(report.status, Some(500));
}

#[tokio::test]
async fn test_rows_delivered_in_order() {
    let (endpoint, mut rx) = spawn_endpoint("200 OK", "").await;
    let deliverer = Deliverer::new(&DeliveryConfig::default()).unwrap();
    let rows = vec![json!({"row": 0}), json!({"row": 1}), json!({"row": 2})];

    let reports = deliverer.deliver_all(&rows, &endpoint).await;

    assert_eq!(reports.len(), 3);
    for (i, report) in reports.iter().enumerate() {
        assert_eq!(report.index, Some(i));
        assert!(report.success);
        assert_eq!(rx.recv().await.unwrap().body, json!({"row": i}));
    }
}

#[tokio::test]
async fn test_unreachable_endpoint_reports_every_item() {
    let deliverer = Deliverer::new(&DeliveryConfig::default()).unwrap();
    let endpoint = url::Url::parse("http://127.0.0.1:1/webhook").unwrap();

    let reports = deliverer
        .deliver_all(&[json!({"a": 1}), json!({"a": 2})], &endpoint)
        .await;

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| !r.success && r.status.is_none()));
    assert!(reports[0].status_text.starts_with("Network error"));
}

#[tokio::test]
async fn test_connection_check_payload() {
    let (endpoint, mut rx) = spawn_endpoint("200 OK", "").await;
    let deliverer = Deliverer::new(&DeliveryConfig::default()).unwrap();

    let report = deliverer.test_connection(&endpoint).await;
    assert!(report.success);

    let captured = rx.recv().await.unwrap();
    assert_eq!(captured.body["test"], json!(true));
    assert!(captured.body["timestamp"].is_string());
}
