//! End-to-end walk through one record's lifecycle against a scripted server.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use textstore_loadgen::selection::SearchProbe;
use textstore_loadgen::{Corpus, HttpTextStore, Outcome, WorkloadDriver};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WINE: &str = "A fine red wine with notes of cherry";

async fn scripted_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/texts"))
        .and(body_json(json!({ "data": WINE })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "abc123" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/texts/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": WINE })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/texts/abc123/search"))
        .and(query_param("term", "cherry"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "found": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/texts/abc123/search"))
        .and(query_param("term", "zzzzzzzz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "found": false })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/texts/abc123"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_record_lifecycle() {
    let server = scripted_server().await;
    let store = HttpTextStore::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let corpus = Arc::new(Corpus::from_lines([WINE]).unwrap());
    let mut driver = WorkloadDriver::new(0, Arc::new(store), corpus, StdRng::seed_from_u64(1));

    let created = driver.create().await.unwrap();
    assert_eq!(created.id, "abc123");
    assert_eq!(driver.cache().get("abc123"), Some(WINE));

    let read = driver.read().await.unwrap().completed().unwrap();
    assert_eq!(read.text, WINE);

    let hit = driver
        .search_with("abc123", &SearchProbe::present("cherry"))
        .await
        .unwrap()
        .completed()
        .unwrap();
    assert!(hit.found);

    let miss = driver
        .search_with("abc123", &SearchProbe::absent("zzzzzzzz"))
        .await
        .unwrap()
        .completed()
        .unwrap();
    assert!(!miss.found);

    assert_eq!(
        driver.delete().await.unwrap(),
        Outcome::Completed("abc123".to_string())
    );
    assert!(!driver.cache().contains("abc123"));

    // deleted ids are never requested again
    assert!(driver.read().await.unwrap().is_skipped());
    assert!(driver.search().await.unwrap().is_skipped());
    assert!(driver.delete().await.unwrap().is_skipped());
}
