#![allow(dead_code)]
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// In-memory text service mounted on a wiremock server.
///
/// Behaves like the real API: substring search, 404 for unknown ids.
pub struct FakeTextService {
    pub server: MockServer,
    texts: Arc<Mutex<HashMap<String, String>>>,
}

fn id_from(req: &Request) -> Option<String> {
    req.url
        .path_segments()
        .and_then(|mut segments| segments.nth(1))
        .map(str::to_string)
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({ "error": "UUID does not exist" }))
}

impl FakeTextService {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let texts: Arc<Mutex<HashMap<String, String>>> = Arc::default();
        let next_id = Arc::new(AtomicU64::new(1));

        let store = Arc::clone(&texts);
        Mock::given(method("POST"))
            .and(path("/texts"))
            .respond_with(move |req: &Request| {
                let Ok(body) = req.body_json::<serde_json::Value>() else {
                    return ResponseTemplate::new(400).set_body_json(json!({ "error": "bad json" }));
                };
                let Some(data) = body["data"].as_str() else {
                    return ResponseTemplate::new(400).set_body_json(json!({ "error": "missing data" }));
                };
                let id = format!("{:032x}", next_id.fetch_add(1, Ordering::Relaxed));
                store.lock().insert(id.clone(), data.to_string());
                ResponseTemplate::new(201).set_body_json(json!({ "id": id }))
            })
            .mount(&server)
            .await;

        let store = Arc::clone(&texts);
        Mock::given(method("GET"))
            .and(path_regex(r"^/texts/[^/]+/search$"))
            .respond_with(move |req: &Request| {
                let term = req
                    .url
                    .query_pairs()
                    .find(|(k, _)| k == "term")
                    .map(|(_, v)| v.into_owned());
                let (Some(id), Some(term)) = (id_from(req), term) else {
                    return ResponseTemplate::new(400);
                };
                match store.lock().get(&id) {
                    Some(text) => ResponseTemplate::new(200)
                        .set_body_json(json!({ "found": text.contains(&term) })),
                    None => not_found(),
                }
            })
            .mount(&server)
            .await;

        let store = Arc::clone(&texts);
        Mock::given(method("GET"))
            .and(path_regex(r"^/texts/[^/]+$"))
            .respond_with(move |req: &Request| {
                match id_from(req).and_then(|id| store.lock().get(&id).cloned()) {
                    Some(text) => ResponseTemplate::new(200).set_body_json(json!({ "data": text })),
                    None => not_found(),
                }
            })
            .mount(&server)
            .await;

        let store = Arc::clone(&texts);
        Mock::given(method("DELETE"))
            .and(path_regex(r"^/texts/[^/]+$"))
            .respond_with(move |req: &Request| {
                match id_from(req).and_then(|id| store.lock().remove(&id)) {
                    Some(_) => ResponseTemplate::new(204),
                    None => not_found(),
                }
            })
            .mount(&server)
            .await;

        Self { server, texts }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn stored(&self) -> usize {
        self.texts.lock().len()
    }

    pub fn text(&self, id: &str) -> Option<String> {
        self.texts.lock().get(id).cloned()
    }
}
