use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use server::{build_app, ServerConfig};
use std::fs;
use tempfile::tempdir;
use tower::ServiceExt;
use vecspace_core::normalizer::Normalizer;
use vecspace_core::persist::{save_index, IndexPaths};
use vecspace_core::pipeline::{build_from_str, PipelineOptions};

const CORPUS: &str = "\
cranfield 1 <TEXT>the cat sat</TEXT>
cranfield 2 <TEXT>the cat ate</TEXT>
cranfield 3 <TEXT>dogs bark</TEXT>
";

fn build_tiny_index(dir: &std::path::Path) -> ServerConfig {
    let stopwords = dir.join("stopwords.txt");
    fs::write(&stopwords, "the\n").unwrap();
    let normalizer = Normalizer::english(vecspace_core::normalizer::StopWords::load(&stopwords).unwrap());

    let (sealed, _) = build_from_str(CORPUS, &normalizer, &PipelineOptions { shards: 2, strict: true }).unwrap();
    let weighted = sealed.weigh().unwrap();
    let index_dir = dir.join("index");
    save_index(&IndexPaths::new(&index_dir), &sealed, &weighted).unwrap();
    ServerConfig { index_dir, stopwords: Some(stopwords), query_timeout: None }
}

async fn call(app: Router, uri: &str) -> (StatusCode, Bytes) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    let app = build_app(build_tiny_index(dir.path())).unwrap();

    let (status, body) = call(app, "/search?q=cat&k=5").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_hits"].as_u64(), Some(2));
    let arr = json["results"].as_array().unwrap();
    let ids: Vec<u64> = arr.iter().map(|r| r["doc_id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(arr[0]["score"], arr[1]["score"]);
}

#[tokio::test]
async fn search_respects_k_and_empty_queries() {
    let dir = tempdir().unwrap();
    let app = build_app(build_tiny_index(dir.path())).unwrap();

    let (_, body) = call(app.clone(), "/search?q=cat%20bark&k=1").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["results"].as_array().unwrap().len(), 1);
    assert_eq!(json["total_hits"].as_u64(), Some(3));

    let (status, body) = call(app, "/search?q=the%20zebra").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn doc_endpoint_exposes_term_weights() {
    let dir = tempdir().unwrap();
    let app = build_app(build_tiny_index(dir.path())).unwrap();

    let (status, body) = call(app.clone(), "/doc/3").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let weights = json["weights"].as_object().unwrap();
    assert_eq!(weights.keys().collect::<Vec<_>>(), vec!["bark", "dog"]);
    assert!(json["length"].as_f64().unwrap() > 0.0);

    let (status, _) = call(app, "/doc/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
