//! HTTP-level tests: spawn the server on a free port and talk to it with reqwest.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::{json, Value};
use tempfile::TempDir;

use cas_gateway::config::{load_config, Config};
use cas_gateway::sqlite_store::SqliteStore;
use cas_gateway::{db, migrate, server};
use cas_gateway_core::models::{ContentHash, NewObject, ObjectMetadata};
use cas_gateway_core::store::Store;

// ─── Helpers ────────────────────────────────────────────────────────

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

fn write_config(tmp: &TempDir, port: u16, extra: &str) -> Config {
    let root: PathBuf = tmp.path().to_path_buf();
    std::fs::create_dir_all(root.join("data")).unwrap();
    let path = root.join("casg.toml");
    std::fs::write(
        &path,
        format!(
            r#"[db]
path = "{}/data/casg.sqlite"

[storage]
max_page_size = 50

[server]
bind = "127.0.0.1:{}"
{}
"#,
            root.display(),
            port,
            extra
        ),
    )
    .unwrap();
    load_config(&path).unwrap()
}

fn object(content_type: Option<&str>, attributes: Value, payload: &[u8]) -> NewObject {
    let attributes: BTreeMap<String, Value> = serde_json::from_value(attributes).unwrap();
    NewObject {
        metadata: ObjectMetadata {
            content_type: content_type.map(String::from),
            attributes,
        },
        payload: payload.to_vec(),
    }
}

struct Seeded {
    html: ContentHash,
    raw: ContentHash,
}

async fn seed(config: &Config) -> Seeded {
    migrate::run_migrations(config).await.unwrap();
    let pool = db::connect(config).await.unwrap();
    let store = SqliteStore::new(pool.clone());

    let html = store
        .put_object(
            "default",
            &object(
                Some("text/html"),
                json!({"type": "doc", "year": 2001}),
                b"<p>hi</p>",
            ),
        )
        .await
        .unwrap();
    let raw = store
        .put_object(
            "default",
            &object(None, json!({"type": "blob", "year": 1999}), &[0, 1, 2, 255]),
        )
        .await
        .unwrap();
    store
        .put_object(
            "default",
            &object(
                Some("text/plain"),
                json!({"type": "doc", "year": 2005}),
                b"notes",
            ),
        )
        .await
        .unwrap();

    pool.close().await;
    Seeded { html, raw }
}

async fn start(extra: &str) -> (TempDir, u16, Seeded) {
    let tmp = TempDir::new().unwrap();
    let port = find_free_port();
    let config = write_config(&tmp, port, extra);
    let seeded = seed(&config).await;

    tokio::spawn(async move {
        server::run_server(&config).await.ok();
    });
    wait_for_server(port).await;
    (tmp, port, seeded)
}

fn url(port: u16, path: &str) -> String {
    format!("http://127.0.0.1:{}{}", port, path)
}

fn years(page: &Value) -> Vec<i64> {
    page["hits"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["metadata"]["attributes"]["year"].as_i64().unwrap())
        .collect()
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health() {
    let (_tmp, port, _) = start("").await;
    let body: Value = reqwest::get(url(port, "/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_fetch_returns_payload_with_stored_content_type() {
    let (_tmp, port, seeded) = start("").await;

    let resp = reqwest::get(url(port, &format!("/query/fetch/{}", seeded.html)))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "text/html");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"<p>hi</p>");
}

#[tokio::test]
async fn test_fetch_defaults_to_octet_stream() {
    let (_tmp, port, seeded) = start("").await;

    let resp = reqwest::get(url(port, &format!("/query/fetch/{}", seeded.raw)))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "application/octet-stream");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), &[0u8, 1, 2, 255]);
}

#[tokio::test]
async fn test_fetch_unknown_hash_is_404_with_hash_in_message() {
    let (_tmp, port, _) = start("").await;

    let resp = reqwest::get(url(port, "/query/fetch/Qmxxx")).await.unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");
    assert!(body["error"]["message"].as_str().unwrap().contains("Qmxxx"));
}

#[tokio::test]
async fn test_fetch_scoped_to_index() {
    let (_tmp, port, seeded) = start("").await;

    let resp = reqwest::get(url(
        port,
        &format!("/query/fetch/{}?index=default", seeded.html),
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = reqwest::get(url(
        port,
        &format!("/query/fetch/{}?index=other", seeded.html),
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_search_get_and_post_agree() {
    let (_tmp, port, _) = start("").await;
    let client = reqwest::Client::new();
    let query = json!({"eq": {"type": "doc"}});

    let post: Value = client
        .post(url(port, "/query/search?page=0&size=10&sort=year&dir=DESC"))
        .json(&query)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let get: Value = client
        .get(url(port, "/query/search"))
        .query(&[
            ("page", "0"),
            ("size", "10"),
            ("sort", "year"),
            ("dir", "DESC"),
            ("query", query.to_string().as_str()),
        ])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(post, get);
    assert_eq!(post["total_count"], 2);
    assert_eq!(years(&post), vec![2005, 2001]);
    assert_eq!(post["page"]["sort"]["field"], "year");
}

#[tokio::test]
async fn test_search_get_without_query_matches_all() {
    let (_tmp, port, _) = start("").await;

    let page: Value = reqwest::get(url(port, "/query/search"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total_count"], 3);
    assert_eq!(page["page"]["page_number"], 0);
    assert_eq!(page["page"]["page_size"], 20);
}

#[tokio::test]
async fn test_search_direction_without_sort_field_is_ignored() {
    let (_tmp, port, _) = start("").await;

    let asc: Value = reqwest::get(url(port, "/query/search?dir=ASC"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let desc: Value = reqwest::get(url(port, "/query/search?dir=DESC"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(asc, desc);
    assert!(asc["page"].get("sort").is_none());
}

#[tokio::test]
async fn test_search_paging_past_end_is_empty() {
    let (_tmp, port, _) = start("").await;

    let page: Value = reqwest::get(url(port, "/query/search?page=5&size=2"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["hits"].as_array().unwrap().len(), 0);
    assert_eq!(page["total_count"], 3);
}

#[tokio::test]
async fn test_search_malformed_query_is_400() {
    let (_tmp, port, _) = start("").await;
    let client = reqwest::Client::new();

    let resp = client
        .get(url(port, "/query/search"))
        .query(&[("query", "{not json")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    let resp = client
        .post(url(port, "/query/search"))
        .header("content-type", "application/json")
        .body(r#"{"bogus":{"a":1}}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_search_invalid_page_is_400() {
    let (_tmp, port, _) = start("").await;

    for query in ["size=0", "page=-1", "size=51", "page=abc"] {
        let resp = reqwest::get(url(port, &format!("/query/search?{}", query)))
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "{}", query);
    }
}

#[tokio::test]
async fn test_search_unknown_index_is_404() {
    let (_tmp, port, _) = start("").await;

    let resp = reqwest::get(url(port, "/query/search?index=nope"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "index_not_found");
}

#[tokio::test]
async fn test_configured_route_prefixes() {
    let (_tmp, port, seeded) = start(
        r#"fetch_path = "/cas/raw"
search_path = "/cas/find""#,
    )
    .await;

    let resp = reqwest::get(url(port, &format!("/cas/raw/{}", seeded.html)))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = reqwest::get(url(port, "/cas/find")).await.unwrap();
    assert_eq!(resp.status(), 200);

    let resp = reqwest::get(url(port, "/query/search")).await.unwrap();
    assert_eq!(resp.status(), 404);
}
