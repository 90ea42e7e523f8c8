#![forbid(unsafe_code)]

use serde_json::Value;
use st_core::Timestamp;
use st_core::contracts::{
    ImprovementRecommendation, OutcomeRecord, PersonaUpgradePatch, TerminalOutcome,
};
use st_storage::ContractStore;
use st_viewer::{ApiState, SourcePaths, serve};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

struct Server {
    addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl Server {
    fn start(paths: SourcePaths) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = std::thread::spawn(move || {
            serve(listener, ApiState::new(paths), flag).expect("serve");
        });
        Self {
            addr,
            shutdown,
            handle: Some(handle),
        }
    }

    fn request(&self, method: &str, path: &str, extra_headers: &str) -> Response {
        let mut stream = TcpStream::connect(self.addr).expect("connect");
        let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
        write!(
            stream,
            "{method} {path} HTTP/1.1\r\nHost: 127.0.0.1\r\n{extra_headers}Connection: close\r\n\r\n"
        )
        .expect("write request");
        stream.flush().expect("flush request");

        let mut reader = BufReader::new(stream);
        let mut status_line = String::new();
        reader.read_line(&mut status_line).expect("read status line");
        let status = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse().ok())
            .unwrap_or(0);

        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            let read = reader.read_line(&mut line).expect("read header");
            if read == 0 {
                break;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }
            if let Some((key, value)) = trimmed.split_once(':') {
                headers.push((key.trim().to_string(), value.trim().to_string()));
            }
        }
        let mut body = Vec::new();
        reader.read_to_end(&mut body).expect("read body");
        Response {
            status,
            headers,
            body,
        }
    }

    fn get(&self, path: &str) -> Response {
        self.request("GET", path, "")
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("st_viewer_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn paths(base: &Path) -> SourcePaths {
    SourcePaths {
        data_dir: base.join("data"),
        personas_dir: base.join("personas"),
        ideas_db: base.join("caught_ideas.db"),
    }
}

fn seed_contracts(data_dir: &Path) {
    let store = ContractStore::open(data_dir).expect("open store");
    let now = Timestamp::now().as_offset().unix_timestamp();
    let at = |secs_ago: i64| Timestamp::from_unix_seconds(now - secs_ago);

    store
        .append_outcome(&OutcomeRecord::new(42, "Kite", TerminalOutcome::Published, at(300)))
        .expect("outcome");
    let mut rec = ImprovementRecommendation::new("rec-1", "voice", "Sharpen voice", at(200));
    rec.status = "applied".to_string();
    store.append_recommendation(&rec).expect("recommendation");
    let mut patch = PersonaUpgradePatch::new("p-1", "ada", at(100));
    patch.status = "applied".to_string();
    patch.source_recommendation_ids = vec!["rec-1".to_string()];
    store.append_patch(&patch).expect("patch");
}

fn seed_persona(personas_dir: &Path) {
    let dir = personas_dir.join("ada");
    std::fs::create_dir_all(&dir).expect("persona dir");
    std::fs::write(
        dir.join("persona.yaml"),
        "identity:\n  name: Ada\n  role: Analyst\nframeworks:\n  engines: {}\n",
    )
    .expect("persona yaml");
}

fn seed_ideas(db: &Path) {
    let conn = rusqlite::Connection::open(db).expect("open db");
    conn.execute_batch(
        "CREATE TABLE caught_ideas (
            id INTEGER PRIMARY KEY, title TEXT, raw_content TEXT, tags TEXT,
            source_context TEXT, caught_at TEXT, status TEXT
        );
        INSERT INTO caught_ideas VALUES (42, 'Kite', 'raw', '[]', NULL, '2024-05-01T09:00:00', 'done');",
    )
    .expect("seed ideas");
}

#[test]
fn ecosystem_activity_and_nodes_over_http() {
    let base = temp_dir("ecosystem");
    let paths = paths(&base);
    seed_contracts(&paths.data_dir);
    let server = Server::start(paths);

    let eco = server.get("/api/v1/ecosystem");
    assert_eq!(eco.status, 200);
    let snapshot = eco.json();
    assert_eq!(snapshot["cycle_count"], 1);
    assert_eq!(snapshot["loop_health"], "partial");
    assert_eq!(snapshot["nodes"].as_array().map(Vec::len), Some(3));
    assert_eq!(snapshot["nodes"][0]["health_status"], "healthy");
    assert!(eco.header("ETag").is_some());

    let activity = server.get("/api/v1/activity?limit=2").json();
    let kinds: Vec<_> = activity
        .as_array()
        .expect("array")
        .iter()
        .map(|e| e["event_type"].as_str().unwrap_or("").to_string())
        .collect();
    assert_eq!(kinds, vec!["patch", "recommendation"]);
    assert_eq!(activity[0]["title"], "Patch for ada");
    assert_eq!(activity[0]["detail"]["persona_id"], "ada");

    let node = server.get("/api/v1/nodes/ultra_magnus").json();
    assert_eq!(node["recent_records"][0]["id"], "42");
    assert_eq!(node["metrics"]["breakdown"]["published"], 1);

    let missing = server.get("/api/v1/nodes/research");
    assert_eq!(missing.status, 404);
    assert_eq!(missing.json()["error"]["code"], "UNKNOWN_NODE");
}

#[test]
fn invalid_limits_and_methods_are_rejected() {
    let base = temp_dir("rejections");
    let server = Server::start(paths(&base));

    let bad = server.get("/api/v1/activity?limit=500");
    assert_eq!(bad.status, 400);
    assert_eq!(bad.json()["error"]["code"], "INVALID_LIMIT");

    let post = server.request("POST", "/api/v1/ecosystem", "");
    assert_eq!(post.status, 405);
    assert!(post.json()["error"]["recovery"].is_string());

    assert_eq!(server.get("/api/v1/unknown").status, 404);
    assert_eq!(server.get("/api/v1/pipeline/ideas/abc").status, 400);
}

#[test]
fn head_and_conditional_requests() {
    let base = temp_dir("conditional");
    let paths = paths(&base);
    seed_contracts(&paths.data_dir);
    let server = Server::start(paths);

    let head = server.request("HEAD", "/api/v1/agents", "");
    assert_eq!(head.status, 200);
    assert!(head.body.is_empty());
    let tag = head.header("ETag").expect("etag").to_string();

    let full = server.get("/api/v1/agents");
    assert_eq!(full.header("Content-Length"), head.header("Content-Length"));

    let cached = server.request("GET", "/api/v1/agents", &format!("If-None-Match: {tag}\r\n"));
    assert_eq!(cached.status, 304);
    assert!(cached.body.is_empty());
}

#[test]
fn health_agents_and_pipeline() {
    let base = temp_dir("sources");
    let paths = paths(&base);
    seed_persona(&paths.personas_dir);
    let ideas_db = paths.ideas_db.clone();
    let server = Server::start(paths);

    let health = server.get("/api/v1/health").json();
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["sources"]["contract_store"], "ok");
    assert_eq!(health["sources"]["academy"], "ok (1 personas)");
    assert_eq!(health["sources"]["ultra_magnus"], "unavailable (db not found)");
    assert_eq!(server.get("/api/v1/pipeline/ideas").json(), Value::Array(Vec::new()));

    seed_ideas(&ideas_db);
    let health = server.get("/api/v1/health").json();
    assert_eq!(health["status"], "ok");

    let agents = server.get("/api/v1/agents").json();
    assert_eq!(agents[0]["id"], "ada");
    assert_eq!(agents[0]["framework_count"], 1);
    assert_eq!(server.get("/api/v1/agents/ada").json()["name"], "Ada");
    assert_eq!(server.get("/api/v1/agents/nobody").status, 404);

    let ideas = server.get("/api/v1/pipeline/ideas?limit=5").json();
    assert_eq!(ideas[0]["stage"], "captured");
    let idea = server.get("/api/v1/pipeline/ideas/42").json();
    assert_eq!(idea["raw_content"], "raw");
    assert_eq!(server.get("/api/v1/pipeline/ideas/7").status, 404);
    assert_eq!(server.get("/api/v1/pipeline/stages").json()["captured"], 1);
}
