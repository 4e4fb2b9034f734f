//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves canned responses per path (file bodies and unlock-service JSON)
//! and counts the requests each path received.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    /// Wait before answering (simulates a slow hoster).
    pub delay: Duration,
}

impl StubResponse {
    pub fn file(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: "application/octet-stream",
            body,
            delay: Duration::ZERO,
        }
    }

    pub fn json(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: body.as_bytes().to_vec(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: b"error".to_vec(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Default)]
struct Shared {
    routes: HashMap<String, StubResponse>,
    /// (path, body substring, response), checked before `routes`.
    body_routes: Vec<(String, String, StubResponse)>,
    hits: HashMap<String, usize>,
    bodies: Vec<(String, String)>,
}

/// Handle to a running stub server. The server runs until the process exits.
#[derive(Debug, Clone)]
pub struct StubServer {
    base: String,
    shared: Arc<Mutex<Shared>>,
}

impl StubServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let shared = Arc::new(Mutex::new(Shared::default()));
        let accept_shared = Arc::clone(&shared);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let shared = Arc::clone(&accept_shared);
                thread::spawn(move || handle(stream, &shared));
            }
        });
        Self {
            base: format!("http://127.0.0.1:{}", port),
            shared,
        }
    }

    /// Absolute URL for `path` (which must start with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn route(&self, path: &str, response: StubResponse) {
        self.shared
            .lock()
            .unwrap()
            .routes
            .insert(path.to_string(), response);
    }

    /// Answers requests on `path` whose body contains `needle` with `response`.
    pub fn route_body(&self, path: &str, needle: &str, response: StubResponse) {
        self.shared.lock().unwrap().body_routes.push((
            path.to_string(),
            needle.to_string(),
            response,
        ));
    }

    pub fn hits(&self, path: &str) -> usize {
        self.shared.lock().unwrap().hits.get(path).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.shared.lock().unwrap().hits.values().sum()
    }

    /// Request bodies received on `path`, in arrival order.
    pub fn bodies(&self, path: &str) -> Vec<String> {
        self.shared
            .lock()
            .unwrap()
            .bodies
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, b)| b.clone())
            .collect()
    }
}

fn handle(mut stream: TcpStream, shared: &Mutex<Shared>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));

    let Some((path, body)) = read_request(&mut stream) else {
        return;
    };
    let response = {
        let mut sh = shared.lock().unwrap();
        *sh.hits.entry(path.clone()).or_insert(0) += 1;
        let by_body = sh
            .body_routes
            .iter()
            .find(|(p, needle, _)| *p == path && body.contains(needle.as_str()))
            .map(|(_, _, r)| r.clone());
        sh.bodies.push((path.clone(), body));
        by_body.or_else(|| sh.routes.get(&path).cloned())
    };
    let response = response.unwrap_or_else(|| StubResponse::status(404));
    if !response.delay.is_zero() {
        thread::sleep(response.delay);
    }

    let head = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        response.content_type,
        response.body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&response.body);
    let _ = stream.flush();
}

/// Returns the request path (without query) and the request body.
fn read_request(stream: &mut TcpStream) -> Option<(String, String)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.lines();
    let target = lines.next()?.split_whitespace().nth(1)?.to_string();
    let path = target.split('?').next().unwrap_or("/").to_string();
    let content_length = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..end]).into_owned();
    Some((path, body))
}
