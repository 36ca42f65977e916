//! Minimal HTTP/1.1 stub of the Linode API for integration tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Placing shared helpers under `tests/common/` avoids creating an
//! additional integration test binary while still allowing reuse via:
//!
//! ```rust
//! #[path = "common/stub_api.rs"]
//! mod stub_api;
//! ```
//!
//! Responses are keyed by `METHOD path`. Each key serves its queued
//! responses in order and repeats the last one once the queue is down to a
//! single entry. Unknown keys answer `404`.

use std::collections::{HashMap, VecDeque};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

/// A request captured by the stub.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: String,
    /// Path including the query string.
    pub path: String,
    /// Value of the `Authorization` header, if any.
    pub authorization: Option<String>,
    /// Raw request body.
    pub body: String,
}

impl RecordedRequest {
    /// Returns `METHOD path`.
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

type Routes = HashMap<String, VecDeque<(u16, String)>>;

/// Builder for a [`StubApi`].
#[derive(Debug, Default)]
pub struct StubApiBuilder {
    routes: Routes,
}

impl StubApiBuilder {
    /// Queues a response for `METHOD path`.
    pub fn route(mut self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.routes
            .entry(format!("{method} {path}"))
            .or_default()
            .push_back((status, body.to_owned()));
        self
    }

    /// Binds to an ephemeral loopback port and starts serving.
    pub fn start(self) -> StubApi {
        let listener = TcpListener::bind("127.0.0.1:0")
            .unwrap_or_else(|err| panic!("bind stub listener: {err}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|err| panic!("stub listener addr: {err}"));
        let routes = Arc::new(Mutex::new(self.routes));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let served_routes = Arc::clone(&routes);
        let recorded = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                serve(stream, &served_routes, &recorded);
            }
        });

        StubApi { addr, requests }
    }
}

/// Handle to a running stub.
#[derive(Debug)]
pub struct StubApi {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubApi {
    /// Starts building a stub.
    pub fn builder() -> StubApiBuilder {
        StubApiBuilder::default()
    }

    /// Base URL to hand to the client under test.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `METHOD path` keys of the requests received so far.
    pub fn request_keys(&self) -> Vec<String> {
        self.requests().iter().map(RecordedRequest::key).collect()
    }
}

fn serve(stream: TcpStream, routes: &Mutex<Routes>, requests: &Mutex<Vec<RecordedRequest>>) {
    let Some(request) = read_request(&stream) else {
        return;
    };
    let (status, body) = {
        let mut table = routes.lock().unwrap_or_else(PoisonError::into_inner);
        match table.get_mut(&request.key()) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        }
        .unwrap_or_else(|| (404, String::from(r#"{"errors":[{"reason":"Not found"}]}"#)))
    };
    requests
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(request);

    let response = format!(
        "HTTP/1.1 {status} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let mut writer = stream;
    writer.write_all(response.as_bytes()).ok();
    writer.flush().ok();
}

fn read_request(stream: &TcpStream) -> Option<RecordedRequest> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_owned();
    let path = parts.next()?.to_owned();

    let mut content_length = 0_usize;
    let mut authorization = None;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let header = line.trim_end();
        if header.is_empty() {
            break;
        }
        let Some((name, value)) = header.split_once(':') else {
            continue;
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "content-length" => content_length = value.trim().parse().unwrap_or(0),
            "authorization" => authorization = Some(value.trim().to_owned()),
            _ => {}
        }
    }

    let mut body = vec![0_u8; content_length];
    reader.read_exact(&mut body).ok()?;
    Some(RecordedRequest {
        method,
        path,
        authorization,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}
