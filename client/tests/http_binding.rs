/*
 * http_binding.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Integration tests for the safe binding. A minimal canned-response HTTP/1.1
 * server runs on a loopback listener; every scenario drives the full chain
 * (builder -> client -> request -> response) through the C boundary.
 *
 * Run with:
 *   cargo test -p granchio_client --test http_binding -- --nocapture
 */

use granchio_client::{Client, ClientBuilder, ErrorKind, HeaderMap};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct TestServer {
    addr: SocketAddr,
    requests: mpsc::Receiver<String>,
    handle: thread::JoinHandle<()>,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Serve one canned response per accepted connection, capturing each raw
/// request. The thread exits after the last response.
fn serve(responses: Vec<String>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        for response in responses {
            let (mut stream, _) = match listener.accept() {
                Ok(s) => s,
                Err(_) => return,
            };
            let request = read_request(&mut stream);
            let _ = tx.send(request);
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    });
    TestServer {
        addr,
        requests: rx,
        handle,
    }
}

/// Read one full request: headers, then a content-length body if declared.
fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(_) => break,
        };
        buf.extend_from_slice(&chunk[..n]);
        if let Some(header_end) = find_header_end(&buf) {
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
            let body_len = content_length(&headers);
            if buf.len() - header_end >= body_len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

fn content_length(headers: &str) -> usize {
    headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

fn ok_response(content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn build_client() -> Client {
    let mut builder = ClientBuilder::new();
    builder.timeout(Some(Duration::from_millis(2000)));
    builder.build().unwrap()
}

#[test]
fn get_round_trips_status_headers_and_body() {
    let server = serve(vec![ok_response("text/plain", "hello granchio")]);
    let mut builder = ClientBuilder::new();
    builder.timeout(Some(Duration::from_millis(1000)));
    let client = builder.build().unwrap();

    let mut rb = client.get(&server.url("/status/200"));
    rb.header("x-round-trip", "1");
    let response = rb.send().unwrap();

    assert_eq!(response.status(), 200);
    let headers = response.headers().unwrap();
    assert!(!headers.is_empty());
    assert!(headers
        .keys()
        .iter()
        .any(|k| k.eq_ignore_ascii_case("content-type")));
    assert_eq!(headers.get("Content-Type").as_deref(), Some("text/plain"));
    assert_eq!(response.content_length(), Some(14));
    assert_eq!(response.text().unwrap(), "hello granchio");

    // The configured header reached the wire.
    let request = server.requests.recv().unwrap();
    assert!(request.starts_with("GET /status/200"));
    assert!(request.to_lowercase().contains("x-round-trip: 1"));
    server.handle.join().unwrap();
}

#[test]
fn unreachable_host_reports_connection_kind() {
    // Bind then drop to obtain a port with nothing listening.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = build_client();
    let err = client
        .get(&format!("http://127.0.0.1:{port}/"))
        .send()
        .unwrap_err();
    assert!(err.kind().is_connection(), "kind was {:?}", err.kind());
    assert!(!err.message().is_empty());
}

#[test]
fn send_is_single_use() {
    let server = serve(vec![ok_response("text/plain", "once")]);
    let client = build_client();
    let mut rb = client.get(&server.url("/once"));
    let response = rb.send().unwrap();
    assert_eq!(response.status(), 200);
    drop(response);
    let err = rb.send().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HandleNull);
    server.handle.join().unwrap();
}

#[test]
fn execute_runs_a_built_request() {
    let server = serve(vec![ok_response("text/plain", "via execute")]);
    let client = build_client();
    let request = client.get(&server.url("/built")).build().unwrap();
    let response = client.execute(request).unwrap();
    assert_eq!(response.text().unwrap(), "via execute");
    server.handle.join().unwrap();
}

#[test]
fn default_headers_apply_to_requests() {
    let server = serve(vec![ok_response("text/plain", "ok")]);
    let mut headers = HeaderMap::new().unwrap();
    headers.insert("x-default", "yes").unwrap();
    let mut builder = ClientBuilder::new();
    builder
        .timeout(Some(Duration::from_millis(2000)))
        .default_headers(headers);
    let client = builder.build().unwrap();
    client.get(&server.url("/")).send().unwrap();
    let request = server.requests.recv().unwrap();
    assert!(request.to_lowercase().contains("x-default: yes"));
    server.handle.join().unwrap();
}

#[test]
fn form_body_is_encoded_with_content_type() {
    let server = serve(vec![ok_response("text/plain", "ok")]);
    let client = build_client();
    let mut rb = client.post(&server.url("/submit"));
    rb.form(&[("a", "1"), ("b", "2")]);
    rb.send().unwrap();
    let request = server.requests.recv().unwrap();
    assert!(request
        .to_lowercase()
        .contains("content-type: application/x-www-form-urlencoded"));
    assert!(request.ends_with("a=1&b=2"));
    server.handle.join().unwrap();
}

#[test]
fn query_pairs_reach_the_url() {
    let server = serve(vec![ok_response("text/plain", "ok")]);
    let client = build_client();
    let mut rb = client.get(&server.url("/search"));
    rb.query(&[("q", "crab"), ("page", "2")]);
    rb.send().unwrap();
    let request = server.requests.recv().unwrap();
    assert!(request.starts_with("GET /search?q=crab&page=2"));
    server.handle.join().unwrap();
}

#[test]
fn body_file_streams_file_content() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"file payload").unwrap();
    file.flush().unwrap();

    let server = serve(vec![ok_response("text/plain", "ok")]);
    let client = build_client();
    let mut rb = client.post(&server.url("/upload"));
    rb.body_file(file.path());
    assert!(rb.error().is_none());
    rb.send().unwrap();
    let request = server.requests.recv().unwrap();
    assert!(request.ends_with("file payload"));
    server.handle.join().unwrap();
}

#[test]
fn text_and_bytes_use_their_own_leaf_paths() {
    let server = serve(vec![
        ok_response("application/octet-stream", "binary"),
        ok_response("text/plain", "textual"),
    ]);
    let client = build_client();
    let bytes = client
        .get(&server.url("/bin"))
        .send()
        .unwrap()
        .bytes()
        .unwrap();
    assert_eq!(bytes, b"binary");
    let text = client
        .get(&server.url("/txt"))
        .send()
        .unwrap()
        .text()
        .unwrap();
    assert_eq!(text, "textual");
    server.handle.join().unwrap();
}

#[test]
fn redirects_disabled_return_the_redirect_itself() {
    let server = serve(vec![
        "HTTP/1.1 302 Found\r\nLocation: /elsewhere\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            .to_string(),
    ]);
    let mut builder = ClientBuilder::new();
    builder
        .timeout(Some(Duration::from_millis(2000)))
        .redirect(0);
    let client = builder.build().unwrap();
    let response = client.get(&server.url("/")).send().unwrap();
    assert_eq!(response.status(), 302);
    let headers = response.headers().unwrap();
    assert_eq!(headers.get("location").as_deref(), Some("/elsewhere"));
    server.handle.join().unwrap();
}

#[test]
fn read_streams_the_body_in_chunks() {
    let server = serve(vec![ok_response("text/plain", "stream me please")]);
    let client = build_client();
    let mut response = client.get(&server.url("/stream")).send().unwrap();
    let mut collected = Vec::new();
    let mut buf = [0u8; 4];
    loop {
        let n = response.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        collected.extend_from_slice(&buf[..n]);
    }
    assert_eq!(collected, b"stream me please");
    server.handle.join().unwrap();
}

#[test]
fn total_timeout_is_enforced_by_the_transport() {
    // Accept the connection, then never answer.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut sink = [0u8; 512];
            let _ = stream.read(&mut sink);
            thread::sleep(Duration::from_millis(800));
        }
    });

    let mut builder = ClientBuilder::new();
    builder.timeout(Some(Duration::from_millis(100)));
    let client = builder.build().unwrap();
    let err = client
        .get(&format!("http://{addr}/slow"))
        .send()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    handle.join().unwrap();
}

#[test]
fn built_client_is_shared_across_threads() {
    let server = serve(vec![
        ok_response("text/plain", "a"),
        ok_response("text/plain", "b"),
    ]);
    let client = Arc::new(build_client());
    let url = server.url("/shared");
    let workers: Vec<_> = (0..2)
        .map(|_| {
            let client = Arc::clone(&client);
            let url = url.clone();
            thread::spawn(move || client.get(&url).send().unwrap().status())
        })
        .collect();
    for worker in workers {
        assert_eq!(worker.join().unwrap(), 200);
    }
    server.handle.join().unwrap();
}
