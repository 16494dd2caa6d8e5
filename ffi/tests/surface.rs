/*
 * surface.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Integration test for the C surface, driven exactly as a foreign consumer
 * would: raw handles, NUL-terminated strings, explicit frees. A canned
 * loopback server supplies the responses.
 *
 * Run with:
 *   cargo test -p granchio_ffi --test surface -- --nocapture
 */

use granchio_ffi::*;
use std::ffi::CString;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::thread;

fn c(s: &str) -> CString {
    CString::new(s).unwrap()
}

unsafe fn r_string_to_string(handle: *mut RString) -> String {
    assert!(!handle.is_null());
    let len = r_string_len(handle) as usize;
    let bytes = std::slice::from_raw_parts(r_string_bytes(handle), len);
    let s = String::from_utf8(bytes.to_vec()).unwrap();
    free_r_string(handle);
    s
}

/// Serve a single canned response on a loopback listener.
fn serve_once(response: &'static str) -> (SocketAddr, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while let Ok(n) = stream.read(&mut chunk) {
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    });
    (addr, handle)
}

#[test]
fn full_chain_get_headers_text() {
    let (addr, server) = serve_once(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\nConnection: close\r\n\r\ncrabs",
    );
    unsafe {
        let mut builder = new_client_builder();
        let millis: u64 = 2000;
        builder = client_builder_timeout(builder, &millis);
        assert!(!builder.is_null());
        let client = client_builder_build_client(builder);
        assert!(!client.is_null());

        let url = c(&format!("http://{addr}/status/200"));
        let mut rb = client_get(client, url.as_ptr());
        assert!(!rb.is_null());
        rb = request_builder_header(rb, c("x-probe").as_ptr(), c("1").as_ptr());
        assert!(!rb.is_null());

        let response = request_builder_send(rb);
        assert!(!response.is_null());
        assert_eq!(response_status(response), 200);

        let headers = response_headers(response);
        assert!(!headers.is_null());
        let keys = r_string_to_string(header_map_keys(headers));
        assert!(keys
            .split(';')
            .any(|k| k.eq_ignore_ascii_case("content-type")));
        let content_type = r_string_to_string(header_map_get(headers, c("content-type").as_ptr()));
        assert_eq!(content_type, "text/plain");
        header_map_destroy(headers);

        assert_eq!(response_content_length(response), 5);
        let body = r_string_to_string(response_text(response));
        assert_eq!(body, "crabs");

        client_destroy(client);
    }
    server.join().unwrap();
}

#[test]
fn response_bytes_uses_the_byte_leaf() {
    let (addr, server) = serve_once(
        "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: 3\r\nConnection: close\r\n\r\nabc",
    );
    unsafe {
        let client = client_builder_build_client(new_client_builder());
        let url = c(&format!("http://{addr}/bin"));
        let rb = client_get(client, url.as_ptr());
        let response = request_builder_send(rb);
        assert!(!response.is_null());
        let buf = response_bytes(response);
        assert!(!buf.is_null());
        assert_eq!(bytes_len(buf), 3);
        let content = std::slice::from_raw_parts(bytes_content(buf), 3);
        assert_eq!(content, b"abc");
        free_byte_buffer(buf);
        client_destroy(client);
    }
    server.join().unwrap();
}

#[test]
fn refused_connection_classifies_and_fills_both_error_views() {
    // Bind then drop to obtain a port with nothing listening.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    unsafe {
        let client = client_builder_build_client(new_client_builder());
        let url = c(&format!("http://127.0.0.1:{port}/"));
        let rb = client_get(client, url.as_ptr());
        let response = request_builder_send(rb);
        assert!(response.is_null());

        // Peek view first: it must not clear the slot.
        let needed = last_error_length();
        assert!(needed > 1);
        let mut buf = vec![0 as libc::c_char; needed as usize];
        let written = last_error_message(buf.as_mut_ptr(), needed);
        assert_eq!(written, needed);

        // Structured view still has the error.
        let err = take_last_http_error();
        assert!(!err.is_null());
        let kind = http_err_kind(err);
        assert!(
            matches!(
                kind,
                HttpErrorKind::ConnectionRefused | HttpErrorKind::Connect
            ),
            "kind was {kind:?}"
        );
        assert!(http_err_msg_len(err) > 0);
        http_err_destroy(err);

        // Taking emptied the slot.
        assert_eq!(last_error_length(), 0);
        client_destroy(client);
    }
}

#[test]
fn execute_consumes_the_request_handle() {
    let (addr, server) = serve_once(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
    );
    unsafe {
        let client = client_builder_build_client(new_client_builder());
        let url = c(&format!("http://{addr}/built"));
        let rb = client_get(client, url.as_ptr());
        let request = request_builder_build(rb);
        assert!(!request.is_null());
        let response = client_execute(client, request);
        assert!(!response.is_null());
        assert_eq!(response_status(response), 200);
        response_destroy(response);
        client_destroy(client);
    }
    server.join().unwrap();
}

#[test]
fn default_headers_consumed_only_on_success() {
    unsafe {
        let headers = new_header_map();
        assert!(header_map_insert(
            headers,
            c("x-default").as_ptr(),
            c("yes").as_ptr()
        ));

        // NULL builder: the call fails without consuming the header map.
        let result = client_builder_default_headers(std::ptr::null_mut(), headers);
        assert!(result.is_null());
        let err = take_last_http_error();
        assert_eq!(http_err_kind(err), HttpErrorKind::HandleNull);
        http_err_destroy(err);
        assert_eq!(header_map_len(headers), 1);

        // Live builder: the call succeeds and takes ownership of the map.
        let builder = new_client_builder();
        let builder = client_builder_default_headers(builder, headers);
        assert!(!builder.is_null());
        let client = client_builder_build_client(builder);
        assert!(!client.is_null());
        client_destroy(client);
    }
}

#[test]
fn proxy_is_consumed_by_the_builder() {
    unsafe {
        let proxy = proxy_all(c("http://127.0.0.1:3128").as_ptr());
        assert!(!proxy.is_null());
        let builder = client_builder_proxy(new_client_builder(), proxy);
        assert!(!builder.is_null());
        client_builder_destroy(builder);
    }
}
