/*
 * lib.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Granchio, an HTTP client library with C bindings.
 *
 * Granchio is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Granchio is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Granchio.  If not, see <http://www.gnu.org/licenses/>.
 */

//! C FFI for the granchio HTTP client. Builders, clients, requests, responses
//! and header maps are identified by opaque handles allocated here and released
//! by the matching `*_destroy` function. All string parameters are UTF-8
//! NUL-terminated.
//!
//! Builder mutation functions consume the handle they are given: on success
//! they return the replacement handle, on failure they destroy the consumed
//! state, record the error and return NULL. A NULL input handle records the
//! error and returns NULL without consuming anything. Terminal functions
//! (`client_builder_build_client`, `request_builder_build`,
//! `request_builder_send`, `client_execute`) consume their input handle
//! unconditionally.
//!
//! Failure is always reported as NULL / false / negative; diagnostics live in
//! a thread-local single slot overwritten by the next failing call on the same
//! thread. Read it immediately, either via `take_last_http_error` (structured,
//! caller-owned) or `last_error_length` / `last_error_message` (peek).

use anyhow::{anyhow, Error};
use libc::{c_char, c_int};
use once_cell::sync::OnceCell;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{redirect, Method, Url};
use std::cell::RefCell;
use std::error::Error as StdError;
use std::ffi::CStr;
use std::io::Read;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use std::{ptr, slice};

/// Client configuration under construction. Handle-only; see `new_client_builder`.
pub struct ClientBuilder {
    inner: reqwest::blocking::ClientBuilder,
}

/// A built client. Safe to share across threads for issuing independent requests.
pub struct Client {
    inner: reqwest::blocking::Client,
}

/// Request configuration under construction.
pub struct RequestBuilder {
    inner: reqwest::blocking::RequestBuilder,
}

/// A built request, ready for `client_execute`.
pub struct Request {
    inner: reqwest::blocking::Request,
}

/// A received response. Body extraction (`response_text`, `response_bytes`)
/// consumes the handle.
pub struct Response {
    inner: reqwest::blocking::Response,
}

/// An owned header collection. Mutations act in place; the handle never moves.
pub struct HeaderMap {
    inner: reqwest::header::HeaderMap,
}

/// A proxy configuration, consumed by `client_builder_proxy`.
pub struct Proxy {
    inner: reqwest::Proxy,
}

/// Owned UTF-8 buffer leaf. Read with `r_string_len` / `r_string_bytes`,
/// release with `free_r_string`.
pub struct RString {
    inner: String,
}

/// Owned byte buffer leaf. Read with `bytes_len` / `bytes_content`,
/// release with `free_byte_buffer`.
pub struct ByteBuffer {
    inner: Vec<u8>,
}

/// Key/value pair of NUL-terminated strings, used for query and form arrays.
#[repr(C)]
pub struct Pair {
    pub key: *const c_char,
    pub value: *const c_char,
}

impl Pair {
    unsafe fn to_tuple(&self) -> (String, String) {
        let key = opt_str(self.key).unwrap_or("").to_string();
        let value = opt_str(self.value).unwrap_or("").to_string();
        (key, value)
    }
}

// ---------- Errors ----------

/// Error classification reported alongside every failure.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorKind {
    NoError = 0,
    /// A NULL or already-consumed handle was passed in.
    HandleNull = 1,
    /// A string argument was NULL or not valid UTF-8.
    CharConversion = 2,
    /// Invalid configuration (bad URL, header, TLS version, certificate).
    Builder = 3,
    /// The request could not be sent.
    Request = 4,
    /// Redirect loop or redirect limit exceeded.
    Redirect = 5,
    Status = 6,
    Body = 7,
    /// The response body could not be decoded.
    Decode = 8,
    Timeout = 9,
    /// Could not establish a connection (includes name resolution failures).
    Connect = 10,
    ConnectionRefused = 11,
    ConnectionReset = 12,
    ConnectionAborted = 13,
    HostUnreachable = 14,
    Other = 15,
}

/// Structured error taken from the slot with `take_last_http_error`.
/// Release with `http_err_destroy`.
pub struct HttpError {
    kind: HttpErrorKind,
    message: String,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<Box<HttpError>>> = const { RefCell::new(None) };
}

fn set_last_error(kind: HttpErrorKind, err: Error) {
    log::error!("{:?}: {}", kind, err);
    let mut cause = err.source();
    while let Some(parent) = cause {
        log::warn!("caused by: {}", parent);
        cause = parent.source();
    }
    LAST_ERROR.with(|slot| {
        *slot.borrow_mut() = Some(Box::new(HttpError {
            kind,
            message: err.to_string(),
        }));
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

/// Take the most recent error, clearing the slot.
pub fn take_last_error() -> Option<Box<HttpError>> {
    LAST_ERROR.with(|slot| slot.borrow_mut().take())
}

fn io_source<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a std::io::Error> {
    let mut source = err.source();
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            return Some(io);
        }
        source = e.source();
    }
    None
}

fn connection_kind(err: &std::io::Error) -> HttpErrorKind {
    use std::io::ErrorKind;
    match err.kind() {
        ErrorKind::ConnectionRefused => HttpErrorKind::ConnectionRefused,
        ErrorKind::ConnectionReset => HttpErrorKind::ConnectionReset,
        ErrorKind::ConnectionAborted => HttpErrorKind::ConnectionAborted,
        ErrorKind::HostUnreachable | ErrorKind::NetworkUnreachable => {
            HttpErrorKind::HostUnreachable
        }
        ErrorKind::TimedOut => HttpErrorKind::Timeout,
        _ => HttpErrorKind::Connect,
    }
}

/// Map a transport error onto the C taxonomy. Timeout wins over connect
/// because a connect timeout reports both.
fn classify_transport_error(err: &reqwest::Error) -> HttpErrorKind {
    if err.is_timeout() {
        return HttpErrorKind::Timeout;
    }
    if err.is_builder() {
        return HttpErrorKind::Builder;
    }
    if err.is_redirect() {
        return HttpErrorKind::Redirect;
    }
    if err.is_status() {
        return HttpErrorKind::Status;
    }
    if err.is_body() {
        return HttpErrorKind::Body;
    }
    if err.is_decode() {
        return HttpErrorKind::Decode;
    }
    if err.is_connect() {
        return match io_source(err) {
            Some(io) => connection_kind(io),
            None => HttpErrorKind::Connect,
        };
    }
    if err.is_request() {
        return HttpErrorKind::Request;
    }
    HttpErrorKind::Other
}

fn read_error_kind(err: &std::io::Error) -> HttpErrorKind {
    use std::io::ErrorKind;
    match err.kind() {
        ErrorKind::TimedOut => HttpErrorKind::Timeout,
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted => connection_kind(err),
        _ => HttpErrorKind::Body,
    }
}

/// Take ownership of the most recent error. Returns NULL if no error is
/// recorded. Caller releases with `http_err_destroy`.
#[no_mangle]
pub unsafe extern "C" fn take_last_http_error() -> *mut HttpError {
    match take_last_error() {
        Some(err) => Box::into_raw(err),
        None => ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn http_err_destroy(handle: *mut HttpError) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Error classification. Returns HandleNull if the handle is NULL.
#[no_mangle]
pub unsafe extern "C" fn http_err_kind(handle: *mut HttpError) -> HttpErrorKind {
    if handle.is_null() {
        return HttpErrorKind::HandleNull;
    }
    (*handle).kind
}

/// Message length in bytes (not NUL-terminated).
#[no_mangle]
pub unsafe extern "C" fn http_err_msg_len(handle: *mut HttpError) -> u64 {
    if handle.is_null() {
        return 0;
    }
    (&(*handle).message).len() as u64
}

/// Pointer to the message bytes. Valid while the error handle is alive.
#[no_mangle]
pub unsafe extern "C" fn http_err_msg(handle: *mut HttpError) -> *const u8 {
    if handle.is_null() {
        return ptr::null();
    }
    (*handle).message.as_ptr()
}

#[no_mangle]
pub unsafe extern "C" fn http_err_clear(handle: *mut HttpError) {
    if handle.is_null() {
        return;
    }
    (*handle).kind = HttpErrorKind::NoError;
    (*handle).message.clear();
}

/// Length of the pending error message including the trailing NUL, or 0 if
/// no error is recorded. Does not clear the slot.
#[no_mangle]
pub unsafe extern "C" fn last_error_length() -> c_int {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map(|e| e.message.len() as c_int + 1)
            .unwrap_or(0)
    })
}

/// Copy the pending error message (NUL-terminated) into `buffer`. Returns the
/// number of bytes written including the NUL, 0 if no error is recorded, or -1
/// if `buffer` is NULL or too small. Does not clear the slot.
#[no_mangle]
pub unsafe extern "C" fn last_error_message(buffer: *mut c_char, length: c_int) -> c_int {
    if buffer.is_null() || length <= 0 {
        return -1;
    }
    LAST_ERROR.with(|slot| {
        let slot = slot.borrow();
        let err = match slot.as_ref() {
            Some(e) => e,
            None => return 0,
        };
        let msg = err.message.as_bytes();
        if msg.len() + 1 > length as usize {
            return -1;
        }
        ptr::copy_nonoverlapping(msg.as_ptr(), buffer as *mut u8, msg.len());
        *buffer.add(msg.len()) = 0;
        (msg.len() + 1) as c_int
    })
}

// ---------- Helpers ----------

/// Required string argument. Records CharConversion and returns None when the
/// pointer is NULL or not UTF-8.
unsafe fn ptr_to_str<'a>(ptr: *const c_char, what: &str) -> Option<&'a str> {
    if ptr.is_null() {
        set_last_error(HttpErrorKind::CharConversion, anyhow!("{what} is null"));
        return None;
    }
    match CStr::from_ptr(ptr).to_str() {
        Ok(v) => Some(v),
        Err(e) => {
            set_last_error(
                HttpErrorKind::CharConversion,
                Error::new(e).context(format!("{what} is not valid UTF-8")),
            );
            None
        }
    }
}

/// Optional string argument: NULL (or invalid UTF-8) is simply absent.
unsafe fn opt_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Optional millisecond duration passed as a nullable pointer.
unsafe fn millis_opt(millisecond: *const u64) -> Option<Duration> {
    if millisecond.is_null() {
        None
    } else {
        Some(Duration::from_millis(*millisecond))
    }
}

unsafe fn parse_header(
    key: *const c_char,
    value: *const c_char,
) -> Option<(HeaderName, HeaderValue)> {
    let key = ptr_to_str(key, "header name")?;
    let value = ptr_to_str(value, "header value")?;
    let name = match HeaderName::from_bytes(key.as_bytes()) {
        Ok(n) => n,
        Err(e) => {
            set_last_error(
                HttpErrorKind::Builder,
                Error::new(e).context(format!("invalid header name `{key}`")),
            );
            return None;
        }
    };
    match HeaderValue::from_str(value) {
        Ok(v) => Some((name, v)),
        Err(e) => {
            set_last_error(
                HttpErrorKind::Builder,
                Error::new(e).context(format!("invalid header value for `{key}`")),
            );
            None
        }
    }
}

fn parse_tls_version(s: &str) -> Option<reqwest::tls::Version> {
    match s {
        "1.0" => Some(reqwest::tls::Version::TLS_1_0),
        "1.1" => Some(reqwest::tls::Version::TLS_1_1),
        "1.2" => Some(reqwest::tls::Version::TLS_1_2),
        "1.3" => Some(reqwest::tls::Version::TLS_1_3),
        _ => None,
    }
}

/// Initialize the global logger writing to `granchio.log`. Idempotent; safe to
/// call from every consumer thread.
#[no_mangle]
pub extern "C" fn initialize_logging() {
    static LOGGER: OnceCell<()> = OnceCell::new();
    LOGGER.get_or_init(|| {
        let file = match fern::log_file("granchio.log") {
            Ok(f) => f,
            Err(_) => return,
        };
        let _ = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{} {:5} [{}] {}",
                    chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .level(log::LevelFilter::Debug)
            .chain(file)
            .apply();
    });
}

// ---------- Leaf buffers ----------

/// No-op if ptr is NULL.
#[no_mangle]
pub unsafe extern "C" fn free_r_string(handle: *mut RString) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

#[no_mangle]
pub unsafe extern "C" fn r_string_len(handle: *mut RString) -> u64 {
    if handle.is_null() {
        return 0;
    }
    (&(*handle).inner).len() as u64
}

/// Pointer to UTF-8 bytes (not NUL-terminated). Valid while the handle is alive.
#[no_mangle]
pub unsafe extern "C" fn r_string_bytes(handle: *mut RString) -> *const u8 {
    if handle.is_null() {
        return ptr::null();
    }
    (*handle).inner.as_ptr()
}

/// No-op if ptr is NULL.
#[no_mangle]
pub unsafe extern "C" fn free_byte_buffer(handle: *mut ByteBuffer) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

#[no_mangle]
pub unsafe extern "C" fn bytes_len(handle: *mut ByteBuffer) -> u64 {
    if handle.is_null() {
        return 0;
    }
    (&(*handle).inner).len() as u64
}

/// Pointer to the buffer content. Valid while the handle is alive.
#[no_mangle]
pub unsafe extern "C" fn bytes_content(handle: *mut ByteBuffer) -> *const u8 {
    if handle.is_null() {
        return ptr::null();
    }
    (*handle).inner.as_ptr()
}

// ---------- HeaderMap ----------

/// Create an empty header map. Release with `header_map_destroy`, or hand it
/// to `client_builder_default_headers` / `request_builder_headers` which
/// consume it on success.
#[no_mangle]
pub unsafe extern "C" fn new_header_map() -> *mut HeaderMap {
    clear_last_error();
    Box::into_raw(Box::new(HeaderMap {
        inner: reqwest::header::HeaderMap::new(),
    }))
}

/// Insert a key/value pair, replacing any previous values for the key.
/// In place; the handle is unchanged. Returns false on failure.
#[no_mangle]
pub unsafe extern "C" fn header_map_insert(
    handle: *mut HeaderMap,
    key: *const c_char,
    value: *const c_char,
) -> bool {
    if handle.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("header map handle is null in insert"),
        );
        return false;
    }
    let (name, value) = match parse_header(key, value) {
        Some(p) => p,
        None => return false,
    };
    (*handle).inner.insert(name, value);
    true
}

/// Append a value for the key, keeping previous values.
#[no_mangle]
pub unsafe extern "C" fn header_map_append(
    handle: *mut HeaderMap,
    key: *const c_char,
    value: *const c_char,
) -> bool {
    if handle.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("header map handle is null in append"),
        );
        return false;
    }
    let (name, value) = match parse_header(key, value) {
        Some(p) => p,
        None => return false,
    };
    (*handle).inner.append(name, value);
    true
}

/// Remove all values for the key. Returns false on failure (not on absence).
#[no_mangle]
pub unsafe extern "C" fn header_map_remove(handle: *mut HeaderMap, key: *const c_char) -> bool {
    if handle.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("header map handle is null in remove"),
        );
        return false;
    }
    let key = match ptr_to_str(key, "header name") {
        Some(v) => v,
        None => return false,
    };
    (*handle).inner.remove(key);
    true
}

/// First value for the key (lookup is case-insensitive), as a fresh RString
/// (caller frees with `free_r_string`). NULL if absent or on failure.
#[no_mangle]
pub unsafe extern "C" fn header_map_get(
    handle: *mut HeaderMap,
    key: *const c_char,
) -> *mut RString {
    if handle.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("header map handle is null in get"),
        );
        return ptr::null_mut();
    }
    let key = match ptr_to_str(key, "header name") {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    match (*handle).inner.get(key) {
        Some(v) => match v.to_str() {
            Ok(s) => Box::into_raw(Box::new(RString {
                inner: s.to_string(),
            })),
            Err(e) => {
                set_last_error(
                    HttpErrorKind::CharConversion,
                    Error::new(e).context(format!("header value for `{key}` is not UTF-8")),
                );
                ptr::null_mut()
            }
        },
        None => ptr::null_mut(),
    }
}

/// All values for the key joined with `;`, as a fresh RString (caller frees
/// with `free_r_string`). Values that are not UTF-8 are skipped.
#[no_mangle]
pub unsafe extern "C" fn header_map_get_all(
    handle: *mut HeaderMap,
    key: *const c_char,
) -> *mut RString {
    if handle.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("header map handle is null in get_all"),
        );
        return ptr::null_mut();
    }
    let key = match ptr_to_str(key, "header name") {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    let values: Vec<&str> = (*handle)
        .inner
        .get_all(key)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    Box::into_raw(Box::new(RString {
        inner: values.join(";"),
    }))
}

/// True if the map contains the key. A failed call also returns false and
/// records the error.
#[no_mangle]
pub unsafe extern "C" fn header_map_contains_key(
    handle: *mut HeaderMap,
    key: *const c_char,
) -> bool {
    if handle.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("header map handle is null in contains_key"),
        );
        return false;
    }
    let key = match ptr_to_str(key, "header name") {
        Some(v) => v,
        None => return false,
    };
    (*handle).inner.contains_key(key)
}

/// All keys joined with `;`, as a fresh RString (caller frees with
/// `free_r_string`).
#[no_mangle]
pub unsafe extern "C" fn header_map_keys(handle: *mut HeaderMap) -> *mut RString {
    if handle.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("header map handle is null in keys"),
        );
        return ptr::null_mut();
    }
    let keys: Vec<&str> = (*handle).inner.keys().map(|k| k.as_str()).collect();
    Box::into_raw(Box::new(RString {
        inner: keys.join(";"),
    }))
}

/// All values joined with `;`, as a fresh RString (caller frees with
/// `free_r_string`). Values that are not UTF-8 are skipped.
#[no_mangle]
pub unsafe extern "C" fn header_map_values(handle: *mut HeaderMap) -> *mut RString {
    if handle.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("header map handle is null in values"),
        );
        return ptr::null_mut();
    }
    let values: Vec<&str> = (*handle)
        .inner
        .values()
        .filter_map(|v| v.to_str().ok())
        .collect();
    Box::into_raw(Box::new(RString {
        inner: values.join(";"),
    }))
}

/// Total number of values (>= number of keys). -1 on failure.
#[no_mangle]
pub unsafe extern "C" fn header_map_len(handle: *mut HeaderMap) -> i32 {
    if handle.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("header map handle is null in len"),
        );
        return -1;
    }
    (&(*handle).inner).len() as i32
}

/// Number of distinct keys. -1 on failure.
#[no_mangle]
pub unsafe extern "C" fn header_map_keys_len(handle: *mut HeaderMap) -> i32 {
    if handle.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("header map handle is null in keys_len"),
        );
        return -1;
    }
    (*handle).inner.keys_len() as i32
}

/// Headers the map can hold without reallocating. -1 on failure.
#[no_mangle]
pub unsafe extern "C" fn header_map_capacity(handle: *mut HeaderMap) -> i32 {
    if handle.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("header map handle is null in capacity"),
        );
        return -1;
    }
    (*handle).inner.capacity() as i32
}

/// Reserve room for at least `additional` more headers.
#[no_mangle]
pub unsafe extern "C" fn header_map_reserve(handle: *mut HeaderMap, additional: u32) {
    if handle.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("header map handle is null in reserve"),
        );
        return;
    }
    (*handle).inner.reserve(additional as usize);
}

/// Remove all entries, keeping allocated capacity.
#[no_mangle]
pub unsafe extern "C" fn header_map_clear(handle: *mut HeaderMap) {
    if handle.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("header map handle is null in clear"),
        );
        return;
    }
    (*handle).inner.clear();
}

/// No-op if handle is NULL.
#[no_mangle]
pub unsafe extern "C" fn header_map_destroy(handle: *mut HeaderMap) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

// ---------- Proxy ----------

unsafe fn new_proxy(
    proxy_scheme: *const c_char,
    build: fn(&str) -> reqwest::Result<reqwest::Proxy>,
) -> *mut Proxy {
    let scheme = match ptr_to_str(proxy_scheme, "proxy scheme") {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    match build(scheme) {
        Ok(p) => Box::into_raw(Box::new(Proxy { inner: p })),
        Err(e) => {
            set_last_error(
                HttpErrorKind::Builder,
                Error::new(e).context(format!("invalid proxy scheme `{scheme}`")),
            );
            ptr::null_mut()
        }
    }
}

/// Proxy for HTTP traffic. Release with `proxy_destroy`, or hand it to
/// `client_builder_proxy` which consumes it.
#[no_mangle]
pub unsafe extern "C" fn proxy_http(proxy_scheme: *const c_char) -> *mut Proxy {
    new_proxy(proxy_scheme, |s| reqwest::Proxy::http(s))
}

/// Proxy for HTTPS traffic.
#[no_mangle]
pub unsafe extern "C" fn proxy_https(proxy_scheme: *const c_char) -> *mut Proxy {
    new_proxy(proxy_scheme, |s| reqwest::Proxy::https(s))
}

/// Proxy for all traffic.
#[no_mangle]
pub unsafe extern "C" fn proxy_all(proxy_scheme: *const c_char) -> *mut Proxy {
    new_proxy(proxy_scheme, |s| reqwest::Proxy::all(s))
}

/// No-op if handle is NULL.
#[no_mangle]
pub unsafe extern "C" fn proxy_destroy(handle: *mut Proxy) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

// ---------- ClientBuilder ----------

/// Create a client builder with default configuration. Release with
/// `client_builder_destroy` or consume with `client_builder_build_client`.
#[no_mangle]
pub unsafe extern "C" fn new_client_builder() -> *mut ClientBuilder {
    clear_last_error();
    Box::into_raw(Box::new(ClientBuilder {
        inner: reqwest::blocking::ClientBuilder::new(),
    }))
}

/// Record the null-handle error for a client builder mutation.
fn builder_handle_null(op: &str) {
    set_last_error(
        HttpErrorKind::HandleNull,
        anyhow!("client builder handle is null in {op}"),
    );
}

/// Set the `User-Agent` header used by every request from this client.
#[no_mangle]
pub unsafe extern "C" fn client_builder_user_agent(
    handle: *mut ClientBuilder,
    value: *const c_char,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("user_agent");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    let value = match ptr_to_str(value, "user agent value") {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.user_agent(value),
    }))
}

/// Set the default headers for every request. Consumes `header_map` on
/// success; on failure the header map is left owned by the caller.
#[no_mangle]
pub unsafe extern "C" fn client_builder_default_headers(
    handle: *mut ClientBuilder,
    header_map: *mut HeaderMap,
) -> *mut ClientBuilder {
    if handle.is_null() || header_map.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("client builder or header map handle is null in default_headers"),
        );
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    let headers = Box::from_raw(header_map);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.default_headers(headers.inner),
    }))
}

/// Follow at most `max_redirects` redirects; 0 disables redirect following.
#[no_mangle]
pub unsafe extern "C" fn client_builder_redirect(
    handle: *mut ClientBuilder,
    max_redirects: usize,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("redirect");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    let policy = if max_redirects == 0 {
        redirect::Policy::none()
    } else {
        redirect::Policy::limited(max_redirects)
    };
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.redirect(policy),
    }))
}

/// Enable or disable automatic `Referer` handling.
#[no_mangle]
pub unsafe extern "C" fn client_builder_referer(
    handle: *mut ClientBuilder,
    enable: bool,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("referer");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.referer(enable),
    }))
}

/// Add a proxy. Consumes `proxy` on success; on failure the proxy is left
/// owned by the caller.
#[no_mangle]
pub unsafe extern "C" fn client_builder_proxy(
    handle: *mut ClientBuilder,
    proxy: *mut Proxy,
) -> *mut ClientBuilder {
    if handle.is_null() || proxy.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("client builder or proxy handle is null in proxy"),
        );
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    let proxy = Box::from_raw(proxy);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.proxy(proxy.inner),
    }))
}

/// Total timeout (connect + read + write) in milliseconds. NULL disables the
/// timeout.
#[no_mangle]
pub unsafe extern "C" fn client_builder_timeout(
    handle: *mut ClientBuilder,
    millisecond: *const u64,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("timeout");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.timeout(millis_opt(millisecond)),
    }))
}

/// Connect timeout in milliseconds. NULL disables the timeout.
#[no_mangle]
pub unsafe extern "C" fn client_builder_connect_timeout(
    handle: *mut ClientBuilder,
    millisecond: *const u64,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("connect_timeout");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.connect_timeout(millis_opt(millisecond)),
    }))
}

/// Keep-alive timeout for idle pooled connections, in milliseconds. NULL
/// disables the timeout.
#[no_mangle]
pub unsafe extern "C" fn client_builder_pool_idle_timeout(
    handle: *mut ClientBuilder,
    millisecond: *const u64,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("pool_idle_timeout");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.pool_idle_timeout(millis_opt(millisecond)),
    }))
}

/// Maximum idle connections per host kept in the pool.
#[no_mangle]
pub unsafe extern "C" fn client_builder_pool_max_idle_per_host(
    handle: *mut ClientBuilder,
    max: usize,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("pool_max_idle_per_host");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.pool_max_idle_per_host(max),
    }))
}

/// Send HTTP/1 header names title-cased.
#[no_mangle]
pub unsafe extern "C" fn client_builder_http1_title_case_headers(
    handle: *mut ClientBuilder,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("http1_title_case_headers");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.http1_title_case_headers(),
    }))
}

/// Accept obsolete line folding in HTTP/1 response headers.
#[no_mangle]
pub unsafe extern "C" fn client_builder_http1_allow_obsolete_multiline_headers_in_responses(
    handle: *mut ClientBuilder,
    value: bool,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("http1_allow_obsolete_multiline_headers_in_responses");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder
            .inner
            .http1_allow_obsolete_multiline_headers_in_responses(value),
    }))
}

/// Only use HTTP/1.
#[no_mangle]
pub unsafe extern "C" fn client_builder_http1_only(
    handle: *mut ClientBuilder,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("http1_only");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.http1_only(),
    }))
}

/// Accept HTTP/0.9 responses.
#[no_mangle]
pub unsafe extern "C" fn client_builder_http09_responses(
    handle: *mut ClientBuilder,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("http09_responses");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.http09_responses(),
    }))
}

/// Only use HTTP/2, without ALPN.
#[no_mangle]
pub unsafe extern "C" fn client_builder_http2_prior_knowledge(
    handle: *mut ClientBuilder,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("http2_prior_knowledge");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.http2_prior_knowledge(),
    }))
}

/// `SETTINGS_INITIAL_WINDOW_SIZE` for HTTP/2 stream-level flow control.
/// NULL keeps the default.
#[no_mangle]
pub unsafe extern "C" fn client_builder_http2_initial_stream_window_size(
    handle: *mut ClientBuilder,
    size: *const u32,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("http2_initial_stream_window_size");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    let size = if size.is_null() { None } else { Some(*size) };
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.http2_initial_stream_window_size(size),
    }))
}

/// Connection-level flow control window for HTTP/2. NULL keeps the default.
#[no_mangle]
pub unsafe extern "C" fn client_builder_http2_initial_connection_window_size(
    handle: *mut ClientBuilder,
    size: *const u32,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("http2_initial_connection_window_size");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    let size = if size.is_null() { None } else { Some(*size) };
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.http2_initial_connection_window_size(size),
    }))
}

/// Use adaptive HTTP/2 flow control, overriding the window sizes above.
#[no_mangle]
pub unsafe extern "C" fn client_builder_http2_adaptive_window(
    handle: *mut ClientBuilder,
    enable: bool,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("http2_adaptive_window");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.http2_adaptive_window(enable),
    }))
}

/// Maximum HTTP/2 frame size. NULL keeps the default.
#[no_mangle]
pub unsafe extern "C" fn client_builder_http2_max_frame_size(
    handle: *mut ClientBuilder,
    size: *const u32,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("http2_max_frame_size");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    let size = if size.is_null() { None } else { Some(*size) };
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.http2_max_frame_size(size),
    }))
}

/// Set `TCP_NODELAY`.
#[no_mangle]
pub unsafe extern "C" fn client_builder_tcp_nodelay(
    handle: *mut ClientBuilder,
    enable: bool,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("tcp_nodelay");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.tcp_nodelay(enable),
    }))
}

/// TCP keepalive interval in milliseconds. NULL disables keepalive.
#[no_mangle]
pub unsafe extern "C" fn client_builder_tcp_keepalive(
    handle: *mut ClientBuilder,
    millisecond: *const u64,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("tcp_keepalive");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.tcp_keepalive(millis_opt(millisecond)),
    }))
}

/// Bind to a local IP address ("10.0.0.2", "::1").
#[no_mangle]
pub unsafe extern "C" fn client_builder_local_address(
    handle: *mut ClientBuilder,
    address: *const c_char,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("local_address");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    let address = match ptr_to_str(address, "local address") {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    let addr: IpAddr = match address.parse() {
        Ok(a) => a,
        Err(e) => {
            set_last_error(
                HttpErrorKind::Builder,
                Error::new(e).context(format!("invalid local address `{address}`")),
            );
            return ptr::null_mut();
        }
    };
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.local_address(addr),
    }))
}

/// Add a trusted root certificate from a PEM file.
#[no_mangle]
pub unsafe extern "C" fn client_builder_add_root_certificate(
    handle: *mut ClientBuilder,
    cert_path: *const c_char,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("add_root_certificate");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    let path = match ptr_to_str(cert_path, "certificate path") {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    let pem = match std::fs::read(path) {
        Ok(v) => v,
        Err(e) => {
            set_last_error(
                HttpErrorKind::Builder,
                Error::new(e).context(format!("cannot read certificate `{path}`")),
            );
            return ptr::null_mut();
        }
    };
    let cert = match reqwest::Certificate::from_pem(&pem) {
        Ok(c) => c,
        Err(e) => {
            set_last_error(
                HttpErrorKind::Builder,
                Error::new(e).context(format!("invalid PEM certificate `{path}`")),
            );
            return ptr::null_mut();
        }
    };
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.add_root_certificate(cert),
    }))
}

/// Trust the bundled webpki/system roots (enabled by default).
#[no_mangle]
pub unsafe extern "C" fn client_builder_tls_built_in_root_certs(
    handle: *mut ClientBuilder,
    enable: bool,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("tls_built_in_root_certs");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.tls_built_in_root_certs(enable),
    }))
}

/// Disable certificate validation. Testing only.
#[no_mangle]
pub unsafe extern "C" fn client_builder_danger_accept_invalid_certs(
    handle: *mut ClientBuilder,
    accept_invalid_certs: bool,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("danger_accept_invalid_certs");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.danger_accept_invalid_certs(accept_invalid_certs),
    }))
}

/// Enable or disable TLS SNI.
#[no_mangle]
pub unsafe extern "C" fn client_builder_tls_sni(
    handle: *mut ClientBuilder,
    enable: bool,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("tls_sni");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.tls_sni(enable),
    }))
}

/// Minimum TLS version: "1.0", "1.1", "1.2" or "1.3". Anything else fails
/// with a Builder error and the builder is destroyed.
#[no_mangle]
pub unsafe extern "C" fn client_builder_min_tls_version(
    handle: *mut ClientBuilder,
    version: *const c_char,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("min_tls_version");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    let version = match ptr_to_str(version, "tls version") {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    let parsed = match parse_tls_version(version) {
        Some(v) => v,
        None => {
            set_last_error(
                HttpErrorKind::Builder,
                anyhow!("unsupported tls version `{version}`"),
            );
            return ptr::null_mut();
        }
    };
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.min_tls_version(parsed),
    }))
}

/// Maximum TLS version: "1.0", "1.1", "1.2" or "1.3".
#[no_mangle]
pub unsafe extern "C" fn client_builder_max_tls_version(
    handle: *mut ClientBuilder,
    version: *const c_char,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("max_tls_version");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    let version = match ptr_to_str(version, "tls version") {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    let parsed = match parse_tls_version(version) {
        Some(v) => v,
        None => {
            set_last_error(
                HttpErrorKind::Builder,
                anyhow!("unsupported tls version `{version}`"),
            );
            return ptr::null_mut();
        }
    };
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.max_tls_version(parsed),
    }))
}

/// Refuse plain-HTTP URLs.
#[no_mangle]
pub unsafe extern "C" fn client_builder_https_only(
    handle: *mut ClientBuilder,
    enable: bool,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("https_only");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.https_only(enable),
    }))
}

/// Override address resolution for a host: `addr` is "ip:port" and the port
/// is replaced by the request's port at connect time.
#[no_mangle]
pub unsafe extern "C" fn client_builder_resolve(
    handle: *mut ClientBuilder,
    domain: *const c_char,
    addr: *const c_char,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("resolve");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    let domain = match ptr_to_str(domain, "resolve domain") {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    let addr_str = match ptr_to_str(addr, "resolve address") {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    let addr: SocketAddr = match addr_str.parse() {
        Ok(a) => a,
        Err(e) => {
            set_last_error(
                HttpErrorKind::Builder,
                Error::new(e).context(format!("invalid socket address `{addr_str}`")),
            );
            return ptr::null_mut();
        }
    };
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.resolve(domain, addr),
    }))
}

/// Force the rustls TLS backend.
#[no_mangle]
pub unsafe extern "C" fn client_builder_use_rustls(
    handle: *mut ClientBuilder,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("use_rustls");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.use_rustls_tls(),
    }))
}

/// Force the native TLS backend.
#[no_mangle]
pub unsafe extern "C" fn client_builder_use_native_tls(
    handle: *mut ClientBuilder,
) -> *mut ClientBuilder {
    if handle.is_null() {
        builder_handle_null("use_native_tls");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    Box::into_raw(Box::new(ClientBuilder {
        inner: builder.inner.use_native_tls(),
    }))
}

/// No-op if handle is NULL.
#[no_mangle]
pub unsafe extern "C" fn client_builder_destroy(handle: *mut ClientBuilder) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Build the client. Consumes the builder handle unconditionally. Returns a
/// Client handle (release with `client_destroy`), or NULL with a Builder
/// error if the TLS backend or resolver cannot be initialized.
#[no_mangle]
pub unsafe extern "C" fn client_builder_build_client(handle: *mut ClientBuilder) -> *mut Client {
    if handle.is_null() {
        builder_handle_null("build_client");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    match builder.inner.build() {
        Ok(c) => {
            clear_last_error();
            Box::into_raw(Box::new(Client { inner: c }))
        }
        Err(e) => {
            set_last_error(
                HttpErrorKind::Builder,
                Error::new(e).context("unable to build client"),
            );
            ptr::null_mut()
        }
    }
}

// ---------- Client ----------

/// No-op if handle is NULL.
#[no_mangle]
pub unsafe extern "C" fn client_destroy(handle: *mut Client) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Shared entry point for the method-specific request constructors. The
/// client handle is not consumed; the URL is validated eagerly.
unsafe fn new_request_builder(
    handle: *mut Client,
    method: Method,
    url: *const c_char,
    op: &str,
) -> *mut RequestBuilder {
    if handle.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("client handle is null in {op}"),
        );
        return ptr::null_mut();
    }
    let url_str = match ptr_to_str(url, "request url") {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    if let Err(e) = Url::parse(url_str) {
        set_last_error(
            HttpErrorKind::Builder,
            Error::new(e).context(format!("invalid url `{url_str}`")),
        );
        return ptr::null_mut();
    }
    let rb = (*handle).inner.request(method, url_str);
    Box::into_raw(Box::new(RequestBuilder { inner: rb }))
}

/// Start a GET request. Returns a RequestBuilder handle, or NULL if the URL
/// does not parse. The client handle stays valid.
#[no_mangle]
pub unsafe extern "C" fn client_get(handle: *mut Client, url: *const c_char) -> *mut RequestBuilder {
    new_request_builder(handle, Method::GET, url, "get")
}

/// Start a POST request.
#[no_mangle]
pub unsafe extern "C" fn client_post(
    handle: *mut Client,
    url: *const c_char,
) -> *mut RequestBuilder {
    new_request_builder(handle, Method::POST, url, "post")
}

/// Start a PUT request.
#[no_mangle]
pub unsafe extern "C" fn client_put(handle: *mut Client, url: *const c_char) -> *mut RequestBuilder {
    new_request_builder(handle, Method::PUT, url, "put")
}

/// Start a PATCH request.
#[no_mangle]
pub unsafe extern "C" fn client_patch(
    handle: *mut Client,
    url: *const c_char,
) -> *mut RequestBuilder {
    new_request_builder(handle, Method::PATCH, url, "patch")
}

/// Start a DELETE request.
#[no_mangle]
pub unsafe extern "C" fn client_delete(
    handle: *mut Client,
    url: *const c_char,
) -> *mut RequestBuilder {
    new_request_builder(handle, Method::DELETE, url, "delete")
}

/// Start a HEAD request.
#[no_mangle]
pub unsafe extern "C" fn client_head(
    handle: *mut Client,
    url: *const c_char,
) -> *mut RequestBuilder {
    new_request_builder(handle, Method::HEAD, url, "head")
}

/// Start a request with an arbitrary method name ("GET", "REPORT", ...).
#[no_mangle]
pub unsafe extern "C" fn client_request(
    handle: *mut Client,
    method: *const c_char,
    url: *const c_char,
) -> *mut RequestBuilder {
    if handle.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("client handle is null in request"),
        );
        return ptr::null_mut();
    }
    let method_str = match ptr_to_str(method, "request method") {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    let method = match Method::from_bytes(method_str.as_bytes()) {
        Ok(m) => m,
        Err(e) => {
            set_last_error(
                HttpErrorKind::Builder,
                Error::new(e).context(format!("invalid method `{method_str}`")),
            );
            return ptr::null_mut();
        }
    };
    new_request_builder(handle, method, url, "request")
}

/// Execute a built request. Consumes the request handle unconditionally; the
/// client handle stays valid. Returns a Response handle, or NULL with a
/// classified error.
#[no_mangle]
pub unsafe extern "C" fn client_execute(handle: *mut Client, request: *mut Request) -> *mut Response {
    if handle.is_null() || request.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("client or request handle is null in execute"),
        );
        return ptr::null_mut();
    }
    let request = Box::from_raw(request);
    let url = request.inner.url().to_string();
    match (*handle).inner.execute(request.inner) {
        Ok(r) => {
            clear_last_error();
            Box::into_raw(Box::new(Response { inner: r }))
        }
        Err(e) => {
            let kind = classify_transport_error(&e);
            set_last_error(kind, Error::new(e).context(format!("execute failed for {url}")));
            ptr::null_mut()
        }
    }
}

// ---------- RequestBuilder ----------

/// Record the null-handle error for a request builder mutation.
fn request_handle_null(op: &str) {
    set_last_error(
        HttpErrorKind::HandleNull,
        anyhow!("request builder handle is null in {op}"),
    );
}

/// Add one header to the request.
#[no_mangle]
pub unsafe extern "C" fn request_builder_header(
    handle: *mut RequestBuilder,
    key: *const c_char,
    value: *const c_char,
) -> *mut RequestBuilder {
    if handle.is_null() {
        request_handle_null("header");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    let (name, value) = match parse_header(key, value) {
        Some(p) => p,
        None => return ptr::null_mut(),
    };
    Box::into_raw(Box::new(RequestBuilder {
        inner: builder.inner.header(name, value),
    }))
}

/// Merge a header map into the request. Consumes `headers` on success; on
/// failure the header map is left owned by the caller.
#[no_mangle]
pub unsafe extern "C" fn request_builder_headers(
    handle: *mut RequestBuilder,
    headers: *mut HeaderMap,
) -> *mut RequestBuilder {
    if handle.is_null() || headers.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("request builder or header map handle is null in headers"),
        );
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    let headers = Box::from_raw(headers);
    Box::into_raw(Box::new(RequestBuilder {
        inner: builder.inner.headers(headers.inner),
    }))
}

/// Enable HTTP basic authentication. `password` may be NULL.
#[no_mangle]
pub unsafe extern "C" fn request_builder_basic_auth(
    handle: *mut RequestBuilder,
    username: *const c_char,
    password: *const c_char,
) -> *mut RequestBuilder {
    if handle.is_null() {
        request_handle_null("basic_auth");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    let username = match ptr_to_str(username, "username") {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    let password = opt_str(password);
    Box::into_raw(Box::new(RequestBuilder {
        inner: builder.inner.basic_auth(username, password),
    }))
}

/// Enable HTTP bearer authentication.
#[no_mangle]
pub unsafe extern "C" fn request_builder_bearer_auth(
    handle: *mut RequestBuilder,
    token: *const c_char,
) -> *mut RequestBuilder {
    if handle.is_null() {
        request_handle_null("bearer_auth");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    let token = match ptr_to_str(token, "bearer token") {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    Box::into_raw(Box::new(RequestBuilder {
        inner: builder.inner.bearer_auth(token),
    }))
}

/// Set the request body from a byte array. The bytes are copied.
#[no_mangle]
pub unsafe extern "C" fn request_builder_body_bytes(
    handle: *mut RequestBuilder,
    bytes: *const u8,
    size: usize,
) -> *mut RequestBuilder {
    if handle.is_null() {
        request_handle_null("body_bytes");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    if bytes.is_null() && size != 0 {
        set_last_error(
            HttpErrorKind::Builder,
            anyhow!("body bytes pointer is null but size is {size}"),
        );
        return ptr::null_mut();
    }
    let body = if size == 0 {
        Vec::new()
    } else {
        slice::from_raw_parts(bytes, size).to_vec()
    };
    Box::into_raw(Box::new(RequestBuilder {
        inner: builder.inner.body(body),
    }))
}

/// Set the request body from UTF-8 text.
#[no_mangle]
pub unsafe extern "C" fn request_builder_body_string(
    handle: *mut RequestBuilder,
    body: *const c_char,
) -> *mut RequestBuilder {
    if handle.is_null() {
        request_handle_null("body_string");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    let body = match ptr_to_str(body, "body string") {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    Box::into_raw(Box::new(RequestBuilder {
        inner: builder.inner.body(body.to_string()),
    }))
}

/// Stream the request body from a file.
#[no_mangle]
pub unsafe extern "C" fn request_builder_body_file(
    handle: *mut RequestBuilder,
    file_path: *const c_char,
) -> *mut RequestBuilder {
    if handle.is_null() {
        request_handle_null("body_file");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    let path = match ptr_to_str(file_path, "body file path") {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) => {
            set_last_error(
                HttpErrorKind::Builder,
                Error::new(e).context(format!("cannot open body file `{path}`")),
            );
            return ptr::null_mut();
        }
    };
    Box::into_raw(Box::new(RequestBuilder {
        inner: builder.inner.body(file),
    }))
}

/// Per-request timeout in milliseconds, overriding the client timeout. It
/// runs from connect until the body has finished.
#[no_mangle]
pub unsafe extern "C" fn request_builder_timeout(
    handle: *mut RequestBuilder,
    millisecond: u64,
) -> *mut RequestBuilder {
    if handle.is_null() {
        request_handle_null("timeout");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    Box::into_raw(Box::new(RequestBuilder {
        inner: builder.inner.timeout(Duration::from_millis(millisecond)),
    }))
}

/// Append `len` key/value pairs to the URL query string. Existing parameters
/// are kept; repeated keys show up repeatedly.
#[no_mangle]
pub unsafe extern "C" fn request_builder_query(
    handle: *mut RequestBuilder,
    pairs: *const Pair,
    len: usize,
) -> *mut RequestBuilder {
    if handle.is_null() {
        request_handle_null("query");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    if pairs.is_null() && len != 0 {
        set_last_error(
            HttpErrorKind::Builder,
            anyhow!("query pairs pointer is null but len is {len}"),
        );
        return ptr::null_mut();
    }
    let pairs = if len == 0 {
        &[][..]
    } else {
        slice::from_raw_parts(pairs, len)
    };
    let query: Vec<(String, String)> = pairs.iter().map(|p| p.to_tuple()).collect();
    Box::into_raw(Box::new(RequestBuilder {
        inner: builder.inner.query(&query),
    }))
}

/// Set the HTTP version: "0.9", "1.0", "1.1", "2" or "3".
#[no_mangle]
pub unsafe extern "C" fn request_builder_version(
    handle: *mut RequestBuilder,
    version: *const c_char,
) -> *mut RequestBuilder {
    if handle.is_null() {
        request_handle_null("version");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    let version = match ptr_to_str(version, "http version") {
        Some(v) => v,
        None => return ptr::null_mut(),
    };
    let parsed = match version {
        "0.9" => reqwest::Version::HTTP_09,
        "1.0" => reqwest::Version::HTTP_10,
        "1.1" => reqwest::Version::HTTP_11,
        "2" => reqwest::Version::HTTP_2,
        "3" => reqwest::Version::HTTP_3,
        _ => {
            set_last_error(
                HttpErrorKind::Builder,
                anyhow!("unsupported http version `{version}`"),
            );
            return ptr::null_mut();
        }
    };
    Box::into_raw(Box::new(RequestBuilder {
        inner: builder.inner.version(parsed),
    }))
}

/// Set a url-encoded form body from `len` key/value pairs and set
/// `Content-Type: application/x-www-form-urlencoded`.
#[no_mangle]
pub unsafe extern "C" fn request_builder_form(
    handle: *mut RequestBuilder,
    pairs: *const Pair,
    len: usize,
) -> *mut RequestBuilder {
    if handle.is_null() {
        request_handle_null("form");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    if pairs.is_null() && len != 0 {
        set_last_error(
            HttpErrorKind::Builder,
            anyhow!("form pairs pointer is null but len is {len}"),
        );
        return ptr::null_mut();
    }
    let pairs = if len == 0 {
        &[][..]
    } else {
        slice::from_raw_parts(pairs, len)
    };
    let form: Vec<(String, String)> = pairs.iter().map(|p| p.to_tuple()).collect();
    Box::into_raw(Box::new(RequestBuilder {
        inner: builder.inner.form(&form),
    }))
}

/// Build the request without sending it. Consumes the builder handle
/// unconditionally. Returns a Request handle for `client_execute` (release
/// with `request_destroy`), or NULL with a classified error.
#[no_mangle]
pub unsafe extern "C" fn request_builder_build(handle: *mut RequestBuilder) -> *mut Request {
    if handle.is_null() {
        request_handle_null("build");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    match builder.inner.build() {
        Ok(r) => {
            clear_last_error();
            Box::into_raw(Box::new(Request { inner: r }))
        }
        Err(e) => {
            let kind = classify_transport_error(&e);
            set_last_error(kind, Error::new(e).context("build request failed"));
            ptr::null_mut()
        }
    }
}

/// Build and send the request, blocking until the response headers arrive.
/// Consumes the builder handle unconditionally. Returns a Response handle
/// (release with `response_destroy`), or NULL with a classified error
/// (timeout, redirect loop, connection failure, ...).
#[no_mangle]
pub unsafe extern "C" fn request_builder_send(handle: *mut RequestBuilder) -> *mut Response {
    if handle.is_null() {
        request_handle_null("send");
        return ptr::null_mut();
    }
    let builder = Box::from_raw(handle);
    match builder.inner.send() {
        Ok(r) => {
            clear_last_error();
            Box::into_raw(Box::new(Response { inner: r }))
        }
        Err(e) => {
            let kind = classify_transport_error(&e);
            set_last_error(kind, Error::new(e).context("send failed"));
            ptr::null_mut()
        }
    }
}

/// Clone the builder. Does not consume the handle. Returns NULL with a
/// Request error if the body is a stream and cannot be cloned.
#[no_mangle]
pub unsafe extern "C" fn request_builder_try_clone(
    handle: *mut RequestBuilder,
) -> *mut RequestBuilder {
    if handle.is_null() {
        request_handle_null("try_clone");
        return ptr::null_mut();
    }
    match (*handle).inner.try_clone() {
        Some(clone) => Box::into_raw(Box::new(RequestBuilder { inner: clone })),
        None => {
            set_last_error(
                HttpErrorKind::Request,
                anyhow!("request body is a stream and cannot be cloned"),
            );
            ptr::null_mut()
        }
    }
}

/// No-op if handle is NULL.
#[no_mangle]
pub unsafe extern "C" fn request_builder_destroy(handle: *mut RequestBuilder) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

// ---------- Request ----------

/// No-op if handle is NULL.
#[no_mangle]
pub unsafe extern "C" fn request_destroy(handle: *mut Request) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

// ---------- Response ----------

/// Status code of the response. Returns u16::MAX on a NULL handle.
#[no_mangle]
pub unsafe extern "C" fn response_status(response: *mut Response) -> u16 {
    if response.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("response handle is null in status"),
        );
        return u16::MAX;
    }
    (*response).inner.status().as_u16()
}

/// Copy of the response headers as an independent HeaderMap handle (release
/// with `header_map_destroy`). The response handle stays valid.
#[no_mangle]
pub unsafe extern "C" fn response_headers(response: *mut Response) -> *mut HeaderMap {
    if response.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("response handle is null in headers"),
        );
        return ptr::null_mut();
    }
    let headers = (*response).inner.headers().clone();
    Box::into_raw(Box::new(HeaderMap { inner: headers }))
}

/// Negotiated HTTP version ("HTTP/1.1", "HTTP/2.0", ...) as a fresh RString
/// (caller frees with `free_r_string`).
#[no_mangle]
pub unsafe extern "C" fn response_version(response: *mut Response) -> *mut RString {
    if response.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("response handle is null in version"),
        );
        return ptr::null_mut();
    }
    let version = match (*response).inner.version() {
        reqwest::Version::HTTP_09 => "HTTP/0.9",
        reqwest::Version::HTTP_10 => "HTTP/1.0",
        reqwest::Version::HTTP_11 => "HTTP/1.1",
        reqwest::Version::HTTP_2 => "HTTP/2.0",
        reqwest::Version::HTTP_3 => "HTTP/3.0",
        _ => "unknown",
    };
    Box::into_raw(Box::new(RString {
        inner: version.to_string(),
    }))
}

/// Final URL of the response (after redirects) as a fresh RString (caller
/// frees with `free_r_string`).
#[no_mangle]
pub unsafe extern "C" fn response_url(response: *mut Response) -> *mut RString {
    if response.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("response handle is null in url"),
        );
        return ptr::null_mut();
    }
    Box::into_raw(Box::new(RString {
        inner: (*response).inner.url().to_string(),
    }))
}

/// Remote address the response was received from, as a fresh RString (caller
/// frees with `free_r_string`). NULL when unknown; no error is recorded.
#[no_mangle]
pub unsafe extern "C" fn response_remote_addr(response: *mut Response) -> *mut RString {
    if response.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("response handle is null in remote_addr"),
        );
        return ptr::null_mut();
    }
    match (*response).inner.remote_addr() {
        Some(addr) => Box::into_raw(Box::new(RString {
            inner: addr.to_string(),
        })),
        None => ptr::null_mut(),
    }
}

/// Content length if known, -1 otherwise.
#[no_mangle]
pub unsafe extern "C" fn response_content_length(response: *mut Response) -> i64 {
    if response.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("response handle is null in content_length"),
        );
        return -1;
    }
    match (*response).inner.content_length() {
        Some(n) => n as i64,
        None => -1,
    }
}

/// Read up to `buf_len` body bytes into `buf`, blocking. Returns the number
/// of bytes read (0 at end of body), or -1 with a classified error. The
/// response handle stays valid.
#[no_mangle]
pub unsafe extern "C" fn response_read(
    response: *mut Response,
    buf: *mut u8,
    buf_len: usize,
) -> i64 {
    if response.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("response handle is null in read"),
        );
        return -1;
    }
    if buf.is_null() {
        set_last_error(HttpErrorKind::Body, anyhow!("read buffer is null"));
        return -1;
    }
    let out = slice::from_raw_parts_mut(buf, buf_len);
    match (*response).inner.read(out) {
        Ok(n) => n as i64,
        Err(e) => {
            let kind = read_error_kind(&e);
            set_last_error(kind, Error::new(e).context("read response body"));
            -1
        }
    }
}

/// Decode the whole body as text (charset from the `Content-Type` header,
/// UTF-8 by default). Consumes the response handle unconditionally. Returns a
/// fresh RString (caller frees with `free_r_string`), or NULL with a
/// classified error.
#[no_mangle]
pub unsafe extern "C" fn response_text(response: *mut Response) -> *mut RString {
    if response.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("response handle is null in text"),
        );
        return ptr::null_mut();
    }
    let response = Box::from_raw(response);
    match response.inner.text() {
        Ok(v) => {
            clear_last_error();
            Box::into_raw(Box::new(RString { inner: v }))
        }
        Err(e) => {
            let kind = classify_transport_error(&e);
            set_last_error(kind, Error::new(e).context("read response text"));
            ptr::null_mut()
        }
    }
}

/// Read the whole body as bytes. Consumes the response handle
/// unconditionally. Returns a fresh ByteBuffer (caller frees with
/// `free_byte_buffer`), or NULL with a classified error.
#[no_mangle]
pub unsafe extern "C" fn response_bytes(response: *mut Response) -> *mut ByteBuffer {
    if response.is_null() {
        set_last_error(
            HttpErrorKind::HandleNull,
            anyhow!("response handle is null in bytes"),
        );
        return ptr::null_mut();
    }
    let response = Box::from_raw(response);
    match response.inner.bytes() {
        Ok(b) => {
            clear_last_error();
            Box::into_raw(Box::new(ByteBuffer { inner: b.to_vec() }))
        }
        Err(e) => {
            let kind = classify_transport_error(&e);
            set_last_error(kind, Error::new(e).context("read response bytes"));
            ptr::null_mut()
        }
    }
}

/// No-op if handle is NULL.
#[no_mangle]
pub unsafe extern "C" fn response_destroy(response: *mut Response) {
    if !response.is_null() {
        drop(Box::from_raw(response));
    }
}
