/*
 * request.rs
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

//! Request builder chain, built requests.
//!
//! Same ownership protocol as the client builder: mutations take and replace
//! the slot, the first failure invalidates the chain, and the terminals
//! (`build`, `send`) consume the slot unconditionally so a second terminal
//! call fails safely instead of reusing a spent handle.

use granchio_ffi as ffi;
use std::ffi::CString;
use std::path::Path;
use std::time::Duration;

use crate::error::{c_string, ErrorKind, HttpError};
use crate::handle::Handle;
use crate::headers::HeaderMap;
use crate::response::Response;

#[derive(Debug)]
pub struct RequestBuilder {
    handle: Handle<ffi::RequestBuilder>,
    err: Option<HttpError>,
}

impl RequestBuilder {
    pub(crate) fn from_raw(ptr: *mut ffi::RequestBuilder) -> RequestBuilder {
        Self {
            handle: Handle::new(ptr),
            err: None,
        }
    }

    /// A builder that was never populated: every call reports `err`.
    pub(crate) fn failed(err: HttpError) -> RequestBuilder {
        Self {
            handle: Handle::new(std::ptr::null_mut()),
            err: Some(err),
        }
    }

    /// First recorded failure, if the chain has been invalidated.
    pub fn error(&self) -> Option<&HttpError> {
        self.err.as_ref()
    }

    fn apply<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(*mut ffi::RequestBuilder) -> *mut ffi::RequestBuilder,
    {
        if self.err.is_some() {
            return self;
        }
        let ptr = self.handle.take();
        if ptr.is_null() {
            self.err = Some(HttpError::consumed("request builder"));
            return self;
        }
        let next = f(ptr);
        if next.is_null() {
            self.err = Some(HttpError::fetch());
        } else {
            self.handle.replace(next);
        }
        self
    }

    fn fail(&mut self, err: HttpError) -> &mut Self {
        if self.err.is_none() {
            self.err = Some(err);
        }
        self
    }

    pub fn header(&mut self, key: &str, value: &str) -> &mut Self {
        let key = match c_string(key) {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        let value = match c_string(value) {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        self.apply(|ptr| unsafe {
            ffi::request_builder_header(ptr, key.as_ptr(), value.as_ptr())
        })
    }

    /// Merge a header map into the request. The map's handle moves across the
    /// boundary when the call succeeds; on failure the map remains owned here.
    pub fn headers(&mut self, mut headers: HeaderMap) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        let ptr = self.handle.take();
        if ptr.is_null() {
            return self.fail(HttpError::consumed("request builder"));
        }
        let headers_ptr = match headers.live_ptr() {
            Some(p) => p,
            None => {
                self.handle.replace(ptr);
                return self.fail(HttpError::consumed("header map"));
            }
        };
        let next = unsafe { ffi::request_builder_headers(ptr, headers_ptr) };
        if next.is_null() {
            self.err = Some(HttpError::fetch());
        } else {
            headers.detach();
            self.handle.replace(next);
        }
        self
    }

    pub fn basic_auth(&mut self, username: &str, password: Option<&str>) -> &mut Self {
        let username = match c_string(username) {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        let password = match password.map(c_string).transpose() {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        self.apply(|ptr| {
            let password_ptr = password
                .as_ref()
                .map_or(std::ptr::null(), |p: &CString| p.as_ptr());
            unsafe { ffi::request_builder_basic_auth(ptr, username.as_ptr(), password_ptr) }
        })
    }

    pub fn bearer_auth(&mut self, token: &str) -> &mut Self {
        let token = match c_string(token) {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        self.apply(|ptr| unsafe { ffi::request_builder_bearer_auth(ptr, token.as_ptr()) })
    }

    pub fn body_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.apply(|ptr| unsafe {
            ffi::request_builder_body_bytes(ptr, bytes.as_ptr(), bytes.len())
        })
    }

    pub fn body_str(&mut self, body: &str) -> &mut Self {
        let body = match c_string(body) {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        self.apply(|ptr| unsafe { ffi::request_builder_body_string(ptr, body.as_ptr()) })
    }

    /// Stream the body from a file at send time.
    pub fn body_file(&mut self, path: &Path) -> &mut Self {
        let path = match path.to_str() {
            Some(p) => p,
            None => {
                return self.fail(HttpError::new(
                    ErrorKind::CharConversion,
                    "body file path is not valid UTF-8",
                ))
            }
        };
        let path = match c_string(path) {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        self.apply(|ptr| unsafe { ffi::request_builder_body_file(ptr, path.as_ptr()) })
    }

    /// Per-request timeout overriding the client-wide one.
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        let millis = timeout.as_millis() as u64;
        self.apply(|ptr| unsafe { ffi::request_builder_timeout(ptr, millis) })
    }

    /// Append query parameters; repeated keys appear repeatedly.
    pub fn query(&mut self, pairs: &[(&str, &str)]) -> &mut Self {
        let owned = match own_pairs(pairs) {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        let raw = raw_pairs(&owned);
        self.apply(|ptr| unsafe { ffi::request_builder_query(ptr, raw.as_ptr(), raw.len()) })
    }

    /// Url-encoded form body; also sets the content type.
    pub fn form(&mut self, pairs: &[(&str, &str)]) -> &mut Self {
        let owned = match own_pairs(pairs) {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        let raw = raw_pairs(&owned);
        self.apply(|ptr| unsafe { ffi::request_builder_form(ptr, raw.as_ptr(), raw.len()) })
    }

    /// HTTP version: "0.9", "1.0", "1.1", "2" or "3".
    pub fn version(&mut self, version: &str) -> &mut Self {
        let version = match c_string(version) {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        self.apply(|ptr| unsafe { ffi::request_builder_version(ptr, version.as_ptr()) })
    }

    /// Terminal: build the request for `Client::execute`. Consumes the slot
    /// unconditionally.
    pub fn build(&mut self) -> Result<Request, HttpError> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        let ptr = self.handle.take();
        if ptr.is_null() {
            return Err(HttpError::consumed("request builder"));
        }
        let request = unsafe { ffi::request_builder_build(ptr) };
        if request.is_null() {
            let err = HttpError::fetch();
            self.err = Some(err.clone());
            Err(err)
        } else {
            Ok(Request {
                handle: Handle::new(request),
            })
        }
    }

    /// Terminal: build and send, blocking until the response headers arrive.
    /// Consumes the slot unconditionally; a second call fails safely.
    pub fn send(&mut self) -> Result<Response, HttpError> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        let ptr = self.handle.take();
        if ptr.is_null() {
            return Err(HttpError::consumed("request builder"));
        }
        let response = unsafe { ffi::request_builder_send(ptr) };
        if response.is_null() {
            let err = HttpError::fetch();
            self.err = Some(err.clone());
            Err(err)
        } else {
            Ok(Response::from_raw(response))
        }
    }

    /// Duplicate the builder without consuming it. Fails when the body is a
    /// stream that cannot be cloned.
    pub fn try_clone(&self) -> Result<RequestBuilder, HttpError> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        let ptr = self
            .handle
            .get()
            .ok_or_else(|| HttpError::consumed("request builder"))?;
        let clone = unsafe { ffi::request_builder_try_clone(ptr) };
        if clone.is_null() {
            Err(HttpError::fetch())
        } else {
            Ok(RequestBuilder::from_raw(clone))
        }
    }
}

impl Drop for RequestBuilder {
    fn drop(&mut self) {
        if self.handle.is_live() {
            unsafe { ffi::request_builder_destroy(self.handle.take()) }
        }
    }
}

fn own_pairs(pairs: &[(&str, &str)]) -> Result<Vec<(CString, CString)>, HttpError> {
    let mut owned = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        owned.push((c_string(key)?, c_string(value)?));
    }
    Ok(owned)
}

fn raw_pairs(owned: &[(CString, CString)]) -> Vec<ffi::Pair> {
    owned
        .iter()
        .map(|(key, value)| ffi::Pair {
            key: key.as_ptr(),
            value: value.as_ptr(),
        })
        .collect()
}

/// A built request, owned until handed to `Client::execute`.
#[derive(Debug)]
pub struct Request {
    pub(crate) handle: Handle<ffi::Request>,
}

impl Request {
    /// Detach the handle for transfer into the transport.
    pub(crate) fn detach(&mut self) -> *mut ffi::Request {
        self.handle.take()
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        if self.handle.is_live() {
            unsafe { ffi::request_destroy(self.handle.take()) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientBuilder;

    #[test]
    fn build_twice_fails_safely() {
        let client = ClientBuilder::new().build().unwrap();
        let mut rb = client.get("http://127.0.0.1:9/x");
        rb.header("x-probe", "1");
        assert!(rb.error().is_none());
        let request = rb.build().unwrap();
        drop(request);
        let err = rb.build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandleNull);
    }

    #[test]
    fn invalid_header_value_invalidates() {
        let client = ClientBuilder::new().build().unwrap();
        let mut rb = client.get("http://127.0.0.1:9/x");
        rb.header("x-bad", "line\nbreak");
        assert_eq!(rb.error().unwrap().kind(), ErrorKind::Builder);
        let err = rb.build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Builder);
    }

    #[test]
    fn try_clone_keeps_the_original_usable() {
        let client = ClientBuilder::new().build().unwrap();
        let mut rb = client.get("http://127.0.0.1:9/x");
        rb.body_str("payload");
        let mut clone = rb.try_clone().unwrap();
        assert!(clone.build().is_ok());
        assert!(rb.build().is_ok());
    }

    #[test]
    fn failed_builder_reports_the_same_error_on_every_call() {
        let mut rb = RequestBuilder::failed(HttpError::new(ErrorKind::Builder, "bad url"));
        rb.header("a", "b").timeout(Duration::from_millis(5));
        assert_eq!(rb.error().unwrap().kind(), ErrorKind::Builder);
        assert_eq!(rb.send().unwrap_err().kind(), ErrorKind::Builder);
        assert_eq!(rb.build().unwrap_err().kind(), ErrorKind::Builder);
        assert_eq!(rb.try_clone().unwrap_err().kind(), ErrorKind::Builder);
    }
}
