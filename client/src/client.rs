/*
 * client.rs
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

//! Client builder chain and the built client.
//!
//! `ClientBuilder` follows the boundary's consume-and-return protocol with an
//! owned slot: each mutation takes the handle out, calls across, and puts the
//! replacement back only on success. The first failure invalidates the chain;
//! every later mutation is a no-op and the terminal `build` reports the
//! recorded error. A builder is a single-owner, single-thread artifact; the
//! built `Client` may be shared across threads to issue independent requests.

use granchio_ffi as ffi;
use libc::c_char;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use crate::error::{c_string, HttpError};
use crate::handle::Handle;
use crate::headers::HeaderMap;
use crate::proxy::Proxy;
use crate::request::{Request, RequestBuilder};
use crate::response::Response;

pub struct ClientBuilder {
    handle: Handle<ffi::ClientBuilder>,
    err: Option<HttpError>,
}

impl ClientBuilder {
    pub fn new() -> ClientBuilder {
        let ptr = unsafe { ffi::new_client_builder() };
        let err = if ptr.is_null() {
            Some(HttpError::fetch())
        } else {
            None
        };
        Self {
            handle: Handle::new(ptr),
            err,
        }
    }

    /// First recorded failure, if the chain has been invalidated.
    pub fn error(&self) -> Option<&HttpError> {
        self.err.as_ref()
    }

    /// Take-and-replace mutation step. No-ops once invalidated; on a NULL
    /// result the slot stays empty and the boundary error is recorded.
    fn apply<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(*mut ffi::ClientBuilder) -> *mut ffi::ClientBuilder,
    {
        if self.err.is_some() {
            return self;
        }
        let ptr = self.handle.take();
        if ptr.is_null() {
            self.err = Some(HttpError::consumed("client builder"));
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

    /// Invalidate the chain before reaching the boundary (argument
    /// conversion failed). The handle stays live until drop.
    fn fail(&mut self, err: HttpError) -> &mut Self {
        if self.err.is_none() {
            self.err = Some(err);
        }
        self
    }

    pub fn user_agent(&mut self, value: &str) -> &mut Self {
        let value = match c_string(value) {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        self.apply(|ptr| unsafe { ffi::client_builder_user_agent(ptr, value.as_ptr()) })
    }

    /// Install default headers for every request. The map's handle moves
    /// across the boundary when the call succeeds; on failure the map remains
    /// owned here and is released normally.
    pub fn default_headers(&mut self, mut headers: HeaderMap) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        let ptr = self.handle.take();
        if ptr.is_null() {
            return self.fail(HttpError::consumed("client builder"));
        }
        let headers_ptr = match headers.live_ptr() {
            Some(p) => p,
            None => {
                self.handle.replace(ptr);
                return self.fail(HttpError::consumed("header map"));
            }
        };
        let next = unsafe { ffi::client_builder_default_headers(ptr, headers_ptr) };
        if next.is_null() {
            self.err = Some(HttpError::fetch());
        } else {
            headers.detach();
            self.handle.replace(next);
        }
        self
    }

    /// Follow at most `max_redirects` redirects; 0 disables following.
    pub fn redirect(&mut self, max_redirects: usize) -> &mut Self {
        self.apply(|ptr| unsafe { ffi::client_builder_redirect(ptr, max_redirects) })
    }

    pub fn referer(&mut self, enable: bool) -> &mut Self {
        self.apply(|ptr| unsafe { ffi::client_builder_referer(ptr, enable) })
    }

    /// Route traffic through a proxy. Same transfer contract as
    /// `default_headers`.
    pub fn proxy(&mut self, mut proxy: Proxy) -> &mut Self {
        if self.err.is_some() {
            return self;
        }
        let ptr = self.handle.take();
        if ptr.is_null() {
            return self.fail(HttpError::consumed("client builder"));
        }
        let proxy_ptr = match proxy.live_ptr() {
            Some(p) => p,
            None => {
                self.handle.replace(ptr);
                return self.fail(HttpError::consumed("proxy"));
            }
        };
        let next = unsafe { ffi::client_builder_proxy(ptr, proxy_ptr) };
        if next.is_null() {
            self.err = Some(HttpError::fetch());
        } else {
            proxy.detach();
            self.handle.replace(next);
        }
        self
    }

    /// Total timeout for connect, read and write. None disables the timeout.
    pub fn timeout(&mut self, timeout: Option<Duration>) -> &mut Self {
        let millis = timeout.map(|d| d.as_millis() as u64);
        self.apply(|ptr| {
            let millis_ptr = millis.as_ref().map_or(std::ptr::null(), |m| m as *const u64);
            unsafe { ffi::client_builder_timeout(ptr, millis_ptr) }
        })
    }

    pub fn connect_timeout(&mut self, timeout: Option<Duration>) -> &mut Self {
        let millis = timeout.map(|d| d.as_millis() as u64);
        self.apply(|ptr| {
            let millis_ptr = millis.as_ref().map_or(std::ptr::null(), |m| m as *const u64);
            unsafe { ffi::client_builder_connect_timeout(ptr, millis_ptr) }
        })
    }

    pub fn pool_idle_timeout(&mut self, timeout: Option<Duration>) -> &mut Self {
        let millis = timeout.map(|d| d.as_millis() as u64);
        self.apply(|ptr| {
            let millis_ptr = millis.as_ref().map_or(std::ptr::null(), |m| m as *const u64);
            unsafe { ffi::client_builder_pool_idle_timeout(ptr, millis_ptr) }
        })
    }

    pub fn pool_max_idle_per_host(&mut self, max: usize) -> &mut Self {
        self.apply(|ptr| unsafe { ffi::client_builder_pool_max_idle_per_host(ptr, max) })
    }

    pub fn http1_title_case_headers(&mut self) -> &mut Self {
        self.apply(|ptr| unsafe { ffi::client_builder_http1_title_case_headers(ptr) })
    }

    pub fn http1_allow_obsolete_multiline_headers_in_responses(
        &mut self,
        value: bool,
    ) -> &mut Self {
        self.apply(|ptr| unsafe {
            ffi::client_builder_http1_allow_obsolete_multiline_headers_in_responses(ptr, value)
        })
    }

    pub fn http1_only(&mut self) -> &mut Self {
        self.apply(|ptr| unsafe { ffi::client_builder_http1_only(ptr) })
    }

    pub fn http09_responses(&mut self) -> &mut Self {
        self.apply(|ptr| unsafe { ffi::client_builder_http09_responses(ptr) })
    }

    pub fn http2_prior_knowledge(&mut self) -> &mut Self {
        self.apply(|ptr| unsafe { ffi::client_builder_http2_prior_knowledge(ptr) })
    }

    pub fn http2_initial_stream_window_size(&mut self, size: Option<u32>) -> &mut Self {
        self.apply(|ptr| {
            let size_ptr = size.as_ref().map_or(std::ptr::null(), |s| s as *const u32);
            unsafe { ffi::client_builder_http2_initial_stream_window_size(ptr, size_ptr) }
        })
    }

    pub fn http2_initial_connection_window_size(&mut self, size: Option<u32>) -> &mut Self {
        self.apply(|ptr| {
            let size_ptr = size.as_ref().map_or(std::ptr::null(), |s| s as *const u32);
            unsafe { ffi::client_builder_http2_initial_connection_window_size(ptr, size_ptr) }
        })
    }

    pub fn http2_adaptive_window(&mut self, enable: bool) -> &mut Self {
        self.apply(|ptr| unsafe { ffi::client_builder_http2_adaptive_window(ptr, enable) })
    }

    pub fn http2_max_frame_size(&mut self, size: Option<u32>) -> &mut Self {
        self.apply(|ptr| {
            let size_ptr = size.as_ref().map_or(std::ptr::null(), |s| s as *const u32);
            unsafe { ffi::client_builder_http2_max_frame_size(ptr, size_ptr) }
        })
    }

    pub fn tcp_nodelay(&mut self, enable: bool) -> &mut Self {
        self.apply(|ptr| unsafe { ffi::client_builder_tcp_nodelay(ptr, enable) })
    }

    pub fn tcp_keepalive(&mut self, interval: Option<Duration>) -> &mut Self {
        let millis = interval.map(|d| d.as_millis() as u64);
        self.apply(|ptr| {
            let millis_ptr = millis.as_ref().map_or(std::ptr::null(), |m| m as *const u64);
            unsafe { ffi::client_builder_tcp_keepalive(ptr, millis_ptr) }
        })
    }

    pub fn local_address(&mut self, address: IpAddr) -> &mut Self {
        let address = match c_string(&address.to_string()) {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        self.apply(|ptr| unsafe { ffi::client_builder_local_address(ptr, address.as_ptr()) })
    }

    /// Trust an additional root certificate from a PEM file.
    pub fn add_root_certificate(&mut self, cert_path: &Path) -> &mut Self {
        let path = match cert_path.to_str() {
            Some(p) => p,
            None => {
                return self.fail(HttpError::new(
                    crate::error::ErrorKind::CharConversion,
                    "certificate path is not valid UTF-8",
                ))
            }
        };
        let path = match c_string(path) {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        self.apply(|ptr| unsafe { ffi::client_builder_add_root_certificate(ptr, path.as_ptr()) })
    }

    pub fn tls_built_in_root_certs(&mut self, enable: bool) -> &mut Self {
        self.apply(|ptr| unsafe { ffi::client_builder_tls_built_in_root_certs(ptr, enable) })
    }

    pub fn danger_accept_invalid_certs(&mut self, accept: bool) -> &mut Self {
        self.apply(|ptr| unsafe { ffi::client_builder_danger_accept_invalid_certs(ptr, accept) })
    }

    pub fn tls_sni(&mut self, enable: bool) -> &mut Self {
        self.apply(|ptr| unsafe { ffi::client_builder_tls_sni(ptr, enable) })
    }

    /// Minimum TLS version: "1.0", "1.1", "1.2" or "1.3".
    pub fn min_tls_version(&mut self, version: &str) -> &mut Self {
        let version = match c_string(version) {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        self.apply(|ptr| unsafe { ffi::client_builder_min_tls_version(ptr, version.as_ptr()) })
    }

    /// Maximum TLS version: "1.0", "1.1", "1.2" or "1.3".
    pub fn max_tls_version(&mut self, version: &str) -> &mut Self {
        let version = match c_string(version) {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        self.apply(|ptr| unsafe { ffi::client_builder_max_tls_version(ptr, version.as_ptr()) })
    }

    pub fn https_only(&mut self, enable: bool) -> &mut Self {
        self.apply(|ptr| unsafe { ffi::client_builder_https_only(ptr, enable) })
    }

    /// Override address resolution for `domain`; the port of `addr` is
    /// replaced by the request's port at connect time.
    pub fn resolve(&mut self, domain: &str, addr: SocketAddr) -> &mut Self {
        let domain = match c_string(domain) {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        let addr = match c_string(&addr.to_string()) {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        self.apply(|ptr| unsafe {
            ffi::client_builder_resolve(ptr, domain.as_ptr(), addr.as_ptr())
        })
    }

    pub fn use_rustls(&mut self) -> &mut Self {
        self.apply(|ptr| unsafe { ffi::client_builder_use_rustls(ptr) })
    }

    pub fn use_native_tls(&mut self) -> &mut Self {
        self.apply(|ptr| unsafe { ffi::client_builder_use_native_tls(ptr) })
    }

    /// Terminal: build the client. Consumes the handle unconditionally; a
    /// second call fails safely. An invalidated chain reports its first
    /// recorded error.
    pub fn build(&mut self) -> Result<Client, HttpError> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        let ptr = self.handle.take();
        if ptr.is_null() {
            return Err(HttpError::consumed("client builder"));
        }
        let client = unsafe { ffi::client_builder_build_client(ptr) };
        if client.is_null() {
            let err = HttpError::fetch();
            self.err = Some(err.clone());
            Err(err)
        } else {
            Ok(Client {
                handle: Handle::new(client),
            })
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ClientBuilder {
    fn drop(&mut self) {
        if self.handle.is_live() {
            unsafe { ffi::client_builder_destroy(self.handle.take()) }
        }
    }
}

/// A built client. Issuing a request never touches the client handle beyond
/// reading it, so independent requests may run from several threads.
#[derive(Debug)]
pub struct Client {
    handle: Handle<ffi::Client>,
}

// The boundary only reads the client handle after build; request state lives
// in per-request handles.
unsafe impl Send for Client {}
unsafe impl Sync for Client {}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    fn start(
        &self,
        url: &str,
        f: unsafe extern "C" fn(*mut ffi::Client, *const c_char) -> *mut ffi::RequestBuilder,
    ) -> RequestBuilder {
        let client_ptr = match self.handle.get() {
            Some(p) => p,
            None => return RequestBuilder::failed(HttpError::consumed("client")),
        };
        let url = match c_string(url) {
            Ok(v) => v,
            Err(e) => return RequestBuilder::failed(e),
        };
        let ptr = unsafe { f(client_ptr, url.as_ptr()) };
        if ptr.is_null() {
            RequestBuilder::failed(HttpError::fetch())
        } else {
            RequestBuilder::from_raw(ptr)
        }
    }

    /// Start a GET request. URL problems surface on the returned builder.
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.start(url, ffi::client_get)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.start(url, ffi::client_post)
    }

    pub fn put(&self, url: &str) -> RequestBuilder {
        self.start(url, ffi::client_put)
    }

    pub fn patch(&self, url: &str) -> RequestBuilder {
        self.start(url, ffi::client_patch)
    }

    pub fn delete(&self, url: &str) -> RequestBuilder {
        self.start(url, ffi::client_delete)
    }

    pub fn head(&self, url: &str) -> RequestBuilder {
        self.start(url, ffi::client_head)
    }

    /// Start a request with an arbitrary method name.
    pub fn request(&self, method: &str, url: &str) -> RequestBuilder {
        let client_ptr = match self.handle.get() {
            Some(p) => p,
            None => return RequestBuilder::failed(HttpError::consumed("client")),
        };
        let method = match c_string(method) {
            Ok(v) => v,
            Err(e) => return RequestBuilder::failed(e),
        };
        let url = match c_string(url) {
            Ok(v) => v,
            Err(e) => return RequestBuilder::failed(e),
        };
        let ptr = unsafe { ffi::client_request(client_ptr, method.as_ptr(), url.as_ptr()) };
        if ptr.is_null() {
            RequestBuilder::failed(HttpError::fetch())
        } else {
            RequestBuilder::from_raw(ptr)
        }
    }

    /// Execute a built request. The request handle is consumed
    /// unconditionally; the client stays usable.
    pub fn execute(&self, mut request: Request) -> Result<Response, HttpError> {
        let client_ptr = self
            .handle
            .get()
            .ok_or_else(|| HttpError::consumed("client"))?;
        let request_ptr = request.detach();
        if request_ptr.is_null() {
            return Err(HttpError::consumed("request"));
        }
        let response = unsafe { ffi::client_execute(client_ptr, request_ptr) };
        if response.is_null() {
            Err(HttpError::fetch())
        } else {
            Ok(Response::from_raw(response))
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if self.handle.is_live() {
            unsafe { ffi::client_destroy(self.handle.take()) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn chain_builds_with_configuration() {
        let mut builder = ClientBuilder::new();
        builder
            .timeout(Some(Duration::from_millis(1000)))
            .user_agent("granchio-test")
            .redirect(5)
            .tcp_nodelay(true);
        assert!(builder.error().is_none());
        let client = builder.build().unwrap();
        drop(client);
    }

    #[test]
    fn failure_invalidates_the_chain() {
        let mut builder = ClientBuilder::new();
        builder.min_tls_version("9.9");
        let first = builder.error().cloned().unwrap();
        assert_eq!(first.kind(), ErrorKind::Builder);
        // Later mutations are no-ops and the first error is kept.
        builder.user_agent("ignored").redirect(2);
        assert_eq!(builder.error().unwrap().kind(), ErrorKind::Builder);
        assert_eq!(builder.error().unwrap().message(), first.message());
        let err = builder.build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Builder);
        // Still failing on a second terminal call.
        assert!(builder.build().is_err());
    }

    #[test]
    fn build_twice_fails_safely() {
        let mut builder = ClientBuilder::new();
        let client = builder.build().unwrap();
        let err = builder.build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandleNull);
        drop(client);
    }

    #[test]
    fn invalid_url_poisons_the_request_builder() {
        let client = ClientBuilder::new().build().unwrap();
        let mut rb = client.get("not a url");
        assert_eq!(rb.error().unwrap().kind(), ErrorKind::Builder);
        let err = rb.send().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Builder);
    }

    #[test]
    fn default_headers_transfers_ownership() {
        let mut headers = HeaderMap::new().unwrap();
        headers.insert("x-default", "yes").unwrap();
        let mut builder = ClientBuilder::new();
        builder.default_headers(headers);
        assert!(builder.error().is_none());
        assert!(builder.build().is_ok());
    }

    #[test]
    fn detached_header_map_is_rejected_without_consuming_the_chain() {
        let mut headers = HeaderMap::new().unwrap();
        let raw = headers.detach();
        unsafe { granchio_ffi::header_map_destroy(raw) };
        let mut builder = ClientBuilder::new();
        builder.default_headers(headers);
        assert_eq!(builder.error().unwrap().kind(), ErrorKind::HandleNull);
    }
}
