/*
 * proxy.rs
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

//! Proxy configuration, handed into `ClientBuilder::proxy`.

use granchio_ffi as ffi;

use crate::error::{c_string, HttpError};
use crate::handle::Handle;

#[derive(Debug)]
pub struct Proxy {
    handle: Handle<ffi::Proxy>,
}

impl Proxy {
    fn new(
        scheme: &str,
        build: unsafe extern "C" fn(*const libc::c_char) -> *mut ffi::Proxy,
    ) -> Result<Proxy, HttpError> {
        let scheme = c_string(scheme)?;
        let ptr = unsafe { build(scheme.as_ptr()) };
        if ptr.is_null() {
            Err(HttpError::fetch())
        } else {
            Ok(Self {
                handle: Handle::new(ptr),
            })
        }
    }

    /// Proxy HTTP traffic through `scheme` (e.g. "http://127.0.0.1:3128").
    pub fn http(scheme: &str) -> Result<Proxy, HttpError> {
        Self::new(scheme, ffi::proxy_http)
    }

    /// Proxy HTTPS traffic.
    pub fn https(scheme: &str) -> Result<Proxy, HttpError> {
        Self::new(scheme, ffi::proxy_https)
    }

    /// Proxy all traffic.
    pub fn all(scheme: &str) -> Result<Proxy, HttpError> {
        Self::new(scheme, ffi::proxy_all)
    }

    pub(crate) fn live_ptr(&self) -> Option<*mut ffi::Proxy> {
        self.handle.get()
    }

    pub(crate) fn detach(&mut self) -> *mut ffi::Proxy {
        self.handle.take()
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        if self.handle.is_live() {
            unsafe { ffi::proxy_destroy(self.handle.take()) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn valid_scheme_builds() {
        let proxy = Proxy::http("http://127.0.0.1:3128").unwrap();
        assert!(proxy.live_ptr().is_some());
    }

    #[test]
    fn invalid_scheme_reports_builder_error() {
        let err = Proxy::all("::not a proxy::").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Builder);
        assert!(!err.message().is_empty());
    }
}
