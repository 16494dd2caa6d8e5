/*
 * response.rs
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

//! Received response.
//!
//! Metadata accessors borrow the handle; `text` and `bytes` take the response
//! by value because the boundary consumes the handle to drain the body. The
//! two body forms come back through the two distinct leaf kinds and their
//! distinct release paths.

use granchio_ffi as ffi;

use crate::error::HttpError;
use crate::handle::Handle;
use crate::headers::HeaderMap;
use crate::leaf::{RBytes, RStr};

#[derive(Debug)]
pub struct Response {
    handle: Handle<ffi::Response>,
}

impl Response {
    pub(crate) fn from_raw(ptr: *mut ffi::Response) -> Response {
        Self {
            handle: Handle::new(ptr),
        }
    }

    fn ptr(&self) -> *mut ffi::Response {
        self.handle.get().unwrap_or(std::ptr::null_mut())
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        unsafe { ffi::response_status(self.ptr()) }
    }

    /// Independent copy of the response headers.
    pub fn headers(&self) -> Result<HeaderMap, HttpError> {
        let ptr = unsafe { ffi::response_headers(self.ptr()) };
        HeaderMap::from_raw(ptr).ok_or_else(HttpError::fetch)
    }

    /// Negotiated HTTP version, e.g. "HTTP/1.1".
    pub fn version(&self) -> Result<String, HttpError> {
        let leaf = unsafe { ffi::response_version(self.ptr()) };
        RStr::from_raw(leaf)
            .map(RStr::into_string)
            .ok_or_else(HttpError::fetch)
    }

    /// Final URL after redirects.
    pub fn url(&self) -> Result<String, HttpError> {
        let leaf = unsafe { ffi::response_url(self.ptr()) };
        RStr::from_raw(leaf)
            .map(RStr::into_string)
            .ok_or_else(HttpError::fetch)
    }

    /// Peer address, when the transport exposes it.
    pub fn remote_addr(&self) -> Option<String> {
        let leaf = unsafe { ffi::response_remote_addr(self.ptr()) };
        RStr::from_raw(leaf).map(RStr::into_string)
    }

    /// Body length when declared by the peer.
    pub fn content_length(&self) -> Option<u64> {
        let len = unsafe { ffi::response_content_length(self.ptr()) };
        if len < 0 {
            None
        } else {
            Some(len as u64)
        }
    }

    /// Read the next chunk of the body into `buf`, blocking. Returns 0 at the
    /// end of the body.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, HttpError> {
        let n = unsafe { ffi::response_read(self.ptr(), buf.as_mut_ptr(), buf.len()) };
        if n < 0 {
            Err(HttpError::fetch())
        } else {
            Ok(n as usize)
        }
    }

    /// Decode the whole body as text. Consumes the response.
    pub fn text(mut self) -> Result<String, HttpError> {
        let ptr = self.handle.take();
        let leaf = unsafe { ffi::response_text(ptr) };
        RStr::from_raw(leaf)
            .map(RStr::into_string)
            .ok_or_else(HttpError::fetch)
    }

    /// Read the whole body as bytes. Consumes the response.
    pub fn bytes(mut self) -> Result<Vec<u8>, HttpError> {
        let ptr = self.handle.take();
        let leaf = unsafe { ffi::response_bytes(ptr) };
        RBytes::from_raw(leaf)
            .map(RBytes::into_vec)
            .ok_or_else(HttpError::fetch)
    }
}

impl Drop for Response {
    fn drop(&mut self) {
        if self.handle.is_live() {
            unsafe { ffi::response_destroy(self.handle.take()) }
        }
    }
}
