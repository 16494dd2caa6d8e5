/*
 * error.rs
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

//! Structured errors for the binding layer.
//!
//! The boundary reports failure as NULL/false/negative and parks diagnostics
//! in a thread-local single slot. `HttpError::fetch` drains that slot
//! immediately after a failing call; no other code touches it, so the value
//! cannot be overwritten between the failure and the read.

use granchio_ffi as ffi;
use std::ffi::CString;
use std::fmt;

/// Mirror of the boundary's error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NoError,
    /// A consumed or never-populated handle was used.
    HandleNull,
    CharConversion,
    Builder,
    Request,
    Redirect,
    Status,
    Body,
    Decode,
    Timeout,
    Connect,
    ConnectionRefused,
    ConnectionReset,
    ConnectionAborted,
    HostUnreachable,
    Other,
}

impl ErrorKind {
    /// True for every failure to reach or keep the peer.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            ErrorKind::Connect
                | ErrorKind::ConnectionRefused
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::HostUnreachable
        )
    }
}

impl From<ffi::HttpErrorKind> for ErrorKind {
    fn from(kind: ffi::HttpErrorKind) -> Self {
        match kind {
            ffi::HttpErrorKind::NoError => ErrorKind::NoError,
            ffi::HttpErrorKind::HandleNull => ErrorKind::HandleNull,
            ffi::HttpErrorKind::CharConversion => ErrorKind::CharConversion,
            ffi::HttpErrorKind::Builder => ErrorKind::Builder,
            ffi::HttpErrorKind::Request => ErrorKind::Request,
            ffi::HttpErrorKind::Redirect => ErrorKind::Redirect,
            ffi::HttpErrorKind::Status => ErrorKind::Status,
            ffi::HttpErrorKind::Body => ErrorKind::Body,
            ffi::HttpErrorKind::Decode => ErrorKind::Decode,
            ffi::HttpErrorKind::Timeout => ErrorKind::Timeout,
            ffi::HttpErrorKind::Connect => ErrorKind::Connect,
            ffi::HttpErrorKind::ConnectionRefused => ErrorKind::ConnectionRefused,
            ffi::HttpErrorKind::ConnectionReset => ErrorKind::ConnectionReset,
            ffi::HttpErrorKind::ConnectionAborted => ErrorKind::ConnectionAborted,
            ffi::HttpErrorKind::HostUnreachable => ErrorKind::HostUnreachable,
            ffi::HttpErrorKind::Other => ErrorKind::Other,
        }
    }
}

/// Error from a binding operation: classification plus diagnostic message.
#[derive(Debug, Clone)]
pub struct HttpError {
    kind: ErrorKind,
    message: String,
}

impl HttpError {
    pub(crate) fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Error for using a wrapper whose handle was already consumed.
    pub(crate) fn consumed(what: &str) -> Self {
        Self::new(
            ErrorKind::HandleNull,
            format!("{what} has already been consumed"),
        )
    }

    /// Drain the boundary's error slot. Call only immediately after a failing
    /// boundary call on the same thread.
    pub(crate) fn fetch() -> Self {
        unsafe {
            let err = ffi::take_last_http_error();
            if err.is_null() {
                return Self::new(ErrorKind::Other, "operation failed without diagnostics");
            }
            let kind = ErrorKind::from(ffi::http_err_kind(err));
            let len = ffi::http_err_msg_len(err) as usize;
            let bytes = ffi::http_err_msg(err);
            let message = if bytes.is_null() || len == 0 {
                String::new()
            } else {
                let slice = std::slice::from_raw_parts(bytes, len);
                String::from_utf8_lossy(slice).into_owned()
            };
            ffi::http_err_destroy(err);
            Self { kind, message }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{:?}", self.kind)
        } else {
            write!(f, "{:?}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for HttpError {}

/// Convert a Rust string for the boundary. Interior NUL bytes cannot cross.
pub(crate) fn c_string(s: &str) -> Result<CString, HttpError> {
    CString::new(s).map_err(|_| {
        HttpError::new(
            ErrorKind::CharConversion,
            "string contains an interior NUL byte",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn fetch_drains_the_slot() {
        // A failed boundary call parks an error in the slot.
        let ok = unsafe { ffi::header_map_len(ptr::null_mut()) };
        assert_eq!(ok, -1);
        let err = HttpError::fetch();
        assert_eq!(err.kind(), ErrorKind::HandleNull);
        assert!(!err.message().is_empty());
        // The slot is now empty.
        let empty = HttpError::fetch();
        assert_eq!(empty.kind(), ErrorKind::Other);
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = HttpError::new(ErrorKind::Timeout, "deadline elapsed");
        assert_eq!(err.to_string(), "Timeout: deadline elapsed");
    }

    #[test]
    fn connection_family() {
        assert!(ErrorKind::ConnectionRefused.is_connection());
        assert!(ErrorKind::Connect.is_connection());
        assert!(ErrorKind::HostUnreachable.is_connection());
        assert!(!ErrorKind::Timeout.is_connection());
        assert!(!ErrorKind::Builder.is_connection());
    }

    #[test]
    fn c_string_rejects_interior_nul() {
        let err = c_string("a\0b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CharConversion);
    }
}
