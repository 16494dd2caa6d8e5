/*
 * leaf.rs
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

//! Owned views over the two boundary leaf kinds.
//!
//! The boundary allocates two distinct leaf buffers — UTF-8 strings
//! (`RString`, released with `free_r_string`) and raw bytes (`ByteBuffer`,
//! released with `free_byte_buffer`). Releasing one through the other's path
//! is undefined behaviour at the C level; here each leaf kind gets its own
//! wrapper type so the wrong pairing does not typecheck.

use granchio_ffi as ffi;

/// Owned UTF-8 leaf.
pub(crate) struct RStr {
    handle: *mut ffi::RString,
}

impl RStr {
    /// Wrap a leaf returned by the boundary. None for NULL.
    pub(crate) fn from_raw(handle: *mut ffi::RString) -> Option<Self> {
        if handle.is_null() {
            None
        } else {
            Some(Self { handle })
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        unsafe {
            let len = ffi::r_string_len(self.handle) as usize;
            if len == 0 {
                return "";
            }
            let bytes = std::slice::from_raw_parts(ffi::r_string_bytes(self.handle), len);
            std::str::from_utf8(bytes).unwrap_or("")
        }
    }

    pub(crate) fn into_string(self) -> String {
        self.as_str().to_string()
    }
}

impl Drop for RStr {
    fn drop(&mut self) {
        unsafe { ffi::free_r_string(self.handle) }
    }
}

/// Owned byte leaf.
pub(crate) struct RBytes {
    handle: *mut ffi::ByteBuffer,
}

impl RBytes {
    pub(crate) fn from_raw(handle: *mut ffi::ByteBuffer) -> Option<Self> {
        if handle.is_null() {
            None
        } else {
            Some(Self { handle })
        }
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        unsafe {
            let len = ffi::bytes_len(self.handle) as usize;
            if len == 0 {
                return &[];
            }
            std::slice::from_raw_parts(ffi::bytes_content(self.handle), len)
        }
    }

    pub(crate) fn into_vec(self) -> Vec<u8> {
        self.as_slice().to_vec()
    }
}

impl Drop for RBytes {
    fn drop(&mut self) {
        unsafe { ffi::free_byte_buffer(self.handle) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::ptr;

    #[test]
    fn r_str_reads_and_releases_a_boundary_leaf() {
        unsafe {
            let map = ffi::new_header_map();
            let key = CString::new("content-type").unwrap();
            let value = CString::new("text/plain").unwrap();
            assert!(ffi::header_map_insert(map, key.as_ptr(), value.as_ptr()));
            let leaf = RStr::from_raw(ffi::header_map_get(map, key.as_ptr())).unwrap();
            assert_eq!(leaf.as_str(), "text/plain");
            assert_eq!(leaf.into_string(), "text/plain");
            ffi::header_map_destroy(map);
        }
    }

    #[test]
    fn null_leaves_are_absent() {
        assert!(RStr::from_raw(ptr::null_mut()).is_none());
        assert!(RBytes::from_raw(ptr::null_mut()).is_none());
    }
}
