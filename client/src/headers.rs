/*
 * headers.rs
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

//! Owned header collection.
//!
//! Mutations act in place on the boundary collection and report success;
//! queries copy the requested data out of boundary leaves. Key lookup is
//! case-insensitive. Passing a map into a builder transfers ownership across
//! the boundary: the wrapper detaches exactly when the call succeeds.

use granchio_ffi as ffi;

use crate::error::{c_string, HttpError};
use crate::handle::Handle;
use crate::leaf::RStr;

pub struct HeaderMap {
    handle: Handle<ffi::HeaderMap>,
}

impl HeaderMap {
    /// Create an empty map.
    pub fn new() -> Result<HeaderMap, HttpError> {
        let ptr = unsafe { ffi::new_header_map() };
        match ptr.is_null() {
            true => Err(HttpError::fetch()),
            false => Ok(Self {
                handle: Handle::new(ptr),
            }),
        }
    }

    /// Wrap a map handle received from the boundary (response headers).
    pub(crate) fn from_raw(ptr: *mut ffi::HeaderMap) -> Option<HeaderMap> {
        if ptr.is_null() {
            None
        } else {
            Some(Self {
                handle: Handle::new(ptr),
            })
        }
    }

    pub(crate) fn live_ptr(&self) -> Option<*mut ffi::HeaderMap> {
        self.handle.get()
    }

    /// Detach the handle after the boundary took ownership of it.
    pub(crate) fn detach(&mut self) -> *mut ffi::HeaderMap {
        self.handle.take()
    }

    fn ptr(&self) -> Result<*mut ffi::HeaderMap, HttpError> {
        self.handle
            .get()
            .ok_or_else(|| HttpError::consumed("header map"))
    }

    /// Insert a value, replacing previous values for the key.
    pub fn insert(&mut self, key: &str, value: &str) -> Result<(), HttpError> {
        let ptr = self.ptr()?;
        let key = c_string(key)?;
        let value = c_string(value)?;
        if unsafe { ffi::header_map_insert(ptr, key.as_ptr(), value.as_ptr()) } {
            Ok(())
        } else {
            Err(HttpError::fetch())
        }
    }

    /// Append a value, keeping previous values for the key.
    pub fn append(&mut self, key: &str, value: &str) -> Result<(), HttpError> {
        let ptr = self.ptr()?;
        let key = c_string(key)?;
        let value = c_string(value)?;
        if unsafe { ffi::header_map_append(ptr, key.as_ptr(), value.as_ptr()) } {
            Ok(())
        } else {
            Err(HttpError::fetch())
        }
    }

    /// Remove all values for the key.
    pub fn remove(&mut self, key: &str) -> Result<(), HttpError> {
        let ptr = self.ptr()?;
        let key = c_string(key)?;
        if unsafe { ffi::header_map_remove(ptr, key.as_ptr()) } {
            Ok(())
        } else {
            Err(HttpError::fetch())
        }
    }

    pub fn clear(&mut self) -> Result<(), HttpError> {
        let ptr = self.ptr()?;
        unsafe { ffi::header_map_clear(ptr) };
        Ok(())
    }

    pub fn reserve(&mut self, additional: u32) -> Result<(), HttpError> {
        let ptr = self.ptr()?;
        unsafe { ffi::header_map_reserve(ptr, additional) };
        Ok(())
    }

    /// First value for the key, or None if absent (or the key is not a valid
    /// header name).
    pub fn get(&self, key: &str) -> Option<String> {
        let ptr = self.handle.get()?;
        let key = c_string(key).ok()?;
        let leaf = unsafe { ffi::header_map_get(ptr, key.as_ptr()) };
        RStr::from_raw(leaf).map(RStr::into_string)
    }

    /// All values for the key, in insertion order.
    pub fn get_all(&self, key: &str) -> Vec<String> {
        let Some(ptr) = self.handle.get() else {
            return Vec::new();
        };
        let Ok(key) = c_string(key) else {
            return Vec::new();
        };
        let leaf = unsafe { ffi::header_map_get_all(ptr, key.as_ptr()) };
        match RStr::from_raw(leaf) {
            Some(joined) if !joined.as_str().is_empty() => {
                joined.as_str().split(';').map(str::to_string).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        let Some(ptr) = self.handle.get() else {
            return false;
        };
        let Ok(key) = c_string(key) else {
            return false;
        };
        unsafe { ffi::header_map_contains_key(ptr, key.as_ptr()) }
    }

    /// All distinct keys (lower-cased by the boundary).
    pub fn keys(&self) -> Vec<String> {
        let Some(ptr) = self.handle.get() else {
            return Vec::new();
        };
        let leaf = unsafe { ffi::header_map_keys(ptr) };
        match RStr::from_raw(leaf) {
            Some(joined) if !joined.as_str().is_empty() => {
                joined.as_str().split(';').map(str::to_string).collect()
            }
            _ => Vec::new(),
        }
    }

    /// All values across all keys.
    pub fn values(&self) -> Vec<String> {
        let Some(ptr) = self.handle.get() else {
            return Vec::new();
        };
        let leaf = unsafe { ffi::header_map_values(ptr) };
        match RStr::from_raw(leaf) {
            Some(joined) if !joined.as_str().is_empty() => {
                joined.as_str().split(';').map(str::to_string).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Total number of values (>= number of keys).
    pub fn len(&self) -> usize {
        let Some(ptr) = self.handle.get() else {
            return 0;
        };
        let len = unsafe { ffi::header_map_len(ptr) };
        if len < 0 {
            0
        } else {
            len as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct keys.
    pub fn keys_len(&self) -> usize {
        let Some(ptr) = self.handle.get() else {
            return 0;
        };
        let len = unsafe { ffi::header_map_keys_len(ptr) };
        if len < 0 {
            0
        } else {
            len as usize
        }
    }

    pub fn capacity(&self) -> usize {
        let Some(ptr) = self.handle.get() else {
            return 0;
        };
        let cap = unsafe { ffi::header_map_capacity(ptr) };
        if cap < 0 {
            0
        } else {
            cap as usize
        }
    }
}

impl Drop for HeaderMap {
    fn drop(&mut self) {
        if self.handle.is_live() {
            unsafe { ffi::header_map_destroy(self.handle.take()) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn insert_get_contains_remove() {
        let mut map = HeaderMap::new().unwrap();
        map.insert("Content-Type", "text/plain").unwrap();
        assert_eq!(map.get("content-type").as_deref(), Some("text/plain"));
        assert!(map.contains_key("CONTENT-TYPE"));
        assert_eq!(map.len(), 1);
        map.remove("content-type").unwrap();
        assert!(map.is_empty());
        assert_eq!(map.get("content-type"), None);
    }

    #[test]
    fn append_keeps_all_values() {
        let mut map = HeaderMap::new().unwrap();
        map.append("accept", "text/html").unwrap();
        map.append("accept", "application/json").unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.keys_len(), 1);
        assert_eq!(map.get_all("accept"), vec!["text/html", "application/json"]);
        assert_eq!(map.keys(), vec!["accept"]);
    }

    #[test]
    fn invalid_value_fails_and_leaves_map_unchanged() {
        let mut map = HeaderMap::new().unwrap();
        let err = map.insert("x-bad", "line\nbreak").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Builder);
        assert!(map.is_empty());
    }

    #[test]
    fn detached_map_reports_consumed() {
        let mut map = HeaderMap::new().unwrap();
        let ptr = map.detach();
        assert!(!ptr.is_null());
        let err = map.insert("k", "v").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandleNull);
        assert_eq!(map.get("k"), None);
        assert_eq!(map.len(), 0);
        // The detached handle is released manually here since no wrapper owns it.
        unsafe { ffi::header_map_destroy(ptr) };
    }

    #[test]
    fn clear_and_reserve() {
        let mut map = HeaderMap::new().unwrap();
        map.reserve(8).unwrap();
        assert!(map.capacity() >= 8);
        map.insert("a", "1").unwrap();
        map.clear().unwrap();
        assert!(map.is_empty());
    }
}
