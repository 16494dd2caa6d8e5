/*
 * handle.rs
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

//! Owned slot around a raw boundary handle.
//!
//! Every public wrapper in this crate owns exactly one `Handle`. A mutation
//! step takes the pointer out of the slot, passes it across the boundary and
//! puts the replacement back only if the call succeeded; a terminal operation
//! takes it out and never puts it back. An empty slot means the resource was
//! consumed or the chain was invalidated.
//!
//! `Handle` never releases anything itself: release belongs to the owning
//! wrapper's `Drop`, which calls the matching `*_destroy` exactly once on a
//! live pointer and nothing on an empty slot.

use std::ptr;

pub(crate) struct Handle<T> {
    ptr: *mut T,
}

impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle").field("ptr", &self.ptr).finish()
    }
}

impl<T> Handle<T> {
    /// Wrap a raw pointer. NULL is a valid (empty) slot.
    pub(crate) fn new(ptr: *mut T) -> Self {
        Self { ptr }
    }

    pub(crate) fn is_live(&self) -> bool {
        !self.ptr.is_null()
    }

    /// Current pointer, or None if the slot is empty.
    pub(crate) fn get(&self) -> Option<*mut T> {
        if self.ptr.is_null() {
            None
        } else {
            Some(self.ptr)
        }
    }

    /// Detach: empty the slot without releasing. Returns the old pointer,
    /// which may be NULL if the slot was already empty.
    pub(crate) fn take(&mut self) -> *mut T {
        std::mem::replace(&mut self.ptr, ptr::null_mut())
    }

    /// Put a replacement pointer into the slot.
    pub(crate) fn replace(&mut self, ptr: *mut T) {
        self.ptr = ptr;
    }
}
