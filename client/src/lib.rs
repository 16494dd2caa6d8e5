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

//! Safe binding over the granchio C FFI.
//!
//! This crate consumes the `granchio_ffi` surface the way any foreign
//! consumer must: raw handles held in owned slots, builder mutations that
//! take the handle out and put the replacement back only on success, terminal
//! operations that consume the handle exactly once, and structured errors
//! drained from the boundary's thread-local slot immediately after each
//! failing call.
//!
//! ```no_run
//! use granchio_client::ClientBuilder;
//! use std::time::Duration;
//!
//! let mut builder = ClientBuilder::new();
//! builder.timeout(Some(Duration::from_millis(1000)));
//! let client = builder.build()?;
//! let response = client.get("http://example.com/status/200").send()?;
//! assert_eq!(response.status(), 200);
//! # Ok::<(), granchio_client::HttpError>(())
//! ```

mod client;
mod error;
mod handle;
mod headers;
mod leaf;
mod proxy;
mod request;
mod response;

pub use client::{Client, ClientBuilder};
pub use error::{ErrorKind, HttpError};
pub use headers::HeaderMap;
pub use proxy::Proxy;
pub use request::{Request, RequestBuilder};
pub use response::Response;

pub use granchio_ffi::initialize_logging;
