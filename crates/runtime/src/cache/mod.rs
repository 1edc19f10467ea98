// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Crash-safe, process-exclusive engine cache.
//!
//! - [`CacheKey`]: content fingerprint naming an engine.
//! - [`CacheStore`]: checksummed envelope files, written atomically.
//! - [`CacheLock`]: the exclusive build lock for one key.

mod key;
mod lock;
mod store;

pub use key::CacheKey;
pub use lock::{lock_path_for, CacheLock};
pub use store::{CacheEntry, CacheStore, ENVELOPE_MAGIC, ENVELOPE_VERSION, HEADER_LEN};
