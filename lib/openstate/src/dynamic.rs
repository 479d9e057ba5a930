// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 The OpenState Authors

//! A lock-protected, wholesale-replaceable value.
//!
//! Readers take a [`Snapshot`]: an `Arc` of the value current at the
//! time of the load. Replacing the value stores a new `Arc` and bumps
//! the epoch; it never mutates a value some reader still holds. The
//! state table keeps its key extractors in a `Dynamic` so a packet
//! mid-lookup finishes with the extractor it started with.

use crate::ddi::sync::KRwLock;
use alloc::sync::Arc;
use core::fmt::Debug;
use core::ops::Deref;
use core::sync::atomic::AtomicU64;
use core::sync::atomic::Ordering;

pub struct Dynamic<T> {
    inner: KRwLock<Arc<T>>,
    epoch: AtomicU64,
}

#[derive(Debug)]
pub struct Snapshot<T> {
    pub value: Arc<T>,
    pub epoch: u64,
}

impl<T> From<T> for Dynamic<T> {
    fn from(value: T) -> Self {
        Self { inner: KRwLock::new(value.into()), epoch: AtomicU64::default() }
    }
}

impl<T> Dynamic<T> {
    pub fn store(&self, value: T) {
        let mut inner = self.inner.write();
        *inner = value.into();
        _ = self.epoch.fetch_add(1, Ordering::Relaxed);
    }

    pub fn load(&self) -> Snapshot<T> {
        let value_locked = self.inner.read();
        let value = Arc::clone(&*value_locked);
        let epoch = self.epoch.load(Ordering::Relaxed);

        Snapshot { epoch, value }
    }
}

impl<T: Debug> Debug for Dynamic<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let current_val = self.load();
        write!(f, "{current_val:?}")
    }
}

impl<T> Deref for Snapshot<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
