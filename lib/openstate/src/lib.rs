// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 The OpenState Authors

//! The OpenState per-flow state table.
//!
//! A stateful extension to stateless header matching: every packet is
//! projected onto a fixed-width key, the key selects a flow state,
//! and that state is written into the packet's metadata register so
//! that later match stages can branch on it. See
//! [`engine::state_table`] for the table itself.

#![allow(clippy::len_without_is_empty)]
#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

extern crate alloc;

// Lets the engine name its own types with fully-qualified paths.
extern crate self as openstate;

pub mod api;
pub mod ddi;
pub mod dynamic;
pub mod engine;
#[cfg(feature = "std")]
pub mod print;
pub mod provider;

use alloc::boxed::Box;
use provider::LogProvider;

/// The execution context handed to a state table: the platform
/// services it may call upon.
pub struct ExecCtx {
    pub log: Box<dyn LogProvider>,
}
