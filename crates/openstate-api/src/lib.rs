// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 The OpenState Authors

#![no_std]
#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

#[macro_use]
extern crate alloc;

use alloc::string::String;
use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

pub mod cfg;
pub mod cmd;
pub mod oxm;

pub use cfg::*;
pub use cmd::*;
pub use oxm::*;

/// The overall version of the API. Anytime a command, dump, or field
/// identifier is added, removed, or modified, this number should
/// increment so that a control agent and the datapath can detect that
/// they disagree on the encoding of a [`StateModCmd`].
pub const API_VERSION: u64 = 1;

/// The fixed width of every state key, in bytes.
///
/// Changing this value changes the identity of every stored flow; it
/// must stay fixed for key compatibility between the control plane
/// and the datapath.
pub const MAX_STATE_KEY_LEN: usize = 48;

/// The maximum number of fields a single key extractor may list.
pub const MAX_EXTRACTION_FIELD_COUNT: usize = 6;

/// The reserved state carried by the default entry.
///
/// This is also the "no transition" marker for a delayed target
/// state: a target of `STATE_DEFAULT` never arms a transition.
pub const STATE_DEFAULT: u32 = 0;

/// Which of the two extractors of a state table a command refers to.
///
/// The read side builds the lookup key for every packet; the write
/// side builds the key used when a packet drives a state update.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ExtractorSide {
    Read = 0,
    Write = 1,
}

impl ExtractorSide {
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write)
    }
}

impl From<bool> for ExtractorSide {
    fn from(is_write_side: bool) -> Self {
        if is_write_side { Self::Write } else { Self::Read }
    }
}

impl core::str::FromStr for ExtractorSide {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "read" | "lookup" => Ok(ExtractorSide::Read),
            "write" | "update" => Ok(ExtractorSide::Write),
            _ => Err(format!("invalid extractor side: {}", s)),
        }
    }
}

impl Display for ExtractorSide {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let side = match self {
            ExtractorSide::Read => "READ",
            ExtractorSide::Write => "WRITE",
        };

        write!(f, "{}", side)
    }
}
