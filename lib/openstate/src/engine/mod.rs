// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 The OpenState Authors

//! The state table engine.

pub mod key;
pub mod match_fields;
pub mod state_table;

pub use key::KeyExtractor;
pub use key::KeyHex;
pub use key::StateKey;
pub use match_fields::MatchFields;
pub use match_fields::PacketMatch;
pub use state_table::KeySource;
pub use state_table::StateEntryRef;
pub use state_table::StateTable;
