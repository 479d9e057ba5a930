// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 The OpenState Authors

use super::API_VERSION;
use super::ExtractorSide;
use super::oxm::OxmField;
use alloc::string::String;
use alloc::string::ToString;
use alloc::vec::Vec;
use core::fmt;
use core::fmt::Display;
use libc::c_int;
use serde::Deserialize;
use serde::Serialize;

/// A state modification command, as sent by a control agent to the
/// datapath.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum StateModCmd {
    /// Replace the read or write key extractor of the table.
    SetExtractor(SetExtractorReq),
    /// Install or update the state of a single flow.
    SetFlowState(SetFlowStateReq),
    /// Remove the state of a single flow.
    DelFlowState(DelFlowStateReq),
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SetExtractorReq {
    pub side: ExtractorSide,
    /// The fields, in key order.
    pub fields: Vec<OxmField>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SetFlowStateReq {
    /// The raw flow key; must be exactly `MAX_STATE_KEY_LEN` bytes.
    pub key: Vec<u8>,
    pub state: u32,
    /// Delay before `to_state` takes effect, in microseconds.
    pub timeout_us: u32,
    /// The delayed target state; `STATE_DEFAULT` arms nothing.
    pub to_state: u32,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DelFlowStateReq {
    pub key: Vec<u8>,
}

/// The envelope a [`StateModCmd`] travels in.
///
/// The version lets both sides detect that they were built against
/// different revisions of this API.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StateModMsg {
    pub api_version: u64,
    pub cmd: StateModCmd,
}

impl StateModCmd {
    /// Serialize this command for transport.
    pub fn encode(&self) -> Result<Vec<u8>, OpenStateError> {
        let msg = StateModMsg { api_version: API_VERSION, cmd: self.clone() };
        postcard::to_allocvec(&msg)
            .map_err(|e| OpenStateError::SerCmdReq(e.to_string()))
    }

    /// Deserialize a command produced by [`StateModCmd::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, OpenStateError> {
        let msg: StateModMsg = postcard::from_bytes(bytes)
            .map_err(|e| OpenStateError::DeserCmdReq(e.to_string()))?;

        if msg.api_version != API_VERSION {
            return Err(OpenStateError::BadApiVersion {
                sender: msg.api_version,
                receiver: API_VERSION,
            });
        }

        Ok(msg.cmd)
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum OpenStateError {
    BadApiVersion {
        sender: u64,
        receiver: u64,
    },
    /// A raw key was not exactly `MAX_STATE_KEY_LEN` bytes.
    BadKeyLen {
        len: usize,
        expected: usize,
    },
    DeserCmdReq(String),
    /// The operation would violate a table invariant, such as
    /// removing the default entry.
    InvalidArgument(String),
    InvalidCfg(String),
    /// The extractor's fields could concatenate past the key width.
    KeyTooLong {
        len: usize,
        max: usize,
    },
    SerCmdReq(String),
    TooManyFields {
        count: usize,
        max: usize,
    },
}

impl OpenStateError {
    /// Convert to an errno value.
    pub fn to_errno(&self) -> c_int {
        use libc::*;

        match self {
            Self::BadApiVersion { .. } => EPROTO,
            Self::BadKeyLen { .. } => EINVAL,
            Self::DeserCmdReq(_) => ENOMSG,
            Self::InvalidArgument(_) => EINVAL,
            Self::InvalidCfg(_) => EINVAL,
            Self::KeyTooLong { .. } => E2BIG,
            Self::SerCmdReq(_) => ENOMSG,
            Self::TooManyFields { .. } => E2BIG,
        }
    }
}

impl Display for OpenStateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::BadApiVersion { sender, receiver } => write!(
                f,
                "API version mismatch: sender {}, receiver {}",
                sender, receiver
            ),
            Self::BadKeyLen { len, expected } => {
                write!(f, "bad key length: {} (expected {})", len, expected)
            }
            Self::DeserCmdReq(msg) => {
                write!(f, "failed to deserialize command: {}", msg)
            }
            Self::InvalidArgument(msg) => {
                write!(f, "invalid argument: {}", msg)
            }
            Self::InvalidCfg(msg) => write!(f, "invalid config: {}", msg),
            Self::KeyTooLong { len, max } => write!(
                f,
                "extracted key may reach {} bytes, max is {}",
                len, max
            ),
            Self::SerCmdReq(msg) => {
                write!(f, "failed to serialize command: {}", msg)
            }
            Self::TooManyFields { count, max } => {
                write!(f, "extractor lists {} fields, max is {}", count, max)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for OpenStateError {}

/// An armed deferred transition.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PendingTransitionDump {
    pub to_state: u32,
    /// Microseconds until the transition may fire; zero once the
    /// deadline has passed.
    pub remaining_us: u64,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StateEntryDump {
    pub key: Vec<u8>,
    pub state: u32,
    pub pending: Option<PendingTransitionDump>,
}

/// The contents of a state table, for use in debugging or
/// administrative purposes.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DumpStateTableResp {
    pub name: String,
    pub read_fields: Vec<OxmField>,
    pub write_fields: Vec<OxmField>,
    /// The state reported for packets which match no entry.
    pub default_state: u32,
    pub entries: Vec<StateEntryDump>,
}
