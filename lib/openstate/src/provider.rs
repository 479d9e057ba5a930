// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 The OpenState Authors

//! Providers let the state table run in different contexts by
//! plugging in implementations of the services it needs. Logging is
//! the only one today: a datapath embeds the table with its own log
//! sink, while unit tests print to stdout or discard.

use core::fmt;
use core::fmt::Display;

/// A logging provider provides the means to log messages to some
/// destination based on the context in which the table is running.
///
/// Logging levels are provided by [`LogLevel`]. These levels will map
/// to the underlying provider with varying degrees of success.
pub trait LogProvider: Send + Sync {
    /// Log a message at the specified level.
    fn log(&self, level: LogLevel, msg: &str);
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogLevel {
    Note,
    Warn,
    Error,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let level_s = match self {
            Self::Note => "[NOTE]",
            Self::Warn => "[WARN]",
            Self::Error => "[ERROR]",
        };
        write!(f, "{level_s}")
    }
}

#[cfg(feature = "std")]
#[derive(Clone, Copy)]
pub struct PrintlnLog;

#[cfg(feature = "std")]
impl LogProvider for PrintlnLog {
    fn log(&self, level: LogLevel, msg: &str) {
        std::println!("{level} {msg}");
    }
}

/// Drops every message.
#[derive(Clone, Copy)]
pub struct NullLog;

impl LogProvider for NullLog {
    fn log(&self, _level: LogLevel, _msg: &str) {}
}

#[cfg(any(feature = "test-help", test))]
use alloc::string::String;

/// Keeps every message in memory, for inspection by tests.
#[cfg(any(feature = "test-help", test))]
#[derive(Default)]
pub struct RecordLog {
    msgs: crate::ddi::sync::KMutex<alloc::vec::Vec<(LogLevel, String)>>,
}

#[cfg(any(feature = "test-help", test))]
impl RecordLog {
    pub fn take(&self) -> alloc::vec::Vec<(LogLevel, String)> {
        core::mem::take(&mut *self.msgs.lock())
    }
}

#[cfg(any(feature = "test-help", test))]
impl LogProvider for RecordLog {
    fn log(&self, level: LogLevel, msg: &str) {
        self.msgs.lock().push((level, msg.into()));
    }
}

#[cfg(any(feature = "test-help", test))]
impl LogProvider for alloc::sync::Arc<RecordLog> {
    fn log(&self, level: LogLevel, msg: &str) {
        (**self).log(level, msg)
    }
}
