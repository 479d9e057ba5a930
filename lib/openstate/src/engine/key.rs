// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 The OpenState Authors

//! State keys and the extractors which build them.
//!
//! A key is the packed concatenation of the values of the extractor's
//! fields, in extractor order, zero-padded to [`MAX_STATE_KEY_LEN`].
//! A field the packet lacks contributes nothing: the next present
//! field starts where the previous one ended. The layout is therefore
//! a function of extractor order, and `[ipv4_src, tcp_src]` and
//! `[tcp_src, ipv4_src]` produce different keys for the same packet.
//!
//! Absent fields and all-zero values are indistinguishable in the
//! final key; flows differing only that way share one entry.

use super::match_fields::MatchFields;
use crate::api::MAX_EXTRACTION_FIELD_COUNT;
use crate::api::MAX_STATE_KEY_LEN;
use crate::api::OpenStateError;
use crate::api::OxmField;
use core::fmt;

type Result<T> = core::result::Result<T, OpenStateError>;

/// The identity of a flow within one state table.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StateKey([u8; MAX_STATE_KEY_LEN]);

impl StateKey {
    pub const ZERO: Self = Self([0; MAX_STATE_KEY_LEN]);

    /// Build a key from raw bytes, as supplied by a controller.
    ///
    /// # Errors
    ///
    /// The slice must be exactly [`MAX_STATE_KEY_LEN`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr = <[u8; MAX_STATE_KEY_LEN]>::try_from(bytes).map_err(|_| {
            OpenStateError::BadKeyLen {
                len: bytes.len(),
                expected: MAX_STATE_KEY_LEN,
            }
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; MAX_STATE_KEY_LEN] {
        &self.0
    }

    /// The content hash used to pick the key's bucket.
    pub fn crc32(&self) -> u32 {
        crc32fast::hash(&self.0)
    }
}

impl From<[u8; MAX_STATE_KEY_LEN]> for StateKey {
    fn from(arr: [u8; MAX_STATE_KEY_LEN]) -> Self {
        Self(arr)
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&KeyHex(&self.0), f)
    }
}

/// Displays key bytes as hex, with the trailing zero padding elided.
/// An all-zero key prints as `00`.
///
/// Dumps carry keys as plain bytes; this renders them the same way a
/// [`StateKey`] displays.
pub struct KeyHex<'a>(pub &'a [u8]);

impl fmt::Display for KeyHex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self.0.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        if used == 0 {
            return write!(f, "00");
        }
        for b in &self.0[..used] {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateKey({self})")
    }
}

/// Builds a [`StateKey`] by appending field values.
///
/// The builder owns the write offset. It never writes past the end of
/// the key; a value which does not fit is cut short, in every build
/// profile. Extractors are validated so that this never happens in
/// practice.
#[derive(Clone, Debug)]
pub(crate) struct KeyBuilder {
    buf: [u8; MAX_STATE_KEY_LEN],
    off: usize,
}

impl KeyBuilder {
    pub(crate) fn new() -> Self {
        Self { buf: [0; MAX_STATE_KEY_LEN], off: 0 }
    }

    /// Append as much of `val` as fits at the current offset and
    /// advance past it.
    pub(crate) fn push(&mut self, val: &[u8]) {
        let n = val.len().min(MAX_STATE_KEY_LEN - self.off);
        self.buf[self.off..self.off + n].copy_from_slice(&val[..n]);
        self.off += n;
    }

    pub(crate) fn finish(self) -> StateKey {
        StateKey(self.buf)
    }
}

/// An ordered list of fields projected into a [`StateKey`].
///
/// The only way to build one is [`KeyExtractor::new`], which refuses
/// any list that could concatenate past [`MAX_STATE_KEY_LEN`]; so
/// [`KeyExtractor::extract`] cannot fail.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct KeyExtractor {
    fields: heapless::Vec<OxmField, MAX_EXTRACTION_FIELD_COUNT>,
    max_key_len: usize,
}

impl KeyExtractor {
    /// # Errors
    ///
    /// * [`OpenStateError::TooManyFields`]: more than
    ///   [`MAX_EXTRACTION_FIELD_COUNT`] fields.
    /// * [`OpenStateError::KeyTooLong`]: the summed field lengths
    ///   exceed [`MAX_STATE_KEY_LEN`].
    pub fn new(fields: &[OxmField]) -> Result<Self> {
        let fields = heapless::Vec::from_slice(fields).map_err(|_| {
            OpenStateError::TooManyFields {
                count: fields.len(),
                max: MAX_EXTRACTION_FIELD_COUNT,
            }
        })?;

        let max_key_len = fields.iter().map(|f| f.len()).sum::<usize>();
        if max_key_len > MAX_STATE_KEY_LEN {
            return Err(OpenStateError::KeyTooLong {
                len: max_key_len,
                max: MAX_STATE_KEY_LEN,
            });
        }

        Ok(Self { fields, max_key_len })
    }

    pub fn fields(&self) -> &[OxmField] {
        &self.fields
    }

    /// The key length produced when every field is present.
    pub fn max_key_len(&self) -> usize {
        self.max_key_len
    }

    /// Project `pkt` onto a key.
    pub fn extract<P: MatchFields + ?Sized>(&self, pkt: &P) -> StateKey {
        let mut kb = KeyBuilder::new();

        for id in &self.fields {
            if let Some(val) = pkt.field(*id) {
                // A field never takes more room than its header claims.
                kb.push(&val[..val.len().min(id.len())]);
            }
        }

        kb.finish()
    }
}

impl fmt::Display for KeyExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, id) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{id}")?;
        }
        write!(f, "]")
    }
}
