// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 The OpenState Authors

//! The packet as seen by a state table.
//!
//! The table never parses bytes off the wire. It consumes the typed
//! match fields the parser already produced, and writes exactly one
//! thing back: the metadata register.

use crate::api::OXM_OF_METADATA;
use crate::api::OpenStateError;
use crate::api::OxmField;
use alloc::collections::BTreeMap;
use alloc::format;
use core::fmt;

/// The largest value any OpenFlow basic match field carries (an IPv6
/// address).
pub const MAX_FIELD_VALUE_LEN: usize = 16;

/// The width of the metadata register, in bytes.
pub const METADATA_LEN: usize = 8;

type Result<T> = core::result::Result<T, OpenStateError>;

/// Read access to a packet's decoded match fields plus write access to
/// its metadata register.
pub trait MatchFields {
    /// The value bytes of the field identified by `id`, if the packet
    /// carries such a field.
    fn field(&self, id: OxmField) -> Option<&[u8]>;

    /// Replace the entire metadata register with `md`.
    fn set_metadata(&mut self, md: u64);
}

type FieldValue = heapless::Vec<u8, MAX_FIELD_VALUE_LEN>;

/// A decoded packet's match fields, keyed by field identifier.
///
/// The metadata register is always present. It reads back as the
/// [`OXM_OF_METADATA`] field in network byte order, as it would to a
/// later match stage.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct PacketMatch {
    fields: BTreeMap<OxmField, FieldValue>,
    metadata: [u8; METADATA_LEN],
}

impl PacketMatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value of `id`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// The value must be exactly as long as the length encoded in the
    /// field identifier. The metadata register is not settable this
    /// way; use [`MatchFields::set_metadata`].
    pub fn set(&mut self, id: OxmField, value: &[u8]) -> Result<()> {
        if id == OXM_OF_METADATA {
            return Err(OpenStateError::InvalidArgument(format!(
                "{id} is the metadata register"
            )));
        }

        if value.len() != id.len() {
            return Err(OpenStateError::InvalidArgument(format!(
                "{id} expects {} bytes, got {}",
                id.len(),
                value.len()
            )));
        }

        // Experimenter classes may claim lengths past any basic field.
        let value = FieldValue::from_slice(value).map_err(|_| {
            OpenStateError::InvalidArgument(format!("{id} value too long"))
        })?;
        self.fields.insert(id, value);
        Ok(())
    }

    pub fn set_u8(&mut self, id: OxmField, val: u8) -> Result<()> {
        self.set(id, &[val])
    }

    pub fn set_u16(&mut self, id: OxmField, val: u16) -> Result<()> {
        self.set(id, &val.to_be_bytes())
    }

    pub fn set_u32(&mut self, id: OxmField, val: u32) -> Result<()> {
        self.set(id, &val.to_be_bytes())
    }

    pub fn remove(&mut self, id: OxmField) {
        self.fields.remove(&id);
    }

    pub fn metadata(&self) -> u64 {
        u64::from_be_bytes(self.metadata)
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }
}

impl MatchFields for PacketMatch {
    fn field(&self, id: OxmField) -> Option<&[u8]> {
        if id == OXM_OF_METADATA {
            return Some(&self.metadata);
        }

        self.fields.get(&id).map(|v| v.as_slice())
    }

    fn set_metadata(&mut self, md: u64) {
        self.metadata = md.to_be_bytes();
    }
}

impl fmt::Debug for PacketMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut m = f.debug_map();
        for (id, val) in &self.fields {
            m.entry(&format_args!("{id}"), &format_args!("{:02x?}", val));
        }
        m.entry(&format_args!("metadata"), &self.metadata());
        m.finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::OXM_OF_IPV4_SRC;
    use crate::api::OXM_OF_IPV6_DST;
    use crate::api::OXM_OF_TCP_DST;

    #[test]
    fn set_checks_length() {
        let mut pkt = PacketMatch::new();
        pkt.set_u32(OXM_OF_IPV4_SRC, 0x0a00_0001).unwrap();
        assert_eq!(pkt.field(OXM_OF_IPV4_SRC), Some(&[10, 0, 0, 1][..]));

        assert!(matches!(
            pkt.set_u16(OXM_OF_IPV4_SRC, 1),
            Err(OpenStateError::InvalidArgument(_))
        ));
        pkt.set(OXM_OF_IPV6_DST, &[0xfd; 16]).unwrap();
        assert_eq!(pkt.num_fields(), 2);
        assert_eq!(pkt.field(OXM_OF_TCP_DST), None);
    }

    #[test]
    fn metadata_register() {
        let mut pkt = PacketMatch::new();
        assert_eq!(pkt.metadata(), 0);
        assert_eq!(pkt.field(OXM_OF_METADATA), Some(&[0u8; 8][..]));

        pkt.set_metadata(0xdead_beef_0000_0007);
        pkt.set_metadata(3);
        assert_eq!(pkt.metadata(), 3);
        assert_eq!(
            pkt.field(OXM_OF_METADATA),
            Some(&[0, 0, 0, 0, 0, 0, 0, 3][..])
        );

        assert!(pkt.set(OXM_OF_METADATA, &[0; 8]).is_err());
    }
}
