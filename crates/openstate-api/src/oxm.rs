// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 The OpenState Authors

//! OpenFlow Extensible Match (OXM) field identifiers.
//!
//! A field identifier is the 32-bit OXM header of a match field:
//!
//! ```text
//!  31              16 15        9   8   7             0
//! +------------------+-----------+-----+---------------+
//! |    oxm_class     | oxm_field | HM  |  oxm_length   |
//! +------------------+-----------+-----+---------------+
//! ```
//!
//! The low byte carries the length of the field's value in bytes,
//! which is what lets a key extractor compute the worst-case key
//! length from the identifiers alone.

use alloc::string::String;
use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// The OpenFlow basic match class.
pub const OFPXMC_OPENFLOW_BASIC: u16 = 0x8000;

/// A match-field identifier in OXM header form.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(transparent)]
pub struct OxmField(u32);

impl OxmField {
    /// Build a header for `class`/`field` with a value of `len` bytes.
    pub const fn new(class: u16, field: u8, len: u8) -> Self {
        let field = ((field & 0x7f) as u32) << 9;
        Self(((class as u32) << 16) | field | len as u32)
    }

    /// Build an identifier in the OpenFlow basic class.
    pub const fn basic(field: u8, len: u8) -> Self {
        Self::new(OFPXMC_OPENFLOW_BASIC, field, len)
    }

    pub const fn from_raw(header: u32) -> Self {
        Self(header)
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }

    pub const fn class(&self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub const fn field(&self) -> u8 {
        ((self.0 >> 9) & 0x7f) as u8
    }

    pub const fn has_mask(&self) -> bool {
        (self.0 >> 8) & 0x1 == 1
    }

    /// The length of this field's value, in bytes.
    pub const fn len(&self) -> usize {
        (self.0 & 0xff) as usize
    }

    /// The well-known name of this field, if it has one.
    pub fn name(&self) -> Option<&'static str> {
        OXM_NAMES.iter().find(|(f, _)| f == self).map(|(_, name)| *name)
    }
}

impl From<u32> for OxmField {
    fn from(header: u32) -> Self {
        Self(header)
    }
}

impl From<OxmField> for u32 {
    fn from(f: OxmField) -> Self {
        f.0
    }
}

impl core::str::FromStr for OxmField {
    type Err = String;

    /// Parse either a well-known field name (`ipv4_src`,
    /// `OXM_OF_IPV4_SRC`) or a raw hex header (`0x80001604`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();

        if let Some(hex) = lower.strip_prefix("0x") {
            return u32::from_str_radix(hex, 16)
                .map(OxmField)
                .map_err(|e| format!("bad OXM header {}: {}", s, e));
        }

        let name = lower.strip_prefix("oxm_of_").unwrap_or(&lower);
        OXM_NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(f, _)| *f)
            .ok_or_else(|| format!("unknown match field: {}", s))
    }
}

impl Display for OxmField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "0x{:08x}", self.0),
        }
    }
}

pub const OXM_OF_IN_PORT: OxmField = OxmField::basic(0, 4);
pub const OXM_OF_IN_PHY_PORT: OxmField = OxmField::basic(1, 4);
pub const OXM_OF_METADATA: OxmField = OxmField::basic(2, 8);
pub const OXM_OF_ETH_DST: OxmField = OxmField::basic(3, 6);
pub const OXM_OF_ETH_SRC: OxmField = OxmField::basic(4, 6);
pub const OXM_OF_ETH_TYPE: OxmField = OxmField::basic(5, 2);
pub const OXM_OF_VLAN_VID: OxmField = OxmField::basic(6, 2);
pub const OXM_OF_VLAN_PCP: OxmField = OxmField::basic(7, 1);
pub const OXM_OF_IP_DSCP: OxmField = OxmField::basic(8, 1);
pub const OXM_OF_IP_ECN: OxmField = OxmField::basic(9, 1);
pub const OXM_OF_IP_PROTO: OxmField = OxmField::basic(10, 1);
pub const OXM_OF_IPV4_SRC: OxmField = OxmField::basic(11, 4);
pub const OXM_OF_IPV4_DST: OxmField = OxmField::basic(12, 4);
pub const OXM_OF_TCP_SRC: OxmField = OxmField::basic(13, 2);
pub const OXM_OF_TCP_DST: OxmField = OxmField::basic(14, 2);
pub const OXM_OF_UDP_SRC: OxmField = OxmField::basic(15, 2);
pub const OXM_OF_UDP_DST: OxmField = OxmField::basic(16, 2);
pub const OXM_OF_SCTP_SRC: OxmField = OxmField::basic(17, 2);
pub const OXM_OF_SCTP_DST: OxmField = OxmField::basic(18, 2);
pub const OXM_OF_ICMPV4_TYPE: OxmField = OxmField::basic(19, 1);
pub const OXM_OF_ICMPV4_CODE: OxmField = OxmField::basic(20, 1);
pub const OXM_OF_ARP_OP: OxmField = OxmField::basic(21, 2);
pub const OXM_OF_ARP_SPA: OxmField = OxmField::basic(22, 4);
pub const OXM_OF_ARP_TPA: OxmField = OxmField::basic(23, 4);
pub const OXM_OF_ARP_SHA: OxmField = OxmField::basic(24, 6);
pub const OXM_OF_ARP_THA: OxmField = OxmField::basic(25, 6);
pub const OXM_OF_IPV6_SRC: OxmField = OxmField::basic(26, 16);
pub const OXM_OF_IPV6_DST: OxmField = OxmField::basic(27, 16);
pub const OXM_OF_IPV6_FLABEL: OxmField = OxmField::basic(28, 4);
pub const OXM_OF_ICMPV6_TYPE: OxmField = OxmField::basic(29, 1);
pub const OXM_OF_ICMPV6_CODE: OxmField = OxmField::basic(30, 1);
pub const OXM_OF_MPLS_LABEL: OxmField = OxmField::basic(34, 4);
pub const OXM_OF_MPLS_TC: OxmField = OxmField::basic(35, 1);
pub const OXM_OF_TUNNEL_ID: OxmField = OxmField::basic(38, 8);

const OXM_NAMES: &[(OxmField, &str)] = &[
    (OXM_OF_IN_PORT, "in_port"),
    (OXM_OF_IN_PHY_PORT, "in_phy_port"),
    (OXM_OF_METADATA, "metadata"),
    (OXM_OF_ETH_DST, "eth_dst"),
    (OXM_OF_ETH_SRC, "eth_src"),
    (OXM_OF_ETH_TYPE, "eth_type"),
    (OXM_OF_VLAN_VID, "vlan_vid"),
    (OXM_OF_VLAN_PCP, "vlan_pcp"),
    (OXM_OF_IP_DSCP, "ip_dscp"),
    (OXM_OF_IP_ECN, "ip_ecn"),
    (OXM_OF_IP_PROTO, "ip_proto"),
    (OXM_OF_IPV4_SRC, "ipv4_src"),
    (OXM_OF_IPV4_DST, "ipv4_dst"),
    (OXM_OF_TCP_SRC, "tcp_src"),
    (OXM_OF_TCP_DST, "tcp_dst"),
    (OXM_OF_UDP_SRC, "udp_src"),
    (OXM_OF_UDP_DST, "udp_dst"),
    (OXM_OF_SCTP_SRC, "sctp_src"),
    (OXM_OF_SCTP_DST, "sctp_dst"),
    (OXM_OF_ICMPV4_TYPE, "icmpv4_type"),
    (OXM_OF_ICMPV4_CODE, "icmpv4_code"),
    (OXM_OF_ARP_OP, "arp_op"),
    (OXM_OF_ARP_SPA, "arp_spa"),
    (OXM_OF_ARP_TPA, "arp_tpa"),
    (OXM_OF_ARP_SHA, "arp_sha"),
    (OXM_OF_ARP_THA, "arp_tha"),
    (OXM_OF_IPV6_SRC, "ipv6_src"),
    (OXM_OF_IPV6_DST, "ipv6_dst"),
    (OXM_OF_IPV6_FLABEL, "ipv6_flabel"),
    (OXM_OF_ICMPV6_TYPE, "icmpv6_type"),
    (OXM_OF_ICMPV6_CODE, "icmpv6_code"),
    (OXM_OF_MPLS_LABEL, "mpls_label"),
    (OXM_OF_MPLS_TC, "mpls_tc"),
    (OXM_OF_TUNNEL_ID, "tunnel_id"),
];

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn header_layout() {
        // Values as they appear on the wire for OpenFlow 1.3.
        assert_eq!(OXM_OF_IN_PORT.raw(), 0x8000_0004);
        assert_eq!(OXM_OF_METADATA.raw(), 0x8000_0408);
        assert_eq!(OXM_OF_IPV4_SRC.raw(), 0x8000_1604);
        assert_eq!(OXM_OF_TCP_DST.raw(), 0x8000_1c02);
        assert_eq!(OXM_OF_IPV6_DST.raw(), 0x8000_3610);

        assert_eq!(OXM_OF_IPV4_SRC.class(), OFPXMC_OPENFLOW_BASIC);
        assert_eq!(OXM_OF_IPV4_SRC.field(), 11);
        assert_eq!(OXM_OF_IPV4_SRC.len(), 4);
        assert!(!OXM_OF_IPV4_SRC.has_mask());
        assert!(OxmField::from_raw(0x8000_1708).has_mask());
    }

    #[test]
    fn parse_names() {
        assert_eq!("ipv4_src".parse::<OxmField>(), Ok(OXM_OF_IPV4_SRC));
        assert_eq!("OXM_OF_TCP_SRC".parse::<OxmField>(), Ok(OXM_OF_TCP_SRC));
        assert_eq!("0x80001c02".parse::<OxmField>(), Ok(OXM_OF_TCP_DST));
        assert!("ipv5_src".parse::<OxmField>().is_err());
        assert!("0xzz".parse::<OxmField>().is_err());
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", OXM_OF_ETH_SRC), "eth_src");
        assert_eq!(format!("{}", OxmField::basic(99, 3)), "0x8000c603");
    }
}
