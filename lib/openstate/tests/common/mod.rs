// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 The OpenState Authors

//! Common routines for integration tests.

// This type of pedantry is more trouble than its worth here.
#![allow(dead_code)]
#![allow(unused_imports)]

pub use openstate::ExecCtx;
pub use openstate::api::*;
pub use openstate::ddi::time::ManualClock;
pub use openstate::engine::MatchFields;
pub use openstate::engine::PacketMatch;
pub use openstate::engine::StateTable;
pub use openstate::provider::LogLevel;
pub use openstate::provider::NullLog;
pub use openstate::provider::RecordLog;
pub use std::sync::Arc;
pub use std::time::Duration;

pub const GUEST_IP: u32 = 0x0a00_0005;
pub const SERVER_IP: u32 = 0x0a00_0001;

pub fn ectx() -> Arc<ExecCtx> {
    Arc::new(ExecCtx { log: Box::new(NullLog) })
}

/// A TCP segment from `src` to the server, as the match stage would
/// present it.
pub fn tcp_pkt(src: u32, sport: u16, dport: u16) -> PacketMatch {
    let mut pkt = PacketMatch::new();
    pkt.set_u16(OXM_OF_ETH_TYPE, 0x0800).unwrap();
    pkt.set_u32(OXM_OF_IPV4_SRC, src).unwrap();
    pkt.set_u32(OXM_OF_IPV4_DST, SERVER_IP).unwrap();
    pkt.set_u8(OXM_OF_IP_PROTO, 6).unwrap();
    pkt.set_u16(OXM_OF_TCP_SRC, sport).unwrap();
    pkt.set_u16(OXM_OF_TCP_DST, dport).unwrap();
    pkt
}

/// A UDP datagram from `src` to the server.
pub fn udp_pkt(src: u32, sport: u16, dport: u16) -> PacketMatch {
    let mut pkt = PacketMatch::new();
    pkt.set_u16(OXM_OF_ETH_TYPE, 0x0800).unwrap();
    pkt.set_u32(OXM_OF_IPV4_SRC, src).unwrap();
    pkt.set_u32(OXM_OF_IPV4_DST, SERVER_IP).unwrap();
    pkt.set_u8(OXM_OF_IP_PROTO, 17).unwrap();
    pkt.set_u16(OXM_OF_UDP_SRC, sport).unwrap();
    pkt.set_u16(OXM_OF_UDP_DST, dport).unwrap();
    pkt
}

/// Run one packet through the table the way a pipeline stage would:
/// look up its flow and stamp the state into its metadata.
pub fn process(st: &StateTable, pkt: &mut PacketMatch) -> u32 {
    let entry = st.lookup(&*pkt);
    st.write_metadata(&entry, pkt)
}

/// Assert the number of flows in a table.
#[macro_export]
macro_rules! assert_flows {
    ($st:expr, $expected:expr) => {
        assert!(
            $st.num_entries() == $expected,
            "flow count mismatch: expected {} flows, got {}\n{:#?}",
            $expected,
            $st.num_entries(),
            $st.dump(),
        );
    };
}
