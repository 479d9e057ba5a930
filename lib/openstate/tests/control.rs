// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 The OpenState Authors

//! The control side of a state table: configuration, the command
//! channel, and dumps.

mod common;

use common::*;
use openstate::print::print_state_table_into;

const TABLE_TOML: &str = r#"
name = "fw-conntrack"
shards = 8
read_fields = ["ipv4_src", "ipv4_dst", "tcp_src", "tcp_dst"]
write_fields = ["ipv4_dst", "ipv4_src", "tcp_dst", "tcp_src"]
"#;

// A controller pushes commands as encoded bytes; decode and apply
// them like the datapath end of the channel.
fn send(st: &StateTable, cmd: StateModCmd) -> Result<(), OpenStateError> {
    let bytes = cmd.encode()?;
    st.apply(&StateModCmd::decode(&bytes)?)
}

#[test]
fn table_from_toml() {
    let cfg: StateTableCfg = toml::from_str(TABLE_TOML).unwrap();
    let st = StateTable::from_cfg(&cfg, ectx()).unwrap();

    assert_eq!(st.name(), "fw-conntrack");
    assert_eq!(st.read_extractor().max_key_len(), 12);
    assert_eq!(
        st.write_extractor().fields(),
        &[OXM_OF_IPV4_DST, OXM_OF_IPV4_SRC, OXM_OF_TCP_DST, OXM_OF_TCP_SRC]
    );

    // The reply of a connection updates the state its request reads.
    let req = tcp_pkt(GUEST_IP, 44000, 443);
    let mut reply = PacketMatch::new();
    reply.set_u32(OXM_OF_IPV4_SRC, SERVER_IP).unwrap();
    reply.set_u32(OXM_OF_IPV4_DST, GUEST_IP).unwrap();
    reply.set_u16(OXM_OF_TCP_SRC, 443).unwrap();
    reply.set_u16(OXM_OF_TCP_DST, 44000).unwrap();

    st.set_state(&reply as &dyn MatchFields, 7, 0, 0);
    assert_eq!(st.lookup(&req).state(), 7);
}

#[test]
fn toml_defaults() {
    let cfg: StateTableCfg = toml::from_str("").unwrap();
    assert_eq!(cfg, StateTableCfg::default());

    let st = StateTable::from_cfg(&cfg, ectx()).unwrap();
    assert!(st.read_extractor().fields().is_empty());

    let cfg: StateTableCfg =
        toml::from_str(r#"read_fields = ["ipv4_source"]"#).unwrap();
    assert!(matches!(
        StateTable::from_cfg(&cfg, ectx()),
        Err(OpenStateError::InvalidCfg(_))
    ));
}

#[test]
fn command_channel() {
    let log = Arc::new(RecordLog::default());
    let ectx = Arc::new(ExecCtx { log: Box::new(log.clone()) });
    let clock = Arc::new(ManualClock::new());
    let st = StateTable::new("cmds", ectx).with_clock(clock.clone());

    send(
        &st,
        StateModCmd::SetExtractor(SetExtractorReq {
            side: ExtractorSide::Read,
            fields: vec![OXM_OF_IPV4_SRC],
        }),
    )
    .unwrap();

    let mut key = vec![0u8; MAX_STATE_KEY_LEN];
    key[..4].copy_from_slice(&GUEST_IP.to_be_bytes());
    for (state, timeout_us, to_state) in [(1, 0, 0), (2, 100, 3)] {
        send(
            &st,
            StateModCmd::SetFlowState(SetFlowStateReq {
                key: key.clone(),
                state,
                timeout_us,
                to_state,
            }),
        )
        .unwrap();
    }

    let mut pkt = tcp_pkt(GUEST_IP, 1000, 80);
    assert_eq!(process(&st, &mut pkt), 2);

    // Too many fields is refused and the old extractor stays.
    let err = send(
        &st,
        StateModCmd::SetExtractor(SetExtractorReq {
            side: ExtractorSide::Read,
            fields: vec![OXM_OF_IP_PROTO; MAX_EXTRACTION_FIELD_COUNT + 1],
        }),
    )
    .unwrap_err();
    assert_eq!(
        err,
        OpenStateError::TooManyFields {
            count: MAX_EXTRACTION_FIELD_COUNT + 1,
            max: MAX_EXTRACTION_FIELD_COUNT,
        }
    );
    assert_ne!(err.to_errno(), 0);
    assert_eq!(st.read_extractor().fields(), &[OXM_OF_IPV4_SRC]);

    let levels: Vec<LogLevel> = log.take().into_iter().map(|m| m.0).collect();
    assert_eq!(levels, vec![LogLevel::Note, LogLevel::Warn]);

    send(&st, StateModCmd::DelFlowState(DelFlowStateReq { key })).unwrap();
    assert!(st.lookup(&pkt).is_default());
}

#[test]
fn dump_as_json_and_text() {
    let clock = Arc::new(ManualClock::new());
    let cfg: StateTableCfg = toml::from_str(TABLE_TOML).unwrap();
    let st =
        StateTable::from_cfg(&cfg, ectx()).unwrap().with_clock(clock.clone());

    let a = tcp_pkt(GUEST_IP, 44000, 443);
    let b = tcp_pkt(GUEST_IP, 44001, 443);
    let ka = st.read_extractor().extract(&a);
    let kb = st.read_extractor().extract(&b);
    st.set_state(ka, 1, 0, 0);
    st.set_state(kb, 1, 0, 0);
    st.set_state(kb, 2, 3_000, 4);
    clock.advance(Duration::from_micros(1_000));

    let dump = st.dump();
    let json = serde_json::to_string(&dump).unwrap();
    let back: DumpStateTableResp = serde_json::from_str(&json).unwrap();
    assert_eq!(back, dump);
    assert_eq!(back.entries[1].pending.as_ref().unwrap().remaining_us, 2_000);

    let mut out = Vec::new();
    print_state_table_into(&mut out, &dump).unwrap();
    let out = String::from_utf8(out).unwrap();

    assert!(out.contains("State Table fw-conntrack"));
    assert!(out.contains("ipv4_src,ipv4_dst,tcp_src,tcp_dst"));
    assert!(out.contains("Flows: 2"));
    let row = out
        .lines()
        .find(|l| l.starts_with(&kb.to_string()))
        .unwrap()
        .split_whitespace()
        .collect::<Vec<_>>();
    assert_eq!(row, vec![kb.to_string().as_str(), "2", "4", "2000"]);
}
