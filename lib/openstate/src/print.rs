// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 The OpenState Authors

//! Print state table dumps in a human-friendly manner.
//!
//! This is mostly just a place to hang printing routines so that they
//! can be used by both administrative tooling and integration tests.

use crate::api::DumpStateTableResp;
use crate::api::OxmField;
use crate::api::StateEntryDump;
use crate::engine::key::KeyHex;
use itertools::Itertools;
use std::io::Write;
use std::string::String;
use tabwriter::TabWriter;

/// Print a [`DumpStateTableResp`].
pub fn print_state_table(resp: &DumpStateTableResp) -> std::io::Result<()> {
    print_state_table_into(&mut std::io::stdout(), resp)
}

/// Print a [`DumpStateTableResp`] into a given writer.
pub fn print_state_table_into(
    writer: &mut impl Write,
    resp: &DumpStateTableResp,
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);

    writeln!(t, "State Table {}", resp.name)?;
    write_hrb(&mut t)?;
    writeln!(t, "Read Key:\t{}", fields_str(&resp.read_fields))?;
    writeln!(t, "Write Key:\t{}", fields_str(&resp.write_fields))?;
    t.flush()?;

    writeln!(t, "\nFlows: {}", resp.entries.len())?;
    write_hr(&mut t)?;
    print_state_entry_header(&mut t)?;
    for entry in &resp.entries {
        print_state_entry(&mut t, entry)?;
    }
    writeln!(t, "DEF\t{}\t--\t--", resp.default_state)?;
    t.flush()?;

    writeln!(t)?;
    t.flush()
}

/// Print the header for the [`print_state_entry()`] output.
pub fn print_state_entry_header(t: &mut impl Write) -> std::io::Result<()> {
    writeln!(t, "KEY\tSTATE\tTO STATE\tIN (us)")
}

/// Print a single flow.
pub fn print_state_entry(
    t: &mut impl Write,
    entry: &StateEntryDump,
) -> std::io::Result<()> {
    match &entry.pending {
        Some(pt) => writeln!(
            t,
            "{}\t{}\t{}\t{}",
            KeyHex(&entry.key),
            entry.state,
            pt.to_state,
            pt.remaining_us
        ),
        None => {
            writeln!(t, "{}\t{}\t--\t--", KeyHex(&entry.key), entry.state)
        }
    }
}

fn fields_str(fields: &[OxmField]) -> String {
    if fields.is_empty() {
        return String::from("(none)");
    }

    fields.iter().join(",")
}

/// Output a horizontal rule in bold to the given writer.
pub fn write_hrb(t: &mut impl Write) -> std::io::Result<()> {
    writeln!(t, "{:=<70}", "=")
}

/// Output a horizontal rule to the given writer.
pub fn write_hr(t: &mut impl Write) -> std::io::Result<()> {
    writeln!(t, "{:-<70}", "-")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::*;

    #[test]
    fn print_dump() {
        let mut key = vec![0u8; MAX_STATE_KEY_LEN];
        key[..4].copy_from_slice(&[10, 0, 0, 1]);

        let resp = DumpStateTableResp {
            name: String::from("knock"),
            read_fields: vec![OXM_OF_IPV4_SRC, OXM_OF_TCP_DST],
            write_fields: vec![],
            default_state: STATE_DEFAULT,
            entries: vec![
                StateEntryDump { key: key.clone(), state: 1, pending: None },
                StateEntryDump {
                    key: vec![0u8; MAX_STATE_KEY_LEN],
                    state: 2,
                    pending: Some(PendingTransitionDump {
                        to_state: 3,
                        remaining_us: 250,
                    }),
                },
            ],
        };

        let mut out = Vec::new();
        print_state_table_into(&mut out, &resp).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.starts_with("State Table knock\n"));
        assert!(out.contains("ipv4_src,tcp_dst"));
        assert!(out.contains("(none)"));
        assert!(out.contains("Flows: 2"));

        let rows: Vec<Vec<&str>> = out
            .lines()
            .filter(|l| l.starts_with("0a000001") || l.starts_with("00 "))
            .map(|l| l.split_whitespace().collect())
            .collect();
        assert_eq!(rows[0], vec!["0a000001", "1", "--", "--"]);
        let as_key = crate::engine::StateKey::from_bytes(&key).unwrap();
        assert_eq!(rows[0][0], as_key.to_string());
        assert_eq!(rows[1], vec!["00", "2", "3", "250"]);
    }
}
