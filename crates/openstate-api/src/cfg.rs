// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 The OpenState Authors

use super::cmd::OpenStateError;
use super::oxm::OxmField;
use alloc::string::String;
use alloc::vec::Vec;
use serde::Deserialize;
use serde::Serialize;

/// The default number of lock shards in a state table.
pub const STATE_TABLE_DEF_SHARDS: usize = 16;

/// The configuration of a single state table.
///
/// Fields are named the way an operator writes them (`ipv4_src`,
/// `OXM_OF_TCP_DST`, or a raw `0x...` header) and are only resolved to
/// [`OxmField`]s when the table is built.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct StateTableCfg {
    pub name: String,
    /// Number of independently locked shards; must be a power of two.
    pub shards: usize,
    pub read_fields: Vec<String>,
    pub write_fields: Vec<String>,
}

impl Default for StateTableCfg {
    fn default() -> Self {
        Self {
            name: String::from("state-table"),
            shards: STATE_TABLE_DEF_SHARDS,
            read_fields: Vec::new(),
            write_fields: Vec::new(),
        }
    }
}

impl StateTableCfg {
    pub fn parse_read_fields(&self) -> Result<Vec<OxmField>, OpenStateError> {
        parse_fields(&self.read_fields)
    }

    pub fn parse_write_fields(&self) -> Result<Vec<OxmField>, OpenStateError> {
        parse_fields(&self.write_fields)
    }
}

fn parse_fields(names: &[String]) -> Result<Vec<OxmField>, OpenStateError> {
    names
        .iter()
        .map(|n| n.parse::<OxmField>().map_err(OpenStateError::InvalidCfg))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::oxm::*;

    #[test]
    fn parse_from_json() {
        let cfg: StateTableCfg = serde_json::from_str(
            r#"{
                "name": "port-knock",
                "read_fields": ["ipv4_src"],
                "write_fields": ["OXM_OF_IPV4_SRC", "0x80001c02"]
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.shards, STATE_TABLE_DEF_SHARDS);
        assert_eq!(cfg.parse_read_fields(), Ok(vec![OXM_OF_IPV4_SRC]));
        assert_eq!(
            cfg.parse_write_fields(),
            Ok(vec![OXM_OF_IPV4_SRC, OXM_OF_TCP_DST])
        );
    }

    #[test]
    fn unknown_field_name() {
        let cfg = StateTableCfg {
            read_fields: vec![String::from("ipv4_srcc")],
            ..Default::default()
        };
        assert!(matches!(
            cfg.parse_read_fields(),
            Err(OpenStateError::InvalidCfg(_))
        ));
    }
}
