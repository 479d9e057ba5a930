// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 The OpenState Authors

//! The per-flow state table.
//!
//! For each packet the table builds a key with its read extractor,
//! finds the flow's [`StateEntry`] (or falls back to the default
//! entry), and writes the flow's state into the packet's metadata
//! register. The control side installs state through the write
//! extractor or a raw key, optionally arming a delayed transition.
//!
//! # Locking
//!
//! Entries are spread over shards chosen by the CRC32 of their key.
//! Each shard is a reader-writer lock over an ordered map, so lookups
//! in one shard run in parallel and only inserting or removing a key
//! takes a shard exclusively. Each entry sits behind its own mutex;
//! consuming a pending transition or updating an existing flow only
//! serializes against other users of that same flow.
//!
//! # Expiry
//!
//! Nothing runs in the background. A pending transition is evaluated,
//! and consumed, only when [`StateTable::write_metadata`] is called
//! for a packet matching its entry.

use super::key::KeyExtractor;
use super::key::StateKey;
use super::match_fields::MatchFields;
use crate::ExecCtx;
use crate::api::DumpStateTableResp;
use crate::api::ExtractorSide;
use crate::api::OpenStateError;
use crate::api::OxmField;
use crate::api::PendingTransitionDump;
use crate::api::STATE_DEFAULT;
use crate::api::STATE_TABLE_DEF_SHARDS;
use crate::api::StateEntryDump;
use crate::api::StateModCmd;
use crate::api::StateTableCfg;
use crate::ddi::sync::KMutex;
use crate::ddi::sync::KRwLock;
use crate::ddi::time::Clock;
use crate::ddi::time::Moment;
use crate::ddi::time::SystemClock;
use crate::dynamic::Dynamic;
use crate::dynamic::Snapshot;
use crate::provider::LogLevel;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::string::ToString;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::time::Duration;

type Result<T> = core::result::Result<T, OpenStateError>;

type EntryCell = Arc<KMutex<StateEntry>>;
type Shard = KRwLock<BTreeMap<StateKey, EntryCell>>;

/// A state change armed to take effect at `deadline`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PendingTransition {
    pub to_state: u32,
    pub deadline: Moment,
}

impl PendingTransition {
    /// Has the deadline been reached as of `now`?
    pub fn is_expired(&self, now: Moment) -> bool {
        now >= self.deadline
    }
}

/// One flow's state.
#[derive(Clone, Debug)]
pub struct StateEntry {
    key: StateKey,
    state: u32,
    pending: Option<PendingTransition>,
}

impl StateEntry {
    fn new(key: StateKey, state: u32) -> Self {
        Self { key, state, pending: None }
    }

    pub fn key(&self) -> &StateKey {
        &self.key
    }

    pub fn state(&self) -> u32 {
        self.state
    }

    pub fn pending(&self) -> Option<PendingTransition> {
        self.pending
    }

    fn dump(&self, now: Moment) -> StateEntryDump {
        StateEntryDump {
            key: self.key.as_bytes().to_vec(),
            state: self.state,
            pending: self.pending.map(|pt| PendingTransitionDump {
                to_state: pt.to_state,
                remaining_us: pt.deadline.delta_as_micros(now),
            }),
        }
    }
}

/// The result of a [`StateTable::lookup`].
///
/// Either a live entry, or the table's default entry: the sentinel
/// reporting [`STATE_DEFAULT`] for every flow the table has no state
/// for. The default entry never carries a pending transition and can
/// never be removed.
#[derive(Clone, Debug)]
pub enum StateEntryRef {
    Default,
    Entry(EntryCell),
}

impl StateEntryRef {
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }

    /// The entry's stored state.
    pub fn state(&self) -> u32 {
        match self {
            Self::Default => STATE_DEFAULT,
            Self::Entry(cell) => cell.lock().state,
        }
    }

    pub fn key(&self) -> Option<StateKey> {
        match self {
            Self::Default => None,
            Self::Entry(cell) => Some(cell.lock().key),
        }
    }

    pub fn pending(&self) -> Option<PendingTransition> {
        match self {
            Self::Default => None,
            Self::Entry(cell) => cell.lock().pending,
        }
    }
}

/// Where [`StateTable::set_state`] gets its key from.
pub enum KeySource<'a> {
    /// Extract the key from a packet with the write extractor.
    Packet(&'a dyn MatchFields),
    /// Use a key supplied directly by the control plane.
    Key(StateKey),
}

impl<'a> From<&'a dyn MatchFields> for KeySource<'a> {
    fn from(pkt: &'a dyn MatchFields) -> Self {
        Self::Packet(pkt)
    }
}

impl From<StateKey> for KeySource<'_> {
    fn from(key: StateKey) -> Self {
        Self::Key(key)
    }
}

pub struct StateTable {
    name: String,
    ectx: Arc<ExecCtx>,
    clock: Arc<dyn Clock>,
    read_key: Dynamic<KeyExtractor>,
    write_key: Dynamic<KeyExtractor>,
    shards: Box<[Shard]>,
}

impl StateTable {
    /// Create an empty table with empty extractors, which map every
    /// packet onto the all-zero key until configured.
    pub fn new(name: &str, ectx: Arc<ExecCtx>) -> Self {
        Self::with_shards(name, ectx, STATE_TABLE_DEF_SHARDS)
    }

    fn with_shards(name: &str, ectx: Arc<ExecCtx>, shards: usize) -> Self {
        Self {
            name: name.to_string(),
            ectx,
            clock: Arc::new(SystemClock),
            read_key: Dynamic::from(KeyExtractor::default()),
            write_key: Dynamic::from(KeyExtractor::default()),
            shards: (0..shards).map(|_| Shard::default()).collect(),
        }
    }

    /// Build a table from its configuration.
    ///
    /// # Errors
    ///
    /// The shard count must be a non-zero power of two, every field
    /// name must resolve, and both extractors must pass the checks of
    /// [`KeyExtractor::new`].
    pub fn from_cfg(cfg: &StateTableCfg, ectx: Arc<ExecCtx>) -> Result<Self> {
        if !cfg.shards.is_power_of_two() {
            return Err(OpenStateError::InvalidCfg(format!(
                "shard count must be a power of two: {}",
                cfg.shards
            )));
        }

        let read_key = KeyExtractor::new(&cfg.parse_read_fields()?)?;
        let write_key = KeyExtractor::new(&cfg.parse_write_fields()?)?;

        let table = Self::with_shards(&cfg.name, ectx, cfg.shards);
        table.read_key.store(read_key);
        table.write_key.store(write_key);
        Ok(table)
    }

    /// Replace the table's source of time.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the read or write extractor wholesale.
    ///
    /// A lookup already in flight finishes with the extractor it
    /// loaded. Existing entries are untouched: their keys were built
    /// by whatever extractor was current when they were set.
    ///
    /// # Errors
    ///
    /// See [`KeyExtractor::new`]. On error the current extractor stays
    /// in place.
    pub fn configure_extractor(
        &self,
        fields: &[OxmField],
        side: ExtractorSide,
    ) -> Result<()> {
        let ke = match KeyExtractor::new(fields) {
            Ok(ke) => ke,
            Err(e) => {
                self.ectx.log.log(
                    LogLevel::Warn,
                    &format!(
                        "state table {}: rejected {} extractor: {}",
                        self.name, side, e
                    ),
                );
                return Err(e);
            }
        };

        let slot =
            if side.is_write() { &self.write_key } else { &self.read_key };
        slot.store(ke);

        let current = slot.load();
        self.ectx.log.log(
            LogLevel::Note,
            &format!(
                "state table {}: {} extractor {} (epoch {})",
                self.name, side, *current, current.epoch
            ),
        );

        Ok(())
    }

    pub fn read_extractor(&self) -> Snapshot<KeyExtractor> {
        self.read_key.load()
    }

    pub fn write_extractor(&self) -> Snapshot<KeyExtractor> {
        self.write_key.load()
    }

    fn shard(&self, key: &StateKey) -> &Shard {
        // The shard count is a power of two.
        &self.shards[key.crc32() as usize & (self.shards.len() - 1)]
    }

    fn find(&self, key: &StateKey) -> Option<EntryCell> {
        self.shard(key).read().get(key).cloned()
    }

    /// Find the state of the flow `pkt` belongs to.
    ///
    /// A miss is not an error; it yields [`StateEntryRef::Default`].
    pub fn lookup<P: MatchFields + ?Sized>(&self, pkt: &P) -> StateEntryRef {
        let key = self.read_key.load().extract(pkt);
        self.lookup_key(&key)
    }

    /// Find the state stored under `key`.
    pub fn lookup_key(&self, key: &StateKey) -> StateEntryRef {
        match self.find(key) {
            Some(cell) => StateEntryRef::Entry(cell),
            None => StateEntryRef::Default,
        }
    }

    /// Write the state of `entry`, as seen by this one packet, into
    /// the packet's metadata register, and return it.
    ///
    /// If a pending transition has reached its deadline the packet
    /// sees the target state, otherwise the stored state. Either way
    /// the pending transition is consumed. The target is *not* stored
    /// back into the entry: the next packet of the flow sees the old
    /// stored state again unless the control plane sets a new one.
    ///
    /// The register is replaced outright; no other bits survive.
    pub fn write_metadata<P: MatchFields + ?Sized>(
        &self,
        entry: &StateEntryRef,
        pkt: &mut P,
    ) -> u32 {
        let state = match entry {
            StateEntryRef::Default => STATE_DEFAULT,

            StateEntryRef::Entry(cell) => {
                let mut e = cell.lock();
                match e.pending.take() {
                    Some(pt) if pt.is_expired(self.clock.now()) => {
                        pt.to_state
                    }
                    _ => e.state,
                }
            }
        };

        pkt.set_metadata(u64::from(state));
        state
    }

    /// Install or update the state of a flow.
    ///
    /// For a flow already present, a non-default `delay_target_state`
    /// arms a transition to it `delay_to` microseconds from now,
    /// replacing any transition already armed; and `state` becomes the
    /// stored state immediately in all cases.
    ///
    /// A flow seen for the first time is created with `state` and no
    /// pending transition, even if a delayed target was given.
    pub fn set_state<'a>(
        &self,
        src: impl Into<KeySource<'a>>,
        state: u32,
        delay_to: u32,
        delay_target_state: u32,
    ) {
        let key = match src.into() {
            KeySource::Packet(pkt) => self.write_key.load().extract(pkt),
            KeySource::Key(key) => key,
        };

        if let Some(cell) = self.find(&key) {
            self.update_entry(&cell, state, delay_to, delay_target_state);
            return;
        }

        let mut shard = self.shard(&key).write();

        // Another writer may have created the flow since we looked.
        if let Some(cell) = shard.get(&key) {
            self.update_entry(cell, state, delay_to, delay_target_state);
            return;
        }

        shard.insert(key, Arc::new(KMutex::new(StateEntry::new(key, state))));
    }

    fn update_entry(
        &self,
        cell: &EntryCell,
        state: u32,
        delay_to: u32,
        delay_target_state: u32,
    ) {
        let mut e = cell.lock();

        if delay_target_state != STATE_DEFAULT {
            let delay = Duration::from_micros(u64::from(delay_to));
            e.pending = Some(PendingTransition {
                to_state: delay_target_state,
                deadline: self.clock.now() + delay,
            });
        }

        e.state = state;
    }

    /// Remove the state of a flow. Returns whether there was any;
    /// removing an unknown flow is a no-op.
    pub fn delete_state(&self, key: &StateKey) -> bool {
        self.shard(key).write().remove(key).is_some()
    }

    /// Remove the flow a lookup returned.
    ///
    /// # Errors
    ///
    /// The default entry cannot be removed.
    pub fn remove_entry(&self, entry: &StateEntryRef) -> Result<bool> {
        match entry.key() {
            Some(key) => Ok(self.delete_state(&key)),
            None => Err(OpenStateError::InvalidArgument(format!(
                "state table {}: the default entry cannot be removed",
                self.name
            ))),
        }
    }

    /// Carry out a state modification command.
    pub fn apply(&self, cmd: &StateModCmd) -> Result<()> {
        match cmd {
            StateModCmd::SetExtractor(req) => {
                self.configure_extractor(&req.fields, req.side)
            }

            StateModCmd::SetFlowState(req) => {
                let key = StateKey::from_bytes(&req.key)?;
                self.set_state(key, req.state, req.timeout_us, req.to_state);
                Ok(())
            }

            StateModCmd::DelFlowState(req) => {
                let key = StateKey::from_bytes(&req.key)?;
                let _ = self.delete_state(&key);
                Ok(())
            }
        }
    }

    /// Remove every flow, leaving only the default entry.
    pub fn clear(&self) {
        let mut removed = 0;
        for shard in self.shards.iter() {
            let mut map = shard.write();
            removed += map.len();
            map.clear();
        }

        self.ectx.log.log(
            LogLevel::Note,
            &format!("state table {}: cleared {} flows", self.name, removed),
        );
    }

    /// Get the number of flows in this table, not counting the default
    /// entry.
    pub fn num_entries(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    pub fn dump(&self) -> DumpStateTableResp {
        let now = self.clock.now();
        let mut entries = Vec::with_capacity(self.num_entries());

        for shard in self.shards.iter() {
            for cell in shard.read().values() {
                entries.push(cell.lock().dump(now));
            }
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));

        DumpStateTableResp {
            name: self.name.clone(),
            read_fields: self.read_key.load().fields().to_vec(),
            write_fields: self.write_key.load().fields().to_vec(),
            default_state: STATE_DEFAULT,
            entries,
        }
    }
}

impl fmt::Debug for StateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTable")
            .field("name", &self.name)
            .field("read_key", &self.read_key)
            .field("write_key", &self.write_key)
            .field("shards", &self.shards.len())
            .field("entries", &self.num_entries())
            .finish()
    }
}
