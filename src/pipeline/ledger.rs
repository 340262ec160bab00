//! Run-wide error ledger.
//!
//! Maps `[severity:stage] kind` to the EBD keys that hit it. Keys are kept in
//! a `BTreeMap` over `(Severity, Stage, kind)`, so iteration (and therefore
//! the printed summary) lists every critical entry before any advisory one
//! and is stable for identical input. Within one entry, EBD keys keep the
//! order in which they were recorded.

use crate::error::{Severity, Stage, StageFailure};
use serde::ser::Error as _;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

type LedgerKey = (Severity, Stage, &'static str);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLedger {
    entries: BTreeMap<LedgerKey, Vec<String>>,
}

impl ErrorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, ebd_key: &str, failure: &StageFailure) {
        self.entries
            .entry((failure.severity(), failure.stage, failure.kind))
            .or_default()
            .push(ebd_key.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of recorded failures over all entries.
    pub fn failure_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// `(label, ebd keys)` in summary order.
    pub fn entries(&self) -> impl Iterator<Item = (String, &[String])> + '_ {
        self.entries
            .iter()
            .map(|(key, ebds)| (label(key), ebds.as_slice()))
    }

    /// EBD keys recorded under one stage and kind.
    pub fn ebds_for(&self, stage: Stage, kind: &str) -> &[String] {
        self.entries
            .iter()
            .find(|((_, s, k), _)| *s == stage && *k == kind)
            .map(|(_, ebds)| ebds.as_slice())
            .unwrap_or(&[])
    }

    /// The summary as a JSON object, critical entries first.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (label, ebds) in self.entries() {
            map.insert(
                label,
                Value::Array(ebds.iter().cloned().map(Value::String).collect()),
            );
        }
        Value::Object(map)
    }

    /// The summary as pretty-printed JSON with `indent` spaces per level.
    pub fn to_pretty_json(&self, indent: usize) -> serde_json::Result<String> {
        let indent = " ".repeat(indent);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut out = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.to_json().serialize(&mut serializer)?;
        String::from_utf8(out).map_err(serde_json::Error::custom)
    }
}

fn label((severity, stage, kind): &LedgerKey) -> String {
    format!("[{severity}:{stage}] {kind}")
}
