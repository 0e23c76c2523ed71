//! Net money flow per calendar period.

use core::str::FromStr;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bankledger_accounts::AccountEvent;
use bankledger_events::{EventEnvelope, Projection};

/// Bucket width for [`NetFlow`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    Month,
    Day,
}

impl Period {
    /// Bucket key for a timestamp: `YYYY-MM` or `YYYY-MM-DD`. Keys sort
    /// chronologically as strings.
    pub fn key(self, at: DateTime<Utc>) -> String {
        match self {
            Period::Month => at.format("%Y-%m").to_string(),
            Period::Day => at.format("%Y-%m-%d").to_string(),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "month" => Ok(Period::Month),
            "day" => Ok(Period::Day),
            other => Err(format!("unknown period '{other}' (expected 'month' or 'day')")),
        }
    }
}

/// Deposits minus withdrawals, bucketed by the envelope's `recorded_at`.
///
/// Bucketing reads the timestamp but never orders by it; envelopes are still
/// folded in global-sequence order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NetFlow {
    period: Period,
    buckets: BTreeMap<String, i64>,
}

impl NetFlow {
    pub fn with_period(period: Period) -> Self {
        Self {
            period,
            buckets: BTreeMap::new(),
        }
    }

    pub fn period(&self) -> Period {
        self.period
    }

    /// Buckets in key order.
    pub fn buckets(&self) -> Vec<(String, i64)> {
        self.buckets.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    pub fn net_for(&self, key: &str) -> Option<i64> {
        self.buckets.get(key).copied()
    }

    fn add(&mut self, at: DateTime<Utc>, delta: i64) {
        let net = self.buckets.entry(self.period.key(at)).or_default();
        *net = net.saturating_add(delta);
    }
}

impl Projection for NetFlow {
    type Ev = AccountEvent;

    fn apply(&mut self, envelope: &EventEnvelope<AccountEvent>) {
        match envelope.payload() {
            AccountEvent::Deposited(e) => self.add(envelope.recorded_at(), e.amount),
            AccountEvent::Withdrawn(e) => self.add(envelope.recorded_at(), -e.amount),
            AccountEvent::Opened(_) | AccountEvent::WithdrawalRejected(_) | AccountEvent::Closed(_) => {}
        }
    }
}
