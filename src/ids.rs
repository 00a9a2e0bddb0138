//! Ascending identifiers for sessions, messages and parts.
//!
//! Layout: `{prefix}_{12 hex}{14 base62}`. The hex half encodes
//! `millis * 0x1000 + counter`, so ids from one generator sort in creation
//! order as plain strings.

use std::time::{SystemTime, UNIX_EPOCH};

const BASE62: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const RANDOM_LEN: usize = 14;
const TIME_MASK: u64 = 0xFFFF_FFFF_FFFF;
const COUNTER_SCALE: u64 = 0x1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPrefix {
    Session,
    Message,
    Part,
}

impl IdPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Session => "ses",
            Self::Message => "msg",
            Self::Part => "prt",
        }
    }

    fn slot(self) -> usize {
        match self {
            Self::Session => 0,
            Self::Message => 1,
            Self::Part => 2,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct IdGenerator {
    last: [u64; 3],
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ascending(&mut self, prefix: IdPrefix) -> String {
        self.ascending_at(prefix, now_millis())
    }

    /// Same as [`IdGenerator::ascending`] with an explicit clock reading.
    /// A clock that goes backwards still yields increasing ids.
    pub fn ascending_at(&mut self, prefix: IdPrefix, millis: u64) -> String {
        let slot = prefix.slot();
        let mut value = millis.saturating_mul(COUNTER_SCALE).saturating_add(1);
        if value <= self.last[slot] {
            value = self.last[slot] + 1;
        }
        self.last[slot] = value;

        format!(
            "{}_{:012x}{}",
            prefix.as_str(),
            value & TIME_MASK,
            random_base62(RANDOM_LEN)
        )
    }
}

/// Milliseconds since the Unix epoch, zero if the clock is before it.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

fn random_base62(len: usize) -> String {
    let bytes = uuid::Uuid::new_v4().into_bytes();
    bytes
        .iter()
        .take(len)
        .map(|byte| BASE62[usize::from(*byte) % BASE62.len()] as char)
        .collect()
}
