//! Adaptive negative-response blacklist
//!
//! Codes on the blacklist are treated as noise and left out of filtered
//! result views. Membership is recomputed from the full negative-response
//! population each time, so a code can enter and leave as data accumulates.
//! Raw results are never discarded.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

/// Codes blacklisted before any data has been seen (generalReject,
/// serviceNotSupported for UDS)
pub const DEFAULT_SEED: [u8; 2] = [0x10, 0x11];

/// A code is added once it occurred more than this many times ...
pub const ADD_MIN_COUNT: usize = 30;
/// ... and makes up more than this share of all negative responses
pub const ADD_MIN_SHARE: f64 = 0.3;
/// A blacklisted code is removed when it occurred fewer times than this
pub const REMOVE_MAX_COUNT: usize = 10;

/// Set of negative-response codes currently treated as noise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegativeResponseBlacklist {
    codes: Vec<u8>,
}

impl Default for NegativeResponseBlacklist {
    fn default() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }
}

impl NegativeResponseBlacklist {
    /// Blacklist starting from a protocol-specific seed
    pub fn with_seed(seed: impl IntoIterator<Item = u8>) -> Self {
        let mut codes = Vec::new();
        for code in seed {
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
        Self { codes }
    }

    pub fn contains(&self, code: u8) -> bool {
        self.codes.contains(&code)
    }

    /// Blacklisted codes in the order they were added
    pub fn codes(&self) -> &[u8] {
        &self.codes
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Recompute membership from the codes of all negative responses seen
    /// so far
    pub fn update(&mut self, negative_codes: impl IntoIterator<Item = u8>) {
        let mut counts: Vec<(u8, usize)> = Vec::new();
        let mut index: HashMap<u8, usize> = HashMap::new();
        for code in negative_codes {
            match index.get(&code) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    index.insert(code, counts.len());
                    counts.push((code, 1));
                }
            }
        }

        let total: usize = counts.iter().map(|(_, count)| count).sum();
        if total == 0 {
            return;
        }

        for (code, count) in counts {
            let share = count as f64 / total as f64;
            if !self.contains(code) && count > ADD_MIN_COUNT && share > ADD_MIN_SHARE {
                info!(
                    nrc = format!("0x{:02X}", code),
                    count,
                    share,
                    "Added NRC to filter"
                );
                self.codes.push(code);
            } else if self.contains(code) && count < REMOVE_MAX_COUNT {
                info!(nrc = format!("0x{:02X}", code), count, "Removed NRC from filter");
                self.codes.retain(|c| *c != code);
            }
        }
    }
}
