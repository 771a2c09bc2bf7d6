// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage metadata shared between the stage controller and the RPC surface.

use serde::{Deserialize, Serialize};

/// Upstream connectivity level, ordered.
///
/// `Local` means the default gateway answers an ARP probe; `Internet` means
/// at least one of the configured reachability probes succeeded as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityLevel {
    None,
    Local,
    Internet,
}

impl ConnectivityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectivityLevel::None => "none",
            ConnectivityLevel::Local => "local",
            ConnectivityLevel::Internet => "internet",
        }
    }
}

impl std::fmt::Display for ConnectivityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `stage_info` reply: the current stage and its last reconciliation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageInfo {
    pub name: String,
    pub desc: String,
    pub connectivity: ConnectivityLevel,
    pub errmsg: Option<String>,
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;
