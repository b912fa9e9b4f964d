//! Access levels and team identity.
//!
//! A collaborator's `role` string is also their team key. There is no
//! separate team entity: two parties are on the same team when their
//! normalized team strings are equal. `TeamKey` is the only place that
//! normalization happens.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Access level of a collaborator, ordered by privilege.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[default]
    Colaborador,
    Gestor,
    Admin,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Colaborador => "colaborador",
            AccessLevel::Gestor => "gestor",
            AccessLevel::Admin => "admin",
        }
    }

    /// Parse an access level, case-insensitively. Unknown values are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "colaborador" => Some(AccessLevel::Colaborador),
            "gestor" => Some(AccessLevel::Gestor),
            "admin" => Some(AccessLevel::Admin),
            _ => None,
        }
    }

    /// Gestor or admin.
    pub fn is_manager(&self) -> bool {
        *self >= AccessLevel::Gestor
    }

    pub fn is_admin(&self) -> bool {
        *self == AccessLevel::Admin
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized team name: trimmed and lower-cased.
///
/// Whitespace inside the name is kept as-is, so `"Q A"` and `"QA"` are
/// different teams.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TeamKey(String);

impl TeamKey {
    pub fn new(raw: &str) -> Self {
        TeamKey(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty key never matches anything, including another empty key.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Team equality as used at every comparison site.
    pub fn matches(&self, other: &TeamKey) -> bool {
        !self.is_empty() && self == other
    }

    /// Compare against a raw, un-normalized team string.
    pub fn matches_raw(&self, raw: &str) -> bool {
        self.matches(&TeamKey::new(raw))
    }
}

impl fmt::Display for TeamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// De-duplicate team names by key, keeping the first spelling of each.
pub fn dedup_teams<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for name in names {
        let name = name.as_ref();
        let key = TeamKey::new(name);
        if key.is_empty() {
            continue;
        }
        if seen.insert(key) {
            out.push(name.trim().to_string());
        }
    }
    out
}
