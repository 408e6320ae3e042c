//! Maintenance target identity
//!
//! A target is either a fixed agent or an elastic cloud pool. Targets are
//! persisted under their key string: `AGENT:name`, `CLOUD:name` or
//! `CLOUD:name:disambiguator`. Keys without a `:` predate the typed format
//! and name an agent.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::errors::MaintenanceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetKind {
    Agent,
    Cloud,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Agent => "AGENT",
            TargetKind::Cloud => "CLOUD",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Target {
    kind: TargetKind,
    name: String,
    disambiguator: Option<String>,
}

impl Target {
    pub fn agent(name: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Agent,
            name: name.into(),
            disambiguator: None,
        }
    }

    pub fn cloud(name: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Cloud,
            name: name.into(),
            disambiguator: None,
        }
    }

    pub fn cloud_with_disambiguator(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Cloud,
            name: name.into(),
            disambiguator: Some(token.into()),
        }
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn disambiguator(&self) -> Option<&str> {
        self.disambiguator.as_deref()
    }

    pub fn is_agent(&self) -> bool {
        self.kind == TargetKind::Agent
    }

    pub fn key(&self) -> String {
        match &self.disambiguator {
            Some(token) => format!("{}:{}:{}", self.kind, self.name, token),
            None => format!("{}:{}", self.kind, self.name),
        }
    }

    pub fn parse_key(key: &str) -> Result<Self, MaintenanceError> {
        let invalid = |reason: &str| MaintenanceError::InvalidKey {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        if key.is_empty() {
            return Err(invalid("key is empty"));
        }

        let Some((prefix, rest)) = key.split_once(':') else {
            return Ok(Target::agent(key));
        };

        if prefix.eq_ignore_ascii_case(TargetKind::Agent.as_str()) {
            if rest.is_empty() {
                return Err(invalid("agent name is empty"));
            }
            return Ok(Target::agent(rest));
        }

        if !prefix.eq_ignore_ascii_case(TargetKind::Cloud.as_str()) {
            return Err(invalid("unknown target type"));
        }

        match rest.rsplit_once(':') {
            Some((_, "")) => Err(invalid("disambiguator is empty")),
            Some(("", _)) => Err(invalid("cloud name is empty")),
            Some((name, token)) => Ok(Target::cloud_with_disambiguator(name, token)),
            None if rest.is_empty() => Err(invalid("cloud name is empty")),
            None => Ok(Target::cloud(rest)),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for Target {
    type Err = MaintenanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::parse_key(s)
    }
}

impl TryFrom<String> for Target {
    type Error = MaintenanceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Target::parse_key(&value)
    }
}

impl From<Target> for String {
    fn from(target: Target) -> Self {
        target.key()
    }
}

/// Tokens that tell apart cloud pools sharing a display name.
///
/// A pool gets a token only while its name is shared. Tokens are keyed by the
/// pool's stable id so the same pool keeps the same token across reloads.
#[derive(Debug, Clone, Default)]
pub struct Disambiguators {
    tokens: HashMap<String, String>,
}

impl Disambiguators {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &HashMap<String, String> {
        &self.tokens
    }

    pub fn token(&self, pool_id: &str) -> Option<&str> {
        self.tokens.get(pool_id).map(String::as_str)
    }

    /// Resolve `(pool_id, name)` pairs into targets, assigning tokens to
    /// duplicated names and dropping tokens of names that became unique.
    pub fn resolve(&mut self, pools: &[(String, String)]) -> Vec<(String, Target)> {
        let mut seen = HashSet::new();
        let mut duplicated = HashSet::new();
        for (_, name) in pools {
            if !seen.insert(name.as_str()) {
                duplicated.insert(name.as_str());
            }
        }

        pools
            .iter()
            .map(|(pool_id, name)| {
                let target = if duplicated.contains(name.as_str()) {
                    let token = self
                        .tokens
                        .entry(pool_id.clone())
                        .or_insert_with(|| {
                            debug!("Assigning disambiguator to cloud pool {}", pool_id);
                            Uuid::new_v4().to_string()
                        })
                        .clone();
                    Target::cloud_with_disambiguator(name.clone(), token)
                } else {
                    if self.tokens.remove(pool_id).is_some() {
                        debug!("Cloud pool {} name is unique again, dropping disambiguator", pool_id);
                    }
                    Target::cloud(name.clone())
                };
                (pool_id.clone(), target)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Target::agent("build-01"), "AGENT:build-01")]
    #[case(Target::agent("host:8080"), "AGENT:host:8080")]
    #[case(Target::cloud("aws"), "CLOUD:aws")]
    #[case(Target::cloud_with_disambiguator("aws", "3f1c"), "CLOUD:aws:3f1c")]
    fn keys_round_trip(#[case] target: Target, #[case] key: &str) {
        assert_eq!(target.key(), key);
        assert_eq!(Target::parse_key(key).unwrap(), target);
    }

    #[test]
    fn legacy_key_without_separator_is_an_agent() {
        assert_eq!(Target::parse_key("old-node").unwrap(), Target::agent("old-node"));
    }

    #[test]
    fn type_prefix_is_case_insensitive() {
        assert_eq!(Target::parse_key("cloud:aws").unwrap(), Target::cloud("aws"));
        assert_eq!(Target::parse_key("Agent:a").unwrap(), Target::agent("a"));
    }

    #[test]
    fn cloud_key_splits_at_last_separator() {
        let target = Target::parse_key("CLOUD:a:b:c").unwrap();
        assert_eq!(target.name(), "a:b");
        assert_eq!(target.disambiguator(), Some("c"));
    }

    #[rstest]
    #[case("")]
    #[case("CLOUD:aws:")]
    #[case("NODE:x")]
    #[case("AGENT:")]
    fn malformed_keys_are_rejected(#[case] key: &str) {
        assert!(matches!(
            Target::parse_key(key),
            Err(MaintenanceError::InvalidKey { .. })
        ));
    }

    #[test]
    fn targets_serialize_as_keys() {
        let json = serde_json::to_string(&Target::cloud_with_disambiguator("aws", "t")).unwrap();
        assert_eq!(json, "\"CLOUD:aws:t\"");
        let back: Target = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Target::cloud_with_disambiguator("aws", "t"));
    }

    #[test]
    fn duplicated_cloud_names_get_stable_tokens() {
        let mut disambiguators = Disambiguators::default();
        let pools = vec![
            ("east/aws".to_string(), "aws".to_string()),
            ("west/aws".to_string(), "aws".to_string()),
            ("east/gcp".to_string(), "gcp".to_string()),
        ];

        let first = disambiguators.resolve(&pools);
        assert!(first[0].1.disambiguator().is_some());
        assert!(first[1].1.disambiguator().is_some());
        assert_ne!(first[0].1, first[1].1);
        assert_eq!(first[2].1, Target::cloud("gcp"));

        let again = disambiguators.resolve(&pools);
        assert_eq!(first, again);
    }

    #[test]
    fn token_is_dropped_once_name_is_unique() {
        let mut disambiguators = Disambiguators::default();
        disambiguators.resolve(&[
            ("east/aws".to_string(), "aws".to_string()),
            ("west/aws".to_string(), "aws".to_string()),
        ]);

        let resolved = disambiguators.resolve(&[("east/aws".to_string(), "aws".to_string())]);
        assert_eq!(resolved[0].1, Target::cloud("aws"));
        assert!(disambiguators.token("east/aws").is_none());
    }
}
