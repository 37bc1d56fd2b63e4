use serde::Deserialize;

use crate::error::ValidationErrors;
use crate::valid::{Owners, PolicySet, PolicySets, PolicySource, DEFAULT_APPROVE_COUNT};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawOwners {
    #[serde(default)]
    pub users: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPolicySet {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub approve_count: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPolicySets {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub approve_count: Option<i64>,
    #[serde(default)]
    pub owners: Option<RawOwners>,
    #[serde(default)]
    pub policy_sets: Vec<RawPolicySet>,
}

impl RawPolicySets {
    pub fn validate(&self, field: &str, errs: &mut ValidationErrors) {
        if let Some(version) = &self.version {
            if !is_version_string(version) {
                errs.push(
                    format!("{field}.version"),
                    format!("\"{version}\" is not a valid version string"),
                );
            }
        }
        for (idx, set) in self.policy_sets.iter().enumerate() {
            let set_field = format!("{field}.policy_sets[{idx}]");
            if set.name.as_deref().unwrap_or("").is_empty() {
                errs.push(format!("{set_field}.name"), "cannot be blank");
            }
            if set.path.as_deref().unwrap_or("").is_empty() {
                errs.push(format!("{set_field}.path"), "cannot be blank");
            }
            if let Some(source) = &set.source {
                if let Err(message) = PolicySource::parse(source) {
                    errs.push(format!("{set_field}.source"), message);
                }
            }
        }
    }

    pub fn to_valid(&self) -> PolicySets {
        let default_approve_count = positive_or(self.approve_count, DEFAULT_APPROVE_COUNT);
        PolicySets {
            version: self.version.clone().unwrap_or_default(),
            approve_count: default_approve_count,
            owners: Owners {
                users: self
                    .owners
                    .as_ref()
                    .map(|owners| owners.users.clone())
                    .unwrap_or_default(),
            },
            policy_sets: self
                .policy_sets
                .iter()
                .map(|set| PolicySet {
                    name: set.name.clone().unwrap_or_default(),
                    path: set.path.clone().unwrap_or_default(),
                    source: set
                        .source
                        .as_deref()
                        .and_then(|source| PolicySource::parse(source).ok())
                        .unwrap_or_default(),
                    // Unset or non-positive thresholds fall back to the
                    // top-level default.
                    approve_count: positive_or(set.approve_count, default_approve_count),
                })
                .collect(),
        }
    }
}

fn positive_or(raw: Option<i64>, fallback: u32) -> u32 {
    match raw {
        Some(count) if count > 0 => count as u32,
        _ => fallback,
    }
}

// Dotted-numeric with an optional leading `v`, e.g. `1.0.0` or `v0.2`.
fn is_version_string(raw: &str) -> bool {
    let trimmed = raw.strip_prefix('v').unwrap_or(raw);
    !trimmed.is_empty()
        && trimmed
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|ch| ch.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_strings_are_validated_when_present() {
        let raw: RawPolicySets =
            serde_yaml::from_str("version: not-a-version").expect("parse policies");
        let mut errs = ValidationErrors::new();
        raw.validate("policies", &mut errs);
        assert!(errs
            .to_string()
            .contains("\"not-a-version\" is not a valid version string"));

        for ok in ["1.0.0", "v1.0.0", "0.2"] {
            let raw = RawPolicySets {
                version: Some(ok.to_string()),
                ..RawPolicySets::default()
            };
            let mut errs = ValidationErrors::new();
            raw.validate("policies", &mut errs);
            assert!(errs.is_empty(), "{ok} should be accepted");
        }
    }

    #[test]
    fn sets_require_name_and_path() {
        let raw: RawPolicySets = serde_yaml::from_str(
            r#"
policy_sets:
- source: local
"#,
        )
        .expect("parse policies");
        let mut errs = ValidationErrors::new();
        raw.validate("policies", &mut errs);
        let rendered = errs.to_string();
        assert!(rendered.contains("policies.policy_sets[0].name: cannot be blank"));
        assert!(rendered.contains("policies.policy_sets[0].path: cannot be blank"));
    }

    #[test]
    fn approve_count_falls_back_to_top_level_default() {
        let raw: RawPolicySets = serde_yaml::from_str(
            r#"
version: 1.0.0
approve_count: 2
policy_sets:
- name: cost
  path: policies/cost
  source: local
- name: security
  path: policies/security
  source: local
  approve_count: 0
- name: naming
  path: policies/naming
  source: local
  approve_count: 3
"#,
        )
        .expect("parse policies");

        let valid = raw.to_valid();
        assert_eq!(valid.approve_count, 2);
        assert_eq!(valid.policy_sets[0].approve_count, 2);
        assert_eq!(valid.policy_sets[1].approve_count, 2);
        assert_eq!(valid.policy_sets[2].approve_count, 3);
    }

    #[test]
    fn unset_top_level_threshold_defaults_to_one() {
        let raw = RawPolicySets::default();
        assert_eq!(raw.to_valid().approve_count, DEFAULT_APPROVE_COUNT);
    }
}
