/// Apply requirement injected whenever any policy set is configured. It is
/// synthetic: repository overrides can never remove it.
pub const POLICIES_PASSED_APPLY_REQUIREMENT: &str = "policies_passed";

/// Approval threshold used when neither a set nor the top level declares one.
pub const DEFAULT_APPROVE_COUNT: u32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PolicySource {
    #[default]
    Local,
    Github,
}

impl PolicySource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Github => "github",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw {
            "local" => Ok(Self::Local),
            "github" => Ok(Self::Github),
            _ => Err("source must be one of: local, github".to_string()),
        }
    }
}

impl std::fmt::Display for PolicySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One named, sourced bundle of admission-control rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySet {
    pub name: String,
    pub path: String,
    pub source: PolicySource,
    pub approve_count: u32,
}

/// Principals permitted to approve an override of a failed policy check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Owners {
    pub users: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicySets {
    pub version: String,
    pub approve_count: u32,
    pub owners: Owners,
    pub policy_sets: Vec<PolicySet>,
}

impl PolicySets {
    pub fn has_policies(&self) -> bool {
        !self.policy_sets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_declaration_has_no_policies() {
        assert!(!PolicySets::default().has_policies());
    }

    #[test]
    fn policy_source_round_trips_and_rejects_unknown() {
        assert_eq!(PolicySource::parse("local").unwrap(), PolicySource::Local);
        assert_eq!(PolicySource::parse("github").unwrap(), PolicySource::Github);
        assert!(PolicySource::parse("s3").is_err());
    }
}
