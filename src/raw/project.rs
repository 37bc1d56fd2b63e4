use serde::Deserialize;

use crate::error::ValidationErrors;
use crate::valid::{
    default_autoplan_when_modified, Autoplan, Project, DEFAULT_WORKSPACE,
    SETTABLE_APPLY_REQUIREMENTS,
};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawAutoplan {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub when_modified: Option<Vec<String>>,
}

impl RawAutoplan {
    pub fn to_valid(&self) -> Autoplan {
        Autoplan {
            enabled: self.enabled.unwrap_or(true),
            when_modified: self
                .when_modified
                .clone()
                .unwrap_or_else(default_autoplan_when_modified),
        }
    }
}

/// One project declaration as authored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawProject {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default)]
    pub workspace: Option<String>,
    #[serde(default)]
    pub workflow: Option<String>,
    #[serde(default)]
    pub pull_request_workflow: Option<String>,
    #[serde(default)]
    pub deployment_workflow: Option<String>,
    #[serde(default)]
    pub apply_requirements: Option<Vec<String>>,
    #[serde(default)]
    pub autoplan: Option<RawAutoplan>,
}

impl RawProject {
    pub fn validate(&self, field: &str, errs: &mut ValidationErrors) {
        match self.dir.as_deref() {
            None | Some("") => errs.push(format!("{field}.dir"), "cannot be blank"),
            Some(dir) => {
                if dir.split('/').any(|segment| segment == "..") {
                    errs.push(format!("{field}.dir"), "cannot contain '..'");
                }
            }
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                errs.push(format!("{field}.name"), "if set, cannot be blank");
            }
        }
        if let Some(requirements) = &self.apply_requirements {
            for requirement in requirements {
                if !SETTABLE_APPLY_REQUIREMENTS.contains(&requirement.as_str()) {
                    errs.push(
                        format!("{field}.apply_requirements"),
                        format!(
                            "\"{requirement}\" is not a valid apply_requirement, only \"approved\", \"mergeable\" and \"undiverged\" are supported"
                        ),
                    );
                }
            }
        }
    }

    pub fn to_valid(&self) -> Project {
        Project {
            name: self.name.clone(),
            dir: normalize_dir(self.dir.as_deref().unwrap_or_default()),
            workspace: self
                .workspace
                .clone()
                .filter(|workspace| !workspace.is_empty())
                .unwrap_or_else(|| DEFAULT_WORKSPACE.to_string()),
            workflow_name: self.workflow.clone(),
            pull_request_workflow_name: self.pull_request_workflow.clone(),
            deployment_workflow_name: self.deployment_workflow.clone(),
            apply_requirements: self.apply_requirements.clone(),
            autoplan: self
                .autoplan
                .as_ref()
                .map(RawAutoplan::to_valid)
                .unwrap_or_default(),
        }
    }
}

/// Normalizes a project directory into a clean relative path usable as a
/// map key: leading slash stripped, `.` and empty segments collapsed.
pub fn normalize_dir(raw: &str) -> String {
    let segments: Vec<&str> = raw
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_is_required() {
        let mut errs = ValidationErrors::new();
        RawProject::default().validate("projects[0]", &mut errs);
        assert!(errs.to_string().contains("projects[0].dir: cannot be blank"));
    }

    #[test]
    fn parent_traversal_is_rejected() {
        let raw: RawProject = serde_yaml::from_str("dir: ../escape").expect("parse project");
        let mut errs = ValidationErrors::new();
        raw.validate("projects[0]", &mut errs);
        assert!(errs.to_string().contains("cannot contain '..'"));
    }

    #[test]
    fn apply_requirement_membership_is_enforced() {
        let raw: RawProject =
            serde_yaml::from_str("dir: .\napply_requirements: [signed_off]").expect("parse project");
        let mut errs = ValidationErrors::new();
        raw.validate("projects[0]", &mut errs);
        assert!(errs
            .to_string()
            .contains("\"signed_off\" is not a valid apply_requirement"));
    }

    #[test]
    fn defaults_fill_workspace_and_autoplan() {
        let raw: RawProject = serde_yaml::from_str("dir: terraform/prod").expect("parse project");
        let project = raw.to_valid();
        assert_eq!(project.workspace, "default");
        assert!(project.autoplan.enabled);
        assert_eq!(
            project.autoplan.when_modified,
            default_autoplan_when_modified()
        );
        assert!(project.apply_requirements.is_none());
    }

    #[test]
    fn autoplan_with_only_when_modified_stays_enabled() {
        let raw: RawProject = serde_yaml::from_str(
            r#"
dir: .
autoplan:
  when_modified: ["**/*.tf"]
"#,
        )
        .expect("parse project");
        let project = raw.to_valid();
        assert!(project.autoplan.enabled);
        assert_eq!(project.autoplan.when_modified, vec!["**/*.tf".to_string()]);
    }

    #[test]
    fn dirs_normalize_to_clean_relative_paths() {
        assert_eq!(normalize_dir("/terraform/prod"), "terraform/prod");
        assert_eq!(normalize_dir("./terraform//prod/."), "terraform/prod");
        assert_eq!(normalize_dir("."), ".");
        assert_eq!(normalize_dir("./"), ".");
    }

    #[test]
    fn normalization_is_idempotent() {
        for dir in ["terraform/prod", ".", "a/b/c"] {
            assert_eq!(normalize_dir(&normalize_dir(dir)), normalize_dir(dir));
        }
    }

    #[test]
    fn unknown_project_keys_are_rejected() {
        let err = serde_yaml::from_str::<RawProject>("dir: .\nterraform_version: v1.5.0")
            .expect_err("unknown key must fail");
        assert!(err.to_string().contains("terraform_version"));
    }
}
