use std::collections::BTreeMap;

use super::policies::PolicySets;
use super::workflow::Workflow;

/// Workspace used when a project declaration leaves `workspace` unset.
pub const DEFAULT_WORKSPACE: &str = "default";

/// Modified-file globs that trigger autoplan when a project does not
/// declare its own set.
pub const DEFAULT_AUTOPLAN_WHEN_MODIFIED: &[&str] = &[
    "**/*.tf*",
    "**/terragrunt.hcl",
    "**/.terraform.lock.hcl",
];

pub fn default_autoplan_when_modified() -> Vec<String> {
    DEFAULT_AUTOPLAN_WHEN_MODIFIED
        .iter()
        .map(|glob| glob.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Autoplan {
    pub enabled: bool,
    pub when_modified: Vec<String>,
}

impl Default for Autoplan {
    fn default() -> Self {
        Self {
            enabled: true,
            when_modified: default_autoplan_when_modified(),
        }
    }
}

/// One project declared by the repository document, fully defaulted.
///
/// A project is addressed by (dir, workspace) unless the document gives it a
/// unique `name`; the structural validator enforces that addressing stays
/// unambiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: Option<String>,
    pub dir: String,
    pub workspace: String,
    pub workflow_name: Option<String>,
    pub pull_request_workflow_name: Option<String>,
    pub deployment_workflow_name: Option<String>,
    pub apply_requirements: Option<Vec<String>>,
    pub autoplan: Autoplan,
}

/// The repository-authored document after structural validation and
/// defaulting. Untrusted input: nothing in here is honored until the
/// cross-validator has checked it against the matched server policy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepoCfg {
    pub version: i32,
    pub projects: Vec<Project>,
    pub workflows: BTreeMap<String, Workflow>,
    pub policies: PolicySets,
    pub automerge: bool,
    pub parallel_apply: bool,
    pub parallel_plan: bool,
    pub emoji_reaction: String,
    pub abort_on_execution_order_fail: bool,
}

impl RepoCfg {
    /// Projects addressed by an exact (dir, workspace) pair.
    pub fn find_projects_by_dir_workspace(&self, dir: &str, workspace: &str) -> Vec<&Project> {
        self.projects
            .iter()
            .filter(|p| p.dir == dir && p.workspace == workspace)
            .collect()
    }

    pub fn find_project_by_name(&self, name: &str) -> Option<&Project> {
        self.projects
            .iter()
            .find(|p| p.name.as_deref() == Some(name))
    }
}
