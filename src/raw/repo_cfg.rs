use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Deserialize;

use crate::error::{ConfigError, ValidationErrors};
use crate::valid::RepoCfg;

use super::policies::RawPolicySets;
use super::project::RawProject;
use super::workflow::RawWorkflow;

pub const SUPPORTED_VERSIONS: &[i64] = &[2, 3];

/// The repository document as authored (`plangate.yaml`).
///
/// Parsed fresh per webhook event and never cached across commits. Decoding
/// is strict: any unrecognized key is a hard parse error, because this
/// document is attacker-influenced and silent misconfiguration must not be
/// possible.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRepoCfg {
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub projects: Option<Vec<RawProject>>,
    #[serde(default)]
    pub workflows: Option<BTreeMap<String, Option<RawWorkflow>>>,
    #[serde(default)]
    pub policies: Option<RawPolicySets>,
    #[serde(default)]
    pub automerge: Option<bool>,
    #[serde(default)]
    pub parallel_apply: Option<bool>,
    #[serde(default)]
    pub parallel_plan: Option<bool>,
    #[serde(default)]
    pub emoji_reaction: Option<String>,
    #[serde(default)]
    pub abort_on_execution_order_fail: Option<bool>,
}

impl RawRepoCfg {
    /// Local well-formedness of the whole document, aggregated across every
    /// offending field.
    pub fn validate(&self) -> ValidationErrors {
        let mut errs = ValidationErrors::new();

        match self.version {
            None => errs.push("version", "is required"),
            Some(version) if !SUPPORTED_VERSIONS.contains(&version) => {
                errs.push("version", "only versions 2 and 3 are supported")
            }
            Some(_) => {}
        }

        let projects = self.projects.as_deref().unwrap_or_default();
        for (idx, project) in projects.iter().enumerate() {
            project.validate(&format!("projects[{idx}]"), &mut errs);
        }
        self.validate_project_addressing(projects, &mut errs);

        if let Some(workflows) = &self.workflows {
            for (name, workflow) in workflows {
                if let Some(workflow) = workflow {
                    workflow.validate(&format!("workflows.{name}"), &mut errs);
                }
            }
        }

        if let Some(policies) = &self.policies {
            policies.validate("policies", &mut errs);
        }

        errs
    }

    // Projects sharing a (dir, workspace) pair must all carry distinct
    // names so commands can target them separately.
    fn validate_project_addressing(&self, projects: &[RawProject], errs: &mut ValidationErrors) {
        let mut seen_names = HashSet::new();
        for project in projects {
            if let Some(name) = project.name.as_deref() {
                if !name.is_empty() && !seen_names.insert(name.to_string()) {
                    errs.push(
                        "projects",
                        format!(
                            "found two or more projects with name \"{name}\"; project names must be unique"
                        ),
                    );
                }
            }
        }

        let mut by_address: HashMap<(String, String), Vec<&RawProject>> = HashMap::new();
        for project in projects {
            let dir = super::project::normalize_dir(project.dir.as_deref().unwrap_or_default());
            let workspace = project
                .workspace
                .clone()
                .filter(|w| !w.is_empty())
                .unwrap_or_else(|| crate::valid::DEFAULT_WORKSPACE.to_string());
            by_address.entry((dir, workspace)).or_default().push(project);
        }
        let mut reported: Vec<String> = Vec::new();
        for ((dir, workspace), group) in &by_address {
            if group.len() > 1
                && group
                    .iter()
                    .any(|p| p.name.as_deref().unwrap_or("").is_empty())
            {
                reported.push(format!(
                    "there are two or more projects with dir: \"{dir}\" workspace: \"{workspace}\" that are not all named; they must have a 'name' key so they can be targeted for apply's separately"
                ));
            }
        }
        // Deterministic report order regardless of map iteration.
        reported.sort();
        for message in reported {
            errs.push("projects", message);
        }
    }

    /// Converts into the canonical document, applying every default and the
    /// schema-version-2 run-command re-tokenization.
    pub fn to_valid(&self) -> Result<RepoCfg, ConfigError> {
        let version = self.version.unwrap_or_default() as i32;

        let mut workflows = BTreeMap::new();
        if let Some(raw_workflows) = &self.workflows {
            for (name, raw) in raw_workflows {
                let raw = raw.clone().unwrap_or_default();
                workflows.insert(name.clone(), raw.to_workflow(name, version)?);
            }
        }

        Ok(RepoCfg {
            version,
            projects: self
                .projects
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(RawProject::to_valid)
                .collect(),
            workflows,
            policies: self
                .policies
                .as_ref()
                .map(RawPolicySets::to_valid)
                .unwrap_or_default(),
            automerge: self.automerge.unwrap_or(false),
            parallel_apply: self.parallel_apply.unwrap_or(false),
            parallel_plan: self.parallel_plan.unwrap_or(false),
            emoji_reaction: self.emoji_reaction.clone().unwrap_or_default(),
            abort_on_execution_order_fail: self.abort_on_execution_order_fail.unwrap_or(false),
        })
    }
}
