use std::collections::BTreeMap;

use regex::Regex;
use serde::Deserialize;

use crate::error::{ConfigError, ValidationErrors};
use crate::valid::{
    CheckoutStrategy, GlobalCfg, RepoEntry, RepoMatcher, WorkflowHook, ALLOWED_OVERRIDE_KEYS,
    SETTABLE_APPLY_REQUIREMENTS,
};

use super::workflow::RawWorkflow;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawWorkflowHook {
    #[serde(default)]
    pub run: Option<String>,
}

/// One server-side policy entry as authored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRepoEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub workflow: Option<String>,
    #[serde(default)]
    pub pull_request_workflow: Option<String>,
    #[serde(default)]
    pub deployment_workflow: Option<String>,
    #[serde(default)]
    pub allowed_overrides: Option<Vec<String>>,
    #[serde(default)]
    pub allowed_workflows: Option<Vec<String>>,
    #[serde(default)]
    pub allowed_pull_request_workflows: Option<Vec<String>>,
    #[serde(default)]
    pub allowed_deployment_workflows: Option<Vec<String>>,
    #[serde(default)]
    pub allow_custom_workflows: Option<bool>,
    #[serde(default)]
    pub apply_requirements: Option<Vec<String>>,
    #[serde(default)]
    pub checkout_strategy: Option<String>,
    #[serde(default)]
    pub pre_workflow_hooks: Option<Vec<RawWorkflowHook>>,
    #[serde(default)]
    pub rebase_enabled: Option<bool>,
}

/// The operator-authored server policy document as authored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawGlobalCfg {
    #[serde(default)]
    pub repos: Vec<RawRepoEntry>,
    #[serde(default)]
    pub workflows: Option<BTreeMap<String, Option<RawWorkflow>>>,
}

impl RawRepoEntry {
    pub fn validate(&self, field: &str, errs: &mut ValidationErrors) {
        match self.id.as_deref() {
            None | Some("") => errs.push(format!("{field}.id"), "cannot be blank"),
            Some(id) => {
                if let Some(pattern) = slash_delimited(id) {
                    if let Err(err) = Regex::new(pattern) {
                        errs.push(format!("{field}.id"), format!("parsing: {id}: {err}"));
                    }
                }
            }
        }

        if let Some(branch) = self.branch.as_deref() {
            match slash_delimited(branch) {
                None => errs.push(
                    format!("{field}.branch"),
                    "regex must begin and end with a slash '/'",
                ),
                Some(pattern) => {
                    if let Err(err) = Regex::new(pattern) {
                        errs.push(format!("{field}.branch"), format!("parsing: {branch}: {err}"));
                    }
                }
            }
        }

        if let Some(overrides) = &self.allowed_overrides {
            for key in overrides {
                if !ALLOWED_OVERRIDE_KEYS.contains(&key.as_str()) {
                    errs.push(
                        format!("{field}.allowed_overrides"),
                        format!(
                            "\"{key}\" is not a valid override, only \"apply_requirements\", \"workflow\", \"pull_request_workflow\" and \"deployment_workflow\" are supported"
                        ),
                    );
                }
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

        if let Some(strategy) = self.checkout_strategy.as_deref() {
            if let Err(message) = CheckoutStrategy::parse(strategy) {
                errs.push(format!("{field}.checkout_strategy"), message);
            }
        }

        if let Some(hooks) = &self.pre_workflow_hooks {
            for (idx, hook) in hooks.iter().enumerate() {
                if hook.run.as_deref().unwrap_or("").trim().is_empty() {
                    errs.push(
                        format!("{field}.pre_workflow_hooks[{idx}].run"),
                        "cannot be blank",
                    );
                }
            }
        }
    }
}

impl RawGlobalCfg {
    pub fn validate(&self) -> ValidationErrors {
        let mut errs = ValidationErrors::new();
        for (idx, entry) in self.repos.iter().enumerate() {
            entry.validate(&format!("repos[{idx}]"), &mut errs);
        }
        if let Some(workflows) = &self.workflows {
            for (name, workflow) in workflows {
                if let Some(workflow) = workflow {
                    workflow.validate(&format!("workflows.{name}"), &mut errs);
                }
            }
        }
        errs
    }

    /// Converts into the canonical server policy: operator workflows are
    /// added to (or redefine entries of) the default workflow maps in all
    /// three projections, and operator entries are appended after the
    /// baseline catch-all so the fold keeps its precedence order.
    pub fn to_valid(&self, default: GlobalCfg) -> Result<GlobalCfg, ConfigError> {
        let mut cfg = default;

        if let Some(raw_workflows) = &self.workflows {
            for (name, raw) in raw_workflows {
                let raw = raw.clone().unwrap_or_default();
                // Server documents always use current-schema semantics.
                cfg.workflows
                    .insert(name.clone(), raw.to_workflow(name, 3)?);
                cfg.pull_request_workflows
                    .insert(name.clone(), raw.to_pull_request_workflow(name, 3)?);
                cfg.deployment_workflows
                    .insert(name.clone(), raw.to_deployment_workflow(name, 3)?);
            }
        }

        for raw_entry in &self.repos {
            let id = raw_entry.id.clone().unwrap_or_default();
            let matcher = match slash_delimited(&id) {
                Some(pattern) => RepoMatcher::Pattern(
                    Regex::new(pattern)
                        .map_err(|err| ConfigError::parse("repos.id", format!("parsing: {id}: {err}")))?,
                ),
                None => RepoMatcher::Exact(id),
            };

            let mut entry = RepoEntry::new(matcher);
            if let Some(branch) = raw_entry.branch.as_deref() {
                let pattern = slash_delimited(branch).ok_or_else(|| {
                    ConfigError::parse("repos.branch", "regex must begin and end with a slash '/'")
                })?;
                entry.branch_pattern = Some(Regex::new(pattern).map_err(|err| {
                    ConfigError::parse("repos.branch", format!("parsing: {branch}: {err}"))
                })?);
            }

            if let Some(name) = &raw_entry.workflow {
                let workflow = cfg
                    .workflows
                    .get(name)
                    .ok_or_else(|| undefined_workflow(name))?;
                entry.workflow = Some(workflow.clone());
            }
            if let Some(name) = &raw_entry.pull_request_workflow {
                let workflow = cfg
                    .pull_request_workflows
                    .get(name)
                    .ok_or_else(|| undefined_workflow(name))?;
                entry.pull_request_workflow = Some(workflow.clone());
            }
            if let Some(name) = &raw_entry.deployment_workflow {
                let workflow = cfg
                    .deployment_workflows
                    .get(name)
                    .ok_or_else(|| undefined_workflow(name))?;
                entry.deployment_workflow = Some(workflow.clone());
            }

            entry.allowed_overrides = raw_entry.allowed_overrides.clone();
            entry.allowed_workflows = raw_entry.allowed_workflows.clone();
            entry.allowed_pull_request_workflows = raw_entry.allowed_pull_request_workflows.clone();
            entry.allowed_deployment_workflows = raw_entry.allowed_deployment_workflows.clone();
            entry.allow_custom_workflows = raw_entry.allow_custom_workflows;
            entry.apply_requirements = raw_entry.apply_requirements.clone();
            entry.checkout_strategy = match raw_entry.checkout_strategy.as_deref() {
                Some(strategy) => Some(CheckoutStrategy::parse(strategy).map_err(|message| {
                    ConfigError::parse("repos.checkout_strategy", message)
                })?),
                None => None,
            };
            entry.pre_workflow_hooks = raw_entry.pre_workflow_hooks.as_ref().map(|hooks| {
                hooks
                    .iter()
                    .map(|hook| WorkflowHook {
                        run: hook.run.clone().unwrap_or_default(),
                    })
                    .collect()
            });
            entry.rebase_enabled = raw_entry.rebase_enabled;

            cfg.repos.push(entry);
        }

        Ok(cfg)
    }
}

fn undefined_workflow(name: &str) -> ConfigError {
    ConfigError::Reference(format!("workflow \"{name}\" is not defined"))
}

// `/pattern/` → pattern; anything else is an exact string.
fn slash_delimited(raw: &str) -> Option<&str> {
    if raw.len() >= 2 && raw.starts_with('/') && raw.ends_with('/') {
        Some(&raw[1..raw.len() - 1])
    } else {
        None
    }
}
