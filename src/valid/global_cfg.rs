use regex::Regex;

use crate::error::ConfigError;

use super::policies::POLICIES_PASSED_APPLY_REQUIREMENT;
use super::repo_cfg::{Project, RepoCfg};
use super::workflow::{
    default_deployment_workflow, default_pull_request_workflow, default_workflow,
    DeploymentWorkflow, PullRequestWorkflow, Workflow, DEFAULT_WORKFLOW_NAME,
};
use std::collections::BTreeMap;

pub const APPROVED_APPLY_REQUIREMENT: &str = "approved";
pub const MERGEABLE_APPLY_REQUIREMENT: &str = "mergeable";
pub const UNDIVERGED_APPLY_REQUIREMENT: &str = "undiverged";

pub const APPLY_REQUIREMENTS_KEY: &str = "apply_requirements";
pub const WORKFLOW_KEY: &str = "workflow";
pub const PULL_REQUEST_WORKFLOW_KEY: &str = "pull_request_workflow";
pub const DEPLOYMENT_WORKFLOW_KEY: &str = "deployment_workflow";
pub const ALLOWED_OVERRIDES_KEY: &str = "allowed_overrides";
pub const ALLOW_CUSTOM_WORKFLOWS_KEY: &str = "allow_custom_workflows";

/// Every override key a repository may be permitted to customize.
pub const ALLOWED_OVERRIDE_KEYS: &[&str] = &[
    APPLY_REQUIREMENTS_KEY,
    WORKFLOW_KEY,
    PULL_REQUEST_WORKFLOW_KEY,
    DEPLOYMENT_WORKFLOW_KEY,
];

/// Apply-requirement names a document author may write.
pub const SETTABLE_APPLY_REQUIREMENTS: &[&str] = &[
    APPROVED_APPLY_REQUIREMENT,
    MERGEABLE_APPLY_REQUIREMENT,
    UNDIVERGED_APPLY_REQUIREMENT,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckoutStrategy {
    Merge,
    #[default]
    Branch,
}

impl CheckoutStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Branch => "branch",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw {
            "merge" => Ok(Self::Merge),
            "branch" => Ok(Self::Branch),
            _ => Err("checkout strategy must be one of: merge, branch".to_string()),
        }
    }
}

impl std::fmt::Display for CheckoutStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A command run before any workflow stage for a matched repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowHook {
    pub run: String,
}

/// How a policy entry selects repositories: by exact identifier or by
/// pattern. The two are mutually exclusive by construction.
#[derive(Debug, Clone)]
pub enum RepoMatcher {
    Exact(String),
    Pattern(Regex),
}

impl RepoMatcher {
    pub fn matches(&self, repo_id: &str) -> bool {
        match self {
            Self::Exact(id) => id == repo_id,
            Self::Pattern(pattern) => pattern.is_match(repo_id),
        }
    }

    /// Display form: the exact id, or the pattern in `/slashes/`.
    pub fn id_string(&self) -> String {
        match self {
            Self::Exact(id) => id.clone(),
            Self::Pattern(pattern) => format!("/{}/", pattern.as_str()),
        }
    }
}

/// One operator-authored policy entry.
///
/// Every `None` field means "inherit from earlier matching entries": the
/// fold walks entries in declaration order and only non-`None` fields
/// overwrite the accumulated result.
#[derive(Debug, Clone)]
pub struct RepoEntry {
    pub matcher: RepoMatcher,
    pub branch_pattern: Option<Regex>,
    pub workflow: Option<Workflow>,
    pub pull_request_workflow: Option<PullRequestWorkflow>,
    pub deployment_workflow: Option<DeploymentWorkflow>,
    pub allowed_overrides: Option<Vec<String>>,
    pub allowed_workflows: Option<Vec<String>>,
    pub allowed_pull_request_workflows: Option<Vec<String>>,
    pub allowed_deployment_workflows: Option<Vec<String>>,
    pub allow_custom_workflows: Option<bool>,
    pub apply_requirements: Option<Vec<String>>,
    pub checkout_strategy: Option<CheckoutStrategy>,
    pub pre_workflow_hooks: Option<Vec<WorkflowHook>>,
    pub rebase_enabled: Option<bool>,
}

impl RepoEntry {
    /// An entry that matches `matcher` and inherits everything else.
    pub fn new(matcher: RepoMatcher) -> Self {
        Self {
            matcher,
            branch_pattern: None,
            workflow: None,
            pull_request_workflow: None,
            deployment_workflow: None,
            allowed_overrides: None,
            allowed_workflows: None,
            allowed_pull_request_workflows: None,
            allowed_deployment_workflows: None,
            allow_custom_workflows: None,
            apply_requirements: None,
            checkout_strategy: None,
            pre_workflow_hooks: None,
            rebase_enabled: None,
        }
    }

    pub fn id_matches(&self, repo_id: &str) -> bool {
        self.matcher.matches(repo_id)
    }

    /// An unset branch pattern matches every branch.
    pub fn branch_matches(&self, branch: &str) -> bool {
        match &self.branch_pattern {
            Some(pattern) => pattern.is_match(branch),
            None => true,
        }
    }

    pub fn id_string(&self) -> String {
        self.matcher.id_string()
    }

    // One fold step: non-None fields of `other` overwrite ours. A later
    // None never erases an earlier value.
    fn overwrite_from(&mut self, other: &RepoEntry) {
        if other.branch_pattern.is_some() {
            self.branch_pattern = other.branch_pattern.clone();
        }
        if other.workflow.is_some() {
            self.workflow = other.workflow.clone();
        }
        if other.pull_request_workflow.is_some() {
            self.pull_request_workflow = other.pull_request_workflow.clone();
        }
        if other.deployment_workflow.is_some() {
            self.deployment_workflow = other.deployment_workflow.clone();
        }
        if other.allowed_overrides.is_some() {
            self.allowed_overrides = other.allowed_overrides.clone();
        }
        if other.allowed_workflows.is_some() {
            self.allowed_workflows = other.allowed_workflows.clone();
        }
        if other.allowed_pull_request_workflows.is_some() {
            self.allowed_pull_request_workflows = other.allowed_pull_request_workflows.clone();
        }
        if other.allowed_deployment_workflows.is_some() {
            self.allowed_deployment_workflows = other.allowed_deployment_workflows.clone();
        }
        if other.allow_custom_workflows.is_some() {
            self.allow_custom_workflows = other.allow_custom_workflows;
        }
        if other.apply_requirements.is_some() {
            self.apply_requirements = other.apply_requirements.clone();
        }
        if other.checkout_strategy.is_some() {
            self.checkout_strategy = other.checkout_strategy;
        }
        if other.pre_workflow_hooks.is_some() {
            self.pre_workflow_hooks = other.pre_workflow_hooks.clone();
        }
        if other.rebase_enabled.is_some() {
            self.rebase_enabled = other.rebase_enabled;
        }
    }
}

/// The final, per-project configuration consumed by the execution layer.
///
/// A value with no references back into the documents that produced it;
/// constructed fresh per resolution and discarded after use.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedProjectCfg {
    pub name: Option<String>,
    pub repo_rel_dir: String,
    pub workspace: String,
    pub workflow: Workflow,
    pub pull_request_workflow: PullRequestWorkflow,
    pub deployment_workflow: DeploymentWorkflow,
    pub apply_requirements: Vec<String>,
    pub autoplan_enabled: bool,
    pub policy_sets: crate::valid::PolicySets,
    pub repo_cfg_version: i32,
}

/// Knobs for constructing the baseline server policy before any operator
/// entries are appended.
#[derive(Debug, Clone, Default)]
pub struct GlobalCfgArgs {
    /// Grants every override and custom workflows on the catch-all entry.
    /// Not an operator option; used by tests and trusted setups.
    pub allow_all_repo_settings: bool,
    pub pre_workflow_hooks: Vec<WorkflowHook>,
}

/// The operator-authored server policy after parsing: an ordered entry
/// list plus the named workflow definitions in all three projections.
///
/// Loaded once at process start and immutable during a resolution; a
/// reload must swap in a fully-constructed new value.
#[derive(Debug, Clone)]
pub struct GlobalCfg {
    pub repos: Vec<RepoEntry>,
    pub workflows: BTreeMap<String, Workflow>,
    pub pull_request_workflows: BTreeMap<String, PullRequestWorkflow>,
    pub deployment_workflows: BTreeMap<String, DeploymentWorkflow>,
}

impl GlobalCfg {
    /// The baseline policy: one catch-all entry that pins every field to
    /// its default so the fold always starts fully defined.
    pub fn new(args: GlobalCfgArgs) -> Self {
        let mut allowed_overrides = Vec::new();
        let mut allow_custom_workflows = false;
        if args.allow_all_repo_settings {
            allowed_overrides = ALLOWED_OVERRIDE_KEYS
                .iter()
                .map(|key| key.to_string())
                .collect();
            allow_custom_workflows = true;
        }

        let catch_all = RepoEntry {
            matcher: RepoMatcher::Pattern(Regex::new(".*").expect("catch-all pattern compiles")),
            branch_pattern: Some(Regex::new(".*").expect("catch-all pattern compiles")),
            workflow: Some(default_workflow(DEFAULT_WORKFLOW_NAME)),
            pull_request_workflow: Some(default_pull_request_workflow(DEFAULT_WORKFLOW_NAME)),
            deployment_workflow: Some(default_deployment_workflow(DEFAULT_WORKFLOW_NAME)),
            allowed_overrides: Some(allowed_overrides),
            allowed_workflows: Some(Vec::new()),
            allowed_pull_request_workflows: Some(Vec::new()),
            allowed_deployment_workflows: Some(Vec::new()),
            allow_custom_workflows: Some(allow_custom_workflows),
            apply_requirements: Some(Vec::new()),
            checkout_strategy: Some(CheckoutStrategy::default()),
            pre_workflow_hooks: Some(args.pre_workflow_hooks),
            rebase_enabled: Some(false),
        };

        let mut workflows = BTreeMap::new();
        workflows.insert(
            DEFAULT_WORKFLOW_NAME.to_string(),
            default_workflow(DEFAULT_WORKFLOW_NAME),
        );
        let mut pull_request_workflows = BTreeMap::new();
        pull_request_workflows.insert(
            DEFAULT_WORKFLOW_NAME.to_string(),
            default_pull_request_workflow(DEFAULT_WORKFLOW_NAME),
        );
        let mut deployment_workflows = BTreeMap::new();
        deployment_workflows.insert(
            DEFAULT_WORKFLOW_NAME.to_string(),
            default_deployment_workflow(DEFAULT_WORKFLOW_NAME),
        );

        Self {
            repos: vec![catch_all],
            workflows,
            pull_request_workflows,
            deployment_workflows,
        }
    }

    /// Folds every entry matching `repo_id`, in declaration order, into one
    /// effective entry: later matches overwrite field-by-field, `None`
    /// fields are no-ops. This is the precedence algorithm; do not confuse
    /// it with [`GlobalCfg::matching_repo`].
    pub fn fold_matching(&self, repo_id: &str) -> RepoEntry {
        let mut folded = RepoEntry::new(RepoMatcher::Exact(repo_id.to_string()));
        for (idx, entry) in self.repos.iter().enumerate() {
            if entry.id_matches(repo_id) {
                tracing::debug!(
                    repo_id,
                    entry = idx,
                    matcher = %entry.id_string(),
                    "folding matching server policy entry"
                );
                folded.overwrite_from(entry);
            }
        }
        folded
    }

    /// The single *last* entry matching `repo_id`, without folding. Used
    /// for non-merge lookups; distinct from [`GlobalCfg::fold_matching`].
    pub fn matching_repo(&self, repo_id: &str) -> Option<&RepoEntry> {
        self.repos.iter().rev().find(|entry| entry.id_matches(repo_id))
    }

    /// Checks an already-normalized repository document against the policy
    /// matched for `repo_id`: override gating, custom-workflow permission,
    /// workflow existence and per-type allow-lists.
    pub fn validate_repo_cfg(&self, repo_cfg: &RepoCfg, repo_id: &str) -> Result<(), ConfigError> {
        let folded = self.fold_matching(repo_id);
        let allowed_overrides = folded.allowed_overrides.unwrap_or_default();
        let allow_custom_workflows = folded.allow_custom_workflows.unwrap_or(false);

        let not_allowed = |key: &str| {
            ConfigError::Permission(format!(
                "repo config not allowed to set '{key}' key: server-side config needs '{ALLOWED_OVERRIDES_KEY}: [{key}]'"
            ))
        };

        for project in &repo_cfg.projects {
            if project.workflow_name.is_some() && !allowed_overrides.iter().any(|k| k == WORKFLOW_KEY) {
                return Err(not_allowed(WORKFLOW_KEY));
            }
            if project.pull_request_workflow_name.is_some()
                && !allowed_overrides.iter().any(|k| k == PULL_REQUEST_WORKFLOW_KEY)
            {
                return Err(not_allowed(PULL_REQUEST_WORKFLOW_KEY));
            }
            if project.deployment_workflow_name.is_some()
                && !allowed_overrides.iter().any(|k| k == DEPLOYMENT_WORKFLOW_KEY)
            {
                return Err(not_allowed(DEPLOYMENT_WORKFLOW_KEY));
            }
            if project.apply_requirements.is_some()
                && !allowed_overrides.iter().any(|k| k == APPLY_REQUIREMENTS_KEY)
            {
                return Err(not_allowed(APPLY_REQUIREMENTS_KEY));
            }
        }

        if !repo_cfg.workflows.is_empty() && !allow_custom_workflows {
            return Err(ConfigError::Permission(format!(
                "repo config not allowed to define custom workflows: server-side config needs '{ALLOW_CUSTOM_WORKFLOWS_KEY}: true'"
            )));
        }

        // Every referenced workflow must be defined somewhere reachable;
        // the default workflow always exists implicitly.
        for project in &repo_cfg.projects {
            if let Some(name) = &project.workflow_name {
                if !self.workflow_defined(repo_cfg, name) {
                    return Err(undefined_workflow(name));
                }
            }
            if let Some(name) = &project.pull_request_workflow_name {
                if !repo_cfg.workflows.contains_key(name)
                    && !self.pull_request_workflows.contains_key(name)
                {
                    return Err(undefined_workflow(name));
                }
            }
            if let Some(name) = &project.deployment_workflow_name {
                if !repo_cfg.workflows.contains_key(name)
                    && !self.deployment_workflows.contains_key(name)
                {
                    return Err(undefined_workflow(name));
                }
            }
        }

        // An empty allow-list means "no restriction". A repo-defined custom
        // workflow satisfies the check when custom workflows are permitted.
        let check_allow_list = |name: &Option<String>, allowed: &Option<Vec<String>>| {
            let Some(name) = name else { return Ok(()) };
            let allowed = allowed.as_deref().unwrap_or_default();
            if allowed.is_empty() {
                return Ok(());
            }
            if allow_custom_workflows && repo_cfg.workflows.contains_key(name) {
                return Ok(());
            }
            if !allowed.iter().any(|candidate| candidate == name) {
                return Err(ConfigError::Permission(format!(
                    "workflow \"{name}\" is not allowed for this repo"
                )));
            }
            Ok(())
        };

        for project in &repo_cfg.projects {
            check_allow_list(&project.workflow_name, &folded.allowed_workflows)?;
            check_allow_list(
                &project.pull_request_workflow_name,
                &folded.allowed_pull_request_workflows,
            )?;
            check_allow_list(
                &project.deployment_workflow_name,
                &folded.allowed_deployment_workflows,
            )?;
        }

        Ok(())
    }

    fn workflow_defined(&self, repo_cfg: &RepoCfg, name: &str) -> bool {
        repo_cfg.workflows.contains_key(name) || self.workflows.contains_key(name)
    }

    /// Resolves one project into its final configuration. Assumes both
    /// documents already passed validation.
    pub fn merge_project_cfg(
        &self,
        repo_id: &str,
        project: &Project,
        repo_cfg: &RepoCfg,
    ) -> MergedProjectCfg {
        let folded = self.fold_matching(repo_id);
        let allowed_overrides = folded.allowed_overrides.unwrap_or_default();
        let allow_custom_workflows = folded.allow_custom_workflows.unwrap_or(false);

        let mut apply_requirements = folded.apply_requirements.unwrap_or_default();
        let mut workflow = folded
            .workflow
            .unwrap_or_else(|| default_workflow(DEFAULT_WORKFLOW_NAME));
        let mut pull_request_workflow = folded
            .pull_request_workflow
            .unwrap_or_else(|| default_pull_request_workflow(DEFAULT_WORKFLOW_NAME));
        let mut deployment_workflow = folded
            .deployment_workflow
            .unwrap_or_else(|| default_deployment_workflow(DEFAULT_WORKFLOW_NAME));

        for key in &allowed_overrides {
            match key.as_str() {
                APPLY_REQUIREMENTS_KEY => {
                    if let Some(reqs) = &project.apply_requirements {
                        tracing::debug!(
                            repo_id,
                            requirements = ?reqs,
                            "overriding server-defined apply_requirements with repo settings"
                        );
                        apply_requirements = reqs.clone();
                    }
                }
                WORKFLOW_KEY => {
                    if let Some(name) = &project.workflow_name {
                        // Server-global definitions first, then the repo's
                        // own, so repository definitions shadow global ones
                        // only when custom workflows are permitted.
                        if let Some(found) = self.workflows.get(name) {
                            workflow = found.clone();
                        }
                        if allow_custom_workflows {
                            if let Some(found) = repo_cfg.workflows.get(name) {
                                workflow = found.clone();
                            }
                        }
                        tracing::debug!(
                            repo_id,
                            workflow = %workflow.name,
                            "overriding server-defined workflow with repo-specified workflow"
                        );
                    }
                }
                PULL_REQUEST_WORKFLOW_KEY => {
                    if let Some(name) = &project.pull_request_workflow_name {
                        if let Some(found) = self.pull_request_workflows.get(name) {
                            pull_request_workflow = found.clone();
                        }
                        if allow_custom_workflows {
                            if let Some(found) = repo_cfg.workflows.get(name) {
                                pull_request_workflow = found.as_pull_request();
                            }
                        }
                        tracing::debug!(
                            repo_id,
                            workflow = %pull_request_workflow.name,
                            "overriding server-defined pull_request_workflow with repo-specified workflow"
                        );
                    }
                }
                DEPLOYMENT_WORKFLOW_KEY => {
                    if let Some(name) = &project.deployment_workflow_name {
                        if let Some(found) = self.deployment_workflows.get(name) {
                            deployment_workflow = found.clone();
                        }
                        if allow_custom_workflows {
                            if let Some(found) = repo_cfg.workflows.get(name) {
                                deployment_workflow = found.as_deployment();
                            }
                        }
                        tracing::debug!(
                            repo_id,
                            workflow = %deployment_workflow.name,
                            "overriding server-defined deployment_workflow with repo-specified workflow"
                        );
                    }
                }
                _ => {}
            }
        }

        // Policy gating survives any repository-level override.
        if repo_cfg.policies.has_policies()
            && !apply_requirements
                .iter()
                .any(|req| req == POLICIES_PASSED_APPLY_REQUIREMENT)
        {
            apply_requirements.push(POLICIES_PASSED_APPLY_REQUIREMENT.to_string());
        }

        MergedProjectCfg {
            name: project.name.clone(),
            repo_rel_dir: project.dir.clone(),
            workspace: project.workspace.clone(),
            workflow,
            pull_request_workflow,
            deployment_workflow,
            apply_requirements,
            autoplan_enabled: project.autoplan.enabled,
            policy_sets: repo_cfg.policies.clone(),
            repo_cfg_version: repo_cfg.version,
        }
    }

    /// Configuration for a repository with no document of its own: pure
    /// server defaults for the given directory and workspace.
    pub fn default_project_cfg(
        &self,
        repo_id: &str,
        repo_rel_dir: &str,
        workspace: &str,
    ) -> MergedProjectCfg {
        let folded = self.fold_matching(repo_id);
        MergedProjectCfg {
            name: None,
            repo_rel_dir: repo_rel_dir.to_string(),
            workspace: workspace.to_string(),
            workflow: folded
                .workflow
                .unwrap_or_else(|| default_workflow(DEFAULT_WORKFLOW_NAME)),
            pull_request_workflow: folded
                .pull_request_workflow
                .unwrap_or_else(|| default_pull_request_workflow(DEFAULT_WORKFLOW_NAME)),
            deployment_workflow: folded
                .deployment_workflow
                .unwrap_or_else(|| default_deployment_workflow(DEFAULT_WORKFLOW_NAME)),
            apply_requirements: folded.apply_requirements.unwrap_or_default(),
            autoplan_enabled: true,
            policy_sets: crate::valid::PolicySets::default(),
            repo_cfg_version: 0,
        }
    }
}

fn undefined_workflow(name: &str) -> ConfigError {
    ConfigError::Reference(format!("workflow \"{name}\" is not defined anywhere"))
}
