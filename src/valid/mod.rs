//! Canonical, fully-defaulted domain objects: what the rest of the system
//! consumes after parsing, structural validation and normalization.

pub mod global_cfg;
pub mod policies;
pub mod repo_cfg;
pub mod workflow;

pub use global_cfg::{
    CheckoutStrategy, GlobalCfg, GlobalCfgArgs, MergedProjectCfg, RepoEntry, RepoMatcher,
    WorkflowHook, ALLOWED_OVERRIDES_KEY, ALLOWED_OVERRIDE_KEYS, ALLOW_CUSTOM_WORKFLOWS_KEY,
    APPLY_REQUIREMENTS_KEY, APPROVED_APPLY_REQUIREMENT, DEPLOYMENT_WORKFLOW_KEY,
    MERGEABLE_APPLY_REQUIREMENT, PULL_REQUEST_WORKFLOW_KEY, SETTABLE_APPLY_REQUIREMENTS,
    UNDIVERGED_APPLY_REQUIREMENT, WORKFLOW_KEY,
};
pub use policies::{
    Owners, PolicySet, PolicySets, PolicySource, DEFAULT_APPROVE_COUNT,
    POLICIES_PASSED_APPLY_REQUIREMENT,
};
pub use repo_cfg::{
    default_autoplan_when_modified, Autoplan, Project, RepoCfg, DEFAULT_AUTOPLAN_WHEN_MODIFIED,
    DEFAULT_WORKSPACE,
};
pub use workflow::{
    default_apply_stage, default_deployment_workflow, default_plan_stage,
    default_policy_check_stage, default_pull_request_workflow, default_workflow, BuiltinStep,
    DeploymentWorkflow, EnvValueSource, PullRequestWorkflow, Stage, Step, Workflow,
    DEFAULT_WORKFLOW_NAME,
};
