/// Name of the workflow that always exists, even with an empty server policy.
pub const DEFAULT_WORKFLOW_NAME: &str = "default";

/// Built-in actions a step may invoke without a custom command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinStep {
    Init,
    Plan,
    Apply,
    Show,
    PolicyCheck,
}

impl BuiltinStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Plan => "plan",
            Self::Apply => "apply",
            Self::Show => "show",
            Self::PolicyCheck => "policy_check",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw {
            "init" => Ok(Self::Init),
            "plan" => Ok(Self::Plan),
            "apply" => Ok(Self::Apply),
            "show" => Ok(Self::Show),
            "policy_check" => Ok(Self::PolicyCheck),
            _ => Err(format!(
                "`{raw}` is not a valid step name, only `init`, `plan`, `apply`, `show` and `policy_check` are supported"
            )),
        }
    }
}

impl std::fmt::Display for BuiltinStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where an `env` step takes its value from. The two sources are mutually
/// exclusive; the raw decoder rejects documents that set both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValueSource {
    Literal(String),
    Command(String),
}

/// The smallest unit of a workflow: one named action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Builtin {
        name: BuiltinStep,
    },
    BuiltinWithArgs {
        name: BuiltinStep,
        extra_args: Vec<String>,
    },
    Env {
        name: String,
        source: EnvValueSource,
    },
    Run {
        command: String,
    },
}

/// An ordered sequence of steps representing one phase of a workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stage {
    pub steps: Vec<Step>,
}

impl Stage {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A named bundle of stages covering every phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    pub name: String,
    pub plan: Stage,
    pub policy_check: Stage,
    pub apply: Stage,
}

impl Workflow {
    /// Projection used when a full workflow is selected for the
    /// pull-request surface: the apply stage is dropped.
    pub fn as_pull_request(&self) -> PullRequestWorkflow {
        PullRequestWorkflow {
            name: self.name.clone(),
            plan: self.plan.clone(),
            policy_check: self.policy_check.clone(),
        }
    }

    /// Projection used when a full workflow is selected for deployments:
    /// the policy-check stage is dropped.
    pub fn as_deployment(&self) -> DeploymentWorkflow {
        DeploymentWorkflow {
            name: self.name.clone(),
            plan: self.plan.clone(),
            apply: self.apply.clone(),
        }
    }
}

/// Restricted workflow used on pull-request events; it carries no apply
/// stage because applies never run from that surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestWorkflow {
    pub name: String,
    pub plan: Stage,
    pub policy_check: Stage,
}

/// Restricted workflow used on deployments; policy checks already gated the
/// pull request, so it carries plan and apply only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentWorkflow {
    pub name: String,
    pub plan: Stage,
    pub apply: Stage,
}

// Default stages are constructed fresh on every call so concurrent
// resolutions can never observe cross-talk through a shared value.

pub fn default_plan_stage() -> Stage {
    Stage {
        steps: vec![
            Step::Builtin {
                name: BuiltinStep::Init,
            },
            Step::Builtin {
                name: BuiltinStep::Plan,
            },
        ],
    }
}

pub fn default_apply_stage() -> Stage {
    Stage {
        steps: vec![Step::Builtin {
            name: BuiltinStep::Apply,
        }],
    }
}

pub fn default_policy_check_stage() -> Stage {
    Stage {
        steps: vec![
            Step::Builtin {
                name: BuiltinStep::Show,
            },
            Step::Builtin {
                name: BuiltinStep::PolicyCheck,
            },
        ],
    }
}

pub fn default_workflow(name: &str) -> Workflow {
    Workflow {
        name: name.to_string(),
        plan: default_plan_stage(),
        policy_check: default_policy_check_stage(),
        apply: default_apply_stage(),
    }
}

pub fn default_pull_request_workflow(name: &str) -> PullRequestWorkflow {
    PullRequestWorkflow {
        name: name.to_string(),
        plan: default_plan_stage(),
        policy_check: default_policy_check_stage(),
    }
}

pub fn default_deployment_workflow(name: &str) -> DeploymentWorkflow {
    DeploymentWorkflow {
        name: name.to_string(),
        plan: default_plan_stage(),
        apply: default_apply_stage(),
    }
}
