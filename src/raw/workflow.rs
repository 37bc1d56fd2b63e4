use serde::Deserialize;

use crate::error::{ConfigError, ValidationErrors};
use crate::valid::{
    default_apply_stage, default_plan_stage, default_policy_check_stage, DeploymentWorkflow,
    PullRequestWorkflow, Stage, Workflow,
};

use super::step::RawStep;

/// One stage as authored. `steps: ~` (key present, no list) and an absent
/// stage both take the default stage; an explicit `steps: []` stays empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStage {
    #[serde(default)]
    pub steps: Option<Vec<RawStep>>,
}

impl RawStage {
    pub fn validate(&self, field: &str, errs: &mut ValidationErrors) {
        if let Some(steps) = &self.steps {
            for (idx, step) in steps.iter().enumerate() {
                step.validate(&format!("{field}.steps[{idx}]"), errs);
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawWorkflow {
    #[serde(default)]
    pub plan: Option<RawStage>,
    #[serde(default)]
    pub policy_check: Option<RawStage>,
    #[serde(default)]
    pub apply: Option<RawStage>,
}

impl RawWorkflow {
    pub fn validate(&self, field: &str, errs: &mut ValidationErrors) {
        if let Some(stage) = &self.plan {
            stage.validate(&format!("{field}.plan"), errs);
        }
        if let Some(stage) = &self.policy_check {
            stage.validate(&format!("{field}.policy_check"), errs);
        }
        if let Some(stage) = &self.apply {
            stage.validate(&format!("{field}.apply"), errs);
        }
    }

    pub fn to_workflow(&self, name: &str, version: i32) -> Result<Workflow, ConfigError> {
        Ok(Workflow {
            name: name.to_string(),
            plan: stage_or_default(&self.plan, version, default_plan_stage)?,
            policy_check: stage_or_default(&self.policy_check, version, default_policy_check_stage)?,
            apply: stage_or_default(&self.apply, version, default_apply_stage)?,
        })
    }

    /// Pull-request projection: the apply stage is never converted.
    pub fn to_pull_request_workflow(
        &self,
        name: &str,
        version: i32,
    ) -> Result<PullRequestWorkflow, ConfigError> {
        Ok(PullRequestWorkflow {
            name: name.to_string(),
            plan: stage_or_default(&self.plan, version, default_plan_stage)?,
            policy_check: stage_or_default(&self.policy_check, version, default_policy_check_stage)?,
        })
    }

    /// Deployment projection: the policy-check stage is never converted.
    pub fn to_deployment_workflow(
        &self,
        name: &str,
        version: i32,
    ) -> Result<DeploymentWorkflow, ConfigError> {
        Ok(DeploymentWorkflow {
            name: name.to_string(),
            plan: stage_or_default(&self.plan, version, default_plan_stage)?,
            apply: stage_or_default(&self.apply, version, default_apply_stage)?,
        })
    }
}

// Per-stage defaulting: only the missing stage takes its default, never the
// whole workflow.
fn stage_or_default(
    raw: &Option<RawStage>,
    version: i32,
    default: fn() -> Stage,
) -> Result<Stage, ConfigError> {
    match raw {
        None | Some(RawStage { steps: None }) => Ok(default()),
        Some(RawStage { steps: Some(steps) }) => {
            let steps = steps
                .iter()
                .map(|step| step.to_valid(version))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Stage { steps })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valid::{BuiltinStep, Step};

    #[test]
    fn missing_stages_take_their_default_only() {
        let raw: RawWorkflow = serde_yaml::from_str(
            r#"
plan:
  steps:
  - run: echo planning
"#,
        )
        .expect("parse workflow");

        let workflow = raw.to_workflow("custom", 3).expect("convert workflow");
        assert_eq!(
            workflow.plan.steps,
            vec![Step::Run {
                command: "echo planning".to_string()
            }]
        );
        assert_eq!(workflow.apply, default_apply_stage());
        assert_eq!(workflow.policy_check, default_policy_check_stage());
    }

    #[test]
    fn null_steps_key_takes_the_default_stage() {
        let raw: RawWorkflow = serde_yaml::from_str(
            r#"
plan:
  steps:
apply:
  steps:
"#,
        )
        .expect("parse workflow");

        let workflow = raw.to_workflow("custom", 3).expect("convert workflow");
        assert_eq!(workflow.plan, default_plan_stage());
        assert_eq!(workflow.apply, default_apply_stage());
    }

    #[test]
    fn explicitly_empty_steps_stay_empty() {
        let raw: RawWorkflow = serde_yaml::from_str(
            r#"
apply:
  steps: []
"#,
        )
        .expect("parse workflow");

        let workflow = raw.to_workflow("custom", 3).expect("convert workflow");
        assert!(workflow.apply.is_empty());
        assert_eq!(workflow.plan, default_plan_stage());
    }

    #[test]
    fn projections_carry_only_their_stages() {
        let raw: RawWorkflow = serde_yaml::from_str(
            r#"
plan:
  steps:
  - init
  - plan
"#,
        )
        .expect("parse workflow");

        let pr = raw
            .to_pull_request_workflow("custom", 3)
            .expect("convert pull-request workflow");
        assert_eq!(
            pr.plan.steps,
            vec![
                Step::Builtin {
                    name: BuiltinStep::Init
                },
                Step::Builtin {
                    name: BuiltinStep::Plan
                },
            ]
        );

        let deploy = raw
            .to_deployment_workflow("custom", 3)
            .expect("convert deployment workflow");
        assert_eq!(deploy.apply, default_apply_stage());
    }

    #[test]
    fn unknown_stage_keys_are_rejected() {
        let err = serde_yaml::from_str::<RawWorkflow>(
            r#"
plan:
  steps: []
destroy:
  steps: []
"#,
        )
        .expect_err("unknown stage must fail");
        assert!(err.to_string().contains("destroy"));
    }

    #[test]
    fn step_failures_carry_their_field_path() {
        let raw: RawWorkflow = serde_yaml::from_str(
            r#"
plan:
  steps:
  - import
"#,
        )
        .expect("parse workflow");

        let mut errs = ValidationErrors::new();
        raw.validate("workflows.custom", &mut errs);
        let rendered = errs.to_string();
        assert!(rendered.contains("workflows.custom.plan.steps[0]"));
        assert!(rendered.contains("not a valid step name"));
    }
}
