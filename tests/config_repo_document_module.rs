use plangate::valid::{default_plan_stage, default_policy_check_stage};
use plangate::{parse_repo_cfg, ConfigError, ConfigFormat, GlobalCfg, GlobalCfgArgs, RepoCfg};

fn permissive() -> GlobalCfg {
    GlobalCfg::new(GlobalCfgArgs {
        allow_all_repo_settings: true,
        ..GlobalCfgArgs::default()
    })
}

fn parse(yaml: &str) -> Result<RepoCfg, ConfigError> {
    parse_repo_cfg(
        yaml.as_bytes(),
        ConfigFormat::Yaml,
        &permissive(),
        "github.com/acme/infra",
    )
}

#[test]
fn minimal_project_gets_every_default() {
    let cfg = parse(
        r#"
version: 3
projects:
- dir: .
"#,
    )
    .expect("minimal document parses");

    let project = &cfg.projects[0];
    assert_eq!(project.dir, ".");
    assert_eq!(project.workspace, "default");
    assert!(project.autoplan.enabled);
    assert!(project.apply_requirements.is_none());
    assert!(project.workflow_name.is_none());
}

#[test]
fn project_directories_are_normalized() {
    let cfg = parse(
        r#"
version: 3
projects:
- dir: /terraform/./prod/
"#,
    )
    .expect("document parses");
    assert_eq!(cfg.projects[0].dir, "terraform/prod");
}

#[test]
fn renormalizing_a_valid_document_is_the_identity() {
    let cfg = parse(
        r#"
version: 3
projects:
- dir: ./terraform//prod
  workspace: default
automerge: true
"#,
    )
    .expect("document parses");

    // Feed the already-normalized values back through the pipeline.
    let round_tripped = parse(&format!(
        r#"
version: {}
projects:
- dir: {}
  workspace: {}
automerge: {}
"#,
        cfg.version, cfg.projects[0].dir, cfg.projects[0].workspace, cfg.automerge
    ))
    .expect("normalized document parses");

    assert_eq!(round_tripped, cfg);
}

#[test]
fn repository_switches_parse_and_default() {
    let defaulted = parse("version: 3").expect("empty project list parses");
    assert!(!defaulted.automerge);
    assert!(!defaulted.parallel_apply);
    assert!(!defaulted.parallel_plan);
    assert!(defaulted.emoji_reaction.is_empty());
    assert!(!defaulted.abort_on_execution_order_fail);

    let explicit = parse(
        r#"
version: 3
automerge: true
parallel_apply: true
parallel_plan: true
emoji_reaction: eyes
abort_on_execution_order_fail: true
"#,
    )
    .expect("switches parse");
    assert!(explicit.automerge);
    assert!(explicit.parallel_apply);
    assert!(explicit.parallel_plan);
    assert_eq!(explicit.emoji_reaction, "eyes");
    assert!(explicit.abort_on_execution_order_fail);
}

#[test]
fn shared_addresses_need_distinct_names() {
    let err = parse(
        r#"
version: 3
projects:
- dir: .
  workspace: workspace
- dir: .
  workspace: workspace
"#,
    )
    .expect_err("unnamed duplicate addresses must fail");
    match err {
        ConfigError::Validation(errs) => {
            assert!(errs.to_string().contains("that are not all named"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    parse(
        r#"
version: 3
projects:
- name: first
  dir: .
  workspace: workspace
- name: second
  dir: .
  workspace: workspace
"#,
    )
    .expect("distinct names disambiguate");
}

#[test]
fn normalized_directories_collide_in_uniqueness_checks() {
    // `./terraform` and `terraform` address the same project.
    let err = parse(
        r#"
version: 3
projects:
- dir: ./terraform
- dir: terraform
"#,
    )
    .expect_err("normalized duplicates must fail");
    assert!(err.to_string().contains("dir: \"terraform\""));
}

#[test]
fn structural_failures_are_aggregated_into_one_report() {
    let err = parse(
        r#"
projects:
- {}
- dir: ../up
  apply_requirements: [signed_off]
"#,
    )
    .expect_err("multiple failures expected");
    let rendered = err.to_string();
    assert!(rendered.contains("version: is required"));
    assert!(rendered.contains("projects[0].dir: cannot be blank"));
    assert!(rendered.contains("projects[1].dir: cannot contain '..'"));
    assert!(rendered.contains("\"signed_off\" is not a valid apply_requirement"));
}

#[test]
fn unknown_keys_fail_closed_everywhere() {
    let top = parse("version: 3\nauto_merge: true").expect_err("unknown top-level key");
    assert!(matches!(top, ConfigError::Parse { .. }));

    let nested = parse(
        r#"
version: 3
projects:
- dir: .
  terraform_version: v1.5.0
"#,
    )
    .expect_err("unknown project key");
    assert!(matches!(nested, ConfigError::Parse { .. }));
}

#[test]
fn stage_defaulting_distinguishes_null_from_empty_list() {
    let cfg = parse(
        r#"
version: 3
workflows:
  custom:
    plan:
      steps:
    policy_check:
      steps: []
"#,
    )
    .expect("document parses");

    let workflow = cfg.workflows.get("custom").expect("workflow exists");
    assert_eq!(workflow.plan, default_plan_stage());
    assert!(workflow.policy_check.is_empty());
    assert_ne!(workflow.policy_check, default_policy_check_stage());
}

#[test]
fn policy_declarations_parse_with_thresholds_and_owners() {
    let cfg = parse(
        r#"
version: 3
policies:
  version: 1.0.0
  approve_count: 2
  owners:
    users: [sre-lead, platform-lead]
  policy_sets:
  - name: cost
    path: policies/cost
    source: local
  - name: tagging
    path: acme/policies
    source: github
    approve_count: 1
"#,
    )
    .expect("policies parse");

    assert!(cfg.policies.has_policies());
    assert_eq!(cfg.policies.approve_count, 2);
    assert_eq!(cfg.policies.owners.users.len(), 2);
    assert_eq!(cfg.policies.policy_sets[0].approve_count, 2);
    assert_eq!(cfg.policies.policy_sets[1].approve_count, 1);
}

#[test]
fn absent_projects_and_workflows_yield_empty_collections() {
    let cfg = parse("version: 3").expect("bare version parses");
    assert!(cfg.projects.is_empty());
    assert!(cfg.workflows.is_empty());
}
