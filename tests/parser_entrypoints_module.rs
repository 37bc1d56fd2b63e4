use std::fs;

use plangate::{
    has_repo_cfg, parse_global_cfg_file, parse_repo_cfg_file, ConfigError, GlobalCfg, GlobalCfgArgs,
};
use tempfile::tempdir;

fn permissive() -> GlobalCfg {
    GlobalCfg::new(GlobalCfgArgs {
        allow_all_repo_settings: true,
        ..GlobalCfgArgs::default()
    })
}

#[test]
fn missing_repo_config_is_a_recognized_condition() {
    let temp = tempdir().expect("temp dir");
    let exists = has_repo_cfg(temp.path(), "plangate.yaml").expect("check existence");
    assert!(!exists);
}

#[test]
fn present_repo_config_is_detected() {
    let temp = tempdir().expect("temp dir");
    fs::write(temp.path().join("plangate.yaml"), "version: 3\n").expect("write config");
    assert!(has_repo_cfg(temp.path(), "plangate.yaml").expect("check existence"));
}

#[test]
fn yml_extension_gets_a_rename_hint() {
    let temp = tempdir().expect("temp dir");
    fs::write(temp.path().join("plangate.yml"), "version: 3\n").expect("write config");
    let err = has_repo_cfg(temp.path(), "plangate.yml").expect_err("yml must be rejected");
    assert!(err
        .to_string()
        .contains("found \"plangate.yml\" as config file; rename using the .yaml extension"));
}

#[test]
fn repo_config_files_parse_end_to_end() {
    let temp = tempdir().expect("temp dir");
    fs::write(
        temp.path().join("plangate.yaml"),
        r#"
version: 3
projects:
- dir: terraform
  workspace: prod
"#,
    )
    .expect("write config");

    let cfg = parse_repo_cfg_file(
        temp.path(),
        "plangate.yaml",
        &permissive(),
        "github.com/acme/infra",
    )
    .expect("file parses");
    assert_eq!(cfg.projects[0].workspace, "prod");
}

#[test]
fn unreadable_files_surface_as_read_errors() {
    let temp = tempdir().expect("temp dir");
    let err = parse_repo_cfg_file(
        temp.path(),
        "plangate.yaml",
        &permissive(),
        "github.com/acme/infra",
    )
    .expect_err("missing file must fail");
    match err {
        ConfigError::Read { path, .. } => assert!(path.ends_with("plangate.yaml")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn parse_errors_name_the_offending_file() {
    let temp = tempdir().expect("temp dir");
    let path = temp.path().join("repos.yaml");
    fs::write(&path, "invalid: key\n").expect("write config");

    let err = parse_global_cfg_file(&path, GlobalCfg::new(GlobalCfgArgs::default()))
        .expect_err("unknown key must fail");
    match err {
        ConfigError::Parse { context, .. } => assert!(context.ends_with("repos.yaml")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn server_policy_files_parse_in_json_too() {
    let temp = tempdir().expect("temp dir");
    let path = temp.path().join("repos.json");
    fs::write(
        &path,
        r#"{"repos": [{"id": "github.com/acme/infra", "apply_requirements": ["approved"]}]}"#,
    )
    .expect("write config");

    let cfg = parse_global_cfg_file(&path, GlobalCfg::new(GlobalCfgArgs::default()))
        .expect("json file parses");
    assert_eq!(
        cfg.repos.last().expect("entry").apply_requirements,
        Some(vec!["approved".to_string()])
    );
}
