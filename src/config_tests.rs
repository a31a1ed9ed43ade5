use super::*;

fn plan(steps: Vec<StepConfig>) -> PlanConfig {
    PlanConfig {
        schema_version: PLAN_SCHEMA_VERSION,
        steps,
    }
}

fn command(name: &str, command: &str) -> StepConfig {
    StepConfig::Command {
        name: name.to_string(),
        flag: None,
        command: command.to_string(),
        unless: None,
        requires: None,
    }
}

fn validation_error(config: &PlanConfig) -> String {
    format!("{:#}", validate_config(config).unwrap_err())
}

#[test]
fn stub_parses_and_validates() {
    let text = config_stub().expect("stub");
    let parsed: PlanConfig = serde_json::from_str(&text).expect("parse stub");
    assert_eq!(parsed, default_config());
    validate_config(&parsed).expect("stub is valid");
}

#[test]
fn defaults_fill_optional_fields() {
    let text = r#"{
        "schema_version": 1,
        "steps": [
            {"kind": "firewall", "name": "allow-ssh", "port": 22},
            {"kind": "remote_script", "name": "rustup", "url": "https://sh.rustup.rs"}
        ]
    }"#;
    let config: PlanConfig = serde_json::from_str(text).expect("parse");
    match &config.steps[0] {
        StepConfig::Firewall {
            subnet, command, ..
        } => {
            assert!(subnet.is_none());
            assert!(command.contains("{subnet}"));
        }
        other => panic!("unexpected step {other:?}"),
    }
    match &config.steps[1] {
        StepConfig::RemoteScript {
            preview_lines,
            interpreter,
            prompt,
            ..
        } => {
            assert_eq!(*preview_lines, 20);
            assert_eq!(interpreter, "sh");
            assert!(prompt.is_none());
        }
        other => panic!("unexpected step {other:?}"),
    }
}

#[test]
fn unknown_fields_are_rejected() {
    let text = r#"{"schema_version": 1, "steps": [
        {"kind": "command", "name": "a", "command": "true", "retries": 3}
    ]}"#;
    assert!(serde_json::from_str::<PlanConfig>(text).is_err());

    let text = r#"{"schema_version": 1, "parallel": true, "steps": []}"#;
    assert!(serde_json::from_str::<PlanConfig>(text).is_err());
}

#[test]
fn schema_version_must_match() {
    let mut config = plan(vec![]);
    config.schema_version = 7;
    assert!(validation_error(&config).contains("schema_version 7"));
}

#[test]
fn step_names_must_be_unique_and_non_empty() {
    let config = plan(vec![command("a", "true"), command("a", "false")]);
    assert!(validation_error(&config).contains("duplicate step name \"a\""));

    let config = plan(vec![command("  ", "true")]);
    assert!(validation_error(&config).contains("empty name"));
}

#[test]
fn commands_must_split() {
    let config = plan(vec![command("broken", "echo 'unterminated")]);
    let message = validation_error(&config);
    assert!(message.contains("step \"broken\""), "{message}");
}

#[test]
fn firewall_subnet_literal_is_checked() {
    let config = plan(vec![StepConfig::Firewall {
        name: "allow-ssh".to_string(),
        flag: None,
        subnet: Some("192.168.1.0/33".to_string()),
        port: 22,
        command: default_firewall_template(),
    }]);
    let message = validation_error(&config);
    assert!(message.contains("A.B.C.D/N"), "{message}");
}

#[test]
fn firewall_template_needs_subnet_placeholder() {
    let config = plan(vec![StepConfig::Firewall {
        name: "allow-ssh".to_string(),
        flag: None,
        subnet: None,
        port: 22,
        command: "ufw allow 22".to_string(),
    }]);
    assert!(validation_error(&config).contains("{subnet}"));
}

#[test]
fn remote_scripts_require_https() {
    let config = plan(vec![StepConfig::RemoteScript {
        name: "rustup".to_string(),
        flag: None,
        url: "http://sh.rustup.rs".to_string(),
        preview_lines: 20,
        prompt: None,
        interpreter: default_interpreter(),
    }]);
    assert!(validation_error(&config).contains("https://"));
}

#[test]
fn ensure_tool_needs_consumers() {
    let config = plan(vec![StepConfig::EnsureTool {
        name: "install-node".to_string(),
        flag: None,
        tool: "node".to_string(),
        version_args: default_version_args(),
        install: "apt-get install -y nodejs".to_string(),
        consumers: vec![],
    }]);
    assert!(validation_error(&config).contains("at least one consumer"));
}

#[test]
fn config_path_precedence() {
    let explicit = Path::new("/srv/plan.json");
    let env = Some(OsString::from("/etc/hostprep.json"));
    let dir = Some(PathBuf::from("/home/op/.config"));

    let path = choose_config_path(Some(explicit), env.clone(), dir.clone()).expect("explicit");
    assert_eq!(path, PathBuf::from("/srv/plan.json"));

    let path = choose_config_path(None, env, dir.clone()).expect("env");
    assert_eq!(path, PathBuf::from("/etc/hostprep.json"));

    let path = choose_config_path(None, Some(OsString::new()), dir).expect("dir");
    assert_eq!(path, PathBuf::from("/home/op/.config/hostprep/plan.json"));

    assert!(choose_config_path(None, None, None).is_err());
}

#[test]
fn write_then_load_preserves_plan() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("plan.json");
    let config = plan(vec![command("a", "true")]);

    write_config(&path, &config).expect("write");
    let loaded = load_config(&path).expect("load");
    assert_eq!(loaded, config);
}

#[test]
fn load_reports_the_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing.json");
    let message = format!("{:#}", load_config(&path).unwrap_err());
    assert!(message.contains("missing.json"), "{message}");
}
