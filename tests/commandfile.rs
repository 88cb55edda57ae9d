use std::error::Error;
use std::fs;

use tempfile::TempDir;

use drover::config::{
    expand_script_refs, load_command_file, parse_env_lines, parse_procfile,
};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn toml_json_and_yaml_droverfiles_load_the_same_commands() -> TestResult {
    let dir = TempDir::new()?;

    let toml_path = dir.path().join("droverfile.toml");
    fs::write(
        &toml_path,
        r#"
[commands.build]
run = "make build"

[commands.deploy]
run = "make deploy"
needs = ["build"]
exclusive = true
"#,
    )?;

    let json_path = dir.path().join("droverfile.json");
    fs::write(
        &json_path,
        r#"{
  "commands": {
    "build": { "run": "make build" },
    "deploy": { "run": "make deploy", "needs": ["build"], "exclusive": true }
  }
}"#,
    )?;

    let yaml_path = dir.path().join("droverfile.yaml");
    fs::write(
        &yaml_path,
        r#"
commands:
  build:
    run: make build
  deploy:
    run: make deploy
    needs: [build]
    exclusive: true
"#,
    )?;

    for path in [&toml_path, &json_path, &yaml_path] {
        let file = load_command_file(path)?;

        let build = &file.commands["build"];
        assert_eq!(build.run, "make build");
        assert!(build.needs.is_empty());
        assert!(!build.exclusive);

        let deploy = &file.commands["deploy"];
        assert_eq!(deploy.run, "make deploy");
        assert_eq!(deploy.needs, ["build".to_string()]);
        assert!(deploy.exclusive);
        assert!(deploy.watch.is_empty());
    }

    Ok(())
}

#[test]
fn extensionless_droverfile_is_sniffed() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("droverfile");
    fs::write(&path, r#"{ "commands": { "hi": { "run": "echo hi" } } }"#)?;

    let file = load_command_file(&path)?;
    assert_eq!(file.commands["hi"].run, "echo hi");

    Ok(())
}

#[test]
fn unrecognized_extension_is_rejected() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("droverfile.ini");
    fs::write(&path, "[commands]")?;

    let err = load_command_file(&path).expect_err(".ini is not a supported format");
    assert!(err.to_string().contains("unrecognized droverfile extension"));

    Ok(())
}

#[test]
fn watch_paths_are_parsed() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("droverfile.toml");
    fs::write(
        &path,
        r#"
[commands.server]
run = "make serve"
watch = ["src", "static"]
"#,
    )?;

    let file = load_command_file(&path)?;
    assert_eq!(
        file.commands["server"].watch,
        ["src".to_string(), "static".to_string()]
    );

    Ok(())
}

#[test]
fn procfile_entries_keep_file_order() -> TestResult {
    let entries = parse_procfile("web: bin/server --port 8080\n\nworker: bin/worker\n")?;

    assert_eq!(
        entries,
        vec![
            ("web".to_string(), "bin/server --port 8080".to_string()),
            ("worker".to_string(), "bin/worker".to_string()),
        ]
    );

    Ok(())
}

#[test]
fn procfile_splits_on_the_first_colon_only() -> TestResult {
    let entries = parse_procfile("db: psql postgres://localhost:5432/dev\n")?;

    assert_eq!(
        entries,
        vec![(
            "db".to_string(),
            "psql postgres://localhost:5432/dev".to_string()
        )]
    );

    Ok(())
}

#[test]
fn procfile_line_without_colon_is_rejected() {
    let err = parse_procfile("web bin/server\n").expect_err("missing colon must fail");
    assert!(err.to_string().contains("line 1"));
}

#[test]
fn env_lines_are_unquoted_with_shell_rules() -> TestResult {
    let lines = vec![
        "PLAIN=value".to_string(),
        "QUOTED=\"two words\"".to_string(),
        String::new(),
        "SINGLE='also quoted'".to_string(),
    ];

    assert_eq!(
        parse_env_lines(&lines)?,
        vec![
            "PLAIN=value".to_string(),
            "QUOTED=two words".to_string(),
            "SINGLE=also quoted".to_string(),
        ]
    );

    Ok(())
}

#[test]
fn env_line_with_multiple_words_is_rejected() {
    let lines = vec!["KEY=one two".to_string()];
    assert!(parse_env_lines(&lines).is_err());
}

#[test]
fn npm_script_refs_expand_to_run_commands() -> TestResult {
    let dir = TempDir::new()?;

    let refs = vec!["build".to_string()];
    assert_eq!(
        expand_script_refs(&refs, dir.path())?,
        vec![("build".to_string(), "npm run build".to_string())]
    );

    Ok(())
}

#[test]
fn npm_wildcard_expands_matching_scripts_sorted() -> TestResult {
    let dir = TempDir::new()?;
    fs::write(
        dir.path().join("package.json"),
        r#"{
  "name": "demo",
  "scripts": {
    "watch-css": "sass --watch",
    "watch-js": "esbuild --watch",
    "build": "make"
  }
}"#,
    )?;

    let refs = vec!["watch-*".to_string()];
    assert_eq!(
        expand_script_refs(&refs, dir.path())?,
        vec![
            ("watch-css".to_string(), "npm run watch-css".to_string()),
            ("watch-js".to_string(), "npm run watch-js".to_string()),
        ]
    );

    Ok(())
}

#[test]
fn npm_wildcard_without_package_file_fails() {
    let dir = TempDir::new().expect("tempdir");
    let refs = vec!["watch-*".to_string()];

    assert!(expand_script_refs(&refs, dir.path()).is_err());
}
