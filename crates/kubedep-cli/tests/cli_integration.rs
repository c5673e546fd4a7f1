//! CLI subprocess integration tests.
//!
//! These tests invoke the `kubedep` binary with `--snapshot` and `--offline`,
//! so no network is touched, and verify exit codes and stdout content.

use kubedep_schema::{Manifest, ProjectRoot};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const SNAPSHOT: &str = r#"{
    "ImportPath": "k8s.io/kubernetes",
    "GoVersion": "go1.12",
    "GodepVersion": "v80",
    "Packages": ["./..."],
    "Deps": [
        {"ImportPath": "github.com/fsnotify/fsnotify", "Rev": "c2828203cd70a50dcccfb2761f8b1f8ceef9a8e9"},
        {"ImportPath": "github.com/onsi/ginkgo", "Comment": "v1.6.0", "Rev": "deadbeef"},
        {"ImportPath": "github.com/onsi/ginkgo/config", "Comment": "v1.6.0", "Rev": "deadbeef"},
        {"ImportPath": "github.com/pkg/errors", "Comment": "v0.8.0", "Rev": "645ef00459ed84a119197bfb8d8205042c6df63d"},
        {"ImportPath": "golang.org/x/net/http2", "Rev": "0ed95abb35c445290478a5348a7b38bb154135fd"},
        {"ImportPath": "k8s.io/api/core/v1", "Rev": "0000000000000000000000000000000000000000"},
        {"ImportPath": "k8s.io/client-go/rest", "Rev": "0000000000000000000000000000000000000000"}
    ]
}"#;

const CONFLICTING: &str = r#"{
    "Deps": [
        {"ImportPath": "github.com/golang/protobuf/proto", "Rev": "aaaa"},
        {"ImportPath": "github.com/golang/protobuf/ptypes", "Rev": "bbbb"}
    ]
}"#;

fn kubedep_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_kubedep"));
    cmd.env_remove("KUBEDEP_LOG");
    cmd
}

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn convert(snapshot: &Path, extra: &[&str]) -> Output {
    kubedep_bin()
        .args(["convert", "1.14.0", "--offline", "--snapshot"])
        .arg(snapshot)
        .args(extra)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn cli_version_exits_zero() {
    let output = kubedep_bin().arg("--version").output().unwrap();
    assert!(output.status.success(), "kubedep --version must exit 0");
    assert!(stdout(&output).contains("kubedep"));
}

#[test]
fn cli_help_lists_commands() {
    let output = kubedep_bin().arg("--help").output().unwrap();
    assert!(output.status.success());
    let text = stdout(&output);
    for command in ["convert", "profile", "completions"] {
        assert!(text.contains(command), "help must list '{command}': {text}");
    }
}

#[test]
fn convert_writes_gopkg_toml_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = write_file(dir.path(), "Godeps.json", SNAPSHOT);
    let output = convert(&snapshot, &[]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let manifest = Manifest::from_toml(&stdout(&output)).unwrap();
    assert_eq!(manifest.constraint.project, "k8s.io/kubernetes");
    assert_eq!(manifest.constraint.revision, "v1.14.0");
    assert_eq!(manifest.ignored, vec!["github.com/docker/kube-e2e-image/*"]);

    let get = |root: &str| manifest.overrides[&ProjectRoot::from(root)].clone();
    assert_eq!(
        get("github.com/pkg/errors").revision,
        "645ef00459ed84a119197bfb8d8205042c6df63d"
    );
    assert_eq!(
        get("golang.org/x/net").revision,
        "0ed95abb35c445290478a5348a7b38bb154135fd"
    );
    assert_eq!(get("k8s.io/api").revision, "kubernetes-1.14.0");
    assert_eq!(get("k8s.io/client-go").revision, "kubernetes-1.14.0");
    assert_eq!(get("k8s.io/apiserver").revision, "kubernetes-1.14.0");

    let ginkgo = get("github.com/onsi/ginkgo");
    assert_eq!(ginkgo.revision, "8a7f310861b2f59f13b339dc506cd8d8c28b147c");
    assert_eq!(
        ginkgo.source.as_deref(),
        Some("https://github.com/jcsirot/ginkgo.git")
    );

    let fsnotify = get("gopkg.in/fsnotify.v1");
    assert_eq!(
        fsnotify.revision,
        "c2828203cd70a50dcccfb2761f8b1f8ceef9a8e9"
    );
    assert!(!manifest
        .overrides
        .contains_key(&ProjectRoot::from("github.com/fsnotify/fsnotify")));
}

#[test]
fn convert_accepts_leading_v() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = write_file(dir.path(), "Godeps.json", SNAPSHOT);
    let output = kubedep_bin()
        .args(["convert", "v1.14.0", "--offline", "--snapshot"])
        .arg(&snapshot)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("kubernetes-1.14.0"));
}

#[test]
fn convert_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = write_file(dir.path(), "Godeps.json", SNAPSHOT);
    let first = convert(&snapshot, &[]);
    let second = convert(&snapshot, &[]);
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn convert_keeps_stdout_free_of_logs() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = write_file(dir.path(), "Godeps.json", SNAPSHOT);
    let output = kubedep_bin()
        .args(["--trace", "convert", "1.14.0", "--offline", "--snapshot"])
        .arg(&snapshot)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(Manifest::from_toml(&stdout(&output)).is_ok());
    assert!(!stderr(&output).is_empty(), "trace logs belong on stderr");
}

#[test]
fn convert_missing_version_exits_two() {
    let output = kubedep_bin().arg("convert").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn convert_malformed_version_exits_two() {
    for bad in ["1.14", "latest", ""] {
        let output = kubedep_bin().args(["convert", bad]).output().unwrap();
        assert_eq!(output.status.code(), Some(2), "version '{bad}'");
    }
}

#[test]
fn convert_conflict_exits_four() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = write_file(dir.path(), "Godeps.json", CONFLICTING);
    let output = convert(&snapshot, &[]);
    assert_eq!(output.status.code(), Some(4));
    assert!(stdout(&output).is_empty());
    let err = stderr(&output);
    assert!(err.contains("github.com/golang/protobuf"), "stderr: {err}");
}

#[test]
fn convert_conflict_policy_resolves() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = write_file(dir.path(), "Godeps.json", CONFLICTING);
    for (policy, expected) in [("first", "aaaa"), ("last", "bbbb"), ("greatest", "bbbb")] {
        let output = convert(&snapshot, &["--on-conflict", policy]);
        assert!(output.status.success(), "policy {policy}");
        let manifest = Manifest::from_toml(&stdout(&output)).unwrap();
        assert_eq!(
            manifest.overrides[&ProjectRoot::from("github.com/golang/protobuf")].revision,
            expected,
            "policy {policy}"
        );
    }
}

#[test]
fn convert_unknown_host_offline_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = write_file(
        dir.path(),
        "Godeps.json",
        r#"{"Deps": [{"ImportPath": "vanity.example.invalid/lib", "Rev": "1"}]}"#,
    );
    let output = convert(&snapshot, &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("vanity.example.invalid/lib"));
}

#[test]
fn convert_missing_snapshot_exits_three() {
    let dir = tempfile::tempdir().unwrap();
    let output = convert(&dir.path().join("absent.json"), &[]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn convert_malformed_snapshot_exits_three() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = write_file(dir.path(), "Godeps.json", "<html>404</html>");
    let output = convert(&snapshot, &[]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn convert_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = write_file(dir.path(), "Godeps.json", SNAPSHOT);
    let output = convert(&snapshot, &["--json"]);
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["constraint"]["revision"], "v1.14.0");
    assert_eq!(
        value["overrides"]["k8s.io/metrics"]["revision"],
        "kubernetes-1.14.0"
    );
}

#[test]
fn convert_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = write_file(dir.path(), "Godeps.json", SNAPSHOT);
    let dest = dir.path().join("Gopkg.toml");
    let output = convert(&snapshot, &["--output", dest.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).is_empty());
    let written = std::fs::read_to_string(&dest).unwrap();
    let manifest = Manifest::from_toml(&written).unwrap();
    assert_eq!(manifest.constraint.revision, "v1.14.0");
}

#[test]
fn convert_with_custom_profile() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = write_file(dir.path(), "Godeps.json", SNAPSHOT);
    let profile = write_file(
        dir.path(),
        "profile.toml",
        r#"profile_version = 1
snapshot_url = "https://example.invalid/{version}/Godeps.json"

[umbrella]
project = "github.com/acme/platform"
revision_prefix = "release-"

[[override]]
root = "github.com/pkg/errors"
revision = "v0.9.1"
"#,
    );
    let output = convert(&snapshot, &["--profile", profile.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let manifest = Manifest::from_toml(&stdout(&output)).unwrap();
    assert!(manifest.ignored.is_empty());
    assert_eq!(manifest.constraint.project, "github.com/acme/platform");
    assert_eq!(manifest.constraint.revision, "release-1.14.0");
    let get = |root: &str| manifest.overrides[&ProjectRoot::from(root)].clone();
    assert_eq!(get("github.com/pkg/errors").revision, "v0.9.1");
    // without family projects the snapshot revision stands
    assert_eq!(
        get("k8s.io/api").revision,
        "0000000000000000000000000000000000000000"
    );
    assert_eq!(get("github.com/onsi/ginkgo").revision, "deadbeef");
}

#[test]
fn convert_invalid_profile_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = write_file(dir.path(), "Godeps.json", SNAPSHOT);
    let profile = write_file(
        dir.path(),
        "profile.toml",
        "profile_version = 1\nsnapshot_url = \"https://example.invalid/Godeps.json\"\n\n[umbrella]\nproject = \"k8s.io/kubernetes\"\n",
    );
    let output = convert(&snapshot, &["--profile", profile.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("profile error"));
}

#[test]
fn profile_prints_builtin() {
    let output = kubedep_bin().arg("profile").output().unwrap();
    assert!(output.status.success());
    let text = stdout(&output);
    let parsed = kubedep_schema::parse_profile_str(&text).unwrap();
    assert_eq!(parsed, kubedep_schema::Profile::builtin().unwrap());
}

#[test]
fn profile_check_accepts_builtin_copy() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "k8s.toml", kubedep_schema::BUILTIN_PROFILE);
    let output = kubedep_bin()
        .args(["profile", "--check"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).contains("ok"));
}

#[test]
fn profile_check_rejects_duplicate_rename_target() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "bad.toml",
        r#"profile_version = 1
snapshot_url = "https://example.invalid/{version}"

[umbrella]
project = "k8s.io/kubernetes"

[[override]]
root = "github.com/a/one"
rename = "gopkg.in/one.v1"

[[override]]
root = "github.com/b/one"
rename = "gopkg.in/one.v1"
"#,
    );
    let output = kubedep_bin()
        .args(["profile", "--check"])
        .arg(&path)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("gopkg.in/one.v1"));
}

#[test]
fn profile_check_rejects_rename_onto_overridden_root() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "bad.toml",
        r#"profile_version = 1
snapshot_url = "https://example.invalid/{version}"

[umbrella]
project = "k8s.io/kubernetes"

[[override]]
root = "github.com/fsnotify/fsnotify"
rename = "gopkg.in/fsnotify.v1"

[[override]]
root = "gopkg.in/fsnotify.v1"
revision = "pinned"
"#,
    );
    let output = kubedep_bin()
        .args(["profile", "--check"])
        .arg(&path)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let err = stderr(&output);
    assert!(err.contains("profile error"));
    assert!(err.contains("gopkg.in/fsnotify.v1"));
}

#[test]
fn completions_bash() {
    let output = kubedep_bin()
        .args(["completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).contains("kubedep"));
}
