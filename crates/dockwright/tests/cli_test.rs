#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn dockwright() -> Command {
    let mut cmd = Command::cargo_bin("dockwright").unwrap();
    // 呼び出し元の環境に左右されないように
    cmd.env_remove("DOCKWRIGHT_CONFIG")
        .env_remove("DOCKWRIGHT_SKIP")
        .env_remove("DOCKWRIGHT_SKIP_BUILD")
        .env_remove("RUST_LOG");
    cmd
}

/// `libs/app.jar` を持つプロジェクトを作る
fn write_project(kdl: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("libs")).unwrap();
    fs::write(dir.path().join("libs/app.jar"), b"jar").unwrap();
    fs::write(dir.path().join("dockwright.kdl"), kdl).unwrap();
    dir
}

fn project_file(dir: &TempDir) -> String {
    dir.path().join("dockwright.kdl").display().to_string()
}

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    dockwright()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("dockerfile"))
        .stdout(predicate::str::contains("validate"));
}

/// バージョン表示が正しく動作することを確認
#[test]
fn test_cli_version() {
    dockwright()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dockwright"));
}

/// buildコマンドのヘルプにフラグが並ぶことを確認
#[test]
fn test_build_help() {
    dockwright()
        .args(["build", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--tag"))
        .stdout(predicate::str::contains("--skip-push"))
        .stdout(predicate::str::contains("--property"));
}

#[test]
fn test_validate_reports_image() {
    let dir = write_project(
        r#"
        project "shop"
        properties { version "2.0.1" }
        image "example/shop:${version}"
        tags "latest"
        base "alpine"
        "#,
    );

    dockwright()
        .args(["validate", "-f", &project_file(&dir)])
        .assert()
        .success()
        .stdout(predicate::str::contains("shop"))
        .stdout(predicate::str::contains("example/shop:2.0.1"))
        .stdout(predicate::str::contains("latest"));
}

#[test]
fn test_validate_property_override() {
    let dir = write_project(
        r#"
        properties { version "2.0.1" }
        image "example/shop:${version}"
        base "alpine"
        "#,
    );

    dockwright()
        .args(["validate", "-f", &project_file(&dir), "-P", "version=3.0.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("example/shop:3.0.0"));
}

#[test]
fn test_validate_json() {
    let dir = write_project(
        r#"
        image "example/shop:1.0"
        base "alpine"
        push { retries 2; }
        "#,
    );

    dockwright()
        .args(["validate", "--json", "-f", &project_file(&dir)])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"image_name\": \"example/shop:1.0\""))
        .stdout(predicate::str::contains("\"count\": 2"));
}

#[test]
fn test_validate_json_hides_registry_credentials() {
    let dir = write_project(
        r#"
        properties {
            docker.username "ci"
            docker.password "s3cret"
            app.version "1.0"
        }
        image "example/shop:${app.version}"
        base "alpine"
        "#,
    );

    dockwright()
        .args(["validate", "--json", "-f", &project_file(&dir)])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"docker.password\": \"***\""))
        .stdout(predicate::str::contains("\"app.version\": \"1.0\""))
        .stdout(predicate::str::contains("s3cret").not());
}

#[test]
fn test_validate_required_revision_with_literal_image() {
    let dir = write_project(
        r#"
        image "example/shop:${version}"
        properties { version "2.0.1" }
        base "alpine"
        build { require_revision #true; }
        "#,
    );

    dockwright()
        .args(["validate", "-f", &project_file(&dir)])
        .assert()
        .success()
        .stdout(predicate::str::contains("example/shop:2.0.1"))
        .stdout(predicate::str::contains("${version}").not());
}

#[test]
fn test_validate_revision_template_is_deferred() {
    let dir = write_project(
        r#"
        image "example/shop:${revision}"
        base "alpine"
        "#,
    );

    dockwright()
        .args(["validate", "-f", &project_file(&dir)])
        .assert()
        .success()
        .stdout(predicate::str::contains("example/shop:${revision}"));
}

#[test]
fn test_validate_missing_image_fails() {
    let dir = write_project(r#"base "alpine""#);

    dockwright()
        .args(["validate", "-f", &project_file(&dir)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("設定エラー"));
}

#[test]
fn test_dockerfile_prints_plan() {
    let dir = write_project(
        r#"
        image "example/app:1.0"
        base "alpine"
        resource "libs"
        "#,
    );

    dockwright()
        .args(["dockerfile", "-f", &project_file(&dir)])
        .assert()
        .success()
        .stdout(predicate::str::contains("example/app:1.0"))
        .stdout(predicate::str::contains("FROM alpine\nADD app.jar .\n"));

    let written = fs::read_to_string(dir.path().join("build/docker/Dockerfile")).unwrap();
    assert_eq!(written, "FROM alpine\nADD app.jar .\n");
    assert!(Path::new(&dir.path().join("build/docker/app.jar")).is_file());
}

#[test]
fn test_dockerfile_without_base_image_fails() {
    let dir = write_project(r#"image "example/app:1.0""#);

    dockwright()
        .args(["dockerfile", "-f", &project_file(&dir)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("validate"));
}

#[test]
fn test_build_skipped_project_does_not_need_docker() {
    let dir = write_project(
        r#"
        image "example/app:1.0"
        base "alpine"
        skip #true
        "#,
    );

    dockwright()
        .args(["build", "-f", &project_file(&dir)])
        .assert()
        .success()
        .stdout(predicate::str::contains("スキップ"));
}

#[test]
fn test_missing_project_file() {
    let dir = tempfile::tempdir().unwrap();

    dockwright()
        .current_dir(dir.path())
        .arg("validate")
        .assert()
        .failure();
}
