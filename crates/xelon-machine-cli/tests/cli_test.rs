#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const XELON_VARS: [&str; 22] = [
    "XELON_TOKEN",
    "XELON_USERNAME",
    "XELON_PASSWORD",
    "XELON_API_BASE_URL",
    "XELON_DEVICE_ID",
    "XELON_TENANT_ID",
    "XELON_IP_ADDRESS",
    "XELON_CPU_CORES",
    "XELON_DEVICE_PASSWORD",
    "XELON_DISK_SIZE",
    "XELON_KUBERNETES_ID",
    "XELON_MEMORY",
    "XELON_SWAP_DISK_SIZE",
    "XELON_TEMPLATE_ID",
    "XELON_SSH_PORT",
    "XELON_SSH_USER",
    "XELON_REQUIRE_GUEST_TOOLS",
    "XELON_REQUEST_TIMEOUT",
    "XELON_MACHINE_NAME",
    "XELON_STORE_PATH",
    "XELON_DEBUG",
    "RUST_LOG",
];

/// Binary with no Xelon settings inherited from the calling environment
fn xelon_machine() -> Command {
    let mut cmd = Command::cargo_bin("xelon-machine").unwrap();
    for var in XELON_VARS {
        cmd.env_remove(var);
    }
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_cli_help() {
    xelon_machine()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Xelon VDC"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("remove"))
        .stdout(predicate::str::contains("ssh-hostname"))
        .stdout(predicate::str::contains("--token"));
}

#[test]
fn test_help_hides_device_password() {
    xelon_machine()
        .args(["create", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--device-password"))
        .stdout(predicate::str::contains("Xelon22").not());
}

#[test]
fn test_cli_version() {
    xelon_machine()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("xelon-machine"));
}

#[test]
fn test_create_requires_credentials() {
    xelon_machine()
        .arg("create")
        .assert()
        .failure()
        .stderr(predicate::str::contains("token"));
}

#[test]
fn test_create_rejects_short_device_password() {
    xelon_machine()
        .args(["create", "--token", "abc", "--device-password", "short"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 6 characters"));
}

#[test]
fn test_device_password_from_env() {
    xelon_machine()
        .args(["create", "--token", "abc"])
        .env("XELON_DEVICE_PASSWORD", "short")
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 6 characters"));
}

#[test]
fn test_malformed_numeric_env_is_rejected() {
    xelon_machine()
        .args(["create", "--token", "abc"])
        .env("XELON_DISK_SIZE", "big")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--disk-size"));
}

#[test]
fn test_start_requires_device_id() {
    xelon_machine()
        .args(["start", "--token", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("has not been created"));
}

#[test]
fn test_base_url_requires_trailing_slash() {
    xelon_machine()
        .args([
            "status",
            "--token",
            "abc",
            "--device-id",
            "vm-1",
            "--tenant-id",
            "t-1",
            "--api-base-url",
            "http://127.0.0.1:9/api/service",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("trailing slash"));
}

#[test]
fn test_ssh_hostname_from_recorded_ip() {
    xelon_machine()
        .args(["ssh-hostname", "--token", "abc", "--device-id", "vm-1"])
        .env("XELON_IP_ADDRESS", "192.0.2.10")
        .assert()
        .success()
        .stdout(predicate::str::diff("192.0.2.10\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_against_api() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/service/device"))
        .and(query_param("tenant", "t-1"))
        .and(query_param("localvmid", "vm-1"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "toolsStatus": { "runningStatus": "guestToolsRunning" },
            "device": { "powerstate": true, "localvmdetails": { "localvmid": "vm-1", "state": 1 } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let base_url = format!("{}/api/service/", server.uri());
    let output = tokio::task::spawn_blocking(move || {
        xelon_machine()
            .args(["status", "--device-id", "vm-1", "--tenant-id", "t-1"])
            .env("XELON_TOKEN", "abc")
            .env("XELON_API_BASE_URL", base_url)
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("running"));
}
