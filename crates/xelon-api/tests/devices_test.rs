//! Resource operation tests against a mock Xelon API

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xelon_api::{ApiError, Client, ClientConfig, Credentials, DeviceCreateConfiguration, SshKeyRequest};

async fn setup(credentials: Credentials) -> (MockServer, Client) {
    let server = MockServer::start().await;
    let config = ClientConfig::new(credentials).with_base_url(format!("{}/api/service/", server.uri()));
    let client = Client::new(config).unwrap();
    (server, client)
}

async fn assert_no_requests(server: &MockServer) {
    assert!(server.received_requests().await.unwrap().is_empty());
}

fn create_configuration() -> DeviceCreateConfiguration {
    DeviceCreateConfiguration {
        cpu_cores: 2,
        disk_size: 20,
        display_name: "machine".to_string(),
        hostname: "machine".to_string(),
        kubernetes_id: "kub1".to_string(),
        memory: 2,
        password: "Xelon22".to_string(),
        swap_disk_size: 2,
        template_id: None,
    }
}

#[tokio::test]
async fn test_get_requires_tenant_id() {
    let (server, client) = setup(Credentials::token("token")).await;

    let err = client.devices().get("", "vm-1").await.unwrap_err();

    assert!(matches!(err, ApiError::EmptyArgument("tenant_id")));
    assert_no_requests(&server).await;
}

#[tokio::test]
async fn test_get_requires_local_vm_id() {
    let (server, client) = setup(Credentials::token("token")).await;

    let err = client.devices().get("t-1", "").await.unwrap_err();

    assert!(matches!(err, ApiError::EmptyArgument("local_vm_id")));
    assert_no_requests(&server).await;
}

#[tokio::test]
async fn test_create_requires_payload() {
    let (server, client) = setup(Credentials::token("token")).await;

    let err = client
        .devices()
        .create(&DeviceCreateConfiguration::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::EmptyPayload));
    assert_no_requests(&server).await;
}

#[tokio::test]
async fn test_delete_start_stop_require_local_vm_id() {
    let (server, client) = setup(Credentials::token("token")).await;
    let devices = client.devices();

    assert!(devices.delete("").await.unwrap_err().is_argument_error());
    assert!(devices.start("").await.unwrap_err().is_argument_error());
    assert!(devices.stop("").await.unwrap_err().is_argument_error());
    assert_no_requests(&server).await;
}

#[tokio::test]
async fn test_add_ssh_key_requires_arguments() {
    let (server, client) = setup(Credentials::token("token")).await;
    let key = SshKeyRequest::new("machine", "ssh-ed25519 AAAA");

    let err = client.ssh_keys().add("", &key).await.unwrap_err();
    assert!(matches!(err, ApiError::EmptyArgument("local_vm_id")));

    let err = client
        .ssh_keys()
        .add("vm-1", &SshKeyRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::EmptyPayload));

    assert_no_requests(&server).await;
}

#[tokio::test]
async fn test_get_device() {
    let (server, client) = setup(Credentials::token("token")).await;
    Mock::given(method("GET"))
        .and(path("/api/service/device"))
        .and(query_param("tenant", "t-1"))
        .and(query_param("localvmid", "vm-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "toolsStatus": { "runningStatus": "guestToolsRunning" },
            "device": { "powerstate": true, "cpu": 2, "ram": 2, "localvmdetails": { "localvmid": "vm-1", "state": 1 } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let device = client.devices().get("t-1", "vm-1").await.unwrap();

    assert!(device.is_active());
    assert!(device.is_guest_agent_running());
}

#[tokio::test]
async fn test_create_device_sends_configuration_as_parameters() {
    let (server, client) = setup(Credentials::token("token")).await;
    Mock::given(method("POST"))
        .and(path("/api/service/vmlist/create"))
        .and(query_param("cpucores", "2"))
        .and(query_param("disksize", "20"))
        .and(query_param("displayname", "machine"))
        .and(query_param("hostname", "machine"))
        .and(query_param("kubernetes_id", "kub1"))
        .and(query_param("memory", "2"))
        .and(query_param("password", "Xelon22"))
        .and(query_param("swapdisksize", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device": { "localvmid": "vm-1", "vmhostname": "machine" },
            "ips": ["192.0.2.10", "192.0.2.11"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client.devices().create(&create_configuration()).await.unwrap();

    assert_eq!(response.device.local_vm_id, "vm-1");
    assert_eq!(response.primary_ip(), Some("192.0.2.10"));
}

#[tokio::test]
async fn test_create_device_error_hides_device_password() {
    let (server, client) = setup(Credentials::token("token")).await;
    Mock::given(method("POST"))
        .and(path("/api/service/vmlist/create"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({ "error": "quota exceeded" })))
        .mount(&server)
        .await;

    let err = client.devices().create(&create_configuration()).await.unwrap_err();

    let message = err.to_string();
    assert!(message.contains("422"));
    assert!(message.contains("quota exceeded"));
    assert!(!message.contains("Xelon22"));
}

#[tokio::test]
async fn test_delete_sends_account_password_for_login_credentials() {
    let (server, client) = setup(Credentials::login("user@xelon.ch", "secret")).await;
    Mock::given(method("POST"))
        .and(path("/api/service/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": { "api_token": "tok" } })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/service/vmlist/vm-1"))
        .and(query_param("password", "secret"))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.devices().delete("vm-1").await.unwrap();
}

#[tokio::test]
async fn test_delete_not_found_is_surfaced() {
    let (server, client) = setup(Credentials::token("token")).await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "device not found" })))
        .mount(&server)
        .await;

    let err = client.devices().delete("vm-1").await.unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_start_and_stop_commands() {
    let (server, client) = setup(Credentials::token("token")).await;
    Mock::given(method("POST"))
        .and(path("/api/service/vmlist/vm-1/startserver"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/service/vmlist/vm-1/stopserver"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.devices().start("vm-1").await.unwrap();
    client.devices().stop("vm-1").await.unwrap();
}

#[tokio::test]
async fn test_add_ssh_key_sends_json_body() {
    let (server, client) = setup(Credentials::token("token")).await;
    Mock::given(method("POST"))
        .and(path("/api/service/vmlist/vm-1/ssh/add"))
        .and(body_json(json!({ "name": "machine", "ssh_key": "ssh-ed25519 AAAA machine" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let key = SshKeyRequest::new("machine", "ssh-ed25519 AAAA machine");
    client.ssh_keys().add("vm-1", &key).await.unwrap();
}

#[tokio::test]
async fn test_tenant_without_identifier_fails() {
    let (server, client) = setup(Credentials::token("token")).await;
    Mock::given(method("GET"))
        .and(path("/api/service/tenant"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let err = client.tenant().get().await.unwrap_err();

    assert!(matches!(err, ApiError::AuthenticationFailed(_)));
}
