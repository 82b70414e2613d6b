#![allow(clippy::unwrap_used)]
// Integration tests for `IpmonClient` using wiremock.

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ipmon_api::{DeviceRecord, Error, IpmonClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, IpmonClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = IpmonClient::with_client(reqwest::Client::new(), base_url, "tce.go.gov.br");
    (server, client)
}

fn sample_config() -> serde_json::Value {
    json!({
        "network_settings": { "ping_timeout": 2, "max_concurrent_pings": 3 },
        "ui_settings": { "auto_refresh": true, "refresh_rate": 5 }
    })
}

// ── Configuration tests ─────────────────────────────────────────────

#[tokio::test]
async fn test_save_config_posts_tree() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/config/save"))
        .and(body_json(sample_config()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Configurações salvas com sucesso"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client.save_config(&sample_config()).await.unwrap();
    assert_eq!(reply.server_message(), Some("Configurações salvas com sucesso"));
}

#[tokio::test]
async fn test_save_config_surfaces_error_key() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/config/save"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "Intervalo inválido" })),
        )
        .mount(&server)
        .await;

    let err = client.save_config(&sample_config()).await.unwrap_err();
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message.as_deref(), Some("Intervalo inválido"));
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_save_config_html_error_has_no_message() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/config/save"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>boom</html>"))
        .mount(&server)
        .await;

    let err = client.save_config(&sample_config()).await.unwrap_err();
    assert_eq!(err.server_message(), None);
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_reset_config() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/config/reset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Configurações resetadas para padrão"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client.reset_config().await.unwrap();
    assert_eq!(reply.success, Some(true));
}

#[tokio::test]
async fn test_test_config_returns_details() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/config/test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Teste concluído. 6 intervalos testados.",
            "details": {
                "ping_tests": 6,
                "network_connectivity": true,
                "config_validity": true
            }
        })))
        .mount(&server)
        .await;

    let reply = client.test_config(&sample_config()).await.unwrap();
    let details = reply.test_details().unwrap();
    assert_eq!(details.ping_tests, Some(6));
    assert_eq!(details.network_connectivity, Some(true));
    assert_eq!(details.config_validity, Some(true));
}

#[tokio::test]
async fn test_explicit_rejection_is_an_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/config/test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Configuração inválida"
        })))
        .mount(&server)
        .await;

    let err = client.test_config(&sample_config()).await.unwrap_err();
    assert_eq!(err.server_message(), Some("Configuração inválida"));
}

// ── Status tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_segment_status_decodes_rows() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/start-check/85"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "descricao": "Impressora 2º andar", "ip": "10.85.0.20", "status": "on", "tipo": "impressora" },
            { "descricao": "AP sala 3", "ip": "10.85.0.31" }
        ])))
        .mount(&server)
        .await;

    let rows = client.segment_status("85").await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[1],
        DeviceRecord {
            description: "AP sala 3".into(),
            ip: "10.85.0.31".into(),
            status: None,
            kind: None,
        }
    );
}

#[tokio::test]
async fn test_segment_status_no_content() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/start-check/204"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let err = client.segment_status("204").await.unwrap_err();
    assert!(
        matches!(err, Error::NoContent { ref segment } if segment == "204"),
        "expected NoContent, got: {err:?}"
    );
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_segment_status_bad_json() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/start-check/70"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client.segment_status("70").await.unwrap_err();
    assert!(
        matches!(err, Error::Deserialization { ref body, .. } if body == "not json"),
        "expected Deserialization error, got: {err:?}"
    );
}

#[tokio::test]
async fn test_connection_refused_is_transient() {
    let base = Url::parse("http://127.0.0.1:9").unwrap();
    let client = IpmonClient::with_client(reqwest::Client::new(), base, "tce.go.gov.br");

    let err = client.segment_status("85").await.unwrap_err();
    assert!(err.is_connect(), "expected connect error, got: {err:?}");
    assert!(err.is_transient());
}
