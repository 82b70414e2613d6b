#![allow(clippy::unwrap_used)]
// Integration tests for `ConfigController` against a wiremock backend.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ipmon_core::{
    AUTO_REFRESH, ConfigController, ConfigForm, Control, DRAFT_KEY, DraftStore, IpmonClient,
    MemoryDraftStore, MessageLevel, REFRESH_RATE, RELOAD_DELAY, ResetOutcome, StatusMessage,
    import_status,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ConfigController, Arc<MemoryDraftStore>) {
    let server = MockServer::start().await;
    let client = IpmonClient::new(
        Url::parse(&server.uri()).unwrap(),
        "tce.go.gov.br",
        &ipmon_api::TransportConfig::default(),
    )
    .unwrap();
    let drafts = Arc::new(MemoryDraftStore::new());
    let controller = ConfigController::new(client, Arc::clone(&drafts) as Arc<dyn DraftStore>);
    (server, controller, drafts)
}

fn ok_reply(message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "message": message }))
}

// ── Save ────────────────────────────────────────────────────────────

#[tokio::test]
async fn save_success_clears_draft_and_stamps_time() {
    let (server, controller, drafts) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/config/save"))
        .respond_with(ok_reply("Configurações salvas com sucesso"))
        .expect(1)
        .mount(&server)
        .await;

    let mut form = controller.new_form();
    form.set_value("ping_intervals.vlan_85", "90").unwrap();
    controller.on_change(&form);
    assert!(drafts.load(DRAFT_KEY).unwrap().is_some());
    assert_eq!(controller.last_saved_label(), "-");

    let message = controller.save_form(&mut form).await;

    assert_eq!(message, StatusMessage::success("✅ Configuration saved successfully!"));
    assert_eq!(drafts.load(DRAFT_KEY).unwrap(), None);
    assert!(controller.last_saved().is_some());
    assert_eq!(controller.last_saved_label().len(), "07/03/2024, 14:05:09".len());
    assert!(!controller.is_busy(Control::Save));
}

#[tokio::test]
async fn save_failure_keeps_draft_and_reports_server_error() {
    let (server, controller, drafts) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/config/save"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "Intervalo inválido" })),
        )
        .mount(&server)
        .await;

    let mut form = controller.new_form();
    controller.on_change(&form);

    let message = controller.save_form(&mut form).await;

    assert_eq!(message.level, MessageLevel::Error);
    assert_eq!(message.text, "❌ Failed to save: Intervalo inválido");
    assert!(drafts.load(DRAFT_KEY).unwrap().is_some());
    assert!(controller.last_saved().is_none());
    assert!(!controller.is_busy(Control::Save));
}

#[tokio::test]
async fn save_failure_without_message_uses_generic_text() {
    let (server, controller, _drafts) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/config/save"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let message = controller.save_form(&mut controller.new_form()).await;
    assert_eq!(message.text, "❌ Failed to save: Error saving configuration");
}

#[tokio::test]
async fn invalid_form_is_not_sent() {
    let (server, controller, _drafts) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/config/save"))
        .respond_with(ok_reply("ok"))
        .expect(0)
        .mount(&server)
        .await;

    let mut form = controller.new_form();
    form.set_value("network_settings.retry_attempts", "abc").unwrap();
    let message = controller.save_form(&mut form).await;

    assert!(message.is_error());
    assert!(message.text.contains("Retry attempts"), "got: {}", message.text);
}

#[tokio::test]
async fn second_save_is_refused_while_first_is_in_flight() {
    let (server, controller, _drafts) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/config/save"))
        .respond_with(ok_reply("ok").set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let tree = controller.new_form().to_tree().unwrap();
    let first = {
        let controller = controller.clone();
        let tree = tree.clone();
        tokio::spawn(async move { controller.save(&tree).await })
    };

    let mut busy = controller.subscribe_busy();
    tokio::time::timeout(Duration::from_secs(2), busy.wait_for(|set| set.contains(&Control::Save)))
        .await
        .unwrap()
        .unwrap();

    let refused = controller.save(&tree).await;
    assert_eq!(refused, StatusMessage::info("Save already in progress"));

    let done = first.await.unwrap();
    assert_eq!(done.level, MessageLevel::Success);
    assert!(!controller.is_busy(Control::Save));
}

// ── Reset ───────────────────────────────────────────────────────────

#[tokio::test]
async fn declined_reset_sends_nothing() {
    let (server, controller, _drafts) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/config/reset"))
        .respond_with(ok_reply("ok"))
        .expect(0)
        .mount(&server)
        .await;

    let mut prompt = String::new();
    let outcome = controller
        .reset_to_defaults(|question| {
            prompt = question.to_owned();
            false
        })
        .await;

    assert_eq!(outcome, ResetOutcome::Cancelled);
    assert_eq!(prompt, ipmon_core::RESET_PROMPT);
}

#[tokio::test]
async fn confirmed_reset_asks_for_reload() {
    let (server, controller, _drafts) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/config/reset"))
        .respond_with(ok_reply("Configurações resetadas para padrão"))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = controller.reset_to_defaults(|_| true).await;
    match outcome {
        ResetOutcome::Reset { message, reload_in } => {
            assert_eq!(message.level, MessageLevel::Success);
            assert_eq!(reload_in, RELOAD_DELAY);
        }
        other => panic!("expected Reset, got {other:?}"),
    }
    assert!(!controller.is_busy(Control::Reset));
}

#[tokio::test]
async fn reset_and_reload_restores_defaults_and_drops_draft() {
    let (server, controller, drafts) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/config/reset"))
        .respond_with(ok_reply("ok"))
        .mount(&server)
        .await;

    let mut form = controller.new_form();
    form.set_value("ping_intervals.vlan_70", "250").unwrap();
    controller.on_change(&form);

    let message = controller.reset_and_reload(&mut form, |_| true).await.unwrap();

    assert_eq!(message.level, MessageLevel::Success);
    assert_eq!(form, controller.new_form());
    assert_eq!(drafts.load(DRAFT_KEY).unwrap(), None);
}

#[tokio::test]
async fn failed_reset_reports_error() {
    let (server, controller, _drafts) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/config/reset"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "Erro ao resetar" })))
        .mount(&server)
        .await;

    let outcome = controller.reset_to_defaults(|_| true).await;
    assert_eq!(
        outcome,
        ResetOutcome::Failed(StatusMessage::error("❌ Failed to restore: Erro ao resetar"))
    );
}

// ── Test ────────────────────────────────────────────────────────────

#[tokio::test]
async fn dry_run_reports_message_and_details() {
    let (server, controller, drafts) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/config/test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Teste concluído. 6 intervalos testados.",
            "details": {
                "ping_tests": 6,
                "network_connectivity": true,
                "config_validity": false
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let form = controller.new_form();
    controller.on_change(&form);
    let outcome = controller.test_form(&form).await;

    assert_eq!(
        outcome.message,
        StatusMessage::info("🧪 Test complete: Teste concluído. 6 intervalos testados.")
    );
    let details = outcome.details.unwrap();
    assert_eq!(details.ping_tests, Some(6));
    assert_eq!(details.config_validity, Some(false));
    assert_eq!(details.entries().len(), 3);
    assert!(drafts.load(DRAFT_KEY).unwrap().is_some());
}

#[tokio::test]
async fn unreachable_backend_is_a_message_not_a_panic() {
    let client = IpmonClient::new(
        Url::parse("http://127.0.0.1:9").unwrap(),
        "tce.go.gov.br",
        &ipmon_api::TransportConfig::default(),
    )
    .unwrap();
    let controller = ConfigController::new(client, Arc::new(MemoryDraftStore::new()));

    let outcome = controller.test_form(&controller.new_form()).await;
    assert!(outcome.message.is_error());
    assert!(outcome.message.text.starts_with("❌ Test failed: Cannot reach"));
    assert!(!controller.is_busy(Control::Test));
}

// ── Drafts and files ────────────────────────────────────────────────

#[tokio::test]
async fn draft_is_restored_into_a_fresh_form() {
    let (_server, controller, _drafts) = setup().await;

    let mut edited = controller.new_form();
    edited.set_value("monitoring.log_level", "DEBUG").unwrap();
    edited.set_checked(AUTO_REFRESH, false).unwrap();
    controller.on_change(&edited);

    let mut fresh = controller.new_form();
    let message = controller.load_draft(&mut fresh).unwrap();

    assert_eq!(message, StatusMessage::info("📝 Draft loaded automatically"));
    assert_eq!(fresh.field("monitoring.log_level").unwrap().raw(), "DEBUG");
    assert!(!fresh.field(REFRESH_RATE).unwrap().is_enabled());
}

#[tokio::test]
async fn corrupt_draft_is_ignored() {
    let (_server, controller, drafts) = setup().await;
    drafts.store(DRAFT_KEY, "{ not json").unwrap();

    let mut form = controller.new_form();
    assert_eq!(controller.load_draft(&mut form), None);
    assert_eq!(form, controller.new_form());
}

#[tokio::test]
async fn export_then_import_reproduces_the_tree() {
    let (_server, controller, _drafts) = setup().await;
    let dir = tempfile::tempdir().unwrap();

    let mut form = controller.new_form();
    form.set_value("network_settings.ping_timeout", "3.5").unwrap();
    form.set_value("system_info.admin_contact", "noc@tce.go.gov.br").unwrap();
    let path = controller.export(&form, dir.path()).unwrap();

    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("ipmonitor_config_") && name.ends_with(".json"));
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\n  \""), "expected two-space indentation");

    let mut imported: ConfigForm = controller.new_form();
    let result = controller.import(&mut imported, &path);
    assert_eq!(
        import_status(&result),
        StatusMessage::success("📁 Configuration imported successfully!")
    );
    assert_eq!(imported.to_tree().unwrap(), form.to_tree().unwrap());
}

#[tokio::test]
async fn importing_garbage_fails_visibly() {
    let (_server, controller, _drafts) = setup().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "[1, 2, 3]").unwrap();

    let mut form = controller.new_form();
    let result = controller.import(&mut form, &path);

    assert!(result.is_err());
    assert_eq!(
        import_status(&result),
        StatusMessage::error("❌ Error importing configuration: invalid file")
    );
    assert_eq!(form, controller.new_form());
}
