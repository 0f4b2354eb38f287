use std::sync::Mutex;

use serde_json::json;
use shared::protocol::{ApiConfig, NavigateConfig, NotificationConfig, VariableConfig};

use super::*;

#[derive(Default)]
struct RecordingNotifier {
    notices: Mutex<Vec<(NotificationLevel, String)>>,
}

impl RecordingNotifier {
    fn notices(&self) -> Vec<(NotificationLevel, String)> {
        self.notices.lock().expect("notices").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        self.notices
            .lock()
            .expect("notices")
            .push((level, message.to_string()));
    }
}

#[derive(Default)]
struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
    fail: bool,
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) -> Result<()> {
        if self.fail {
            return Err(anyhow!("router unavailable"));
        }
        self.routes.lock().expect("routes").push(route.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingModals {
    opened: Mutex<Vec<ModalConfig>>,
}

impl ModalHost for RecordingModals {
    fn open_modal(&self, config: &ModalConfig) -> Result<()> {
        self.opened.lock().expect("modals").push(config.clone());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingVariables {
    values: Mutex<Vec<(String, Json)>>,
}

impl VariableSink for RecordingVariables {
    fn set_variable(&self, name: &str, value: Json) -> Result<()> {
        self.values
            .lock()
            .expect("variables")
            .push((name.to_string(), value));
        Ok(())
    }
}

/// Answers every request with a fixed body and remembers what it was sent.
struct StubHttp {
    body: String,
    fail: bool,
    requests: Mutex<Vec<HttpRequest>>,
    unmount_on_send: Option<MountToken>,
}

impl StubHttp {
    fn ok(body: &str) -> Self {
        Self {
            body: body.to_string(),
            fail: false,
            requests: Mutex::new(Vec::new()),
            unmount_on_send: None,
        }
    }
}

#[async_trait]
impl HttpClient for StubHttp {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().expect("requests").push(request);
        if let Some(mount) = &self.unmount_on_send {
            mount.unmount();
        }
        if self.fail {
            return Err(anyhow!("connection refused"));
        }
        Ok(HttpResponse {
            status: 200,
            body: self.body.clone(),
        })
    }
}

fn navigate(route: Option<&str>) -> Action {
    Action::Navigate(NavigateConfig {
        route: route.map(str::to_string),
    })
}

#[tokio::test]
async fn navigate_routes_through_navigator() {
    let notifier = RecordingNotifier::default();
    let navigator = RecordingNavigator::default();
    let handles = ActionHandles::new(&notifier).with_navigator(&navigator);

    let outcome = dispatch(&navigate(Some("/tasks")), &handles).await;
    assert_eq!(outcome, DispatchOutcome::Completed);
    assert_eq!(*navigator.routes.lock().expect("routes"), vec!["/tasks"]);
}

#[tokio::test]
async fn navigate_without_route_is_skipped() {
    let notifier = RecordingNotifier::default();
    let navigator = RecordingNavigator::default();
    let handles = ActionHandles::new(&notifier).with_navigator(&navigator);

    let outcome = dispatch(&navigate(None), &handles).await;
    assert_eq!(outcome, DispatchOutcome::Skipped(SkipReason::MissingRoute));
    assert!(notifier.notices().is_empty());
}

#[tokio::test]
async fn failing_handle_shows_generic_notice() {
    let notifier = RecordingNotifier::default();
    let navigator = RecordingNavigator {
        fail: true,
        ..Default::default()
    };
    let handles = ActionHandles::new(&notifier).with_navigator(&navigator);

    let outcome = dispatch(&navigate(Some("/x")), &handles).await;
    assert_eq!(outcome, DispatchOutcome::Failed);
    assert_eq!(
        notifier.notices(),
        vec![(NotificationLevel::Error, GENERIC_FAILURE.to_string())]
    );
}

#[tokio::test]
async fn notification_falls_back_to_default_message() {
    let notifier = RecordingNotifier::default();
    let handles = ActionHandles::new(&notifier);

    let action = Action::Notification(NotificationConfig {
        message: None,
        level: NotificationLevel::Warning,
    });
    assert_eq!(dispatch(&action, &handles).await, DispatchOutcome::Completed);
    assert_eq!(
        notifier.notices(),
        vec![(NotificationLevel::Warning, DEFAULT_NOTIFICATION.to_string())]
    );
}

#[tokio::test]
async fn api_action_sends_request_and_shows_result() {
    let notifier = RecordingNotifier::default();
    let http = StubHttp::ok(r#"{"ok":true}"#);
    let handles = ActionHandles::new(&notifier).with_http(&http);

    let action = Action::Api(ApiConfig {
        endpoint: Some("/api/tasks".into()),
        method: Some("post".into()),
        body: Some(json!({"title": "new"})),
        show_result: true,
        ..Default::default()
    });
    assert_eq!(dispatch(&action, &handles).await, DispatchOutcome::Completed);

    let requests = http.requests.lock().expect("requests").clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(requests[0].body, Some(json!({"title": "new"})));
    assert_eq!(
        notifier.notices(),
        vec![(NotificationLevel::Info, r#"{"ok":true}"#.to_string())]
    );
}

#[tokio::test]
async fn api_action_rejects_unknown_method() {
    let notifier = RecordingNotifier::default();
    let http = StubHttp::ok("");
    let handles = ActionHandles::new(&notifier).with_http(&http);

    let action = Action::Api(ApiConfig {
        endpoint: Some("/x".into()),
        method: Some("TRACE".into()),
        ..Default::default()
    });
    assert_eq!(
        dispatch(&action, &handles).await,
        DispatchOutcome::Skipped(SkipReason::UnsupportedMethod("TRACE".into()))
    );
    assert!(http.requests.lock().expect("requests").is_empty());
}

#[tokio::test]
async fn api_action_without_client_or_endpoint_is_skipped() {
    let notifier = RecordingNotifier::default();
    let handles = ActionHandles::new(&notifier);

    let with_endpoint = Action::Api(ApiConfig {
        endpoint: Some("/x".into()),
        ..Default::default()
    });
    assert_eq!(
        dispatch(&with_endpoint, &handles).await,
        DispatchOutcome::Skipped(SkipReason::MissingHttpClient)
    );
    assert_eq!(
        dispatch(&Action::Api(ApiConfig::default()), &handles).await,
        DispatchOutcome::Skipped(SkipReason::MissingEndpoint)
    );
}

#[tokio::test]
async fn api_failure_notifies_generically() {
    let notifier = RecordingNotifier::default();
    let http = StubHttp {
        fail: true,
        ..StubHttp::ok("")
    };
    let handles = ActionHandles::new(&notifier).with_http(&http);

    let action = Action::Api(ApiConfig {
        endpoint: Some("/x".into()),
        ..Default::default()
    });
    assert_eq!(dispatch(&action, &handles).await, DispatchOutcome::Failed);
    assert_eq!(notifier.notices()[0].1, GENERIC_FAILURE);
}

#[tokio::test]
async fn api_result_is_dropped_after_unmount() {
    let notifier = RecordingNotifier::default();
    let mount = MountToken::new();
    let http = StubHttp {
        unmount_on_send: Some(mount.clone()),
        ..StubHttp::ok("late")
    };
    let handles = ActionHandles::new(&notifier).with_http(&http).with_mount(&mount);

    let action = Action::Api(ApiConfig {
        endpoint: Some("/slow".into()),
        show_result: true,
        ..Default::default()
    });
    assert_eq!(dispatch(&action, &handles).await, DispatchOutcome::Stale);
    assert!(notifier.notices().is_empty());
}

#[tokio::test]
async fn modal_and_variable_need_their_handles() {
    let notifier = RecordingNotifier::default();
    let modals = RecordingModals::default();
    let variables = RecordingVariables::default();

    let modal = Action::Modal(ModalConfig {
        modal_id: Some("confirm".into()),
        ..Default::default()
    });
    let variable = Action::Variable(VariableConfig {
        variable_name: Some("filter".into()),
        value: Some(json!("done")),
    });

    let bare = ActionHandles::new(&notifier);
    assert_eq!(
        dispatch(&modal, &bare).await,
        DispatchOutcome::Skipped(SkipReason::MissingModalHost)
    );
    assert_eq!(
        dispatch(&variable, &bare).await,
        DispatchOutcome::Skipped(SkipReason::MissingVariableSink)
    );

    let full = bare.with_modal_host(&modals).with_variables(&variables);
    assert_eq!(dispatch(&modal, &full).await, DispatchOutcome::Completed);
    assert_eq!(dispatch(&variable, &full).await, DispatchOutcome::Completed);
    assert_eq!(modals.opened.lock().expect("modals").len(), 1);
    assert_eq!(
        *variables.values.lock().expect("variables"),
        vec![("filter".to_string(), json!("done"))]
    );

    let unnamed = Action::Variable(VariableConfig::default());
    assert_eq!(
        dispatch(&unnamed, &full).await,
        DispatchOutcome::Skipped(SkipReason::MissingVariableName)
    );
}

#[tokio::test]
async fn context_bindings_fill_config_text() {
    let notifier = RecordingNotifier::default();
    let navigator = RecordingNavigator::default();
    let handles = ActionHandles::new(&notifier).with_navigator(&navigator);
    let context = json!({"task": {"id": 7, "title": "Ship"}});

    dispatch_with_context(&navigate(Some("/tasks/{{task.id}}")), &handles, &context).await;
    let message = Action::Notification(NotificationConfig {
        message: Some("Opened {{task.title}}".into()),
        level: NotificationLevel::Info,
    });
    dispatch_with_context(&message, &handles, &context).await;

    assert_eq!(*navigator.routes.lock().expect("routes"), vec!["/tasks/7"]);
    assert_eq!(notifier.notices()[0].1, "Opened Ship");
}

#[test]
fn http_method_parsing_is_case_insensitive() {
    assert_eq!(HttpMethod::parse("delete"), Some(HttpMethod::Delete));
    assert_eq!(HttpMethod::parse(" Patch "), Some(HttpMethod::Patch));
    assert_eq!(HttpMethod::parse("OPTIONS"), None);
}

#[test]
fn relative_endpoint_needs_base_url() {
    let client = ReqwestHttpClient::new(Some("http://localhost:9000/api/")).expect("client");
    assert_eq!(
        client.resolve("tasks").expect("join").as_str(),
        "http://localhost:9000/api/tasks"
    );
    assert_eq!(
        client.resolve("https://example.com/x").expect("absolute").as_str(),
        "https://example.com/x"
    );
    let bare = ReqwestHttpClient::new(None).expect("client");
    assert!(bare.resolve("/tasks").is_err());
}
