//! Executes event actions against handles supplied by the host.
//!
//! Nothing escapes [`dispatch`]: missing configuration or handles are logged
//! and skipped, and failing handles turn into a generic notice for the user.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use expression::resolve_binding;
use reqwest::Client;
use serde_json::Value as Json;
use shared::protocol::{Action, ModalConfig, NotificationLevel};
use tracing::{debug, error, warn};
use url::Url;

pub const DEFAULT_NOTIFICATION: &str = "Action executed";
pub const GENERIC_FAILURE: &str = "Something went wrong while running this action";

pub trait Notifier: Send + Sync {
    fn notify(&self, level: NotificationLevel, message: &str);
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str) -> Result<()>;
}

pub trait ModalHost: Send + Sync {
    fn open_modal(&self, config: &ModalConfig) -> Result<()>;
}

pub trait VariableSink: Send + Sync {
    fn set_variable(&self, name: &str, value: Json) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub endpoint: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Json>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Performs the request. Non-success statuses are errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

pub struct ReqwestHttpClient {
    http: Client,
    base_url: Option<Url>,
}

impl ReqwestHttpClient {
    pub fn new(base_url: Option<&str>) -> Result<Self> {
        let base_url = base_url
            .map(|raw| Url::parse(raw).with_context(|| format!("invalid api base url '{raw}'")))
            .transpose()?;
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    fn resolve(&self, endpoint: &str) -> Result<Url> {
        match Url::parse(endpoint) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self
                    .base_url
                    .as_ref()
                    .ok_or_else(|| anyhow!("relative endpoint '{endpoint}' needs an api base url"))?;
                base.join(endpoint)
                    .with_context(|| format!("invalid endpoint '{endpoint}'"))
            }
            Err(error) => Err(anyhow!("invalid endpoint '{endpoint}': {error}")),
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = self.resolve(&request.endpoint)?;
        let mut builder = self.http.request(request.method.into(), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let res = builder.send().await?.error_for_status()?;
        let status = res.status().as_u16();
        let body = res.text().await?;
        Ok(HttpResponse { status, body })
    }
}

/// Shared flag telling an in-flight action whether the widget that fired it
/// is still mounted.
#[derive(Debug, Clone)]
pub struct MountToken(Arc<AtomicBool>);

impl MountToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn unmount(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_mounted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for MountToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Host capabilities for one dispatch. Only the notifier is mandatory.
#[derive(Clone, Copy)]
pub struct ActionHandles<'a> {
    pub notifier: &'a dyn Notifier,
    pub navigator: Option<&'a dyn Navigator>,
    pub modal_host: Option<&'a dyn ModalHost>,
    pub variables: Option<&'a dyn VariableSink>,
    pub http: Option<&'a dyn HttpClient>,
    pub mount: Option<&'a MountToken>,
}

impl<'a> ActionHandles<'a> {
    pub fn new(notifier: &'a dyn Notifier) -> Self {
        Self {
            notifier,
            navigator: None,
            modal_host: None,
            variables: None,
            http: None,
            mount: None,
        }
    }

    pub fn with_navigator(mut self, navigator: &'a dyn Navigator) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn with_modal_host(mut self, modal_host: &'a dyn ModalHost) -> Self {
        self.modal_host = Some(modal_host);
        self
    }

    pub fn with_variables(mut self, variables: &'a dyn VariableSink) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_http(mut self, http: &'a dyn HttpClient) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_mount(mut self, mount: &'a MountToken) -> Self {
        self.mount = Some(mount);
        self
    }

    fn is_stale(&self) -> bool {
        self.mount.is_some_and(|mount| !mount.is_mounted())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingRoute,
    MissingNavigator,
    MissingEndpoint,
    MissingHttpClient,
    UnsupportedMethod(String),
    MissingModalHost,
    MissingVariableSink,
    MissingVariableName,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRoute => f.write_str("navigate action has no route"),
            Self::MissingNavigator => f.write_str("no navigator available"),
            Self::MissingEndpoint => f.write_str("api action has no endpoint"),
            Self::MissingHttpClient => f.write_str("no http client available"),
            Self::UnsupportedMethod(method) => write!(f, "unsupported http method {method}"),
            Self::MissingModalHost => f.write_str("no modal host available"),
            Self::MissingVariableSink => f.write_str("no variable store available"),
            Self::MissingVariableName => f.write_str("variable action has no variable name"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Completed,
    Skipped(SkipReason),
    /// A handle failed; the user has seen the generic failure notice.
    Failed,
    /// The firing widget unmounted before the response arrived.
    Stale,
}

pub async fn dispatch(action: &Action, handles: &ActionHandles<'_>) -> DispatchOutcome {
    dispatch_with_context(action, handles, &Json::Null).await
}

/// Like [`dispatch`], resolving `{{path}}` bindings in the action's text
/// fields against `context` first.
pub async fn dispatch_with_context(
    action: &Action,
    handles: &ActionHandles<'_>,
    context: &Json,
) -> DispatchOutcome {
    let action = bind_action(action, context);
    let kind = action.kind().as_str();
    match run(&action, handles).await {
        Ok(DispatchOutcome::Skipped(reason)) => {
            warn!(action = kind, %reason, "action skipped");
            DispatchOutcome::Skipped(reason)
        }
        Ok(outcome) => {
            debug!(action = kind, ?outcome, "action dispatched");
            outcome
        }
        Err(err) => {
            error!(action = kind, error = %err, "action failed");
            handles
                .notifier
                .notify(NotificationLevel::Error, GENERIC_FAILURE);
            DispatchOutcome::Failed
        }
    }
}

async fn run(action: &Action, handles: &ActionHandles<'_>) -> Result<DispatchOutcome> {
    match action {
        Action::Navigate(config) => {
            let Some(route) = non_blank(config.route.as_deref()) else {
                return Ok(DispatchOutcome::Skipped(SkipReason::MissingRoute));
            };
            let Some(navigator) = handles.navigator else {
                return Ok(DispatchOutcome::Skipped(SkipReason::MissingNavigator));
            };
            navigator.navigate(route)?;
            Ok(DispatchOutcome::Completed)
        }
        Action::Notification(config) => {
            let message = non_blank(config.message.as_deref()).unwrap_or(DEFAULT_NOTIFICATION);
            handles.notifier.notify(config.level, message);
            Ok(DispatchOutcome::Completed)
        }
        Action::Api(config) => {
            let Some(endpoint) = non_blank(config.endpoint.as_deref()) else {
                return Ok(DispatchOutcome::Skipped(SkipReason::MissingEndpoint));
            };
            let raw_method = config.method.as_deref().unwrap_or("GET");
            let Some(method) = HttpMethod::parse(raw_method) else {
                return Ok(DispatchOutcome::Skipped(SkipReason::UnsupportedMethod(
                    raw_method.to_string(),
                )));
            };
            let Some(http) = handles.http else {
                return Ok(DispatchOutcome::Skipped(SkipReason::MissingHttpClient));
            };
            let request = HttpRequest {
                method,
                endpoint: endpoint.to_string(),
                headers: config.headers.clone(),
                body: config.body.clone(),
            };
            let response = http.send(request).await;
            if handles.is_stale() {
                debug!(endpoint, "dropping api result for an unmounted widget");
                return Ok(DispatchOutcome::Stale);
            }
            let response = response?;
            if config.show_result {
                handles
                    .notifier
                    .notify(NotificationLevel::Info, &response.body);
            }
            Ok(DispatchOutcome::Completed)
        }
        Action::Modal(config) => {
            let Some(modal_host) = handles.modal_host else {
                return Ok(DispatchOutcome::Skipped(SkipReason::MissingModalHost));
            };
            modal_host.open_modal(config)?;
            Ok(DispatchOutcome::Completed)
        }
        Action::Variable(config) => {
            let Some(variables) = handles.variables else {
                return Ok(DispatchOutcome::Skipped(SkipReason::MissingVariableSink));
            };
            let Some(name) = non_blank(config.variable_name.as_deref()) else {
                return Ok(DispatchOutcome::Skipped(SkipReason::MissingVariableName));
            };
            variables.set_variable(name, config.value.clone().unwrap_or(Json::Null))?;
            Ok(DispatchOutcome::Completed)
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn bind_action(action: &Action, context: &Json) -> Action {
    let bind = |field: &Option<String>| field.as_deref().map(|raw| resolve_binding(raw, context));
    match action {
        Action::Navigate(config) => {
            let mut config = config.clone();
            config.route = bind(&config.route);
            Action::Navigate(config)
        }
        Action::Notification(config) => {
            let mut config = config.clone();
            config.message = bind(&config.message);
            Action::Notification(config)
        }
        Action::Api(config) => {
            let mut config = config.clone();
            config.endpoint = bind(&config.endpoint);
            Action::Api(config)
        }
        Action::Modal(config) => {
            let mut config = config.clone();
            config.title = bind(&config.title);
            config.content = bind(&config.content);
            Action::Modal(config)
        }
        Action::Variable(config) => Action::Variable(config.clone()),
    }
}

#[cfg(test)]
#[path = "tests/dispatch_tests.rs"]
mod tests;
