use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http_client::{HttpClient, HttpRequest};
use crate::notify::{Notification, Notifier, NotifierError};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const SEND_TIMEOUT_MS: u64 = 10_000;

/// Wait applied when a 429 response does not carry `retry_after`.
const FALLBACK_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Bot API adapter delivering messages via `sendMessage`.
///
/// The bot credential is embedded in the request path, so transport errors
/// are scrubbed before they leave this adapter.
#[derive(Clone)]
pub struct TelegramNotifier {
    http_client: Arc<dyn HttpClient>,
    token: String,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(http_client: Arc<dyn HttpClient>, token: impl Into<String>) -> Self {
        Self {
            http_client,
            token: token.into(),
            api_base: DEFAULT_API_BASE.to_owned(),
        }
    }

    /// Point the adapter at a different API host (tests, local proxies).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn send_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }

    fn scrub(&self, message: &str) -> String {
        message.replace(&self.token, "<redacted>")
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifierError> {
        let payload = SendMessagePayload::from(notification);
        let body = serde_json::to_string(&payload)
            .map_err(|e| NotifierError::Transient(format!("payload encoding failed: {e}")))?;

        let request =
            HttpRequest::post_json(self.send_url(), body).with_timeout_ms(SEND_TIMEOUT_MS);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| NotifierError::Transient(self.scrub(e.message())))?;

        if response.is_success() {
            return Ok(());
        }

        if response.status == 429 {
            return Err(NotifierError::RateLimited {
                retry_after: parse_retry_after(&response.body),
            });
        }

        Err(NotifierError::Transient(format!(
            "send endpoint returned status {}",
            response.status
        )))
    }
}

impl Notifier for TelegramNotifier {
    fn send<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifierError>> + Send + 'a>> {
        Box::pin(self.deliver(notification))
    }
}

#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    chat_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_thread_id: Option<i64>,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
}

impl<'a> From<&'a Notification> for SendMessagePayload<'a> {
    fn from(notification: &'a Notification) -> Self {
        Self {
            chat_id: notification.chat_id,
            message_thread_id: notification.thread_id,
            text: &notification.text,
            parse_mode: notification.markdown.then_some("Markdown"),
        }
    }
}

// 429 body: {"ok":false,"error_code":429,"parameters":{"retry_after":5}}
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    parameters: Option<ErrorParameters>,
}

#[derive(Debug, Deserialize)]
struct ErrorParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

fn parse_retry_after(body: &str) -> Duration {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.parameters)
        .and_then(|parameters| parameters.retry_after)
        .map(Duration::from_secs)
        .unwrap_or(FALLBACK_RETRY_AFTER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, HttpResponse};
    use std::sync::Mutex;

    struct ScriptedHttpClient {
        response: Result<HttpResponse, HttpError>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        fn returning(response: Result<HttpResponse, HttpError>) -> Arc<Self> {
            Arc::new(Self {
                response,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn recorded(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .clone()
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            let response = self.response.clone();
            Box::pin(async move { response })
        }
    }

    fn notification() -> Notification {
        Notification {
            chat_id: -1_002_782,
            thread_id: Some(3),
            text: "📊 *BTC Dominance* 52.00%".to_owned(),
            markdown: true,
        }
    }

    #[tokio::test]
    async fn send_posts_json_payload_to_send_message_endpoint() {
        let client = ScriptedHttpClient::returning(Ok(HttpResponse::ok_json(
            r#"{"ok":true,"result":{}}"#,
        )));
        let notifier = TelegramNotifier::new(client.clone(), "123:abc");

        notifier.send(&notification()).await.expect("send succeeds");

        let requests = client.recorded();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.ends_with("/bot123:abc/sendMessage"));

        let body = requests[0].body.as_deref().expect("json body present");
        assert!(body.contains("\"chat_id\":-1002782"));
        assert!(body.contains("\"message_thread_id\":3"));
        assert!(body.contains("\"parse_mode\":\"Markdown\""));
    }

    #[tokio::test]
    async fn thread_and_parse_mode_are_omitted_when_unset() {
        let client = ScriptedHttpClient::returning(Ok(HttpResponse::ok_json("{}")));
        let notifier = TelegramNotifier::new(client.clone(), "123:abc");
        let plain = Notification {
            thread_id: None,
            markdown: false,
            ..notification()
        };

        notifier.send(&plain).await.expect("send succeeds");

        let body = client.recorded()[0].body.clone().expect("json body present");
        assert!(!body.contains("message_thread_id"));
        assert!(!body.contains("parse_mode"));
    }

    #[tokio::test]
    async fn http_429_maps_to_rate_limited_with_upstream_wait() {
        let client = ScriptedHttpClient::returning(Ok(HttpResponse {
            status: 429,
            body: r#"{"ok":false,"error_code":429,"parameters":{"retry_after":5}}"#.to_owned(),
        }));
        let notifier = TelegramNotifier::new(client, "123:abc");

        let error = notifier
            .send(&notification())
            .await
            .expect_err("429 should fail");

        assert_eq!(
            error,
            NotifierError::RateLimited {
                retry_after: Duration::from_secs(5)
            }
        );
    }

    #[tokio::test]
    async fn http_429_without_parameters_falls_back_to_default_wait() {
        let client = ScriptedHttpClient::returning(Ok(HttpResponse {
            status: 429,
            body: r#"{"ok":false,"error_code":429}"#.to_owned(),
        }));
        let notifier = TelegramNotifier::new(client, "123:abc");

        let error = notifier
            .send(&notification())
            .await
            .expect_err("429 should fail");

        assert_eq!(
            error,
            NotifierError::RateLimited {
                retry_after: FALLBACK_RETRY_AFTER
            }
        );
    }

    #[tokio::test]
    async fn other_statuses_are_transient() {
        let client = ScriptedHttpClient::returning(Ok(HttpResponse {
            status: 502,
            body: String::new(),
        }));
        let notifier = TelegramNotifier::new(client, "123:abc");

        let error = notifier
            .send(&notification())
            .await
            .expect_err("502 should fail");

        assert!(matches!(error, NotifierError::Transient(_)));
    }

    #[tokio::test]
    async fn transport_errors_never_leak_the_credential() {
        let client = ScriptedHttpClient::returning(Err(HttpError::new(
            "connection failed: https://api.telegram.org/bot123:abc/sendMessage",
        )));
        let notifier = TelegramNotifier::new(client, "123:abc");

        let error = notifier
            .send(&notification())
            .await
            .expect_err("transport failure");

        match error {
            NotifierError::Transient(message) => {
                assert!(!message.contains("123:abc"), "credential leaked: {message}");
                assert!(message.contains("<redacted>"));
            }
            other => panic!("expected transient, got {other:?}"),
        }
    }
}
