//! [`Browser`] implementation over the W3C WebDriver HTTP protocol.

use std::time::Duration;

use async_trait::async_trait;
use autoreel_common::{Error, Result};
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};

use crate::browser::{Browser, ElementRef};
use crate::locator::Locator;

/// Key under which WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Per-request timeout for WebDriver commands.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

const SCROLL_SCRIPT: &str = "arguments[0].scrollIntoView(true);";
const SCRIPT_CLICK: &str = "arguments[0].scrollIntoView(true); arguments[0].click();";

/// A live WebDriver session.
pub struct WebDriverClient {
    client: Client,
    base_url: String,
    session_id: String,
}

impl WebDriverClient {
    /// Open a new session on the endpoint at `base_url` with the given
    /// capabilities object (sent as `capabilities.alwaysMatch`).
    pub async fn connect(base_url: &str, capabilities: Value) -> Result<Self> {
        let client = Client::builder()
            .timeout(COMMAND_TIMEOUT)
            .build()
            .map_err(|e| Error::session(format!("failed to build HTTP client: {e}")))?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let body = json!({ "capabilities": { "alwaysMatch": capabilities } });
        let response = client
            .post(format!("{base_url}/session"))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::session(format!("driver unreachable at {base_url}: {e}")))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| Error::session(format!("invalid new-session response: {e}")))?;
        if !status.is_success() {
            return Err(Error::session(format!(
                "new session rejected ({status}): {}",
                error_message(&payload)
            )));
        }

        let session_id = payload["value"]["sessionId"]
            .as_str()
            .or_else(|| payload["sessionId"].as_str())
            .ok_or_else(|| Error::session("new-session response has no sessionId"))?
            .to_string();

        tracing::info!(session_id = %session_id, "WebDriver session created");
        Ok(Self {
            client,
            base_url,
            session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.session_id, path)
    }

    /// Issue a command and return the `value` member of the response.
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let mut request = self.client.request(method, self.url(path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.map_err(Error::http)?;
        let status = response.status();
        let payload: Value = response.json().await.map_err(Error::http)?;

        if status.is_success() {
            return Ok(payload.get("value").cloned().unwrap_or(Value::Null));
        }
        Err(Error::http(format!(
            "{path}: {status}: {}",
            error_message(&payload)
        )))
    }

    /// Like [`command`](Self::command) but maps "no such element" to `None`.
    async fn lookup(&self, path: &str, locator: &Locator) -> Result<Option<Value>> {
        let (using, value) = locator.to_wire();
        let response = self
            .client
            .post(self.url(path))
            .json(&json!({ "using": using, "value": value }))
            .send()
            .await
            .map_err(Error::http)?;
        let status = response.status();
        let payload: Value = response.json().await.map_err(Error::http)?;

        if status.is_success() {
            return Ok(payload.get("value").cloned());
        }
        if status == StatusCode::NOT_FOUND && payload["value"]["error"] == "no such element" {
            return Ok(None);
        }
        Err(Error::http(format!(
            "{path} {locator}: {status}: {}",
            error_message(&payload)
        )))
    }

    async fn execute(&self, script: &str, element: &ElementRef) -> Result<Value> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": [element_arg(element)] })),
        )
        .await
    }
}

fn element_arg(element: &ElementRef) -> Value {
    json!({ ELEMENT_KEY: element.as_str() })
}

fn parse_element(value: &Value) -> Option<ElementRef> {
    value[ELEMENT_KEY].as_str().map(ElementRef::new)
}

fn error_message(payload: &Value) -> String {
    let value = &payload["value"];
    match (value["error"].as_str(), value["message"].as_str()) {
        (Some(error), Some(message)) => format!("{error}: {message}"),
        (Some(error), None) => error.to_string(),
        _ => payload.to_string(),
    }
}

#[async_trait]
impl Browser for WebDriverClient {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn current_url(&self) -> Result<String> {
        let value = self.command(Method::GET, "/url", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn find(&self, locator: &Locator) -> Result<Option<ElementRef>> {
        Ok(self
            .lookup("/element", locator)
            .await?
            .as_ref()
            .and_then(parse_element))
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementRef>> {
        let value = self.lookup("/elements", locator).await?;
        Ok(value
            .as_ref()
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(parse_element).collect())
            .unwrap_or_default())
    }

    async fn is_displayed(&self, element: &ElementRef) -> Result<bool> {
        let path = format!("/element/{}/displayed", element.as_str());
        Ok(self.command(Method::GET, &path, None).await?.as_bool().unwrap_or(false))
    }

    async fn is_enabled(&self, element: &ElementRef) -> Result<bool> {
        let path = format!("/element/{}/enabled", element.as_str());
        Ok(self.command(Method::GET, &path, None).await?.as_bool().unwrap_or(false))
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        let path = format!("/element/{}/click", element.as_str());
        self.command(Method::POST, &path, Some(json!({}))).await.map(|_| ())
    }

    async fn script_click(&self, element: &ElementRef) -> Result<()> {
        self.execute(SCRIPT_CLICK, element).await.map(|_| ())
    }

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<()> {
        self.execute(SCROLL_SCRIPT, element).await.map(|_| ())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
        let path = format!("/element/{}/value", element.as_str());
        self.command(Method::POST, &path, Some(json!({ "text": text })))
            .await
            .map(|_| ())
    }

    async fn text(&self, element: &ElementRef) -> Result<String> {
        let path = format!("/element/{}/text", element.as_str());
        let value = self.command(Method::GET, &path, None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn quit(&self) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/session/{}", self.base_url, self.session_id))
            .send()
            .await
            .map_err(Error::http)?;
        tracing::debug!(status = %response.status(), "WebDriver session deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn session(server: &MockServer) -> WebDriverClient {
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": { "sessionId": "s1", "capabilities": {} }
            })))
            .mount(server)
            .await;
        WebDriverClient::connect(&server.uri(), json!({ "browserName": "chrome" }))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn connect_reads_session_id() {
        let server = MockServer::start().await;
        let client = session(&server).await;
        assert_eq!(client.session_id(), "s1");
    }

    #[tokio::test]
    async fn connect_failure_is_session_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "value": { "error": "session not created", "message": "Chrome failed to start" }
            })))
            .mount(&server)
            .await;

        let err = WebDriverClient::connect(&server.uri(), json!({}))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Session(_)));
        assert!(err.to_string().contains("Chrome failed to start"));
    }

    #[tokio::test]
    async fn find_returns_element_reference() {
        let server = MockServer::start().await;
        let client = session(&server).await;
        Mock::given(method("POST"))
            .and(path("/session/s1/element"))
            .and(body_json(json!({ "using": "xpath", "value": "//button" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": { ELEMENT_KEY: "e-42" }
            })))
            .mount(&server)
            .await;

        let found = client.find(&Locator::xpath("//button")).await.unwrap();
        assert_eq!(found, Some(ElementRef::new("e-42")));
    }

    #[tokio::test]
    async fn no_such_element_maps_to_none() {
        let server = MockServer::start().await;
        let client = session(&server).await;
        Mock::given(method("POST"))
            .and(path("/session/s1/element"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "value": { "error": "no such element", "message": "not found" }
            })))
            .mount(&server)
            .await;

        let found = client.find(&Locator::id("done-button")).await.unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn find_all_keeps_document_order() {
        let server = MockServer::start().await;
        let client = session(&server).await;
        Mock::given(method("POST"))
            .and(path("/session/s1/elements"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [ { ELEMENT_KEY: "title" }, { ELEMENT_KEY: "desc" } ]
            })))
            .mount(&server)
            .await;

        let found = client.find_all(&Locator::css("div#textbox")).await.unwrap();
        assert_eq!(found, vec![ElementRef::new("title"), ElementRef::new("desc")]);
    }

    #[tokio::test]
    async fn dead_session_is_not_alive() {
        let server = MockServer::start().await;
        let client = session(&server).await;
        Mock::given(method("GET"))
            .and(path("/session/s1/url"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "value": { "error": "invalid session id", "message": "session deleted" }
            })))
            .mount(&server)
            .await;

        assert!(!client.is_alive().await);
    }

    #[tokio::test]
    async fn clickable_requires_displayed_and_enabled() {
        let server = MockServer::start().await;
        let client = session(&server).await;
        Mock::given(method("GET"))
            .and(path("/session/s1/element/e1/displayed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": true })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/session/s1/element/e1/enabled"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": false })))
            .mount(&server)
            .await;

        assert!(!client.is_clickable(&ElementRef::new("e1")).await.unwrap());
    }
}
