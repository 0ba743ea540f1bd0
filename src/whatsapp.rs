use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::config::Config;

#[derive(Debug, Serialize)]
struct TextContent<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct OutboundText<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextContent<'a>,
}

#[derive(Debug, Serialize)]
struct OutboundInteractive<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    interactive: Interactive,
}

#[derive(Debug, Serialize)]
struct Interactive {
    #[serde(rename = "type")]
    kind: &'static str,
    body: InteractiveBody,
    action: InteractiveAction,
}

#[derive(Debug, Serialize)]
struct InteractiveBody {
    text: &'static str,
}

#[derive(Debug, Serialize)]
struct InteractiveAction {
    buttons: Vec<Button>,
}

#[derive(Debug, Serialize)]
struct Button {
    #[serde(rename = "type")]
    kind: &'static str,
    reply: ButtonReply,
}

#[derive(Debug, Serialize)]
struct ButtonReply {
    id: &'static str,
    title: &'static str,
}

impl Button {
    fn reply(id: &'static str, title: &'static str) -> Self {
        Self {
            kind: "reply",
            reply: ButtonReply { id, title },
        }
    }
}

/// Client for the Cloud API messages endpoint. Fire-and-forget from the
/// caller's perspective: one POST per send, no retries. A non-success
/// response becomes an `Err` that callers may choose to ignore.
#[derive(Clone)]
pub struct WhatsAppClient {
    http: reqwest::Client,
    url: String,
    access_token: String,
}

impl WhatsAppClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            url: config.messages_url(),
            access_token: config.access_token.clone(),
        }
    }

    /// Send a plain text message.
    pub async fn send_text(&self, to: &str, body: &str) -> Result<()> {
        let payload = OutboundText {
            messaging_product: "whatsapp",
            to,
            kind: "text",
            text: TextContent { body },
        };
        self.post(&payload).await
    }

    /// Send the three-option button menu.
    pub async fn send_menu(&self, to: &str) -> Result<()> {
        let payload = OutboundInteractive {
            messaging_product: "whatsapp",
            to,
            kind: "interactive",
            interactive: Interactive {
                kind: "button",
                body: InteractiveBody {
                    text: "📋 Choose an option:",
                },
                action: InteractiveAction {
                    buttons: vec![
                        Button::reply("speedtest", "🚀 Speedtest"),
                        Button::reply("ping", "📡 Ping"),
                        Button::reply("menu", "📜 Menu"),
                    ],
                },
            },
        };
        self.post(&payload).await
    }

    async fn post(&self, payload: &impl Serialize) -> Result<()> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.access_token)
            .json(payload)
            .send()
            .await
            .context("Failed to reach the messaging API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Messaging API error ({}): {}", status, body);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server_uri: &str) -> Config {
        Config {
            access_token: "token-123".to_string(),
            phone_number_id: "42".to_string(),
            verify_token: "my_verify_token".to_string(),
            port: 5000,
            graph_api_base: server_uri.to_string(),
            speedtest_servers: vec![],
        }
    }

    #[tokio::test]
    async fn test_send_text_posts_bearer_and_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/42/messages"))
            .and(header("authorization", "Bearer token-123"))
            .and(body_json(json!({
                "messaging_product": "whatsapp",
                "to": "111",
                "type": "text",
                "text": { "body": "hello" }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = WhatsAppClient::new(reqwest::Client::new(), &test_config(&server.uri()));
        client.send_text("111", "hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_send_menu_carries_three_buttons() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/42/messages"))
            .and(body_json(json!({
                "messaging_product": "whatsapp",
                "to": "111",
                "type": "interactive",
                "interactive": {
                    "type": "button",
                    "body": { "text": "📋 Choose an option:" },
                    "action": {
                        "buttons": [
                            { "type": "reply", "reply": { "id": "speedtest", "title": "🚀 Speedtest" } },
                            { "type": "reply", "reply": { "id": "ping", "title": "📡 Ping" } },
                            { "type": "reply", "reply": { "id": "menu", "title": "📜 Menu" } }
                        ]
                    }
                }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = WhatsAppClient::new(reqwest::Client::new(), &test_config(&server.uri()));
        client.send_menu("111").await.unwrap();
    }

    #[tokio::test]
    async fn test_non_success_response_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream broke"))
            .mount(&server)
            .await;

        let client = WhatsAppClient::new(reqwest::Client::new(), &test_config(&server.uri()));
        let err = client.send_text("111", "hello").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("500"), "error should carry the status: {}", msg);
        assert!(msg.contains("upstream broke"), "error should carry the body: {}", msg);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let config = test_config("http://127.0.0.1:1");
        let client = WhatsAppClient::new(reqwest::Client::new(), &config);
        assert!(client.send_text("111", "hello").await.is_err());
    }
}
