use serde::Deserialize;

/// Top-level webhook event. The platform owns this schema; we only read
/// the fields we recognize, and every one of them may be absent or null.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookEvent {
    pub entry: Option<Vec<Entry>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Entry {
    pub changes: Option<Vec<Change>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Change {
    pub value: Option<ChangeValue>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    pub messages: Option<Vec<InboundMessage>>,
}

/// One inbound message. Carries a sender plus either a text body or an
/// interactive button reply (status-update events carry neither).
#[derive(Debug, Default, Deserialize)]
pub struct InboundMessage {
    pub from: Option<String>,
    pub text: Option<TextBody>,
    pub interactive: Option<Interactive>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TextBody {
    pub body: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Interactive {
    pub button_reply: Option<ButtonReply>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ButtonReply {
    pub id: Option<String>,
}

impl WebhookEvent {
    /// Parse a raw request body. Anything that is not a recognizable
    /// event payload degrades to an event with no messages.
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// All messages across every entry and change, in payload order.
    pub fn messages(&self) -> impl Iterator<Item = &InboundMessage> {
        self.entry
            .iter()
            .flatten()
            .flat_map(|entry| entry.changes.iter().flatten())
            .flat_map(|change| change.value.iter())
            .flat_map(|value| value.messages.iter().flatten())
    }
}
