//! Inbound event and outbound reply types.

use serde::{Deserialize, Serialize};

/// How the channel delivered an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Free text typed by the user.
    Text,
    /// A button press; the payload is the token attached to the button.
    Postback,
}

/// An event received from the messaging channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    /// Channel-supplied identity of the sender.
    pub sender_id: String,

    /// Display name of the sender, when the channel provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,

    /// Whether the payload is typed text or a button token.
    pub kind: EventKind,

    /// Message text or postback token.
    pub payload: String,
}

impl InboundEvent {
    /// Create a text event.
    pub fn text(sender_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            sender_name: None,
            kind: EventKind::Text,
            payload: payload.into(),
        }
    }

    /// Create a postback event.
    pub fn postback(sender_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            sender_name: None,
            kind: EventKind::Postback,
            payload: payload.into(),
        }
    }

    /// Attach the sender's display name.
    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }
}

/// Postback tokens attached to the buttons the bot sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Postback {
    /// Menu: start a purchase.
    Buy,
    /// Menu: look up an existing order.
    Search,
    /// Menu: cancel an existing order.
    Cancel,
    /// Add another item.
    Yes,
    /// Finish adding items.
    No,
}

impl Postback {
    /// The token sent to and received from the channel.
    pub fn as_str(&self) -> &'static str {
        match self {
            Postback::Buy => "Buy",
            Postback::Search => "Search",
            Postback::Cancel => "Cancel",
            Postback::Yes => "Yes",
            Postback::No => "No",
        }
    }

    /// Parse a token received from the channel.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "Buy" => Some(Postback::Buy),
            "Search" => Some(Postback::Search),
            "Cancel" => Some(Postback::Cancel),
            "Yes" => Some(Postback::Yes),
            "No" => Some(Postback::No),
            _ => None,
        }
    }
}

/// A button in a button-list prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    /// Text shown on the button.
    pub label: String,
    /// Token delivered back as the next postback.
    pub payload: String,
}

impl Button {
    /// Create a button that sends the given postback.
    pub fn new(label: impl Into<String>, postback: Postback) -> Self {
        Self {
            label: label.into(),
            payload: postback.as_str().to_string(),
        }
    }
}

/// A reply sent back to the messaging channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    /// Plain text.
    Text { recipient: String, text: String },
    /// Text followed by a list of buttons.
    Buttons {
        recipient: String,
        text: String,
        buttons: Vec<Button>,
    },
}

impl Reply {
    /// Create a plain text reply.
    pub fn text(recipient: impl Into<String>, text: impl Into<String>) -> Self {
        Reply::Text {
            recipient: recipient.into(),
            text: text.into(),
        }
    }

    /// Create a button-list prompt.
    pub fn prompt(
        recipient: impl Into<String>,
        text: impl Into<String>,
        buttons: Vec<Button>,
    ) -> Self {
        Reply::Buttons {
            recipient: recipient.into(),
            text: text.into(),
            buttons,
        }
    }

    /// The user this reply is addressed to.
    pub fn recipient(&self) -> &str {
        match self {
            Reply::Text { recipient, .. } | Reply::Buttons { recipient, .. } => recipient,
        }
    }

    /// The text of the reply.
    pub fn body(&self) -> &str {
        match self {
            Reply::Text { text, .. } | Reply::Buttons { text, .. } => text,
        }
    }

    /// Buttons offered with the reply (empty for plain text).
    pub fn buttons(&self) -> &[Button] {
        match self {
            Reply::Text { .. } => &[],
            Reply::Buttons { buttons, .. } => buttons,
        }
    }

    /// Whether the reply offers a button for the given postback.
    pub fn offers(&self, postback: Postback) -> bool {
        self.buttons().iter().any(|b| b.payload == postback.as_str())
    }
}
