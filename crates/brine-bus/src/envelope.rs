use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
  Data,
  Results,
  Feedback,
  Status,
}

impl Channel {
  pub const ALL: [Channel; 4] = [
    Channel::Data,
    Channel::Results,
    Channel::Feedback,
    Channel::Status,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Channel::Data => "data",
      Channel::Results => "results",
      Channel::Feedback => "feedback",
      Channel::Status => "status",
    }
  }
}

impl std::fmt::Display for Channel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
  Data,
  Result,
  FeedbackRequest,
  Feedback,
  Status,
}

/// One message on a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
  pub sender: String,
  pub receiver: String,
  #[serde(rename = "type")]
  pub kind: MessageKind,
  pub content: serde_json::Value,
  pub timestamp: DateTime<Utc>,
}

impl Envelope {
  pub fn new(
    sender: impl Into<String>,
    receiver: impl Into<String>,
    kind: MessageKind,
    content: serde_json::Value,
  ) -> Self {
    Self {
      sender: sender.into(),
      receiver: receiver.into(),
      kind,
      content,
      timestamp: Utc::now(),
    }
  }
}
