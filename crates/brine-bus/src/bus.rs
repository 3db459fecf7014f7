use tokio::sync::{Mutex, mpsc};
use tracing::trace;

use crate::envelope::{Channel, Envelope, MessageKind};

/// Receiver name used for feedback requests.
const SUPERVISOR: &str = "supervisor";

struct Lane {
  sender: mpsc::UnboundedSender<Envelope>,
  receiver: Mutex<mpsc::UnboundedReceiver<Envelope>>,
}

impl Lane {
  fn new() -> Self {
    let (sender, receiver) = mpsc::unbounded_channel();
    Self {
      sender,
      receiver: Mutex::new(receiver),
    }
  }
}

/// The run's message substrate.
///
/// Sending never blocks. Receivers are serialized per channel, so two
/// consumers of the same channel see disjoint messages.
pub struct CommunicationBus {
  data: Lane,
  results: Lane,
  feedback: Lane,
  status: Lane,
}

impl CommunicationBus {
  pub fn new() -> Self {
    Self {
      data: Lane::new(),
      results: Lane::new(),
      feedback: Lane::new(),
      status: Lane::new(),
    }
  }

  fn lane(&self, channel: Channel) -> &Lane {
    match channel {
      Channel::Data => &self.data,
      Channel::Results => &self.results,
      Channel::Feedback => &self.feedback,
      Channel::Status => &self.status,
    }
  }

  /// Wrap `content` in a timestamped envelope and enqueue it.
  pub fn send(
    &self,
    channel: Channel,
    sender: &str,
    receiver: &str,
    kind: MessageKind,
    content: serde_json::Value,
  ) {
    self.publish(channel, Envelope::new(sender, receiver, kind, content));
  }

  pub fn publish(&self, channel: Channel, envelope: Envelope) {
    trace!(
      channel = %channel,
      sender = %envelope.sender,
      receiver = %envelope.receiver,
      "bus_message_sent"
    );
    // The bus owns both halves, so the receiver cannot be gone.
    let _ = self.lane(channel).sender.send(envelope);
  }

  /// Ask the supervisor to evaluate a unit's results.
  pub fn request_feedback(&self, unit: &str, results: serde_json::Value) {
    self.send(
      Channel::Feedback,
      unit,
      SUPERVISOR,
      MessageKind::FeedbackRequest,
      results,
    );
  }

  /// Wait for the next envelope on `channel`.
  ///
  /// Returns `None` only if the channel is closed, which cannot happen while
  /// the bus is alive.
  pub async fn receive(&self, channel: Channel) -> Option<Envelope> {
    self.lane(channel).receiver.lock().await.recv().await
  }

  /// Next envelope if one is queued and no other consumer holds the channel.
  pub fn try_receive(&self, channel: Channel) -> Option<Envelope> {
    let mut receiver = self.lane(channel).receiver.try_lock().ok()?;
    receiver.try_recv().ok()
  }

  /// Everything currently queued on `channel`, oldest first.
  pub async fn drain(&self, channel: Channel) -> Vec<Envelope> {
    let mut receiver = self.lane(channel).receiver.lock().await;
    let mut drained = Vec::new();
    while let Ok(envelope) = receiver.try_recv() {
      drained.push(envelope);
    }
    drained
  }
}

impl Default for CommunicationBus {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Debug for CommunicationBus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CommunicationBus").finish_non_exhaustive()
  }
}
