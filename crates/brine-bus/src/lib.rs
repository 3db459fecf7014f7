//! Brine Bus
//!
//! Four independent FIFO channels carrying timestamped envelopes between the
//! scheduler, the units and the supervisor:
//!
//! - `data`: input payloads
//! - `results`: unit outputs
//! - `feedback`: feedback requests and evaluations
//! - `status`: run progress
//!
//! Channels are unbounded and in-memory. Ordering holds within a channel,
//! never across channels.

mod bus;
mod envelope;

pub use bus::CommunicationBus;
pub use envelope::{Channel, Envelope, MessageKind};
