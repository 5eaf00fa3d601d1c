//! Outbound events for the transport layer

pub mod publisher;

pub use publisher::{ChannelEventPublisher, EventPublisher, MockEventPublisher};
