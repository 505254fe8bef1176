//! `moshunion-channels`: transport-agnostic fan-out of venue updates.
//!
//! The [`hub::BroadcastHub`] keeps `tour id → open subscribers` and pushes
//! frames without ever waiting on a slow peer. Transports (WebSocket, SSE,
//! tests) plug in through the [`subscriber::Subscriber`] trait; the
//! [`reconnect`] module is the client-side counterpart that keeps a
//! subscription alive across drops.

pub mod error;
pub mod hub;
pub mod lifecycle;
pub mod reconnect;
pub mod subscriber;

pub use error::ChannelError;
pub use hub::{BroadcastHub, DeliveryReport};
pub use lifecycle::{ConnLifecycle, ConnState};
pub use reconnect::{run_subscription, ReconnectPolicy, SubscriptionTransport};
pub use subscriber::{QueueSubscriber, Subscriber};
