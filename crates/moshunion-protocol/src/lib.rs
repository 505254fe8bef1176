//! `moshunion-protocol`: JSON text frames exchanged over the realtime
//! transports (WebSocket, SSE).
//!
//! Every frame carries a `type` discriminator. Clients send
//! [`frames::ClientFrame`]s; the server answers and pushes
//! [`frames::ServerFrame`]s.

pub mod frames;
pub mod hello;
