//! Webhook gateway for the voice translation bot.
//!
//! Receives WhatsApp webhook events, keeps per-sender language preferences,
//! and runs voice notes through transcription, translation and speech
//! synthesis before replying with audio.

pub mod commands;
pub mod pipeline;
pub mod server;
pub mod state;
pub mod webhook;

#[cfg(test)]
mod testing;

pub use server::{build_router, start_gateway};
pub use state::GatewayState;
