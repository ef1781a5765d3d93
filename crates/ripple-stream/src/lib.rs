// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming response reconstruction for the Ripple chat client.
//!
//! Bytes flow through [`SseDecoder`] into [`SseRecord`]s, which the
//! [`Interpreter`] turns into collection [`Effect`]s while accumulating the
//! active reply in an [`AssemblyBuffer`]. [`ReconnectState`] decides whether
//! a failed attempt is retried and how long to wait.

pub mod assembly;
pub mod interpreter;
pub mod reconnect;
pub mod sse;

pub use assembly::AssemblyBuffer;
pub use interpreter::{Effect, Flow, Interpreter, Step};
pub use reconnect::{ReconnectPolicy, ReconnectState, RetryDecision};
pub use sse::{SseDecoder, SseRecord, decode_chunk, decode_remaining};
