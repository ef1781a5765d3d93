// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Ripple.
//!
//! - [`MockTransport`] replays scripted stream attempts and JSON replies
//! - [`MockSessions`] keeps the session selection in memory
//! - [`sse`] builds backend-shaped SSE frames

pub mod mock_sessions;
pub mod mock_transport;
pub mod sse;

pub use mock_sessions::MockSessions;
pub use mock_transport::{Attempt, MockTransport};
