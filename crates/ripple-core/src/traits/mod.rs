// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! The store talks to the backend only through these traits, so the HTTP
//! implementation and the scripted test doubles are interchangeable.

pub mod session;
pub mod transport;

pub use session::SessionProvider;
pub use transport::{ByteStream, ChatTransport};
