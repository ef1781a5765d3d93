// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reactive chat message store for the Ripple client.
//!
//! [`ChatStore`] exposes the message collection and connection status as a
//! `tokio::sync::watch` snapshot ([`StoreState`]) and implements sending
//! (streamed or not), cancellation, session loading and feedback on top of
//! the [`ripple_core::ChatTransport`] and [`ripple_core::SessionProvider`]
//! collaborators.

pub mod state;
pub mod store;

pub use state::{MessageUpdate, StoreState};
pub use store::{ChatStore, SendOutcome};
