// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP implementations of the Ripple collaborator traits.

pub mod client;
pub mod sessions;
pub mod types;

pub use client::{HttpTransport, classify};
pub use sessions::HttpSessions;
