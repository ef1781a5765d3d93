// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Line-framed Server-Sent-Event decoder.
//!
//! [`SseDecoder`] is a [`tokio_util::codec::Decoder`] over raw body bytes.
//! Lines are split on `\n` bytes, so a multi-byte UTF-8 character split
//! across chunks is only decoded once its line is complete. Each `data:`
//! line yields one [`SseRecord`] tagged with the event type in effect;
//! payloads that are not valid JSON are dropped.

use std::io;

use bytes::BytesMut;
use ripple_config::ProtocolVariant;
use serde_json::Value;
use tokio_util::codec::Decoder;
use tracing::debug;

/// One decoded `(event type, payload)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SseRecord {
    pub event: String,
    pub data: Value,
}

/// Stateful SSE line decoder.
#[derive(Debug, Clone)]
pub struct SseDecoder {
    current_event: String,
    default_event: String,
}

impl SseDecoder {
    /// Creates a decoder whose event type resets to `default_event` on blank lines.
    pub fn new(default_event: impl Into<String>) -> Self {
        let default_event = default_event.into();
        Self {
            current_event: default_event.clone(),
            default_event,
        }
    }

    /// Decoder with the blank-line reset value of the given protocol variant.
    pub fn for_variant(variant: ProtocolVariant) -> Self {
        match variant {
            ProtocolVariant::Legacy => Self::new("message"),
            ProtocolVariant::Rich | ProtocolVariant::Auto => Self::new(""),
        }
    }

    /// The event type that the next `data:` line will carry.
    pub fn current_event(&self) -> &str {
        &self.current_event
    }

    fn process_line(&mut self, raw: &[u8]) -> Option<SseRecord> {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(raw);

        if line.trim().is_empty() {
            self.current_event.clone_from(&self.default_event);
            return None;
        }

        if let Some(event) = line.strip_prefix("event:") {
            self.current_event = event.trim().to_string();
            return None;
        }

        if let Some(payload) = line.strip_prefix("data:") {
            return match serde_json::from_str::<Value>(payload.trim_start()) {
                Ok(data) => Some(SseRecord {
                    event: self.current_event.clone(),
                    data,
                }),
                Err(e) => {
                    debug!(event = %self.current_event, error = %e, "dropping unparseable data line");
                    None
                }
            };
        }

        // Comments (`:`), `id:` and `retry:` lines carry nothing we use.
        None
    }
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new("")
    }
}

impl Decoder for SseDecoder {
    type Item = SseRecord;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<SseRecord>, io::Error> {
        while let Some(newline) = src.iter().position(|b| *b == b'\n') {
            let line = src.split_to(newline + 1);
            if let Some(record) = self.process_line(&line[..newline]) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<SseRecord>, io::Error> {
        if let Some(record) = self.decode(src)? {
            return Ok(Some(record));
        }
        if src.is_empty() {
            return Ok(None);
        }
        // Final line without a terminating newline.
        let line = src.split();
        Ok(self.process_line(&line))
    }
}

/// Feeds `chunk` into `buf` and drains every complete record.
pub fn decode_chunk(
    decoder: &mut SseDecoder,
    buf: &mut BytesMut,
    chunk: &[u8],
) -> Vec<SseRecord> {
    buf.extend_from_slice(chunk);
    let mut records = Vec::new();
    while let Ok(Some(record)) = decoder.decode(buf) {
        records.push(record);
    }
    records
}

/// Drains whatever is left in `buf` once the body has ended.
pub fn decode_remaining(decoder: &mut SseDecoder, buf: &mut BytesMut) -> Vec<SseRecord> {
    let mut records = Vec::new();
    while let Ok(Some(record)) = decoder.decode_eof(buf) {
        records.push(record);
    }
    records
}
