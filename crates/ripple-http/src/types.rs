// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON envelope used by every non-streaming backend endpoint.

use ripple_core::RippleError;
use serde::{Deserialize, Serialize};

/// Status code the backend puts in `code` on success.
pub const CODE_OK: i64 = 200;

/// `{code, message?, data}` wrapper around every JSON response.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Returns `data` when `code` is 200, an API error otherwise.
    pub fn into_data(self) -> Result<Option<T>, RippleError> {
        if self.code != CODE_OK {
            return Err(RippleError::Api {
                code: self.code,
                message: self
                    .message
                    .unwrap_or_else(|| "request failed".to_string()),
            });
        }
        Ok(self.data)
    }
}

/// `data` of `POST /chat`.
#[derive(Debug, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub content: String,
}

/// Body of `POST /sessions`.
#[derive(Debug, Serialize)]
pub struct CreateSessionRequest<'a> {
    pub title: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_200_code_is_api_error() {
        let env: Envelope<ChatReply> =
            serde_json::from_str(r#"{"code":500,"message":"agent offline"}"#).unwrap();
        match env.into_data() {
            Err(RippleError::Api { code, message }) => {
                assert_eq!(code, 500);
                assert_eq!(message, "agent offline");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn null_data_is_none() {
        let env: Envelope<Vec<u8>> = serde_json::from_str(r#"{"code":200,"data":null}"#).unwrap();
        assert!(env.into_data().unwrap().is_none());
    }
}
