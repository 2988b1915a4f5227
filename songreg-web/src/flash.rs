//! One-shot flash messages carried across redirects in a signed cookie
//!
//! Cookie value: `base64url(json) "." sha256-hex`, where the signature covers
//! the canonical JSON of the message list and the service secret. Cookies that
//! fail to decode or verify are discarded silently.

use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Redirect, Response};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use songreg_common::signing::{calculate_signature, verify_signature};
use tracing::{debug, warn};

pub const FLASH_COOKIE: &str = "songreg_flash";

/// Browsers cap a cookie at about 4 KiB
const MAX_COOKIE_VALUE_LEN: usize = 3800;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

impl FlashLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Info => "info",
            FlashLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

impl FlashMessage {
    pub fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Encode messages into a signed cookie value
pub fn encode(messages: &[FlashMessage], secret: &str) -> String {
    let value = serde_json::to_value(messages).unwrap_or_default();
    let signature = calculate_signature(&value, secret);
    format!("{}.{}", URL_SAFE_NO_PAD.encode(value.to_string()), signature)
}

/// Decode and verify a cookie value
pub fn decode(raw: &str, secret: &str) -> Option<Vec<FlashMessage>> {
    let (payload, signature) = raw.rsplit_once('.')?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;

    if let Err(e) = verify_signature(signature, &value, secret) {
        warn!("Discarding flash cookie: {}", e);
        return None;
    }

    serde_json::from_value(value).ok()
}

/// Pending flash messages from the request's `Cookie` headers
pub fn read_from_headers(headers: &HeaderMap, secret: &str) -> Vec<FlashMessage> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(name, _)| *name == FLASH_COOKIE)
        .filter_map(|(_, value)| decode(value, secret))
        .flatten()
        .collect()
}

/// `Set-Cookie` value storing `messages`
///
/// Oldest messages are dropped until the cookie fits the browser size limit.
pub fn set_cookie(messages: &[FlashMessage], secret: &str) -> HeaderValue {
    let mut start = 0;
    loop {
        let value = encode(&messages[start..], secret);
        if value.len() <= MAX_COOKIE_VALUE_LEN || start == messages.len() {
            let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", FLASH_COOKIE, value);
            // base64url, '.' and hex digits are all valid header bytes
            return HeaderValue::from_str(&cookie).unwrap_or_else(|_| clear_cookie());
        }
        debug!("Flash cookie too large, dropping oldest message");
        start += 1;
    }
}

/// `Set-Cookie` value deleting the flash cookie
pub fn clear_cookie() -> HeaderValue {
    HeaderValue::from_static("songreg_flash=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// 303 redirect to `location` carrying `messages` for the next page render
pub fn redirect_with(messages: &[FlashMessage], location: &str, secret: &str) -> Response {
    let cookie = if messages.is_empty() {
        clear_cookie()
    } else {
        set_cookie(messages, secret)
    };
    ([(header::SET_COOKIE, cookie)], Redirect::to(location)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages() -> Vec<FlashMessage> {
        vec![
            FlashMessage::new(FlashLevel::Success, "Song registered successfully!"),
            FlashMessage::new(FlashLevel::Info, "BaaS Task ID: 9 - \"quoted\" <b>"),
        ]
    }

    #[test]
    fn test_decode_reads_back_signed_messages() {
        let raw = encode(&messages(), "secret");
        assert_eq!(decode(&raw, "secret"), Some(messages()));
    }

    #[test]
    fn test_decode_rejects_wrong_secret() {
        let raw = encode(&messages(), "secret");
        assert_eq!(decode(&raw, "another"), None);
    }

    #[test]
    fn test_decode_rejects_tampered_payload() {
        let raw = encode(&messages(), "secret");
        let (_, signature) = raw.rsplit_once('.').unwrap();
        let forged = serde_json::json!([{"level": "success", "message": "forged"}]);
        let tampered = format!("{}.{}", URL_SAFE_NO_PAD.encode(forged.to_string()), signature);
        assert_eq!(decode(&tampered, "secret"), None);
        assert_eq!(decode("garbage", "secret"), None);
    }

    #[test]
    fn test_read_from_cookie_header() {
        let raw = encode(&messages(), "secret");
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}={}", FLASH_COOKIE, raw)).unwrap(),
        );

        assert_eq!(read_from_headers(&headers, "secret"), messages());
        assert!(read_from_headers(&HeaderMap::new(), "secret").is_empty());
    }

    #[test]
    fn test_oversized_flash_drops_oldest() {
        let big: Vec<FlashMessage> = (0..10)
            .map(|i| FlashMessage::new(FlashLevel::Error, format!("{}{}", i, "x".repeat(600))))
            .collect();

        let cookie = set_cookie(&big, "secret");
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.len() < 4096);

        let value = cookie
            .strip_prefix("songreg_flash=")
            .and_then(|rest| rest.split(';').next())
            .unwrap();
        let kept = decode(value, "secret").unwrap();
        assert!(!kept.is_empty());
        assert_eq!(kept.last(), big.last());
    }
}
