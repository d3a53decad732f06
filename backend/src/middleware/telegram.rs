use actix_web::HttpRequest;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Identity claims embedded in a verified Telegram WebApp init-data blob.
/// Other fields of the `user` payload are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub username: Option<String>,
}

/// Extract and verify the caller's identity from the `Authorization` header.
///
/// Clients send the raw WebApp init data as `Authorization: tma <initData>`.
/// The numeric user id is trusted only after the signature check passes.
pub fn extract_user(req: &HttpRequest, bot_token: &str) -> Result<TelegramUser, TelegramAuthError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .ok_or(TelegramAuthError::MissingCredentials)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| TelegramAuthError::MalformedInitData)?;

    let init_data = auth_str
        .strip_prefix("tma ")
        .ok_or(TelegramAuthError::MissingCredentials)?;

    verify_init_data(init_data, bot_token)
}

/// Verify a Telegram WebApp `initData` query string against the bot token.
///
/// Per the WebApp contract: `secret = HMAC_SHA256("WebAppData", bot_token)`,
/// and the `hash` parameter must equal the hex HMAC of the remaining
/// `key=value` pairs sorted and joined with newlines.
pub fn verify_init_data(
    init_data: &str,
    bot_token: &str,
) -> Result<TelegramUser, TelegramAuthError> {
    let pairs = parse_query_pairs(init_data)?;

    let provided_hash = pairs
        .iter()
        .find(|(key, _)| key == "hash")
        .map(|(_, value)| value.clone())
        .ok_or(TelegramAuthError::MalformedInitData)?;

    let mut check_lines: Vec<String> = pairs
        .iter()
        .filter(|(key, _)| key != "hash")
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    check_lines.sort();
    let data_check_string = check_lines.join("\n");

    let mut secret_mac =
        HmacSha256::new_from_slice(b"WebAppData").expect("HMAC accepts any key length");
    secret_mac.update(bot_token.as_bytes());
    let secret = secret_mac.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&secret).expect("HMAC accepts any key length");
    mac.update(data_check_string.as_bytes());
    let calculated_hash = hex::encode(mac.finalize().into_bytes());

    if calculated_hash != provided_hash.to_lowercase() {
        return Err(TelegramAuthError::InvalidSignature);
    }

    let user_json = pairs
        .iter()
        .find(|(key, _)| key == "user")
        .map(|(_, value)| value.as_str())
        .ok_or(TelegramAuthError::MalformedInitData)?;

    let user: TelegramUser =
        serde_json::from_str(user_json).map_err(|_| TelegramAuthError::MalformedInitData)?;

    log::debug!(
        "Verified init data for user {} ({})",
        user.id,
        user.username.as_deref().unwrap_or("-")
    );

    Ok(user)
}

/// Percent-decode an urlencoded query string into key/value pairs,
/// preserving order.
fn parse_query_pairs(raw: &str) -> Result<Vec<(String, String)>, TelegramAuthError> {
    raw.split('&')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (key, value) = part.split_once('=').unwrap_or((part, ""));
            let key = urlencoding::decode(key)
                .map_err(|_| TelegramAuthError::MalformedInitData)?
                .into_owned();
            let value = urlencoding::decode(value)
                .map_err(|_| TelegramAuthError::MalformedInitData)?
                .into_owned();
            Ok((key, value))
        })
        .collect()
}

#[derive(Debug)]
pub enum TelegramAuthError {
    MissingCredentials,
    InvalidSignature,
    MalformedInitData,
}

impl std::fmt::Display for TelegramAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelegramAuthError::MissingCredentials => write!(f, "Missing Telegram credentials"),
            TelegramAuthError::InvalidSignature => write!(f, "Invalid init-data signature"),
            TelegramAuthError::MalformedInitData => write!(f, "Malformed init data"),
        }
    }
}

impl std::error::Error for TelegramAuthError {}

// ---------------------------------------------------------------------------
// hex encoding helper (no extra dep)
// ---------------------------------------------------------------------------

mod hex {
    /// Encode bytes as a lowercase hex string.
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT_TOKEN: &str = "1234567:test-bot-token";

    /// Build an init-data string signed the way Telegram signs it.
    fn signed_init_data(fields: &[(&str, &str)]) -> String {
        let mut lines: Vec<String> = fields
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        lines.sort();
        let data_check_string = lines.join("\n");

        let mut secret_mac = HmacSha256::new_from_slice(b"WebAppData").unwrap();
        secret_mac.update(BOT_TOKEN.as_bytes());
        let secret = secret_mac.finalize().into_bytes();

        let mut mac = HmacSha256::new_from_slice(&secret).unwrap();
        mac.update(data_check_string.as_bytes());
        let hash = hex::encode(mac.finalize().into_bytes());

        let mut encoded: Vec<String> = fields
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect();
        encoded.push(format!("hash={hash}"));
        encoded.join("&")
    }

    #[test]
    fn test_verify_valid_init_data() {
        let init_data = signed_init_data(&[
            ("auth_date", "1700000000"),
            ("query_id", "AAE1"),
            ("user", r#"{"id":42,"first_name":"Ada","username":"ada"}"#),
        ]);

        let user = verify_init_data(&init_data, BOT_TOKEN).unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(user.username.as_deref(), Some("ada"));
    }

    #[test]
    fn test_verify_rejects_tampered_user() {
        let init_data = signed_init_data(&[
            ("auth_date", "1700000000"),
            ("user", r#"{"id":42,"first_name":"Ada"}"#),
        ]);

        // Swap in a different user id without re-signing
        let tampered = init_data.replace("%22id%22%3A42", "%22id%22%3A43");
        assert!(matches!(
            verify_init_data(&tampered, BOT_TOKEN),
            Err(TelegramAuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_verify_rejects_wrong_token() {
        let init_data = signed_init_data(&[
            ("auth_date", "1700000000"),
            ("user", r#"{"id":42}"#),
        ]);

        assert!(matches!(
            verify_init_data(&init_data, "other-token"),
            Err(TelegramAuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_verify_requires_hash() {
        assert!(matches!(
            verify_init_data("user=%7B%22id%22%3A42%7D", BOT_TOKEN),
            Err(TelegramAuthError::MalformedInitData)
        ));
    }

    #[test]
    fn test_parse_query_pairs_decodes_values() {
        let pairs = parse_query_pairs("a=1&user=%7B%22id%22%3A7%7D").unwrap();
        assert_eq!(pairs[0], ("a".to_string(), "1".to_string()));
        assert_eq!(pairs[1].1, r#"{"id":7}"#);
    }

    #[test]
    fn test_auth_error_display() {
        assert_eq!(
            TelegramAuthError::MissingCredentials.to_string(),
            "Missing Telegram credentials"
        );
        assert_eq!(
            TelegramAuthError::InvalidSignature.to_string(),
            "Invalid init-data signature"
        );
    }
}
