//! Init-data signature verification.
//!
//! The web client forwards one opaque string issued by the chat platform: a
//! URL-query-string encoded set of `key=value` pairs carrying a `user` claim
//! and an HMAC-SHA256 `hash` over the remaining fields. Verification never
//! trusts the client.
//!
//! # Invariants
//! - The check-string is built from bytewise-sorted keys joined by `\n`.
//! - The signing key is `HMAC-SHA256(key = "WebAppData", message = bot token)`.
//! - Hash comparison is constant time (`Mac::verify_slice`).

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

type HmacSha256 = Hmac<Sha256>;

/// Verified identity claim extracted from the `user` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebAppUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Why init-data verification failed.
///
/// Callers at the HTTP boundary must collapse every variant into one opaque
/// 401; the distinction exists for server-side logging only.
#[derive(Debug)]
pub enum InitDataError {
    /// Payload is not a well-formed query string.
    MalformedQuery(String),
    /// No `hash` field present.
    MissingHash,
    /// `hash` is present but the recomputed signature does not match.
    SignatureMismatch,
    /// No `user` field present in a correctly signed payload.
    MissingUser,
    /// `user` field is present but not valid JSON for an identity claim.
    MalformedUser(String),
}

impl Display for InitDataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedQuery(detail) => write!(f, "malformed init data: {detail}"),
            Self::MissingHash => write!(f, "init data has no hash field"),
            Self::SignatureMismatch => write!(f, "init data signature mismatch"),
            Self::MissingUser => write!(f, "init data has no user field"),
            Self::MalformedUser(detail) => write!(f, "malformed user claim: {detail}"),
        }
    }
}

impl Error for InitDataError {}

/// Verifies an init-data payload against the bot token and returns the
/// asserted identity.
///
/// # Contract
/// - Accepts iff the recomputed HMAC-SHA256 over the sorted check-string
///   equals the received `hash`.
/// - Any single-character mutation of any field value causes rejection.
pub fn verify_init_data(init_data: &str, bot_token: &str) -> Result<WebAppUser, InitDataError> {
    let mut fields = parse_query_pairs(init_data)?;

    let received_hash = fields.remove("hash").ok_or(InitDataError::MissingHash)?;
    let received_hash =
        hex::decode(received_hash.as_bytes()).map_err(|_| InitDataError::SignatureMismatch)?;

    let check_string = fields
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n");

    // secret = HMAC-SHA256(key = "WebAppData", message = bot token bytes)
    let mut secret = HmacSha256::new_from_slice(b"WebAppData")
        .expect("HMAC accepts keys of any length");
    secret.update(bot_token.as_bytes());
    let secret = secret.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&secret)
        .expect("HMAC accepts keys of any length");
    mac.update(check_string.as_bytes());
    mac.verify_slice(&received_hash)
        .map_err(|_| InitDataError::SignatureMismatch)?;

    let user_json = fields.get("user").ok_or(InitDataError::MissingUser)?;
    let user: WebAppUser = serde_json::from_str(user_json)
        .map_err(|err| InitDataError::MalformedUser(err.to_string()))?;

    Ok(user)
}

/// Parses `key=value&key=value` with percent decoding into a key-sorted map.
///
/// A later duplicate key overwrites an earlier one; the chat platform never
/// issues duplicates, so any ordering choice here is equivalent.
fn parse_query_pairs(query: &str) -> Result<BTreeMap<String, String>, InitDataError> {
    let mut fields = BTreeMap::new();

    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = urlencoding::decode(raw_key)
            .map_err(|_| InitDataError::MalformedQuery(format!("undecodable key `{raw_key}`")))?;
        let value = urlencoding::decode(raw_value).map_err(|_| {
            InitDataError::MalformedQuery(format!("undecodable value for key `{key}`"))
        })?;
        fields.insert(key.into_owned(), value.into_owned());
    }

    if fields.is_empty() {
        return Err(InitDataError::MalformedQuery("empty payload".to_string()));
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::{parse_query_pairs, InitDataError};

    #[test]
    fn pairs_are_decoded_and_key_sorted() {
        let fields =
            parse_query_pairs("b=2&a=1&user=%7B%22id%22%3A42%7D").expect("should parse");
        let keys: Vec<_> = fields.keys().cloned().collect();
        assert_eq!(keys, ["a", "b", "user"]);
        assert_eq!(fields["user"], r#"{"id":42}"#);
    }

    #[test]
    fn empty_payload_is_malformed() {
        assert!(matches!(
            parse_query_pairs(""),
            Err(InitDataError::MalformedQuery(_))
        ));
    }

    #[test]
    fn value_free_pair_maps_to_empty_string() {
        let fields = parse_query_pairs("flag&a=1").expect("should parse");
        assert_eq!(fields["flag"], "");
    }
}
