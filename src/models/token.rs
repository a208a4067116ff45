use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

pub type TokenId = i64;

/// One monitored trading pair as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    #[serde(alias = "pairName")]
    pub pair_name: String,
    #[serde(alias = "pairAddress")]
    pub pair_address: String,
    #[serde(alias = "createdAt", deserialize_with = "flexible_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(alias = "updatedAt", deserialize_with = "flexible_timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, alias = "launchFdv", deserialize_with = "flexible_f64")]
    pub launch_fdv: f64,
    #[serde(default, alias = "currentFdv", deserialize_with = "flexible_f64")]
    pub current_fdv: f64,
    #[serde(default, alias = "launchLiquidity", deserialize_with = "flexible_f64")]
    pub launch_liquidity: f64,
    #[serde(default, alias = "currentLiquidity", deserialize_with = "flexible_f64")]
    pub current_liquidity: f64,
    #[serde(default, alias = "twitterUrl")]
    pub twitter_url: Option<String>,
    #[serde(default, alias = "telegramUrl")]
    pub telegram_url: Option<String>,
    #[serde(default, alias = "websiteUrl")]
    pub website_url: Option<String>,
    #[serde(default, alias = "dexscreenerUrl")]
    pub dexscreener_url: Option<String>,
}

impl Token {
    pub fn fdv_improved(&self) -> bool {
        self.current_fdv > self.launch_fdv
    }

    pub fn liquidity_improved(&self) -> bool {
        self.current_liquidity > self.launch_liquidity
    }
}

/// Returns the first id that occurs twice in a snapshot, if any.
pub fn find_duplicate_id(tokens: &[Token]) -> Option<TokenId> {
    let mut ids = HashSet::with_capacity(tokens.len());
    tokens.iter().map(|t| t.id).find(|id| !ids.insert(*id))
}

// Epoch values above this are taken as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Int(i64),
    Float(f64),
    Text(String),
}

fn flexible_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Int(n) => from_epoch(n)
            .ok_or_else(|| D::Error::custom(format!("epoch out of range: {}", n))),
        RawTimestamp::Float(f) => epoch_from_float(f)
            .and_then(from_epoch)
            .ok_or_else(|| D::Error::custom(format!("epoch out of range: {}", f))),
        RawTimestamp::Text(s) => parse_timestamp(&s)
            .ok_or_else(|| D::Error::custom(format!("unrecognised timestamp: {}", s))),
    }
}

// `as` saturates, so anything outside i64 is rejected before the cast.
fn epoch_from_float(f: f64) -> Option<i64> {
    (f.is_finite() && f.abs() < i64::MAX as f64).then(|| f as i64)
}

fn from_epoch(n: i64) -> Option<DateTime<Utc>> {
    if n.unsigned_abs() >= EPOCH_MILLIS_THRESHOLD as u64 {
        Utc.timestamp_millis_opt(n).single()
    } else {
        Utc.timestamp_opt(n, 0).single()
    }
}

/// Parses RFC 3339, naive ISO-8601 (taken as UTC) or an epoch number in text.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    raw.parse::<i64>().ok().and_then(from_epoch)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
}

fn flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<RawNumber>::deserialize(deserializer)? {
        None => Ok(0.0),
        Some(RawNumber::Number(n)) => Ok(n),
        Some(RawNumber::Text(s)) if s.trim().is_empty() => Ok(0.0),
        Some(RawNumber::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| D::Error::custom(format!("not a number: {}", s))),
    }
}

#[cfg(test)]
pub(crate) fn sample(id: TokenId, created_at: &str) -> Token {
    let ts = parse_timestamp(created_at).expect("valid test timestamp");
    Token {
        id,
        pair_name: format!("PAIR{}/WETH", id),
        pair_address: format!("0xpair{:04}", id),
        created_at: ts,
        updated_at: ts,
        launch_fdv: 100_000.0,
        current_fdv: 100_000.0,
        launch_liquidity: 20_000.0,
        current_liquidity: 20_000.0,
        twitter_url: None,
        telegram_url: None,
        website_url: None,
        dexscreener_url: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_snake_case_payload() {
        let token: Token = serde_json::from_value(json!({
            "id": 7,
            "pair_name": "PEPE/WETH",
            "pair_address": "0xabc",
            "created_at": "2024-05-01T12:00:00Z",
            "updated_at": "2024-05-01T12:30:00+02:00",
            "launch_fdv": 120000.5,
            "current_fdv": "250000",
            "launch_liquidity": 30000,
            "current_liquidity": null,
            "twitter_url": "https://x.com/pepe",
            "dexscreener_url": "https://dexscreener.com/ethereum/0xabc"
        }))
        .unwrap();

        assert_eq!(token.id, 7);
        assert_eq!(token.pair_address, "0xabc");
        assert_eq!(token.current_fdv, 250_000.0);
        assert_eq!(token.current_liquidity, 0.0);
        assert_eq!(token.updated_at.to_rfc3339(), "2024-05-01T10:30:00+00:00");
        assert!(token.telegram_url.is_none());
        assert!(token.fdv_improved());
        assert!(!token.liquidity_improved());
    }

    #[test]
    fn decodes_camel_case_and_epoch_timestamps() {
        let token: Token = serde_json::from_value(json!({
            "id": 1,
            "pairName": "DOG/SOL",
            "pairAddress": "So1ana",
            "createdAt": 1714564800,
            "updatedAt": 1714564800123i64
        }))
        .unwrap();

        assert_eq!(token.created_at.timestamp(), 1_714_564_800);
        assert_eq!(token.updated_at.timestamp_millis(), 1_714_564_800_123);
        assert_eq!(token.launch_fdv, 0.0);
    }

    #[test]
    fn naive_timestamps_are_utc() {
        let ts = parse_timestamp("2024-05-01T12:00:00.250").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-05-01T12:00:00.250+00:00");
        let spaced = parse_timestamp("2024-05-01 12:00:00").unwrap();
        assert_eq!(spaced.timestamp(), 1_714_564_800);
    }

    #[test]
    fn rejects_garbage_timestamp() {
        let result = serde_json::from_value::<Token>(json!({
            "id": 1,
            "pair_name": "X",
            "pair_address": "0x1",
            "created_at": "yesterday",
            "updated_at": "2024-05-01T12:00:00Z"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn extreme_epoch_values_are_errors() {
        let payload = |created_at: serde_json::Value| {
            serde_json::from_value::<Token>(json!({
                "id": 1,
                "pair_name": "X",
                "pair_address": "0x1",
                "created_at": created_at,
                "updated_at": "2024-05-01T12:00:00Z"
            }))
        };

        assert!(payload(json!(-1e19)).is_err());
        assert!(payload(json!(1e300)).is_err());
        assert!(payload(json!(i64::MIN)).is_err());
        assert!(payload(json!("-9223372036854775808")).is_err());
        assert!(parse_timestamp("-9223372036854775808").is_none());
        assert!(serde_json::from_str::<Vec<Token>>(
            r#"[{"id":1,"pair_name":"X","pair_address":"0x1","created_at":-1e19,"updated_at":0}]"#
        )
        .is_err());
    }

    #[test]
    fn finds_duplicate_ids() {
        let tokens = vec![
            sample(1, "2024-05-01T00:00:00Z"),
            sample(2, "2024-05-01T00:00:00Z"),
            sample(1, "2024-05-02T00:00:00Z"),
        ];
        assert_eq!(find_duplicate_id(&tokens), Some(1));
        assert_eq!(find_duplicate_id(&tokens[..2]), None);
    }
}
