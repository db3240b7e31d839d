//! Range links: `get_<channelIdDigits>_<firstId>_<lastId>` start tokens.
//!
//! Canonical channels have negative ids (`-100…`). The token carries the
//! absolute value and decoding restores the sign, so only addresses with a
//! negative channel and positive message ids survive a round trip.
//! [`RangeAddress::checked`] enforces that for outside input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LinkError;

pub const RANGE_TOKEN_PREFIX: &str = "get_";
pub const SERIES_TOKEN_PREFIX: &str = "series_";
const TELEGRAM_LINK_BASE: &str = "https://t.me";
/// Most messages one range link may carry. Batches are capped to the same size.
pub const MAX_RANGE_MESSAGES: usize = 1000;

/// Inclusive id list from `first` to `last`, in the direction given.
pub fn expand_range(first: i64, last: i64) -> Vec<i64> {
    if first <= last {
        (first..=last).collect()
    } else {
        (last..=first).rev().collect()
    }
}

/// A contiguous message range in one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeAddress {
    pub channel_id: i64,
    pub first_id: i64,
    pub last_id: i64,
}

impl RangeAddress {
    pub fn new(channel_id: i64, first_id: i64, last_id: i64) -> Self {
        Self {
            channel_id,
            first_id,
            last_id,
        }
    }

    /// Like [`RangeAddress::new`], but refuses addresses a token cannot carry.
    pub fn checked(channel_id: i64, first_id: i64, last_id: i64) -> Result<Self, LinkError> {
        let address = Self::new(channel_id, first_id, last_id);
        if channel_id >= 0 {
            return Err(LinkError::invalid(
                &address.encode(),
                "channel id must be negative (-100...)",
            ));
        }
        if first_id <= 0 || last_id <= 0 {
            return Err(LinkError::invalid(
                &address.encode(),
                "message ids must be positive",
            ));
        }
        Ok(address)
    }

    /// A one-message range.
    pub fn single(channel_id: i64, message_id: i64) -> Self {
        Self::new(channel_id, message_id, message_id)
    }

    pub fn ids(&self) -> Vec<i64> {
        expand_range(self.first_id, self.last_id)
    }

    pub fn len(&self) -> usize {
        (self.last_id - self.first_id).unsigned_abs() as usize + 1
    }

    pub fn is_descending(&self) -> bool {
        self.first_id > self.last_id
    }

    pub fn encode(&self) -> String {
        format!(
            "{}{}_{}_{}",
            RANGE_TOKEN_PREFIX,
            self.channel_id.unsigned_abs(),
            self.first_id,
            self.last_id
        )
    }

    pub fn decode(token: &str) -> Result<Self, LinkError> {
        let token = token.trim();
        let body = token
            .strip_prefix(RANGE_TOKEN_PREFIX)
            .ok_or_else(|| LinkError::invalid(token, "missing get_ prefix"))?;

        let segments: Vec<&str> = body.split('_').collect();
        let [channel, first, last] = segments.as_slice() else {
            return Err(LinkError::invalid(
                token,
                format!("expected 3 segments, found {}", segments.len()),
            ));
        };

        let channel = parse_segment(token, "channel id", channel)?;
        let first_id = parse_segment(token, "first id", first)?;
        let last_id = parse_segment(token, "last id", last)?;
        Ok(Self::new(-channel, first_id, last_id))
    }
}

impl fmt::Display for RangeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for RangeAddress {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

/// Positive decimal id without sign or padding tricks.
fn parse_segment(token: &str, what: &str, segment: &str) -> Result<i64, LinkError> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LinkError::invalid(
            token,
            format!("{} '{}' is not numeric", what, segment),
        ));
    }
    match segment.parse::<i64>() {
        Ok(value) if value > 0 => Ok(value),
        Ok(_) => Err(LinkError::invalid(token, format!("{} must be positive", what))),
        Err(_) => Err(LinkError::invalid(token, format!("{} is out of range", what))),
    }
}

/// What a `/start` payload asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPayload {
    /// Plain `/start`.
    Greeting,
    Range(RangeAddress),
    Series(String),
}

impl StartPayload {
    /// Parse a start payload. Accepts a bare token or a full deep link.
    pub fn parse(input: &str) -> Result<Self, LinkError> {
        let token = start_token(input);
        if token.is_empty() {
            return Ok(StartPayload::Greeting);
        }
        if token.starts_with(RANGE_TOKEN_PREFIX) {
            return RangeAddress::decode(token).map(StartPayload::Range);
        }
        match token.strip_prefix(SERIES_TOKEN_PREFIX) {
            Some(id) if !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric()) => {
                Ok(StartPayload::Series(id.to_string()))
            }
            Some(_) => Err(LinkError::invalid(token, "malformed series id")),
            None => Err(LinkError::invalid(token, "unknown link kind")),
        }
    }
}

/// The token part of `https://t.me/bot?start=TOKEN`, or the input itself.
pub fn start_token(input: &str) -> &str {
    let input = input.trim();
    match input.split_once("?start=") {
        Some((_, token)) => token.split('&').next().unwrap_or_default(),
        None => input,
    }
}

/// Builds `t.me` deep links for one bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLinks {
    bot_username: String,
}

impl DeepLinks {
    pub fn new(bot_username: impl Into<String>) -> Self {
        Self {
            bot_username: bot_username.into().trim_start_matches('@').to_string(),
        }
    }

    pub fn range(&self, address: &RangeAddress) -> String {
        self.start(&address.encode())
    }

    pub fn series(&self, series_id: &str) -> String {
        self.start(&format!("{}{}", SERIES_TOKEN_PREFIX, series_id))
    }

    fn start(&self, token: &str) -> String {
        format!("{}/{}?start={}", TELEGRAM_LINK_BASE, self.bot_username, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_range_preserves_direction() {
        assert_eq!(expand_range(3, 6), vec![3, 4, 5, 6]);
        assert_eq!(expand_range(6, 3), vec![6, 5, 4, 3]);
        assert_eq!(expand_range(5, 5), vec![5]);
    }

    #[test]
    fn test_encode_decode() {
        let address = RangeAddress::new(-1003560881754, 120, 148);
        let token = address.encode();
        assert_eq!(token, "get_1003560881754_120_148");
        assert_eq!(RangeAddress::decode(&token).unwrap(), address);
        assert_eq!(token.parse::<RangeAddress>().unwrap(), address);
    }

    #[test]
    fn test_checked_addresses_round_trip() {
        for (channel, first, last) in [(-1, 1, 1), (-100222, 10, 7), (-1003560881754, 5, 900)] {
            let address = RangeAddress::checked(channel, first, last).unwrap();
            assert_eq!(RangeAddress::decode(&address.encode()).unwrap(), address);
        }

        assert!(matches!(
            RangeAddress::checked(100222, 1, 5),
            Err(LinkError::InvalidLink { .. })
        ));
        assert!(RangeAddress::checked(0, 1, 5).is_err());
        assert!(RangeAddress::checked(-100222, 0, 5).is_err());
    }

    #[test]
    fn test_descending_range() {
        let address = RangeAddress::decode("get_100222_10_7").unwrap();
        assert!(address.is_descending());
        assert_eq!(address.ids(), vec![10, 9, 8, 7]);
        assert_eq!(address.len(), 4);
    }

    #[test]
    fn test_decode_rejects_malformed_tokens() {
        for token in [
            "get_1_2",
            "get_1_2_3_4",
            "get_a_2_3",
            "get_1_-2_3",
            "get_1__3",
            "get_1_0_3",
            "get_1_2_99999999999999999999",
            "fetch_1_2_3",
            "",
        ] {
            let err = RangeAddress::decode(token).unwrap_err();
            assert!(
                matches!(err, LinkError::InvalidLink { .. }),
                "{token} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_start_payload() {
        assert_eq!(StartPayload::parse("").unwrap(), StartPayload::Greeting);
        assert_eq!(
            StartPayload::parse("series_ab12cd34").unwrap(),
            StartPayload::Series("ab12cd34".to_string())
        );
        assert_eq!(
            StartPayload::parse("https://t.me/vault_bot?start=get_100999_5_9").unwrap(),
            StartPayload::Range(RangeAddress::new(-100999, 5, 9))
        );
        assert!(StartPayload::parse("series_").is_err());
        assert!(StartPayload::parse("hello").is_err());
    }

    #[test]
    fn test_deep_links() {
        let links = DeepLinks::new("@vault_bot");
        assert_eq!(
            links.range(&RangeAddress::single(-100999, 42)),
            "https://t.me/vault_bot?start=get_100999_42_42"
        );
        assert_eq!(
            links.series("ab12cd34"),
            "https://t.me/vault_bot?start=series_ab12cd34"
        );
    }
}
