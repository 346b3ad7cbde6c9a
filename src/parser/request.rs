//! Grammar for the free-text giveaway request.
//!
//! Comma-separated tokens, trimmed. Token 0 carries the giveaway type
//! (`random`, `number:guess:min:max`, `keyword:word`), token 1 the close
//! time (skipped in mention mode), then any mix of a winner count and
//! `pkarma:N` / `ckarma:N` / `days:N` thresholds. Everything after the
//! first unrecognized token, plus bracket-delimited groups anywhere in the
//! original content, is the raw codes payload.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use crate::models::{EligibilityThresholds, GiveawayKind, GiveawayRequest};

/// Failures resolving a request body into a [`GiveawayRequest`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Token 0 names no known giveaway type and is not a future date either.
    #[error("no giveaway type detected")]
    NoType,

    /// The close-time token failed to parse or lies in the past.
    #[error("invalid or past close date")]
    InvalidDate,

    /// A number giveaway's `type:guess:min:max` form is malformed.
    #[error("invalid number range")]
    InvalidRange,

    /// A keyword giveaway carries no keyword.
    #[error("missing keyword")]
    MissingKeyword,

    /// A threshold token (`pkarma:`, `ckarma:`, `days:`) or winner count is
    /// malformed.
    #[error("invalid threshold value")]
    InvalidThreshold,
}

/// A parsed request plus the leftover raw codes payload, which goes through
/// [`super::parse_codes`] separately.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    pub request: GiveawayRequest,
    pub raw_codes: String,
}

fn bracket_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(.+?)\]").expect("Invalid regex pattern"))
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-z][a-z]+").expect("Invalid regex pattern"))
}

/// Parse a request body.
///
/// `bot_username` is used to detect the mention marker (`/u/{bot_username}`);
/// `now` anchors the strictly-in-the-future date check and the mention-mode
/// close time.
pub fn parse_request(
    content: &str,
    bot_username: &str,
    now: DateTime<Utc>,
) -> Result<ParsedRequest, ParseError> {
    let marker = format!("/u/{}", bot_username.to_lowercase());
    let mut is_mention = false;
    let mut text = content.to_string();
    if let Some(pos) = text.to_lowercase().find(&marker) {
        text.replace_range(pos..pos + marker.len(), "");
        is_mention = true;
    }

    // Bracket groups survive commas and spaces inside them, so pull them out
    // before tokenizing and re-join them into the codes payload afterwards.
    let bracket_groups: Vec<String> = bracket_re()
        .captures_iter(&text)
        .map(|c| c[1].to_string())
        .collect();
    let text = bracket_re().replace_all(&text, "").into_owned();

    let tokens: Vec<&str> = text.split(',').map(str::trim).collect();
    let first = tokens.first().copied().unwrap_or("").to_lowercase();

    let matched_type = word_re()
        .find(&first)
        .map(|m| m.as_str())
        .filter(|w| matches!(*w, "random" | "number" | "keyword"));

    let (kind, close_time, scan_from) = match matched_type {
        Some(word) => {
            let kind = match word {
                "number" => parse_number_form(&first)?,
                "keyword" => parse_keyword_form(&first)?,
                _ => GiveawayKind::Random,
            };
            if is_mention {
                (kind, now, 1)
            } else {
                let token = tokens.get(1).copied().unwrap_or("");
                let date = parse_close_time(token)
                    .filter(|d| *d > now)
                    .ok_or(ParseError::InvalidDate)?;
                (kind, date, 2)
            }
        }
        // Typeless fallback: a bare future date as token 0 means a random
        // giveaway closing then.
        None => match parse_close_time(&first).filter(|d| *d > now) {
            Some(date) => (GiveawayKind::Random, date, 1),
            None => return Err(ParseError::NoType),
        },
    };

    let mut winner_count = 1usize;
    let mut thresholds = EligibilityThresholds::default();
    let mut codes_start = tokens.len();

    for (i, token) in tokens.iter().enumerate().skip(scan_from) {
        if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
            winner_count = token.parse().map_err(|_| ParseError::InvalidThreshold)?;
            if winner_count == 0 {
                return Err(ParseError::InvalidThreshold);
            }
        } else if let Some(value) = threshold_value(token, "pkarma:")? {
            thresholds.min_post_karma = value;
        } else if let Some(value) = threshold_value(token, "ckarma:")? {
            thresholds.min_comment_karma = value;
        } else if let Some(value) = threshold_value(token, "days:")? {
            thresholds.min_account_age_days = value;
        } else {
            codes_start = i;
            break;
        }
    }

    let mut payload_parts: Vec<String> = tokens[codes_start.min(tokens.len())..]
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect();
    for group in &bracket_groups {
        payload_parts.push(format!("[{group}]"));
    }
    let raw_codes = payload_parts.join(" ");

    Ok(ParsedRequest {
        request: GiveawayRequest {
            kind,
            close_time,
            winner_count,
            is_mention,
            thresholds,
            codes: Vec::new(),
        },
        raw_codes,
    })
}

/// `number:guess:min:max`, all three non-negative integers.
fn parse_number_form(token: &str) -> Result<GiveawayKind, ParseError> {
    let parts: Vec<&str> = token.split(':').map(str::trim).collect();
    if parts.len() < 4 {
        return Err(ParseError::InvalidRange);
    }
    let mut numbers = [0i64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts[1..4]) {
        let value: i64 = part.parse().map_err(|_| ParseError::InvalidRange)?;
        if value < 0 {
            return Err(ParseError::InvalidRange);
        }
        *slot = value;
    }
    Ok(GiveawayKind::Number {
        guess: numbers[0],
        min: numbers[1],
        max: numbers[2],
    })
}

/// `keyword:word`, word non-empty after trimming.
fn parse_keyword_form(token: &str) -> Result<GiveawayKind, ParseError> {
    let word = token
        .split_once(':')
        .map(|(_, w)| w.trim().to_lowercase())
        .unwrap_or_default();
    if word.is_empty() {
        return Err(ParseError::MissingKeyword);
    }
    Ok(GiveawayKind::Keyword { word })
}

/// `prefix` followed by a non-negative integer. `Ok(None)` when the token is
/// not a threshold of this kind at all.
fn threshold_value(token: &str, prefix: &str) -> Result<Option<i64>, ParseError> {
    let lower = token.to_lowercase();
    if !lower.contains(prefix) {
        return Ok(None);
    }
    let value = lower
        .split(':')
        .nth(1)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ParseError::InvalidThreshold)?
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidThreshold)?;
    if value < 0 {
        return Err(ParseError::InvalidThreshold);
    }
    Ok(Some(value))
}

/// Parse a close-time token, trying day-month-year forms first, then
/// month-day-year, then ISO, each with and without a `HH:MM` component
/// (midnight when absent). All times are UTC.
pub fn parse_close_time(token: &str) -> Option<DateTime<Utc>> {
    const DATETIME_FORMATS: &[&str] = &[
        "%d/%m/%Y %H:%M",
        "%d-%m-%Y %H:%M",
        "%d.%m.%Y %H:%M",
        "%m/%d/%Y %H:%M",
        "%Y-%m-%d %H:%M",
    ];
    const DATE_FORMATS: &[&str] = &[
        "%d/%m/%Y",
        "%d-%m-%Y",
        "%d.%m.%Y",
        "%m/%d/%Y",
        "%Y-%m-%d",
    ];

    let token = token.trim();
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(token, format) {
            return Some(dt.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(token, format) {
            return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }
    None
}
