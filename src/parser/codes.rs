//! Reward-code payload parsing.
//!
//! The raw payload left over by [`super::parse_request`] becomes an ordered
//! code list. Quoted segments are atomic prize names and may contain spaces;
//! otherwise bracket groups collapse into one compound code each and the rest
//! splits on whitespace, every atomic segment restricted to `[A-Za-z0-9-]`.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Failures resolving the raw codes payload into a code list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeFormatError {
    /// An atomic code segment contains characters outside `[A-Za-z0-9-]`.
    #[error("code contains invalid characters (only A-Z, a-z, 0-9 and - allowed)")]
    BadCharset,

    /// Fewer codes than winners requested.
    #[error("not enough codes: {provided} provided for {required} winners")]
    InsufficientCodes { required: usize, provided: usize },
}

fn quoted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""(.+?)""#).expect("Invalid regex pattern"))
}

fn bracket_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(.+?)\]").expect("Invalid regex pattern"))
}

fn charset_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("Invalid regex pattern"))
}

/// Parse the raw codes payload into an ordered code list.
pub fn parse_codes(raw: &str) -> Result<Vec<String>, CodeFormatError> {
    // Quoted segments are prize names: atomic, spaces allowed, no charset
    // check. Their presence switches the whole payload into prize mode.
    if raw.contains('"') {
        let prizes: Vec<String> = quoted_re()
            .captures_iter(raw)
            .map(|c| c[1].trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        return Ok(prizes);
    }

    let mut codes = Vec::new();

    let remainder = bracket_re().replace_all(raw, "");
    for token in remainder.split_whitespace() {
        if !charset_re().is_match(token) {
            return Err(CodeFormatError::BadCharset);
        }
        codes.push(token.to_string());
    }

    // Each bracket group is one compound code: every segment checked, then
    // joined with commas so the winner receives them as a single payload.
    for group in bracket_re().captures_iter(raw) {
        let segments: Vec<&str> = group[1].split_whitespace().collect();
        for segment in &segments {
            let segment = segment.trim_matches(',');
            if !segment.is_empty() && !charset_re().is_match(segment) {
                return Err(CodeFormatError::BadCharset);
            }
        }
        let compound = segments
            .iter()
            .map(|s| s.trim_matches(','))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        codes.push(compound);
    }

    Ok(codes)
}

/// Enforce the `codes.len() >= winner_count` invariant before any job is
/// scheduled.
pub fn check_code_count(codes: &[String], winner_count: usize) -> Result<(), CodeFormatError> {
    if codes.len() < winner_count {
        return Err(CodeFormatError::InsufficientCodes {
            required: winner_count,
            provided: codes.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_individual_codes() {
        let codes = parse_codes("CODE1 CODE2 CODE3").unwrap();
        assert_eq!(codes, vec!["CODE1", "CODE2", "CODE3"]);
    }

    #[test]
    fn test_dashed_codes() {
        let codes = parse_codes("ABC-123 DEF-456").unwrap();
        assert_eq!(codes, vec!["ABC-123", "DEF-456"]);
    }

    #[test]
    fn test_bad_charset_rejected() {
        assert_eq!(parse_codes("GOOD-1 bad_code"), Err(CodeFormatError::BadCharset));
        assert_eq!(parse_codes("CODE!"), Err(CodeFormatError::BadCharset));
    }

    #[test]
    fn test_bracket_group_becomes_compound_code() {
        let codes = parse_codes("SOLO-1 [AAA BBB CCC]").unwrap();
        assert_eq!(codes, vec!["SOLO-1", "AAA, BBB, CCC"]);
    }

    #[test]
    fn test_bracket_group_with_commas() {
        let codes = parse_codes("[AAA, BBB]").unwrap();
        assert_eq!(codes, vec!["AAA, BBB"]);
    }

    #[test]
    fn test_bad_charset_inside_group_rejected() {
        assert_eq!(parse_codes("[AAA B@D]"), Err(CodeFormatError::BadCharset));
    }

    #[test]
    fn test_quoted_prizes_allow_spaces() {
        let codes = parse_codes(r#""a shiny prize" "another one""#).unwrap();
        assert_eq!(codes, vec!["a shiny prize", "another one"]);
    }

    #[test]
    fn test_quoted_prizes_skip_charset_check() {
        let codes = parse_codes(r#""50% off coupon!""#).unwrap();
        assert_eq!(codes, vec!["50% off coupon!"]);
    }

    #[test]
    fn test_individual_codes_precede_compound() {
        let codes = parse_codes("[GROUP ONE] SOLO-1").unwrap();
        assert_eq!(codes, vec!["SOLO-1", "GROUP, ONE"]);
    }

    #[test]
    fn test_empty_payload_yields_no_codes() {
        assert_eq!(parse_codes("").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_check_code_count() {
        let codes = vec!["A-1".to_string(), "B-2".to_string()];
        assert!(check_code_count(&codes, 2).is_ok());
        assert_eq!(
            check_code_count(&codes, 3),
            Err(CodeFormatError::InsufficientCodes {
                required: 3,
                provided: 2
            })
        );
    }
}
