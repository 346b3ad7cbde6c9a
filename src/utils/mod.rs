//! Common utilities and helper functions
//!
//! Small pure helpers shared across parsing, selection and logging.

use regex::Regex;
use std::sync::OnceLock;

/// Extract the first contiguous digit run in `text` as an integer.
///
/// A run too long to fit in `i64` is treated as no number at all.
pub fn first_digit_run(text: &str) -> Option<i64> {
    static DIGIT_RUN: OnceLock<Regex> = OnceLock::new();
    let re = DIGIT_RUN.get_or_init(|| Regex::new(r"\d+").expect("Invalid regex pattern"));

    re.find(text).and_then(|m| m.as_str().parse::<i64>().ok())
}

/// Mask half of each code's alphanumeric characters for log lines.
///
/// Dashes are not counted toward the masked half, so `ABCD-1234` logs as
/// `****-1234`. Multiple whitespace-separated codes are masked one by one.
pub fn obfuscate_code(codes: &str) -> String {
    codes
        .split_whitespace()
        .map(obfuscate_single)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Mask a list of codes, joined by spaces, for log lines.
pub fn obfuscate_codes(codes: &[String]) -> String {
    codes
        .iter()
        .map(|c| obfuscate_code(c))
        .collect::<Vec<_>>()
        .join(" ")
}

fn obfuscate_single(code: &str) -> String {
    let significant = code.chars().filter(|c| *c != '-').count();
    let mut to_mask = significant / 2;
    code.chars()
        .map(|c| {
            if to_mask > 0 && c.is_alphanumeric() {
                to_mask -= 1;
                '*'
            } else {
                c
            }
        })
        .collect()
}
