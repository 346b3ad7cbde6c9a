//! Request and code parsing, exercised the way the inbox sees them.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use windfall::models::GiveawayKind;
use windfall::parser::codes::check_code_count;
use windfall::parser::{parse_codes, parse_request, CodeFormatError, ParseError};

const BOT: &str = "windfall-bot";

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

#[test]
fn full_number_request_flows_into_codes() {
    let body = "number:500:1:1000, 31/12/2030 18:00, 3, pkarma:50, AAA-1 BBB-2 [CCC-3 DDD-4]";
    let parsed = parse_request(body, BOT, now()).unwrap();

    assert_eq!(
        parsed.request.kind,
        GiveawayKind::Number {
            guess: 500,
            min: 1,
            max: 1000
        }
    );
    assert_eq!(parsed.request.winner_count, 3);
    assert_eq!(parsed.request.thresholds.min_post_karma, 50);
    assert_eq!(
        parsed.request.close_time,
        Utc.with_ymd_and_hms(2030, 12, 31, 18, 0, 0).unwrap()
    );

    let codes = parse_codes(&parsed.raw_codes).unwrap();
    assert_eq!(codes, vec!["AAA-1", "BBB-2", "CCC-3, DDD-4"]);
    assert!(check_code_count(&codes, parsed.request.winner_count).is_ok());
}

#[test]
fn prize_mode_request_accepts_spaces_in_names() {
    let body = r#"random, 31/12/2030, 2, "a mystery box" "another mystery box""#;
    let parsed = parse_request(body, BOT, now()).unwrap();
    let codes = parse_codes(&parsed.raw_codes).unwrap();
    assert_eq!(codes, vec!["a mystery box", "another mystery box"]);
}

#[test]
fn random_request_with_month_first_date() {
    let body = "random, 12/31/2030 23:59, 3, pkarma:10, CODE1 CODE2 CODE3";
    let parsed = parse_request(body, BOT, now()).unwrap();

    assert_eq!(parsed.request.kind, GiveawayKind::Random);
    assert_eq!(parsed.request.winner_count, 3);
    assert_eq!(parsed.request.thresholds.min_post_karma, 10);
    assert_eq!(
        parsed.request.close_time,
        Utc.with_ymd_and_hms(2030, 12, 31, 23, 59, 0).unwrap()
    );
    let codes = parse_codes(&parsed.raw_codes).unwrap();
    assert_eq!(codes, vec!["CODE1", "CODE2", "CODE3"]);
}

#[test]
fn number_request_with_month_first_date() {
    let body = "number:50:1:100, 12/31/2030 23:59, ABC-123";
    let parsed = parse_request(body, BOT, now()).unwrap();

    assert_eq!(
        parsed.request.kind,
        GiveawayKind::Number {
            guess: 50,
            min: 1,
            max: 100
        }
    );
    let codes = parse_codes(&parsed.raw_codes).unwrap();
    assert_eq!(codes, vec!["ABC-123"]);
}

#[test]
fn mention_request_closes_immediately() {
    let body = "/u/windfall-bot keyword:banana, 2";
    let parsed = parse_request(body, BOT, now()).unwrap();
    assert!(parsed.request.is_mention);
    assert_eq!(parsed.request.close_time, now());
    assert_eq!(parsed.request.winner_count, 2);
}

#[test]
fn ambiguous_slash_date_reads_day_first() {
    let parsed = parse_request("random, 03/04/2030, C-1", BOT, now()).unwrap();
    assert_eq!(
        parsed.request.close_time,
        Utc.with_ymd_and_hms(2030, 4, 3, 0, 0, 0).unwrap()
    );
}

#[test]
fn close_time_equal_to_now_is_rejected() {
    let body = "random, 01/06/2025 12:00, C-1";
    assert_eq!(
        parse_request(body, BOT, now()).unwrap_err(),
        ParseError::InvalidDate
    );
}

proptest! {
    #[test]
    fn any_dash_alnum_tokens_parse_as_individual_codes(
        tokens in proptest::collection::vec("[A-Za-z0-9-]{1,12}", 1..8)
    ) {
        let raw = tokens.join(" ");
        let codes = parse_codes(&raw).unwrap();
        prop_assert_eq!(codes, tokens);
    }

    #[test]
    fn winner_count_token_round_trips(count in 1usize..500) {
        let body = format!("random, 31/12/2030, {count}, CODE-1");
        let parsed = parse_request(&body, BOT, now()).unwrap();
        prop_assert_eq!(parsed.request.winner_count, count);
    }

    #[test]
    fn code_count_check_matches_lengths(
        codes in proptest::collection::vec("[A-Z]{4}", 0..10),
        winners in 1usize..10
    ) {
        let result = check_code_count(&codes, winners);
        if codes.len() >= winners {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(
                result.unwrap_err(),
                CodeFormatError::InsufficientCodes {
                    required: winners,
                    provided: codes.len()
                }
            );
        }
    }
}
