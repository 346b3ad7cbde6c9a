use anyhow::Result;
use chrono::Utc;

use windfall::config::Config;
use windfall::parser::codes::check_code_count;
use windfall::parser::{parse_codes, parse_request};

/// Dry-run a request body through the same validation the inbox uses and
/// print what the bot would do with it.
pub fn check(config: &Config, body: &str) -> Result<()> {
    let parsed = match parse_request(body, &config.platform.bot_username, Utc::now()) {
        Ok(parsed) => parsed,
        Err(e) => {
            println!("Request rejected: {e}");
            return Ok(());
        }
    };

    let request = &parsed.request;
    println!("Request accepted");
    println!("  Type:         {}", request.kind);
    println!("  Closes:       {} UTC", request.close_time.format("%Y-%m-%d %H:%M"));
    println!("  Winners:      {}", request.winner_count);
    if request.thresholds.is_active() {
        println!(
            "  Thresholds:   post karma > {}, comment karma > {}, age > {} days",
            request.thresholds.min_post_karma,
            request.thresholds.min_comment_karma,
            request.thresholds.min_account_age_days
        );
    }

    match parse_codes(&parsed.raw_codes) {
        Ok(codes) => {
            println!("  Codes:        {}", codes.len());
            for code in &codes {
                println!("    {code}");
            }
            if let Err(e) = check_code_count(&codes, request.winner_count) {
                println!("Codes rejected: {e}");
            }
        }
        Err(e) => println!("Codes rejected: {e}"),
    }
    Ok(())
}
