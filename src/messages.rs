//! Outbound message templates.
//!
//! Every user-facing body is built here; the pipeline's outbound helpers
//! append [`footer`] to each of them before sending.

use chrono::{DateTime, Utc};

use crate::models::{EligibilityThresholds, GiveawayRequest};

/// Subject line used for every PM the bot sends.
pub const REPLY_SUBJECT: &str = "Giveaway Bot";

/// Inbox subject that marks a PM as a giveaway request.
pub const REQUEST_SUBJECT: &str = "giveaway";

/// Boilerplate appended to every outbound body.
pub fn footer() -> String {
    "  \n  \n-------------------------------------\
     \n Giveaway Bot - automated giveaways\
     \n ^Replies ^to ^this ^account ^are ^not ^monitored."
        .to_string()
}

fn close_time_line(close_time: DateTime<Utc>) -> String {
    close_time.format("%d-%b-%Y %H:%M").to_string()
}

fn requirements_block(thresholds: &EligibilityThresholds, winner_count: usize) -> String {
    format!(
        "  \n*Minimum account requirements:*  \
         \n  \n    {} post karma\
         \n    {} comment karma\
         \n    {} days old  \
         \n  \n*Number of winners to pick: {}*",
        thresholds.min_post_karma,
        thresholds.min_comment_karma,
        thresholds.min_account_age_days,
        winner_count
    )
}

/// Setup instructions sent after a request is accepted.
pub fn setup_instructions(timeout_minutes: u64, identifier: &str) -> String {
    format!(
        "Initial setup requirement:\
         \nCreate a giveaway post and include this code in the title or body:\
         \n**{identifier}**\
         \nA comment will be posted on it announcing the giveaway.\
         \nIf no post is found within {timeout_minutes} minutes the giveaway \
         and codes will be cleared."
    )
}

/// Public announcement comment, varying with the giveaway type.
pub fn announcement(requester: &str, request: &GiveawayRequest) -> String {
    use crate::models::GiveawayKind;
    let when = close_time_line(request.close_time);
    let reqs = requirements_block(&request.thresholds, request.winner_count);
    match &request.kind {
        GiveawayKind::Random => format!(
            "A **random** giveaway has been started in this post by **/u/{requester}**!  \
             \n  \n* To participate **reply to the OP** (*not this comment!*)\
             \n* Code(s) will be sent by PM.  \
             \n  \nWinner selection will be around: *{when} UTC*  \n{reqs}  \
             \n  \n*^Upvote ^for ^visibility, ^this ^comment ^will ^be ^edited ^with ^the ^results.*"
        ),
        GiveawayKind::Number { min, max, .. } => format!(
            "A **number guess** giveaway has been started in this post by **/u/{requester}**!  \
             \n  \n* To participate **reply to the OP** with a number (*not this comment!*)\
             \n* The number must be **between {min} and {max}**\
             \n* *Only the first number in your comment counts, and only one comment is checked!*\
             \n* *Comments are processed in order by date, oldest first*\
             \n* Code(s) will be sent by PM.  \
             \n  \nWinner selection will be around: *{when} UTC*  \n{reqs}  \
             \n  \n*^Upvote ^for ^visibility, ^this ^comment ^will ^be ^edited ^with ^the ^results.*  \
             \n  \n*^Check ^the ^comment ^below ^to ^see ^what ^numbers ^have ^already ^been ^used.*"
        ),
        GiveawayKind::Keyword { .. } => format!(
            "A **keyword guess** giveaway has been started for this post by **/u/{requester}**!  \
             \n  \n To participate **reply to the OP** with a keyword guess (*not this comment!*)  \
             \n  \n* Check the OP for clues on what the keyword(s) might be!\
             \n* *Overly long comments will be ignored!*\
             \n* *Comments are processed in order by date, oldest first*\
             \n* Code(s) will be sent by PM.  \
             \n  \nWinner selection will be around: *{when} UTC*  \n{reqs}  \
             \n  \n*^Upvote ^for ^visibility, ^this ^comment ^will ^be ^edited ^with ^the ^results.*"
        ),
    }
}

/// Placeholder body for the numbers-tracker comment under a number
/// announcement, before the first refresh tick fills it in.
pub fn tracker_placeholder(interval_minutes: u64) -> String {
    format!(
        "Numbers already posted will be added here.  \
         \n ^This ^comment ^updates ^every ^{interval_minutes} ^minutes."
    )
}

/// Refreshed tracker body linking the paste of used numbers.
pub fn tracker_update(paste_url: &str, interval_minutes: u64) -> String {
    format!(
        "[List of numbers already posted]({paste_url})  \
         \n ^This ^comment ^updates ^every ^{interval_minutes} ^minutes.  \
         \n ^Link ^might ^be ^down ^temporarily ^during ^update."
    )
}

/// Edited-in results body listing the winners (one pre-formatted line each).
pub fn results(winner_lines: &str) -> String {
    format!(
        "The giveaway has ended!\
         \n Winner(s):\
         \n {winner_lines}\
         \n Check your inbox for your goodies!"
    )
}

/// Results reply used for mention-triggered giveaways (no codes to claim).
pub fn results_mention(winner_lines: &str) -> String {
    format!(
        "The giveaway has ended!\
         \n Winner(s):\
         \n {winner_lines}\
         \n Congrats!"
    )
}

/// PM to a single winner with their assigned codes.
pub fn winner_notification(requester: &str, post_title: &str, post_url: &str, codes: &str) -> String {
    format!(
        "Congratulations! You've won a giveaway from /u/{requester}!\
         \n Giveaway post: [{post_title}]({post_url})\
         \n Your code(s): \
         \n  \n    {codes}"
    )
}

/// Summary PM to the requester listing every winner and their codes.
pub fn requester_summary(winner_list: &str, post_title: &str, post_url: &str) -> String {
    format!(
        "Your giveaway has ended!\
         \n Winner(s):\
         \n {winner_list}\
         \n Giveaway post: [{post_title}]({post_url})"
    )
}

// ---------------- submission-time error replies

pub fn parse_error_reply() -> String {
    "**Giveaway not started:**\
     \n Something went wrong while parsing your message, \
     please double check the formatting and try again."
        .to_string()
}

pub fn codes_error_reply() -> String {
    "**Giveaway not started:**\
     \n Something went wrong while parsing the codes, \
     please double check the formatting and try again."
        .to_string()
}

pub fn insufficient_codes_reply(winner_count: usize, code_count: usize) -> String {
    format!(
        "**Giveaway not started:**\
         \n There aren't enough codes for each possible winner:\
         \n  Possible winners: {winner_count}\
         \n  Codes detected: {code_count}\
         \n Please double check your input and try again."
    )
}

pub fn mention_error_reply(detail: &str) -> String {
    format!("This doesn't look like anything to me...  \n {detail}")
}

pub fn mention_not_top_level_reply() -> String {
    "User mention must be a top level comment.".to_string()
}

pub fn mention_not_op_reply() -> String {
    "Only the OP can run a giveaway in this post.  \
     \n ^Your ^username ^does ^not ^match ^OP."
        .to_string()
}

// ---------------- pipeline-stage error replies

pub fn timeout_reply(identifier: &str, timeout_minutes: u64) -> String {
    format!(
        "Giveaway **{identifier}** has been cleared:\
         \n No post containing the code was found within {timeout_minutes} minutes.\
         \n Send a new request to start over."
    )
}

pub fn scheduling_failed_reply(identifier: &str) -> String {
    format!(
        "Failed to schedule giveaway **{identifier}**:  \
         \n  \n* The bot was unable to create a comment in the giveaway post.  "
    )
}

pub fn no_comments_reply(post_title: &str, post_url: &str) -> String {
    format!(
        "Giveaway **ERROR:**\
         \n Could not find any comments with the matching requirements.\
         \n Giveaway has been cleared and no codes were sent out!\
         \n Giveaway post: [{post_title}]({post_url})"
    )
}

pub fn no_comments_comment() -> String {
    "**Did not find a winner for this giveaway.**\
     \n Could not find any comments with the matching requirements!\
     \n Giveaway has been cleared and no codes were sent out!\
     \n PM has been sent to OP."
        .to_string()
}

pub fn not_enough_winners_reply(post_title: &str, post_url: &str) -> String {
    format!(
        "Giveaway **ERROR:**\
         \n Could not find **enough** winners vs codes for this giveaway.\
         \n Giveaway has been cleared and no codes were sent out!\
         \n Giveaway post: [{post_title}]({post_url})"
    )
}

pub fn not_enough_winners_comment() -> String {
    "**Did not find enough winners for this giveaway.**\
     \n Giveaway has been cleared and no codes were sent out!\
     \n PM has been sent to OP."
        .to_string()
}

pub fn invalid_accounts_reply(post_title: &str, post_url: &str) -> String {
    format!(
        "Giveaway **ERROR:**\
         \n Could not find enough winners with valid accounts.\
         \n Giveaway has been cleared and no codes were sent out!\
         \n Giveaway post: [{post_title}]({post_url})"
    )
}

pub fn invalid_accounts_comment(thresholds: &EligibilityThresholds) -> String {
    format!(
        "**Did not find enough winners with valid accounts for this giveaway.**\
         \n Account requirements: post karma: {}, comment karma: {}, days old: {}\
         \n Giveaway has been cleared and no codes were sent out!\
         \n PM has been sent to OP.",
        thresholds.min_post_karma, thresholds.min_comment_karma, thresholds.min_account_age_days
    )
}

pub fn api_error_reply(post_title: &str, post_url: &str) -> String {
    format!(
        "Giveaway **ERROR:**\
         \n There was a major error during the attempt to process the giveaway.\
         \n Something went wrong with the platform or bot API.\
         \n Giveaway has been cleared and no codes were sent out!\
         \n Giveaway post: [{post_title}]({post_url})"
    )
}
