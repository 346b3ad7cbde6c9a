//! Free-text request parsing.
//!
//! Turns the body of a giveaway PM (or @mention reply) into a structured
//! [`crate::models::GiveawayRequest`] plus a raw codes payload, and the raw
//! payload into a checked code list. Both steps are pure; all remote work
//! happens elsewhere.

pub mod codes;
pub mod request;

pub use codes::{parse_codes, CodeFormatError};
pub use request::{parse_request, ParseError, ParsedRequest};
