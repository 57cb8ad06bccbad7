//! Identity predicates shared by the chat engine and the guess resolver.
//!
//! The system distinguishes "this conversation partner is the AI" from
//! ordinary players purely by the shape of the identity string: real players
//! carry email-shaped identities, the respondent carries a reserved marker
//! that never parses as an email.

use crate::types::AI_IDENTITY;

/// Replace the characters that make an email unusable as a key/path segment.
pub fn sanitize_identity(identity: &str) -> String {
    identity.replace(['@', '.'], "-")
}

/// Symmetric conversation address for a two-party thread: both identities
/// lowercased, sorted, joined. `chat_key(a, b) == chat_key(b, a)` always.
pub fn chat_key(a: &str, b: &str) -> String {
    let mut pair = [a.to_lowercase(), b.to_lowercase()];
    pair.sort();
    pair.join("-")
}

/// Loose syntactic email check: one `@`, a non-empty local part, and a domain
/// with a dot that isn't leading or trailing.
pub fn looks_like_email(candidate: &str) -> bool {
    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// The predicate the game hangs on: not an email, and carrying the marker
/// token case-insensitively.
pub fn is_ai_identity(candidate: &str) -> bool {
    !looks_like_email(candidate) && candidate.to_lowercase().contains(AI_IDENTITY)
}
