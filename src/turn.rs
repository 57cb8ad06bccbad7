//! Turn and quota derivation for a single two-party conversation.
//!
//! Nothing here is stored: whose turn it is and how many messages the seeker
//! has left are recomputed from scratch on every call, from the ordered
//! message log alone. Clients must never trust locally cached turn state
//! across a reconnect; they re-derive from the authoritative log, and so does
//! the server when it validates a send.

use crate::identity::is_ai_identity;
use crate::types::ChatMessage;

/// Derived state of one conversation between the seeker and one other party.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Conversation empty or the other party just spoke: seeker's move
    WaitingForSeeker,
    /// Seeker just spoke to a human: other party's move
    WaitingForOther,
    /// Last message was addressed to the AI; the turn is held by the system
    /// until the reply lands as a new message from the AI identity
    WaitingForAiReply,
    /// It would be the seeker's move, but their message budget is spent
    QuotaExhausted,
}

/// Messages the seeker may still send into this conversation. Never negative.
pub fn quota_remaining(conversation: &[ChatMessage], seeker: &str, quota: usize) -> usize {
    let used = conversation.iter().filter(|m| m.from == seeker).count();
    quota.saturating_sub(used)
}

/// Recompute the conversation's turn state from the ordered message log.
///
/// `conversation` must contain exactly the messages sharing one chat key, in
/// send order; `seeker` is the room's current seeker identity.
pub fn derive_turn_state(conversation: &[ChatMessage], seeker: &str, quota: usize) -> TurnState {
    let Some(last) = conversation.last() else {
        // Seeker moves first
        return TurnState::WaitingForSeeker;
    };

    if is_ai_identity(&last.to) {
        return TurnState::WaitingForAiReply;
    }

    if last.from == seeker {
        return TurnState::WaitingForOther;
    }

    // Turn passes back to the seeker, unless their budget is spent
    if quota_remaining(conversation, seeker, quota) == 0 {
        TurnState::QuotaExhausted
    } else {
        TurnState::WaitingForSeeker
    }
}

/// Whether `sender` may append to this conversation right now. The sender is
/// one of the two human-visible parties; the AI's reply path bypasses this
/// check because it *is* the held turn being released.
pub fn may_send(conversation: &[ChatMessage], seeker: &str, sender: &str, quota: usize) -> bool {
    match derive_turn_state(conversation, seeker, quota) {
        TurnState::WaitingForSeeker => sender == seeker,
        TurnState::WaitingForOther => sender != seeker,
        TurnState::WaitingForAiReply | TurnState::QuotaExhausted => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::chat_key;

    const SEEKER: &str = "alice@example.com";
    const HIDER: &str = "bob@example.com";
    const QUOTA: usize = 5;

    fn msg(from: &str, to: &str, seq: u64) -> ChatMessage {
        ChatMessage {
            id: format!("m{seq}"),
            room_code: "ABCDE".to_string(),
            from: from.to_string(),
            to: to.to_string(),
            message: "hey".to_string(),
            chat_key: chat_key(from, to),
            seq,
            timestamp: String::new(),
        }
    }

    #[test]
    fn test_seeker_moves_first() {
        assert_eq!(
            derive_turn_state(&[], SEEKER, QUOTA),
            TurnState::WaitingForSeeker
        );
        assert!(may_send(&[], SEEKER, SEEKER, QUOTA));
        assert!(!may_send(&[], SEEKER, HIDER, QUOTA));
    }

    #[test]
    fn test_turns_alternate_strictly() {
        let mut log = vec![msg(SEEKER, HIDER, 1)];
        assert_eq!(
            derive_turn_state(&log, SEEKER, QUOTA),
            TurnState::WaitingForOther
        );
        assert!(may_send(&log, SEEKER, HIDER, QUOTA));
        assert!(!may_send(&log, SEEKER, SEEKER, QUOTA));

        log.push(msg(HIDER, SEEKER, 2));
        assert_eq!(
            derive_turn_state(&log, SEEKER, QUOTA),
            TurnState::WaitingForSeeker
        );
        assert!(may_send(&log, SEEKER, SEEKER, QUOTA));
        assert!(!may_send(&log, SEEKER, HIDER, QUOTA));
    }

    #[test]
    fn test_message_to_ai_freezes_both_humans() {
        let log = vec![msg(SEEKER, "chatgpt", 1)];
        assert_eq!(
            derive_turn_state(&log, SEEKER, QUOTA),
            TurnState::WaitingForAiReply
        );
        assert!(!may_send(&log, SEEKER, SEEKER, QUOTA));
        assert!(!may_send(&log, SEEKER, "chatgpt", QUOTA));
    }

    #[test]
    fn test_ai_reply_returns_turn_to_seeker() {
        let log = vec![msg(SEEKER, "chatgpt", 1), msg("ChatGPT", SEEKER, 2)];
        assert_eq!(
            derive_turn_state(&log, SEEKER, QUOTA),
            TurnState::WaitingForSeeker
        );
    }

    #[test]
    fn test_quota_decrements_only_on_seeker_messages() {
        let mut log = Vec::new();
        assert_eq!(quota_remaining(&log, SEEKER, QUOTA), 5);

        log.push(msg(SEEKER, HIDER, 1));
        assert_eq!(quota_remaining(&log, SEEKER, QUOTA), 4);

        log.push(msg(HIDER, SEEKER, 2));
        assert_eq!(quota_remaining(&log, SEEKER, QUOTA), 4);
    }

    #[test]
    fn test_quota_never_negative() {
        let log: Vec<ChatMessage> = (0..7).map(|i| msg(SEEKER, HIDER, i)).collect();
        assert_eq!(quota_remaining(&log, SEEKER, QUOTA), 0);
    }

    #[test]
    fn test_exhausted_quota_blocks_seeker_regardless_of_turn() {
        // Five exchanges: seeker spends the whole budget
        let mut log = Vec::new();
        for i in 0..5 {
            log.push(msg(SEEKER, HIDER, i * 2));
            log.push(msg(HIDER, SEEKER, i * 2 + 1));
        }
        assert_eq!(quota_remaining(&log, SEEKER, QUOTA), 0);
        assert_eq!(
            derive_turn_state(&log, SEEKER, QUOTA),
            TurnState::QuotaExhausted
        );
        assert!(!may_send(&log, SEEKER, SEEKER, QUOTA));
        // The hider already replied; with the seeker out of budget the
        // conversation is simply done
        assert!(!may_send(&log, SEEKER, HIDER, QUOTA));
    }

    #[test]
    fn test_last_seeker_message_still_gets_a_reply() {
        // Seeker spends the budget with their 5th send; the hider may answer
        let mut log = Vec::new();
        for i in 0..4 {
            log.push(msg(SEEKER, HIDER, i * 2));
            log.push(msg(HIDER, SEEKER, i * 2 + 1));
        }
        log.push(msg(SEEKER, HIDER, 9));
        assert_eq!(
            derive_turn_state(&log, SEEKER, QUOTA),
            TurnState::WaitingForOther
        );
        assert!(may_send(&log, SEEKER, HIDER, QUOTA));
    }
}
