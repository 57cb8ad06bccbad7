//! Random selection helpers: seeker choice and round-roster construction.
//!
//! All helpers are generic over the random source so game-level tests can run
//! them against a seeded rng and assert exact outcomes.

use crate::types::{Identity, Player};
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

/// Pick a seeker uniformly from the given players. `None` when empty.
pub fn pick_seeker<R: Rng + ?Sized>(players: &[&Player], rng: &mut R) -> Option<Identity> {
    players.choose(rng).map(|p| p.email.clone())
}

/// Build the visible participant order for a round: the live players
/// shuffled, with the synthetic AI participant spliced in at a uniformly
/// random position so its slot gives nothing away.
pub fn build_round_roster<R: Rng + ?Sized>(live_players: Vec<Player>, rng: &mut R) -> Vec<Player> {
    let mut roster = live_players;
    roster.shuffle(rng);
    let slot = rng.random_range(0..=roster.len());
    roster.insert(slot, Player::ai());
    roster
}
