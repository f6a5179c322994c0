//! Dealer rotation by fixed seating order.

use thiserror::Error;

use crate::player::Player;

/// Raised when the current dealer is missing from the roster. Given the
/// roster invariants this state is unreachable from the command API.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("dealer {dealer_id:?} not found in roster")]
pub struct RotationError {
    pub dealer_id: String,
}

/// The player seated after the current dealer, wrapping around the table.
///
/// # Errors
///
/// Returns [`RotationError`] when `current_dealer_id` is not in `players`.
pub fn next_dealer<'a>(
    players: &'a [Player],
    current_dealer_id: &str,
) -> Result<&'a Player, RotationError> {
    let idx = players
        .iter()
        .position(|p| p.id == current_dealer_id)
        .ok_or_else(|| RotationError {
            dealer_id: current_dealer_id.to_string(),
        })?;
    Ok(&players[(idx + 1) % players.len()])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<Player> {
        vec![
            Player::new("a", "Ana"),
            Player::new("b", "Ben"),
            Player::new("c", "Cal"),
        ]
    }

    #[test]
    fn rotates_in_seating_order_and_wraps() {
        let players = roster();
        assert_eq!(next_dealer(&players, "a").expect("next").id, "b");
        assert_eq!(next_dealer(&players, "b").expect("next").id, "c");
        assert_eq!(next_dealer(&players, "c").expect("next").id, "a");
    }

    #[test]
    fn full_cycle_returns_to_start() {
        let players = roster();
        let mut dealer = "b".to_string();
        for _ in 0..players.len() {
            dealer = next_dealer(&players, &dealer).expect("next").id.clone();
        }
        assert_eq!(dealer, "b");
    }

    #[test]
    fn unknown_dealer_is_an_error() {
        let players = roster();
        let err = next_dealer(&players, "zz").expect_err("missing dealer");
        assert_eq!(err.dealer_id, "zz");
    }
}
