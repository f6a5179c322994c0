//! End-to-end session flows across all four variants: creation, play,
//! lifecycle commands, the audit trail, and persistence.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use tabletally_game::phase_progression::HandScoreInput;
use tabletally_game::stock_elimination::StockUpdate;
use tabletally_game::{
    AuditAction, CardCount, FixedClock, Game, GameStatus, GameType, HandInput, IdSource,
    PersistedDocument, Player, ScoreKeeper, SessionDirectory, StakePosting, StateStorage,
    TrainRoundInput, TrainRoundScore, WINNING_SCORE,
};

fn directory() -> SessionDirectory {
    SessionDirectory::with_sources(Box::new(FixedClock(50_000)), IdSource::from_seed(42))
}

fn pair() -> Vec<Player> {
    vec![
        Player::new("p1", "Ana").with_avatar("🦀"),
        Player::new("p2", "Ben"),
    ]
}

fn hand(winner: &str, loser_cards: CardCount) -> HandInput {
    HandInput {
        dealer_id: "p1".to_string(),
        winner_id: winner.to_string(),
        scores: vec![
            HandScoreInput {
                player_id: "p1".to_string(),
                phase_laid: winner == "p1",
                cards: if winner == "p1" {
                    CardCount::empty()
                } else {
                    loser_cards
                },
                hits: false,
                skipped_this_hand: false,
            },
            HandScoreInput {
                player_id: "p2".to_string(),
                phase_laid: winner == "p2",
                cards: if winner == "p2" {
                    CardCount::empty()
                } else {
                    loser_cards
                },
                hits: false,
                skipped_this_hand: false,
            },
        ],
        stake: None,
        notes: None,
    }
}

#[test]
fn four_games_share_one_session() {
    let mut dir = directory();

    let phase_id = dir
        .create_phase_game(pair(), "p1", Default::default())
        .expect("phase game creates");
    let pegging_id = dir
        .create_pegging_game(pair(), "p1", Some(StakePosting::new("5", "USD")))
        .expect("pegging game creates");
    let stock_id = dir
        .create_stock_game(pair(), "p2", None)
        .expect("stock game creates");
    let train_id = dir
        .create_train_game(pair(), "p2", None)
        .expect("train game creates");

    assert_eq!(dir.games().len(), 4);
    assert_eq!(dir.current_game_id(), Some(train_id.as_str()));

    // Each variant command only touches its own game type.
    assert!(dir.switch_game(&phase_id));
    assert!(dir.record_hand(hand("p1", CardCount::empty())).is_some());
    assert!(dir.update_score("p1", 2).is_none());

    assert!(dir.switch_game(&pegging_id));
    assert_eq!(dir.update_score("p1", 8), Some(8));

    assert!(dir.switch_game(&stock_id));
    assert!(dir.merge_state(StockUpdate {
        current_player_id: Some("p2".to_string()),
        ..StockUpdate::default()
    }));

    assert!(dir.switch_game(&train_id));
    assert!(
        dir.record_round(TrainRoundInput {
            winner_id: "p1".to_string(),
            scores: vec![
                TrainRoundScore {
                    player_id: "p1".to_string(),
                    pips: 0,
                },
                TrainRoundScore {
                    player_id: "p2".to_string(),
                    pips: 17,
                },
            ],
        })
        .is_some()
    );

    // Stake ledger has exactly the pegging posting.
    assert_eq!(dir.stakes_history().len(), 1);
    assert_eq!(
        dir.stakes_history()[0].game_id.as_deref(),
        Some(pegging_id.as_str())
    );
}

#[test]
fn audit_trail_records_the_session_lifecycle() {
    let mut dir = directory();
    let first = dir
        .create_train_game(pair(), "p1", None)
        .expect("train game creates");
    let second = dir
        .create_pegging_game(pair(), "p1", None)
        .expect("pegging game creates");

    dir.pause_game(None);
    dir.switch_game(&first);
    dir.resume_game(Some(second.as_str()));
    dir.end_game("p1");

    let log: Vec<(String, AuditAction)> = dir
        .audit_log()
        .iter()
        .map(|e| (e.game_id.clone(), e.action))
        .collect();
    assert_eq!(
        log,
        vec![
            (first.clone(), AuditAction::Created),
            (second.clone(), AuditAction::Created),
            (second.clone(), AuditAction::Paused),
            (first.clone(), AuditAction::Switched),
            (second.clone(), AuditAction::Resumed),
            (second.clone(), AuditAction::Completed),
        ]
    );

    // Snapshots carry the resume-banner essentials.
    let paused = &dir.audit_log()[2];
    assert_eq!(paused.game_type, GameType::Pegging);
    assert_eq!(paused.snapshot.dealer_id, "p1");
    assert_eq!(paused.snapshot.current_player_id, "p2");
    assert_eq!(paused.snapshot.round, Some(1));
}

#[test]
fn pegging_game_completes_through_the_directory() {
    let mut dir = directory();
    dir.create_pegging_game(pair(), "p1", None)
        .expect("pegging game creates");

    assert_eq!(dir.update_score("p1", 10), Some(10));
    assert_eq!(dir.update_score("p1", WINNING_SCORE - 6), Some(125));

    let game = dir.current_game().expect("game");
    assert_eq!(game.status(), GameStatus::Completed);
    assert_eq!(game.winner_id(), Some("p1"));

    // Terminal: further awards are no-ops.
    assert_eq!(dir.update_score("p2", 5), None);
}

#[test]
fn undo_through_the_directory_restores_prior_standings() {
    let mut dir = directory();
    dir.create_phase_game(pair(), "p1", Default::default())
        .expect("phase game creates");

    let penalty = CardCount {
        high: 2,
        ..CardCount::empty()
    };
    dir.record_hand(hand("p1", penalty)).expect("hand records");
    let second = dir.record_hand(hand("p2", penalty)).expect("hand records");

    let undone = dir.undo_last_hand().expect("undo succeeds");
    assert_eq!(undone, second);

    let Some(Game::PhaseProgression(game)) = dir.current_game() else {
        panic!("expected phase game");
    };
    assert_eq!(game.hands.len(), 1);
    let p1 = game.player_state("p1").expect("p1 state");
    assert_eq!(p1.total_score, 0);
    assert_eq!(p1.current_phase, 2);
    let p2 = game.player_state("p2").expect("p2 state");
    assert_eq!(p2.total_score, 20);
    assert_eq!(p2.current_phase, 1);
}

#[derive(Clone, Default)]
struct MemoryStorage {
    saved: Rc<RefCell<Option<PersistedDocument>>>,
}

impl StateStorage for MemoryStorage {
    type Error = Infallible;

    fn save_document(&self, document: &PersistedDocument) -> Result<(), Self::Error> {
        *self.saved.borrow_mut() = Some(document.clone());
        Ok(())
    }

    fn load_document(&self) -> Result<Option<PersistedDocument>, Self::Error> {
        Ok(self.saved.borrow().clone())
    }

    fn delete_document(&self) -> Result<(), Self::Error> {
        *self.saved.borrow_mut() = None;
        Ok(())
    }
}

#[test]
fn session_survives_a_save_load_cycle() {
    let mut dir = directory();
    let train_id = dir
        .create_train_game(pair(), "p1", Some(StakePosting::new("10", "EUR")))
        .expect("train game creates");
    dir.record_round(TrainRoundInput {
        winner_id: "p2".to_string(),
        scores: vec![
            TrainRoundScore {
                player_id: "p1".to_string(),
                pips: 12,
            },
            TrainRoundScore {
                player_id: "p2".to_string(),
                pips: 0,
            },
        ],
    })
    .expect("round records");
    dir.pause_game(None);

    let keeper = ScoreKeeper::new(MemoryStorage::default());
    keeper.save_session(&dir).expect("session saves");
    let loaded = keeper
        .load_session()
        .expect("load runs")
        .expect("session exists");

    assert_eq!(loaded.current_game_id(), Some(train_id.as_str()));
    assert_eq!(loaded.audit_log(), dir.audit_log());
    assert_eq!(loaded.stakes_history(), dir.stakes_history());
    let Some(Game::DominoTrain(game)) = loaded.current_game() else {
        panic!("expected train game");
    };
    assert_eq!(game.status, GameStatus::Paused);
    assert_eq!(game.current_engine, 11);
    assert_eq!(
        game.player_state("p1").expect("p1 state").total_score,
        12
    );
}
