//! Integration tests for the round engine: full rounds on seeded boards.

use minefield_protocol::{Amount, RevealOutcome, RoundStatus};
use minefield_round::{EngineConfig, MultiplierCurve, Round, RoundEngine, RoundError};

// =========================================================================
// Helpers
// =========================================================================

fn engine(seed: u64) -> RoundEngine {
    RoundEngine::with_seed(EngineConfig::default(), seed).expect("default config is valid")
}

fn safe_cells(round: &Round) -> Vec<usize> {
    (0..round.board().len())
        .filter(|i| !round.board().is_mine(*i))
        .collect()
}

fn first_mine(round: &Round) -> usize {
    round.board().mine_positions()[0]
}

// =========================================================================
// Board generation
// =========================================================================

#[test]
fn test_every_valid_configuration_places_exact_mine_count() {
    let mut e = engine(2024);
    for rows in 3..=5 {
        for cols in 3..=5 {
            for mines in 1..rows * cols {
                let round = e
                    .create_round(rows, cols, mines, Amount::from_units(1))
                    .unwrap();
                let positions = round.board().mine_positions();
                assert_eq!(positions.len(), mines, "{rows}x{cols} with {mines} mines");
                // mine_positions() is ascending; strictly ascending means distinct.
                assert!(positions.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }
}

#[test]
fn test_different_seeds_eventually_differ() {
    let layouts: Vec<Vec<usize>> = (0..8)
        .map(|seed| {
            engine(seed)
                .create_round(5, 5, 7, Amount::from_units(1))
                .unwrap()
                .board()
                .mine_positions()
        })
        .collect();
    assert!(layouts.windows(2).any(|w| w[0] != w[1]));
}

// =========================================================================
// Full rounds
// =========================================================================

#[test]
fn test_three_safe_reveals_then_cashout_pays_schedule_three() {
    let mut round = engine(11)
        .create_round(5, 5, 7, Amount::from_units(20))
        .unwrap();
    let safe = safe_cells(&round);

    for &cell in &safe[..3] {
        assert!(matches!(
            round.reveal(cell).unwrap(),
            RevealOutcome::Continue { .. }
        ));
    }
    let outcome = round.cashout().unwrap();

    let m3 = MultiplierCurve::default().multiplier(25, 7, 3);
    assert_eq!(outcome, RevealOutcome::Won { multiplier: m3 });
    assert_eq!(
        round.profit(),
        Some(Amount::from_units(20).scale(m3 - 1.0))
    );
}

#[test]
fn test_first_move_on_mine_loses_full_stake() {
    let mut round = engine(11)
        .create_round(5, 5, 7, Amount::from_units(20))
        .unwrap();
    let mine = first_mine(&round);

    assert_eq!(round.reveal(mine).unwrap(), RevealOutcome::Lost);
    assert_eq!(round.status(), RoundStatus::Lost);
    assert_eq!(round.profit(), Some(Amount::from_units(-20)));
}

#[test]
fn test_clearing_every_safe_cell_wins_at_full_clear_multiplier() {
    for (rows, cols, mines) in [(3, 3, 1), (4, 4, 9), (5, 5, 24)] {
        let mut round = engine(5)
            .create_round(rows, cols, mines, Amount::from_units(5))
            .unwrap();
        let safe = safe_cells(&round);
        let full = round.multiplier_at(safe.len());

        let outcomes: Vec<_> = safe.iter().map(|&c| round.reveal(c).unwrap()).collect();

        let (last, rest) = outcomes.split_last().unwrap();
        assert_eq!(*last, RevealOutcome::Won { multiplier: full });
        assert!(rest.iter().all(|o| matches!(o, RevealOutcome::Continue { .. })));
        assert_eq!(round.status(), RoundStatus::Won);
    }
}

#[test]
fn test_multiplier_reported_by_reveals_strictly_increases() {
    let mut round = engine(3)
        .create_round(5, 5, 3, Amount::from_units(1))
        .unwrap();
    let mut last = 1.0;
    for cell in safe_cells(&round) {
        let m = round.reveal(cell).unwrap().multiplier().unwrap();
        assert!(m > last);
        last = m;
    }
}

#[test]
fn test_terminal_round_rejects_everything_and_stays_frozen() {
    let mut round = engine(9)
        .create_round(4, 4, 4, Amount::from_units(3))
        .unwrap();
    let safe = safe_cells(&round);
    round.reveal(safe[0]).unwrap();
    round.reveal(first_mine(&round)).unwrap();

    let before = (round.status(), round.safe_revealed());
    for cell in 0..16 {
        assert!(matches!(round.reveal(cell), Err(RoundError::RoundNotActive(_))));
    }
    assert!(matches!(round.cashout(), Err(RoundError::RoundNotActive(_))));
    assert_eq!((round.status(), round.safe_revealed()), before);
}

#[test]
fn test_repeat_reveal_keeps_state_and_multiplier() {
    let mut round = engine(21)
        .create_round(5, 5, 7, Amount::from_units(1))
        .unwrap();
    let safe = safe_cells(&round);
    round.reveal(safe[0]).unwrap();
    let first = round.reveal(safe[1]).unwrap();

    for _ in 0..3 {
        assert_eq!(round.reveal(safe[1]).unwrap(), first);
        assert_eq!(round.reveal(safe[0]).unwrap(), first);
    }
    assert_eq!(round.safe_revealed(), 2);
}

#[test]
fn test_custom_curve_flows_into_rounds() {
    let config = EngineConfig {
        curve: MultiplierCurve::new(0.05, 2.0).unwrap(),
        ..EngineConfig::default()
    };
    let mut round = RoundEngine::with_seed(config, 1)
        .unwrap()
        .create_round(3, 3, 2, Amount::from_units(1))
        .unwrap();
    let cell = safe_cells(&round)[0];

    let m = round.reveal(cell).unwrap().multiplier().unwrap();

    let expected = 1.0 + (9.0 / 7.0 - 1.0) * 0.95 * 2.0;
    assert!((m - expected).abs() < 1e-12);
}
