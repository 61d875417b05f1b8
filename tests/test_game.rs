//! Game-rule regressions: state transitions, feasible ranges, and the
//! preconditions the tree builder relies on.

use dicenash::game::{Event, Game, CALL, FOLD, RAISE};

#[test]
fn initial_state_regression() {
    let game = Game::standard();
    let state = game.initial_state(0);
    assert_eq!(state.last_bid, 2);
    assert_eq!(state.player_id, 0);
    assert_eq!(state.event, Event::InProgress);
    assert_eq!(state.public_hand, 0);
}

#[test]
fn raise_then_call_regression() {
    let game = Game::standard();
    let state = game.initial_state(0);

    let raised = game.act(&state, RAISE);
    assert_eq!(raised.last_bid, 3);
    assert_eq!(raised.player_id, 1);
    assert_eq!(raised.event, Event::InProgress);

    let called = game.act(&raised, CALL);
    assert_eq!(called.event, Event::Called);
    assert_eq!(called.player_id, 0);
    assert_eq!(called.last_bid, 3);
}

#[test]
fn all_actions_feasible_below_cap() {
    let game = Game::standard();
    let mut state = game.initial_state(0);
    while state.last_bid < game.max_bid() {
        assert_eq!(game.action_range(&state), 0..3);
        state = game.act(&state, RAISE);
    }
}

#[test]
fn raise_removed_at_cap() {
    let game = Game::standard();
    let mut state = game.initial_state(0);
    for _ in 0..(game.max_bid() - 2) {
        state = game.act(&state, RAISE);
    }
    assert_eq!(state.last_bid, game.max_bid());
    assert_eq!(game.action_range(&state), 0..2);
}

#[test]
fn terminal_states_have_empty_range() {
    let game = Game::standard();
    for action in [FOLD, CALL] {
        let terminal = game.act(&game.initial_state(0), action);
        assert!(game.is_terminal(&terminal));
        assert_eq!(game.action_range(&terminal), 0..0);
    }
}

#[test]
#[should_panic(expected = "infeasible")]
fn raise_past_cap_panics() {
    let game = Game::standard();
    let mut state = game.initial_state(0);
    for _ in 0..(game.max_bid() - 1) {
        state = game.act(&state, RAISE);
    }
}

#[test]
#[should_panic(expected = "infeasible")]
fn acting_on_terminal_panics() {
    let game = Game::standard();
    let folded = game.act(&game.initial_state(0), FOLD);
    game.act(&folded, FOLD);
}

#[test]
fn fold_preserves_bid_and_flips_player() {
    let game = Game::standard();
    let raised = game.act(&game.initial_state(9), RAISE);
    let folded = game.act(&raised, FOLD);
    assert_eq!(folded.last_bid, raised.last_bid);
    assert_eq!(folded.event, Event::Folded);
    assert_eq!(folded.player_id, 0);
    assert_eq!(folded.public_hand, 9);
}

#[test]
fn state_equality_is_field_wise() {
    let game = Game::standard();
    let a = game.act(&game.initial_state(4), RAISE);
    let b = game.act(&game.initial_state(4), RAISE);
    assert_eq!(a, b);
    let c = game.act(&game.initial_state(5), RAISE);
    assert_ne!(a, c);
}

#[test]
fn deduce_last_action_inverts_act() {
    let game = Game::standard();
    let state = game.initial_state(0);
    for action in game.action_range(&state) {
        let next = game.act(&state, action);
        assert_eq!(game.deduce_last_action(&next), action);
    }
}

#[test]
fn small_game_dimensions() {
    // One private die: 6 hands, 6^4 public combinations.
    let game = Game::new(1, 6, 5);
    assert_eq!(game.num_hands(), 6);
    assert_eq!(game.num_public_hands(), 1296);
    assert_eq!(game.max_bid(), 5);
}
