use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use crate::game::{action_name, Game, PartialPublicState, CALL, FOLD, RAISE};
use crate::hand_evaluator::ScoreFields;
use crate::public_tree::Tree;
use crate::strategy::TreeStrategy;

const DIE_FACES: [char; 6] = ['\u{2680}', '\u{2681}', '\u{2682}', '\u{2683}', '\u{2684}', '\u{2685}'];

/// Render 0-based face indices as die glyphs with 1-based values.
pub fn dice_display(faces: &[u8]) -> String {
    faces
        .iter()
        .map(|&f| format!("{} {}", DIE_FACES[f as usize], f + 1))
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn private_hand_display(game: &Game, hand: usize) -> String {
    dice_display(&game.private_faces(hand))
}

pub fn public_hand_display(game: &Game, public_hand: usize) -> String {
    dice_display(&game.public_faces(public_hand))
}

pub fn state_display(state: &PartialPublicState) -> String {
    format!(
        "P{} to act, bid {} ({})",
        state.player_id, state.last_bid, state.event
    )
}

pub fn styled_action(action: usize) -> String {
    let name = action_name(action);
    match action {
        RAISE => name.red().bold().to_string(),
        CALL => name.green().bold().to_string(),
        FOLD => name.dimmed().bold().to_string(),
        _ => name.bold().to_string(),
    }
}

/// Score breakdown table for a set of five dice.
pub fn score_table_display(score: u32) -> String {
    let fields = ScoreFields::unpack(score);

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Field").set_alignment(CellAlignment::Left),
        Cell::new("Face").set_alignment(CellAlignment::Right),
    ]);

    let rows: [(&str, u32); 7] = [
        ("Five of a kind", fields.quints),
        ("Four of a kind", fields.quads),
        ("Straight / FH flag", fields.straight),
        ("Triple", fields.triple),
        ("High pair", fields.high_pair),
        ("Low pair", fields.low_pair),
        ("Kicker", fields.single),
    ];
    for (label, face) in rows {
        let value = if face == 0 {
            "-".dimmed().to_string()
        } else {
            face.to_string()
        };
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }

    format!(
        "  {}  (packed score {})\n{}",
        fields.category().to_string().bold(),
        score,
        table
    )
}

/// Per-node strategy table: one row per private hand, one column per
/// feasible action. Verbose; meant for small trees and spot checks.
pub fn strategy_node_table(
    game: &Game,
    tree: &Tree,
    strategy: &TreeStrategy,
    node_id: usize,
) -> String {
    let node = tree.node(node_id);
    let range = game.action_range(&node.state);

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    let mut header = vec![Cell::new("hand")];
    for action in range.clone() {
        header.push(Cell::new(styled_action(action)).set_alignment(CellAlignment::Center));
    }
    table.set_header(header);

    for hand in 0..game.num_hands() {
        let faces = private_hand_display(game, hand);
        let mut row = vec![Cell::new(faces)];
        for action in range.clone() {
            let probability = strategy[node_id][hand][action];
            let text = format!("{:.1}%", probability * 100.0);
            let cell = if probability >= 0.5 {
                Cell::new(text.bold().to_string())
            } else if probability < 0.005 {
                Cell::new(text.dimmed().to_string())
            } else {
                Cell::new(text)
            };
            row.push(cell.set_alignment(CellAlignment::Right));
        }
        table.add_row(row);
    }

    format!(
        "  {} {}\n{}",
        format!("Node {node_id}").bold(),
        state_display(&node.state),
        table
    )
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}
