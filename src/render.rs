use std::collections::HashMap;

use colored::Colorize;

use crate::board::Board;
use crate::error::ErrorKind;
use crate::player::PlayerAdapter;

const DISCS: [&str; 9] = ["⚫", "🔴", "🟡", "🟢", "🔵", "🟣", "🟠", "⚪", "🟤"];

/// Renders the board (§4.6): a Unicode box-drawing frame with column numbers `0..w-1 mod 10` in
/// ASCII mode, or one coloured disc per player in emoji mode. Rows are drawn top-down.
pub fn render_board(board: &Board, players: &[PlayerAdapter], emoji: bool) -> String {
    let width = board.width();
    let height = board.height();
    let mut out = String::new();
    out.push('\n');
    if emoji {
        for y in (0..height).rev() {
            for x in 0..width {
                let cell = board.cell(x, y);
                out.push_str(disc_for(cell));
            }
            out.push('\n');
        }
        return out;
    }

    out.push_str("  ");
    for x in 0..width {
        out.push_str(&format!("{} ", x % 10));
    }
    out.push('\n');
    out.push('┌');
    out.push_str(&"─".repeat(width * 2 + 1));
    out.push_str("┐\n");
    for y in (0..height).rev() {
        out.push_str("│ ");
        for x in 0..width {
            let cell = board.cell(x, y);
            if cell == 0 {
                out.push_str(". ");
            } else {
                out.push_str(&format!("{cell} "));
            }
        }
        out.push_str("│\n");
    }
    out.push('└');
    out.push_str(&"─".repeat(width * 2 + 1));
    out.push_str("┘\n");
    out.push_str("  ");
    for x in 0..width {
        out.push_str(&format!("{} ", x % 10));
    }
    let _ = players; // kept for signature parity with a future per-player colour legend
    out
}

fn disc_for(player_no: u32) -> &'static str {
    if player_no == 0 {
        DISCS[0]
    } else {
        DISCS[(player_no as usize) % (DISCS.len() - 1) + 1]
    }
}

/// Formats the end-of-game line: `"<winner> won"` or `"Draw"`, optionally followed by
/// `" [player: reason, ...]"` when `silent` is set (§4.6).
pub fn render_end(
    winner_name: Option<&str>,
    errors: &HashMap<String, ErrorKind>,
    silent: bool,
) -> String {
    let mut line = match winner_name {
        Some(name) => format!("{} won", name.green().bold()),
        None => "Draw".yellow().bold().to_string(),
    };
    if silent && !errors.is_empty() {
        let mut entries: Vec<_> = errors.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        let joined = entries.iter().map(|(name, kind)| format!("{name}: {kind}")).collect::<Vec<_>>().join(", ");
        line.push_str(&format!(" [{joined}]"));
    }
    line
}

/// Formats one score line: `"<rank>. <name> (<score>)"` (§4.6).
pub fn render_score_line(rank: usize, name: &str, score: i64) -> String {
    format!("{rank}. {name} ({score})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_end_formats_a_draw() {
        let errors = HashMap::new();
        let line = render_end(None, &errors, false);
        assert!(line.contains("Draw"));
    }

    #[test]
    fn render_end_formats_a_win() {
        let errors = HashMap::new();
        let line = render_end(Some("alice"), &errors, false);
        assert!(line.contains("alice"));
        assert!(line.contains("won"));
    }

    #[test]
    fn render_end_appends_errors_only_when_silent() {
        let mut errors = HashMap::new();
        errors.insert("bob".to_string(), ErrorKind::Timeout);
        let silent = render_end(Some("alice"), &errors, true);
        assert!(silent.contains("bob: timeout"));
        let verbose = render_end(Some("alice"), &errors, false);
        assert!(!verbose.contains("bob: timeout"));
    }

    #[test]
    fn score_line_matches_fixed_format() {
        assert_eq!(render_score_line(1, "alice", 4), "1. alice (4)");
    }

    #[test]
    fn ascii_render_places_frame_and_column_numbers() {
        let board = Board::new(7, 6);
        let rendered = render_board(&board, &[], false);
        assert!(rendered.contains('┌'));
        assert!(rendered.contains("0 1 2 3 4 5 6"));
    }
}
