use crate::board::Board;
use crate::error::ErrorKind;

/// The result of sanitising one candidate move against the current board (§4.2).
pub type SanitizeResult = Result<(usize, usize), ErrorKind>;

/// Parses and validates one line received from a player, applying the rules in §4.2 in order:
/// `"stop"`, then integer parse, then bounds, then column-full. Pure function of
/// `(board, input)`, as required by testable property 6.
pub fn sanitize(board: &Board, input: &str) -> SanitizeResult {
    if input == "stop" {
        return Err(ErrorKind::UserInterrupt);
    }
    let col: i64 = input.parse().map_err(|_| ErrorKind::InvalidInput)?;
    if col < 0 || col as usize >= board.width() {
        return Err(ErrorKind::OutOfBounds);
    }
    let col = col as usize;
    if board.is_full(col) {
        return Err(ErrorKind::ColumnFull);
    }
    Ok((col, board.fall_height(col)))
}

/// Applies the line-filter rules of §4.3 to one line of subprocess output. Returns `Some(line)`
/// once a move candidate line is found, `None` if the line was consumed as a debug line (the
/// caller should keep reading), or an error if the line signals a runtime failure.
pub enum LineVerdict {
    Debug,
    Move(String),
    RuntimeError,
}

pub fn classify_line(line: &str) -> LineVerdict {
    if line.starts_with('>') {
        LineVerdict::Debug
    } else if line.starts_with("Traceback") {
        LineVerdict::RuntimeError
    } else {
        LineVerdict::Move(line.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_is_user_interrupt() {
        let board = Board::new(7, 6);
        assert_eq!(sanitize(&board, "stop"), Err(ErrorKind::UserInterrupt));
    }

    #[test]
    fn non_integer_is_invalid_input() {
        let board = Board::new(7, 6);
        assert_eq!(sanitize(&board, "three"), Err(ErrorKind::InvalidInput));
        assert_eq!(sanitize(&board, ""), Err(ErrorKind::InvalidInput));
    }

    #[test]
    fn negative_and_overlarge_are_out_of_bounds() {
        let board = Board::new(7, 6);
        assert_eq!(sanitize(&board, "-1"), Err(ErrorKind::OutOfBounds));
        assert_eq!(sanitize(&board, "7"), Err(ErrorKind::OutOfBounds));
    }

    #[test]
    fn full_column_is_column_full() {
        let mut board = Board::new(7, 6);
        for _ in 0..6 {
            board.place(0, 1);
        }
        assert_eq!(sanitize(&board, "0"), Err(ErrorKind::ColumnFull));
    }

    #[test]
    fn valid_move_returns_fall_row() {
        let mut board = Board::new(7, 6);
        board.place(3, 1);
        assert_eq!(sanitize(&board, "3"), Ok((3, 1)));
    }

    #[test]
    fn classify_line_recognises_debug_and_traceback_prefixes() {
        assert!(matches!(classify_line(">thinking..."), LineVerdict::Debug));
        assert!(matches!(classify_line("Traceback (most recent call last):"), LineVerdict::RuntimeError));
        assert!(matches!(classify_line("3"), LineVerdict::Move(_)));
    }
}
