use std::collections::HashMap;

use futures::future::join_all;

use crate::board::Board;
use crate::error::ErrorKind;
use crate::player::{PlayerAdapter, PlayerSpec};
use crate::render::render_board;

/// The outcome of one match (§3 "Match result"): the final participant specs (with `alive`
/// updated), the winner's player number if any, and the per-player error map.
pub struct MatchResult {
    pub participants: Vec<PlayerSpec>,
    pub winner: Option<u32>,
    pub errors: HashMap<u32, ErrorKind>,
    pub final_board: String,
}

pub struct MatchConfig {
    pub width: usize,
    pub height: usize,
    pub silent: bool,
    pub emoji: bool,
}

/// Runs one match to completion: the INIT -> PLAYING -> {WON, DRAW, LAST_STANDING} state machine
/// of §4.4. Owns the board for the lifetime of the match; players are given a read-only view of
/// it for sanitisation.
pub async fn run_match(mut players: Vec<PlayerAdapter>, config: MatchConfig) -> MatchResult {
    let n = players.len() as u32;
    let mut board = Board::new(config.width, config.height);
    let mut errors: HashMap<u32, ErrorKind> = HashMap::new();

    // INIT: start every player concurrently, then wait for all of them (§4.4, §5).
    let starts = players.iter_mut().map(|p| p.start_game(config.width, config.height, n));
    let start_results = join_all(starts).await;
    for (player, result) in players.iter_mut().zip(start_results) {
        if let Err(kind) = result {
            errors.insert(player.spec().no, kind);
            player.spec_mut().alive = false;
        }
    }

    let mut alive_players = players.iter().filter(|p| p.spec().alive).count();
    let mut turn: usize = 0;
    let mut winner: Option<u32> = None;

    if alive_players > 1 {
        'turns: loop {
            let i = turn % players.len();
            if !players[i].spec().alive {
                broadcast(&mut players, i, -1).await;
                turn += 1;
                if alive_players <= 1 {
                    break 'turns;
                }
                continue;
            }

            if !config.silent {
                println!("{}", render_board(&board, &players, config.emoji));
            }

            let no = players[i].spec().no;
            let outcome = players[i].ask_move(&board).await;
            match outcome {
                Ok((col, _row)) => {
                    let (col, _row) = board.place(col, no);
                    broadcast(&mut players, i, col as i64).await;
                    if board.check_win(no) {
                        winner = Some(no);
                        break 'turns;
                    }
                    if board.check_draw() {
                        break 'turns;
                    }
                }
                Err(kind) => {
                    players[i].lose_game().await;
                    errors.insert(no, kind);
                    alive_players -= 1;
                    broadcast(&mut players, i, -1).await;
                    if alive_players <= 1 {
                        break 'turns;
                    }
                }
            }
            turn += 1;
        }
    }

    if winner.is_none() && !board.check_draw() && alive_players == 1 {
        winner = players.iter().find(|p| p.spec().alive).map(|p| p.spec().no);
    }

    let final_board = render_board(&board, &players, config.emoji);

    // Terminal teardown: stop every subprocess player concurrently (§4.4, §5).
    let stops = players.iter_mut().map(|p| p.stop_game());
    join_all(stops).await;

    MatchResult { participants: players.into_iter().map(|p| p.spec().clone()).collect(), winner, errors, final_board }
}

/// Delivers `tell_move` to every living player other than `mover_idx`, in player-number order,
/// all completing before the next `ask_move` (§4.4 "Broadcast policy").
async fn broadcast(players: &mut [PlayerAdapter], mover_idx: usize, col: i64) {
    for idx in 0..players.len() {
        if idx == mover_idx || !players[idx].spec().alive {
            continue;
        }
        players[idx].tell_move(col).await;
    }
}
