use std::collections::HashMap;

use umpire::channel::DEFAULT_DEADLINE;
use umpire::cli::{parse_match_args, PlayerArg};
use umpire::match_engine::{run_match, MatchConfig};
use umpire::player::{default_human_name, ChatHooks, PlayerAdapter, PlayerSpec};
use umpire::render::render_end;

#[tokio::main]
async fn main() {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let parsed = match parse_match_args(raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("umpire: {err}");
            std::process::exit(2);
        }
    };

    let mut player_args = parsed.players;
    if let Some(n) = parsed.player_count {
        while player_args.len() < n {
            player_args.push(PlayerArg::Human);
        }
    }
    if player_args.is_empty() {
        eprintln!("umpire: no players given");
        std::process::exit(2);
    }

    let deadline = DEFAULT_DEADLINE;
    let debug = !parsed.flags.suppress_debug;
    let players: Vec<PlayerAdapter> = player_args
        .into_iter()
        .enumerate()
        .map(|(i, arg)| {
            let no = i as u32 + 1;
            match arg {
                PlayerArg::Human => {
                    let spec = PlayerSpec::human(no, default_human_name());
                    PlayerAdapter::human(spec, ChatHooks::default())
                }
                PlayerArg::Program(path) => {
                    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("player").to_string();
                    let spec = PlayerSpec::subprocess(no, name, path);
                    PlayerAdapter::subprocess(spec, deadline, debug)
                }
            }
        })
        .collect();

    let config = MatchConfig {
        width: parsed.flags.width,
        height: parsed.flags.height,
        silent: parsed.flags.silent,
        emoji: parsed.flags.emoji,
    };
    let result = run_match(players, config).await;

    if !parsed.flags.silent {
        println!("{}", result.final_board);
    }

    let winner_name = result
        .winner
        .and_then(|no| result.participants.iter().find(|p| p.no == no).map(|p| p.display_name.clone()));
    let errors_by_name: HashMap<String, _> = result
        .errors
        .iter()
        .filter_map(|(no, kind)| {
            result.participants.iter().find(|p| p.no == *no).map(|p| (p.display_name.clone(), *kind))
        })
        .collect();
    println!("{}", render_end(winner_name.as_deref(), &errors_by_name, parsed.flags.silent));
}
