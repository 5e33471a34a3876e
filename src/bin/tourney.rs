use std::fs::File;
use std::io::Write;

use umpire::cli::parse_tournament_args;
use umpire::match_engine::MatchConfig;
use umpire::tournament::{render_scoreboard, run_tournament, TournamentConfig};

#[tokio::main]
async fn main() {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let parsed = match parse_tournament_args(raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("tourney: {err}");
            std::process::exit(2);
        }
    };

    let config = TournamentConfig {
        directory: parsed.directory,
        players_per_match: parsed.players_per_match,
        rematches: parsed.rematches,
        match_config_template: MatchConfig {
            width: parsed.flags.width,
            height: parsed.flags.height,
            silent: true,
            emoji: parsed.flags.emoji,
        },
    };

    let report = match run_tournament(config).await {
        Ok(report) => report,
        Err(err) => {
            eprintln!("tourney: {err}");
            std::process::exit(1);
        }
    };

    let body = format!("{}\n\n{}\n", report.log_lines.join("\n"), render_scoreboard(&report));
    if parsed.log_to_file {
        match File::create("log").and_then(|mut f| f.write_all(body.as_bytes())) {
            Ok(()) => println!("{}", render_scoreboard(&report)),
            Err(err) => {
                eprintln!("tourney: failed to write log file: {err}");
                std::process::exit(1);
            }
        }
    } else {
        println!("{body}");
    }
}
