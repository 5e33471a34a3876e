use std::iter::Peekable;
use std::path::PathBuf;

use crate::error::Res;
use anyhow::bail;

/// Hand-rolled single-dash flag parser, in the style of the teacher's `monitors::cli`: clap
/// doesn't cleanly support flags like `-g W H` that eat two positional values after a single
/// dash, so this crate parses `std::env::Args` by hand instead of carrying a `clap` dependency.
type ArgIter = Peekable<std::vec::IntoIter<String>>;

fn next_arg(args: &mut ArgIter, flag: &str) -> Res<String> {
    args.next().ok_or_else(|| anyhow::anyhow!("flag '{flag}' expects a value but none was given"))
}

fn next_usize(args: &mut ArgIter, flag: &str) -> Res<usize> {
    let value = next_arg(args, flag)?;
    value.parse().map_err(|_| anyhow::anyhow!("flag '{flag}' expects an integer, got '{value}'"))
}

/// The minimum grid dimension `Board::new` accepts (§4.1). Checked here so a bad `-g` value is a
/// clean CLI error instead of an assertion panic once it reaches the board.
const MIN_GRID_DIM: usize = 4;

fn validate_grid(width: usize, height: usize) -> Res<()> {
    if width < MIN_GRID_DIM || height < MIN_GRID_DIM {
        bail!("grid must be at least {MIN_GRID_DIM}x{MIN_GRID_DIM}, got {width}x{height}");
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub enum PlayerArg {
    Human,
    Program(PathBuf),
}

/// Flags shared by both CLI surfaces (§6): grid size, silent, emoji, debug suppression.
#[derive(Debug, Clone)]
pub struct MatchFlags {
    pub width: usize,
    pub height: usize,
    pub silent: bool,
    pub emoji: bool,
    pub suppress_debug: bool,
}

impl Default for MatchFlags {
    fn default() -> Self {
        Self { width: 7, height: 6, silent: false, emoji: false, suppress_debug: false }
    }
}

#[derive(Debug, Clone)]
pub struct MatchCliArgs {
    pub players: Vec<PlayerArg>,
    pub player_count: Option<usize>,
    pub flags: MatchFlags,
}

/// Parses the arguments for the match runner (§6 "CLI surface (match runner)"). Positional
/// arguments are player program paths or the literal `user`.
pub fn parse_match_args(raw: Vec<String>) -> Res<MatchCliArgs> {
    let mut args: ArgIter = raw.into_iter().peekable();
    let mut players = Vec::new();
    let mut flags = MatchFlags::default();
    let mut player_count = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-g" => {
                flags.width = next_usize(&mut args, "-g")?;
                flags.height = next_usize(&mut args, "-g")?;
                validate_grid(flags.width, flags.height)?;
            }
            "-p" => player_count = Some(next_usize(&mut args, "-p")?),
            "-s" => flags.silent = true,
            "-e" => flags.emoji = true,
            "-n" => flags.suppress_debug = true,
            "user" => players.push(PlayerArg::Human),
            other if other.starts_with('-') => bail!("unrecognized flag '{other}'"),
            path => players.push(PlayerArg::Program(PathBuf::from(path))),
        }
    }

    Ok(MatchCliArgs { players, player_count, flags })
}

#[derive(Debug, Clone)]
pub struct TournamentCliArgs {
    pub directory: PathBuf,
    pub players_per_match: usize,
    pub rematches: usize,
    pub log_to_file: bool,
    pub flags: MatchFlags,
}

/// Parses the arguments for the tournament runner (§6 "CLI surface (tournament runner)"), which
/// forwards all match-runner flags in addition to its own `-d`, `-p`, `-r`, `-l`.
pub fn parse_tournament_args(raw: Vec<String>) -> Res<TournamentCliArgs> {
    let mut args: ArgIter = raw.into_iter().peekable();
    let mut directory = PathBuf::from("ai");
    let mut players_per_match = 2;
    let mut rematches = 1;
    let mut log_to_file = false;
    let mut flags = MatchFlags::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-d" => directory = PathBuf::from(next_arg(&mut args, "-d")?),
            "-p" => players_per_match = next_usize(&mut args, "-p")?,
            "-r" => rematches = next_usize(&mut args, "-r")?,
            "-l" => log_to_file = true,
            "-g" => {
                flags.width = next_usize(&mut args, "-g")?;
                flags.height = next_usize(&mut args, "-g")?;
                validate_grid(flags.width, flags.height)?;
            }
            "-s" => flags.silent = true,
            "-e" => flags.emoji = true,
            "-n" => flags.suppress_debug = true,
            other => bail!("unrecognized argument '{other}'"),
        }
    }

    Ok(TournamentCliArgs { directory, players_per_match, rematches, log_to_file, flags })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn defaults_match_the_spec() {
        let parsed = parse_match_args(args("")).unwrap();
        assert_eq!(parsed.flags.width, 7);
        assert_eq!(parsed.flags.height, 6);
        assert!(!parsed.flags.silent);
        assert!(!parsed.flags.emoji);
        assert!(parsed.players.is_empty());
    }

    #[test]
    fn grid_flag_consumes_two_values() {
        let parsed = parse_match_args(args("-g 9 8 bots/a.py user")).unwrap();
        assert_eq!(parsed.flags.width, 9);
        assert_eq!(parsed.flags.height, 8);
        assert_eq!(parsed.players.len(), 2);
        assert!(matches!(parsed.players[1], PlayerArg::Human));
    }

    #[test]
    fn tournament_defaults_match_the_spec() {
        let parsed = parse_tournament_args(args("")).unwrap();
        assert_eq!(parsed.directory, PathBuf::from("ai"));
        assert_eq!(parsed.players_per_match, 2);
        assert_eq!(parsed.rematches, 1);
        assert!(!parsed.log_to_file);
    }

    #[test]
    fn unrecognized_flag_is_rejected() {
        assert!(parse_match_args(args("--bogus")).is_err());
    }

    #[test]
    fn undersized_grid_is_rejected_before_it_reaches_the_board() {
        assert!(parse_match_args(args("-g 2 2 alice.py user")).is_err());
        assert!(parse_tournament_args(args("-g 3 4")).is_err());
    }
}
