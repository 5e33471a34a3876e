use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use itertools::Itertools;
use tokio::sync::Semaphore;

use crate::error::Res;
use crate::match_engine::{run_match, MatchConfig, MatchResult};
use crate::player::{PlayerAdapter, PlayerSpec};
use crate::render::{render_end, render_score_line};

/// The allowed program extensions from §4.5 / `tourney.py`'s `ALLOWED_EXTENSIONS`.
const ALLOWED_EXTENSIONS: [&str; 5] = ["py", "js", "class", "out", ""];

/// Bounds concurrent match executions; each match may itself launch up to `N` children, so total
/// concurrent subprocesses is bounded by `C * N` (§4.5, §5).
pub const MAX_PARALLEL_MATCHES: usize = 200;

pub struct TournamentConfig {
    pub directory: PathBuf,
    pub players_per_match: usize,
    pub rematches: usize,
    pub match_config_template: MatchConfig,
}

pub struct TournamentReport {
    pub scores: Vec<(String, i64)>,
    pub total_matches: usize,
    pub log_lines: Vec<String>,
}

/// Discovers player programs under `dir`, filtering by the allowed extensions and skipping
/// dotfiles (§4.5 step 1).
pub fn discover_programs(dir: &Path) -> Res<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let file_name = path.file_name().and_then(|s| s.to_str()).unwrap_or_default();
        if file_name.starts_with('.') {
            continue;
        }
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        if ALLOWED_EXTENSIONS.contains(&ext) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

fn basename(path: &Path) -> String {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string()
}

/// Enumerates match-ups (§4.5 step 3): every unordered combination of `N` programs, every
/// permutation of that combination, repeated `R` times.
fn enumerate_matchups(programs: &[PathBuf], n: usize, rematches: usize) -> Vec<Vec<PathBuf>> {
    let mut matchups = Vec::new();
    for combo in programs.iter().cloned().combinations(n) {
        for perm in combo.into_iter().permutations(n) {
            for _ in 0..rematches {
                matchups.push(perm.clone());
            }
        }
    }
    matchups
}

/// Runs the full round-robin tournament described in §4.5: discovers programs, enumerates
/// match-ups, runs them under a bounded semaphore, and aggregates the score table.
pub async fn run_tournament(config: TournamentConfig) -> Res<TournamentReport> {
    let programs = discover_programs(&config.directory)?;
    let mut scores: HashMap<String, i64> = HashMap::new();
    for program in &programs {
        scores.insert(basename(program), 0);
    }

    let matchups = enumerate_matchups(&programs, config.players_per_match, config.rematches);
    let total = matchups.len();
    let semaphore = Arc::new(Semaphore::new(MAX_PARALLEL_MATCHES));

    let mut tasks = Vec::with_capacity(total);
    for matchup in matchups {
        let semaphore = semaphore.clone();
        let width = config.match_config_template.width;
        let height = config.match_config_template.height;
        let emoji = config.match_config_template.emoji;
        tasks.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore is never closed");
            let players: Vec<PlayerAdapter> = matchup
                .iter()
                .enumerate()
                .map(|(i, path)| {
                    let spec = PlayerSpec::subprocess(i as u32 + 1, basename(path), path.clone());
                    PlayerAdapter::subprocess(spec, crate::channel::DEFAULT_DEADLINE, false)
                })
                .collect();
            let names: Vec<String> = matchup.iter().map(|p| basename(p)).collect();
            let result = run_match(players, MatchConfig { width, height, silent: true, emoji }).await;
            (names, result)
        }));
    }

    let mut log_lines = Vec::with_capacity(total);
    for (i, task) in tasks.into_iter().enumerate() {
        let (names, result): (Vec<String>, MatchResult) = task.await.expect("match task panicked");
        // `display_name` for a subprocess player is already its basename (see the spawn above).
        let winner_name = result
            .winner
            .and_then(|no| result.participants.iter().find(|p| p.no == no).map(|p| p.display_name.clone()));
        if let Some(name) = &winner_name {
            *scores.entry(name.clone()).or_insert(0) += 1;
        }
        let errors_by_name: HashMap<String, _> = result
            .errors
            .iter()
            .filter_map(|(no, kind)| {
                result.participants.iter().find(|p| p.no == *no).map(|p| (p.display_name.clone(), *kind))
            })
            .collect();
        let end_line = render_end(winner_name.as_deref(), &errors_by_name, true);
        log_lines.push(format!("({}/{total}) {} -> {end_line}", i + 1, names.join(" vs ")));
    }

    let mut scoreboard: Vec<(String, i64)> = scores.into_iter().collect();
    scoreboard.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    Ok(TournamentReport { scores: scoreboard, total_matches: total, log_lines })
}

/// Formats the final ranking, one line per entry (§4.5 step 6, §4.6).
pub fn render_scoreboard(report: &TournamentReport) -> String {
    report
        .scores
        .iter()
        .enumerate()
        .map(|(i, (name, score))| render_score_line(i + 1, name, *score))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matchup_count_matches_permutations_times_rematches() {
        let programs: Vec<PathBuf> = vec!["a", "b", "c"].into_iter().map(PathBuf::from).collect();
        let matchups = enumerate_matchups(&programs, 2, 3);
        // P(3, 2) = 6 permutations, times 3 rematches = 18
        assert_eq!(matchups.len(), 18);
    }

    #[test]
    fn two_player_pool_with_rematches_produces_four_matches() {
        // scenario S5: pool {X, Y}, permutations (X,Y),(Y,X), each run twice -> 4 matches
        let programs: Vec<PathBuf> = vec!["X", "Y"].into_iter().map(PathBuf::from).collect();
        let matchups = enumerate_matchups(&programs, 2, 2);
        assert_eq!(matchups.len(), 4);
    }

    #[test]
    fn discover_programs_ignores_dotfiles_and_bad_extensions() {
        let dir = std::env::temp_dir().join(format!("umpire-discover-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("alice.py"), "").unwrap();
        std::fs::write(dir.join(".hidden.py"), "").unwrap();
        std::fs::write(dir.join("notes.txt"), "").unwrap();
        std::fs::write(dir.join("bob"), "").unwrap();
        let found = discover_programs(&dir).unwrap();
        let names: Vec<String> = found.iter().map(|p| p.file_name().unwrap().to_str().unwrap().to_string()).collect();
        assert!(names.contains(&"alice.py".to_string()));
        assert!(names.contains(&"bob".to_string()));
        assert!(!names.contains(&".hidden.py".to_string()));
        assert!(!names.contains(&"notes.txt".to_string()));
    }
}
