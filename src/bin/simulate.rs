use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use pacman_arena_server::constants::{
    PLAYERS_PER_MATCH, POWER_DURATION_SECONDS, STARTING_LIVES, TICK_RATE, TICK_SECONDS,
};
use pacman_arena_server::engine::{MatchEngine, PauseOutcome};
use pacman_arena_server::entity::MatchInputs;
use pacman_arena_server::level::{Level, Tile};
use pacman_arena_server::rng::Rng;
use pacman_arena_server::types::{Direction, KeyIntent, Snapshot};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run one headless match with random inputs")]
struct Cli {
    /// Simulated match length.
    #[arg(long, default_value_t = 120)]
    seconds: u32,
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long)]
    level: Option<PathBuf>,
    /// Ticks between random intent changes.
    #[arg(long, default_value_t = 15)]
    turn_every: u32,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    seed: u32,
    ticks: u64,
    #[serde(rename = "pelletsLeft")]
    pellets_left: usize,
    #[serde(rename = "powerPelletsLeft")]
    power_pellets_left: usize,
    scores: Vec<u32>,
    lives: i32,
    deaths: u32,
    #[serde(rename = "ghostsEaten")]
    ghosts_eaten: u32,
    #[serde(rename = "roundRestarts")]
    round_restarts: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let level = match &cli.level {
        Some(path) => {
            Level::load(path).with_context(|| format!("failed to load level {}", path.display()))?
        }
        None => Level::classic().context("failed to parse built-in level")?,
    };
    let seed = cli.seed.unwrap_or_else(rand::random::<u32>);
    info!(seed, seconds = cli.seconds, "simulation started");

    let (summary, records) = run_simulation(Arc::new(level), seed, cli.seconds, cli.turn_every);
    for record in &records {
        warn!(tick = record.tick, message = %record.message, "anomaly detected");
    }

    println!("{}", serde_json::to_string(&summary)?);
    if let Some(path) = cli.summary_out.as_ref() {
        write_summary(path, &summary)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
    }
    info!(
        ticks = summary.ticks,
        deaths = summary.deaths,
        anomalies = summary.anomalies.len(),
        "simulation finished"
    );

    if !summary.anomalies.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_simulation(
    level: Arc<Level>,
    seed: u32,
    seconds: u32,
    turn_every: u32,
) -> (RunSummary, Vec<AnomalyRecord>) {
    let mut engine = MatchEngine::new(level, seed);
    let mut rng = Rng::new(seed ^ 0x9e37_79b9);
    let inputs = MatchInputs::default();
    let total_ticks = u64::from(seconds) * u64::from(TICK_RATE);
    let turn_every = u64::from(turn_every.max(1));

    let mut deaths = 0;
    let mut ghosts_eaten = 0;
    let mut round_restarts = 0;
    let mut anomalies = Vec::new();
    let mut records = Vec::new();
    let mut seen = HashSet::new();

    engine.reset_round(true);
    while engine.tick() < total_ticks {
        if engine.tick() % turn_every == 0 {
            for entity in 0..PLAYERS_PER_MATCH {
                inputs.store(entity, random_intent(&mut rng));
            }
            engine.apply_inputs(&inputs);
        }

        engine.step(TICK_SECONDS);
        let snapshot = engine.build_snapshot();
        let (width, height) = (engine.grid().width(), engine.grid().height());
        for message in collect_snapshot_anomalies(&snapshot, width, height) {
            push_anomaly(&mut anomalies, &mut records, &mut seen, snapshot.tick, message);
        }

        if engine.is_paused() {
            ghosts_eaten += snapshot
                .entities
                .iter()
                .filter(|entity| entity.just_eaten == Some(true))
                .count() as u32;
            if engine.death() {
                deaths += 1;
            }
            if engine.finish_pause() == PauseOutcome::RoundRestart {
                round_restarts += 1;
                engine.reset_round(false);
            }
        }
    }

    let summary = RunSummary {
        seed,
        ticks: engine.tick(),
        pellets_left: engine.grid().count_tiles(Tile::Pellet),
        power_pellets_left: engine.grid().count_tiles(Tile::PowerPellet),
        scores: engine.scores().to_vec(),
        lives: engine.lives(),
        deaths,
        ghosts_eaten,
        round_restarts,
        anomalies,
    };
    (summary, records)
}

fn random_intent(rng: &mut Rng) -> KeyIntent {
    if rng.bool(0.1) {
        return KeyIntent::default();
    }
    KeyIntent::only(Direction::MOVES[rng.pick_index(Direction::MOVES.len())])
}

fn collect_snapshot_anomalies(snapshot: &Snapshot, width: i32, height: i32) -> Vec<String> {
    let mut anomalies = Vec::new();
    for (idx, entity) in snapshot.entities.iter().enumerate() {
        let inside = entity.x >= -0.5
            && entity.y >= -0.5
            && entity.x <= width as f32 - 0.5
            && entity.y <= height as f32 - 0.5;
        if !inside || !entity.x.is_finite() || !entity.y.is_finite() {
            anomalies.push(format!("entity {idx} left the grid"));
        }
    }

    if !(0..=STARTING_LIVES).contains(&snapshot.lives) {
        anomalies.push(format!("lives out of range: {}", snapshot.lives));
    }

    let mut slots = snapshot.player_map.clone();
    slots.sort_unstable();
    if slots != (0..PLAYERS_PER_MATCH).collect::<Vec<_>>() {
        anomalies.push(format!("player map is not a permutation: {:?}", snapshot.player_map));
    }

    if snapshot.pill_ms > (POWER_DURATION_SECONDS * 1000.0) as u64 {
        anomalies.push(format!("pill timer too long: {}ms", snapshot.pill_ms));
    }

    let bonus_steps = snapshot.bonus / 100;
    if snapshot.bonus % 100 != 0 || !bonus_steps.is_power_of_two() {
        anomalies.push(format!("unexpected bonus: {}", snapshot.bonus));
    }
    anomalies
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    records: &mut Vec<AnomalyRecord>,
    seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn classic() -> Arc<Level> {
        Arc::new(Level::classic().expect("classic level"))
    }

    #[test]
    fn same_seed_replays_identically() {
        let (a, _) = run_simulation(classic(), 42, 20, 10);
        let (b, _) = run_simulation(classic(), 42, 20, 10);
        assert_eq!(a.ticks, b.ticks);
        assert_eq!(a.scores, b.scores);
        assert_eq!(a.pellets_left, b.pellets_left);
        assert_eq!(a.deaths, b.deaths);
    }

    #[test]
    fn random_match_keeps_invariants() {
        for seed in [1, 7, 99] {
            let (summary, records) = run_simulation(classic(), seed, 60, 12);
            assert!(records.is_empty(), "seed {seed}: {:?}", summary.anomalies);
            assert_eq!(summary.ticks, 60 * u64::from(TICK_RATE));
            assert_eq!(summary.scores.len(), PLAYERS_PER_MATCH);
        }
    }

    #[test]
    fn fresh_snapshot_has_no_anomalies() {
        let mut engine = MatchEngine::new(classic(), 5);
        engine.reset_round(true);
        let snapshot = engine.build_snapshot();
        assert!(collect_snapshot_anomalies(&snapshot, 28, 31).is_empty());

        let mut broken = snapshot.clone();
        broken.lives = 7;
        broken.player_map = vec![0, 0, 1, 2, 3];
        broken.bonus = 300;
        assert_eq!(collect_snapshot_anomalies(&broken, 28, 31).len(), 3);
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let target = std::env::temp_dir()
            .join(format!("pacman-arena-missing-{now}"))
            .join("summary.json");
        let (summary, _) = run_simulation(classic(), 3, 1, 5);
        assert!(write_summary(&target, &summary).is_err());
    }

    #[test]
    fn push_anomaly_keeps_records_and_deduplicates_summary_messages() {
        let mut anomalies = Vec::new();
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        push_anomaly(&mut anomalies, &mut records, &mut seen, 10, "same".to_string());
        push_anomaly(&mut anomalies, &mut records, &mut seen, 11, "same".to_string());

        assert_eq!(anomalies.len(), 1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].tick, 11);
    }
}
