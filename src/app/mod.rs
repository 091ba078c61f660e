mod autopilot;

pub use autopilot::Autopilot;

use crate::cli::CliOverrides;
use crate::config::AppConfig;
use crate::input::{InputEvent, SessionMode};
use crate::scheduler::{FrameScheduler, HeadlessRenderer, TickReport};
use crate::source::{FixtureSource, RandomSource, RecordSource};
use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const POPULATION_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    pub seed: u64,
    pub ticks: u64,
    pub simulated_seconds: f32,
    pub pops: u64,
    pub spawned: u64,
    pub replacements_filled: u64,
    pub replacements_failed: u64,
    pub peak_effects: usize,
    pub audio_cues: usize,
    pub final_entities: usize,
}

impl SessionSummary {
    fn absorb(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.simulated_seconds += report.delta;
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "popfield session (seed {})", self.seed)?;
        writeln!(f, "  ticks:        {} ({:.2}s simulated)", self.ticks, self.simulated_seconds)?;
        writeln!(f, "  pops:         {}", self.pops)?;
        writeln!(f, "  spawned:      {}", self.spawned)?;
        writeln!(f, "  replacements: {} filled, {} failed", self.replacements_filled, self.replacements_failed)?;
        writeln!(f, "  peak effects: {}", self.peak_effects)?;
        writeln!(f, "  audio cues:   {}", self.audio_cues)?;
        write!(f, "  entities:     {}", self.final_entities)
    }
}

pub fn run() -> Result<SessionSummary> {
    run_with_overrides(&CliOverrides::default())
}

/// Runs a headless immersive session driven by the autopilot.
pub fn run_with_overrides(cli: &CliOverrides) -> Result<SessionSummary> {
    let mut config = AppConfig::load_or_default(cli.config_path());
    config.apply_overrides(&cli.config_overrides());
    let seed = cli.seed().unwrap_or_else(rand::random);
    let source: Arc<dyn RecordSource> = match cli.records_path() {
        Some(path) => {
            let fixture = FixtureSource::load(path)?;
            log::info!("[app] serving {} record(s) from {}", fixture.len(), path.display());
            Arc::new(fixture)
        }
        None => {
            log::info!("[app] serving random records (seed {seed})");
            Arc::new(RandomSource::new(seed, config.fetch.batch_size))
        }
    };

    let mut scheduler = FrameScheduler::new(&config, source, seed);
    scheduler.push_input(InputEvent::Session { mode: SessionMode::Immersive });
    scheduler.request_initial_population();
    scheduler.lifecycle_mut().wait_for_fetches(POPULATION_WAIT);
    if scheduler.lifecycle().entity_count() == 0 {
        log::warn!("[app] no entities after the initial population; the session will idle");
    }

    let mut renderer = HeadlessRenderer::default();
    let mut autopilot = Autopilot::new(0);
    let mut summary = SessionSummary { seed, ..SessionSummary::default() };
    let dt = cli.dt();
    for _ in 0..cli.ticks() {
        autopilot.drive(&mut scheduler);
        let report = scheduler.step(dt, &mut renderer);
        summary.absorb(&report);
        summary.audio_cues += scheduler.take_audio_cues().len();
    }

    let stats = scheduler.lifecycle().stats();
    summary.pops = stats.popped;
    summary.spawned = stats.spawned;
    summary.replacements_filled = stats.replacements_filled;
    summary.replacements_failed = stats.replacements_failed;
    summary.peak_effects = renderer.peak_effects;
    summary.final_entities = scheduler.lifecycle().entity_count();
    Ok(summary)
}
