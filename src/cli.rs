use crate::config::AppConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_PATH: &str = "config/app.json";
pub const DEFAULT_TICKS: u64 = 600;
pub const DEFAULT_DT: f32 = 1.0 / 60.0;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CliOverrides {
    config: Option<PathBuf>,
    records: Option<PathBuf>,
    ticks: Option<u64>,
    dt: Option<f32>,
    seed: Option<u64>,
    max_retries: Option<u32>,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            let Some(key) = flag.strip_prefix("--") else {
                bail!("Unexpected argument '{flag}'. Flags take the form --name <value>.");
            };
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "config" => overrides.config = Some(PathBuf::from(value)),
                "records" => overrides.records = Some(PathBuf::from(value)),
                "ticks" => {
                    overrides.ticks =
                        Some(value.parse::<u64>().with_context(|| format!("Invalid tick count '{value}'"))?);
                }
                "dt" => {
                    let dt = value.parse::<f32>().with_context(|| format!("Invalid dt '{value}'"))?;
                    if !dt.is_finite() || dt <= 0.0 {
                        bail!("Invalid dt '{value}'. Use a positive number of seconds.");
                    }
                    overrides.dt = Some(dt);
                }
                "seed" => {
                    overrides.seed = Some(value.parse::<u64>().with_context(|| format!("Invalid seed '{value}'"))?);
                }
                "max-retries" => {
                    overrides.max_retries =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid max-retries '{value}'"))?);
                }
                _ => bail!(
                    "Unknown flag '{flag}'. Supported flags: --config, --records, --ticks, --dt, --seed, --max-retries."
                ),
            }
        }
        Ok(overrides)
    }

    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn records_path(&self) -> Option<&PathBuf> {
        self.records.as_ref()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.unwrap_or(DEFAULT_TICKS)
    }

    pub fn dt(&self) -> f32 {
        self.dt.unwrap_or(DEFAULT_DT)
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn config_overrides(&self) -> AppConfigOverrides {
        AppConfigOverrides { max_retries: self.max_retries }
    }
}
