use crate::error::{CampaignError, CampaignResult};
use serde::{Deserialize, Serialize};

/// Root application configuration. Loaded from environment variables
/// with the prefix `CAMPAIGN_ROTATION__` and an optional TOML config file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub rotation: RotationConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

/// Closed interval `[low, high]` a uniform sample is drawn from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct UniformRange {
    pub low: f64,
    pub high: f64,
}

impl UniformRange {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn validate(&self, name: &str) -> CampaignResult<()> {
        if !self.low.is_finite() || !self.high.is_finite() {
            return Err(CampaignError::Config(format!("{name}: bounds must be finite")));
        }
        if self.low < 0.0 {
            return Err(CampaignError::Config(format!(
                "{name}: low bound {} is negative",
                self.low
            )));
        }
        if self.low > self.high {
            return Err(CampaignError::Config(format!(
                "{name}: low bound {} exceeds high bound {}",
                self.low, self.high
            )));
        }
        Ok(())
    }
}

/// Inclusive integer interval used for regular-campaign increments.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountRange {
    pub low: u64,
    pub high: u64,
}

impl CountRange {
    pub const fn new(low: u64, high: u64) -> Self {
        Self { low, high }
    }
}

// ─── Simulation Config ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_impressions_goal")]
    pub default_impressions_goal: u64,
    #[serde(default = "default_testing_conversion_rate")]
    pub testing_conversion_rate: UniformRange,
    #[serde(default = "default_regular_impressions_increment")]
    pub regular_impressions_increment: CountRange,
    #[serde(default = "default_regular_conversions_increment")]
    pub regular_conversions_increment: CountRange,
    /// Campaign-level simulation only touches RUNNING campaigns.
    #[serde(default = "default_only_running")]
    pub only_running: bool,
}

fn default_impressions_goal() -> u64 {
    10_000
}
fn default_testing_conversion_rate() -> UniformRange {
    UniformRange::new(0.005, 0.015)
}
fn default_regular_impressions_increment() -> CountRange {
    CountRange::new(1_000, 5_000)
}
fn default_regular_conversions_increment() -> CountRange {
    CountRange::new(10, 50)
}
fn default_only_running() -> bool {
    true
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            default_impressions_goal: default_impressions_goal(),
            testing_conversion_rate: default_testing_conversion_rate(),
            regular_impressions_increment: default_regular_impressions_increment(),
            regular_conversions_increment: default_regular_conversions_increment(),
            only_running: default_only_running(),
        }
    }
}

// ─── Evaluation Config ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationConfig {
    /// Each challenger is compared against `control * uniform(band)`.
    #[serde(default = "default_threshold_band")]
    pub threshold_band: UniformRange,
}

fn default_threshold_band() -> UniformRange {
    UniformRange::new(0.8, 1.2)
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            threshold_band: default_threshold_band(),
        }
    }
}

// ─── Rotation Config ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RotationConfig {
    /// When non-empty, only these REGULAR campaigns may be rotated.
    #[serde(default)]
    pub eligible_campaign_ids: Vec<String>,
}

impl RotationConfig {
    pub fn allows(&self, campaign_id: &str) -> bool {
        self.eligible_campaign_ids.is_empty()
            || self.eligible_campaign_ids.iter().any(|id| id == campaign_id)
    }
}

// ─── Seed Config ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    #[serde(default = "default_demo_data")]
    pub demo_data: bool,
    #[serde(default = "default_testing_campaign_id")]
    pub testing_campaign_id: String,
    #[serde(default = "default_regular_campaign_ids")]
    pub regular_campaign_ids: Vec<String>,
    #[serde(default = "default_control_creative_group_id")]
    pub control_creative_group_id: String,
    #[serde(default = "default_control_performance")]
    pub control_conversions: u64,
}

fn default_demo_data() -> bool {
    true
}
fn default_testing_campaign_id() -> String {
    "creative_testing_campaign".to_string()
}
fn default_regular_campaign_ids() -> Vec<String> {
    vec!["regular_campaign_a".to_string(), "regular_campaign_b".to_string()]
}
fn default_control_creative_group_id() -> String {
    "good_creative_group".to_string()
}
fn default_control_performance() -> u64 {
    200
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            demo_data: default_demo_data(),
            testing_campaign_id: default_testing_campaign_id(),
            regular_campaign_ids: default_regular_campaign_ids(),
            control_creative_group_id: default_control_creative_group_id(),
            control_conversions: default_control_performance(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> CampaignResult<Self> {
        Self::build(None)
    }

    /// Load a TOML file, then let environment variables override it.
    pub fn load_from(path: &str) -> CampaignResult<Self> {
        Self::build(Some(path))
    }

    fn build(path: Option<&str>) -> CampaignResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("CAMPAIGN_ROTATION")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("rotation.eligible_campaign_ids")
                .with_list_parse_key("seed.regular_campaign_ids"),
        );

        let cfg: AppConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| CampaignError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> CampaignResult<()> {
        self.simulation
            .testing_conversion_rate
            .validate("simulation.testing_conversion_rate")?;
        self.evaluation
            .threshold_band
            .validate("evaluation.threshold_band")?;
        for (name, range) in [
            (
                "simulation.regular_impressions_increment",
                self.simulation.regular_impressions_increment,
            ),
            (
                "simulation.regular_conversions_increment",
                self.simulation.regular_conversions_increment,
            ),
        ] {
            if range.low > range.high {
                return Err(CampaignError::Config(format!(
                    "{name}: low bound {} exceeds high bound {}",
                    range.low, range.high
                )));
            }
        }
        Ok(())
    }
}
