//! Campaign Rotator: drives the mock creative-testing workflow end to end.
//! Upload concepts, test them against the control, queue champions and
//! rotate them into regular campaigns.

use anyhow::anyhow;
use campaign_core::config::AppConfig;
use campaign_core::types::{CampaignType, MediaType, Orientation, VideoProperty};
use campaign_management::models::*;
use campaign_management::EntityStore;
use campaign_rotation::{
    EvaluationOutcome, RotationOutcome, RotationService, SeededRandom, ServiceResult,
    SimulationTarget, ThreadRandom,
};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "campaign-rotator")]
#[command(about = "Creative testing and champion rotation against a mock ad backend")]
#[command(version)]
struct Cli {
    /// TOML config file (environment variables still override it)
    #[arg(long, env = "CAMPAIGN_ROTATION_CONFIG")]
    config: Option<String>,

    /// Emit JSON logs instead of human-readable ones
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Write the Prometheus rendering of the run's counters to stderr on exit
    #[arg(long, default_value_t = false)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full concept -> test -> evaluate -> rotate workflow
    Demo {
        /// Number of new creative concepts to upload
        #[arg(long, default_value_t = 3)]
        concepts: usize,

        /// Seed the simulator and evaluator for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Write the final store snapshot to this file
        #[arg(long)]
        snapshot: Option<String>,
    },

    /// Print the seeded campaigns
    Campaigns,
}

#[derive(Serialize)]
struct DemoReport {
    evaluation: EvaluationOutcome,
    rotations: Vec<RotationReport>,
    queue_remaining: usize,
    campaigns: Vec<campaign_core::types::Campaign>,
}

#[derive(Serialize)]
struct RotationReport {
    campaign_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<RotationOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorResponse>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);
    let prometheus = PrometheusBuilder::new().install_recorder()?;

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            AppConfig::default()
        }),
    };

    info!(
        threshold_low = config.evaluation.threshold_band.low,
        threshold_high = config.evaluation.threshold_band.high,
        impressions_goal = config.simulation.default_impressions_goal,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Demo {
            concepts,
            seed,
            snapshot,
        } => run_demo(&config, concepts, seed, snapshot.as_deref())?,
        Commands::Campaigns => {
            let service = RotationService::new(&config);
            let campaigns = service.list_campaigns(&CampaignFilter::default());
            println!("{}", serde_json::to_string_pretty(&campaigns)?);
        }
    }

    if cli.print_metrics {
        eprintln!("{}", prometheus.render());
    }
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "campaign_rotator=info,campaign_rotation=info,campaign_management=info".into()
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run_demo(
    config: &AppConfig,
    concepts: usize,
    seed: Option<u64>,
    snapshot_path: Option<&str>,
) -> anyhow::Result<()> {
    let store = Arc::new(EntityStore::with_demo_data(&config.seed));
    let service = match seed {
        Some(seed) => RotationService::with_random(
            store,
            config,
            Box::new(SeededRandom::new(seed)),
            Box::new(SeededRandom::new(seed.wrapping_add(1))),
        ),
        None => RotationService::with_random(
            store,
            config,
            Box::new(ThreadRandom),
            Box::new(ThreadRandom),
        ),
    };
    let testing_id = config.seed.testing_campaign_id.as_str();

    let mut group_ids = Vec::with_capacity(concepts);
    for i in 0..concepts {
        group_ids.push(upload_concept(&service, &format!("New_Concept_{i}"))?);
    }
    let attached = check(service.attach_creative_groups(testing_id, &group_ids))?;
    info!(
        campaign_id = testing_id,
        attached = attached.len(),
        "Concepts attached to testing campaign"
    );

    check(service.update_campaign_status(testing_id, "RUNNING"))?;
    check(service.simulate_performance(&SimulationTarget::Campaign(testing_id.to_string())))?;
    check(service.update_campaign_status(testing_id, "PAUSED"))?;

    let evaluation = check(service.evaluate_testing_campaign(testing_id))?;
    info!(
        champions = evaluation.champions.len(),
        queue_size = evaluation.queue_size,
        "Evaluation complete"
    );

    let regular = service.list_campaigns(&CampaignFilter {
        campaign_type: Some(CampaignType::Regular),
        ..Default::default()
    });
    let mut rotations = Vec::new();
    for campaign in regular {
        let target = SimulationTarget::Campaign(campaign.id.clone());
        if let Err(e) = service.simulate_performance(&target) {
            warn!(campaign_id = %campaign.id, error = %e.message, "Simulation skipped");
        }
        let report = match service.replace_worst(&campaign.id) {
            Ok(outcome) => RotationReport {
                campaign_id: campaign.id,
                outcome: Some(outcome),
                error: None,
            },
            Err(e) => RotationReport {
                campaign_id: campaign.id,
                outcome: None,
                error: Some(e),
            },
        };
        rotations.push(report);
    }

    let report = DemoReport {
        evaluation,
        rotations,
        queue_remaining: service.champion_queue_status().size,
        campaigns: service.list_campaigns(&CampaignFilter::default()),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(path) = snapshot_path {
        std::fs::write(path, service.store().to_json()?)?;
        info!(path, "Snapshot written");
    }
    Ok(())
}

/// Upload a portrait and a landscape video and group them into one concept.
fn upload_concept(service: &RotationService, name: &str) -> anyhow::Result<String> {
    let mut creative_ids = Vec::new();
    for (orientation, label) in [
        (Orientation::Portrait, "portrait"),
        (Orientation::Landscape, "landscape"),
    ] {
        let asset = check(service.upload_asset(UploadAssetRequest {
            file_name: format!("{name}_{label}.mp4"),
            content_type: "video/mp4".to_string(),
        }))?;
        let creative = check(service.create_creative(CreateCreativeRequest {
            ad_account_id: "demo_ad_account".to_string(),
            product_id: "demo_product".to_string(),
            title: format!("{name} {label}"),
            media_type: MediaType::Video,
            orientation,
            asset_id: asset.id,
            video_property: Some(VideoProperty { auto_endcard: true }),
        }))?;
        creative_ids.push(creative.id);
    }
    let group = check(service.create_creative_group(CreateCreativeGroupRequest {
        title: format!("{name}_CG"),
        description: String::new(),
        creative_ids,
        is_control: false,
    }))?;
    Ok(group.id)
}

fn check<T>(result: ServiceResult<T>) -> anyhow::Result<T> {
    result.map_err(|e| anyhow!("{}: {}", e.error, e.message))
}
