//! Transport-independent facade over the store, simulator, evaluator,
//! queue and rotation engine.
//!
//! Every call returns either its payload or an `ErrorResponse` carrying the
//! error kind and message, so any boundary (HTTP, CLI) can forward it as is.

use crate::engine::{RotationEngine, RotationOutcome};
use crate::evaluator::{ChampionEvaluator, EvaluationOutcome};
use crate::queue::ChampionQueue;
use crate::random::{RandomSource, ThreadRandom};
use crate::simulator::{PerformanceSimulator, SimulationTarget};
use campaign_core::config::AppConfig;
use campaign_core::error::{CampaignError, CampaignResult};
use campaign_core::types::*;
use campaign_management::models::*;
use campaign_management::{EntityStore, StoreSnapshot};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

pub type ServiceResult<T> = Result<T, ErrorResponse>;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueueStatus {
    pub entries: Vec<QueueEntry>,
    pub size: usize,
}

pub struct RotationService {
    store: Arc<EntityStore>,
    queue: Arc<ChampionQueue>,
    simulator: PerformanceSimulator,
    evaluator: ChampionEvaluator,
    engine: RotationEngine,
}

impl RotationService {
    /// Build a service over a fresh store, seeded when `seed.demo_data` is set.
    pub fn new(config: &AppConfig) -> Self {
        let store = if config.seed.demo_data {
            EntityStore::with_demo_data(&config.seed)
        } else {
            EntityStore::new()
        };
        Self::with_store(Arc::new(store), config)
    }

    pub fn with_store(store: Arc<EntityStore>, config: &AppConfig) -> Self {
        Self::with_random(store, config, Box::new(ThreadRandom), Box::new(ThreadRandom))
    }

    /// Inject separate random sources for the simulator and the evaluator.
    pub fn with_random(
        store: Arc<EntityStore>,
        config: &AppConfig,
        simulation_rng: Box<dyn RandomSource>,
        evaluation_rng: Box<dyn RandomSource>,
    ) -> Self {
        let queue = Arc::new(ChampionQueue::new());
        Self {
            simulator: PerformanceSimulator::with_random(
                store.clone(),
                config.simulation.clone(),
                simulation_rng,
            ),
            evaluator: ChampionEvaluator::with_random(
                store.clone(),
                queue.clone(),
                config.evaluation.clone(),
                evaluation_rng,
            ),
            engine: RotationEngine::new(store.clone(), queue.clone(), config.rotation.clone()),
            store,
            queue,
        }
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    // ─── Campaigns ─────────────────────────────────────────────────────────

    pub fn list_campaigns(&self, filter: &CampaignFilter) -> Vec<Campaign> {
        self.store.list_campaigns(filter)
    }

    pub fn get_campaign(&self, id: &str) -> ServiceResult<Campaign> {
        respond(
            "get_campaign",
            self.store
                .get_campaign(id)
                .ok_or_else(|| CampaignError::not_found("Campaign", id)),
        )
    }

    pub fn create_campaign(&self, req: CreateCampaignRequest) -> ServiceResult<Campaign> {
        let result = respond("create_campaign", self.store.create_campaign(req))?;
        metrics::counter!("management.campaigns.created").increment(1);
        Ok(result)
    }

    pub fn update_campaign_status(&self, id: &str, status: &str) -> ServiceResult<Campaign> {
        let result = respond("update_campaign_status", self.store.update_status(id, status))?;
        metrics::counter!("management.campaigns.status_updates").increment(1);
        Ok(result)
    }

    // ─── Assets, creatives, groups ─────────────────────────────────────────

    pub fn upload_asset(&self, req: UploadAssetRequest) -> ServiceResult<Asset> {
        let asset = respond("upload_asset", self.store.upload_asset(req))?;
        metrics::counter!("management.assets.uploaded").increment(1);
        Ok(asset)
    }

    pub fn get_asset(&self, id: &str) -> ServiceResult<Asset> {
        respond(
            "get_asset",
            self.store
                .get_asset(id)
                .ok_or_else(|| CampaignError::not_found("Asset", id)),
        )
    }

    pub fn create_creative(&self, req: CreateCreativeRequest) -> ServiceResult<Creative> {
        let creative = respond("create_creative", self.store.create_creative(req))?;
        metrics::counter!("management.creatives.created").increment(1);
        Ok(creative)
    }

    pub fn list_creatives(&self, filter: &CreativeFilter) -> Vec<Creative> {
        self.store.list_creatives(filter)
    }

    pub fn set_creative_status(&self, id: &str, status: EntityStatus) -> ServiceResult<Creative> {
        respond("set_creative_status", self.store.set_creative_status(id, status))
    }

    pub fn create_creative_group(
        &self,
        req: CreateCreativeGroupRequest,
    ) -> ServiceResult<CreativeGroup> {
        let group = respond("create_creative_group", self.store.create_creative_group(req))?;
        metrics::counter!("management.creative_groups.created").increment(1);
        Ok(group)
    }

    pub fn list_creative_groups(&self, filter: &CreativeGroupFilter) -> Vec<CreativeGroup> {
        self.store.list_creative_groups(filter)
    }

    /// Attach creative groups to a campaign, materializing one ad group each.
    pub fn attach_creative_groups(
        &self,
        campaign_id: &str,
        creative_group_ids: &[String],
    ) -> ServiceResult<Vec<AdGroup>> {
        let created = respond(
            "attach_creative_groups",
            self.store.attach_creative_groups(campaign_id, creative_group_ids),
        )?;
        metrics::counter!("management.ad_groups.created").increment(created.len() as u64);
        Ok(created)
    }

    pub fn list_ad_groups(&self, filter: &AdGroupFilter) -> Vec<AdGroup> {
        self.store.list_ad_groups(filter)
    }

    pub fn get_ad_group_performance(&self, ad_group_id: &str) -> ServiceResult<Performance> {
        respond(
            "get_ad_group_performance",
            self.store
                .get_ad_group(ad_group_id)
                .map(|ag| ag.performance)
                .ok_or_else(|| CampaignError::not_found("AdGroup", ad_group_id)),
        )
    }

    // ─── Simulation, evaluation, rotation ──────────────────────────────────

    pub fn simulate_performance(
        &self,
        target: &SimulationTarget,
    ) -> ServiceResult<BTreeMap<String, Performance>> {
        let results = respond("simulate_performance", self.simulator.simulate(target))?;
        metrics::counter!("rotation.simulations").increment(1);
        Ok(results)
    }

    pub fn evaluate_testing_campaign(&self, campaign_id: &str) -> ServiceResult<EvaluationOutcome> {
        let outcome = respond("evaluate_testing_campaign", self.evaluator.evaluate(campaign_id))?;
        metrics::counter!("rotation.evaluations").increment(1);
        metrics::counter!("rotation.champions.enqueued").increment(outcome.champions.len() as u64);
        Ok(outcome)
    }

    /// Manually put an existing ad group in the waiting line. Controls and
    /// ad groups already deployed in a regular campaign are refused.
    pub fn submit_champion(&self, ad_group_id: &str) -> ServiceResult<QueueStatus> {
        let result: CampaignResult<AdGroup> = match self.store.get_ad_group(ad_group_id) {
            None => Err(CampaignError::not_found("AdGroup", ad_group_id)),
            Some(ag) if ag.is_control => Err(CampaignError::InvalidState(format!(
                "control ad group '{ad_group_id}' cannot be submitted as a champion"
            ))),
            Some(ag)
                if self
                    .store
                    .get_campaign(&ag.campaign_id)
                    .is_some_and(|owner| owner.is_regular()) =>
            {
                Err(CampaignError::InvalidState(format!(
                    "ad group '{ad_group_id}' is already deployed in regular campaign '{}'",
                    ag.campaign_id
                )))
            }
            Some(ag) => Ok(ag),
        };
        let ad_group = respond("submit_champion", result)?;
        let size = self.queue.enqueue(&ad_group.id, &ad_group.campaign_id);
        metrics::counter!("rotation.champions.enqueued").increment(1);
        info!(ad_group_id, queue_size = size, "champion submitted");
        Ok(self.champion_queue_status())
    }

    pub fn champion_queue_status(&self) -> QueueStatus {
        let entries = self.queue.peek_all();
        QueueStatus {
            size: entries.len(),
            entries,
        }
    }

    pub fn replace_worst(&self, campaign_id: &str) -> ServiceResult<RotationOutcome> {
        let outcome = respond("replace_worst", self.engine.replace_worst(campaign_id))?;
        metrics::counter!("rotation.replacements").increment(1);
        Ok(outcome)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }
}

fn respond<T>(operation: &'static str, result: CampaignResult<T>) -> ServiceResult<T> {
    result.map_err(|err| {
        let kind = err.kind();
        warn!(operation, kind = %kind, error = %err, "operation failed");
        metrics::counter!("rotation.errors", "kind" => kind.as_str()).increment(1);
        ErrorResponse::from(err)
    })
}
