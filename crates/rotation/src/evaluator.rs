//! Champion evaluation for paused testing campaigns.
//!
//! Every challenger is compared against the control's conversions scaled by
//! a threshold drawn independently per candidate from the configured band.
//! Challengers close to the control may land either way; this is not a
//! significance test.

use crate::queue::ChampionQueue;
use crate::random::{RandomSource, ThreadRandom};
use campaign_core::config::EvaluationConfig;
use campaign_core::error::{CampaignError, CampaignResult};
use campaign_core::types::CampaignStatus;
use campaign_management::EntityStore;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Per-candidate record of how the accept rule was applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateDecision {
    pub ad_group_id: String,
    pub conversions: u64,
    pub threshold: f64,
    pub required_conversions: f64,
    pub champion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationOutcome {
    pub campaign_id: String,
    pub control_ad_group_id: String,
    pub control_conversions: u64,
    /// Accepted ad groups in membership order.
    pub champions: Vec<String>,
    pub decisions: Vec<CandidateDecision>,
    pub queue_size: usize,
}

pub struct ChampionEvaluator {
    store: Arc<EntityStore>,
    queue: Arc<ChampionQueue>,
    config: EvaluationConfig,
    rng: Mutex<Box<dyn RandomSource>>,
}

impl ChampionEvaluator {
    pub fn new(
        store: Arc<EntityStore>,
        queue: Arc<ChampionQueue>,
        config: EvaluationConfig,
    ) -> Self {
        Self::with_random(store, queue, config, Box::new(ThreadRandom))
    }

    pub fn with_random(
        store: Arc<EntityStore>,
        queue: Arc<ChampionQueue>,
        config: EvaluationConfig,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        Self {
            store,
            queue,
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Evaluate a paused testing campaign and enqueue its champions.
    ///
    /// Reads campaign and ad-group records only; the queue is the sole
    /// state that changes.
    pub fn evaluate(&self, campaign_id: &str) -> CampaignResult<EvaluationOutcome> {
        let campaign = self
            .store
            .get_campaign(campaign_id)
            .ok_or_else(|| CampaignError::not_found("Campaign", campaign_id))?;

        if !campaign.is_testing() {
            return Err(CampaignError::InvalidState(format!(
                "campaign '{campaign_id}' is {}, only TESTING campaigns can be evaluated",
                campaign.campaign_type
            )));
        }
        if campaign.status != CampaignStatus::Paused {
            return Err(CampaignError::InvalidState(format!(
                "testing campaign '{campaign_id}' must be PAUSED for evaluation (currently {})",
                campaign.status
            )));
        }

        let members = self.store.resolve_members(&campaign);
        let control = members
            .iter()
            .find(|ag| ag.is_control)
            .ok_or_else(|| {
                CampaignError::ControlGroupMissing(format!(
                    "testing campaign '{campaign_id}' has no control ad group"
                ))
            })?;
        let control_conversions = control.performance.conversions;

        let band = self.config.threshold_band;
        let mut decisions = Vec::new();
        {
            let mut rng = self.rng.lock();
            for candidate in members.iter().filter(|ag| !ag.is_control) {
                let threshold = rng.uniform(band.low, band.high);
                let required = control_conversions as f64 * threshold;
                let conversions = candidate.performance.conversions;
                let champion = conversions as f64 >= required;
                debug!(
                    ad_group_id = %candidate.id,
                    conversions,
                    threshold,
                    champion,
                    "candidate evaluated"
                );
                decisions.push(CandidateDecision {
                    ad_group_id: candidate.id.clone(),
                    conversions,
                    threshold,
                    required_conversions: required,
                    champion,
                });
            }
        }

        let champions: Vec<String> = decisions
            .iter()
            .filter(|d| d.champion)
            .map(|d| d.ad_group_id.clone())
            .collect();
        for id in &champions {
            self.queue.enqueue(id, campaign_id);
        }
        let queue_size = self.queue.size();

        info!(
            campaign_id,
            candidates = decisions.len(),
            champions = champions.len(),
            queue_size,
            "testing campaign evaluated"
        );

        Ok(EvaluationOutcome {
            campaign_id: campaign_id.to_string(),
            control_ad_group_id: control.id.clone(),
            control_conversions,
            champions,
            decisions,
            queue_size,
        })
    }
}
