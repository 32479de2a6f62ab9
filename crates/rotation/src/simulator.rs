//! Synthetic performance feed standing in for real campaign analytics.

use crate::random::{RandomSource, ThreadRandom};
use campaign_core::config::SimulationConfig;
use campaign_core::error::{CampaignError, CampaignResult};
use campaign_core::types::{Campaign, CampaignStatus, CampaignType, Performance};
use campaign_management::EntityStore;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// What to simulate: a single ad group or every member of a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SimulationTarget {
    AdGroup(String),
    Campaign(String),
}

pub struct PerformanceSimulator {
    store: Arc<EntityStore>,
    config: SimulationConfig,
    rng: Mutex<Box<dyn RandomSource>>,
}

impl PerformanceSimulator {
    pub fn new(store: Arc<EntityStore>, config: SimulationConfig) -> Self {
        Self::with_random(store, config, Box::new(ThreadRandom))
    }

    pub fn with_random(
        store: Arc<EntityStore>,
        config: SimulationConfig,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        Self {
            store,
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn simulate(
        &self,
        target: &SimulationTarget,
    ) -> CampaignResult<BTreeMap<String, Performance>> {
        match target {
            SimulationTarget::AdGroup(id) => {
                let performance = self.simulate_ad_group(id)?;
                Ok(BTreeMap::from([(id.clone(), performance)]))
            }
            SimulationTarget::Campaign(id) => self.simulate_campaign(id),
        }
    }

    /// Overwrite one ad group's counters according to its owning campaign.
    pub fn simulate_ad_group(&self, ad_group_id: &str) -> CampaignResult<Performance> {
        let ad_group = self
            .store
            .get_ad_group(ad_group_id)
            .ok_or_else(|| CampaignError::not_found("AdGroup", ad_group_id))?;
        let campaign = self
            .store
            .get_campaign(&ad_group.campaign_id)
            .ok_or_else(|| CampaignError::not_found("Campaign", ad_group.campaign_id.clone()))?;

        let performance = self.next_performance(&campaign, ad_group.performance);
        self.store.set_ad_group_performance(ad_group_id, performance)?;
        debug!(
            ad_group_id,
            impressions = performance.impressions,
            conversions = performance.conversions,
            "ad group performance simulated"
        );
        Ok(performance)
    }

    /// Simulate every resolvable member of a campaign. With `only_running`
    /// set, a campaign that is not RUNNING reports its counters untouched.
    pub fn simulate_campaign(
        &self,
        campaign_id: &str,
    ) -> CampaignResult<BTreeMap<String, Performance>> {
        let campaign = self
            .store
            .get_campaign(campaign_id)
            .ok_or_else(|| CampaignError::not_found("Campaign", campaign_id))?;
        let members = self.store.resolve_members(&campaign);

        if self.config.only_running && campaign.status != CampaignStatus::Running {
            debug!(
                campaign_id,
                status = %campaign.status,
                "campaign not running, counters unchanged"
            );
            return Ok(members
                .into_iter()
                .map(|ag| (ag.id, ag.performance))
                .collect());
        }

        let mut results = BTreeMap::new();
        for ad_group in members {
            let performance = self.next_performance(&campaign, ad_group.performance);
            self.store.set_ad_group_performance(&ad_group.id, performance)?;
            results.insert(ad_group.id, performance);
        }
        info!(campaign_id, ad_groups = results.len(), "campaign performance simulated");
        Ok(results)
    }

    fn next_performance(&self, campaign: &Campaign, current: Performance) -> Performance {
        let mut rng = self.rng.lock();
        match campaign.campaign_type {
            CampaignType::Testing => {
                let impressions = campaign
                    .impressions_goal_per_group
                    .unwrap_or(self.config.default_impressions_goal);
                let rate = self.config.testing_conversion_rate;
                let u = rng.uniform(rate.low, rate.high);
                Performance::new(impressions, (impressions as f64 * u).floor() as u64)
            }
            CampaignType::Regular => {
                let imp = self.config.regular_impressions_increment;
                let conv = self.config.regular_conversions_increment;
                current
                    + Performance::new(
                        rng.int_inclusive(imp.low, imp.high),
                        rng.int_inclusive(conv.low, conv.high),
                    )
            }
        }
    }
}
