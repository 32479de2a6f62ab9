//! Rotation engine: swap the worst performer of a regular campaign for the
//! next queued champion.

use crate::queue::ChampionQueue;
use campaign_core::config::RotationConfig;
use campaign_core::error::{CampaignError, CampaignResult};
use campaign_core::types::AdGroup;
use campaign_management::EntityStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RotationOutcome {
    pub campaign_id: String,
    /// `None` when the campaign had no resolvable members.
    pub replaced_ad_group_id: Option<String>,
    pub new_champion_id: String,
    pub queue_size: usize,
}

pub struct RotationEngine {
    store: Arc<EntityStore>,
    queue: Arc<ChampionQueue>,
    config: RotationConfig,
}

impl RotationEngine {
    pub fn new(store: Arc<EntityStore>, queue: Arc<ChampionQueue>, config: RotationConfig) -> Self {
        Self {
            store,
            queue,
            config,
        }
    }

    /// Replace the member with the fewest conversions (first one wins ties)
    /// by the earliest queued champion.
    ///
    /// Either every step commits or none does: the queue stays locked for the
    /// whole operation and the champion is popped only after the membership
    /// swap has been applied. The champion leaves its previous campaign, so an
    /// ad group is only ever listed by one campaign.
    pub fn replace_worst(&self, campaign_id: &str) -> CampaignResult<RotationOutcome> {
        let campaign = self
            .store
            .get_campaign(campaign_id)
            .ok_or_else(|| CampaignError::not_found("Campaign", campaign_id))?;
        if !campaign.is_regular() || !self.config.allows(campaign_id) {
            return Err(CampaignError::InvalidCampaign(format!(
                "campaign '{campaign_id}' is not an eligible regular campaign"
            )));
        }

        let mut queue = self.queue.lock();
        let champion = queue.front().cloned().ok_or(CampaignError::QueueEmpty)?;
        let previous_owner = self
            .store
            .get_ad_group(&champion.ad_group_id)
            .ok_or_else(|| CampaignError::not_found("AdGroup", champion.ad_group_id.clone()))?
            .campaign_id;

        let replaced = self.store.with_campaign_mut(campaign_id, |campaign| {
            if campaign.ad_group_ids.contains(&champion.ad_group_id) {
                return Err(CampaignError::InvalidState(format!(
                    "champion '{}' is already deployed in campaign '{campaign_id}'",
                    champion.ad_group_id
                )));
            }
            let members: Vec<AdGroup> = campaign
                .ad_group_ids
                .iter()
                .filter_map(|id| self.store.get_ad_group(id))
                .collect();
            let worst = find_worst(&members).map(|ag| ag.id.clone());

            self.store
                .reassign_ad_group(&champion.ad_group_id, &campaign.id)?;

            if let Some(worst_id) = &worst {
                if let Some(pos) = campaign.ad_group_ids.iter().position(|id| id == worst_id) {
                    campaign.ad_group_ids.remove(pos);
                }
            }
            campaign.ad_group_ids.push(champion.ad_group_id.clone());
            campaign.touch();
            Ok(worst)
        })?;

        // Target guard is released; only now touch the previous owner so two
        // entries of the campaigns map are never held at once.
        if previous_owner != campaign_id {
            self.detach(&previous_owner, &champion.ad_group_id);
        }

        queue.pop_front();
        let queue_size = queue.len();
        drop(queue);

        match &replaced {
            Some(worst) => info!(
                campaign_id,
                replaced = %worst,
                champion = %champion.ad_group_id,
                queue_size,
                "worst ad group replaced by champion"
            ),
            None => info!(
                campaign_id,
                champion = %champion.ad_group_id,
                queue_size,
                "champion added to empty regular campaign"
            ),
        }

        Ok(RotationOutcome {
            campaign_id: campaign_id.to_string(),
            replaced_ad_group_id: replaced,
            new_champion_id: champion.ad_group_id,
            queue_size,
        })
    }

    /// Drop a promoted champion from its former campaign's membership.
    fn detach(&self, owner_id: &str, ad_group_id: &str) {
        let detached = self.store.with_campaign_mut(owner_id, |owner| {
            owner.ad_group_ids.retain(|id| id != ad_group_id);
            owner.touch();
            Ok(())
        });
        if detached.is_err() {
            debug!(owner_id, ad_group_id, "previous owner gone, nothing to detach");
        }
    }
}

/// Minimum conversions; the earliest member in membership order wins ties.
fn find_worst(members: &[AdGroup]) -> Option<&AdGroup> {
    members.iter().min_by_key(|ag| ag.performance.conversions)
}
