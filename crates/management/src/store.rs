//! In-memory entity store backed by DashMap.
//!
//! Owns every campaign, asset, creative, creative group and ad group for the
//! lifetime of the process. Campaigns only reference ad groups by id.

use crate::models::*;
use campaign_core::error::{CampaignError, CampaignResult};
use campaign_core::types::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// Thread-safe in-memory store for campaigns, creatives, creative groups and ad groups.
pub struct EntityStore {
    pub(crate) campaigns: DashMap<String, Campaign>,
    pub(crate) assets: DashMap<String, Asset>,
    pub(crate) creatives: DashMap<String, Creative>,
    pub(crate) creative_groups: DashMap<String, CreativeGroup>,
    pub(crate) ad_groups: DashMap<String, AdGroup>,
}

/// Serializable copy of every collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub campaigns: Vec<Campaign>,
    pub assets: Vec<Asset>,
    pub creatives: Vec<Creative>,
    pub creative_groups: Vec<CreativeGroup>,
    pub ad_groups: Vec<AdGroup>,
}

fn sorted<T: Clone>(items: Vec<T>, key: impl Fn(&T) -> (DateTime<Utc>, String)) -> Vec<T> {
    let mut items = items;
    items.sort_by_key(|item| key(item));
    items
}

impl EntityStore {
    pub fn new() -> Self {
        info!("Entity store initialized (in-memory)");
        Self {
            campaigns: DashMap::new(),
            assets: DashMap::new(),
            creatives: DashMap::new(),
            creative_groups: DashMap::new(),
            ad_groups: DashMap::new(),
        }
    }

    // ─── Campaigns ─────────────────────────────────────────────────────────

    pub fn create_campaign(&self, req: CreateCampaignRequest) -> CampaignResult<Campaign> {
        require("title", &req.title)?;
        require("ad_account_id", &req.ad_account_id)?;
        require("product_id", &req.product_id)?;
        match (req.campaign_type, req.impressions_goal_per_group) {
            (CampaignType::Regular, Some(_)) => {
                return Err(CampaignError::Validation(
                    "impressions_goal_per_group is only valid for TESTING campaigns".to_string(),
                ));
            }
            (_, Some(0)) => {
                return Err(CampaignError::Validation(
                    "impressions_goal_per_group must be positive".to_string(),
                ));
            }
            _ => {}
        }

        let now = Utc::now();
        let campaign = Campaign {
            id: self.fresh_id("campaign", |id| self.campaigns.contains_key(id)),
            ad_account_id: req.ad_account_id,
            product_id: req.product_id,
            title: req.title,
            description: req.description,
            status: req.status,
            campaign_type: req.campaign_type,
            ad_group_ids: Vec::new(),
            impressions_goal_per_group: req.impressions_goal_per_group,
            created_at: now,
            updated_at: now,
        };
        info!(
            campaign_id = %campaign.id,
            campaign_type = %campaign.campaign_type,
            "campaign created"
        );
        self.campaigns.insert(campaign.id.clone(), campaign.clone());
        Ok(campaign)
    }

    pub fn get_campaign(&self, id: &str) -> Option<Campaign> {
        self.campaigns.get(id).map(|r| r.value().clone())
    }

    pub fn list_campaigns(&self, filter: &CampaignFilter) -> Vec<Campaign> {
        let items = self
            .campaigns
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        sorted(items, |c: &Campaign| (c.created_at, c.id.clone()))
    }

    /// Overwrite a campaign's status. Unknown statuses are rejected before lookup.
    pub fn update_status(&self, campaign_id: &str, status: &str) -> CampaignResult<Campaign> {
        let status: CampaignStatus = status.parse()?;
        let mut entry = self
            .campaigns
            .get_mut(campaign_id)
            .ok_or_else(|| CampaignError::not_found("Campaign", campaign_id))?;
        let campaign = entry.value_mut();
        campaign.status = status;
        campaign.touch();
        info!(campaign_id, status = %status, "campaign status updated");
        Ok(campaign.clone())
    }

    /// Run `f` with exclusive access to one campaign record.
    ///
    /// Other collections may be read and written from inside `f`; the
    /// campaigns map itself must not be touched.
    pub fn with_campaign_mut<R>(
        &self,
        campaign_id: &str,
        f: impl FnOnce(&mut Campaign) -> CampaignResult<R>,
    ) -> CampaignResult<R> {
        let mut entry = self
            .campaigns
            .get_mut(campaign_id)
            .ok_or_else(|| CampaignError::not_found("Campaign", campaign_id))?;
        f(entry.value_mut())
    }

    // ─── Assets & Creatives ────────────────────────────────────────────────

    pub fn upload_asset(&self, req: UploadAssetRequest) -> CampaignResult<Asset> {
        require("file_name", &req.file_name)?;
        let asset = Asset {
            id: self.fresh_id("asset", |id| self.assets.contains_key(id)),
            file_name: req.file_name,
            content_type: req.content_type,
            status: AssetStatus::Uploaded,
            upload_time_seconds: rand::thread_rng().gen_range(2..=10),
            created_at: Utc::now(),
        };
        debug!(asset_id = %asset.id, file_name = %asset.file_name, "asset uploaded");
        self.assets.insert(asset.id.clone(), asset.clone());
        Ok(asset)
    }

    pub fn get_asset(&self, id: &str) -> Option<Asset> {
        self.assets.get(id).map(|r| r.value().clone())
    }

    pub fn create_creative(&self, req: CreateCreativeRequest) -> CampaignResult<Creative> {
        require("title", &req.title)?;
        if !self.assets.contains_key(&req.asset_id) {
            return Err(CampaignError::not_found("Asset", req.asset_id));
        }
        if req.media_type == MediaType::Video
            && !req.video_property.map(|p| p.auto_endcard).unwrap_or(false)
        {
            return Err(CampaignError::Validation(
                "VIDEO creatives must have auto_endcard=true".to_string(),
            ));
        }

        let now = Utc::now();
        let creative = Creative {
            id: self.fresh_id("creative", |id| self.creatives.contains_key(id)),
            ad_account_id: req.ad_account_id,
            product_id: req.product_id,
            title: req.title,
            media_type: req.media_type,
            orientation: req.orientation,
            asset_id: req.asset_id,
            video_property: req.video_property,
            status: EntityStatus::Active,
            created_at: now,
            updated_at: now,
        };
        info!(creative_id = %creative.id, "creative created");
        self.creatives.insert(creative.id.clone(), creative.clone());
        Ok(creative)
    }

    pub fn get_creative(&self, id: &str) -> Option<Creative> {
        self.creatives.get(id).map(|r| r.value().clone())
    }

    pub fn list_creatives(&self, filter: &CreativeFilter) -> Vec<Creative> {
        let items = self
            .creatives
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        sorted(items, |c: &Creative| (c.created_at, c.id.clone()))
    }

    pub fn set_creative_status(&self, id: &str, status: EntityStatus) -> CampaignResult<Creative> {
        let mut entry = self
            .creatives
            .get_mut(id)
            .ok_or_else(|| CampaignError::not_found("Creative", id))?;
        entry.status = status;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    // ─── Creative groups ───────────────────────────────────────────────────

    pub fn create_creative_group(
        &self,
        req: CreateCreativeGroupRequest,
    ) -> CampaignResult<CreativeGroup> {
        require("title", &req.title)?;
        if let Some(missing) = req
            .creative_ids
            .iter()
            .find(|id| !self.creatives.contains_key(id.as_str()))
        {
            return Err(CampaignError::not_found("Creative", missing.clone()));
        }

        let mut seen = HashSet::new();
        let creative_ids: Vec<String> = req
            .creative_ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let now = Utc::now();
        let group = CreativeGroup {
            id: self.fresh_id("cg", |id| self.creative_groups.contains_key(id)),
            title: req.title,
            description: req.description,
            creative_ids,
            status: EntityStatus::Active,
            is_control: req.is_control,
            performance: Performance::default(),
            created_at: now,
            updated_at: now,
        };
        info!(
            creative_group_id = %group.id,
            creatives = group.creative_ids.len(),
            "creative group created"
        );
        self.creative_groups.insert(group.id.clone(), group.clone());
        Ok(group)
    }

    pub fn get_creative_group(&self, id: &str) -> Option<CreativeGroup> {
        self.creative_groups.get(id).map(|r| r.value().clone())
    }

    pub fn list_creative_groups(&self, filter: &CreativeGroupFilter) -> Vec<CreativeGroup> {
        let items = self
            .creative_groups
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        sorted(items, |g: &CreativeGroup| (g.created_at, g.id.clone()))
    }

    /// Recompute a creative group's aggregate from the ad groups built on it.
    pub fn refresh_creative_group_performance(
        &self,
        group_id: &str,
    ) -> CampaignResult<Performance> {
        let total = self
            .ad_groups
            .iter()
            .filter(|r| r.value().creative_group_id == group_id)
            .fold(Performance::default(), |acc, r| acc + r.value().performance);
        let mut entry = self
            .creative_groups
            .get_mut(group_id)
            .ok_or_else(|| CampaignError::not_found("CreativeGroup", group_id))?;
        entry.performance = total;
        entry.updated_at = Utc::now();
        Ok(total)
    }

    // ─── Ad groups ─────────────────────────────────────────────────────────

    /// Materialize an ad group for `creative_group_id` and append it to the
    /// campaign's membership. `is_control` defaults to the creative group's flag.
    pub fn create_ad_group(
        &self,
        campaign_id: &str,
        creative_group_id: &str,
        is_control: Option<bool>,
    ) -> CampaignResult<AdGroup> {
        let group = self
            .get_creative_group(creative_group_id)
            .ok_or_else(|| CampaignError::not_found("CreativeGroup", creative_group_id))?;
        self.with_campaign_mut(campaign_id, |campaign| {
            let ad_group = self.insert_ad_group(
                campaign,
                &group.id,
                is_control.unwrap_or(group.is_control),
            );
            campaign.touch();
            Ok(ad_group)
        })
    }

    /// Attach creative groups to a campaign, one new ad group per creative
    /// group not already represented in the membership.
    pub fn attach_creative_groups(
        &self,
        campaign_id: &str,
        creative_group_ids: &[String],
    ) -> CampaignResult<Vec<AdGroup>> {
        let mut groups = Vec::with_capacity(creative_group_ids.len());
        for id in creative_group_ids {
            let group = self
                .get_creative_group(id)
                .ok_or_else(|| CampaignError::not_found("CreativeGroup", id.clone()))?;
            groups.push(group);
        }

        self.with_campaign_mut(campaign_id, |campaign| {
            let mut represented: HashSet<String> = campaign
                .ad_group_ids
                .iter()
                .filter_map(|id| self.ad_groups.get(id).map(|a| a.creative_group_id.clone()))
                .collect();

            let mut created = Vec::new();
            for group in &groups {
                if !represented.insert(group.id.clone()) {
                    debug!(
                        campaign_id = %campaign.id,
                        creative_group_id = %group.id,
                        "creative group already attached"
                    );
                    continue;
                }
                created.push(self.insert_ad_group(campaign, &group.id, group.is_control));
            }
            campaign.touch();
            info!(campaign_id = %campaign.id, attached = created.len(), "creative groups attached");
            Ok(created)
        })
    }

    fn insert_ad_group(
        &self,
        campaign: &mut Campaign,
        group_id: &str,
        is_control: bool,
    ) -> AdGroup {
        let now = Utc::now();
        let ad_group = AdGroup {
            id: self.fresh_id("ag", |id| self.ad_groups.contains_key(id)),
            campaign_id: campaign.id.clone(),
            creative_group_id: group_id.to_string(),
            is_control,
            performance: Performance::default(),
            created_at: now,
            updated_at: now,
        };
        self.ad_groups.insert(ad_group.id.clone(), ad_group.clone());
        campaign.ad_group_ids.push(ad_group.id.clone());
        ad_group
    }

    pub fn get_ad_group(&self, id: &str) -> Option<AdGroup> {
        self.ad_groups.get(id).map(|r| r.value().clone())
    }

    pub fn list_ad_groups(&self, filter: &AdGroupFilter) -> Vec<AdGroup> {
        let items = self
            .ad_groups
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        sorted(items, |a: &AdGroup| (a.created_at, a.id.clone()))
    }

    /// Resolve membership to records in membership order; stale ids are skipped.
    pub fn resolve_members(&self, campaign: &Campaign) -> Vec<AdGroup> {
        campaign
            .ad_group_ids
            .iter()
            .filter_map(|id| self.get_ad_group(id))
            .collect()
    }

    pub fn set_ad_group_performance(
        &self,
        id: &str,
        performance: Performance,
    ) -> CampaignResult<AdGroup> {
        let updated = {
            let mut entry = self
                .ad_groups
                .get_mut(id)
                .ok_or_else(|| CampaignError::not_found("AdGroup", id))?;
            entry.performance = performance;
            entry.updated_at = Utc::now();
            entry.clone()
        };
        self.refresh_creative_group_performance(&updated.creative_group_id)?;
        Ok(updated)
    }

    /// Point an ad group at a new owning campaign.
    pub fn reassign_ad_group(&self, id: &str, campaign_id: &str) -> CampaignResult<AdGroup> {
        let mut entry = self
            .ad_groups
            .get_mut(id)
            .ok_or_else(|| CampaignError::not_found("AdGroup", id))?;
        entry.campaign_id = campaign_id.to_string();
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    // ─── Snapshot ──────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            campaigns: self.list_campaigns(&CampaignFilter::default()),
            assets: sorted(
                self.assets.iter().map(|r| r.value().clone()).collect(),
                |a: &Asset| (a.created_at, a.id.clone()),
            ),
            creatives: self.list_creatives(&CreativeFilter::default()),
            creative_groups: self.list_creative_groups(&CreativeGroupFilter::default()),
            ad_groups: self.list_ad_groups(&AdGroupFilter::default()),
        }
    }

    /// Replace every collection with the snapshot's contents.
    pub fn restore(&self, snapshot: StoreSnapshot) {
        self.campaigns.clear();
        self.assets.clear();
        self.creatives.clear();
        self.creative_groups.clear();
        self.ad_groups.clear();
        for c in snapshot.campaigns {
            self.campaigns.insert(c.id.clone(), c);
        }
        for a in snapshot.assets {
            self.assets.insert(a.id.clone(), a);
        }
        for c in snapshot.creatives {
            self.creatives.insert(c.id.clone(), c);
        }
        for g in snapshot.creative_groups {
            self.creative_groups.insert(g.id.clone(), g);
        }
        for a in snapshot.ad_groups {
            self.ad_groups.insert(a.id.clone(), a);
        }
        info!(
            campaigns = self.campaigns.len(),
            ad_groups = self.ad_groups.len(),
            "store restored from snapshot"
        );
    }

    pub fn to_json(&self) -> CampaignResult<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    pub fn from_json(json: &str) -> CampaignResult<Self> {
        let snapshot: StoreSnapshot = serde_json::from_str(json)?;
        let store = Self::new();
        store.restore(snapshot);
        Ok(store)
    }

    fn fresh_id(&self, prefix: &str, taken: impl Fn(&str) -> bool) -> String {
        loop {
            let id = generate_id(prefix);
            if !taken(&id) {
                return id;
            }
        }
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

fn require(field: &str, value: &str) -> CampaignResult<()> {
    if value.trim().is_empty() {
        Err(CampaignError::Validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn campaign_req(campaign_type: CampaignType) -> CreateCampaignRequest {
        CreateCampaignRequest {
            ad_account_id: "acct_1".to_string(),
            product_id: "prod_1".to_string(),
            title: "Campaign".to_string(),
            description: String::new(),
            status: CampaignStatus::Paused,
            campaign_type,
            impressions_goal_per_group: None,
        }
    }

    fn creative_group(store: &EntityStore, is_control: bool) -> CreativeGroup {
        let asset = store
            .upload_asset(UploadAssetRequest {
                file_name: "portrait.mp4".to_string(),
                content_type: "video/mp4".to_string(),
            })
            .unwrap();
        let creative = store
            .create_creative(CreateCreativeRequest {
                ad_account_id: "acct_1".to_string(),
                product_id: "prod_1".to_string(),
                title: "Portrait".to_string(),
                media_type: MediaType::Video,
                orientation: Orientation::Portrait,
                asset_id: asset.id,
                video_property: Some(VideoProperty { auto_endcard: true }),
            })
            .unwrap();
        store
            .create_creative_group(CreateCreativeGroupRequest {
                title: "Concept".to_string(),
                description: String::new(),
                creative_ids: vec![creative.id.clone(), creative.id],
                is_control,
            })
            .unwrap()
    }

    #[test]
    fn test_create_and_get_campaign() {
        let store = EntityStore::new();
        let created = store.create_campaign(campaign_req(CampaignType::Regular)).unwrap();
        assert!(created.id.starts_with("campaign_"));
        assert_eq!(store.get_campaign(&created.id), Some(created));
        assert!(store.get_campaign("missing").is_none());
    }

    #[test]
    fn test_regular_campaign_rejects_impressions_goal() {
        let store = EntityStore::new();
        let mut req = campaign_req(CampaignType::Regular);
        req.impressions_goal_per_group = Some(5_000);
        assert!(matches!(store.create_campaign(req), Err(CampaignError::Validation(_))));
    }

    #[test]
    fn test_missing_title_rejected() {
        let store = EntityStore::new();
        let mut req = campaign_req(CampaignType::Testing);
        req.title = "  ".to_string();
        assert!(matches!(store.create_campaign(req), Err(CampaignError::Validation(_))));
    }

    #[test]
    fn test_list_filters_and_is_read_only() {
        let store = EntityStore::new();
        store.create_campaign(campaign_req(CampaignType::Regular)).unwrap();
        let mut other = campaign_req(CampaignType::Testing);
        other.ad_account_id = "acct_2".to_string();
        store.create_campaign(other).unwrap();

        let filter = CampaignFilter {
            ad_account_id: Some("acct_2".to_string()),
            ..Default::default()
        };
        let first = store.list_campaigns(&filter);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].campaign_type, CampaignType::Testing);
        assert_eq!(store.list_campaigns(&filter), first);
        assert_eq!(store.list_campaigns(&CampaignFilter::default()).len(), 2);
    }

    #[test]
    fn test_update_status() {
        let store = EntityStore::new();
        let c = store.create_campaign(campaign_req(CampaignType::Testing)).unwrap();
        let updated = store.update_status(&c.id, "RUNNING").unwrap();
        assert_eq!(updated.status, CampaignStatus::Running);
        assert!(updated.updated_at >= c.updated_at);

        assert!(matches!(
            store.update_status(&c.id, "ARCHIVED"),
            Err(CampaignError::InvalidState(_))
        ));
        assert!(matches!(
            store.update_status("nope", "PAUSED"),
            Err(CampaignError::NotFound { .. })
        ));
        assert_eq!(store.get_campaign(&c.id).unwrap().status, CampaignStatus::Running);
    }

    #[test]
    fn test_video_creative_requires_auto_endcard() {
        let store = EntityStore::new();
        let asset = store
            .upload_asset(UploadAssetRequest {
                file_name: "landscape.mp4".to_string(),
                content_type: "video/mp4".to_string(),
            })
            .unwrap();
        assert!((2..=10).contains(&asset.upload_time_seconds));
        let req = CreateCreativeRequest {
            ad_account_id: "acct_1".to_string(),
            product_id: "prod_1".to_string(),
            title: "Landscape".to_string(),
            media_type: MediaType::Video,
            orientation: Orientation::Landscape,
            asset_id: asset.id.clone(),
            video_property: None,
        };
        assert!(matches!(store.create_creative(req.clone()), Err(CampaignError::Validation(_))));

        let mut missing_asset = req;
        missing_asset.asset_id = "asset_missing".to_string();
        missing_asset.video_property = Some(VideoProperty { auto_endcard: true });
        assert!(matches!(
            store.create_creative(missing_asset),
            Err(CampaignError::NotFound { .. })
        ));
    }

    #[test]
    fn test_creative_group_dedupes_and_validates() {
        let store = EntityStore::new();
        let group = creative_group(&store, false);
        assert_eq!(group.creative_ids.len(), 1);

        let err = store
            .create_creative_group(CreateCreativeGroupRequest {
                title: "Broken".to_string(),
                description: String::new(),
                creative_ids: vec!["creative_missing".to_string()],
                is_control: false,
            })
            .unwrap_err();
        assert!(matches!(err, CampaignError::NotFound { kind: "Creative", .. }));
    }

    #[test]
    fn test_attach_creative_groups_materializes_ad_groups_once() {
        let store = EntityStore::new();
        let campaign = store.create_campaign(campaign_req(CampaignType::Testing)).unwrap();
        let control = creative_group(&store, true);
        let challenger = creative_group(&store, false);

        let ids = vec![control.id.clone(), challenger.id.clone(), control.id.clone()];
        let created = store.attach_creative_groups(&campaign.id, &ids).unwrap();
        assert_eq!(created.len(), 2);
        assert!(created[0].is_control);
        assert!(!created[1].is_control);

        let again = store.attach_creative_groups(&campaign.id, &[challenger.id.clone()]).unwrap();
        assert!(again.is_empty());

        let campaign = store.get_campaign(&campaign.id).unwrap();
        assert_eq!(campaign.ad_group_ids, vec![created[0].id.clone(), created[1].id.clone()]);
        assert_eq!(store.resolve_members(&campaign).len(), 2);
    }

    #[test]
    fn test_attach_unknown_group_leaves_campaign_untouched() {
        let store = EntityStore::new();
        let campaign = store.create_campaign(campaign_req(CampaignType::Testing)).unwrap();
        let group = creative_group(&store, false);
        let err = store
            .attach_creative_groups(&campaign.id, &[group.id, "cg_missing".to_string()])
            .unwrap_err();
        assert!(matches!(err, CampaignError::NotFound { .. }));
        assert!(store.get_campaign(&campaign.id).unwrap().ad_group_ids.is_empty());
        assert!(store.list_ad_groups(&AdGroupFilter::default()).is_empty());
    }

    #[test]
    fn test_performance_rolls_up_to_creative_group() {
        let store = EntityStore::new();
        let a = store.create_campaign(campaign_req(CampaignType::Testing)).unwrap();
        let b = store.create_campaign(campaign_req(CampaignType::Regular)).unwrap();
        let group = creative_group(&store, false);
        let ag1 = store.create_ad_group(&a.id, &group.id, None).unwrap();
        let ag2 = store.create_ad_group(&b.id, &group.id, None).unwrap();

        store.set_ad_group_performance(&ag1.id, Performance::new(10_000, 120)).unwrap();
        store.set_ad_group_performance(&ag2.id, Performance::new(2_000, 30)).unwrap();

        let group = store.get_creative_group(&group.id).unwrap();
        assert_eq!(group.performance, Performance::new(12_000, 150));
    }

    #[test]
    fn test_snapshot_restore() {
        let store = EntityStore::new();
        let campaign = store.create_campaign(campaign_req(CampaignType::Testing)).unwrap();
        let group = creative_group(&store, true);
        store.create_ad_group(&campaign.id, &group.id, None).unwrap();

        let json = store.to_json().unwrap();
        let restored = EntityStore::from_json(&json).unwrap();
        assert_eq!(restored.get_campaign(&campaign.id), store.get_campaign(&campaign.id));
        assert_eq!(
            restored.list_ad_groups(&AdGroupFilter::default()),
            store.list_ad_groups(&AdGroupFilter::default())
        );
    }
}
