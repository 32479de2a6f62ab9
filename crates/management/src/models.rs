//! Request, filter, and response types for the entity store.

use campaign_core::error::CampaignError;
use campaign_core::types::*;
use serde::{Deserialize, Serialize};

// ─── Create requests ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCampaignRequest {
    pub ad_account_id: String,
    pub product_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_campaign_status")]
    pub status: CampaignStatus,
    pub campaign_type: CampaignType,
    #[serde(default)]
    pub impressions_goal_per_group: Option<u64>,
}

fn default_campaign_status() -> CampaignStatus {
    CampaignStatus::Paused
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadAssetRequest {
    pub file_name: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_content_type() -> String {
    "video/mp4".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCreativeRequest {
    pub ad_account_id: String,
    pub product_id: String,
    pub title: String,
    pub media_type: MediaType,
    pub orientation: Orientation,
    pub asset_id: String,
    #[serde(default)]
    pub video_property: Option<VideoProperty>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCreativeGroupRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub creative_ids: Vec<String>,
    #[serde(default)]
    pub is_control: bool,
}

// ─── Filters ───────────────────────────────────────────────────────────────

/// Equality filters; `None` matches everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CampaignFilter {
    pub ad_account_id: Option<String>,
    pub product_id: Option<String>,
    pub status: Option<CampaignStatus>,
    pub campaign_type: Option<CampaignType>,
}

impl CampaignFilter {
    pub fn matches(&self, c: &Campaign) -> bool {
        self.ad_account_id.as_ref().map_or(true, |v| *v == c.ad_account_id)
            && self.product_id.as_ref().map_or(true, |v| *v == c.product_id)
            && self.status.map_or(true, |v| v == c.status)
            && self.campaign_type.map_or(true, |v| v == c.campaign_type)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreativeFilter {
    pub ad_account_id: Option<String>,
    pub product_id: Option<String>,
    pub status: Option<EntityStatus>,
}

impl CreativeFilter {
    pub fn matches(&self, c: &Creative) -> bool {
        self.ad_account_id.as_ref().map_or(true, |v| *v == c.ad_account_id)
            && self.product_id.as_ref().map_or(true, |v| *v == c.product_id)
            && self.status.map_or(true, |v| v == c.status)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreativeGroupFilter {
    pub status: Option<EntityStatus>,
    pub is_control: Option<bool>,
}

impl CreativeGroupFilter {
    pub fn matches(&self, g: &CreativeGroup) -> bool {
        self.status.map_or(true, |v| v == g.status)
            && self.is_control.map_or(true, |v| v == g.is_control)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdGroupFilter {
    pub campaign_id: Option<String>,
    pub creative_group_id: Option<String>,
    pub is_control: Option<bool>,
}

impl AdGroupFilter {
    pub fn matches(&self, a: &AdGroup) -> bool {
        self.campaign_id.as_ref().map_or(true, |v| *v == a.campaign_id)
            && self.creative_group_id.as_ref().map_or(true, |v| *v == a.creative_group_id)
            && self.is_control.map_or(true, |v| v == a.is_control)
    }
}

// ─── Responses ─────────────────────────────────────────────────────────────

/// Structured failure handed back across the boundary: kind + message.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl From<CampaignError> for ErrorResponse {
    fn from(err: CampaignError) -> Self {
        Self {
            error: err.kind().as_str().to_string(),
            message: err.to_string(),
        }
    }
}
