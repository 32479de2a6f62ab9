use crate::error::CampaignError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Generate a practically unique identifier, e.g. `cg_1f3a9c0e`.
pub fn generate_id(prefix: &str) -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &raw[..8])
}

// ─── Campaign ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum CampaignStatus {
    Paused,
    Active,
    Running,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Paused => "PAUSED",
            CampaignStatus::Active => "ACTIVE",
            CampaignStatus::Running => "RUNNING",
        }
    }
}

impl FromStr for CampaignStatus {
    type Err = CampaignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PAUSED" => Ok(CampaignStatus::Paused),
            "ACTIVE" => Ok(CampaignStatus::Active),
            "RUNNING" => Ok(CampaignStatus::Running),
            other => Err(CampaignError::InvalidState(format!(
                "unrecognized campaign status '{other}', expected PAUSED, ACTIVE or RUNNING"
            ))),
        }
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum CampaignType {
    Testing,
    Regular,
}

impl std::fmt::Display for CampaignType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignType::Testing => f.write_str("TESTING"),
            CampaignType::Regular => f.write_str("REGULAR"),
        }
    }
}

/// A campaign references its ad groups by id; the store owns the records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Campaign {
    pub id: String,
    pub ad_account_id: String,
    pub product_id: String,
    pub title: String,
    pub description: String,
    pub status: CampaignStatus,
    pub campaign_type: CampaignType,
    pub ad_group_ids: Vec<String>,
    /// Only set for testing campaigns.
    #[serde(default)]
    pub impressions_goal_per_group: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    pub fn is_testing(&self) -> bool {
        self.campaign_type == CampaignType::Testing
    }

    pub fn is_regular(&self) -> bool {
        self.campaign_type == CampaignType::Regular
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ─── Assets & Creatives ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Uploaded,
}

/// Uploaded media file backing one or more creatives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Asset {
    pub id: String,
    pub file_name: String,
    pub content_type: String,
    pub status: AssetStatus,
    pub upload_time_seconds: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaType {
    Video,
    Image,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
    Square,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct VideoProperty {
    #[serde(default)]
    pub auto_endcard: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Creative {
    pub id: String,
    pub ad_account_id: String,
    pub product_id: String,
    pub title: String,
    pub media_type: MediaType,
    pub orientation: Orientation,
    pub asset_id: String,
    #[serde(default)]
    pub video_property: Option<VideoProperty>,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ─── Creative groups & ad groups ───────────────────────────────────────────

/// Impression/conversion counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Performance {
    pub impressions: u64,
    pub conversions: u64,
}

impl Performance {
    pub fn new(impressions: u64, conversions: u64) -> Self {
        Self {
            impressions,
            conversions,
        }
    }

    pub fn conversion_rate(&self) -> f64 {
        if self.impressions > 0 {
            self.conversions as f64 / self.impressions as f64
        } else {
            0.0
        }
    }
}

impl std::ops::Add for Performance {
    type Output = Performance;

    fn add(self, rhs: Performance) -> Performance {
        Performance {
            impressions: self.impressions.saturating_add(rhs.impressions),
            conversions: self.conversions.saturating_add(rhs.conversions),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreativeGroup {
    pub id: String,
    pub title: String,
    pub description: String,
    pub creative_ids: Vec<String>,
    pub status: EntityStatus,
    /// Baseline group challengers are measured against.
    #[serde(default)]
    pub is_control: bool,
    /// Aggregate over every ad group built from this group.
    pub performance: Performance,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The unit that is swapped in and out of a campaign's membership.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdGroup {
    pub id: String,
    pub campaign_id: String,
    pub creative_group_id: String,
    #[serde(default)]
    pub is_control: bool,
    pub performance: Performance,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A champion waiting for deployment into a regular campaign.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueEntry {
    pub ad_group_id: String,
    pub source_campaign_id: String,
    pub enqueued_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_has_prefix_and_suffix() {
        let id = generate_id("cg");
        assert!(id.starts_with("cg_"));
        assert_eq!(id.len(), "cg_".len() + 8);
        assert_ne!(generate_id("cg"), generate_id("cg"));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("RUNNING".parse::<CampaignStatus>().unwrap(), CampaignStatus::Running);
        assert_eq!("paused".parse::<CampaignStatus>().unwrap(), CampaignStatus::Paused);
        let err = "ARCHIVED".parse::<CampaignStatus>().unwrap_err();
        assert!(matches!(err, CampaignError::InvalidState(_)));
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&CampaignStatus::Paused).unwrap();
        assert_eq!(json, "\"PAUSED\"");
        let t: CampaignType = serde_json::from_str("\"REGULAR\"").unwrap();
        assert_eq!(t, CampaignType::Regular);
    }

    #[test]
    fn test_performance_rate_and_sum() {
        let a = Performance::new(10_000, 200);
        let b = Performance::new(5_000, 50);
        assert!((a.conversion_rate() - 0.02).abs() < f64::EPSILON);
        assert_eq!(a + b, Performance::new(15_000, 250));
        assert_eq!(Performance::default().conversion_rate(), 0.0);
    }
}
