//! Demo fixture mirroring the mock ad backend: one paused testing campaign
//! holding the control group, and two running regular campaigns.

use crate::store::EntityStore;
use campaign_core::config::SeedConfig;
use campaign_core::types::*;
use chrono::Utc;
use tracing::info;

const DEMO_ACCOUNT: &str = "demo_ad_account";
const DEMO_PRODUCT: &str = "demo_product";
const CONTROL_IMPRESSIONS: u64 = 10_000;

impl EntityStore {
    /// Build a store preloaded with the demo fixture.
    pub fn with_demo_data(seed: &SeedConfig) -> Self {
        let store = Self::new();
        store.seed_demo_data(seed);
        store
    }

    pub fn seed_demo_data(&self, seed: &SeedConfig) {
        let now = Utc::now();

        let mut creative_ids = Vec::new();
        for (orientation, name) in [
            (Orientation::Portrait, "portrait"),
            (Orientation::Landscape, "landscape"),
        ] {
            let asset_id = format!("asset_good_{name}");
            self.assets.insert(
                asset_id.clone(),
                Asset {
                    id: asset_id.clone(),
                    file_name: format!("good_{name}_video.mp4"),
                    content_type: "video/mp4".to_string(),
                    status: AssetStatus::Uploaded,
                    upload_time_seconds: 3,
                    created_at: now,
                },
            );
            let creative_id = format!("creative_good_{name}");
            self.creatives.insert(
                creative_id.clone(),
                Creative {
                    id: creative_id.clone(),
                    ad_account_id: DEMO_ACCOUNT.to_string(),
                    product_id: DEMO_PRODUCT.to_string(),
                    title: format!("good_{name}_creative"),
                    media_type: MediaType::Video,
                    orientation,
                    asset_id,
                    video_property: Some(VideoProperty { auto_endcard: true }),
                    status: EntityStatus::Active,
                    created_at: now,
                    updated_at: now,
                },
            );
            creative_ids.push(creative_id);
        }

        let control_performance = Performance::new(CONTROL_IMPRESSIONS, seed.control_conversions);
        let group_id = seed.control_creative_group_id.clone();
        self.creative_groups.insert(
            group_id.clone(),
            CreativeGroup {
                id: group_id.clone(),
                title: group_id.clone(),
                description: "Control concept".to_string(),
                creative_ids,
                status: EntityStatus::Active,
                is_control: true,
                performance: control_performance,
                created_at: now,
                updated_at: now,
            },
        );

        let control_ad_group_id = format!("ag_{group_id}");
        self.ad_groups.insert(
            control_ad_group_id.clone(),
            AdGroup {
                id: control_ad_group_id.clone(),
                campaign_id: seed.testing_campaign_id.clone(),
                creative_group_id: group_id,
                is_control: true,
                performance: control_performance,
                created_at: now,
                updated_at: now,
            },
        );

        self.campaigns.insert(
            seed.testing_campaign_id.clone(),
            demo_campaign(
                &seed.testing_campaign_id,
                CampaignType::Testing,
                CampaignStatus::Paused,
                vec![control_ad_group_id],
            ),
        );
        for id in &seed.regular_campaign_ids {
            self.campaigns.insert(
                id.clone(),
                demo_campaign(id, CampaignType::Regular, CampaignStatus::Running, Vec::new()),
            );
        }

        info!(
            testing_campaign = %seed.testing_campaign_id,
            regular_campaigns = seed.regular_campaign_ids.len(),
            "demo data seeded"
        );
    }
}

fn demo_campaign(
    id: &str,
    campaign_type: CampaignType,
    status: CampaignStatus,
    ad_group_ids: Vec<String>,
) -> Campaign {
    let now = Utc::now();
    Campaign {
        id: id.to_string(),
        ad_account_id: DEMO_ACCOUNT.to_string(),
        product_id: DEMO_PRODUCT.to_string(),
        title: id.to_string(),
        description: String::new(),
        status,
        campaign_type,
        ad_group_ids,
        impressions_goal_per_group: (campaign_type == CampaignType::Testing)
            .then_some(CONTROL_IMPRESSIONS),
        created_at: now,
        updated_at: now,
    }
}
