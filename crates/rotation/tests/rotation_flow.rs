//! End-to-end champion rotation flows against a fresh store per test.

use campaign_core::config::{AppConfig, UniformRange};
use campaign_core::types::*;
use campaign_management::models::*;
use campaign_management::EntityStore;
use campaign_rotation::*;
use std::collections::HashSet;
use std::sync::Arc;

const TESTING: &str = "creative_testing_campaign";

fn service_with(evaluation_fraction: f64) -> RotationService {
    let config = AppConfig::default();
    RotationService::with_random(
        Arc::new(EntityStore::with_demo_data(&config.seed)),
        &config,
        Box::new(SeededRandom::new(11)),
        Box::new(SequenceRandom::constant(evaluation_fraction)),
    )
}

/// Upload portrait + landscape videos and bundle them into a creative group.
fn new_concept(service: &RotationService, name: &str) -> CreativeGroup {
    let mut creative_ids = Vec::new();
    for orientation in [Orientation::Portrait, Orientation::Landscape] {
        let asset = service
            .upload_asset(UploadAssetRequest {
                file_name: format!("{name}_{orientation:?}.mp4"),
                content_type: "video/mp4".to_string(),
            })
            .unwrap();
        let creative = service
            .create_creative(CreateCreativeRequest {
                ad_account_id: "demo_ad_account".to_string(),
                product_id: "demo_product".to_string(),
                title: format!("{name} {orientation:?}"),
                media_type: MediaType::Video,
                orientation,
                asset_id: asset.id,
                video_property: Some(VideoProperty { auto_endcard: true }),
            })
            .unwrap();
        creative_ids.push(creative.id);
    }
    service
        .create_creative_group(CreateCreativeGroupRequest {
            title: name.to_string(),
            description: String::new(),
            creative_ids,
            is_control: false,
        })
        .unwrap()
}

fn set_conversions(store: &EntityStore, ad_group_id: &str, conversions: u64) {
    store
        .set_ad_group_performance(ad_group_id, Performance::new(10_000, conversions))
        .unwrap();
}

#[test]
fn test_full_concept_to_rotation_flow() {
    // threshold fraction 0.0 -> 0.8 * control
    let service = service_with(0.0);

    let concepts: Vec<CreativeGroup> = (0..3)
        .map(|i| new_concept(&service, &format!("concept_{i}")))
        .collect();
    let ids: Vec<String> = concepts.iter().map(|c| c.id.clone()).collect();
    let ad_groups = service.attach_creative_groups(TESTING, &ids).unwrap();
    assert_eq!(ad_groups.len(), 3);

    service.update_campaign_status(TESTING, "RUNNING").unwrap();
    let err = service.evaluate_testing_campaign(TESTING).unwrap_err();
    assert_eq!(err.error, "invalid_state");

    let simulated = service
        .simulate_performance(&SimulationTarget::Campaign(TESTING.to_string()))
        .unwrap();
    assert_eq!(simulated.len(), 4);
    assert!(simulated.values().all(|p| p.impressions == 10_000));

    // pin challenger results: control converts 200, threshold is 160
    set_conversions(service.store(), "ag_good_creative_group", 200);
    set_conversions(service.store(), &ad_groups[0].id, 210);
    set_conversions(service.store(), &ad_groups[1].id, 120);
    set_conversions(service.store(), &ad_groups[2].id, 161);

    service.update_campaign_status(TESTING, "PAUSED").unwrap();
    let outcome = service.evaluate_testing_campaign(TESTING).unwrap();
    assert_eq!(outcome.champions, vec![ad_groups[0].id.clone(), ad_groups[2].id.clone()]);
    assert_eq!(outcome.queue_size, 2);

    let first = service.replace_worst("regular_campaign_a").unwrap();
    assert_eq!(first.replaced_ad_group_id, None);
    assert_eq!(first.new_champion_id, ad_groups[0].id);

    let second = service.replace_worst("regular_campaign_b").unwrap();
    assert_eq!(second.new_champion_id, ad_groups[2].id);
    assert_eq!(service.champion_queue_status().size, 0);

    let err = service.replace_worst("regular_campaign_a").unwrap_err();
    assert_eq!(err.error, "queue_empty");
    assert_eq!(
        service.get_campaign("regular_campaign_a").unwrap().ad_group_ids,
        vec![ad_groups[0].id.clone()]
    );
}

#[test]
fn test_worst_of_three_is_replaced() {
    let service = service_with(0.5);
    let store = service.store().clone();

    let mut members = Vec::new();
    for conversions in [50, 10, 30] {
        let group = new_concept(&service, "member");
        let ag = store.create_ad_group("regular_campaign_a", &group.id, None).unwrap();
        set_conversions(&store, &ag.id, conversions);
        members.push(ag.id);
    }
    let champion_group = new_concept(&service, "champion");
    let champion = service.attach_creative_groups(TESTING, &[champion_group.id]).unwrap();
    service.submit_champion(&champion[0].id).unwrap();

    let outcome = service.replace_worst("regular_campaign_a").unwrap();
    assert_eq!(outcome.replaced_ad_group_id.as_deref(), Some(members[1].as_str()));

    let campaign = service.get_campaign("regular_campaign_a").unwrap();
    assert!(!campaign.ad_group_ids.contains(&members[1]));
    assert!(campaign.ad_group_ids.contains(&champion[0].id));
    assert_eq!(campaign.ad_group_ids.len(), 3);
    assert_eq!(service.champion_queue_status().size, 0);
}

#[test]
fn test_membership_swap_properties() {
    let service = service_with(0.5);
    let store = service.store().clone();

    for conversions in [40, 25, 60, 25, 90] {
        let group = new_concept(&service, "member");
        let ag = store.create_ad_group("regular_campaign_b", &group.id, None).unwrap();
        set_conversions(&store, &ag.id, conversions);
    }
    for _ in 0..3 {
        let group = new_concept(&service, "challenger");
        let ag = service.attach_creative_groups(TESTING, &[group.id]).unwrap();
        set_conversions(&store, &ag[0].id, 500);
        service.submit_champion(&ag[0].id).unwrap();
    }

    for _ in 0..3 {
        let before: Vec<String> = service.get_campaign("regular_campaign_b").unwrap().ad_group_ids;
        let queue_before = service.champion_queue_status().size;

        let outcome = service.replace_worst("regular_campaign_b").unwrap();
        let after: Vec<String> = service.get_campaign("regular_campaign_b").unwrap().ad_group_ids;

        assert_eq!(after.len(), before.len());
        let before_set: HashSet<&String> = before.iter().collect();
        let after_set: HashSet<&String> = after.iter().collect();
        let added: Vec<&&String> = after_set.difference(&before_set).collect();
        let removed: Vec<&&String> = before_set.difference(&after_set).collect();
        assert_eq!(added, vec![&&outcome.new_champion_id]);
        assert_eq!(removed.len(), 1);
        assert_eq!(Some((*removed[0]).clone()), outcome.replaced_ad_group_id);
        assert_eq!(service.champion_queue_status().size, queue_before - 1);
    }
}

#[test]
fn test_reads_are_idempotent() {
    let service = service_with(0.5);
    new_concept(&service, "read_only");

    let filter = CampaignFilter {
        campaign_type: Some(CampaignType::Regular),
        ..Default::default()
    };
    let snapshot = serde_json::to_string(&service.snapshot()).unwrap();
    let first = service.list_campaigns(&filter);
    let groups = service.list_creative_groups(&CreativeGroupFilter::default());
    for _ in 0..3 {
        assert_eq!(service.list_campaigns(&filter), first);
        assert_eq!(service.list_creative_groups(&CreativeGroupFilter::default()), groups);
        assert_eq!(service.get_campaign(TESTING).unwrap(), service.get_campaign(TESTING).unwrap());
        service.champion_queue_status();
    }
    assert_eq!(serde_json::to_string(&service.snapshot()).unwrap(), snapshot);
}

#[test]
fn test_concurrent_rotations_consume_each_champion_once() {
    let mut config = AppConfig::default();
    config.evaluation.threshold_band = UniformRange::new(0.0, 0.0);
    let store = Arc::new(EntityStore::with_demo_data(&config.seed));
    let service = Arc::new(RotationService::with_store(store.clone(), &config));

    for conversions in [5, 15, 25, 35] {
        let group = new_concept(&service, "member");
        let ag = store.create_ad_group("regular_campaign_a", &group.id, None).unwrap();
        set_conversions(&store, &ag.id, conversions);
    }
    let champion_count = 8;
    for i in 0..champion_count {
        let group = new_concept(&service, &format!("champ_{i}"));
        let ag = service.attach_creative_groups(TESTING, &[group.id]).unwrap();
        set_conversions(&store, &ag[0].id, 1_000 + i);
    }
    let outcome = service.evaluate_testing_campaign(TESTING).unwrap();
    assert_eq!(outcome.champions.len(), champion_count as usize);

    let results: Vec<RotationOutcome> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..champion_count)
            .map(|_| {
                let service = service.clone();
                scope.spawn(move || service.replace_worst("regular_campaign_a").unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let promoted: HashSet<String> = results.iter().map(|r| r.new_champion_id.clone()).collect();
    assert_eq!(promoted.len(), champion_count as usize);
    assert_eq!(service.champion_queue_status().size, 0);

    let campaign = service.get_campaign("regular_campaign_a").unwrap();
    assert_eq!(campaign.ad_group_ids.len(), 4);
    let unique: HashSet<&String> = campaign.ad_group_ids.iter().collect();
    assert_eq!(unique.len(), 4);
}

#[test]
fn test_promoted_champion_belongs_to_one_campaign() {
    let mut config = AppConfig::default();
    config.evaluation.threshold_band = UniformRange::new(0.0, 0.0);
    let service = RotationService::with_random(
        Arc::new(EntityStore::with_demo_data(&config.seed)),
        &config,
        Box::new(SeededRandom::new(5)),
        Box::new(SeededRandom::new(6)),
    );
    let group = new_concept(&service, "single");
    let champion = service.attach_creative_groups(TESTING, &[group.id]).unwrap()[0].clone();

    let first = service.evaluate_testing_campaign(TESTING).unwrap();
    assert_eq!(first.champions, vec![champion.id.clone()]);
    service.replace_worst("regular_campaign_a").unwrap();
    set_conversions(service.store(), &champion.id, 300);

    let second = service.evaluate_testing_campaign(TESTING).unwrap();
    assert!(second.champions.is_empty());
    assert_eq!(
        service.replace_worst("regular_campaign_b").unwrap_err().error,
        "queue_empty"
    );

    let owners: Vec<String> = service
        .list_campaigns(&CampaignFilter::default())
        .into_iter()
        .filter(|c| c.ad_group_ids.contains(&champion.id))
        .map(|c| c.id)
        .collect();
    assert_eq!(owners, vec!["regular_campaign_a".to_string()]);

    // testing-campaign simulation leaves the deployed ad group alone
    service.update_campaign_status(TESTING, "RUNNING").unwrap();
    service
        .simulate_performance(&SimulationTarget::Campaign(TESTING.to_string()))
        .unwrap();
    assert_eq!(
        service.get_ad_group_performance(&champion.id).unwrap(),
        Performance::new(10_000, 300)
    );
}
