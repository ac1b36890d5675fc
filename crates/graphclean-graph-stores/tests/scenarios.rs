//! End-to-end fix passes against the embedded store.

mod common;

use std::sync::Arc;

use graphclean_core::{
    EntityGraphStore, EntityLabel, EntityNode, FixStage, NodeId, ResolutionConfig,
    ValidationFixOrchestrator,
};
use graphclean_graph_stores::MemoryGraphStore;

use common::{chunk, fast_retry, messy_graph};

fn orchestrator(store: Arc<MemoryGraphStore>) -> ValidationFixOrchestrator {
    let config = ResolutionConfig::builder()
        .retry(fast_retry(2))
        .build()
        .unwrap();
    ValidationFixOrchestrator::new(store, config)
}

async fn named(store: &MemoryGraphStore, label: EntityLabel, name: &str) -> Vec<EntityNode> {
    store
        .scan_label(label)
        .await
        .unwrap()
        .into_iter()
        .filter(|n| n.name == name)
        .collect()
}

async fn degree(store: &MemoryGraphStore, id: &str) -> usize {
    store.relationships(&NodeId::from(id)).await.unwrap().len()
}

#[tokio::test]
async fn test_detect_reports_every_defect_class() {
    let store = Arc::new(messy_graph());
    let (snapshot, report) = orchestrator(store.clone()).detect().await.unwrap();

    // chunks carry no type label
    assert_eq!(snapshot.len(), 8);

    let counts = report.counts();
    assert_eq!(counts.renames, 1);
    assert_eq!(counts.definitions, 2);
    assert_eq!(counts.generic_deletions, 1);
    assert_eq!(counts.taxonomy_deletions, 0);
    assert_eq!(counts.mislabeled_challenges, 0);
    assert_eq!(counts.same_label_merges, 1);
    assert_eq!(counts.taxonomy_merges, 1);
    assert_eq!(counts.lexical_merges, 1);
    assert_eq!(counts.cross_label_merges, 1);
    assert_eq!(counts.total(), 8);

    // detection never writes
    assert_eq!(store.node_count().unwrap(), 14);
    assert_eq!(store.edge_count().unwrap(), 12);
}

#[tokio::test]
async fn test_preview_counts_relationship_impact() {
    let store = Arc::new(messy_graph());
    let preview = orchestrator(store.clone()).preview().await.unwrap();

    let generic = &preview.report.generic;
    assert_eq!(generic.len(), 1);
    assert_eq!(generic[0].member.name, "tool");
    assert_eq!(generic[0].member.relationship_count, Some(0));
    assert_eq!(generic[0].relationship_impact(), 0);
    assert_eq!(preview.relationships_to_delete, 0);

    // s2 (2) + req2 (1) + tr2 (1)
    assert_eq!(preview.relationships_to_retarget, 4);
    assert_eq!(store.node_count().unwrap(), 14);
}

#[tokio::test]
async fn test_apply_consolidates_messy_graph() {
    let store = Arc::new(messy_graph());
    let summary = orchestrator(store.clone()).apply().await;

    assert!(summary.aborted.is_none());
    assert!(!summary.cancelled);
    assert_eq!(summary.errors().count(), 0);
    assert!(summary.converged(), "remaining: {:?}", summary.remaining);
    assert_eq!(summary.stages.len(), 10);

    // ISO 26262 (3) + iso 26262 (2) -> one Standard with 5
    let standards = store.scan_label(EntityLabel::Standard).await.unwrap();
    assert_eq!(standards.len(), 1);
    assert_eq!(standards[0].name, "iso 26262");
    assert_eq!(standards[0].display_name.as_deref(), Some("ISO 26262"));
    assert_eq!(degree(&store, standards[0].id.as_str()).await, 5);

    // Concept wins over Challenge
    let traceability = named(&store, EntityLabel::Concept, "traceability").await;
    assert_eq!(traceability.len(), 1);
    assert!(named(&store, EntityLabel::Challenge, "traceability").await.is_empty());
    assert_eq!(degree(&store, traceability[0].id.as_str()).await, 2);
    assert!(traceability[0].definition_text().is_some());

    // auto -> automotive, relationships preserved
    let industries = store.scan_label(EntityLabel::Industry).await.unwrap();
    assert_eq!(industries.len(), 1);
    assert_eq!(industries[0].name, "automotive");
    assert!(industries[0].aliases.contains(&"auto".to_string()));
    assert_eq!(degree(&store, "ind").await, 3);

    assert!(store.get_node(&NodeId::from("tool")).await.unwrap().is_none());

    let requirement = named(&store, EntityLabel::Concept, "requirement").await;
    assert_eq!(requirement.len(), 1);
    assert!(named(&store, EntityLabel::Concept, "requirements").await.is_empty());
    assert_eq!(degree(&store, "req1").await, 2);

    // 6 chunks + iso 26262, traceability, automotive, requirement
    assert_eq!(store.node_count().unwrap(), 10);
    assert_eq!(store.edge_count().unwrap(), 12);

    let merged = summary.stage(FixStage::SameLabel).unwrap();
    assert_eq!(merged.applied, 1);
    assert_eq!(merged.relationships_migrated, 2);
}

#[tokio::test]
async fn test_second_apply_is_a_no_op() {
    let store = Arc::new(messy_graph());
    let orchestrator = orchestrator(store.clone());

    let first = orchestrator.apply().await;
    assert!(first.total_changes() > 0);
    let fixture = store.to_fixture().unwrap();

    let second = orchestrator.apply().await;
    assert_eq!(second.total_changes(), 0);
    assert!(second.converged());
    assert_eq!(store.to_fixture().unwrap(), fixture);
}

#[tokio::test]
async fn test_generic_term_without_relationships_is_deleted() {
    let store = Arc::new(MemoryGraphStore::new());
    store
        .insert_node(EntityNode::new("t", EntityLabel::Concept, "tool"))
        .unwrap();
    let orchestrator = orchestrator(store.clone());

    let preview = orchestrator.preview().await.unwrap();
    assert_eq!(preview.report.counts().generic_deletions, 1);
    assert_eq!(preview.relationships_to_delete, 0);

    let summary = orchestrator.apply().await;
    let stage = summary.stage(FixStage::GenericFilter).unwrap();
    assert_eq!(stage.applied, 1);
    assert_eq!(stage.relationships_removed, 0);
    assert_eq!(store.node_count().unwrap(), 0);
}

#[tokio::test]
async fn test_vacuous_industry_is_detach_deleted() {
    let store = Arc::new(MemoryGraphStore::new());
    store.insert_node(chunk("c1")).unwrap();
    store.insert_node(chunk("c2")).unwrap();
    store
        .insert_node(EntityNode::new("i", EntityLabel::Industry, "Industry"))
        .unwrap();
    store.insert_relationship("i", "c1", "MENTIONED_IN").unwrap();
    store.insert_relationship("c2", "i", "ABOUT").unwrap();

    let summary = orchestrator(store.clone()).apply().await;
    let stage = summary.stage(FixStage::TaxonomyDelete).unwrap();
    assert_eq!(stage.applied, 1);
    assert_eq!(stage.relationships_removed, 2);
    assert_eq!(store.edge_count().unwrap(), 0);
    assert!(store.scan_label(EntityLabel::Industry).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_misclassified_industry_joins_existing_concept() {
    let store = Arc::new(MemoryGraphStore::new());
    store.insert_node(chunk("c1")).unwrap();
    store.insert_node(chunk("c2")).unwrap();
    store
        .insert_node(EntityNode::new("ind", EntityLabel::Industry, "automation"))
        .unwrap();
    store
        .insert_node(EntityNode::new("con", EntityLabel::Concept, "automation"))
        .unwrap();
    store.insert_relationship("ind", "c1", "MENTIONED_IN").unwrap();
    store.insert_relationship("con", "c2", "MENTIONED_IN").unwrap();

    let summary = orchestrator(store.clone()).apply().await;
    assert!(summary.converged());
    assert_eq!(summary.stage(FixStage::TaxonomyReclassify).unwrap().applied, 1);

    assert!(store.scan_label(EntityLabel::Industry).await.unwrap().is_empty());
    let concepts = named(&store, EntityLabel::Concept, "automation").await;
    assert_eq!(concepts.len(), 1);
    assert_eq!(degree(&store, concepts[0].id.as_str()).await, 2);
}

#[tokio::test]
async fn test_fixture_round_trip_after_apply() {
    let store = Arc::new(messy_graph());
    orchestrator(store.clone()).apply().await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clean.json");
    store.save(&path).unwrap();

    let reloaded = Arc::new(MemoryGraphStore::load(&path).unwrap());
    let (_, report) = orchestrator(reloaded).detect().await.unwrap();
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_definition_for_renamed_industry_lands_in_first_pass() {
    let store = Arc::new(MemoryGraphStore::new());
    store.insert_node(chunk("c1")).unwrap();
    store
        .insert_node(EntityNode::new("ind", EntityLabel::Industry, "auto"))
        .unwrap();
    store.insert_relationship("ind", "c1", "MENTIONED_IN").unwrap();
    store
        .set_glossary([("automotive", "Design and manufacture of motor vehicles.")])
        .unwrap();
    let orchestrator = orchestrator(store.clone());

    let first = orchestrator.apply().await;
    assert!(first.converged(), "remaining: {:?}", first.remaining);
    assert_eq!(first.stage(FixStage::TaxonomyKeep).unwrap().applied, 1);
    assert_eq!(first.stage(FixStage::DefinitionBackfill).unwrap().applied, 1);

    let node = store.get_node(&NodeId::from("ind")).await.unwrap().unwrap();
    assert_eq!(node.name, "automotive");
    assert!(node.definition_text().is_some());

    let second = orchestrator.apply().await;
    assert_eq!(second.total_changes(), 0);
}

#[tokio::test]
async fn test_unknown_industry_is_left_untouched() {
    let store = Arc::new(MemoryGraphStore::new());
    store.insert_node(chunk("c1")).unwrap();
    store
        .insert_node(EntityNode::new("ind", EntityLabel::Industry, "basket weaving"))
        .unwrap();
    store.insert_relationship("ind", "c1", "MENTIONED_IN").unwrap();
    let before = store.to_fixture().unwrap();
    let orchestrator = orchestrator(store.clone());

    let preview = orchestrator.preview().await.unwrap();
    assert_eq!(preview.report.counts().unknown_terms, 1);
    assert_eq!(preview.report.counts().total(), 0);

    let summary = orchestrator.apply().await;
    assert_eq!(summary.total_changes(), 0);
    assert!(summary.converged());
    assert_eq!(summary.remaining.unwrap().unknown_terms, 1);
    assert_eq!(store.to_fixture().unwrap(), before);

    let industries = store.scan_label(EntityLabel::Industry).await.unwrap();
    assert_eq!(industries.len(), 1);
    assert_eq!(industries[0].name, "basket weaving");
    assert_eq!(degree(&store, "ind").await, 1);
}

#[tokio::test]
async fn test_positive_outcome_challenge_becomes_concept() {
    let store = Arc::new(MemoryGraphStore::new());
    store.insert_node(chunk("c1")).unwrap();
    store
        .insert_node(EntityNode::new("ch", EntityLabel::Challenge, "improved safety"))
        .unwrap();
    store
        .insert_node(EntityNode::new("gap", EntityLabel::Challenge, "poor quality"))
        .unwrap();
    store.insert_relationship("ch", "c1", "MENTIONED_IN").unwrap();
    let orchestrator = orchestrator(store.clone());

    let (_, report) = orchestrator.detect().await.unwrap();
    assert_eq!(report.counts().mislabeled_challenges, 1);

    let summary = orchestrator.apply().await;
    assert!(summary.converged(), "remaining: {:?}", summary.remaining);
    assert_eq!(summary.stage(FixStage::MislabeledChallenge).unwrap().applied, 1);

    let node = store.get_node(&NodeId::from("ch")).await.unwrap().unwrap();
    assert!(node.has_label(EntityLabel::Concept));
    assert!(!node.has_label(EntityLabel::Challenge));
    assert_eq!(degree(&store, "ch").await, 1);
    assert_eq!(named(&store, EntityLabel::Challenge, "poor quality").await.len(), 1);
}

#[tokio::test]
async fn test_mislabeled_challenge_merges_into_existing_concept() {
    let store = Arc::new(MemoryGraphStore::new());
    store.insert_node(chunk("c1")).unwrap();
    store.insert_node(chunk("c2")).unwrap();
    store
        .insert_node(EntityNode::new("ch", EntityLabel::Challenge, "high-quality products"))
        .unwrap();
    store
        .insert_node(EntityNode::new("co", EntityLabel::Concept, "high-quality products"))
        .unwrap();
    store.insert_relationship("ch", "c1", "MENTIONED_IN").unwrap();
    store.insert_relationship("co", "c2", "MENTIONED_IN").unwrap();
    let orchestrator = orchestrator(store.clone());

    let summary = orchestrator.apply().await;
    assert!(summary.converged(), "remaining: {:?}", summary.remaining);
    let stage = summary.stage(FixStage::MislabeledChallenge).unwrap();
    assert_eq!(stage.applied, 1);
    assert_eq!(stage.relationships_migrated, 1);

    assert!(store.scan_label(EntityLabel::Challenge).await.unwrap().is_empty());
    let concepts = named(&store, EntityLabel::Concept, "high-quality products").await;
    assert_eq!(concepts.len(), 1);
    assert_eq!(degree(&store, concepts[0].id.as_str()).await, 2);
    assert_eq!(store.node_count().unwrap(), 3);

    assert_eq!(orchestrator.apply().await.total_changes(), 0);
}
