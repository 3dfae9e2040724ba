//! End-to-end agent runs against scripted providers.

use std::sync::Arc;
use std::time::Duration;
use storymap_agent::{AgentConfig, GenerationConfig, StoryMapAgent};
use storymap_core::{InMemoryCache, StoryMap};
use storymap_model::{MockProvider, OrchestratorRegistry, Outcome};

const BOOKSTORE_REQUIREMENTS: &str =
    "Online bookstore: users search, add to cart, checkout, track orders; admins manage catalog.";
const BOOKSTORE_MAP: &str = include_str!("fixtures/bookstore_map.json");

fn agent_with(mock: &Arc<MockProvider>) -> StoryMapAgent {
    let registry = OrchestratorRegistry::new().with_provider(mock.clone()).with_priority(["mock"]);
    StoryMapAgent::new(Arc::new(registry))
}

fn bookstore() -> StoryMap {
    serde_json::from_str(BOOKSTORE_MAP).unwrap()
}

/// The bookstore map with its cart story copied into the catalog activity.
fn bookstore_with_duplicate() -> String {
    let mut map = bookstore();
    let copy = map.activities[0].tasks[1].stories[0].clone();
    map.activities[1].tasks[0].stories.push(copy);
    serde_json::to_string(&map).unwrap()
}

#[tokio::test]
async fn test_bookstore_end_to_end() {
    let mock = Arc::new(MockProvider::new("mock").with_response(BOOKSTORE_MAP));
    let output = agent_with(&mock).run(BOOKSTORE_REQUIREMENTS).await.unwrap();

    let assessment = output.validation.as_ref().unwrap();
    assert!(assessment.validation.is_valid);
    assert!(assessment.validation.score >= 60, "score {}", assessment.validation.score);
    let similarity = assessment.similarity.as_ref().unwrap();
    assert_eq!(similarity.duplicate_groups().count(), 0);

    assert_eq!(output.map, bookstore());
    assert_eq!(output.run.provider_used.as_deref(), Some("mock"));
    assert!(!output.run.fix_attempted);
    assert_eq!(output.run.critical_issues_before_fix, 0);
    assert_eq!(output.run.duplicates_found, 0);
    assert_eq!(mock.call_count(), 1);
    assert!(mock.requests()[0].body["user"].as_str().unwrap().contains(BOOKSTORE_REQUIREMENTS));
}

#[tokio::test]
async fn test_duplicates_alone_trigger_a_fix() {
    let mock = Arc::new(MockProvider::new("mock").with_response(bookstore_with_duplicate()).with_response(BOOKSTORE_MAP));
    let output = agent_with(&mock).run(BOOKSTORE_REQUIREMENTS).await.unwrap();

    assert!(output.run.fix_attempted);
    assert!(output.run.fix_successful);
    assert_eq!(output.run.critical_issues_before_fix, 0);
    assert_eq!(output.run.duplicates_found, 0);
    assert_eq!(output.run.fix_provider.as_deref(), Some("mock"));
    assert_eq!(output.map, bookstore());
    assert_eq!(mock.call_count(), 2);

    let fix_request = &mock.requests()[1];
    let prompt = fix_request.body["user"].as_str().unwrap();
    assert!(prompt.contains("Duplicates: Add book to cart, Add book to cart"), "{prompt}");
    assert!(prompt.contains("\"productName\": \"Online Bookstore\""));
    assert_eq!(fix_request.body["temperature"].as_f64().unwrap() as f32, 0.3);
    assert_eq!(fix_request.timeout.as_secs(), 45);
}

#[tokio::test]
async fn test_failed_fix_keeps_generated_map() {
    let empty = r#"{"productName": "Nothing", "personas": [], "map": []}"#;
    let mock = Arc::new(
        MockProvider::new("mock").with_response(empty).with_outcome(Outcome::Fatal("400 invalid request".to_string())),
    );
    let output = agent_with(&mock).run("A product nobody has described yet").await.unwrap();

    assert!(output.run.fix_attempted);
    assert!(!output.run.fix_successful);
    assert_eq!(output.run.fix_provider, None);
    assert_eq!(output.run.critical_issues_before_fix, 1);
    assert_eq!(output.run.critical_issues_after_fix, 1);
    assert_eq!(output.map.product_name, "Nothing");
    assert!(output.map.activities.is_empty());
    let assessment = output.validation.unwrap();
    assert!(!assessment.validation.is_valid);
    assert!(assessment.similarity.is_none());
}

#[tokio::test]
async fn test_unparseable_fix_keeps_generated_map() {
    let mock = Arc::new(
        MockProvider::new("mock").with_response(bookstore_with_duplicate()).with_response("I could not fix it"),
    );
    let output = agent_with(&mock).run(BOOKSTORE_REQUIREMENTS).await.unwrap();

    assert!(output.run.fix_attempted);
    assert!(!output.run.fix_successful);
    assert_eq!(output.map.story_count(), 5);
    assert_eq!(output.run.duplicates_found, 1);
}

#[tokio::test]
async fn test_fix_that_breaks_the_map_is_not_successful() {
    let broken = r#"{"productName": "Online Bookstore", "personas": [], "map": []}"#;
    let mock = Arc::new(MockProvider::new("mock").with_response(bookstore_with_duplicate()).with_response(broken));
    let output = agent_with(&mock).run(BOOKSTORE_REQUIREMENTS).await.unwrap();

    assert!(output.run.fix_attempted);
    assert!(!output.run.fix_successful);
    assert_eq!(output.run.critical_issues_before_fix, 0);
    assert_eq!(output.run.critical_issues_after_fix, 0);
    assert_eq!(output.run.duplicates_found, 1);
    assert_eq!(output.map.activities.len(), 2);
    assert_eq!(output.map.story_count(), 5);
    assert!(output.validation.unwrap().validation.is_valid);
}

#[tokio::test]
async fn test_fix_run_records_every_stage_timing() {
    let mock = Arc::new(MockProvider::new("mock").with_response(bookstore_with_duplicate()).with_response(BOOKSTORE_MAP));
    let output = agent_with(&mock).run(BOOKSTORE_REQUIREMENTS).await.unwrap();
    let timings = &output.run.timings;

    assert!(output.run.fix_attempted);
    assert!(timings.generation > Duration::ZERO);
    assert!(timings.validation > Duration::ZERO);
    assert!(timings.fix > Duration::ZERO);
    assert!(timings.total >= timings.generation + timings.validation + timings.fix);
}

#[tokio::test]
async fn test_critical_fix_success_is_measured_on_errors() {
    let empty = r#"{"productName": "Bookstore", "map": []}"#;
    let mock = Arc::new(MockProvider::new("mock").with_response(empty).with_response(BOOKSTORE_MAP));
    let output = agent_with(&mock).run(BOOKSTORE_REQUIREMENTS).await.unwrap();

    assert!(output.run.fix_successful);
    assert_eq!(output.run.critical_issues_after_fix, 0);
    assert!(output.validation.unwrap().validation.is_valid);
}

#[tokio::test]
async fn test_fix_can_be_disabled() {
    let mock = Arc::new(MockProvider::new("mock").with_response(bookstore_with_duplicate()));
    let output = agent_with(&mock)
        .with_config(AgentConfig::default().with_fix(false))
        .unwrap()
        .run(BOOKSTORE_REQUIREMENTS)
        .await
        .unwrap();

    assert!(!output.run.fix_attempted);
    assert_eq!(output.run.duplicates_found, 1);
    assert_eq!(mock.call_count(), 1);
}

#[test]
fn test_invalid_config_is_rejected() {
    let mock = Arc::new(MockProvider::new("mock"));
    let result = agent_with(&mock).with_config(AgentConfig::default().with_fix_timeout(Duration::ZERO));
    assert_eq!(result.err().map(|e| e.field), Some("fix_timeout".to_string()));

    let result = agent_with(&mock).with_generation_config(GenerationConfig::default().with_temperature(4.0));
    assert_eq!(result.err().map(|e| e.field), Some("temperature".to_string()));
}

#[tokio::test]
async fn test_validation_can_be_disabled() {
    let empty = r#"{"productName": "Nothing", "map": []}"#;
    let mock = Arc::new(MockProvider::new("mock").with_response(empty));
    let output = agent_with(&mock)
        .with_config(AgentConfig::default().with_validation(false))
        .unwrap()
        .run(BOOKSTORE_REQUIREMENTS)
        .await
        .unwrap();

    assert!(output.validation.is_none());
    assert!(!output.run.fix_attempted);
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_repeated_run_uses_cache() {
    let mock = Arc::new(MockProvider::new("mock").with_response(BOOKSTORE_MAP));
    let agent = agent_with(&mock).with_cache(Arc::new(InMemoryCache::new()));

    let first = agent.run(BOOKSTORE_REQUIREMENTS).await.unwrap();
    let second = agent.run(BOOKSTORE_REQUIREMENTS).await.unwrap();

    assert_eq!(mock.call_count(), 1);
    assert!(!first.run.from_cache);
    assert!(second.run.from_cache);
    assert_eq!(second.run.provider_used, None);
    assert_eq!(first.map, second.map);
    assert_ne!(first.run.run_id, second.run.run_id);

    let uncached = agent.with_config(AgentConfig::default().with_cache(false)).unwrap();
    uncached.run(BOOKSTORE_REQUIREMENTS).await.unwrap();
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn test_generation_errors_propagate() {
    let mock = Arc::new(MockProvider::new("mock").with_outcome(Outcome::Retryable("503 overloaded".to_string())));
    let err = agent_with(&mock).run(BOOKSTORE_REQUIREMENTS).await.unwrap_err();
    assert!(err.to_string().contains("All providers failed"), "{err}");
}

#[tokio::test]
async fn test_run_metrics_serialize() {
    let mock = Arc::new(MockProvider::new("mock").with_response(BOOKSTORE_MAP));
    let output = agent_with(&mock).run(BOOKSTORE_REQUIREMENTS).await.unwrap();

    let value = serde_json::to_value(&output).unwrap();
    assert_eq!(value["map"]["productName"], "Online Bookstore");
    assert_eq!(value["run"]["fix_attempted"], false);
    assert_eq!(value["validation"]["similarity"]["stats"]["algorithm"], "tfidf");
    assert!(value["run"]["run_id"].is_string());
}
