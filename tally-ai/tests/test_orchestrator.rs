mod common;

use common::{txn, Reply, ScriptedModel};
use tally_ai::{AiError, LanguageModel, Orchestrator, Progress};
use tally_core::{Category, CategorizedBy, Rule, RuleAuthor, RuleMatcher, Transaction};

fn rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "Netflix",
            RuleMatcher::DescriptionContains("NETFLIX".into()),
            Category::Entertainment,
            Some("Streaming"),
            0.95,
            RuleAuthor::User,
        )
        .with_id("netflix"),
    ]
}

fn statement() -> Vec<Transaction> {
    vec![
        txn("t1", "CORNER BISTRO", -42.0),
        txn("t2", "NETFLIX.COM", -15.99),
        txn("t3", "CITY WATER DEPT", -60.0),
        txn("t4", "NETFLIX.COM", -15.99),
    ]
}

#[tokio::test]
async fn test_rules_first_then_ai_for_the_rest() {
    let model = ScriptedModel::texts([r#"[
        {"index": 1, "category": "Dining", "subcategory": "Restaurants", "reason": "Bistro"},
        {"index": 2, "category": "Utilities", "subcategory": "Water", "reason": "Water bill"}
    ]"#]);
    let out = Orchestrator::new(Some(&model as &dyn LanguageModel))
        .categorize(&statement(), &rules(), Progress::none())
        .await
        .unwrap();

    let ids: Vec<&str> = out.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "t2", "t3", "t4"]);

    assert_eq!(out[0].categorized_by, Some(CategorizedBy::Ai));
    assert_eq!(out[0].rule_id, None);
    assert_eq!(out[1].categorized_by, Some(CategorizedBy::Rule));
    assert!(!out[1].ai_categorized);
    assert_eq!(out[2].subcategory.as_deref(), Some("Water"));
    assert_eq!(out[3].rule_id.as_deref(), Some("netflix"));

    // only unmatched transactions reach the model
    let prompt = &model.prompts()[0];
    assert!(prompt.contains("1. CORNER BISTRO"));
    assert!(prompt.contains("2. CITY WATER DEPT"));
    assert!(!prompt.contains("NETFLIX.COM"));
}

#[tokio::test]
async fn test_no_model_uses_keyword_classifier() {
    let out = Orchestrator::new(None)
        .categorize(&statement(), &rules(), Progress::none())
        .await
        .unwrap();
    assert_eq!(out.len(), 4);
    assert_eq!(out[0].category, Some(Category::Other));
    assert_eq!(out[0].subcategory.as_deref(), Some("Miscellaneous"));
    assert_eq!(out[0].categorized_by, None);
    assert_eq!(out[2].category, Some(Category::Utilities));
    assert_eq!(out[2].subcategory.as_deref(), Some("Other"));
    assert_eq!(out[1].category, Some(Category::Entertainment));
}

#[tokio::test]
async fn test_everything_matched_skips_the_model() {
    let model = ScriptedModel::default();
    let txns = vec![txn("t1", "NETFLIX.COM", -15.99)];
    let out = Orchestrator::new(Some(&model as &dyn LanguageModel))
        .categorize(&txns, &rules(), Progress::none())
        .await
        .unwrap();
    assert_eq!(out[0].rule_id.as_deref(), Some("netflix"));
    assert!(model.prompts().is_empty());
}

#[tokio::test]
async fn test_ai_failure_propagates() {
    let model = ScriptedModel::new([Reply::Status(401)]);
    let err = Orchestrator::new(Some(&model as &dyn LanguageModel))
        .categorize(&statement(), &rules(), Progress::none())
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::Api { status: 401, .. }));
}

#[tokio::test]
async fn test_logged_run_returns_batch_logs() {
    let model = ScriptedModel::texts([r#"[{"index": 1, "category": "Dining"}]"#, "[]"]);
    let (out, batches) = Orchestrator::new(Some(&model as &dyn LanguageModel))
        .with_ai_settings(tally_ai::AiSettings {
            batch_size: 1,
            ..Default::default()
        })
        .categorize_logged(&statement(), &rules(), Progress::none())
        .await
        .unwrap();

    assert_eq!(out.len(), 4);
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].transaction_count, 1);
    assert_eq!(batches[1].response, "[]");
    assert_eq!(batches[0].usage.map(|u| u.input_tokens), Some(100));
    assert_eq!(out[2].categorized_by, None);
}

#[tokio::test]
async fn test_unmatched_transactions_lose_stale_rule_tags() {
    let mut stale =
        txn("t1", "CORNER BISTRO", -42.0).with_category(Category::Dining, Some("Restaurants"));
    stale.rule_id = Some("deleted-rule".into());
    stale.rule_name = Some("Bistro".into());
    stale.categorized_by = Some(CategorizedBy::Rule);

    let model = ScriptedModel::texts(["[]"]);
    let out = Orchestrator::new(Some(&model as &dyn LanguageModel))
        .categorize(&[stale], &rules(), Progress::none())
        .await
        .unwrap();

    assert_eq!(out[0].category, Some(Category::Dining));
    assert_eq!(out[0].rule_id, None);
    assert_eq!(out[0].rule_name, None);
    assert_eq!(out[0].categorized_by, None);
}
