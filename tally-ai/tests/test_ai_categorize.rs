mod common;

use common::{txn, Reply, ScriptedModel};
use tally_ai::{AiCategorizer, AiError, AiSettings, Progress, ProgressEvent};
use tally_core::{Category, CategorizedBy};

fn settings(batch_size: usize) -> AiSettings {
    AiSettings {
        batch_size,
        ..AiSettings::default()
    }
}

#[tokio::test]
async fn test_batches_are_indexed_from_one() {
    let model = ScriptedModel::texts([
        r#"[{"index": 1, "category": "Entertainment", "subcategory": "Streaming",
              "reason": "Video service"},
            {"index": 2, "category": "Dining", "subcategory": "Coffee Shops",
              "reason": "Coffee"}]"#,
        r#"Sure! [{"index": 1, "category": "Transportation", "subcategory": "Fuel",
                   "reason": "Gas"},
            {"index": 2, "category": "Income", "subcategory": "Salary", "reason": "Payroll"}]"#,
        r#"[{"index": 1, "category": "Groceries", "subcategory": "Supermarket"}]"#,
    ]);
    let txns = vec![
        txn("t1", "NETFLIX.COM", -15.99),
        txn("t2", "STARBUCKS", -5.0),
        txn("t3", "SHELL OIL", -40.0),
        txn("t4", "ACME PAYROLL", 2000.0),
        txn("t5", "KROGER #12", -60.0),
    ];

    let mut events = Vec::new();
    let mut sink = |e: &ProgressEvent| events.push(e.clone());
    let out = AiCategorizer::new(&model)
        .with_settings(settings(2))
        .categorize(&txns, Progress::from(&mut sink as tally_ai::ProgressFn<'_>))
        .await
        .unwrap();

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[1].contains("1. SHELL OIL - $40"));
    assert!(prompts[1].contains("2. ACME PAYROLL - $2000"));

    assert_eq!(out.len(), 5);
    assert_eq!(out[0].category, Some(Category::Entertainment));
    assert_eq!(out[2].subcategory.as_deref(), Some("Fuel"));
    assert_eq!(out[3].category, Some(Category::Income));
    assert_eq!(out[4].ai_reason.as_deref(), Some("Categorized by AI"));
    assert!(out.iter().all(|t| t.ai_categorized && t.categorized_by == Some(CategorizedBy::Ai)));

    assert_eq!(
        events.first(),
        Some(&ProgressEvent::CategorizationBatch { batch: 1, total_batches: 3, size: 2 })
    );
    assert_eq!(events.len(), 6);
}

#[tokio::test]
async fn test_malformed_batch_fails_with_preview() {
    let garbage = format!("I could not do that. {}", "x".repeat(400));
    let model = ScriptedModel::texts([
        r#"[{"index": 1, "category": "Dining", "subcategory": "Restaurants", "reason": "Food"}]"#
            .to_string(),
        garbage,
    ]);
    let mut txns = vec![txn("t1", "CHIPOTLE", -12.0), txn("t2", "MYSTERY", -3.0)];

    let err = AiCategorizer::new(&model)
        .with_settings(settings(1))
        .categorize_in_place(&mut txns, Progress::none())
        .await
        .unwrap_err();

    match &err {
        AiError::InvalidAiResponse { operation, preview, .. } => {
            assert_eq!(*operation, "categorization");
            assert_eq!(preview.chars().count(), 200);
            assert!(preview.starts_with("I could not do that."));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().starts_with("Invalid response format from AI"));

    // the first batch stays applied in place
    assert_eq!(txns[0].category, Some(Category::Dining));
    assert_eq!(txns[1].category, None);
}

#[tokio::test]
async fn test_object_response_is_rejected() {
    let model = ScriptedModel::texts([r#"{"results": "none"}"#]);
    let err = AiCategorizer::new(&model)
        .categorize(&[txn("t1", "X", -1.0)], Progress::none())
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::InvalidAiResponse { .. }));
}

#[tokio::test]
async fn test_api_error_aborts_remaining_batches() {
    let model = ScriptedModel::new([Reply::Status(529), Reply::Text("[]".into())]);
    let err = AiCategorizer::new(&model)
        .with_settings(settings(1))
        .categorize(&[txn("t1", "A", -1.0), txn("t2", "B", -1.0)], Progress::none())
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::Api { status: 529, .. }));
    assert_eq!(model.prompts().len(), 1);
}
