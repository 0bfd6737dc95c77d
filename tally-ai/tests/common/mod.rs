#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::Mutex;
use tally_ai::{AiError, Completion, LanguageModel, TokenUsage};
use tally_core::{Category, Transaction};

pub enum Reply {
    Text(String),
    Status(u16),
}

/// Replays canned replies in order and records every prompt
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Reply>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn texts<S: Into<String>>(texts: impl IntoIterator<Item = S>) -> Self {
        Self::new(texts.into_iter().map(|t| Reply::Text(t.into())))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(
        &self,
        operation: &'static str,
        prompt: &str,
        _max_tokens: u32,
    ) -> tally_ai::Result<Completion> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = self.replies.lock().unwrap().pop_front().expect("script ran out of replies");
        match reply {
            Reply::Text(text) => Ok(Completion {
                text,
                model: "scripted".to_string(),
                usage: Some(TokenUsage {
                    input_tokens: 100,
                    output_tokens: 50,
                }),
            }),
            Reply::Status(status) => Err(AiError::Api {
                operation,
                status,
                body: "scripted failure".to_string(),
            }),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

pub fn txn(id: &str, desc: &str, amount: f64) -> Transaction {
    let date = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
    Transaction::new(id, date, desc, amount, "statement.csv")
}

pub fn categorized(id: &str, desc: &str, category: Category) -> Transaction {
    txn(id, desc, -20.0).with_category(category, None)
}
