//! Labeling escalation loop (C7)
//!
//! Runs the default model first; if the result looks uncertain or the
//! document type is sensitive, escalates to the configured escalation
//! model and keeps its answer instead. The escalation predicate never
//! looks at the escalation model's own output, so a run can't ping-pong.

use sqlx::SqlitePool;
use thiserror::Error;

use crate::core::config::LucienConfig;
use crate::core::constants::CRITICAL_FIELD_DOC_TYPES;
use crate::data::catalog::CatalogError;
use crate::data::catalog::models::LabelCandidate;
use crate::data::catalog::repositories::{files_needing_labeling, insert_label};
use crate::domain::extract::store;

use super::client::{LabelResponse, LlmClient, LlmError};
use super::context::LabelingContext;
use super::prompts::{prompt_version, system_prompt, user_prompt};

#[derive(Error, Debug)]
pub enum LabelEngineError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("llm error: {0}")]
    Llm(#[from] LlmError),
}

#[derive(Debug, Default, Clone)]
pub struct LabelSummary {
    pub attempted: usize,
    pub escalated: usize,
    pub failed: usize,
}

/// Whether a label's result should be escalated to the stronger model:
/// doc types configured as always-sensitive, confidence below the
/// threshold, or a doc type that needs a date/issuer field it's missing.
fn should_escalate(config: &LucienConfig, label: &LabelResponse) -> bool {
    if config.llm.escalation_doc_types.iter().any(|d| d == &label.doc_type) {
        return true;
    }
    if label.confidence < config.llm.escalation_threshold {
        return true;
    }
    if CRITICAL_FIELD_DOC_TYPES.contains(&label.doc_type.as_str())
        && (label.date.is_none() || label.issuer.is_none())
    {
        return true;
    }
    false
}

async fn label_one(
    client: &LlmClient,
    config: &LucienConfig,
    candidate: &LabelCandidate,
) -> Result<(LabelResponse, String, bool), LabelEngineError> {
    let text = store::read_sidecar(&config.extracted_text_dir, &candidate.sidecar_path)
        .map_err(|e| LlmError::Malformed(format!("failed to read sidecar: {e}")))?;

    let context = LabelingContext::build(&candidate.path);
    let system = system_prompt(&config.taxonomy);
    let user = user_prompt(&context, &text);

    let default_raw = client
        .complete(&config.llm.default_model, &system, &user)
        .await?;
    let default_label = super::client::parse_label_response(&default_raw, &config.taxonomy)?;

    if !should_escalate(config, &default_label) {
        return Ok((default_label, config.llm.default_model.clone(), false));
    }

    tracing::info!(
        file = candidate.path,
        doc_type = default_label.doc_type,
        confidence = default_label.confidence,
        "escalating to stronger model"
    );

    let escalated_raw = client
        .complete(&config.llm.escalation_model, &system, &user)
        .await?;
    let escalated_label = super::client::parse_label_response(&escalated_raw, &config.taxonomy)?;

    Ok((escalated_label, config.llm.escalation_model.clone(), true))
}

pub async fn run_labeling(
    pool: &SqlitePool,
    config: &LucienConfig,
    limit: Option<i64>,
) -> Result<LabelSummary, LabelEngineError> {
    let client = LlmClient::new(&config.llm)?;
    client.probe().await?;

    let run_id = crate::data::catalog::repositories::start_run(pool, "label", None).await?;
    let version = prompt_version(&config.taxonomy);

    let mut summary = LabelSummary::default();
    let page_size = limit.unwrap_or(500).min(500);
    let mut remaining = limit;

    loop {
        let page = match remaining {
            Some(r) if r <= 0 => break,
            Some(r) => page_size.min(r),
            None => page_size,
        };

        let candidates = files_needing_labeling(pool, page).await?;
        if candidates.is_empty() {
            break;
        }

        for candidate in &candidates {
            summary.attempted += 1;
            match label_one(&client, config, candidate).await {
                Ok((label, model_name, escalated)) => {
                    if escalated {
                        summary.escalated += 1;
                    }
                    insert_label(
                        pool,
                        candidate.file_id,
                        &label.doc_type,
                        label.title.as_deref(),
                        label.canonical_filename.as_deref(),
                        (!label.suggested_tags.is_empty())
                            .then(|| label.suggested_tags.join(","))
                            .as_deref(),
                        label.target_group_path.as_deref(),
                        label.date.as_deref(),
                        label.issuer.as_deref(),
                        None,
                        label.confidence,
                        label.explanation.as_deref(),
                        &model_name,
                        &version,
                        escalated,
                        run_id,
                    )
                    .await?;
                }
                Err(e) => {
                    tracing::warn!(file = candidate.path, error = %e, "labeling failed for file");
                    summary.failed += 1;
                }
            }
        }

        if let Some(r) = remaining.as_mut() {
            *r -= candidates.len() as i64;
        }
        if (candidates.len() as i64) < page {
            break;
        }
    }

    crate::data::catalog::repositories::finish_run(pool, run_id, "completed", None).await?;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LlmConfig;

    fn base_config() -> LucienConfig {
        let mut config = LucienConfig {
            source_root: None,
            index_db: "catalog.db".into(),
            extracted_text_dir: "extracted".into(),
            staging_root: "staging".into(),
            llm: LlmConfig::default(),
            extraction: Default::default(),
            scan: Default::default(),
            taxonomy: Default::default(),
            naming: Default::default(),
            materialize: Default::default(),
            pool: Default::default(),
        };
        config.llm.escalation_threshold = 0.7;
        config.llm.escalation_doc_types = vec!["medical".to_string()];
        config
    }

    fn label(doc_type: &str, confidence: f64) -> LabelResponse {
        LabelResponse {
            doc_type: doc_type.to_string(),
            title: None,
            canonical_filename: None,
            suggested_tags: vec![],
            target_group_path: None,
            date: Some("2023-01-01".to_string()),
            issuer: Some("Acme".to_string()),
            confidence,
            explanation: None,
        }
    }

    #[test]
    fn test_should_escalate_on_sensitive_doc_type() {
        let config = base_config();
        assert!(should_escalate(&config, &label("medical", 0.95)));
    }

    #[test]
    fn test_should_escalate_on_low_confidence() {
        let config = base_config();
        assert!(should_escalate(&config, &label("receipt", 0.3)));
    }

    #[test]
    fn test_should_not_escalate_confident_non_sensitive() {
        let config = base_config();
        assert!(!should_escalate(&config, &label("receipt", 0.95)));
    }

    #[test]
    fn test_should_escalate_critical_doc_type_missing_fields() {
        let config = base_config();
        let mut l = label("financial", 0.95);
        l.date = None;
        assert!(should_escalate(&config, &l));
    }
}
