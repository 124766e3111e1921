//! Target path/filename/tags derivation (C8)
//!
//! A label's `canonical_filename` is authoritative: when the model
//! produced one, it is used as-is (extension preserved from the source
//! file). The `naming.format`/`naming.separator` config only builds a
//! fallback name when the label left that field empty.

use std::path::Path;

use sqlx::SqlitePool;
use thiserror::Error;

use crate::core::config::{LucienConfig, NamingConfig};
use crate::core::constants::NEEDS_REVIEW_DOC_TYPES;
use crate::data::catalog::CatalogError;
use crate::data::catalog::models::PlanCandidate;
use crate::data::catalog::repositories::{files_needing_planning, finish_run, insert_plan, start_run};

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Default, Clone)]
pub struct PlanSummary {
    pub run_id: i64,
    pub planned: usize,
    pub needs_review: usize,
}

struct DerivedTarget {
    group_path: String,
    filename: String,
}

fn derive_target(candidate: &PlanCandidate, naming: &NamingConfig) -> DerivedTarget {
    let source_ext = Path::new(&candidate.path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();

    let filename = match &candidate.canonical_filename {
        Some(name) if !name.is_empty() => {
            if Path::new(name).extension().is_some() {
                name.clone()
            } else {
                format!("{name}{source_ext}")
            }
        }
        _ => fallback_filename(candidate, naming, &source_ext),
    };

    let group_path = candidate
        .target_group_path
        .clone()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| capitalize_first(&candidate.doc_type));

    DerivedTarget {
        group_path,
        filename,
    }
}

fn fallback_filename(candidate: &PlanCandidate, naming: &NamingConfig, ext: &str) -> String {
    let date = candidate.date.as_deref().unwrap_or("undated");
    let title = candidate
        .title
        .as_deref()
        .unwrap_or(&candidate.doc_type)
        .replace(' ', "-");

    let parts = [date, candidate.doc_type.as_str(), title.as_str()];
    format!("{}{}", parts.join(&naming.separator), ext)
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn is_needs_review(candidate: &PlanCandidate, _config: &LucienConfig) -> bool {
    candidate.confidence < crate::core::constants::NEEDS_REVIEW_CONFIDENCE_THRESHOLD
        || NEEDS_REVIEW_DOC_TYPES.contains(&candidate.doc_type.as_str())
}

pub async fn run_planning(
    pool: &SqlitePool,
    config: &LucienConfig,
    limit: Option<i64>,
) -> Result<PlanSummary, PlannerError> {
    let run_id = start_run(pool, "plan", None).await?;
    let mut summary = PlanSummary {
        run_id,
        ..Default::default()
    };
    let page_size = limit.unwrap_or(500).min(500);
    let mut remaining = limit;

    loop {
        let page = match remaining {
            Some(r) if r <= 0 => break,
            Some(r) => page_size.min(r),
            None => page_size,
        };

        let candidates = files_needing_planning(pool, page).await?;
        if candidates.is_empty() {
            break;
        }

        for candidate in &candidates {
            let derived = derive_target(candidate, &config.naming);
            let target_path = config
                .staging_root
                .join(&derived.group_path)
                .join(&derived.filename)
                .to_string_lossy()
                .to_string();
            let needs_review = is_needs_review(candidate, config);

            insert_plan(
                pool,
                candidate.file_id,
                candidate.label_id,
                &config.materialize.default_mode,
                &candidate.path,
                &target_path,
                &derived.filename,
                candidate.suggested_tags.as_deref(),
                needs_review,
                run_id,
            )
            .await?;

            summary.planned += 1;
            if needs_review {
                summary.needs_review += 1;
            }
        }

        if let Some(r) = remaining.as_mut() {
            *r -= candidates.len() as i64;
        }
        if (candidates.len() as i64) < page {
            break;
        }
    }

    finish_run(pool, run_id, "completed", None).await?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naming() -> NamingConfig {
        NamingConfig {
            format: "YYYY-MM-DD__Domain__Issuer__Title".to_string(),
            separator: "__".to_string(),
            date_format: "%Y-%m-%d".to_string(),
        }
    }

    fn candidate(canonical_filename: Option<&str>) -> PlanCandidate {
        PlanCandidate {
            file_id: 1,
            path: "/archive/invoice.pdf".to_string(),
            label_id: 1,
            doc_type: "invoice".to_string(),
            title: Some("Acme Invoice".to_string()),
            canonical_filename: canonical_filename.map(str::to_string),
            suggested_tags: None,
            target_group_path: None,
            date: Some("2024-01-01".to_string()),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_derive_target_uses_canonical_filename_when_present() {
        let derived = derive_target(
            &candidate(Some("2024-01-01-acme-invoice")),
            &naming(),
        );
        assert_eq!(derived.filename, "2024-01-01-acme-invoice.pdf");
    }

    #[test]
    fn test_derive_target_preserves_existing_extension() {
        let derived = derive_target(&candidate(Some("already-named.pdf")), &naming());
        assert_eq!(derived.filename, "already-named.pdf");
    }

    #[test]
    fn test_derive_target_falls_back_without_canonical_filename() {
        let derived = derive_target(&candidate(None), &naming());
        assert_eq!(derived.filename, "2024-01-01__invoice__Acme-Invoice.pdf");
    }

    #[test]
    fn test_derive_target_group_path_defaults_to_capitalized_doc_type() {
        let derived = derive_target(&candidate(None), &naming());
        assert_eq!(derived.group_path, "Invoice");
    }
}
