//! Guardrail check results and name reconciliation.
//!
//! The backend declares, per agent, an ordered list of guardrail names that
//! are expected to run, but only the checks that actually ran this turn come
//! back with results — and the naming is inconsistent across turns (machine
//! slug, English display form, or localized display form). Reconciliation
//! folds every name onto one canonical identity and produces a display-ready
//! list that is stable across turns.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The result of one guardrail check for one turn.
///
/// Identity for matching across turns is `name` (after canonicalization),
/// not `id`. An empty `input` marks a check the backend declared but did not
/// run this turn; downstream treats that as "not yet evaluated" rather than
/// a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailCheck {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub reasoning: String,
    pub passed: bool,
    pub timestamp: DateTime<Utc>,
}

impl GuardrailCheck {
    /// Synthesizes the "declared but not yet evaluated" placeholder for a
    /// guardrail name the turn produced no result for.
    fn placeholder(name: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            input: String::new(),
            reasoning: String::new(),
            passed: false,
            timestamp: Utc::now(),
        }
    }

    /// `true` if this entry is a placeholder for a check that has not run.
    pub fn is_pending(&self) -> bool {
        self.input.is_empty()
    }
}

/// Known synonyms folded onto one canonical identity (the machine slug).
///
/// The backend emits whichever form its guardrail objects happen to carry:
/// the function-name slug, the title-cased English name, or the localized
/// display string.
static GUARDRAIL_NAME_SYNONYMS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("relevance_guardrail", "relevance_guardrail"),
        ("Relevance Guardrail", "relevance_guardrail"),
        ("相关性守卫", "relevance_guardrail"),
        ("jailbreak_guardrail", "jailbreak_guardrail"),
        ("Jailbreak Guardrail", "jailbreak_guardrail"),
        ("越狱守卫", "jailbreak_guardrail"),
    ])
});

/// Friendly display forms for canonical guardrail identities.
static GUARDRAIL_DISPLAY_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("relevance_guardrail", "Relevance Guardrail"),
        ("jailbreak_guardrail", "Jailbreak Guardrail"),
    ])
});

/// Resolves a raw guardrail name to its canonical identity.
///
/// Names outside the synonym table pass through unchanged (identity = the
/// literal string); that is a data-quality signal, not an error.
pub fn canonical_guardrail_name(raw: &str) -> &str {
    match GUARDRAIL_NAME_SYNONYMS.get(raw) {
        Some(canonical) => *canonical,
        None => {
            tracing::debug!(name = raw, "guardrail name missing from synonym table");
            raw
        }
    }
}

/// Returns the friendly display form for a guardrail name.
pub fn display_guardrail_name(raw: &str) -> &str {
    let canonical = canonical_guardrail_name(raw);
    GUARDRAIL_DISPLAY_NAMES.get(canonical).copied().unwrap_or(raw)
}

/// Reconciles a turn's guardrail results against the declared name list.
///
/// The declared list is authoritative for what to show and in which order;
/// the results are authoritative for status. The output always has exactly
/// `declared.len()` entries, in declared order:
///
/// - a declared name with a canonically matching result uses that result
///   as-is;
/// - a declared name without a result gets a placeholder with empty `input`
///   and `passed = false` ("not yet evaluated");
/// - a result matching no declared name is dropped from the displayed set.
pub fn reconcile(declared: &[String], results: &[GuardrailCheck]) -> Vec<GuardrailCheck> {
    let reconciled: Vec<GuardrailCheck> = declared
        .iter()
        .map(|name| {
            let canonical = canonical_guardrail_name(name);
            results
                .iter()
                .find(|check| canonical_guardrail_name(&check.name) == canonical)
                .cloned()
                .unwrap_or_else(|| GuardrailCheck::placeholder(name))
        })
        .collect();

    for check in results {
        let canonical = canonical_guardrail_name(&check.name);
        if !declared
            .iter()
            .any(|name| canonical_guardrail_name(name) == canonical)
        {
            tracing::debug!(name = %check.name, "dropping guardrail result not in declared set");
        }
    }

    reconciled
}
