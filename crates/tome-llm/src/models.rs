//! Model resolution against the set of installed models.
//!
//! The pipeline uses two models: a small instruction-following one for
//! Stage 1 classification and a stronger one for Stage 2 synthesis. Either can
//! be pinned explicitly; otherwise the first installed entry of a preference
//! list wins.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Which pipeline stage a model is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    /// Stage 1: relevance classification.
    Selection,
    /// Stage 2: answer synthesis.
    Synthesis,
}

impl std::fmt::Display for ModelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelRole::Selection => write!(f, "selection"),
            ModelRole::Synthesis => write!(f, "synthesis"),
        }
    }
}

/// Preference order used when no model is pinned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPreferences {
    /// Preferred model names, best first.
    pub preferred: Vec<String>,
    /// Name fragments that disqualify a model from the last-resort pick.
    #[serde(default)]
    pub excluded: Vec<String>,
}

impl ModelPreferences {
    /// Defaults for Stage 1. Reasoning models are poor at terse classification.
    pub fn selection() -> Self {
        Self {
            preferred: [
                "qwen2.5:32b-instruct",
                "qwen2.5:32b",
                "qwen2.5:14b-instruct",
                "qwen2.5:14b",
                "qwen2.5:7b-instruct",
                "mistral-small:latest",
                "mistral-small",
                "mistral:7b",
                "hermes3:8b",
                "hermes3:latest",
                "llama3.2:3b",
                "llama3.1:8b",
                "phi3:medium",
            ]
            .map(String::from)
            .to_vec(),
            excluded: vec!["r1".to_string(), "deepseek".to_string()],
        }
    }

    /// Defaults for Stage 2.
    pub fn synthesis() -> Self {
        Self {
            preferred: [
                "llama3.1:8b-instruct",
                "llama3.1:8b",
                "gemma2:27b",
                "gemma2:9b",
                "mistral:7b",
                "granite3.1-dense:8b",
                "qwen2.5:7b",
                "llama3.3:70b",
                "llama3.1:70b-instruct",
                "llama3.1:70b",
            ]
            .map(String::from)
            .to_vec(),
            excluded: Vec::new(),
        }
    }

    /// Defaults for the given role.
    pub fn for_role(role: ModelRole) -> Self {
        match role {
            ModelRole::Selection => Self::selection(),
            ModelRole::Synthesis => Self::synthesis(),
        }
    }
}

/// How a model was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedFrom {
    /// Pinned by configuration or CLI flag.
    Explicit,
    /// Matched a preference-list entry.
    Preference,
    /// First acceptable installed model.
    LastResort,
}

/// A resolved model name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedModel {
    /// Model identifier to send to the service.
    pub name: String,
    /// How it was chosen.
    pub from: ResolvedFrom,
}

/// Resolve a model for `role`.
///
/// Returns `None` when nothing usable is installed. An explicit model is
/// returned as-is even if it is not in `available`; the service reports it
/// missing at first use, naming the model.
pub fn resolve_model(
    role: ModelRole,
    explicit: Option<&str>,
    available: &BTreeSet<String>,
    prefs: &ModelPreferences,
) -> Option<ResolvedModel> {
    if let Some(name) = explicit.map(str::trim).filter(|n| !n.is_empty()) {
        return Some(ResolvedModel {
            name: name.to_string(),
            from: ResolvedFrom::Explicit,
        });
    }

    for wanted in &prefs.preferred {
        if available.contains(wanted) {
            return Some(ResolvedModel {
                name: wanted.clone(),
                from: ResolvedFrom::Preference,
            });
        }
        // 'qwen2.5' matches 'qwen2.5:32b-instruct-q4_K_M'
        let base = wanted.split(':').next().unwrap_or(wanted);
        if let Some(found) = available.iter().find(|m| m.starts_with(base)) {
            return Some(ResolvedModel {
                name: found.clone(),
                from: ResolvedFrom::Preference,
            });
        }
    }

    let fallback = available.iter().find(|m| {
        let lower = m.to_lowercase();
        !prefs.excluded.iter().any(|x| lower.contains(&x.to_lowercase()))
    })?;

    tracing::warn!(role = %role, model = %fallback, "Using last-resort model");
    Some(ResolvedModel {
        name: fallback.clone(),
        from: ResolvedFrom::LastResort,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installed(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_explicit_wins() {
        let resolved = resolve_model(
            ModelRole::Synthesis,
            Some("custom:1b"),
            &installed(&["llama3.1:8b"]),
            &ModelPreferences::synthesis(),
        )
        .unwrap();
        assert_eq!(resolved.name, "custom:1b");
        assert_eq!(resolved.from, ResolvedFrom::Explicit);
    }

    #[test]
    fn test_blank_explicit_ignored() {
        let resolved = resolve_model(
            ModelRole::Synthesis,
            Some("  "),
            &installed(&["llama3.1:8b"]),
            &ModelPreferences::synthesis(),
        )
        .unwrap();
        assert_eq!(resolved.name, "llama3.1:8b");
    }

    #[test]
    fn test_preference_order() {
        let resolved = resolve_model(
            ModelRole::Selection,
            None,
            &installed(&["llama3.1:8b", "mistral:7b"]),
            &ModelPreferences::selection(),
        )
        .unwrap();
        assert_eq!(resolved.name, "mistral:7b");
        assert_eq!(resolved.from, ResolvedFrom::Preference);
    }

    #[test]
    fn test_base_name_prefix_match() {
        let resolved = resolve_model(
            ModelRole::Selection,
            None,
            &installed(&["qwen2.5:32b-instruct-q4_K_M"]),
            &ModelPreferences::selection(),
        )
        .unwrap();
        assert_eq!(resolved.name, "qwen2.5:32b-instruct-q4_K_M");
    }

    #[test]
    fn test_last_resort_skips_excluded() {
        let resolved = resolve_model(
            ModelRole::Selection,
            None,
            &installed(&["deepseek-r1:7b", "tinyllama:1b"]),
            &ModelPreferences::selection(),
        )
        .unwrap();
        assert_eq!(resolved.name, "tinyllama:1b");
        assert_eq!(resolved.from, ResolvedFrom::LastResort);
    }

    #[test]
    fn test_nothing_usable() {
        assert!(
            resolve_model(
                ModelRole::Selection,
                None,
                &installed(&["deepseek-r1:7b"]),
                &ModelPreferences::selection(),
            )
            .is_none()
        );
        assert!(
            resolve_model(
                ModelRole::Synthesis,
                None,
                &installed(&[]),
                &ModelPreferences::synthesis(),
            )
            .is_none()
        );
    }
}
