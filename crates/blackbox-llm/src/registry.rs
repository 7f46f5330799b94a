use std::collections::HashSet;

use blackbox_config::{Config, default_tiers};
use blackbox_utils::error::GenerationError;

use crate::types::ModelTier;

/// Ordered, non-empty set of model tiers with unique identifiers.
///
/// Tiers are kept sorted by rank; equal ranks keep their declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTierRegistry {
    tiers: Vec<ModelTier>,
}

impl ModelTierRegistry {
    /// # Errors
    ///
    /// Returns `GenerationError::Misconfiguration` for an empty list, a blank
    /// identifier, or a duplicated identifier.
    pub fn new(mut tiers: Vec<ModelTier>) -> Result<Self, GenerationError> {
        if tiers.is_empty() {
            return Err(GenerationError::Misconfiguration(
                "at least one model tier is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for tier in &tiers {
            if tier.id().trim().is_empty() {
                return Err(GenerationError::Misconfiguration(
                    "model tier identifiers must not be blank".to_string(),
                ));
            }
            if !seen.insert(tier.id()) {
                return Err(GenerationError::Misconfiguration(format!(
                    "model tier '{}' is listed more than once",
                    tier.id()
                )));
            }
        }

        tiers.sort_by_key(ModelTier::rank);
        Ok(Self { tiers })
    }

    /// Build from `[[generation.tiers]]`.
    ///
    /// # Errors
    ///
    /// See [`ModelTierRegistry::new`].
    pub fn from_config(config: &Config) -> Result<Self, GenerationError> {
        Self::new(config.generation.tiers.iter().map(ModelTier::from).collect())
    }

    /// All tiers, most preferred first.
    #[must_use]
    pub fn ordered(&self) -> &[ModelTier] {
        &self.tiers
    }

    /// Cascade order: `preferred` first (when registered), then every other
    /// tier in registry order, each exactly once.
    #[must_use]
    pub fn ordered_from(&self, preferred: Option<&str>) -> Vec<&ModelTier> {
        let mut order = Vec::with_capacity(self.tiers.len());
        if let Some(first) = preferred.and_then(|id| self.get(id)) {
            order.push(first);
        }
        order.extend(
            self.tiers
                .iter()
                .filter(|tier| Some(tier.id()) != preferred),
        );
        order
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ModelTier> {
        self.tiers.iter().find(|tier| tier.id() == id)
    }

    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.tiers.iter().position(|tier| tier.id() == id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// The best-ranked tier.
    #[must_use]
    pub fn default_tier(&self) -> &ModelTier {
        // Non-empty by construction
        &self.tiers[0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

impl Default for ModelTierRegistry {
    /// The built-in Gemini tiers: pro, flash, flash-8b.
    fn default() -> Self {
        Self {
            tiers: default_tiers().iter().map(ModelTier::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blackbox_config::CostClass;

    fn registry() -> ModelTierRegistry {
        ModelTierRegistry::new(vec![
            ModelTier::new("cheap", 2, CostClass::Cheap),
            ModelTier::new("premium", 0, CostClass::Premium),
            ModelTier::new("standard", 1, CostClass::Standard),
        ])
        .unwrap()
    }

    #[test]
    fn test_sorted_by_rank() {
        let registry = registry();
        let ids: Vec<&str> = registry.ordered().iter().map(ModelTier::id).collect();
        assert_eq!(ids, vec!["premium", "standard", "cheap"]);
        assert_eq!(registry.default_tier().id(), "premium");
    }

    #[test]
    fn test_ordered_from_preferred_then_rest() {
        let registry = registry();

        let ids: Vec<&str> = registry
            .ordered_from(Some("standard"))
            .into_iter()
            .map(ModelTier::id)
            .collect();
        assert_eq!(ids, vec!["standard", "premium", "cheap"]);

        let ids: Vec<&str> = registry
            .ordered_from(Some("unknown"))
            .into_iter()
            .map(ModelTier::id)
            .collect();
        assert_eq!(ids, vec!["premium", "standard", "cheap"]);

        assert_eq!(registry.ordered_from(None).len(), 3);
    }

    #[test]
    fn test_rejects_bad_lists() {
        assert!(ModelTierRegistry::new(Vec::new()).is_err());
        assert!(
            ModelTierRegistry::new(vec![
                ModelTier::new("a", 0, CostClass::Cheap),
                ModelTier::new("a", 1, CostClass::Cheap),
            ])
            .is_err()
        );
        assert!(ModelTierRegistry::new(vec![ModelTier::new(" ", 0, CostClass::Cheap)]).is_err());
    }

    #[test]
    fn test_default_matches_config_defaults() {
        let from_config = ModelTierRegistry::from_config(&Config::minimal_for_testing()).unwrap();
        assert_eq!(from_config, ModelTierRegistry::default());
        assert_eq!(from_config.position("gemini-1.5-flash-8b"), Some(2));
        assert!(from_config.contains("gemini-1.5-flash-latest"));
    }
}
