//! Ordered, owned registry of appliance models.
//!
//! Insertion order is the default combination order. Models are stored in
//! canonical (ascending-mean) state order.

use super::appliance::ApplianceModel;
use crate::logging::event_names;
use fhmm_common::{ApplianceKey, Error, Result};
use fhmm_math::Permutation;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which registered models take part in a combination.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "by", content = "items")]
pub enum ModelSelection {
    /// Every model, in registration order.
    #[default]
    All,
    /// Named models, in the given order.
    ByKey(Vec<ApplianceKey>),
    /// Zero-based registry positions, in the given order.
    ByPosition(Vec<usize>),
}

#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Vec<ApplianceModel>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model, normalizing its state order first.
    ///
    /// Returns the permutation that was applied. Rejects a key that is
    /// already registered.
    pub fn insert(&mut self, model: ApplianceModel) -> Result<Permutation> {
        if self.contains(model.key()) {
            return Err(Error::DuplicateAppliance {
                key: model.key().to_string(),
            });
        }
        let (model, perm) = model.normalized();
        if !perm.is_identity() {
            tracing::debug!(
                event = event_names::MODEL_REORDERED,
                appliance = %model.key(),
                permutation = ?perm.as_slice(),
                "reordered states by ascending mean"
            );
        }
        tracing::debug!(
            event = event_names::MODEL_REGISTERED,
            appliance = %model.key(),
            n_states = model.n_states(),
            position = self.models.len(),
            "registered appliance model"
        );
        self.models.push(model);
        Ok(perm)
    }

    /// Build a registry from models in order.
    pub fn from_models<I>(models: I) -> Result<Self>
    where
        I: IntoIterator<Item = ApplianceModel>,
    {
        let mut registry = Self::new();
        for model in models {
            registry.insert(model)?;
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn contains(&self, key: &ApplianceKey) -> bool {
        self.models.iter().any(|m| m.key() == key)
    }

    pub fn get(&self, key: &ApplianceKey) -> Option<&ApplianceModel> {
        self.models.iter().find(|m| m.key() == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ApplianceModel> {
        self.models.iter()
    }

    /// Keys in registration order.
    pub fn keys(&self) -> Vec<&ApplianceKey> {
        self.models.iter().map(ApplianceModel::key).collect()
    }

    /// Resolve a selection to models, in selection order.
    ///
    /// An empty result is `NoModels`; naming the same model twice is
    /// `DuplicateAppliance`.
    pub fn select(&self, selection: &ModelSelection) -> Result<Vec<&ApplianceModel>> {
        let selected: Vec<&ApplianceModel> = match selection {
            ModelSelection::All => self.models.iter().collect(),
            ModelSelection::ByKey(keys) => keys
                .iter()
                .map(|key| {
                    self.get(key).ok_or_else(|| Error::UnknownAppliance {
                        key: key.to_string(),
                    })
                })
                .collect::<Result<_>>()?,
            ModelSelection::ByPosition(positions) => positions
                .iter()
                .map(|&position| {
                    self.models.get(position).ok_or(Error::PositionOutOfRange {
                        position,
                        len: self.models.len(),
                    })
                })
                .collect::<Result<_>>()?,
        };

        if selected.is_empty() {
            return Err(Error::NoModels);
        }
        let mut seen = HashSet::new();
        for model in &selected {
            if !seen.insert(model.key()) {
                return Err(Error::DuplicateAppliance {
                    key: model.key().to_string(),
                });
            }
        }
        Ok(selected)
    }
}
