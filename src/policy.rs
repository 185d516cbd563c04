//! Model sets and the required-model policy
//!
//! A file is worth submitting to full validation only if it declares at least
//! one of the required models and, when a target model is configured, that
//! target as well.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PrevalidationError, Result};

/// Application model of the LADM-COL cadastral survey profile
pub const LADM_COL_LEV_CAT_MODEL: &str = "Modelo_Aplicacion_LADMCOL_Lev_Cat_V1_0";

/// Set of model names a file declares; iteration order is lexicographic
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSet(BTreeSet<String>);

impl ModelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ModelSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for ModelSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl fmt::Display for ModelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Which models a file must declare
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequiredModelPolicy {
    required_any_of: Vec<String>,
    target: Option<String>,
}

impl RequiredModelPolicy {
    /// Build a policy; `required_any_of` must name at least one model
    pub fn new(required_any_of: Vec<String>, target: Option<String>) -> Result<Self> {
        if required_any_of.is_empty() {
            return Err(PrevalidationError::InvalidPolicy {
                details: "at least one required model must be given".to_string(),
            });
        }
        Ok(Self {
            required_any_of,
            target,
        })
    }

    /// Policy requiring any one of `required_any_of`, without a target
    pub fn any_of<I, S>(required_any_of: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(required_any_of.into_iter().map(Into::into).collect(), None)
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn required_any_of(&self) -> &[String] {
        &self.required_any_of
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Check `models` against this policy.
    ///
    /// The required-set rule always runs first so that a file lacking every
    /// required model reports that, not a target-specific message.
    pub fn evaluate(&self, models: &ModelSet) -> Result<()> {
        if !self
            .required_any_of
            .iter()
            .any(|name| models.contains(name))
        {
            return Err(PrevalidationError::MissingRequiredModels {
                required: self.required_any_of.clone(),
            });
        }

        if let Some(target) = &self.target
            && !models.contains(target)
        {
            return Err(PrevalidationError::MissingTargetModel {
                target: target.clone(),
            });
        }

        Ok(())
    }
}

impl Default for RequiredModelPolicy {
    fn default() -> Self {
        Self {
            required_any_of: vec![LADM_COL_LEV_CAT_MODEL.to_string()],
            target: None,
        }
    }
}
