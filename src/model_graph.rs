//! Model dependency graph as recorded by ili2db
//!
//! ili2db stores each imported model in `t_ili2db_model.modelname`, either as
//! a bare name or as a run of `Model{dep1 dep2}` groups:
//!
//! ```text
//! D_G_C_V2_9_6{ LADM_COL_V1_2 ISO19107_PLANAS_V1} D_SNR_V2_9_6{ LADM_COL_V1_2}
//! ```

use std::collections::HashMap;

use crate::error::{PrevalidationError, Result};

/// Direct dependencies of each registered model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelDependencyGraph {
    edges: HashMap<String, Vec<String>>,
}

impl ModelDependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from every raw registry value; later entries for the
    /// same model replace earlier ones
    pub fn from_registry<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut graph = Self::new();
        for entry in entries {
            for (model, dependencies) in parse_registry_entry(entry.as_ref())? {
                graph.edges.insert(model, dependencies);
            }
        }
        Ok(graph)
    }

    /// Direct dependencies of `model`, empty if the model is not registered
    pub fn direct_dependencies(&self, model: &str) -> &[String] {
        self.edges.get(model).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, model: &str) -> bool {
        self.edges.contains_key(model)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Parse one registry value into `(model, direct dependencies)` pairs.
///
/// The value is split on `}`; a segment holding `{` is `name{deps}` with
/// whitespace-separated deps, any other non-blank segment is a model without
/// dependencies.
pub fn parse_registry_entry(entry: &str) -> Result<Vec<(String, Vec<String>)>> {
    let mut models = Vec::new();

    for segment in entry.split('}') {
        if segment.trim().is_empty() {
            continue;
        }

        match segment.split_once('{') {
            Some((name, dependencies)) => {
                let name = name.trim();
                if name.is_empty() || dependencies.contains('{') {
                    return Err(PrevalidationError::MalformedModelEntry {
                        entry: entry.to_string(),
                    });
                }
                let dependencies = dependencies
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                models.push((name.to_string(), dependencies));
            }
            None => models.push((segment.trim().to_string(), Vec::new())),
        }
    }

    Ok(models)
}
