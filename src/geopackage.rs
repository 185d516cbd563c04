//! GeoPackage model extraction
//!
//! A GeoPackage produced by ili2db records the INTERLIS models it was created
//! from in two metadata tables:
//!
//! - `t_ili2db_model.modelname`: every imported model with its direct
//!   dependencies (see [`crate::model_graph`]),
//! - `t_ili2db_trafo.iliname`: the dotted names of the classes actually
//!   mapped, whose first component is an active model.
//!
//! The effective model set is the active models plus their direct
//! dependencies. Dependencies of dependencies are deliberately not followed.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use tracing::{debug, warn};

use crate::error::{PrevalidationError, Result};
use crate::model_graph::ModelDependencyGraph;
use crate::policy::ModelSet;

/// Spatial reference system table every GeoPackage carries
pub const SPATIAL_REF_SYS_TABLE: &str = "gpkg_spatial_ref_sys";
/// ili2db model registry
pub const MODEL_TABLE: &str = "t_ili2db_model";
/// ili2db class mapping log
pub const TRAFO_TABLE: &str = "t_ili2db_trafo";

const LIST_TABLES_QUERY: &str = "SELECT name FROM sqlite_master WHERE type = 'table'";
const MODEL_NAMES_QUERY: &str = "SELECT modelname FROM t_ili2db_model";
const TRAFO_NAMES_QUERY: &str = "SELECT iliname FROM t_ili2db_trafo";

/// Model named by a dotted INTERLIS identifier (`Model.Topic.Class`)
pub fn model_of_identifier(identifier: &str) -> Option<&str> {
    let model = identifier
        .split_once('.')
        .map_or(identifier, |(model, _)| model)
        .trim();
    (!model.is_empty()).then_some(model)
}

/// Reads the models an ili2db GeoPackage was built from
#[derive(Debug, Default)]
pub struct GeoPackageModelExtractor;

impl GeoPackageModelExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Open the GeoPackage at `path` read-only and extract its model set.
    ///
    /// The connection is closed on every exit path; a failing close is logged
    /// and does not change the result.
    pub async fn extract_models(&self, path: &Path) -> Result<ModelSet> {
        let mut connection = Self::connect(path).await?;

        let result = Self::extract_from_connection(path, &mut connection).await;

        if let Err(e) = connection.close().await {
            warn!(path = %path.display(), error = %e, "failed to close GeoPackage connection");
        }

        if let Ok(models) = &result {
            debug!(path = %path.display(), %models, "models registered in GeoPackage");
        }
        result
    }

    async fn connect(path: &Path) -> Result<SqliteConnection> {
        SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .disable_statement_logging()
            .connect()
            .await
            .map_err(|e| PrevalidationError::NotGeoPackage {
                path: path.to_path_buf(),
                details: e.to_string(),
            })
    }

    /// Verify the structural markers, then reconstruct the model set
    pub async fn extract_from_connection(
        path: &Path,
        connection: &mut SqliteConnection,
    ) -> Result<ModelSet> {
        let tables = Self::list_tables(connection)
            .await
            .map_err(|e| PrevalidationError::NotGeoPackage {
                path: path.to_path_buf(),
                details: e.to_string(),
            })?;

        if !tables.contains(SPATIAL_REF_SYS_TABLE) {
            return Err(PrevalidationError::MissingSpatialReference {
                path: path.to_path_buf(),
                table: SPATIAL_REF_SYS_TABLE.to_string(),
            });
        }

        if !tables.contains(MODEL_TABLE) {
            return Err(PrevalidationError::MissingSchemaMapping {
                path: path.to_path_buf(),
                table: MODEL_TABLE.to_string(),
            });
        }

        Self::reconstruct_models(path, connection).await
    }

    async fn list_tables(connection: &mut SqliteConnection) -> sqlx::Result<HashSet<String>> {
        let names = sqlx::query_scalar::<_, String>(LIST_TABLES_QUERY)
            .fetch_all(&mut *connection)
            .await?;
        Ok(names.into_iter().collect())
    }

    /// Any failure past the marker check is reported as a store access
    /// problem, including a registry entry that does not parse.
    async fn reconstruct_models(path: &Path, connection: &mut SqliteConnection) -> Result<ModelSet> {
        let store_access = |details: String| PrevalidationError::StoreAccess {
            path: path.to_path_buf(),
            details,
        };

        let registry = sqlx::query_scalar::<_, Option<String>>(MODEL_NAMES_QUERY)
            .fetch_all(&mut *connection)
            .await
            .map_err(|e| store_access(e.to_string()))?;
        let graph = ModelDependencyGraph::from_registry(registry.iter().flatten())
            .map_err(|e| store_access(e.to_string()))?;

        let identifiers = sqlx::query_scalar::<_, Option<String>>(TRAFO_NAMES_QUERY)
            .fetch_all(&mut *connection)
            .await
            .map_err(|e| store_access(e.to_string()))?;
        let active: BTreeSet<&str> = identifiers
            .iter()
            .flatten()
            .filter_map(|identifier| model_of_identifier(identifier))
            .collect();

        Ok(effective_models(active, &graph))
    }
}

/// Active models plus their direct dependencies, one level deep
pub fn effective_models<I, S>(active: I, graph: &ModelDependencyGraph) -> ModelSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut models = ModelSet::new();
    for model in active {
        let model = model.as_ref();
        models.insert(model);
        models.extend(graph.direct_dependencies(model).iter().cloned());
    }
    models
}
