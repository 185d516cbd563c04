//! Fixture builders shared by the integration tests
//!
//! Every fixture is written into a caller-owned [`TempDir`] so nothing
//! outlives the test.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

pub const LADM_COL_V1_2: &str = "LADM_COL_V1_2";
pub const LEV_CAT_V1_0: &str = "Modelo_Aplicacion_LADMCOL_Lev_Cat_V1_0";

/// XTF transfer whose header declares `models`
pub fn xtf_content(models: &[&str]) -> String {
    let mut content = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <TRANSFER xmlns=\"http://www.interlis.ch/INTERLIS2.3\">\n\
         <HEADERSECTION SENDER=\"ili2pg-4.4.2\" VERSION=\"2.3\">\n\
         <MODELS>\n",
    );
    for model in models {
        content.push_str(&format!(
            "<MODEL NAME=\"{}\" VERSION=\"V1.0\" URI=\"http://www.example.org\"/>\n",
            model
        ));
    }
    content.push_str("</MODELS>\n</HEADERSECTION>\n<DATASECTION>\n");
    for (i, model) in models.iter().enumerate() {
        content.push_str(&format!(
            "<{model}.Topic BID=\"b{i}\">\n<{model}.Topic.Class TID=\"t{i}\"/>\n</{model}.Topic>\n"
        ));
    }
    content.push_str("</DATASECTION>\n</TRANSFER>\n");
    content
}

pub fn write_xtf(dir: &Path, name: &str, models: &[&str]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, xtf_content(models)).unwrap();
    path
}

/// ZIP archive holding `entries` in order
pub fn write_zip(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let mut writer = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
    for (entry_name, content) in entries {
        writer
            .start_file(*entry_name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
    path
}

/// ZIP archive wrapping the file at `inner` under its own name
pub fn zip_file(dir: &Path, name: &str, inner: &Path) -> PathBuf {
    let content = std::fs::read(inner).unwrap();
    let entry_name = inner.file_name().unwrap().to_string_lossy().to_string();
    write_zip(dir, name, &[(&entry_name, &content)])
}

/// Contents of an ili2db GeoPackage fixture
#[derive(Debug, Clone)]
pub struct GeoPackageFixture {
    pub spatial_ref_sys: bool,
    pub model_table: bool,
    pub trafo_table: bool,
    pub registry: Vec<String>,
    pub iliname: Vec<String>,
}

impl GeoPackageFixture {
    /// Well-formed store with an empty registry
    pub fn new() -> Self {
        Self {
            spatial_ref_sys: true,
            model_table: true,
            trafo_table: true,
            registry: Vec::new(),
            iliname: Vec::new(),
        }
    }

    pub fn registry(mut self, entries: &[&str]) -> Self {
        self.registry = entries.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn iliname(mut self, names: &[&str]) -> Self {
        self.iliname = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn without_spatial_ref_sys(mut self) -> Self {
        self.spatial_ref_sys = false;
        self
    }

    pub fn without_model_table(mut self) -> Self {
        self.model_table = false;
        self
    }

    pub async fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut connection = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .connect()
            .await
            .unwrap();

        if self.spatial_ref_sys {
            sqlx::query(
                "CREATE TABLE gpkg_spatial_ref_sys (srs_name TEXT NOT NULL, srs_id INTEGER PRIMARY KEY, \
                 organization TEXT NOT NULL, organization_coordsys_id INTEGER NOT NULL, definition TEXT NOT NULL)",
            )
            .execute(&mut connection)
            .await
            .unwrap();
            sqlx::query(
                "INSERT INTO gpkg_spatial_ref_sys VALUES ('MAGNA-SIRGAS / CTM12', 9377, 'EPSG', 9377, 'undefined')",
            )
            .execute(&mut connection)
            .await
            .unwrap();
        }

        if self.model_table {
            sqlx::query(
                "CREATE TABLE t_ili2db_model (filename TEXT, iliversion TEXT, modelname TEXT, content TEXT, importdate TEXT)",
            )
            .execute(&mut connection)
            .await
            .unwrap();
            for entry in &self.registry {
                sqlx::query("INSERT INTO t_ili2db_model (filename, iliversion, modelname) VALUES ('m.ili', '2.3', ?)")
                    .bind(entry.as_str())
                    .execute(&mut connection)
                    .await
                    .unwrap();
            }
        }

        if self.trafo_table {
            sqlx::query("CREATE TABLE t_ili2db_trafo (iliname TEXT, tag TEXT, setting TEXT)")
                .execute(&mut connection)
                .await
                .unwrap();
            for name in &self.iliname {
                sqlx::query(
                    "INSERT INTO t_ili2db_trafo (iliname, tag, setting) VALUES (?, 'ch.ehi.ili2db.inheritance', 'newClass')",
                )
                .bind(name.as_str())
                .execute(&mut connection)
                .await
                .unwrap();
            }
        }

        connection.close().await.unwrap();
        path
    }
}

/// Names of everything directly inside `dir`
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

/// Input directory plus a separate, initially empty extraction root
pub fn workspace() -> (TempDir, TempDir) {
    (TempDir::new().unwrap(), TempDir::new().unwrap())
}
