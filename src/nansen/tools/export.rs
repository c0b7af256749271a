use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::nansen::tools::catalog::FieldCatalog;
use crate::nansen::tools::error::Result;
use crate::nansen::tools::io::excel_write::{self, RenderOptions, RenderReport};
use crate::nansen::tools::io::toktlogger::ToktloggerClient;
use crate::nansen::tools::model::{DataTable, FileDefinition};

/// Everything needed to pull an activity log and write it to disk.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub host: String,
    pub dir: PathBuf,
    pub basename: String,
    pub title: String,
    /// Catalog file; the built-in catalog is used when absent.
    pub fields: Option<PathBuf>,
    pub options: RenderOptions,
}

/// Returns `dir/basename_N.xlsx` for the smallest N ≥ 1 that does not exist
/// yet.
pub fn next_available_path(dir: &Path, basename: &str) -> PathBuf {
    let mut index = 1u32;
    loop {
        let candidate = dir.join(format!("{basename}_{index}.xlsx"));
        if !candidate.exists() {
            return candidate;
        }
        debug!(path = %candidate.display(), "output name taken");
        index += 1;
    }
}

/// Loads the catalog from `path`, or the built-in one when no path is given.
pub fn load_catalog(path: Option<&Path>) -> Result<FieldCatalog> {
    match path {
        Some(path) => FieldCatalog::load(path),
        None => FieldCatalog::builtin(),
    }
}

/// Pulls the activity log and cruise metadata from the toktlogger and writes
/// them to the next free `basename_N.xlsx` in the configured directory.
#[instrument(
    level = "info",
    skip_all,
    fields(host = %settings.host, dir = %settings.dir.display())
)]
pub fn export_activity_log(settings: &ExportSettings) -> Result<RenderReport> {
    let catalog = load_catalog(settings.fields.as_deref())?;
    let client = ToktloggerClient::new(&settings.host)?;

    info!("pulling data from toktlogger");
    let data = client.fetch_activities()?;
    let metadata = client.fetch_cruise_metadata()?;

    let path = next_available_path(&settings.dir, &settings.basename);
    export_tables(
        &path,
        &settings.title,
        &catalog,
        &settings.options,
        &data,
        Some(&metadata),
    )
}

/// Writes already fetched tables. The Data sheet gets one column per data
/// column, in data order.
#[instrument(level = "info", skip_all, fields(output = %path.display()))]
pub fn export_tables(
    path: &Path,
    title: &str,
    catalog: &FieldCatalog,
    options: &RenderOptions,
    data: &DataTable,
    metadata: Option<&DataTable>,
) -> Result<RenderReport> {
    let file_def = FileDefinition::new(file_stem(path), title, data.columns.iter().cloned());
    let report = excel_write::render(path, &file_def, catalog, options, Some(data), metadata)?;
    info!(rows = report.data_rows, "activity log written");
    Ok(report)
}

/// Writes an empty entry template with the given columns.
#[instrument(level = "info", skip_all, fields(output = %path.display()))]
pub fn write_template(
    path: &Path,
    title: &str,
    fields: &[String],
    catalog: &FieldCatalog,
    options: &RenderOptions,
) -> Result<RenderReport> {
    let file_def = FileDefinition::new(file_stem(path), title, fields.iter().cloned());
    excel_write::render(path, &file_def, catalog, options, None, None)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
