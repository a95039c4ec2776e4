//! JSON run reports.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Write `report` to `path` as pretty-printed JSON.
pub fn write_json_report<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| Error::OutputDirCreateFailed {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report).map_err(|source| Error::ReportWrite {
        path: path.to_path_buf(),
        source,
    })?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    info!("Report written to {}", path.display());
    Ok(())
}
