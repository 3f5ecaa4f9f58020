//! CLI command implementations
//!
//! Each submodule implements a specific CLI command.

pub mod calibrate;
pub mod deficit;
pub mod fanchart;
pub mod simulate;

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::Result;

/// Writes `value` as pretty JSON to `output`, or to stdout.
pub(crate) fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, text + "\n")?;
            info!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", text)?;
        }
    }
    Ok(())
}

/// Writes serialisable rows as CSV to `output`, or to stdout.
pub(crate) fn write_csv<T: Serialize>(rows: &[T], output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let mut writer = csv::Writer::from_path(path)?;
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
            info!("Wrote {}", path.display());
        }
        None => {
            let mut writer = csv::Writer::from_writer(std::io::stdout().lock());
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}
