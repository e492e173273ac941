//! Status command for showing what has been recorded.

use std::io::Write;

use anyhow::Result;
use curve_core::RECORD_KEY;
use curve_db::Database;

use super::show::{displayed_total, load_snapshot};
use crate::Config;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config) -> Result<()> {
    let data = load_snapshot(db)?;

    writeln!(writer, "Focus tracker status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;

    if data.is_empty() {
        writeln!(writer, "No focus time recorded.")?;
        return Ok(());
    }

    writeln!(writer, "Files tracked: {}", data.len())?;
    writeln!(writer, "Total time: {}", displayed_total(&data))?;
    if let Some(updated_at) = db.record_updated_at(RECORD_KEY)? {
        writeln!(writer, "Last write: {}", updated_at.to_rfc3339())?;
    }

    Ok(())
}
