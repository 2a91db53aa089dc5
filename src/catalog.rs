use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::record::NormalizedRecord;

/// Write the whole feed at once as pretty JSON (UTF-8, non-ASCII unescaped).
pub fn write_feed(path: &Path, records: &[NormalizedRecord]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json)?;
    info!("Wrote {} entries to {}", records.len(), path.display());
    Ok(())
}

pub fn load_feed(path: &Path) -> Result<Vec<NormalizedRecord>> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

pub fn find<'a>(records: &'a [NormalizedRecord], id: &str) -> Option<&'a NormalizedRecord> {
    records.iter().find(|r| r.id == id)
}

/// Neighbours of `id` in feed order: (previous, next).
pub fn adjacent<'a>(
    records: &'a [NormalizedRecord],
    id: &str,
) -> (Option<&'a NormalizedRecord>, Option<&'a NormalizedRecord>) {
    match records.iter().position(|r| r.id == id) {
        Some(idx) => (
            idx.checked_sub(1).and_then(|i| records.get(i)),
            records.get(idx + 1),
        ),
        None => (None, None),
    }
}
