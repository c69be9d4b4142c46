// src/output.rs
//! The snapshot artifact: a JSON array of enriched items, fully replaced on
//! each successful run. Writes go through a temp file + rename so a reader
//! never observes a half-written collection.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::crawl::types::EnrichedItem;

pub fn write_snapshot(path: &Path, items: &[EnrichedItem]) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(items)?;
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    f.write_all(json.as_bytes())?;
    fs::rename(&tmp, path).with_context(|| format!("renaming over {}", path.display()))?;
    Ok(())
}

pub fn read_snapshot(path: &Path) -> Result<Vec<EnrichedItem>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let items = serde_json::from_str(&raw).context("parsing snapshot json")?;
    Ok(items)
}
