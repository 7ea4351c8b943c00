//! CSL-JSON output: the array of `{title, type, author, issued, journal, doi, pmid, volume,
//! pages, id}` items reference managers import.

use std::path::Path;

use pubcite_core::CitationRecord;

use crate::error::Result;

pub fn to_csl_json(records: &[CitationRecord], pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(records)?
    } else {
        serde_json::to_string(records)?
    };
    Ok(json)
}

/// Write `records` to `path`, creating parent directories as needed.
pub fn write_csl_json(path: &Path, records: &[CitationRecord], pretty: bool) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let mut json = to_csl_json(records, pretty)?;
    json.push('\n');
    std::fs::write(path, json)?;
    Ok(())
}
