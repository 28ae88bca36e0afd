//! Flat-file outputs: NDJSON records, failure list, discovery metadata

use crate::record::ProductRecord;
use crate::state::DiscoveryMetadata;
use crate::HarvestError;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes one JSON record per line
pub fn write_records<'a, I>(path: &Path, records: I) -> Result<usize, HarvestError>
where
    I: IntoIterator<Item = &'a ProductRecord>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    let mut written = 0;
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Writes failed URLs one per line, in sorted order
pub fn write_failures(path: &Path, failures: &BTreeSet<String>) -> Result<(), HarvestError> {
    let mut writer = BufWriter::new(File::create(path)?);
    for url in failures {
        writeln!(writer, "{}", url)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the URL to provenance map as pretty JSON
pub fn write_metadata(
    path: &Path,
    metadata: &BTreeMap<String, DiscoveryMetadata>,
) -> Result<(), HarvestError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, metadata)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DiscoveryMethod;
    use tempfile::TempDir;

    #[test]
    fn test_records_are_line_delimited() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("products.ndjson");
        let mut tv = ProductRecord::new("https://x/uk/tvs/a/", "TV", "Samsung", "GBP").unwrap();
        tv.set_price(Some(499.0));
        let phone = ProductRecord::new("https://x/uk/phones/b/", "Phone", "Samsung", "GBP").unwrap();

        let written = write_records(&path, [&tv, &phone]).unwrap();
        assert_eq!(written, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["name"], "TV");
        assert_eq!(first["price"], 499.0);
        assert!(first.get("sku").is_none());
        assert!(first.get("extractionTimestamp").is_some());
    }

    #[test]
    fn test_failures_sorted_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("failed_urls.txt");
        let failures: BTreeSet<String> = ["https://x/uk/b/?q=1", "https://x/uk/a/"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        write_failures(&path, &failures).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "https://x/uk/a/\nhttps://x/uk/b/?q=1\n");
    }

    #[test]
    fn test_empty_failures_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("failed_urls.txt");
        write_failures(&path, &BTreeSet::new()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_metadata_map() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("discovery_metadata.json");
        let mut metadata = BTreeMap::new();
        metadata.insert(
            "https://x/uk/tvs/a/".to_string(),
            DiscoveryMetadata::new("https://x/uk/tvs/all-tvs/", DiscoveryMethod::DynamicExpansion)
                .with_category(Some("Tvs".to_string())),
        );

        write_metadata(&path, &metadata).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let entry = &value["https://x/uk/tvs/a/"];
        assert_eq!(entry["sourceListingUrl"], "https://x/uk/tvs/all-tvs/");
        assert_eq!(entry["method"], "dynamic_expansion");
        assert_eq!(entry["category"], "Tvs");
    }
}
