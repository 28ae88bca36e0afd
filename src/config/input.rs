use crate::url::SiteScope;
use crate::ConfigError;
use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// Reads the newline-delimited input URL list
///
/// Blank lines, lines that do not parse as URLs, and URLs outside the site
/// namespace are skipped. Duplicates keep their first position.
///
/// # Returns
///
/// * `Ok(Vec<Url>)` - The usable input URLs in file order
/// * `Err(ConfigError::Input)` - The file is missing or unreadable
pub fn load_input_urls(path: &Path, scope: &SiteScope) -> Result<Vec<Url>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_input_urls(&content, scope))
}

pub fn parse_input_urls(content: &str, scope: &SiteScope) -> Vec<Url> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let url = match Url::parse(line) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Skipping unparseable input line '{}': {}", line, e);
                continue;
            }
        };

        if !scope.contains(&url) {
            tracing::debug!("Skipping input outside the site namespace: {}", url);
            continue;
        }

        if seen.insert(url.as_str().to_string()) {
            urls.push(url);
        }
    }

    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn scope() -> SiteScope {
        SiteScope::parse("https://www.samsung.com/uk/").unwrap()
    }

    #[test]
    fn test_skips_blank_foreign_and_duplicate_lines() {
        let content = "\
https://www.samsung.com/uk/smartphones/all-smartphones/

not a url
https://www.apple.com/uk/iphone/
https://www.samsung.com/fr/smartphones/all-smartphones/
https://www.samsung.com/uk/smartphones/all-smartphones/
https://www.samsung.com/uk/tvs/
";
        let urls = parse_input_urls(content, &scope());
        let urls: Vec<&str> = urls.iter().map(|u| u.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.samsung.com/uk/smartphones/all-smartphones/",
                "https://www.samsung.com/uk/tvs/",
            ]
        );
    }

    #[test]
    fn test_missing_file_is_input_error() {
        let result = load_input_urls(Path::new("/nonexistent/urls.txt"), &scope());
        assert!(matches!(result, Err(ConfigError::Input { .. })));
    }

    #[test]
    fn test_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "https://www.samsung.com/uk/tvs/").unwrap();
        file.flush().unwrap();

        let urls = load_input_urls(file.path(), &scope()).unwrap();
        assert_eq!(urls.len(), 1);
    }
}
