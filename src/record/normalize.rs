/// Parses a displayed price into a number
///
/// Everything except digits and `.` is stripped, so currency symbols and
/// thousands separators disappear. Returns `None` when nothing numeric is
/// left or the remainder is not a valid non-negative number.
///
/// ```
/// use catalog_harvester::record::parse_price;
///
/// assert_eq!(parse_price("£1,299.00"), Some(1299.0));
/// assert_eq!(parse_price("From £49"), Some(49.0));
/// assert_eq!(parse_price("Price on request"), None);
/// ```
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p >= 0.0)
}

/// Truncates to at most `limit` characters on a char boundary
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Turns a URL slug into a display label: `washers-and-dryers` → `Washers And Dryers`
pub fn category_label(slug: &str) -> String {
    slug.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
