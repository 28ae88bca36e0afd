use serde::{Deserialize, Serialize};

/// Normalized stock status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    InStock,
    OutOfStock,
    PreOrder,
    BackOrder,
    LimitedAvailability,
    SoldOut,
    Discontinued,
    OnlineOnly,
    InStoreOnly,
}

impl Availability {
    /// Parses a schema.org availability value
    ///
    /// Accepts full URIs (`https://schema.org/InStock`), bare tokens
    /// (`InStock`), and free text (`"Out of stock"`). Unknown values are
    /// `None`.
    ///
    /// ```
    /// use catalog_harvester::Availability;
    ///
    /// assert_eq!(Availability::parse("https://schema.org/InStock"), Some(Availability::InStock));
    /// assert_eq!(Availability::parse("Out of stock"), Some(Availability::OutOfStock));
    /// assert_eq!(Availability::parse("Call us"), None);
    /// ```
    pub fn parse(value: &str) -> Option<Self> {
        let token = value
            .trim()
            .trim_start_matches("https://schema.org/")
            .trim_start_matches("http://schema.org/");

        let key: String = token
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_ascii_lowercase();

        if key.is_empty() {
            return None;
        }

        match key.as_str() {
            "instock" | "available" | "inventoryinstock" => return Some(Self::InStock),
            "outofstock" | "unavailable" | "notavailable" => return Some(Self::OutOfStock),
            "preorder" | "presale" => return Some(Self::PreOrder),
            "backorder" => return Some(Self::BackOrder),
            "limitedavailability" => return Some(Self::LimitedAvailability),
            "soldout" => return Some(Self::SoldOut),
            "discontinued" => return Some(Self::Discontinued),
            "onlineonly" => return Some(Self::OnlineOnly),
            "instoreonly" => return Some(Self::InStoreOnly),
            _ => {}
        }

        // Free text: negative phrases first, "unavailable" contains "available"
        if key.contains("outofstock") || key.contains("unavailable") || key.contains("notavailable")
        {
            Some(Self::OutOfStock)
        } else if key.contains("soldout") {
            Some(Self::SoldOut)
        } else if key.contains("preorder") {
            Some(Self::PreOrder)
        } else if key.contains("backorder") {
            Some(Self::BackOrder)
        } else if key.contains("limited") || key.contains("lowstock") {
            Some(Self::LimitedAvailability)
        } else if key.contains("discontinued") {
            Some(Self::Discontinued)
        } else if key.contains("instock") || key.contains("available") {
            Some(Self::InStock)
        } else {
            None
        }
    }
}
