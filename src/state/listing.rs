use crate::config::CategoryEntry;
use crate::UrlError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use url::Url;

/// Type of property a category lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingKind {
    /// Owner-occupied apartment ("Eigentumswohnung")
    Apartment,
    /// Building plot ("Grundstück")
    Land,
}

impl ListingKind {
    /// Derives the kind from a category key
    pub fn from_category_key(key: &str) -> Self {
        if key.to_lowercase().contains("eigentumswohnung") {
            Self::Apartment
        } else {
            Self::Land
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apartment => "apartment",
            Self::Land => "land",
        }
    }
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Region a category covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Region {
    #[serde(rename = "wien")]
    Vienna,
    #[serde(rename = "niederoesterreich")]
    LowerAustria,
}

impl Region {
    /// Derives the region from a category key
    pub fn from_category_key(key: &str) -> Self {
        if key.to_lowercase().contains("wien") {
            Self::Vienna
        } else {
            Self::LowerAustria
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vienna => "wien",
            Self::LowerAustria => "niederoesterreich",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured search category, resolved at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub search_url: Url,
    pub kind: ListingKind,
    pub region: Region,
}

impl Category {
    pub fn new(name: &str, search_url: Url) -> Self {
        Self {
            name: name.to_string(),
            search_url,
            kind: ListingKind::from_category_key(name),
            region: Region::from_category_key(name),
        }
    }

    pub fn from_entry(entry: &CategoryEntry) -> Result<Self, UrlError> {
        let search_url = Url::parse(&entry.search_url)
            .map_err(|e| UrlError::Parse(format!("{}: {}", entry.search_url, e)))?;
        Ok(Self::new(&entry.name, search_url))
    }
}

/// Fields pulled from one detail page, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingCandidate {
    pub title: String,
    pub price: u64,
    pub area: u64,
    pub location: String,
    pub description: String,
    pub phone_number: Option<String>,
    /// Lower-cased visible text of the whole page
    pub page_text: String,
}

/// An accepted private-sale offer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub title: String,
    pub price: u64,
    /// Square meters, 0 when unknown
    pub area: u64,
    pub location: String,
    pub url: Url,
    pub description: String,
    pub phone_number: Option<String>,
    pub kind: ListingKind,
    pub region: Region,
    pub category: String,
    pub price_per_area: u64,
    pub scraped_at: DateTime<Utc>,
}

impl Listing {
    /// Builds a listing from a candidate the classifier accepted
    ///
    /// Derived fields are computed here and only here.
    pub fn from_candidate(candidate: ListingCandidate, url: Url, category: &Category) -> Self {
        Self {
            price_per_area: price_per_area(candidate.price, candidate.area),
            title: candidate.title,
            price: candidate.price,
            area: candidate.area,
            location: candidate.location,
            url,
            description: candidate.description,
            phone_number: candidate.phone_number,
            kind: category.kind,
            region: category.region,
            category: category.name.clone(),
            scraped_at: Utc::now(),
        }
    }
}

/// Price per square meter, rounded half to even; 0 when the area is unknown
pub fn price_per_area(price: u64, area: u64) -> u64 {
    if area == 0 {
        return 0;
    }

    let (quotient, remainder) = (price / area, price % area);
    // Compared as remainder vs. area - remainder so nothing overflows
    match remainder.cmp(&(area - remainder)) {
        Ordering::Greater => quotient + 1,
        Ordering::Equal if quotient % 2 == 1 => quotient + 1,
        _ => quotient,
    }
}
