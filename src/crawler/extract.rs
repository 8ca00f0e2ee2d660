//! Field extraction from listing detail pages
//!
//! The detail-page markup is not a stable contract, so every field is read
//! through an ordered chain of selectors. Each selector is tried in turn
//! until one yields a usable value; when none does, the field falls back to
//! a documented default instead of failing the listing.

use crate::config::SelectorConfig;
use crate::state::ListingCandidate;
use crate::ScoutError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

pub const DEFAULT_TITLE: &str = "Unknown Title";
pub const DEFAULT_LOCATION: &str = "Unknown Location";

/// Digits directly in front of the square-meter unit
const AREA_PATTERN: &str = r"(?i)(\d+)\s*m²";

/// Austrian international prefix first, then any national number
const PHONE_PATTERNS: [&str; 2] = [
    r"(?:\+43|0043)[\s\-]?[1-9]\d{1,4}[\s\-]?\d{3,8}",
    r"0[1-9]\d{1,4}[\s\-]?\d{3,8}",
];

/// An ordered list of selectors, tried first to last
#[derive(Debug, Clone)]
pub struct SelectorChain {
    selectors: Vec<Selector>,
}

impl SelectorChain {
    /// Compiles a chain from CSS selector strings
    pub fn parse<S: AsRef<str>>(selectors: &[S]) -> Result<Self, ScoutError> {
        let selectors = selectors
            .iter()
            .map(|s| {
                Selector::parse(s.as_ref()).map_err(|e| ScoutError::Selector {
                    selector: s.as_ref().to_string(),
                    message: format!("{:?}", e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { selectors })
    }

    /// First element matched by each selector, in chain order
    pub fn first_matches<'a>(&'a self, document: &'a Html) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.selectors
            .iter()
            .filter_map(move |selector| document.select(selector).next())
    }

    /// Every element matched by any selector, in chain order
    pub fn all_matches<'a>(&'a self, document: &'a Html) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.selectors
            .iter()
            .flat_map(move |selector| document.select(selector))
    }

    /// First value the `read` function accepts
    pub fn find_map<'a, T, F>(&'a self, document: &'a Html, read: F) -> Option<T>
    where
        F: FnMut(ElementRef<'a>) -> Option<T>,
    {
        self.first_matches(document).find_map(read)
    }
}

/// Trimmed text content of an element
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn non_empty_text(element: ElementRef<'_>) -> Option<String> {
    Some(element_text(element)).filter(|text| !text.is_empty())
}

/// Listing title, or "Unknown Title"
pub fn extract_title(document: &Html, chain: &SelectorChain) -> String {
    chain
        .find_map(document, non_empty_text)
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

/// Listing location, or "Unknown Location"
pub fn extract_location(document: &Html, chain: &SelectorChain) -> String {
    chain
        .find_map(document, non_empty_text)
        .unwrap_or_else(|| DEFAULT_LOCATION.to_string())
}

/// Listing description, or an empty string
pub fn extract_description(document: &Html, chain: &SelectorChain) -> String {
    chain.find_map(document, non_empty_text).unwrap_or_default()
}

/// Asking price in whole currency units, or 0
///
/// All non-digit characters are stripped before parsing, so thousands
/// separators and currency symbols are ignored ("€ 1.234.567" → 1234567).
pub fn extract_price(document: &Html, chain: &SelectorChain) -> u64 {
    chain.find_map(document, |element| parse_digits(&element_text(element))).unwrap_or(0)
}

/// Keeps only ASCII digits and parses them; `None` if none remain or on overflow
pub fn parse_digits(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Living or plot area in square meters, or 0
pub fn extract_area(document: &Html, chain: &SelectorChain, pattern: &Regex) -> u64 {
    chain
        .find_map(document, |element| parse_area(&element_text(element), pattern))
        .unwrap_or(0)
}

/// First number in front of the square-meter unit
pub fn parse_area(text: &str, pattern: &Regex) -> Option<u64> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Phone number found anywhere in the raw markup
///
/// Numbers often live in inline scripts or plain text rather than in a
/// dedicated element, so this works on the unparsed page. The first pattern
/// that matches wins; whitespace and hyphens are removed from the result.
pub fn extract_phone(raw_html: &str, patterns: &[Regex]) -> Option<String> {
    patterns
        .iter()
        .find_map(|pattern| pattern.find(raw_html))
        .map(|m| {
            m.as_str()
                .chars()
                .filter(|c| !c.is_whitespace() && *c != '-')
                .collect()
        })
}

/// Lower-cased visible text of the whole document
pub fn page_text(document: &Html) -> String {
    document.root_element().text().collect::<String>().to_lowercase()
}

/// Compiled extraction rules for detail pages
#[derive(Debug, Clone)]
pub struct DetailExtractor {
    title: SelectorChain,
    price: SelectorChain,
    area: SelectorChain,
    location: SelectorChain,
    description: SelectorChain,
    area_pattern: Regex,
    phone_patterns: Vec<Regex>,
}

impl DetailExtractor {
    pub fn new(config: &SelectorConfig) -> Result<Self, ScoutError> {
        Ok(Self {
            title: SelectorChain::parse(&config.title)?,
            price: SelectorChain::parse(&config.price)?,
            area: SelectorChain::parse(&config.area)?,
            location: SelectorChain::parse(&config.location)?,
            description: SelectorChain::parse(&config.description)?,
            area_pattern: Regex::new(AREA_PATTERN)?,
            phone_patterns: PHONE_PATTERNS
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<_, _>>()?,
        })
    }

    /// Extracts every field of one detail page; never fails
    pub fn extract(&self, raw_html: &str) -> ListingCandidate {
        let document = Html::parse_document(raw_html);

        ListingCandidate {
            title: extract_title(&document, &self.title),
            price: extract_price(&document, &self.price),
            area: extract_area(&document, &self.area, &self.area_pattern),
            location: extract_location(&document, &self.location),
            description: extract_description(&document, &self.description),
            phone_number: extract_phone(raw_html, &self.phone_patterns),
            page_text: page_text(&document),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> DetailExtractor {
        DetailExtractor::new(&SelectorConfig::default()).unwrap()
    }

    fn chain(selectors: &[&str]) -> SelectorChain {
        SelectorChain::parse(selectors).unwrap()
    }

    fn area_pattern() -> Regex {
        Regex::new(AREA_PATTERN).unwrap()
    }

    fn phone_patterns() -> Vec<Regex> {
        PHONE_PATTERNS.iter().map(|p| Regex::new(p).unwrap()).collect()
    }

    #[test]
    fn test_title_priority_order() {
        let html = Html::parse_document(
            r#"<html><body>
                <h1>Generic heading</h1>
                <div data-testid="ad-detail-ad-title"><h1>  Helle 3-Zimmer Wohnung  </h1></div>
            </body></html>"#,
        );
        let title = extract_title(&html, &chain(&[r#"[data-testid="ad-detail-ad-title"] h1"#, "h1"]));
        assert_eq!(title, "Helle 3-Zimmer Wohnung");
    }

    #[test]
    fn test_title_falls_back_to_later_selector() {
        let html = Html::parse_document("<html><body><h1>Baugrund</h1></body></html>");
        let title = extract_title(&html, &chain(&[".AdDetailTitle", "h1"]));
        assert_eq!(title, "Baugrund");
    }

    #[test]
    fn test_empty_match_falls_through() {
        let html = Html::parse_document(
            r#"<html><body><div class="AdDetailTitle">   </div><h1>Real title</h1></body></html>"#,
        );
        let title = extract_title(&html, &chain(&[".AdDetailTitle", "h1"]));
        assert_eq!(title, "Real title");
    }

    #[test]
    fn test_defaults_when_nothing_matches() {
        let candidate = extractor().extract("<html><body><p>nothing here</p></body></html>");

        assert_eq!(candidate.title, DEFAULT_TITLE);
        assert_eq!(candidate.location, DEFAULT_LOCATION);
        assert_eq!(candidate.price, 0);
        assert_eq!(candidate.area, 0);
        assert_eq!(candidate.description, "");
        assert_eq!(candidate.phone_number, None);
    }

    #[test]
    fn test_price_strips_separators() {
        let html = Html::parse_document(
            r#"<div data-testid="ad-detail-ad-price"><span>€ 1.234.567</span></div>"#,
        );
        let price = extract_price(&html, &chain(&[r#"[data-testid="ad-detail-ad-price"] span"#]));
        assert_eq!(price, 1_234_567);
    }

    #[test]
    fn test_price_without_digits_tries_next_selector() {
        let html = Html::parse_document(
            r#"<div class="AdDetailPrice">Preis auf Anfrage</div><div class="price-value">349.000</div>"#,
        );
        let price = extract_price(&html, &chain(&[".AdDetailPrice", ".price-value"]));
        assert_eq!(price, 349_000);
    }

    #[test]
    fn test_price_overflow_is_absorbed() {
        let html = Html::parse_document(r#"<div class="AdDetailPrice">99999999999999999999999</div>"#);
        assert_eq!(extract_price(&html, &chain(&[".AdDetailPrice"])), 0);
    }

    #[test]
    fn test_parse_digits() {
        assert_eq!(parse_digits("1.234.567"), Some(1_234_567));
        assert_eq!(parse_digits("EUR 250,000.-"), Some(250_000));
        assert_eq!(parse_digits("auf Anfrage"), None);
    }

    #[test]
    fn test_area_from_properties() {
        let html = Html::parse_document(
            r#"<div data-testid="ad-detail-ad-properties">Zimmer 3 Wohnfläche ca. 75 m² Balkon</div>"#,
        );
        let area = extract_area(
            &html,
            &chain(&[r#"[data-testid="ad-detail-ad-properties"]"#]),
            &area_pattern(),
        );
        assert_eq!(area, 75);
    }

    #[test]
    fn test_parse_area() {
        let pattern = area_pattern();
        assert_eq!(parse_area("Wohnfläche ca. 75 m²", &pattern), Some(75));
        assert_eq!(parse_area("Grundfläche: 812m²", &pattern), Some(812));
        assert_eq!(parse_area("GRUNDSTÜCK 640 M²", &pattern), Some(640));
        assert_eq!(parse_area("3 Zimmer", &pattern), None);
    }

    #[test]
    fn test_area_pattern_missing_tries_next_selector() {
        let html = Html::parse_document(
            r#"<div data-testid="ad-detail-ad-properties">3 Zimmer</div>
               <div class="AdDetailProperties">Nutzfläche 120 m²</div>"#,
        );
        let area = extract_area(
            &html,
            &chain(&[r#"[data-testid="ad-detail-ad-properties"]"#, ".AdDetailProperties"]),
            &area_pattern(),
        );
        assert_eq!(area, 120);
    }

    #[test]
    fn test_phone_austrian_prefix_first() {
        let html = r#"<script>var tel = "+43 664 1234567";</script><p>Büro 01 5234567</p>"#;
        assert_eq!(
            extract_phone(html, &phone_patterns()),
            Some("+436641234567".to_string())
        );
    }

    #[test]
    fn test_phone_national_fallback() {
        let html = "<p>Anrufe unter 0664-7654321 bitte</p>";
        assert_eq!(
            extract_phone(html, &phone_patterns()),
            Some("06647654321".to_string())
        );
    }

    #[test]
    fn test_phone_double_zero_prefix() {
        let html = "<p>Kontakt 0043 699 1112223</p>";
        assert_eq!(
            extract_phone(html, &phone_patterns()),
            Some("00436991112223".to_string())
        );
    }

    #[test]
    fn test_phone_absent() {
        assert_eq!(extract_phone("<p>Keine Nummer</p>", &phone_patterns()), None);
    }

    #[test]
    fn test_full_detail_page() {
        let html = r#"<html><body>
            <div data-testid="ad-detail-ad-title"><h1>Grundstück in Mödling</h1></div>
            <div data-testid="ad-detail-ad-price"><span>€ 420.000</span></div>
            <div data-testid="ad-detail-ad-properties">Grundfläche 700 m²</div>
            <div data-testid="ad-detail-ad-location">2340 Mödling</div>
            <div data-testid="ad-detail-ad-description"><p> Privatverkauf, ohne Makler. </p></div>
            <p>Tel: 0676 1234567</p>
        </body></html>"#;
        let candidate = extractor().extract(html);

        assert_eq!(candidate.title, "Grundstück in Mödling");
        assert_eq!(candidate.price, 420_000);
        assert_eq!(candidate.area, 700);
        assert_eq!(candidate.location, "2340 Mödling");
        assert_eq!(candidate.description, "Privatverkauf, ohne Makler.");
        assert_eq!(candidate.phone_number, Some("06761234567".to_string()));
        assert!(candidate.page_text.contains("privatverkauf"));
    }

    #[test]
    fn test_invalid_selector_reported() {
        let result = SelectorChain::parse(&["[[nope"]);
        assert!(matches!(result, Err(ScoutError::Selector { .. })));
    }
}
