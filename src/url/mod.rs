//! URL handling module for Immo-Scout
//!
//! Listing links are resolved against the site origin and reduced to a
//! canonical form, which is the key used to deduplicate a result page.
//! Search URLs are paginated by appending the page parameter.

mod normalize;

pub use normalize::{canonical_listing_url, paginated_url, resolve_listing_url, PAGE_PARAM};
