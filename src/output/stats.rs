//! Statistics and listing reports
//!
//! This module summarises the buffered listings of a run and prints them
//! for an operator, either as a table or as JSON lines.

use crate::state::{Listing, ListingKind, Region, RunStatus};
use std::collections::BTreeMap;
use std::io::Write;

/// Summary of the buffered listings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingStatistics {
    /// Number of listings summarised
    pub total: usize,

    /// Count per (kind, region)
    pub by_category: BTreeMap<(String, String), usize>,

    /// Listings that exposed a phone number
    pub with_phone: usize,

    /// Listings with a known area
    pub with_area: usize,

    /// Median price per square meter over listings with a known area
    pub median_price_per_area: Option<u64>,
}

/// Computes statistics over a set of listings
pub fn compute_statistics(listings: &[Listing]) -> ListingStatistics {
    let mut by_category = BTreeMap::new();
    for listing in listings {
        *by_category
            .entry(category_label(listing.kind, listing.region))
            .or_insert(0) += 1;
    }

    let mut per_area: Vec<u64> = listings
        .iter()
        .filter(|l| l.area > 0)
        .map(|l| l.price_per_area)
        .collect();
    per_area.sort_unstable();

    let median_price_per_area = match per_area.len() {
        0 => None,
        n if n % 2 == 1 => Some(per_area[n / 2]),
        n => Some((per_area[n / 2 - 1] + per_area[n / 2]) / 2),
    };

    ListingStatistics {
        total: listings.len(),
        by_category,
        with_phone: listings.iter().filter(|l| l.phone_number.is_some()).count(),
        with_area: per_area.len(),
        median_price_per_area,
    }
}

fn category_label(kind: ListingKind, region: Region) -> (String, String) {
    (kind.to_string(), region.to_string())
}

/// Prints the run status and listing statistics to stdout
pub fn print_statistics(status: &RunStatus, stats: &ListingStatistics) {
    println!("=== Scan Statistics ===\n");

    println!("Run:");
    println!("  Running: {}", status.is_running);
    println!("  Cycles started: {}", status.current_cycle);
    println!("  Listings found: {}", status.total_found);
    println!("  Listings buffered: {}", status.buffered);
    println!();

    if stats.by_category.is_empty() {
        println!("No listings buffered.");
        return;
    }

    println!("Listings by Category:");
    for ((kind, region), count) in &stats.by_category {
        println!("  {} / {}: {}", kind, region, count);
    }
    println!();

    println!(
        "With phone number: {} / {}",
        stats.with_phone, stats.total
    );
    match stats.median_price_per_area {
        Some(median) => println!(
            "Median €/m²: {} (over {} listings with known area)",
            median, stats.with_area
        ),
        None => println!("Median €/m²: n/a (no listing with known area)"),
    }
}

/// Prints listings as an aligned table
pub fn print_listings(listings: &[Listing]) {
    println!("\n=== Recent Listings ({}) ===\n", listings.len());

    for listing in listings {
        let title: String = listing.title.chars().take(50).collect();
        let area = if listing.area > 0 {
            format!("{} m²", listing.area)
        } else {
            "? m²".to_string()
        };
        println!(
            "{:<50}  €{:>10}  {:>8}  {:<18}  {}",
            title,
            listing.price,
            area,
            listing.phone_number.as_deref().unwrap_or("-"),
            listing.url
        );
    }
}

/// Writes listings as JSON lines
pub fn write_json_lines<W: Write>(writer: &mut W, listings: &[Listing]) -> std::io::Result<()> {
    for listing in listings {
        serde_json::to_writer(&mut *writer, listing)?;
        writeln!(writer)?;
    }
    Ok(())
}
