//! Exchange listing download and normalisation into the local ticker file.

use analysis_core::TickerInfo;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_LISTING_URLS: [&str; 3] = [
    "https://raw.githubusercontent.com/LondonMarket/Global-Stock-Symbols/master/nyse_1668526574444.csv",
    "https://raw.githubusercontent.com/LondonMarket/Global-Stock-Symbols/master/nasdaq_1668526380140.csv",
    "https://raw.githubusercontent.com/LondonMarket/Global-Stock-Symbols/master/amex_1668526591787.csv",
];

const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

#[derive(Error, Debug)]
pub enum ListingError {
    #[error("listing has no recognised company/ticker columns (header: {0})")]
    MissingColumns(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),
}

/// Pick the candidate delimiter that occurs most often in the header line.
fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    DELIMITERS
        .iter()
        .copied()
        .max_by_key(|d| {
            let count = header.bytes().filter(|b| b == d).count();
            // prefer the earlier candidate on ties
            (count, std::cmp::Reverse(DELIMITERS.iter().position(|x| x == d)))
        })
        .unwrap_or(b',')
}

pub(crate) fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    })
}

/// Read `text` as a delimited listing and keep only (ticker, company).
///
/// The company column is `name` or `company`, the ticker column `ticker` or
/// `symbol`, matched case-insensitively. Rows that are short or have a blank
/// ticker are skipped.
pub fn normalize_listing(text: &str) -> Result<Vec<TickerInfo>, ListingError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(text))
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let (Some(name_col), Some(symbol_col)) = (
        find_column(&headers, &["name", "company"]),
        find_column(&headers, &["ticker", "symbol"]),
    ) else {
        return Err(ListingError::MissingColumns(
            headers.iter().collect::<Vec<_>>().join(","),
        ));
    };

    let mut entries = Vec::new();
    for record in reader.records() {
        let Ok(record) = record else {
            continue;
        };
        let (Some(symbol), Some(name)) = (record.get(symbol_col), record.get(name_col)) else {
            continue;
        };
        let symbol = symbol.trim();
        if symbol.is_empty() {
            continue;
        }
        entries.push(TickerInfo {
            symbol: symbol.to_string(),
            name: name.trim().to_string(),
        });
    }
    Ok(entries)
}

/// Concatenate listings, dropping exact duplicates while keeping first-seen order.
pub fn merge_listings(listings: impl IntoIterator<Item = Vec<TickerInfo>>) -> Vec<TickerInfo> {
    let mut seen = HashSet::new();
    listings
        .into_iter()
        .flatten()
        .filter(|entry| seen.insert(entry.clone()))
        .collect()
}

async fn download(client: &reqwest::Client, url: &str) -> Result<String, ListingError> {
    let text = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(text)
}

/// Download every listing in `urls`. Failed or unrecognised listings are
/// skipped with a warning.
pub async fn build_listing(client: &reqwest::Client, urls: &[&str]) -> Vec<TickerInfo> {
    let mut listings = Vec::with_capacity(urls.len());
    for url in urls {
        match download(client, url).await.and_then(|text| normalize_listing(&text)) {
            Ok(entries) => {
                tracing::info!("Normalised {} tickers from {}", entries.len(), url);
                listings.push(entries);
            }
            Err(e) => tracing::warn!("Skipping listing {}: {}", url, e),
        }
    }
    merge_listings(listings)
}

/// Write entries as a `symbol,name` CSV.
pub fn write_listing(path: &Path, entries: &[TickerInfo]) -> Result<(), ListingError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["symbol", "name"])?;
    for entry in entries {
        writer.write_record([entry.symbol.as_str(), entry.name.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}
