use analysis_core::{MarketDataProvider, TickerInfo};
use std::path::PathBuf;
use tokio::sync::OnceCell;

pub mod listing;

pub use listing::{build_listing, normalize_listing, write_listing, ListingError};

/// Local ticker list, loaded from disk at most once per process.
pub struct TickerDirectory {
    path: PathBuf,
    entries: OnceCell<Vec<TickerInfo>>,
}

/// Parse the ticker file. Accepts `name` or `shortname` for the company column.
fn parse_directory(text: &str) -> Result<Vec<TickerInfo>, ListingError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let (Some(symbol_col), Some(name_col)) = (
        listing::find_column(&headers, &["symbol", "ticker"]),
        listing::find_column(&headers, &["name", "shortname", "company"]),
    ) else {
        return Err(ListingError::MissingColumns(
            headers.iter().collect::<Vec<_>>().join(","),
        ));
    };

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record?;
        let symbol = record.get(symbol_col).unwrap_or("").trim();
        if symbol.is_empty() {
            continue;
        }
        entries.push(TickerInfo {
            symbol: symbol.to_string(),
            name: record.get(name_col).unwrap_or("").trim().to_string(),
        });
    }
    Ok(entries)
}

fn entry_matches(entry: &TickerInfo, needle: &str) -> bool {
    entry.symbol.to_lowercase().contains(needle) || entry.name.to_lowercase().contains(needle)
}

impl TickerDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: OnceCell::new(),
        }
    }

    /// Entries of the ticker file. A missing or unreadable file is logged and
    /// cached as an empty list until the process restarts.
    pub async fn get_or_load(&self) -> &[TickerInfo] {
        self.entries
            .get_or_init(|| async {
                let loaded = match tokio::fs::read_to_string(&self.path).await {
                    Ok(text) => parse_directory(&text),
                    Err(e) => Err(ListingError::Io(e)),
                };
                match loaded {
                    Ok(entries) => {
                        tracing::info!(
                            "Loaded {} tickers from {}",
                            entries.len(),
                            self.path.display()
                        );
                        entries
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Failed to load ticker file {}: {}",
                            self.path.display(),
                            e
                        );
                        Vec::new()
                    }
                }
            })
            .await
    }

    /// Case-insensitive substring search over symbol and name. Falls back to
    /// the provider's search when nothing matches locally.
    pub async fn search(&self, query: &str, provider: &dyn MarketDataProvider) -> Vec<TickerInfo> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let local: Vec<TickerInfo> = self
            .get_or_load()
            .await
            .iter()
            .filter(|entry| entry_matches(entry, &needle))
            .cloned()
            .collect();
        if !local.is_empty() {
            return local;
        }

        match provider.search_symbols(query.trim()).await {
            Ok(found) => {
                tracing::debug!("Provider search for '{}' returned {} results", query, found.len());
                found
            }
            Err(e) => {
                tracing::warn!("Ticker search for '{}' failed: {}", query, e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{FetchError, PriceBar, QuarterlyStatement, RawSnapshot, SharesRecord};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockSearch {
        fail: bool,
        calls: AtomicUsize,
    }

    impl MockSearch {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockSearch {
        async fn daily_bars(&self, symbol: &str, _: NaiveDate, _: NaiveDate) -> Result<Vec<PriceBar>, FetchError> {
            Err(FetchError::NoData(symbol.to_string()))
        }

        async fn fundamentals(&self, symbol: &str) -> Result<RawSnapshot, FetchError> {
            Err(FetchError::NoData(symbol.to_string()))
        }

        async fn quarterly_statements(&self, symbol: &str) -> Result<Vec<QuarterlyStatement>, FetchError> {
            Err(FetchError::NoData(symbol.to_string()))
        }

        async fn shares_history(&self, symbol: &str, _: NaiveDate, _: NaiveDate) -> Result<Vec<SharesRecord>, FetchError> {
            Err(FetchError::NoData(symbol.to_string()))
        }

        async fn search_symbols(&self, query: &str) -> Result<Vec<TickerInfo>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::Http("connection refused".to_string()));
            }
            Ok(vec![TickerInfo {
                symbol: query.to_uppercase(),
                name: "Remote result".to_string(),
            }])
        }
    }

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}.csv", name, std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parse_directory_accepts_shortname() {
        let entries = parse_directory("symbol,shortname,exchange\nAAPL,Apple Inc.,NMS\n,Blank,NYQ\n").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Apple Inc.");
    }

    #[tokio::test]
    async fn test_local_match_skips_provider() {
        let path = temp_file("dir-local", "symbol,name\nAAPL,Apple Inc.\nMSFT,Microsoft Corp\n");
        let directory = TickerDirectory::new(&path);
        let provider = MockSearch::new(false);

        let found = directory.search("apple", &provider).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].symbol, "AAPL");

        let by_symbol = directory.search("  Msf ", &provider).await;
        assert_eq!(by_symbol[0].name, "Microsoft Corp");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_no_local_match_falls_back_to_provider() {
        let path = temp_file("dir-fallback", "symbol,name\nAAPL,Apple Inc.\n");
        let directory = TickerDirectory::new(&path);
        let provider = MockSearch::new(false);

        let found = directory.search("tsla", &provider).await;
        assert_eq!(found, vec![TickerInfo {
            symbol: "TSLA".to_string(),
            name: "Remote result".to_string(),
        }]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_provider_failure_yields_empty() {
        let directory = TickerDirectory::new("/nonexistent/equities.csv");
        let provider = MockSearch::new(true);
        assert!(directory.search("anything", &provider).await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_is_empty() {
        let directory = TickerDirectory::new("/nonexistent/equities.csv");
        let provider = MockSearch::new(false);
        assert!(directory.search("   ", &provider).await.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_load_failure_is_cached_as_empty() {
        let path = std::env::temp_dir().join(format!("dir-late-{}.csv", std::process::id()));
        std::fs::remove_file(&path).ok();
        let directory = TickerDirectory::new(&path);

        assert!(tokio_test::block_on(directory.get_or_load()).is_empty());

        // file appearing later is not picked up by the same directory
        std::fs::write(&path, "symbol,name\nAAPL,Apple Inc.\n").unwrap();
        assert!(tokio_test::block_on(directory.get_or_load()).is_empty());
        assert_eq!(tokio_test::block_on(TickerDirectory::new(&path).get_or_load()).len(), 1);

        std::fs::remove_file(&path).ok();
    }
}
