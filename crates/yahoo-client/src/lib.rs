mod parse;
pub mod client;

pub use client::YahooFinanceClient;
