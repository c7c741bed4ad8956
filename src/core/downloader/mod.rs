mod client;

pub use client::{DownloadProgress, Fetcher, HttpFetcher};
