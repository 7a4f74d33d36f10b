#![forbid(unsafe_code)]

//! Resolves YouTube links into normalized metadata records.
//!
//! The official Data API is used when a working key is configured, with
//! `yt-dlp` as the fallback. Binaries and tests share everything through
//! these modules.

pub mod analyzer;
pub mod backend;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod normalize;
pub mod progress;
pub mod record;
pub mod report;

#[cfg(test)]
mod test_support;
