//! version-scout: find the latest released version of desktop software
//! from the open web
//!
//! Queries several kinds of web sources (search result pages,
//! encyclopedia infoboxes, curated vendor pages) and reconciles their
//! noisy answers into one report per piece of software.

pub mod config;
pub mod http;
pub mod logging;
pub mod resolver;
pub mod scrape;
pub mod source;
pub mod sources;
pub mod version;
