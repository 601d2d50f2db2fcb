//! Favorite Archiver library.
//!
//! Pages through a forum account's favorited entries, lets a person keep or
//! discard each one in a local web UI, and writes the kept entries into a
//! Word document.

// Allow raw string hashes for safety - they're harmless and prevent issues if content changes
#![allow(clippy::needless_raw_string_hashes)]

pub mod browser;
pub mod collector;
pub mod components;
pub mod config;
pub mod constants;
pub mod document;
pub mod entry;
pub mod web;
pub mod workflow;
