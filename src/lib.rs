//! feedmail: deliver RSS/Atom feed entries as email, once per new entry.
//!
//! The pipeline per feed is fetch → classify → for each unseen entry
//! (oldest first) compose a [`mail::Message`] and hand it to a
//! [`mail::Mailer`], then record the entry in the feed's
//! [`feed::SeenStore`]. Network, rendering, and delivery are traits so the
//! runner can be driven without I/O.

pub mod app;
pub mod config;
pub mod entry;
pub mod feed;
pub mod mail;
pub mod storage;
pub mod util;
