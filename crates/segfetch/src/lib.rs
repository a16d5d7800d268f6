//! Sequential downloaders for two kinds of remote media:
//!
//! - [`download`]: a single MPEG-DASH video track, assembled from its initialization
//!   segment and numbered media segments into one file.
//! - [`mirror`]: the missing files of an S3 style bucket listing.
//!
//! ```text
//! ┌──────────────┐ Manifest ┌──────────────┐  init, 1, 2, …, N  ┌─────────────┐
//! │   MPD text   ├──────────►    Track     ├────────────────────►  output    │
//! │ + source URL │  parse   │  selection   │ download_segments  │    file     │
//! └──────────────┘          └──────────────┘                    └─────────────┘
//! ```

pub mod download;
pub mod duration;
pub mod error;
pub mod http;
pub mod mirror;
pub mod mpd;
pub mod template;
pub mod url;

pub use ::url::Url;
pub use download::{download_manifest, DashDownloadConfig, DownloadSummary};
pub use error::*;
pub use http::HttpClient;
pub use mirror::{BucketMirror, MirrorConfig, MirrorReport};
pub use mpd::{Manifest, Track};
