//! Directory listing scraper.
//!
//! Fetches an HTTP server's auto-generated index page and splits its links
//! into folders and media files, so a front end can browse the server and
//! ask for thumbnails of the videos it finds.
//!
//! # Example
//!
//! ```ignore
//! use soda_core::scraper::{DirectoryScraper, ScrapeRequest};
//!
//! let scraper = DirectoryScraper::new(&config.scraper)?;
//! let contents = scraper
//!     .scrape(&ScrapeRequest::new("http://media.local/movies/"))
//!     .await?;
//! for file in &contents.files {
//!     println!("{:?} {}", file.media, file.filename);
//! }
//! ```

mod directory;
mod listing;
mod types;

pub use directory::DirectoryScraper;
pub use listing::parse_listing;
pub use types::{Contents, FileEntry, MediaType, ScrapeError, ScrapeRequest};
