//! Content store module for hosting thumbnails.
//!
//! This module provides the `ContentStore` trait and a litterbox
//! implementation that uploads an image and returns its public URL.
//!
//! # Example
//!
//! ```ignore
//! use soda_core::store::{ContentStore, LitterboxStore};
//!
//! let store = LitterboxStore::new(config.store.clone())?;
//! let url = store.upload(Path::new("./thumbnails/abc123.webp")).await?;
//! ```

mod error;
mod litterbox;
mod traits;

pub use error::StoreError;
pub use litterbox::LitterboxStore;
pub use traits::ContentStore;
