//! Slug storage, shorty creation, and click analytics for shrty.
//!
//! The store and analytics backends are capability traits so the HTTP layer
//! and the assistant's tools can share them without knowing which backend is
//! configured.

pub mod analytics;
pub mod analytics_engine;
pub mod kv;
pub mod shorten;
pub mod store;

pub use analytics::{
    AnalyticsError, ClickAnalytics, ClickEvent, ClicksByCountryQuery, CountryClicks,
    MemoryClickAnalytics,
};
pub use analytics_engine::AnalyticsEngineClient;
pub use kv::WorkersKvStore;
pub use shorten::{add_url, ShortenError, Shorty};
pub use store::{MemoryUrlStore, StoreError, UrlStore};
