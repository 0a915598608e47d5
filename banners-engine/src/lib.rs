//! Banner and widget engine for a page-oriented notes editor.
//!
//! The host binding implements [`host::HostApi`] and [`render::DomSurface`]
//! and feeds [`controller::HostEvent`]s into a [`controller::BannerController`].

pub mod config;
pub mod controller;
pub mod host;
pub mod image_cache;
pub mod page;
pub mod quote;
pub mod render;
pub mod resolver;
pub mod session;
pub mod settings;
pub mod snapshot;

pub use controller::{classify_props_mutation, BannerController, HostEvent, PropsChange, RenderOutcome, SaveOutcome};
pub use host::HostApi;
pub use image_cache::{BannerFetcher, HttpFetcher, ImageCache};
pub use page::{PageContext, PageKind};
pub use quote::{Quote, QuoteExtractor};
pub use render::{BannerDom, DomSurface};
pub use session::RenderSession;
pub use settings::{normalize, NormalizedSettings, RawSettings, SettingKey};
pub use snapshot::{GraphSnapshot, SnapshotHost};
