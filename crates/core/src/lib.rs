//! dragg: inline translation of selected text.
//!
//! Select text on a page, release the pointer, and a translation box appears
//! under the selection. This crate holds the platform-neutral core:
//!
//! - [`SettingsStore`]: the authoritative settings, seeded from persistent
//!   storage and kept current by its change feed
//! - [`TranslatorSlot`]: at most one live translator session, always torn
//!   down before it is replaced
//! - [`SelectionPipeline`]: pointer events to rendered overlay
//! - [`build_overlay`]: overlay geometry and styling
//!
//! The language detector, the translator, persistent storage, and the page
//! itself are reached through traits ([`DetectionService`],
//! [`TranslationService`], [`SettingsStorage`], [`HostSurface`]). The
//! `dragg-ext-content` crate implements them for a browser content script.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use dragg::{PipelineConfig, SelectionPipeline, SettingsStore};
//!
//! let store = SettingsStore::load(&storage, &env, capabilities_present).await?;
//! let pipeline = SelectionPipeline::new(PipelineConfig::default(), surface, detection, translation);
//!
//! pipeline.on_pointer_down();
//! let outcome = pipeline.on_pointer_up(&store.snapshot()).await;
//! ```

pub mod capability;
pub mod config;
pub mod error;
pub mod overlay;
pub mod pipeline;
pub mod settings;
pub mod store;
pub mod testing;
pub mod translator;

pub use capability::{
	Detection, DetectionService, LanguageDetector, LanguagePair, TranslationService,
	TranslationSession,
};
pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use overlay::{OverlayBox, Rect, ScrollOffset, Theme, build_overlay};
pub use pipeline::{HostSurface, Outcome, SelectionPipeline};
pub use settings::{
	HostEnvironment, Settings, SettingsPatch, StorageChange, StorageChanges, StorageRecord,
};
pub use store::{MemoryStorage, SettingsStorage, SettingsStore};
pub use translator::{SessionHandle, TranslatorSlot};
