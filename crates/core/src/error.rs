//! Error types for the translation pipeline.
//!
//! Nothing here is ever shown to the reader of the page. Errors exist so the
//! pipeline can abort a single selection and log why in debug mode.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while translating a selection.
#[derive(Debug, Error)]
pub enum Error {
	/// A page-global capability (detector or translator) is missing.
	#[error("Capability unavailable: {0}")]
	CapabilityUnavailable(&'static str),

	/// The language detector could not be created.
	#[error("Failed to create language detector: {0}")]
	DetectorCreation(String),

	/// The detector rejected or failed a `detect` call.
	#[error("Language detection failed: {0}")]
	Detection(String),

	/// The detector returned no usable candidate.
	#[error("No language detected for {chars} characters of text")]
	NoLanguageDetected { chars: usize },

	/// The translation service refused to open a session for the pair.
	#[error("Failed to create translator session {source_language} -> {target_language}: {message}")]
	SessionCreation {
		source_language: String,
		target_language: String,
		message: String,
	},

	/// A single chunk translation failed.
	#[error("Translation failed: {0}")]
	Translation(String),

	/// Tearing down the previous session failed.
	#[error("Failed to release translator session: {0}")]
	SessionRelease(String),

	/// The selection has no range to measure.
	#[error("Selection has no range")]
	NoSelectionRange,

	/// Persistent settings storage failed.
	#[error("Storage error: {0}")]
	Storage(String),

	/// The host page refused an overlay operation.
	#[error("Surface error: {0}")]
	Surface(String),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true for failures of the external detector or translator.
	pub fn is_capability_failure(&self) -> bool {
		matches!(
			self,
			Error::DetectorCreation(_)
				| Error::Detection(_)
				| Error::NoLanguageDetected { .. }
				| Error::SessionCreation { .. }
				| Error::Translation(_)
				| Error::SessionRelease(_)
		)
	}

	/// Returns true if a capability was missing altogether.
	pub fn is_capability_unavailable(&self) -> bool {
		matches!(self, Error::CapabilityUnavailable(_))
	}
}
