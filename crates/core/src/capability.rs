//! Seams for the external language-detection and translation capabilities.
//!
//! Both are asynchronous, session-based services supplied by the host. The
//! traits are `?Send`: everything runs on the page's single thread.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Language code detectors use for "undetermined".
pub const UNDETERMINED_LANGUAGE: &str = "und";

/// One candidate from a language detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
	pub detected_language: String,
	#[serde(default)]
	pub confidence: f64,
}

impl Detection {
	pub fn new(language: impl Into<String>, confidence: f64) -> Self {
		Self {
			detected_language: language.into(),
			confidence,
		}
	}

	/// Highest-confidence usable candidate. Earlier entries win ties.
	pub fn best(candidates: &[Detection]) -> Option<&Detection> {
		candidates
			.iter()
			.filter(|d| {
				let code = d.detected_language.trim();
				!code.is_empty() && code != UNDETERMINED_LANGUAGE
			})
			.fold(None, |best: Option<&Detection>, d| match best {
				Some(b) if b.confidence >= d.confidence => Some(b),
				_ => Some(d),
			})
	}
}

/// Source and target language of a translator session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguagePair {
	pub source_language: String,
	pub target_language: String,
}

impl LanguagePair {
	pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
		Self {
			source_language: source.into(),
			target_language: target.into(),
		}
	}
}

impl std::fmt::Display for LanguagePair {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} -> {}", self.source_language, self.target_language)
	}
}

/// Guesses the language of a text sample.
#[async_trait(?Send)]
pub trait LanguageDetector {
	/// Candidates ordered by descending confidence.
	async fn detect(&self, text: &str) -> Result<Vec<Detection>>;
}

/// Factory for [`LanguageDetector`]s.
#[async_trait(?Send)]
pub trait DetectionService {
	/// Fails if detection is unsupported in this context.
	async fn create_detector(&self) -> Result<Box<dyn LanguageDetector>>;
}

/// A live binding to one [`LanguagePair`].
///
/// Must be destroyed before another session replaces it.
#[async_trait(?Send)]
pub trait TranslationSession {
	async fn translate(&self, chunk: &str) -> Result<String>;

	/// Releases the session's resources. Calls still in flight, and any made
	/// afterwards, fail.
	async fn destroy(&self) -> Result<()>;
}

/// Factory for [`TranslationSession`]s.
#[async_trait(?Send)]
pub trait TranslationService {
	/// Fails for unsupported pairs or when translation is unavailable.
	async fn create_session(&self, pair: &LanguagePair) -> Result<Box<dyn TranslationSession>>;
}
