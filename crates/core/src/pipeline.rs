//! Selection-triggered translation pipeline.
//!
//! Pointer-down clears the overlay. Pointer-up runs one best-effort pass:
//! read the selection, detect its language, translate it through the
//! [`TranslatorSlot`], and render an [`OverlayBox`] under it. Every failure
//! ends the pass quietly with [`Outcome::Aborted`]; the page never sees an
//! error.
//!
//! Runs are not cancelled. Instead each pointer event bumps a generation
//! counter, and a run only writes the overlay if its generation is still
//! current, so a slow translation cannot overwrite a newer one.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::capability::{
	Detection, DetectionService, LanguageDetector, LanguagePair, TranslationService,
};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::overlay::{OverlayBox, Rect, ScrollOffset, build_overlay};
use crate::settings::Settings;
use crate::translator::TranslatorSlot;

/// The page the pipeline reads selections from and draws overlays on.
pub trait HostSurface {
	/// Text of the current selection, or `None` if there is no selection
	/// object at all.
	fn selection_text(&self) -> Option<String>;

	/// Viewport-relative bounding rectangle of the selection's first range.
	fn selection_rect(&self) -> Option<Rect>;

	fn scroll_offset(&self) -> ScrollOffset;

	/// Removes the element with `id`. No-op when absent.
	fn remove_overlay(&self, id: &str);

	/// Attaches `overlay` as text content and starts its fade-in.
	fn insert_overlay(&self, overlay: &OverlayBox) -> Result<()>;
}

/// How a pointer-up run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
	/// Auto-translate is off or the capabilities are missing.
	Disabled,
	NoSelection,
	/// Selected text was empty after trimming.
	EmptySelection,
	/// Text is already in the target language.
	SameLanguage { language: String },
	/// A newer pointer event started before this run could render.
	Superseded,
	Rendered(OverlayBox),
	/// A step failed. Logged at debug level only.
	Aborted,
}

/// Orchestrates one page's selection translations.
pub struct SelectionPipeline {
	config: PipelineConfig,
	surface: Rc<dyn HostSurface>,
	detection: Rc<dyn DetectionService>,
	detector: RefCell<Option<Rc<dyn LanguageDetector>>>,
	translator: TranslatorSlot,
	generation: Cell<u64>,
}

impl SelectionPipeline {
	pub fn new(
		config: PipelineConfig,
		surface: Rc<dyn HostSurface>,
		detection: Rc<dyn DetectionService>,
		translation: Rc<dyn TranslationService>,
	) -> Self {
		Self {
			config,
			surface,
			detection,
			detector: RefCell::new(None),
			translator: TranslatorSlot::new(translation),
			generation: Cell::new(0),
		}
	}

	/// Number of pointer events seen so far.
	pub fn generation(&self) -> u64 {
		self.generation.get()
	}

	pub fn translator(&self) -> &TranslatorSlot {
		&self.translator
	}

	/// Clears any overlay and invalidates runs still in flight.
	pub fn on_pointer_down(&self) {
		tracing::trace!("pointer down");
		self.advance();
		self.remove_overlay();
	}

	/// Runs the pipeline against a settings snapshot taken by the caller.
	pub async fn on_pointer_up(&self, settings: &Settings) -> Outcome {
		let generation = self.advance();
		tracing::trace!(generation, "pointer up");

		match self.run(generation, settings).await {
			Ok(outcome) => {
				tracing::debug!(generation, ?outcome, "selection handled");
				outcome
			}
			Err(err) => {
				tracing::debug!(
					generation,
					error = %err,
					capability = err.is_capability_failure(),
					"selection translation aborted"
				);
				Outcome::Aborted
			}
		}
	}

	/// Releases the live translator session, e.g. when the page is hidden.
	pub async fn shutdown(&self) -> Result<()> {
		self.advance();
		self.remove_overlay();
		self.translator.release().await
	}

	async fn run(&self, generation: u64, settings: &Settings) -> Result<Outcome> {
		self.remove_overlay();

		if !settings.capability_available || !settings.translate_on_drag {
			return Ok(Outcome::Disabled);
		}

		let Some(selected) = self.surface.selection_text() else {
			return Ok(Outcome::NoSelection);
		};
		let text = selected.trim();
		if text.is_empty() {
			return Ok(Outcome::EmptySelection);
		}

		let source = self.detect_language(text).await?;
		tracing::debug!(source = %source, target = %settings.target_language, "language detected");
		if source.eq_ignore_ascii_case(&settings.target_language) {
			return Ok(Outcome::SameLanguage { language: source });
		}

		if !self.is_current(generation) {
			return Ok(Outcome::Superseded);
		}

		let pair = LanguagePair::new(source, settings.target_language.clone());
		let session = self.translator.acquire(pair).await?;
		let translated = session.translate_lines(text).await?;

		if !self.is_current(generation) {
			return Ok(Outcome::Superseded);
		}

		// Measured after translating: the page may have scrolled or reflowed.
		let rect = self
			.surface
			.selection_rect()
			.ok_or(Error::NoSelectionRange)?;
		let overlay = build_overlay(
			&self.config.overlay_id,
			&rect,
			self.surface.scroll_offset(),
			&translated,
			settings.theme(),
		);

		self.remove_overlay();
		self.surface.insert_overlay(&overlay)?;
		Ok(Outcome::Rendered(overlay))
	}

	async fn detect_language(&self, text: &str) -> Result<String> {
		let detector = self.detector().await?;
		let candidates = detector.detect(text).await?;
		Detection::best(&candidates)
			.map(|d| d.detected_language.trim().to_string())
			.ok_or(Error::NoLanguageDetected {
				chars: text.chars().count(),
			})
	}

	/// The shared detector, created on first use.
	///
	/// No lock is held while a creation is pending: overlapping runs each
	/// create one and the first to finish is kept.
	async fn detector(&self) -> Result<Rc<dyn LanguageDetector>> {
		let cached = self.detector.borrow().clone();
		if let Some(detector) = cached {
			return Ok(detector);
		}
		let created: Rc<dyn LanguageDetector> = Rc::from(self.detection.create_detector().await?);
		Ok(self.detector.borrow_mut().get_or_insert(created).clone())
	}

	fn advance(&self) -> u64 {
		let next = self.generation.get().wrapping_add(1);
		self.generation.set(next);
		next
	}

	fn is_current(&self, generation: u64) -> bool {
		self.generation.get() == generation
	}

	fn remove_overlay(&self) {
		self.surface.remove_overlay(&self.config.overlay_id);
	}
}
