//! Testing infrastructure for the pipeline.
//!
//! Recording mock implementations of the host and capability seams, so the
//! pipeline can be exercised without a browser:
//! - [`MockSurface`]: selection, geometry, and the attached overlays
//! - [`MockDetectionService`]: scripted detector results
//! - [`MockTranslationService`]: session lifecycle log and gated translation
//!
//! # Example
//!
//! ```ignore
//! use dragg::testing::{MockDetectionService, MockSurface, MockTranslationService};
//!
//! #[tokio::test]
//! async fn test_render() {
//!     let surface = Rc::new(MockSurface::with_selection("Hola mundo", Rect::new(0.0, 0.0, 80.0, 16.0)));
//!     let detection = Rc::new(MockDetectionService::detecting("es"));
//!     let translation = Rc::new(MockTranslationService::new());
//!     // ... build a SelectionPipeline over them
//! }
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::capability::{
	Detection, DetectionService, LanguageDetector, LanguagePair, TranslationService,
	TranslationSession,
};
use crate::error::{Error, Result};
use crate::overlay::{OverlayBox, Rect, ScrollOffset};
use crate::pipeline::HostSurface;

/// In-memory [`HostSurface`].
#[derive(Default)]
pub struct MockSurface {
	selection: RefCell<Option<String>>,
	rect: Cell<Option<Rect>>,
	scroll: Cell<ScrollOffset>,
	attached: RefCell<Vec<OverlayBox>>,
	inserted: RefCell<Vec<OverlayBox>>,
	removals: Cell<usize>,
	fail_insert: Cell<bool>,
}

impl MockSurface {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_selection(text: &str, rect: Rect) -> Self {
		let surface = Self::new();
		surface.select(text, rect);
		surface
	}

	pub fn select(&self, text: &str, rect: Rect) {
		*self.selection.borrow_mut() = Some(text.to_string());
		self.rect.set(Some(rect));
	}

	/// Simulates a page without a selection object.
	pub fn clear_selection(&self) {
		*self.selection.borrow_mut() = None;
		self.rect.set(None);
	}

	/// Keeps the selected text but loses its range, as a collapse would.
	pub fn drop_range(&self) {
		self.rect.set(None);
	}

	/// Moves the selection's rectangle, as a reflow would.
	pub fn move_selection(&self, rect: Rect) {
		self.rect.set(Some(rect));
	}

	pub fn set_scroll(&self, x: f64, y: f64) {
		self.scroll.set(ScrollOffset::new(x, y));
	}

	pub fn fail_insert(&self, fail: bool) {
		self.fail_insert.set(fail);
	}

	/// Overlays currently attached to the page.
	pub fn attached(&self) -> Vec<OverlayBox> {
		self.attached.borrow().clone()
	}

	/// Every overlay ever inserted, in order.
	pub fn inserted(&self) -> Vec<OverlayBox> {
		self.inserted.borrow().clone()
	}

	/// Number of removal requests, including no-op ones.
	pub fn removals(&self) -> usize {
		self.removals.get()
	}

	/// Attaches an overlay directly, bypassing the pipeline.
	pub fn attach(&self, overlay: OverlayBox) {
		self.attached.borrow_mut().push(overlay);
	}
}

impl HostSurface for MockSurface {
	fn selection_text(&self) -> Option<String> {
		self.selection.borrow().clone()
	}

	fn selection_rect(&self) -> Option<Rect> {
		self.rect.get()
	}

	fn scroll_offset(&self) -> ScrollOffset {
		self.scroll.get()
	}

	fn remove_overlay(&self, id: &str) {
		self.removals.set(self.removals.get() + 1);
		self.attached.borrow_mut().retain(|o| o.id != id);
	}

	fn insert_overlay(&self, overlay: &OverlayBox) -> Result<()> {
		if self.fail_insert.get() {
			return Err(Error::Surface("body not available".into()));
		}
		self.attached.borrow_mut().push(overlay.clone());
		self.inserted.borrow_mut().push(overlay.clone());
		Ok(())
	}
}

#[derive(Default)]
struct DetectorState {
	results: RefCell<Vec<Detection>>,
	created: Cell<usize>,
	calls: RefCell<Vec<String>>,
	fail_create: Cell<bool>,
	fail_detect: Cell<bool>,
	hang_next_create: Cell<bool>,
	hung_creations: Cell<usize>,
}

/// [`DetectionService`] returning scripted candidates.
#[derive(Default)]
pub struct MockDetectionService {
	state: Rc<DetectorState>,
}

impl MockDetectionService {
	pub fn new() -> Self {
		Self::default()
	}

	/// Always detects `language` with full confidence.
	pub fn detecting(language: &str) -> Self {
		let service = Self::new();
		service.set_results(vec![Detection::new(language, 1.0)]);
		service
	}

	pub fn set_results(&self, results: Vec<Detection>) {
		*self.state.results.borrow_mut() = results;
	}

	pub fn fail_create(&self, fail: bool) {
		self.state.fail_create.set(fail);
	}

	pub fn fail_detect(&self, fail: bool) {
		self.state.fail_detect.set(fail);
	}

	/// Makes the next `create_detector` call never resolve.
	pub fn hang_next_creation(&self) {
		self.state.hang_next_create.set(true);
	}

	/// Number of `create_detector` calls left hanging.
	pub fn hung_creations(&self) -> usize {
		self.state.hung_creations.get()
	}

	/// Number of detectors created.
	pub fn detectors_created(&self) -> usize {
		self.state.created.get()
	}

	/// Texts passed to `detect`, in order.
	pub fn detect_calls(&self) -> Vec<String> {
		self.state.calls.borrow().clone()
	}
}

#[async_trait(?Send)]
impl DetectionService for MockDetectionService {
	async fn create_detector(&self) -> Result<Box<dyn LanguageDetector>> {
		if self.state.hang_next_create.replace(false) {
			self.state.hung_creations.set(self.state.hung_creations.get() + 1);
			std::future::pending::<()>().await;
		}
		if self.state.fail_create.get() {
			return Err(Error::DetectorCreation("detection unsupported".into()));
		}
		self.state.created.set(self.state.created.get() + 1);
		Ok(Box::new(MockDetector {
			state: self.state.clone(),
		}))
	}
}

struct MockDetector {
	state: Rc<DetectorState>,
}

#[async_trait(?Send)]
impl LanguageDetector for MockDetector {
	async fn detect(&self, text: &str) -> Result<Vec<Detection>> {
		self.state.calls.borrow_mut().push(text.to_string());
		if self.state.fail_detect.get() {
			return Err(Error::Detection("detector crashed".into()));
		}
		Ok(self.state.results.borrow().clone())
	}
}

/// Lifecycle events recorded by [`MockTranslationService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
	Created(LanguagePair),
	Destroyed(LanguagePair),
}

#[derive(Default)]
struct TranslatorState {
	events: RefCell<Vec<SessionEvent>>,
	translated: RefCell<Vec<String>>,
	live: Cell<usize>,
	max_live: Cell<usize>,
	destroy_attempts: Cell<usize>,
	fail_destroy: Cell<bool>,
	rejected: RefCell<HashSet<LanguagePair>>,
	failing_chunks: RefCell<HashSet<String>>,
	block_next: Cell<bool>,
	blocked: Cell<usize>,
	gate: Notify,
}

/// [`TranslationService`] whose sessions prefix each chunk with
/// `[target] `.
#[derive(Default)]
pub struct MockTranslationService {
	state: Rc<TranslatorState>,
}

impl MockTranslationService {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn reject_pair(&self, pair: LanguagePair) {
		self.state.rejected.borrow_mut().insert(pair);
	}

	pub fn fail_chunk(&self, chunk: &str) {
		self.state.failing_chunks.borrow_mut().insert(chunk.to_string());
	}

	pub fn fail_destroy(&self, fail: bool) {
		self.state.fail_destroy.set(fail);
	}

	/// Makes the next `translate` call wait for [`release_blocked`].
	///
	/// [`release_blocked`]: Self::release_blocked
	pub fn block_next_translation(&self) {
		self.state.block_next.set(true);
	}

	/// Number of `translate` calls currently or previously held by the gate.
	pub fn blocked_calls(&self) -> usize {
		self.state.blocked.get()
	}

	pub fn release_blocked(&self) {
		self.state.gate.notify_one();
	}

	pub fn events(&self) -> Vec<SessionEvent> {
		self.state.events.borrow().clone()
	}

	pub fn sessions_created(&self) -> usize {
		self.state
			.events
			.borrow()
			.iter()
			.filter(|e| matches!(e, SessionEvent::Created(_)))
			.count()
	}

	/// Chunks translated successfully, in call order.
	pub fn translated_chunks(&self) -> Vec<String> {
		self.state.translated.borrow().clone()
	}

	pub fn live_sessions(&self) -> usize {
		self.state.live.get()
	}

	/// Highest number of sessions ever alive at once.
	pub fn max_live_sessions(&self) -> usize {
		self.state.max_live.get()
	}

	pub fn destroy_attempts(&self) -> usize {
		self.state.destroy_attempts.get()
	}
}

#[async_trait(?Send)]
impl TranslationService for MockTranslationService {
	async fn create_session(&self, pair: &LanguagePair) -> Result<Box<dyn TranslationSession>> {
		if self.state.rejected.borrow().contains(pair) {
			return Err(Error::SessionCreation {
				source_language: pair.source_language.clone(),
				target_language: pair.target_language.clone(),
				message: "unsupported language pair".into(),
			});
		}
		let live = self.state.live.get() + 1;
		self.state.live.set(live);
		self.state.max_live.set(self.state.max_live.get().max(live));
		self.state
			.events
			.borrow_mut()
			.push(SessionEvent::Created(pair.clone()));
		Ok(Box::new(MockSession {
			pair: pair.clone(),
			state: self.state.clone(),
			destroyed: Cell::new(false),
		}))
	}
}

struct MockSession {
	pair: LanguagePair,
	state: Rc<TranslatorState>,
	destroyed: Cell<bool>,
}

#[async_trait(?Send)]
impl TranslationSession for MockSession {
	async fn translate(&self, chunk: &str) -> Result<String> {
		if self.state.block_next.replace(false) {
			self.state.blocked.set(self.state.blocked.get() + 1);
			self.state.gate.notified().await;
		}
		if self.destroyed.get() {
			return Err(Error::Translation("translator was destroyed".into()));
		}
		if self.state.failing_chunks.borrow().contains(chunk) {
			return Err(Error::Translation(format!("cannot translate {chunk:?}")));
		}
		self.state.translated.borrow_mut().push(chunk.to_string());
		Ok(format!("[{}] {}", self.pair.target_language, chunk))
	}

	async fn destroy(&self) -> Result<()> {
		self.state
			.destroy_attempts
			.set(self.state.destroy_attempts.get() + 1);
		self.destroyed.set(true);
		self.state.live.set(self.state.live.get().saturating_sub(1));
		if self.state.fail_destroy.get() {
			return Err(Error::SessionRelease("translator busy".into()));
		}
		self.state
			.events
			.borrow_mut()
			.push(SessionEvent::Destroyed(self.pair.clone()));
		Ok(())
	}
}
