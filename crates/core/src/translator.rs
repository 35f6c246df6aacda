//! Translator session lifecycle.
//!
//! [`TranslatorSlot`] owns zero or one [`TranslationSession`]. Every
//! [`acquire`](TranslatorSlot::acquire) tears down the current session before
//! creating the next one, even for an identical pair. The slot's lock covers
//! only that swap. Translation runs on a [`SessionHandle`] outside the lock,
//! so a newer `acquire` destroys a session an older run is still using and a
//! hung call never holds up later selections.

use std::cell::RefCell;
use std::rc::Rc;

use tokio::sync::Mutex;

use crate::capability::{LanguagePair, TranslationService, TranslationSession};
use crate::error::Result;

struct ActiveSession {
	pair: LanguagePair,
	session: Rc<dyn TranslationSession>,
}

/// Owning handle for the single live translator session.
pub struct TranslatorSlot {
	service: Rc<dyn TranslationService>,
	current: RefCell<Option<ActiveSession>>,
	swap: Mutex<()>,
}

impl TranslatorSlot {
	pub fn new(service: Rc<dyn TranslationService>) -> Self {
		Self {
			service,
			current: RefCell::new(None),
			swap: Mutex::new(()),
		}
	}

	/// Replaces the current session with a fresh one for `pair`.
	///
	/// The previous session's `destroy` is always awaited first. A failed
	/// release is logged and ignored. If creation fails the slot is left
	/// empty and the error is returned.
	pub async fn acquire(&self, pair: LanguagePair) -> Result<SessionHandle> {
		let _swap = self.swap.lock().await;

		let previous = self.current.borrow_mut().take();
		if let Some(previous) = previous {
			if let Err(err) = Self::teardown(previous).await {
				tracing::debug!(error = %err, "previous translator session not released, replacing anyway");
			}
		}

		let session: Rc<dyn TranslationSession> =
			Rc::from(self.service.create_session(&pair).await?);
		tracing::debug!(pair = %pair, "translator session created");

		*self.current.borrow_mut() = Some(ActiveSession {
			pair: pair.clone(),
			session: session.clone(),
		});
		Ok(SessionHandle { pair, session })
	}

	/// Destroys the current session, if any.
	pub async fn release(&self) -> Result<()> {
		let _swap = self.swap.lock().await;
		let previous = self.current.borrow_mut().take();
		match previous {
			Some(active) => Self::teardown(active).await,
			None => Ok(()),
		}
	}

	/// Pair of the live session.
	pub fn active_pair(&self) -> Option<LanguagePair> {
		self.current.borrow().as_ref().map(|a| a.pair.clone())
	}

	pub fn is_active(&self) -> bool {
		self.current.borrow().is_some()
	}

	async fn teardown(active: ActiveSession) -> Result<()> {
		active.session.destroy().await?;
		tracing::debug!(pair = %active.pair, "translator session released");
		Ok(())
	}
}

/// A session handed out by [`TranslatorSlot::acquire`].
///
/// Stays usable until the slot replaces or releases it; after that the
/// service rejects further calls.
pub struct SessionHandle {
	pair: LanguagePair,
	session: Rc<dyn TranslationSession>,
}

impl SessionHandle {
	pub fn pair(&self) -> &LanguagePair {
		&self.pair
	}

	pub async fn translate(&self, chunk: &str) -> Result<String> {
		self.session.translate(chunk).await
	}

	/// Translates `text` one newline-delimited chunk at a time, in order,
	/// one call in flight at a time, and rejoins with `\n`.
	///
	/// Blank chunks are kept as-is without a service call.
	pub async fn translate_lines(&self, text: &str) -> Result<String> {
		let mut translated = Vec::new();
		for chunk in text.split('\n') {
			if chunk.trim().is_empty() {
				translated.push(chunk.to_string());
			} else {
				translated.push(self.translate(chunk).await?);
			}
		}
		Ok(translated.join("\n"))
	}
}
