//! Settings synchronization.
//!
//! [`SettingsStore`] holds the one authoritative [`Settings`] per execution
//! context in a [`watch`] channel. Pipeline runs take a [`snapshot`] when
//! they start, and change-feed events swap in a whole new value, so a run
//! never sees a half-applied patch.
//!
//! [`snapshot`]: SettingsStore::snapshot

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::Result;
use crate::settings::{
	HostEnvironment, Settings, SettingsPatch, StorageChange, StorageChanges, StorageRecord,
};

/// Persistent key-value settings storage.
///
/// Mirrors `chrome.storage.local`: `set` merges, `clear` empties, and
/// every writer's changes are broadcast to all contexts out of band.
#[async_trait(?Send)]
pub trait SettingsStorage {
	/// Returns the full record, empty if never written.
	async fn get(&self) -> Result<StorageRecord>;

	/// Merges `items` into the stored record.
	async fn set(&self, items: StorageRecord) -> Result<()>;

	/// Removes every key.
	async fn clear(&self) -> Result<()>;
}

/// The authoritative settings for one execution context.
pub struct SettingsStore {
	tx: watch::Sender<Settings>,
}

impl SettingsStore {
	/// Wraps already-resolved settings without touching storage.
	pub fn new(settings: Settings) -> Self {
		let (tx, _rx) = watch::channel(settings);
		Self { tx }
	}

	/// Seeds settings from storage and re-persists the normalized record.
	///
	/// An empty record is a first run: defaults come from `env` and are
	/// persisted as the baseline. Otherwise stored fields are merged over the
	/// same defaults, which upgrades older or partial records to the current
	/// schema.
	pub async fn load(
		storage: &dyn SettingsStorage,
		env: &HostEnvironment,
		capability_available: bool,
	) -> Result<Self> {
		let stored = storage.get().await?;
		let mut settings = Settings::from_environment(env);

		if stored.is_empty() {
			tracing::debug!(
				target_language = %settings.target_language,
				dark_mode = settings.dark_mode,
				"no stored settings, persisting host defaults"
			);
		} else {
			settings.merge_record(&stored);
		}
		storage.set(settings.to_record()).await?;

		settings.capability_available = capability_available;
		tracing::debug!(?settings, "settings loaded");
		Ok(Self::new(settings))
	}

	/// A read-only copy for one pipeline invocation.
	pub fn snapshot(&self) -> Settings {
		self.tx.borrow().clone()
	}

	/// Receives every swapped-in snapshot.
	pub fn subscribe(&self) -> watch::Receiver<Settings> {
		self.tx.subscribe()
	}

	/// Applies a change-feed event. Returns true if the snapshot changed.
	pub fn apply_changes(&self, changes: &StorageChanges) -> bool {
		let changed = self.tx.send_if_modified(|settings| {
			let mut next = settings.clone();
			if next.apply_changes(changes) {
				*settings = next;
				true
			} else {
				false
			}
		});
		if changed {
			let settings = self.tx.borrow();
			tracing::debug!(settings = ?*settings, "settings updated");
		}
		changed
	}

	/// Persists a patch. The change feed delivers it back to every reader,
	/// this one included.
	pub async fn update(&self, storage: &dyn SettingsStorage, patch: &SettingsPatch) -> Result<()> {
		if patch.is_empty() {
			return Ok(());
		}
		storage.set(patch.to_record()?).await
	}
}

type ChangeListener = Rc<dyn Fn(&StorageChanges)>;

/// In-process [`SettingsStorage`] with `chrome.storage` change semantics.
///
/// Only keys whose value actually changed are reported, and `clear` reports
/// each removed key with no `newValue`. Listeners run synchronously inside
/// the writing call.
#[derive(Default)]
pub struct MemoryStorage {
	record: RefCell<StorageRecord>,
	listeners: RefCell<Vec<ChangeListener>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates storage pre-filled with `record`.
	pub fn with_record(record: StorageRecord) -> Self {
		Self {
			record: RefCell::new(record),
			listeners: RefCell::new(Vec::new()),
		}
	}

	/// Registers a change listener.
	pub fn on_changed<F>(&self, listener: F)
	where
		F: Fn(&StorageChanges) + 'static,
	{
		self.listeners.borrow_mut().push(Rc::new(listener));
	}

	/// Current stored value for `key`.
	pub fn value(&self, key: &str) -> Option<Value> {
		self.record.borrow().get(key).cloned()
	}

	pub fn record(&self) -> StorageRecord {
		self.record.borrow().clone()
	}

	fn notify(&self, changes: StorageChanges) {
		if changes.is_empty() {
			return;
		}
		// Listeners may write back into storage.
		let listeners: Vec<_> = self.listeners.borrow().iter().cloned().collect();
		for listener in listeners {
			listener(&changes);
		}
	}
}

#[async_trait(?Send)]
impl SettingsStorage for MemoryStorage {
	async fn get(&self) -> Result<StorageRecord> {
		Ok(self.record())
	}

	async fn set(&self, items: StorageRecord) -> Result<()> {
		let mut changes = StorageChanges::new();
		{
			let mut record = self.record.borrow_mut();
			for (key, new_value) in items {
				let old_value = record.insert(key.clone(), new_value.clone());
				if old_value.as_ref() != Some(&new_value) {
					changes.insert(
						key,
						StorageChange {
							old_value,
							new_value: Some(new_value),
						},
					);
				}
			}
		}
		self.notify(changes);
		Ok(())
	}

	async fn clear(&self) -> Result<()> {
		let removed = std::mem::take(&mut *self.record.borrow_mut());
		let changes = removed
			.into_iter()
			.map(|(key, old_value)| {
				(
					key,
					StorageChange {
						old_value: Some(old_value),
						new_value: None,
					},
				)
			})
			.collect();
		self.notify(changes);
		Ok(())
	}
}
