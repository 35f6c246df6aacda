//! Settings record, persisted shape, and change-feed patches.
//!
//! The persisted record is untyped JSON written by other contexts (the
//! settings panel, older versions of this extension), so every field is
//! type-checked on the way in. A malformed field is skipped on its own; the
//! rest of the record or patch still applies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::overlay::Theme;

/// Fallback target language when the host reports no locale.
pub const DEFAULT_TARGET_LANGUAGE: &str = "en";

pub const TRANSLATE_ON_DRAG_KEY: &str = "translateOnDrag";
pub const TARGET_LANGUAGE_KEY: &str = "targetLanguage";
pub const DARK_MODE_KEY: &str = "darkMode";

/// Raw key-value record as stored in persistent storage.
pub type StorageRecord = Map<String, Value>;

/// Change feed payload: field name to old/new value.
pub type StorageChanges = BTreeMap<String, StorageChange>;

/// One field's transition in a change-feed event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub old_value: Option<Value>,
	/// `None` when the key was removed.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub new_value: Option<Value>,
}

/// Host queries used only to derive first-run defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnvironment {
	/// BCP 47 tag such as `en-US`.
	pub locale: String,
	pub prefers_dark: bool,
}

/// The authoritative in-memory configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
	pub translate_on_drag: bool,
	pub target_language: String,
	pub dark_mode: bool,
	/// Derived at startup from the presence of both capabilities. Never persisted.
	#[serde(skip)]
	pub capability_available: bool,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			translate_on_drag: true,
			target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
			dark_mode: true,
			capability_available: false,
		}
	}
}

/// Outcome of applying one incoming field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldUpdate {
	Changed,
	Unchanged,
	Malformed,
	Unknown,
}

impl Settings {
	/// Defaults derived from the host locale and theme preference.
	pub fn from_environment(env: &HostEnvironment) -> Self {
		Self {
			target_language: primary_language(&env.locale),
			dark_mode: env.prefers_dark,
			..Default::default()
		}
	}

	pub fn theme(&self) -> Theme {
		Theme::from_dark_mode(self.dark_mode)
	}

	/// The persisted shape: user intent only.
	pub fn to_record(&self) -> StorageRecord {
		let mut record = Map::new();
		record.insert(TRANSLATE_ON_DRAG_KEY.into(), Value::Bool(self.translate_on_drag));
		record.insert(
			TARGET_LANGUAGE_KEY.into(),
			Value::String(self.target_language.clone()),
		);
		record.insert(DARK_MODE_KEY.into(), Value::Bool(self.dark_mode));
		record
	}

	/// Merges a stored record over these settings. Returns true if anything changed.
	pub fn merge_record(&mut self, record: &StorageRecord) -> bool {
		let mut changed = false;
		for (key, value) in record {
			changed |= self.apply_field(key, value) == FieldUpdate::Changed;
		}
		changed
	}

	/// Applies a change-feed patch. Returns true if anything changed.
	///
	/// Removed keys (`newValue` absent) leave the current value in place.
	pub fn apply_changes(&mut self, changes: &StorageChanges) -> bool {
		let mut changed = false;
		for (key, change) in changes {
			let Some(value) = &change.new_value else {
				tracing::debug!(key = %key, "ignoring removed settings key");
				continue;
			};
			changed |= self.apply_field(key, value) == FieldUpdate::Changed;
		}
		changed
	}

	fn apply_field(&mut self, key: &str, value: &Value) -> FieldUpdate {
		let update = match key {
			TRANSLATE_ON_DRAG_KEY => match value.as_bool() {
				Some(v) => replace(&mut self.translate_on_drag, v),
				None => FieldUpdate::Malformed,
			},
			DARK_MODE_KEY => match value.as_bool() {
				Some(v) => replace(&mut self.dark_mode, v),
				None => FieldUpdate::Malformed,
			},
			TARGET_LANGUAGE_KEY => match value.as_str().map(str::trim) {
				Some(code) if !code.is_empty() => {
					replace(&mut self.target_language, code.to_string())
				}
				_ => FieldUpdate::Malformed,
			},
			_ => FieldUpdate::Unknown,
		};
		if update == FieldUpdate::Malformed {
			tracing::debug!(key = %key, value = %value, "ignoring malformed settings field");
		}
		update
	}
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> FieldUpdate {
	if *slot == value {
		FieldUpdate::Unchanged
	} else {
		*slot = value;
		FieldUpdate::Changed
	}
}

/// A partial settings update, as written by the settings panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub translate_on_drag: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub target_language: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub dark_mode: Option<bool>,
}

impl SettingsPatch {
	pub fn is_empty(&self) -> bool {
		self.translate_on_drag.is_none() && self.target_language.is_none() && self.dark_mode.is_none()
	}

	/// Converts to a partial storage record naming only the set fields.
	pub fn to_record(&self) -> Result<StorageRecord> {
		match serde_json::to_value(self)? {
			Value::Object(record) => Ok(record),
			_ => Ok(Map::new()),
		}
	}
}

/// Primary language subtag of a locale: `"en"` from `"en-US"`.
pub fn primary_language(locale: &str) -> String {
	let primary = locale
		.trim()
		.split(['-', '_'])
		.next()
		.unwrap_or_default();
	if primary.is_empty() {
		DEFAULT_TARGET_LANGUAGE.to_string()
	} else {
		primary.to_ascii_lowercase()
	}
}
