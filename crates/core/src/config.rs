//! Pipeline configuration.

use serde::{Deserialize, Serialize};

/// Element id of the overlay box. Stale boxes are found and removed by it.
pub const DEFAULT_OVERLAY_ID: &str = "dragg-translation-box";

/// Runtime knobs for [`SelectionPipeline`](crate::SelectionPipeline).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
	/// Emit pipeline failures and trace events to the log.
	#[serde(default)]
	pub debug: bool,
	#[serde(default = "default_overlay_id")]
	pub overlay_id: String,
}

fn default_overlay_id() -> String {
	DEFAULT_OVERLAY_ID.to_string()
}

impl Default for PipelineConfig {
	fn default() -> Self {
		Self {
			debug: false,
			overlay_id: default_overlay_id(),
		}
	}
}

impl PipelineConfig {
	/// Builds a config from a `DRAGG_DEBUG`-style flag.
	///
	/// `1`, `true`, `yes` and `on` (any case) enable debug mode.
	pub fn from_debug_flag(flag: Option<&str>) -> Self {
		let debug = flag.is_some_and(|value| {
			matches!(
				value.trim().to_ascii_lowercase().as_str(),
				"1" | "true" | "yes" | "on"
			)
		});
		Self {
			debug,
			..Default::default()
		}
	}
}
