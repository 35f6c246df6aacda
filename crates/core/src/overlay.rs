//! Overlay geometry and styling.
//!
//! [`build_overlay`] is a pure function of the selection rectangle, the
//! scroll offset, the translated text, and the theme. The host applies
//! [`OverlayBox::style`] to a fresh element, inserts it, and only then raises
//! opacity to [`OverlayBox::VISIBLE_OPACITY`] so the fade-in is visible.

/// Horizontal padding between selection edge and box edge, in px.
pub const HORIZONTAL_PADDING: f64 = 8.0;
/// Gap below the selection and inner vertical padding, in px.
pub const VERTICAL_PADDING: f64 = 6.0;
/// Largest z-index browsers honor.
pub const Z_INDEX: i32 = i32::MAX;
/// Opacity transition applied before insertion.
pub const FADE_TRANSITION: &str = "opacity 0.1s ease-in-out";

/// Viewport-relative rectangle of a selection range.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
	pub left: f64,
	pub top: f64,
	pub width: f64,
	pub height: f64,
}

impl Rect {
	pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
		Self {
			left,
			top,
			width,
			height,
		}
	}

	pub fn bottom(&self) -> f64 {
		self.top + self.height
	}
}

/// Document scroll position at measurement time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollOffset {
	pub x: f64,
	pub y: f64,
}

impl ScrollOffset {
	pub fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}
}

/// Overlay color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
	#[default]
	Dark,
	Light,
}

/// Theme-dependent colors. Geometry never depends on the theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
	pub background: &'static str,
	pub color: &'static str,
	pub shadow: &'static str,
	pub border: &'static str,
}

const DARK_PALETTE: Palette = Palette {
	background: "rgba(22, 22, 22, 0.68)",
	color: "rgba(255, 255, 255, 0.8)",
	shadow: "0 1px 1px rgba(22, 22, 22, 0.1)",
	border: "1px solid rgba(255, 255, 255, 0.05)",
};

const LIGHT_PALETTE: Palette = Palette {
	background: "rgba(246, 246, 246, 0.64)",
	color: "rgba(22, 22, 22, 0.85)",
	shadow: "0 1px 1px rgba(22, 22, 22, 0.1)",
	border: "1px solid rgba(255, 255, 255, 0.15)",
};

impl Theme {
	pub fn from_dark_mode(dark_mode: bool) -> Self {
		if dark_mode { Theme::Dark } else { Theme::Light }
	}

	pub fn palette(self) -> &'static Palette {
		match self {
			Theme::Dark => &DARK_PALETTE,
			Theme::Light => &LIGHT_PALETTE,
		}
	}
}

/// A positioned, styled translation box ready for insertion.
///
/// `text` is untrusted output of the translation service. Hosts must insert
/// it as text content, never as markup.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayBox {
	pub id: String,
	/// Document-relative left edge, in px.
	pub left: f64,
	/// Document-relative top edge, in px.
	pub top: f64,
	/// Outer width, in px. Height grows with content.
	pub width: f64,
	pub text: String,
	pub theme: Theme,
}

impl OverlayBox {
	/// Opacity the host sets after the box has been painted once.
	pub const VISIBLE_OPACITY: &'static str = "1";

	/// CSS declarations in application order, ending with the hidden
	/// starting opacity.
	pub fn style(&self) -> Vec<(&'static str, String)> {
		let palette = self.theme.palette();
		vec![
			("position", "absolute".into()),
			("box-sizing", "border-box".into()),
			("left", px(self.left)),
			("top", px(self.top)),
			("width", px(self.width)),
			("height", "auto".into()),
			("z-index", Z_INDEX.to_string()),
			("font-size", "14px".into()),
			("font-weight", "400".into()),
			("line-height", "1.6".into()),
			("letter-spacing", "0.01em".into()),
			("white-space", "pre-wrap".into()),
			(
				"padding",
				format!("{} {}", px(VERTICAL_PADDING), px(HORIZONTAL_PADDING)),
			),
			("border-radius", "13px".into()),
			("background-color", palette.background.into()),
			("color", palette.color.into()),
			("box-shadow", palette.shadow.into()),
			("backdrop-filter", "blur(5px)".into()),
			("border", palette.border.into()),
			("transition", FADE_TRANSITION.into()),
			("opacity", "0".into()),
		]
	}
}

fn px(value: f64) -> String {
	format!("{value}px")
}

/// Positions a box just below `rect`, widened by the horizontal padding on
/// both sides. `rect` is viewport-relative; the result is document-relative.
pub fn build_overlay(
	id: &str,
	rect: &Rect,
	scroll: ScrollOffset,
	text: &str,
	theme: Theme,
) -> OverlayBox {
	OverlayBox {
		id: id.to_string(),
		left: rect.left + scroll.x - HORIZONTAL_PADDING,
		top: rect.bottom() + scroll.y + VERTICAL_PADDING,
		width: rect.width + HORIZONTAL_PADDING * 2.0,
		text: text.to_string(),
		theme,
	}
}
