//! The page as a [`HostSurface`].

use dragg::{Error, HostEnvironment, HostSurface, OverlayBox, Rect, Result, ScrollOffset};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement, Window};

const DARK_SCHEME_QUERY: &str = "(prefers-color-scheme: dark)";

pub struct DomSurface {
    window: Window,
    document: Document,
}

impl DomSurface {
    pub fn new(window: Window) -> std::result::Result<Self, JsValue> {
        let document = window.document().ok_or("no document")?;
        Ok(Self { window, document })
    }

    fn create_overlay(&self, overlay: &OverlayBox) -> std::result::Result<HtmlElement, JsValue> {
        let element: HtmlElement = self.document.create_element("div")?.dyn_into()?;
        element.set_id(&overlay.id);
        // Plain text only; the translation never reaches the HTML parser.
        element.set_text_content(Some(&overlay.text));
        let style = element.style();
        for (property, value) in overlay.style() {
            style.set_property(property, &value)?;
        }
        Ok(element)
    }

    fn fade_in(&self, element: HtmlElement) -> std::result::Result<(), JsValue> {
        let reveal = Closure::once_into_js(move || {
            let _ = element
                .style()
                .set_property("opacity", OverlayBox::VISIBLE_OPACITY);
        });
        self.window
            .request_animation_frame(reveal.unchecked_ref())?;
        Ok(())
    }
}

impl HostSurface for DomSurface {
    fn selection_text(&self) -> Option<String> {
        let selection = self.window.get_selection().ok()??;
        selection.to_string().as_string()
    }

    fn selection_rect(&self) -> Option<Rect> {
        let selection = self.window.get_selection().ok()??;
        if selection.range_count() == 0 {
            return None;
        }
        let r = selection.get_range_at(0).ok()?.get_bounding_client_rect();
        Some(Rect::new(r.left(), r.top(), r.width(), r.height()))
    }

    fn scroll_offset(&self) -> ScrollOffset {
        ScrollOffset::new(
            self.window.scroll_x().unwrap_or_default(),
            self.window.scroll_y().unwrap_or_default(),
        )
    }

    fn remove_overlay(&self, id: &str) {
        if let Some(existing) = self.document.get_element_by_id(id) {
            existing.remove();
        }
    }

    fn insert_overlay(&self, overlay: &OverlayBox) -> Result<()> {
        let surface_error = |e: JsValue| Error::Surface(crate::stringify_js_error(e));
        let body = self
            .document
            .body()
            .ok_or_else(|| Error::Surface("document has no body".into()))?;
        let element = self.create_overlay(overlay).map_err(surface_error)?;
        body.append_child(&element).map_err(surface_error)?;
        self.fade_in(element).map_err(surface_error)
    }
}

/// Locale and colour-scheme preference of the hosting browser.
pub fn host_environment(window: &Window) -> HostEnvironment {
    let navigator = window.navigator();
    let prefers_dark = window
        .match_media(DARK_SCHEME_QUERY)
        .ok()
        .flatten()
        .map(|query| query.matches())
        .unwrap_or(false);
    HostEnvironment {
        locale: navigator.language().unwrap_or_default(),
        prefers_dark,
    }
}
