//! Content script: wires the dragg pipeline into the page.

use std::rc::Rc;

use dragg::{PipelineConfig, SelectionPipeline, SettingsStore};
use js_sys::Reflect;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, Window};

mod capability;
mod chrome;
mod dom;
mod logging;

use capability::{BuiltinDetection, BuiltinTranslation};
use chrome::ChromeStorage;
use dom::DomSurface;

/// Build-time switch for debug logging.
const DEBUG_FLAG: Option<&str> = option_env!("DRAGG_DEBUG");

/// Page-global marker set once listeners are attached. Guards against the
/// script being injected twice into the same page.
const ATTACHED_MARKER: &str = "__draggEventsAttached";

#[wasm_bindgen(start)]
pub async fn start() {
    console_error_panic_hook::set_once();

    let config = PipelineConfig::from_debug_flag(DEBUG_FLAG);
    logging::init_logging(&config);

    if let Err(err) = init(config).await {
        tracing::debug!(error = %stringify_js_error(err), "init failed");
    }
}

/// What a content-script instance does on startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Startup {
    /// An earlier injection already owns this page.
    AlreadyAttached,
    /// Capabilities are missing: persist the settings baseline only.
    Inactive,
    /// Load settings, follow their changes, and listen for selections.
    Attach,
}

impl Startup {
    fn plan(attached: bool, capabilities_present: bool) -> Self {
        if attached {
            Startup::AlreadyAttached
        } else if capabilities_present {
            Startup::Attach
        } else {
            Startup::Inactive
        }
    }
}

async fn init(config: PipelineConfig) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or("no window")?;
    let available = capability::capabilities_present();

    let startup = Startup::plan(is_attached(&window), available);
    if startup == Startup::AlreadyAttached {
        tracing::debug!("listeners already attached");
        return Ok(());
    }

    let env = dom::host_environment(&window);
    let store = SettingsStore::load(&ChromeStorage, &env, available)
        .await
        .map_err(to_js_error)?;

    if startup == Startup::Inactive {
        tracing::debug!("LanguageDetector or Translator missing, staying inactive");
        return Ok(());
    }

    let store = Rc::new(store);
    {
        let store = store.clone();
        chrome::on_settings_changed(move |changes| {
            store.apply_changes(&changes);
        });
    }

    let surface = Rc::new(DomSurface::new(window.clone())?);
    let pipeline = Rc::new(SelectionPipeline::new(
        config,
        surface,
        Rc::new(BuiltinDetection),
        Rc::new(BuiltinTranslation),
    ));
    attach_listeners(&window, pipeline, store)?;
    mark_attached(&window)?;

    tracing::debug!("listeners attached");
    Ok(())
}

fn attach_listeners(
    window: &Window,
    pipeline: Rc<SelectionPipeline>,
    store: Rc<SettingsStore>,
) -> Result<(), JsValue> {
    let document = window.document().ok_or("no document")?;

    // Pointer down: clear the overlay synchronously.
    {
        let pipeline = pipeline.clone();
        let on_down = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
            pipeline.on_pointer_down();
        });
        document.add_event_listener_with_callback("mousedown", on_down.as_ref().unchecked_ref())?;
        on_down.forget();
    }

    // Pointer up: one pipeline run per release, against the settings of the moment.
    {
        let pipeline = pipeline.clone();
        let on_up = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
            let pipeline = pipeline.clone();
            let settings = store.snapshot();
            wasm_bindgen_futures::spawn_local(async move {
                pipeline.on_pointer_up(&settings).await;
            });
        });
        document.add_event_listener_with_callback("mouseup", on_up.as_ref().unchecked_ref())?;
        on_up.forget();
    }

    // Page hidden: release the translator session.
    {
        let on_hide = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
            let pipeline = pipeline.clone();
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(err) = pipeline.shutdown().await {
                    tracing::debug!(error = %err, "translator release on pagehide failed");
                }
            });
        });
        window.add_event_listener_with_callback("pagehide", on_hide.as_ref().unchecked_ref())?;
        on_hide.forget();
    }

    Ok(())
}

fn is_attached(window: &Window) -> bool {
    Reflect::get(window, &JsValue::from_str(ATTACHED_MARKER))
        .ok()
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

fn mark_attached(window: &Window) -> Result<(), JsValue> {
    Reflect::set(window, &JsValue::from_str(ATTACHED_MARKER), &JsValue::TRUE)?;
    Ok(())
}

fn to_js_error(err: dragg::Error) -> JsValue {
    JsValue::from_str(&err.to_string())
}

pub(crate) fn stringify_js_error(err: JsValue) -> String {
    err.as_string()
        .or_else(|| {
            Reflect::get(&err, &JsValue::from_str("message"))
                .ok()?
                .as_string()
        })
        .or_else(|| js_sys::JSON::stringify(&err).ok()?.as_string())
        .unwrap_or_else(|| format!("{:?}", err))
}
