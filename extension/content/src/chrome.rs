//! `chrome.storage.local` as the persistent settings store.

use async_trait::async_trait;
use dragg::{Error, Result, SettingsStorage, StorageChanges, StorageRecord};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

/// Settings storage backed by `chrome.storage.local`.
pub struct ChromeStorage;

#[async_trait(?Send)]
impl SettingsStorage for ChromeStorage {
    async fn get(&self) -> Result<StorageRecord> {
        let items = JsFuture::from(storage_local_get().map_err(storage_error)?)
            .await
            .map_err(storage_error)?;
        if items.is_undefined() || items.is_null() {
            return Ok(StorageRecord::new());
        }
        serde_wasm_bindgen::from_value(items).map_err(|e| Error::Storage(e.to_string()))
    }

    async fn set(&self, items: StorageRecord) -> Result<()> {
        let items = items
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| Error::Storage(e.to_string()))?;
        JsFuture::from(storage_local_set(&items).map_err(storage_error)?)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        JsFuture::from(storage_local_clear().map_err(storage_error)?)
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}

/// Forwards every `chrome.storage.local` change event to `listener`.
///
/// Events that don't parse as a change map are dropped.
pub fn on_settings_changed<F>(listener: F)
where
    F: Fn(StorageChanges) + 'static,
{
    let on_changed = Closure::<dyn FnMut(JsValue)>::new(move |changes: JsValue| {
        match serde_wasm_bindgen::from_value::<StorageChanges>(changes) {
            Ok(changes) => {
                tracing::debug!(keys = ?changes.keys().collect::<Vec<_>>(), "storage changed");
                listener(changes);
            }
            Err(err) => tracing::debug!(error = %err, "unreadable storage change event"),
        }
    });
    storage_local_on_changed_add_listener(&on_changed);
    on_changed.forget();
}

fn storage_error(err: JsValue) -> Error {
    Error::Storage(crate::stringify_js_error(err))
}

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local"], js_name = get, catch)]
    fn storage_local_get() -> std::result::Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local"], js_name = set, catch)]
    fn storage_local_set(items: &JsValue) -> std::result::Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local"], js_name = clear, catch)]
    fn storage_local_clear() -> std::result::Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local", "onChanged"], js_name = addListener)]
    fn storage_local_on_changed_add_listener(cb: &Closure<dyn FnMut(JsValue)>);
}
