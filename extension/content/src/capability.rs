//! The browser's built-in `LanguageDetector` and `Translator` globals.

use async_trait::async_trait;
use dragg::{
    Detection, DetectionService, Error, LanguageDetector, LanguagePair, Result, TranslationService,
    TranslationSession,
};
use js_sys::{Promise, Reflect};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = LanguageDetector)]
    type JsLanguageDetector;

    #[wasm_bindgen(static_method_of = JsLanguageDetector, js_class = "LanguageDetector", js_name = create, catch)]
    fn create() -> std::result::Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn detect(this: &JsLanguageDetector, text: &str) -> std::result::Result<Promise, JsValue>;

    #[wasm_bindgen(js_name = Translator)]
    type JsTranslator;

    #[wasm_bindgen(static_method_of = JsTranslator, js_class = "Translator", js_name = create, catch)]
    fn create_with(options: &JsValue) -> std::result::Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn translate(this: &JsTranslator, text: &str) -> std::result::Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn destroy(this: &JsTranslator) -> std::result::Result<JsValue, JsValue>;
}

/// True when both `LanguageDetector` and `Translator` exist on the global
/// object.
pub fn capabilities_present() -> bool {
    global_present(DETECTOR_GLOBAL) && global_present(TRANSLATOR_GLOBAL)
}

const DETECTOR_GLOBAL: &str = "LanguageDetector";
const TRANSLATOR_GLOBAL: &str = "Translator";

fn global_present(name: &str) -> bool {
    Reflect::get(&js_sys::global(), &JsValue::from_str(name))
        .map(|v| !v.is_undefined() && !v.is_null())
        .unwrap_or(false)
}

fn require_global(name: &'static str) -> Result<()> {
    if global_present(name) {
        Ok(())
    } else {
        Err(Error::CapabilityUnavailable(name))
    }
}

async fn settle(promise: std::result::Result<Promise, JsValue>) -> std::result::Result<JsValue, JsValue> {
    JsFuture::from(promise?).await
}

pub struct BuiltinDetection;

#[async_trait(?Send)]
impl DetectionService for BuiltinDetection {
    async fn create_detector(&self) -> Result<Box<dyn LanguageDetector>> {
        require_global(DETECTOR_GLOBAL)?;
        let detector = settle(JsLanguageDetector::create())
            .await
            .map_err(|e| Error::DetectorCreation(crate::stringify_js_error(e)))?;
        tracing::debug!("language detector created");
        Ok(Box::new(BuiltinDetector {
            inner: detector.unchecked_into(),
        }))
    }
}

struct BuiltinDetector {
    inner: JsLanguageDetector,
}

#[async_trait(?Send)]
impl LanguageDetector for BuiltinDetector {
    async fn detect(&self, text: &str) -> Result<Vec<Detection>> {
        let results = settle(self.inner.detect(text))
            .await
            .map_err(|e| Error::Detection(crate::stringify_js_error(e)))?;
        serde_wasm_bindgen::from_value(results).map_err(|e| Error::Detection(e.to_string()))
    }
}

pub struct BuiltinTranslation;

#[async_trait(?Send)]
impl TranslationService for BuiltinTranslation {
    async fn create_session(&self, pair: &LanguagePair) -> Result<Box<dyn TranslationSession>> {
        require_global(TRANSLATOR_GLOBAL)?;
        let creation_error = |message: String| Error::SessionCreation {
            source_language: pair.source_language.clone(),
            target_language: pair.target_language.clone(),
            message,
        };
        let options = pair
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| creation_error(e.to_string()))?;
        let translator = settle(JsTranslator::create_with(&options))
            .await
            .map_err(|e| creation_error(crate::stringify_js_error(e)))?;
        Ok(Box::new(BuiltinSession {
            inner: translator.unchecked_into(),
        }))
    }
}

struct BuiltinSession {
    inner: JsTranslator,
}

#[async_trait(?Send)]
impl TranslationSession for BuiltinSession {
    async fn translate(&self, chunk: &str) -> Result<String> {
        let translated = settle(self.inner.translate(chunk))
            .await
            .map_err(|e| Error::Translation(crate::stringify_js_error(e)))?;
        translated
            .as_string()
            .ok_or_else(|| Error::Translation("translator returned a non-string".into()))
    }

    async fn destroy(&self) -> Result<()> {
        let release_error = |e: JsValue| Error::SessionRelease(crate::stringify_js_error(e));
        let returned = self.inner.destroy().map_err(release_error)?;
        // Some builds return a promise, others nothing.
        if let Ok(promise) = returned.dyn_into::<Promise>() {
            JsFuture::from(promise).await.map_err(release_error)?;
        }
        Ok(())
    }
}
