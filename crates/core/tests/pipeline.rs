//! Integration tests for the selection pipeline against mock host services.

use std::rc::Rc;

use dragg::testing::{MockDetectionService, MockSurface, MockTranslationService, SessionEvent};
use dragg::{
	Detection, LanguagePair, Outcome, PipelineConfig, Rect, SelectionPipeline, Settings, Theme,
};

struct Harness {
	surface: Rc<MockSurface>,
	detection: Rc<MockDetectionService>,
	translation: Rc<MockTranslationService>,
	pipeline: Rc<SelectionPipeline>,
}

fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_max_level(tracing::Level::DEBUG)
		.with_test_writer()
		.try_init();
}

fn harness(detected: &str) -> Harness {
	init_tracing();
	let surface = Rc::new(MockSurface::new());
	let detection = Rc::new(MockDetectionService::detecting(detected));
	let translation = Rc::new(MockTranslationService::new());
	let pipeline = Rc::new(SelectionPipeline::new(
		PipelineConfig::default(),
		surface.clone(),
		detection.clone(),
		translation.clone(),
	));
	Harness {
		surface,
		detection,
		translation,
		pipeline,
	}
}

fn settings(target: &str) -> Settings {
	Settings {
		target_language: target.to_string(),
		capability_available: true,
		..Default::default()
	}
}

fn selection_rect() -> Rect {
	Rect::new(100.0, 40.0, 120.0, 20.0)
}

#[tokio::test]
async fn spanish_selection_renders_english_overlay() {
	let h = harness("es");
	h.surface.select("Hola mundo", selection_rect());
	h.surface.set_scroll(10.0, 250.0);

	let outcome = h.pipeline.on_pointer_up(&settings("en")).await;

	let Outcome::Rendered(overlay) = outcome else {
		panic!("expected overlay, got {outcome:?}");
	};
	assert_eq!(overlay.text, "[en] Hola mundo");
	assert_eq!(overlay.left, 100.0 + 10.0 - 8.0);
	assert_eq!(overlay.top, 60.0 + 250.0 + 6.0);
	assert_eq!(overlay.width, 136.0);
	assert_eq!(overlay.theme, Theme::Dark);

	assert_eq!(
		h.translation.events(),
		vec![SessionEvent::Created(LanguagePair::new("es", "en"))]
	);
	assert_eq!(h.translation.translated_chunks(), vec!["Hola mundo"]);
	assert_eq!(h.surface.attached(), vec![overlay]);
}

#[tokio::test]
async fn whitespace_selection_does_nothing() {
	let h = harness("es");
	h.surface.select("  \n\t ", selection_rect());

	let outcome = h.pipeline.on_pointer_up(&settings("en")).await;

	assert_eq!(outcome, Outcome::EmptySelection);
	assert!(h.detection.detect_calls().is_empty());
	assert_eq!(h.translation.sessions_created(), 0);
	assert!(h.surface.attached().is_empty());
}

#[tokio::test]
async fn missing_selection_object_does_nothing() {
	let h = harness("es");
	h.surface.clear_selection();

	assert_eq!(
		h.pipeline.on_pointer_up(&settings("en")).await,
		Outcome::NoSelection
	);
	assert_eq!(h.detection.detectors_created(), 0);
}

#[tokio::test]
async fn disabled_auto_translate_skips_all_calls() {
	let h = harness("es");
	h.surface.select("Hola mundo", selection_rect());
	let settings = Settings {
		translate_on_drag: false,
		..settings("en")
	};

	assert_eq!(h.pipeline.on_pointer_up(&settings).await, Outcome::Disabled);
	assert_eq!(h.detection.detectors_created(), 0);
	assert!(h.detection.detect_calls().is_empty());
	assert_eq!(h.translation.sessions_created(), 0);
	assert!(h.surface.attached().is_empty());
}

#[tokio::test]
async fn missing_capabilities_disable_pipeline() {
	let h = harness("es");
	h.surface.select("Hola mundo", selection_rect());
	let settings = Settings {
		capability_available: false,
		..settings("en")
	};

	assert_eq!(h.pipeline.on_pointer_up(&settings).await, Outcome::Disabled);
	assert!(h.detection.detect_calls().is_empty());
}

#[tokio::test]
async fn same_language_creates_no_session() {
	let h = harness("en");
	h.surface.select("Hello world", selection_rect());

	let outcome = h.pipeline.on_pointer_up(&settings("en")).await;

	assert_eq!(
		outcome,
		Outcome::SameLanguage {
			language: "en".into()
		}
	);
	assert_eq!(h.translation.sessions_created(), 0);
	assert!(h.surface.attached().is_empty());
}

#[tokio::test]
async fn trimmed_text_is_detected_and_translated() {
	let h = harness("fr");
	h.surface.select("  Bonjour\nle monde  ", selection_rect());

	let outcome = h.pipeline.on_pointer_up(&settings("en")).await;

	assert!(matches!(outcome, Outcome::Rendered(_)));
	assert_eq!(h.detection.detect_calls(), vec!["Bonjour\nle monde"]);
	assert_eq!(h.translation.translated_chunks(), vec!["Bonjour", "le monde"]);
	assert_eq!(
		h.surface.attached()[0].text,
		"[en] Bonjour\n[en] le monde"
	);
}

#[tokio::test]
async fn pointer_down_clears_overlay_idempotently() {
	let h = harness("es");
	h.surface.select("Hola", selection_rect());
	h.pipeline.on_pointer_up(&settings("en")).await;
	assert_eq!(h.surface.attached().len(), 1);

	h.pipeline.on_pointer_down();
	assert!(h.surface.attached().is_empty());

	h.pipeline.on_pointer_down();
	assert!(h.surface.attached().is_empty());
}

#[tokio::test]
async fn new_selection_replaces_overlay_and_session() {
	let h = harness("es");
	let settings = settings("en");

	h.surface.select("Hola", selection_rect());
	h.pipeline.on_pointer_up(&settings).await;
	h.surface.select("Adiós", selection_rect());
	h.pipeline.on_pointer_up(&settings).await;

	let attached = h.surface.attached();
	assert_eq!(attached.len(), 1);
	assert_eq!(attached[0].text, "[en] Adiós");
	assert_eq!(
		h.translation.events(),
		vec![
			SessionEvent::Created(LanguagePair::new("es", "en")),
			SessionEvent::Destroyed(LanguagePair::new("es", "en")),
			SessionEvent::Created(LanguagePair::new("es", "en")),
		]
	);
	assert_eq!(h.translation.max_live_sessions(), 1);
	assert_eq!(h.detection.detectors_created(), 1);
}

#[tokio::test]
async fn empty_detection_aborts_quietly() {
	let h = harness("es");
	h.detection.set_results(vec![Detection::new("und", 0.8)]);
	h.surface.select("?!", selection_rect());

	assert_eq!(h.pipeline.on_pointer_up(&settings("en")).await, Outcome::Aborted);
	assert_eq!(h.translation.sessions_created(), 0);
}

#[tokio::test]
async fn detector_creation_failure_is_retried_next_time() {
	let h = harness("es");
	h.surface.select("Hola", selection_rect());
	h.detection.fail_create(true);

	assert_eq!(h.pipeline.on_pointer_up(&settings("en")).await, Outcome::Aborted);

	h.detection.fail_create(false);
	assert!(matches!(
		h.pipeline.on_pointer_up(&settings("en")).await,
		Outcome::Rendered(_)
	));
	assert_eq!(h.detection.detectors_created(), 1);
}

#[tokio::test]
async fn rejected_pair_aborts_without_overlay() {
	let h = harness("tlh");
	h.translation.reject_pair(LanguagePair::new("tlh", "en"));
	h.surface.select("nuqneH", selection_rect());

	assert_eq!(h.pipeline.on_pointer_up(&settings("en")).await, Outcome::Aborted);
	assert!(h.surface.attached().is_empty());
	assert!(!h.pipeline.translator().is_active());
}

#[tokio::test]
async fn chunk_failure_aborts_without_overlay() {
	let h = harness("es");
	h.translation.fail_chunk("dos");
	h.surface.select("uno\ndos", selection_rect());

	assert_eq!(h.pipeline.on_pointer_up(&settings("en")).await, Outcome::Aborted);
	assert!(h.surface.inserted().is_empty());
}

#[tokio::test]
async fn collapsed_range_aborts_without_overlay() {
	let h = harness("es");
	h.surface.select("Hola", selection_rect());
	h.surface.drop_range();

	assert_eq!(h.pipeline.on_pointer_up(&settings("en")).await, Outcome::Aborted);
	assert!(h.surface.inserted().is_empty());
}

#[tokio::test]
async fn insert_failure_aborts_quietly() {
	let h = harness("es");
	h.surface.select("Hola", selection_rect());
	h.surface.fail_insert(true);

	assert_eq!(h.pipeline.on_pointer_up(&settings("en")).await, Outcome::Aborted);
	assert!(h.surface.attached().is_empty());
}

#[tokio::test]
async fn light_theme_follows_settings() {
	let h = harness("de");
	h.surface.select("Guten Tag", selection_rect());
	let settings = Settings {
		dark_mode: false,
		..settings("en")
	};

	let Outcome::Rendered(overlay) = h.pipeline.on_pointer_up(&settings).await else {
		panic!("expected overlay");
	};
	assert_eq!(overlay.theme, Theme::Light);
}

#[tokio::test]
async fn geometry_is_measured_after_translation() {
	let h = harness("es");
	h.surface.select("Hola", selection_rect());
	h.translation.block_next_translation();

	let local = tokio::task::LocalSet::new();
	let pipeline = h.pipeline.clone();
	let outcome = local
		.run_until(async {
			let run = tokio::task::spawn_local(async move {
				pipeline.on_pointer_up(&settings("en")).await
			});
			while h.translation.blocked_calls() == 0 {
				tokio::task::yield_now().await;
			}
			h.surface.move_selection(Rect::new(300.0, 500.0, 40.0, 10.0));
			h.translation.release_blocked();
			run.await.unwrap()
		})
		.await;

	let Outcome::Rendered(overlay) = outcome else {
		panic!("expected overlay, got {outcome:?}");
	};
	assert_eq!(overlay.left, 292.0);
	assert_eq!(overlay.top, 516.0);
}

#[tokio::test]
async fn late_result_never_overwrites_newer_overlay() {
	let h = harness("es");
	h.surface.select("Hola", selection_rect());
	h.translation.block_next_translation();

	let local = tokio::task::LocalSet::new();
	let (first, second) = local
		.run_until(async {
			let first = tokio::task::spawn_local({
				let pipeline = h.pipeline.clone();
				async move { pipeline.on_pointer_up(&settings("en")).await }
			});
			while h.translation.blocked_calls() == 0 {
				tokio::task::yield_now().await;
			}

			h.surface.select("Buenas noches", selection_rect());
			let second = h.pipeline.on_pointer_up(&settings("en")).await;

			h.translation.release_blocked();
			(first.await.unwrap(), second)
		})
		.await;

	// The newer run destroyed the session the first was waiting on.
	assert_eq!(first, Outcome::Aborted);
	assert!(matches!(second, Outcome::Rendered(_)));

	let inserted = h.surface.inserted();
	assert_eq!(inserted.len(), 1);
	assert_eq!(inserted[0].text, "[en] Buenas noches");
	assert_eq!(h.surface.attached(), inserted);
	assert_eq!(h.translation.max_live_sessions(), 1);
}

#[tokio::test]
async fn hung_translation_does_not_stall_later_selections() {
	let h = harness("es");
	h.surface.select("Hola", selection_rect());
	h.translation.block_next_translation();

	let local = tokio::task::LocalSet::new();
	let (second, first_finished) = local
		.run_until(async {
			let first = tokio::task::spawn_local({
				let pipeline = h.pipeline.clone();
				async move { pipeline.on_pointer_up(&settings("en")).await }
			});
			while h.translation.blocked_calls() == 0 {
				tokio::task::yield_now().await;
			}

			// The first call is never released.
			h.surface.select("Buenos dias", selection_rect());
			let second = h.pipeline.on_pointer_up(&settings("en")).await;
			h.pipeline.shutdown().await.unwrap();
			(second, first.is_finished())
		})
		.await;

	let Outcome::Rendered(overlay) = second else {
		panic!("expected overlay, got {second:?}");
	};
	assert_eq!(overlay.text, "[en] Buenos dias");
	assert!(!first_finished);
	assert_eq!(
		h.translation.events(),
		vec![
			SessionEvent::Created(LanguagePair::new("es", "en")),
			SessionEvent::Destroyed(LanguagePair::new("es", "en")),
			SessionEvent::Created(LanguagePair::new("es", "en")),
			SessionEvent::Destroyed(LanguagePair::new("es", "en")),
		]
	);
	assert_eq!(h.translation.live_sessions(), 0);
}

#[tokio::test]
async fn hung_detector_creation_does_not_stall_later_selections() {
	let h = harness("es");
	h.surface.select("Hola", selection_rect());
	h.detection.hang_next_creation();

	let local = tokio::task::LocalSet::new();
	let second = local
		.run_until(async {
			let _first = tokio::task::spawn_local({
				let pipeline = h.pipeline.clone();
				async move { pipeline.on_pointer_up(&settings("en")).await }
			});
			while h.detection.hung_creations() == 0 {
				tokio::task::yield_now().await;
			}

			h.pipeline.on_pointer_up(&settings("en")).await
		})
		.await;

	assert!(matches!(second, Outcome::Rendered(_)));
	assert_eq!(h.detection.detectors_created(), 1);
	assert_eq!(h.translation.sessions_created(), 1);
}

#[tokio::test]
async fn pointer_down_during_translation_discards_result() {
	let h = harness("es");
	h.surface.select("Hola", selection_rect());
	h.translation.block_next_translation();

	let local = tokio::task::LocalSet::new();
	let outcome = local
		.run_until(async {
			let run = tokio::task::spawn_local({
				let pipeline = h.pipeline.clone();
				async move { pipeline.on_pointer_up(&settings("en")).await }
			});
			while h.translation.blocked_calls() == 0 {
				tokio::task::yield_now().await;
			}
			h.pipeline.on_pointer_down();
			h.translation.release_blocked();
			run.await.unwrap()
		})
		.await;

	assert_eq!(outcome, Outcome::Superseded);
	assert!(h.surface.attached().is_empty());
}

#[tokio::test]
async fn shutdown_releases_session() {
	let h = harness("es");
	h.surface.select("Hola", selection_rect());
	h.pipeline.on_pointer_up(&settings("en")).await;
	assert_eq!(h.translation.live_sessions(), 1);

	h.pipeline.shutdown().await.unwrap();

	assert_eq!(h.translation.live_sessions(), 0);
	assert!(h.surface.attached().is_empty());
}

#[tokio::test]
async fn stale_overlay_is_removed_before_processing() {
	let h = harness("es");
	h.surface.attach(dragg::build_overlay(
		&PipelineConfig::default().overlay_id,
		&selection_rect(),
		Default::default(),
		"old",
		Theme::Dark,
	));
	h.surface.clear_selection();

	assert_eq!(
		h.pipeline.on_pointer_up(&settings("en")).await,
		Outcome::NoSelection
	);
	assert!(h.surface.attached().is_empty());
	assert_eq!(h.surface.removals(), 1);
}

#[tokio::test]
async fn detect_failure_aborts_quietly() {
	let h = harness("es");
	h.detection.fail_detect(true);
	h.surface.select("Hola", selection_rect());

	assert_eq!(h.pipeline.on_pointer_up(&settings("en")).await, Outcome::Aborted);
	assert_eq!(h.detection.detect_calls(), vec!["Hola"]);
	assert_eq!(h.translation.sessions_created(), 0);
}

#[tokio::test]
async fn rendered_overlay_removes_twice_before_insert() {
	init_tracing();
	let surface = Rc::new(MockSurface::with_selection("Hola", selection_rect()));
	let pipeline = SelectionPipeline::new(
		PipelineConfig::default(),
		surface.clone(),
		Rc::new(MockDetectionService::detecting("es")),
		Rc::new(MockTranslationService::new()),
	);

	assert!(matches!(
		pipeline.on_pointer_up(&settings("en")).await,
		Outcome::Rendered(_)
	));
	assert_eq!(surface.removals(), 2);
	assert_eq!(surface.attached().len(), 1);
}
