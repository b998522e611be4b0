use std::sync::Arc;

use proptest::prelude::*;
use screenrec_capture_engine::backend::FakeBackend;
use screenrec_capture_engine::engine::{FailPoint, FakeEngine};
use screenrec_capture_engine::pipeline::PipelineBuilder;
use screenrec_capture_engine::{
    EngineLifecycle, SessionConfig, SessionController, SessionErrorKind, SessionState,
};
use screenrec_common::config::EncodingDefaults;

fn controller(engine: &Arc<FakeEngine>) -> (EngineLifecycle, SessionController) {
    let mut lifecycle = EngineLifecycle::new(engine.clone());
    lifecycle.init().expect("engine should start");
    let controller = SessionController::new(PipelineBuilder::new(
        engine.clone(),
        Arc::new(FakeBackend::single_display()),
        EncodingDefaults::default(),
    ));
    (lifecycle, controller)
}

fn expected_kind(point: FailPoint) -> SessionErrorKind {
    match point {
        FailPoint::VideoReset => SessionErrorKind::VideoResetFailed,
        FailPoint::AudioReset => SessionErrorKind::AudioResetFailed,
        FailPoint::SourceCreate => SessionErrorKind::SourceCreateFailed,
        FailPoint::VideoEncoder => SessionErrorKind::VideoEncoderFailed,
        FailPoint::AudioEncoder => SessionErrorKind::AudioEncoderFailed,
        FailPoint::OutputCreate => SessionErrorKind::OutputCreateFailed,
        FailPoint::OutputStart => SessionErrorKind::OutputStartFailed,
        other => panic!("{other:?} is not a construction step"),
    }
}

#[test]
fn every_construction_failure_rolls_back_and_recovers() {
    for point in FailPoint::PIPELINE {
        let engine = Arc::new(FakeEngine::new());
        let (lifecycle, mut controller) = controller(&engine);
        let dir = tempfile::tempdir().expect("tempdir should be creatable");
        let config = SessionConfig::new(dir.path().join("out.mp4"));

        engine.inject_failure(point);
        let err = controller.start(&lifecycle, &config).unwrap_err();

        assert_eq!(err.kind(), expected_kind(point), "failure at {point:?}");
        assert_eq!(controller.state(), SessionState::Idle, "state after {point:?}");
        assert_eq!(engine.live_objects(), 0, "objects leaked after {point:?}");
        assert_eq!(engine.running_outputs(), 0);
        assert_eq!(engine.channel_source(0), None, "channel left bound after {point:?}");
        assert_eq!(engine.double_releases(), 0);

        controller
            .start(&lifecycle, &config)
            .unwrap_or_else(|e| panic!("retry after {point:?} should succeed: {e}"));
        assert_eq!(controller.state(), SessionState::Recording);
        controller.stop();
        assert_eq!(engine.live_objects(), 0);
    }
}

#[test]
fn failure_reason_carries_engine_diagnostic() {
    let engine = Arc::new(FakeEngine::new());
    let (lifecycle, mut controller) = controller(&engine);
    let dir = tempfile::tempdir().expect("tempdir should be creatable");
    engine.inject_failure(FailPoint::OutputCreate);

    let err = controller
        .start(&lifecycle, &SessionConfig::new(dir.path().join("out.mp4")))
        .unwrap_err();
    assert!(err.to_string().contains("injected failure"));
}

#[test]
fn unwritable_output_fails_at_start() {
    let engine = Arc::new(FakeEngine::new());
    let (lifecycle, mut controller) = controller(&engine);
    let dir = tempfile::tempdir().expect("tempdir should be creatable");
    let config = SessionConfig::new(dir.path().join("missing").join("out.mp4"));

    let err = controller.start(&lifecycle, &config).unwrap_err();
    assert_eq!(err.kind(), SessionErrorKind::OutputStartFailed);
    assert_eq!(engine.live_objects(), 0);
}

proptest! {
    #[test]
    fn zero_dimensions_never_reach_the_engine(
        width in 0u32..4,
        height in 0u32..4,
        fps in 0u32..3,
    ) {
        prop_assume!(width == 0 || height == 0 || fps == 0);
        let engine = Arc::new(FakeEngine::new());
        let (lifecycle, mut controller) = controller(&engine);
        engine.clear_calls();
        let config = SessionConfig {
            width,
            height,
            fps,
            ..SessionConfig::new("/tmp/screenrec-never.mp4")
        };

        let err = controller.start(&lifecycle, &config).unwrap_err();
        prop_assert_eq!(err.kind(), SessionErrorKind::InvalidConfig);
        prop_assert!(engine.calls().is_empty());
        prop_assert_eq!(controller.state(), SessionState::Idle);
    }
}
