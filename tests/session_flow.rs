//! Button-driven session flow with fake camera, speech and connectivity.

mod helpers;

use helpers::{
    blank_png, exclusive, FakeCamera, FakeLocal, FakeProbe, FakeRemote, FixedPicker,
    RecordingSpeech,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tts_ocr_lib::capture::CaptureController;
use tts_ocr_lib::ocr::{ModeFlag, OcrCoordinator, OcrMode, CAPTURE_FAILED, NOT_YET_CAPTURED};
use tts_ocr_lib::session::{
    Flow, Session, SessionCommand, CAPTURING, EXITING, INTRO, NOTHING_TO_REPEAT, REPEATING,
};
use tts_ocr_lib::speech::Announcer;

struct Rig {
    session: Session,
    speech: Arc<RecordingSpeech>,
    capture: CaptureController,
    camera: Arc<FakeCamera>,
    probe: Arc<FakeProbe>,
}

fn rig(camera: Arc<FakeCamera>, online: bool) -> Rig {
    let speech = RecordingSpeech::new(Duration::from_millis(1));
    let probe = FakeProbe::new(online);
    let coordinator = OcrCoordinator::new(
        FakeLocal::new("EMERGENCY EXIT"),
        FakeRemote::ok("Open 9am-5pm", &[("Store sign", 0.91), ("Signage", 0.77)]),
        ModeFlag::new(OcrMode::Local),
    )
    .unwrap();
    let capture = CaptureController::new(camera.clone(), coordinator.clone());
    let session = Session::new(coordinator, capture.clone(), speech.clone(), probe.clone())
        .with_announcer(Announcer::with_picker(speech.clone(), FixedPicker(0)));
    Rig {
        session,
        speech,
        capture,
        camera,
        probe,
    }
}

#[tokio::test]
async fn start_speaks_intro_and_picks_mode() {
    let _guard = exclusive();
    let mut rig = rig(FakeCamera::with_still(blank_png()), true);

    rig.session.start().await;
    rig.session.wait_for_speech().await;

    assert_eq!(rig.session.mode(), OcrMode::Remote);
    assert_eq!(rig.session.captured_text(), NOT_YET_CAPTURED);
    assert_eq!(rig.speech.spoken(), vec![INTRO]);
}

#[tokio::test]
async fn repeat_before_any_capture() {
    let _guard = exclusive();
    let mut rig = rig(FakeCamera::with_still(blank_png()), false);

    assert_eq!(rig.session.handle(SessionCommand::Repeat).await, Flow::Continue);
    rig.session.wait_for_speech().await;
    assert_eq!(rig.speech.spoken(), vec![NOTHING_TO_REPEAT]);
}

#[tokio::test]
async fn remote_capture_announces_labels_then_text() {
    let _guard = exclusive();
    let mut rig = rig(FakeCamera::with_still(blank_png()), true);
    rig.session.start().await;
    rig.session.wait_for_speech().await;

    rig.session.handle(SessionCommand::Capture).await;
    rig.session.wait_for_speech().await;

    assert_eq!(rig.session.captured_text(), "Open 9am-5pm");
    assert_eq!(rig.session.last_labels(), ["Store sign", "Signage"]);
    assert_eq!(
        rig.speech.spoken(),
        vec![
            INTRO,
            CAPTURING,
            "This might be Store sign or Signage.",
            "Detected text: Open 9am-5pm.",
        ]
    );
}

#[tokio::test]
async fn repeat_after_capture_speaks_text_again() {
    let _guard = exclusive();
    let mut rig = rig(FakeCamera::with_still(blank_png()), false);
    rig.session.start().await;
    rig.session.wait_for_speech().await;

    rig.session.handle(SessionCommand::Capture).await;
    rig.session.wait_for_speech().await;
    rig.session.handle(SessionCommand::Repeat).await;
    rig.session.wait_for_speech().await;

    let spoken = rig.speech.spoken();
    assert_eq!(
        &spoken[spoken.len() - 2..],
        [REPEATING, "EMERGENCY EXIT"]
    );
    assert!(rig.session.last_labels().is_empty());
}

#[tokio::test]
async fn broken_camera_reports_capture_failure() {
    let _guard = exclusive();
    let mut rig = rig(FakeCamera::broken(), false);
    rig.session.start().await;
    rig.session.wait_for_speech().await;

    rig.session.handle(SessionCommand::Capture).await;
    rig.session.wait_for_speech().await;

    assert_eq!(rig.session.captured_text(), CAPTURE_FAILED);
    assert_eq!(
        rig.speech.spoken().last().map(String::as_str),
        Some("Detected text: Capture failed. Please try again.")
    );
}

#[tokio::test]
async fn connectivity_change_is_announced_before_capture() {
    let _guard = exclusive();
    let mut rig = rig(FakeCamera::with_still(blank_png()), false);
    rig.session.start().await;
    rig.session.wait_for_speech().await;
    assert_eq!(rig.session.mode(), OcrMode::Local);

    rig.probe.set(true);
    rig.session.handle(SessionCommand::Capture).await;
    rig.session.wait_for_speech().await;

    let spoken = rig.speech.spoken();
    assert_eq!(spoken[1], "Switched to Google Cloud Vision OCR");
    assert_eq!(spoken[2], CAPTURING);
    assert_eq!(rig.session.mode(), OcrMode::Remote);
}

#[tokio::test]
async fn stop_speaking_cuts_off_announcement() {
    let _guard = exclusive();
    let speech = RecordingSpeech::new(Duration::from_millis(300));
    let probe = FakeProbe::new(true);
    let coordinator = OcrCoordinator::new(
        FakeLocal::new("unused"),
        FakeRemote::ok("Open 9am-5pm", &[("Store sign", 0.91)]),
        ModeFlag::new(OcrMode::Remote),
    )
    .unwrap();
    let capture = CaptureController::new(FakeCamera::with_still(blank_png()), coordinator.clone());
    let mut session = Session::new(coordinator, capture, speech.clone(), probe)
        .with_announcer(Announcer::with_picker(speech.clone(), FixedPicker(0)));

    session.handle(SessionCommand::Capture).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.handle(SessionCommand::StopSpeaking).await;
    session.wait_for_speech().await;

    assert_eq!(speech.stop_count(), 1);
    assert!(!speech
        .spoken()
        .iter()
        .any(|line| line.starts_with("Detected text")));
}

#[tokio::test]
async fn exit_is_idempotent_and_releases_camera() {
    let _guard = exclusive();
    let mut rig = rig(FakeCamera::with_still(blank_png()), false);

    assert_eq!(rig.session.handle(SessionCommand::Exit).await, Flow::Exit);
    assert_eq!(rig.session.handle(SessionCommand::Exit).await, Flow::Exit);
    assert_eq!(rig.session.handle(SessionCommand::Capture).await, Flow::Exit);

    assert!(rig.capture.is_shut_down());
    assert!(rig.camera.released.load(Ordering::SeqCst));
    assert_eq!(rig.speech.spoken(), vec![EXITING]);
}

#[tokio::test]
async fn take_photo_after_shutdown_still_calls_back() {
    let _guard = exclusive();
    let rig = rig(FakeCamera::with_still(blank_png()), false);
    rig.capture.shutdown();

    let (tx, rx) = tokio::sync::oneshot::channel();
    rig.capture
        .take_photo(move |result| {
            let _ = tx.send(result);
        })
        .await
        .unwrap();

    let result = rx.await.unwrap();
    assert_eq!(result.text, CAPTURE_FAILED);
    assert!(result.labels.is_empty());
}

#[tokio::test]
async fn take_photo_delivers_recognition() {
    let _guard = exclusive();
    let rig = rig(FakeCamera::with_still(blank_png()), false);

    let (tx, rx) = tokio::sync::oneshot::channel();
    let _handle = rig.capture.take_photo(move |result| {
        let _ = tx.send(result);
    });

    assert_eq!(rx.await.unwrap().text, "EMERGENCY EXIT");
    assert!(!rig.capture.is_shut_down());
}
