//! Stage controller behavior against a real version namespace on disk.

mod common;

use std::sync::atomic::Ordering;

use assert_matches::assert_matches;
use autoreel::pipeline::{
    ControllerSettings, NamespaceInventory, RunReport, StageController, StageReport,
};
use autoreel::publish::PublishState;
use autoreel::versions::VersionNamespace;
use autoreel_common::{Error, Scene, StageKind, StageStatus, Topic, Version};
use common::{entry, Harness};
use tokio_util::sync::CancellationToken;

fn topic() -> Topic {
    Topic::manual("Solid-state batteries ship", "First cars arrive next year")
}

fn namespace(h: &Harness) -> VersionNamespace {
    let ns = VersionNamespace::new(&h.dir.path().join("data"), Version::initial());
    ns.ensure_dirs().unwrap();
    ns
}

fn controller(h: &Harness) -> StageController {
    StageController::new(h.collaborators(), ControllerSettings::default())
}

#[tokio::test]
async fn fresh_run_produces_every_stage() {
    let h = Harness::new(3);
    let ns = namespace(&h);

    let report = controller(&h).run(&ns, &topic()).await.unwrap();

    assert_eq!(report.scene_count, 3);
    assert_eq!(report.assembled, vec![1, 2, 3]);
    assert!(report.skipped.is_empty());
    assert!(report.warnings.is_empty());
    assert_eq!(*h.assembler.received.lock(), vec![vec![1, 2, 3]]);
    assert_eq!(h.publisher.count(), 1);
    assert_eq!(
        h.publisher.published.lock()[0].1.title,
        "Solid-state batteries ship explained"
    );
    assert!(ns.read_receipt().is_some());

    let stages = StageReport::from_inventory(&NamespaceInventory::scan(&ns));
    for stage in StageKind::ALL {
        assert_eq!(stages.status(stage), StageStatus::Complete, "{stage}");
    }
}

#[tokio::test]
async fn partial_images_regenerate_only_missing_index() {
    let h = Harness::new(3);
    let ns = namespace(&h);
    ns.write_scenes(&Scene::from_entries(vec![entry("a"), entry("b"), entry("c")]))
        .unwrap();
    std::fs::write(ns.image_path(1), b"original image 1").unwrap();
    std::fs::write(ns.image_path(3), b"original image 3").unwrap();
    for i in 1..=3 {
        std::fs::write(ns.audio_path(i), format!("original audio {i}")).unwrap();
    }

    let report = controller(&h).run(&ns, &topic()).await.unwrap();

    assert_eq!(h.script.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.images.generated(), vec![2]);
    assert!(h.narrator.generated().is_empty());
    assert_eq!(std::fs::read(ns.image_path(1)).unwrap(), b"original image 1");
    assert_eq!(std::fs::read(ns.image_path(3)).unwrap(), b"original image 3");
    assert_eq!(std::fs::read(ns.audio_path(2)).unwrap(), b"original audio 2");
    assert_eq!(report.skipped, vec![StageKind::Script, StageKind::Narration]);
    assert_eq!(report.assembled, vec![1, 2, 3]);
}

#[tokio::test]
async fn failed_scene_is_left_out_of_assembly() {
    let h = Harness::new(3);
    h.images.fail_on(2);
    let ns = namespace(&h);

    let report = controller(&h).run(&ns, &topic()).await.unwrap();

    assert_eq!(*h.assembler.received.lock(), vec![vec![1, 3]]);
    assert_eq!(report.assembled, vec![1, 3]);
    assert!(report.warnings.iter().any(|w| w.contains("scene 2")));
    assert_eq!(h.publisher.count(), 1);
}

#[tokio::test]
async fn concurrent_generation_keeps_index_mapping() {
    let h = Harness::new(5);
    h.images.fail_on(3);
    let ns = namespace(&h);
    let settings = ControllerSettings {
        image_concurrency: 3,
        narration_concurrency: 2,
        ..Default::default()
    };

    let report = StageController::new(h.collaborators(), settings)
        .run(&ns, &topic())
        .await
        .unwrap();

    for i in [1, 2, 4, 5] {
        assert_eq!(
            std::fs::read_to_string(ns.image_path(i)).unwrap(),
            format!("image-{i}-1")
        );
    }
    for i in 1..=5 {
        assert_eq!(
            std::fs::read_to_string(ns.audio_path(i)).unwrap(),
            format!("audio-{i}-1")
        );
    }
    assert!(!ns.image_path(3).exists());
    assert_eq!(report.assembled, vec![1, 2, 4, 5]);
    assert_eq!(*h.assembler.received.lock(), vec![vec![1, 2, 4, 5]]);
    assert!(!report.warnings.is_empty());
    assert!(report.warnings.iter().all(|w| w.contains("scene 3")));
}

#[tokio::test]
async fn assembler_dropped_scene_is_reported() {
    let h = Harness::new(3);
    h.assembler.drop_scene(2);
    let ns = namespace(&h);

    let report = controller(&h).run(&ns, &topic()).await.unwrap();

    assert_eq!(*h.assembler.received.lock(), vec![vec![1, 2, 3]]);
    assert_eq!(report.assembled, vec![1, 3]);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("scene 2") && w.contains("dropped")));
}

#[tokio::test]
async fn empty_script_aborts_before_other_stages() {
    let h = Harness::new(0);
    let ns = namespace(&h);

    let err = controller(&h).run(&ns, &topic()).await.unwrap_err();

    assert_matches!(err, Error::StageFailed { stage: StageKind::Script, .. });
    assert!(h.images.generated().is_empty());
    assert!(h.assembler.received.lock().is_empty());
    assert_eq!(h.publisher.count(), 0);
    assert!(ns.load_scenes().is_none());
}

#[tokio::test]
async fn no_complete_scene_fails_assembly() {
    let h = Harness::new(2);
    h.images.fail_on(1);
    h.images.fail_on(2);
    let ns = namespace(&h);

    let err = controller(&h).run(&ns, &topic()).await.unwrap_err();

    assert_matches!(err, Error::StageFailed { stage: StageKind::Assembly, .. });
    assert_eq!(err.stage(), Some(StageKind::Assembly));
    assert!(h.assembler.received.lock().is_empty());
    assert_eq!(h.publisher.count(), 0);
}

#[tokio::test]
async fn publish_failure_keeps_outputs_for_retry() {
    let h = Harness::new(2);
    h.publisher.set_failing(true);
    let ns = namespace(&h);

    let mut report = RunReport::default();
    let err = controller(&h)
        .run_into(&ns, &topic(), &mut report)
        .await
        .unwrap_err();
    assert_matches!(err, Error::Automation { .. });
    assert_eq!(err.stage(), Some(StageKind::Publish));
    assert_eq!(report.assembled, vec![1, 2]);
    let attempt = report.publish.expect("publish attempt is kept");
    assert_eq!(attempt.last_state(), PublishState::Failed);
    assert!(ns.video_path().is_file());
    assert!(ns.read_receipt().is_none());

    h.publisher.set_failing(false);
    let report = controller(&h).run(&ns, &topic()).await.unwrap();
    assert_eq!(
        report.skipped,
        vec![
            StageKind::Script,
            StageKind::Images,
            StageKind::Narration,
            StageKind::Assembly
        ]
    );
    assert_eq!(h.assembler.received.lock().len(), 1);
    assert_eq!(h.publisher.count(), 1);
}

#[tokio::test]
async fn published_version_is_not_uploaded_twice() {
    let h = Harness::new(1);
    let ns = namespace(&h);

    controller(&h).run(&ns, &topic()).await.unwrap();
    let again = controller(&h).run(&ns, &topic()).await.unwrap();

    assert!(again.skipped.contains(&StageKind::Publish));
    assert_eq!(h.publisher.count(), 1);
}

#[tokio::test]
async fn cancelled_run_stops_before_work() {
    let h = Harness::new(2);
    let ns = namespace(&h);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = controller(&h)
        .with_cancellation(cancel)
        .run(&ns, &topic())
        .await
        .unwrap_err();

    assert_matches!(err, Error::Cancelled);
    assert_eq!(h.script.calls.load(Ordering::SeqCst), 0);
}
