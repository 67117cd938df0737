use std::time::{Duration, Instant};

use detect_server::{
    context::DetectContext, controls::ControlPanel, filter::filter_detections, labels::LabelMap,
    nn::RawDetection,
};

fn test_context() -> DetectContext {
    DetectContext::new(
        LabelMap::from_names(["cola", "chips", "soap"]),
        ControlPanel::new(),
    )
}

fn detection(class_id: i64, score: f32) -> RawDetection {
    RawDetection::new([0.2, 0.2, 0.6, 0.6], class_id, score)
}

/// Run one frame's raw detections through filtering and presence tracking.
fn process_frame(ctx: &DetectContext, raw: &[RawDetection], now: Instant) {
    let filtered = filter_detections(raw, &ctx.labels, 1280, 720);
    ctx.observe_detections(&filtered, now);
}

#[test]
fn eleven_frames_confirm_a_class() {
    let ctx = test_context();
    let start = Instant::now();

    for frame in 0..11u64 {
        let at = start + Duration::from_millis(frame * 45);
        process_frame(&ctx, &[detection(1, 0.9)], at);
    }

    let diff = ctx
        .reconcile(start + Duration::from_millis(500))
        .expect("reconcile pass");

    assert_eq!(diff.to_add, vec!["cola".to_string()]);
    assert_eq!(ctx.control_names(), vec!["cola".to_string()]);
}

#[test]
fn ten_frames_are_not_enough() {
    let ctx = test_context();
    let start = Instant::now();

    for frame in 0..10u64 {
        let at = start + Duration::from_millis(frame * 45);
        process_frame(&ctx, &[detection(1, 0.9)], at);
    }

    let diff = ctx
        .reconcile(start + Duration::from_millis(460))
        .expect("reconcile pass");

    assert!(diff.is_empty());
    assert!(ctx.control_names().is_empty());
    assert_eq!(ctx.presence_count("cola"), Some(10));
}

#[test]
fn two_instances_per_frame_confirm_twice_as_fast() {
    let ctx = test_context();
    let start = Instant::now();

    for frame in 0..6u64 {
        let at = start + Duration::from_millis(frame * 45);
        process_frame(&ctx, &[detection(1, 0.9), detection(1, 0.8)], at);
    }

    assert_eq!(ctx.presence_count("cola"), Some(12));

    let diff = ctx
        .reconcile(start + Duration::from_millis(300))
        .expect("reconcile pass");
    assert_eq!(diff.to_add, vec!["cola".to_string()]);
}

#[test]
fn weak_detections_never_reach_presence() {
    let ctx = test_context();
    let start = Instant::now();

    for frame in 0..20u64 {
        let at = start + Duration::from_millis(frame * 45);
        process_frame(&ctx, &[detection(1, 0.3)], at);
    }

    let diff = ctx
        .reconcile(start + Duration::from_millis(950))
        .expect("reconcile pass");

    assert!(diff.is_empty());
    assert_eq!(ctx.presence_count("cola"), None);
}

#[test]
fn background_class_is_never_tracked() {
    let ctx = test_context();
    let start = Instant::now();

    for frame in 0..20u64 {
        let at = start + Duration::from_millis(frame * 45);
        process_frame(&ctx, &[detection(0, 0.99)], at);
    }

    let diff = ctx
        .reconcile(start + Duration::from_millis(950))
        .expect("reconcile pass");

    assert!(diff.is_empty());
    assert!(ctx.control_names().is_empty());
}

#[test]
fn mixed_frame_only_tracks_resolvable_survivors() {
    let ctx = test_context();
    let start = Instant::now();

    let raw = [
        detection(1, 0.9),
        detection(42, 0.95),
        detection(2, 0.2),
        detection(3, 0.5),
    ];
    process_frame(&ctx, &raw, start);

    assert_eq!(ctx.presence_count("cola"), Some(1));
    assert_eq!(ctx.presence_count("soap"), Some(1));
    assert_eq!(ctx.presence_count("chips"), None);
}

#[test]
fn silence_expires_the_control() {
    let ctx = test_context();
    let start = Instant::now();

    for frame in 0..11u64 {
        let at = start + Duration::from_millis(frame * 45);
        process_frame(&ctx, &[detection(1, 0.9)], at);
    }
    ctx.reconcile(start + Duration::from_millis(500))
        .expect("reconcile pass");
    assert_eq!(ctx.control_names(), vec!["cola".to_string()]);

    // Last sighting was at 450ms; over a second of silence follows.
    let diff = ctx
        .reconcile(start + Duration::from_millis(1651))
        .expect("reconcile pass");

    assert_eq!(diff.to_remove, vec!["cola".to_string()]);
    assert!(ctx.control_names().is_empty());
    assert_eq!(ctx.presence_count("cola"), None);
}

#[test]
fn reappearance_after_expiry_starts_from_scratch() {
    let ctx = test_context();
    let start = Instant::now();

    for frame in 0..11u64 {
        let at = start + Duration::from_millis(frame * 45);
        process_frame(&ctx, &[detection(1, 0.9)], at);
    }
    ctx.reconcile(start + Duration::from_millis(500))
        .expect("reconcile pass");
    ctx.reconcile(start + Duration::from_millis(1651))
        .expect("reconcile pass");

    process_frame(&ctx, &[detection(1, 0.9)], start + Duration::from_millis(1700));
    let diff = ctx
        .reconcile(start + Duration::from_millis(1716))
        .expect("reconcile pass");

    assert!(diff.is_empty());
    assert!(ctx.control_names().is_empty());
    assert_eq!(ctx.presence_count("cola"), Some(1));
}

#[test]
fn controls_append_in_first_seen_order() {
    let ctx = test_context();
    let start = Instant::now();

    for frame in 0..11u64 {
        let at = start + Duration::from_millis(frame * 45);
        process_frame(&ctx, &[detection(3, 0.9), detection(1, 0.9)], at);
    }

    let diff = ctx
        .reconcile(start + Duration::from_millis(500))
        .expect("reconcile pass");

    assert_eq!(diff.to_add, vec!["soap".to_string(), "cola".to_string()]);
    assert_eq!(
        ctx.control_names(),
        vec!["soap".to_string(), "cola".to_string()]
    );
}
