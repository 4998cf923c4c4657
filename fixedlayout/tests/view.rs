mod common;

use common::*;

use fixedlayout::data::{Bounds, ObjectId};
use fixedlayout::layout::{ElementConfig, HandleKind};
use fixedlayout::view::{DropEvent, SchedulerState};

use std::sync::Arc;

fn displayed(h: &Harness, index: usize) -> Option<String> {
    h.view
        .elements()
        .get(index)
        .and_then(|p| p.display.as_ref())
        .map(|d| d.value.clone())
}

fn position(log: &[String], entry: &str) -> usize {
    log.iter()
        .position(|l| l == entry)
        .unwrap_or_else(|| panic!("{} not in {:?}", entry, log))
}

#[test]
fn history_is_requested_before_live_subscription_opens() {
    let root = object("root", "folder");
    let sine = object("sine", "telemetry");
    let cosine = object("cosine", "telemetry");
    let notes = object("notes", "folder");

    let composition = Arc::new(MockComposition::default()).with(
        &root,
        vec![sine.clone(), notes.clone(), cosine.clone()],
    );
    let telemetry = Arc::new(MockTelemetry::default());
    let mut h = Harness::new(composition, telemetry, grid10());

    h.view.set_domain_object(&root);
    h.view.pump();

    let log = h.telemetry.log();
    assert!(position(&log, "request:sine") < position(&log, "subscribe:sine"));
    assert!(position(&log, "request:cosine") < position(&log, "subscribe:cosine"));
    assert!(!log.iter().any(|l| l.ends_with("notes")));

    let tracked: Vec<_> = h.view.subscriptions().tracked().iter().map(|o| o.id.key.clone()).collect();
    assert_eq!(tracked, vec!["sine", "cosine"]);
    assert_eq!(h.view.subscriptions().subscription_count(), 2);

    // New objects start blank rather than missing.
    let entry = h.view.display_cache().get(&sine.id).unwrap();
    assert_eq!(entry.name, "sine");
    assert_eq!(entry.value, "");
}

#[test]
fn history_and_live_data_reach_proxies_on_the_next_frame() {
    let root = object("root", "folder");
    let sine = object("sine", "telemetry");
    let composition = Arc::new(MockComposition::default()).with(&root, vec![sine.clone()]);
    let telemetry = Arc::new(MockTelemetry::default())
        .with_history(&sine, vec![point(20, 0.2), point(10, 0.1)]);

    let mut config = grid10();
    config.push(ElementConfig::telemetry(&sine.id, 1, 1, 2, 1));
    let mut h = Harness::new(composition, telemetry, config);

    h.view.set_domain_object(&root);
    h.view.pump();

    assert_eq!(h.view.display_cache().get(&sine.id).unwrap().value, "0.20");
    assert_eq!(h.host.frames(), 1);
    // Proxies only change on the frame; the tracked object was initialised blank.
    assert_eq!(displayed(&h, 0).as_deref(), Some(""));

    assert!(h.view.animation_frame());
    assert_eq!(displayed(&h, 0).as_deref(), Some("0.20"));

    // Only the newest point is kept after a refresh.
    assert_eq!(h.view.subscriptions().buffer(&sine.id).unwrap().len(), 1);

    assert!(h.telemetry.push(&sine, point(30, 0.95)));
    h.view.pump();
    assert!(h.view.animation_frame());
    let proxy = &h.view.elements()[0];
    let display = proxy.display.as_ref().unwrap();
    assert_eq!(display.value, "0.95");
    assert_eq!(display.alarm_class.as_deref(), Some("is-limit-red"));
}

#[test]
fn bursts_of_live_data_coalesce_into_one_frame() {
    let root = object("root", "folder");
    let sine = object("sine", "telemetry");
    let composition = Arc::new(MockComposition::default()).with(&root, vec![sine.clone()]);
    let telemetry = Arc::new(MockTelemetry::default());

    let mut config = grid10();
    config.push(ElementConfig::telemetry(&sine.id, 0, 0, 2, 1));
    let mut h = Harness::new(composition, telemetry, config);
    h.view.set_domain_object(&root);
    h.view.pump();
    let frames_before = h.host.frames();

    for i in 0..25 {
        h.telemetry.push(&sine, point(100 + i, i as f64 / 100.0));
    }
    h.view.pump();

    assert_eq!(h.host.frames(), frames_before + 1);
    assert_eq!(h.view.scheduler().state(), SchedulerState::Pending);
    assert!(h.view.animation_frame());
    assert!(!h.view.animation_frame());
    assert_eq!(h.view.scheduler().frames_run(), 1);
    assert_eq!(displayed(&h, 0).as_deref(), Some("0.24"));
}

#[test]
fn switching_containers_tears_down_before_subscribing() {
    let a = object("a", "folder");
    let b = object("b", "folder");
    let a1 = object("a1", "telemetry");
    let a2 = object("a2", "telemetry");
    let b1 = object("b1", "telemetry");
    let composition = Arc::new(MockComposition::default())
        .with(&a, vec![a1.clone(), a2.clone()])
        .with(&b, vec![b1.clone()]);
    let telemetry = Arc::new(MockTelemetry::default());
    let mut h = Harness::new(composition, telemetry, grid10());

    h.view.set_domain_object(&a);
    h.view.pump();
    h.view.set_domain_object(&b);
    h.view.pump();

    let log = h.telemetry.log();
    let opened_b = position(&log, "subscribe:b1");
    assert!(position(&log, "unsubscribe:a1") < opened_b);
    assert!(position(&log, "unsubscribe:a2") < opened_b);

    let subscribed: Vec<_> = h.view.subscriptions().subscribed_objects().cloned().collect();
    assert_eq!(subscribed, vec![b1.id.clone()]);
    assert!(h.view.subscriptions().buffer(&a1.id).is_none());
    assert!(!h.telemetry.push(&a1, point(5, 0.5)));
}

#[test]
fn composition_change_replays_the_subscription() {
    let root = object("root", "folder");
    let sine = object("sine", "telemetry");
    let cosine = object("cosine", "telemetry");
    let composition = Arc::new(MockComposition::default()).with(&root, vec![sine.clone()]);
    let telemetry = Arc::new(MockTelemetry::default());
    let mut h = Harness::new(composition.clone(), telemetry, grid10());

    h.view.set_domain_object(&root);
    h.view.pump();
    composition
        .members
        .lock()
        .unwrap()
        .insert(root.id.clone(), vec![sine.clone(), cosine.clone()]);
    h.view.composition_changed();
    h.view.pump();

    let log = h.telemetry.log();
    assert_eq!(log.iter().filter(|l| *l == "subscribe:sine").count(), 2);
    assert_eq!(log.iter().filter(|l| *l == "unsubscribe:sine").count(), 1);
    assert_eq!(h.view.subscriptions().subscription_count(), 2);
}

#[test]
fn stale_composition_results_are_ignored() {
    let a = object("a", "folder");
    let b = object("b", "folder");
    let a1 = object("a1", "telemetry");
    let b1 = object("b1", "telemetry");
    let composition = Arc::new(MockComposition::default())
        .with(&a, vec![a1.clone()])
        .with(&b, vec![b1.clone()]);
    let telemetry = Arc::new(MockTelemetry::default());
    let mut h = Harness::new(composition.clone(), telemetry, grid10());

    let release_a = composition.gate(&a);
    h.view.set_domain_object(&a);
    h.view.pump();
    h.view.set_domain_object(&b);
    h.view.pump();

    release_a.send(()).unwrap();
    h.view.pump();

    let log = h.telemetry.log();
    assert!(!log.contains(&"subscribe:a1".to_string()));
    let tracked: Vec<_> = h.view.subscriptions().tracked().iter().map(|o| o.id.clone()).collect();
    assert_eq!(tracked, vec![b1.id.clone()]);
}

#[test]
fn late_history_for_a_dropped_object_is_harmless() {
    let a = object("a", "folder");
    let b = object("b", "folder");
    let a1 = object("a1", "telemetry");
    let b1 = object("b1", "telemetry");
    let composition = Arc::new(MockComposition::default())
        .with(&a, vec![a1.clone()])
        .with(&b, vec![b1.clone()]);
    let telemetry = Arc::new(MockTelemetry::default()).with_history(&a1, vec![point(10, 0.5)]);
    let release = telemetry.gate_history(&a1);
    let mut h = Harness::new(composition, telemetry, grid10());

    h.view.set_domain_object(&a);
    h.view.pump();
    h.view.set_domain_object(&b);
    h.view.pump();
    let frames = h.host.frames();

    release.send(()).unwrap();
    h.view.pump();

    assert!(h.view.subscriptions().buffer(&a1.id).is_none());
    assert_eq!(h.view.display_cache().get(&a1.id).unwrap().value, "");
    assert_eq!(h.host.frames(), frames);
}

#[test]
fn destroy_is_idempotent_and_releases_everything() {
    let root = object("root", "folder");
    let sine = object("sine", "telemetry");
    let cosine = object("cosine", "telemetry");
    let composition =
        Arc::new(MockComposition::default()).with(&root, vec![sine.clone(), cosine.clone()]);
    let telemetry = Arc::new(MockTelemetry::default()).with_history(&sine, vec![point(1, 0.1)]);
    let mut h = Harness::new(composition, telemetry, grid10());

    h.view.set_domain_object(&root);
    h.view.pump();
    assert_eq!(h.time.listener_count(), 1);

    h.view.destroy();
    h.view.destroy();

    let log = h.telemetry.log();
    assert_eq!(log.iter().filter(|l| l.starts_with("unsubscribe:")).count(), 2);
    assert_eq!(h.view.subscriptions().subscription_count(), 0);
    assert_eq!(h.view.subscriptions().buffers().count(), 0);
    assert!(h.view.subscriptions().tracked().is_empty());
    assert_eq!(h.time.listener_count(), 0);
    assert_eq!(h.time.removed.lock().unwrap().len(), 1);

    // Nothing reaches the view any more.
    h.time.emit_bounds(Bounds::new(0.0, 10.0));
    assert_eq!(h.view.pump(), 0);
}

#[test]
fn bounds_change_refetches_only_when_not_following() {
    let root = object("root", "folder");
    let sine = object("sine", "telemetry");
    let cosine = object("cosine", "telemetry");
    let composition =
        Arc::new(MockComposition::default()).with(&root, vec![sine.clone(), cosine.clone()]);
    let telemetry = Arc::new(MockTelemetry::default()).with_history(&sine, vec![point(50, 0.5)]);

    let mut config = grid10();
    config.push(ElementConfig::telemetry(&sine.id, 0, 0, 2, 1));
    let mut h = Harness::new(composition, telemetry, config);
    h.view.set_domain_object(&root);
    h.view.pump();
    h.view.animation_frame();
    assert_eq!(h.telemetry.request_count(), 2);

    h.time.set_follow(true);
    h.time.emit_bounds(Bounds::new(10.0, 1010.0));
    h.view.pump();
    assert_eq!(h.telemetry.request_count(), 2);
    assert_eq!(
        h.view.subscriptions().buffer(&sine.id).unwrap().bounds(),
        Bounds::new(10.0, 1010.0)
    );
    assert_eq!(h.view.display_cache().get(&sine.id).unwrap().value, "0.50");

    h.time.set_follow(false);
    h.time.emit_bounds(Bounds::new(100.0, 200.0));
    h.view.pump();
    let requests = h.telemetry.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 4);
    assert!(requests[2..].iter().all(|(_, b)| *b == Bounds::new(100.0, 200.0)));
    let refetched: Vec<&ObjectId> = requests[2..].iter().map(|(id, _)| id).collect();
    assert!(refetched.contains(&&sine.id));
    assert!(refetched.contains(&&cosine.id));

    // The old value is outside the new window, so the display was reset and
    // the refetch (same point, out of bounds) leaves it blank.
    assert_eq!(h.view.display_cache().get(&sine.id).unwrap().value, "");
    assert_eq!(displayed(&h, 0).as_deref(), Some(""));
}

#[test]
fn early_live_points_are_released_when_bounds_advance() {
    let root = object("root", "folder");
    let sine = object("sine", "telemetry");
    let composition = Arc::new(MockComposition::default()).with(&root, vec![sine.clone()]);
    let telemetry = Arc::new(MockTelemetry::default());
    let mut h = Harness::new(composition, telemetry, grid10());
    h.time.set_follow(true);
    h.view.set_domain_object(&root);
    h.view.pump();

    h.telemetry.push(&sine, point(1005, 0.4));
    h.view.pump();
    assert_eq!(h.view.display_cache().get(&sine.id).unwrap().value, "");

    h.time.emit_bounds(Bounds::new(10.0, 1010.0));
    h.view.pump();
    assert_eq!(h.view.display_cache().get(&sine.id).unwrap().value, "0.40");
}

#[test]
fn drop_places_a_telemetry_element_on_the_grid() {
    let composition = Arc::new(MockComposition::default());
    let telemetry = Arc::new(MockTelemetry::default());
    let mut h = Harness::new(composition, telemetry, grid10());
    let sine = ObjectId::new("test", "sine");

    let mut event = DropEvent::new(sine.clone(), 55.0, 42.0);
    assert!(h.view.handle_drop(&mut event));
    assert!(event.default_prevented);
    assert!(!h.view.handle_drop(&mut event));

    let config = h.configuration.read();
    assert_eq!(config.elements.len(), 1);
    let entry = config.elements[0].read().clone();
    assert_eq!((entry.x, entry.y, entry.width, entry.height), (5, 4, 2, 1));
    assert_eq!(entry.kind, "fixed.telemetry");
    assert_eq!(entry.object_id(), Some(sine));
    assert_eq!(entry.stroke.as_deref(), Some("transparent"));
    assert_eq!(entry.color.as_deref(), Some(""));
    assert_eq!(entry.titled, Some(true));
    drop(config);

    assert!(h.view.selected().is_some());
    assert_eq!(
        h.host.commits.lock().unwrap().clone(),
        vec!["Dropped an element.".to_string()]
    );
}

#[test]
fn added_element_is_styled_selected_and_committed() {
    let composition = Arc::new(MockComposition::default());
    let telemetry = Arc::new(MockTelemetry::default());
    let mut config = grid10();
    config.push(ElementConfig::new("fixed.box", 0, 0, 1, 1));
    let mut h = Harness::new(composition, telemetry, config);

    h.view.add_element(ElementConfig::new("fixed.telemetry", 2, 3, 2, 1));

    let proxy = h.view.selected().unwrap();
    let css: Vec<(&str, String)> = proxy.style.css().to_vec();
    assert_eq!(
        css,
        vec![
            ("left", "20px".to_string()),
            ("top", "30px".to_string()),
            ("width", "20px".to_string()),
            ("height", "10px".to_string()),
        ]
    );
    assert!(h.view.is_selected(&h.view.elements()[1]));
    assert!(!h.view.is_selected(&h.view.elements()[0]));

    let handle = h.view.move_handle().unwrap();
    assert_eq!((handle.x, handle.y), (2, 3));
    assert_eq!(h.view.handles().len(), 1);
    assert_eq!(h.view.handles()[0].kind, HandleKind::Resize);
    assert_eq!(h.host.commits.lock().unwrap().len(), 1);

    h.view.clear_selection();
    assert!(h.view.selected().is_none());
    assert!(h.view.handles().is_empty());
    assert!(h.view.move_handle().is_none());
}

#[test]
fn external_edits_keep_selection_and_cached_values() {
    let root = object("root", "folder");
    let sine = object("sine", "telemetry");
    let composition = Arc::new(MockComposition::default()).with(&root, vec![sine.clone()]);
    let telemetry = Arc::new(MockTelemetry::default()).with_history(&sine, vec![point(5, 0.3)]);

    let mut config = grid10();
    config.push(ElementConfig::new("fixed.box", 0, 0, 1, 1));
    let kept = config.push(ElementConfig::telemetry(&sine.id, 4, 4, 2, 1));
    let mut h = Harness::new(composition, telemetry, config);
    h.view.set_domain_object(&root);
    h.view.pump();
    h.view.animation_frame();
    assert!(h.view.select(1));

    h.configuration.write().elements.remove(0);
    h.view.configuration_modified();

    let selected = h.view.selected().unwrap();
    assert!(Arc::ptr_eq(selected.element(), &kept));
    assert_eq!(
        selected.display.as_ref().map(|d| d.value.as_str()),
        Some("0.30")
    );

    h.configuration.write().elements.clear();
    h.view.configuration_modified();
    assert!(h.view.selected().is_none());
}

#[test]
fn grid_change_and_in_place_moves_restyle_proxies() {
    let composition = Arc::new(MockComposition::default());
    let telemetry = Arc::new(MockTelemetry::default());
    let mut config = grid10();
    let entry = config.push(ElementConfig::new("fixed.box", 1, 2, 3, 4));
    let mut h = Harness::new(composition, telemetry, config);
    h.view.select(0);

    h.view.grid_size_changed(fixedlayout::layout::GridSize { x: 20, y: 5 });
    assert_eq!(h.view.elements()[0].style.left, 20);
    assert_eq!(h.view.elements()[0].style.top, 10);

    entry.write().x = 7;
    h.view.selection_moved();
    assert_eq!(h.view.elements()[0].style.left, 140);
    assert_eq!(h.view.move_handle().unwrap().x, 7);
}

#[test]
fn datum_without_range_value_blanks_the_display() {
    let root = object("root", "folder");
    let sine = object("sine", "telemetry");
    let composition = Arc::new(MockComposition::default()).with(&root, vec![sine.clone()]);
    let telemetry = Arc::new(MockTelemetry::default()).with_history(&sine, vec![point(10, 0.95)]);

    let mut config = grid10();
    config.push(ElementConfig::telemetry(&sine.id, 0, 0, 2, 1));
    let mut h = Harness::new(composition, telemetry, config);
    h.view.set_domain_object(&root);
    h.view.pump();
    h.view.animation_frame();
    assert_eq!(displayed(&h, 0).as_deref(), Some("0.95"));

    h.telemetry.push(&sine, fixedlayout::data::Datum::new().with("utc", 20i64));
    h.view.pump();
    assert!(h.view.animation_frame());
    let display = h.view.elements()[0].display.clone().unwrap();
    assert_eq!(display.value, "");
    assert_eq!(display.alarm_class, None);
}
