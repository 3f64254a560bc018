use std::sync::Arc;
use std::thread;

use serde_json::json;

use eventarc_emulator::{
    CloudEvent, CollisionPolicy, DeliveryOutcome, EventHandler, EventTrigger, InvalidTrigger,
    MatchKey, PublishDispatcher, PublishStatus, RecordingHandler, RegistryConfig, RegistryError,
    TriggerRegistry,
};

fn emulator() -> (Arc<TriggerRegistry>, Arc<RecordingHandler>, PublishDispatcher) {
    let registry = Arc::new(TriggerRegistry::default());
    let handler = Arc::new(RecordingHandler::new());
    let dispatcher = PublishDispatcher::new(
        Arc::clone(&registry),
        Arc::clone(&handler) as Arc<dyn EventHandler>,
    );
    (registry, handler, dispatcher)
}

fn dispatched_to(outcome: &DeliveryOutcome) -> Option<&str> {
    match outcome {
        DeliveryOutcome::Dispatched { trigger_name, .. } => Some(trigger_name),
        _ => None,
    }
}

#[test]
fn registered_trigger_receives_matching_event() {
    let (registry, handler, dispatcher) = emulator();
    registry
        .register("demo", "t1", Some(EventTrigger::new("custom.event", "my-channel")))
        .unwrap();

    let report = dispatcher.publish("my-channel", vec![CloudEvent::new("custom.event")]);

    assert_eq!(report.status, PublishStatus::Accepted);
    assert_eq!(dispatched_to(&report.outcomes[0]), Some("t1"));
    assert_eq!(handler.trigger_names(), vec!["t1"]);
}

#[test]
fn event_on_other_channel_is_unmatched_and_accepted() {
    let (registry, handler, dispatcher) = emulator();
    registry
        .register("demo", "t1", Some(EventTrigger::new("custom.event", "my-channel")))
        .unwrap();

    let report = dispatcher.publish("other-channel", vec![CloudEvent::new("custom.event")]);

    assert!(report.is_accepted());
    assert_eq!(
        report.outcomes,
        vec![DeliveryOutcome::Unmatched {
            match_key: MatchKey::new("custom.event", "other-channel")
        }]
    );
    assert!(handler.is_empty());
}

#[test]
fn registration_without_trigger_leaves_registry_unchanged() {
    let (registry, _, dispatcher) = emulator();

    let err = registry.register("demo", "t1", None).unwrap_err();
    assert_eq!(
        err,
        RegistryError::Invalid(InvalidTrigger::MissingEventTrigger {
            trigger_name: "t1".to_string()
        })
    );
    assert!(registry.is_empty());
    assert!(registry.lookup(&MatchKey::new("", "")).is_none());

    let report = dispatcher.publish("", vec![CloudEvent::new("custom.event")]);
    assert_eq!(report.unmatched_count(), 1);
}

#[test]
fn invalid_event_rejects_batch_but_valid_events_still_dispatch() {
    let (registry, handler, dispatcher) = emulator();
    registry.register("demo", "ta", Some(EventTrigger::new("a", "ch"))).unwrap();
    registry.register("demo", "tb", Some(EventTrigger::new("b", "ch"))).unwrap();

    let events = vec![
        CloudEvent::from_json(json!({"type": "a"})),
        CloudEvent::from_json(json!({})),
        CloudEvent::from_json(json!({"type": "b"})),
    ];
    let report = dispatcher.publish("ch", events);

    assert_eq!(report.status, PublishStatus::Rejected);
    assert_eq!(report.status.http_status(), 400);
    assert_eq!(dispatched_to(&report.outcomes[0]), Some("ta"));
    assert!(report.outcomes[1].is_invalid());
    assert_eq!(dispatched_to(&report.outcomes[2]), Some("tb"));
    assert_eq!(handler.trigger_names(), vec!["ta", "tb"]);
}

#[test]
fn second_registration_for_key_takes_over_dispatch() {
    let (registry, handler, dispatcher) = emulator();
    registry.register("demo", "t1", Some(EventTrigger::new("evt", "ch"))).unwrap();
    registry.register("demo", "t2", Some(EventTrigger::new("evt", "ch"))).unwrap();

    let report = dispatcher.publish("ch", vec![CloudEvent::new("evt")]);

    assert_eq!(dispatched_to(&report.outcomes[0]), Some("t2"));
    assert_eq!(handler.trigger_names(), vec!["t2"]);
}

#[test]
fn colliding_compositions_share_one_trigger() {
    // ("a-b", "c") and ("a", "b-c") compose to the same key and overwrite each other.
    let (registry, _, dispatcher) = emulator();
    registry.register("demo", "first", Some(EventTrigger::new("a-b", "c"))).unwrap();
    registry.register("demo", "second", Some(EventTrigger::new("a", "b-c"))).unwrap();

    let report = dispatcher.publish("c", vec![CloudEvent::new("a-b")]);
    assert_eq!(dispatched_to(&report.outcomes[0]), Some("second"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn outcome_of_each_event_is_independent_of_its_neighbours() {
    let (registry, _, dispatcher) = emulator();
    registry.register("demo", "t", Some(EventTrigger::new("x", "ch"))).unwrap();

    let alone = dispatcher.publish("ch", vec![CloudEvent::new("x")]);
    let surrounded = dispatcher.publish(
        "ch",
        vec![
            CloudEvent::default(),
            CloudEvent::new("x"),
            CloudEvent::from_json(json!(42)),
        ],
    );

    assert_eq!(alone.outcomes[0], surrounded.outcomes[1]);
    assert!(alone.is_accepted());
    assert!(!surrounded.is_accepted());
    assert_eq!(surrounded.invalid_count(), 2);
}

#[test]
fn matching_requires_both_type_and_channel() {
    let (registry, _, dispatcher) = emulator();
    registry.register("demo", "t", Some(EventTrigger::new("T", "C"))).unwrap();

    let cases = [("T", "C", true), ("T", "D", false), ("U", "C", false), ("T", "", false)];
    for (event_type, channel, expect_dispatch) in cases {
        let report = dispatcher.publish(channel, vec![CloudEvent::new(event_type)]);
        assert_eq!(
            report.outcomes[0].is_dispatched(),
            expect_dispatch,
            "type={event_type} channel={channel}"
        );
    }
}

#[test]
fn strict_registry_keeps_first_trigger() {
    let registry = Arc::new(TriggerRegistry::new(RegistryConfig {
        collision_policy: CollisionPolicy::Reject,
    }));
    let handler = Arc::new(RecordingHandler::new());
    let dispatcher = PublishDispatcher::new(Arc::clone(&registry), handler.clone());

    registry.register("demo", "t1", Some(EventTrigger::new("evt", "ch"))).unwrap();
    let err = registry
        .register("demo", "t2", Some(EventTrigger::new("evt", "ch")))
        .unwrap_err();
    assert!(matches!(err, RegistryError::KeyCollision { .. }));

    dispatcher.publish("ch", vec![CloudEvent::new("evt")]);
    assert_eq!(handler.trigger_names(), vec!["t1"]);
}

#[test]
fn publish_races_registration_without_torn_reads() {
    let (registry, _, dispatcher) = emulator();
    let dispatcher = Arc::new(dispatcher);

    let writer = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for i in 0..200 {
                registry
                    .register("demo", &format!("t{i}"), Some(EventTrigger::new("evt", "ch")))
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let dispatcher = Arc::clone(&dispatcher);
            thread::spawn(move || {
                for _ in 0..200 {
                    let report = dispatcher.publish("ch", vec![CloudEvent::new("evt")]);
                    match &report.outcomes[0] {
                        DeliveryOutcome::Dispatched { project_id, trigger_name } => {
                            assert_eq!(project_id, "demo");
                            assert!(trigger_name.starts_with('t'));
                        }
                        DeliveryOutcome::Unmatched { .. } => {}
                        other => panic!("unexpected outcome: {other:?}"),
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }

    let final_report = dispatcher.publish("ch", vec![CloudEvent::new("evt")]);
    assert_eq!(dispatched_to(&final_report.outcomes[0]), Some("t199"));
}
