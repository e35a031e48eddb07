use std::time::Duration;

use beamflow::event_bus::{ChannelSink, Event, EventBus, MemorySink};

#[test]
fn task_events_carry_identity_and_scope() {
    let event = Event::task_scoped("instance-1", "circavg", "fault", "detector returned garbage");
    assert_eq!(event.scope_label(), "fault");
    assert_eq!(event.message(), "detector returned garbage");
    let rendered = event.to_string();
    assert!(rendered.contains("instance-1"));
    assert!(rendered.contains("circavg"));
}

#[test]
fn diagnostic_events_render_without_identity() {
    let event = Event::diagnostic("validation", "event scan-1 rejected");
    assert_eq!(event.scope_label(), "validation");
    assert_eq!(event.to_string(), "[validation] event scan-1 rejected");
}

#[tokio::test]
async fn memory_sink_captures_events_in_order() {
    let memory = MemorySink::new();
    let bus = EventBus::with_sink(memory.clone());
    bus.listen_for_events();

    let sender = bus.sender();
    sender
        .send(Event::diagnostic("a", "first"))
        .expect("bus accepts events");
    sender
        .send(Event::diagnostic("b", "second"))
        .expect("bus accepts events");

    tokio::time::sleep(Duration::from_millis(100)).await;
    let events = memory.snapshot();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].message(), "first");
    assert_eq!(events[1].message(), "second");

    memory.clear();
    assert!(memory.snapshot().is_empty());
}

#[tokio::test]
async fn channel_sink_forwards_to_async_consumers() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let bus = EventBus::with_sink(ChannelSink::new(tx));
    bus.listen_for_events();

    bus.sender()
        .send(Event::diagnostic("stream", "hello"))
        .expect("bus accepts events");

    let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("event arrives promptly")
        .expect("channel open");
    assert_eq!(received.message(), "hello");
}

#[tokio::test]
async fn listening_is_idempotent_and_stoppable() {
    let memory = MemorySink::new();
    let bus = EventBus::with_sink(memory.clone());
    bus.listen_for_events();
    bus.listen_for_events(); // second call is a no-op

    bus.sender()
        .send(Event::diagnostic("x", "once"))
        .expect("bus accepts events");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(memory.snapshot().len(), 1);

    bus.stop_listening();
}
