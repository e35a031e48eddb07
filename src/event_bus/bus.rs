use std::sync::Arc;

use parking_lot::Mutex;
use tokio::{sync::oneshot, task};

use super::event::Event;
use super::sink::{EventSink, StdOutSink};

/// EventBus is responsible for receiving events and broadcasting to multiple sinks.
pub struct EventBus {
    sinks: Arc<Mutex<Vec<Box<dyn EventSink>>>>,
    event_channel: (flume::Sender<Event>, flume::Receiver<Event>),
    listener: Arc<Mutex<Option<ListenerState>>>,
}

struct ListenerState {
    shutdown: oneshot::Sender<()>,
    handle: task::JoinHandle<()>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_sink(StdOutSink::default())
    }
}

impl EventBus {
    /// Create an EventBus with a single sink.
    pub fn with_sink<T>(sink: T) -> Self
    where
        T: EventSink + 'static,
    {
        Self::with_sinks(vec![Box::new(sink)])
    }

    /// Create an EventBus with multiple sinks.
    pub fn with_sinks(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self {
            sinks: Arc::new(Mutex::new(sinks)),
            event_channel: flume::unbounded(),
            listener: Arc::new(Mutex::new(None)),
        }
    }

    /// Dynamically add a sink.
    pub fn add_sink<T: EventSink + 'static>(&self, sink: T) {
        self.sinks.lock().push(Box::new(sink));
    }

    /// Get a clone of the sender side so producers can emit events.
    pub fn sender(&self) -> flume::Sender<Event> {
        self.event_channel.0.clone()
    }

    /// Spawn a background task that listens for events and broadcasts to all
    /// sinks. Idempotent: calling multiple times has no effect.
    pub fn listen_for_events(&self) {
        let mut guard = self.listener.lock();
        if guard.is_some() {
            return; // Already listening
        }

        let receiver = self.event_channel.1.clone();
        let sinks = self.sinks.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = task::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    received = receiver.recv_async() => {
                        match received {
                            Ok(event) => {
                                let mut sinks = sinks.lock();
                                for sink in sinks.iter_mut() {
                                    if let Err(err) = sink.handle(&event) {
                                        tracing::warn!(error = %err, "event sink rejected event");
                                    }
                                }
                            }
                            Err(_) => break, // all senders dropped
                        }
                    }
                }
            }
        });

        *guard = Some(ListenerState {
            shutdown: shutdown_tx,
            handle,
        });
    }

    /// Stop the background listener, if running. Events sent afterwards stay
    /// queued until [`listen_for_events`](Self::listen_for_events) is called
    /// again.
    pub fn stop_listening(&self) {
        if let Some(state) = self.listener.lock().take() {
            let _ = state.shutdown.send(());
            state.handle.abort();
        }
    }
}
