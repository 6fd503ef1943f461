use super::{BotEvent, DeliveryMode, EventHandler, EventKind};
use crate::config::EventsConfig;
use anyhow::{Context, Result};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// One publish: the event plus the subscribers captured at publish time
struct Delivery {
    event: BotEvent,
    handlers: Vec<Arc<dyn EventHandler>>,
}

enum DeliverySender {
    Bounded(mpsc::Sender<Delivery>),
    Unbounded(mpsc::UnboundedSender<Delivery>),
}

enum DeliveryReceiver {
    Bounded(mpsc::Receiver<Delivery>),
    Unbounded(mpsc::UnboundedReceiver<Delivery>),
}

impl DeliveryReceiver {
    async fn recv(&mut self) -> Option<Delivery> {
        match self {
            DeliveryReceiver::Bounded(rx) => rx.recv().await,
            DeliveryReceiver::Unbounded(rx) => rx.recv().await,
        }
    }
}

/// Per-kind counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindStatistics {
    pub events: u64,
    pub listeners: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EventStatistics {
    pub total_events: u64,
    pub total_listeners: usize,
    pub per_kind: BTreeMap<EventKind, KindStatistics>,
}

/// State shared between the bus handle and its workers
struct Shared {
    subscribers: RwLock<HashMap<EventKind, Vec<Arc<dyn EventHandler>>>>,
    counts: DashMap<EventKind, u64>,
    total: AtomicU64,
    /// Async deliveries accepted but not yet finished
    pending: AtomicUsize,
    idle: Notify,
}

impl Shared {
    /// Run one batch in subscription order, isolating each handler.
    fn deliver(&self, delivery: &Delivery) {
        let kind = delivery.event.kind();
        *self.counts.entry(kind).or_insert(0) += 1;
        self.total.fetch_add(1, Ordering::Relaxed);

        for handler in &delivery.handlers {
            match catch_unwind(AssertUnwindSafe(|| handler.handle(&delivery.event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(
                    event = %kind,
                    bot_id = delivery.event.bot_id(),
                    handler = handler.name(),
                    error = %e,
                    "Event handler failed"
                ),
                Err(_) => error!(
                    event = %kind,
                    bot_id = delivery.event.bot_id(),
                    handler = handler.name(),
                    "Event handler panicked"
                ),
            }
        }
    }

    fn finish_one(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Typed publish/subscribe broker for bot lifecycle events.
///
/// `publish` queues work for a pool of tokio worker tasks and returns at
/// once; `publish_sync` runs the same delivery inline. Counters move once
/// per delivered batch, and only when the kind had subscribers.
pub struct EventBus {
    shared: Arc<Shared>,
    sender: Mutex<Option<DeliverySender>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    runtime: Handle,
}

impl EventBus {
    /// Start the bus and its workers on the current tokio runtime.
    pub fn new(config: &EventsConfig) -> Result<Self> {
        let runtime = Handle::try_current().context("Event bus must be started inside a tokio runtime")?;
        let workers = config.workers.max(1);

        let (sender, receiver) = if config.queue_capacity == 0 {
            let (tx, rx) = mpsc::unbounded_channel();
            (DeliverySender::Unbounded(tx), DeliveryReceiver::Unbounded(rx))
        } else {
            let (tx, rx) = mpsc::channel(config.queue_capacity);
            (DeliverySender::Bounded(tx), DeliveryReceiver::Bounded(rx))
        };

        let shared = Arc::new(Shared {
            subscribers: RwLock::new(HashMap::new()),
            counts: DashMap::new(),
            total: AtomicU64::new(0),
            pending: AtomicUsize::new(0),
            idle: Notify::new(),
        });

        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let handles = (0..workers)
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                let shared = Arc::clone(&shared);
                runtime.spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(delivery) = next else {
                            break;
                        };
                        shared.deliver(&delivery);
                        shared.finish_one();
                    }
                    debug!(worker_id, "Event worker stopped");
                })
            })
            .collect();

        info!(
            workers,
            queue_capacity = config.queue_capacity,
            "Event bus started"
        );

        Ok(Self {
            shared,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
            runtime,
        })
    }

    /// Add `handler` to the end of the list for `kind`.
    ///
    /// Subscribing the same handler twice delivers twice.
    pub fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        let mut subscribers = self
            .shared
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.entry(kind).or_default().push(handler);
        debug!(event = %kind, "Handler subscribed");
    }

    /// Remove one occurrence of `handler` (matched by pointer identity).
    ///
    /// Returns false if it was not subscribed.
    pub fn unsubscribe(&self, kind: EventKind, handler: &Arc<dyn EventHandler>) -> bool {
        let mut subscribers = self
            .shared
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(list) = subscribers.get_mut(&kind) else {
            return false;
        };
        let Some(pos) = list.iter().position(|h| Arc::ptr_eq(h, handler)) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            subscribers.remove(&kind);
        }
        debug!(event = %kind, "Handler unsubscribed");
        true
    }

    fn handlers_for(&self, kind: EventKind) -> Vec<Arc<dyn EventHandler>> {
        self.shared
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Queue delivery to the current subscribers and return immediately.
    pub fn publish(&self, event: BotEvent) {
        let handlers = self.handlers_for(event.kind());
        if handlers.is_empty() {
            return;
        }

        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = sender.as_ref() else {
            warn!(event = %event.kind(), bot_id = event.bot_id(), "Event bus is shut down; event dropped");
            return;
        };

        self.shared.pending.fetch_add(1, Ordering::AcqRel);
        let delivery = Delivery { event, handlers };

        match sender {
            DeliverySender::Unbounded(tx) => {
                if let Err(mpsc::error::SendError(lost)) = tx.send(delivery) {
                    self.lost(&lost);
                }
            }
            DeliverySender::Bounded(tx) => match tx.try_send(delivery) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(delivery)) => {
                    // Queue full: wait for room off the caller's path
                    let tx = tx.clone();
                    let shared = Arc::clone(&self.shared);
                    self.runtime.spawn(async move {
                        if let Err(mpsc::error::SendError(lost)) = tx.send(delivery).await {
                            warn!(event = %lost.event.kind(), "Event workers gone; event dropped");
                            shared.finish_one();
                        }
                    });
                }
                Err(mpsc::error::TrySendError::Closed(lost)) => self.lost(&lost),
            },
        }
    }

    fn lost(&self, delivery: &Delivery) {
        warn!(event = %delivery.event.kind(), "Event workers gone; event dropped");
        self.shared.finish_one();
    }

    /// Deliver to every current subscriber before returning.
    pub fn publish_sync(&self, event: BotEvent) {
        let handlers = self.handlers_for(event.kind());
        if handlers.is_empty() {
            return;
        }
        self.shared.deliver(&Delivery { event, handlers });
    }

    pub fn dispatch(&self, event: BotEvent, mode: DeliveryMode) {
        match mode {
            DeliveryMode::Async => self.publish(event),
            DeliveryMode::Sync => self.publish_sync(event),
        }
    }

    /// Resolves once every event accepted by `publish` so far is delivered.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.shared.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop accepting async work, drain what is queued and join the workers.
    pub async fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let workers: Vec<JoinHandle<()>> = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for result in futures::future::join_all(workers).await {
            if let Err(e) = result {
                error!(error = %e, "Event worker terminated abnormally");
            }
        }
        info!(total_events = self.total_event_count(), "Event bus shut down");
    }

    pub fn is_running(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Delivered batches for `kind`
    pub fn event_count(&self, kind: EventKind) -> u64 {
        self.shared.counts.get(&kind).map(|c| *c).unwrap_or(0)
    }

    pub fn total_event_count(&self) -> u64 {
        self.shared.total.load(Ordering::Relaxed)
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.shared
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn total_listener_count(&self) -> usize {
        self.shared
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    pub fn statistics(&self) -> EventStatistics {
        let per_kind = EventKind::ALL
            .iter()
            .map(|kind| {
                (
                    *kind,
                    KindStatistics {
                        events: self.event_count(*kind),
                        listeners: self.listener_count(*kind),
                    },
                )
            })
            .collect();

        EventStatistics {
            total_events: self.total_event_count(),
            total_listeners: self.total_listener_count(),
            per_kind,
        }
    }
}
