//! Toast notifications as an explicit publish/subscribe bus.
//!
//! Owners hold a [`ToastBus`] and pass clones to whoever needs to publish.
//! Listeners stay registered while their [`Subscription`] lives.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError, Weak,
    },
    time::Duration,
};
use tracing::debug;
use ulid::Ulid;

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(5000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
    Warning,
}

impl fmt::Display for ToastKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
            Self::Warning => "warning",
        };
        formatter.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub id: Ulid,
    pub kind: ToastKind,
    pub message: String,
    /// Zero keeps the toast until it is dismissed by hand.
    pub duration: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToastEvent {
    Shown(Toast),
    Dismissed(Ulid),
}

type Listener = Arc<dyn Fn(&ToastEvent) + Send + Sync>;
type Listeners = Mutex<Vec<(u64, Listener)>>;

#[derive(Clone, Default)]
pub struct ToastBus {
    listeners: Arc<Listeners>,
    next_listener: Arc<AtomicU64>,
}

/// Removes its listener from the bus when dropped.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    listeners: Weak<Listeners>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
        }
    }
}

impl ToastBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ToastEvent) + Send + Sync + 'static,
    {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        Subscription {
            listeners: Arc::downgrade(&self.listeners),
            id,
        }
    }

    /// Shows a toast. A non-zero `duration` schedules its dismissal on the
    /// current tokio runtime; outside a runtime it stays until dismissed.
    pub fn publish(&self, kind: ToastKind, message: impl Into<String>, duration: Duration) -> Ulid {
        let toast = Toast {
            id: Ulid::new(),
            kind,
            message: message.into(),
            duration,
        };
        let id = toast.id;
        debug!(%kind, %id, "toast shown");
        self.emit(&ToastEvent::Shown(toast));

        if !duration.is_zero() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let bus = self.clone();
                    handle.spawn(async move {
                        tokio::time::sleep(duration).await;
                        bus.dismiss(id);
                    });
                }
                Err(_) => debug!(%id, "no runtime, toast will not auto-dismiss"),
            }
        }
        id
    }

    pub fn success(&self, message: impl Into<String>) -> Ulid {
        self.publish(ToastKind::Success, message, DEFAULT_TOAST_DURATION)
    }

    pub fn error(&self, message: impl Into<String>) -> Ulid {
        self.publish(ToastKind::Error, message, DEFAULT_TOAST_DURATION)
    }

    pub fn info(&self, message: impl Into<String>) -> Ulid {
        self.publish(ToastKind::Info, message, DEFAULT_TOAST_DURATION)
    }

    pub fn warning(&self, message: impl Into<String>) -> Ulid {
        self.publish(ToastKind::Warning, message, DEFAULT_TOAST_DURATION)
    }

    pub fn dismiss(&self, id: Ulid) {
        self.emit(&ToastEvent::Dismissed(id));
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn emit(&self, event: &ToastEvent) {
        // Listeners run outside the lock so they may publish or unsubscribe.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }
}

/// The visible toast list, kept in sync with a bus.
#[derive(Clone, Default)]
pub struct ToastTray {
    toasts: Arc<Mutex<Vec<Toast>>>,
}

impl ToastTray {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, bus: &ToastBus) -> Subscription {
        let toasts = Arc::clone(&self.toasts);
        bus.subscribe(move |event| {
            let mut toasts = toasts.lock().unwrap_or_else(PoisonError::into_inner);
            match event {
                ToastEvent::Shown(toast) => toasts.push(toast.clone()),
                ToastEvent::Dismissed(id) => toasts.retain(|toast| toast.id != *id),
            }
        })
    }

    #[must_use]
    pub fn visible(&self) -> Vec<Toast> {
        self.toasts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes a toast from this tray only.
    pub fn remove(&self, id: Ulid) {
        self.toasts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|toast| toast.id != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn dropping_the_subscription_stops_delivery() {
        let bus = ToastBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let subscription = bus.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(ToastKind::Info, "hello", Duration::ZERO);
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        drop(subscription);
        assert_eq!(bus.listener_count(), 0);
        bus.publish(ToastKind::Info, "again", Duration::ZERO);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timed_toasts_dismiss_themselves() {
        let bus = ToastBus::new();
        let tray = ToastTray::new();
        let _subscription = tray.attach(&bus);

        let sticky = bus.publish(ToastKind::Warning, "stays", Duration::ZERO);
        bus.publish(ToastKind::Success, "goes", Duration::from_millis(20));
        assert_eq!(tray.visible().len(), 2);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let visible = tray.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, sticky);

        tray.remove(sticky);
        assert!(tray.visible().is_empty());
    }

    #[test]
    fn shortcut_methods_use_the_default_duration() {
        let bus = ToastBus::new();
        let tray = ToastTray::new();
        let _subscription = tray.attach(&bus);
        bus.error("boom");
        let toast = &tray.visible()[0];
        assert_eq!(toast.kind, ToastKind::Error);
        assert_eq!(toast.duration, DEFAULT_TOAST_DURATION);
    }
}
