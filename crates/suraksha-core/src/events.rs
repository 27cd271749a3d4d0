//! Typed events published by the monitor to the UI layer.
//!
//! [`EventBus`] is a thin wrapper over a tokio broadcast channel: every
//! [`Subscription`] has its own cursor, so a slow or failing consumer never
//! blocks another one. Dropping a subscription unsubscribes it.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{trace, warn};
use utoipa::ToSchema;

/// Default number of events buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 64;

/// Why an emergency alert was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyErrorKind {
    /// No credential for the acting user; nothing was sent.
    AuthenticationRequired,
    /// Location lookup, network call or backend failed.
    DispatchFailed,
}

/// Something the UI layer may react to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum MonitorEvent {
    /// The panic button is connected and monitored.
    DeviceConnected {
        /// Peripheral identifier.
        device: String,
    },
    /// The link to the panic button was lost or torn down.
    DeviceDisconnected,
    /// A burst of two presses.
    DoublePress,
    /// A burst of three presses; an emergency alert is being sent.
    TriplePress,
    /// A burst of any other length.
    PressesDetected {
        /// Presses in the burst.
        count: u32,
    },
    /// The emergency alert was accepted by the backend.
    EmergencySent,
    /// The emergency alert could not be sent.
    EmergencyError {
        /// Failure category.
        kind: EmergencyErrorKind,
        /// Human-readable detail.
        detail: String,
    },
}

impl MonitorEvent {
    /// The kind of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::DeviceConnected { .. } => EventKind::DeviceConnected,
            Self::DeviceDisconnected => EventKind::DeviceDisconnected,
            Self::DoublePress => EventKind::DoublePress,
            Self::TriplePress => EventKind::TriplePress,
            Self::PressesDetected { .. } => EventKind::PressesDetected,
            Self::EmergencySent => EventKind::EmergencySent,
            Self::EmergencyError { .. } => EventKind::EmergencyError,
        }
    }
}

/// Event names consumers subscribe by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// See [`MonitorEvent::DeviceConnected`].
    DeviceConnected,
    /// See [`MonitorEvent::DeviceDisconnected`].
    DeviceDisconnected,
    /// See [`MonitorEvent::DoublePress`].
    DoublePress,
    /// See [`MonitorEvent::TriplePress`].
    TriplePress,
    /// See [`MonitorEvent::PressesDetected`].
    PressesDetected,
    /// See [`MonitorEvent::EmergencySent`].
    EmergencySent,
    /// See [`MonitorEvent::EmergencyError`].
    EmergencyError,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::DeviceConnected,
        Self::DeviceDisconnected,
        Self::DoublePress,
        Self::TriplePress,
        Self::PressesDetected,
        Self::EmergencySent,
        Self::EmergencyError,
    ];

    /// Wire name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeviceConnected => "deviceConnected",
            Self::DeviceDisconnected => "deviceDisconnected",
            Self::DoublePress => "doublePress",
            Self::TriplePress => "triplePress",
            Self::PressesDetected => "pressesDetected",
            Self::EmergencySent => "emergencySent",
            Self::EmergencyError => "emergencyError",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown event name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event kind '{0}'")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

/// Publish side of the monitor's events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MonitorEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// A bus buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event to every current subscriber.
    pub fn emit(&self, event: MonitorEvent) {
        let kind = event.kind();
        match self.tx.send(event) {
            Ok(receivers) => trace!(%kind, receivers, "Event emitted"),
            Err(_) => trace!(%kind, "Event emitted with no subscribers"),
        }
    }

    /// Subscribe to every event.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            kinds: None,
        }
    }

    /// Subscribe to the named event kinds only.
    #[must_use]
    pub fn subscribe_to(&self, kinds: impl IntoIterator<Item = EventKind>) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            kinds: Some(kinds.into_iter().collect()),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Receive side of one consumer.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<MonitorEvent>,
    kinds: Option<HashSet<EventKind>>,
}

impl Subscription {
    fn wants(&self, event: &MonitorEvent) -> bool {
        self.kinds
            .as_ref()
            .map_or(true, |kinds| kinds.contains(&event.kind()))
    }

    /// Wait for the next matching event. Returns `None` once every publisher is
    /// gone.
    pub async fn recv(&mut self) -> Option<MonitorEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Event subscriber lagged behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next matching event if one is already queued.
    pub fn try_recv(&mut self) -> Option<MonitorEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) => {}
                Err(TryRecvError::Lagged(missed)) => {
                    warn!(missed, "Event subscriber lagged behind");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Stop receiving events.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>(), Ok(kind));
        }
        assert_eq!(
            "tripplePress".parse::<EventKind>(),
            Err(UnknownEventKind("tripplePress".to_string()))
        );
    }

    #[test]
    fn test_event_serialization_uses_kind_names() {
        let json = serde_json::to_value(MonitorEvent::PressesDetected { count: 4 }).unwrap();
        assert_eq!(json["event"], "pressesDetected");
        assert_eq!(json["count"], 4);

        let json = serde_json::to_value(MonitorEvent::EmergencyError {
            kind: EmergencyErrorKind::AuthenticationRequired,
            detail: "no token".to_string(),
        })
        .unwrap();
        assert_eq!(json["event"], EventKind::EmergencyError.as_str());
        assert_eq!(json["kind"], "authentication_required");
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_every_event() {
        let bus = EventBus::default();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.emit(MonitorEvent::DoublePress);

        assert_eq!(first.recv().await, Some(MonitorEvent::DoublePress));
        assert_eq!(second.recv().await, Some(MonitorEvent::DoublePress));
    }

    #[tokio::test]
    async fn test_filtered_subscription() {
        let bus = EventBus::default();
        let mut emergencies =
            bus.subscribe_to([EventKind::EmergencySent, EventKind::EmergencyError]);

        bus.emit(MonitorEvent::DoublePress);
        bus.emit(MonitorEvent::TriplePress);
        bus.emit(MonitorEvent::EmergencySent);

        assert_eq!(emergencies.recv().await, Some(MonitorEvent::EmergencySent));
        assert_eq!(emergencies.try_recv(), None);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::default();
        let first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        first.unsubscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit(MonitorEvent::EmergencySent);
        assert_eq!(second.try_recv(), Some(MonitorEvent::EmergencySent));
    }

    #[test]
    fn test_emit_without_subscribers_is_harmless() {
        let bus = EventBus::default();
        bus.emit(MonitorEvent::DeviceDisconnected);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_keeps_receiving() {
        let bus = EventBus::new(2);
        let mut slow = bus.subscribe();
        let mut fast = bus.subscribe();

        for count in 1..=5 {
            bus.emit(MonitorEvent::PressesDetected { count });
            assert_eq!(
                fast.recv().await,
                Some(MonitorEvent::PressesDetected { count })
            );
        }

        // The slow consumer lost the oldest events but not its subscription.
        assert_eq!(
            slow.recv().await,
            Some(MonitorEvent::PressesDetected { count: 4 })
        );
        assert_eq!(
            slow.recv().await,
            Some(MonitorEvent::PressesDetected { count: 5 })
        );
    }

    #[tokio::test]
    async fn test_recv_ends_when_bus_dropped() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe();
        drop(bus);
        assert_eq!(sub.recv().await, None);
    }
}
