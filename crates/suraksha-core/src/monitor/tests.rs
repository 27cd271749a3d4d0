use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::time::{sleep, sleep_until, timeout};

use super::*;
use crate::ble::mock::{MockPeripheral, MockTransport};
use crate::credentials::StaticCredentials;
use crate::emergency::tests::{service, RecordingDispatcher, COORDS};
use crate::events::EmergencyErrorKind;
use crate::location::{Coordinates, LocationError, PositionProvider};

const BUTTON_ID: &str = "AA:BB:CC:DD:EE:FF";
const PRESS_GAP: Duration = Duration::from_millis(100);

struct Harness {
    radio: MockTransport,
    button: MockPeripheral,
    dispatcher: Arc<RecordingDispatcher>,
    handle: MonitorHandle,
    events: Subscription,
}

impl Harness {
    fn with(radio: MockTransport, settings: MonitorSettings, token: Option<&str>) -> Self {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let bus = EventBus::default();
        let events = bus.subscribe();
        let emergency = Arc::new(service(token, Arc::clone(&dispatcher), bus));
        let handle = Monitor::new(radio.clone(), settings, emergency).spawn();
        Self {
            radio,
            button: MockPeripheral::new(BUTTON_ID, Some(DEFAULT_DEVICE_NAME)),
            dispatcher,
            handle,
            events,
        }
    }

    fn new() -> Self {
        Self::with(MockTransport::new(), MonitorSettings::default(), Some("jwt"))
    }

    async fn scanning(token: Option<&str>) -> Self {
        let h = Self::with(MockTransport::new(), MonitorSettings::default(), token);
        assert!(h.handle.initialize().await.unwrap());
        assert!(h.radio.is_scanning());
        h
    }

    async fn connected(token: Option<&str>) -> Self {
        let mut h = Self::scanning(token).await;
        assert!(h.radio.advertise(&h.button));
        assert_eq!(
            h.next_event().await,
            MonitorEvent::DeviceConnected {
                device: BUTTON_ID.to_string()
            }
        );
        h
    }

    async fn next_event(&mut self) -> MonitorEvent {
        timeout(Duration::from_secs(120), self.events.recv())
            .await
            .expect("no event within two minutes")
            .expect("event bus closed")
    }

    async fn burst(&self, presses: usize) {
        for i in 0..presses {
            if i > 0 {
                sleep(PRESS_GAP).await;
            }
            assert!(self.button.press());
        }
    }

    async fn status(&self) -> MonitorStatus {
        self.handle.status().await.unwrap()
    }
}

struct DeniedLocation;

impl PositionProvider for DeniedLocation {
    fn request_permission(&self) -> BoxFuture<'_, bool> {
        async { false }.boxed()
    }

    fn current_position(&self) -> BoxFuture<'_, std::result::Result<Coordinates, LocationError>> {
        async { Err(LocationError::PermissionDenied) }.boxed()
    }
}

#[tokio::test(start_paused = true)]
async fn test_initialize_starts_scanning() {
    let h = Harness::new();
    assert_eq!(h.status().await.state, MonitorState::Idle);

    assert!(h.handle.initialize().await.unwrap());

    let status = h.status().await;
    assert_eq!(status.state, MonitorState::Scanning);
    assert_eq!(status.device, None);
    assert_eq!(h.radio.scans_started(), 1);
    assert_eq!(h.radio.last_filter(), Some(ScanFilter::default()));

    // A second call changes nothing.
    assert!(h.handle.initialize().await.unwrap());
    assert_eq!(h.radio.scans_started(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_initialize_denied_location_stays_idle() {
    let radio = MockTransport::new();
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let emergency = Arc::new(EmergencyService::new(
        Arc::new(DeniedLocation),
        Arc::new(StaticCredentials::new(Some("jwt".to_string()))),
        dispatcher,
        EventBus::default(),
    ));
    let handle = Monitor::new(radio.clone(), MonitorSettings::default(), emergency).spawn();

    assert!(!handle.initialize().await.unwrap());
    assert_eq!(handle.status().await.unwrap().state, MonitorState::Idle);
    assert_eq!(radio.scans_started(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_initialize_waits_for_power_on() {
    let radio = MockTransport::with_power(PowerState::PoweredOff);
    let h = Harness::with(radio.clone(), MonitorSettings::default(), Some("jwt"));

    let handle = h.handle.clone();
    let init = tokio::spawn(async move { handle.initialize().await });

    sleep(Duration::from_secs(5)).await;
    assert!(!init.is_finished());
    assert_eq!(radio.scans_started(), 0);
    assert_eq!(h.status().await.state, MonitorState::Idle);

    radio.set_power(PowerState::PoweredOn);
    assert!(init.await.unwrap().unwrap());
    assert_eq!(radio.scans_started(), 1);
    assert_eq!(h.status().await.state, MonitorState::Scanning);
}

#[tokio::test(start_paused = true)]
async fn test_scan_filter_by_service() {
    let settings = MonitorSettings {
        filter_by_service: true,
        ..MonitorSettings::default()
    };
    let h = Harness::with(MockTransport::new(), settings, Some("jwt"));
    h.handle.initialize().await.unwrap();

    assert_eq!(
        h.radio.last_filter(),
        Some(ScanFilter {
            services: vec![DEFAULT_SERVICE_UUID]
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_scanning_is_idempotent() {
    let h = Harness::scanning(Some("jwt")).await;

    for _ in 0..3 {
        h.handle.start_scanning().await.unwrap();
    }

    assert_eq!(h.radio.scans_started(), 4);
    assert_eq!(h.radio.scans_stopped(), 3);
    assert_eq!(h.radio.max_concurrent_scans(), 1);
    assert!(h.radio.is_scanning());
}

#[tokio::test(start_paused = true)]
async fn test_other_peripherals_are_ignored() {
    let mut h = Harness::scanning(Some("jwt")).await;
    let speaker = MockPeripheral::new("11:22:33:44:55:66", Some("JBL Flip 5"));
    let anonymous = MockPeripheral::new("66:55:44:33:22:11", None);

    assert!(h.radio.advertise(&speaker));
    assert!(h.radio.advertise(&anonymous));
    sleep(Duration::from_secs(1)).await;

    assert_eq!(h.status().await.state, MonitorState::Scanning);
    assert_eq!(speaker.connect_attempts(), 0);
    assert_eq!(anonymous.connect_attempts(), 0);
    assert!(h.radio.is_scanning());
    assert_eq!(h.events.try_recv(), None);
}

#[tokio::test(start_paused = true)]
async fn test_name_resolved_after_first_sighting_connects() {
    let mut h = Harness::scanning(Some("jwt")).await;
    let unnamed = MockPeripheral::new(BUTTON_ID, None);
    assert!(h.radio.advertise(&unnamed));
    sleep(Duration::from_millis(10)).await;
    assert_eq!(h.status().await.state, MonitorState::Scanning);
    assert_eq!(unnamed.connect_attempts(), 0);

    // Reported again once the scan response carries the name.
    assert!(h.radio.advertise(&h.button));
    assert_eq!(
        h.next_event().await,
        MonitorEvent::DeviceConnected {
            device: BUTTON_ID.to_string()
        }
    );
    assert_eq!(h.radio.scans_started(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_connects_and_subscribes() {
    let h = Harness::connected(Some("jwt")).await;

    let status = h.status().await;
    assert_eq!(status.state, MonitorState::Monitoring);
    assert_eq!(status.device.as_deref(), Some(BUTTON_ID));
    assert_eq!(h.button.connect_attempts(), 1);
    assert_eq!(
        h.button.subscription(),
        Some((DEFAULT_SERVICE_UUID, DEFAULT_CHARACTERISTIC_UUID))
    );
    // Scanning stops once the button is found.
    assert!(!h.radio.is_scanning());
}

#[tokio::test(start_paused = true)]
async fn test_connect_failure_rescans_once_after_backoff() {
    let h = Harness::scanning(Some("jwt")).await;
    h.button.set_fail_connect(true);
    assert!(h.radio.advertise(&h.button));

    sleep(Duration::from_millis(2900)).await;
    let status = h.status().await;
    assert_eq!(status.state, MonitorState::Scanning);
    assert!(status.rescan_pending);
    assert_eq!(h.radio.scans_started(), 1);
    assert!(!h.radio.is_scanning());

    sleep(Duration::from_millis(200)).await;
    assert_eq!(h.radio.scans_started(), 2);
    assert!(h.radio.is_scanning());
    assert!(!h.status().await.rescan_pending);
    assert_eq!(h.button.connect_attempts(), 1);

    // The next advertisement connects normally.
    h.button.set_fail_connect(false);
    assert!(h.radio.advertise(&h.button));
    sleep(Duration::from_millis(10)).await;
    assert_eq!(h.status().await.state, MonitorState::Monitoring);
}

#[tokio::test(start_paused = true)]
async fn test_discovery_failure_disconnects_and_rescans() {
    let h = Harness::scanning(Some("jwt")).await;
    h.button.set_fail_discovery(true);
    assert!(h.radio.advertise(&h.button));

    sleep(Duration::from_millis(3100)).await;
    assert_eq!(h.button.disconnects(), 1);
    assert_eq!(h.radio.scans_started(), 2);
    assert_eq!(h.status().await.device, None);
}

#[tokio::test(start_paused = true)]
async fn test_safety_net_restarts_scan() {
    let h = Harness::scanning(Some("jwt")).await;

    sleep(Duration::from_secs(59)).await;
    assert_eq!(h.radio.scans_started(), 1);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(h.radio.scans_started(), 2);
    assert_eq!(h.radio.max_concurrent_scans(), 1);

    // Re-armed by the restart.
    sleep(Duration::from_secs(60)).await;
    assert_eq!(h.radio.scans_started(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_safety_net_cleared_once_connected() {
    let h = Harness::connected(Some("jwt")).await;

    sleep(Duration::from_secs(300)).await;
    assert_eq!(h.radio.scans_started(), 1);
    assert_eq!(h.status().await.state, MonitorState::Monitoring);
}

#[tokio::test(start_paused = true)]
async fn test_safety_net_abandons_hung_connect() {
    let mut h = Harness::scanning(Some("jwt")).await;
    h.button.set_hang_connect(true);
    assert!(h.radio.advertise(&h.button));

    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.status().await.state, MonitorState::Connecting);
    assert!(!h.radio.is_scanning());

    sleep(Duration::from_secs(31)).await;
    assert_eq!(h.status().await.state, MonitorState::Scanning);
    assert_eq!(h.radio.scans_started(), 2);
    assert!(h.radio.is_scanning());
    assert_eq!(h.button.connect_attempts(), 1);

    h.button.set_hang_connect(false);
    assert!(h.radio.advertise(&h.button));
    assert_eq!(
        h.next_event().await,
        MonitorEvent::DeviceConnected {
            device: BUTTON_ID.to_string()
        }
    );
    assert_eq!(h.button.connect_attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_presses_coalesce_into_one_classification() {
    let mut h = Harness::connected(Some("jwt")).await;

    for n in 1..=6u32 {
        h.burst(n as usize).await;
        let expected = match n {
            2 => MonitorEvent::DoublePress,
            3 => MonitorEvent::TriplePress,
            count => MonitorEvent::PressesDetected { count },
        };
        assert_eq!(h.next_event().await, expected);
        if n == 3 {
            assert_eq!(h.next_event().await, MonitorEvent::EmergencySent);
        }
        assert_eq!(h.status().await.press_count, 0);
    }

    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.events.try_recv(), None);
    assert_eq!(h.dispatcher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_double_press_sends_nothing() {
    let mut h = Harness::connected(Some("jwt")).await;

    h.burst(2).await;
    assert_eq!(h.next_event().await, MonitorEvent::DoublePress);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.dispatcher.calls(), 0);
    assert_eq!(h.events.try_recv(), None);
}

#[tokio::test(start_paused = true)]
async fn test_triple_press_sends_exactly_one_alert() {
    let mut h = Harness::connected(Some("jwt")).await;

    h.burst(3).await;
    assert_eq!(h.next_event().await, MonitorEvent::TriplePress);
    assert_eq!(h.next_event().await, MonitorEvent::EmergencySent);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.dispatcher.calls(), 1);
    let (payload, token) = h.dispatcher.payloads.lock().unwrap()[0].clone();
    assert_eq!(token, "jwt");
    assert_eq!(payload.latitude, COORDS.latitude);
    assert_eq!(payload.longitude, COORDS.longitude);
    assert!(payload.message.starts_with("Emergency! Location: https://maps.google.com/?q="));
}

#[tokio::test(start_paused = true)]
async fn test_burst_window_restarts_on_each_press() {
    let mut h = Harness::connected(Some("jwt")).await;
    let start = Instant::now();

    assert!(h.button.press());
    sleep_until(start + Duration::from_millis(100)).await;
    assert!(h.button.press());

    assert_eq!(h.next_event().await, MonitorEvent::DoublePress);
    assert_eq!(start.elapsed(), Duration::from_millis(600));

    sleep_until(start + Duration::from_millis(700)).await;
    assert!(h.button.press());

    assert_eq!(
        h.next_event().await,
        MonitorEvent::PressesDetected { count: 1 }
    );
    assert_eq!(start.elapsed(), Duration::from_millis(1200));
    assert_eq!(h.dispatcher.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_open_burst_is_visible_in_status() {
    let h = Harness::connected(Some("jwt")).await;

    h.burst(2).await;
    assert_eq!(h.status().await.press_count, 2);
}

#[tokio::test(start_paused = true)]
async fn test_other_payloads_do_not_count() {
    let mut h = Harness::connected(Some("jwt")).await;

    assert!(h.button.notify(b"Battery: 80%"));
    sleep(Duration::from_secs(1)).await;
    assert_eq!(h.events.try_recv(), None);
    assert_eq!(h.status().await.press_count, 0);

    assert!(h.button.press());
    assert!(h.button.notify(b"hello"));
    assert!(h.button.press());
    assert_eq!(h.next_event().await, MonitorEvent::DoublePress);
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_failure_does_not_block_later_alerts() {
    let mut h = Harness::connected(Some("jwt")).await;
    h.dispatcher.fail_next("Twilio down");

    h.burst(3).await;
    assert_eq!(h.next_event().await, MonitorEvent::TriplePress);
    match h.next_event().await {
        MonitorEvent::EmergencyError { kind, detail } => {
            assert_eq!(kind, EmergencyErrorKind::DispatchFailed);
            assert!(detail.contains("Twilio down"));
        }
        other => panic!("expected emergency error, got {other:?}"),
    }

    h.burst(3).await;
    assert_eq!(h.next_event().await, MonitorEvent::TriplePress);
    assert_eq!(h.next_event().await, MonitorEvent::EmergencySent);
    assert_eq!(h.dispatcher.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_missing_credential_sends_nothing() {
    let mut h = Harness::connected(None).await;

    h.burst(3).await;
    assert_eq!(h.next_event().await, MonitorEvent::TriplePress);
    match h.next_event().await {
        MonitorEvent::EmergencyError { kind, .. } => {
            assert_eq!(kind, EmergencyErrorKind::AuthenticationRequired);
        }
        other => panic!("expected emergency error, got {other:?}"),
    }
    assert_eq!(h.dispatcher.calls(), 0);
    assert_eq!(h.status().await.state, MonitorState::Monitoring);
}

#[tokio::test(start_paused = true)]
async fn test_link_loss_rescans_and_reconnects() {
    let mut h = Harness::connected(Some("jwt")).await;

    assert!(h.button.drop_link());
    assert_eq!(h.next_event().await, MonitorEvent::DeviceDisconnected);

    let status = h.status().await;
    assert_eq!(status.state, MonitorState::Scanning);
    assert_eq!(status.device, None);
    assert_eq!(h.radio.scans_started(), 2);
    assert!(h.radio.is_scanning());

    assert!(h.radio.advertise(&h.button));
    assert_eq!(
        h.next_event().await,
        MonitorEvent::DeviceConnected {
            device: BUTTON_ID.to_string()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_burst_open_at_link_loss_still_closes() {
    let mut h = Harness::connected(Some("jwt")).await;

    h.burst(3).await;
    assert!(h.button.drop_link());

    assert_eq!(h.next_event().await, MonitorEvent::DeviceDisconnected);
    assert_eq!(h.next_event().await, MonitorEvent::TriplePress);
    assert_eq!(h.next_event().await, MonitorEvent::EmergencySent);
    assert_eq!(h.dispatcher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_foreground_forces_rescan_while_scanning() {
    let h = Harness::scanning(Some("jwt")).await;

    h.handle.app_state_changed(AppState::Background).await.unwrap();
    assert_eq!(h.radio.scans_started(), 1);

    h.handle.app_state_changed(AppState::Active).await.unwrap();
    assert_eq!(h.radio.scans_started(), 2);
    assert_eq!(h.radio.max_concurrent_scans(), 1);

    // Active to active is not a transition.
    h.handle.app_state_changed(AppState::Active).await.unwrap();
    assert_eq!(h.radio.scans_started(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_foreground_cuts_backoff_short() {
    let h = Harness::scanning(Some("jwt")).await;
    h.button.set_fail_connect(true);
    assert!(h.radio.advertise(&h.button));
    sleep(Duration::from_millis(10)).await;
    assert!(h.status().await.rescan_pending);

    h.handle.app_state_changed(AppState::Inactive).await.unwrap();
    h.handle.app_state_changed(AppState::Active).await.unwrap();
    assert_eq!(h.radio.scans_started(), 2);
    assert!(!h.status().await.rescan_pending);

    // The cancelled backoff does not fire later.
    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.radio.scans_started(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_foreground_keeps_connection() {
    let h = Harness::connected(Some("jwt")).await;

    h.handle.app_state_changed(AppState::Background).await.unwrap();
    h.handle.app_state_changed(AppState::Active).await.unwrap();

    let status = h.status().await;
    assert_eq!(status.state, MonitorState::Monitoring);
    assert_eq!(status.app_state, AppState::Active);
    assert_eq!(h.radio.scans_started(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_foreground_before_initialize_is_ignored() {
    let h = Harness::new();

    h.handle.app_state_changed(AppState::Background).await.unwrap();
    h.handle.app_state_changed(AppState::Active).await.unwrap();

    assert_eq!(h.status().await.state, MonitorState::Idle);
    assert_eq!(h.radio.scans_started(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_start_scanning_ignored_while_monitoring() {
    let h = Harness::connected(Some("jwt")).await;

    h.handle.start_scanning().await.unwrap();

    assert_eq!(h.radio.scans_started(), 1);
    assert_eq!(h.status().await.state, MonitorState::Monitoring);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_disconnects_and_cancels_timers() {
    let mut h = Harness::connected(Some("jwt")).await;
    h.burst(3).await;

    h.handle.shutdown().await;
    assert_eq!(h.next_event().await, MonitorEvent::DeviceDisconnected);
    assert_eq!(h.button.disconnects(), 1);
    assert!(!h.radio.is_scanning());

    // The open burst never closes.
    sleep(Duration::from_secs(120)).await;
    assert_eq!(h.events.try_recv(), None);
    assert_eq!(h.dispatcher.calls(), 0);

    assert!(matches!(
        h.handle.status().await,
        Err(SurakshaError::MonitorStopped)
    ));
    assert!(matches!(
        h.handle.initialize().await,
        Err(SurakshaError::MonitorStopped)
    ));
    h.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_while_scanning() {
    let mut h = Harness::scanning(Some("jwt")).await;

    h.handle.shutdown().await;

    assert!(!h.radio.is_scanning());
    assert_eq!(h.radio.scans_stopped(), 1);
    sleep(Duration::from_secs(120)).await;
    assert_eq!(h.radio.scans_started(), 1);
    assert_eq!(h.events.try_recv(), None);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_lets_dispatch_finish() {
    let mut h = Harness::connected(Some("jwt")).await;

    h.burst(3).await;
    assert_eq!(h.next_event().await, MonitorEvent::TriplePress);
    h.handle.shutdown().await;

    let mut saw_sent = false;
    while let Ok(Some(event)) = timeout(Duration::from_secs(1), h.events.recv()).await {
        saw_sent |= event == MonitorEvent::EmergencySent;
    }
    assert!(saw_sent);
    assert_eq!(h.dispatcher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_manual_trigger() {
    let mut h = Harness::new();

    let receipt = h.handle.trigger_emergency().await.unwrap();
    assert!(receipt.message.contains("maps.google.com"));
    assert_eq!(h.next_event().await, MonitorEvent::EmergencySent);
    assert_eq!(h.dispatcher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_manual_trigger_outlives_its_caller() {
    let dispatcher = Arc::new(RecordingDispatcher {
        hang: true,
        ..RecordingDispatcher::default()
    });
    let bus = EventBus::default();
    let mut events = bus.subscribe();
    let emergency = Arc::new(service(Some("jwt"), Arc::clone(&dispatcher), bus));
    let handle = Monitor::new(MockTransport::new(), MonitorSettings::default(), emergency).spawn();

    let caller = tokio::spawn({
        let handle = handle.clone();
        async move { handle.trigger_emergency().await }
    });
    sleep(Duration::from_secs(1)).await;
    caller.abort();
    assert!(caller.await.unwrap_err().is_cancelled());
    assert_eq!(dispatcher.calls(), 1);

    let event = timeout(Duration::from_secs(60), events.recv())
        .await
        .expect("attempt ended without an outcome")
        .expect("event bus closed");
    assert!(matches!(
        event,
        MonitorEvent::EmergencyError {
            kind: EmergencyErrorKind::DispatchFailed,
            ..
        }
    ));
    assert_eq!(dispatcher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_every_handle_stops_the_monitor() {
    let h = Harness::connected(Some("jwt")).await;
    let Harness {
        radio,
        button,
        handle,
        ..
    } = h;

    drop(handle);
    sleep(Duration::from_millis(10)).await;

    assert_eq!(button.disconnects(), 1);
    assert!(!radio.is_scanning());
}

#[test]
fn test_settings_from_config() {
    let config = Config::from_toml_str(
        r#"
        [device]
        name = "Suraksha Band"
        press_pattern = "^PRESS$"

        [timing]
        debounce_ms = 750
        connect_backoff_secs = 5

        [dispatch]
        base_url = "http://192.0.2.1:3000"
        "#,
    )
    .unwrap();

    let settings = MonitorSettings::from_config(&config).unwrap();
    assert_eq!(settings.device_name, "Suraksha Band");
    assert_eq!(settings.debounce, Duration::from_millis(750));
    assert_eq!(settings.connect_backoff, Duration::from_secs(5));
    assert_eq!(settings.scan_safety_net, Duration::from_secs(60));
    assert_eq!(settings.decoder.decode(b"PRESS"), Notification::Press);
}

#[test]
fn test_status_serialization() {
    let status = MonitorStatus {
        state: MonitorState::Monitoring,
        device: Some(BUTTON_ID.to_string()),
        press_count: 1,
        rescan_pending: false,
        app_state: AppState::Background,
    };
    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["state"], "monitoring");
    assert_eq!(json["app_state"], "background");
    assert_eq!(json["device"], BUTTON_ID);
}
