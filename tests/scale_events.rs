//! End-to-end tests of the driver over the mock transport.

use std::sync::Arc;
use std::time::Duration;

use rust_fxfz::{
    Command, FxfzScale, MockHandle, MockTransport, ScaleConfig, ScaleError, ScaleEvent, Unit,
};
use tokio::sync::broadcast::Receiver;
use tokio::time::timeout;

const SENTINEL: &str = "ZZ,sentinel";

async fn connected() -> (Arc<FxfzScale>, MockHandle, Receiver<ScaleEvent>) {
    let mock = MockTransport::new();
    let handle = mock.handle();
    let scale = Arc::new(FxfzScale::with_transport(ScaleConfig::mock(), mock));
    let mut rx = scale.subscribe();
    scale.clone().connect().await.expect("connect");
    assert_eq!(next(&mut rx).await, ScaleEvent::Open);
    (scale, handle, rx)
}

async fn next(rx: &mut Receiver<ScaleEvent>) -> ScaleEvent {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Injects the sentinel line and returns everything published before it.
async fn drain(handle: &MockHandle, rx: &mut Receiver<ScaleEvent>) -> Vec<ScaleEvent> {
    handle.inject(SENTINEL).unwrap();
    let mut events = Vec::new();
    loop {
        match next(rx).await {
            ScaleEvent::Data(line) if line == SENTINEL => {}
            ScaleEvent::Unhandled(line) if line == SENTINEL => return events,
            event => events.push(event),
        }
    }
}

fn count(events: &[ScaleEvent], name: &str) -> usize {
    events.iter().filter(|e| e.name() == name).count()
}

#[tokio::test]
async fn stable_reading_updates_state() {
    let (scale, handle, mut rx) = connected().await;

    handle.inject("ST,+0012.345 GN").unwrap();
    let events = drain(&handle, &mut rx).await;

    assert_eq!(
        events,
        vec![
            ScaleEvent::Data("ST,+0012.345 GN".to_string()),
            ScaleEvent::Weight(12.345),
            ScaleEvent::Unit(Some(Unit::Grains)),
            ScaleEvent::Stable(true),
        ]
    );
    assert_eq!(scale.weight().await, 12.345);
    assert_eq!(scale.unit().await, Some(Unit::Grains));
    assert!(scale.stable().await);
    assert!(scale.stable_duration().await.is_some());
}

#[tokio::test]
async fn identical_readings_emit_data_per_line_only() {
    let (_scale, handle, mut rx) = connected().await;

    handle.inject("ST,+0012.345 GN").unwrap();
    handle.inject("ST,+0012.345 GN").unwrap();
    let events = drain(&handle, &mut rx).await;

    assert_eq!(count(&events, "data"), 2);
    assert_eq!(count(&events, "weight"), 1);
    assert_eq!(count(&events, "unit"), 1);
    assert_eq!(count(&events, "stable"), 1);
}

#[tokio::test]
async fn unstable_reading_after_stable() {
    let (scale, handle, mut rx) = connected().await;

    handle.inject("ST,+0012.345 GN").unwrap();
    drain(&handle, &mut rx).await;
    handle.inject("US,+0012.500 GN").unwrap();
    let events = drain(&handle, &mut rx).await;

    assert!(events.contains(&ScaleEvent::Weight(12.5)));
    assert!(events.contains(&ScaleEvent::Stable(false)));
    assert!(!scale.stable().await);
    assert_eq!(scale.stable_duration().await, None);
}

#[tokio::test]
async fn stable_duration_grows_while_stable() {
    let (scale, handle, mut rx) = connected().await;

    handle.inject("ST,+0001.000 GN").unwrap();
    drain(&handle, &mut rx).await;
    let first = scale.stable_duration().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    handle.inject("ST,+0001.000 GN").unwrap();
    drain(&handle, &mut rx).await;
    let second = scale.stable_duration().await.unwrap();

    assert!(second >= first);
    assert!(second >= Duration::from_millis(20));
}

#[tokio::test]
async fn model_query_round_trip_always_emits() {
    let (scale, handle, mut rx) = connected().await;
    handle.set_model("GX-200");

    scale.get_model_number().await.unwrap();
    scale.get_model_number().await.unwrap();
    let events = drain(&handle, &mut rx).await;

    assert_eq!(count(&events, "model"), 2);
    assert_eq!(scale.model().await, "GX-200");
    assert_eq!(handle.written(), vec!["?TN".to_string(), "?TN".to_string()]);
}

#[tokio::test]
async fn serial_query_sets_serial() {
    let (scale, handle, mut rx) = connected().await;

    scale.get_serial_number().await.unwrap();
    let events = drain(&handle, &mut rx).await;

    assert!(events.contains(&ScaleEvent::Serial("T0000001".to_string())));
    assert_eq!(scale.serial().await, "T0000001");
}

#[tokio::test]
async fn device_error_is_an_event_not_a_state_change() {
    let (scale, handle, mut rx) = connected().await;

    handle.inject("EC,E03").unwrap();
    handle.inject("EC,E42").unwrap();
    let events = drain(&handle, &mut rx).await;

    let errors: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ScaleEvent::Error(err) => Some((err.code.as_str(), err.description.as_str())),
            _ => None,
        })
        .collect();
    assert_eq!(errors, vec![("E03", "Timeout error"), ("E42", "Unknown error")]);
    assert_eq!(scale.snapshot().await, rust_fxfz::ScaleState::new());
}

#[tokio::test]
async fn undefined_command_error_description() {
    let (_scale, handle, mut rx) = connected().await;

    handle.inject("EC,E01").unwrap();
    let events = drain(&handle, &mut rx).await;
    match &events[1] {
        ScaleEvent::Error(err) => assert_eq!(err.description, "Undefined command error"),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn unknown_status_is_only_diagnostic() {
    let (scale, handle, mut rx) = connected().await;

    handle.inject("XY,1234").unwrap();
    let events = drain(&handle, &mut rx).await;

    assert_eq!(
        events,
        vec![
            ScaleEvent::Data("XY,1234".to_string()),
            ScaleEvent::Unhandled("XY,1234".to_string()),
        ]
    );
    assert_eq!(count(&events, "error"), 0);
    assert_eq!(scale.snapshot().await, rust_fxfz::ScaleState::new());
}

#[tokio::test]
async fn button_press_is_acknowledged() {
    let (scale, handle, mut rx) = connected().await;

    scale.re_zero().await.unwrap();
    scale.press_mode().await.unwrap();
    let events = drain(&handle, &mut rx).await;

    assert_eq!(
        events,
        vec![ScaleEvent::Data("AK".to_string()), ScaleEvent::Data("AK".to_string())]
    );
    assert_eq!(handle.written(), vec!["R".to_string(), "U".to_string()]);
}

#[tokio::test]
async fn print_reports_reading() {
    let (scale, handle, mut rx) = connected().await;
    handle.set_weight(3.5);

    scale.press_print().await.unwrap();
    drain(&handle, &mut rx).await;

    assert_eq!(scale.weight().await, 3.5);
    assert!(scale.stable().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_sends_all_reach_transport() {
    let (scale, handle, mut rx) = connected().await;

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let scale = Arc::clone(&scale);
            tokio::spawn(async move { scale.re_zero().await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    let events = drain(&handle, &mut rx).await;

    assert_eq!(handle.written().len(), 8);
    assert_eq!(count(&events, "data"), 8);
}

#[tokio::test]
async fn transport_error_is_forwarded_and_loop_continues() {
    let (scale, handle, mut rx) = connected().await;

    handle.inject_error("framing error").unwrap();
    handle.inject("TN,GX-200").unwrap();
    let events = drain(&handle, &mut rx).await;

    assert!(matches!(&events[0], ScaleEvent::TransportError(msg) if msg.contains("framing error")));
    assert_eq!(scale.model().await, "GX-200");
}

#[tokio::test]
async fn close_publishes_close_and_ends_loop() {
    let mock = MockTransport::new();
    let handle = mock.handle();
    let scale = Arc::new(FxfzScale::with_transport(ScaleConfig::mock(), mock));
    let mut rx = scale.subscribe();
    let task = scale.clone().connect().await.unwrap();
    assert_eq!(next(&mut rx).await, ScaleEvent::Open);

    scale.close().await.unwrap();
    assert_eq!(next(&mut rx).await, ScaleEvent::Close);
    timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
    assert!(!handle.is_open());

    let err = scale.send(Command::ModelNumber).await.unwrap_err();
    assert!(matches!(err, ScaleError::NotOpen));
    assert!(matches!(next(&mut rx).await, ScaleEvent::TransportError(_)));
}

#[tokio::test]
async fn open_failure_is_reported() {
    let config = ScaleConfig::new("/dev/does-not-exist-fxfz");
    let scale = Arc::new(FxfzScale::new(config));
    let mut rx = scale.subscribe();

    assert!(scale.clone().connect().await.is_err());
    assert!(matches!(next(&mut rx).await, ScaleEvent::TransportError(_)));
}
