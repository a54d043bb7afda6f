//! Outbound status / telemetry publishing, display feedback, and the log
//! mirror.

use core::fmt::Write;

use rackctl::app::lifecycle::DispatchOutcome;
use rackctl::app::ports::{MessagingEvent, MessagingPort};
use rackctl::error::{MessagingError, PublishError};
use serde_json::{Value, json};

use crate::mock_board::{CLIENT_ID, Call, Rig, recording_handler};

fn online() -> (Rig, rackctl::app::controller::Controller<crate::mock_board::MockBoard>) {
    let rig = Rig::new();
    let controller = rig.started(None, None);
    rig.broker_up.set(true);
    (rig, controller)
}

#[test]
fn status_is_published_then_tx_indicator_fires() {
    let (rig, mut controller) = online();
    let doc = json!({"index": 7, "type": "motion", "event": "on"});

    assert_eq!(controller.publish_status(&doc), Ok(()));

    let calls = rig.calls();
    let publish_at = calls
        .iter()
        .position(|c| matches!(c, Call::Publish(..)))
        .unwrap();
    assert_eq!(calls.get(publish_at + 1), Some(&Call::TxLed));

    let (topic, payload) = &rig.published()[0];
    assert_eq!(topic, &format!("stat/{CLIENT_ID}"));
    assert_eq!(serde_json::from_slice::<Value>(payload).unwrap(), doc);
}

#[test]
fn indexed_status_is_summarised_on_display() {
    let (rig, mut controller) = online();

    controller
        .publish_status(&json!({"index": 7, "type": "motion", "event": "on"}))
        .unwrap();
    controller
        .publish_status(&json!({"index": 12, "type": "button", "event": "button"}))
        .unwrap();

    let lines: Vec<String> = rig
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::ShowEvent(line) => Some(line),
            _ => None,
        })
        .collect();
    assert_eq!(lines, ["[  7] motion on", "[ 12] button"]);
}

#[test]
fn status_without_index_skips_display() {
    let (rig, mut controller) = online();
    controller.publish_status(&json!({"temp": 21.5})).unwrap();
    assert!(!rig.calls().iter().any(|c| matches!(c, Call::ShowEvent(_))));
    assert_eq!(rig.published().len(), 1);
}

#[test]
fn offline_publish_short_circuits_without_touching_messaging() {
    let (rig, mut controller) = online();
    rig.link.set(false);

    let result = controller.publish_status(&json!({"index": 3, "event": "open"}));

    assert_eq!(result, Err(PublishError::Offline));
    let calls = rig.calls();
    assert!(calls.contains(&Call::ShowEvent("[  3] open".into())), "display still updated");
    assert!(!calls.iter().any(|c| matches!(c, Call::Publish(..) | Call::TxLed)));

    assert_eq!(
        controller.publish_telemetry(&json!({"uptime": 1})),
        Err(PublishError::Offline)
    );
}

#[test]
fn telemetry_uses_tele_topic_and_no_display() {
    let (rig, mut controller) = online();

    controller.publish_telemetry(&json!({"index": 1, "uptime": 60})).unwrap();

    assert_eq!(rig.published()[0].0, format!("tele/{CLIENT_ID}"));
    assert!(!rig.calls().iter().any(|c| matches!(c, Call::ShowEvent(_))));
}

#[test]
fn broker_rejection_is_reported() {
    let (rig, mut controller) = online();
    rig.broker_up.set(false);

    assert_eq!(
        controller.publish_telemetry(&json!({})),
        Err(PublishError::Rejected(MessagingError::NotConnected))
    );
    assert!(!rig.calls().contains(&Call::TxLed));
}

#[test]
fn prefix_and_suffix_shape_outbound_topics() {
    let (rig, mut controller) = online();
    {
        let settings = controller.messaging_mut().settings_mut();
        settings.topic_prefix = Some("site1".into());
        settings.topic_suffix = Some("rack".into());
    }

    controller.publish_status(&json!({})).unwrap();

    assert_eq!(rig.published()[0].0, format!("site1/stat/{CLIENT_ID}/rack"));
}

// ── Log mirror ────────────────────────────────────────────────

#[test]
fn log_lines_are_mirrored_to_log_topic() {
    let (rig, mut controller) = online();

    write!(controller, "first line\nsecond ").unwrap();
    writeln!(controller, "line").unwrap();

    let published = rig.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0], (format!("log/{CLIENT_ID}"), b"first line".to_vec()));
    assert_eq!(published[1].1, b"second line".to_vec());
    assert!(!rig.calls().contains(&Call::TxLed), "log lines leave the TX indicator alone");
}

#[test]
fn dispatch_failures_are_mirrored_to_log_topic() {
    let (rig, mut controller) = online();

    assert_eq!(
        controller.receive(&format!("conf/{CLIENT_ID}"), b"{bad"),
        DispatchOutcome::MalformedPayload
    );
    controller.receive(&format!("cmnd/{CLIENT_ID}"), br#"{"identify":true}"#);

    assert_eq!(
        rig.published(),
        vec![
            (
                format!("log/{CLIENT_ID}"),
                b"[2] failed to deserialise mqtt json payload".to_vec()
            ),
            (format!("log/{CLIENT_ID}"), b"[4] no mqtt command handler".to_vec()),
        ]
    );
    assert!(!rig.calls().contains(&Call::TxLed));
}

#[test]
fn successful_deliveries_stay_on_serial() {
    let rig = Rig::new();
    let (handler, _seen) = recording_handler();
    let mut controller = rig.started(Some(handler), None);
    rig.broker_up.set(true);

    assert_eq!(
        controller.receive(&format!("conf/{CLIENT_ID}"), b"{}"),
        DispatchOutcome::Delivered
    );
    assert!(rig.published().is_empty());
}

#[test]
fn connection_loss_is_mirrored_once_the_session_is_back() {
    let (rig, mut controller) = online();
    rig.broker_up.set(false);
    rig.push_inbound(MessagingEvent::Disconnected(-3));
    controller.service();
    assert!(rig.published().is_empty(), "nothing to publish through");

    rig.broker_up.set(true);
    rig.push_inbound(MessagingEvent::Disconnected(4));
    controller.service();
    assert_eq!(
        rig.published(),
        vec![(format!("log/{CLIENT_ID}"), b"[4] mqtt bad credentials".to_vec())]
    );
}

#[test]
fn events_are_not_mirrored_while_link_is_down() {
    let (rig, mut controller) = online();
    rig.link.set(false);

    controller.receive(&format!("conf/{CLIENT_ID}"), b"");
    writeln!(controller, "offline line").unwrap();

    assert!(rig.published().is_empty());
}

#[test]
fn log_lines_stay_local_without_broker() {
    let (rig, mut controller) = online();
    rig.broker_up.set(false);

    writeln!(controller, "quiet").unwrap();

    assert!(rig.published().is_empty());
}

#[test]
fn overlong_log_line_is_split() {
    let (rig, mut controller) = online();

    writeln!(controller, "{}", "x".repeat(200)).unwrap();

    let published = rig.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].1.len(), 128);
    assert_eq!(published[1].1.len(), 72);
}
