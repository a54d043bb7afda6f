//! Bring-up sequencing and the connectivity-gated servicing cycle.

use std::net::Ipv4Addr;

use rackctl::app::events::ControllerEvent;
use rackctl::app::lifecycle::ConnectionOutcome;
use rackctl::app::ports::{MessagingEvent, StatusBar};
use rackctl::config::ControllerConfig;
use rackctl::error::{ConfigError, Error};

use crate::mock_board::{CLIENT_ID, Call, LEASE_IP, Rig};

const ETH_MAC: [u8; 6] = [0x24, 0x0A, 0xC4, 0xAA, 0xBB, 0xCC];

// ── Bring-up ──────────────────────────────────────────────────

#[test]
fn bring_up_runs_steps_in_order() {
    let rig = Rig::new();
    let mut controller = rig.controller();
    controller.begin(None, None).unwrap();

    let steps: Vec<Call> = rig
        .calls()
        .into_iter()
        .filter(|c| !matches!(c, Call::Event(_)))
        .collect();
    assert_eq!(
        steps,
        vec![
            Call::DisplayBegin,
            Call::DrawHeader,
            Call::NetInit(ETH_MAC),
            Call::Reset(true),
            Call::DelayMs(250),
            Call::Reset(false),
            Call::DelayMs(50),
            Call::Reset(true),
            Call::DelayMs(350),
            Call::Lease {
                timeout_ms: 15_000,
                response_timeout_ms: 4_000
            },
            Call::ApiBegin,
            Call::ApiListen(80),
        ]
    );
}

#[test]
fn bring_up_reports_each_stage() {
    let rig = Rig::new();
    rig.controller().begin(None, None).unwrap();

    let events = rig.events();
    assert!(matches!(events.first(), Some(ControllerEvent::Started(_))));
    assert!(events.contains(&ControllerEvent::MacDerived(ETH_MAC)));
    assert!(events.contains(&ControllerEvent::LeaseAcquired(LEASE_IP)));
    assert_eq!(events.last(), Some(&ControllerEvent::ApiListening(80)));
}

#[test]
fn derived_identity_becomes_default_client_id() {
    let rig = Rig::new();
    let mut controller = rig.controller();
    assert!(controller.identity().is_none());

    let identity = controller.begin(None, None).unwrap().clone();
    assert_eq!(identity.client_id.as_str(), CLIENT_ID);
    assert_eq!(identity.mac, ETH_MAC);
    assert_eq!(controller.mqtt_settings().client_id, CLIENT_ID);
}

#[test]
fn stored_client_id_overrides_derived_default() {
    let rig = Rig::new();
    *rig.stored_client_id.borrow_mut() = Some("rack-7".into());
    let mut controller = rig.controller();
    controller.begin(None, None).unwrap();

    assert_eq!(controller.mqtt_settings().client_id, "rack-7");
    assert_eq!(
        controller.identity().unwrap().client_id.as_str(),
        CLIENT_ID,
        "identity keeps the MAC-derived id"
    );
}

#[test]
fn failed_lease_still_completes_bring_up() {
    let rig = Rig::new();
    rig.lease.set(None);
    let mut controller = rig.controller();

    assert!(controller.begin(None, None).is_ok());
    assert!(rig.events().contains(&ControllerEvent::LeaseFailed));
    assert!(rig.calls().contains(&Call::ApiListen(80)));
    assert_eq!(controller.adoption()["network"]["ip"], "0.0.0.0");
}

#[test]
fn reset_line_failure_aborts_before_lease() {
    let rig = Rig::new();
    rig.pin_fails.set(true);
    let mut controller = rig.controller();

    assert!(matches!(controller.begin(None, None), Err(Error::Init(_))));
    assert!(
        !rig.calls()
            .iter()
            .any(|c| matches!(c, Call::Lease { .. } | Call::ApiBegin))
    );
    assert!(controller.identity().is_none());
}

#[test]
fn invalid_config_fails_before_touching_hardware() {
    let rig = Rig::new();
    let config = ControllerConfig {
        api_port: 0,
        ..ControllerConfig::default()
    };
    let mut controller = rig.controller_with(config);

    assert!(matches!(
        controller.begin(None, None),
        Err(Error::Config(ConfigError::ValidationFailed(_)))
    ));
    assert!(rig.calls().is_empty());
}

// ── Servicing cycle ───────────────────────────────────────────

#[test]
fn link_down_skips_network_work_but_services_display() {
    let rig = Rig::new();
    let mut controller = rig.started(None, None);
    rig.link.set(false);

    controller.service();

    assert!(!controller.is_connected());
    assert_eq!(
        rig.calls(),
        vec![Call::DisplayService(StatusBar {
            link_up: false,
            ip: LEASE_IP,
            mqtt_connected: false,
        })]
    );
}

#[test]
fn link_up_services_everything_in_order() {
    let rig = Rig::new();
    let mut controller = rig.started(None, None);

    controller.service();

    assert_eq!(
        rig.calls(),
        vec![
            Call::Maintain,
            Call::MqttService,
            Call::ApiService,
            Call::DisplayService(StatusBar {
                link_up: true,
                ip: LEASE_IP,
                mqtt_connected: false,
            }),
        ]
    );
}

#[test]
fn gate_follows_live_link_status() {
    let rig = Rig::new();
    let controller = rig.started(None, None);
    assert!(controller.is_connected());
    rig.link.set(false);
    assert!(!controller.is_connected());
    rig.link.set(true);
    assert!(controller.is_connected());
}

#[test]
fn connect_subscribes_and_publishes_adoption() {
    let rig = Rig::new();
    let mut controller = rig.started(None, None);
    rig.broker_up.set(true);
    rig.push_inbound(MessagingEvent::Connected);

    controller.service();

    let calls = rig.calls();
    assert!(calls.contains(&Call::Subscribe(format!("conf/{CLIENT_ID}"))));
    assert!(calls.contains(&Call::Subscribe(format!("cmnd/{CLIENT_ID}"))));

    let published = rig.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].0, format!("adopt/{CLIENT_ID}"));
    assert_eq!(
        published[1],
        (format!("log/{CLIENT_ID}"), b"mqtt connected".to_vec())
    );
    assert_eq!(
        calls.iter().filter(|c| **c == Call::TxLed).count(),
        1,
        "only the adoption publish drives the TX indicator"
    );
    let doc: serde_json::Value = serde_json::from_slice(&published[0].1).unwrap();
    let keys: Vec<_> = doc.as_object().unwrap().keys().cloned().collect();
    assert_eq!(
        keys,
        ["firmware", "system", "network", "configSchema", "commandSchema"]
    );
    assert!(rig.events().contains(&ControllerEvent::MessagingConnected));
}

#[test]
fn disconnect_codes_are_classified() {
    let rig = Rig::new();
    let mut controller = rig.started(None, None);
    rig.push_inbound(MessagingEvent::Disconnected(-2));
    rig.push_inbound(MessagingEvent::Disconnected(0));
    rig.push_inbound(MessagingEvent::Disconnected(5));

    controller.service();

    assert_eq!(
        rig.events(),
        vec![
            ControllerEvent::Connection(ConnectionOutcome::ConnectFailed),
            ControllerEvent::Connection(ConnectionOutcome::Unauthorized),
        ]
    );
}

#[test]
fn api_answers_adoption_with_live_document() {
    let rig = Rig::new();
    let mut controller = rig.started(None, None);
    controller.set_config_schema(serde_json::json!({
        "inputs": {"type": "array"}
    }));

    controller.service();

    let adoptions = rig.adoptions.borrow();
    let doc = adoptions.last().unwrap();
    let props = &doc["configSchema"]["properties"];
    assert_eq!(props["inputs"]["type"], "array");
    assert_eq!(props["activeBrightnessPercent"]["maximum"], 100);
    assert_eq!(doc["network"]["mac"], "24:0A:C4:AA:BB:CC");
    assert_eq!(doc["network"]["ip"], LEASE_IP.to_string());
    assert_eq!(doc["system"]["heapFreeBytes"], 4096);
    assert_eq!(doc["system"]["sketchSpaceUsedBytes"], 1_200_000);
    assert_eq!(doc["system"]["sketchSpaceTotalBytes"], 1_536_000);
}

#[test]
fn adoption_before_begin_uses_unspecified_network() {
    let rig = Rig::new();
    let controller = rig.controller();
    let doc = controller.adoption();
    assert_eq!(doc["network"]["ip"], Ipv4Addr::UNSPECIFIED.to_string());
    assert_eq!(doc["network"]["mac"], "00:00:00:00:00:00");
}
