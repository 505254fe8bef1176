// Verify the wire format the web client depends on.
// These tests pin field names and discriminators so pushes never silently change shape.

use chrono::Utc;
use moshunion_core::{
    venue::{CrowdEnergySnapshot, EnergyMetrics, VenueCapacitySnapshot, VenueRealtimeRecord},
    ConnId, MoshError, TourId,
};
use moshunion_protocol::{
    frames::{ClientFrame, ServerFrame},
    hello::Hello,
};

fn record(id: &str) -> VenueRealtimeRecord {
    VenueRealtimeRecord {
        tour_id: TourId::from(id),
        capacity: VenueCapacitySnapshot::new(20000, 17400, 17650),
        energy: CrowdEnergySnapshot::new(
            0.83,
            EnergyMetrics {
                social_buzz: 0.9,
                review_sentiment: 0.95,
                anticipation_score: 0.7,
                band_popularity: 1.0,
            },
            Utc::now(),
        ),
    }
}

#[test]
fn join_with_name() {
    let json = r#"{"type":"join","tourId":"msg-2026","name":"Lemmy"}"#;
    match ClientFrame::parse(json).unwrap() {
        ClientFrame::Join(p) => {
            assert_eq!(p.tour_id.as_str(), "msg-2026");
            assert_eq!(p.name.as_deref(), Some("Lemmy"));
            assert!(p.init.is_none());
        }
        other => panic!("expected join, got {other:?}"),
    }
}

#[test]
fn join_with_init_params() {
    let json = r#"{"type":"join","tourId":"hf-1","init":{"venue":"Hellfest","bandName":"Gojira","showDate":"2027-06-20"}}"#;
    let ClientFrame::Join(p) = ClientFrame::parse(json).unwrap() else {
        panic!("expected join");
    };
    let init = p.init.unwrap();
    assert_eq!(init.band_name, "Gojira");
    assert!(init.parse_show_date().is_some());
}

#[test]
fn leave_chat_ping() {
    assert_eq!(
        ClientFrame::parse(r#"{"type":"leave","tourId":"t"}"#).unwrap(),
        ClientFrame::Leave {
            tour_id: TourId::from("t")
        }
    );
    assert!(matches!(
        ClientFrame::parse(r#"{"type":"chat","tourId":"t","text":"\\m/"}"#).unwrap(),
        ClientFrame::Chat(ref c) if c.text == "\\m/"
    ));
    assert_eq!(
        ClientFrame::parse(r#"{"type":"ping"}"#).unwrap(),
        ClientFrame::Ping
    );
}

#[test]
fn unknown_type_is_protocol_error() {
    let err = ClientFrame::parse(r#"{"type":"subscribe","tourId":"t"}"#).unwrap_err();
    assert!(matches!(err, MoshError::Protocol(_)));
    assert_eq!(err.code(), "PROTOCOL_ERROR");

    let err = ClientFrame::parse(r#"{"type":"join"}"#).unwrap_err();
    assert!(matches!(err, MoshError::Protocol(_)));
}

#[test]
fn snapshot_push_shape() {
    let text = ServerFrame::snapshot(42, record("msg-2026")).to_text();
    let v: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(v["type"], "snapshot");
    assert_eq!(v["seq"], 42);
    assert_eq!(v["tourId"], "msg-2026");
    assert_eq!(v["capacity"]["venueCapacity"], 20000);
    assert_eq!(v["capacity"]["currentAttendance"], 17400);
    assert_eq!(v["capacity"]["capacityPercentage"], 87);
    assert_eq!(v["capacity"]["status"], "nearly_full");
    assert!((v["energy"]["energyLevel"].as_f64().unwrap() - 0.83).abs() < 1e-9);
    assert_eq!(v["energy"]["energyStatus"], "explosive");
    assert_eq!(v["energy"]["metrics"]["bandPopularity"], 1.0);
}

#[test]
fn snapshot_push_parses_back_into_record() {
    let original = record("rr-7");
    let text = ServerFrame::snapshot(1, original.clone()).to_text();
    let ServerFrame::Snapshot(push) = serde_json::from_str(&text).unwrap() else {
        panic!("expected snapshot");
    };
    assert_eq!(push.seq, 1);
    let parsed = push.into_record();
    assert_eq!(parsed.tour_id, original.tour_id);
    assert_eq!(parsed.capacity, original.capacity);
    assert_eq!(parsed.energy.energy_status, original.energy.energy_status);
    assert_eq!(parsed.energy.last_update, original.energy.last_update);
    assert!((parsed.energy.energy_level - original.energy.energy_level).abs() < 1e-9);
}

#[test]
fn error_frame_shape() {
    let text = ServerFrame::from_error(&MoshError::TourNotFound { id: "x".into() }).to_text();
    assert!(text.contains(r#""type":"error""#));
    assert!(text.contains(r#""code":"TOUR_NOT_FOUND""#));
}

#[test]
fn hello_carries_protocol_version() {
    let hello = ServerFrame::Hello(Hello::new(ConnId::from("c-1"), "0.1.0"));
    let v: serde_json::Value = serde_json::from_str(&hello.to_text()).unwrap();
    assert_eq!(v["type"], "hello");
    assert_eq!(v["protocol"], moshunion_core::config::PROTOCOL_VERSION);
    assert_eq!(v["connId"], "c-1");
    assert_eq!(hello.kind(), "hello");
}

#[test]
fn presence_and_left_use_camel_case() {
    let presence = ServerFrame::Presence(moshunion_protocol::frames::PresencePush {
        tour_id: TourId::from("t"),
        viewers: 3,
    })
    .to_text();
    assert!(presence.contains(r#""tourId":"t""#));
    assert!(presence.contains(r#""viewers":3"#));

    let left = ServerFrame::Left {
        tour_id: TourId::from("t"),
    }
    .to_text();
    assert_eq!(left, r#"{"type":"left","tourId":"t"}"#);
}
