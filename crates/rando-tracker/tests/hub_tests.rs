//! Integration tests for the tracker hub.
//!
//! Socket tests bind the real server on an ephemeral loopback port and
//! talk to it with a `tokio-tungstenite` client. Debug route tests drive
//! the Axum `Router` directly via `tower::ServiceExt`.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::StreamExt;
use rando_proto::{TrackerPacket, decode};
use rando_tracker::{
    GameStateSource, HubConfig, HubError, MemorySource, TrackedStateDefinition, TrackerHub,
    build_router,
};
use rando_types::{StateId, TrackerUpdate};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tower::ServiceExt;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SKILL_BASH: StateId = StateId::new(6, 1000);
const TP_WELLSPRING: StateId = StateId::new(53632, 18181);
const RESOURCE_ORE: StateId = StateId::new(15, 1);
const UNTRACKED: StateId = StateId::new(999, 1);

fn test_config() -> HubConfig {
    HubConfig {
        port: 0,
        ..HubConfig::default()
    }
}

fn definitions() -> Vec<TrackedStateDefinition> {
    vec![
        TrackedStateDefinition::new(6, 1000, "skill_bash"),
        TrackedStateDefinition::teleporter(53632, 18181, "tp_wellspring"),
        TrackedStateDefinition::new(15, 1, "resource_gorlek_ore"),
    ]
}

fn make_hub(config: HubConfig) -> (Arc<TrackerHub<MemorySource>>, Arc<MemorySource>) {
    let source = Arc::new(MemorySource::new());
    let hub =
        TrackerHub::with_definitions(config, Arc::clone(&source), definitions()).unwrap();
    (Arc::new(hub), source)
}

async fn connect(hub: &TrackerHub<MemorySource>) -> Client {
    let addr = hub.local_addr().await;
    let (client, _) = connect_async(format!("ws://{addr}/")).await.unwrap();
    client
}

/// Next tracker packet, skipping control frames. `None` on close/timeout.
async fn next_packet(client: &mut Client) -> Option<TrackerPacket> {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .ok()??
            .ok()?;
        match message {
            Message::Binary(frame) => return decode(&frame).ok(),
            Message::Close(_) => return None,
            _ => {}
        }
    }
}

async fn read_baseline(client: &mut Client) -> Vec<TrackerPacket> {
    let mut packets = Vec::new();
    // Reset + one update per definition + flags.
    for _ in 0..definitions().len().saturating_add(2) {
        packets.push(next_packet(client).await.unwrap());
    }
    packets
}

#[tokio::test]
async fn new_client_gets_reset_snapshot_and_flags() {
    let (hub, source) = make_hub(test_config());
    source.apply_change(SKILL_BASH, 1).await;
    source.apply_change(TP_WELLSPRING, 3).await;
    source.apply_change(RESOURCE_ORE, 12).await;
    source
        .set_flags(vec!["NoHints".to_owned(), "RandomSpawn".to_owned()])
        .await;
    hub.start().await.unwrap();

    let mut client = connect(&hub).await;
    let baseline = read_baseline(&mut client).await;

    assert_eq!(
        baseline,
        vec![
            TrackerPacket::Reset,
            TrackerPacket::Update(TrackerUpdate::new("skill_bash", 1)),
            // Teleporter converter applies to the snapshot too.
            TrackerPacket::Update(TrackerUpdate::new("tp_wellspring", 1)),
            TrackerPacket::Update(TrackerUpdate::new("resource_gorlek_ore", 12)),
            TrackerPacket::Flags(vec!["NoHints".to_owned(), "RandomSpawn".to_owned()]),
        ]
    );

    hub.stop().await;
}

#[tokio::test]
async fn tracked_change_is_broadcast_to_every_client() {
    let (hub, source) = make_hub(test_config());
    hub.start().await.unwrap();
    let _follow = hub.follow(source.subscribe());

    let mut first = connect(&hub).await;
    let mut second = connect(&hub).await;
    read_baseline(&mut first).await;
    read_baseline(&mut second).await;

    source.apply_change(SKILL_BASH, 1).await;

    let expected = Some(TrackerPacket::Update(TrackerUpdate::new("skill_bash", 1)));
    assert_eq!(next_packet(&mut first).await, expected);
    assert_eq!(next_packet(&mut second).await, expected);

    hub.stop().await;
}

#[tokio::test]
async fn untracked_change_is_never_forwarded() {
    let (hub, source) = make_hub(test_config());
    hub.start().await.unwrap();

    let mut client = connect(&hub).await;
    read_baseline(&mut client).await;

    assert_eq!(hub.on_game_state_changed(UNTRACKED, 5).await, 0);
    // A tracked change afterwards must be the very next packet.
    source.apply_change(RESOURCE_ORE, 2).await;
    hub.on_game_state_changed(RESOURCE_ORE, 2).await;

    assert_eq!(
        next_packet(&mut client).await,
        Some(TrackerPacket::Update(TrackerUpdate::new(
            "resource_gorlek_ore",
            2
        )))
    );

    hub.stop().await;
}

#[tokio::test]
async fn converter_is_identical_on_both_paths() {
    let (hub, source) = make_hub(test_config());
    source.apply_change(TP_WELLSPRING, 3).await;
    hub.start().await.unwrap();

    let mut client = connect(&hub).await;
    let baseline = read_baseline(&mut client).await;
    assert!(baseline.contains(&TrackerPacket::Update(TrackerUpdate::new("tp_wellspring", 1))));

    hub.on_game_state_changed(TP_WELLSPRING, 3).await;
    hub.on_game_state_changed(TP_WELLSPRING, 2).await;
    assert_eq!(
        next_packet(&mut client).await,
        Some(TrackerPacket::Update(TrackerUpdate::new("tp_wellspring", 1)))
    );
    assert_eq!(
        next_packet(&mut client).await,
        Some(TrackerPacket::Update(TrackerUpdate::new("tp_wellspring", 0)))
    );

    hub.stop().await;
}

#[tokio::test]
async fn client_joining_mid_stream_gets_baseline_first() {
    let (hub, source) = make_hub(test_config());
    hub.start().await.unwrap();
    let _follow = hub.follow(source.subscribe());

    // Keep tracked and untracked updates flowing while the client joins.
    let writer = Arc::clone(&source);
    let churn = tokio::spawn(async move {
        for value in 0..200_i64 {
            writer.apply_change(UNTRACKED, value).await;
            writer.apply_change(SKILL_BASH, value & 1).await;
            writer.apply_change(RESOURCE_ORE, value).await;
            tokio::task::yield_now().await;
        }
    });

    let mut client = connect(&hub).await;
    let baseline = read_baseline(&mut client).await;
    churn.await.unwrap();

    assert_eq!(baseline.first(), Some(&TrackerPacket::Reset));
    let covered: Vec<String> = baseline
        .iter()
        .filter_map(|packet| match packet {
            TrackerPacket::Update(update) => Some(update.tracking_id.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        covered,
        vec!["skill_bash", "tp_wellspring", "resource_gorlek_ore"]
    );
    assert!(matches!(baseline.last(), Some(TrackerPacket::Flags(_))));

    // Whatever follows is incremental and never another Reset; the final
    // ore value eventually arrives.
    let mut last_ore = None;
    while let Ok(Some(packet)) =
        tokio::time::timeout(Duration::from_millis(500), next_packet(&mut client)).await
    {
        assert_ne!(packet, TrackerPacket::Reset);
        if let TrackerPacket::Update(update) = packet {
            if update.tracking_id == "resource_gorlek_ore" {
                last_ore = Some(update.value);
            }
        }
    }
    let snapshot_ore = baseline.iter().find_map(|packet| match packet {
        TrackerPacket::Update(u) if u.tracking_id == "resource_gorlek_ore" => Some(u.value),
        _ => None,
    });
    assert_eq!(last_ore.or(snapshot_ore), Some(199));

    hub.stop().await;
}

#[tokio::test]
async fn refresh_all_replays_baseline() {
    let (hub, source) = make_hub(test_config());
    hub.start().await.unwrap();

    let mut client = connect(&hub).await;
    read_baseline(&mut client).await;

    source.apply_change(SKILL_BASH, 1).await;
    assert_eq!(hub.refresh_all().await.unwrap(), 1);

    let replay = read_baseline(&mut client).await;
    assert_eq!(replay.first(), Some(&TrackerPacket::Reset));
    assert!(replay.contains(&TrackerPacket::Update(TrackerUpdate::new("skill_bash", 1))));

    hub.stop().await;
}

#[tokio::test]
async fn reconnected_source_triggers_refresh() {
    let (hub, source) = make_hub(test_config());
    hub.start().await.unwrap();
    let _follow = hub.follow(source.subscribe());

    let mut client = connect(&hub).await;
    read_baseline(&mut client).await;

    source.set_available(false);
    source.set_available(true);

    assert_eq!(next_packet(&mut client).await, Some(TrackerPacket::Reset));

    hub.stop().await;
}

#[tokio::test]
async fn port_in_use_is_reported() {
    let (first, _) = make_hub(test_config());
    let addr = first.start().await.unwrap();

    let (second, _) = make_hub(HubConfig {
        port: addr.port(),
        ..HubConfig::default()
    });
    let result = second.start().await;
    assert!(matches!(result, Err(HubError::Bind { .. })));
    assert!(!second.is_running());

    first.stop().await;
}

#[tokio::test]
async fn start_twice_is_rejected() {
    let (hub, _) = make_hub(test_config());
    let addr = hub.start().await.unwrap();
    let result = hub.start().await;
    assert!(matches!(result, Err(HubError::AlreadyRunning(a)) if a == addr));
    hub.stop().await;
}

#[tokio::test]
async fn running_state_follows_lifecycle() {
    let (hub, _) = make_hub(test_config());
    let mut running = hub.subscribe_running();
    assert!(!hub.is_running());

    hub.start().await.unwrap();
    assert!(hub.is_running());
    assert!(*running.borrow_and_update());

    hub.stop().await;
    assert!(!hub.is_running());
    running.changed().await.unwrap();
    assert!(!*running.borrow());
}

#[tokio::test]
async fn stop_closes_clients() {
    let (hub, _) = make_hub(test_config());
    hub.start().await.unwrap();

    let mut client = connect(&hub).await;
    read_baseline(&mut client).await;

    hub.stop().await;
    assert_eq!(next_packet(&mut client).await, None);
    assert_eq!(hub.client_count().await, 0);
}

#[tokio::test]
async fn debug_route_writes_through_source() {
    let (hub, source) = make_hub(HubConfig {
        debug_routes: true,
        ..test_config()
    });
    let app = build_router(Arc::clone(&hub), true);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/debug/states/skill_bash")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"value":1}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(source.get_values(&[SKILL_BASH]).await.unwrap(), vec![1]);
}

#[tokio::test]
async fn debug_route_unknown_id_is_404() {
    let (hub, _) = make_hub(test_config());
    let app = build_router(hub, true);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/debug/states/skill_nope")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"value":1}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn debug_route_source_down_is_503() {
    let (hub, source) = make_hub(test_config());
    source.set_available(false);
    let app = build_router(hub, true);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/debug/states/skill_bash")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"value":1}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn debug_route_is_absent_by_default() {
    let (hub, _) = make_hub(test_config());
    let app = build_router(hub, false);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/debug/states/skill_bash")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"value":1}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
