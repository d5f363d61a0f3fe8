// End-to-end integration tests for the multiplayer pipeline.
//
// Each test starts a real server, connects real `TableClient`s (via
// `TestTableClient`), and verifies the full path:
// client → server authority → forward → other clients' dispatchers →
// identical mirrors.
//
// These tests exercise the same code paths as a live session; the only
// test-specific code is the synchronous wait loops in `TestTableClient`.

use std::collections::BTreeSet;
use std::sync::Arc;

use multiplayer_tests::TestTableClient;
use tabletop_model::{
    Asset, AssetStore, Campaign, Drawable, Guid, Layer, Pen, Rect, Role, Shape, Token, Zone,
    ZonePoint,
};
use tabletop_server::{ServerConfig, ServerHandle, start_server_with};

/// Small chunks so even test assets take several pump ticks.
const TEST_CHUNK_SIZE: usize = 64;

struct Fixture {
    handle: ServerHandle,
    ann: TestTableClient,
    bob: TestTableClient,
    zone_id: Guid,
    /// Token already in the zone at z-order 4.
    statue: Guid,
    /// Token already in the zone at z-order 1.
    barrel: Guid,
    /// Asset the server has and the clients do not.
    map: Asset,
}

/// Start a server seeded with one zone and one asset, connect a GM (Ann)
/// and a player (Bob), and wait until both have the campaign.
fn start_test_session() -> Fixture {
    let mut zone = Zone::new("Cellar");
    let mut statue = Token::new("Statue");
    statue.z_order = 4;
    let mut barrel = Token::new("Barrel");
    barrel.z_order = 1;
    let (statue_id, barrel_id) = (statue.id, barrel.id);
    zone.put_token(statue);
    zone.put_token(barrel);
    let zone_id = zone.id;
    let mut campaign = Campaign::new("Integration");
    campaign.put_zone(zone);

    let assets = Arc::new(AssetStore::new());
    let map = Asset::new("map.png", (0..1000u32).map(|i| (i % 251) as u8).collect());
    assets.put(map.clone());

    let config = ServerConfig {
        port: 0,
        session_name: "integration-test".into(),
        chunk_size: TEST_CHUNK_SIZE,
        pump_interval_ms: 5,
        ..ServerConfig::default()
    };
    let (handle, addr) = start_server_with(config, campaign, assets).unwrap();

    let ann = TestTableClient::connect(addr, "Ann", Role::Gm);
    let bob = TestTableClient::connect(addr, "Bob", Role::Player);
    for client in [&ann, &bob] {
        client.wait_until("campaign", |m| m.campaign.zone(zone_id).is_some());
    }
    ann.wait_until("Bob to join", |m| m.players.iter().any(|p| p.name == "Bob"));

    Fixture {
        handle,
        ann,
        bob,
        zone_id,
        statue: statue_id,
        barrel: barrel_id,
        map,
    }
}

fn z_order(client: &TestTableClient, zone_id: Guid, token_id: Guid) -> Option<i32> {
    client.read(|m| {
        m.campaign
            .zone(zone_id)
            .and_then(|z| z.token(token_id))
            .map(|t| t.z_order)
    })
}

fn finish(f: Fixture) {
    f.ann.disconnect();
    f.bob.disconnect();
    f.handle.stop();
}

// ---------------------------------------------------------------------------
// Test scenarios
// ---------------------------------------------------------------------------

#[test]
fn both_clients_start_from_the_same_campaign() {
    let f = start_test_session();
    let ann_campaign = f.ann.read(|m| m.campaign.clone());
    let bob_campaign = f.bob.read(|m| m.campaign.clone());
    assert_eq!(ann_campaign, bob_campaign);
    assert_eq!(f.bob.read(|m| m.current_zone), Some(f.zone_id));
    finish(f);
}

/// A new token gets the next z-order above the zone's maximum (4 → 5). The
/// sender learns it through a z-order correction, the other client through
/// the corrected `putToken`.
#[test]
fn new_token_z_order_is_reconciled() {
    let f = start_test_session();
    let token = Token::new("Elf");
    let token_id = token.id;
    f.ann.commands().put_token(f.zone_id, token).unwrap();

    f.ann.wait_until("z-order correction", |m| {
        m.campaign
            .zone(f.zone_id)
            .and_then(|z| z.token(token_id))
            .is_some_and(|t| t.z_order == 5)
    });
    f.bob
        .wait_until("corrected token", |m| {
            m.campaign
                .zone(f.zone_id)
                .is_some_and(|z| z.token(token_id).is_some())
        });
    assert_eq!(z_order(&f.bob, f.zone_id, token_id), Some(5));
    finish(f);
}

/// Bring-to-front is decided by the server and reaches the requester too.
#[test]
fn bring_to_front_reaches_everyone() {
    let f = start_test_session();
    f.bob
        .commands()
        .bring_tokens_to_front(f.zone_id, BTreeSet::from([f.barrel]))
        .unwrap();
    for client in [&f.ann, &f.bob] {
        client.wait_until("barrel on top", |m| {
            m.campaign
                .zone(f.zone_id)
                .and_then(|z| z.token(f.barrel))
                .is_some_and(|t| t.z_order == 5)
        });
    }
    assert_eq!(z_order(&f.ann, f.zone_id, f.statue), Some(4));
    finish(f);
}

/// An asset the client asks for arrives as a header plus chunks and is
/// verified and stored.
#[test]
fn asset_arrives_in_chunks() {
    let f = start_test_session();
    assert!(!f.bob.stores().assets.contains(&f.map.id));
    f.bob.commands().get_asset(f.map.id.clone()).unwrap();
    f.bob.wait_for_stores("map asset", |s| s.assets.contains(&f.map.id));
    let stored = f.bob.stores().assets.get(&f.map.id).unwrap();
    assert_eq!(stored.data, f.map.data);
    assert!(!f.ann.stores().assets.contains(&f.map.id));
    finish(f);
}

/// Drag updates are coalesced; a waypoint toggle flushes the latest
/// position first, so the other client sees both in order.
#[test]
fn drag_updates_flush_before_waypoints() {
    let f = start_test_session();
    let lead = f.statue;
    let ann = f.ann.commands();
    ann.start_token_move(f.zone_id, lead, BTreeSet::from([lead]))
        .unwrap();
    for x in 0..10 {
        ann.update_token_move(f.zone_id, lead, x * 10, 0).unwrap();
    }
    ann.toggle_token_move_waypoint(f.zone_id, lead, ZonePoint::new(50, 50))
        .unwrap();

    f.bob.wait_until("drag state", |m| {
        m.moves.get(&lead).is_some_and(|mv| {
            mv.at == Some(ZonePoint::new(90, 0)) && mv.waypoints == [ZonePoint::new(50, 50)]
        })
    });
    assert_eq!(f.bob.read(|m| m.moves[&lead].player.clone()), "Ann");

    ann.stop_token_move(f.zone_id, lead).unwrap();
    f.bob.wait_until("drag end", |m| m.moves.is_empty());
    finish(f);
}

/// Optimistic commands change the sender's mirror at once and reach the
/// others through the server.
#[test]
fn optimistic_rename_reaches_others() {
    let f = start_test_session();
    f.ann.commands().set_campaign_name("Night Raid").unwrap();
    f.ann.wait_until("local rename", |m| m.campaign.name == "Night Raid");
    f.bob.wait_until("remote rename", |m| m.campaign.name == "Night Raid");
    finish(f);
}

/// Drawings are not applied optimistically; the server echoes them to all.
#[test]
fn drawing_is_echoed_to_the_sender() {
    let f = start_test_session();
    let stroke = Drawable::new(Layer::Object, Shape::Rectangle(Rect::new(0, 0, 10, 10)));
    let stroke_id = stroke.id;
    f.bob.commands().draw(f.zone_id, Pen::default(), stroke).unwrap();
    for client in [&f.ann, &f.bob] {
        client.wait_until("drawing", |m| {
            m.campaign
                .zone(f.zone_id)
                .is_some_and(|z| z.drawables().iter().any(|d| d.id() == stroke_id))
        });
    }
    f.ann.commands().undo_draw(f.zone_id, stroke_id).unwrap();
    f.bob.wait_until("undo", |m| {
        m.campaign
            .zone(f.zone_id)
            .is_some_and(|z| z.drawables().is_empty())
    });
    finish(f);
}

#[test]
fn booted_player_is_disconnected() {
    let f = start_test_session();
    f.ann.commands().boot_player("Bob").unwrap();
    f.bob.wait_until("boot", |m| m.booted);
    f.ann
        .wait_until("Bob to leave", |m| m.players.iter().all(|p| p.name != "Bob"));
    finish(f);
}
