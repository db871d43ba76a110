//! Integration tests for the Hexpulse engine.
//!
//! These tests drive whole sessions through the public API: joining,
//! setup placements, pulses, collection and bots.

use hexpulse_core::*;

/// Place a request that must be accepted
fn accept(session: &mut GameSession, player: PlayerId, request: ClientRequest) -> Vec<Outbound> {
    let out = session.handle(player, request.clone());
    if let Some(rejected) = out.iter().find_map(|o| match &o.event {
        ServerEvent::Rejected(r) => Some(r.clone()),
        _ => None,
    }) {
        panic!("{:?} was rejected: {}", request, rejected.message);
    }
    out
}

fn place(blueprint: &str, snap_key: &str) -> ClientRequest {
    ClientRequest::PlaceFoundation {
        blueprint: blueprint.to_string(),
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        snap_key: snap_key.to_string(),
    }
}

fn deposit(foundation_id: u32, resource: &str) -> ClientRequest {
    ClientRequest::DepositResource {
        foundation_id,
        resource: resource.to_string(),
    }
}

fn inland_vertex(session: &GameSession) -> String {
    session
        .board()
        .vertices
        .values()
        .find(|v| v.tiles.len() == 3)
        .expect("board has inland vertices")
        .key
        .clone()
}

/// Place and fully pay for a first town
fn settle(session: &mut GameSession, player: PlayerId, vertex: &str) -> u32 {
    let out = accept(session, player, place("Settlement", vertex));
    let id = out
        .iter()
        .find_map(|o| match o.event {
            ServerEvent::FoundationPlaced { foundation_id, .. } => Some(foundation_id),
            _ => None,
        })
        .expect("foundation placed");
    for resource in ["Wood", "Brick", "Wheat", "Wool"] {
        accept(session, player, deposit(id, resource));
    }
    id
}

/// Force a pulse and let the roll window close
fn run_pulse(session: &mut GameSession) -> Vec<Outbound> {
    session.force_pulse();
    let mut out = session.tick(0.1);
    out.extend(session.tick(3.0));
    out
}

#[test]
fn test_session_board_shape() {
    let session = GameSession::new(GameConfig::default(), 1).unwrap();
    let board = session.board();
    assert_eq!(board.tiles.len(), 19);
    assert_eq!(board.vertices.len(), 54);
    assert_eq!(board.edges.len(), 72);
    assert!(board.ports_respect_distance_rule());
}

#[test]
fn test_invalid_config_fails_fast() {
    let config = GameConfig {
        rings: 0,
        ..GameConfig::default()
    };
    assert!(matches!(
        GameSession::new(config, 1),
        Err(BoardError::NoRings)
    ));
}

#[test]
fn test_partial_config_json() {
    let config = GameConfig::from_json(r#"{"rings": 3, "max_stack": 20}"#).unwrap();
    let session = GameSession::new(config, 2).unwrap();
    assert_eq!(session.board().tiles.len(), 37);
    assert_eq!(session.config().pulse_interval, 60.0);
}

#[test]
fn test_distance_rule_between_players() {
    let mut session = GameSession::new(GameConfig::default(), 3).unwrap();
    let ana = session.join("Ana", PlayerKind::Human, &mut NullSink);
    let ben = session.join("Ben", PlayerKind::Human, &mut NullSink);

    let vertex = inland_vertex(&session);
    accept(&mut session, ana, place("Settlement", &vertex));

    let neighbor = session.board().vertex(&vertex).unwrap().neighbors[0].clone();
    let out = session.handle(ben, place("Settlement", &neighbor));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].to, Recipient::Player(ben));
    match &out[0].event {
        ServerEvent::Rejected(r) => assert_eq!(r.kind, RejectionKind::DistanceRule),
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_unfunded_foundations_cannot_chain_across_the_map() {
    let config = GameConfig {
        starting_resources: Cost::from([(Resource::Wood, 1), (Resource::Wheat, 1)]),
        ..GameConfig::default()
    };
    let mut session = GameSession::new(config, 11).unwrap();
    let ana = session.join("Ana", PlayerKind::Human, &mut NullSink);
    let vertex = inland_vertex(&session);
    accept(&mut session, ana, place("Settlement", &vertex));

    // Try every spot on the board, the way a greedy client would
    let edges: Vec<String> = session.board().edges.keys().cloned().collect();
    let vertices: Vec<String> = session.board().vertices.keys().cloned().collect();
    for _ in 0..3 {
        for edge in &edges {
            session.handle(ana, place("Road", edge));
        }
        for key in &vertices {
            session.handle(ana, place("Settlement", key));
        }
    }

    // Only the setup town and its setup road could be reserved
    assert_eq!(session.board().structures.len(), 1);
    assert_eq!(session.board().roads.len(), 1);
    assert_eq!(session.foundations().pending().count(), 2);
    assert_eq!(session.player(ana).unwrap().ledger.total(), 2);

    let out = session.handle(ana, place("Road", &edges[0]));
    match &out[0].event {
        ServerEvent::Rejected(r) => assert_eq!(r.kind, RejectionKind::FoundationPending),
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_settlement_claims_tiles_for_its_owner() {
    let mut session = GameSession::new(GameConfig::default(), 4).unwrap();
    let ana = session.join("Ana", PlayerKind::Human, &mut NullSink);
    let vertex = inland_vertex(&session);
    settle(&mut session, ana, &vertex);

    let tiles = &session.board().vertex(&vertex).unwrap().tiles;
    for tile in tiles {
        assert!(session.ownership().player_owns_tile(ana, *tile));
        assert_eq!(session.ownership().owner(*tile).unwrap().player_name, "Ana");
    }
    assert!(session.player(ana).unwrap().ledger.is_empty());
}

#[test]
fn test_pulse_resolves_after_roll_window() {
    let mut session = GameSession::new(GameConfig::default(), 5).unwrap();
    let ana = session.join("Ana", PlayerKind::Human, &mut NullSink);
    let vertex = inland_vertex(&session);
    settle(&mut session, ana, &vertex);

    let out = run_pulse(&mut session);
    let phases: Vec<PulsePhase> = out
        .iter()
        .filter_map(|o| match o.event {
            ServerEvent::PulseEvent { phase, .. } => Some(phase),
            _ => None,
        })
        .collect();
    assert_eq!(phases.len(), 2);
    assert_eq!(phases[0], PulsePhase::RollStart);

    let spawned = out
        .iter()
        .filter(|o| matches!(o.event, ServerEvent::ResourceSpawned { .. }))
        .count();
    match out.iter().rev().find_map(|o| match o.event {
        ServerEvent::PulseEvent {
            phase,
            total,
            matching_tiles,
            ..
        } => Some((phase, total, matching_tiles)),
        _ => None,
    }) {
        Some((PulsePhase::Robber, 7, None)) => assert_eq!(spawned, 0),
        Some((PulsePhase::RollComplete, total, Some(count))) => {
            assert_eq!(count, session.board().matching_tiles(total).len());
            assert_eq!(spawned, count);
        }
        other => panic!("unexpected pulse resolution {:?}", other),
    }
    assert_eq!(session.pulse().state(), PulseState::Running);
}

#[test]
fn test_collect_spawn_on_own_tile() {
    let mut session = GameSession::new(GameConfig::default(), 6).unwrap();
    let ana = session.join("Ana", PlayerKind::Human, &mut NullSink);
    let vertex = inland_vertex(&session);
    settle(&mut session, ana, &vertex);

    // Roll until something lands on one of Ana's tiles
    let mut target = None;
    for _ in 0..200 {
        let out = run_pulse(&mut session);
        target = out.iter().find_map(|o| match o.event {
            ServerEvent::ResourceSpawned {
                collectible_id,
                resource,
                tile,
                position,
            } if session.ownership().player_owns_tile(ana, tile) => {
                Some((collectible_id, resource, position))
            }
            _ => None,
        });
        if target.is_some() {
            break;
        }
    }
    let (id, resource, position) = target.expect("a pulse produced on an owned tile");
    let before = session.player(ana).unwrap().ledger.get(resource);

    accept(&mut session, ana, ClientRequest::UpdatePosition { position });
    let out = session.tick(0.1);
    assert!(out.iter().any(|o| matches!(
        o.event,
        ServerEvent::Collected { collectible_id, player, .. } if collectible_id == id && player == ana
    )));
    assert_eq!(session.player(ana).unwrap().ledger.get(resource), before + 1);
    assert!(session.collection().get(id).is_none());
}

#[test]
fn test_events_serialize_with_envelope() {
    let mut session = GameSession::new(GameConfig::default(), 7).unwrap();
    let ana = session.join("Ana", PlayerKind::Human, &mut NullSink);
    let out = session.handle(ana, ClientRequest::GetInventory);
    let json = serde_json::to_value(&out[0].event).unwrap();
    assert_eq!(json["type"], "ResourceUpdate");
    assert_eq!(json["payload"]["resources"]["Wood"], 2);

    let board = serde_json::to_value(session.board()).unwrap();
    assert_eq!(board["tiles"].as_array().unwrap().len(), 19);
}

#[test]
fn test_bots_play_a_session() {
    let mut session = GameSession::new(GameConfig::default(), 8).unwrap();
    let mut bots: Vec<Bot> = (0..3)
        .map(|i| {
            let id = session.join(&format!("Bot {}", i + 1), PlayerKind::Bot, &mut NullSink);
            Bot::with_seed(id, BotDifficulty::Medium, 100 + i)
        })
        .collect();

    for _ in 0..150 {
        for bot in &mut bots {
            if let Some(request) = bot.decide(&session) {
                accept(&mut session, bot.player_id(), request);
            }
        }
        session.tick(1.0);
    }

    assert!(session.all_ready());
    assert!(session.pulse().pulses() >= 1);
    for player in session.players() {
        assert!(player.is_synthetic());
        assert!(!session.ownership().player_tiles(player.id).is_empty());
    }
}

#[test]
fn test_leaving_frees_tiles_for_others() {
    let mut session = GameSession::new(GameConfig::default(), 9).unwrap();
    let ana = session.join("Ana", PlayerKind::Human, &mut NullSink);
    let vertex = inland_vertex(&session);
    settle(&mut session, ana, &vertex);

    let mut out: Vec<Outbound> = Vec::new();
    session.leave(ana, &mut out);
    assert!(out.iter().all(|o| o.to == Recipient::All));
    assert!(session.ownership().is_empty());

    let ben = session.join("Ben", PlayerKind::Human, &mut NullSink);
    settle(&mut session, ben, &vertex);
    assert_eq!(session.ownership().len(), 3);
}
