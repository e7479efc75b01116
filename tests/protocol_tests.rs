#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Protocol serialization tests for the Cinemoji client.
//!
//! Verifies round-trip serialization of every `ClientRequest` and
//! `ServerEvent` variant, the tagged JSON layout, and forward
//! compatibility with unknown event kinds.

use cinemoji_client::protocol::{
    ClientRequest, GameConfig, GamePhase, PlayerProfile, ScoreEntry, ServerEvent,
};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

/// Serialize `val` to JSON, then deserialize back to `T` and return it.
fn round_trip<T: serde::Serialize + serde::de::DeserializeOwned>(val: &T) -> T {
    let json = serde_json::to_string(val).expect("serialize");
    serde_json::from_str(&json).expect("deserialize")
}

fn profile(id: &str, name: &str) -> PlayerProfile {
    PlayerProfile {
        id: id.into(),
        display_name: name.into(),
        avatar_ref: format!("avatars/{id}.png"),
    }
}

// ════════════════════════════════════════════════════════════════════
// ClientRequest round-trips (5 variants)
// ════════════════════════════════════════════════════════════════════

#[test]
fn client_request_create_game_round_trip() {
    let request = ClientRequest::CreateGame {
        player: profile("alice", "Alice"),
        config: GameConfig {
            player_count: 4,
            round_count: 5,
            round_duration_secs: 60,
        },
    };
    let deser = round_trip(&request);
    if let ClientRequest::CreateGame { player, config } = deser {
        assert_eq!(player.id, "alice");
        assert_eq!(config.player_count, 4);
        assert_eq!(config.round_count, 5);
        assert_eq!(config.round_duration_secs, 60);
    } else {
        panic!("expected CreateGame");
    }
}

#[test]
fn client_request_join_game_round_trip() {
    let request = ClientRequest::JoinGame {
        session_id: "g1".into(),
        player: profile("bob", "Bob"),
    };
    let deser = round_trip(&request);
    if let ClientRequest::JoinGame { session_id, player } = deser {
        assert_eq!(session_id, "g1");
        assert_eq!(player.display_name, "Bob");
        assert_eq!(player.avatar_ref, "avatars/bob.png");
    } else {
        panic!("expected JoinGame");
    }
}

#[test]
fn client_request_start_game_round_trip() {
    let request = ClientRequest::StartGame {
        session_id: "g1".into(),
    };
    let deser = round_trip(&request);
    assert!(matches!(deser, ClientRequest::StartGame { session_id } if session_id == "g1"));
}

#[test]
fn client_request_submit_guess_preserves_opaque_payload() {
    let payload = serde_json::json!({
        "round": 3,
        "movie": "The Matrix",
        "emoji_seen": ["🕶", "💊"],
    });
    let request = ClientRequest::SubmitGuess {
        session_id: "g1".into(),
        payload: payload.clone(),
    };
    let deser = round_trip(&request);
    if let ClientRequest::SubmitGuess { session_id, payload: p } = deser {
        assert_eq!(session_id, "g1");
        assert_eq!(p, payload);
    } else {
        panic!("expected SubmitGuess");
    }
}

#[test]
fn client_request_leave_game_round_trip() {
    let request = ClientRequest::LeaveGame {
        session_id: "g1".into(),
    };
    let deser = round_trip(&request);
    assert!(matches!(deser, ClientRequest::LeaveGame { session_id } if session_id == "g1"));
}

// ════════════════════════════════════════════════════════════════════
// ServerEvent round-trips (5 known variants + Unknown)
// ════════════════════════════════════════════════════════════════════

#[test]
fn server_event_game_created_round_trip() {
    let event = ServerEvent::GameCreated {
        session_id: "g1".into(),
        creator_id: "alice".into(),
        config: GameConfig::default(),
    };
    let deser = round_trip(&event);
    if let ServerEvent::GameCreated {
        session_id,
        creator_id,
        config,
    } = deser
    {
        assert_eq!(session_id, "g1");
        assert_eq!(creator_id, "alice");
        assert_eq!(config, GameConfig::default());
    } else {
        panic!("expected GameCreated");
    }
}

#[test]
fn server_event_player_joined_round_trip() {
    let event = ServerEvent::PlayerJoined {
        session_id: "g1".into(),
        player: profile("bob", "Bob"),
    };
    let deser = round_trip(&event);
    assert!(matches!(
        deser,
        ServerEvent::PlayerJoined { session_id, player }
            if session_id == "g1" && player.id == "bob"
    ));
}

#[test]
fn server_event_player_left_round_trip() {
    let event = ServerEvent::PlayerLeft {
        session_id: "g1".into(),
        player_id: "bob".into(),
    };
    let deser = round_trip(&event);
    assert!(matches!(
        deser,
        ServerEvent::PlayerLeft { session_id, player_id }
            if session_id == "g1" && player_id == "bob"
    ));
}

#[test]
fn server_event_game_started_round_trip() {
    let event = ServerEvent::GameStarted {
        session_id: "g1".into(),
    };
    let deser = round_trip(&event);
    assert!(matches!(deser, ServerEvent::GameStarted { session_id } if session_id == "g1"));
}

#[test]
fn server_event_game_finished_round_trip() {
    let event = ServerEvent::GameFinished {
        session_id: "g1".into(),
        results: vec![
            ScoreEntry {
                player_id: "alice".into(),
                score: 30,
            },
            ScoreEntry {
                player_id: "bob".into(),
                score: -5,
            },
        ],
    };
    let deser = round_trip(&event);
    if let ServerEvent::GameFinished {
        session_id,
        results,
    } = deser
    {
        assert_eq!(session_id, "g1");
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].player_id, "bob");
        assert_eq!(results[1].score, -5);
    } else {
        panic!("expected GameFinished");
    }
}

// ════════════════════════════════════════════════════════════════════
// JSON layout & forward compatibility
// ════════════════════════════════════════════════════════════════════

#[test]
fn messages_use_type_and_data_tagging() {
    let event = ServerEvent::PlayerJoined {
        session_id: "g1".into(),
        player: profile("bob", "Bob"),
    };
    let value: serde_json::Value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "PlayerJoined");
    assert_eq!(value["data"]["session_id"], "g1");
    assert_eq!(value["data"]["player"]["id"], "bob");
    assert_eq!(value["data"]["player"]["display_name"], "Bob");
}

#[test]
fn game_phase_serializes_snake_case() {
    assert_eq!(
        serde_json::to_string(&GamePhase::WaitingForPlayers).unwrap(),
        r#""waiting_for_players""#
    );
    assert_eq!(
        serde_json::from_str::<GamePhase>(r#""finished""#).unwrap(),
        GamePhase::Finished
    );
}

#[test]
fn unknown_event_kind_deserializes_to_unknown() {
    let fixtures = [
        r#"{"type":"RoundHint","data":{"hint":"popcorn"}}"#,
        r#"{"type":"SpectatorJoined","data":{"spectator_id":"s1"}}"#,
    ];
    for json in fixtures {
        let event: ServerEvent = serde_json::from_str(json).expect("forward-compatible parse");
        assert!(matches!(event, ServerEvent::Unknown), "fixture: {json}");
    }
}

#[test]
fn truly_malformed_json_still_fails() {
    assert!(serde_json::from_str::<ServerEvent>(r#"{"no_type_tag":1}"#).is_err());
    assert!(serde_json::from_str::<ServerEvent>("not json").is_err());
}

#[test]
fn server_fixture_game_created_parses() {
    // Shape as emitted by the backend's event stream.
    let json = r#"{
        "type": "GameCreated",
        "data": {
            "session_id": "3f2c9a",
            "creator_id": "7b1d44",
            "config": {
                "player_count": 10,
                "round_count": 10,
                "round_duration_secs": 60
            }
        }
    }"#;
    let event: ServerEvent = serde_json::from_str(json).unwrap();
    assert!(matches!(
        event,
        ServerEvent::GameCreated { session_id, .. } if session_id == "3f2c9a"
    ));
}
