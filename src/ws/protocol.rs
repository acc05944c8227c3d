//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::PlayerId;

/// Messages sent from client to server
///
/// The two shapes are told apart by their fields: a `name` makes it a join.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ClientMsg {
    /// Optional first message carrying the display name
    Join { name: String },

    /// Input for one client frame
    Intent(IntentMsg),
}

/// Raw intent fields; absent numbers read as zero
///
/// Unknown fields are rejected so a broken join cannot pass as an idle intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntentMsg {
    /// Horizontal direction (-1, 0, 1)
    #[serde(default)]
    pub dx: f64,
    /// Vertical direction (-1, 0, 1)
    #[serde(default)]
    pub dy: f64,
    /// Aim angle in radians
    #[serde(default)]
    pub a: f64,
    /// 1 to fire this frame
    #[serde(default)]
    pub shoot: f64,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServerMsg<'a> {
    /// Session identifier assignment, sent once before any snapshot
    Welcome { id: &'a PlayerId },

    /// Full world state after a tick
    Snapshot(Snapshot<'a>),
}

/// World state as seen by every client
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot<'a> {
    /// Players keyed by id
    pub p: BTreeMap<&'a PlayerId, PlayerView<'a>>,
    /// Projectiles in flight
    pub b: Vec<ProjectileView<'a>>,
}

/// Player state in a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct PlayerView<'a> {
    pub x: f64,
    pub y: f64,
    pub name: &'a str,
    pub kills: u32,
    pub deaths: u32,
}

/// Projectile state in a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ProjectileView<'a> {
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
    /// Owner id
    pub o: &'a PlayerId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_intent_with_missing_fields() {
        let msg: ClientMsg = serde_json::from_str(r#"{"dx":1,"shoot":1}"#).unwrap();
        assert_eq!(
            msg,
            ClientMsg::Intent(IntentMsg {
                dx: 1.0,
                dy: 0.0,
                a: 0.0,
                shoot: 1.0
            })
        );
    }

    #[test]
    fn parses_join() {
        let msg: ClientMsg = serde_json::from_str(r#"{"name":"alice"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMsg::Join {
                name: "alice".into()
            }
        );
    }

    #[test]
    fn rejects_malformed() {
        assert!(serde_json::from_str::<ClientMsg>("not json").is_err());
        assert!(serde_json::from_str::<ClientMsg>(r#""text""#).is_err());
        assert!(serde_json::from_str::<ClientMsg>(r#"{"dx":"left"}"#).is_err());
        assert!(serde_json::from_str::<ClientMsg>("null").is_err());
    }

    #[test]
    fn rejects_join_with_bad_name_and_unknown_objects() {
        assert!(serde_json::from_str::<ClientMsg>(r#"{"name":5}"#).is_err());
        assert!(serde_json::from_str::<ClientMsg>(r#"{"name":null}"#).is_err());
        assert!(serde_json::from_str::<ClientMsg>(r#"{"bogus":true}"#).is_err());
        assert!(serde_json::from_str::<ClientMsg>(r#"{"dx":1,"jump":1}"#).is_err());

        // an empty object is still an idle intent
        let msg: ClientMsg = serde_json::from_str("{}").unwrap();
        assert_eq!(msg, ClientMsg::Intent(IntentMsg::default()));
    }

    #[test]
    fn welcome_shape() {
        let id = PlayerId::from("abc");
        let value = serde_json::to_value(ServerMsg::Welcome { id: &id }).unwrap();
        assert_eq!(value, json!({ "id": "abc" }));
    }

    #[test]
    fn snapshot_shape() {
        let a = PlayerId::from("a");
        let mut snapshot = Snapshot::default();
        snapshot.p.insert(
            &a,
            PlayerView {
                x: 1.0,
                y: 2.0,
                name: "alice",
                kills: 3,
                deaths: 4,
            },
        );
        snapshot.b.push(ProjectileView {
            x: 5.0,
            y: 6.0,
            dx: 8.0,
            dy: 0.0,
            o: &a,
        });

        let value = serde_json::to_value(ServerMsg::Snapshot(snapshot)).unwrap();
        assert_eq!(
            value,
            json!({
                "p": { "a": { "x": 1.0, "y": 2.0, "name": "alice", "kills": 3, "deaths": 4 } },
                "b": [ { "x": 5.0, "y": 6.0, "dx": 8.0, "dy": 0.0, "o": "a" } ]
            })
        );
    }
}
