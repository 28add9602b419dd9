//! League of Legends adapter -- a one-line summary of the game in progress.
//!
//! The game client serves its Live Client Data API on
//! `https://127.0.0.1:2999` while a match is running, behind a self-signed
//! certificate.  No credentials are involved.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::api::{self, display_value};
use crate::error::{AdapterError, Result};
use crate::traits::{Adapter, AdapterType, AuthRequirement, HealthStatus, ToolDefinition};

/// Default Live Client Data endpoint.
pub const DEFAULT_LIVE_CLIENT_URL: &str = "https://127.0.0.1:2999/liveclientdata/allgamedata";

/// Riot id used when the active player has none.
const UNKNOWN_ACTIVE_RIOT_ID: &str = " UNKNOWN RIOT ID";

/// Settings for [`LeagueAdapter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LeagueConfig {
    /// Full URL of the `allgamedata` endpoint.
    pub live_client_url: String,
}

impl Default for LeagueConfig {
    fn default() -> Self {
        Self {
            live_client_url: DEFAULT_LIVE_CLIENT_URL.to_string(),
        }
    }
}

/// League of Legends live game adapter.
pub struct LeagueAdapter {
    /// Unique identifier for this adapter instance.
    id: String,
    /// Whether the adapter has been connected.
    connected: bool,
    /// Full URL of the `allgamedata` endpoint.
    live_client_url: String,
    /// HTTP client that accepts the game's self-signed certificate.
    client: reqwest::Client,
}

impl LeagueAdapter {
    /// Create a League adapter from its settings.
    pub fn new(id: impl Into<String>, config: LeagueConfig) -> Self {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .unwrap_or_default();
        Self {
            id: id.into(),
            connected: false,
            live_client_url: config.live_client_url,
            client,
        }
    }

    async fn tool_get_current_game_state(&self) -> Result<Value> {
        debug!(url = %self.live_client_url, "fetching live game data");
        let summary = match api::send(self.client.get(&self.live_client_url)).await {
            Ok(data) => summarize_game(&data),
            Err(e) => format!("An error occurred while making the request: {e}"),
        };
        Ok(Value::String(summary))
    }
}

// ---------------------------------------------------------------------------
// Game summary
// ---------------------------------------------------------------------------

/// The fields of one player that go into the summary sentence.
#[derive(Debug, PartialEq)]
struct PlayerInfo {
    champion_name: String,
    keystone: String,
    level: String,
    kills: String,
    deaths: String,
    position: String,
}

impl PlayerInfo {
    fn from_player(player: &Value) -> Self {
        Self {
            champion_name: field(player, "/championName", "UNKNOWN CHAMPION NAME"),
            keystone: field(player, "/runes/keystone/displayName", "UNKNOWN KEYSTONE"),
            level: field(player, "/level", "UNKNOWN LEVEL"),
            kills: field(player, "/scores/kills", "UNKNOWN KILLS"),
            deaths: field(player, "/scores/deaths", "UNKNOWN DEATHS"),
            position: field(player, "/position", "UNKNOWN ROLE"),
        }
    }
}

/// A player field rendered for prose, or `default` when absent.
fn field(player: &Value, pointer: &str, default: &str) -> String {
    player
        .pointer(pointer)
        .map(|v| display_value(Some(v)))
        .unwrap_or_else(|| default.to_string())
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

/// `null`, `{}`, `[]`, `""`, `0` and `false` all mean "nothing here".
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Build the summary sentence from an `allgamedata` document.
fn summarize_game(data: &Value) -> String {
    if is_blank(data) {
        return "No data found".to_string();
    }

    let riot_id = data
        .pointer("/activePlayer/riotId")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_ACTIVE_RIOT_ID);
    let players = data
        .get("allPlayers")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let Some(current) = players.iter().find(|p| str_field(p, "riotId") == riot_id) else {
        return format!("Player with riotId {riot_id} not found in the game.");
    };
    let me = PlayerInfo::from_player(current);

    let opposing_team = if str_field(current, "team") == "CHAOS" {
        "ORDER"
    } else {
        "CHAOS"
    };
    let Some(opponent) = players
        .iter()
        .find(|p| str_field(p, "position") == me.position && str_field(p, "team") == opposing_team)
    else {
        return "Could not find role opponent.".to_string();
    };
    let opp = PlayerInfo::from_player(opponent);

    format!(
        "I am {riot_id}, playing as {} in the {} role with the keystone rune {}. \
         I am level {} with {} kills and {} deaths. \
         My role opponent is {} with key stone rune {} at level {} with {} kills and {} deaths.",
        me.champion_name,
        me.position,
        me.keystone,
        me.level,
        me.kills,
        me.deaths,
        opp.champion_name,
        opp.keystone,
        opp.level,
        opp.kills,
        opp.deaths,
    )
}

// ---------------------------------------------------------------------------
// Adapter trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl Adapter for LeagueAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn server_name(&self) -> &str {
        "league of legends"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Telemetry
    }

    async fn connect(&mut self) -> Result<()> {
        info!(id = %self.id, url = %self.live_client_url, "league adapter connected");
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        info!(id = %self.id, "league adapter disconnected");
        self.connected = false;
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        if !self.connected {
            return Ok(HealthStatus::Unhealthy);
        }
        // The endpoint only answers while a game is running.
        match self.client.get(&self.live_client_url).send().await {
            Ok(response) if response.status().is_success() => Ok(HealthStatus::Healthy),
            _ => Ok(HealthStatus::Degraded),
        }
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "get_current_game_state".into(),
            description: "Returns a summary of the current League of Legends game.".into(),
            parameters: json!({ "type": "object", "properties": {} }),
        }]
    }

    async fn execute_tool(&self, name: &str, _params: Value) -> Result<Value> {
        if !self.connected {
            return Err(AdapterError::ExecutionFailed {
                tool_name: name.to_string(),
                reason: format!("adapter `{}` is not connected", self.id),
            });
        }

        match name {
            "get_current_game_state" => self.tool_get_current_game_state().await,
            _ => Err(AdapterError::ToolNotFound {
                adapter_id: self.id.clone(),
                tool_name: name.to_string(),
            }),
        }
    }

    async fn read_resource(&self, uri: &str) -> Result<Value> {
        Err(AdapterError::ResourceNotFound {
            adapter_id: self.id.clone(),
            uri: uri.to_string(),
        })
    }

    fn required_auth(&self) -> Option<AuthRequirement> {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn player(riot_id: &str, team: &str, position: &str, champion: &str) -> Value {
        json!({
            "riotId": riot_id,
            "team": team,
            "position": position,
            "championName": champion,
            "level": 9,
            "runes": {"keystone": {"displayName": "Electrocute"}},
            "scores": {"kills": 3, "deaths": 1}
        })
    }

    fn game(me_team: &str) -> Value {
        let them = if me_team == "ORDER" { "CHAOS" } else { "ORDER" };
        json!({
            "activePlayer": {"riotId": "Faker#KR1"},
            "allPlayers": [
                player("Faker#KR1", me_team, "MIDDLE", "Ahri"),
                player("Mate#NA1", me_team, "JUNGLE", "Lee Sin"),
                player("Rival#EUW", them, "MIDDLE", "Zed"),
                player("Other#EUW", them, "JUNGLE", "Vi"),
            ]
        })
    }

    // -- Summary sentence --

    #[test]
    fn summary_for_order_player() {
        assert_eq!(
            summarize_game(&game("ORDER")),
            "I am Faker#KR1, playing as Ahri in the MIDDLE role with the keystone rune \
             Electrocute. I am level 9 with 3 kills and 1 deaths. My role opponent is Zed \
             with key stone rune Electrocute at level 9 with 3 kills and 1 deaths."
        );
    }

    #[test]
    fn summary_for_chaos_player_looks_at_order() {
        let summary = summarize_game(&game("CHAOS"));
        assert!(summary.contains("My role opponent is Zed"), "{summary}");
    }

    #[test]
    fn blank_documents_have_no_data() {
        assert_eq!(summarize_game(&Value::Null), "No data found");
        assert_eq!(summarize_game(&json!({})), "No data found");
    }

    #[test]
    fn missing_active_player_uses_placeholder_id() {
        let data = json!({"allPlayers": [player("Faker#KR1", "ORDER", "MIDDLE", "Ahri")]});
        assert_eq!(
            summarize_game(&data),
            "Player with riotId  UNKNOWN RIOT ID not found in the game."
        );
    }

    #[test]
    fn no_opponent_in_role() {
        let data = json!({
            "activePlayer": {"riotId": "Faker#KR1"},
            "allPlayers": [
                player("Faker#KR1", "ORDER", "MIDDLE", "Ahri"),
                player("Other#EUW", "CHAOS", "JUNGLE", "Vi"),
            ]
        });
        assert_eq!(summarize_game(&data), "Could not find role opponent.");
    }

    #[test]
    fn missing_fields_render_placeholders() {
        let info = PlayerInfo::from_player(&json!({"riotId": "x", "level": null}));
        assert_eq!(info, PlayerInfo {
            champion_name: "UNKNOWN CHAMPION NAME".into(),
            keystone: "UNKNOWN KEYSTONE".into(),
            level: "None".into(),
            kills: "UNKNOWN KILLS".into(),
            deaths: "UNKNOWN DEATHS".into(),
            position: "UNKNOWN ROLE".into(),
        });
    }

    // -- Adapter surface --

    #[test]
    fn metadata() {
        let adapter = LeagueAdapter::new("lol", LeagueConfig::default());
        assert_eq!(adapter.server_name(), "league of legends");
        assert_eq!(adapter.adapter_type(), AdapterType::Telemetry);
        assert!(adapter.required_auth().is_none());
        assert_eq!(adapter.tools()[0].name, "get_current_game_state");
        assert_eq!(adapter.live_client_url, DEFAULT_LIVE_CLIENT_URL);
    }

    #[tokio::test]
    async fn unreachable_client_is_a_friendly_message() {
        // Port 9 on loopback is reserved (discard) and nothing listens there.
        let mut adapter = LeagueAdapter::new("lol", LeagueConfig {
            live_client_url: "http://127.0.0.1:9/liveclientdata/allgamedata".into(),
        });
        adapter.connect().await.unwrap();
        let out = adapter
            .execute_tool("get_current_game_state", json!({}))
            .await
            .unwrap();
        let text = out.as_str().unwrap();
        assert!(
            text.starts_with("An error occurred while making the request: "),
            "{text}"
        );
        assert_eq!(adapter.health_check().await.unwrap(), HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn no_resources() {
        let adapter = LeagueAdapter::new("lol", LeagueConfig::default());
        assert!(adapter.resources().is_empty());
        assert!(adapter.read_resource("league://anything").await.is_err());
    }
}
