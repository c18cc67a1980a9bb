//! Session settings for the simulator launcher

use arena_rl_core::{EnvConfig, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

const SUMMONER_FLASH: &str = "SummonerFlash";
const SUMMONER_HEAL: &str = "SummonerHeal";
const DATA_PACKAGE: &str = "LeagueSandbox-Scripts";
const CONTENT_PATH: &str = "../../../../Content";
const BLOWFISH_KEY: &str = "17BLOhi6KZsTtldTsizvHg==";

/// Rune ids per page slot: 9 marks, 9 seals, 9 glyphs, 3 quintessences
fn rune_page() -> BTreeMap<String, u32> {
    (1..=30u32)
        .map(|slot| {
            let rune = match slot {
                1..=9 => 5245,
                10..=18 => 5317,
                19..=27 => 5289,
                _ => 5335,
            };
            (slot.to_string(), rune)
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlayerSettings {
    player_id: u32,
    blowfish_key: &'static str,
    rank: &'static str,
    name: u32,
    champion: String,
    team: String,
    skin: u32,
    summoner1: &'static str,
    summoner2: &'static str,
    ribbon: u32,
    icon: u32,
    runes: BTreeMap<String, u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GameSettings {
    map: u32,
    data_package: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct GameInfoSettings {
    manacosts_enabled: bool,
    cheats_enabled: bool,
    cooldowns_enabled: bool,
    minion_spawns_enabled: bool,
    content_path: &'static str,
    is_damage_text_global: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionSettings {
    players: Vec<PlayerSettings>,
    game: GameSettings,
    game_info: GameInfoSettings,
}

/// Game-info document the simulator is started with
pub fn session_settings(config: &EnvConfig) -> Result<serde_json::Value> {
    let players = config
        .players
        .iter()
        .zip(1u32..)
        .map(|(agent, id)| PlayerSettings {
            player_id: id,
            blowfish_key: BLOWFISH_KEY,
            rank: "DIAMOND",
            name: id,
            champion: agent.champion.clone(),
            team: agent.team.to_string(),
            skin: 0,
            summoner1: SUMMONER_FLASH,
            summoner2: SUMMONER_HEAL,
            ribbon: 2,
            icon: 0,
            runes: rune_page(),
        })
        .collect();

    let settings = SessionSettings {
        players,
        game: GameSettings {
            map: config.map.id(),
            data_package: DATA_PACKAGE,
        },
        game_info: GameInfoSettings {
            manacosts_enabled: config.game.manacosts_enabled,
            cheats_enabled: config.game.cheats_enabled,
            cooldowns_enabled: config.game.cooldowns_enabled,
            minion_spawns_enabled: config.game.minion_spawns_enabled,
            content_path: CONTENT_PATH,
            is_damage_text_global: config.game.damage_text_global,
        },
    };
    Ok(serde_json::to_value(settings)?)
}

/// Write the session settings as pretty-printed JSON
pub fn write_session_settings(config: &EnvConfig, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let settings = session_settings(config)?;
    std::fs::write(path, serde_json::to_string_pretty(&settings)?)?;
    info!("Wrote session settings to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_rl_core::MapName;

    #[test]
    fn test_default_session_settings() {
        let settings = session_settings(&EnvConfig::default()).unwrap();

        let players = settings["players"].as_array().unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0]["playerId"], 1);
        assert_eq!(players[0]["champion"], "Ezreal");
        assert_eq!(players[0]["team"], "BLUE");
        assert_eq!(players[1]["playerId"], 2);
        assert_eq!(players[1]["team"], "PURPLE");
        assert_eq!(players[1]["summoner1"], "SummonerFlash");
        assert_eq!(players[1]["summoner2"], "SummonerHeal");

        assert_eq!(settings["game"]["map"], 1);
        assert_eq!(settings["game"]["dataPackage"], "LeagueSandbox-Scripts");
        assert_eq!(settings["gameInfo"]["COOLDOWNS_ENABLED"], false);
        assert_eq!(settings["gameInfo"]["CHEATS_ENABLED"], true);
        assert_eq!(settings["gameInfo"]["IS_DAMAGE_TEXT_GLOBAL"], true);
    }

    #[test]
    fn test_rune_page_layout() {
        let runes = rune_page();
        assert_eq!(runes.len(), 30);
        assert_eq!(runes["1"], 5245);
        assert_eq!(runes["10"], 5317);
        assert_eq!(runes["27"], 5289);
        assert_eq!(runes["30"], 5335);
    }

    #[test]
    fn test_map_and_toggles_follow_config() {
        let mut config = EnvConfig::default();
        config.map = MapName::HowlingAbyss;
        config.game.cooldowns_enabled = true;
        let settings = session_settings(&config).unwrap();
        assert_eq!(settings["game"]["map"], 12);
        assert_eq!(settings["gameInfo"]["COOLDOWNS_ENABLED"], true);
    }

    #[test]
    fn test_write_session_settings() {
        let path = std::env::temp_dir().join(format!("arena-rl-settings-{}.json", std::process::id()));
        write_session_settings(&EnvConfig::default(), &path).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, session_settings(&EnvConfig::default()).unwrap());
        std::fs::remove_file(&path).unwrap();
    }
}
