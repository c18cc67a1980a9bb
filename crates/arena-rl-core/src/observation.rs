//! Observation types

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::action::FunctionId;
use crate::agent::PlayerId;
use crate::error::{ArenaError, Result};
use crate::reward::RewardComponents;

/// One tick of simulator state, as received on the observation channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawObservation {
    /// Monotonic within an episode
    pub game_time: f64,

    /// Per-champion records in simulator order
    pub champ_units: Vec<UnitRecord>,

    /// Capability flags, e.g. `can_move`
    #[serde(default)]
    pub available_actions: HashMap<String, bool>,

    /// Explicit identity of the observing player, when the simulator sends it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_id: Option<PlayerId>,
}

impl RawObservation {
    /// Parse an observation payload.
    ///
    /// Accepts both the bare form and the `{"observation": {...}}` envelope.
    pub fn from_slice(payload: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| ArenaError::Protocol(format!("observation is not JSON: {}", e)))?;
        let value = match value {
            serde_json::Value::Object(mut map)
                if !map.contains_key("champ_units") && map.contains_key("observation") =>
            {
                map.remove("observation").unwrap_or_default()
            }
            other => other,
        };
        serde_json::from_value(value)
            .map_err(|e| ArenaError::Protocol(format!("malformed observation: {}", e)))
    }

    /// True when any champion is dead this tick
    pub fn someone_died(&self) -> bool {
        self.champ_units.iter().any(|unit| !unit.is_alive())
    }
}

/// Cooldown and rank of one ability slot
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SpellState {
    pub cooldown: f32,
    pub level: f32,
}

/// Fixed-schema numeric record for one champion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawUnit")]
pub struct UnitRecord {
    pub user_id: PlayerId,
    pub position_x: f32,
    pub position_y: f32,
    pub facing_angle: f32,
    pub current_hp: f32,
    pub max_hp: f32,
    pub hp_regen: f32,
    pub current_mp: f32,
    pub max_mp: f32,
    pub mp_regen: f32,
    pub attack_damage: f32,
    pub attack_speed: f32,
    pub armor: f32,
    pub mr: f32,
    pub level: f32,
    pub current_xp: f32,
    pub current_gold: f32,
    pub alive: f32,
    pub death_count: f32,
    pub kill_count: f32,
    /// Q, W, E, R, then summoner spells D and F
    pub spells: [SpellState; 6],
    /// 1 when on the observing agent's team
    pub my_team: f32,
    pub dx_to_me: f32,
    pub dy_to_me: f32,
    pub distance_to_me: f32,
}

impl UnitRecord {
    /// Names of [`UnitRecord::to_features`] entries, in order
    pub const FEATURE_NAMES: [&'static str; 36] = [
        "user_id",
        "position_x",
        "position_y",
        "facing_angle",
        "current_hp",
        "max_hp",
        "hp_regen",
        "current_mp",
        "max_mp",
        "mp_regen",
        "attack_damage",
        "attack_speed",
        "armor",
        "mr",
        "level",
        "current_xp",
        "current_gold",
        "alive",
        "death_count",
        "kill_count",
        "q_cooldown",
        "q_level",
        "w_cooldown",
        "w_level",
        "e_cooldown",
        "e_level",
        "r_cooldown",
        "r_level",
        "d_cooldown",
        "d_level",
        "f_cooldown",
        "f_level",
        "my_team",
        "dx_to_me",
        "dy_to_me",
        "distance_to_me",
    ];

    /// Flatten into the fixed feature order
    pub fn to_features(&self) -> [f32; 36] {
        let s = &self.spells;
        [
            self.user_id as f32,
            self.position_x,
            self.position_y,
            self.facing_angle,
            self.current_hp,
            self.max_hp,
            self.hp_regen,
            self.current_mp,
            self.max_mp,
            self.mp_regen,
            self.attack_damage,
            self.attack_speed,
            self.armor,
            self.mr,
            self.level,
            self.current_xp,
            self.current_gold,
            self.alive,
            self.death_count,
            self.kill_count,
            s[0].cooldown,
            s[0].level,
            s[1].cooldown,
            s[1].level,
            s[2].cooldown,
            s[2].level,
            s[3].cooldown,
            s[3].level,
            s[4].cooldown,
            s[4].level,
            s[5].cooldown,
            s[5].level,
            self.my_team,
            self.dx_to_me,
            self.dy_to_me,
            self.distance_to_me,
        ]
    }

    pub fn is_alive(&self) -> bool {
        self.alive != 0.0
    }

    pub fn is_ally(&self) -> bool {
        self.my_team != 0.0
    }

    /// HP as a fraction of max HP, `None` when max HP is zero
    pub fn hp_fraction(&self) -> Option<f64> {
        fraction(self.current_hp, self.max_hp)
    }

    /// Mana as a fraction of max mana, `None` when max mana is zero
    pub fn mp_fraction(&self) -> Option<f64> {
        fraction(self.current_mp, self.max_mp)
    }
}

fn fraction(current: f32, max: f32) -> Option<f64> {
    (max != 0.0).then(|| f64::from(current) / f64::from(max))
}

/// Wire form of a unit record.
///
/// Position arrives either flat (`position_x`) or nested (`position: {X, Y}`);
/// ability fields are flat (`q_cooldown`, `q_level`, ...). Vitals, progression
/// and identity are required; secondary stats default to zero.
#[derive(Debug, Deserialize)]
struct RawUnit {
    user_id: f64,
    #[serde(default)]
    position: Option<RawPoint>,
    #[serde(default)]
    position_x: f32,
    #[serde(default)]
    position_y: f32,
    #[serde(default)]
    facing_angle: f32,
    current_hp: f32,
    max_hp: f32,
    #[serde(default)]
    hp_regen: f32,
    current_mp: f32,
    max_mp: f32,
    #[serde(default)]
    mp_regen: f32,
    #[serde(default)]
    attack_damage: f32,
    #[serde(default)]
    attack_speed: f32,
    #[serde(default)]
    armor: f32,
    #[serde(default)]
    mr: f32,
    #[serde(default)]
    level: f32,
    current_xp: f32,
    current_gold: f32,
    alive: f32,
    death_count: f32,
    kill_count: f32,
    #[serde(default)]
    q_cooldown: f32,
    #[serde(default)]
    q_level: f32,
    #[serde(default)]
    w_cooldown: f32,
    #[serde(default)]
    w_level: f32,
    #[serde(default)]
    e_cooldown: f32,
    #[serde(default)]
    e_level: f32,
    #[serde(default)]
    r_cooldown: f32,
    #[serde(default)]
    r_level: f32,
    #[serde(default)]
    d_cooldown: f32,
    #[serde(default)]
    d_level: f32,
    #[serde(default)]
    f_cooldown: f32,
    #[serde(default)]
    f_level: f32,
    #[serde(default)]
    my_team: f32,
    #[serde(default)]
    dx_to_me: f32,
    #[serde(default)]
    dy_to_me: f32,
    distance_to_me: f32,
}

#[derive(Debug, Deserialize)]
struct RawPoint {
    #[serde(rename = "X")]
    x: f32,
    #[serde(rename = "Y")]
    y: f32,
}

impl TryFrom<RawUnit> for UnitRecord {
    type Error = String;

    fn try_from(raw: RawUnit) -> std::result::Result<Self, Self::Error> {
        if raw.user_id.fract() != 0.0 || !raw.user_id.is_finite() {
            return Err(format!("user_id must be an integer, got {}", raw.user_id));
        }
        let (position_x, position_y) = match raw.position {
            Some(point) => (point.x, point.y),
            None => (raw.position_x, raw.position_y),
        };
        let spell = |cooldown, level| SpellState { cooldown, level };

        Ok(UnitRecord {
            user_id: raw.user_id as PlayerId,
            position_x,
            position_y,
            facing_angle: raw.facing_angle,
            current_hp: raw.current_hp,
            max_hp: raw.max_hp,
            hp_regen: raw.hp_regen,
            current_mp: raw.current_mp,
            max_mp: raw.max_mp,
            mp_regen: raw.mp_regen,
            attack_damage: raw.attack_damage,
            attack_speed: raw.attack_speed,
            armor: raw.armor,
            mr: raw.mr,
            level: raw.level,
            current_xp: raw.current_xp,
            current_gold: raw.current_gold,
            alive: raw.alive,
            death_count: raw.death_count,
            kill_count: raw.kill_count,
            spells: [
                spell(raw.q_cooldown, raw.q_level),
                spell(raw.w_cooldown, raw.w_level),
                spell(raw.e_cooldown, raw.e_level),
                spell(raw.r_cooldown, raw.r_level),
                spell(raw.d_cooldown, raw.d_level),
                spell(raw.f_cooldown, raw.f_level),
            ],
            my_team: raw.my_team,
            dx_to_me: raw.dx_to_me,
            dy_to_me: raw.dy_to_me,
            distance_to_me: raw.distance_to_me,
        })
    }
}

/// Agent-facing observation for one controlled player
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AgentObservation {
    pub self_id: PlayerId,
    pub game_time: f64,
    pub self_unit: UnitRecord,
    /// Nearest opponent in simulator order
    pub enemy_unit: UnitRecord,
    /// Remaining champions beyond self and enemy
    pub others: Vec<UnitRecord>,
    /// Advisory: the environment does not enforce it
    pub legal_action_mask: BTreeSet<FunctionId>,
}

impl AgentObservation {
    /// All champions: self, enemy, then the rest
    pub fn units(&self) -> impl Iterator<Item = &UnitRecord> {
        std::iter::once(&self.self_unit)
            .chain(std::iter::once(&self.enemy_unit))
            .chain(self.others.iter())
    }

    pub fn someone_died(&self) -> bool {
        self.units().any(|unit| !unit.is_alive())
    }

    pub fn is_legal(&self, function: FunctionId) -> bool {
        self.legal_action_mask.contains(&function)
    }
}

/// Position of a timestep within its episode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepType {
    First,
    Mid,
    Last,
}

/// What an agent receives after `reset` or `step`
#[derive(Debug, Clone, Serialize)]
pub struct Timestep {
    pub step_type: StepType,
    pub reward: f64,
    /// Decomposed reward for analysis
    pub reward_components: RewardComponents,
    /// 1.0, or 0.0 on the final step of an episode
    pub discount: f64,
    pub observation: AgentObservation,
}

impl Timestep {
    pub fn first(&self) -> bool {
        self.step_type == StepType::First
    }

    pub fn mid(&self) -> bool {
        self.step_type == StepType::Mid
    }

    pub fn last(&self) -> bool {
        self.step_type == StepType::Last
    }
}
