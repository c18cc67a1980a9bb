//! Observation transform
//!
//! Turns a raw simulator tick into the agent-facing observation: self and
//! enemy resolved, remaining champions kept in simulator order, plus the
//! advisory legal-action mask.

use arena_rl_core::{AgentObservation, ArenaError, FunctionId, RawObservation, Result, UnitRecord};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Capability flags that make `spell` legal, one per slot
const SPELL_FLAGS: [&str; 6] = [
    "can_spell_0",
    "can_spell_1",
    "can_spell_2",
    "can_spell_3",
    "can_spell_4",
    "can_spell_5",
];

/// Index of the observing unit in `champ_units`
pub fn resolve_self(raw: &RawObservation) -> Result<usize> {
    if let Some(self_id) = raw.self_id {
        return raw
            .champ_units
            .iter()
            .position(|unit| unit.user_id == self_id)
            .ok_or_else(|| {
                ArenaError::Protocol(format!("self_id {} matches no champion", self_id))
            });
    }

    let mut candidates = raw
        .champ_units
        .iter()
        .enumerate()
        .filter(|(_, unit)| unit.distance_to_me == 0.0)
        .map(|(index, _)| index);
    match (candidates.next(), candidates.next()) {
        (Some(index), None) => Ok(index),
        (None, _) => Err(ArenaError::Protocol(
            "no champion at distance 0 and no self_id".into(),
        )),
        (Some(_), Some(_)) => Err(ArenaError::Protocol(
            "several champions at distance 0; self is ambiguous".into(),
        )),
    }
}

/// Functions the simulator currently allows
pub fn legal_action_mask(flags: &HashMap<String, bool>) -> BTreeSet<FunctionId> {
    let set = |name: &str| flags.get(name).copied().unwrap_or(false);
    let mut mask = BTreeSet::new();
    if set("can_no_op") {
        mask.insert(FunctionId::NoOp);
    }
    if set("can_move") {
        mask.insert(FunctionId::Move);
    }
    if SPELL_FLAGS.iter().any(|flag| set(flag)) {
        mask.insert(FunctionId::Spell);
    }
    if set("can_attack") {
        mask.insert(FunctionId::Attack);
    }
    mask
}

/// Reshape one raw tick for the agent it belongs to
pub fn decode(raw: RawObservation) -> Result<AgentObservation> {
    let self_index = resolve_self(&raw)?;
    let legal_action_mask = legal_action_mask(&raw.available_actions);

    let mut units = raw.champ_units;
    let self_unit = units.remove(self_index);
    let enemy_index = units
        .iter()
        .position(|unit| !unit.is_ally())
        .or_else(|| (!units.is_empty()).then_some(0))
        .ok_or_else(|| ArenaError::Protocol("observation has no opponent".into()))?;
    let enemy_unit = units.remove(enemy_index);

    Ok(AgentObservation {
        self_id: self_unit.user_id,
        game_time: raw.game_time,
        self_unit,
        enemy_unit,
        others: units,
        legal_action_mask,
    })
}

/// Name and shape of one observation field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub shape: Vec<usize>,
}

/// Shapes of the agent-facing observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObservationSpec {
    pub fields: Vec<FieldSpec>,
    /// Column names of every unit feature row
    pub unit_features: Vec<&'static str>,
}

/// Observation layout for a session with `players` champions
pub fn observation_spec(players: usize) -> ObservationSpec {
    let width = UnitRecord::FEATURE_NAMES.len();
    let field = |name, shape: Vec<usize>| FieldSpec { name, shape };
    ObservationSpec {
        fields: vec![
            field("self_id", vec![]),
            field("game_time", vec![]),
            field("self_unit", vec![width]),
            field("enemy_unit", vec![width]),
            field("others", vec![players.saturating_sub(2), width]),
            field("legal_action_mask", vec![FunctionId::ALL.len()]),
        ],
        unit_features: UnitRecord::FEATURE_NAMES.to_vec(),
    }
}
