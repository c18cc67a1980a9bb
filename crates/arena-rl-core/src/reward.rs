//! Reward types and reward shaping

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::observation::{AgentObservation, StepType, UnitRecord};

/// Scalar reward with optional decomposition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reward {
    /// Total scalar reward
    pub value: f64,
    /// Decomposed components for analysis
    #[serde(default)]
    pub components: RewardComponents,
}

impl Reward {
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Decomposed reward components
pub type RewardComponents = HashMap<String, f64>;

/// Definition of a reward component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardComponentDef {
    /// Component name
    pub name: String,
    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Weight in the current configuration
    pub weight: f64,
}

/// Trait for computing rewards from consecutive observations
pub trait RewardFunction: Send + Sync {
    /// State type for this reward function
    type State;

    /// Score the transition `prev -> current`.
    ///
    /// `baseline` is the first observation of the current episode.
    fn compute(
        &self,
        prev: &Self::State,
        current: &Self::State,
        step_type: StepType,
        baseline: &Self::State,
    ) -> Reward;

    /// List available reward components
    fn components(&self) -> Vec<RewardComponentDef>;
}

/// Multipliers for each shaped reward term
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RewardWeights {
    /// Magnitude of the end-of-episode kill differential
    pub terminal: f64,
    /// Applied when own death count increases
    pub death: f64,
    pub xp: f64,
    pub gold: f64,
    pub hp: f64,
    pub mana: f64,
    /// Per kill gained
    pub kill: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            terminal: 5.0,
            death: -1.0,
            xp: 0.002,
            gold: 0.006,
            hp: 2.0,
            mana: 0.75,
            kill: 1.0,
        }
    }
}

/// Smooth saturating curve for health change `d` in `[-1, 1]`.
///
/// `f(1) = 1` and `f(-1) = -8`: losses are punished harder than equal gains
/// are rewarded.
pub fn hp_curve(d: f64) -> f64 {
    (d + 1.0 - (1.0 - d).powi(4)) / 2.0
}

/// Dense, zero-sum-aware reward for arena combat
#[derive(Debug, Clone, Default)]
pub struct ShapedReward {
    weights: RewardWeights,
}

impl ShapedReward {
    pub fn new(weights: RewardWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &RewardWeights {
        &self.weights
    }

    /// Kill differential, scored only on the last step.
    ///
    /// Compares current own kills with the enemy's kill count at episode start.
    pub fn terminal_term(
        &self,
        current: &AgentObservation,
        step_type: StepType,
        baseline: &AgentObservation,
    ) -> f64 {
        if step_type != StepType::Last {
            return 0.0;
        }
        let mine = current.self_unit.kill_count;
        let theirs = baseline.enemy_unit.kill_count;
        if mine > theirs {
            self.weights.terminal
        } else if mine < theirs {
            -self.weights.terminal
        } else {
            0.0
        }
    }

    pub fn death_term(&self, prev: &UnitRecord, current: &UnitRecord) -> f64 {
        if current.death_count > prev.death_count {
            self.weights.death
        } else {
            0.0
        }
    }

    pub fn xp_term(&self, prev: &AgentObservation, current: &AgentObservation) -> f64 {
        let mine = delta(prev.self_unit.current_xp, current.self_unit.current_xp);
        let theirs = delta(prev.enemy_unit.current_xp, current.enemy_unit.current_xp);
        (mine - theirs) * self.weights.xp
    }

    pub fn gold_term(&self, prev: &UnitRecord, current: &UnitRecord) -> f64 {
        delta(prev.current_gold, current.current_gold) * self.weights.gold
    }

    pub fn hp_term(&self, prev: &UnitRecord, current: &UnitRecord) -> f64 {
        match (prev.hp_fraction(), current.hp_fraction()) {
            (Some(before), Some(after)) => hp_curve(after - before) * self.weights.hp,
            _ => 0.0,
        }
    }

    pub fn mana_term(&self, prev: &UnitRecord, current: &UnitRecord) -> f64 {
        match (prev.mp_fraction(), current.mp_fraction()) {
            (Some(before), Some(after)) => (after - before) * self.weights.mana,
            _ => 0.0,
        }
    }

    pub fn kill_term(&self, prev: &UnitRecord, current: &UnitRecord) -> f64 {
        let kills = delta(prev.kill_count, current.kill_count);
        if kills > 0.0 {
            kills * self.weights.kill
        } else {
            0.0
        }
    }
}

fn delta(before: f32, after: f32) -> f64 {
    f64::from(after) - f64::from(before)
}

impl RewardFunction for ShapedReward {
    type State = AgentObservation;

    fn compute(
        &self,
        prev: &AgentObservation,
        current: &AgentObservation,
        step_type: StepType,
        baseline: &AgentObservation,
    ) -> Reward {
        let (before, after) = (&prev.self_unit, &current.self_unit);
        let terms = [
            ("terminal", self.terminal_term(current, step_type, baseline)),
            ("death", self.death_term(before, after)),
            ("xp", self.xp_term(prev, current)),
            ("gold", self.gold_term(before, after)),
            ("hp", self.hp_term(before, after)),
            ("mana", self.mana_term(before, after)),
            ("kill", self.kill_term(before, after)),
        ];

        Reward {
            value: terms.iter().map(|(_, value)| value).sum(),
            components: terms
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
        }
    }

    fn components(&self) -> Vec<RewardComponentDef> {
        let w = &self.weights;
        [
            ("terminal", "kill differential at episode end", w.terminal),
            ("death", "own death", w.death),
            ("xp", "own minus enemy experience gained", w.xp),
            ("gold", "gold gained", w.gold),
            ("hp", "shaped change in health fraction", w.hp),
            ("mana", "change in mana fraction", w.mana),
            ("kill", "kills gained", w.kill),
        ]
        .into_iter()
        .map(|(name, description, weight)| RewardComponentDef {
            name: name.to_string(),
            description: Some(description.to_string()),
            weight,
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::SpellState;
    use std::collections::BTreeSet;

    const EPS: f64 = 1e-9;

    fn unit(user_id: i64) -> UnitRecord {
        UnitRecord {
            user_id,
            position_x: 0.0,
            position_y: 0.0,
            facing_angle: 0.0,
            current_hp: 100.0,
            max_hp: 100.0,
            hp_regen: 0.0,
            current_mp: 50.0,
            max_mp: 100.0,
            mp_regen: 0.0,
            attack_damage: 0.0,
            attack_speed: 0.0,
            armor: 0.0,
            mr: 0.0,
            level: 1.0,
            current_xp: 0.0,
            current_gold: 0.0,
            alive: 1.0,
            death_count: 0.0,
            kill_count: 0.0,
            spells: [SpellState::default(); 6],
            my_team: 0.0,
            dx_to_me: 0.0,
            dy_to_me: 0.0,
            distance_to_me: 0.0,
        }
    }

    fn obs(me: UnitRecord, enemy: UnitRecord) -> AgentObservation {
        AgentObservation {
            self_id: me.user_id,
            game_time: 0.0,
            self_unit: me,
            enemy_unit: enemy,
            others: Vec::new(),
            legal_action_mask: BTreeSet::new(),
        }
    }

    #[test]
    fn test_hp_curve_boundaries() {
        assert!((hp_curve(1.0) - 1.0).abs() < EPS);
        assert!((hp_curve(-1.0) + 8.0).abs() < EPS);
        assert!(hp_curve(0.0).abs() < EPS);

        let reward = ShapedReward::default();
        let mut empty = unit(1);
        empty.current_hp = 0.0;
        let full = unit(1);
        assert!((reward.hp_term(&empty, &full) - 2.0).abs() < EPS);
        assert!((reward.hp_term(&full, &empty) + 16.0).abs() < EPS);
    }

    #[test]
    fn test_xp_term_is_zero_sum() {
        let reward = ShapedReward::default();
        for (base, a, b) in [(0.0, 20.0, 5.0), (1000.0, 20.0, 5.0), (300.0, 0.0, 40.0)] {
            let mut me_before = unit(1);
            let mut enemy_before = unit(2);
            me_before.current_xp = base;
            enemy_before.current_xp = base * 2.0;
            let mut me_after = me_before.clone();
            let mut enemy_after = enemy_before.clone();
            me_after.current_xp += a;
            enemy_after.current_xp += b;

            let term = reward.xp_term(&obs(me_before, enemy_before), &obs(me_after, enemy_after));
            assert!((term - (f64::from(a) - f64::from(b)) * 0.002).abs() < EPS);
        }
    }

    #[test]
    fn test_zero_max_guards() {
        let reward = ShapedReward::default();
        let mut before = unit(1);
        let mut after = unit(1);
        before.max_hp = 0.0;
        before.max_mp = 0.0;
        after.current_hp = 20.0;
        assert_eq!(reward.hp_term(&before, &after), 0.0);
        assert_eq!(reward.mana_term(&before, &after), 0.0);
    }

    #[test]
    fn test_death_and_kill_terms() {
        let reward = ShapedReward::default();
        let before = unit(1);
        let mut after = unit(1);
        after.death_count = 1.0;
        after.kill_count = 2.0;
        assert_eq!(reward.death_term(&before, &after), -1.0);
        assert_eq!(reward.kill_term(&before, &after), 2.0);
        assert_eq!(reward.death_term(&after, &before), 0.0);
        assert_eq!(reward.kill_term(&after, &before), 0.0);
    }

    #[test]
    fn test_terminal_uses_episode_start_enemy_kills() {
        let reward = ShapedReward::default();
        let mut me = unit(1);
        me.kill_count = 2.0;
        let mut enemy_start = unit(2);
        enemy_start.kill_count = 1.0;
        let mut enemy_now = unit(2);
        enemy_now.kill_count = 3.0;

        let baseline = obs(unit(1), enemy_start);
        let current = obs(me, enemy_now);
        assert_eq!(reward.terminal_term(&current, StepType::Last, &baseline), 5.0);
        assert_eq!(reward.terminal_term(&current, StepType::Mid, &baseline), 0.0);

        let mut behind = current.clone();
        behind.self_unit.kill_count = 0.0;
        assert_eq!(reward.terminal_term(&behind, StepType::Last, &baseline), -5.0);
    }

    #[test]
    fn test_enemy_death_scenario() {
        let reward = ShapedReward::default();

        let mut me_before = unit(1);
        me_before.current_hp = 120.0;
        me_before.max_hp = 200.0;
        me_before.current_xp = 480.0;
        me_before.current_gold = 90.0;
        let mut enemy_before = unit(2);
        enemy_before.current_hp = 80.0;
        enemy_before.max_hp = 150.0;

        let mut me_now = me_before.clone();
        me_now.current_hp = 100.0;
        me_now.current_xp = 500.0;
        me_now.current_gold = 100.0;
        let mut enemy_now = enemy_before.clone();
        enemy_now.current_hp = 50.0;
        enemy_now.alive = 0.0;

        let prev = obs(me_before, enemy_before);
        let current = obs(me_now, enemy_now);
        assert!(current.someone_died());

        let result = reward.compute(&prev, &current, StepType::Last, &prev);
        let c = &result.components;
        assert_eq!(c["terminal"], 0.0);
        assert_eq!(c["death"], 0.0);
        assert!((c["xp"] - 0.04).abs() < EPS);
        assert!((c["gold"] - 0.06).abs() < EPS);
        let d: f64 = 100.0 / 200.0 - 120.0 / 200.0;
        assert!((c["hp"] - (d + 1.0 - (1.0 - d).powi(4))).abs() < EPS);
        assert_eq!(c["mana"], 0.0);
        assert_eq!(c["kill"], 0.0);

        let expected = 0.04 + 0.06 + (d + 1.0 - (1.0 - d).powi(4));
        assert!((result.value - expected).abs() < EPS);
        assert!((result.value - (-0.4641)).abs() < 1e-6);
    }

    #[test]
    fn test_components_listed_with_weights() {
        let defs = ShapedReward::default().components();
        assert_eq!(defs.len(), 7);
        assert_eq!(defs[0].name, "terminal");
        assert_eq!(defs[0].weight, 5.0);
    }
}
