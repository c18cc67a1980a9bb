//! Action validation and wire encoding
//!
//! Validation resolves every argument against the schema's value spaces.
//! Encoding then maps the resolved values onto a [`WireAction`] using the
//! acting agent's previous observation for identity and targets.

use arena_bridge::WireAction;
use arena_rl_core::action::FunctionSpec;
use arena_rl_core::{
    Action, ActionSchema, AgentObservation, ArgValue, ArgumentKind, ArgumentSpec, FunctionId,
    ValidationError,
};

/// Wire units per agent move unit
const MOVE_SCALE: f64 = 100.0;

/// An action whose arguments have been resolved to in-range integers.
///
/// Only [`validate`] builds one, so every argument matches its function's
/// arity and dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAction {
    function: FunctionId,
    /// One entry per argument, one integer per dimension
    arguments: Vec<Vec<i64>>,
}

impl ValidatedAction {
    pub fn function(&self) -> FunctionId {
        self.function
    }

    pub fn arguments(&self) -> &[Vec<i64>] {
        &self.arguments
    }
}

/// Check an action against the schema; the first failure wins
pub fn validate(action: &Action, schema: &ActionSchema) -> Result<ValidatedAction, ValidationError> {
    let spec: &FunctionSpec = schema
        .function(&action.function)
        .ok_or_else(|| ValidationError::UnknownFunction(action.function.to_string()))?;

    if action.arguments.len() != spec.arity() {
        return Err(ValidationError::ArityMismatch {
            function: spec.name,
            expected: spec.arity(),
            got: action.arguments.len(),
        });
    }

    let arguments = spec
        .args
        .iter()
        .zip(&action.arguments)
        .map(|(arg, value)| resolve_argument(arg, value))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ValidatedAction {
        function: spec.id,
        arguments,
    })
}

fn resolve_argument(spec: &ArgumentSpec, value: &ArgValue) -> Result<Vec<i64>, ValidationError> {
    let values = match value {
        ArgValue::Scalar(v) => vec![*v],
        ArgValue::Point(vs) => vs.clone(),
        ArgValue::Named(name) => {
            let id = spec
                .resolve_name(name)
                .ok_or_else(|| ValidationError::UnknownEnumValue {
                    argument: spec.name,
                    value: name.clone(),
                    valid: spec.values.map(<[_]>::to_vec).unwrap_or_default(),
                })?;
            vec![id]
        }
    };

    if values.len() != spec.sizes.len() {
        return Err(ValidationError::ArgumentShape {
            argument: spec.name,
            expected: spec.sizes.len(),
            got: values.len(),
        });
    }

    for (dimension, (&value, &size)) in values.iter().zip(&spec.sizes).enumerate() {
        if value < 0 || value >= i64::from(size) {
            return Err(ValidationError::ArgumentOutOfRange {
                argument: spec.name,
                dimension,
                value,
                size,
            });
        }
    }

    Ok(values)
}

/// Map a validated action onto the wire.
///
/// `move` arguments are centred on the middle of the move range and scaled to
/// wire units; positions pass through unchanged.
pub fn encode(
    previous: &AgentObservation,
    action: &ValidatedAction,
    schema: &ActionSchema,
) -> WireAction {
    let player_id = previous.self_id;
    let arg = |index: usize| action.arguments[index].as_slice();
    let target = |index: usize| match arg(index)[0] {
        0 => previous.self_unit.user_id,
        _ => previous.enemy_unit.user_id,
    };
    let point = |values: &[i64]| (values[0] as f64, values[1] as f64);

    match action.function {
        FunctionId::NoOp => WireAction::NoOp { player_id },
        FunctionId::Move => {
            let sizes = schema.argument(ArgumentKind::MoveRange).sizes;
            let centred = |value: i64, size: u32| (value as f64 - f64::from(size) / 2.0) * MOVE_SCALE;
            WireAction::Move {
                player_id,
                x: centred(arg(0)[0], sizes[0]),
                y: centred(arg(0)[1], sizes[1]),
            }
        }
        FunctionId::Spell => {
            let (x, y) = point(arg(2));
            WireAction::Spell {
                player_id,
                target_player_id: target(1),
                spell_slot: arg(0)[0] as u8,
                x,
                y,
            }
        }
        FunctionId::Attack => WireAction::Attack {
            player_id,
            target_player_id: target(0),
        },
        FunctionId::Teleport => {
            let (x, y) = point(arg(0));
            WireAction::Teleport { player_id, x, y }
        }
        FunctionId::MoveTo => {
            let (x, y) = point(arg(0));
            WireAction::MoveTo { player_id, x, y }
        }
    }
}

/// Validate an agent action and encode it for the simulator
pub fn validate_and_encode(
    previous: &AgentObservation,
    action: &Action,
    schema: &ActionSchema,
) -> Result<WireAction, ValidationError> {
    let validated = validate(action, schema)?;
    Ok(encode(previous, &validated, schema))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features;
    use arena_rl_core::{FunctionRef, InterfaceFormat, RawObservation};
    use serde_json::json;

    fn schema() -> ActionSchema {
        ActionSchema::new(InterfaceFormat::default())
    }

    fn previous() -> AgentObservation {
        let raw = json!({
            "game_time": 3.0,
            "self_id": 1,
            "champ_units": [
                {"user_id": 1, "current_hp": 500, "max_hp": 600, "current_mp": 100, "max_mp": 300,
                 "current_xp": 0, "current_gold": 475, "alive": 1, "death_count": 0,
                 "kill_count": 0, "my_team": 1, "distance_to_me": 0},
                {"user_id": 2, "current_hp": 550, "max_hp": 650, "current_mp": 0, "max_mp": 0,
                 "current_xp": 0, "current_gold": 475, "alive": 1, "death_count": 0,
                 "kill_count": 0, "my_team": 0, "distance_to_me": 900}
            ]
        });
        let raw: RawObservation = serde_json::from_value(raw).unwrap();
        features::decode(raw).unwrap()
    }

    /// Smallest and largest valid call of every function
    fn boundary_calls(schema: &ActionSchema) -> Vec<(Action, Action)> {
        schema
            .functions()
            .iter()
            .map(|spec| {
                let low = spec
                    .args
                    .iter()
                    .map(|arg| ArgValue::Point(vec![0; arg.sizes.len()]))
                    .collect();
                let high = spec
                    .args
                    .iter()
                    .map(|arg| {
                        ArgValue::Point(arg.sizes.iter().map(|&s| i64::from(s) - 1).collect())
                    })
                    .collect();
                (Action::new(spec.id, low), Action::new(spec.id, high))
            })
            .collect()
    }

    #[test]
    fn test_every_function_accepts_its_bounds() {
        let schema = schema();
        for (low, high) in boundary_calls(&schema) {
            assert!(validate(&low, &schema).is_ok(), "{:?}", low);
            assert!(validate(&high, &schema).is_ok(), "{:?}", high);
        }
    }

    #[test]
    fn test_every_argument_rejects_just_outside_bounds() {
        let schema = schema();
        for spec in schema.functions() {
            for (index, arg) in spec.args.iter().enumerate() {
                let size = i64::from(arg.sizes[0]);
                for bad in [-1, size] {
                    let mut arguments: Vec<ArgValue> = spec
                        .args
                        .iter()
                        .map(|a| ArgValue::Point(vec![0; a.sizes.len()]))
                        .collect();
                    let mut point = vec![0; arg.sizes.len()];
                    point[0] = bad;
                    arguments[index] = ArgValue::Point(point);

                    let err = validate(&Action::new(spec.id, arguments), &schema).unwrap_err();
                    assert_eq!(
                        err,
                        ValidationError::ArgumentOutOfRange {
                            argument: arg.name,
                            dimension: 0,
                            value: bad,
                            size: arg.sizes[0],
                        }
                    );
                }
            }
        }
    }

    #[test]
    fn test_unknown_function_and_arity() {
        let schema = schema();
        assert_eq!(
            validate(&Action::new("dance", vec![]), &schema).unwrap_err(),
            ValidationError::UnknownFunction("\"dance\"".into())
        );
        assert_eq!(
            validate(&Action::new(FunctionRef::Id(42), vec![]), &schema).unwrap_err(),
            ValidationError::UnknownFunction("42".into())
        );
        assert_eq!(
            validate(&Action::new(FunctionId::Attack, vec![]), &schema).unwrap_err(),
            ValidationError::ArityMismatch {
                function: "attack",
                expected: 1,
                got: 0
            }
        );
    }

    #[test]
    fn test_shape_and_enum_errors() {
        let schema = schema();
        let err = validate(&Action::new(FunctionId::Move, vec![ArgValue::Scalar(3)]), &schema)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::ArgumentShape {
                argument: "move_range",
                expected: 2,
                got: 1
            }
        );

        let err = validate(&Action::new(FunctionId::Attack, vec!["ally".into()]), &schema)
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnknownEnumValue { argument: "target", ref value, .. } if value == "ally"
        ));
    }

    #[test]
    fn test_enum_by_name_matches_enum_by_id() {
        let schema = schema();
        let previous = previous();
        let by_name = Action::new(
            FunctionId::Spell,
            vec!["R".into(), "enemy".into(), [7000, 7100].into()],
        );
        let by_id = Action::new(
            FunctionId::Spell,
            vec![3.into(), 1.into(), [7000, 7100].into()],
        );
        let by_function_name = Action::new(
            "spell",
            vec!["r".into(), "Enemy".into(), [7000, 7100].into()],
        );

        let expected = WireAction::Spell {
            player_id: 1,
            target_player_id: 2,
            spell_slot: 3,
            x: 7000.0,
            y: 7100.0,
        };
        assert_eq!(validate_and_encode(&previous, &by_name, &schema).unwrap(), expected);
        assert_eq!(validate_and_encode(&previous, &by_id, &schema).unwrap(), expected);
        assert_eq!(
            validate_and_encode(&previous, &by_function_name, &schema).unwrap(),
            expected
        );
    }

    #[test]
    fn test_validate_resolves_names_to_ids() {
        let schema = schema();
        let action = Action::new(
            "spell",
            vec!["R".into(), "enemy".into(), [7000, 7100].into()],
        );
        let validated = validate(&action, &schema).unwrap();
        assert_eq!(validated.function(), FunctionId::Spell);
        assert_eq!(validated.arguments(), &[vec![3], vec![1], vec![7000, 7100]]);

        let wire = encode(&previous(), &validated, &schema);
        assert_eq!(wire, validate_and_encode(&previous(), &action, &schema).unwrap());
    }

    #[test]
    fn test_move_is_centred_and_scaled() {
        let schema = schema();
        let previous = previous();
        let wire = validate_and_encode(
            &previous,
            &Action::new(FunctionId::Move, vec![[0, 7].into()]),
            &schema,
        )
        .unwrap();
        assert_eq!(
            wire,
            WireAction::Move {
                player_id: 1,
                x: -400.0,
                y: 300.0
            }
        );
    }

    #[test]
    fn test_targets_resolve_from_previous_observation() {
        let schema = schema();
        let previous = previous();
        let attack_self = Action::new(FunctionId::Attack, vec!["self".into()]);
        assert_eq!(
            validate_and_encode(&previous, &attack_self, &schema).unwrap(),
            WireAction::Attack {
                player_id: 1,
                target_player_id: 1
            }
        );
        assert_eq!(
            validate_and_encode(&previous, &Action::no_op(), &schema).unwrap(),
            WireAction::NoOp { player_id: 1 }
        );
    }

    #[test]
    fn test_validation_is_idempotent() {
        let schema = schema();
        let previous = previous();
        let actions = [
            Action::new(FunctionId::Teleport, vec![[15999, 0].into()]),
            Action::new(FunctionId::MoveTo, vec![[16000, 0].into()]),
            Action::new(FunctionId::Spell, vec!["Z".into(), "self".into(), [1, 1].into()]),
        ];
        for action in &actions {
            let first = validate_and_encode(&previous, action, &schema);
            let second = validate_and_encode(&previous, action, &schema);
            assert_eq!(first, second);
        }
    }
}
