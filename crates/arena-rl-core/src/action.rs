//! Action schema and agent-issued actions
//!
//! The schema is a fixed catalogue of functions, each taking an ordered list
//! of typed arguments. Argument value spaces are either an enumeration or an
//! N-dimensional integer box `[0, size)`; the `position` and `move_range`
//! boxes come from the configured [`InterfaceFormat`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::InterfaceFormat;

/// Catalogue version reported by [`ActionSchema::version`]
pub const SCHEMA_VERSION: &str = "arena-rl/1";

/// Spell slots in simulator order: four abilities then two summoner spells
pub const SPELL_SLOTS: &[&str] = &["Q", "W", "E", "R", "D", "F"];

/// Symbolic targets, resolved against the acting agent's last observation
pub const TARGETS: &[&str] = &["self", "enemy"];

/// Functions an agent can call
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FunctionId {
    NoOp,
    Move,
    Spell,
    Attack,
    Teleport,
    MoveTo,
}

impl FunctionId {
    pub const ALL: [FunctionId; 6] = [
        FunctionId::NoOp,
        FunctionId::Move,
        FunctionId::Spell,
        FunctionId::Attack,
        FunctionId::Teleport,
        FunctionId::MoveTo,
    ];

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            FunctionId::NoOp => "no_op",
            FunctionId::Move => "move",
            FunctionId::Spell => "spell",
            FunctionId::Attack => "attack",
            FunctionId::Teleport => "teleport",
            FunctionId::MoveTo => "move_to",
        }
    }

    /// Ordered argument types
    pub fn args(self) -> &'static [ArgumentKind] {
        match self {
            FunctionId::NoOp => &[],
            FunctionId::Move => &[ArgumentKind::MoveRange],
            FunctionId::Spell => &[
                ArgumentKind::SpellSlot,
                ArgumentKind::Target,
                ArgumentKind::Position,
            ],
            FunctionId::Attack => &[ArgumentKind::Target],
            FunctionId::Teleport | FunctionId::MoveTo => &[ArgumentKind::Position],
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|f| i64::from(f.id()) == id)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Argument types used by the function catalogue
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentKind {
    /// Absolute map coordinate, bounded by the map size
    Position,
    /// Relative movement, bounded by the move range
    MoveRange,
    SpellSlot,
    Target,
}

impl ArgumentKind {
    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            ArgumentKind::Position => "position",
            ArgumentKind::MoveRange => "move_range",
            ArgumentKind::SpellSlot => "spell_slot",
            ArgumentKind::Target => "target",
        }
    }

    /// Named values for enumerated arguments
    pub fn values(self) -> Option<&'static [&'static str]> {
        match self {
            ArgumentKind::SpellSlot => Some(SPELL_SLOTS),
            ArgumentKind::Target => Some(TARGETS),
            ArgumentKind::Position | ArgumentKind::MoveRange => None,
        }
    }
}

/// Effective value space of one argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentSpec {
    pub kind: ArgumentKind,
    pub name: &'static str,
    /// Exclusive upper bound of each dimension
    pub sizes: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<&'static [&'static str]>,
}

impl ArgumentSpec {
    /// Look up an enumeration value by name
    pub fn resolve_name(&self, name: &str) -> Option<i64> {
        self.values?
            .iter()
            .position(|value| value.eq_ignore_ascii_case(name))
            .map(|index| index as i64)
    }

    /// Number of distinct values this argument can take
    pub fn cardinality(&self) -> u64 {
        self.sizes.iter().map(|&size| u64::from(size)).product()
    }
}

impl fmt::Display for ArgumentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.values {
            Some(values) => write!(f, "{}/{} {:?}", self.kind.id(), self.name, values),
            None => write!(f, "{}/{} {:?}", self.kind.id(), self.name, self.sizes),
        }
    }
}

/// A function with its resolved argument specs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionSpec {
    pub id: FunctionId,
    pub name: &'static str,
    pub args: Vec<ArgumentSpec>,
}

impl FunctionSpec {
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Number of distinct calls of this function
    pub fn cardinality(&self) -> u64 {
        self.args.iter().map(ArgumentSpec::cardinality).product()
    }
}

impl fmt::Display for FunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} (", self.id.id(), self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", arg)?;
        }
        f.write_str(")")
    }
}

/// Immutable catalogue of legal actions for one interface format
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionSchema {
    version: &'static str,
    interface: InterfaceFormat,
    functions: Vec<FunctionSpec>,
}

impl ActionSchema {
    pub fn new(interface: InterfaceFormat) -> Self {
        let functions = FunctionId::ALL
            .into_iter()
            .map(|id| FunctionSpec {
                id,
                name: id.name(),
                args: id
                    .args()
                    .iter()
                    .map(|&kind| Self::argument_spec(&interface, kind))
                    .collect(),
            })
            .collect();

        Self {
            version: SCHEMA_VERSION,
            interface,
            functions,
        }
    }

    fn argument_spec(interface: &InterfaceFormat, kind: ArgumentKind) -> ArgumentSpec {
        let sizes = match kind {
            ArgumentKind::Position => interface.map_size.sizes(),
            ArgumentKind::MoveRange => interface.move_range.sizes(),
            ArgumentKind::SpellSlot => vec![SPELL_SLOTS.len() as u32],
            ArgumentKind::Target => vec![TARGETS.len() as u32],
        };
        ArgumentSpec {
            kind,
            name: kind.name(),
            sizes,
            values: kind.values(),
        }
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn interface(&self) -> &InterfaceFormat {
        &self.interface
    }

    pub fn functions(&self) -> &[FunctionSpec] {
        &self.functions
    }

    /// Find a function by id or name
    pub fn function(&self, function: &FunctionRef) -> Option<&FunctionSpec> {
        let id = match function {
            FunctionRef::Id(id) => FunctionId::from_id(*id)?,
            FunctionRef::Name(name) => FunctionId::from_name(name)?,
        };
        self.functions.iter().find(|spec| spec.id == id)
    }

    /// Effective value space of an argument type
    pub fn argument(&self, kind: ArgumentKind) -> ArgumentSpec {
        Self::argument_spec(&self.interface, kind)
    }

    /// Total number of distinct calls across all functions
    pub fn flattened_size(&self) -> u64 {
        self.functions.iter().map(FunctionSpec::cardinality).sum()
    }
}

/// Reference to a function by numeric id or by name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FunctionRef {
    Id(i64),
    Name(String),
}

impl From<FunctionId> for FunctionRef {
    fn from(id: FunctionId) -> Self {
        FunctionRef::Id(i64::from(id.id()))
    }
}

impl From<&str> for FunctionRef {
    fn from(name: &str) -> Self {
        FunctionRef::Name(name.to_string())
    }
}

impl fmt::Display for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionRef::Id(id) => write!(f, "{}", id),
            FunctionRef::Name(name) => write!(f, "{:?}", name),
        }
    }
}

/// One argument value as supplied by an agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ArgValue {
    /// Bare integer for one-dimensional arguments
    Scalar(i64),
    /// Per-dimension integers
    Point(Vec<i64>),
    /// Enumeration value by name
    Named(String),
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Scalar(value)
    }
}

impl From<[i64; 2]> for ArgValue {
    fn from(value: [i64; 2]) -> Self {
        ArgValue::Point(value.to_vec())
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Named(value.to_string())
    }
}

/// An action chosen by an agent for one tick
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Action {
    pub function: FunctionRef,
    #[serde(default)]
    pub arguments: Vec<ArgValue>,
}

impl Action {
    pub fn new(function: impl Into<FunctionRef>, arguments: Vec<ArgValue>) -> Self {
        Self {
            function: function.into(),
            arguments,
        }
    }

    pub fn no_op() -> Self {
        Self::new(FunctionId::NoOp, Vec::new())
    }
}
