//! Game command identifiers and the function-call values submitted to the simulator

use std::fmt;

/// Queue flag argument meaning "execute now, do not queue behind current orders"
pub const NOT_QUEUED: [i32; 1] = [0];

/// Selection flag argument meaning "replace the current selection"
pub const SELECT_ALL: [i32; 1] = [0];

/// Subset of the simulator's function table used by this agent.
///
/// Discriminants are the simulator's function ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum FunctionId {
    NoOp = 0,
    SelectArmy = 7,
    AttackScreen = 12,
    HallucinationAdeptQuick = 66,
    HallucinationArchonQuick = 67,
    MoveScreen = 331,
}

impl FunctionId {
    pub fn id(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            FunctionId::NoOp => "no_op",
            FunctionId::SelectArmy => "select_army",
            FunctionId::AttackScreen => "Attack_screen",
            FunctionId::HallucinationAdeptQuick => "Hallucination_Adept_quick",
            FunctionId::HallucinationArchonQuick => "Hallucination_Archon_quick",
            FunctionId::MoveScreen => "Move_screen",
        }
    }

    pub fn is_hallucination(self) -> bool {
        matches!(
            self,
            FunctionId::HallucinationAdeptQuick | FunctionId::HallucinationArchonQuick
        )
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.id(), self.name())
    }
}

/// A game command plus its structured arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    pub function: FunctionId,
    pub arguments: Vec<Vec<i32>>,
}

impl FunctionCall {
    pub fn new(function: FunctionId, arguments: Vec<Vec<i32>>) -> Self {
        Self {
            function,
            arguments,
        }
    }

    pub fn no_op() -> Self {
        Self::new(FunctionId::NoOp, Vec::new())
    }

    pub fn select_army() -> Self {
        Self::new(FunctionId::SelectArmy, vec![SELECT_ALL.to_vec()])
    }

    /// Quick-cast command carrying only the `NOT_QUEUED` flag
    pub fn quick(function: FunctionId) -> Self {
        Self::new(function, vec![NOT_QUEUED.to_vec()])
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", self.function, self.arguments)
    }
}
