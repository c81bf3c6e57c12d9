use crate::{Innovation, ModuleId};

use serde::{Deserialize, Serialize};

use std::fmt;

/// Pandemonium tag meaning "no group": the module is
/// always eligible, mutually exclusive with nothing.
pub const NO_PANDEMONIUM: usize = 0;

/// Offset added to a container module's id to form the
/// pandemonium group its nested children are assigned to,
/// so siblings of the same container remain mutually
/// exclusive without colliding with user-chosen groups.
pub const NESTING_PANDEMONIUM_OFFSET: usize = 1000;

/// The kind of module being created: a plain module, or a
/// regulation container that other modules can be nested into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleKind {
    /// A plain module.
    Basic,
    /// A container module. Children nested into it feed its
    /// regulatory neuron and share a pandemonium group.
    Regulation,
}

/// The activation rule attached to a module's regulatory neuron,
/// defining when the module contributes output.
///
/// A `Basic` gate is a toggle on a single input neuron, realized
/// in the genome as at most two protected connections with fixed
/// weights. An `Advanced` gate is an arbitrary connection set, no
/// longer expressible as a toggle; nesting a module into a
/// container demotes its gate to `Advanced`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum RegulatoryGate {
    /// Module is active when `input` is active (or inactive,
    /// if `active_when_input_active` is false).
    Basic {
        input: Innovation,
        active_when_input_active: bool,
    },
    /// Arbitrary incoming connections decide activation.
    Advanced,
}

impl RegulatoryGate {
    /// Returns `true` if the gate is no longer expressible
    /// as a single-input toggle.
    ///
    /// # Examples
    /// ```
    /// use oxiesp::genomics::RegulatoryGate;
    ///
    /// assert!(RegulatoryGate::Advanced.is_advanced());
    /// assert!(!RegulatoryGate::Basic { input: 1, active_when_input_active: true }.is_advanced());
    /// ```
    pub fn is_advanced(&self) -> bool {
        matches!(self, RegulatoryGate::Advanced)
    }
}

impl fmt::Display for RegulatoryGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegulatoryGate::Basic {
                input,
                active_when_input_active,
            } => write!(
                f,
                "Basic[{} -> {}]",
                input,
                if *active_when_input_active {
                    "active"
                } else {
                    "inactive"
                }
            ),
            RegulatoryGate::Advanced => write!(f, "Advanced"),
        }
    }
}

/// Returns the pandemonium group nested children of the
/// given container are assigned to.
pub(crate) fn nested_group(parent: ModuleId) -> usize {
    parent + NESTING_PANDEMONIUM_OFFSET
}
