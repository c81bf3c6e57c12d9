use crate::genomics::{RegulatoryGate, NO_PANDEMONIUM};
use crate::{Innovation, ModuleId, BASE_MODULE};

use serde::{Deserialize, Serialize};

use std::fmt;

/// A NeuronRole indicates the function of the
/// neuron's network equivalent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeuronRole {
    /// The constant-activation bias neuron.
    Bias,
    /// Global input neurons.
    Input,
    /// Global output neurons.
    Output,
    /// The neuron whose activation gates a module's outputs.
    Regulatory,
    /// Module-scoped neurons fed from the rest of the network.
    LocalInput,
    /// Module-scoped neurons feeding the rest of the network.
    LocalOutput,
}

impl NeuronRole {
    /// Returns `true` for roles that belong to the base
    /// module (Bias, Input, Output) rather than to an
    /// evolvable module.
    ///
    /// # Examples
    /// ```
    /// use oxiesp::genomics::NeuronRole;
    ///
    /// assert!(NeuronRole::Bias.is_global());
    /// assert!(!NeuronRole::Regulatory.is_global());
    /// ```
    pub fn is_global(&self) -> bool {
        matches!(self, NeuronRole::Bias | NeuronRole::Input | NeuronRole::Output)
    }
}

/// Neurons are the structural elements of modular genomes.
/// Every neuron carries the id of the module it belongs to
/// (the base module for Bias/Input/Output roles); regulatory
/// neurons additionally carry the module's gate and its
/// pandemonium group tag.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Neuron {
    id: Innovation,
    role: NeuronRole,
    module: ModuleId,
    pandemonium: usize,
    gate: Option<RegulatoryGate>,
}

impl Neuron {
    /// Returns a new non-regulatory neuron with the
    /// specified parameters.
    ///
    /// # Examples
    /// ```
    /// use oxiesp::genomics::{Neuron, NeuronRole};
    ///
    /// let neuron = Neuron::new(5, NeuronRole::LocalInput, 2);
    ///
    /// assert_eq!(neuron.id(), 5);
    /// assert_eq!(neuron.module(), 2);
    /// ```
    pub fn new(id: Innovation, role: NeuronRole, module: ModuleId) -> Neuron {
        Neuron {
            id,
            role,
            module,
            pandemonium: NO_PANDEMONIUM,
            gate: None,
        }
    }

    /// Returns a new Bias/Input/Output neuron, assigned
    /// to the base module.
    pub fn global(id: Innovation, role: NeuronRole) -> Neuron {
        debug_assert!(role.is_global());
        Neuron::new(id, role, BASE_MODULE)
    }

    /// Returns a new regulatory neuron for the specified
    /// module, carrying the specified gate and no
    /// pandemonium group.
    ///
    /// # Examples
    /// ```
    /// use oxiesp::genomics::{Neuron, NeuronRole, RegulatoryGate};
    ///
    /// let neuron = Neuron::regulatory(7, 3, RegulatoryGate::Advanced);
    ///
    /// assert_eq!(neuron.role(), NeuronRole::Regulatory);
    /// assert!(neuron.gate().unwrap().is_advanced());
    /// ```
    pub fn regulatory(id: Innovation, module: ModuleId, gate: RegulatoryGate) -> Neuron {
        Neuron {
            id,
            role: NeuronRole::Regulatory,
            module,
            pandemonium: NO_PANDEMONIUM,
            gate: Some(gate),
        }
    }

    /// Returns the neuron's id.
    pub fn id(&self) -> Innovation {
        self.id
    }

    /// Returns the neuron's role.
    pub fn role(&self) -> NeuronRole {
        self.role
    }

    /// Returns the id of the module the neuron belongs to.
    pub fn module(&self) -> ModuleId {
        self.module
    }

    /// Returns the neuron's pandemonium group tag.
    /// Meaningful only on regulatory neurons;
    /// [`NO_PANDEMONIUM`] everywhere else.
    pub fn pandemonium(&self) -> usize {
        self.pandemonium
    }

    /// Sets the neuron's pandemonium group tag.
    pub fn set_pandemonium(&mut self, group: usize) {
        self.pandemonium = group;
    }

    /// Returns the gate attached to the neuron, if it
    /// is a regulatory neuron.
    pub fn gate(&self) -> Option<&RegulatoryGate> {
        self.gate.as_ref()
    }

    /// Replaces the gate attached to the neuron.
    pub fn set_gate(&mut self, gate: RegulatoryGate) {
        self.gate = Some(gate);
    }

    pub(crate) fn set_module(&mut self, module: ModuleId) {
        self.module = module;
    }

    pub(crate) fn set_id(&mut self, id: Innovation) {
        self.id = id;
    }
}

impl fmt::Display for Neuron {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}[{:?}, m{}", self.id, self.role, self.module)?;
        if self.pandemonium != NO_PANDEMONIUM {
            write!(f, ", p{}", self.pandemonium)?;
        }
        if let Some(gate) = &self.gate {
            write!(f, ", {}", gate)?;
        }
        write!(f, "]")
    }
}
