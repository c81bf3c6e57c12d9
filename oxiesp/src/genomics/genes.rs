use crate::{Innovation, ModuleId};

use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};

use std::fmt;

/// Connections are the edges of modular genomes. Each carries
/// the innovation number assigned by the external NEAT library,
/// the id of the module it belongs to, and a protected flag.
/// Protected connections realize a module's basic regulatory
/// gate and are never rewritten by weight edits.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Connection {
    id: Innovation,
    source: Innovation,
    target: Innovation,
    weight: f32,
    module: ModuleId,
    protected: bool,
}

impl Connection {
    /// Returns a new _unprotected_ connection with the
    /// specified parameters.
    ///
    /// # Examples
    /// ```
    /// use oxiesp::genomics::Connection;
    ///
    /// let connection = Connection::new(42, 3, 9, 2.0, 1);
    ///
    /// assert_eq!(connection.innovation(), 42);
    /// assert!(!connection.protected());
    /// ```
    pub fn new(
        id: Innovation,
        source: Innovation,
        target: Innovation,
        weight: f32,
        module: ModuleId,
    ) -> Connection {
        Connection {
            id,
            source,
            target,
            weight,
            module,
            protected: false,
        }
    }

    /// Returns a new _protected_ connection with the
    /// specified parameters.
    pub fn new_protected(
        id: Innovation,
        source: Innovation,
        target: Innovation,
        weight: f32,
        module: ModuleId,
    ) -> Connection {
        Connection {
            id,
            source,
            target,
            weight,
            module,
            protected: true,
        }
    }

    /// Returns a random weight. Uses a uniform
    /// distribution over the range ±`bound`.
    pub(crate) fn random_weight(bound: f32) -> f32 {
        thread_rng().gen_range(-bound..=bound)
    }

    /// Returns the connection's innovation number.
    pub fn innovation(&self) -> Innovation {
        self.id
    }

    /// Returns the connection's source neuron id.
    pub fn source(&self) -> Innovation {
        self.source
    }

    /// Returns the connection's target neuron id.
    pub fn target(&self) -> Innovation {
        self.target
    }

    /// Returns the connection's weight.
    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Sets the connection's weight.
    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight;
    }

    /// Returns the id of the module the connection belongs to.
    pub fn module(&self) -> ModuleId {
        self.module
    }

    /// Returns whether the connection realizes a regulatory
    /// gate and is protected from weight edits.
    pub fn protected(&self) -> bool {
        self.protected
    }

    pub(crate) fn set_target(&mut self, target: Innovation) {
        self.target = target;
    }

    pub(crate) fn set_source(&mut self, source: Innovation) {
        self.source = source;
    }

    pub(crate) fn set_id(&mut self, id: Innovation) {
        self.id = id;
    }

    pub(crate) fn set_module(&mut self, module: ModuleId) {
        self.module = module;
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:?}[{:?}->{:?}, {:.3}, m{}]{}",
            if self.protected { "<" } else { "" },
            self.id,
            self.source,
            self.target,
            self.weight,
            self.module,
            if self.protected { ">" } else { "" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_constructor_sets_the_flag() {
        let gating = Connection::new_protected(7, 0, 4, 1.0, 1);
        assert!(gating.protected());
        assert!(!Connection::new(8, 0, 4, 1.0, 1).protected());
    }

    #[test]
    fn random_weight_is_bounded() {
        for _ in 0..100 {
            let w = Connection::random_weight(2.5);
            assert!(w.abs() <= 2.5);
        }
    }
}
