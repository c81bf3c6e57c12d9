use crate::ModuleId;

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

/// An error type for illegal hierarchy operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// The container id is not registered.
    UnknownContainer(ModuleId),
    /// A module cannot be nested into itself.
    SelfNesting(ModuleId),
    /// Nesting would make the container a descendant of
    /// its own child.
    CyclicNesting(ModuleId),
    /// The child already belongs to a container.
    AlreadyNested { child: ModuleId, parent: ModuleId },
}

impl fmt::Display for HierarchyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownContainer(m) => write!(f, "container {} is not registered", m),
            Self::SelfNesting(m) => write!(f, "module {} cannot contain itself", m),
            Self::CyclicNesting(m) => {
                write!(f, "nesting module {} would create a containment cycle", m)
            }
            Self::AlreadyNested { child, parent } => {
                write!(f, "module {} is already a child of container {}", child, parent)
            }
        }
    }
}

impl Error for HierarchyError {}

/// The forest of regulation container modules, independent
/// of any one genome and persisted alongside the population.
/// Keys are container module ids; values are ordered lists of
/// child module ids. A module appears as a child of at most
/// one container.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulationHierarchy {
    containers: BTreeMap<ModuleId, Vec<ModuleId>>,
}

impl RegulationHierarchy {
    /// Creates an empty hierarchy.
    pub fn new() -> RegulationHierarchy {
        RegulationHierarchy::default()
    }

    /// Registers a module as a regulation container with no
    /// children. Re-registering an existing container leaves
    /// its children untouched.
    ///
    /// # Examples
    /// ```
    /// use oxiesp::populations::RegulationHierarchy;
    ///
    /// let mut hierarchy = RegulationHierarchy::new();
    /// hierarchy.add_container(2);
    ///
    /// assert!(hierarchy.is_container(2));
    /// assert!(hierarchy.children(2).is_empty());
    /// ```
    pub fn add_container(&mut self, id: ModuleId) {
        self.containers.entry(id).or_default();
    }

    /// Returns whether the module is a registered container.
    pub fn is_container(&self, id: ModuleId) -> bool {
        self.containers.contains_key(&id)
    }

    /// Returns the ordered list of the container's children,
    /// or an empty slice for unregistered modules.
    pub fn children(&self, parent: ModuleId) -> &[ModuleId] {
        self.containers
            .get(&parent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the container the module is nested in, if any.
    pub fn parent_of(&self, child: ModuleId) -> Option<ModuleId> {
        self.containers
            .iter()
            .find(|(_, children)| children.contains(&child))
            .map(|(parent, _)| *parent)
    }

    /// Returns an iterator over all registered container ids.
    pub fn container_ids(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.containers.keys().copied()
    }

    /// Returns whether any container has at least one child.
    pub fn has_nesting(&self) -> bool {
        self.containers.values().any(|children| !children.is_empty())
    }

    /// Nests `child` at the end of `parent`'s children list.
    ///
    /// # Errors
    /// Rejected if the parent is not a registered container,
    /// the child equals the parent, nesting would create a
    /// containment cycle, or the child is already nested.
    ///
    /// # Examples
    /// ```
    /// use oxiesp::populations::RegulationHierarchy;
    ///
    /// let mut hierarchy = RegulationHierarchy::new();
    /// hierarchy.add_container(2);
    /// hierarchy.nest_child(2, 5).unwrap();
    /// hierarchy.nest_child(2, 6).unwrap();
    ///
    /// assert_eq!(hierarchy.children(2), &[5, 6]);
    /// assert!(hierarchy.nest_child(2, 5).is_err());
    /// ```
    pub fn nest_child(&mut self, parent: ModuleId, child: ModuleId) -> Result<(), HierarchyError> {
        if parent == child {
            return Err(HierarchyError::SelfNesting(parent));
        }
        if !self.containers.contains_key(&parent) {
            return Err(HierarchyError::UnknownContainer(parent));
        }
        if let Some(existing) = self.parent_of(child) {
            return Err(HierarchyError::AlreadyNested {
                child,
                parent: existing,
            });
        }
        if self.is_descendant(parent, child) {
            return Err(HierarchyError::CyclicNesting(child));
        }
        self.containers
            .get_mut(&parent)
            .expect("container checked above")
            .push(child);
        Ok(())
    }

    /// Removes a container. With `cascade_children` set, any
    /// child that is itself a container is removed recursively,
    /// depth-first; otherwise the children are merely released
    /// from the container.
    ///
    /// # Errors
    /// Rejected if the container is not registered.
    pub fn remove_container(
        &mut self,
        id: ModuleId,
        cascade_children: bool,
    ) -> Result<(), HierarchyError> {
        let children = self
            .containers
            .remove(&id)
            .ok_or(HierarchyError::UnknownContainer(id))?;
        if cascade_children {
            for child in children {
                if self.is_container(child) {
                    self.remove_container(child, true)?;
                }
            }
        }
        Ok(())
    }

    /// Detaches the module from whichever container holds it,
    /// if any. Used when a module is deleted outright.
    pub fn release_child(&mut self, child: ModuleId) {
        for children in self.containers.values_mut() {
            children.retain(|c| *c != child);
        }
    }

    /// Gives `clone` an independent copy of `source`'s children
    /// list, referencing the same child module ids. Containment
    /// stays ambiguous on purpose: child modules end up listed
    /// under both containers until one is edited further.
    pub(super) fn clone_children(&mut self, source: ModuleId, clone: ModuleId) {
        if let Some(children) = self.containers.get(&source).cloned() {
            self.containers.insert(clone, children);
        }
    }

    fn is_descendant(&self, candidate: ModuleId, ancestor: ModuleId) -> bool {
        self.children(ancestor).iter().any(|child| {
            *child == candidate || self.is_descendant(candidate, *child)
        })
    }
}
