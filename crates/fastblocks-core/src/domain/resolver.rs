//! Deterministic, cycle-safe installation ordering.
//!
//! The graph is owned and index-based: registry position is the node id,
//! and edges point from a dependency to its dependents. Ordering is Kahn's
//! algorithm with a min-heap on registry position, so among modules that are
//! ready at the same time, the one declared first in the catalog wins.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tracing::{debug, instrument};

use crate::domain::entities::{ModuleDescriptor, Registry};
use crate::domain::DomainError;

/// What to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveTarget {
    One(String),
    Many(Vec<String>),
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Orders modules so every dependency precedes its dependents.
pub struct DependencyResolver<'r> {
    registry: &'r Registry,
}

impl<'r> DependencyResolver<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Resolve the transitive closure of `target` into installation order.
    ///
    /// # Errors
    ///
    /// - `ModuleNotFound` for an unknown requested id
    /// - `UnknownDependency` when a module depends on an id the registry lacks
    /// - `CyclicDependency` with the cycle as an ordered id list
    /// - `CommonBundleNotFound` / `SettingsBlockNotFound` for dangling references
    #[instrument(skip(self), fields(registry_size = self.registry.len()))]
    pub fn resolve(&self, target: &ResolveTarget) -> Result<Vec<&'r ModuleDescriptor>, DomainError> {
        let n = self.registry.len();
        let roots = self.roots(target)?;

        let mut marks = vec![Mark::Unvisited; n];
        let mut stack = Vec::new();
        let mut deps: Vec<Vec<usize>> = vec![Vec::new(); n];
        for root in roots {
            self.visit(root, &mut marks, &mut stack, &mut deps)?;
        }

        let closure: Vec<usize> = (0..n).filter(|&i| marks[i] == Mark::Done).collect();
        self.check_shared_references(&closure)?;

        let order = topological_order(&closure, &deps);
        debug!(count = order.len(), "resolved installation order");
        Ok(order
            .into_iter()
            .map(|i| &self.registry.modules()[i])
            .collect())
    }

    fn roots(&self, target: &ResolveTarget) -> Result<Vec<usize>, DomainError> {
        let lookup = |id: &str| {
            self.registry
                .position(id)
                .ok_or_else(|| DomainError::ModuleNotFound { id: id.to_string() })
        };
        match target {
            ResolveTarget::One(id) => Ok(vec![lookup(id)?]),
            ResolveTarget::Many(ids) => ids.iter().map(|id| lookup(id)).collect(),
            ResolveTarget::All => Ok((0..self.registry.len()).collect()),
        }
    }

    /// Depth-first walk; an edge back onto the stack is a cycle.
    fn visit(
        &self,
        node: usize,
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
        deps: &mut [Vec<usize>],
    ) -> Result<(), DomainError> {
        match marks[node] {
            Mark::Done => return Ok(()),
            Mark::OnStack => {
                let start = stack.iter().position(|&s| s == node).unwrap_or(0);
                let mut cycle: Vec<String> = stack[start..]
                    .iter()
                    .map(|&i| self.registry.modules()[i].id.clone())
                    .collect();
                cycle.push(self.registry.modules()[node].id.clone());
                return Err(DomainError::CyclicDependency { cycle });
            }
            Mark::Unvisited => {}
        }

        marks[node] = Mark::OnStack;
        stack.push(node);

        let module = &self.registry.modules()[node];
        for dep in &module.module_dependencies {
            let d = self
                .registry
                .position(dep)
                .ok_or_else(|| DomainError::UnknownDependency {
                    module: module.id.clone(),
                    missing: dep.clone(),
                })?;
            if !deps[node].contains(&d) {
                deps[node].push(d);
            }
            self.visit(d, marks, stack, deps)?;
        }

        stack.pop();
        marks[node] = Mark::Done;
        Ok(())
    }

    fn check_shared_references(&self, closure: &[usize]) -> Result<(), DomainError> {
        for &i in closure {
            let module = &self.registry.modules()[i];
            if let Some(id) = module
                .common_dependencies
                .iter()
                .find(|c| self.registry.common(c).is_none())
            {
                return Err(DomainError::CommonBundleNotFound { id: id.clone() });
            }
            if let Some(id) = module
                .config_dependencies
                .iter()
                .find(|c| self.registry.settings_block(c).is_none())
            {
                return Err(DomainError::SettingsBlockNotFound { id: id.clone() });
            }
        }
        Ok(())
    }
}

/// Kahn's algorithm over the closure, smallest registry position first.
fn topological_order(closure: &[usize], deps: &[Vec<usize>]) -> Vec<usize> {
    let n = deps.len();
    let mut indegree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for &m in closure {
        for &d in &deps[m] {
            indegree[m] += 1;
            dependents[d].push(m);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = closure
        .iter()
        .copied()
        .filter(|&m| indegree[m] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(closure.len());
    while let Some(Reverse(m)) = ready.pop() {
        order.push(m);
        for &dependent in &dependents[m] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }
    order
}
