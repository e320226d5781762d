//! Include-chain resolution.
//!
//! Callers declare navigation paths in any order. The resolver infers the
//! nesting from the entity types alone:
//!
//! - a path is a *root* when no other declared path targets its source type;
//! - a node's children are every declared path whose source type is the
//!   node's target type, matched against the whole batch at every level.
//!
//! ```rust
//! use stow_query::{Entity, IncludeResolver, Navigation};
//!
//! #[derive(Clone)]
//! struct Order;
//! #[derive(Clone)]
//! struct Customer;
//! #[derive(Clone)]
//! struct Address;
//!
//! impl Entity for Order {
//!     const ENTITY_NAME: &'static str = "Order";
//! }
//! impl Entity for Customer {
//!     const ENTITY_NAME: &'static str = "Customer";
//! }
//! impl Entity for Address {
//!     const ENTITY_NAME: &'static str = "Address";
//! }
//!
//! // Declared leaf-first; the resolver still nests Address under Customer.
//! let plan = IncludeResolver::new([
//!     Navigation::<Customer, Address>::reference("address").into_path(),
//!     Navigation::<Order, Customer>::reference("customer").into_path(),
//! ])
//! .resolve()
//! .unwrap();
//!
//! assert_eq!(plan.to_string(), "Order.customer -> Customer.address");
//! ```

use indexmap::IndexSet;
use tracing::trace;

use super::navigation::NavigationPath;
use super::plan::{LoadingPlan, PlanNode};
use crate::error::{QueryError, QueryResult};

/// Resolves a batch of navigation paths into a [`LoadingPlan`].
#[derive(Debug, Clone, Default)]
pub struct IncludeResolver {
    paths: IndexSet<NavigationPath>,
}

impl IncludeResolver {
    /// Create a resolver over a batch. Duplicate declarations collapse.
    pub fn new(paths: impl IntoIterator<Item = NavigationPath>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }

    /// The batch being resolved.
    pub fn paths(&self) -> &IndexSet<NavigationPath> {
        &self.paths
    }

    /// Check if a path in the batch is a root.
    pub fn is_root(&self, index: usize) -> bool {
        let Some(candidate) = self.paths.get_index(index) else {
            return false;
        };
        self.paths
            .iter()
            .enumerate()
            .all(|(other, path)| other == index || path.target() != candidate.source())
    }

    /// Indices of root paths, in declaration order.
    pub fn root_indices(&self) -> Vec<usize> {
        (0..self.paths.len()).filter(|&i| self.is_root(i)).collect()
    }

    /// Build the loading plan.
    ///
    /// Fails with [`ErrorCode::CyclicInclude`](crate::ErrorCode::CyclicInclude)
    /// when a chain leads back to a path already on it, or when some paths
    /// cannot be reached from any root because they only target each other.
    ///
    /// A path reachable from several parents is emitted once under each of
    /// them, so the plan can be much larger than the batch: a ladder of `n`
    /// levels where every level has two paths into the next yields `2^n`
    /// instructions for the last level.
    pub fn resolve(&self) -> QueryResult<LoadingPlan> {
        if self.paths.is_empty() {
            return Ok(LoadingPlan::empty());
        }

        let mut reached = vec![false; self.paths.len()];
        let mut chain = Vec::new();
        let mut roots = Vec::new();

        for index in self.root_indices() {
            roots.push(self.build(index, &mut chain, &mut reached)?);
        }

        if let Some(stranded) = reached.iter().position(|r| !r) {
            let cycle = self.stranded_cycle(stranded);
            return Err(QueryError::cyclic_include(&cycle[..]));
        }

        let plan = LoadingPlan::new(roots);
        trace!(paths = self.paths.len(), instructions = plan.len(), "Include chain resolved");
        Ok(plan)
    }

    fn build(
        &self,
        index: usize,
        chain: &mut Vec<usize>,
        reached: &mut [bool],
    ) -> QueryResult<PlanNode> {
        chain.push(index);
        reached[index] = true;
        let path = &self.paths[index];

        let mut children = Vec::new();
        for (next, candidate) in self.paths.iter().enumerate() {
            if !path.leads_to(candidate) {
                continue;
            }
            if chain.contains(&next) {
                let mut cycle: Vec<String> = chain
                    .iter()
                    .map(|&i| self.paths[i].to_string())
                    .collect();
                cycle.push(candidate.to_string());
                return Err(QueryError::cyclic_include(&cycle[..]));
            }
            children.push(self.build(next, chain, reached)?);
        }

        chain.pop();
        Ok(PlanNode::new(path.clone(), children))
    }

    // Walks target->source links from a path no root reached until one repeats.
    fn stranded_cycle(&self, start: usize) -> Vec<String> {
        let mut seen = vec![start];
        let mut current = start;
        loop {
            let next = self
                .paths
                .iter()
                .position(|candidate| candidate.target() == self.paths[current].source());
            match next {
                Some(next) if seen.contains(&next) => {
                    let from = seen.iter().position(|&i| i == next).unwrap_or(0);
                    let mut cycle: Vec<String> = seen[from..]
                        .iter()
                        .rev()
                        .map(|&i| self.paths[i].to_string())
                        .collect();
                    cycle.push(cycle[0].clone());
                    return cycle;
                }
                Some(next) => {
                    seen.push(next);
                    current = next;
                }
                None => return vec![self.paths[current].to_string()],
            }
        }
    }
}

/// Resolve a batch of paths into a loading plan.
pub fn resolve(paths: impl IntoIterator<Item = NavigationPath>) -> QueryResult<LoadingPlan> {
    IncludeResolver::new(paths).resolve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::relations::{LoadInstruction, Navigation};
    use crate::traits::Entity;
    use pretty_assertions::assert_eq;

    macro_rules! entities {
        ($($name:ident),*) => {
            $(
                #[derive(Clone)]
                struct $name;
                impl Entity for $name {
                    const ENTITY_NAME: &'static str = stringify!($name);
                }
            )*
        };
    }

    entities!(A, B, C, X, Y);

    fn ab() -> NavigationPath {
        Navigation::<A, B>::reference("b").into_path()
    }
    fn bc() -> NavigationPath {
        Navigation::<B, C>::collection("cs").into_path()
    }
    fn xy() -> NavigationPath {
        Navigation::<X, Y>::reference("y").into_path()
    }

    fn relations(instructions: &[LoadInstruction]) -> Vec<(usize, &str)> {
        instructions
            .iter()
            .map(|i| (i.depth(), i.path().relation()))
            .collect()
    }

    #[test]
    fn test_empty_batch() {
        let plan = resolve([]).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_single_path_is_simple_load() {
        let plan = resolve([ab()]).unwrap();
        assert_eq!(plan.roots().len(), 1);
        assert!(!plan.roots()[0].has_children());
    }

    #[test]
    fn test_chain_nests_under_single_root() {
        let plan = resolve([bc(), ab()]).unwrap();

        assert_eq!(plan.roots().len(), 1);
        assert_eq!(plan.roots()[0].path(), &ab());
        assert_eq!(plan.roots()[0].children()[0].path(), &bc());
        assert_eq!(relations(&plan.instructions()), vec![(0, "b"), (1, "cs")]);
    }

    #[test]
    fn test_unrelated_paths_are_independent_roots() {
        let plan = resolve([ab(), xy()]).unwrap();

        assert_eq!(plan.roots().len(), 2);
        assert!(plan.instructions().iter().all(LoadInstruction::is_base));
    }

    #[test]
    fn test_collection_target_matches_element_source() {
        entities!(D);
        let cd = Navigation::<C, D>::reference("d").into_path();

        let plan = resolve([ab(), bc(), cd]).unwrap();
        assert_eq!(
            relations(&plan.instructions()),
            vec![(0, "b"), (1, "cs"), (2, "d")]
        );
    }

    #[test]
    fn test_shared_child_under_two_parents() {
        let ac = Navigation::<A, C>::reference("c").into_path();
        let xc = Navigation::<X, C>::reference("c").into_path();
        entities!(D);
        let cd = Navigation::<C, D>::reference("d").into_path();

        let plan = resolve([ac, xc, cd]).unwrap();

        assert_eq!(plan.roots().len(), 2);
        assert_eq!(plan.roots()[0].children()[0].path().relation(), "d");
        assert_eq!(plan.roots()[1].children()[0].path().relation(), "d");
    }

    #[test]
    fn test_siblings_keep_declaration_order() {
        let ay = Navigation::<A, Y>::collection("ys").into_path();
        let plan = resolve([ay, ab()]).unwrap();
        let roots: Vec<_> = plan.roots().iter().map(|r| r.path().relation()).collect();
        assert_eq!(roots, vec!["ys", "b"]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let plan = resolve([ab(), ab(), bc()]).unwrap();
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn test_two_path_cycle_fails() {
        let ba = Navigation::<B, A>::reference("a").into_path();
        let err = resolve([ab(), ba]).unwrap_err();
        assert_eq!(err.code, ErrorCode::CyclicInclude);
        assert!(err.message.contains("A.b"));
        assert!(err.message.contains("B.a"));
    }

    #[test]
    fn test_self_reference_fails() {
        let aa = Navigation::<A, A>::reference("parent").into_path();
        let err = resolve([aa]).unwrap_err();
        assert_eq!(err.code, ErrorCode::CyclicInclude);
        assert!(err.message.contains("A.parent -> A.parent"));
    }

    #[test]
    fn test_unreachable_cycle_names_chain() {
        let ba = Navigation::<B, A>::reference("a").into_path();
        let err = resolve([xy(), ab(), ba]).unwrap_err();

        assert_eq!(err.code, ErrorCode::CyclicInclude);
        assert_eq!(err.message, "Include declarations form a cycle: B.a -> A.b -> B.a");
    }

    #[test]
    fn test_unreachable_cycle_through_three_paths() {
        let cb = Navigation::<C, B>::reference("b").into_path();
        let ba = Navigation::<B, A>::reference("a").into_path();
        let ac = Navigation::<A, C>::reference("c").into_path();
        let err = resolve([cb, ba, ab(), ac]).unwrap_err();

        assert_eq!(
            err.message,
            "Include declarations form a cycle: B.a -> A.c -> C.b -> B.a"
        );
    }

    #[test]
    fn test_cycle_below_root_fails() {
        let cb = Navigation::<C, B>::reference("b").into_path();
        let err = resolve([ab(), bc(), cb]).unwrap_err();
        assert_eq!(err.code, ErrorCode::CyclicInclude);
    }

    #[test]
    fn test_root_indices() {
        let resolver = IncludeResolver::new([bc(), ab(), xy()]);
        assert_eq!(resolver.root_indices(), vec![1, 2]);
        assert!(!resolver.is_root(0));
        assert!(!resolver.is_root(7));
    }
}
