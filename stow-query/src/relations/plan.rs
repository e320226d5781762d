//! Loading plans produced by the include resolver.

use std::fmt;

use super::navigation::NavigationPath;

/// A sink for eager-load instructions.
///
/// A chained load is only ever emitted after the loads of all of its
/// ancestors, so an implementation can attach it to the chain it has already
/// built for `ancestry`.
pub trait IncludeSink {
    /// Attach a top-level load.
    fn include(&mut self, path: &NavigationPath);

    /// Attach a load chained after `ancestry` (root first).
    fn then_include(&mut self, ancestry: &[NavigationPath], path: &NavigationPath);
}

/// One node of a loading plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanNode {
    path: NavigationPath,
    children: Vec<PlanNode>,
}

impl PlanNode {
    pub(crate) fn new(path: NavigationPath, children: Vec<PlanNode>) -> Self {
        Self { path, children }
    }

    /// The path loaded at this node.
    pub fn path(&self) -> &NavigationPath {
        &self.path
    }

    /// Loads chained after this node.
    pub fn children(&self) -> &[PlanNode] {
        &self.children
    }

    /// Check if this node has chained loads.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Number of nodes in this subtree, including this one.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(PlanNode::size).sum::<usize>()
    }

    fn emit(&self, ancestry: &mut Vec<NavigationPath>, sink: &mut impl IncludeSink) {
        if ancestry.is_empty() {
            sink.include(&self.path);
        } else {
            sink.then_include(ancestry, &self.path);
        }

        ancestry.push(self.path.clone());
        for child in &self.children {
            child.emit(ancestry, sink);
        }
        ancestry.pop();
    }

    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)?;
        match self.children.as_slice() {
            [] => Ok(()),
            [only] => {
                f.write_str(" -> ")?;
                only.render(f)
            }
            children => {
                f.write_str(" -> (")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    child.render(f)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A single eager-load instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadInstruction {
    ancestry: Vec<NavigationPath>,
    path: NavigationPath,
}

impl LoadInstruction {
    /// A top-level load.
    pub fn base(path: NavigationPath) -> Self {
        Self {
            ancestry: Vec::new(),
            path,
        }
    }

    /// A load chained after `ancestry`.
    pub fn chained(ancestry: Vec<NavigationPath>, path: NavigationPath) -> Self {
        Self { ancestry, path }
    }

    /// The path loaded by this instruction.
    pub fn path(&self) -> &NavigationPath {
        &self.path
    }

    /// The chain this load hangs off, root first.
    pub fn ancestry(&self) -> &[NavigationPath] {
        &self.ancestry
    }

    /// Check if this is a top-level load.
    pub fn is_base(&self) -> bool {
        self.ancestry.is_empty()
    }

    /// Nesting depth; zero for a top-level load.
    pub fn depth(&self) -> usize {
        self.ancestry.len()
    }
}

impl fmt::Display for LoadInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_base() {
            write!(f, "include({})", self.path)
        } else {
            write!(f, "then_include({})", self.path)
        }
    }
}

/// Collects instructions in emission order.
impl IncludeSink for Vec<LoadInstruction> {
    fn include(&mut self, path: &NavigationPath) {
        self.push(LoadInstruction::base(path.clone()));
    }

    fn then_include(&mut self, ancestry: &[NavigationPath], path: &NavigationPath) {
        self.push(LoadInstruction::chained(ancestry.to_vec(), path.clone()));
    }
}

/// The resolved, ordered set of loads for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingPlan {
    roots: Vec<PlanNode>,
}

impl LoadingPlan {
    pub(crate) fn new(roots: Vec<PlanNode>) -> Self {
        Self { roots }
    }

    /// A plan that loads nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Root trees, in declaration order.
    pub fn roots(&self) -> &[PlanNode] {
        &self.roots
    }

    /// Check if the plan loads nothing.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of load instructions the plan emits.
    pub fn len(&self) -> usize {
        self.roots.iter().map(PlanNode::size).sum()
    }

    /// Emit every instruction into `sink`: each root, then its descendants
    /// depth-first.
    pub fn apply(&self, sink: &mut impl IncludeSink) {
        let mut ancestry = Vec::new();
        for root in &self.roots {
            root.emit(&mut ancestry, sink);
        }
    }

    /// The linear instruction sequence.
    pub fn instructions(&self) -> Vec<LoadInstruction> {
        let mut out = Vec::with_capacity(self.len());
        self.apply(&mut out);
        out
    }
}

impl fmt::Display for LoadingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.roots.is_empty() {
            return f.write_str("<empty>");
        }
        for (i, root) in self.roots.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            root.render(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::Navigation;
    use crate::traits::Entity;
    use pretty_assertions::assert_eq;

    #[derive(Clone)]
    struct Order;
    #[derive(Clone)]
    struct Customer;
    #[derive(Clone)]
    struct Address;

    impl Entity for Order {
        const ENTITY_NAME: &'static str = "Order";
    }
    impl Entity for Customer {
        const ENTITY_NAME: &'static str = "Customer";
    }
    impl Entity for Address {
        const ENTITY_NAME: &'static str = "Address";
    }

    fn chain() -> LoadingPlan {
        let customer = Navigation::<Order, Customer>::reference("customer").into_path();
        let address = Navigation::<Customer, Address>::reference("address").into_path();
        LoadingPlan::new(vec![PlanNode::new(
            customer,
            vec![PlanNode::new(address, Vec::new())],
        )])
    }

    #[test]
    fn test_empty_plan() {
        let plan = LoadingPlan::empty();
        assert!(plan.is_empty());
        assert_eq!(plan.len(), 0);
        assert!(plan.instructions().is_empty());
        assert_eq!(plan.to_string(), "<empty>");
    }

    #[test]
    fn test_instructions_carry_ancestry() {
        let plan = chain();
        let instructions = plan.instructions();

        assert_eq!(instructions.len(), 2);
        assert!(instructions[0].is_base());
        assert_eq!(instructions[0].path().relation(), "customer");
        assert_eq!(instructions[1].depth(), 1);
        assert_eq!(instructions[1].ancestry()[0].relation(), "customer");
        assert_eq!(instructions[1].path().relation(), "address");
    }

    #[test]
    fn test_display() {
        assert_eq!(chain().to_string(), "Order.customer -> Customer.address");
        assert_eq!(
            chain().instructions()[1].to_string(),
            "then_include(Customer.address)"
        );
    }
}
