//! Structured fuzzing for include-chain resolution.
//!
//! Generates arbitrary batches of navigation paths over a small set of
//! entity types, so chains, shared children and cycles all show up.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_include_resolver
//! ```

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use stow_query::{Cardinality, Entity, EntityKind, ErrorCode, IncludeResolver, NavigationPath};

#[derive(Clone)]
struct Node<const N: usize>;

const NODE_NAMES: [&str; 6] = ["Node0", "Node1", "Node2", "Node3", "Node4", "Node5"];

impl<const N: usize> Entity for Node<N> {
    const ENTITY_NAME: &'static str = NODE_NAMES[N];
}

fn kinds() -> [EntityKind; 6] {
    [
        EntityKind::of::<Node<0>>(),
        EntityKind::of::<Node<1>>(),
        EntityKind::of::<Node<2>>(),
        EntityKind::of::<Node<3>>(),
        EntityKind::of::<Node<4>>(),
        EntityKind::of::<Node<5>>(),
    ]
}

/// A generated navigation path.
#[derive(Debug, Arbitrary)]
struct FuzzPath {
    source: u8,
    target: u8,
    relation: u8,
    many: bool,
}

fuzz_target!(|batch: Vec<FuzzPath>| {
    let kinds = kinds();
    let paths: Vec<NavigationPath> = batch
        .iter()
        .take(16)
        .map(|p| {
            NavigationPath::new(
                format!("r{}", p.relation % 4),
                kinds[p.source as usize % kinds.len()],
                kinds[p.target as usize % kinds.len()],
                if p.many { Cardinality::Many } else { Cardinality::One },
            )
        })
        .collect();

    match IncludeResolver::new(paths).resolve() {
        Ok(plan) => {
            // Every chained load must continue from the load before it
            for instruction in plan.instructions() {
                if let Some(parent) = instruction.ancestry().last() {
                    assert!(parent.leads_to(instruction.path()));
                }
            }
        }
        Err(err) => assert_eq!(err.code, ErrorCode::CyclicInclude),
    }
});
