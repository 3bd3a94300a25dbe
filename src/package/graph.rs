use std::collections::HashSet;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::package::PackageDescriptor;

/// A package in a [PackageGraph]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageNode {
    name: String,
    /// Dependencies which are also in the graph: regular first, then peer, in manifest order.
    /// A package listed as both appears twice.
    dependency_names: SmallVec<[String; 4]>,
}

/// Dependencies between the packages of one set. Dependencies outside of the set are dropped.
#[derive(Debug, Clone)]
pub struct PackageGraph {
    nodes: IndexMap<String, PackageNode>,
}

impl PackageNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependency_names(&self) -> &[String] {
        &self.dependency_names
    }
}

impl PackageGraph {
    /// Build the graph of `packages`. Names must be unique; for duplicates the last one wins.
    pub fn new(packages: &[PackageDescriptor]) -> Self {
        let names = packages.iter()
            .map(|package| package.name.as_str())
            .collect::<HashSet<_>>();
        let nodes = packages.iter()
            .map(|package| {
                let node = PackageNode {
                    name: package.name.clone(),
                    dependency_names: package.all_dependency_names()
                        .filter(|dependency| names.contains(dependency))
                        .map(String::from)
                        .collect()
                };
                (package.name.clone(), node)
            })
            .collect();
        Self { nodes }
    }

    pub fn get(&self, name: &str) -> Option<&PackageNode> {
        self.nodes.get(name)
    }

    /// Nodes in input order
    pub fn nodes(&self) -> impl Iterator<Item=&PackageNode> + '_ {
        self.nodes.values()
    }
}
