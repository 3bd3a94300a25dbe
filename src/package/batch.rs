use std::collections::HashMap;

use log::warn;
use nonempty::NonEmpty;

use crate::package::{PackageDescriptor, PackageGraph, PackageNode};

/// Packages which can be built together: everything they depend on is in an earlier batch
pub type Batch = NonEmpty<PackageDescriptor>;

/// Number of not-yet-batched packages depending on each package. Entries are removed (never
/// decremented) once their package is batched.
type RefCounts<'a> = HashMap<&'a str, usize>;

/// Group `packages` into batches in dependency order.
///
/// A package is ready once none of its dependencies has a ref-count entry left, i.e. every
/// dependency has already been batched. If nothing is ready the remaining packages contain a
/// cycle: we log a warning and break it by batching only the package with the most dependents
/// (the last one in input order on ties).
///
/// Every package ends up in exactly one batch and batches keep input order. Names must be unique.
pub fn topologically_batch_packages(packages: impl IntoIterator<Item=PackageDescriptor>) -> Vec<Batch> {
    batch_packages_with(packages, |_| {})
}

/// [topologically_batch_packages], calling `on_cycle` with every package forced out of a cycle
pub fn batch_packages_with(
    packages: impl IntoIterator<Item=PackageDescriptor>,
    mut on_cycle: impl FnMut(&PackageDescriptor)
) -> Vec<Batch> {
    let mut remaining = packages.into_iter().collect::<Vec<_>>();
    let graph = PackageGraph::new(&remaining);
    let mut ref_counts = count_dependents(&graph);

    let mut batches = Vec::new();
    while !remaining.is_empty() {
        let (ready, blocked): (Vec<_>, Vec<_>) = remaining.into_iter()
            .partition(|package| is_ready(graph.get(&package.name), &ref_counts));
        remaining = blocked;

        let batch = match NonEmpty::from_vec(ready) {
            Some(batch) => batch,
            None => {
                let package = remaining.remove(most_depended_on(&remaining, &ref_counts));
                warn!(
                    "Encountered a cycle in the dependency graph, building {} alone. This may cause instability!",
                    package.name
                );
                on_cycle(&package);
                NonEmpty::new(package)
            }
        };

        for package in batch.iter() {
            ref_counts.remove(package.name.as_str());
        }
        batches.push(batch);
    }
    batches
}

fn count_dependents(graph: &PackageGraph) -> RefCounts<'_> {
    let mut ref_counts = RefCounts::new();
    for node in graph.nodes() {
        for dependency in node.dependency_names() {
            *ref_counts.entry(dependency.as_str()).or_insert(0) += 1;
        }
    }
    ref_counts
}

fn is_ready(node: Option<&PackageNode>, ref_counts: &RefCounts<'_>) -> bool {
    node.map_or(true, |node| node.dependency_names()
        .iter()
        .all(|dependency| ref_counts.get(dependency.as_str()).map_or(true, |count| *count == 0)))
}

/// Index of the package with the highest ref-count, the last one on ties
fn most_depended_on(packages: &[PackageDescriptor], ref_counts: &RefCounts<'_>) -> usize {
    packages.iter()
        .enumerate()
        .max_by_key(|(_, package)| ref_counts.get(package.name.as_str()).copied().unwrap_or(0))
        .map_or(0, |(index, _)| index)
}
