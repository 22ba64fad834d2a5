//! The workspace dependency graph.
//!
//! Packages live in a flat name-keyed arena; edges are sets of names, never
//! references. Cycles can therefore exist in the dependency relation and are
//! detected and reported instead of materialized.

use std::collections::{BTreeMap, BTreeSet};

use shipit_pkg_tools::Package;

use crate::error::WorkspaceError;

/// Directed dependency graph over workspace package names.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// name → names it depends on (intra-workspace edges only)
    pub deps: BTreeMap<String, BTreeSet<String>>,
    /// name → names that depend on it
    pub dependents: BTreeMap<String, BTreeSet<String>>,
    /// Depth-first post-order over all nodes; dependency-leaves first
    pub order: Vec<String>,
    /// Recorded cycles, each as the node sequence closing the loop
    pub cycles: Vec<Vec<String>>,
}

#[derive(Clone, Copy, PartialEq)]
enum VisitState {
    Unvisited,
    OnStack,
    Done,
}

impl DependencyGraph {
    /// Builds the graph for a set of packages.
    ///
    /// Edges are the intersection of each package's declared dependency
    /// names (runtime, dev and peer) with the workspace package set. A
    /// self-dependency is recorded as a one-node cycle.
    #[must_use]
    pub fn build(packages: &BTreeMap<String, Package>) -> Self {
        let mut deps: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut dependents: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for name in packages.keys() {
            deps.entry(name.clone()).or_default();
            dependents.entry(name.clone()).or_default();
        }

        let mut cycles: Vec<Vec<String>> = Vec::new();

        for (name, pkg) in packages {
            for (dep_name, _spec) in pkg.declared_dependencies() {
                if !packages.contains_key(&dep_name) {
                    continue;
                }
                if dep_name == *name {
                    cycles.push(vec![name.clone(), name.clone()]);
                    continue;
                }
                deps.entry(name.clone()).or_default().insert(dep_name.clone());
                dependents.entry(dep_name).or_default().insert(name.clone());
            }
        }

        let (order, mut dfs_cycles) = Self::depth_first_order(&deps);
        cycles.append(&mut dfs_cycles);

        Self { deps, dependents, order, cycles }
    }

    /// Depth-first post-order with cycle recording.
    ///
    /// Nodes and neighbors are visited in name order, which makes the
    /// resulting order deterministic and breaks ties lexicographically.
    fn depth_first_order(
        deps: &BTreeMap<String, BTreeSet<String>>,
    ) -> (Vec<String>, Vec<Vec<String>>) {
        let mut states: BTreeMap<&str, VisitState> =
            deps.keys().map(|name| (name.as_str(), VisitState::Unvisited)).collect();
        let mut order: Vec<String> = Vec::with_capacity(deps.len());
        let mut cycles: Vec<Vec<String>> = Vec::new();
        let mut stack: Vec<&str> = Vec::new();

        fn visit<'a>(
            node: &'a str,
            deps: &'a BTreeMap<String, BTreeSet<String>>,
            states: &mut BTreeMap<&'a str, VisitState>,
            stack: &mut Vec<&'a str>,
            order: &mut Vec<String>,
            cycles: &mut Vec<Vec<String>>,
        ) {
            states.insert(node, VisitState::OnStack);
            stack.push(node);

            if let Some(neighbors) = deps.get(node) {
                for next in neighbors {
                    match states.get(next.as_str()).copied() {
                        Some(VisitState::Unvisited) => {
                            visit(next, deps, states, stack, order, cycles);
                        }
                        Some(VisitState::OnStack) => {
                            // Back edge: the slice of the stack from the
                            // re-entered node closes a cycle.
                            let start = stack
                                .iter()
                                .position(|&n| n == next.as_str())
                                .unwrap_or(0);
                            let mut cycle: Vec<String> =
                                stack[start..].iter().map(ToString::to_string).collect();
                            cycle.push(next.clone());
                            cycles.push(cycle);
                        }
                        _ => {}
                    }
                }
            }

            stack.pop();
            states.insert(node, VisitState::Done);
            order.push(node.to_string());
        }

        for name in deps.keys() {
            if states.get(name.as_str()) == Some(&VisitState::Unvisited) {
                visit(name, deps, &mut states, &mut stack, &mut order, &mut cycles);
            }
        }

        (order, cycles)
    }

    /// Topological order restricted to `subset` (or all nodes).
    ///
    /// # Errors
    ///
    /// Fails with `WorkspaceError::CycleDetected` when a recorded cycle
    /// touches the subset.
    pub fn topological_order(
        &self,
        subset: Option<&BTreeSet<String>>,
    ) -> Result<Vec<String>, WorkspaceError> {
        for cycle in &self.cycles {
            let relevant = match subset {
                Some(subset) => cycle.iter().any(|name| subset.contains(name)),
                None => true,
            };
            if relevant {
                return Err(WorkspaceError::CycleDetected { cycle: render_cycle(cycle) });
            }
        }

        Ok(self
            .order
            .iter()
            .filter(|name| subset.is_none_or(|subset| subset.contains(*name)))
            .cloned()
            .collect())
    }

    /// Transitive dependents of `name`, including `name` itself.
    #[must_use]
    pub fn affected(&self, name: &str) -> BTreeSet<String> {
        let mut affected = BTreeSet::new();
        let mut queue = vec![name.to_string()];

        while let Some(current) = queue.pop() {
            if !affected.insert(current.clone()) {
                continue;
            }
            if let Some(dependents) = self.dependents.get(&current) {
                queue.extend(dependents.iter().cloned());
            }
        }

        affected
    }

    /// Direct intra-workspace dependencies of `name`.
    #[must_use]
    pub fn dependencies_of(&self, name: &str) -> BTreeSet<String> {
        self.deps.get(name).cloned().unwrap_or_default()
    }
}

/// Renders a cycle as `A → B → A`.
#[must_use]
pub fn render_cycle(cycle: &[String]) -> String {
    cycle.join(" → ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipit_standard_tools::manifest::PackageManifest;
    use std::path::Path;

    fn package(name: &str, deps: &[&str]) -> Package {
        let deps_json: Vec<String> =
            deps.iter().map(|d| format!("\"{d}\": \"workspace:*\"")).collect();
        let json = format!(
            r#"{{"name": "{name}", "version": "1.0.0", "dependencies": {{{}}}}}"#,
            deps_json.join(", ")
        );
        let manifest =
            PackageManifest::parse(Path::new(&format!("/ws/{name}/package.json")), &json)
                .expect("manifest");
        Package::from_manifest(manifest).expect("package")
    }

    fn arena(specs: &[(&str, &[&str])]) -> BTreeMap<String, Package> {
        specs
            .iter()
            .map(|(name, deps)| ((*name).to_string(), package(name, deps)))
            .collect()
    }

    #[test]
    fn test_chain_orders_leaves_first() {
        let packages = arena(&[("a", &[]), ("b", &["a"]), ("c", &["b"])]);
        let graph = DependencyGraph::build(&packages);

        assert!(graph.cycles.is_empty());
        assert_eq!(graph.topological_order(None).expect("order"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_order_is_a_linear_extension_and_deterministic() {
        let packages = arena(&[
            ("app", &["lib-a", "lib-b"]),
            ("lib-b", &["core"]),
            ("lib-a", &["core"]),
            ("core", &[]),
        ]);

        let graph = DependencyGraph::build(&packages);
        let order = graph.topological_order(None).expect("order");

        let position = |name: &str| order.iter().position(|n| n == name).expect("present");
        assert!(position("core") < position("lib-a"));
        assert!(position("core") < position("lib-b"));
        assert!(position("lib-a") < position("app"));
        assert!(position("lib-b") < position("app"));

        // Identical input produces the identical order.
        let again = DependencyGraph::build(&packages).topological_order(None).expect("order");
        assert_eq!(order, again);
    }

    #[test]
    fn test_independent_nodes_tie_break_lexicographically() {
        let packages = arena(&[("zeta", &[]), ("alpha", &[]), ("mid", &[])]);
        let graph = DependencyGraph::build(&packages);
        assert_eq!(
            graph.topological_order(None).expect("order"),
            vec!["alpha", "mid", "zeta"]
        );
    }

    #[test]
    fn test_cycle_is_recorded_and_rendered() {
        let packages = arena(&[("a", &["b"]), ("b", &["a"])]);
        let graph = DependencyGraph::build(&packages);

        assert_eq!(graph.cycles.len(), 1);
        let error = graph.topological_order(None).expect_err("cycle should fail");
        match error {
            WorkspaceError::CycleDetected { cycle } => {
                assert_eq!(cycle, "a → b → a");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_cycle_outside_subset_does_not_block() {
        let packages = arena(&[("a", &["b"]), ("b", &["a"]), ("solo", &[])]);
        let graph = DependencyGraph::build(&packages);

        let subset: BTreeSet<String> = ["solo".to_string()].into_iter().collect();
        assert_eq!(graph.topological_order(Some(&subset)).expect("order"), vec!["solo"]);
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let packages = arena(&[("selfish", &["selfish"])]);
        let graph = DependencyGraph::build(&packages);

        assert_eq!(graph.cycles, vec![vec!["selfish".to_string(), "selfish".to_string()]]);
    }

    #[test]
    fn test_affected_is_transitive_dependents_plus_self() {
        let packages = arena(&[("a", &[]), ("b", &["a"]), ("c", &["b"]), ("other", &[])]);
        let graph = DependencyGraph::build(&packages);

        let affected = graph.affected("a");
        let expected: BTreeSet<String> =
            ["a", "b", "c"].iter().map(ToString::to_string).collect();
        assert_eq!(affected, expected);
    }

    #[test]
    fn test_external_dependencies_are_not_edges() {
        let packages = arena(&[("a", &["left-pad"])]);
        let graph = DependencyGraph::build(&packages);
        assert!(graph.deps.get("a").expect("node").is_empty());
    }
}
