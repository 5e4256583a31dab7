//! The dependency graph the resolver works on.
//!
//! One node per package name, stored in a petgraph arena and addressed
//! through a name → index map. Each node accumulates the constraints placed
//! on it by every requiring edge, the versions the provider publishes, and
//! the requirements declared by each version that was expanded. An edge
//! `a → b` means some expanded version of `a` requires `b`.
//!
//! Cycles are allowed here; only the installation planner rejects them.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::graph::{DiGraph, NodeIndex};

use crate::requirement::{PackageName, Requester, Requirement};
use crate::version::Version;
use crate::version::conflict::ConstraintOrigin;
use crate::version::constraints::ConstraintSet;

/// Everything known about one package.
#[derive(Debug, Clone)]
pub struct PackageNode {
    /// Normalized package name
    pub name: PackageName,
    /// Version chosen by the resolver, if resolution succeeded
    pub selected_version: Option<Version>,
    /// One entry per requiring edge, in discovery order
    pub constraints: Vec<ConstraintOrigin>,
    /// Packages with an expanded version that requires this one
    pub dependents: BTreeSet<PackageName>,
    /// Packages required by at least one expanded version of this one
    pub dependencies: BTreeSet<PackageName>,
    /// Published versions, ascending; `None` until fetched
    pub available: Option<Vec<Version>>,
    /// Requirements declared by each expanded version
    pub declared: BTreeMap<Version, Vec<Requirement>>,
    /// Set when resolution failed because of this package
    pub unresolved: bool,
}

impl PackageNode {
    fn new(name: PackageName) -> Self {
        Self {
            name,
            selected_version: None,
            constraints: Vec::new(),
            dependents: BTreeSet::new(),
            dependencies: BTreeSet::new(),
            available: None,
            declared: BTreeMap::new(),
            unresolved: false,
        }
    }

    /// Published versions, empty until fetched
    #[must_use]
    pub fn available_versions(&self) -> &[Version] {
        self.available.as_deref().unwrap_or_default()
    }

    /// Versions worth expanding: those admitted by at least one constraint
    /// on this node (or by none, when there are no constraints yet).
    ///
    /// This is a union, not an intersection, so the graph covers every
    /// version the resolver might pick under any combination of dependents.
    #[must_use]
    pub fn viable_versions(&self, allow_prereleases: bool) -> Vec<Version> {
        let sets: Vec<ConstraintSet> = self
            .constraints
            .iter()
            .map(|origin| ConstraintSet::from_constraints([&origin.constraint], allow_prereleases))
            .collect();
        self.available_versions()
            .iter()
            .filter(|v| {
                if sets.is_empty() {
                    allow_prereleases || !v.is_prerelease()
                } else {
                    sets.iter().any(|set| set.admits(v))
                }
            })
            .cloned()
            .collect()
    }
}

/// Dependency graph for a resolution run.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<PackageNode, ()>,
    node_map: BTreeMap<PackageName, NodeIndex>,
    roots: Vec<Requirement>,
}

impl DependencyGraph {
    /// A graph seeded with the root requirements and their constraints.
    #[must_use]
    pub fn new(roots: Vec<Requirement>) -> Self {
        let mut graph = Self::default();
        for requirement in &roots {
            graph.add_requirement(requirement);
        }
        graph.roots = roots;
        graph
    }

    fn ensure_node(&mut self, name: &PackageName) -> NodeIndex {
        if let Some(&index) = self.node_map.get(name) {
            index
        } else {
            let index = self.graph.add_node(PackageNode::new(name.clone()));
            self.node_map.insert(name.clone(), index);
            index
        }
    }

    /// Record a requirement: its target gets a constraint, and when it was
    /// declared by a package the two are linked.
    pub fn add_requirement(&mut self, requirement: &Requirement) {
        let target = self.ensure_node(&requirement.name);
        self.graph[target].constraints.push(ConstraintOrigin {
            constraint: requirement.constraint.clone(),
            required_by: requirement.source.clone(),
        });

        if let Requester::Package {
            name,
            ..
        } = &requirement.source
        {
            let from = self.ensure_node(name);
            if !self.graph.contains_edge(from, target) {
                self.graph.add_edge(from, target, ());
            }
            self.graph[from].dependencies.insert(requirement.name.clone());
            self.graph[target].dependents.insert(name.clone());
        }
    }

    /// Store the published versions of `name`, sorted ascending.
    pub fn set_available(&mut self, name: &PackageName, mut versions: Vec<Version>) {
        versions.sort();
        versions.dedup();
        let index = self.ensure_node(name);
        self.graph[index].available = Some(versions);
    }

    /// Store what `name` at `version` requires and link the graph.
    pub fn record_declared(&mut self, name: &PackageName, version: &Version, requirements: Vec<Requirement>) {
        for requirement in &requirements {
            self.add_requirement(requirement);
        }
        let index = self.ensure_node(name);
        self.graph[index].declared.insert(version.clone(), requirements);
    }

    /// The node for `name`
    #[must_use]
    pub fn node(&self, name: &PackageName) -> Option<&PackageNode> {
        self.node_map.get(name).map(|&index| &self.graph[index])
    }

    fn node_mut(&mut self, name: &PackageName) -> Option<&mut PackageNode> {
        self.node_map.get(name).map(|&index| &mut self.graph[index])
    }

    /// Requirements declared by `name` at `version`, if that pair was expanded.
    #[must_use]
    pub fn declared(&self, name: &PackageName, version: &Version) -> Option<&[Requirement]> {
        self.node(name).and_then(|node| node.declared.get(version)).map(Vec::as_slice)
    }

    /// Every node, ordered by name.
    pub fn packages(&self) -> impl Iterator<Item = &PackageNode> {
        self.node_map.values().map(|&index| &self.graph[index])
    }

    /// Every package name, ordered.
    pub fn names(&self) -> impl Iterator<Item = &PackageName> {
        self.node_map.keys()
    }

    /// The root requirements the graph was built from
    #[must_use]
    pub fn roots(&self) -> &[Requirement] {
        &self.roots
    }

    /// Record the resolver's choice for `name`.
    pub fn select(&mut self, name: &PackageName, version: Version) {
        if let Some(node) = self.node_mut(name) {
            node.selected_version = Some(version);
            node.unresolved = false;
        }
    }

    /// Flag `name` as the cause of a failed resolution.
    pub fn mark_unresolved(&mut self, name: &PackageName) {
        if let Some(node) = self.node_mut(name) {
            node.selected_version = None;
            node.unresolved = true;
        }
    }

    /// Forget any previous selections.
    pub fn clear_selections(&mut self) {
        for node in self.graph.node_weights_mut() {
            node.selected_version = None;
            node.unresolved = false;
        }
    }

    /// Number of packages
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether the graph has no packages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Number of distinct package → package edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether a version of `from` requires `to`
    #[must_use]
    pub fn has_edge(&self, from: &PackageName, to: &PackageName) -> bool {
        match (self.node_map.get(from), self.node_map.get(to)) {
            (Some(&a), Some(&b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> PackageName {
        PackageName::new(s)
    }

    fn versions(list: &[&str]) -> Vec<Version> {
        list.iter().map(|v| Version::parse(v).unwrap()).collect()
    }

    #[test]
    fn test_roots_seed_constraints() {
        let graph = DependencyGraph::new(vec![
            Requirement::parse("flask>=2.0").unwrap(),
            Requirement::parse("Flask<3").unwrap(),
        ]);
        assert_eq!(graph.len(), 1);
        let flask = graph.node(&name("flask")).unwrap();
        assert_eq!(flask.constraints.len(), 2);
        assert!(flask.constraints.iter().all(|c| c.required_by == Requester::Root));
        assert!(flask.available.is_none());
    }

    #[test]
    fn test_declared_requirements_link_nodes() {
        let mut graph = DependencyGraph::new(vec![Requirement::parse("flask").unwrap()]);
        let v2 = Version::new(2, 0, 0);
        let requester = Requester::package(name("flask"), v2.clone());
        let deps = vec![
            Requirement::parse("werkzeug>=2.0").unwrap().with_source(requester.clone()),
            Requirement::parse("click").unwrap().with_source(requester),
        ];
        graph.record_declared(&name("flask"), &v2, deps);

        assert!(graph.has_edge(&name("flask"), &name("werkzeug")));
        assert_eq!(graph.edge_count(), 2);
        let flask = graph.node(&name("flask")).unwrap();
        assert_eq!(flask.dependencies.iter().map(PackageName::as_str).collect::<Vec<_>>(), vec!["click", "werkzeug"]);
        assert_eq!(graph.node(&name("werkzeug")).unwrap().dependents.len(), 1);
        assert_eq!(graph.declared(&name("flask"), &v2).unwrap().len(), 2);
        assert!(graph.declared(&name("flask"), &Version::new(1, 0, 0)).is_none());

        let names: Vec<&str> = graph.names().map(PackageName::as_str).collect();
        assert_eq!(names, vec!["click", "flask", "werkzeug"]);
    }

    #[test]
    fn test_viable_versions_is_a_union() {
        let mut graph = DependencyGraph::new(vec![Requirement::parse("pkg<1.5").unwrap()]);
        let requester = Requester::package(name("app"), Version::new(1, 0, 0));
        graph.add_requirement(&Requirement::parse("pkg>=2.0").unwrap().with_source(requester));
        graph.set_available(&name("pkg"), versions(&["2.0", "1.0", "1.5", "3.0rc1"]));

        let node = graph.node(&name("pkg")).unwrap();
        assert_eq!(node.available_versions(), versions(&["1.0", "1.5", "2.0", "3.0rc1"]).as_slice());
        assert_eq!(node.viable_versions(false), versions(&["1.0", "2.0"]));
        assert_eq!(node.viable_versions(true), versions(&["1.0", "2.0", "3.0rc1"]));
    }

    #[test]
    fn test_selection_state() {
        let mut graph = DependencyGraph::new(vec![Requirement::parse("pkg").unwrap()]);
        graph.select(&name("pkg"), Version::new(1, 0, 0));
        assert_eq!(graph.node(&name("pkg")).unwrap().selected_version, Some(Version::new(1, 0, 0)));

        graph.mark_unresolved(&name("pkg"));
        let node = graph.node(&name("pkg")).unwrap();
        assert!(node.unresolved);
        assert!(node.selected_version.is_none());

        graph.clear_selections();
        assert!(!graph.node(&name("pkg")).unwrap().unresolved);
    }
}
