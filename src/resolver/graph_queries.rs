//! Read-only queries over dependency graphs and plans: paths, cycles and
//! tree rendering.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use crate::requirement::PackageName;
use crate::resolver::graph::DependencyGraph;
use crate::resolver::planner::ResolutionPlan;

/// Shortest path from any of `roots` to `target`, following `neighbors`.
///
/// Roots are tried in order and neighbors in name order, so ties always
/// resolve the same way.
fn shortest_path<'a, F, I>(roots: &'a [PackageName], target: &PackageName, neighbors: F) -> Option<Vec<PackageName>>
where
    F: Fn(&PackageName) -> I,
    I: IntoIterator<Item = &'a PackageName>,
{
    let mut parent: BTreeMap<&PackageName, Option<&PackageName>> = BTreeMap::new();
    let mut queue: VecDeque<&PackageName> = VecDeque::new();
    for root in roots {
        if !parent.contains_key(root) {
            parent.insert(root, None);
            queue.push_back(root);
        }
    }

    while let Some(current) = queue.pop_front() {
        if current == target {
            let mut path = vec![current.clone()];
            let mut cursor = current;
            while let Some(Some(previous)) = parent.get(cursor) {
                cursor = *previous;
                path.push(cursor.clone());
            }
            path.reverse();
            return Some(path);
        }
        for next in neighbors(current) {
            if !parent.contains_key(next) {
                parent.insert(next, Some(current));
                queue.push_back(next);
            }
        }
    }
    None
}

impl DependencyGraph {
    /// Shortest chain of requirements from a root requirement to `target`,
    /// over every expanded version.
    #[must_use]
    pub fn dependency_path(&self, target: &PackageName) -> Option<Vec<PackageName>> {
        let roots: Vec<PackageName> = self.roots().iter().map(|r| r.name.clone()).collect();
        shortest_path(&roots, target, |name| {
            self.node(name).into_iter().flat_map(|node| node.dependencies.iter())
        })
    }

    /// Shortest chain of requirements from `from` to `to`, over every
    /// expanded version.
    #[must_use]
    pub fn find_dependency_path(&self, from: &PackageName, to: &PackageName) -> Option<Vec<PackageName>> {
        shortest_path(std::slice::from_ref(from), to, |name| {
            self.node(name).into_iter().flat_map(|node| node.dependencies.iter())
        })
    }

    /// Every distinct cycle among package names.
    ///
    /// Each cycle starts at its smallest package name and ends by repeating
    /// it. Cycles over the same set of packages are reported once. Results
    /// are ordered by their first package.
    #[must_use]
    pub fn find_cycles(&self) -> Vec<Vec<PackageName>> {
        let mut cycles = Vec::new();
        let mut seen: HashSet<BTreeSet<PackageName>> = HashSet::new();
        for start in self.names() {
            let mut path = vec![start];
            self.cycles_from(start, start, &mut path, &mut seen, &mut cycles);
        }
        cycles
    }

    /// Extend `path` with packages named after `start`, closing a cycle
    /// whenever an edge leads back to `start`.
    fn cycles_from<'a>(
        &'a self,
        start: &'a PackageName,
        node: &'a PackageName,
        path: &mut Vec<&'a PackageName>,
        seen: &mut HashSet<BTreeSet<PackageName>>,
        cycles: &mut Vec<Vec<PackageName>>,
    ) {
        let dependencies = self.node(node).map(|n| &n.dependencies).into_iter().flatten();
        for next in dependencies {
            if next == start {
                let mut cycle: Vec<PackageName> = path.iter().map(|n| (*n).clone()).collect();
                if seen.insert(cycle.iter().cloned().collect()) {
                    cycle.push(start.clone());
                    cycles.push(cycle);
                }
            } else if next > start && !path.contains(&next) {
                path.push(next);
                self.cycles_from(start, next, path, seen, cycles);
                path.pop();
            }
        }
    }
}

impl ResolutionPlan {
    /// Shortest chain from `from` to `to` through the selected versions.
    #[must_use]
    pub fn find_dependency_path(&self, from: &PackageName, to: &PackageName) -> Option<Vec<PackageName>> {
        if self.get(from).is_none() {
            return None;
        }
        shortest_path(std::slice::from_ref(from), to, |name| {
            self.get(name).into_iter().flat_map(|package| package.dependencies.iter())
        })
    }

    /// Render the plan as a tree under each root requirement.
    ///
    /// A package already shown elsewhere is marked `(*)` and not expanded
    /// again.
    #[must_use]
    pub fn to_tree_string(&self) -> String {
        let mut result = String::new();
        let mut expanded = HashSet::new();
        for root in &self.roots {
            let Some(package) = self.get(root) else {
                continue;
            };
            result.push_str(&package.pin());
            result.push('\n');
            expanded.insert(root.clone());
            self.build_tree_string(root, &mut result, "", &mut expanded);
        }
        result
    }

    fn build_tree_string(
        &self,
        name: &PackageName,
        result: &mut String,
        prefix: &str,
        expanded: &mut HashSet<PackageName>,
    ) {
        let Some(package) = self.get(name) else {
            return;
        };

        let count = package.dependencies.len();
        for (i, dep) in package.dependencies.iter().enumerate() {
            let is_last = i == count - 1;
            let connector = if is_last {
                "└── "
            } else {
                "├── "
            };
            let label = self.get(dep).map_or_else(|| dep.to_string(), |p| p.pin());

            if !expanded.insert(dep.clone()) {
                result.push_str(&format!("{prefix}{connector}{label} (*)\n"));
                continue;
            }
            result.push_str(&format!("{prefix}{connector}{label}\n"));

            let child_prefix = if is_last {
                format!("{prefix}    ")
            } else {
                format!("{prefix}│   ")
            };
            self.build_tree_string(dep, result, &child_prefix, expanded);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::requirement::{Requester, Requirement};
    use crate::resolver::planner::InstallationPlanner;
    use crate::version::Version;

    fn name(s: &str) -> PackageName {
        PackageName::new(s)
    }

    fn names(path: &[PackageName]) -> Vec<&str> {
        path.iter().map(PackageName::as_str).collect()
    }

    fn graph(roots: &[&str], packages: &[(&str, &[&str])]) -> DependencyGraph {
        let roots = roots.iter().map(|r| Requirement::parse(r).unwrap()).collect();
        let mut graph = DependencyGraph::new(roots);
        let version = Version::new(1, 0, 0);
        for (package, deps) in packages {
            let requester = Requester::package(name(package), version.clone());
            let deps = deps.iter().map(|d| Requirement::parse(d).unwrap().with_source(requester.clone())).collect();
            graph.record_declared(&name(package), &version, deps);
        }
        graph
    }

    fn plan(graph: &DependencyGraph) -> ResolutionPlan {
        let resolved: BTreeMap<PackageName, Version> =
            graph.names().map(|n| (n.clone(), Version::new(1, 0, 0))).collect();
        InstallationPlanner.plan(&resolved, graph).unwrap()
    }

    #[test]
    fn test_dependency_path() {
        let graph = graph(&["app"], &[("app", &["web", "db"]), ("web", &["core"]), ("db", &["core"]), ("core", &[])]);

        let path = graph.dependency_path(&name("core")).unwrap();
        assert_eq!(names(&path), vec!["app", "db", "core"]);
        assert_eq!(names(&graph.dependency_path(&name("app")).unwrap()), vec!["app"]);
        assert!(graph.dependency_path(&name("missing")).is_none());
    }

    #[test]
    fn test_path_between_packages() {
        let graph = graph(&["app"], &[("app", &["web", "db"]), ("web", &["cache"]), ("cache", &["core"]), ("db", &[]), ("core", &[])]);

        let path = graph.find_dependency_path(&name("web"), &name("core")).unwrap();
        assert_eq!(names(&path), vec!["web", "cache", "core"]);
        assert!(graph.find_dependency_path(&name("db"), &name("core")).is_none());

        let plan = plan(&graph);
        let path = plan.find_dependency_path(&name("app"), &name("cache")).unwrap();
        assert_eq!(names(&path), vec!["app", "web", "cache"]);
        assert!(plan.find_dependency_path(&name("nope"), &name("nope")).is_none());
        assert_eq!(names(&plan.find_dependency_path(&name("db"), &name("db")).unwrap()), vec!["db"]);
    }

    #[test]
    fn test_find_cycles() {
        let graph = graph(
            &["b"],
            &[("b", &["c"]), ("c", &["a", "d"]), ("a", &["b"]), ("d", &["d"]), ("e", &[])],
        );
        let found = graph.find_cycles();
        let cycles: Vec<Vec<&str>> = found.iter().map(|c| names(c)).collect();
        assert_eq!(cycles, vec![vec!["a", "b", "c", "a"], vec!["d", "d"]]);
    }

    #[test]
    fn test_overlapping_cycles_are_all_listed() {
        let graph = graph(&["a"], &[("a", &["b", "c"]), ("b", &["a", "c"]), ("c", &["a"])]);
        let found = graph.find_cycles();
        let cycles: Vec<Vec<&str>> = found.iter().map(|c| names(c)).collect();
        assert_eq!(cycles, vec![vec!["a", "b", "a"], vec!["a", "b", "c", "a"], vec!["a", "c", "a"]]);
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let graph = graph(&["a"], &[("a", &["b"]), ("b", &[])]);
        assert!(graph.find_cycles().is_empty());
    }

    #[test]
    fn test_tree_string_marks_repeats() {
        let graph = graph(&["app"], &[("app", &["web", "db"]), ("web", &["core"]), ("db", &["core"]), ("core", &[])]);
        let tree = plan(&graph).to_tree_string();

        assert_eq!(
            tree,
            "\
app==1.0.0
├── db==1.0.0
│   └── core==1.0.0
└── web==1.0.0
    └── core==1.0.0 (*)
"
        );
    }
}
