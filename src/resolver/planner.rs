//! Installation ordering.
//!
//! Turns a resolved assignment into an ordered list of packages where every
//! package comes after everything it depends on. Among packages that are
//! ready at the same time the one with the smaller name goes first, so the
//! same resolution always yields the same plan.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::core::PwiError;
use crate::requirement::PackageName;
use crate::resolver::graph::DependencyGraph;
use crate::version::Version;

/// One package in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedPackage {
    /// Normalized name
    pub name: PackageName,
    /// Version to install
    pub version: Version,
    /// Extras requested by the root requirements or by dependents
    pub extras: BTreeSet<String>,
    /// Packages in the plan that this one requires
    pub dependencies: BTreeSet<PackageName>,
}

impl PlannedPackage {
    /// `name[extras]==version`
    #[must_use]
    pub fn pin(&self) -> String {
        let mut pin = self.name.to_string();
        if !self.extras.is_empty() {
            let extras: Vec<&str> = self.extras.iter().map(String::as_str).collect();
            let _ = write!(pin, "[{}]", extras.join(","));
        }
        let _ = write!(pin, "=={}", self.version);
        pin
    }
}

/// Ordered installation plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionPlan {
    /// Packages in installation order
    pub packages: Vec<PlannedPackage>,
    /// Names requested by the root requirements, in request order
    pub roots: Vec<PackageName>,
}

impl ResolutionPlan {
    /// Number of packages
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the plan installs nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// The planned entry for `name`
    #[must_use]
    pub fn get(&self, name: &PackageName) -> Option<&PlannedPackage> {
        self.packages.iter().find(|p| &p.name == name)
    }

    /// The version planned for `name`
    #[must_use]
    pub fn version_of(&self, name: &PackageName) -> Option<&Version> {
        self.get(name).map(|p| &p.version)
    }

    /// The plan as a pinned requirements file, in installation order.
    #[must_use]
    pub fn to_requirements_txt(&self) -> String {
        let mut out = String::from("# Generated by pwi. Installation order is preserved.\n");
        for package in &self.packages {
            out.push_str(&package.pin());
            out.push('\n');
        }
        out
    }

    /// Stable digest of the pinned package list.
    ///
    /// Two plans with the same pins in the same order have the same
    /// fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for package in &self.packages {
            hasher.update(package.pin().as_bytes());
            hasher.update(b"\n");
        }
        format!("sha256:{}", hex::encode(hasher.finalize()))
    }
}

/// Color states for cycle extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Orders a resolved assignment for installation.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallationPlanner;

impl InstallationPlanner {
    /// Plan the installation of `resolved`, using the requirements each
    /// selected version declares in `graph`.
    ///
    /// # Errors
    ///
    /// [`PwiError::CyclicDependency`] when the selected versions require each
    /// other in a cycle; the error names one cycle, starting and ending with
    /// the same package.
    pub fn plan(
        &self,
        resolved: &BTreeMap<PackageName, Version>,
        graph: &DependencyGraph,
    ) -> Result<ResolutionPlan, PwiError> {
        let mut dependencies: BTreeMap<&PackageName, BTreeSet<PackageName>> = BTreeMap::new();
        let mut dependents: BTreeMap<&PackageName, BTreeSet<&PackageName>> = BTreeMap::new();
        let mut extras: BTreeMap<&PackageName, BTreeSet<String>> = BTreeMap::new();

        for requirement in graph.roots() {
            if let Some((name, _)) = resolved.get_key_value(&requirement.name) {
                extras.entry(name).or_default().extend(requirement.extras.iter().cloned());
            }
        }

        for (name, version) in resolved {
            let deps = dependencies.entry(name).or_default();
            for requirement in graph.declared(name, version).unwrap_or_default() {
                let Some((target, _)) = resolved.get_key_value(&requirement.name) else {
                    continue;
                };
                deps.insert(target.clone());
                dependents.entry(target).or_default().insert(name);
                extras.entry(target).or_default().extend(requirement.extras.iter().cloned());
            }
        }

        // Kahn's algorithm with a sorted ready set
        let mut remaining: BTreeMap<&PackageName, usize> =
            dependencies.iter().map(|(name, deps)| (*name, deps.len())).collect();
        let mut ready: BTreeSet<&PackageName> =
            remaining.iter().filter(|(_, count)| **count == 0).map(|(name, _)| *name).collect();
        let mut order: Vec<&PackageName> = Vec::with_capacity(resolved.len());

        while let Some(name) = ready.pop_first() {
            remaining.remove(name);
            order.push(name);
            for dependent in dependents.get(name).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(*dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        if !remaining.is_empty() {
            let stuck: BTreeSet<&PackageName> = remaining.keys().copied().collect();
            let chain = find_cycle(&stuck, &dependencies)
                .unwrap_or_else(|| stuck.iter().map(|name| (*name).clone()).collect());
            tracing::debug!("installation order blocked by a cycle through {} package(s)", stuck.len());
            return Err(PwiError::CyclicDependency {
                chain: chain.iter().map(ToString::to_string).collect(),
            });
        }

        let packages = order
            .into_iter()
            .map(|name| PlannedPackage {
                name: name.clone(),
                version: resolved[name].clone(),
                extras: extras.remove(name).unwrap_or_default(),
                dependencies: dependencies.remove(name).unwrap_or_default(),
            })
            .collect();

        let mut roots: Vec<PackageName> = Vec::new();
        for requirement in graph.roots() {
            if !roots.contains(&requirement.name) {
                roots.push(requirement.name.clone());
            }
        }

        Ok(ResolutionPlan {
            packages,
            roots,
        })
    }
}

/// One cycle among `stuck`, closed by repeating its first package.
///
/// Every stuck package has a stuck dependency, so a walk from the smallest
/// one must revisit a package.
fn find_cycle(
    stuck: &BTreeSet<&PackageName>,
    dependencies: &BTreeMap<&PackageName, BTreeSet<PackageName>>,
) -> Option<Vec<PackageName>> {
    let mut colors: BTreeMap<&PackageName, Color> = stuck.iter().map(|name| (*name, Color::White)).collect();
    let mut path: Vec<&PackageName> = Vec::new();

    for &start in stuck {
        if colors.get(start) == Some(&Color::White)
            && let Some(cycle) = visit(start, stuck, dependencies, &mut colors, &mut path)
        {
            return Some(cycle);
        }
    }
    None
}

fn visit<'a>(
    node: &'a PackageName,
    stuck: &BTreeSet<&'a PackageName>,
    dependencies: &'a BTreeMap<&PackageName, BTreeSet<PackageName>>,
    colors: &mut BTreeMap<&'a PackageName, Color>,
    path: &mut Vec<&'a PackageName>,
) -> Option<Vec<PackageName>> {
    colors.insert(node, Color::Gray);
    path.push(node);

    for next in dependencies.get(node).into_iter().flatten() {
        if !stuck.contains(next) {
            continue;
        }
        match colors.get(next) {
            Some(Color::Gray) => {
                let start = path.iter().position(|n| *n == next)?;
                let mut cycle: Vec<PackageName> = path[start..].iter().map(|n| (*n).clone()).collect();
                cycle.push(next.clone());
                return Some(cycle);
            }
            Some(Color::White) => {
                if let Some(cycle) = visit(next, stuck, dependencies, colors, path) {
                    return Some(cycle);
                }
            }
            _ => {}
        }
    }

    path.pop();
    colors.insert(node, Color::Black);
    None
}
