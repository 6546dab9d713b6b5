use std::collections::{BTreeSet, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Summary of dependency graph structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
}

/// Ordering report for a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphReport {
    pub summary: GraphSummary,
    pub order: Option<Vec<String>>,
    pub cycle: Option<Vec<String>>,
}

/// Directed "depends-on" graph over named nodes.
///
/// Node indices follow declaration order, which is also the tie-break used
/// when several nodes are ready at the same time.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    names: Vec<String>,
    index: HashMap<String, usize>,
    dependencies: Vec<BTreeSet<usize>>,
}

impl DependencyGraph {
    /// Build the graph from `(node, dependencies)` pairs in declaration order.
    ///
    /// Fails on duplicate nodes and on dependencies naming undeclared nodes.
    pub fn build<'a, I, D>(nodes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, D)>,
        D: IntoIterator<Item = &'a str>,
    {
        let declared: Vec<(&'a str, Vec<&'a str>)> = nodes
            .into_iter()
            .map(|(name, deps)| (name, deps.into_iter().collect()))
            .collect();

        let mut names = Vec::with_capacity(declared.len());
        let mut index = HashMap::with_capacity(declared.len());
        for (name, _) in &declared {
            if index.insert(name.to_string(), names.len()).is_some() {
                return Err(Error::DuplicateNode(name.to_string()));
            }
            names.push(name.to_string());
        }

        let mut dependencies = Vec::with_capacity(declared.len());
        for (name, deps) in &declared {
            let mut edges = BTreeSet::new();
            for dep in deps {
                let target = index.get(*dep).copied().ok_or_else(|| Error::UnknownNode {
                    from: name.to_string(),
                    missing: dep.to_string(),
                })?;
                edges.insert(target);
            }
            dependencies.push(edges);
        }

        Ok(Self {
            names,
            index,
            dependencies,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.dependencies.iter().map(BTreeSet::len).sum()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Direct dependencies of a node, in declaration order.
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.index
            .get(name)
            .map(|idx| {
                self.dependencies[*idx]
                    .iter()
                    .map(|dep| self.names[*dep].as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every node that depends on `name`, directly or transitively.
    pub fn dependents_of(&self, name: &str) -> BTreeSet<String> {
        let Some(&start) = self.index.get(name) else {
            return BTreeSet::new();
        };

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.names.len()];
        for (node, deps) in self.dependencies.iter().enumerate() {
            for dep in deps {
                dependents[*dep].push(node);
            }
        }

        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for dependent in &dependents[node] {
                if *dependent != start && seen.insert(*dependent) {
                    queue.push_back(*dependent);
                }
            }
        }

        seen.into_iter().map(|idx| self.names[idx].clone()).collect()
    }

    /// Generation order in which every node follows all of its dependencies.
    pub fn topo_order(&self) -> Result<Vec<String>> {
        let mut remaining: Vec<usize> = self.dependencies.iter().map(BTreeSet::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.names.len()];
        for (node, deps) in self.dependencies.iter().enumerate() {
            for dep in deps {
                dependents[*dep].push(node);
            }
        }

        let mut ready: BTreeSet<usize> = remaining
            .iter()
            .enumerate()
            .filter_map(|(idx, count)| (*count == 0).then_some(idx))
            .collect();

        let mut order = Vec::with_capacity(self.names.len());
        while let Some(node) = ready.pop_first() {
            order.push(self.names[node].clone());
            for dependent in &dependents[node] {
                let count = &mut remaining[*dependent];
                *count = count.saturating_sub(1);
                if *count == 0 {
                    ready.insert(*dependent);
                }
            }
        }

        if order.len() == self.names.len() {
            Ok(order)
        } else {
            Err(Error::Cycle {
                path: self.cycle_path(&remaining),
            })
        }
    }

    pub fn report(&self) -> GraphReport {
        let summary = GraphSummary {
            nodes: self.len(),
            edges: self.edge_count(),
        };
        match self.topo_order() {
            Ok(order) => GraphReport {
                summary,
                order: Some(order),
                cycle: None,
            },
            Err(Error::Cycle { path }) => GraphReport {
                summary,
                order: None,
                cycle: Some(path),
            },
            Err(_) => GraphReport {
                summary,
                order: None,
                cycle: None,
            },
        }
    }

    // Every node left with unmet dependencies depends on another such node,
    // so following the first unmet dependency must revisit a node.
    fn cycle_path(&self, remaining: &[usize]) -> Vec<String> {
        let Some(start) = remaining.iter().position(|count| *count > 0) else {
            return Vec::new();
        };

        let mut visited: Vec<usize> = Vec::new();
        let mut position: HashMap<usize, usize> = HashMap::new();
        let mut current = start;
        loop {
            if let Some(&pos) = position.get(&current) {
                let mut path: Vec<String> = visited[pos..]
                    .iter()
                    .map(|idx| self.names[*idx].clone())
                    .collect();
                path.push(self.names[current].clone());
                return path;
            }
            position.insert(current, visited.len());
            visited.push(current);

            let next = self.dependencies[current]
                .iter()
                .copied()
                .find(|dep| remaining[*dep] > 0);
            match next {
                Some(next) => current = next,
                None => return visited.iter().map(|idx| self.names[*idx].clone()).collect(),
            }
        }
    }
}
