use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::DataModel;

/// FK dependency: `model` references `target` through `columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub model: String,
    pub field: String,
    pub target: String,
    pub columns: Vec<String>,
    pub target_columns: Vec<String>,
    pub nullable: bool,
}

impl DependencyEdge {
    pub fn is_self(&self) -> bool {
        self.model == self.target
    }
}

/// Safe insertion order plus the FK edges that must be written by a later UPDATE.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertionPlan {
    pub order: Vec<String>,
    pub deferred: Vec<DependencyEdge>,
}

impl InsertionPlan {
    pub fn deferred_for<'a>(&'a self, model: &'a str) -> impl Iterator<Item = &'a DependencyEdge> {
        self.deferred.iter().filter(move |edge| edge.model == model)
    }
}

/// Summary of FK graph structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencySummary {
    pub nodes: usize,
    pub edges: usize,
    pub deferred_edges: usize,
}

/// Report for the whole data model, used by validation tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyReport {
    pub summary: DependencySummary,
    pub order: Option<Vec<String>>,
    pub deferred: Vec<DependencyEdge>,
    pub cycle: Option<Vec<String>>,
}

/// Build a deterministic dependency report for every model of the data model.
pub fn build_dependency_report(data_model: &DataModel) -> DependencyReport {
    let models: BTreeSet<String> = data_model.models.keys().cloned().collect();
    let edges = dependency_edges(data_model, &models);

    match plan_insertion(data_model, &models) {
        Ok(plan) => DependencyReport {
            summary: DependencySummary {
                nodes: models.len(),
                edges: edges.len(),
                deferred_edges: plan.deferred.len(),
            },
            order: Some(plan.order),
            deferred: plan.deferred,
            cycle: None,
        },
        Err(Error::UnbreakableCycle { models: cycle }) => DependencyReport {
            summary: DependencySummary {
                nodes: models.len(),
                edges: edges.len(),
                deferred_edges: 0,
            },
            order: None,
            deferred: Vec::new(),
            cycle: Some(cycle),
        },
        Err(_) => DependencyReport {
            summary: DependencySummary {
                nodes: models.len(),
                edges: edges.len(),
                deferred_edges: 0,
            },
            order: None,
            deferred: Vec::new(),
            cycle: None,
        },
    }
}

/// FK edges whose both ends are in `models`.
pub fn dependency_edges(data_model: &DataModel, models: &BTreeSet<String>) -> Vec<DependencyEdge> {
    data_model
        .relations()
        .into_iter()
        .filter(|relation| models.contains(relation.owner) && models.contains(relation.target))
        .map(|relation| DependencyEdge {
            model: relation.owner.to_string(),
            field: relation.owner_field.to_string(),
            target: relation.target.to_string(),
            columns: relation.from_columns.to_vec(),
            target_columns: relation.to_columns.to_vec(),
            nullable: relation.nullable,
        })
        .collect()
}

/// Order `models` so every model follows the models it references.
///
/// Nullable self references and nullable edges inside a strongly connected component are
/// deferred. A cycle made only of required edges is `UnbreakableCycle`.
pub fn plan_insertion(data_model: &DataModel, models: &BTreeSet<String>) -> Result<InsertionPlan> {
    let edges = dependency_edges(data_model, models);
    let mut deferred = Vec::new();
    let mut cross = Vec::new();

    for edge in edges {
        if edge.is_self() {
            if edge.nullable {
                deferred.push(edge);
                continue;
            }
            return Err(Error::UnbreakableCycle {
                models: vec![edge.model],
            });
        }
        cross.push(edge);
    }

    let components = strongly_connected(models, &dependencies(models, &cross));
    let mut component_of: BTreeMap<&str, usize> = BTreeMap::new();
    for (idx, component) in components.iter().enumerate() {
        for model in component {
            component_of.insert(model.as_str(), idx);
        }
    }

    let mut kept = Vec::new();
    for edge in cross {
        let same_component = component_of.get(edge.model.as_str())
            == component_of.get(edge.target.as_str());
        if same_component && edge.nullable {
            deferred.push(edge);
        } else {
            kept.push(edge);
        }
    }

    let mut dependents: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for model in models {
        dependents.entry(model.clone()).or_default();
    }
    for edge in &kept {
        dependents
            .entry(edge.target.clone())
            .or_default()
            .insert(edge.model.clone());
    }

    match toposort(&dependents) {
        Ok(order) => Ok(InsertionPlan { order, deferred }),
        Err(_) => {
            let remaining = strongly_connected(models, &dependencies(models, &kept));
            let cycle = remaining
                .into_iter()
                .find(|component| component.len() > 1)
                .unwrap_or_default();
            Err(Error::UnbreakableCycle { models: cycle })
        }
    }
}

fn dependencies(
    models: &BTreeSet<String>,
    edges: &[DependencyEdge],
) -> BTreeMap<String, BTreeSet<String>> {
    let mut graph: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for model in models {
        graph.entry(model.clone()).or_default();
    }
    for edge in edges {
        graph
            .entry(edge.model.clone())
            .or_default()
            .insert(edge.target.clone());
    }
    graph
}

fn toposort(graph: &BTreeMap<String, BTreeSet<String>>) -> std::result::Result<Vec<String>, Vec<String>> {
    let mut indegree: BTreeMap<String, usize> = BTreeMap::new();

    for node in graph.keys() {
        indegree.entry(node.clone()).or_insert(0);
    }

    for targets in graph.values() {
        for target in targets {
            *indegree.entry(target.clone()).or_insert(0) += 1;
        }
    }

    let mut ready: BTreeSet<String> = indegree
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(node, _)| node.clone())
        .collect();

    let mut order = Vec::with_capacity(graph.len());

    while let Some(node) = ready.pop_first() {
        order.push(node.clone());

        if let Some(targets) = graph.get(&node) {
            for target in targets {
                if let Some(count) = indegree.get_mut(target) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(target.clone());
                    }
                }
            }
        }
    }

    if order.len() == indegree.len() {
        Ok(order)
    } else {
        Err(indegree
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(node, _)| node)
            .collect())
    }
}

/// Tarjan's strongly connected components; members of each component are sorted.
fn strongly_connected(
    nodes: &BTreeSet<String>,
    graph: &BTreeMap<String, BTreeSet<String>>,
) -> Vec<Vec<String>> {
    struct Tarjan<'a> {
        graph: &'a BTreeMap<String, BTreeSet<String>>,
        index: usize,
        indices: BTreeMap<&'a str, usize>,
        lowlink: BTreeMap<&'a str, usize>,
        stack: Vec<&'a str>,
        on_stack: BTreeSet<&'a str>,
        components: Vec<Vec<String>>,
    }

    impl<'a> Tarjan<'a> {
        fn visit(&mut self, node: &'a str) {
            self.indices.insert(node, self.index);
            self.lowlink.insert(node, self.index);
            self.index += 1;
            self.stack.push(node);
            self.on_stack.insert(node);

            if let Some(targets) = self.graph.get(node) {
                for target in targets {
                    let target = target.as_str();
                    if !self.indices.contains_key(target) {
                        self.visit(target);
                        let low = self.lowlink[node].min(self.lowlink[target]);
                        self.lowlink.insert(node, low);
                    } else if self.on_stack.contains(target) {
                        let low = self.lowlink[node].min(self.indices[target]);
                        self.lowlink.insert(node, low);
                    }
                }
            }

            if self.lowlink[node] == self.indices[node] {
                let mut component = Vec::new();
                while let Some(member) = self.stack.pop() {
                    self.on_stack.remove(member);
                    component.push(member.to_string());
                    if member == node {
                        break;
                    }
                }
                component.sort();
                self.components.push(component);
            }
        }
    }

    let mut state = Tarjan {
        graph,
        index: 0,
        indices: BTreeMap::new(),
        lowlink: BTreeMap::new(),
        stack: Vec::new(),
        on_stack: BTreeSet::new(),
        components: Vec::new(),
    };

    for node in nodes {
        if !state.indices.contains_key(node.as_str()) {
            state.visit(node.as_str());
        }
    }

    state.components
}
