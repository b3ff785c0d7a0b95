// src/graph.rs

//! Module relationship graph and Graphviz export
//!
//! Nodes are modules. Directed edges point from a module to each module
//! able to satisfy one of its requirements, and to each module it
//! hard-includes. Conflicts (shared provided tags) are undirected and
//! recorded once per pair.

use crate::catalog::ModuleCatalog;
use crate::module::Tag;
use std::collections::{BTreeMap, BTreeSet};

const SELECTED_FILL: &str = "#BEF781";
const CONFLICT_COLOR: &str = "#DF0101";

/// A module in the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub name: String,
    pub provides: BTreeSet<Tag>,
    /// Highlighted in selection graphs (explicitly requested)
    pub selected: bool,
    /// Shares a provided tag with some other catalog module
    pub conflicting: bool,
}

/// Relationship between two modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeKind {
    /// `to` provides the listed requirements of `from`
    Satisfies { tags: BTreeSet<Tag> },
    /// `from` always pulls in `to`
    Includes,
    /// Both modules provide the listed tags
    Conflicts { tags: BTreeSet<Tag> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

/// Derived, read-only view of module relationships
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    nodes: BTreeMap<String, GraphNode>,
    edges: Vec<GraphEdge>,
    styled: bool,
}

impl ModuleGraph {
    /// Graph of every catalog module, including conflict edges
    pub fn for_catalog(catalog: &ModuleCatalog) -> Self {
        let mut graph = Self::default();

        for module in catalog.modules() {
            graph.nodes.insert(
                module.name.clone(),
                GraphNode {
                    name: module.name.clone(),
                    provides: module.effective_provides().clone(),
                    selected: false,
                    conflicting: false,
                },
            );
        }

        for module in catalog.modules() {
            for (provider, tags) in catalog.solution_candidates(module) {
                graph.add_edge(&module.name, &provider, EdgeKind::Satisfies { tags });
            }
        }

        for module in catalog.modules() {
            for include in &module.includes {
                if catalog.contains(include) {
                    graph.add_edge(&module.name, include, EdgeKind::Includes);
                }
            }
        }

        for module in catalog.modules() {
            for (other, tags) in catalog.conflicts_of(module) {
                if let Some(node) = graph.nodes.get_mut(&module.name) {
                    node.conflicting = true;
                }
                if other < module.name {
                    graph.add_edge(&module.name, &other, EdgeKind::Conflicts { tags });
                }
            }
        }

        graph
    }

    /// Graph restricted to `modules`, with `highlighted` ones marked
    ///
    /// Requirement edges leaving the set are dropped and conflicts are shown
    /// as node colour instead of edges.
    pub fn for_selection(
        catalog: &ModuleCatalog,
        modules: &BTreeSet<String>,
        highlighted: &BTreeSet<String>,
    ) -> Self {
        let mut graph = Self {
            styled: true,
            ..Self::default()
        };

        let members: Vec<_> = modules.iter().filter_map(|name| catalog.get(name)).collect();

        for module in &members {
            graph.nodes.insert(
                module.name.clone(),
                GraphNode {
                    name: module.name.clone(),
                    provides: module.effective_provides().clone(),
                    selected: highlighted.contains(&module.name),
                    conflicting: !catalog.conflicts_of(module).is_empty(),
                },
            );
        }

        for module in &members {
            for (provider, tags) in catalog.solution_candidates(module) {
                if modules.contains(&provider) {
                    graph.add_edge(&module.name, &provider, EdgeKind::Satisfies { tags });
                }
            }
        }

        for module in &members {
            for include in &module.includes {
                if modules.contains(include) {
                    graph.add_edge(&module.name, include, EdgeKind::Includes);
                }
            }
        }

        graph
    }

    fn add_edge(&mut self, from: &str, to: &str, kind: EdgeKind) {
        self.edges.push(GraphEdge {
            from: from.to_string(),
            to: to.to_string(),
            kind,
        });
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Render as a Graphviz digraph
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph G {\n");

        for node in self.nodes.values() {
            let tooltip = tooltip(&node.provides);
            if self.styled {
                let fill = if node.selected { SELECTED_FILL } else { "white" };
                let color = if node.conflicting { CONFLICT_COLOR } else { "black" };
                out.push_str(&format!(
                    "  {} [tooltip={}, style=filled, fillcolor=\"{}\", color=\"{}\", fontcolor=\"{}\"];\n",
                    quote(&node.name),
                    quote(&tooltip),
                    fill,
                    color,
                    color
                ));
            } else {
                out.push_str(&format!(
                    "  {} [tooltip={}];\n",
                    quote(&node.name),
                    quote(&tooltip)
                ));
            }
        }

        for edge in &self.edges {
            let attrs = match &edge.kind {
                EdgeKind::Satisfies { tags } => format!("tooltip={}", quote(&tooltip(tags))),
                EdgeKind::Includes => "color=green".to_string(),
                EdgeKind::Conflicts { tags } => {
                    format!("color=red, dir=none, tooltip={}", quote(&tooltip(tags)))
                }
            };
            out.push_str(&format!(
                "  {} -> {} [{}];\n",
                quote(&edge.from),
                quote(&edge.to),
                attrs
            ));
        }

        out.push_str("}\n");
        out
    }
}

fn tooltip(tags: &BTreeSet<Tag>) -> String {
    let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
    format!("{} ", tags.join(", "))
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
