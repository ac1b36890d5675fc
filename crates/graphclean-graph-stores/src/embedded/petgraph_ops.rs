//! In-memory graph operations using petgraph StableDiGraph.
//!
//! Node and edge indices stay valid across removals, so the id indexes
//! never need rebuilding after a merge or delete.

use std::collections::HashMap;

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction as PetDirection;
use serde::{Deserialize, Serialize};

use graphclean_core::error::{ErrorCode, GraphCleanError, GraphCleanResult};
use graphclean_core::types::{
    CreateRelationship, DeleteRequest, Direction, EntityLabel, EntityNode, MergeRequest,
    MigrationCounts, NodeId, NodeUpdate, PropertyMap, RelabelRequest, RelationshipId,
    RelationshipKey, RelationshipRecord, RelationshipType,
};

/// Edge data in the entity graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEdge {
    pub id: RelationshipId,
    pub rel_type: RelationshipType,
    pub properties: PropertyMap,
}

/// The in-memory graph type using petgraph.
pub type EntityGraph = StableDiGraph<EntityNode, StoredEdge>;

/// Graph plus O(1) id indexes.
#[derive(Debug, Default)]
pub struct GraphState {
    graph: EntityGraph,
    nodes: HashMap<NodeId, NodeIndex>,
    edges: HashMap<RelationshipId, EdgeIndex>,
    next_edge: u64,
}

impl GraphState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Ids must be unique.
    pub fn add_node(&mut self, node: EntityNode) -> GraphCleanResult<NodeIndex> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphCleanError::validation(format!(
                "Duplicate node id '{}'",
                node.id
            )));
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.nodes.insert(id, idx);
        Ok(idx)
    }

    /// Add an edge, keeping `id` when given or allocating a fresh one.
    pub fn add_edge(
        &mut self,
        start: &NodeId,
        end: &NodeId,
        rel_type: RelationshipType,
        properties: PropertyMap,
        id: Option<RelationshipId>,
    ) -> GraphCleanResult<RelationshipId> {
        let source = self.index(start)?;
        let target = self.index(end)?;
        let id = match id {
            Some(id) if self.edges.contains_key(&id) => {
                return Err(GraphCleanError::validation(format!(
                    "Duplicate relationship id '{}'",
                    id
                )))
            }
            Some(id) => id,
            None => self.allocate_edge_id(),
        };
        let edge = self.graph.add_edge(
            source,
            target,
            StoredEdge {
                id: id.clone(),
                rel_type,
                properties,
            },
        );
        self.edges.insert(id.clone(), edge);
        Ok(id)
    }

    fn allocate_edge_id(&mut self) -> RelationshipId {
        loop {
            self.next_edge += 1;
            let id = RelationshipId::new(format!("e{}", self.next_edge));
            if !self.edges.contains_key(&id) {
                return id;
            }
        }
    }

    fn index(&self, id: &NodeId) -> GraphCleanResult<NodeIndex> {
        self.nodes
            .get(id)
            .copied()
            .ok_or_else(|| GraphCleanError::not_found(id.as_str()))
    }

    pub fn node(&self, id: &NodeId) -> Option<&EntityNode> {
        self.nodes
            .get(id)
            .and_then(|idx| self.graph.node_weight(*idx))
    }

    /// Nodes carrying `label`, in insertion order.
    pub fn scan(&self, label: EntityLabel) -> Vec<EntityNode> {
        self.graph
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx))
            .filter(|node| node.has_label(label))
            .cloned()
            .collect()
    }

    /// Every node, in insertion order.
    pub fn all_nodes(&self) -> Vec<EntityNode> {
        self.graph
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx))
            .cloned()
            .collect()
    }

    /// Every edge as `(start, end, edge)`.
    pub fn all_edges(&self) -> Vec<(NodeId, NodeId, StoredEdge)> {
        self.graph
            .edge_indices()
            .filter_map(|e| {
                let (source, target) = self.graph.edge_endpoints(e)?;
                Some((
                    self.graph[source].id.clone(),
                    self.graph[target].id.clone(),
                    self.graph[e].clone(),
                ))
            })
            .collect()
    }

    /// Incident edges; a self-loop appears once, as outgoing.
    pub fn relationships(&self, id: &NodeId) -> GraphCleanResult<Vec<RelationshipRecord>> {
        let idx = self.index(id)?;
        let mut records = Vec::new();

        for edge in self.graph.edges_directed(idx, PetDirection::Outgoing) {
            records.push(RelationshipRecord {
                id: edge.weight().id.clone(),
                rel_type: edge.weight().rel_type.clone(),
                direction: Direction::Outgoing,
                other: self.graph[edge.target()].id.clone(),
                properties: edge.weight().properties.clone(),
            });
        }
        for edge in self.graph.edges_directed(idx, PetDirection::Incoming) {
            if edge.source() == idx {
                continue;
            }
            records.push(RelationshipRecord {
                id: edge.weight().id.clone(),
                rel_type: edge.weight().rel_type.clone(),
                direction: Direction::Incoming,
                other: self.graph[edge.source()].id.clone(),
                properties: edge.weight().properties.clone(),
            });
        }
        Ok(records)
    }

    pub fn create_relationship(
        &mut self,
        request: &CreateRelationship,
    ) -> GraphCleanResult<RelationshipId> {
        self.add_edge(
            &request.start,
            &request.end,
            request.rel_type.clone(),
            request.properties.clone(),
            None,
        )
    }

    pub fn set_relationship_properties(
        &mut self,
        id: &RelationshipId,
        properties: &PropertyMap,
    ) -> GraphCleanResult<()> {
        let edge = self
            .edges
            .get(id)
            .and_then(|e| self.graph.edge_weight_mut(*e))
            .ok_or_else(|| {
                GraphCleanError::graph_store_with_code(
                    format!("Relationship not found: {}", id),
                    ErrorCode::GrpOperationFailed,
                )
            })?;
        for (key, value) in properties {
            edge.properties.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    pub fn delete_relationship(&mut self, id: &RelationshipId) {
        if let Some(edge) = self.edges.remove(id) {
            self.graph.remove_edge(edge);
        }
    }

    pub fn update_node(&mut self, update: &NodeUpdate) -> GraphCleanResult<()> {
        let idx = self.index(&update.id)?;
        let node = &mut self.graph[idx];

        if let Some(name) = &update.name {
            node.name = name.clone();
        }
        if let Some(display_name) = &update.display_name {
            node.display_name = Some(display_name.clone());
        }
        if let Some(definition) = &update.definition {
            node.definition = Some(definition.clone());
        }
        union_into(&mut node.aliases, &update.add_aliases);
        union_into(&mut node.source_spans, &update.add_source_spans);
        Ok(())
    }

    pub fn relabel(&mut self, request: &RelabelRequest) -> GraphCleanResult<()> {
        let idx = self.index(&request.id)?;
        let node = &mut self.graph[idx];
        if !node.type_labels.remove(&request.remove) {
            return Err(GraphCleanError::validation_with_code(
                format!("Node '{}' does not carry label {}", request.id, request.remove),
                ErrorCode::ValInvalidLabel,
            ));
        }
        node.type_labels.insert(request.add);
        Ok(())
    }

    pub fn delete_node(&mut self, request: &DeleteRequest) -> GraphCleanResult<usize> {
        let idx = self.index(&request.id)?;
        if let Some(label) = request.expected_label {
            if !self.graph[idx].has_label(label) {
                return Err(GraphCleanError::not_found(format!(
                    "{} with label {}",
                    request.id, label
                )));
            }
        }

        let incident: Vec<EdgeIndex> = self
            .graph
            .edges_directed(idx, PetDirection::Outgoing)
            .chain(
                self.graph
                    .edges_directed(idx, PetDirection::Incoming)
                    .filter(|e| e.source() != idx),
            )
            .map(|e| e.id())
            .collect();

        if !request.detach && !incident.is_empty() {
            return Err(GraphCleanError::graph_store_with_code(
                format!(
                    "Node '{}' still has {} relationships",
                    request.id,
                    incident.len()
                ),
                ErrorCode::NodeHasRelationships,
            ));
        }

        for edge in &incident {
            if let Some(weight) = self.graph.remove_edge(*edge) {
                self.edges.remove(&weight.id);
            }
        }
        self.graph.remove_node(idx);
        self.nodes.remove(&request.id);
        Ok(incident.len())
    }

    /// Move every relationship of the duplicate onto the primary, apply the
    /// property update and remove the duplicate, in one step.
    ///
    /// An edge whose retargeted (type, direction, other endpoint) already
    /// exists on the primary is folded into it; missing properties are
    /// copied, existing ones are kept.
    pub fn merge_nodes(
        &mut self,
        request: &MergeRequest,
        update: &NodeUpdate,
    ) -> GraphCleanResult<MigrationCounts> {
        self.index(&request.primary)?;
        let duplicate_idx = self.index(&request.duplicate)?;
        if update.id != request.primary {
            return Err(GraphCleanError::validation(format!(
                "Update targets '{}' but merge primary is '{}'",
                update.id, request.primary
            )));
        }

        let mut kept: HashMap<RelationshipKey, RelationshipId> = self
            .relationships(&request.primary)?
            .into_iter()
            .map(|rel| (rel.key(), rel.id))
            .collect();
        let mut counts = MigrationCounts::default();

        for rel in self.relationships(&request.duplicate)? {
            let other = if rel.other == request.duplicate {
                request.primary.clone()
            } else {
                rel.other.clone()
            };
            let direction = if other == request.primary {
                Direction::Outgoing
            } else {
                rel.direction
            };
            let key = RelationshipKey {
                rel_type: rel.rel_type.clone(),
                direction,
                other: other.clone(),
            };

            self.delete_relationship(&rel.id);
            if let Some(existing) = kept.get(&key) {
                let missing: PropertyMap = match self.edges.get(existing) {
                    Some(e) => rel
                        .properties
                        .into_iter()
                        .filter(|(k, _)| !self.graph[*e].properties.contains_key(k))
                        .collect(),
                    None => PropertyMap::new(),
                };
                let existing = existing.clone();
                self.set_relationship_properties(&existing, &missing)?;
                counts.collapsed += 1;
                continue;
            }

            let (start, end) = match direction {
                Direction::Outgoing => (request.primary.clone(), other),
                Direction::Incoming => (other, request.primary.clone()),
            };
            let id = self.add_edge(&start, &end, rel.rel_type, rel.properties, Some(rel.id))?;
            kept.insert(key, id);
            match rel.direction {
                Direction::Outgoing => counts.outgoing += 1,
                Direction::Incoming => counts.incoming += 1,
            }
        }

        self.update_node(update)?;
        self.graph.remove_node(duplicate_idx);
        self.nodes.remove(&request.duplicate);
        Ok(counts)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

/// Append values not already present, keeping order.
fn union_into(target: &mut Vec<String>, values: &[String]) {
    for value in values {
        if !target.contains(value) {
            target.push(value.clone());
        }
    }
}
