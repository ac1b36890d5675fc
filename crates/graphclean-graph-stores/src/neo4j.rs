//! Neo4j graph store implementation.
//!
//! Nodes are addressed by `elementId`. Labels and relationship types are
//! validated enum variants and identifiers, so they are the only values
//! placed into query text; everything else is a parameter. APOC's
//! `apoc.merge.relationship` provides the bulk-merge accelerator.

use std::collections::HashMap;

use async_trait::async_trait;
use neo4rs::{query, BoltList, BoltMap, BoltNull, BoltString, BoltType, ConfigBuilder, Graph, Query};

use graphclean_core::error::{GraphCleanError, GraphCleanResult};
use graphclean_core::traits::{EntityGraphStore, GraphStoreConfig};
use graphclean_core::types::{
    CreateRelationship, DeleteRequest, Direction, EntityLabel, EntityNode, LabelSet, MergeRequest,
    MigrationCounts, NodeId, NodeUpdate, PropertyMap, RelabelRequest, RelationshipId,
    RelationshipRecord, RelationshipType, SystemLabel,
};

const NODE_RETURN: &str = "elementId(n) AS id, labels(n) AS labels, n.name AS name, \
     n.display_name AS display_name, n.definition AS definition, \
     coalesce(n.aliases, []) AS aliases, coalesce(n.source_spans, []) AS source_spans, \
     n.communityId AS community_id";

/// Neo4j graph store implementation.
pub struct Neo4jGraphStore {
    graph: Graph,
}

impl Neo4jGraphStore {
    /// Connect to Neo4j.
    pub async fn new(config: GraphStoreConfig) -> GraphCleanResult<Self> {
        let username = config.username.clone().unwrap_or_else(|| "neo4j".to_string());
        let password = config.password.clone().unwrap_or_default();

        let mut builder = ConfigBuilder::default()
            .uri(config.url.as_str())
            .user(username.as_str())
            .password(password.as_str());
        if let Some(database) = &config.database {
            builder = builder.db(database.as_str());
        }
        let neo_config = builder
            .build()
            .map_err(|e| GraphCleanError::Configuration(format!("Invalid Neo4j config: {}", e)))?;

        let graph = Graph::connect(neo_config).await.map_err(|e| {
            GraphCleanError::store_unavailable(format!(
                "Failed to connect to Neo4j at {}: {}",
                config.url, e
            ))
        })?;

        tracing::info!(url = %config.url, "Connected to Neo4j");
        Ok(Self { graph })
    }

    async fn rows(&self, q: Query, operation: &str) -> GraphCleanResult<Vec<neo4rs::Row>> {
        let mut stream = self
            .graph
            .execute(q)
            .await
            .map_err(|e| map_err(operation, e))?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await.map_err(|e| map_err(operation, e))? {
            rows.push(row);
        }
        Ok(rows)
    }

    async fn first_row(&self, q: Query, operation: &str) -> GraphCleanResult<Option<neo4rs::Row>> {
        Ok(self.rows(q, operation).await?.into_iter().next())
    }
}

fn map_err(operation: &str, e: neo4rs::Error) -> GraphCleanError {
    match e {
        neo4rs::Error::ConnectionError { .. } | neo4rs::Error::IOError { .. } => {
            GraphCleanError::store_unavailable(format!("{} failed: {}", operation, e))
        }
        other => GraphCleanError::graph_store(format!("{} failed: {}", operation, other)),
    }
}

fn node_from_row(row: &neo4rs::Row) -> Option<EntityNode> {
    let labels: Vec<String> = row.get("labels").unwrap_or_default();
    let type_labels: LabelSet = labels
        .iter()
        .filter_map(|l| l.parse::<EntityLabel>().ok())
        .collect();
    let system_labels = labels
        .iter()
        .filter_map(|l| l.parse::<SystemLabel>().ok())
        .collect();

    Some(EntityNode {
        id: NodeId::new(row.get::<String>("id").ok()?),
        type_labels,
        system_labels,
        name: row.get::<String>("name").ok()?,
        display_name: row.get("display_name").unwrap_or_default(),
        definition: row.get("definition").unwrap_or_default(),
        aliases: row.get("aliases").unwrap_or_default(),
        source_spans: row.get("source_spans").unwrap_or_default(),
        community_id: row.get("community_id").unwrap_or_default(),
    })
}

fn json_to_bolt(value: &serde_json::Value) -> BoltType {
    match value {
        serde_json::Value::Null => BoltType::Null(BoltNull),
        serde_json::Value::Bool(b) => BoltType::from(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => BoltType::from(i),
            None => BoltType::from(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => BoltType::from(s.clone()),
        serde_json::Value::Array(items) => {
            let mut list = BoltList::with_capacity(items.len());
            for item in items {
                list.push(json_to_bolt(item));
            }
            BoltType::List(list)
        }
        serde_json::Value::Object(map) => BoltType::Map(properties_to_bolt(map)),
    }
}

fn properties_to_bolt(properties: &PropertyMap) -> BoltMap {
    let mut map = BoltMap::with_capacity(properties.len());
    for (key, value) in properties {
        map.put(BoltString::from(key.as_str()), json_to_bolt(value));
    }
    map
}

/// `SET` clause for the fields an update carries. Property names are fixed.
fn update_clause(var: &str, update: &NodeUpdate) -> String {
    let mut sets = Vec::new();
    if update.name.is_some() {
        sets.push(format!("{v}.name = $name", v = var));
    }
    if update.display_name.is_some() {
        sets.push(format!("{v}.display_name = $display_name", v = var));
    }
    if update.definition.is_some() {
        sets.push(format!("{v}.definition = $definition", v = var));
    }
    if !update.add_aliases.is_empty() {
        sets.push(format!(
            "{v}.aliases = coalesce({v}.aliases, []) + \
             [a IN $aliases WHERE NOT a IN coalesce({v}.aliases, [])]",
            v = var
        ));
    }
    if !update.add_source_spans.is_empty() {
        sets.push(format!(
            "{v}.source_spans = coalesce({v}.source_spans, []) + \
             [s IN $source_spans WHERE NOT s IN coalesce({v}.source_spans, [])]",
            v = var
        ));
    }
    if sets.is_empty() {
        String::new()
    } else {
        format!("SET {}", sets.join(", "))
    }
}

fn with_update_params(q: Query, update: &NodeUpdate) -> Query {
    let mut q = q;
    if let Some(name) = &update.name {
        q = q.param("name", name.clone());
    }
    if let Some(display_name) = &update.display_name {
        q = q.param("display_name", display_name.clone());
    }
    if let Some(definition) = &update.definition {
        q = q.param("definition", definition.clone());
    }
    if !update.add_aliases.is_empty() {
        q = q.param("aliases", update.add_aliases.clone());
    }
    if !update.add_source_spans.is_empty() {
        q = q.param("source_spans", update.add_source_spans.clone());
    }
    q
}

/// Atomic merge of `$duplicate` into `$primary`.
///
/// `apoc.merge.relationship` reuses an equivalent edge already on the
/// primary; the duplicate's properties the kept edge lacks are folded in
/// afterwards, so a matched edge keeps its own values.
fn bulk_merge_cypher(update: &NodeUpdate) -> String {
    format!(
        "MATCH (p) WHERE elementId(p) = $primary
         MATCH (d) WHERE elementId(d) = $duplicate
         CALL {{
             WITH p, d
             MATCH (d)-[r]->(t)
             WITH p, d, r, CASE WHEN t = d THEN p ELSE t END AS target
             CALL apoc.merge.relationship(p, type(r), {{}}, properties(r), target, {{}})
             YIELD rel
             SET rel += apoc.map.removeKeys(properties(r), keys(rel))
             RETURN count(rel) AS outgoing
         }}
         CALL {{
             WITH p, d
             MATCH (s)-[r]->(d) WHERE s <> d
             CALL apoc.merge.relationship(s, type(r), {{}}, properties(r), p, {{}})
             YIELD rel
             SET rel += apoc.map.removeKeys(properties(r), keys(rel))
             RETURN count(rel) AS incoming
         }}
         WITH p, d, outgoing, incoming
         {}
         DETACH DELETE d
         RETURN outgoing, incoming",
        update_clause("p", update)
    )
}

#[async_trait]
impl EntityGraphStore for Neo4jGraphStore {
    async fn scan_label(&self, label: EntityLabel) -> GraphCleanResult<Vec<EntityNode>> {
        let q = query(&format!(
            "MATCH (n:{}) WHERE n.name IS NOT NULL RETURN {} ORDER BY elementId(n)",
            label.as_str(),
            NODE_RETURN
        ));
        let rows = self.rows(q, "scan_label").await?;
        Ok(rows.iter().filter_map(node_from_row).collect())
    }

    async fn get_node(&self, id: &NodeId) -> GraphCleanResult<Option<EntityNode>> {
        let q = query(&format!(
            "MATCH (n) WHERE elementId(n) = $id RETURN {}",
            NODE_RETURN
        ))
        .param("id", id.as_str());
        let row = self.first_row(q, "get_node").await?;
        Ok(row.as_ref().and_then(node_from_row))
    }

    async fn relationships(&self, id: &NodeId) -> GraphCleanResult<Vec<RelationshipRecord>> {
        let q = query(
            "MATCH (n) WHERE elementId(n) = $id
             MATCH (n)-[r]-(m)
             RETURN elementId(r) AS id, type(r) AS type,
                    startNode(r) = n AS outgoing, elementId(m) AS other,
                    properties(r) AS props",
        )
        .param("id", id.as_str());

        let mut records = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for row in self.rows(q, "relationships").await? {
            let rel_id: String = row.get("id").unwrap_or_default();
            // Undirected match yields a self-loop twice.
            if !seen.insert(rel_id.clone()) {
                continue;
            }
            let rel_type: String = row.get("type").unwrap_or_default();
            let rel_type = match RelationshipType::from_stored(rel_type) {
                Ok(rel_type) => rel_type,
                Err(e) => {
                    tracing::warn!(node = %id, relationship = %rel_id, error = %e, "Skipping relationship");
                    continue;
                }
            };
            let outgoing: bool = row.get("outgoing").unwrap_or(false);
            records.push(RelationshipRecord {
                id: RelationshipId::new(rel_id),
                rel_type,
                direction: if outgoing {
                    Direction::Outgoing
                } else {
                    Direction::Incoming
                },
                other: NodeId::new(row.get::<String>("other").unwrap_or_default()),
                properties: row.get("props").unwrap_or_default(),
            });
        }
        Ok(records)
    }

    async fn create_relationship(
        &self,
        request: &CreateRelationship,
    ) -> GraphCleanResult<RelationshipId> {
        let q = query(&format!(
            "MATCH (a) WHERE elementId(a) = $start
             MATCH (b) WHERE elementId(b) = $end
             CREATE (a)-[r:{}]->(b)
             SET r = $props
             RETURN elementId(r) AS id",
            request.rel_type.as_str()
        ))
        .param("start", request.start.as_str())
        .param("end", request.end.as_str())
        .param("props", BoltType::Map(properties_to_bolt(&request.properties)));

        let row = self
            .first_row(q, "create_relationship")
            .await?
            .ok_or_else(|| {
                GraphCleanError::not_found(format!("{} or {}", request.start, request.end))
            })?;
        Ok(RelationshipId::new(
            row.get::<String>("id").unwrap_or_default(),
        ))
    }

    async fn set_relationship_properties(
        &self,
        id: &RelationshipId,
        properties: &PropertyMap,
    ) -> GraphCleanResult<()> {
        let q = query("MATCH ()-[r]->() WHERE elementId(r) = $id SET r += $props")
            .param("id", id.as_str())
            .param("props", BoltType::Map(properties_to_bolt(properties)));
        self.graph
            .run(q)
            .await
            .map_err(|e| map_err("set_relationship_properties", e))
    }

    async fn delete_relationship(&self, id: &RelationshipId) -> GraphCleanResult<()> {
        let q = query("MATCH ()-[r]->() WHERE elementId(r) = $id DELETE r").param("id", id.as_str());
        self.graph
            .run(q)
            .await
            .map_err(|e| map_err("delete_relationship", e))
    }

    async fn update_node(&self, update: &NodeUpdate) -> GraphCleanResult<()> {
        if update.is_empty() {
            return Ok(());
        }
        let q = query(&format!(
            "MATCH (n) WHERE elementId(n) = $id {} RETURN elementId(n) AS id",
            update_clause("n", update)
        ))
        .param("id", update.id.as_str());
        let q = with_update_params(q, update);

        match self.first_row(q, "update_node").await? {
            Some(_) => Ok(()),
            None => Err(GraphCleanError::not_found(update.id.as_str())),
        }
    }

    async fn relabel(&self, request: &RelabelRequest) -> GraphCleanResult<()> {
        let q = query(&format!(
            "MATCH (n:{remove}) WHERE elementId(n) = $id
             REMOVE n:{remove} SET n:{add}
             RETURN elementId(n) AS id",
            remove = request.remove.as_str(),
            add = request.add.as_str()
        ))
        .param("id", request.id.as_str());

        match self.first_row(q, "relabel").await? {
            Some(_) => Ok(()),
            None => Err(GraphCleanError::not_found(format!(
                "{} with label {}",
                request.id, request.remove
            ))),
        }
    }

    async fn delete_node(&self, request: &DeleteRequest) -> GraphCleanResult<usize> {
        let pattern = match request.expected_label {
            Some(label) => format!("(n:{})", label.as_str()),
            None => "(n)".to_string(),
        };
        let count_q = query(&format!(
            "MATCH {} WHERE elementId(n) = $id
             OPTIONAL MATCH (n)-[r]-()
             RETURN count(DISTINCT r) AS rels",
            pattern
        ))
        .param("id", request.id.as_str());
        let rows = self.rows(count_q, "delete_node").await?;
        let Some(row) = rows.first() else {
            return Err(GraphCleanError::not_found(request.id.as_str()));
        };
        let rels = row.get::<i64>("rels").unwrap_or(0).max(0) as usize;

        if !request.detach && rels > 0 {
            return Err(GraphCleanError::graph_store_with_code(
                format!("Node '{}' still has {} relationships", request.id, rels),
                graphclean_core::ErrorCode::NodeHasRelationships,
            ));
        }

        let delete = if request.detach { "DETACH DELETE n" } else { "DELETE n" };
        let q = query(&format!(
            "MATCH {} WHERE elementId(n) = $id {}",
            pattern, delete
        ))
        .param("id", request.id.as_str());
        self.graph
            .run(q)
            .await
            .map_err(|e| map_err("delete_node", e))?;
        Ok(rels)
    }

    async fn supports_bulk_merge(&self) -> GraphCleanResult<bool> {
        let q = query(
            "SHOW PROCEDURES YIELD name
             WHERE name = 'apoc.merge.relationship'
             RETURN count(name) AS available",
        );
        match self.first_row(q, "supports_bulk_merge").await {
            Ok(Some(row)) => Ok(row.get::<i64>("available").unwrap_or(0) > 0),
            Ok(None) => Ok(false),
            Err(e) if e.is_transient() => Err(e),
            Err(e) => {
                tracing::debug!(error = %e, "APOC probe failed, assuming unavailable");
                Ok(false)
            }
        }
    }

    async fn bulk_merge(
        &self,
        request: &MergeRequest,
        update: &NodeUpdate,
    ) -> GraphCleanResult<MigrationCounts> {
        let q = query(&bulk_merge_cypher(update))
            .param("primary", request.primary.as_str())
            .param("duplicate", request.duplicate.as_str());
        let q = with_update_params(q, update);

        let row = match self.first_row(q, "bulk_merge").await {
            Ok(row) => row,
            Err(e) if e.to_string().contains("apoc.") => {
                return Err(GraphCleanError::accelerator_unavailable(e.to_string()))
            }
            Err(e) => return Err(e),
        };
        let row = row.ok_or_else(|| {
            GraphCleanError::not_found(format!("{} or {}", request.primary, request.duplicate))
        })?;

        Ok(MigrationCounts {
            outgoing: row.get::<i64>("outgoing").unwrap_or(0).max(0) as usize,
            incoming: row.get::<i64>("incoming").unwrap_or(0).max(0) as usize,
            collapsed: 0,
        })
    }

    async fn glossary_definitions(&self) -> GraphCleanResult<HashMap<String, String>> {
        let q = query(
            "MATCH (d:Definition)
             WHERE d.term IS NOT NULL AND d.definition IS NOT NULL
             RETURN d.term AS term, d.definition AS definition",
        );
        let rows = self.rows(q, "glossary_definitions").await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let term: String = row.get("term").ok()?;
                let definition: String = row.get("definition").ok()?;
                Some((term, definition))
            })
            .collect())
    }
}
