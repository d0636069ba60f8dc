//! Join graph construction.
//!
//! The builder walks an entity's foreign keys depth-first in declaration
//! order. Every referenced entity gets a fresh alias from a per-build
//! [`AliasAllocator`], one join clause, and one [`JoinNode`] holding the
//! columns projected through that alias.

use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::alias::AliasAllocator;
use super::column::{projection_label, quote_identifier, ColumnReference};
use crate::catalog::{Catalog, Entity, EntityDescriptor, FieldDescriptor, JoinKind, ReferenceTarget};
use crate::config::{CyclePolicy, QueryConfig};
use crate::error::{ConfigError, Error, Result};

/// One `JOIN ... ON ...` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClause {
    /// Inner or left join.
    pub kind: JoinKind,
    /// Referenced table.
    pub table: String,
    /// Alias the table is joined under.
    pub alias: String,
    /// Alias of the referencing entity.
    pub parent_alias: String,
    /// Foreign-key column on the referencing entity.
    pub foreign_key: String,
    /// Identity column on the referenced entity.
    pub target_column: String,
}

impl fmt::Display for JoinClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} AS {} ON {}.{} = {}.{}",
            self.kind.as_sql(),
            quote_identifier(&self.table),
            quote_identifier(&self.alias),
            quote_identifier(&self.parent_alias),
            quote_identifier(&self.foreign_key),
            quote_identifier(&self.alias),
            quote_identifier(&self.target_column),
        )
    }
}

/// One entity occurrence in the join tree.
#[derive(Debug, Clone)]
pub struct JoinNode {
    alias: String,
    field: Option<String>,
    entity: Arc<EntityDescriptor>,
    columns: Vec<ColumnReference>,
    children: Vec<JoinNode>,
    truncated: Vec<String>,
}

impl JoinNode {
    /// Alias this occurrence is read through.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Field of the parent holding this entity, `None` for the root.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Descriptor of the entity at this node.
    pub fn entity(&self) -> &Arc<EntityDescriptor> {
        &self.entity
    }

    /// Columns projected through this node's alias.
    pub fn columns(&self) -> &[ColumnReference] {
        &self.columns
    }

    /// Nested references, in declaration order.
    pub fn children(&self) -> &[JoinNode] {
        &self.children
    }

    /// Nested node for the given foreign-key field.
    pub fn child(&self, field: &str) -> Option<&JoinNode> {
        self.children.iter().find(|c| c.field() == Some(field))
    }

    /// Reference fields not descended into because they close a cycle.
    pub fn truncated(&self) -> &[String] {
        &self.truncated
    }

    /// Result label of `column` at this node.
    pub fn label(&self, column: &str) -> String {
        projection_label(&self.alias, column)
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a ColumnReference>) {
        out.extend(self.columns.iter());
        for child in &self.children {
            child.collect_columns(out);
        }
    }

    fn collect_aliases<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.push(&self.alias);
        for child in &self.children {
            child.collect_aliases(out);
        }
    }
}

/// The join tree of a query together with its flattened join clauses.
#[derive(Debug, Clone)]
pub struct JoinGraph {
    root: JoinNode,
    joins: Vec<JoinClause>,
}

impl JoinGraph {
    /// Root node, the queried entity.
    pub fn root(&self) -> &JoinNode {
        &self.root
    }

    /// Join clauses, depth-first in declaration order.
    pub fn joins(&self) -> &[JoinClause] {
        &self.joins
    }

    /// Projected columns, depth-first in declaration order.
    pub fn columns(&self) -> Vec<&ColumnReference> {
        let mut out = Vec::new();
        self.root.collect_columns(&mut out);
        out
    }

    /// Every alias in the tree, root first.
    pub fn aliases(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.root.collect_aliases(&mut out);
        out
    }
}

struct BuildState {
    aliases: AliasAllocator,
    joins: Vec<JoinClause>,
    path: Vec<(TypeId, String)>,
}

/// Builds [`JoinGraph`]s from resolved entity descriptors.
#[derive(Debug, Clone)]
pub struct JoinGraphBuilder<'a> {
    catalog: &'a Catalog,
    max_depth: usize,
    cycle_policy: CyclePolicy,
}

impl<'a> JoinGraphBuilder<'a> {
    /// Create a builder resolving referenced entities through `catalog`.
    pub fn new(catalog: &'a Catalog, config: &QueryConfig) -> Self {
        Self {
            catalog,
            max_depth: config.max_join_depth,
            cycle_policy: config.cycle_policy,
        }
    }

    /// Build the graph for `E`, rooted at its table name unless `root_alias` is given.
    pub fn build_for<E: Entity>(&self, root_alias: Option<&str>) -> Result<JoinGraph> {
        let root = self.catalog.resolve::<E>()?;
        let alias = root_alias.unwrap_or(&root.table_name).to_string();
        self.build(root, &alias)
    }

    /// Build the graph for `root`, read through `root_alias`.
    pub fn build(&self, root: Arc<EntityDescriptor>, root_alias: &str) -> Result<JoinGraph> {
        let mut state = BuildState {
            aliases: AliasAllocator::new(root_alias),
            joins: Vec::new(),
            path: Vec::new(),
        };

        let entity = root.type_name;
        let root = self.visit(&mut state, root, root_alias.to_string(), None, Vec::new(), 0)?;
        let graph = JoinGraph {
            root,
            joins: state.joins,
        };

        let columns = ensure_unique_labels(graph.columns())?;

        debug!(
            entity,
            joins = graph.joins.len(),
            columns,
            "Built join graph"
        );
        Ok(graph)
    }

    fn visit(
        &self,
        state: &mut BuildState,
        entity: Arc<EntityDescriptor>,
        alias: String,
        field: Option<String>,
        field_path: Vec<String>,
        depth: usize,
    ) -> Result<JoinNode> {
        let mut node = JoinNode {
            alias,
            field,
            entity: Arc::clone(&entity),
            columns: Vec::new(),
            children: Vec::new(),
            truncated: Vec::new(),
        };

        node.columns = entity
            .columns()
            .map(|column| {
                ColumnReference::new(&entity.table_name, &column.column)
                    .with_alias(&node.alias)
                    .with_field_path(extend(&field_path, &column.field))
            })
            .collect();
        state.aliases.reserve(&node.alias, &column_names(&entity));

        // Stored ids are already projected through their scalar fields.
        for descriptor in &entity.fields {
            match descriptor {
                FieldDescriptor::Column(_) => {}
                FieldDescriptor::ForeignKey(fk) => {
                    let ReferenceTarget::Entity { target, join } = fk.target else {
                        continue;
                    };

                    let child_path = extend(&field_path, &fk.field);
                    let key = (entity.type_id, fk.field.clone());
                    if state.path.contains(&key) {
                        match self.cycle_policy {
                            CyclePolicy::Reject => {
                                return Err(Error::ReferenceCycle {
                                    entity: entity.type_name,
                                    field: fk.field.clone(),
                                });
                            }
                            CyclePolicy::Truncate => {
                                debug!(
                                    entity = entity.type_name,
                                    field = %fk.field,
                                    "Truncated reference cycle"
                                );
                                node.truncated.push(fk.field.clone());
                                continue;
                            }
                        }
                    }

                    if depth + 1 > self.max_depth {
                        return Err(Error::DepthExceeded {
                            max: self.max_depth,
                            path: child_path.join("."),
                        });
                    }

                    let child_entity = target.descriptor(self.catalog)?;
                    let child_alias = state
                        .aliases
                        .allocate_for(&fk.field, &column_names(&child_entity));
                    state.joins.push(JoinClause {
                        kind: join,
                        table: child_entity.table_name.clone(),
                        alias: child_alias.clone(),
                        parent_alias: node.alias.clone(),
                        foreign_key: fk.column.clone(),
                        target_column: child_entity.identity_column.clone(),
                    });

                    state.path.push(key);
                    let child = self.visit(
                        state,
                        child_entity,
                        child_alias,
                        Some(fk.field.clone()),
                        child_path,
                        depth + 1,
                    );
                    state.path.pop();
                    node.children.push(child?);
                }
            }
        }

        Ok(node)
    }
}

/// Fail on the first projection label carried by two columns.
///
/// Alias allocation already avoids reserved labels, so this only guards
/// graphs assembled outside the builder.
fn ensure_unique_labels<'a>(
    columns: impl IntoIterator<Item = &'a ColumnReference>,
) -> Result<usize> {
    let mut labels = HashSet::new();
    for column in columns {
        let label = column.alias_notation();
        if !labels.insert(label.clone()) {
            return Err(ConfigError::AmbiguousLabel { label }.into());
        }
    }
    Ok(labels.len())
}

fn column_names(entity: &EntityDescriptor) -> Vec<&str> {
    entity.columns().map(|c| c.column.as_str()).collect()
}

fn extend(path: &[String], field: &str) -> Vec<String> {
    let mut out = path.to_vec();
    out.push(field.to_string());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, FieldValue, ScalarType};
    use crate::error::ValueError;
    use crate::testing::{Category, Comment, Employee, Post, User};

    #[derive(Debug, Default)]
    struct Item {
        id: i64,
        owner_id: i64,
    }

    impl Entity for Item {
        fn fields() -> Vec<FieldDef> {
            vec![
                FieldDef::scalar("id", ScalarType::Int64),
                FieldDef::scalar("owner_id", ScalarType::Int64),
                FieldDef::reference::<User>("item_owner", "owner_id"),
            ]
        }

        fn assign(&mut self, field: &str, value: FieldValue) -> std::result::Result<(), ValueError> {
            match field {
                "id" => self.id = value.into_scalar()?,
                "owner_id" => self.owner_id = value.into_scalar()?,
                "item_owner" => {}
                _ => return Err(ValueError::UnknownField),
            }
            Ok(())
        }
    }

    fn build<E: Entity>(config: &QueryConfig) -> Result<JoinGraph> {
        let catalog = Catalog::new();
        JoinGraphBuilder::new(&catalog, config).build_for::<E>(None)
    }

    #[test]
    fn test_flat_entity_has_no_joins() {
        let graph = build::<User>(&QueryConfig::default()).unwrap();
        assert!(graph.joins().is_empty());
        assert_eq!(graph.aliases(), vec!["user"]);

        let labels: Vec<_> = graph.columns().iter().map(|c| c.alias_notation()).collect();
        assert_eq!(labels, vec!["user_id", "user_name", "user_email"]);
    }

    #[test]
    fn test_sibling_references_to_same_table() {
        let graph = build::<Post>(&QueryConfig::default()).unwrap();
        assert_eq!(graph.aliases(), vec!["post", "author", "editor"]);
        assert_eq!(
            graph.joins()[0].to_string(),
            "INNER JOIN `user` AS `author` ON `post`.`author_id` = `author`.`id`"
        );
        assert_eq!(
            graph.joins()[1].to_string(),
            "LEFT JOIN `user` AS `editor` ON `post`.`editor_id` = `editor`.`id`"
        );
        // Enumerations never add joins.
        assert_eq!(graph.joins().len(), 2);
    }

    #[test]
    fn test_join_count_matches_reachable_references() {
        let graph = build::<Comment>(&QueryConfig::default()).unwrap();
        // comment.post, post.author, post.editor, comment.author
        assert_eq!(graph.joins().len(), 4);

        let aliases = graph.aliases();
        let unique: HashSet<_> = aliases.iter().collect();
        assert_eq!(unique.len(), aliases.len());
        assert_eq!(aliases, vec!["comment", "post", "author", "editor", "author_1"]);

        let nested = graph.root().child("post").unwrap().child("author").unwrap();
        assert_eq!(nested.label("name"), "author_name");
        let path = nested.columns()[1].field_path().join(".");
        assert_eq!(path, "post.author.name");
    }

    #[test]
    fn test_root_alias_override() {
        let catalog = Catalog::new();
        let graph = JoinGraphBuilder::new(&catalog, &QueryConfig::default())
            .build_for::<Post>(Some("p"))
            .unwrap();
        assert_eq!(graph.root().alias(), "p");
        assert_eq!(graph.joins()[0].parent_alias, "p");
        assert_eq!(graph.columns()[0].sql_notation(), "`p`.`id`");
    }

    #[test]
    fn test_self_reference_rejected_by_default() {
        let err = build::<Category>(&QueryConfig::default()).unwrap_err();
        assert!(matches!(err, Error::ReferenceCycle { ref field, .. } if field == "parent"));
    }

    #[test]
    fn test_self_reference_truncated() {
        let config = QueryConfig::new().with_cycle_policy(CyclePolicy::Truncate);
        let graph = build::<Category>(&config).unwrap();

        assert_eq!(graph.aliases(), vec!["category", "parent"]);
        let parent = graph.root().child("parent").unwrap();
        assert_eq!(parent.truncated(), &["parent".to_string()]);
        assert_eq!(
            graph.joins()[0].to_string(),
            "LEFT JOIN `category` AS `parent` ON `category`.`parent_id` = `parent`.`id`"
        );
    }

    #[test]
    fn test_mutual_reference_cycle() {
        let err = build::<Employee>(&QueryConfig::default()).unwrap_err();
        assert!(matches!(err, Error::ReferenceCycle { ref field, .. } if field == "department"));

        let config = QueryConfig::new().with_cycle_policy(CyclePolicy::Truncate);
        let graph = build::<Employee>(&config).unwrap();
        assert_eq!(graph.aliases(), vec!["employee", "department", "head"]);
    }

    #[test]
    fn test_depth_guard() {
        let config = QueryConfig::new().with_max_join_depth(1);
        let err = build::<Comment>(&config).unwrap_err();
        assert!(matches!(err, Error::DepthExceeded { max: 1, ref path } if path == "post.author"));

        let config = QueryConfig::new().with_max_join_depth(0);
        assert!(build::<User>(&config).is_ok());
    }

    #[test]
    fn test_alias_avoids_label_collision() {
        let graph = build::<Item>(&QueryConfig::default()).unwrap();
        assert_eq!(graph.aliases(), vec!["item", "item_owner_1"]);

        let labels: Vec<_> = graph.columns().iter().map(|c| c.alias_notation()).collect();
        assert_eq!(
            labels,
            vec![
                "item_id",
                "item_owner_id",
                "item_owner_1_id",
                "item_owner_1_name",
                "item_owner_1_email",
            ]
        );
        assert_eq!(
            graph.joins()[0].to_string(),
            "INNER JOIN `user` AS `item_owner_1` ON `item`.`owner_id` = `item_owner_1`.`id`"
        );
    }

    #[test]
    fn test_ambiguous_label_rejected() {
        let columns = [
            ColumnReference::new("item", "owner_id").with_alias("item"),
            ColumnReference::new("user", "id").with_alias("item_owner"),
        ];
        let err = ensure_unique_labels(&columns).unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::AmbiguousLabel { ref label }) if label == "item_owner_id"
        ));

        assert_eq!(ensure_unique_labels(&columns[..1]).unwrap(), 1);
    }
}
