//! Building tree nodes from catalog listings
//!
//! Keys are namespaced by kind and qualified by the full path, e.g.
//! `db:app`, `schema:app.public`, `group:app.public.table`,
//! `table:app.public.users`, `column:app.public.users.id`.

use super::{NavigationTree, NodeKind, NodeMetadata, NodeSpec};
use crate::db::provider::{CatalogObject, ColumnInfo, ObjectKind, ObjectRef};

pub fn database_key(database: &str) -> String {
    format!("db:{}", database)
}

pub fn schema_key(database: &str, schema: &str) -> String {
    format!("schema:{}.{}", database, schema)
}

pub fn object_key(database: &str, object: &ObjectRef) -> String {
    let mut key = match &object.table {
        Some(table) => format!(
            "{}:{}.{}.{}.{}",
            object.kind.key(),
            database,
            object.schema,
            table,
            object.name
        ),
        None => format!(
            "{}:{}.{}.{}",
            object.kind.key(),
            database,
            object.schema,
            object.name
        ),
    };
    // Overloaded routines share a name
    if let Some(args) = &object.arguments {
        key.push_str(&format!("({})", args));
    }
    key
}

fn group_key(database: &str, schema: &str, table: Option<&str>, kind: ObjectKind) -> String {
    match table {
        Some(table) => format!("group:{}.{}.{}.{}", database, schema, table, kind.key()),
        None => format!("group:{}.{}.{}", database, schema, kind.key()),
    }
}

/// Database node with its (unloaded) schemas
pub fn database_node(database: &str, schemas: &[String]) -> NodeSpec {
    let children = schemas
        .iter()
        .map(|schema| {
            NodeSpec::lazy(
                schema_key(database, schema),
                NodeKind::Schema,
                schema.clone(),
                NodeMetadata::Schema {
                    name: schema.clone(),
                },
            )
        })
        .collect();
    NodeSpec::lazy(
        database_key(database),
        NodeKind::Database,
        database.to_string(),
        NodeMetadata::Database {
            name: database.to_string(),
        },
    )
    .with_children(children)
}

/// Fresh tree for a connection: root → database → schemas
pub fn build_tree(database: &str, schemas: &[String]) -> NavigationTree {
    let mut tree = NavigationTree::new();
    let root = tree.root();
    if let Some(db) = tree.insert(root, database_node(database, schemas)) {
        tree.set_expanded(db, true);
    }
    tree
}

/// Object groups of a schema; empty groups are left out
pub fn schema_children(
    database: &str,
    schema: &str,
    groups: Vec<(ObjectKind, Vec<CatalogObject>)>,
) -> Vec<NodeSpec> {
    groups
        .into_iter()
        .filter(|(_, objects)| !objects.is_empty())
        .map(|(kind, objects)| {
            let children = objects
                .into_iter()
                .map(|object| object_node(database, schema, None, object))
                .collect();
            group_node(database, schema, None, kind, children)
        })
        .collect()
}

/// Columns of a relation, followed by its index and trigger groups
pub fn relation_children(
    database: &str,
    schema: &str,
    relation: &str,
    columns: Vec<ColumnInfo>,
    indexes: Vec<CatalogObject>,
    triggers: Vec<CatalogObject>,
) -> Vec<NodeSpec> {
    let mut children: Vec<NodeSpec> = columns
        .into_iter()
        .map(|column| column_node(database, schema, relation, column))
        .collect();
    for (kind, objects) in [(ObjectKind::Index, indexes), (ObjectKind::Trigger, triggers)] {
        if objects.is_empty() {
            continue;
        }
        let nodes = objects
            .into_iter()
            .map(|object| object_node(database, schema, Some(relation), object))
            .collect();
        children.push(group_node(database, schema, Some(relation), kind, nodes));
    }
    children
}

fn group_node(
    database: &str,
    schema: &str,
    table: Option<&str>,
    kind: ObjectKind,
    children: Vec<NodeSpec>,
) -> NodeSpec {
    NodeSpec::lazy(
        group_key(database, schema, table, kind),
        NodeKind::ObjectGroup,
        format!("{} ({})", kind.group_label(), children.len()),
        NodeMetadata::Group {
            schema: schema.to_string(),
            table: table.map(str::to_string),
            kind,
        },
    )
    .with_children(children)
}

fn object_node(database: &str, schema: &str, table: Option<&str>, object: CatalogObject) -> NodeSpec {
    let is_routine = matches!(object.kind, ObjectKind::Function | ObjectKind::Procedure);
    let label = match (&object.detail, is_routine) {
        (Some(args), true) => format!("{}({})", object.name, args),
        (Some(detail), false) => format!("{} [{}]", object.name, detail),
        (None, true) => format!("{}()", object.name),
        (None, false) => object.name.clone(),
    };
    let target = ObjectRef {
        kind: object.kind,
        schema: schema.to_string(),
        name: object.name,
        table: table.map(str::to_string),
        arguments: if is_routine {
            Some(object.detail.unwrap_or_default())
        } else {
            None
        },
    };
    let key = object_key(database, &target);
    let kind = NodeKind::from(target.kind);
    let metadata = NodeMetadata::Object(target);
    if kind.is_relation() {
        NodeSpec::lazy(key, kind, label, metadata)
    } else {
        NodeSpec::leaf(key, kind, label, metadata)
    }
}

fn column_node(database: &str, schema: &str, relation: &str, column: ColumnInfo) -> NodeSpec {
    let mut label = format!("{} {}", column.name, column.type_name);
    if column.is_primary_key {
        label.push_str(" PK");
    }
    if !column.nullable {
        label.push_str(" NOT NULL");
    }
    NodeSpec::leaf(
        format!("column:{}.{}.{}.{}", database, schema, relation, column.name),
        NodeKind::Column,
        label,
        NodeMetadata::Column(column),
    )
}
