//! Integration tests for PostgresDatabase

use crate::common::live_config;
use pgnav::config::ConnectionConfig;
use pgnav::db::{
    CellValue, Database, ObjectKind, ObjectRef, PageRequest, PostgresDatabase, QuerySession,
    SearchRequest, SortDirection, SortSpec,
};
use pgnav::error::DbError;
use pgnav::filter::{Filter, FilterCondition, FilterGroup, FilterValue, Operator};
use std::time::Duration;

/// A connection plus a private schema holding `items(id, name, tags, meta)`
struct Fixture {
    db: PostgresDatabase,
    schema: String,
}

impl Fixture {
    async fn new() -> Option<Self> {
        let config = live_config();
        let db = match PostgresDatabase::connect(&config).await {
            Ok((db, _lost)) => db,
            Err(e) => {
                eprintln!(
                    "Skipping test: database not available at {}:{} - {}",
                    config.host, config.port, e
                );
                return None;
            }
        };
        let schema = format!("pgnav_test_{}", uuid::Uuid::new_v4().simple());
        let s = &schema;
        // one statement per call: queries go through the extended protocol
        let setup = [
            format!("CREATE SCHEMA {s}"),
            format!(
                "CREATE TABLE {s}.items (id integer PRIMARY KEY, name text, tags text[], meta jsonb)"
            ),
            format!(
                "INSERT INTO {s}.items \
                 SELECT i, 'item' || i, ARRAY['t' || (i % 3)], jsonb_build_object('n', i) \
                 FROM generate_series(1, 25) AS i"
            ),
            format!("INSERT INTO {s}.items VALUES (26, NULL, NULL, NULL)"),
            format!(
                "CREATE VIEW {s}.named AS SELECT id, name FROM {s}.items WHERE name IS NOT NULL"
            ),
            format!(
                "CREATE FUNCTION {s}.double_it(x integer) RETURNS integer \
                 LANGUAGE sql AS 'SELECT x * 2'"
            ),
        ];
        for statement in &setup {
            if let Err(e) = db.execute_query(statement).await {
                eprintln!("Skipping test: fixture setup failed - {}", e);
                return None;
            }
        }
        Some(Self { db, schema })
    }

    async fn drop(self) {
        let _ = self
            .db
            .execute_query(&format!("DROP SCHEMA {} CASCADE", self.schema))
            .await;
    }

    fn page(&self, offset: usize, limit: usize) -> PageRequest {
        PageRequest::new(&self.schema, "items", offset, limit)
    }
}

#[tokio::test]
async fn test_execute_simple_query() {
    let Some(fx) = Fixture::new().await else {
        return;
    };
    let results = fx
        .db
        .execute_query("SELECT 1 AS num, 'hello' AS msg")
        .await
        .unwrap();
    assert_eq!(results.columns[0].name, "num");
    assert_eq!(results.columns[1].name, "msg");
    assert_eq!(results.rows.len(), 1);
    assert!(matches!(results.rows[0].values[0], CellValue::Integer(1)));
    match &results.rows[0].values[1] {
        CellValue::Text(s) => assert_eq!(s, "hello"),
        other => panic!("expected Text, got {:?}", other),
    }
    fx.drop().await;
}

#[tokio::test]
async fn test_invalid_query_reports_server_message() {
    let Some(fx) = Fixture::new().await else {
        return;
    };
    match fx.db.execute_query("SELECT * FROM nonexistent_table").await {
        Err(DbError::QueryFailed(message)) => assert!(message.contains("nonexistent_table")),
        other => panic!("expected QueryFailed, got {:?}", other),
    }
    fx.drop().await;
}

#[tokio::test]
async fn test_connection_failure() {
    let config = ConnectionConfig {
        port: 1,
        ..live_config()
    };
    let result = PostgresDatabase::connect(&config).await;
    assert!(matches!(result, Err(DbError::ConnectionFailed(_))));
}

#[tokio::test]
async fn test_catalog_listing() {
    let Some(fx) = Fixture::new().await else {
        return;
    };
    let schemas = fx.db.list_schemas().await.unwrap();
    assert!(schemas.contains(&fx.schema));

    let tables = fx.db.list_objects(&fx.schema, ObjectKind::Table).await.unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].name, "items");
    let views = fx.db.list_objects(&fx.schema, ObjectKind::View).await.unwrap();
    assert_eq!(views[0].name, "named");
    let functions = fx
        .db
        .list_objects(&fx.schema, ObjectKind::Function)
        .await
        .unwrap();
    assert_eq!(functions[0].name, "double_it");

    let columns = fx.db.list_columns(&fx.schema, "items").await.unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "tags", "meta"]);
    assert!(columns[0].is_primary_key);
    assert!(!columns[0].nullable);

    let indexes = fx.db.list_indexes(&fx.schema, "items").await.unwrap();
    assert_eq!(indexes.len(), 1);
    fx.drop().await;
}

#[tokio::test]
async fn test_pages_carry_total_and_offset() {
    let Some(fx) = Fixture::new().await else {
        return;
    };
    let mut request = fx.page(10, 10);
    request.sort = Some(SortSpec {
        column: "id".into(),
        direction: SortDirection::Asc,
        nulls_first: false,
    });
    let page = fx.db.load_page(&request).await.unwrap();
    assert_eq!(page.total_rows, 26);
    assert_eq!(page.offset, 10);
    assert_eq!(page.rows.len(), 10);
    assert!(matches!(page.rows[0].values[0], CellValue::Integer(11)));
    fx.drop().await;
}

#[tokio::test]
async fn test_descending_sort_with_nulls_first() {
    let Some(fx) = Fixture::new().await else {
        return;
    };
    let mut request = fx.page(0, 3);
    request.sort = Some(SortSpec {
        column: "name".into(),
        direction: SortDirection::Desc,
        nulls_first: true,
    });
    let page = fx.db.load_page(&request).await.unwrap();
    assert!(page.rows[0].values[1].is_null());
    fx.drop().await;
}

#[tokio::test]
async fn test_filtered_page_binds_parameters() {
    let Some(fx) = Fixture::new().await else {
        return;
    };
    let filter = Filter::new(
        &fx.schema,
        "items",
        FilterGroup::default()
            .with_condition(FilterCondition::new("id", Operator::Gt, Some(FilterValue::Int(20))))
            .with_condition(FilterCondition::new("name", Operator::IsNotNull, None)),
    );
    let mut request = fx.page(0, 100);
    request.filter = Some(filter.compile(1));
    let page = fx.db.load_page(&request).await.unwrap();
    assert_eq!(page.total_rows, 5);
    assert_eq!(page.rows.len(), 5);
    fx.drop().await;
}

#[tokio::test]
async fn test_search_matches_text() {
    let Some(fx) = Fixture::new().await else {
        return;
    };
    let request = SearchRequest {
        schema: fx.schema.clone(),
        table: "items".into(),
        columns: vec!["name".into()],
        needle: "ITEM2".into(),
        limit: 100,
    };
    let page = fx.db.search_table(&request).await.unwrap();
    // item2, item20..item25
    assert_eq!(page.rows.len(), 7);
    fx.drop().await;
}

#[tokio::test]
async fn test_json_and_array_values() {
    let Some(fx) = Fixture::new().await else {
        return;
    };
    let results = fx
        .db
        .execute_query(&format!(
            "SELECT tags, meta FROM {}.items WHERE id = 1",
            fx.schema
        ))
        .await
        .unwrap();
    assert!(matches!(results.rows[0].values[0], CellValue::Array(_)));
    match &results.rows[0].values[1] {
        CellValue::Json(v) => assert_eq!(v["n"], 1),
        other => panic!("expected Json, got {:?}", other),
    }
    fx.drop().await;
}

#[tokio::test]
async fn test_function_definition() {
    let Some(fx) = Fixture::new().await else {
        return;
    };
    let mut target = ObjectRef::new(ObjectKind::Function, &fx.schema, "double_it");
    target.arguments = Some("x integer".into());
    let definition = fx.db.object_definition(&target).await.unwrap();
    assert!(definition.contains("double_it"));
    assert!(definition.contains("x * 2"));
    fx.drop().await;
}

#[tokio::test]
async fn test_cancelling_a_session_spares_other_work() {
    let Some(fx) = Fixture::new().await else {
        return;
    };
    let busy = fx.db.open_session().await.unwrap();
    let doomed = fx.db.open_session().await.unwrap();
    let (busy_result, doomed_result, shared_result, _) = tokio::join!(
        busy.execute_query("SELECT pg_sleep(1)"),
        doomed.execute_query("SELECT pg_sleep(10)"),
        fx.db.execute_query("SELECT pg_sleep(1), 1 AS done"),
        async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            doomed.cancel().await.unwrap();
        }
    );
    assert!(busy_result.is_ok());
    assert!(shared_result.is_ok());
    match doomed_result {
        Err(DbError::QueryFailed(message)) => assert!(message.contains("canceling statement")),
        other => panic!("expected the cancelled query to fail, got {:?}", other),
    }
    fx.drop().await;
}

#[tokio::test]
async fn test_filters_on_enum_and_inet_columns() {
    let Some(fx) = Fixture::new().await else {
        return;
    };
    let s = &fx.schema;
    for statement in [
        format!("CREATE TYPE {s}.mood AS ENUM ('sad', 'happy')"),
        format!("CREATE TABLE {s}.visits (id integer PRIMARY KEY, m {s}.mood, addr inet)"),
        format!(
            "INSERT INTO {s}.visits VALUES \
             (1, 'happy', '10.0.0.1'), (2, 'sad', '10.0.0.2'), (3, 'happy', '10.0.0.3')"
        ),
    ] {
        fx.db.execute_query(&statement).await.unwrap();
    }

    let page_for = |condition: FilterCondition| {
        let filter = Filter::new(s, "visits", FilterGroup::default().with_condition(condition));
        let mut request = PageRequest::new(s, "visits", 0, 100);
        request.filter = Some(filter.compile(1));
        request
    };

    let happy = page_for(FilterCondition::new(
        "m",
        Operator::Eq,
        Some(FilterValue::Text("happy".into())),
    ));
    assert_eq!(fx.db.load_page(&happy).await.unwrap().total_rows, 2);

    let addr = page_for(FilterCondition::new(
        "addr",
        Operator::Eq,
        Some(FilterValue::Text("10.0.0.2".into())),
    ));
    let page = fx.db.load_page(&addr).await.unwrap();
    assert_eq!(page.total_rows, 1);
    assert!(matches!(page.rows[0].values[0], CellValue::Integer(2)));

    let listed = page_for(FilterCondition::new(
        "addr",
        Operator::In,
        Some(FilterValue::List(vec!["10.0.0.1".into(), "10.0.0.3".into()])),
    ));
    assert_eq!(fx.db.load_page(&listed).await.unwrap().total_rows, 2);
    fx.drop().await;
}

/// Page through `table` unsorted and return the first column of every row
async fn page_through(fx: &Fixture, table: &str, page_size: usize) -> Vec<i64> {
    let mut seen = Vec::new();
    loop {
        let request = PageRequest::new(&fx.schema, table, seen.len(), page_size);
        let page = fx.db.load_page(&request).await.unwrap();
        if page.rows.is_empty() {
            break;
        }
        for row in &page.rows {
            match row.values[0] {
                CellValue::Integer(n) => seen.push(n),
                ref other => panic!("expected an integer, got {:?}", other),
            }
        }
    }
    seen
}

#[tokio::test]
async fn test_unsorted_paging_has_no_gaps_or_repeats() {
    let Some(fx) = Fixture::new().await else {
        return;
    };
    let by_primary_key = page_through(&fx, "items", 5).await;
    assert_eq!(by_primary_key, (1..=26).collect::<Vec<i64>>());

    fx.db
        .execute_query(&format!(
            "CREATE TABLE {}.nokey AS SELECT n::bigint AS n FROM generate_series(1, 40) AS n",
            fx.schema
        ))
        .await
        .unwrap();
    let mut without_key = page_through(&fx, "nokey", 7).await;
    without_key.sort_unstable();
    assert_eq!(without_key, (1..=40).collect::<Vec<i64>>());

    let mut from_view = page_through(&fx, "named", 4).await;
    from_view.sort_unstable();
    assert_eq!(from_view, (1..=25).collect::<Vec<i64>>());
    fx.drop().await;
}
