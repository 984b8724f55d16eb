//! Wildcard expansion through the full analyzer: which columns a
//! `SELECT *` produces for each query shape.

use std::sync::Arc;
use std::time::Duration;

use flowsql::flowsql::sql::ast::{
    AliasedRelation, BinaryOperator, Expr, Join, JoinKind, Query, Relation,
    ResultMaterialization, SelectItem,
};
use flowsql::{
    Analyzer, Column, DataSource, DataType, Format, FormatInfo, KeyFormat, MetaStore, Schema,
    SinkProperties, SinkSpec, Topic, ValueFormat, WindowInfo, WindowType,
};

fn source(name: &str, windowed: bool) -> DataSource {
    let key_format = if windowed {
        KeyFormat::windowed(
            FormatInfo::of(Format::Kafka),
            WindowInfo {
                window_type: WindowType::Tumbling,
                size: Some(Duration::from_secs(60)),
            },
        )
    } else {
        KeyFormat::non_windowed(FormatInfo::of(Format::Kafka))
    };
    DataSource::new(
        name,
        Schema::new(vec![
            Column::key("ID", DataType::Bigint),
            Column::value("F0", DataType::String),
            Column::value("F1", DataType::Float),
        ]),
        Topic::new(
            name.to_lowercase(),
            key_format,
            ValueFormat::of(FormatInfo::of(Format::Json)),
        ),
    )
}

fn analyzer_over(sources: Vec<DataSource>) -> Analyzer {
    let mut metastore = MetaStore::new();
    for s in sources {
        metastore.register_source(s);
    }
    let metastore = Arc::new(metastore);
    Analyzer::new(metastore.clone(), metastore, "app-")
}

fn star_query(from: Relation, qualifier: Option<&str>) -> Query {
    Query {
        select_items: vec![SelectItem::AllColumns {
            source: qualifier.map(str::to_string),
        }],
        from,
        where_clause: None,
        group_by: Vec::new(),
        partition_by: None,
        window: None,
        having: None,
        limit: None,
        result_materialization: ResultMaterialization::Changes,
        pull_query: false,
    }
}

fn single_source(name: &str, alias: &str) -> Relation {
    Relation::Source(AliasedRelation {
        source_name: name.to_string(),
        alias: alias.to_string(),
    })
}

fn orders_customers_join() -> Relation {
    Relation::Join(Join {
        kind: JoinKind::Inner,
        left: AliasedRelation {
            source_name: "ORDERS".to_string(),
            alias: "O".to_string(),
        },
        right: AliasedRelation {
            source_name: "CUSTOMERS".to_string(),
            alias: "C".to_string(),
        },
        criteria: Expr::BinaryOp {
            left: Box::new(Expr::qualified_column("O", "ID")),
            op: BinaryOperator::Equal,
            right: Box::new(Expr::qualified_column("C", "ID")),
        },
        within: None,
    })
}

#[test]
fn test_persistent_non_join_expands_value_columns_only() {
    let query = star_query(single_source("ORDERS", "O"), None);
    let sink = SinkSpec::create("OUT", SinkProperties::default());

    let analysis = analyzer_over(vec![source("ORDERS", false)])
        .analyze(&query, Some(&sink))
        .unwrap();
    assert_eq!(analysis.select_column_names(), vec!["F0", "F1"]);
}

#[test]
fn test_transient_expands_full_schema_system_columns_first() {
    let query = star_query(single_source("ORDERS", "O"), None);

    let analysis = analyzer_over(vec![source("ORDERS", false)])
        .analyze(&query, None)
        .unwrap();
    assert_eq!(
        analysis.select_column_names(),
        vec!["ROWTIME", "ID", "F0", "F1"]
    );
}

#[test]
fn test_windowed_source_expands_window_bounds() {
    let query = star_query(single_source("ORDERS", "O"), None);

    let analysis = analyzer_over(vec![source("ORDERS", true)])
        .analyze(&query, None)
        .unwrap();
    assert_eq!(
        analysis.select_column_names(),
        vec!["ROWTIME", "ID", "WINDOWSTART", "WINDOWEND", "F0", "F1"]
    );
}

#[test]
fn test_pull_query_expansion_skips_meta_columns() {
    let mut query = star_query(single_source("ORDERS", "O"), None);
    query.pull_query = true;
    query.result_materialization = ResultMaterialization::Final;

    let analysis = analyzer_over(vec![source("ORDERS", false)])
        .analyze(&query, None)
        .unwrap();
    // key columns stay; only ROWTIME is suppressed
    assert_eq!(analysis.select_column_names(), vec!["ID", "F0", "F1"]);
}

#[test]
fn test_join_expansion_prefixes_with_alias() {
    let query = star_query(orders_customers_join(), None);
    let sink = SinkSpec::create("OUT", SinkProperties::default());

    let analysis = analyzer_over(vec![source("ORDERS", false), source("CUSTOMERS", false)])
        .analyze(&query, Some(&sink))
        .unwrap();
    assert_eq!(
        analysis.select_column_names(),
        vec![
            "O_ROWTIME", "O_ID", "O_F0", "O_F1", "C_ROWTIME", "C_ID", "C_F0", "C_F1",
        ]
    );
}

#[test]
fn test_qualified_wildcard_expands_one_side_of_join() {
    let query = star_query(orders_customers_join(), Some("C"));

    let analysis = analyzer_over(vec![source("ORDERS", false), source("CUSTOMERS", false)])
        .analyze(&query, None)
        .unwrap();
    assert_eq!(
        analysis.select_column_names(),
        vec!["C_ROWTIME", "C_ID", "C_F0", "C_F1"]
    );
}

#[test]
fn test_expanded_items_reference_their_source() {
    let query = star_query(orders_customers_join(), Some("O"));

    let analysis = analyzer_over(vec![source("ORDERS", false), source("CUSTOMERS", false)])
        .analyze(&query, None)
        .unwrap();
    let first = &analysis.select_items[0];
    assert_eq!(first.alias, "O_ROWTIME");
    assert_eq!(first.expression, Expr::qualified_column("O", "ROWTIME"));
}

#[test]
fn test_wildcard_mixes_with_explicit_items() {
    let mut query = star_query(single_source("ORDERS", "O"), None);
    query.select_items.push(SelectItem::SingleColumn {
        expr: Expr::column("F1"),
        alias: "AMOUNT_AGAIN".to_string(),
    });
    let sink = SinkSpec::create("OUT", SinkProperties::default());

    let analysis = analyzer_over(vec![source("ORDERS", false)])
        .analyze(&query, Some(&sink))
        .unwrap();
    assert_eq!(
        analysis.select_column_names(),
        vec!["F0", "F1", "AMOUNT_AGAIN"]
    );
}
