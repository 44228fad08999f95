use std::io::Write;

use serde_json::json;
use tabquery::data::correlation::compute_correlation;
use tabquery::data::filter::{apply_filters, Predicate};
use tabquery::data::loader::{load_csv, load_file};
use tabquery::data::model::Table;
use tabquery::data::paginate::paginate;
use tabquery::data::select::select_columns;
use tabquery::data::sort::apply_sort;
use tabquery::data::trend::{compute_trend, Aggregation, Frequency, TrendPoint};
use tabquery::params::{QueryParams, RowsParams};
use tabquery::{DatasetService, Endpoint, QueryError, Settings};
use tempfile::NamedTempFile;

const SALES: &str = "date,amount,country\n2024-01-01,10,CO\n2024-01-02,5,PE\n2024-01-03,30,CO\n";

fn sales_file() -> NamedTempFile {
    let mut tmp = NamedTempFile::new().unwrap();
    write!(tmp, "{SALES}").unwrap();
    tmp
}

#[test]
fn trend_scenario_through_service() {
    let tmp = sales_file();
    let svc = DatasetService::default();
    let resp = svc.handle_file(
        Endpoint::Trend,
        3,
        tmp.path(),
        "date=date&value=amount&freq=D&agg=sum",
    );
    assert!(resp.is_success());
    assert_eq!(
        resp.body,
        json!({
            "id": 3,
            "trend": [
                {"date": "2024-01-01", "amount": 10.0},
                {"date": "2024-01-02", "amount": 5.0},
                {"date": "2024-01-03", "amount": 30.0},
            ]
        })
    );
}

#[test]
fn rows_scenario_through_service() {
    let tmp = sales_file();
    let resp = DatasetService::default().handle_file(
        Endpoint::Rows,
        1,
        tmp.path(),
        "f=country,eq,CO&sort=-amount&page=1&page_size=2",
    );
    assert_eq!(
        resp.body,
        json!({
            "page": 1,
            "page_size": 2,
            "total": 2,
            "pages": 1,
            "has_next": false,
            "has_prev": false,
            "items": [
                {"date": "2024-01-03", "amount": 30, "country": "CO"},
                {"date": "2024-01-01", "amount": 10, "country": "CO"},
            ]
        })
    );
}

#[test]
fn constant_column_correlation_is_null() {
    let resp = DatasetService::default().handle(
        Endpoint::Correlation,
        9,
        b"k,label\n4,a\n4,b\n4,c\n",
        "",
    );
    assert_eq!(resp.body, json!({"id": 9, "correlation": {"k": {"k": null}}}));
}

#[test]
fn summary_and_preview() {
    let svc = DatasetService::default();
    let summary = svc.handle(Endpoint::Summary, 2, SALES.as_bytes(), "");
    assert_eq!(summary.body["summary"]["amount"]["count"], json!(3.0));
    assert_eq!(summary.body["summary"]["amount"]["mean"], json!(15.0));
    assert!(summary.body["summary"].get("country").is_none());

    let preview = svc.handle(Endpoint::Preview, 2, SALES.as_bytes(), "");
    assert_eq!(preview.body["rows"].as_array().unwrap().len(), 3);
    assert_eq!(preview.body["rows"][1]["country"], "PE");
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gone.csv");
    assert_eq!(
        load_file(&path, None).unwrap_err(),
        QueryError::DataRead("File not found".into())
    );
    let resp = DatasetService::default().handle_file(Endpoint::Preview, 1, &path, "");
    assert_eq!(resp.status, 400);
    assert_eq!(resp.body["error"]["message"], "File not found");
}

#[test]
fn query_file_runs_filter_select_sort() {
    let tmp = sales_file();
    let q = QueryParams::parse("f=amount,gte,10&columns=amount,country&sort=amount");
    let params = RowsParams::from_query(&q, &Settings::default()).unwrap();
    let table = DatasetService::default()
        .query_file(tmp.path(), &params)
        .unwrap();
    assert_eq!(table.column_names(), ["amount", "country"]);
    assert_eq!(
        table.records(),
        vec![
            json!({"amount": 10, "country": "CO"}).as_object().unwrap().clone(),
            json!({"amount": 30, "country": "CO"}).as_object().unwrap().clone(),
        ]
    );
}

#[test]
fn selecting_nothing_keeps_columns() {
    let table = load_csv(SALES.as_bytes(), None).unwrap();
    let same = select_columns::<String>(&table, None).unwrap();
    assert_eq!(same.column_names(), table.column_names());
}

#[test]
fn filtering_then_paginating_is_deterministic() {
    let mut csv = String::from("id,group\n");
    for i in 0..25 {
        csv.push_str(&format!("{i},{}\n", if i % 3 == 0 { "a" } else { "b" }));
    }
    let table = load_csv(csv.as_bytes(), None).unwrap();
    let filtered = apply_filters(&table, &[Predicate::new("group", "in", "a|b")]).unwrap();
    let sorted = apply_sort(&filtered, Some("group")).unwrap();
    let records = sorted.records();

    let first = paginate(&records, 2, 5);
    let again = paginate(&apply_sort(&filtered, Some("group")).unwrap().records(), 2, 5);
    assert_eq!(first, again);
    assert_eq!(first.items, records[5..10]);
    // Ties on `group` keep ascending id order.
    assert_eq!(first.items[0]["id"], 15);
}

#[test]
fn correlation_is_symmetric_on_generated_data() {
    let mut csv = String::from("x,y,z\n");
    for i in 0..20 {
        let x = i as f64;
        csv.push_str(&format!("{x},{},{}\n", (x * 0.7).sin(), x * x - 3.0 * x));
    }
    let table = load_csv(csv.as_bytes(), None).unwrap();
    let m = compute_correlation::<&str>(&table, None).unwrap();
    for a in ["x", "y", "z"] {
        for b in ["x", "y", "z"] {
            assert_eq!(m.get(a, b), m.get(b, a));
        }
        assert_eq!(m.get(a, a), Some(1.0));
    }
}

#[test]
fn trend_ignores_row_order() {
    let rows = [
        "2024-01-01,4",
        "2024-01-15,6",
        "2024-02-03,1",
        "2024-01-02,2",
        "bogus,9",
        "2024-02-28,3",
    ];
    let build = |order: &[usize]| {
        let mut csv = String::from("d,v\n");
        for &i in order {
            csv.push_str(rows[i]);
            csv.push('\n');
        }
        load_csv(csv.as_bytes(), None).unwrap()
    };
    let a = build(&[0, 1, 2, 3, 4, 5]);
    let b = build(&[5, 3, 4, 1, 0, 2]);
    let monthly = |t: &Table| -> Vec<TrendPoint> {
        compute_trend(t, "d", "v", Frequency::Month, Aggregation::Sum)
            .unwrap()
            .collect()
    };
    assert_eq!(monthly(&a), monthly(&b));
    assert_eq!(monthly(&a).len(), 2);
}
