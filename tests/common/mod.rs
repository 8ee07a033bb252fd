#![allow(dead_code)]

use opentip_checker::{
    table::{write_table, CellValue, Table},
    Config,
};
use std::path::{Path, PathBuf};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_PATH: &str = "/api/v1/search/domain";
pub const API_KEY: &str = "test-api-key";

/// Configuration pointed at a mock server, with pacing and progress output off.
pub fn test_config(server: &MockServer) -> Config {
    Config {
        api_endpoint: format!("{}{}", server.uri(), API_PATH),
        requests_per_second: 0.0,
        show_progress: false,
        ..Config::default()
    }
}

/// Mounts a JSON report for one domain, answered only for requests carrying
/// the test API key.
pub async fn mock_domain_report(server: &MockServer, domain: &str, report: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("request", domain))
        .and(header("x-api-key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(report))
        .mount(server)
        .await;
}

/// Mounts a fixed response for one domain.
pub async fn mock_domain_response(server: &MockServer, domain: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("request", domain))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Writes a one-sheet input table with the given headers and rows.
pub fn write_input(dir: &Path, name: &str, headers: &[&str], rows: Vec<Vec<CellValue>>) -> PathBuf {
    let mut table = Table::new(headers.iter().map(|h| h.to_string()).collect());
    for row in rows {
        table.push_row(row);
    }

    let path = dir.join(name);
    write_table(&path, &table).expect("Failed to write input table");
    path
}

pub fn column_values(table: &Table, name: &str) -> Vec<String> {
    let index = table
        .column_index(name)
        .unwrap_or_else(|| panic!("missing column {}", name));
    table.column(index).map(|cell| cell.to_string()).collect()
}
