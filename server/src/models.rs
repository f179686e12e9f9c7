//! Wire types for the REST API. All JSON keys are camelCase.

use enrich::Enrichment;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Aggregate row for one university, plus whatever the enrichment layer
/// knows about it. Cached lists round-trip through JSON, hence
/// `Deserialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct University {
    pub code: String,
    pub name: String,
    pub passers: i64,
    pub is_top_five: i64,
    pub kip_users: i64,
    #[serde(flatten)]
    pub enrichment: Enrichment,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub code: String,
    pub name: String,
    pub passers: i64,
    pub kip: i64,
    pub is_top_five: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Passer {
    pub name: String,
    pub utbk_number: String,
    pub program: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_registrants: i64,
    pub total_passers: i64,
    pub total_failures: i64,
    pub kip_participant: i64,
}

/// Raw student row; `passed`/`kip` are 0/1 integers in the dump.
#[derive(Debug, Clone, FromRow)]
pub struct StudentRow {
    pub name: String,
    pub utbk_number: String,
    pub dob: Option<String>,
    pub passed: i64,
    pub kip: i64,
    pub ptn: Option<String>,
    pub prodi: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub name: String,
    pub utbk_number: String,
    pub dob: Option<String>,
    pub passed: bool,
    pub kip: bool,
    pub ptn: Option<String>,
    pub prodi: Option<String>,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Self {
            name: row.name,
            utbk_number: row.utbk_number,
            dob: row.dob,
            passed: row.passed != 0,
            kip: row.kip != 0,
            ptn: row.ptn,
            prodi: row.prodi,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
    pub pages: i64,
}

impl Meta {
    pub fn new(page: u32, page_size: u32, total: i64) -> Self {
        let size = page_size.max(1) as i64;
        Self {
            page,
            page_size,
            total,
            pages: (total + size - 1) / size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: Meta,
}

#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}
