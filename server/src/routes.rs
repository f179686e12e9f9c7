//! Route handlers. Pagination and list assembly live here; SQL lives in
//! `database`, external enrichment in the `enrich` crate.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State as AxumState},
    Json,
};
use enrich::{normalize, HOUR_SECS};
use serde::Deserialize;

use crate::database::{
    passers_page, passers_total, programs, search_students, stats, top_five_codes,
    university_aggregates, university_by_code, UniversityRow,
};
use crate::error::AppError;
use crate::models::{Data, Meta, Paginated, Passer, Program, Stats, Student, University};
use crate::state::State;

const DEFAULT_PAGE_SIZE: u32 = 10;
const UNIVERSITIES_CACHE_KEY: &str = "universities:all";
const STUDENT_TTL_SECS: u64 = 6 * HOUR_SECS;

#[derive(Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<u32>,
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct StudentParams {
    pub q: Option<String>,
}

pub async fn root_handler() -> &'static str {
    "Hello World"
}

fn flag_top_five(rows: Vec<UniversityRow>, top_five: &HashSet<String>) -> Vec<University> {
    rows.into_iter()
        .map(|row| University {
            is_top_five: top_five.contains(&row.code) as i64,
            code: row.code,
            name: row.name,
            passers: row.passers,
            kip_users: row.kip_users,
            enrichment: Default::default(),
        })
        .collect()
}

/// Full aggregate list (no name filter), cached for an hour so repeat page
/// requests skip the GROUP BY over the whole dump. Enrichment happens per
/// page afterwards, so the cached list is stored unenriched.
async fn all_universities(state: &State) -> Result<Vec<University>, AppError> {
    if let Some(cached) = state
        .cache
        .get_json::<Vec<University>>(UNIVERSITIES_CACHE_KEY)
        .await
    {
        return Ok(cached);
    }

    let rows = university_aggregates(&state.db, None).await?;
    let top_five = top_five_codes(&state.db).await?;
    let list = flag_top_five(rows, &top_five);

    state
        .cache
        .set_json(UNIVERSITIES_CACHE_KEY, &list, HOUR_SECS)
        .await;

    Ok(list)
}

pub async fn universities_handler(
    AxumState(state): AxumState<Arc<State>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<University>>, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
    let name = params
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let list = match name {
        // Filtered lists bypass the list cache; the enrichment layer still
        // caches per name underneath.
        Some(name) => {
            let rows = university_aggregates(&state.db, Some(name)).await?;
            let top_five = top_five_codes(&state.db).await?;
            flag_top_five(rows, &top_five)
        }
        None => all_universities(&state).await?,
    };
    let total = list.len() as i64;

    let start = (page as u64 - 1).saturating_mul(page_size as u64) as usize;
    let mut data: Vec<University> = list
        .into_iter()
        .skip(start)
        .take(page_size as usize)
        .collect();

    // Enrich only the names on this page; duplicates share one lookup.
    let names: Vec<String> = data.iter().map(|u| u.name.clone()).collect();
    let enrichments = state.enricher.enrich(&names).await;
    for university in &mut data {
        if let Some(enrichment) = enrichments.get(&university.name) {
            university.enrichment = enrichment.clone();
        }
    }

    Ok(Json(Paginated {
        data,
        meta: Meta::new(page, page_size, total),
    }))
}

pub async fn university_handler(
    AxumState(state): AxumState<Arc<State>>,
    Path(ptn_code): Path<String>,
) -> Result<Json<Data<University>>, AppError> {
    let row = university_by_code(&state.db, &ptn_code)
        .await?
        .ok_or(AppError::NotFound)?;
    let top_five = top_five_codes(&state.db).await?;

    let mut university = University {
        is_top_five: top_five.contains(&row.code) as i64,
        code: row.code,
        name: row.name,
        passers: row.passers,
        kip_users: row.kip_users,
        enrichment: Default::default(),
    };
    university.enrichment = state.enricher.enrich_one(&university.name).await;

    Ok(Json(Data { data: university }))
}

pub async fn programs_handler(
    AxumState(state): AxumState<Arc<State>>,
    Path(ptn_code): Path<String>,
) -> Result<Json<Data<Vec<Program>>>, AppError> {
    let cache_key = format!("programs:{}", normalize(&ptn_code));
    if let Some(cached) = state.cache.get_json::<Vec<Program>>(&cache_key).await {
        return Ok(Json(Data { data: cached }));
    }

    let list = programs(&state.db, &ptn_code).await?;
    state.cache.set_json(&cache_key, &list, HOUR_SECS).await;

    Ok(Json(Data { data: list }))
}

pub async fn passers_handler(
    AxumState(state): AxumState<Arc<State>>,
    Path((ptn_code, program_code)): Path<(String, String)>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<Passer>>, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
    let offset = (page as i64 - 1) * page_size as i64;

    let data = passers_page(
        &state.db,
        &ptn_code,
        &program_code,
        page_size as i64,
        offset,
    )
    .await?;
    let total = passers_total(&state.db, &ptn_code, &program_code).await?;

    Ok(Json(Paginated {
        data,
        meta: Meta::new(page, page_size, total),
    }))
}

pub async fn stats_handler(
    AxumState(state): AxumState<Arc<State>>,
) -> Result<Json<Data<Stats>>, AppError> {
    Ok(Json(Data {
        data: stats(&state.db).await?,
    }))
}

pub async fn students_handler(
    AxumState(state): AxumState<Arc<State>>,
    Query(params): Query<StudentParams>,
) -> Result<Json<Data<Vec<Student>>>, AppError> {
    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::BadRequest("query parameter q is required".to_string()))?;

    let cache_key = format!("student_query:{}", query.to_lowercase());
    if let Some(cached) = state.cache.get_json::<Vec<Student>>(&cache_key).await {
        return Ok(Json(Data { data: cached }));
    }

    let students: Vec<Student> = search_students(&state.db, query)
        .await?
        .into_iter()
        .map(Student::from)
        .collect();
    state
        .cache
        .set_json(&cache_key, &students, STUDENT_TTL_SECS)
        .await;

    Ok(Json(Data { data: students }))
}
