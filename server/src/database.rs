//! SQLite access to the SNBT dump.
//!
//! The dump is a single denormalized table, `snbt_dump`, one row per
//! registrant: student identity columns plus the university (`ptn`,
//! `ptn_code`), study program (`prodi`, `prodi_code`) and the `passed` /
//! `bidik_misi` flags. Everything here is read-only aggregation over it.

use std::collections::HashSet;

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::models::{Passer, Program, Stats, StudentRow};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UniversityRow {
    pub code: String,
    pub name: String,
    pub passers: i64,
    pub kip_users: i64,
}

pub async fn init_db(database_url: &str) -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(4)
        .connect(database_url)
        .await
        .expect("Database misconfigured!")
}

/// Codes of the five universities with the most rows in the dump.
pub async fn top_five_codes(db: &SqlitePool) -> Result<HashSet<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT ptn_code
        FROM snbt_dump
        WHERE ptn IS NOT NULL
        GROUP BY ptn_code
        ORDER BY COUNT(*) DESC
        LIMIT 5
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(|(code,)| code).collect())
}

/// Per-university aggregates, most passers first. `name_filter` is a
/// substring match on the university name.
pub async fn university_aggregates(
    db: &SqlitePool,
    name_filter: Option<&str>,
) -> Result<Vec<UniversityRow>, sqlx::Error> {
    let pattern = name_filter
        .map(|name| format!("%{name}%"))
        .unwrap_or_else(|| "%".to_string());

    sqlx::query_as(
        r#"
        SELECT
            ptn_code AS code,
            ptn AS name,
            COUNT(*) AS passers,
            COALESCE(SUM(CASE WHEN bidik_misi = 1 THEN 1 ELSE 0 END), 0) AS kip_users
        FROM snbt_dump
        WHERE ptn IS NOT NULL
          AND ptn LIKE ?
        GROUP BY ptn_code, ptn
        ORDER BY passers DESC
        "#,
    )
    .bind(pattern)
    .fetch_all(db)
    .await
}

pub async fn university_by_code(
    db: &SqlitePool,
    ptn_code: &str,
) -> Result<Option<UniversityRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT
            ptn_code AS code,
            ptn AS name,
            COUNT(*) AS passers,
            COALESCE(SUM(CASE WHEN bidik_misi = 1 THEN 1 ELSE 0 END), 0) AS kip_users
        FROM snbt_dump
        WHERE ptn_code = ? AND ptn IS NOT NULL
        GROUP BY ptn_code, ptn
        "#,
    )
    .bind(ptn_code)
    .fetch_optional(db)
    .await
}

/// Per-program aggregates within one university, with a top-five-by-passers
/// flag ranked inside that university.
pub async fn programs(db: &SqlitePool, ptn_code: &str) -> Result<Vec<Program>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT
            prodi_code AS code,
            prodi AS name,
            COUNT(DISTINCT id) AS passers,
            COALESCE(SUM(CASE WHEN bidik_misi = 1 THEN 1 ELSE 0 END), 0) AS kip,
            CASE WHEN RANK() OVER (ORDER BY COUNT(DISTINCT id) DESC) <= 5
                 THEN 1 ELSE 0 END AS is_top_five
        FROM snbt_dump
        WHERE ptn_code = ?
        GROUP BY prodi_code, prodi
        "#,
    )
    .bind(ptn_code)
    .fetch_all(db)
    .await
}

pub async fn passers_page(
    db: &SqlitePool,
    ptn_code: &str,
    program_code: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Passer>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT name, utbk_no AS utbk_number, prodi AS program, id
        FROM snbt_dump
        WHERE ptn_code = ? AND prodi_code = ? AND passed = 1
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(ptn_code)
    .bind(program_code)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

pub async fn passers_total(
    db: &SqlitePool,
    ptn_code: &str,
    program_code: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM snbt_dump
        WHERE ptn_code = ? AND prodi_code = ? AND passed = 1
        "#,
    )
    .bind(ptn_code)
    .bind(program_code)
    .fetch_one(db)
    .await
}

pub async fn stats(db: &SqlitePool) -> Result<Stats, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT
            COUNT(*) AS total_registrants,
            COALESCE(SUM(CASE WHEN passed = 1 THEN 1 ELSE 0 END), 0) AS total_passers,
            COALESCE(SUM(CASE WHEN passed = 0 THEN 1 ELSE 0 END), 0) AS total_failures,
            COALESCE(SUM(CASE WHEN bidik_misi = 1 THEN 1 ELSE 0 END), 0) AS kip_participant
        FROM snbt_dump
        "#,
    )
    .fetch_one(db)
    .await
}

/// Substring search on student name.
pub async fn search_students(db: &SqlitePool, query: &str) -> Result<Vec<StudentRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT
            name,
            utbk_no AS utbk_number,
            date_of_birth AS dob,
            passed,
            bidik_misi AS kip,
            ptn,
            prodi
        FROM snbt_dump
        WHERE name LIKE ?
        "#,
    )
    .bind(format!("%{query}%"))
    .fetch_all(db)
    .await
}

/// Every distinct university name; feeds the cache warmer.
pub async fn distinct_university_names(db: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT DISTINCT ptn
        FROM snbt_dump
        WHERE ptn IS NOT NULL
        "#,
    )
    .fetch_all(db)
    .await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) async fn memory_db() -> SqlitePool {
        // One connection, or every connection gets its own empty :memory: db.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE snbt_dump (
                id TEXT,
                name TEXT,
                utbk_no TEXT,
                date_of_birth TEXT,
                ptn_code TEXT,
                ptn TEXT,
                prodi_code TEXT,
                prodi TEXT,
                passed INTEGER,
                bidik_misi INTEGER
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        pool
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn insert(
        pool: &SqlitePool,
        id: &str,
        name: &str,
        ptn_code: &str,
        ptn: &str,
        prodi_code: &str,
        prodi: &str,
        passed: i64,
        kip: i64,
    ) {
        sqlx::query(
            r#"
            INSERT INTO snbt_dump
                (id, name, utbk_no, date_of_birth, ptn_code, ptn,
                 prodi_code, prodi, passed, bidik_misi)
            VALUES (?, ?, ?, '2006-01-01', ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(format!("utbk-{id}"))
        .bind(ptn_code)
        .bind(ptn)
        .bind(prodi_code)
        .bind(prodi)
        .bind(passed)
        .bind(kip)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_university_aggregates_count_and_order() {
        let pool = memory_db().await;
        for i in 0..3 {
            insert(&pool, &format!("a{i}"), "x", "A", "Alpha", "P1", "Math", 1, 1).await;
        }
        insert(&pool, "b0", "y", "B", "Beta", "P1", "Math", 1, 0).await;

        let rows = university_aggregates(&pool, None).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].code, "A");
        assert_eq!(rows[0].passers, 3);
        assert_eq!(rows[0].kip_users, 3);
        assert_eq!(rows[1].code, "B");
        assert_eq!(rows[1].kip_users, 0);
    }

    #[tokio::test]
    async fn test_university_aggregates_name_filter() {
        let pool = memory_db().await;
        insert(&pool, "a", "x", "A", "Universitas Alpha", "P1", "Math", 1, 0).await;
        insert(&pool, "b", "y", "B", "Institut Beta", "P1", "Math", 1, 0).await;

        let rows = university_aggregates(&pool, Some("Alpha")).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Universitas Alpha");
    }

    #[tokio::test]
    async fn test_top_five_codes() {
        let pool = memory_db().await;
        for (code, count) in [("U1", 6), ("U2", 5), ("U3", 4), ("U4", 3), ("U5", 2), ("U6", 1)] {
            for i in 0..count {
                let id = format!("{code}-{i}");
                insert(&pool, &id, "s", code, code, "P1", "Math", 1, 0).await;
            }
        }

        let top = top_five_codes(&pool).await.unwrap();

        assert_eq!(top.len(), 5);
        assert!(top.contains("U1") && top.contains("U5"));
        assert!(!top.contains("U6"));
    }

    #[tokio::test]
    async fn test_university_by_code_missing() {
        let pool = memory_db().await;
        assert!(university_by_code(&pool, "ZZ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_programs_rank_flag() {
        let pool = memory_db().await;
        for (prodi_code, count) in [("P1", 6), ("P2", 5), ("P3", 4), ("P4", 3), ("P5", 2), ("P6", 1)]
        {
            for i in 0..count {
                let id = format!("{prodi_code}-{i}");
                insert(&pool, &id, "s", "A", "Alpha", prodi_code, prodi_code, 1, 0).await;
            }
        }

        let mut programs = programs(&pool, "A").await.unwrap();
        programs.sort_by(|a, b| b.passers.cmp(&a.passers));

        assert_eq!(programs.len(), 6);
        assert!(programs[..5].iter().all(|p| p.is_top_five == 1));
        assert_eq!(programs[5].is_top_five, 0);
        assert_eq!(programs[0].passers, 6);
    }

    #[tokio::test]
    async fn test_passers_paging_and_total() {
        let pool = memory_db().await;
        for i in 0..5 {
            let id = format!("p{i}");
            insert(&pool, &id, &format!("Student {i}"), "A", "Alpha", "P1", "Math", 1, 0).await;
        }
        // Failed rows never show up in the passers list.
        insert(&pool, "f0", "Failed", "A", "Alpha", "P1", "Math", 0, 0).await;

        let page = passers_page(&pool, "A", "P1", 2, 2).await.unwrap();
        let total = passers_total(&pool, "A", "P1").await.unwrap();

        assert_eq!(page.len(), 2);
        assert_eq!(total, 5);
        assert_eq!(page[0].program, "Math");
    }

    #[tokio::test]
    async fn test_stats_totals() {
        let pool = memory_db().await;
        insert(&pool, "1", "a", "A", "Alpha", "P1", "Math", 1, 1).await;
        insert(&pool, "2", "b", "A", "Alpha", "P1", "Math", 0, 0).await;
        insert(&pool, "3", "c", "B", "Beta", "P2", "Law", 1, 0).await;

        let stats = stats(&pool).await.unwrap();

        assert_eq!(stats.total_registrants, 3);
        assert_eq!(stats.total_passers, 2);
        assert_eq!(stats.total_failures, 1);
        assert_eq!(stats.kip_participant, 1);
    }

    #[tokio::test]
    async fn test_search_students_substring() {
        let pool = memory_db().await;
        insert(&pool, "1", "Budi Santoso", "A", "Alpha", "P1", "Math", 1, 1).await;
        insert(&pool, "2", "Siti Rahma", "A", "Alpha", "P1", "Math", 0, 0).await;

        let rows = search_students(&pool, "udi").await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Budi Santoso");
        assert_eq!(rows[0].passed, 1);
        assert_eq!(rows[0].kip, 1);
        assert_eq!(rows[0].dob.as_deref(), Some("2006-01-01"));
    }

    #[tokio::test]
    async fn test_distinct_university_names() {
        let pool = memory_db().await;
        insert(&pool, "1", "a", "A", "Alpha", "P1", "Math", 1, 0).await;
        insert(&pool, "2", "b", "A", "Alpha", "P2", "Law", 1, 0).await;
        insert(&pool, "3", "c", "B", "Beta", "P1", "Math", 1, 0).await;

        let mut names = distinct_university_names(&pool).await.unwrap();
        names.sort();

        assert_eq!(names, vec!["Alpha", "Beta"]);
    }
}
