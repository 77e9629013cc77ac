//! Database operations for the repository

use crate::profile::CourtProfile;
use crate::store::error::DbError;
use crate::store::schema;
use crate::store::{
    CaseView, CauseListView, NewCase, TableCounts, TagCount, TaggableCase, normalize_bench_label,
    normalize_tag,
};
use chrono::{NaiveDate, Utc};
use libsql::{Connection, params};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Repository over a libsql connection
///
/// Upserts and their follow-up id lookups run under one write lock so that
/// concurrent workers sharing the connection never interleave them.
#[derive(Clone)]
pub struct Repository {
    conn: Connection,
    write_lock: Arc<Mutex<()>>,
}

impl Repository {
    /// Create a repository on an open connection, initializing the schema
    #[instrument(skip(conn))]
    pub async fn new(conn: Connection) -> Result<Self, DbError> {
        schema::initialize_schema(&conn).await?;

        Ok(Self {
            conn,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Open (or create) a local database file
    pub async fn new_from_path(path: &str) -> Result<Self, DbError> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DbError::Connection(format!("Failed to open database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| DbError::Connection(format!("Failed to connect to database: {}", e)))?;

        Self::new(conn).await
    }

    /// Insert the profile's court if absent and return its id
    #[instrument(skip(self, profile), fields(code = %profile.code))]
    pub async fn seed_court(&self, profile: &CourtProfile) -> Result<i64, DbError> {
        let _guard = self.write_lock.lock().await;

        self.conn
            .execute(
                "INSERT INTO courts (name, code, website) VALUES (?, ?, ?)
                 ON CONFLICT(code) DO NOTHING",
                params![
                    profile.name.clone(),
                    profile.code.clone(),
                    profile.website.clone()
                ],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to seed court: {}", e)))?;

        self.court_id(&profile.code)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("court {}", profile.code)))
    }

    /// Id of the court with `code`, if seeded
    pub async fn court_id(&self, code: &str) -> Result<Option<i64>, DbError> {
        self.query_optional_id("SELECT id FROM courts WHERE code = ?", params![code])
            .await
    }

    /// Get or create a bench by normalized label
    ///
    /// Judges are written on insert, and on an existing row only when a
    /// non-empty value is supplied.
    #[instrument(skip(self))]
    pub async fn get_or_create_bench(
        &self,
        court_id: i64,
        bench_label: &str,
        judges: Option<&str>,
    ) -> Result<i64, DbError> {
        let label = normalize_bench_label(bench_label);
        if label.is_empty() {
            return Err(DbError::Data("Bench label is empty".to_string()));
        }
        let judges = judges
            .map(str::trim)
            .filter(|j| !j.is_empty())
            .map(str::to_string);

        let _guard = self.write_lock.lock().await;

        self.conn
            .execute(
                "INSERT INTO benches (court_id, bench_number, judges) VALUES (?, ?, ?)
                 ON CONFLICT(court_id, bench_number) DO UPDATE SET
                 judges = COALESCE(excluded.judges, benches.judges)",
                params![court_id, label.clone(), judges],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to upsert bench: {}", e)))?;

        self.query_id(
            "SELECT id FROM benches WHERE court_id = ? AND bench_number = ?",
            params![court_id, label],
        )
        .await
    }

    /// Create a cause list or coalesce its URL and path into the existing row
    #[instrument(skip(self))]
    pub async fn create_or_update_cause_list(
        &self,
        court_id: i64,
        bench_id: i64,
        list_date: NaiveDate,
        list_type: &str,
        pdf_url: Option<&str>,
        pdf_path: Option<&str>,
    ) -> Result<i64, DbError> {
        let date = list_date.format(DATE_FORMAT).to_string();
        let list_type = list_type.trim().to_string();
        let pdf_url = non_empty(pdf_url);
        let pdf_path = non_empty(pdf_path);

        let _guard = self.write_lock.lock().await;

        self.conn
            .execute(
                "INSERT INTO cause_lists (court_id, bench_id, list_date, list_type, pdf_url, pdf_path, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(court_id, bench_id, list_date, list_type) DO UPDATE SET
                 pdf_url = COALESCE(excluded.pdf_url, cause_lists.pdf_url),
                 pdf_path = COALESCE(excluded.pdf_path, cause_lists.pdf_path)",
                params![
                    court_id,
                    bench_id,
                    date.clone(),
                    list_type.clone(),
                    pdf_url,
                    pdf_path,
                    Utc::now().timestamp()
                ],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to upsert cause list: {}", e)))?;

        self.query_id(
            "SELECT id FROM cause_lists
             WHERE court_id = ? AND bench_id = ? AND list_date = ? AND list_type = ?",
            params![court_id, bench_id, date, list_type],
        )
        .await
    }

    /// Insert a case unless its number is already listed; first write wins
    ///
    /// Tags are attached only when the row was newly inserted.
    #[instrument(skip(self, case), fields(case_number = %case.case_number))]
    pub async fn create_case(&self, cause_list_id: i64, case: &NewCase) -> Result<i64, DbError> {
        let case_number = case.case_number.trim().to_string();
        if case_number.is_empty() {
            return Err(DbError::Data("Case number is empty".to_string()));
        }

        let (case_id, inserted) = {
            let _guard = self.write_lock.lock().await;

            let inserted = self
                .conn
                .execute(
                    "INSERT INTO cases (cause_list_id, case_number, title, item_number, file_number,
                                        petitioner_adv, respondent_adv, created_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                     ON CONFLICT(cause_list_id, case_number) DO NOTHING",
                    params![
                        cause_list_id,
                        case_number.clone(),
                        case.title.clone(),
                        case.item_number.clone(),
                        case.file_number.clone(),
                        case.petitioner_adv.clone(),
                        case.respondent_adv.clone(),
                        Utc::now().timestamp()
                    ],
                )
                .await
                .map_err(|e| DbError::Query(format!("Failed to insert case: {}", e)))?;

            let case_id = self
                .query_id(
                    "SELECT id FROM cases WHERE cause_list_id = ? AND case_number = ?",
                    params![cause_list_id, case_number],
                )
                .await?;
            (case_id, inserted > 0)
        };

        if !inserted {
            debug!("Case already listed as {}", case_id);
            return Ok(case_id);
        }

        for tag in &case.tags {
            if let Err(e) = self.attach_tag(case_id, tag).await {
                warn!("Failed to attach tag {:?} to case {}: {}", tag, case_id, e);
            }
        }

        Ok(case_id)
    }

    /// Attach a tag by name, creating the tag if needed
    ///
    /// Returns whether a new pairing was created. Empty names are skipped.
    pub async fn attach_tag(&self, case_id: i64, name: &str) -> Result<bool, DbError> {
        let name = normalize_tag(name);
        if name.is_empty() {
            return Ok(false);
        }

        let _guard = self.write_lock.lock().await;

        self.conn
            .execute(
                "INSERT INTO tags (name) VALUES (?) ON CONFLICT(name) DO NOTHING",
                params![name.clone()],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to create tag: {}", e)))?;

        let tag_id = self
            .query_id("SELECT id FROM tags WHERE name = ?", params![name])
            .await?;

        let added = self
            .conn
            .execute(
                "INSERT INTO case_tags (case_id, tag_id) VALUES (?, ?)
                 ON CONFLICT(case_id, tag_id) DO NOTHING",
                params![case_id, tag_id],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to attach tag: {}", e)))?;

        Ok(added > 0)
    }

    /// Distinct list dates for a court, newest first
    ///
    /// An unknown court code yields an empty list.
    #[instrument(skip(self))]
    pub async fn get_available_dates(&self, court_code: &str) -> Result<Vec<NaiveDate>, DbError> {
        let mut rows = self
            .conn
            .query(
                "SELECT DISTINCT cl.list_date
                 FROM cause_lists cl
                 JOIN courts c ON c.id = cl.court_id
                 WHERE c.code = ?
                 ORDER BY cl.list_date DESC",
                params![court_code],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to get dates: {}", e)))?;

        let mut dates = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DbError::Data(format!("Failed to read dates: {}", e)))?
        {
            let raw: String = row
                .get(0)
                .map_err(|e| DbError::Data(format!("Failed to get list_date: {}", e)))?;
            let date = NaiveDate::parse_from_str(&raw, DATE_FORMAT)
                .map_err(|e| DbError::Data(format!("Invalid list_date {:?}: {}", raw, e)))?;
            dates.push(date);
        }

        Ok(dates)
    }

    /// Cause lists of a court on a date, benches ascending, each with its cases
    ///
    /// Cases are ordered by numeric item number, then case number.
    #[instrument(skip(self))]
    pub async fn get_cause_lists_by_date(
        &self,
        court_code: &str,
        list_date: NaiveDate,
    ) -> Result<Vec<CauseListView>, DbError> {
        let mut rows = self
            .conn
            .query(
                "SELECT cl.id, b.bench_number, b.judges, cl.list_date, cl.list_type, cl.pdf_url, cl.pdf_path
                 FROM cause_lists cl
                 JOIN benches b ON b.id = cl.bench_id
                 JOIN courts c ON c.id = cl.court_id
                 WHERE c.code = ? AND cl.list_date = ?
                 ORDER BY b.bench_number ASC, cl.list_type ASC, cl.id ASC",
                params![court_code, list_date.format(DATE_FORMAT).to_string()],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to get cause lists: {}", e)))?;

        let mut lists = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DbError::Data(format!("Failed to read cause lists: {}", e)))?
        {
            lists.push(CauseListView {
                id: row
                    .get(0)
                    .map_err(|e| DbError::Data(format!("Failed to get id: {}", e)))?,
                bench_label: row
                    .get(1)
                    .map_err(|e| DbError::Data(format!("Failed to get bench_number: {}", e)))?,
                judges: row
                    .get(2)
                    .map_err(|e| DbError::Data(format!("Failed to get judges: {}", e)))?,
                list_date: row
                    .get(3)
                    .map_err(|e| DbError::Data(format!("Failed to get list_date: {}", e)))?,
                list_type: row
                    .get(4)
                    .map_err(|e| DbError::Data(format!("Failed to get list_type: {}", e)))?,
                pdf_url: row
                    .get(5)
                    .map_err(|e| DbError::Data(format!("Failed to get pdf_url: {}", e)))?,
                pdf_path: row
                    .get(6)
                    .map_err(|e| DbError::Data(format!("Failed to get pdf_path: {}", e)))?,
                cases: Vec::new(),
            });
        }

        for list in &mut lists {
            list.cases = self.cases_of(list.id).await?;
        }

        Ok(lists)
    }

    async fn cases_of(&self, cause_list_id: i64) -> Result<Vec<CaseView>, DbError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, case_number, title, item_number, file_number, petitioner_adv, respondent_adv
                 FROM cases
                 WHERE cause_list_id = ?
                 ORDER BY item_number IS NULL, CAST(item_number AS INTEGER), case_number",
                params![cause_list_id],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to get cases: {}", e)))?;

        let mut cases = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DbError::Data(format!("Failed to read cases: {}", e)))?
        {
            cases.push(CaseView {
                id: row
                    .get(0)
                    .map_err(|e| DbError::Data(format!("Failed to get id: {}", e)))?,
                case_number: row
                    .get(1)
                    .map_err(|e| DbError::Data(format!("Failed to get case_number: {}", e)))?,
                title: row
                    .get(2)
                    .map_err(|e| DbError::Data(format!("Failed to get title: {}", e)))?,
                item_number: row
                    .get(3)
                    .map_err(|e| DbError::Data(format!("Failed to get item_number: {}", e)))?,
                file_number: row
                    .get(4)
                    .map_err(|e| DbError::Data(format!("Failed to get file_number: {}", e)))?,
                petitioner_adv: row
                    .get(5)
                    .map_err(|e| DbError::Data(format!("Failed to get petitioner_adv: {}", e)))?,
                respondent_adv: row
                    .get(6)
                    .map_err(|e| DbError::Data(format!("Failed to get respondent_adv: {}", e)))?,
                tags: Vec::new(),
            });
        }

        for case in &mut cases {
            case.tags = self.tags_of(case.id).await?;
        }

        Ok(cases)
    }

    async fn tags_of(&self, case_id: i64) -> Result<Vec<String>, DbError> {
        let mut rows = self
            .conn
            .query(
                "SELECT t.name FROM tags t
                 JOIN case_tags ct ON ct.tag_id = t.id
                 WHERE ct.case_id = ?
                 ORDER BY t.name",
                params![case_id],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to get tags: {}", e)))?;

        let mut tags = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DbError::Data(format!("Failed to read tags: {}", e)))?
        {
            tags.push(
                row.get(0)
                    .map_err(|e| DbError::Data(format!("Failed to get tag name: {}", e)))?,
            );
        }
        Ok(tags)
    }

    /// Tags with usage counts, most used first
    pub async fn list_tags(&self) -> Result<Vec<TagCount>, DbError> {
        let mut rows = self
            .conn
            .query(
                "SELECT t.name, COUNT(ct.case_id) AS uses
                 FROM tags t
                 LEFT JOIN case_tags ct ON ct.tag_id = t.id
                 GROUP BY t.id, t.name
                 ORDER BY uses DESC, t.name ASC",
                params![],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to list tags: {}", e)))?;

        let mut tags = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DbError::Data(format!("Failed to read tags: {}", e)))?
        {
            tags.push(TagCount {
                name: row
                    .get(0)
                    .map_err(|e| DbError::Data(format!("Failed to get name: {}", e)))?,
                count: row
                    .get(1)
                    .map_err(|e| DbError::Data(format!("Failed to get count: {}", e)))?,
            });
        }
        Ok(tags)
    }

    /// Row counts for every table
    pub async fn table_counts(&self) -> Result<TableCounts, DbError> {
        let mut counts = TableCounts::default();
        for table in schema::table_names() {
            let count = self.count_rows(table).await?;
            match table {
                "courts" => counts.courts = count,
                "benches" => counts.benches = count,
                "cause_lists" => counts.cause_lists = count,
                "cases" => counts.cases = count,
                "tags" => counts.tags = count,
                "case_tags" => counts.case_tags = count,
                _ => {}
            }
        }
        Ok(counts)
    }

    /// Every case with the fields the auto-tagger reads
    pub async fn cases_for_tagging(&self) -> Result<Vec<TaggableCase>, DbError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, case_number, title FROM cases ORDER BY id",
                params![],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to get cases: {}", e)))?;

        let mut cases = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DbError::Data(format!("Failed to read cases: {}", e)))?
        {
            cases.push(TaggableCase {
                id: row
                    .get(0)
                    .map_err(|e| DbError::Data(format!("Failed to get id: {}", e)))?,
                case_number: row
                    .get(1)
                    .map_err(|e| DbError::Data(format!("Failed to get case_number: {}", e)))?,
                title: row
                    .get(2)
                    .map_err(|e| DbError::Data(format!("Failed to get title: {}", e)))?,
            });
        }
        Ok(cases)
    }

    async fn count_rows(&self, table: &'static str) -> Result<i64, DbError> {
        // Table names come from the schema constants, never from input
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        self.query_id(&sql, params![]).await
    }

    async fn query_id(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<i64, DbError> {
        self.query_optional_id(sql, params)
            .await?
            .ok_or_else(|| DbError::NotFound(sql.split_whitespace().collect::<Vec<_>>().join(" ")))
    }

    async fn query_optional_id(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Option<i64>, DbError> {
        let mut rows = self
            .conn
            .query(sql, params)
            .await
            .map_err(|e| DbError::Query(format!("Failed to execute query: {}", e)))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(
                row.get(0)
                    .map_err(|e| DbError::Data(format!("Failed to get id: {}", e)))?,
            )),
            Ok(None) => Ok(None),
            Err(e) => Err(DbError::Data(format!("Failed to read id: {}", e))),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn repo() -> (Repository, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let repo = Repository::new_from_path(path.to_str().unwrap())
            .await
            .unwrap();
        (repo, dir)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seeded() -> (Repository, TempDir, i64) {
        let (repo, dir) = repo().await;
        let court = repo
            .seed_court(&CourtProfile::delhi_high_court())
            .await
            .unwrap();
        (repo, dir, court)
    }

    #[tokio::test]
    async fn test_seed_court_is_idempotent() {
        let (repo, _dir, court) = seeded().await;
        let again = repo
            .seed_court(&CourtProfile::delhi_high_court())
            .await
            .unwrap();

        assert_eq!(court, again);
        assert_eq!(repo.court_id("delhi_hc").await.unwrap(), Some(court));
        assert_eq!(repo.court_id("nowhere").await.unwrap(), None);
        assert_eq!(repo.table_counts().await.unwrap().courts, 1);
    }

    #[tokio::test]
    async fn test_bench_normalization_and_judges() {
        let (repo, _dir, court) = seeded().await;

        let first = repo
            .get_or_create_bench(court, " court no. 4 ", None)
            .await
            .unwrap();
        let second = repo
            .get_or_create_bench(court, "COURT  NO. 4", Some("HON'BLE MR. JUSTICE A"))
            .await
            .unwrap();
        let third = repo
            .get_or_create_bench(court, "Court No. 4", Some("  "))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(repo.table_counts().await.unwrap().benches, 1);

        let cl = repo
            .create_or_update_cause_list(court, first, date(2024, 6, 12), "Daily List", None, None)
            .await
            .unwrap();
        let views = repo
            .get_cause_lists_by_date("delhi_hc", date(2024, 6, 12))
            .await
            .unwrap();
        assert_eq!(views[0].id, cl);
        assert_eq!(views[0].bench_label, "COURT NO. 4");
        assert_eq!(views[0].judges.as_deref(), Some("HON'BLE MR. JUSTICE A"));
    }

    #[tokio::test]
    async fn test_cause_list_coalesces_url_and_path() {
        let (repo, _dir, court) = seeded().await;
        let bench = repo.get_or_create_bench(court, "COURT NO. 1", None).await.unwrap();
        let day = date(2024, 6, 12);

        let a = repo
            .create_or_update_cause_list(court, bench, day, "Daily List", Some("http://x/a.pdf"), None)
            .await
            .unwrap();
        let b = repo
            .create_or_update_cause_list(court, bench, day, "Daily List", None, Some("/data/a.pdf"))
            .await
            .unwrap();

        assert_eq!(a, b);
        let views = repo.get_cause_lists_by_date("delhi_hc", day).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].pdf_url.as_deref(), Some("http://x/a.pdf"));
        assert_eq!(views[0].pdf_path.as_deref(), Some("/data/a.pdf"));
    }

    #[tokio::test]
    async fn test_cause_list_last_non_null_url_wins() {
        let (repo, _dir, court) = seeded().await;
        let bench = repo.get_or_create_bench(court, "Y", None).await.unwrap();
        let day = date(2024, 6, 12);

        repo.create_or_update_cause_list(court, bench, day, "Daily List", Some("http://x/1.pdf"), None)
            .await
            .unwrap();
        repo.create_or_update_cause_list(court, bench, day, "Daily List", Some("http://x/2.pdf"), None)
            .await
            .unwrap();
        repo.create_or_update_cause_list(court, bench, day, "Daily List", None, None)
            .await
            .unwrap();

        let views = repo.get_cause_lists_by_date("delhi_hc", day).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].pdf_url.as_deref(), Some("http://x/2.pdf"));
        assert_eq!(repo.table_counts().await.unwrap().cause_lists, 1);
    }

    #[tokio::test]
    async fn test_create_case_first_write_wins() {
        let (repo, _dir, court) = seeded().await;
        let bench = repo.get_or_create_bench(court, "COURT NO. 1", None).await.unwrap();
        let cl = repo
            .create_or_update_cause_list(court, bench, date(2024, 6, 12), "Daily List", None, None)
            .await
            .unwrap();

        let mut case = NewCase::new("W.P.(C) 1/2024").with_tags(["Writ", " writ ", ""]);
        case.title = Some("A Vs. B".to_string());
        let first = repo.create_case(cl, &case).await.unwrap();

        let mut changed = NewCase::new("W.P.(C) 1/2024").with_tags(["other"]);
        changed.title = Some("changed".to_string());
        let second = repo.create_case(cl, &changed).await.unwrap();

        assert_eq!(first, second);
        let views = repo
            .get_cause_lists_by_date("delhi_hc", date(2024, 6, 12))
            .await
            .unwrap();
        let stored = &views[0].cases[0];
        assert_eq!(stored.title.as_deref(), Some("A Vs. B"));
        assert_eq!(stored.tags, vec!["writ"]);

        let counts = repo.table_counts().await.unwrap();
        assert_eq!(counts.cases, 1);
        assert_eq!(counts.tags, 1);
        assert_eq!(counts.case_tags, 1);
    }

    #[tokio::test]
    async fn test_case_tag_is_idempotent() {
        let (repo, _dir, court) = seeded().await;
        let bench = repo.get_or_create_bench(court, "COURT NO. 1", None).await.unwrap();
        let cl = repo
            .create_or_update_cause_list(court, bench, date(2024, 6, 12), "Daily List", None, None)
            .await
            .unwrap();
        let case = repo.create_case(cl, &NewCase::new("FAO 1/2024")).await.unwrap();

        assert!(repo.attach_tag(case, "Appeal").await.unwrap());
        assert!(!repo.attach_tag(case, "appeal").await.unwrap());
        assert!(!repo.attach_tag(case, "  ").await.unwrap());
        assert_eq!(repo.table_counts().await.unwrap().case_tags, 1);
    }

    #[tokio::test]
    async fn test_read_ordering() {
        let (repo, _dir, court) = seeded().await;
        let b2 = repo.get_or_create_bench(court, "COURT NO. 2", None).await.unwrap();
        let b1 = repo.get_or_create_bench(court, "COURT NO. 1", None).await.unwrap();
        let day = date(2024, 6, 12);

        let cl2 = repo
            .create_or_update_cause_list(court, b2, day, "Daily List", None, None)
            .await
            .unwrap();
        repo.create_or_update_cause_list(court, b1, day, "Daily List", None, None)
            .await
            .unwrap();
        repo.create_or_update_cause_list(court, b1, date(2024, 6, 10), "Daily List", None, None)
            .await
            .unwrap();

        for (item, number) in [("10", "C 10"), ("2", "C 2"), ("1", "C 1")] {
            let mut case = NewCase::new(number);
            case.item_number = Some(item.to_string());
            repo.create_case(cl2, &case).await.unwrap();
        }

        assert_eq!(
            repo.get_available_dates("delhi_hc").await.unwrap(),
            vec![day, date(2024, 6, 10)]
        );

        let views = repo.get_cause_lists_by_date("delhi_hc", day).await.unwrap();
        let benches: Vec<_> = views.iter().map(|v| v.bench_label.as_str()).collect();
        assert_eq!(benches, vec!["COURT NO. 1", "COURT NO. 2"]);
        let numbers: Vec<_> = views[1].cases.iter().map(|c| c.case_number.as_str()).collect();
        assert_eq!(numbers, vec!["C 1", "C 2", "C 10"]);
    }

    #[tokio::test]
    async fn test_unknown_court_reads_empty() {
        let (repo, _dir, _court) = seeded().await;
        assert!(repo.get_available_dates("missing").await.unwrap().is_empty());
        assert!(repo
            .get_cause_lists_by_date("missing", date(2024, 6, 12))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_list_tags_ordering() {
        let (repo, _dir, court) = seeded().await;
        let bench = repo.get_or_create_bench(court, "COURT NO. 1", None).await.unwrap();
        let cl = repo
            .create_or_update_cause_list(court, bench, date(2024, 6, 12), "Daily List", None, None)
            .await
            .unwrap();
        repo.create_case(cl, &NewCase::new("A 1").with_tags(["zeta", "alpha"]))
            .await
            .unwrap();
        repo.create_case(cl, &NewCase::new("A 2").with_tags(["zeta", "beta"]))
            .await
            .unwrap();

        let tags = repo.list_tags().await.unwrap();
        let names: Vec<_> = tags.iter().map(|t| (t.name.as_str(), t.count)).collect();
        assert_eq!(names, vec![("zeta", 2), ("alpha", 1), ("beta", 1)]);
    }

    #[tokio::test]
    async fn test_bench_requires_known_court() {
        let (repo, _dir) = repo().await;
        assert!(repo.get_or_create_bench(999, "COURT NO. 1", None).await.is_err());
        assert!(repo.get_or_create_bench(1, "   ", None).await.is_err());
    }
}
