use anyhow::Result;
use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension};

use crate::model::{
    ApplicationRound, ApplicationWindow, DeliveryPeriod, FundingOpportunity, OpportunityVariant,
};
use crate::parser::ParsedPage;

const DB_PATH: &str = "data/grants.sqlite";

pub fn connect() -> Result<Connection> {
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pages (
            id         INTEGER PRIMARY KEY,
            url        TEXT UNIQUE NOT NULL,
            slug       TEXT NOT NULL,
            visited    BOOLEAN NOT NULL DEFAULT 0,
            visited_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_pages_visited ON pages(visited);

        CREATE TABLE IF NOT EXISTS page_data (
            id         INTEGER PRIMARY KEY,
            page_id    INTEGER NOT NULL REFERENCES pages(id),
            url        TEXT NOT NULL,
            slug       TEXT NOT NULL,
            markdown   TEXT,
            status     INTEGER,
            error      TEXT,
            latency_ms INTEGER,
            scraped_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_page_data_slug ON page_data(slug);

        -- Raw per-heading section text, kept for human QA review
        CREATE TABLE IF NOT EXISTS tier_sections (
            id           INTEGER PRIMARY KEY,
            page_id      INTEGER NOT NULL REFERENCES page_data(id),
            slug         TEXT NOT NULL,
            heading      TEXT NOT NULL,
            body         TEXT NOT NULL,
            position     INTEGER NOT NULL,
            processed_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_tier_sections_slug ON tier_sections(slug);

        -- Flattened legacy fields, recomputed from the primary variant
        CREATE TABLE IF NOT EXISTS opportunities (
            slug             TEXT PRIMARY KEY,
            url              TEXT NOT NULL,
            title            TEXT,
            grant_min        REAL,
            grant_max        REAL,
            currency         TEXT,
            application_link TEXT,
            deadline         TEXT,
            created_at       TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Variants are replaced wholesale on every re-parse
        CREATE TABLE IF NOT EXISTS variants (
            id               INTEGER PRIMARY KEY,
            opportunity_slug TEXT NOT NULL REFERENCES opportunities(slug) ON DELETE CASCADE,
            position         INTEGER NOT NULL,
            title            TEXT NOT NULL,
            grant_min        REAL,
            grant_max        REAL,
            currency         TEXT NOT NULL,
            funding_type     TEXT,
            window_open      TEXT,
            window_close     TEXT,
            timezone         TEXT,
            delivery_start   TEXT,
            delivery_end     TEXT,
            application_link TEXT,
            notes            TEXT NOT NULL DEFAULT '',
            is_primary       BOOLEAN NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_variants_opportunity ON variants(opportunity_slug);

        CREATE TABLE IF NOT EXISTS application_rounds (
            id               INTEGER PRIMARY KEY,
            variant_id       INTEGER NOT NULL REFERENCES variants(id) ON DELETE CASCADE,
            round_name       TEXT NOT NULL,
            apply_open_month TEXT,
            apply_open_year  INTEGER,
            apply_close      TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_rounds_variant ON application_rounds(variant_id);
        ",
    )?;
    Ok(())
}

// ── Scraping ──

pub fn insert_pages(conn: &Connection, pages: &[(String, String)]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare("INSERT OR IGNORE INTO pages (url, slug) VALUES (?1, ?2)")?;
        for (url, slug) in pages {
            count += stmt.execute(rusqlite::params![url, slug])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn fetch_unvisited(
    conn: &Connection,
    limit: Option<usize>,
) -> Result<Vec<(i64, String, String)>> {
    let sql = match limit {
        Some(n) => format!(
            "SELECT id, url, slug FROM pages WHERE visited = 0 ORDER BY id LIMIT {}",
            n
        ),
        None => "SELECT id, url, slug FROM pages WHERE visited = 0 ORDER BY id".to_string(),
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub struct ScrapeRow {
    pub page_id: i64,
    pub url: String,
    pub slug: String,
    pub markdown: Option<String>,
    pub status: Option<i32>,
    pub error: Option<String>,
    pub latency_ms: Option<i64>,
}

// ── Processing ──

pub struct ScrapedPage {
    pub page_data_id: i64,
    pub slug: String,
    pub url: String,
    pub markdown: String,
}

pub fn fetch_unprocessed(conn: &Connection, limit: Option<usize>) -> Result<Vec<ScrapedPage>> {
    let sql = format!(
        "SELECT pd.id, pd.slug, pd.url, pd.markdown
         FROM page_data pd
         LEFT JOIN opportunities o ON o.slug = pd.slug
         WHERE pd.markdown IS NOT NULL AND o.slug IS NULL
         ORDER BY pd.id{}",
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ScrapedPage {
                page_data_id: row.get(0)?,
                slug: row.get(1)?,
                url: row.get(2)?,
                markdown: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn save_parsed(conn: &Connection, pages: &[ParsedPage]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut opp_stmt = tx.prepare(
            "INSERT OR REPLACE INTO opportunities
             (slug, url, title, grant_min, grant_max, currency, application_link, deadline)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        let mut del_variants = tx.prepare("DELETE FROM variants WHERE opportunity_slug = ?1")?;
        let mut var_stmt = tx.prepare(
            "INSERT INTO variants
             (opportunity_slug, position, title, grant_min, grant_max, currency, funding_type,
              window_open, window_close, timezone, delivery_start, delivery_end,
              application_link, notes, is_primary)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)",
        )?;
        let mut round_stmt = tx.prepare(
            "INSERT INTO application_rounds
             (variant_id, round_name, apply_open_month, apply_open_year, apply_close)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        let mut del_sections = tx.prepare("DELETE FROM tier_sections WHERE slug = ?1")?;
        let mut sec_stmt = tx.prepare(
            "INSERT INTO tier_sections (page_id, slug, heading, body, position)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;

        for page in pages {
            let opp = &page.opportunity;
            opp_stmt.execute(rusqlite::params![
                opp.slug,
                opp.url,
                opp.title,
                opp.grant_min,
                opp.grant_max,
                opp.currency,
                opp.application_link,
                opp.deadline,
            ])?;

            del_variants.execute(rusqlite::params![opp.slug])?;
            for (position, variant) in opp.variants.iter().enumerate() {
                let (window_open, window_close, timezone) = match &variant.application_window {
                    Some(w) => (w.open_date, w.close_date, w.timezone.clone()),
                    None => (None, None, None),
                };
                let (delivery_start, delivery_end) = match &variant.delivery_period {
                    Some(d) => (d.start_date, d.end_date),
                    None => (None, None),
                };
                var_stmt.execute(rusqlite::params![
                    opp.slug,
                    position as i64,
                    variant.variant_title,
                    variant.grant_min,
                    variant.grant_max,
                    variant.currency,
                    variant.funding_type,
                    window_open,
                    window_close,
                    timezone,
                    delivery_start,
                    delivery_end,
                    variant.application_link,
                    variant.notes,
                    variant.is_primary,
                ])?;
                let variant_id = tx.last_insert_rowid();
                for round in &variant.application_rounds {
                    round_stmt.execute(rusqlite::params![
                        variant_id,
                        round.round_name,
                        round.apply_open_month,
                        round.apply_open_year_estimate,
                        round.apply_close_date,
                    ])?;
                }
            }

            del_sections.execute(rusqlite::params![opp.slug])?;
            for (position, (heading, body)) in page.sections.iter().enumerate() {
                sec_stmt.execute(rusqlite::params![
                    page.page_data_id,
                    opp.slug,
                    heading,
                    body,
                    position as i64,
                ])?;
            }
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Reading ──

const OPPORTUNITY_COLUMNS: &str =
    "slug, url, title, grant_min, grant_max, currency, application_link, deadline";

fn opportunity_from_row(row: &rusqlite::Row) -> rusqlite::Result<FundingOpportunity> {
    Ok(FundingOpportunity {
        slug: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        grant_min: row.get(3)?,
        grant_max: row.get(4)?,
        currency: row.get(5)?,
        application_link: row.get(6)?,
        deadline: row.get(7)?,
        variants: Vec::new(),
    })
}

pub fn fetch_opportunity(conn: &Connection, slug: &str) -> Result<Option<FundingOpportunity>> {
    let sql = format!(
        "SELECT {} FROM opportunities WHERE slug = ?1",
        OPPORTUNITY_COLUMNS
    );
    let opportunity = conn
        .query_row(&sql, [slug], opportunity_from_row)
        .optional()?;
    match opportunity {
        Some(mut opp) => {
            opp.variants = load_variants(conn, &opp.slug)?;
            Ok(Some(opp))
        }
        None => Ok(None),
    }
}

pub fn fetch_opportunities(conn: &Connection) -> Result<Vec<FundingOpportunity>> {
    let sql = format!("SELECT {} FROM opportunities ORDER BY slug", OPPORTUNITY_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let mut opportunities = stmt
        .query_map([], opportunity_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    for opp in &mut opportunities {
        opp.variants = load_variants(conn, &opp.slug)?;
    }
    Ok(opportunities)
}

fn load_variants(conn: &Connection, slug: &str) -> Result<Vec<OpportunityVariant>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, grant_min, grant_max, currency, funding_type,
                window_open, window_close, timezone, delivery_start, delivery_end,
                application_link, notes, is_primary
         FROM variants WHERE opportunity_slug = ?1 ORDER BY position",
    )?;
    let rows: Vec<(i64, OpportunityVariant)> = stmt
        .query_map([slug], |row| {
            let window_open: Option<NaiveDateTime> = row.get(6)?;
            let window_close: Option<NaiveDateTime> = row.get(7)?;
            let timezone: Option<String> = row.get(8)?;
            let delivery_start: Option<NaiveDateTime> = row.get(9)?;
            let delivery_end: Option<NaiveDateTime> = row.get(10)?;

            // A window row exists only when at least one date was found,
            // mirroring how the extractor builds them
            let application_window = if window_open.is_some() || window_close.is_some() {
                Some(ApplicationWindow {
                    open_date: window_open,
                    close_date: window_close,
                    timezone,
                    application_rounds: Vec::new(),
                })
            } else {
                None
            };
            let delivery_period = if delivery_start.is_some() || delivery_end.is_some() {
                Some(DeliveryPeriod {
                    start_date: delivery_start,
                    end_date: delivery_end,
                })
            } else {
                None
            };

            Ok((
                row.get::<_, i64>(0)?,
                OpportunityVariant {
                    variant_title: row.get(1)?,
                    grant_min: row.get(2)?,
                    grant_max: row.get(3)?,
                    currency: row.get(4)?,
                    funding_type: row.get(5)?,
                    application_window,
                    application_rounds: Vec::new(),
                    delivery_period,
                    application_link: row.get(11)?,
                    notes: row.get(12)?,
                    is_primary: row.get(13)?,
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut round_stmt = conn.prepare(
        "SELECT round_name, apply_open_month, apply_open_year, apply_close
         FROM application_rounds WHERE variant_id = ?1 ORDER BY id",
    )?;
    let mut variants = Vec::with_capacity(rows.len());
    for (variant_id, mut variant) in rows {
        let rounds = round_stmt
            .query_map([variant_id], |row| {
                Ok(ApplicationRound {
                    round_name: row.get(0)?,
                    apply_open_month: row.get(1)?,
                    apply_open_year_estimate: row.get(2)?,
                    apply_close_date: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(window) = variant.application_window.as_mut() {
            window.application_rounds = rounds.clone();
        }
        variant.application_rounds = rounds;
        variants.push(variant);
    }
    Ok(variants)
}

// ── Stats ──

pub struct Stats {
    pub total: usize,
    pub visited: usize,
    pub unvisited: usize,
    pub scraped: usize,
    pub errors: usize,
    pub opportunities: usize,
    pub variants: usize,
    pub multi_tier: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let total: usize = conn.query_row("SELECT COUNT(*) FROM pages", [], |r| r.get(0))?;
    let visited: usize =
        conn.query_row("SELECT COUNT(*) FROM pages WHERE visited = 1", [], |r| r.get(0))?;
    let scraped: usize = conn.query_row("SELECT COUNT(*) FROM page_data", [], |r| r.get(0))?;
    let errors: usize = conn.query_row(
        "SELECT COUNT(*) FROM page_data WHERE error IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let opportunities: usize =
        conn.query_row("SELECT COUNT(*) FROM opportunities", [], |r| r.get(0))?;
    let variants: usize = conn.query_row("SELECT COUNT(*) FROM variants", [], |r| r.get(0))?;
    let multi_tier: usize = conn.query_row(
        "SELECT COUNT(*) FROM (
             SELECT opportunity_slug FROM variants GROUP BY opportunity_slug HAVING COUNT(*) > 1
         )",
        [],
        |r| r.get(0),
    )?;
    Ok(Stats {
        total,
        visited,
        unvisited: total - visited,
        scraped,
        errors,
        opportunities,
        variants,
        multi_tier,
    })
}
