mod db;
mod model;
mod parser;
mod scraper;
mod sources;
mod variants;

use std::time::Instant;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::model::FundingOpportunity;

/// Rendered wherever an opportunity has no concrete close date.
const NO_DEADLINE_LABEL: &str = "Varies, check official website";

#[derive(Parser)]
#[command(name = "grantscan", about = "Council funding-opportunity scraper and tier parser")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch sitemaps and queue funding-page URLs
    Init {
        /// Sitemap URL(s) to read, repeatable
        #[arg(long = "sitemap", required = true)]
        sitemaps: Vec<String>,
    },
    /// Scrape queued pages via spider.cloud
    Scrape {
        /// Max pages to scrape (default: all unvisited)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Parse scraped pages into opportunities and variants
    Process {
        /// Max pages to process (default: all unprocessed)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Scrape + process in one pipeline
    Run {
        /// Max pages to scrape+process
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Variant-level detail for one opportunity (QA view)
    Show { slug: String },
    /// Opportunities overview table
    Overview {
        /// Only opportunities with grant_max at or above this amount
        #[arg(long)]
        min_grant: Option<f64>,
        /// Only opportunities closing on or before this date (YYYY-MM-DD)
        #[arg(long)]
        closing_before: Option<NaiveDate>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Show scraping and parsing statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { sitemaps } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let mut total_found = 0;
            let mut total_inserted = 0;
            for sitemap in &sitemaps {
                let pages = sources::fetch_funding_urls(sitemap).await?;
                total_found += pages.len();
                total_inserted += db::insert_pages(&conn, &pages)?;
            }
            println!(
                "Inserted {} new funding URLs ({} total found)",
                total_inserted, total_found
            );
            Ok(())
        }
        Commands::Scrape { limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let pages = db::fetch_unvisited(&conn, limit)?;
            if pages.is_empty() {
                println!("No unvisited pages. Run 'init' first or all pages are scraped.");
                return Ok(());
            }
            println!("Scraping {} pages (streaming to DB)...", pages.len());
            let stats = scraper::scrape_pages_streaming(&conn, pages).await?;
            println!(
                "Done: {} scraped ({} ok, {} errors).",
                stats.total, stats.ok, stats.errors
            );
            Ok(())
        }
        Commands::Process { limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let pages = db::fetch_unprocessed(&conn, limit)?;
            if pages.is_empty() {
                println!("No unprocessed pages. Run 'scrape' first.");
                return Ok(());
            }
            println!("Processing {} pages...", pages.len());
            let counts = process_pages(&conn, &pages)?;
            counts.print();
            Ok(())
        }
        Commands::Run { limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let pages = db::fetch_unvisited(&conn, limit)?;
            if pages.is_empty() {
                println!("No unvisited pages. Run 'init' first.");
                return Ok(());
            }

            let t_scrape = Instant::now();
            println!("Pipeline: scraping {} pages (streaming to DB)...", pages.len());
            let stats = scraper::scrape_pages_streaming(&conn, pages).await?;
            println!(
                "Scraped {} pages ({} ok, {} errors) in {:.1}s",
                stats.total,
                stats.ok,
                stats.errors,
                t_scrape.elapsed().as_secs_f64()
            );

            let t_process = Instant::now();
            let unprocessed = db::fetch_unprocessed(&conn, None)?;
            if unprocessed.is_empty() {
                println!("Nothing to process (all scraped pages had errors).");
                return Ok(());
            }
            println!("Processing {} pages...", unprocessed.len());
            let counts = process_pages(&conn, &unprocessed)?;
            println!("Processed in {:.1}s", t_process.elapsed().as_secs_f64());
            counts.print();
            Ok(())
        }
        Commands::Show { slug } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            match db::fetch_opportunity(&conn, &slug)? {
                Some(mut opp) => {
                    // Stored flags are only hints; re-derive the primary on
                    // every read
                    variants::apply_primary_to_top_level(&mut opp);
                    print_opportunity(&opp);
                    Ok(())
                }
                None => {
                    println!("No opportunity with slug '{}'.", slug);
                    Ok(())
                }
            }
        }
        Commands::Overview {
            min_grant,
            closing_before,
            limit,
        } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let mut opportunities = db::fetch_opportunities(&conn)?;
            for opp in &mut opportunities {
                variants::apply_primary_to_top_level(opp);
            }
            if let Some(floor) = min_grant {
                opportunities.retain(|o| o.grant_max.is_some_and(|max| max >= floor));
            }
            if let Some(cutoff) = closing_before {
                opportunities
                    .retain(|o| o.deadline.is_some_and(|d| d.date() <= cutoff));
            }
            opportunities.truncate(limit);

            if opportunities.is_empty() {
                println!("No opportunities found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<24} | {:<28} | {:<20} | {:<29} | {:>4}",
                "#", "Slug", "Title", "Grant range", "Deadline", "Tiers"
            );
            println!("{}", "-".repeat(122));
            for (i, opp) in opportunities.iter().enumerate() {
                let title = truncate(opp.title.as_deref().unwrap_or("-"), 28);
                let range = top_level_range(opp).unwrap_or_else(|| "-".into());
                let deadline = opp
                    .deadline
                    .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| NO_DEADLINE_LABEL.into());
                println!(
                    "{:>3} | {:<24} | {:<28} | {:<20} | {:<29} | {:>4}",
                    i + 1,
                    truncate(&opp.slug, 24),
                    title,
                    truncate(&range, 20),
                    deadline,
                    opp.variants.len()
                );
            }
            println!("\n{} opportunities", opportunities.len());
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Pages:         {}", s.total);
            println!("Visited:       {}", s.visited);
            println!("Unvisited:     {}", s.unvisited);
            println!("Scraped:       {}", s.scraped);
            println!("Errors:        {}", s.errors);
            println!("Opportunities: {}", s.opportunities);
            println!("Variants:      {}", s.variants);
            println!("Multi-tier:    {}", s.multi_tier);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

struct ProcessCounts {
    opportunities: usize,
    variants: usize,
    rounds: usize,
    multi_tier: usize,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Saved {} opportunities ({} multi-tier), {} variants, {} rounds.",
            self.opportunities, self.multi_tier, self.variants, self.rounds,
        );
    }
}

fn process_pages(
    conn: &rusqlite::Connection,
    pages: &[db::ScrapedPage],
) -> anyhow::Result<ProcessCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut counts = ProcessCounts {
        opportunities: 0,
        variants: 0,
        rounds: 0,
        multi_tier: 0,
    };

    for chunk in pages.chunks(500) {
        let parsed: Vec<_> = chunk.par_iter().map(parser::process_page).collect();

        for page in &parsed {
            let opp = &page.opportunity;
            counts.opportunities += 1;
            counts.variants += opp.variants.len();
            counts.rounds += opp
                .variants
                .iter()
                .map(|v| v.application_rounds.len())
                .sum::<usize>();
            if opp.variants.len() > 1 {
                counts.multi_tier += 1;
            }
        }

        db::save_parsed(conn, &parsed)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(counts)
}

fn print_opportunity(opp: &FundingOpportunity) {
    println!("{} ({})", opp.title.as_deref().unwrap_or(&opp.slug), opp.url);
    let range = top_level_range(opp).unwrap_or_else(|| "-".into());
    let deadline = opp
        .deadline
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| NO_DEADLINE_LABEL.into());
    println!("  Grant range: {}", range);
    println!("  Deadline:    {}", deadline);
    println!(
        "  Apply at:    {}",
        opp.application_link.as_deref().unwrap_or("-")
    );

    let selected = variants::select_primary(&opp.variants);
    println!("\n  {} variant(s):", opp.variants.len());
    for variant in &opp.variants {
        let marker = match selected {
            Some(primary) if std::ptr::eq(primary, variant) => "*",
            _ => " ",
        };
        println!("  {} {}", marker, variant.variant_title);
        if let Some(range) = variants::grant_range_label(variant) {
            println!("      Grant: {}", range);
        }
        if let Some(window) = &variant.application_window {
            let mut parts = Vec::new();
            if let Some(open) = window.open_date {
                parts.push(format!("Opens: {}", open.format("%Y-%m-%d")));
            }
            if let Some(close) = window.close_date {
                parts.push(format!("Closes: {}", close.format("%Y-%m-%d %H:%M")));
            }
            if let Some(tz) = &window.timezone {
                parts.push(format!("TZ: {}", tz));
            }
            if !parts.is_empty() {
                println!("      Window: {}", parts.join(" | "));
            }
        }
        for round in &variant.application_rounds {
            let month = round.apply_open_month.as_deref().unwrap_or("?");
            let year = round
                .apply_open_year_estimate
                .map(|y| y.to_string())
                .unwrap_or_else(|| "?".into());
            println!("      {}: opens {} {}", round.round_name, month, year);
        }
        if let Some(delivery) = &variant.delivery_period {
            let start = delivery
                .start_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "?".into());
            let end = delivery
                .end_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "?".into());
            println!("      Delivery: {} to {}", start, end);
        }
        if let Some(link) = &variant.application_link {
            println!("      Apply: {}", link);
        }
    }
}

/// Grant range from the flattened top-level fields.
fn top_level_range(opp: &FundingOpportunity) -> Option<String> {
    variants::format_grant_range(
        opp.grant_min,
        opp.grant_max,
        opp.currency.as_deref().unwrap_or(""),
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
