//! Phase dispatch: parses the CLI, loads configuration, and runs the
//! requested pipeline phase against the catalog.

use anyhow::{Context, Result, bail};
use clap::Parser;

use crate::core::cli::{Cli, Commands};
use crate::core::config::LucienConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::storage::AppStorage;
use crate::data::catalog::CatalogService;

pub struct App;

impl App {
    /// Entry point called from `main`. The hidden worker subcommand is
    /// handled before any logging/config/catalog initialization so the
    /// subprocess starts as fast as possible.
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        let cli = Cli::parse();

        if cli.command.is_hidden_worker() {
            return crate::domain::extract::worker::run()
                .await
                .context("extraction worker loop failed");
        }

        Self::init_logging(cli.log.as_deref());
        tracing::debug!(command = ?cli.command, "parsed command");

        if matches!(cli.command, Commands::InitConfig) {
            return Self::init_config(&cli);
        }

        if let Some(dir) = &cli.data_dir {
            // SAFETY: single-threaded at this point, before any spawned tasks read the var.
            unsafe {
                std::env::set_var(crate::core::constants::ENV_DATA_DIR, dir);
            }
        }

        let config = LucienConfig::load()?;
        let _storage = AppStorage::init().await?;

        let db_path = cli.db.clone().unwrap_or_else(|| config.index_db.clone());
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let catalog = CatalogService::open(&db_path).await?;
        let pool = catalog.pool();

        match cli.command {
            Commands::Scan { root } => {
                let root = root
                    .or_else(|| config.source_root.clone())
                    .context("no scan root given on the command line or in source_root")?;
                let summary = crate::domain::scan::run_scan(
                    pool,
                    &root,
                    &config.scan.skip_dirs,
                    config.scan.follow_symlinks,
                )
                .await?;
                println!(
                    "scanned {} of {} files ({} errors)",
                    summary.scanned, summary.total_files, summary.skipped_errors
                );
            }
            Commands::Stats => {
                Self::print_stats(pool).await?;
            }
            Commands::InitConfig => unreachable!("handled above"),
            Commands::Extract => {
                let summary =
                    crate::domain::extract::run_extraction(pool, &config, cli.workers, cli.limit).await?;
                println!(
                    "extracted {} of {} attempted ({} failed, {} workers recycled)",
                    summary.succeeded, summary.attempted, summary.failed, summary.recycled_workers
                );
            }
            Commands::Label => {
                let summary = crate::domain::label::run_labeling(pool, &config, cli.limit).await?;
                println!(
                    "labeled {} files ({} escalated, {} failed)",
                    summary.attempted, summary.escalated, summary.failed
                );
            }
            Commands::Plan => {
                let summary = crate::domain::plan::run_planning(pool, &config, cli.limit).await?;
                println!(
                    "planned {} files ({} flagged for review)",
                    summary.planned, summary.needs_review
                );

                if let Some(output) = &cli.output {
                    let plans =
                        crate::data::catalog::repositories::get_plans_for_run(pool, summary.run_id)
                            .await?;
                    let (jsonl_path, csv_path) =
                        crate::domain::plan::export_plans(&plans, output)?;
                    println!(
                        "exported plan run {} to {} and {}",
                        summary.run_id,
                        jsonl_path.display(),
                        csv_path.display()
                    );
                }
            }
            Commands::Materialize { plan } => {
                let summary = if let Ok(plan_run_id) = plan.parse::<i64>() {
                    crate::domain::plan::run_materialization(pool, &config, plan_run_id).await?
                } else {
                    let plans = crate::domain::plan::read_plans_jsonl(std::path::Path::new(&plan))
                        .with_context(|| format!("'{plan}' is not a plan-run id or a readable exported plan file"))?;
                    crate::domain::plan::run_materialization_from_plans(pool, &config, plans).await?
                };
                println!(
                    "materialized {} of {} attempted ({} failed)",
                    summary.materialized, summary.attempted, summary.failed
                );
            }
            Commands::ExtractWorker => unreachable!("handled above"),
        }

        catalog.close().await;
        Ok(())
    }

    async fn print_stats(pool: &sqlx::SqlitePool) -> Result<()> {
        let files = crate::data::catalog::repositories::count_files(pool).await?;
        let extractions: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM extractions WHERE status = 'success'")
                .fetch_one(pool)
                .await?;
        let labels: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM labels")
            .fetch_one(pool)
            .await?;
        let plans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM plans")
            .fetch_one(pool)
            .await?;
        let materialized: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM plans WHERE materialized_at IS NOT NULL")
                .fetch_one(pool)
                .await?;

        println!("files:        {files}");
        println!("extracted:    {extractions}");
        println!("labeled:      {labels}");
        println!("planned:      {plans}");
        println!("materialized: {materialized}");
        Ok(())
    }

    fn init_config(cli: &Cli) -> Result<()> {
        let target = cli
            .output
            .clone()
            .unwrap_or_else(crate::core::config::project_config_path);

        if target.exists() && !cli.force {
            bail!(
                "{} already exists; pass --force to overwrite",
                target.display()
            );
        }

        let yaml = LucienConfig::render_default_yaml()?;
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&target, yaml)
            .with_context(|| format!("failed to write {}", target.display()))?;
        println!("wrote {}", target.display());
        Ok(())
    }

    fn init_logging(override_filter: Option<&str>) {
        let default_filter = format!("info,{APP_NAME_LOWER}=info");

        let filter = override_filter
            .map(str::to_string)
            .or_else(|| std::env::var(ENV_LOG).ok())
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }
}
