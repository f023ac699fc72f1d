//! hogline-import - Club order import and membership tools
//!
//! Operator-run, one-shot commands against the club database: the
//! curling.io order-import pipeline, the membership-status sweep, and the
//! minimal season/product admin the import depends on.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use hogline_common::db::{Product, ProductType, Season};
use hogline_common::money::{dollars_to_cents, format_cents};
use hogline_import::import::matcher::normalize_name;
use hogline_import::import::orchestrator::run_import;
use hogline_import::mapping::ItemMapping;
use hogline_import::{db, report, status};
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

/// Command-line arguments for hogline-import
#[derive(Parser, Debug)]
#[command(name = "hogline-import")]
#[command(about = "Curling club order import and membership tools")]
#[command(version)]
struct Cli {
    /// Data directory holding the club database
    /// (defaults to HOGLINE_DATA_DIR, config file, or the OS data dir)
    #[arg(long, global = true, env = "HOGLINE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a curling.io order-item CSV export
    Import {
        /// Path to the CSV export
        csv: PathBuf,
        /// TOML file with extra item-name mappings ([items] table)
        #[arg(long)]
        mappings: Option<PathBuf>,
        /// Directory for the audit log (default: next to the CSV)
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },
    /// Recompute the cached membership status for every user
    RecomputeStatus,
    /// Season administration
    Season {
        #[command(subcommand)]
        command: SeasonCommand,
    },
    /// Product catalog administration
    Product {
        #[command(subcommand)]
        command: ProductCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SeasonCommand {
    /// Create a season
    Create {
        /// Season name, e.g. "2025-2026"
        name: String,
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
        /// Mark the new season current (clears any other current season)
        #[arg(long)]
        current: bool,
    },
    /// List all seasons
    List,
    /// Mark a season current by slug
    SetCurrent { slug: String },
}

#[derive(Subcommand, Debug)]
enum ProductCommand {
    /// Add a product to the current season
    Add {
        /// Product name as members see it
        name: String,
        /// List price in dollars, e.g. "575.00"
        #[arg(long)]
        price: String,
        /// membership | league | addon | program
        #[arg(long = "type", default_value = "membership")]
        product_type: String,
        /// curling.io product id for explicit matching
        #[arg(long)]
        external_id: Option<String>,
        /// Membership tier label, e.g. "active"
        #[arg(long)]
        tier: Option<String>,
        /// Hide from import matching
        #[arg(long)]
        unavailable: bool,
    },
    /// List the current season's products
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let data_dir = hogline_common::config::resolve_data_dir(cli.data_dir.as_deref());
    hogline_common::config::ensure_data_dir(&data_dir)?;
    let db_path = hogline_common::config::database_path(&data_dir);
    info!("Database: {}", db_path.display());

    let pool = hogline_common::db::init_database(&db_path).await?;

    match cli.command {
        Command::Import {
            csv,
            mappings,
            log_dir,
        } => {
            let mapping = match mappings {
                Some(path) => ItemMapping::load(&path)?,
                None => ItemMapping::builtin(),
            };
            let stats = run_import(&pool, &csv, mapping, log_dir.as_deref()).await?;
            report::print_report(&stats);
        }

        Command::RecomputeStatus => {
            let recomputed = status::recompute_all(&pool).await?;
            println!("Recomputed membership status for {} users", recomputed);
        }

        Command::Season { command } => match command {
            SeasonCommand::Create {
                name,
                start,
                end,
                current,
            } => {
                let season = Season {
                    guid: Uuid::new_v4(),
                    slug: slugify(&name),
                    name,
                    start_date: start,
                    end_date: end,
                    is_current: current,
                };
                db::seasons::insert_season(&pool, &season).await?;
                println!("Created season {} ({})", season.name, season.slug);
            }
            SeasonCommand::List => {
                for season in db::seasons::list_seasons(&pool).await? {
                    println!(
                        "{}  {} .. {}  {}{}",
                        season.slug,
                        season.start_date,
                        season.end_date,
                        season.name,
                        if season.is_current { "  [current]" } else { "" }
                    );
                }
            }
            SeasonCommand::SetCurrent { slug } => {
                let season = db::seasons::list_seasons(&pool)
                    .await?
                    .into_iter()
                    .find(|s| s.slug == slug)
                    .with_context(|| format!("no season with slug {}", slug))?;
                db::seasons::set_current_season(&pool, season.guid).await?;
                println!("Season {} is now current", season.name);
            }
        },

        Command::Product { command } => match command {
            ProductCommand::Add {
                name,
                price,
                product_type,
                external_id,
                tier,
                unavailable,
            } => {
                let season = db::seasons::current_season(&pool)
                    .await?
                    .context("no current season; create one with `season create --current`")?;
                let product_type = ProductType::parse(&product_type).with_context(|| {
                    format!(
                        "unknown product type {:?} (expected membership, league, addon, or program)",
                        product_type
                    )
                })?;
                let product = Product {
                    guid: Uuid::new_v4(),
                    season_guid: season.guid,
                    external_id,
                    slug: slugify(&name),
                    name,
                    product_type,
                    membership_tier: tier,
                    price_cents: dollars_to_cents(&price)?,
                    is_available: !unavailable,
                    metadata: serde_json::json!({}),
                };
                db::products::insert_product(&pool, &product).await?;
                println!(
                    "Added {} ({}) to season {}",
                    product.name,
                    format_cents(product.price_cents),
                    season.name
                );
            }
            ProductCommand::List => {
                let season = db::seasons::current_season(&pool)
                    .await?
                    .context("no current season")?;
                for product in db::products::list_products_for_season(&pool, season.guid).await? {
                    println!(
                        "{:<12} {:>10}  {}{}  (ext: {})",
                        product.product_type.as_str(),
                        format_cents(product.price_cents),
                        product.name,
                        if product.is_available { "" } else { "  [unavailable]" },
                        product.external_id.as_deref().unwrap_or("-")
                    );
                }
            }
        },
    }

    Ok(())
}

fn slugify(name: &str) -> String {
    normalize_name(name).replace(' ', "-")
}
