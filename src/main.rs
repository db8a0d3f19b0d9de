use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;

use nypl_platform::config::{Config, ConnectionArgs};
use nypl_platform::{AuthorizedSession, BibListQuery, ItemListQuery, Keywords, Source};

/// Query the NYPL Platform API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Retrieve a bib by record number
    Bib(RecordArgs),
    /// Retrieve the items attached to a bib
    BibItems(RecordArgs),
    /// Retrieve an item by record number
    Item(RecordArgs),
    /// Check if a bib belongs to the research collection
    IsResearch(RecordArgs),
    /// Search bibs
    Bibs(BibListArgs),
    /// Search items
    Items(ItemListArgs),
    /// Search bibs by ISBN/UPC/ISSN
    SearchStandard(SearchArgs),
    /// Search bibs by OCLC/control number
    SearchControl(SearchArgs),
    /// Search bibs by record number
    SearchBib(SearchArgs),
}

#[derive(Args, Debug)]
struct RecordArgs {
    /// Record number, e.g. b123456789
    id: String,

    /// Record source
    #[arg(short, long, default_value = "sierra-nypl")]
    source: Source,
}

#[derive(Args, Debug)]
struct PagingArgs {
    /// Include deleted records
    #[arg(long)]
    deleted: Option<bool>,

    #[arg(long)]
    created_date: Option<String>,

    #[arg(long)]
    updated_date: Option<String>,

    #[arg(long)]
    limit: Option<u32>,

    #[arg(long)]
    offset: Option<u32>,
}

#[derive(Args, Debug)]
struct BibListArgs {
    #[arg(long, value_delimiter = ',')]
    id: Vec<String>,

    #[arg(long, value_delimiter = ',')]
    standard_number: Vec<String>,

    #[arg(long, value_delimiter = ',')]
    control_number: Vec<String>,

    #[arg(short, long)]
    source: Option<Source>,

    #[command(flatten)]
    paging: PagingArgs,
}

#[derive(Args, Debug)]
struct ItemListArgs {
    #[arg(long, value_delimiter = ',')]
    id: Vec<String>,

    #[arg(long, value_delimiter = ',')]
    barcode: Vec<String>,

    #[arg(long)]
    bib_id: Option<String>,

    #[arg(short, long)]
    source: Option<Source>,

    #[command(flatten)]
    paging: PagingArgs,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// One or more keywords
    #[arg(required = true, value_delimiter = ',')]
    keywords: Vec<String>,

    /// Record source (record number searches only)
    #[arg(short, long, default_value = "sierra-nypl")]
    source: Source,

    /// Include deleted records
    #[arg(long)]
    deleted: bool,

    #[arg(long)]
    limit: Option<u32>,

    #[arg(long)]
    offset: Option<u32>,
}

fn keywords(values: Vec<String>) -> Option<Keywords> {
    let keywords = Keywords::from(values);
    (!keywords.is_empty()).then_some(keywords)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_args(cli.connection)?;

    // Initialize logging with a configured level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    config.validate()?;

    tracing::info!("Authenticating with {}", config.oauth_server);
    let token_manager = Arc::new(
        config
            .token_manager()
            .await
            .context("Unable to obtain NYPL Platform access token")?,
    );

    let session = config.session(token_manager).await?;
    tracing::debug!("Session target: {} ({})", config.target, session.base_url());

    let response = run(&session, cli.command).await?;
    let status = response.status();
    let body = response.text().await.context("Failed to read response body")?;

    println!("HTTP {}", status);
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", body),
    }

    session.close();

    Ok(())
}

async fn run(session: &AuthorizedSession, command: Command) -> Result<reqwest::Response> {
    let response = match command {
        Command::Bib(args) => session.get_bib(&args.id, args.source).await?,
        Command::BibItems(args) => session.get_bib_items(&args.id, args.source).await?,
        Command::Item(args) => session.get_item(&args.id, args.source).await?,
        Command::IsResearch(args) => session.check_bib_is_research(&args.id, args.source).await?,
        Command::Bibs(args) => {
            let query = BibListQuery {
                id: keywords(args.id),
                standard_number: keywords(args.standard_number),
                control_number: keywords(args.control_number),
                nypl_source: args.source,
                deleted: args.paging.deleted,
                created_date: args.paging.created_date,
                updated_date: args.paging.updated_date,
                limit: args.paging.limit,
                offset: args.paging.offset,
            };
            session.get_bib_list(&query).await?
        }
        Command::Items(args) => {
            let query = ItemListQuery {
                id: keywords(args.id),
                barcode: keywords(args.barcode),
                bib_id: args.bib_id,
                nypl_source: args.source,
                deleted: args.paging.deleted,
                created_date: args.paging.created_date,
                updated_date: args.paging.updated_date,
                limit: args.paging.limit,
                offset: args.paging.offset,
            };
            session.get_item_list(&query).await?
        }
        Command::SearchStandard(args) => {
            session
                .search_standard_numbers(args.keywords, args.deleted, args.limit, args.offset)
                .await?
        }
        Command::SearchControl(args) => {
            session
                .search_control_numbers(args.keywords, args.deleted, args.limit, args.offset)
                .await?
        }
        Command::SearchBib(args) => {
            session
                .search_bib_numbers(
                    args.keywords,
                    args.source,
                    args.deleted,
                    args.limit,
                    args.offset,
                )
                .await?
        }
    };

    Ok(response)
}
