use anyhow::Result;
use dialoguer::Select;

use adscope::accounts;
use adscope::auth::{AuthManager, FileCredentialStore};
use adscope::client::AdsClient;
use adscope::config::{Command, Config};
use adscope::ideas::{self, IdeaSeed};
use adscope::report::{self, QueryFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let (config, command) = Config::load()?;

    // Initialize logging with the configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    println!("Adscope - Google Ads keyword spend audit");

    tracing::info!("Initializing authentication...");
    let store = FileCredentialStore::new(config.credentials_file.clone());
    let manager = AuthManager::new(&config, store)?;
    let session = manager.obtain_session().await?;
    tracing::info!("Authentication successful");

    let client = AdsClient::new(
        session,
        &config.api_base_url,
        config.http_connect_timeout,
        config.http_request_timeout,
    )?;

    match command {
        Command::Audit {
            cost_threshold,
            limit,
            customer_id,
        } => run_audit(&client, customer_id, cost_threshold, limit).await,
        Command::Ideas {
            seed_keywords,
            page_url,
            customer_id,
        } => run_ideas(&client, customer_id, seed_keywords, page_url).await,
    }
}

async fn run_audit(
    client: &AdsClient,
    customer_id: Option<u64>,
    cost_threshold: f64,
    limit: usize,
) -> Result<()> {
    let Some(customer_id) = resolve_customer_id(client, customer_id).await? else {
        return Ok(());
    };

    let filter = QueryFilter::new(cost_threshold, limit)?;

    println!();
    println!("Analyzing account {customer_id} for inefficient keywords...");
    let records = report::find_inefficient_keywords(client, customer_id, &filter).await?;

    if records.is_empty() {
        println!("No inefficient keywords found.");
        return Ok(());
    }

    println!();
    println!(
        "Found {} keywords with > {:.2} spend and 0 conversions in the last 7 days:",
        records.len(),
        filter.cost_threshold()
    );
    println!();
    for record in &records {
        println!(
            "  - '{}' | Cost: {:.2} | Clicks: {} | Impressions: {}",
            record.keyword_text, record.cost, record.clicks, record.impressions
        );
    }
    println!();
    println!("No changes were made to the account; these are recommendations only.");

    Ok(())
}

async fn run_ideas(
    client: &AdsClient,
    customer_id: Option<u64>,
    seed_keywords: Vec<String>,
    page_url: Option<String>,
) -> Result<()> {
    let seed = IdeaSeed::from_inputs(seed_keywords, page_url)?;

    let Some(customer_id) = resolve_customer_id(client, customer_id).await? else {
        return Ok(());
    };

    println!();
    println!("Generating keyword ideas for account {customer_id}...");
    let ideas = ideas::generate_keyword_ideas(client, customer_id, &seed).await?;

    if ideas.is_empty() {
        println!("No keyword ideas returned.");
        return Ok(());
    }

    println!();
    for idea in &ideas {
        println!(
            "  - '{}' | Avg monthly searches: {} | Competition: {}",
            idea.text, idea.avg_monthly_searches, idea.competition
        );
    }

    Ok(())
}

/// Use the given account id, or list accessible accounts and prompt.
/// Returns None when the manager account has no accessible accounts.
async fn resolve_customer_id(
    client: &AdsClient,
    customer_id: Option<u64>,
) -> Result<Option<u64>> {
    if let Some(id) = customer_id {
        return Ok(Some(id));
    }

    let accounts = accounts::list_accessible_accounts(client).await?;
    if accounts.is_empty() {
        println!("No accessible Google Ads accounts found.");
        return Ok(None);
    }

    println!();
    println!("Accessible Google Ads accounts:");
    let labels: Vec<String> = accounts.iter().map(|id| id.to_string()).collect();
    let choice = Select::new()
        .with_prompt("Select an account")
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(Some(accounts[choice]))
}
