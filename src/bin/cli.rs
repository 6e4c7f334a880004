//! Amazonia CLI - talk to the tree backend from a terminal
//!
//! Usage: amazonia-cli [OPTIONS] <COMMAND>
//!
//! Supports JSON output for scripting.

use amazonia_lib::{
    api_client::ForestClient,
    landing::Landing,
    models::{SearchResultSet, Species, Tree},
    plant::{Field, PlantForm},
    search::SearchInteraction,
    settings::{self, ApiConfig},
};
use clap::{Parser, Subcommand};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "amazonia-cli")]
#[command(version, about = "Plant and browse trees in the virtual rainforest", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Backend base URL (overrides env and stored settings)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Output as JSON for scripting
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every tree in the forest
    Trees,
    /// Plant a new tree
    Plant {
        /// Your name
        user: String,
        /// Name for the tree
        tree: String,
        /// Species token, e.g. BRAZIL_NUT
        #[arg(long, default_value = "KAPOK")]
        species: String,
    },
    /// Search trees and planters
    Search {
        query: String,
    },
    /// Forest statistics
    Stats,
    /// Check whether the backend is reachable
    Health,
    /// Show the species catalogue
    Species,
    /// Show or change stored settings
    Config {
        /// Store a new backend URL (empty string resets)
        #[arg(long)]
        set_api_url: Option<String>,
        /// Store a new timeout in milliseconds (0 resets)
        #[arg(long)]
        set_timeout_ms: Option<u64>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run_cli(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_cli(cli: Cli) -> Result<(), String> {
    settings::init(settings::default_config_dir());

    let json = cli.json;
    let config = resolve_config(cli.api_url, cli.timeout_ms);

    match cli.command {
        Commands::Species => print_species(json),
        Commands::Config { set_api_url, set_timeout_ms } => {
            handle_config(set_api_url, set_timeout_ms, &config, json)
        }
        Commands::Trees => handle_trees(&connect(&config)?, json).await,
        Commands::Plant { user, tree, species } => {
            handle_plant(&connect(&config)?, &user, &tree, &species, json).await
        }
        Commands::Search { query } => handle_search(&connect(&config)?, &query, json).await,
        Commands::Stats => handle_stats(&connect(&config)?, json).await,
        Commands::Health => handle_health(&connect(&config)?, json).await,
    }
}

/// Flags win over env vars, which win over the settings file
fn resolve_config(api_url: Option<String>, timeout_ms: Option<u64>) -> ApiConfig {
    let mut config = settings::api_config();
    if let Some(url) = api_url {
        config.base_url = url;
    }
    if let Some(ms) = timeout_ms.filter(|ms| *ms > 0) {
        config.timeout = Duration::from_millis(ms);
    }
    config
}

fn connect(config: &ApiConfig) -> Result<ForestClient, String> {
    ForestClient::new(config)
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

fn handle_config(set_api_url: Option<String>, set_timeout_ms: Option<u64>, config: &ApiConfig, json: bool) -> Result<(), String> {
    if let Some(url) = set_api_url {
        if !url.is_empty() {
            ApiConfig::new(url.clone(), config.timeout).validate()?;
        }
        settings::set_api_url(url)?;
    }
    if let Some(ms) = set_timeout_ms {
        settings::set_api_timeout_ms(ms)?;
    }
    let stored = settings::api_config();
    if json {
        println!("{}", serde_json::json!({
            "api_url": stored.base_url,
            "timeout_ms": stored.timeout_ms(),
        }));
    } else {
        println!("api_url:    {}", stored.base_url);
        println!("timeout_ms: {}", stored.timeout_ms());
    }
    Ok(())
}

async fn handle_trees(client: &ForestClient, json: bool) -> Result<(), String> {
    let trees = client.list_trees().await.map_err(|e| e.to_string())?;
    if json {
        println!("{}", to_json(&trees)?);
    } else {
        for tree in &trees {
            print_tree(tree);
        }
        eprintln!("{} trees", trees.len());
    }
    Ok(())
}

async fn handle_plant(client: &ForestClient, user: &str, tree: &str, species: &str, json: bool) -> Result<(), String> {
    let species = Species::from_str(&species.to_uppercase())
        .ok_or_else(|| format!("Unknown species '{}' (see `amazonia-cli species`)", species))?;

    let mut form = PlantForm::new();
    form.set_field(Field::UserName, user);
    form.set_field(Field::TreeName, tree);
    form.set_species(species);

    let planted = match form.submit(client).await {
        Some(planted) => planted,
        None => return Err(form.error().unwrap_or("Failed to plant tree").to_string()),
    };

    if json {
        println!("{}", to_json(&planted)?);
    } else {
        println!("Planted: #{} {} ({}) at ({:.2}, {:.2})",
            planted.id, planted.name, planted.species_label(),
            planted.position_x, planted.position_z);
    }
    Ok(())
}

async fn handle_search(client: &ForestClient, query: &str, json: bool) -> Result<(), String> {
    let mut search = SearchInteraction::new();
    search.query_changed(client, query).await;
    print_search(search.results(), json)
}

async fn handle_stats(client: &ForestClient, json: bool) -> Result<(), String> {
    let stats = client.get_stats().await.map_err(|e| e.to_string())?;
    if json {
        println!("{}", to_json(&stats)?);
        return Ok(());
    }
    println!("Trees planted:      {}", stats.total_trees);
    println!("Real trees planted: {}", stats.real_trees_planted);
    if !stats.top_planters.is_empty() {
        println!("Top planters:");
        for (rank, planter) in stats.top_planters.iter().enumerate() {
            println!("  {}. {} ({})", rank + 1, planter.name, planter.trees_planted);
        }
    }
    Ok(())
}

async fn handle_health(client: &ForestClient, json: bool) -> Result<(), String> {
    let mut landing = Landing::new();
    landing.mount(client).await;
    if json {
        println!("{}", serde_json::json!({
            "online": landing.backend_online(),
            "tree_count": landing.tree_count(),
        }));
    } else if landing.backend_online() {
        println!("Backend online, {} trees in the forest", landing.tree_count());
    } else {
        println!("Backend offline");
    }
    landing.request_plant().map_err(str::to_string)
}

fn print_tree(tree: &Tree) {
    let planted = tree.planted_at
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());
    println!("#{:<5} {:<24} {:<16} by {:<16} {}",
        tree.id, tree.name, tree.species_label(), tree.planter_name, planted);
}

fn print_search(results: &SearchResultSet, json: bool) -> Result<(), String> {
    if json {
        println!("{}", to_json(results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("No results");
        return Ok(());
    }
    if !results.trees.is_empty() {
        println!("Trees:");
        for tree in &results.trees {
            print_tree(tree);
        }
    }
    if !results.users.is_empty() {
        println!("Planters:");
        for user in &results.users {
            println!("  {} ({} trees)", user.name, user.trees_planted);
        }
    }
    Ok(())
}

fn print_species(json: bool) -> Result<(), String> {
    if json {
        let rows: Vec<_> = Species::ALL.iter()
            .map(|s| serde_json::json!({ "token": s.as_str(), "label": s.label(), "color": s.accent_color() }))
            .collect();
        println!("{}", to_json(&rows)?);
        return Ok(());
    }
    for species in Species::ALL {
        println!("{:<14} {:<20} {}", species.as_str(), species.label(), species.accent_color());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_to_json_reports_serialization_errors() {
        let mut bad: HashMap<(i32, i32), i32> = HashMap::new();
        bad.insert((1, 2), 3);
        let err = to_json(&bad).unwrap_err();
        assert!(err.contains("key must be a string"), "{}", err);

        assert_eq!(to_json(&vec![1, 2]).unwrap(), "[1,2]");
    }

    #[test]
    fn test_parse_plant_with_global_flags() {
        let cli = Cli::try_parse_from([
            "amazonia-cli", "plant", "Ana", "Oak", "--species", "rosewood", "--json", "--timeout-ms", "500",
        ]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.timeout_ms, Some(500));
        match cli.command {
            Commands::Plant { user, tree, species } => {
                assert_eq!((user.as_str(), tree.as_str(), species.as_str()), ("Ana", "Oak", "rosewood"));
            }
            _ => panic!("expected plant"),
        }
    }

    #[test]
    fn test_species_default_and_unknown_command() {
        let cli = Cli::try_parse_from(["amazonia-cli", "plant", "Ana", "Oak"]).unwrap();
        assert!(matches!(cli.command, Commands::Plant { ref species, .. } if species == "KAPOK"));
        assert!(Cli::try_parse_from(["amazonia-cli", "water"]).is_err());
    }

    #[tokio::test]
    async fn test_plant_rejects_unknown_species_before_request() {
        let client = connect(&ApiConfig::default()).unwrap();
        let err = handle_plant(&client, "Ana", "Oak", "baobab", false).await.unwrap_err();
        assert!(err.contains("Unknown species 'baobab'"));
    }

    #[tokio::test]
    async fn test_plant_blank_names_fail_without_request() {
        let client = connect(&ApiConfig::default()).unwrap();
        let err = handle_plant(&client, "Ana", "  ", "KAPOK", false).await.unwrap_err();
        assert_eq!(err, amazonia_lib::plant::MISSING_NAMES);
    }
}
