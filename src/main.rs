use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fedsearch::config::{self, AppConfig};
use fedsearch::search::{apply_min_score, DbIndex, MySqlExecutor, SearchEngine, SearchRequest, SqlExecutor};

/// Federated fulltext search over relational tables / 联合全文搜索
#[derive(Parser, Debug)]
#[command(name = "fedsearch")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_TIME"), ")"))]
#[command(about = "Federated fulltext search over relational tables", long_about = None)]
struct Cli {
    /// Configuration file path (created with defaults if missing)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Overrides `database.url` from the configuration file
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create generated columns and fulltext indexes for every source
    Provision,
    /// Drop fulltext indexes and generated columns for every source
    Teardown,
    /// Print the composed statement without executing it
    Sql(QueryArgs),
    /// Run a search and print the ranked results as JSON
    Search(QueryArgs),
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Raw search term
    term: String,

    /// Language hint, e.g. `de` or `en-US`
    #[arg(long)]
    lang: Option<String>,

    /// Additional source parameter as key=value (value parsed as JSON when possible)
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    params: Vec<(String, serde_json::Value)>,
}

impl QueryArgs {
    fn into_request(self) -> SearchRequest {
        let mut request = SearchRequest::new(self.term);
        if let Some(lang) = self.lang {
            request = request.with_language(lang);
        }
        for (key, value) in self.params {
            request = request.with_parameter(key, value);
        }
        request
    }
}

fn parse_param(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", raw))?;
    if key.is_empty() {
        return Err("parameter key must not be empty".to_string());
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

async fn run_search<E: SqlExecutor>(engine: &SearchEngine<E>, app_config: &AppConfig, request: SearchRequest) -> anyhow::Result<()> {
    let request = request.with_limit(app_config.search.candidate_limit);
    let mut results = apply_min_score(engine.search(&request).await?, app_config.search.min_score);
    results.truncate(app_config.search.default_limit);

    let results: Vec<_> = results.into_iter().map(|r| engine.enrich(r)).collect();
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fedsearch=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration / 加载配置
    let app_config = config::load_config(&cli.config)?;
    let database = app_config.database_type()?;
    let registry = app_config.build_registry()?;
    tracing::info!("{} search sources registered on {}", registry.len(), database);

    let url = app_config.database_url(cli.database_url);
    let max_connections = app_config.database.max_connections;
    // Composing SQL needs no round trip; everything else should fail fast on a bad URL
    let executor = match cli.command {
        Command::Sql(_) => MySqlExecutor::connect_lazy(&url, max_connections)?,
        _ => MySqlExecutor::connect(&url, max_connections).await?,
    };
    let engine = SearchEngine::new(database, registry, executor).with_languages(app_config.language_settings());

    match cli.command {
        Command::Provision => {
            let index = DbIndex::new(engine.executor(), database.dialect()?);
            let report = index.provision(engine.registry()).await?;
            tracing::info!("{} statements executed for {} sources", report.statements.len(), report.sources);
        }
        Command::Teardown => {
            let index = DbIndex::new(engine.executor(), database.dialect()?);
            let report = index.teardown(engine.registry()).await?;
            tracing::info!("{} statements executed for {} sources", report.statements.len(), report.sources);
        }
        Command::Sql(args) => {
            println!("{}", engine.compose(&args.into_request())?.sql);
        }
        Command::Search(args) => {
            run_search(&engine, &app_config, args.into_request()).await?;
        }
    }

    engine.executor().close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from(["fedsearch", "provision"]).unwrap();
        assert!(matches!(cli.command, Command::Provision));
        assert_eq!(cli.config, PathBuf::from("config.json"));

        let cli = Cli::try_parse_from(["fedsearch", "--config", "/etc/fedsearch.json", "teardown"]).unwrap();
        assert!(matches!(cli.command, Command::Teardown));
        assert_eq!(cli.config, PathBuf::from("/etc/fedsearch.json"));

        assert!(Cli::try_parse_from(["fedsearch"]).is_err());
        assert!(Cli::try_parse_from(["fedsearch", "search"]).is_err());
        assert!(Cli::try_parse_from(["fedsearch", "reindex"]).is_err());
    }

    #[test]
    fn test_parse_search_options() {
        let cli = Cli::try_parse_from([
            "fedsearch", "search", "launch day", "--lang", "de", "--param", "site=3", "--param", "kind=blog",
        ])
        .unwrap();
        let Command::Search(args) = cli.command else {
            panic!("expected search command");
        };
        let request = args.into_request();
        assert_eq!(request.term, "launch day");
        assert_eq!(request.language_hint.as_deref(), Some("de"));
        assert_eq!(request.additional_parameters["site"], serde_json::json!(3));
        assert_eq!(request.additional_parameters["kind"], serde_json::json!("blog"));
    }

    #[test]
    fn test_malformed_param_is_rejected() {
        assert!(Cli::try_parse_from(["fedsearch", "sql", "x", "--param", "novalue"]).is_err());
        assert!(Cli::try_parse_from(["fedsearch", "sql", "x", "--param", "=1"]).is_err());
        assert_eq!(parse_param("types=[\"a\",\"b\"]").unwrap().1, serde_json::json!(["a", "b"]));
    }
}
