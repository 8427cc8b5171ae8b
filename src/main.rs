use cfworkers::config::{self, CliConfig};
use cfworkers::{
    HttpTransport, InheritBinding, PlainTextBinding, WasmModuleBinding, WorkerRequestParams,
    WorkerRoute, WorkerScriptParams, WorkersClient,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "cfworkers",
    version,
    about = "Manage Cloudflare Workers scripts and routes"
)]
struct Cli {
    /// API token (overrides config file, or set CF_API_TOKEN env var)
    #[arg(long, env = "CF_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Account ID, enables named scripts (overrides config file)
    #[arg(long, env = "CF_ACCOUNT_ID")]
    account_id: Option<String>,

    /// API base URL (overrides config file)
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize CLI config file (~/.config/cfworkers/config.toml)
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Manage worker scripts
    Script {
        #[command(subcommand)]
        action: ScriptAction,
    },

    /// Manage worker routes (filters)
    Route {
        #[command(subcommand)]
        action: RouteAction,
    },
}

#[derive(Args)]
struct ScriptSelector {
    /// Zone ID for the zone's single script (default from config)
    #[arg(long)]
    zone: Option<String>,

    /// Script name on the account (requires an account ID)
    #[arg(long)]
    name: Option<String>,
}

#[derive(Subcommand)]
enum ScriptAction {
    /// List scripts on the account
    List,

    /// Download script source
    Download {
        #[command(flatten)]
        target: ScriptSelector,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload script source
    Upload {
        #[command(flatten)]
        target: ScriptSelector,

        /// Script file
        file: PathBuf,

        /// Inherit binding: NAME or NAME=OLD_NAME (repeatable)
        #[arg(long = "inherit")]
        inherit: Vec<String>,

        /// Plain text binding: NAME=VALUE (repeatable)
        #[arg(long = "text")]
        text: Vec<String>,

        /// WebAssembly module binding: NAME=PATH (repeatable)
        #[arg(long = "wasm")]
        wasm: Vec<String>,
    },

    /// Delete a script
    Delete {
        #[command(flatten)]
        target: ScriptSelector,
    },
}

#[derive(Subcommand)]
enum RouteAction {
    /// List routes for a zone
    List {
        #[arg(long)]
        zone: Option<String>,
    },

    /// Create a route
    Create {
        #[arg(long)]
        zone: Option<String>,

        /// URL pattern, e.g. example.com/*
        #[arg(long)]
        pattern: String,

        /// Script to bind (requires an account ID)
        #[arg(long)]
        script: Option<String>,

        /// Create the filter disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Update a route
    Update {
        #[arg(long)]
        zone: Option<String>,

        /// Route ID
        id: String,

        #[arg(long)]
        pattern: String,

        #[arg(long)]
        script: Option<String>,

        #[arg(long)]
        disabled: bool,
    },

    /// Delete a route
    Delete {
        #[arg(long)]
        zone: Option<String>,

        /// Route ID
        id: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install rustls crypto provider BEFORE tokio runtime starts
    // (required for rustls 0.23+ - must happen before any TLS operations)
    #[cfg(feature = "rustls")]
    {
        rustls_crate::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cfworkers=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn std::error::Error>> {
    let Cli {
        api_token,
        account_id,
        base_url,
        command,
    } = Cli::parse();
    let cfg = CliConfig::load();

    match command {
        Commands::Init { force } => run_init(force),
        Commands::Script { action } => {
            let client = build_client(api_token, account_id, base_url, &cfg)?;
            run_script(&client, &cfg, action).await
        }
        Commands::Route { action } => {
            let client = build_client(api_token, account_id, base_url, &cfg)?;
            run_route(&client, &cfg, action).await
        }
    }
}

/// CLI args take precedence over config.
fn build_client(
    api_token: Option<String>,
    account_id: Option<String>,
    base_url: Option<String>,
    cfg: &CliConfig,
) -> Result<WorkersClient, Box<dyn std::error::Error>> {
    let api_token = api_token
        .or_else(|| cfg.api_token())
        .ok_or("No API token. Pass --api-token, set CF_API_TOKEN, or run 'cfworkers init'")?;
    let base_url = base_url.unwrap_or_else(|| cfg.api_base_url());

    let mut client = WorkersClient::new(HttpTransport::with_base_url(base_url, api_token));
    if let Some(account_id) = account_id.or_else(|| cfg.account_id()) {
        client = client.with_account_id(account_id);
    }
    Ok(client)
}

fn run_init(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = CliConfig::config_path() else {
        return Err("Could not determine config directory".into());
    };

    if path.exists() && !force {
        println!("Config file already exists at: {}", path.display());
        println!("\nUse --force to overwrite, or edit directly:");
        println!("  $EDITOR {}", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, config::sample_config())?;

    println!("Created config file: {}", path.display());
    println!("\nEdit it to set your API token and account ID:");
    println!("  $EDITOR {}", path.display());

    Ok(())
}

fn request_params(target: ScriptSelector, cfg: &CliConfig) -> WorkerRequestParams {
    WorkerRequestParams {
        zone_id: target.zone.or_else(|| cfg.zone_id()),
        script_name: target.name,
    }
}

fn resolve_zone(zone: Option<String>, cfg: &CliConfig) -> Result<String, Box<dyn std::error::Error>> {
    zone.or_else(|| cfg.zone_id())
        .ok_or_else(|| "No zone. Pass --zone, set CF_ZONE_ID, or set cloudflare.zone_id".into())
}

fn split_assignment(raw: &str, flag: &str) -> Result<(String, String), Box<dyn std::error::Error>> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("Invalid --{} value '{}', expected NAME=VALUE", flag, raw).into()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_script(
    client: &WorkersClient,
    cfg: &CliConfig,
    action: ScriptAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ScriptAction::List => print_json(&client.list_worker_scripts().await?),
        ScriptAction::Download { target, output } => {
            let res = client.download_worker(&request_params(target, cfg)).await?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, res.result.script.as_bytes()).await?;
                    eprintln!("Wrote {}", path.display());
                }
                None => print!("{}", res.result.script),
            }
            Ok(())
        }
        ScriptAction::Upload {
            target,
            file,
            inherit,
            text,
            wasm,
        } => {
            let params = request_params(target, cfg);
            let script = tokio::fs::read_to_string(&file).await?;

            if inherit.is_empty() && text.is_empty() && wasm.is_empty() {
                return print_json(&client.upload_worker(&params, &script).await?);
            }

            let mut data = WorkerScriptParams::new(script);
            for raw in inherit {
                let (name, binding) = match raw.split_once('=') {
                    Some((name, old_name)) => {
                        (name.to_string(), InheritBinding::from_old_name(old_name))
                    }
                    None => (raw.clone(), InheritBinding::new()),
                };
                data = data.with_binding(name, binding);
            }
            for raw in text {
                let (name, value) = split_assignment(&raw, "text")?;
                data = data.with_binding(name, PlainTextBinding::new(value));
            }
            for raw in wasm {
                let (name, path) = split_assignment(&raw, "wasm")?;
                let module = tokio::fs::read(&path).await?;
                data = data.with_binding(name, WasmModuleBinding::new(module));
            }

            print_json(&client.upload_worker_with_bindings(&params, &data).await?)
        }
        ScriptAction::Delete { target } => {
            print_json(&client.delete_worker(&request_params(target, cfg)).await?)
        }
    }
}

async fn run_route(
    client: &WorkersClient,
    cfg: &CliConfig,
    action: RouteAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        RouteAction::List { zone } => {
            let zone = resolve_zone(zone, cfg)?;
            print_json(&client.list_worker_routes(&zone).await?)
        }
        RouteAction::Create {
            zone,
            pattern,
            script,
            disabled,
        } => {
            let zone = resolve_zone(zone, cfg)?;
            let route = WorkerRoute {
                pattern,
                enabled: !disabled,
                script,
                ..WorkerRoute::default()
            };
            print_json(&client.create_worker_route(&zone, &route).await?)
        }
        RouteAction::Update {
            zone,
            id,
            pattern,
            script,
            disabled,
        } => {
            let zone = resolve_zone(zone, cfg)?;
            let route = WorkerRoute {
                pattern,
                enabled: !disabled,
                script,
                ..WorkerRoute::default()
            };
            print_json(&client.update_worker_route(&zone, &id, &route).await?)
        }
        RouteAction::Delete { zone, id } => {
            let zone = resolve_zone(zone, cfg)?;
            print_json(&client.delete_worker_route(&zone, &id).await?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_assignment() {
        assert_eq!(
            split_assignment("GREETING=hello=world", "text").unwrap(),
            ("GREETING".to_string(), "hello=world".to_string())
        );
        assert!(split_assignment("GREETING", "text").is_err());
        assert!(split_assignment("=value", "text").is_err());
    }

    #[test]
    fn test_script_name_passes_through_with_zone() {
        let cfg = CliConfig::default();
        let params = request_params(
            ScriptSelector {
                zone: Some("zone".to_string()),
                name: Some("bar".to_string()),
            },
            &cfg,
        );
        assert_eq!(params.zone_id.as_deref(), Some("zone"));
        assert_eq!(params.script_name.as_deref(), Some("bar"));
    }

    #[test]
    fn test_cli_parses_upload_bindings() {
        let cli = Cli::try_parse_from([
            "cfworkers",
            "--api-token",
            "t",
            "script",
            "upload",
            "--name",
            "bar",
            "worker.js",
            "--inherit",
            "b1",
            "--inherit",
            "b2=old_binding_name",
        ])
        .unwrap();
        match cli.command {
            Commands::Script {
                action: ScriptAction::Upload { inherit, file, .. },
            } => {
                assert_eq!(inherit, vec!["b1", "b2=old_binding_name"]);
                assert_eq!(file, PathBuf::from("worker.js"));
            }
            _ => panic!("expected script upload"),
        }
    }
}
