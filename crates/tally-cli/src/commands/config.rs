use std::path::{Path, PathBuf};

use serde::Serialize;
use tally_core::config::SyncSettings;
use tally_core::util::{is_http_url, normalize_text_option};

use crate::cli::ConfigCommands;
use crate::config::{default_config_path, CliConfig};
use crate::error::CliError;

/// Values passed to `config init`; `None` keeps the stored value
#[derive(Debug, Default)]
pub struct ConfigInitArgs {
    pub user_id: Option<String>,
    pub api_base_url: Option<String>,
    pub api_token: Option<String>,
    pub data_dir: Option<PathBuf>,
}

/// Effective configuration as printed by `config show`
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ConfigView {
    pub config_path: PathBuf,
    pub user_id: Option<String>,
    pub api_base_url: Option<String>,
    pub api_token: Option<&'static str>,
    pub data_dir: PathBuf,
    pub sync: SyncSettings,
}

pub fn run_config(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            user_id,
            api_url,
            api_token,
            data_dir,
        } => run_config_init(
            &default_config_path(),
            ConfigInitArgs {
                user_id,
                api_base_url: api_url,
                api_token,
                data_dir,
            },
        ),
        ConfigCommands::Show { json } => run_config_show(&default_config_path(), json),
    }
}

pub fn run_config_init(path: &Path, args: ConfigInitArgs) -> Result<(), CliError> {
    let existing = CliConfig::load_from_path(path).map_err(CliError::Config)?;
    let config = apply_config_init(existing, args)?;
    config.save_to_path(path).map_err(CliError::Config)?;
    println!("Configuration written to {}", path.display());

    let mut missing_fields = Vec::new();
    if config.user_id.is_none() {
        missing_fields.push("user_id");
    }
    if config.api_base_url.is_none() {
        missing_fields.push("api_base_url");
    }
    if missing_fields.is_empty() {
        println!("Sync is ready. Run `tally sync` to upload queued changes.");
    } else {
        println!(
            "Still missing: {} (the CLI stays offline without an API URL)",
            missing_fields.join(", ")
        );
    }
    Ok(())
}

pub fn apply_config_init(mut config: CliConfig, args: ConfigInitArgs) -> Result<CliConfig, CliError> {
    if let Some(user_id) = normalize_text_option(args.user_id) {
        config.user_id = Some(user_id);
    }
    if let Some(url) = normalize_text_option(args.api_base_url) {
        if !is_http_url(&url) {
            return Err(CliError::Config(
                "api_base_url must include http:// or https://".to_string(),
            ));
        }
        config.api_base_url = Some(url.trim_end_matches('/').to_string());
    }
    if let Some(token) = normalize_text_option(args.api_token) {
        config.api_token = Some(token);
    }
    if let Some(dir) = args.data_dir.filter(|dir| !dir.as_os_str().is_empty()) {
        config.data_dir = Some(dir);
    }
    Ok(config)
}

pub fn run_config_show(path: &Path, as_json: bool) -> Result<(), CliError> {
    let config = CliConfig::load_from_path(path)
        .map_err(CliError::Config)?
        .with_env_overrides();
    let view = config_view(path, &config);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("config:    {}", view.config_path.display());
    println!("user:      {}", view.user_id.as_deref().unwrap_or("(not set)"));
    println!(
        "api url:   {}",
        view.api_base_url.as_deref().unwrap_or("(not set, offline)")
    );
    println!("api token: {}", view.api_token.unwrap_or("(not set)"));
    println!("data dir:  {}", view.data_dir.display());
    println!(
        "backoff:   {}ms doubling up to {}ms",
        view.sync.backoff_base_ms, view.sync.backoff_max_ms
    );
    match view.sync.sync_interval() {
        Some(interval) => println!("interval:  {}s", interval.as_secs()),
        None => println!("interval:  disabled"),
    }
    Ok(())
}

pub fn config_view(path: &Path, config: &CliConfig) -> ConfigView {
    ConfigView {
        config_path: path.to_path_buf(),
        user_id: config.user_id.clone(),
        api_base_url: config.api_base_url.clone(),
        api_token: config.api_token.as_ref().map(|_| "<redacted>"),
        data_dir: config.data_dir(),
        sync: config.sync,
    }
}
