//! Config command - load and inspect configuration.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::ServerConfig;

/// Config file location plus environment overrides for secrets.
#[derive(Args, Clone)]
pub struct ConfigArgs {
    /// Config file (default: ~/.config/keyshop/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// KeyAuth seller key
    #[arg(long, env = "KEYAUTH_SELLER_KEY", hide_env_values = true, global = true)]
    pub seller_key: Option<String>,

    /// KeyAuth application name, used by login/register
    #[arg(long, env = "KEYAUTH_NAME", global = true)]
    pub app_name: Option<String>,

    /// KeyAuth owner id, used by login/register
    #[arg(long, env = "KEYAUTH_OWNER_ID", global = true)]
    pub owner_id: Option<String>,

    /// Session cookie signing secret
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true, global = true)]
    pub session_secret: Option<String>,
}

impl ConfigArgs {
    /// Load the config file and apply overrides on top.
    pub fn load(&self) -> Result<ServerConfig> {
        let mut config = ServerConfig::load(self.config.as_deref())?;

        if let Some(key) = &self.seller_key {
            config.keyauth.seller_key = Some(key.clone());
        }
        if let Some(name) = &self.app_name {
            config.keyauth.app_name = Some(name.clone());
        }
        if let Some(owner_id) = &self.owner_id {
            config.keyauth.owner_id = Some(owner_id.clone());
        }
        if let Some(secret) = &self.session_secret {
            config.session.secret = Some(secret.clone());
        }

        Ok(config)
    }

    fn path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => ServerConfig::config_path(),
        }
    }
}

#[derive(Args)]
pub struct ConfigCmd {
    #[command(flatten)]
    pub args: ConfigArgs,

    #[command(subcommand)]
    pub command: ConfigSubCmd,
}

#[derive(Subcommand)]
pub enum ConfigSubCmd {
    /// Show the effective configuration (secrets masked)
    Show,
}

fn set_or_not(value: &Option<String>) -> &'static str {
    if value.as_deref().is_some_and(|v| !v.is_empty()) {
        "(set)"
    } else {
        "(not set)"
    }
}

impl ConfigCmd {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            ConfigSubCmd::Show => {
                let config = self.args.load()?;
                println!("Config: {}", self.args.path()?.display());
                println!();
                println!("bind:            {}", config.bind);
                println!();
                println!("[keyauth]");
                println!("seller_key:      {}", set_or_not(&config.keyauth.seller_key));
                println!(
                    "app_name:        {}",
                    config.keyauth.app_name.as_deref().unwrap_or("(not set)")
                );
                println!("owner_id:        {}", set_or_not(&config.keyauth.owner_id));
                println!("seller_api_url:  {}", config.keyauth.seller_api_url);
                println!("app_api_url:     {}", config.keyauth.app_api_url);
                println!("app_version:     {}", config.keyauth.app_version);
                println!();
                println!("[session]");
                println!("secret:          {}", set_or_not(&config.session.secret));
                println!("cookie_name:     {}", config.session.cookie_name);
                println!("max_age_secs:    {}", config.session.max_age_secs);
                println!("secure:          {}", config.session.secure);
                println!();
                println!("[storefront]");
                println!("note:            {}", config.storefront.note);
                println!("default_expiry:  {} day(s)", config.storefront.default_expiry_days);
                for (variant, days) in &config.storefront.variants {
                    println!("variant {variant}:  {days} day(s)");
                }
            }
        }
        Ok(())
    }
}
