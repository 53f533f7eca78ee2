use crate::client::DEFAULT_SERVER_URL;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, str::FromStr};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_STORAGE_DIR: &str = "./uploads";
const DEFAULT_DATABASE_URL: &str = "sqlite://./data/images.db";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Centralized server configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub max_upload_bytes: usize,
    pub enforce_image_types: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Image upload gallery service")]
pub struct Args {
    /// Host to bind to (overrides IMAGE_GALLERY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides IMAGE_GALLERY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploaded images are stored (overrides IMAGE_GALLERY_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides IMAGE_GALLERY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Largest accepted request body in bytes (overrides IMAGE_GALLERY_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Accept uploads of any content type (same as IMAGE_GALLERY_ACCEPT_ANY_TYPE=true)
    #[arg(long)]
    pub accept_any_type: bool,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Gallery client commands. Without one, the binary runs the server.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List uploaded images
    List {
        /// Base URL of the gallery service
        #[arg(long, default_value = DEFAULT_SERVER_URL)]
        server: String,
    },
    /// Upload a JPEG or PNG image
    Upload {
        file: PathBuf,
        /// Base URL of the gallery service
        #[arg(long, default_value = DEFAULT_SERVER_URL)]
        server: String,
    },
    /// Delete an image by id
    Delete {
        id: String,
        /// Base URL of the gallery service
        #[arg(long, default_value = DEFAULT_SERVER_URL)]
        server: String,
    },
}

impl AppConfig {
    /// Merge CLI args over the process environment over defaults.
    pub fn from_env_and_args(args: &Args) -> Result<Self> {
        Self::resolve(args, |key| std::env::var(key).ok())
    }

    /// Merge CLI args over values from `env` over defaults.
    pub fn resolve(args: &Args, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env_host = env("IMAGE_GALLERY_HOST").unwrap_or_else(|| DEFAULT_HOST.into());
        let env_port = parse_env(&env, "IMAGE_GALLERY_PORT")?.unwrap_or(DEFAULT_PORT);
        let env_storage =
            env("IMAGE_GALLERY_STORAGE_DIR").unwrap_or_else(|| DEFAULT_STORAGE_DIR.into());
        let env_db =
            env("IMAGE_GALLERY_DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
        let env_max_upload = parse_env(&env, "IMAGE_GALLERY_MAX_UPLOAD_BYTES")?
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        let env_accept_any = parse_env(&env, "IMAGE_GALLERY_ACCEPT_ANY_TYPE")?.unwrap_or(false);

        Ok(Self {
            host: args.host.clone().unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.clone().unwrap_or(env_storage),
            database_url: args.database_url.clone().unwrap_or(env_db),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
            enforce_image_types: !(args.accept_any_type || env_accept_any),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("parsing {} value `{}`", key, value))
        })
        .transpose()
}
