use clap::Parser;
use fleet::{
    api::{credentials::Credentials, http_client::FleetClient},
    common::constants::config_dir,
    data_access::FleetRepository,
    notify::ConsoleNotifier,
    preferences::PreferencesStore,
};
use std::{path::PathBuf, sync::Arc};
use url::Url;

pub mod admin;
pub mod compare;
pub mod get;
pub mod output;
pub mod sync;

use admin::{CreateResources, DeleteResources, LoginArgs, UpdateResources, UseResources};
use compare::CompareResources;
use get::GetResources;
use sync::SyncResources;

/// Connection and client state options shared by every operation.
#[derive(Parser, Debug)]
pub struct CliArgs {
    /// URL of the fleet management backend.
    #[arg(global = true, long, short, env = constants::API_ENDPOINT_ENV, default_value = constants::DEFAULT_API_ENDPOINT)]
    pub endpoint: Url,

    /// Bearer token, takes precedence over the stored one.
    #[arg(global = true, long, env = constants::API_TOKEN_ENV, hide_env_values = true)]
    pub token: Option<String>,

    /// Timeout of every request.
    #[arg(global = true, long, default_value = constants::DEFAULT_REQUEST_TIMEOUT)]
    pub timeout: humantime::Duration,

    /// Time after which cached responses are refetched.
    #[arg(global = true, long, default_value = constants::DEFAULT_STALE_TIME)]
    pub stale_time: humantime::Duration,

    /// Directory holding the token and preferences files.
    #[arg(global = true, long, env = constants::CONFIG_DIR_ENV)]
    pub config_dir: Option<PathBuf>,

    /// Output format.
    #[arg(global = true, long, short, value_enum, default_value_t = output::OutputFormat::Table)]
    pub output: output::OutputFormat,
}

/// The types of operations that are supported.
#[derive(Parser, Debug)]
pub enum Operations {
    /// 'Get' resources.
    #[command(subcommand)]
    Get(GetResources),
    /// 'Compare' resources between two app instances.
    #[command(subcommand)]
    Compare(CompareResources),
    /// 'Sync' services or ConfigMap keys to another environment.
    #[command(subcommand)]
    Sync(SyncResources),
    /// 'Create' environments and app instances.
    #[command(subcommand)]
    Create(CreateResources),
    /// 'Update' environments and app instances.
    #[command(subcommand)]
    Update(UpdateResources),
    /// 'Delete' environments and app instances.
    #[command(subcommand)]
    Delete(DeleteResources),
    /// 'Use' an environment or site by default.
    #[command(subcommand)]
    Use(UseResources),
    /// Store an API token.
    Login(LoginArgs),
    /// Forget the stored API token.
    Logout,
}

/// Errors surfaced by the CLI.
#[derive(Debug)]
pub enum Error {
    /// Error raised by the fleet client library.
    Fleet(fleet::common::errors::Error),
    /// The user interrupted the operation.
    Interrupted,
    /// Any other failure.
    Generic(anyhow::Error),
}

impl From<fleet::common::errors::Error> for Error {
    fn from(error: fleet::common::errors::Error) -> Self {
        Self::Fleet(error)
    }
}

impl From<fleet::common::errors::ValidationError> for Error {
    fn from(error: fleet::common::errors::ValidationError) -> Self {
        Self::Fleet(error.into())
    }
}

impl From<anyhow::Error> for Error {
    fn from(error: anyhow::Error) -> Self {
        Self::Generic(error)
    }
}

/// Everything an operation needs.
pub struct Context {
    pub repository: FleetRepository<FleetClient>,
    pub preferences: PreferencesStore,
    pub credentials: Credentials,
    pub output: output::OutputFormat,
}

/// Build the client, credentials and preferences from the command line.
pub fn init_context(args: &CliArgs) -> Result<Context, Error> {
    let dir = config_dir(args.config_dir.as_deref());
    let credentials = Credentials::load(&dir.join(constants::TOKEN_FILE_NAME), args.token.clone())?;
    let client = FleetClient::new(args.endpoint.as_str(), *args.timeout, credentials.clone())?;
    let repository = FleetRepository::new(client, *args.stale_time, Arc::new(ConsoleNotifier));
    let preferences = PreferencesStore::open(&dir.join(constants::PREFERENCES_FILE_NAME));
    Ok(Context {
        repository,
        preferences,
        credentials,
        output: args.output,
    })
}

impl Operations {
    pub async fn execute(self, context: &mut Context) -> Result<(), Error> {
        match self {
            Operations::Get(resources) => resources.execute(context).await,
            Operations::Compare(resources) => resources.execute(context).await,
            Operations::Sync(resources) => resources.execute(context).await,
            Operations::Create(resources) => resources.execute(context).await,
            Operations::Update(resources) => resources.execute(context).await,
            Operations::Delete(resources) => resources.execute(context).await,
            Operations::Use(resources) => resources.execute(context).await,
            Operations::Login(args) => args.execute(context),
            Operations::Logout => admin::logout(context),
        }
    }
}
