use crate::resources::{output::print_json, Context, Error};
use fleet::{
    api::models::{AppInstanceForm, ClusterType, EnvironmentForm, Id},
    common::errors::ValidationError,
};

/// Fields of an environment.
#[derive(clap::Args, Debug)]
pub struct EnvironmentArgs {
    /// Environment name.
    #[arg(long)]
    name: String,
    /// Display color, e.g. "#1890ff".
    #[arg(long)]
    color: Option<String>,
}

impl From<EnvironmentArgs> for EnvironmentForm {
    fn from(args: EnvironmentArgs) -> Self {
        Self {
            name: args.name,
            color: args.color,
        }
    }
}

/// Fields of an app instance.
#[derive(clap::Args, Debug)]
pub struct AppInstanceArgs {
    /// App instance name.
    #[arg(long)]
    name: String,
    /// Cluster the app runs in.
    #[arg(long)]
    cluster: String,
    /// Namespace the app runs in.
    #[arg(long)]
    namespace: String,
    /// Kind of cluster: rancher or generic.
    #[arg(long, default_value = "rancher", value_parser = parse_cluster_type)]
    cluster_type: ClusterType,
    /// Environment the app instance belongs to.
    #[arg(long)]
    env: Id,
    /// Site the cluster is registered in, matching the cluster type.
    #[arg(long)]
    site: Option<Id>,
}

fn parse_cluster_type(value: &str) -> Result<ClusterType, String> {
    match value.to_lowercase().as_str() {
        "rancher" => Ok(ClusterType::Rancher),
        "generic" => Ok(ClusterType::Generic),
        other => Err(format!("unknown cluster type '{other}', expected rancher or generic")),
    }
}

impl From<AppInstanceArgs> for AppInstanceForm {
    fn from(args: AppInstanceArgs) -> Self {
        let (rancher_site_id, generic_cluster_site_id) = match args.cluster_type {
            ClusterType::Rancher => (args.site, None),
            ClusterType::Generic => (None, args.site),
        };
        Self {
            name: args.name,
            cluster: args.cluster,
            namespace: args.namespace,
            cluster_type: args.cluster_type,
            environment_id: args.env,
            rancher_site_id,
            generic_cluster_site_id,
        }
    }
}

/// Resources that can be created.
#[derive(clap::Subcommand, Debug)]
pub enum CreateResources {
    /// Create an environment.
    Environment(EnvironmentArgs),
    /// Create an app instance.
    AppInstance(AppInstanceArgs),
}

/// Resources that can be updated.
#[derive(clap::Subcommand, Debug)]
pub enum UpdateResources {
    /// Update an environment.
    Environment {
        /// Environment to update.
        id: Id,
        #[command(flatten)]
        args: EnvironmentArgs,
    },
    /// Update an app instance.
    AppInstance {
        /// App instance to update.
        id: Id,
        #[command(flatten)]
        args: AppInstanceArgs,
    },
}

/// Resources that can be deleted.
#[derive(clap::Subcommand, Debug)]
pub enum DeleteResources {
    /// Delete an environment.
    Environment {
        /// Environment to delete.
        id: Id,
    },
    /// Delete an app instance.
    AppInstance {
        /// App instance to delete.
        id: Id,
    },
}

/// Defaults remembered between invocations.
#[derive(clap::Subcommand, Debug)]
pub enum UseResources {
    /// Select the environment used when none is given.
    Environment {
        /// Environment to select.
        id: Id,
    },
    /// Select the active site.
    Site {
        /// Site to select.
        id: Id,
    },
}

/// Arguments of `login`.
#[derive(clap::Args, Debug)]
pub struct LoginArgs {
    /// API token to store, defaults to the one given with --token.
    #[arg(value_name = "TOKEN")]
    api_token: Option<String>,
}

impl CreateResources {
    pub async fn execute(self, context: &Context) -> Result<(), Error> {
        let repository = &context.repository;
        match self {
            CreateResources::Environment(args) => {
                let environment = repository.create_environment(&args.into()).await?;
                print_json(&environment)?;
            }
            CreateResources::AppInstance(args) => {
                let instance = repository.create_app_instance(&args.into()).await?;
                print_json(&instance)?;
            }
        }
        Ok(())
    }
}

impl UpdateResources {
    pub async fn execute(self, context: &Context) -> Result<(), Error> {
        let repository = &context.repository;
        match self {
            UpdateResources::Environment { id, args } => {
                let environment = repository.update_environment(&id, &args.into()).await?;
                print_json(&environment)?;
            }
            UpdateResources::AppInstance { id, args } => {
                let instance = repository.update_app_instance(&id, &args.into()).await?;
                print_json(&instance)?;
            }
        }
        Ok(())
    }
}

impl DeleteResources {
    pub async fn execute(self, context: &Context) -> Result<(), Error> {
        match self {
            DeleteResources::Environment { id } => {
                context.repository.delete_environment(&id).await?
            }
            DeleteResources::AppInstance { id } => {
                context.repository.delete_app_instance(&id).await?
            }
        }
        Ok(())
    }
}

impl UseResources {
    pub async fn execute(self, context: &mut Context) -> Result<(), Error> {
        match self {
            UseResources::Environment { id } => {
                let environment = context
                    .repository
                    .environments()
                    .await?
                    .into_iter()
                    .find(|env| env.id == id)
                    .ok_or_else(|| ValidationError::UnknownEnvironment { id: id.clone() })?;
                context.preferences.set_selected_environment(Some(id))?;
                console_logger::success(
                    &format!("Using environment \"{}\"", environment.name),
                    "",
                );
            }
            UseResources::Site { id } => {
                let site = context
                    .repository
                    .sites()
                    .await?
                    .into_iter()
                    .find(|site| site.id == id)
                    .ok_or_else(|| anyhow::anyhow!("Site {id} does not exist."))?;
                context.preferences.set_active_site(Some(id))?;
                console_logger::success(&format!("Using site \"{}\"", site.name), "");
            }
        }
        Ok(())
    }
}

impl LoginArgs {
    pub fn execute(self, context: &Context) -> Result<(), Error> {
        let token = self
            .api_token
            .or_else(|| context.credentials.token())
            .ok_or_else(|| anyhow::anyhow!("No token given. Run `fleetctl login <TOKEN>`."))?;
        context.credentials.store(token)?;
        console_logger::success("Token stored", "");
        Ok(())
    }
}

/// Forget the stored token.
pub fn logout(context: &Context) -> Result<(), Error> {
    context.credentials.clear()?;
    console_logger::success("Logged out", "");
    Ok(())
}
