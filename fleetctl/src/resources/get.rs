use crate::resources::{
    output::{or_dash, print_json, print_table, OutputFormat},
    Context, Error,
};
use fleet::{
    api::models::{Id, ServiceFilters},
    common::utils::get_image_version,
};

/// Resources that can be listed.
#[derive(clap::Subcommand, Debug)]
pub enum GetResources {
    /// Get all sites.
    Sites,
    /// Get all environments.
    Environments,
    /// Get app instances, optionally of one environment.
    AppInstances {
        /// Only app instances of this environment.
        #[arg(long)]
        env: Option<Id>,
    },
    /// Get the services of an environment or app instance.
    Services(ServicesArgs),
    /// Get the sync history.
    SyncHistory {
        /// Only syncs targeting this environment.
        #[arg(long)]
        env: Option<Id>,
        /// Include per-service results.
        #[arg(long)]
        detailed: bool,
    },
}

/// Arguments of `get services`.
#[derive(clap::Args, Debug)]
pub struct ServicesArgs {
    /// Environment to list, defaults to the selected environment.
    #[arg(long, conflicts_with = "app_instance")]
    env: Option<Id>,
    /// App instance to list instead of an environment.
    #[arg(long)]
    app_instance: Option<Id>,
    /// Workload type filter.
    #[arg(long = "type")]
    workload_type: Option<String>,
    /// Name search filter.
    #[arg(long)]
    search: Option<String>,
}

impl GetResources {
    pub async fn execute(self, context: &Context) -> Result<(), Error> {
        let repository = &context.repository;
        let json = context.output == OutputFormat::Json;
        match self {
            GetResources::Sites => {
                let sites = repository.sites().await?;
                if json {
                    return Ok(print_json(&sites)?);
                }
                if sites.is_empty() {
                    return guidance(context).await;
                }
                let active = context.preferences.preferences().active_site_id.as_ref();
                let rows = sites
                    .into_iter()
                    .map(|site| {
                        let marker = if active == Some(&site.id) { "*" } else { "" };
                        vec![
                            marker.to_string(),
                            site.id.to_string(),
                            site.name,
                            site.kind.to_string(),
                            or_dash(site.url.as_deref()),
                        ]
                    })
                    .collect();
                print_table(&["", "ID", "NAME", "KIND", "URL"], rows);
            }
            GetResources::Environments => {
                let environments = repository.environments().await?;
                if json {
                    return Ok(print_json(&environments)?);
                }
                if environments.is_empty() {
                    return guidance(context).await;
                }
                let selected = context.preferences.preferences().selected_environment_id.as_ref();
                let rows = environments
                    .into_iter()
                    .map(|env| {
                        let marker = if selected == Some(&env.id) { "*" } else { "" };
                        vec![
                            marker.to_string(),
                            env.id.to_string(),
                            env.name,
                            or_dash(env.color.as_deref()),
                        ]
                    })
                    .collect();
                print_table(&["", "ID", "NAME", "COLOR"], rows);
            }
            GetResources::AppInstances { env } => {
                let instances = repository.app_instances(env.as_ref()).await?;
                if json {
                    return Ok(print_json(&instances)?);
                }
                if instances.is_empty() {
                    return guidance(context).await;
                }
                let rows = instances
                    .into_iter()
                    .map(|instance| {
                        vec![
                            instance.id.to_string(),
                            instance.name,
                            instance.cluster,
                            instance.namespace,
                            instance.cluster_type.to_string(),
                            instance.environment_id.to_string(),
                        ]
                    })
                    .collect();
                print_table(
                    &["ID", "NAME", "CLUSTER", "NAMESPACE", "TYPE", "ENVIRONMENT"],
                    rows,
                );
            }
            GetResources::Services(args) => {
                let filters = ServiceFilters {
                    workload_type: args.workload_type,
                    search: args.search,
                };
                let services = match (args.app_instance, args.env) {
                    (Some(instance), _) => {
                        repository.services_by_app_instance(&instance, &filters).await?
                    }
                    (None, env) => {
                        let env = env
                            .or_else(|| context.preferences.preferences().selected_environment_id.clone())
                            .ok_or_else(|| {
                                anyhow::anyhow!(
                                    "No environment given. Pass --env or select one with `fleetctl use environment`."
                                )
                            })?;
                        repository.services(&env, &filters).await?
                    }
                };
                if json {
                    return Ok(print_json(&services)?);
                }
                let rows = services
                    .into_iter()
                    .map(|service| {
                        vec![
                            service.id.to_string(),
                            service.name,
                            service.workload_type,
                            service.status,
                            format!("{}/{}", service.available_replicas, service.replicas),
                            get_image_version(&service.image_tag),
                            service.app_instance_id.to_string(),
                        ]
                    })
                    .collect();
                print_table(
                    &["ID", "NAME", "TYPE", "STATUS", "READY", "VERSION", "APP INSTANCE"],
                    rows,
                );
            }
            GetResources::SyncHistory { env, detailed: false } => {
                let history = repository.sync_history(env.as_ref()).await?;
                if json {
                    return Ok(print_json(&history)?);
                }
                let rows = history
                    .into_iter()
                    .map(|operation| {
                        vec![
                            operation.id.to_string(),
                            operation.source_environment_id.to_string(),
                            operation.target_environment_id.to_string(),
                            operation.service_ids.len().to_string(),
                            operation.status.to_string(),
                            operation.start_time.to_rfc3339(),
                            or_dash(operation.message.as_deref()),
                        ]
                    })
                    .collect();
                print_table(
                    &["ID", "SOURCE", "TARGET", "SERVICES", "STATUS", "STARTED", "MESSAGE"],
                    rows,
                );
            }
            GetResources::SyncHistory { env, detailed: true } => {
                let history = repository.sync_history_detailed(env.as_ref()).await?;
                if json {
                    return Ok(print_json(&history)?);
                }
                let rows = history
                    .into_iter()
                    .flat_map(|detail| {
                        let operation = detail.operation;
                        detail.results.into_iter().map(move |result| {
                            vec![
                                operation.id.to_string(),
                                operation.status.to_string(),
                                result.service_name,
                                result.target_app_instance_id.to_string(),
                                result.status.to_string(),
                                or_dash(result.message.as_deref()),
                            ]
                        })
                    })
                    .collect();
                print_table(
                    &["SYNC", "SYNC STATUS", "SERVICE", "TARGET", "STATUS", "MESSAGE"],
                    rows,
                );
            }
        }
        Ok(())
    }
}

/// Explain what to set up first when a listing is empty.
async fn guidance(context: &Context) -> Result<(), Error> {
    match context.repository.empty_state().await? {
        Some(state) => console_logger::info(state.guidance(), ""),
        None => console_logger::info("No resources found.", ""),
    }
    Ok(())
}
