use crate::{
    resources::{compare::InstancePair, output::print_table, Context, Error},
    user_prompt::{confirm, SYNC_DECLINED, SYNC_HISTORY_HINT, SYNC_INTERRUPTED},
};
use fleet::{
    api::models::Id,
    common::utils::plural,
    sync::wizard::{OutcomeStatus, SyncWizard, TargetMode},
};

/// What can be synced.
#[derive(clap::Subcommand, Debug)]
pub enum SyncResources {
    /// Sync services from one environment to another.
    Services(SyncServicesArgs),
    /// Sync the source value of one ConfigMap key to the target.
    ConfigmapKey {
        /// ConfigMap name.
        name: String,
        #[command(flatten)]
        pair: InstancePair,
        /// Key to sync.
        #[arg(long)]
        key: String,
    },
    /// Sync several ConfigMap keys to the target.
    ConfigmapKeys {
        /// ConfigMap name.
        name: String,
        #[command(flatten)]
        pair: InstancePair,
        /// Keys to sync.
        #[arg(long = "key", required_unless_present = "all")]
        keys: Vec<String>,
        /// Sync every key that has a source value.
        #[arg(long, conflicts_with = "keys")]
        all: bool,
        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },
}

/// Arguments of `sync services`.
#[derive(clap::Args, Debug)]
pub struct SyncServicesArgs {
    /// Source environment, defaults to the selected environment.
    #[arg(long)]
    source_env: Option<Id>,
    /// Target environment.
    #[arg(long)]
    target_env: Id,
    /// Services to sync.
    #[arg(long = "service", required = true)]
    services: Vec<Id>,
    /// Target app instances; every service is synced to each of them.
    #[arg(long = "target-instance", conflicts_with = "mappings")]
    target_instances: Vec<Id>,
    /// One destination per service, as SERVICE=INSTANCE.
    #[arg(long = "map", value_parser = parse_mapping)]
    mappings: Vec<(Id, Id)>,
    /// Skip the confirmation prompt.
    #[arg(long, short)]
    yes: bool,
}

fn parse_mapping(value: &str) -> Result<(Id, Id), String> {
    let (service, instance) = value
        .split_once('=')
        .ok_or_else(|| format!("expected SERVICE=INSTANCE, got '{value}'"))?;
    let parse = |id: &str| match id.trim() {
        "" => Err(format!("expected SERVICE=INSTANCE, got '{value}'")),
        id => id
            .parse::<Id>()
            .map_err(|error| format!("invalid id '{id}': {error}")),
    };
    Ok((parse(service)?, parse(instance)?))
}

impl SyncResources {
    pub async fn execute(self, context: &Context) -> Result<(), Error> {
        match self {
            SyncResources::Services(args) => args.execute(context).await,
            SyncResources::ConfigmapKey { name, pair, key } => {
                let repository = &context.repository;
                let mut table = repository
                    .configmap_key_table(&name, &pair.source, &pair.target)
                    .await?;
                repository.sync_configmap_key(&mut table, &key).await?;
                Ok(())
            }
            SyncResources::ConfigmapKeys {
                name,
                pair,
                keys,
                all,
                yes,
            } => {
                let repository = &context.repository;
                let mut table = repository
                    .configmap_key_table(&name, &pair.source, &pair.target)
                    .await?;
                if all {
                    table.set_all(true);
                } else {
                    for key in &keys {
                        table.toggle(key)?;
                    }
                }
                let request = table.multi_key_request()?;
                let message = format!(
                    "{} of ConfigMap \"{}\" will be overwritten in app instance {}: {}",
                    plural(request.keys.len(), "key"),
                    name,
                    pair.target,
                    request.keys.keys().cloned().collect::<Vec<_>>().join(", ")
                );
                if !confirm("Confirm ConfigMap Sync", &message, yes).await? {
                    console_logger::info(SYNC_DECLINED, "");
                    return Ok(());
                }
                repository.sync_configmap_keys(&mut table).await?;
                let remaining = table.rows().iter().filter(|row| !row.identical).count();
                if remaining > 0 {
                    console_logger::info(
                        &format!("{} still differ.", plural(remaining, "key")),
                        "",
                    );
                }
                Ok(())
            }
        }
    }
}

impl SyncServicesArgs {
    async fn execute(self, context: &Context) -> Result<(), Error> {
        let repository = &context.repository;
        let source = self
            .source_env
            .or_else(|| context.preferences.preferences().selected_environment_id.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No source environment given. Pass --source-env or select one with `fleetctl use environment`."
                )
            })?;
        let mode = if self.mappings.is_empty() {
            TargetMode::FanOut
        } else {
            TargetMode::Mapping
        };

        let mut wizard = repository
            .open_sync_wizard(&source, &self.services, mode)
            .await?;
        wizard.select_target(self.target_env)?;
        wizard.next()?;
        repository.load_target_instances(&mut wizard).await?;
        match mode {
            TargetMode::Mapping => {
                for (service, instance) in self.mappings {
                    wizard.map_service(service, instance)?;
                }
            }
            TargetMode::FanOut => {
                for instance in self.target_instances {
                    wizard.toggle_target_instance(instance)?;
                }
            }
        }
        if let Err(error) = wizard.next() {
            console_logger::warn("Cannot continue", &error.to_string());
            print_target_instances(&wizard);
            return Err(error.into());
        }

        print_review(&wizard)?;
        let prompt = wizard.confirmation()?;
        if !confirm(&prompt.title, &prompt.message, self.yes).await? {
            wizard.cancel()?;
            console_logger::info(SYNC_DECLINED, "");
            return Ok(());
        }

        let outcome = tokio::select! {
            biased;
            outcome = repository.submit_sync(&mut wizard, true) => outcome?,
            _ = tokio::signal::ctrl_c() => {
                console_logger::warn("Sync interrupted", SYNC_INTERRUPTED);
                return Err(Error::Interrupted);
            }
        };
        match outcome.status {
            OutcomeStatus::Completed => Ok(()),
            OutcomeStatus::Partial => {
                console_logger::info(SYNC_HISTORY_HINT, "");
                Ok(())
            }
            OutcomeStatus::Failed => Err(anyhow::anyhow!(
                "The sync did not complete. {SYNC_HISTORY_HINT}"
            )
            .into()),
        }
    }
}

fn print_target_instances(wizard: &SyncWizard) {
    let rows = wizard
        .target_instances()
        .iter()
        .map(|instance| vec![instance.id.to_string(), instance.label()])
        .collect::<Vec<_>>();
    if !rows.is_empty() {
        println!("\nApp instances of the target environment:");
        print_table(&["ID", "APP INSTANCE"], rows);
    }
}

fn print_review(wizard: &SyncWizard) -> Result<(), Error> {
    let review = wizard.review()?;
    println!(
        "Sync from \"{}\" to \"{}\": {}",
        review.source_environment, review.target_environment, review.operations_label
    );
    let rows = review
        .rows
        .into_iter()
        .map(|row| {
            vec![
                row.service,
                row.current_version,
                row.destinations.join(", "),
            ]
        })
        .collect();
    print_table(&["SERVICE", "VERSION", "DESTINATIONS"], rows);
    Ok(())
}
