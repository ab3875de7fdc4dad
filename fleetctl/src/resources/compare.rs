use crate::resources::{
    output::{or_dash, print_json, print_table, status_tag, OutputFormat},
    Context, Error,
};
use fleet::{
    api::models::{ComparisonReport, ConfigMapSnapshot, Id, SecretSnapshot, Service},
    common::utils::get_image_version,
    compare::{classification::classify, configmap_keys::key_status},
    picker::{EnvironmentNode, InstanceTree},
};

/// Source and target app instances of a comparison.
#[derive(clap::Args, Debug)]
pub struct InstancePair {
    /// Source app instance.
    #[arg(long)]
    pub source: Id,
    /// Target app instance.
    #[arg(long)]
    pub target: Id,
}

/// Resources that can be compared between two app instances.
#[derive(clap::Subcommand, Debug)]
pub enum CompareResources {
    /// List app instances to compare, grouped by environment.
    Instances {
        /// Source already chosen; lists the possible targets.
        #[arg(long)]
        source: Option<Id>,
        /// Case insensitive filter on "name (cluster/namespace)".
        #[arg(long, default_value = "")]
        filter: String,
    },
    /// Compare services.
    Services(InstancePair),
    /// Compare ConfigMaps.
    Configmaps(InstancePair),
    /// Compare Secrets by name and keys.
    Secrets(InstancePair),
    /// Compare the keys of one ConfigMap.
    Configmap {
        /// ConfigMap name.
        name: String,
        #[command(flatten)]
        pair: InstancePair,
    },
}

impl CompareResources {
    pub async fn execute(self, context: &Context) -> Result<(), Error> {
        let repository = &context.repository;
        let json = context.output == OutputFormat::Json;
        match self {
            CompareResources::Instances { source, filter } => {
                let tree = InstanceTree::new(
                    repository.environments().await?,
                    repository.app_instances(None).await?,
                );
                let nodes = match source {
                    Some(source) => tree.target_options(Some(&source), &filter),
                    None => tree.source_options(&filter),
                };
                print_tree(&nodes);
            }
            CompareResources::Services(pair) => {
                let report = repository.compare_services(&pair.source, &pair.target).await?;
                if json {
                    return Ok(print_json(&report)?);
                }
                print_report(&report, |service: &Service| get_image_version(&service.image_tag));
            }
            CompareResources::Configmaps(pair) => {
                let report = repository
                    .compare_configmaps(&pair.source, &pair.target)
                    .await?;
                if json {
                    return Ok(print_json(&report)?);
                }
                print_report(&report, |configmap: &ConfigMapSnapshot| format!("{} keys", configmap.data.len()));
            }
            CompareResources::Secrets(pair) => {
                let report = repository.compare_secrets(&pair.source, &pair.target).await?;
                if json {
                    return Ok(print_json(&report)?);
                }
                print_report(&report, |secret: &SecretSnapshot| {
                    format!("{} ({} keys)", secret.secret_type, secret.keys.len())
                });
            }
            CompareResources::Configmap { name, pair } => {
                let table = repository
                    .configmap_key_table(&name, &pair.source, &pair.target)
                    .await?;
                if json {
                    return Ok(print_json(&table.rows())?);
                }
                let rows = table
                    .rows()
                    .iter()
                    .map(|row| {
                        let status = key_status(row.source_value.as_deref(), row.target_value.as_deref());
                        vec![
                            status_tag(status.into()),
                            row.key.clone(),
                            or_dash(row.source_value.as_deref()),
                            or_dash(row.target_value.as_deref()),
                        ]
                    })
                    .collect();
                print_table(&["STATUS", "KEY", "SOURCE", "TARGET"], rows);
            }
        }
        Ok(())
    }
}

fn print_tree(nodes: &[EnvironmentNode]) {
    if nodes.is_empty() {
        console_logger::info("No matching app instances.", "");
        return;
    }
    for node in nodes {
        println!("{} [{}]", node.name, node.id);
        for instance in &node.instances {
            println!("  {:>6}  {}", instance.id, instance.label);
        }
    }
}

/// Print the summary line then every record, actionable groups first.
fn print_report<T, F>(report: &ComparisonReport<T>, describe: F)
where
    F: Fn(&T) -> String,
{
    let summary = report.effective_summary();
    println!(
        "{} total, {} identical, {} different, {} missing in source, {} missing in target",
        summary.total,
        summary.identical,
        summary.different,
        summary.missing_in_source,
        summary.missing_in_target
    );
    let rows = report
        .grouped()
        .into_iter()
        .flat_map(|(_, records)| records)
        .map(|record| {
            let changed = record.changed_fields();
            vec![
                status_tag(classify(record)),
                record.name.clone(),
                or_dash(record.source.as_ref().map(&describe).as_deref()),
                or_dash(record.target.as_ref().map(&describe).as_deref()),
                if changed.is_empty() {
                    "-".to_string()
                } else {
                    changed.join(", ")
                },
            ]
        })
        .collect();
    print_table(&["STATUS", "NAME", "SOURCE", "TARGET", "CHANGED"], rows);
}
