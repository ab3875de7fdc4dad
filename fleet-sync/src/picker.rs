use crate::api::models::{AppInstance, Environment, Id};

/// One selectable app instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceNode {
    pub id: Id,
    pub label: String,
}

/// An environment with its app instances. Environments are group headers, not selectable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentNode {
    pub id: Id,
    pub name: String,
    pub instances: Vec<InstanceNode>,
}

/// Environment to app instance tree used to pick the source and target of a comparison.
#[derive(Debug, Clone, Default)]
pub struct InstanceTree {
    environments: Vec<Environment>,
    instances: Vec<AppInstance>,
}

impl InstanceTree {
    pub fn new(environments: Vec<Environment>, instances: Vec<AppInstance>) -> Self {
        Self {
            environments,
            instances,
        }
    }

    pub fn instance(&self, id: &Id) -> Option<&AppInstance> {
        self.instances.iter().find(|instance| &instance.id == id)
    }

    /// Every app instance whose label matches `filter`.
    pub fn source_options(&self, filter: &str) -> Vec<EnvironmentNode> {
        self.build(None, filter)
    }

    /// Like [`InstanceTree::source_options`] without the instance chosen as source.
    pub fn target_options(&self, source: Option<&Id>, filter: &str) -> Vec<EnvironmentNode> {
        self.build(source, filter)
    }

    fn build(&self, exclude: Option<&Id>, filter: &str) -> Vec<EnvironmentNode> {
        let filter = filter.trim().to_lowercase();
        self.environments
            .iter()
            .filter_map(|environment| {
                let instances = self
                    .instances
                    .iter()
                    .filter(|instance| instance.environment_id == environment.id)
                    .filter(|instance| Some(&instance.id) != exclude)
                    .map(|instance| InstanceNode {
                        id: instance.id.clone(),
                        label: instance.label(),
                    })
                    .filter(|node| filter.is_empty() || node.label.to_lowercase().contains(&filter))
                    .collect::<Vec<_>>();
                (!instances.is_empty()).then(|| EnvironmentNode {
                    id: environment.id.clone(),
                    name: environment.name.clone(),
                    instances,
                })
            })
            .collect()
    }
}
