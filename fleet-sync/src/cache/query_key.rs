use crate::api::models::{Id, ServiceFilters};
use std::fmt;

/// Resource families of the cache. Every key starts with one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Sites,
    Environments,
    AppInstances,
    Services,
    ServiceComparison,
    SyncHistory,
    ConfigMapComparison,
    ConfigMapDetails,
    SecretComparison,
}

impl Resource {
    fn as_str(&self) -> &'static str {
        match self {
            Resource::Sites => "sites",
            Resource::Environments => "environments",
            Resource::AppInstances => "app-instances",
            Resource::Services => "services",
            Resource::ServiceComparison => "service-comparison",
            Resource::SyncHistory => "sync-history",
            Resource::ConfigMapComparison => "configmap-comparison",
            Resource::ConfigMapDetails => "configmap-details",
            Resource::SecretComparison => "secret-comparison",
        }
    }
}

/// Hierarchical cache key: the resource first, then every parameter of the query.
///
/// Keys are only built through the constructors below so that two call sites asking for
/// the same data always produce the same key, and any parameter change produces a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    fn new(resource: Resource, parts: impl IntoIterator<Item = String>) -> Self {
        let mut segments = vec![resource.as_str().to_string()];
        segments.extend(parts);
        Self(segments)
    }

    /// Prefix matching every key of a resource family.
    pub fn root(resource: Resource) -> Self {
        Self::new(resource, Vec::<String>::new())
    }

    pub fn sites() -> Self {
        Self::new(Resource::Sites, ["list".to_string()])
    }

    pub fn environments() -> Self {
        Self::new(Resource::Environments, ["list".to_string()])
    }

    pub fn app_instances(environment_id: Option<&Id>) -> Self {
        Self::new(Resource::AppInstances, ["list".to_string(), optional(environment_id)])
    }

    pub fn services(environment_id: &Id, filters: &ServiceFilters) -> Self {
        let mut parts = vec!["env".to_string(), environment_id.to_string()];
        parts.extend(filter_parts(filters));
        Self::new(Resource::Services, parts)
    }

    pub fn services_by_app_instance(app_instance_id: &Id, filters: &ServiceFilters) -> Self {
        let mut parts = vec!["app-instance".to_string(), app_instance_id.to_string()];
        parts.extend(filter_parts(filters));
        Self::new(Resource::Services, parts)
    }

    pub fn service_comparison(source: &Id, target: &Id) -> Self {
        Self::new(Resource::ServiceComparison, pair(source, target))
    }

    pub fn sync_history(environment_id: Option<&Id>, detailed: bool) -> Self {
        let kind = if detailed { "detailed" } else { "list" };
        Self::new(Resource::SyncHistory, [kind.to_string(), optional(environment_id)])
    }

    pub fn configmap_comparison(source: &Id, target: &Id) -> Self {
        Self::new(Resource::ConfigMapComparison, pair(source, target))
    }

    pub fn configmap_details(name: &str, source: &Id, target: &Id) -> Self {
        let mut parts = vec![name.to_string()];
        parts.extend(pair(source, target));
        Self::new(Resource::ConfigMapDetails, parts)
    }

    pub fn secret_comparison(source: &Id, target: &Id) -> Self {
        Self::new(Resource::SecretComparison, pair(source, target))
    }

    /// True when `prefix` is this key or one of its ancestors.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

fn optional(id: Option<&Id>) -> String {
    id.map(|id| id.to_string()).unwrap_or_else(|| "*".to_string())
}

fn pair(source: &Id, target: &Id) -> [String; 2] {
    [source.to_string(), target.to_string()]
}

fn filter_parts(filters: &ServiceFilters) -> [String; 2] {
    [
        format!("type={}", filters.workload_type.as_deref().unwrap_or("")),
        format!("search={}", filters.search.as_deref().unwrap_or("")),
    ]
}
