use crate::{
    api::{
        http_client::FleetApi,
        models::{
            AppInstance, AppInstanceForm, ComparisonReport, ConfigMapDetails, ConfigMapSnapshot,
            Environment, EnvironmentForm, Id, SecretSnapshot, Service, ServiceFilters, Site,
            SyncAck, SyncOperation, SyncOperationDetail,
        },
    },
    cache::{
        query_cache::{Cached, QueryCache},
        query_key::{QueryKey, Resource},
    },
    common::errors::{self, Error, Result, ValidationError},
    notify::{Notification, Notifier},
    sync::{
        configmap_keys::KeySyncTable,
        in_flight::InFlight,
        wizard::{SyncOutcome, SyncWizard, TargetMode},
    },
};
use serde::{de::DeserializeOwned, Serialize};
use std::{future::Future, sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

const ENVIRONMENT_MUTATION: &[Resource] = &[Resource::Environments, Resource::AppInstances];
const APP_INSTANCE_MUTATION: &[Resource] = &[
    Resource::AppInstances,
    Resource::Services,
    Resource::ServiceComparison,
    Resource::ConfigMapComparison,
    Resource::ConfigMapDetails,
    Resource::SecretComparison,
];
const SERVICE_SYNC: &[Resource] = &[
    Resource::Services,
    Resource::ServiceComparison,
    Resource::SyncHistory,
];
const CONFIGMAP_SYNC: &[Resource] = &[Resource::ConfigMapDetails, Resource::ConfigMapComparison];

/// A missing prerequisite, reported as guidance rather than as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    NoEnvironments,
    NoSites,
    NoAppInstances,
}

impl EmptyState {
    /// What the user should do next.
    pub fn guidance(&self) -> &'static str {
        match self {
            EmptyState::NoEnvironments => {
                "No environments yet. Create one with `fleetctl create environment`."
            }
            EmptyState::NoSites => {
                "No sites are registered. Register a Rancher or generic cluster site before adding app instances."
            }
            EmptyState::NoAppInstances => {
                "No app instances yet. Add one to an environment with `fleetctl create app-instance`."
            }
        }
    }
}

/// Cached reads and pessimistic mutations against the fleet backend.
///
/// Reads serve fresh cache entries, refetch stale ones and fall back to stale data when the
/// refetch fails. Mutations call the backend first, then invalidate and notify.
pub struct FleetRepository<A> {
    api: A,
    cache: QueryCache,
    in_flight: InFlight,
    notifier: Arc<dyn Notifier>,
}

impl<A: FleetApi> FleetRepository<A> {
    pub fn new(api: A, stale_time: Duration, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            cache: QueryCache::new(stale_time),
            in_flight: InFlight::new(),
            notifier,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    async fn cached<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let stale = match self.cache.get::<T>(&key) {
            Some(Cached { data, stale: false }) => {
                debug!(%key, "cache hit");
                return Ok(data);
            }
            cached => cached,
        };
        match fetch().await {
            Ok(data) => {
                self.cache.insert(key, &data);
                Ok(data)
            }
            Err(error @ Error::Unauthorized { .. }) => Err(error),
            Err(error) => match stale {
                Some(Cached { data, .. }) => {
                    warn!(%key, %error, "refetch failed, serving stale data");
                    Ok(data)
                }
                None => Err(error),
            },
        }
    }

    fn invalidate(&self, resources: &[Resource]) {
        for resource in resources {
            self.cache.invalidate(&QueryKey::root(*resource));
        }
    }

    async fn mutate<T, Fut>(
        &self,
        action: &str,
        invalidates: &[Resource],
        success: Notification,
        request: Fut,
    ) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        match request.await {
            Ok(value) => {
                info!(action, "mutation succeeded");
                self.invalidate(invalidates);
                self.notifier.notify(success);
                Ok(value)
            }
            Err(error) => {
                error!(action, %error, "mutation failed");
                self.notifier.notify(
                    Notification::error(format!("Failed to {action}"))
                        .with_detail(error.user_message()),
                );
                Err(error)
            }
        }
    }

    pub async fn sites(&self) -> Result<Vec<Site>> {
        self.cached(QueryKey::sites(), || self.api.list_sites())
            .await
    }

    pub async fn environments(&self) -> Result<Vec<Environment>> {
        self.cached(QueryKey::environments(), || self.api.list_environments())
            .await
    }

    pub async fn app_instances(&self, environment_id: Option<&Id>) -> Result<Vec<AppInstance>> {
        self.cached(QueryKey::app_instances(environment_id), || {
            self.api.list_app_instances(environment_id)
        })
        .await
    }

    pub async fn services(&self, environment_id: &Id, filters: &ServiceFilters) -> Result<Vec<Service>> {
        self.cached(QueryKey::services(environment_id, filters), || {
            self.api.list_services(environment_id, filters)
        })
        .await
    }

    pub async fn services_by_app_instance(
        &self,
        app_instance_id: &Id,
        filters: &ServiceFilters,
    ) -> Result<Vec<Service>> {
        self.cached(
            QueryKey::services_by_app_instance(app_instance_id, filters),
            || self.api.list_services_by_app_instance(app_instance_id, filters),
        )
        .await
    }

    pub async fn sync_history(&self, environment_id: Option<&Id>) -> Result<Vec<SyncOperation>> {
        self.cached(QueryKey::sync_history(environment_id, false), || {
            self.api.sync_history(environment_id)
        })
        .await
    }

    pub async fn sync_history_detailed(
        &self,
        environment_id: Option<&Id>,
    ) -> Result<Vec<SyncOperationDetail>> {
        self.cached(QueryKey::sync_history(environment_id, true), || {
            self.api.sync_history_detailed(environment_id)
        })
        .await
    }

    fn distinct(source: &Id, target: &Id) -> Result<()> {
        if source == target {
            return Err(ValidationError::TargetIsSource.into());
        }
        Ok(())
    }

    pub async fn compare_services(&self, source: &Id, target: &Id) -> Result<ComparisonReport<Service>> {
        Self::distinct(source, target)?;
        self.cached(QueryKey::service_comparison(source, target), || {
            self.api.compare_services(source, target)
        })
        .await
    }

    pub async fn compare_configmaps(
        &self,
        source: &Id,
        target: &Id,
    ) -> Result<ComparisonReport<ConfigMapSnapshot>> {
        Self::distinct(source, target)?;
        self.cached(QueryKey::configmap_comparison(source, target), || {
            self.api.compare_configmaps(source, target)
        })
        .await
    }

    pub async fn compare_secrets(
        &self,
        source: &Id,
        target: &Id,
    ) -> Result<ComparisonReport<SecretSnapshot>> {
        Self::distinct(source, target)?;
        self.cached(QueryKey::secret_comparison(source, target), || {
            self.api.compare_secrets(source, target)
        })
        .await
    }

    pub async fn configmap_details(&self, name: &str, source: &Id, target: &Id) -> Result<ConfigMapDetails> {
        Self::distinct(source, target)?;
        self.cached(QueryKey::configmap_details(name, source, target), || {
            self.api.configmap_details(name, source, target)
        })
        .await
    }

    /// The first missing prerequisite, if any.
    pub async fn empty_state(&self) -> Result<Option<EmptyState>> {
        if self.environments().await?.is_empty() {
            return Ok(Some(EmptyState::NoEnvironments));
        }
        if self.sites().await?.is_empty() {
            return Ok(Some(EmptyState::NoSites));
        }
        if self.app_instances(None).await?.is_empty() {
            return Ok(Some(EmptyState::NoAppInstances));
        }
        Ok(None)
    }

    pub async fn create_environment(&self, form: &EnvironmentForm) -> Result<Environment> {
        form.validate()?;
        self.mutate(
            "create environment",
            ENVIRONMENT_MUTATION,
            Notification::success(format!("Environment \"{}\" created", form.name)),
            self.api.create_environment(form),
        )
        .await
    }

    pub async fn update_environment(&self, id: &Id, form: &EnvironmentForm) -> Result<Environment> {
        form.validate()?;
        self.mutate(
            "update environment",
            ENVIRONMENT_MUTATION,
            Notification::success(format!("Environment \"{}\" updated", form.name)),
            self.api.update_environment(id, form),
        )
        .await
    }

    pub async fn delete_environment(&self, id: &Id) -> Result<()> {
        self.mutate(
            "delete environment",
            ENVIRONMENT_MUTATION,
            Notification::success(format!("Environment {id} deleted")),
            self.api.delete_environment(id),
        )
        .await
    }

    pub async fn create_app_instance(&self, form: &AppInstanceForm) -> Result<AppInstance> {
        form.validate()?;
        self.mutate(
            "create app instance",
            APP_INSTANCE_MUTATION,
            Notification::success(format!("App instance \"{}\" created", form.name)),
            self.api.create_app_instance(form),
        )
        .await
    }

    pub async fn update_app_instance(&self, id: &Id, form: &AppInstanceForm) -> Result<AppInstance> {
        form.validate()?;
        self.mutate(
            "update app instance",
            APP_INSTANCE_MUTATION,
            Notification::success(format!("App instance \"{}\" updated", form.name)),
            self.api.update_app_instance(id, form),
        )
        .await
    }

    pub async fn delete_app_instance(&self, id: &Id) -> Result<()> {
        self.mutate(
            "delete app instance",
            APP_INSTANCE_MUTATION,
            Notification::success(format!("App instance {id} deleted")),
            self.api.delete_app_instance(id),
        )
        .await
    }

    /// Open the sync wizard for the given services of `source_environment_id`.
    pub async fn open_sync_wizard(
        &self,
        source_environment_id: &Id,
        service_ids: &[Id],
        mode: TargetMode,
    ) -> Result<SyncWizard> {
        let environments = self.environments().await?;
        let source = environments
            .iter()
            .find(|env| &env.id == source_environment_id)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownEnvironment {
                id: source_environment_id.clone(),
            })?;
        let services = self
            .services(source_environment_id, &ServiceFilters::default())
            .await?;
        let mut selected = Vec::with_capacity(service_ids.len());
        for id in service_ids {
            let service = services
                .iter()
                .find(|service| &service.id == id)
                .cloned()
                .ok_or_else(|| ValidationError::UnknownService { id: id.clone() })?;
            selected.push(service);
        }
        Ok(SyncWizard::open(source, &environments, selected, mode)?)
    }

    /// Fetch the app instances of the wizard's target environment into the wizard.
    pub async fn load_target_instances(&self, wizard: &mut SyncWizard) -> Result<()> {
        let target = wizard
            .selection()
            .target_environment_id
            .clone()
            .ok_or(ValidationError::NoTargetEnvironment)?;
        let instances = self.app_instances(Some(&target)).await?;
        wizard.set_target_instances(instances);
        Ok(())
    }

    /// Submit the wizard's sync. The wizard is closed once the backend answers or the request
    /// fails; related caches are invalidated whenever the backend answered.
    pub async fn submit_sync(&self, wizard: &mut SyncWizard, confirmed: bool) -> Result<SyncOutcome> {
        let action = wizard.action_key();
        let Some(_guard) = self.in_flight.try_begin(action.as_str()) else {
            return errors::DuplicateSubmission { action }.fail();
        };
        let request = wizard.begin_submit(confirmed)?;
        let result = self.api.sync_services(&request).await;
        let answered = match &result {
            Ok(operation) => {
                info!(id = %operation.id, status = %operation.status, "sync accepted");
                true
            }
            Err(error) => {
                error!(%error, "sync request failed");
                matches!(error, Error::HttpStatus { .. })
            }
        };
        if answered {
            self.invalidate(SERVICE_SYNC);
        }
        let outcome = wizard.finish(result)?;
        self.notifier.notify(outcome.notification.clone());
        Ok(outcome)
    }

    /// Load the key-level comparison of one ConfigMap.
    pub async fn configmap_key_table(&self, name: &str, source: &Id, target: &Id) -> Result<KeySyncTable> {
        let details = self.configmap_details(name, source, target).await?;
        Ok(KeySyncTable::new(name, source.clone(), target.clone(), details.keys))
    }

    /// Sync one key's source value to the target, then refresh the table.
    pub async fn sync_configmap_key(&self, table: &mut KeySyncTable, key: &str) -> Result<SyncAck> {
        let request = table.single_key_request(key)?;
        let action = format!("sync-configmap:{}:{}", request.config_map_name, key);
        let Some(_guard) = self.in_flight.try_begin(action.as_str()) else {
            return errors::DuplicateSubmission { action }.fail();
        };
        let ack = self
            .settle_configmap_sync(
                &format!("sync key \"{key}\""),
                self.api.sync_configmap_key(&request),
            )
            .await?;
        self.refresh_table(table).await;
        Ok(ack)
    }

    /// Sync every selected key with a source value, then clear the selection and refresh.
    pub async fn sync_configmap_keys(&self, table: &mut KeySyncTable) -> Result<SyncAck> {
        let request = table.multi_key_request()?;
        let action = format!("sync-configmap:{}:*", request.config_map_name);
        let Some(_guard) = self.in_flight.try_begin(action.as_str()) else {
            return errors::DuplicateSubmission { action }.fail();
        };
        let ack = self
            .settle_configmap_sync(
                &format!("sync {} keys", request.keys.len()),
                self.api.sync_configmap_keys(&request),
            )
            .await?;
        table.clear_selection();
        self.refresh_table(table).await;
        Ok(ack)
    }

    async fn settle_configmap_sync<Fut>(&self, action: &str, request: Fut) -> Result<SyncAck>
    where
        Fut: Future<Output = Result<SyncAck>>,
    {
        let result = request.await;
        if !matches!(
            result,
            Err(Error::WriteRequest { .. } | Error::Unauthorized { .. })
        ) {
            self.invalidate(CONFIGMAP_SYNC);
        }
        let result = result.and_then(|ack| {
            if ack.success {
                Ok(ack)
            } else {
                errors::SyncRejected {
                    action,
                    message: ack.message,
                }
                .fail()
            }
        });
        match &result {
            Ok(ack) => {
                info!(action, "ConfigMap sync succeeded");
                self.notifier.notify(
                    Notification::success("ConfigMap synced")
                        .with_detail(ack.message.clone().unwrap_or_else(|| format!("Done: {action}"))),
                );
            }
            Err(error) => {
                error!(action, %error, "ConfigMap sync failed");
                self.notifier.notify(
                    Notification::error("ConfigMap sync failed").with_detail(error.user_message()),
                );
            }
        }
        result
    }

    async fn refresh_table(&self, table: &mut KeySyncTable) {
        let (name, source, target) = table.identity();
        match self.configmap_details(&name, &source, &target).await {
            Ok(details) => table.refresh(details.keys),
            Err(error) => warn!(%error, configmap = %name, "failed to refresh key comparison"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::models::{ConfigMapKeySyncRequest, ConfigMapKeysSyncRequest, SyncRequest},
        notify::MemoryNotifier,
    };
    use async_trait::async_trait;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    /// Backend with a fixed environment list that can be switched to failing.
    #[derive(Default)]
    struct FlakyApi {
        environments: Mutex<Vec<Environment>>,
        calls: AtomicUsize,
        failing: Mutex<bool>,
    }

    impl FlakyApi {
        fn fail(&self) -> Result<()> {
            if *self.failing.lock().unwrap() {
                return Err(Error::HttpStatus {
                    path: "/api".to_string(),
                    status: 503,
                    message: Some("maintenance".to_string()),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl FleetApi for FlakyApi {
        async fn list_sites(&self) -> Result<Vec<Site>> {
            Ok(vec![])
        }
        async fn list_environments(&self) -> Result<Vec<Environment>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.fail()?;
            Ok(self.environments.lock().unwrap().clone())
        }
        async fn create_environment(&self, form: &EnvironmentForm) -> Result<Environment> {
            self.fail()?;
            let environment = Environment {
                id: Id::from(9),
                name: form.name.clone(),
                color: form.color.clone(),
            };
            self.environments.lock().unwrap().push(environment.clone());
            Ok(environment)
        }
        async fn update_environment(&self, _: &Id, _: &EnvironmentForm) -> Result<Environment> {
            unimplemented!()
        }
        async fn delete_environment(&self, _: &Id) -> Result<()> {
            unimplemented!()
        }
        async fn list_app_instances(&self, _: Option<&Id>) -> Result<Vec<AppInstance>> {
            Ok(vec![])
        }
        async fn create_app_instance(&self, _: &AppInstanceForm) -> Result<AppInstance> {
            unimplemented!()
        }
        async fn update_app_instance(&self, _: &Id, _: &AppInstanceForm) -> Result<AppInstance> {
            unimplemented!()
        }
        async fn delete_app_instance(&self, _: &Id) -> Result<()> {
            unimplemented!()
        }
        async fn list_services(&self, _: &Id, _: &ServiceFilters) -> Result<Vec<Service>> {
            Ok(vec![])
        }
        async fn list_services_by_app_instance(
            &self,
            _: &Id,
            _: &ServiceFilters,
        ) -> Result<Vec<Service>> {
            Ok(vec![])
        }
        async fn compare_services(&self, _: &Id, _: &Id) -> Result<ComparisonReport<Service>> {
            unimplemented!()
        }
        async fn sync_services(&self, _: &SyncRequest) -> Result<SyncOperation> {
            unimplemented!()
        }
        async fn sync_history(&self, _: Option<&Id>) -> Result<Vec<SyncOperation>> {
            Ok(vec![])
        }
        async fn sync_history_detailed(&self, _: Option<&Id>) -> Result<Vec<SyncOperationDetail>> {
            Ok(vec![])
        }
        async fn compare_configmaps(
            &self,
            _: &Id,
            _: &Id,
        ) -> Result<ComparisonReport<ConfigMapSnapshot>> {
            unimplemented!()
        }
        async fn configmap_details(&self, _: &str, _: &Id, _: &Id) -> Result<ConfigMapDetails> {
            unimplemented!()
        }
        async fn sync_configmap_key(&self, _: &ConfigMapKeySyncRequest) -> Result<SyncAck> {
            unimplemented!()
        }
        async fn sync_configmap_keys(&self, _: &ConfigMapKeysSyncRequest) -> Result<SyncAck> {
            unimplemented!()
        }
        async fn compare_secrets(&self, _: &Id, _: &Id) -> Result<ComparisonReport<SecretSnapshot>> {
            unimplemented!()
        }
    }

    fn repository(stale_time: Duration) -> (FleetRepository<FlakyApi>, Arc<MemoryNotifier>) {
        let notifier = Arc::new(MemoryNotifier::default());
        let api = FlakyApi::default();
        api.environments.lock().unwrap().push(Environment {
            id: Id::from(1),
            name: "Dev".to_string(),
            color: None,
        });
        (FleetRepository::new(api, stale_time, notifier.clone()), notifier)
    }

    #[tokio::test]
    async fn fresh_reads_are_served_from_cache() {
        let (repository, _) = repository(Duration::from_secs(60));
        repository.environments().await.unwrap();
        repository.environments().await.unwrap();
        assert_eq!(repository.api().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_data_is_served_when_refetch_fails() {
        let (repository, _) = repository(Duration::ZERO);
        let first = repository.environments().await.unwrap();
        *repository.api().failing.lock().unwrap() = true;
        assert_eq!(repository.environments().await.unwrap(), first);
        assert_eq!(repository.api().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn successful_mutation_invalidates_and_notifies() {
        let (repository, notifier) = repository(Duration::from_secs(60));
        repository.environments().await.unwrap();

        repository
            .create_environment(&EnvironmentForm {
                name: "Staging".to_string(),
                color: None,
            })
            .await
            .unwrap();

        assert!(!repository.cache().is_fresh(&QueryKey::environments()));
        assert_eq!(repository.environments().await.unwrap().len(), 2);
        assert_eq!(notifier.levels(), vec![crate::notify::Level::Success]);
    }

    #[tokio::test]
    async fn failed_mutation_surfaces_the_server_message() {
        let (repository, notifier) = repository(Duration::from_secs(60));
        repository.environments().await.unwrap();
        *repository.api().failing.lock().unwrap() = true;

        let result = repository
            .create_environment(&EnvironmentForm {
                name: "Staging".to_string(),
                color: None,
            })
            .await;
        assert!(result.is_err());
        assert!(repository.cache().is_fresh(&QueryKey::environments()));
        let received = notifier.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].detail, "maintenance");
    }

    #[tokio::test]
    async fn invalid_forms_are_not_submitted() {
        let (repository, notifier) = repository(Duration::from_secs(60));
        let result = repository
            .create_environment(&EnvironmentForm::default())
            .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert!(notifier.received().is_empty());
    }

    #[tokio::test]
    async fn empty_state_names_the_missing_prerequisite() {
        let (repository, _) = repository(Duration::from_secs(60));
        assert_eq!(
            repository.empty_state().await.unwrap(),
            Some(EmptyState::NoSites)
        );
    }

    #[tokio::test]
    async fn comparing_an_instance_with_itself_is_refused() {
        let (repository, _) = repository(Duration::from_secs(60));
        assert!(matches!(
            repository.compare_services(&Id::from(3), &Id::from("3")).await,
            Err(Error::Validation {
                source: ValidationError::TargetIsSource
            })
        ));
    }
}
