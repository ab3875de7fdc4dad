use crate::{
    api::{
        credentials::Credentials,
        models::{
            AppInstance, AppInstanceForm, ComparisonReport, ConfigMapDetails,
            ConfigMapKeySyncRequest, ConfigMapKeysSyncRequest, ConfigMapSnapshot, Environment,
            EnvironmentForm, ErrorBody, Id, SecretSnapshot, Service, ServiceFilters, Site, SyncAck,
            SyncOperation, SyncOperationDetail, SyncRequest,
        },
    },
    common::{
        constants::*,
        errors::{self, Result},
    },
};
use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client, Method, Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{de::DeserializeOwned, Serialize};
use snafu::ResultExt;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Operations of the fleet backend used by the console.
///
/// `FleetClient` is the HTTP implementation; tests substitute an in-memory one.
#[async_trait]
pub trait FleetApi: Send + Sync {
    async fn list_sites(&self) -> Result<Vec<Site>>;
    async fn list_environments(&self) -> Result<Vec<Environment>>;
    async fn create_environment(&self, form: &EnvironmentForm) -> Result<Environment>;
    async fn update_environment(&self, id: &Id, form: &EnvironmentForm) -> Result<Environment>;
    async fn delete_environment(&self, id: &Id) -> Result<()>;
    async fn list_app_instances(&self, environment_id: Option<&Id>) -> Result<Vec<AppInstance>>;
    async fn create_app_instance(&self, form: &AppInstanceForm) -> Result<AppInstance>;
    async fn update_app_instance(&self, id: &Id, form: &AppInstanceForm) -> Result<AppInstance>;
    async fn delete_app_instance(&self, id: &Id) -> Result<()>;
    async fn list_services(
        &self,
        environment_id: &Id,
        filters: &ServiceFilters,
    ) -> Result<Vec<Service>>;
    async fn list_services_by_app_instance(
        &self,
        app_instance_id: &Id,
        filters: &ServiceFilters,
    ) -> Result<Vec<Service>>;
    async fn compare_services(&self, source: &Id, target: &Id)
        -> Result<ComparisonReport<Service>>;
    async fn sync_services(&self, request: &SyncRequest) -> Result<SyncOperation>;
    async fn sync_history(&self, environment_id: Option<&Id>) -> Result<Vec<SyncOperation>>;
    async fn sync_history_detailed(
        &self,
        environment_id: Option<&Id>,
    ) -> Result<Vec<SyncOperationDetail>>;
    async fn compare_configmaps(
        &self,
        source: &Id,
        target: &Id,
    ) -> Result<ComparisonReport<ConfigMapSnapshot>>;
    async fn configmap_details(&self, name: &str, source: &Id, target: &Id)
        -> Result<ConfigMapDetails>;
    async fn sync_configmap_key(&self, request: &ConfigMapKeySyncRequest) -> Result<SyncAck>;
    async fn sync_configmap_keys(&self, request: &ConfigMapKeysSyncRequest) -> Result<SyncAck>;
    async fn compare_secrets(
        &self,
        source: &Id,
        target: &Id,
    ) -> Result<ComparisonReport<SecretSnapshot>>;
}

/// HTTP client for the fleet backend.
///
/// Reads go through a retrying client, writes through a plain one: a sync submission must
/// never be sent twice.
#[derive(Clone)]
pub struct FleetClient {
    reader: ClientWithMiddleware,
    writer: Client,
    base_url: Url,
    credentials: Credentials,
}

impl FleetClient {
    /// Create a client for the given endpoint.
    pub fn new(endpoint: &str, timeout: Duration, credentials: Credentials) -> Result<Self> {
        let mut base_url = Url::parse(endpoint).context(errors::InvalidEndpoint { endpoint })?;
        // Routes are joined relative to the endpoint, which may carry a path prefix.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let writer = Client::builder()
            .timeout(timeout)
            .user_agent(::constants::user_agent())
            .build()
            .context(errors::ClientBuild)?;

        // Retry up to READ_MAX_RETRIES times with increasing intervals between attempts.
        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(::constants::READ_MAX_RETRIES);
        let reader = ClientBuilder::new(writer.clone())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            reader,
            writer,
            base_url,
            credentials,
        })
    }

    /// The credentials attached to every request.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .context(errors::InvalidEndpoint { endpoint: path })
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = self.credentials.token() {
            if let Ok(value) = format!("Bearer {token}").parse() {
                headers.insert(reqwest::header::AUTHORIZATION, value);
            }
        }
        headers
    }

    async fn get<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(path)?;
        debug!(%url, "GET");
        let response = self
            .reader
            .get(url)
            .headers(self.auth_headers())
            .query(query)
            .send()
            .await
            .context(errors::ReadRequest { path })?;
        self.decode(path, response).await
    }

    async fn send<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path)?;
        debug!(%url, %method, "sending");
        let mut request = self
            .writer
            .request(method.clone(), url)
            .headers(self.auth_headers());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.context(errors::WriteRequest {
            method: method.as_str(),
            path,
        })?;
        self.decode(path, response).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let url = self.url(path)?;
        debug!(%url, "DELETE");
        let response = self
            .writer
            .delete(url)
            .headers(self.auth_headers())
            .send()
            .await
            .context(errors::WriteRequest {
                method: "DELETE",
                path,
            })?;
        self.check_status(path, response).await.map(|_| ())
    }

    async fn decode<T: DeserializeOwned>(&self, path: &str, response: Response) -> Result<T> {
        let response = self.check_status(path, response).await?;
        response
            .json::<T>()
            .await
            .context(errors::DecodeResponse { path })
    }

    /// Map failure statuses to errors. A 401 clears the stored credentials.
    async fn check_status(&self, path: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            warn!(path, "backend rejected the API token, clearing credentials");
            self.credentials.clear()?;
            return errors::Unauthorized { path }.fail();
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .filter(|message| !message.is_empty());
        errors::HttpStatus {
            path,
            status: status.as_u16(),
            message,
        }
        .fail()
    }
}

/// Empty query string.
const NO_QUERY: [(&str, &str); 0] = [];

/// An id as one path segment.
fn segment(id: &Id) -> String {
    urlencoding::encode(&id.to_string()).into_owned()
}

/// Query string of the comparison endpoints.
fn pair_query<'a>(source: &'a Id, target: &'a Id) -> [(&'static str, &'a Id); 2] {
    [("source", source), ("target", target)]
}

/// Query string carrying an optional environment filter.
fn env_query(environment_id: Option<&Id>) -> Vec<(&'static str, &Id)> {
    environment_id.map(|id| ("env", id)).into_iter().collect()
}

#[async_trait]
impl FleetApi for FleetClient {
    async fn list_sites(&self) -> Result<Vec<Site>> {
        self.get(SITES_PATH, &NO_QUERY).await
    }

    async fn list_environments(&self) -> Result<Vec<Environment>> {
        self.get(ENVIRONMENTS_PATH, &NO_QUERY).await
    }

    async fn create_environment(&self, form: &EnvironmentForm) -> Result<Environment> {
        self.send(Method::POST, ENVIRONMENTS_PATH, Some(form)).await
    }

    async fn update_environment(&self, id: &Id, form: &EnvironmentForm) -> Result<Environment> {
        let path = format!("{ENVIRONMENTS_PATH}/{}", segment(id));
        self.send(Method::PUT, &path, Some(form)).await
    }

    async fn delete_environment(&self, id: &Id) -> Result<()> {
        self.delete(&format!("{ENVIRONMENTS_PATH}/{}", segment(id))).await
    }

    async fn list_app_instances(&self, environment_id: Option<&Id>) -> Result<Vec<AppInstance>> {
        self.get(APP_INSTANCES_PATH, &env_query(environment_id))
            .await
    }

    async fn create_app_instance(&self, form: &AppInstanceForm) -> Result<AppInstance> {
        self.send(Method::POST, APP_INSTANCES_PATH, Some(form)).await
    }

    async fn update_app_instance(&self, id: &Id, form: &AppInstanceForm) -> Result<AppInstance> {
        let path = format!("{APP_INSTANCES_PATH}/{}", segment(id));
        self.send(Method::PUT, &path, Some(form)).await
    }

    async fn delete_app_instance(&self, id: &Id) -> Result<()> {
        self.delete(&format!("{APP_INSTANCES_PATH}/{}", segment(id))).await
    }

    async fn list_services(
        &self,
        environment_id: &Id,
        filters: &ServiceFilters,
    ) -> Result<Vec<Service>> {
        #[derive(Serialize)]
        struct Query<'a> {
            env: &'a Id,
            #[serde(flatten)]
            filters: &'a ServiceFilters,
        }
        self.get(
            SERVICES_PATH,
            &Query {
                env: environment_id,
                filters,
            },
        )
        .await
    }

    async fn list_services_by_app_instance(
        &self,
        app_instance_id: &Id,
        filters: &ServiceFilters,
    ) -> Result<Vec<Service>> {
        let path = format!("{SERVICES_BY_APP_INSTANCE_PATH}/{}", segment(app_instance_id));
        self.get(&path, filters).await
    }

    async fn compare_services(
        &self,
        source: &Id,
        target: &Id,
    ) -> Result<ComparisonReport<Service>> {
        self.get(SERVICES_COMPARE_PATH, &pair_query(source, target))
            .await
    }

    async fn sync_services(&self, request: &SyncRequest) -> Result<SyncOperation> {
        self.send(Method::POST, SERVICES_SYNC_PATH, Some(request))
            .await
    }

    async fn sync_history(&self, environment_id: Option<&Id>) -> Result<Vec<SyncOperation>> {
        self.get(SYNC_HISTORY_PATH, &env_query(environment_id))
            .await
    }

    async fn sync_history_detailed(
        &self,
        environment_id: Option<&Id>,
    ) -> Result<Vec<SyncOperationDetail>> {
        self.get(SYNC_HISTORY_DETAILED_PATH, &env_query(environment_id))
            .await
    }

    async fn compare_configmaps(
        &self,
        source: &Id,
        target: &Id,
    ) -> Result<ComparisonReport<ConfigMapSnapshot>> {
        self.get(CONFIGMAPS_COMPARE_PATH, &pair_query(source, target))
            .await
    }

    async fn configmap_details(
        &self,
        name: &str,
        source: &Id,
        target: &Id,
    ) -> Result<ConfigMapDetails> {
        let path = format!("{CONFIGMAPS_PATH}/{}/details", urlencoding::encode(name));
        self.get(&path, &pair_query(source, target)).await
    }

    async fn sync_configmap_key(&self, request: &ConfigMapKeySyncRequest) -> Result<SyncAck> {
        self.send(Method::POST, CONFIGMAP_SYNC_KEY_PATH, Some(request))
            .await
    }

    async fn sync_configmap_keys(&self, request: &ConfigMapKeysSyncRequest) -> Result<SyncAck> {
        self.send(Method::POST, CONFIGMAP_SYNC_KEYS_PATH, Some(request))
            .await
    }

    async fn compare_secrets(
        &self,
        source: &Id,
        target: &Id,
    ) -> Result<ComparisonReport<SecretSnapshot>> {
        self.get(SECRETS_COMPARE_PATH, &pair_query(source, target))
            .await
    }
}
