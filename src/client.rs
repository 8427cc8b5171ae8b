use crate::error::{Result, WorkersError};
use crate::multipart::format_multipart_body;
use crate::routing::{
    account_scripts_path, require_account_id, route_collection_path, zone_route_path, ApiMode,
    ScriptTarget,
};
use crate::transport::{HttpTransport, Transport};
use crate::types::{
    WorkerListResponse, WorkerRequestParams, WorkerRoute, WorkerRouteResponse,
    WorkerRoutesResponse, WorkerScriptParams, WorkerScriptResponse,
};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::debug;

const JAVASCRIPT_CONTENT_TYPE: &str = "application/javascript";

/// Workers script and route operations over a [`Transport`].
///
/// With an account ID configured the client can also address named scripts
/// through the account-scoped multi-script API.
#[derive(Debug, Clone)]
pub struct WorkersClient<T = HttpTransport> {
    transport: T,
    account_id: Option<String>,
}

impl WorkersClient<HttpTransport> {
    pub fn from_token(api_token: impl Into<String>) -> Self {
        Self::new(HttpTransport::new(api_token))
    }
}

impl<T: Transport> WorkersClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            account_id: None,
        }
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn script_target<'a>(&'a self, params: &'a WorkerRequestParams) -> Result<ScriptTarget<'a>> {
        let target = ScriptTarget::resolve(params, self.account_id())?;
        debug!(mode = ?target.mode(), "resolved script endpoint");
        Ok(target)
    }

    async fn request_json<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&WorkerRoute>,
    ) -> Result<R> {
        let body = body
            .map(serde_json::to_value)
            .transpose()
            .map_err(WorkersError::Serialize)?;
        let res = self.transport.make_request(method, path, body).await?;
        decode(&res)
    }

    /// Delete the zone's script, or a named script when `script_name` is set.
    pub async fn delete_worker(
        &self,
        params: &WorkerRequestParams,
    ) -> Result<WorkerScriptResponse> {
        let target = self.script_target(params)?;
        self.request_json(Method::DELETE, &target.path(), None).await
    }

    /// Fetch the raw script source. The endpoint returns the script itself, not
    /// an envelope, so success is reported locally.
    pub async fn download_worker(
        &self,
        params: &WorkerRequestParams,
    ) -> Result<WorkerScriptResponse> {
        let target = self.script_target(params)?;
        let res = self
            .transport
            .make_request(Method::GET, &target.path(), None)
            .await?;

        let mut response = WorkerScriptResponse::default();
        response.result.script = String::from_utf8(res).map_err(WorkersError::InvalidScript)?;
        response.success = true;
        Ok(response)
    }

    /// List all scripts on the account. Multi-script only.
    pub async fn list_worker_scripts(&self) -> Result<WorkerListResponse> {
        let account_id = require_account_id(self.account_id())?;
        self.request_json(Method::GET, &account_scripts_path(account_id), None)
            .await
    }

    /// Upload raw script source with no bindings.
    pub async fn upload_worker(
        &self,
        params: &WorkerRequestParams,
        script: &str,
    ) -> Result<WorkerScriptResponse> {
        let target = self.script_target(params)?;
        self.upload(
            &target,
            JAVASCRIPT_CONTENT_TYPE,
            script.as_bytes().to_vec(),
        )
        .await
    }

    /// Upload script source together with its bindings as a multipart form.
    pub async fn upload_worker_with_bindings(
        &self,
        params: &WorkerRequestParams,
        data: &WorkerScriptParams,
    ) -> Result<WorkerScriptResponse> {
        let target = self.script_target(params)?;
        let multipart = format_multipart_body(data)?;
        debug!(
            bindings = data.bindings.len(),
            bytes = multipart.body.len(),
            "assembled multipart upload"
        );
        self.upload(&target, &multipart.content_type, multipart.body)
            .await
    }

    async fn upload(
        &self,
        target: &ScriptTarget<'_>,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<WorkerScriptResponse> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(content_type)
            .map_err(|_| WorkersError::Multipart(format!("invalid content type {}", content_type)))?;
        headers.insert(CONTENT_TYPE, value);

        let res = self
            .transport
            .make_request_with_headers(Method::PUT, &target.path(), body, headers)
            .await?;
        decode(&res)
    }

    /// Create a route. A route naming a script goes to the multi-script
    /// `routes` endpoint and needs an account ID; otherwise it is a `filters` entry.
    pub async fn create_worker_route(
        &self,
        zone_id: &str,
        route: &WorkerRoute,
    ) -> Result<WorkerRouteResponse> {
        let path = route_collection_path(zone_id, route, self.account_id())?;
        self.request_json(Method::POST, &path, Some(route)).await
    }

    pub async fn update_worker_route(
        &self,
        zone_id: &str,
        route_id: &str,
        route: &WorkerRoute,
    ) -> Result<WorkerRouteResponse> {
        let path = format!(
            "{}/{}",
            route_collection_path(zone_id, route, self.account_id())?,
            route_id
        );
        self.request_json(Method::PUT, &path, Some(route)).await
    }

    /// Delete a route. Both endpoint families accept the `filters` path.
    pub async fn delete_worker_route(
        &self,
        zone_id: &str,
        route_id: &str,
    ) -> Result<WorkerRouteResponse> {
        let path = format!(
            "{}/{}",
            zone_route_path(zone_id, ApiMode::SingleScript),
            route_id
        );
        self.request_json(Method::DELETE, &path, None).await
    }

    /// List the zone's routes. The endpoint family follows whether an account
    /// ID is configured.
    pub async fn list_worker_routes(&self, zone_id: &str) -> Result<WorkerRoutesResponse> {
        let mode = ApiMode::for_listing(self.account_id());
        let mut response: WorkerRoutesResponse = self
            .request_json(Method::GET, &zone_route_path(zone_id, mode), None)
            .await?;
        if mode == ApiMode::MultiScript {
            normalize_routes(&mut response.result);
        }
        Ok(response)
    }
}

/// The multi-script API never reports `enabled`; a route bound to a script is
/// effectively enabled.
pub fn normalize_routes(routes: &mut [WorkerRoute]) {
    for route in routes.iter_mut() {
        if route.script_name().is_some() {
            route.enabled = true;
        }
    }
}

fn decode<R: DeserializeOwned>(body: &[u8]) -> Result<R> {
    serde_json::from_slice(body).map_err(WorkersError::Unmarshal)
}
