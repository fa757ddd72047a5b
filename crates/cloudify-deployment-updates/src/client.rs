//! Asynchronous deployment updates client.
//!
//! The client keeps no state of its own between calls. Each operation is one
//! request; the returned [`DeploymentUpdate`] is the manager's view and should
//! be trusted over anything the caller saw before, since other clients may
//! advance the same update concurrently.

use crate::models::{
    CommitOptions, DeploymentUpdate, Inputs, ListParams, StepAction, UpdateOptions,
};
use crate::packager::{guess_content_type, BlueprintPackager, TarPackager};
use crate::source::{ArchiveLocation, BlueprintSource};
use crate::Result;
use cloudify_core::client::ClientConfig;
use cloudify_core::config::ManagerClientConfig;
use cloudify_core::query::QueryParams;
use cloudify_core::transport::{ApiRequest, FilePart, HttpTransport, Transport};
use cloudify_core::{Error, ListResponse};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("cloudify-deployment-updates/", env!("CARGO_PKG_VERSION"));
const DEPLOYMENT_UPDATES: &str = "/deployment-updates";

/// Builder for [`DeploymentUpdatesClient`].
#[derive(Clone)]
pub struct DeploymentUpdatesClientBuilder {
    config: ManagerClientConfig,
    http_config: ClientConfig,
    packager: Arc<dyn BlueprintPackager>,
}

impl DeploymentUpdatesClientBuilder {
    /// Create a builder from a manager configuration.
    #[must_use]
    pub fn new(config: ManagerClientConfig) -> Self {
        Self {
            config,
            http_config: ClientConfig::new(),
            packager: Arc::new(TarPackager::new()),
        }
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Use a custom blueprint packager.
    #[must_use]
    pub fn with_packager(mut self, packager: Arc<dyn BlueprintPackager>) -> Self {
        self.packager = packager;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the HTTP transport cannot be built.
    pub fn build(self) -> Result<DeploymentUpdatesClient> {
        let transport = HttpTransport::builder(self.config)
            .with_http_config(self.http_config)
            .with_user_agent(USER_AGENT)
            .build()?;

        Ok(DeploymentUpdatesClient {
            transport: Arc::new(transport),
            packager: self.packager,
        })
    }
}

/// Client driving the deployment update lifecycle.
#[derive(Clone)]
pub struct DeploymentUpdatesClient {
    transport: Arc<dyn Transport>,
    packager: Arc<dyn BlueprintPackager>,
}

impl DeploymentUpdatesClient {
    /// Construct a client for the given manager URL with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] if the URL is invalid.
    pub fn new(manager_url: impl Into<String>) -> Result<Self> {
        DeploymentUpdatesClientBuilder::new(ManagerClientConfig::new(manager_url)?).build()
    }

    /// Start a builder pre-populated with the provided configuration.
    #[must_use]
    pub fn builder(config: ManagerClientConfig) -> DeploymentUpdatesClientBuilder {
        DeploymentUpdatesClientBuilder::new(config)
    }

    /// Construct a client on top of an existing transport, packing blueprints
    /// with [`TarPackager`].
    #[must_use]
    pub fn from_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            packager: Arc::new(TarPackager::new()),
        }
    }

    /// Replace the blueprint packager.
    #[must_use]
    pub fn with_packager(mut self, packager: Arc<dyn BlueprintPackager>) -> Self {
        self.packager = packager;
        self
    }

    /// List deployment updates.
    pub async fn list(&self, params: &ListParams) -> Result<ListResponse<DeploymentUpdate>> {
        let request = ApiRequest::get(DEPLOYMENT_UPDATES).with_query(params.to_query());
        self.send_json(request).await
    }

    /// Fetch the current snapshot of an update.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the manager does not know the id.
    pub async fn get(&self, update_id: &str) -> Result<DeploymentUpdate> {
        ensure_present("update_id", update_id)?;
        self.send_json(ApiRequest::get(update_path(update_id, None)))
            .await
    }

    /// Create an update transaction from a blueprint source.
    ///
    /// Directory sources are packed into a temporary directory that is removed
    /// before this returns, whether or not the upload succeeded. Non-empty
    /// `inputs` are uploaded as a JSON file part.
    pub async fn stage(
        &self,
        deployment_id: &str,
        source: &BlueprintSource,
        inputs: Option<&Inputs>,
    ) -> Result<DeploymentUpdate> {
        ensure_present("deployment_id", deployment_id)?;

        let update = match source {
            BlueprintSource::Directory {
                path,
                application_file_name,
            } => {
                self.stage_directory(deployment_id, path, application_file_name.as_deref(), inputs)
                    .await?
            }
            BlueprintSource::Archive {
                location,
                application_file_name,
            } => {
                self.stage_archive(
                    deployment_id,
                    location,
                    application_file_name.as_deref(),
                    inputs,
                )
                .await?
            }
        };

        info!(
            update_id = %update.id,
            deployment_id,
            state = %update.state,
            "staged deployment update"
        );
        Ok(update)
    }

    /// Ask the manager to compute the steps between the staged blueprint and
    /// the running deployment.
    pub async fn extract_steps(&self, update_id: &str) -> Result<DeploymentUpdate> {
        ensure_present("update_id", update_id)?;
        let update: DeploymentUpdate = self
            .send_json(ApiRequest::post(update_path(update_id, Some("update"))))
            .await?;
        debug!(
            update_id,
            steps = update.steps.len(),
            state = %update.state,
            "extracted deployment update steps"
        );
        Ok(update)
    }

    /// Append a manual step.
    pub async fn step(
        &self,
        update_id: &str,
        action: StepAction,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<DeploymentUpdate> {
        ensure_present("update_id", update_id)?;
        ensure_present("entity_type", entity_type)?;
        ensure_present("entity_id", entity_id)?;

        let body = StepRequest {
            action,
            entity_type,
            entity_id,
        };
        let request = ApiRequest::post(update_path(update_id, Some("step")))
            .with_json(serde_json::to_value(&body)?);
        self.send_json(request).await
    }

    /// Append an `add` step.
    pub async fn add(
        &self,
        update_id: &str,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<DeploymentUpdate> {
        self.step(update_id, StepAction::Add, entity_type, entity_id)
            .await
    }

    /// Append a `remove` step.
    pub async fn remove(
        &self,
        update_id: &str,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<DeploymentUpdate> {
        self.step(update_id, StepAction::Remove, entity_type, entity_id)
            .await
    }

    /// Append a `modify` step.
    pub async fn modify(
        &self,
        update_id: &str,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<DeploymentUpdate> {
        self.step(update_id, StepAction::Modify, entity_type, entity_id)
            .await
    }

    /// Start applying the update. The returned snapshot carries the
    /// `execution_id` of the workflow to watch.
    pub async fn commit(
        &self,
        update_id: &str,
        options: &CommitOptions,
    ) -> Result<DeploymentUpdate> {
        ensure_present("update_id", update_id)?;
        let request = ApiRequest::post(update_path(update_id, Some("commit")))
            .with_json(serde_json::to_value(options)?);
        let update: DeploymentUpdate = self.send_json(request).await?;
        info!(
            update_id,
            state = %update.state,
            execution_id = update.execution_id.as_deref().unwrap_or("-"),
            "committed deployment update"
        );
        Ok(update)
    }

    /// Apply the update to the deployment's stored topology once its
    /// execution finished successfully.
    pub async fn finalize_commit(&self, update_id: &str) -> Result<DeploymentUpdate> {
        ensure_present("update_id", update_id)?;
        let update: DeploymentUpdate = self
            .send_json(ApiRequest::post(update_path(
                update_id,
                Some("finalize_commit"),
            )))
            .await?;
        info!(update_id, state = %update.state, "finalized deployment update");
        Ok(update)
    }

    /// Revert an update that has not been finalized.
    pub async fn rollback(&self, update_id: &str) -> Result<DeploymentUpdate> {
        ensure_present("update_id", update_id)?;
        let update: DeploymentUpdate = self
            .send_json(ApiRequest::post(update_path(update_id, Some("revert"))))
            .await?;
        info!(update_id, state = %update.state, "reverted deployment update");
        Ok(update)
    }

    /// Stage, extract steps and commit in one go.
    ///
    /// A directory at `blueprint_or_archive_path` is packed as-is, even when
    /// its name ends like an archive. Otherwise the path is staged as an
    /// archive when the packager recognises it as one, and any other file is
    /// treated as the main blueprint of its directory. Finalizing or
    /// rolling back is left to the caller, as is cleaning up after a failure
    /// past staging.
    pub async fn update(
        &self,
        deployment_id: &str,
        blueprint_or_archive_path: &str,
        options: &UpdateOptions,
    ) -> Result<DeploymentUpdate> {
        ensure_present("deployment_id", deployment_id)?;

        let mut source = if Path::new(blueprint_or_archive_path).is_dir() {
            BlueprintSource::directory(blueprint_or_archive_path)
        } else if self.packager.is_supported_archive(blueprint_or_archive_path) {
            BlueprintSource::archive(blueprint_or_archive_path)
        } else {
            BlueprintSource::blueprint_file(blueprint_or_archive_path)?
        };
        if let Some(name) = &options.application_file_name {
            source = source.with_application_file_name(name.clone());
        }

        let staged = self
            .stage(deployment_id, &source, options.inputs.as_ref())
            .await?;
        self.extract_steps(&staged.id).await?;
        self.commit(&staged.id, &options.commit_options()).await
    }

    async fn stage_directory(
        &self,
        deployment_id: &str,
        directory: &Path,
        application_file_name: Option<&str>,
        inputs: Option<&Inputs>,
    ) -> Result<DeploymentUpdate> {
        let staging = tempfile::Builder::new()
            .prefix("blueprint-")
            .tempdir()
            .map_err(|err| {
                Error::PackagingFailed(format!("Failed to create staging directory: {err}"))
            })?;

        let packager = Arc::clone(&self.packager);
        let blueprint_dir = directory.to_path_buf();
        let dest_dir = staging.path().to_path_buf();
        let archive = tokio::task::spawn_blocking(move || packager.pack(&blueprint_dir, &dest_dir))
            .await
            .map_err(|err| Error::PackagingFailed(format!("Packaging task failed: {err}")))??;

        let result = self
            .stage_archive(
                deployment_id,
                &ArchiveLocation::Local(archive),
                application_file_name,
                inputs,
            )
            .await;

        let staging_path = staging.path().to_path_buf();
        if let Err(err) = staging.close() {
            warn!(
                path = %staging_path.display(),
                "failed to remove blueprint staging directory: {err}"
            );
        }
        result
    }

    async fn stage_archive(
        &self,
        deployment_id: &str,
        location: &ArchiveLocation,
        application_file_name: Option<&str>,
        inputs: Option<&Inputs>,
    ) -> Result<DeploymentUpdate> {
        let mut query = QueryParams::new();
        query.push("deployment_id", deployment_id);
        if let Some(name) = application_file_name {
            query.push("application_file_name", urlencoding::encode(name));
        }

        let mut parts = Vec::new();
        if let Some(inputs) = inputs.filter(|inputs| !inputs.is_empty()) {
            parts.push(FilePart::new(
                "inputs",
                "inputs",
                "text/plain",
                serde_json::to_vec(inputs)?,
            ));
        }

        match location {
            ArchiveLocation::Remote(url) => {
                query.push("blueprint_archive_url", url);
            }
            ArchiveLocation::Local(path) => {
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .ok_or_else(|| {
                        Error::InvalidRequest(format!(
                            "archive path `{}` has no file name",
                            path.display()
                        ))
                    })?;
                let data = tokio::fs::read(path).await.map_err(|err| {
                    Error::Io(format!("Failed to read archive {}: {err}", path.display()))
                })?;
                let content_type = guess_content_type(&file_name);
                parts.push(FilePart::new("update_archive", file_name, content_type, data));
            }
        }

        let request = ApiRequest::post(DEPLOYMENT_UPDATES)
            .with_query(query)
            .with_parts(parts)
            .expect_status(StatusCode::CREATED);
        self.send_json(request).await
    }

    async fn send_json<R>(&self, request: ApiRequest) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let path = request.path.clone();
        let value = self.transport.send(request).await?;
        serde_json::from_value(value).map_err(|err| {
            Error::ParseError(format!("Unexpected response for `{path}`: {err}"))
        })
    }
}

#[derive(Serialize)]
struct StepRequest<'a> {
    action: StepAction,
    entity_type: &'a str,
    entity_id: &'a str,
}

fn ensure_present(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidRequest(format!("{name} must not be empty")));
    }
    Ok(())
}

fn update_path(update_id: &str, action: Option<&str>) -> String {
    let id = urlencoding::encode(update_id);
    match action {
        Some(action) => format!("{DEPLOYMENT_UPDATES}/{id}/{action}"),
        None => format!("{DEPLOYMENT_UPDATES}/{id}"),
    }
}
