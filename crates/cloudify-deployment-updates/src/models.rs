//! Deployment update models and per-operation option structs.

use cloudify_core::query::QueryParams;
use cloudify_core::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Deployment inputs, serialized as a JSON object when staging.
pub type Inputs = Map<String, Value>;

/// Lifecycle state of a deployment update as reported by the manager.
///
/// Values the client does not know are kept verbatim in [`Self::Other`], so a
/// snapshot always reflects exactly what the manager said.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeploymentUpdateState {
    /// Blueprint revision uploaded, nothing computed yet.
    Staged,
    /// Manager is computing the steps.
    ExtractingSteps,
    /// Steps are known and may still be edited.
    Updating,
    /// Commit accepted, execution being started.
    Committing,
    /// Install/uninstall workflow is running.
    Executing,
    /// Update finalized.
    Successful,
    /// Update failed.
    Failed,
    /// Revert in progress.
    Reverting,
    /// Update reverted.
    Reverted,
    /// Any other value reported by the manager.
    Other(String),
}

impl DeploymentUpdateState {
    /// Wire value of the state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Staged => "staged",
            Self::ExtractingSteps => "extracting_steps",
            Self::Updating => "updating",
            Self::Committing => "committing",
            Self::Executing => "executing",
            Self::Successful => "successful",
            Self::Failed => "failed",
            Self::Reverting => "reverting",
            Self::Reverted => "reverted",
            Self::Other(value) => value,
        }
    }

    /// Returns true for `successful`, `failed` and `reverted`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Successful | Self::Failed | Self::Reverted)
    }
}

impl From<String> for DeploymentUpdateState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "staged" => Self::Staged,
            "extracting_steps" => Self::ExtractingSteps,
            "updating" => Self::Updating,
            "committing" => Self::Committing,
            "executing" => Self::Executing,
            "successful" => Self::Successful,
            "failed" => Self::Failed,
            "reverting" => Self::Reverting,
            "reverted" => Self::Reverted,
            _ => Self::Other(value),
        }
    }
}

impl From<DeploymentUpdateState> for String {
    fn from(state: DeploymentUpdateState) -> Self {
        match state {
            DeploymentUpdateState::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for DeploymentUpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity-level action recorded by a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    /// Add an entity.
    Add,
    /// Remove an entity.
    Remove,
    /// Modify an entity.
    Modify,
}

impl StepAction {
    /// Wire value of the action.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Modify => "modify",
        }
    }
}

impl FromStr for StepAction {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            "modify" => Ok(Self::Modify),
            other => Err(Error::InvalidRequest(format!(
                "step action must be one of add, remove, modify; got `{other}`"
            ))),
        }
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entity-level change of a deployment update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Step id assigned by the manager.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Action applied to the entity.
    pub action: StepAction,
    /// Entity type, e.g. `node` or `relationship`.
    pub entity_type: String,
    /// Entity id (may be a path such as `nodes:site1:relationships:[0]`).
    pub entity_id: String,
}

/// Snapshot of a deployment update transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentUpdate {
    /// Update id.
    pub id: String,
    /// Target deployment id.
    pub deployment_id: String,
    /// Current state.
    pub state: DeploymentUpdateState,
    /// Steps accumulated so far.
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Execution started by the commit, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    /// Creation timestamp (ISO 8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl DeploymentUpdate {
    /// Returns true if the update reached a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Filters and paging accepted by the list endpoint.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ListParams {
    /// Filter by deployment id.
    pub deployment_id: Option<String>,
    /// Filter by update id.
    pub id: Option<String>,
    /// Filter by state.
    pub state: Option<DeploymentUpdateState>,
    /// Filter by commit execution id.
    pub execution_id: Option<String>,
    /// Sort field; prefix with `-` for descending order.
    pub sort: Option<String>,
    /// Page size.
    pub size: Option<u32>,
    /// Page offset.
    pub offset: Option<u32>,
}

impl ListParams {
    /// Parameters filtering on one deployment.
    #[must_use]
    pub fn for_deployment(deployment_id: impl Into<String>) -> Self {
        Self {
            deployment_id: Some(deployment_id.into()),
            ..Self::default()
        }
    }

    /// Convert the parameters into query parameters.
    #[must_use]
    pub fn to_query(&self) -> QueryParams {
        let mut params = QueryParams::new();
        params.push_opt(
            "deployment_id",
            self.deployment_id.as_deref().filter(|id| !id.is_empty()),
        );
        params.push_opt("id", self.id.as_deref());
        params.push_opt("state", self.state.as_ref());
        params.push_opt("execution_id", self.execution_id.as_deref());
        params.push_opt("_sort", self.sort.as_deref());
        params.push_opt("_size", self.size);
        params.push_opt("_offset", self.offset);
        params
    }
}

/// Options of the commit operation.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CommitOptions {
    /// Workflow to run instead of the default install/uninstall pair.
    pub workflow_id: Option<String>,
    /// Skip installing added entities.
    pub skip_install: bool,
    /// Skip uninstalling removed entities.
    pub skip_uninstall: bool,
}

impl CommitOptions {
    /// Run a custom workflow.
    #[must_use]
    pub fn with_workflow(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    /// Set the `skip_install` flag.
    #[must_use]
    pub const fn skip_install(mut self, skip: bool) -> Self {
        self.skip_install = skip;
        self
    }

    /// Set the `skip_uninstall` flag.
    #[must_use]
    pub const fn skip_uninstall(mut self, skip: bool) -> Self {
        self.skip_uninstall = skip;
        self
    }
}

/// Options of the stage-extract-commit composite.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UpdateOptions {
    /// Main blueprint file inside the archive.
    pub application_file_name: Option<String>,
    /// New deployment inputs.
    pub inputs: Option<Inputs>,
    /// Skip installing added entities.
    pub skip_install: bool,
    /// Skip uninstalling removed entities.
    pub skip_uninstall: bool,
    /// Workflow to run instead of the default install/uninstall pair.
    pub workflow_id: Option<String>,
}

impl UpdateOptions {
    /// Commit options carried by these update options.
    #[must_use]
    pub fn commit_options(&self) -> CommitOptions {
        CommitOptions {
            workflow_id: self.workflow_id.clone(),
            skip_install: self.skip_install,
            skip_uninstall: self.skip_uninstall,
        }
    }
}
