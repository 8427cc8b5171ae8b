use crate::bindings::WorkerBinding;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Selects which script an operation targets.
///
/// A non-empty `script_name` always wins: the request goes to the account-scoped
/// multi-script endpoints and `zone_id` is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerRequestParams {
    pub zone_id: Option<String>,
    pub script_name: Option<String>,
}

impl WorkerRequestParams {
    pub fn for_zone(zone_id: impl Into<String>) -> Self {
        Self {
            zone_id: Some(zone_id.into()),
            script_name: None,
        }
    }

    pub fn for_script(script_name: impl Into<String>) -> Self {
        Self {
            zone_id: None,
            script_name: Some(script_name.into()),
        }
    }

    pub fn script_name(&self) -> Option<&str> {
        non_empty(self.script_name.as_deref())
    }

    pub fn zone_id(&self) -> Option<&str> {
        non_empty(self.zone_id.as_deref())
    }
}

/// Script source plus the bindings uploaded with it.
#[derive(Debug, Default)]
pub struct WorkerScriptParams {
    pub script: String,
    pub bindings: BTreeMap<String, Box<dyn WorkerBinding>>,
}

impl WorkerScriptParams {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            bindings: BTreeMap::new(),
        }
    }

    pub fn with_binding(
        mut self,
        name: impl Into<String>,
        binding: impl WorkerBinding + 'static,
    ) -> Self {
        self.bindings.insert(name.into(), Box::new(binding));
        self
    }
}

/// Worker route (a "filter" on the single-script API).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRoute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub script: Option<String>,
}

impl WorkerRoute {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    /// Associated script name, treating an empty string as unset.
    pub fn script_name(&self) -> Option<&str> {
        non_empty(self.script.as_deref())
    }
}

/// Script information such as size and creation/modification dates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerMetaData {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub etag: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerScript {
    #[serde(flatten)]
    pub metadata: WorkerMetaData,
    #[serde(default)]
    pub script: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseInfo {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Standard `{result, success, errors, messages}` envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ResponseInfo>,
    #[serde(default)]
    pub messages: Vec<ResponseInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: T,
}

pub type WorkerScriptResponse = ApiResponse<WorkerScript>;
pub type WorkerListResponse = ApiResponse<Vec<WorkerMetaData>>;
pub type WorkerRouteResponse = ApiResponse<WorkerRoute>;
pub type WorkerRoutesResponse = ApiResponse<Vec<WorkerRoute>>;

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn is_blank(value: &Option<String>) -> bool {
    non_empty(value.as_deref()).is_none()
}
