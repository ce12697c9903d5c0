//! Technology descriptor schema - the merged `metadata.yaml` shape
//!
//! Only the fields the packager and promotion engine act on are typed;
//! everything else (display names, feature flags, richer future keys) is
//! carried through flattened passthrough maps so foreign documents
//! round-trip without loss.
//!
//! # Example YAML
//!
//! ```yaml
//! id: spark
//! label: Spark
//! iconPath: ./spark.png
//! contexts:
//! - id: "2.4"
//!   parameters:
//!     - name: MAIN_CLASS
//!       dynamicValues:
//!         script: ./ctx1/params.sh
//!   actions:
//!     - type: RUN
//!       script: ./ctx1/run.sh
//!   dockerInfo:
//!     image: "techno/spark"
//!     baseTag: "2.4"
//!     version: "1.0-5.0_abc123"
//! ```

use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

/// Root document for one technology
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnologyDescriptor {
    /// Machine-readable identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Icon file path, relative to the technology root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_path: Option<String>,
    /// Execution contexts, in fragment discovery order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<Context>,
    /// Passthrough for identity/display fields the core does not act on
    #[serde(flatten, default, skip_serializing_if = "Mapping::is_empty")]
    pub extra: Mapping,
}

/// One execution context for a technology
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_info: Option<DockerInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_contexts: Option<Vec<Context>>,
    #[serde(flatten, default, skip_serializing_if = "Mapping::is_empty")]
    pub extra: Mapping,
}

/// A context parameter, optionally backed by a dynamic-values script
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_values: Option<DynamicValues>,
    #[serde(flatten, default, skip_serializing_if = "Mapping::is_empty")]
    pub extra: Mapping,
}

/// Script reference producing a parameter's dynamic values
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DynamicValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(flatten, default, skip_serializing_if = "Mapping::is_empty")]
    pub extra: Mapping,
}

/// A context action, optionally backed by a script
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Action {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(flatten, default, skip_serializing_if = "Mapping::is_empty")]
    pub extra: Mapping,
}

/// Container image descriptor embedded in a context
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerInfo {
    /// Registry/repository name, e.g. `techno/spark`
    pub image: String,
    /// Tag prefix before the version suffix
    pub base_tag: String,
    /// Full tag suffix; ends with the docker-formatted build qualifier
    /// until promoted, then with the bare release version
    pub version: String,
}

impl DockerInfo {
    /// Full image reference: `image:baseTag-version`.
    pub fn reference(&self) -> String {
        format!("{}:{}-{}", self.image, self.base_tag, self.version)
    }

    /// Release tag after promotion: `baseTag-newVersion`.
    pub fn promoted_tag(&self, new_version: &str) -> String {
        format!("{}-{}", self.base_tag, new_version)
    }

    /// Release reference after promotion: `image:baseTag-newVersion`.
    pub fn promoted_reference(&self, new_version: &str) -> String {
        format!("{}:{}", self.image, self.promoted_tag(new_version))
    }
}
