use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as Json};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

use crate::intrinsics;

pub const FORMAT_VERSION: &str = "2010-09-09";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section { Parameters, Conditions, Resources, Outputs }

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Section::Parameters => "parameter",
            Section::Conditions => "condition",
            Section::Resources => "resource",
            Section::Outputs => "output",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("duplicate {section} '{name}'")]
    Duplicate { section: Section, name: String },
    #[error("invalid logical id '{0}': use ASCII letters and digits only")]
    InvalidLogicalId(String),
    #[error("render json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("render yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Logical ID of a declared resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicalId(pub String);

impl LogicalId {
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn reference(&self) -> Json { intrinsics::ref_(&self.0) }
    pub fn get_att(&self, attribute: &str) -> Json { intrinsics::get_att(&self.0, attribute) }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterType { String, Number, CommaDelimitedList }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename="Type")] pub type_name: ParameterType,
    #[serde(rename="Description", default, skip_serializing_if="Option::is_none")]
    pub description: Option<String>,
    #[serde(rename="Default", default, skip_serializing_if="Option::is_none")]
    pub default: Option<String>,
}

impl Parameter {
    pub fn new(type_name: ParameterType) -> Self { Self { type_name, description: None, default: None } }
    pub fn string() -> Self { Self::new(ParameterType::String) }
    pub fn comma_delimited_list() -> Self { Self::new(ParameterType::CommaDelimitedList) }
    pub fn description(mut self, d: impl Into<String>) -> Self { self.description = Some(d.into()); self }
    pub fn default_value(mut self, d: impl Into<String>) -> Self { self.default = Some(d.into()); self }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionPolicy { Retain, Delete, Snapshot }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfnResource {
    #[serde(rename="Type")]
    pub type_name: String,
    #[serde(rename="Properties", default, skip_serializing_if="JsonMap::is_empty")]
    pub properties: JsonMap<String, Json>,
    #[serde(rename="DeletionPolicy", default, skip_serializing_if="Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,
    #[serde(rename="Condition", default, skip_serializing_if="Option::is_none")]
    pub condition: Option<String>,
}

impl CfnResource {
    pub fn new(type_name: impl Into<String>, properties: JsonMap<String, Json>) -> Self {
        Self { type_name: type_name.into(), properties, deletion_policy: None, condition: None }
    }
    pub fn with_deletion_policy(mut self, p: DeletionPolicy) -> Self { self.deletion_policy = Some(p); self }
    pub fn with_condition(mut self, c: impl Into<String>) -> Self { self.condition = Some(c.into()); self }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    #[serde(rename="Description", default, skip_serializing_if="Option::is_none")]
    pub description: Option<String>,
    #[serde(rename="Value")]
    pub value: Json,
    #[serde(rename="Condition", default, skip_serializing_if="Option::is_none")]
    pub condition: Option<String>,
}

impl Output {
    pub fn new(description: impl Into<String>, value: Json) -> Self {
        Self { description: Some(description.into()), value, condition: None }
    }
}

/// Accumulates declarations and renders the final template document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename="AWSTemplateFormatVersion")]
    pub version: Option<String>,
    #[serde(rename="Description", default, skip_serializing_if="Option::is_none")]
    pub description: Option<String>,
    #[serde(rename="Parameters", default, skip_serializing_if="BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Parameter>,
    #[serde(rename="Conditions", default, skip_serializing_if="BTreeMap::is_empty")]
    pub conditions: BTreeMap<String, Json>,
    #[serde(rename="Resources", default)]
    pub resources: BTreeMap<String, CfnResource>,
    #[serde(rename="Outputs", default, skip_serializing_if="BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            version: Some(FORMAT_VERSION.to_string()),
            description: None,
            parameters: BTreeMap::new(),
            conditions: BTreeMap::new(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format { #[default] Json, Yaml }

static LOGICAL_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap());

fn insert_unique<V>(map: &mut BTreeMap<String, V>, section: Section, name: &str, value: V) -> Result<(), TemplateError> {
    if !LOGICAL_ID.is_match(name) {
        return Err(TemplateError::InvalidLogicalId(name.to_string()));
    }
    if map.contains_key(name) {
        return Err(TemplateError::Duplicate { section, name: name.to_string() });
    }
    debug!(%section, logical_id = name, "declared");
    map.insert(name.to_string(), value);
    Ok(())
}

impl Template {
    pub fn new(description: Option<String>) -> Self { Self { description, ..Self::default() } }

    /// Returns a `Ref` to the new parameter.
    pub fn add_parameter(&mut self, name: &str, p: Parameter) -> Result<Json, TemplateError> {
        insert_unique(&mut self.parameters, Section::Parameters, name, p)?;
        Ok(intrinsics::ref_(name))
    }

    /// Returns the condition name, ready for `Fn::If`.
    pub fn add_condition(&mut self, name: &str, expr: Json) -> Result<String, TemplateError> {
        insert_unique(&mut self.conditions, Section::Conditions, name, expr)?;
        Ok(name.to_string())
    }

    pub fn add_resource(&mut self, name: &str, r: CfnResource) -> Result<LogicalId, TemplateError> {
        insert_unique(&mut self.resources, Section::Resources, name, r)?;
        Ok(LogicalId(name.to_string()))
    }

    pub fn add_output(&mut self, name: &str, o: Output) -> Result<(), TemplateError> {
        insert_unique(&mut self.outputs, Section::Outputs, name, o)
    }

    pub fn resources_of_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item=(&'a String, &'a CfnResource)> + 'a {
        self.resources.iter().filter(move |(_, r)| r.type_name == type_name)
    }

    pub fn to_json(&self) -> Result<Json, TemplateError> { Ok(serde_json::to_value(self)?) }

    pub fn render(&self, format: Format) -> Result<String, TemplateError> {
        match format {
            Format::Json => Ok(serde_json::to_string_pretty(self)?),
            Format::Yaml => Ok(serde_yaml::to_string(self)?),
        }
    }
}
