use serde::Serialize;
use serde_json::Value as Json;

use crate::CfnType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccessControl { Private, PublicRead, PublicReadWrite, AuthenticatedRead }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VersioningStatus { Enabled, Suspended }

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all="PascalCase")]
pub struct VersioningConfiguration { pub status: VersioningStatus }

impl VersioningConfiguration {
    pub fn enabled() -> Self { Self { status: VersioningStatus::Enabled } }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all="PascalCase")]
pub struct CorsRule {
    /// A literal list or an expression producing one.
    pub allowed_origins: Json,
    pub allowed_methods: Vec<String>,
    #[serde(skip_serializing_if="Vec::is_empty")]
    pub allowed_headers: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all="PascalCase")]
pub struct CorsConfiguration { pub cors_rules: Vec<CorsRule> }

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all="PascalCase")]
pub struct Bucket {
    #[serde(skip_serializing_if="Option::is_none")]
    pub access_control: Option<AccessControl>,
    #[serde(skip_serializing_if="Option::is_none")]
    pub versioning_configuration: Option<VersioningConfiguration>,
    #[serde(skip_serializing_if="Option::is_none")]
    pub cors_configuration: Option<CorsConfiguration>,
}

impl CfnType for Bucket { const TYPE: &'static str = "AWS::S3::Bucket"; }
