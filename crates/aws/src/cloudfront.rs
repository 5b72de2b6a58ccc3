use serde::Serialize;
use serde_json::Value as Json;

use crate::CfnType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all="kebab-case")]
pub enum ViewerProtocolPolicy { AllowAll, RedirectToHttps, HttpsOnly }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all="kebab-case")]
pub enum SslSupportMethod { SniOnly, Vip }

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all="PascalCase")]
pub struct S3OriginConfig { pub origin_access_identity: String }

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all="PascalCase")]
pub struct Origin {
    pub id: String,
    pub domain_name: Json,
    pub s3_origin_config: S3OriginConfig,
}

impl Origin {
    /// Origin served straight from a bucket, without an origin access identity.
    pub fn s3(id: &str, domain_name: Json) -> Self {
        Self {
            id: id.to_string(),
            domain_name,
            s3_origin_config: S3OriginConfig { origin_access_identity: String::new() },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all="PascalCase")]
pub struct ForwardedValues {
    pub query_string: bool,
    #[serde(skip_serializing_if="Vec::is_empty")]
    pub headers: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all="PascalCase")]
pub struct DefaultCacheBehavior {
    pub target_origin_id: String,
    pub forwarded_values: ForwardedValues,
    pub viewer_protocol_policy: ViewerProtocolPolicy,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all="PascalCase")]
pub struct ViewerCertificate {
    pub acm_certificate_arn: Json,
    pub ssl_support_method: SslSupportMethod,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all="PascalCase")]
pub struct DistributionConfig {
    #[serde(skip_serializing_if="Option::is_none")]
    pub aliases: Option<Json>,
    pub origins: Vec<Origin>,
    pub default_cache_behavior: DefaultCacheBehavior,
    pub enabled: bool,
    /// Either a `ViewerCertificate` or an `Fn::If` choosing one.
    #[serde(skip_serializing_if="Option::is_none")]
    pub viewer_certificate: Option<Json>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all="PascalCase")]
pub struct Distribution { pub distribution_config: DistributionConfig }

impl CfnType for Distribution { const TYPE: &'static str = "AWS::CloudFront::Distribution"; }
