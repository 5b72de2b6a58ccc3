//! Asset storage: a public and a private bucket, the policy granting access
//! to both, and (outside GovCloud) a CloudFront distribution in front of each.

use assetstack_aws::cloudfront::{
    DefaultCacheBehavior, Distribution, DistributionConfig, ForwardedValues, Origin, SslSupportMethod,
    ViewerCertificate, ViewerProtocolPolicy,
};
use assetstack_aws::iam::{Policy, PolicyDocument, Statement};
use assetstack_aws::s3::{AccessControl, Bucket, CorsConfiguration, CorsRule, VersioningConfiguration};
use assetstack_aws::CfnType;
use assetstack_cfn::intrinsics::{equals, if_, join, no_value, split};
use assetstack_cfn::{CfnResource, DeletionPolicy, LogicalId, Output, Parameter, Template};
use serde_json::{json, Value as Json};
use tracing::{info, instrument};

use crate::domain::DomainNames;
use crate::error::StackResult;

pub const CORS_ALLOWED_METHODS: [&str; 4] = ["POST", "PUT", "HEAD", "GET"];

/// Request headers S3 needs to answer CORS preflights through the CDN.
pub const CORS_FORWARDED_HEADERS: [&str; 3] = [
    "Origin",
    "Access-Control-Request-Headers",
    "Access-Control-Request-Method",
];

const ORIGIN_ID: &str = "Assets";

#[derive(Debug, Clone, Copy, Default)]
pub struct AssetsOptions {
    pub use_govcloud: bool,
}

#[derive(Debug, Clone)]
pub struct Assets {
    pub bucket: LogicalId,
    pub private_bucket: LogicalId,
    /// Grants list/read/write on both buckets; attach it to instance roles.
    pub policy: Policy,
    pub distribution: Option<LogicalId>,
    pub media_distribution: Option<LogicalId>,
}

/// Allowed CORS origins for literal domain names.
///
/// Same result CloudFormation computes from [`cors_allowed_origins`].
pub fn allowed_origins<S: AsRef<str>>(primary: &str, alternates: &[S]) -> Vec<String> {
    let alternates: Vec<&str> = alternates.iter().map(AsRef::as_ref).collect();
    let mut origins = format!("https://{primary}");
    if !alternates.concat().is_empty() {
        origins.push_str(";https://");
    }
    origins.push_str(&alternates.join(";https://"));
    origins.split(';').map(str::to_string).collect()
}

/// `https://` origins for the primary domain and every alternate.
///
/// The `If` keeps the separator out of the string when there are no
/// alternates, so the split yields exactly one origin.
pub fn cors_allowed_origins(domains: &impl DomainNames) -> Json {
    split(";", join("", vec![
        json!("https://"),
        domains.primary(),
        if_(domains.no_alternates(), json!(""), json!(";https://")),
        join(";https://", domains.alternates()),
    ]))
}

fn bucket(access_control: AccessControl, domains: &impl DomainNames) -> StackResult<CfnResource> {
    let b = Bucket {
        access_control: Some(access_control),
        versioning_configuration: Some(VersioningConfiguration::enabled()),
        cors_configuration: Some(CorsConfiguration { cors_rules: vec![CorsRule {
            allowed_origins: cors_allowed_origins(domains),
            allowed_methods: CORS_ALLOWED_METHODS.iter().map(|m| m.to_string()).collect(),
            allowed_headers: vec!["*".to_string()],
        }]}),
    };
    Ok(b.into_resource()?.with_deletion_policy(DeletionPolicy::Retain))
}

fn add_bucket(
    t: &mut Template,
    name: &str,
    access_control: AccessControl,
    description: &str,
    domains: &impl DomainNames,
) -> StackResult<LogicalId> {
    let id = t.add_resource(name, bucket(access_control, domains)?)?;
    t.add_output(&format!("{name}DomainName"), Output::new(description, id.get_att("DomainName")))?;
    Ok(id)
}

fn bucket_arn(arn_prefix: &Json, bucket: &LogicalId, suffix: &str) -> Json {
    let mut parts = vec![arn_prefix.clone(), json!(":s3:::"), bucket.reference()];
    if !suffix.is_empty() { parts.push(json!(suffix)); }
    join("", parts)
}

/// One `s3:ListBucket` on the bucket and one `s3:*` on its objects, per bucket.
pub fn management_policy(arn_prefix: &Json, buckets: &[&LogicalId]) -> Policy {
    let statement = buckets.iter().flat_map(|b| [
        Statement::allow(["s3:ListBucket"], bucket_arn(arn_prefix, b, "")),
        Statement::allow(["s3:*"], bucket_arn(arn_prefix, b, "/*")),
    ]).collect();
    Policy {
        policy_name: "AssetsManagementPolicy".to_string(),
        policy_document: PolicyDocument { version: None, statement },
    }
}

fn cache_behavior() -> DefaultCacheBehavior {
    DefaultCacheBehavior {
        target_origin_id: ORIGIN_ID.to_string(),
        forwarded_values: ForwardedValues {
            // cache entries vary by query string, e.g. style.css?v=3
            query_string: true,
            headers: CORS_FORWARDED_HEADERS.iter().map(|h| h.to_string()).collect(),
        },
        viewer_protocol_policy: ViewerProtocolPolicy::AllowAll,
    }
}

fn distribution_config(bucket: &LogicalId, aliases: Json, viewer_certificate: Option<Json>) -> DistributionConfig {
    DistributionConfig {
        aliases: Some(aliases),
        origins: vec![Origin::s3(ORIGIN_ID, bucket.get_att("DomainName"))],
        default_cache_behavior: cache_behavior(),
        enabled: true,
        viewer_certificate,
    }
}

fn add_distributions(t: &mut Template, bucket: &LogicalId, private_bucket: &LogicalId) -> StackResult<(LogicalId, LogicalId)> {
    let aliases = t.add_parameter("DistributionAliases", Parameter::comma_delimited_list()
        .description("A comma-separated list of CNAMEs (alternate domain names), if any, for the \
                      CloudFront distribution, e.g. static.example.com"))?;
    let distribution = t.add_resource("AssetsDistribution", Distribution {
        distribution_config: distribution_config(bucket, aliases, None),
    }.into_resource()?)?;

    let media_alias = t.add_parameter("MediaDistributionAlias", Parameter::string()
        .description("Optional CNAME (alternate domain name) for the PrivateAssetsBucket's \
                      CloudFront distribution, e.g. media.example.com")
        .default_value(""))?;
    let no_media_alias = t.add_condition("NoMediaDistributionAlias", equals(media_alias.clone(), json!("")))?;

    // CloudFront only accepts ACM certificates issued in us-east-1.
    let certificate_arn = t.add_parameter("MediaAcmCertificateArn", Parameter::string()
        .description("If you're using MediaDistributionAlias, enter the ARN of an AWS Certificate \
                      Manager (ACM) certificate from US East (N. Virginia).")
        .default_value(""))?;
    let no_certificate = t.add_condition("NoMediaAcmCertificateArn", equals(certificate_arn.clone(), json!("")))?;

    let certificate = serde_json::to_value(ViewerCertificate {
        acm_certificate_arn: certificate_arn,
        ssl_support_method: SslSupportMethod::SniOnly,
    })?;
    let media_distribution = t.add_resource("MediaAssetsDistribution", Distribution {
        distribution_config: distribution_config(
            private_bucket,
            if_(&no_media_alias, no_value(), json!([media_alias])),
            Some(if_(&no_certificate, no_value(), certificate)),
        ),
    }.into_resource()?)?;

    t.add_output("AssetsDistributionDomainName",
        Output::new("The assets CDN domain name", distribution.get_att("DomainName")))?;
    Ok((distribution, media_distribution))
}

#[instrument(skip_all, fields(use_govcloud = opts.use_govcloud))]
pub fn add_assets(t: &mut Template, domains: &impl DomainNames, arn_prefix: &Json, opts: AssetsOptions) -> StackResult<Assets> {
    let bucket = add_bucket(t, "AssetsBucket", AccessControl::PublicRead, "Assets bucket domain name", domains)?;
    let private_bucket = add_bucket(t, "PrivateAssetsBucket", AccessControl::Private, "Private assets bucket domain name", domains)?;
    let policy = management_policy(arn_prefix, &[&bucket, &private_bucket]);
    info!(%bucket, %private_bucket, "asset buckets declared");

    let (distribution, media_distribution) = if opts.use_govcloud {
        info!("GovCloud target: skipping CloudFront distributions");
        (None, None)
    } else {
        let (d, m) = add_distributions(t, &bucket, &private_bucket)?;
        info!(distribution = %d, media_distribution = %m, "distributions declared");
        (Some(d), Some(m))
    };

    Ok(Assets { bucket, private_bucket, policy, distribution, media_distribution })
}
