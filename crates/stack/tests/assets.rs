use assetstack::{build_template, StackConfig};
use assetstack_cfn::{Inputs, Resolved, Template};
use assetstack_policy::Policy;
use serde_json::{json, Value as Json};

fn template(use_govcloud: bool) -> Template {
    build_template(&StackConfig { use_govcloud, ..StackConfig::default() }).unwrap()
}

fn inputs() -> Inputs {
    Inputs::default()
        .with_parameter("DomainName", "example.com")
        .with_parameter("DistributionAliases", "static.example.com")
}

fn resolve(t: &Template, inputs: &Inputs) -> Resolved {
    t.resolve(inputs).unwrap()
}

fn allowed_origins(r: &Resolved, bucket: &str) -> Json {
    r.resources[bucket]["Properties"]["CorsConfiguration"]["CorsRules"][0]["AllowedOrigins"].clone()
}

fn media_config(r: &Resolved) -> &Json {
    &r.resources["MediaAssetsDistribution"]["Properties"]["DistributionConfig"]
}

#[test]
fn test_should_allow_only_primary_domain_without_alternates() {
    let r = resolve(&template(false), &inputs());
    assert_eq!(allowed_origins(&r, "AssetsBucket"), json!(["https://example.com"]));
    assert_eq!(allowed_origins(&r, "PrivateAssetsBucket"), json!(["https://example.com"]));
    assert_eq!(
        assetstack::allowed_origins::<&str>("example.com", &[]),
        vec!["https://example.com".to_string()]
    );
}

#[test]
fn test_should_allow_alternates_after_primary_domain() {
    let r = resolve(&template(false), &inputs().with_parameter("DomainNameAlternates", "alt1.com,alt2.com"));
    let expected = json!(["https://example.com", "https://alt1.com", "https://alt2.com"]);
    assert_eq!(allowed_origins(&r, "AssetsBucket"), expected);
    assert_eq!(json!(assetstack::allowed_origins("example.com", &["alt1.com", "alt2.com"])), expected);
}

#[test]
fn test_should_grant_list_and_full_access_per_bucket() {
    let t = template(false);
    let role = &t.resources["InstanceRole"].properties["Policies"][0];
    assert_eq!(role["PolicyName"], json!("AssetsManagementPolicy"));
    let r = resolve(&t, &inputs());
    let statements = r.resources["InstanceRole"]["Properties"]["Policies"][0]["PolicyDocument"]["Statement"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(statements.len(), 4);
    for (i, bucket) in ["AssetsBucket", "PrivateAssetsBucket"].iter().enumerate() {
        let list = &statements[i * 2];
        let all = &statements[i * 2 + 1];
        assert_eq!(list["Action"], json!(["s3:ListBucket"]));
        assert_eq!(list["Resource"], json!({ "Fn::Join": ["", ["arn:aws", ":s3:::", { "Ref": bucket }]] }));
        assert_eq!(all["Action"], json!(["s3:*"]));
        assert_eq!(all["Resource"], json!({ "Fn::Join": ["", ["arn:aws", ":s3:::", { "Ref": bucket }, "/*"]] }));
    }
}

#[test]
fn test_should_build_policy_arns_from_the_partition() {
    let r = resolve(&template(true), &Inputs::default()
        .with_parameter("DomainName", "example.com")
        .with_region("us-gov-west-1"));
    let statement = &r.resources["InstanceRole"]["Properties"]["Policies"][0]["PolicyDocument"]["Statement"][0];
    assert_eq!(statement["Resource"]["Fn::Join"][1][0], json!("arn:aws-us-gov"));
}

#[test]
fn test_should_declare_no_distributions_in_govcloud() {
    let t = template(true);
    assert_eq!(t.resources_of_type("AWS::CloudFront::Distribution").count(), 0);
    for p in ["DistributionAliases", "MediaDistributionAlias", "MediaAcmCertificateArn"] {
        assert!(!t.parameters.contains_key(p), "unexpected parameter {p}");
    }
    assert!(!t.conditions.contains_key("NoMediaDistributionAlias"));
    assert!(!t.conditions.contains_key("NoMediaAcmCertificateArn"));
    assert!(!t.outputs.contains_key("AssetsDistributionDomainName"));
    assert!(t.outputs.contains_key("AssetsBucketDomainName"));
    assert!(t.outputs.contains_key("PrivateAssetsBucketDomainName"));
}

#[test]
fn test_should_declare_both_distributions_outside_govcloud() {
    let t = template(false);
    assert_eq!(t.resources_of_type("AWS::CloudFront::Distribution").count(), 2);
    assert_eq!(
        t.outputs["AssetsDistributionDomainName"].value,
        json!({ "Fn::GetAtt": ["AssetsDistribution", "DomainName"] })
    );

    let r = resolve(&t, &inputs());
    let config = &r.resources["AssetsDistribution"]["Properties"]["DistributionConfig"];
    assert_eq!(config["Aliases"], json!(["static.example.com"]));
    assert_eq!(config["Origins"][0]["DomainName"], json!({ "Fn::GetAtt": ["AssetsBucket", "DomainName"] }));
    let behavior = &config["DefaultCacheBehavior"];
    assert_eq!(behavior["ForwardedValues"]["QueryString"], json!(true));
    assert_eq!(behavior["ForwardedValues"]["Headers"],
        json!(["Origin", "Access-Control-Request-Headers", "Access-Control-Request-Method"]));
    assert_eq!(behavior["ViewerProtocolPolicy"], json!("allow-all"));
    assert!(config.get("ViewerCertificate").is_none());
    assert_eq!(media_config(&r)["Origins"][0]["DomainName"],
        json!({ "Fn::GetAtt": ["PrivateAssetsBucket", "DomainName"] }));
}

#[test]
fn test_should_omit_aliases_for_empty_media_alias() {
    let r = resolve(&template(false), &inputs());
    assert!(!r.conditions.is_empty());
    assert!(r.conditions["NoMediaDistributionAlias"]);
    assert!(media_config(&r).get("Aliases").is_none());

    let r = resolve(&template(false), &inputs().with_parameter("MediaDistributionAlias", "media.example.com"));
    assert_eq!(media_config(&r)["Aliases"], json!(["media.example.com"]));
}

#[test]
fn test_should_bind_certificate_only_when_arn_is_set() {
    let r = resolve(&template(false), &inputs());
    assert!(media_config(&r).get("ViewerCertificate").is_none());

    let arn = "arn:aws:acm:us-east-1:123456789012:certificate/abc";
    let r = resolve(&template(false), &inputs()
        .with_parameter("MediaDistributionAlias", "media.example.com")
        .with_parameter("MediaAcmCertificateArn", arn));
    assert_eq!(media_config(&r)["ViewerCertificate"], json!({
        "AcmCertificateArn": arn,
        "SslSupportMethod": "sni-only",
    }));
}

#[test]
fn test_should_pass_policy_checks() {
    Policy::new(false).check_template(&template(false)).unwrap();
    Policy::new(false).check_template(&template(true)).unwrap();
}

#[test]
fn test_should_render_as_json_and_yaml() {
    let t = template(false);
    let json: Json = serde_json::from_str(&t.render(assetstack_cfn::Format::Json).unwrap()).unwrap();
    assert_eq!(json["Resources"]["AssetsBucket"]["DeletionPolicy"], json!("Retain"));
    let yaml = t.render(assetstack_cfn::Format::Yaml).unwrap();
    assert!(yaml.contains("MediaAssetsDistribution:"));
}
