//! Typed property models for the AWS resources the assets stack declares.
//!
//! Field names follow the CloudFormation property names; any field that may
//! hold an intrinsic function is a `serde_json::Value`.

use serde::Serialize;
use serde_json::{Map as JsonMap, Value as Json};

use assetstack_cfn::CfnResource;

pub mod cloudfront;
pub mod iam;
pub mod s3;

/// A resource with a CloudFormation type name.
pub trait CfnType: Serialize + Sized {
    const TYPE: &'static str;

    fn into_resource(self) -> Result<CfnResource, serde_json::Error> {
        let properties = match serde_json::to_value(&self)? {
            Json::Object(map) => map,
            _ => JsonMap::new(),
        };
        Ok(CfnResource::new(Self::TYPE, properties))
    }
}
