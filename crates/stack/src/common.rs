use assetstack_cfn::intrinsics::{join, ref_, PARTITION};
use serde_json::{json, Value as Json};

/// `arn:<partition>`, so ARNs are valid in commercial, China and GovCloud regions.
pub fn arn_prefix() -> Json {
    join("", vec![json!("arn:"), ref_(PARTITION)])
}
