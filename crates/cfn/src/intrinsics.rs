//! Constructors for CloudFormation intrinsic functions.
//!
//! Every helper returns a plain `serde_json::Value`, so intrinsics can be
//! dropped anywhere a property value is expected.

use serde_json::{json, Value as Json};

pub const NO_VALUE: &str = "AWS::NoValue";
pub const PARTITION: &str = "AWS::Partition";
pub const REGION: &str = "AWS::Region";
pub const ACCOUNT_ID: &str = "AWS::AccountId";
pub const STACK_NAME: &str = "AWS::StackName";
pub const STACK_ID: &str = "AWS::StackId";
pub const URL_SUFFIX: &str = "AWS::URLSuffix";
pub const NOTIFICATION_ARNS: &str = "AWS::NotificationARNs";

pub const PSEUDO_PARAMETERS: &[&str] = &[
    NO_VALUE, PARTITION, REGION, ACCOUNT_ID, STACK_NAME, STACK_ID, URL_SUFFIX, NOTIFICATION_ARNS,
];

pub fn is_pseudo_parameter(name: &str) -> bool { PSEUDO_PARAMETERS.contains(&name) }

pub fn ref_(name: &str) -> Json { json!({ "Ref": name }) }

pub fn no_value() -> Json { ref_(NO_VALUE) }

pub fn get_att(resource: &str, attribute: &str) -> Json {
    json!({ "Fn::GetAtt": [resource, attribute] })
}

/// `parts` is either a literal list or an expression yielding one
/// (e.g. a `Ref` to a `CommaDelimitedList` parameter).
pub fn join(delimiter: &str, parts: impl Into<Json>) -> Json {
    json!({ "Fn::Join": [delimiter, parts.into()] })
}

pub fn split(delimiter: &str, source: Json) -> Json {
    json!({ "Fn::Split": [delimiter, source] })
}

pub fn select(index: usize, list: Json) -> Json {
    json!({ "Fn::Select": [index.to_string(), list] })
}

pub fn if_(condition: &str, when_true: Json, when_false: Json) -> Json {
    json!({ "Fn::If": [condition, when_true, when_false] })
}

pub fn equals(left: Json, right: Json) -> Json {
    json!({ "Fn::Equals": [left, right] })
}

pub fn not(condition: Json) -> Json { json!({ "Fn::Not": [condition] }) }

pub fn and(conditions: Vec<Json>) -> Json { json!({ "Fn::And": conditions }) }

pub fn or(conditions: Vec<Json>) -> Json { json!({ "Fn::Or": conditions }) }

/// Reference to a named condition from inside another condition.
pub fn condition(name: &str) -> Json { json!({ "Condition": name }) }

/// Returns the function name and its argument when `value` is a
/// single-key intrinsic object (`Ref`, `Condition` or `Fn::*`).
pub fn as_intrinsic(value: &Json) -> Option<(&str, &Json)> {
    let map = value.as_object()?;
    if map.len() != 1 { return None; }
    let (key, arg) = map.iter().next()?;
    if key == "Ref" || key == "Condition" || key.starts_with("Fn::") {
        Some((key.as_str(), arg))
    } else {
        None
    }
}
