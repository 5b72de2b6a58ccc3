use assetstack_cfn::intrinsics::{as_intrinsic, is_pseudo_parameter};
use assetstack_cfn::{DeletionPolicy, Template};
use serde_json::Value as Json;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Policy: {location} references undeclared name '{name}'")]
    DanglingRef { location: String, name: String },
    #[error("Policy: {location} reads an attribute of undeclared resource '{resource}'")]
    DanglingGetAtt { location: String, resource: String },
    #[error("Policy: {location} uses undeclared condition '{condition}'")]
    UnknownCondition { location: String, condition: String },
    #[error("Policy: S3 bucket '{0}' must set DeletionPolicy: Retain")]
    UnretainedBucket(String),
}

/// Plan-time checks over a finished template.
pub struct Policy { pub allow_unretained_buckets: bool }

impl Policy {
    pub fn new(allow_unretained_buckets: bool) -> Self { Self { allow_unretained_buckets } }

    pub fn check_template(&self, t: &Template) -> Result<(), PolicyError> {
        for (name, expr) in &t.conditions {
            check_value(t, expr, &format!("condition {name}"))?;
        }
        for (name, r) in &t.resources {
            let location = format!("resource {name}");
            if let Some(c) = &r.condition { check_condition(t, c, &location)?; }
            for v in r.properties.values() { check_value(t, v, &location)?; }
        }
        for (name, o) in &t.outputs {
            let location = format!("output {name}");
            if let Some(c) = &o.condition { check_condition(t, c, &location)?; }
            check_value(t, &o.value, &location)?;
        }
        if !self.allow_unretained_buckets {
            if let Some((name, _)) = t.resources_of_type("AWS::S3::Bucket")
                .find(|(_, r)| r.deletion_policy != Some(DeletionPolicy::Retain))
            {
                return Err(PolicyError::UnretainedBucket(name.clone()));
            }
        }
        debug!(resources = t.resources.len(), "policy checks passed");
        Ok(())
    }
}

fn check_condition(t: &Template, name: &str, location: &str) -> Result<(), PolicyError> {
    if t.conditions.contains_key(name) { return Ok(()); }
    Err(PolicyError::UnknownCondition { location: location.to_string(), condition: name.to_string() })
}

fn check_value(t: &Template, v: &Json, location: &str) -> Result<(), PolicyError> {
    if let Some((function, arg)) = as_intrinsic(v) {
        match (function, arg) {
            ("Ref", Json::String(name)) => {
                if !(t.parameters.contains_key(name) || t.resources.contains_key(name) || is_pseudo_parameter(name)) {
                    return Err(PolicyError::DanglingRef { location: location.to_string(), name: name.clone() });
                }
                return Ok(());
            }
            ("Fn::GetAtt", Json::Array(args)) => {
                if let Some(resource) = args.first().and_then(Json::as_str) {
                    if !t.resources.contains_key(resource) {
                        return Err(PolicyError::DanglingGetAtt { location: location.to_string(), resource: resource.to_string() });
                    }
                }
                return Ok(());
            }
            ("Condition", Json::String(name)) => return check_condition(t, name, location),
            ("Fn::If", Json::Array(args)) => {
                if let Some(name) = args.first().and_then(Json::as_str) {
                    check_condition(t, name, location)?;
                }
                for branch in args.iter().skip(1) { check_value(t, branch, location)?; }
                return Ok(());
            }
            _ => {}
        }
    }
    match v {
        Json::Object(map) => map.values().try_for_each(|x| check_value(t, x, location)),
        Json::Array(items) => items.iter().try_for_each(|x| check_value(t, x, location)),
        _ => Ok(()),
    }
}
