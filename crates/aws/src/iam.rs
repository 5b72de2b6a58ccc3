use serde::Serialize;
use serde_json::Value as Json;

use crate::CfnType;

pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect { Allow, Deny }

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all="PascalCase")]
pub struct Statement {
    pub effect: Effect,
    #[serde(skip_serializing_if="Option::is_none")]
    pub principal: Option<Json>,
    pub action: Vec<String>,
    #[serde(skip_serializing_if="Option::is_none")]
    pub resource: Option<Json>,
}

impl Statement {
    pub fn allow<S: Into<String>>(actions: impl IntoIterator<Item=S>, resource: Json) -> Self {
        Self {
            effect: Effect::Allow,
            principal: None,
            action: actions.into_iter().map(Into::into).collect(),
            resource: Some(resource),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all="PascalCase")]
pub struct PolicyDocument {
    #[serde(skip_serializing_if="Option::is_none")]
    pub version: Option<String>,
    pub statement: Vec<Statement>,
}

/// Inline policy, as attached to a role.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all="PascalCase")]
pub struct Policy {
    pub policy_name: String,
    pub policy_document: PolicyDocument,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all="PascalCase")]
pub struct Role {
    pub assume_role_policy_document: PolicyDocument,
    #[serde(skip_serializing_if="Vec::is_empty")]
    pub policies: Vec<Policy>,
    #[serde(skip_serializing_if="Option::is_none")]
    pub path: Option<String>,
}

impl Role {
    /// Role assumable by the given service principal (e.g. `ec2.amazonaws.com`).
    pub fn for_service(service: &str, policies: Vec<Policy>) -> Self {
        Self {
            assume_role_policy_document: PolicyDocument {
                version: Some(POLICY_VERSION.to_string()),
                statement: vec![Statement {
                    effect: Effect::Allow,
                    principal: Some(serde_json::json!({ "Service": [service] })),
                    action: vec!["sts:AssumeRole".to_string()],
                    resource: None,
                }],
            },
            policies,
            path: Some("/".to_string()),
        }
    }
}

impl CfnType for Role { const TYPE: &'static str = "AWS::IAM::Role"; }

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all="PascalCase")]
pub struct InstanceProfile {
    #[serde(skip_serializing_if="Option::is_none")]
    pub path: Option<String>,
    pub roles: Vec<Json>,
}

impl CfnType for InstanceProfile { const TYPE: &'static str = "AWS::IAM::InstanceProfile"; }

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_should_serialize_allow_statement_without_principal() {
        let s = Statement::allow(["s3:ListBucket"], json!("arn:aws:s3:::b"));
        assert_eq!(serde_json::to_value(s).unwrap(), json!({
            "Effect": "Allow",
            "Action": ["s3:ListBucket"],
            "Resource": "arn:aws:s3:::b",
        }));
    }

    #[test]
    fn test_should_build_service_role() {
        let r = Role::for_service("ec2.amazonaws.com", vec![]).into_resource().unwrap();
        assert_eq!(r.type_name, "AWS::IAM::Role");
        assert_eq!(r.properties["AssumeRolePolicyDocument"], json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Principal": { "Service": ["ec2.amazonaws.com"] },
                "Action": ["sts:AssumeRole"],
            }],
        }));
        assert!(r.properties.get("Policies").is_none());
    }
}
