use assetstack_aws::iam::{InstanceProfile, Policy, Role};
use assetstack_aws::CfnType;
use assetstack_cfn::{LogicalId, Template};

use crate::error::StackResult;

/// EC2 role carrying `policies`, plus the instance profile that hands it to instances.
pub fn add_instance_role(t: &mut Template, policies: Vec<Policy>) -> StackResult<(LogicalId, LogicalId)> {
    let role = t.add_resource("InstanceRole", Role::for_service("ec2.amazonaws.com", policies).into_resource()?)?;
    let profile = t.add_resource("InstanceProfile", InstanceProfile {
        path: Some("/".to_string()),
        roles: vec![role.reference()],
    }.into_resource()?)?;
    Ok((role, profile))
}
