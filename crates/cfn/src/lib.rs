//! CloudFormation template accumulation, preview and deployment.

pub mod deploy;
pub mod intrinsics;
pub mod resolve;
pub mod template;

pub use deploy::{delete_stack, deploy_stack, write_template};
pub use resolve::{partition_for_region, Inputs, ResolveError, Resolved};
pub use template::{
    CfnResource, DeletionPolicy, Format, LogicalId, Output, Parameter, ParameterType, Section,
    Template, TemplateError,
};
