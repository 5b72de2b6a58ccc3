//! CloudFormation template for application asset storage.
//!
//! [`build_template`] assembles the whole document; the pieces live in
//! [`assets`] (buckets, access policy, CDN), [`domain`] and [`instance`].

pub mod assets;
pub mod common;
pub mod config;
pub mod domain;
pub mod error;
pub mod instance;

use assetstack_cfn::Template;
use tracing::{info, instrument};

pub use assets::{add_assets, allowed_origins, Assets, AssetsOptions};
pub use config::StackConfig;
pub use domain::{DomainNames, DomainParameters};
pub use error::{StackError, StackResult};

#[instrument(skip_all, fields(use_govcloud = cfg.use_govcloud))]
pub fn build_template(cfg: &StackConfig) -> StackResult<Template> {
    let mut t = Template::new(cfg.description.clone());
    let domains = DomainParameters::register(&mut t)?;
    let assets = add_assets(&mut t, &domains, &common::arn_prefix(), AssetsOptions { use_govcloud: cfg.use_govcloud })?;
    instance::add_instance_role(&mut t, vec![assets.policy])?;
    info!(
        parameters = t.parameters.len(),
        conditions = t.conditions.len(),
        resources = t.resources.len(),
        outputs = t.outputs.len(),
        "template built"
    );
    Ok(t)
}
