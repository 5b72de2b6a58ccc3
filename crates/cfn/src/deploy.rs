use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;
use tracing::info;

use crate::template::{Format, Template};

fn aws() -> Result<String> {
    let p = which::which("aws").context("aws cli not found in PATH")?;
    Ok(p.to_string_lossy().into_owned())
}

pub fn write_template(template: &Template, format: Format, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let body = template.render(format)?;
    std::fs::write(path, body).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn deploy_args(stack_name: &str, template_path: &Path, parameters: &BTreeMap<String, String>, region: Option<&str>) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "cloudformation".into(), "deploy".into(),
        "--stack-name".into(), stack_name.into(),
        "--template-file".into(), template_path.to_string_lossy().into_owned(),
        "--capabilities".into(), "CAPABILITY_NAMED_IAM".into(),
    ];
    if !parameters.is_empty() {
        args.push("--parameter-overrides".into());
        args.extend(parameters.iter().map(|(k, v)| format!("{k}={v}")));
    }
    if let Some(r) = region { args.push("--region".into()); args.push(r.into()); }
    args
}

fn delete_args(stack_name: &str, region: Option<&str>) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "cloudformation".into(), "delete-stack".into(),
        "--stack-name".into(), stack_name.into(),
    ];
    if let Some(r) = region { args.push("--region".into()); args.push(r.into()); }
    args
}

/// Runs `aws <args>`; `args[1]` names the cloudformation subcommand.
fn aws_cloudformation(args: &[String]) -> Result<()> {
    let action = args.get(1).map(String::as_str).unwrap_or("cloudformation");
    let st = Command::new(aws()?).args(args).status()
        .with_context(|| format!("spawn aws cloudformation {action}"))?;
    if !st.success() { anyhow::bail!("cloudformation {action} failed ({st})") }
    Ok(())
}

pub fn deploy_stack(stack_name: &str, template_path: &Path, parameters: &BTreeMap<String, String>, region: Option<&str>) -> Result<()> {
    info!(stack = stack_name, template = %template_path.display(), "cloudformation deploy");
    aws_cloudformation(&deploy_args(stack_name, template_path, parameters, region))
}

pub fn delete_stack(stack_name: &str, region: Option<&str>) -> Result<()> {
    info!(stack = stack_name, "cloudformation delete-stack");
    aws_cloudformation(&delete_args(stack_name, region))
}
