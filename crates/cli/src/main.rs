use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::fmt::format::FmtSpan;

use assetstack::{build_template, StackConfig};
use assetstack_cfn as cfn;
use assetstack_policy::Policy;

#[derive(Parser, Debug)]
#[command(author, version, about="assetstack: CloudFormation template for application asset storage")]
struct Cli {
    /// Template format
    #[arg(long, value_enum, default_value_t=OutputFormat::Json, global = true)]
    format: OutputFormat,

    /// Write to this file instead of stdout
    #[arg(short, long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum OutputFormat { Json, Yaml }

impl From<OutputFormat> for cfn::Format {
    fn from(f: OutputFormat) -> Self {
        match f { OutputFormat::Json => cfn::Format::Json, OutputFormat::Yaml => cfn::Format::Yaml }
    }
}

#[derive(Args, Debug, Default)]
struct ParamArgs {
    /// Parameter value, NAME=VALUE (repeatable; overrides --params-file)
    #[arg(long="param", value_parser=parse_param)]
    params: Vec<(String, String)>,

    /// YAML map of parameter values
    #[arg(long)]
    params_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print the template
    Generate,
    /// Build the template and run plan-time checks
    Check {
        #[arg(long, default_value_t=false)] allow_unretained_buckets: bool,
    },
    /// Evaluate conditions and intrinsics against parameter values
    Preview {
        #[command(flatten)] params: ParamArgs,
        #[arg(long, default_value="us-east-1")] region: String,
    },
    /// Check, write and deploy the template with the aws CLI
    Deploy {
        #[arg(long)] stack: String,
        #[arg(long)] region: Option<String>,
        #[command(flatten)] params: ParamArgs,
    },
    /// Delete a deployed stack
    Delete {
        #[arg(long)] stack: String,
        #[arg(long)] region: Option<String>,
    },
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    let (k, v) = s.split_once('=').ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    if k.is_empty() { return Err(format!("missing parameter name in '{s}'")); }
    Ok((k.to_string(), v.to_string()))
}

fn yaml_scalar(v: &serde_yaml::Value) -> Option<String> {
    match v {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Null => Some(String::new()),
        _ => None,
    }
}

/// Lists in the file become comma-delimited strings.
fn parse_params_file(body: &[u8]) -> Result<BTreeMap<String, String>> {
    let raw: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_slice(body)?;
    let mut out = BTreeMap::new();
    for (k, v) in raw {
        let value = match &v {
            serde_yaml::Value::Sequence(items) => items.iter().map(yaml_scalar).collect::<Option<Vec<_>>>()
                .map(|parts| parts.join(",")),
            other => yaml_scalar(other),
        }.with_context(|| format!("parameter '{k}' must be a scalar or a list of scalars"))?;
        out.insert(k, value);
    }
    Ok(out)
}

impl ParamArgs {
    fn load(&self) -> Result<BTreeMap<String, String>> {
        let mut params = match &self.params_file {
            Some(p) => parse_params_file(&std::fs::read(p).with_context(|| format!("read {}", p.display()))?)?,
            None => BTreeMap::new(),
        };
        params.extend(self.params.iter().cloned());
        Ok(params)
    }
}

fn emit(body: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(p) => std::fs::write(p, body).with_context(|| format!("write {}", p.display())),
        None => { println!("{body}"); Ok(()) }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().json().with_span_events(FmtSpan::CLOSE).with_writer(std::io::stderr).init();
    let cli = Cli::parse();
    let config = StackConfig::from_env();
    info!(use_govcloud = config.use_govcloud, "configuration loaded");
    let template = build_template(&config)?;
    let format = cfn::Format::from(cli.format);

    match cli.cmd {
        Cmd::Generate => emit(&template.render(format)?, cli.out.as_deref())?,
        Cmd::Check { allow_unretained_buckets } => {
            Policy::new(allow_unretained_buckets).check_template(&template)?;
            info!("template passed policy checks");
        }
        Cmd::Preview { params, region } => {
            let inputs = cfn::Inputs { parameters: params.load()?, region, ..cfn::Inputs::default() };
            let resolved = template.resolve(&inputs)?;
            let body = match format {
                cfn::Format::Json => serde_json::to_string_pretty(&resolved)?,
                cfn::Format::Yaml => serde_yaml::to_string(&resolved)?,
            };
            emit(&body, cli.out.as_deref())?;
        }
        Cmd::Deploy { stack, region, params } => {
            Policy::new(false).check_template(&template)?;
            let ext = match format { cfn::Format::Json => "json", cfn::Format::Yaml => "yaml" };
            let path = cli.out.clone().unwrap_or_else(|| PathBuf::from("out").join(format!("template.{ext}")));
            cfn::write_template(&template, format, &path)?;
            cfn::deploy_stack(&stack, &path, &params.load()?, region.as_deref())?
        }
        Cmd::Delete { stack, region } => cfn::delete_stack(&stack, region.as_deref())?,
    }
    Ok(())
}
