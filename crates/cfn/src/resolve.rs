//! Deploy-time evaluation of intrinsics, for previewing a template against
//! a set of parameter values without creating a stack.
//!
//! Only values that do not depend on created resources are computed:
//! `Ref` to a resource and `Fn::GetAtt` stay as written, and so does any
//! `Fn::Join`/`Fn::Split` that contains one.

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde::Serialize;
use serde_json::{json, Map as JsonMap, Value as Json};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

use crate::intrinsics::{self, as_intrinsic};
use crate::template::{ParameterType, Template};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no value supplied for parameter '{0}' and it has no default")]
    MissingParameter(String),
    #[error("value supplied for undeclared parameter '{0}'")]
    UndeclaredParameter(String),
    #[error("Ref to unknown name '{0}'")]
    UnknownReference(String),
    #[error("unknown condition '{0}'")]
    UnknownCondition(String),
    #[error("condition '{0}' depends on itself")]
    ConditionCycle(String),
    #[error("malformed {function}: {reason}")]
    Malformed { function: String, reason: String },
}

fn malformed(function: &str, reason: impl Into<String>) -> ResolveError {
    ResolveError::Malformed { function: function.to_string(), reason: reason.into() }
}

/// Values supplied at deploy time.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub parameters: BTreeMap<String, String>,
    pub region: String,
    pub account_id: String,
    pub stack_name: String,
}

impl Default for Inputs {
    fn default() -> Self {
        Self {
            parameters: BTreeMap::new(),
            region: "us-east-1".to_string(),
            account_id: "123456789012".to_string(),
            stack_name: "assetstack".to_string(),
        }
    }
}

impl Inputs {
    pub fn with_parameter(mut self, name: &str, value: &str) -> Self {
        self.parameters.insert(name.to_string(), value.to_string());
        self
    }
    pub fn with_region(mut self, region: &str) -> Self { self.region = region.to_string(); self }
}

pub fn partition_for_region(region: &str) -> &'static str {
    if region.starts_with("us-gov-") { "aws-us-gov" }
    else if region.starts_with("cn-") { "aws-cn" }
    else { "aws" }
}

fn url_suffix_for_partition(partition: &str) -> &'static str {
    if partition == "aws-cn" { "amazonaws.com.cn" } else { "amazonaws.com" }
}

#[derive(Debug, Clone, Serialize)]
pub struct Resolved {
    #[serde(rename="Parameters")] pub parameters: BTreeMap<String, Json>,
    #[serde(rename="Conditions")] pub conditions: BTreeMap<String, bool>,
    #[serde(rename="Resources")] pub resources: BTreeMap<String, Json>,
    #[serde(rename="Outputs")] pub outputs: BTreeMap<String, Json>,
}

struct Scope<'a> {
    values: HashMap<String, Json>,
    resources: BTreeSet<&'a str>,
    conditions: BTreeMap<String, bool>,
}

impl Scope<'_> {
    fn condition(&self, name: &str) -> Result<bool, ResolveError> {
        self.conditions.get(name).copied().ok_or_else(|| ResolveError::UnknownCondition(name.to_string()))
    }

    /// `Ok(None)` means the value resolved to `AWS::NoValue`.
    fn value(&self, v: &Json) -> Result<Option<Json>, ResolveError> {
        if let Some((function, arg)) = as_intrinsic(v) {
            return self.intrinsic(v, function, arg);
        }
        match v {
            Json::Object(map) => {
                let mut out = JsonMap::new();
                for (k, item) in map {
                    if let Some(r) = self.value(item)? { out.insert(k.clone(), r); }
                }
                Ok(Some(Json::Object(out)))
            }
            Json::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(r) = self.value(item)? { out.push(r); }
                }
                Ok(Some(Json::Array(out)))
            }
            other => Ok(Some(other.clone())),
        }
    }

    fn intrinsic(&self, original: &Json, function: &str, arg: &Json) -> Result<Option<Json>, ResolveError> {
        match function {
            "Ref" => {
                let name = arg.as_str().ok_or_else(|| malformed("Ref", "expected a name"))?;
                if name == intrinsics::NO_VALUE { return Ok(None); }
                if let Some(v) = self.values.get(name) { return Ok(Some(v.clone())); }
                if self.resources.contains(name) { return Ok(Some(original.clone())); }
                Err(ResolveError::UnknownReference(name.to_string()))
            }
            "Fn::If" => {
                let args = fixed_args(function, arg, 3)?;
                let name = args[0].as_str().ok_or_else(|| malformed(function, "condition name must be a string"))?;
                let branch = if self.condition(name)? { &args[1] } else { &args[2] };
                self.value(branch)
            }
            "Fn::Join" => {
                let args = fixed_args(function, arg, 2)?;
                let delimiter = args[0].as_str().ok_or_else(|| malformed(function, "delimiter must be a string"))?;
                let parts = self.value(&args[1])?.unwrap_or(Json::Array(Vec::new()));
                let Json::Array(items) = &parts else {
                    return Ok(Some(json!({ function: [delimiter, parts.clone()] })));
                };
                let strings: Option<Vec<&str>> = items.iter().map(Json::as_str).collect();
                Ok(Some(match strings {
                    Some(s) => Json::String(s.join(delimiter)),
                    None => json!({ function: [delimiter, parts.clone()] }),
                }))
            }
            "Fn::Split" => {
                let args = fixed_args(function, arg, 2)?;
                let delimiter = args[0].as_str().ok_or_else(|| malformed(function, "delimiter must be a string"))?;
                let source = self.value(&args[1])?.unwrap_or(Json::String(String::new()));
                Ok(Some(match source.as_str() {
                    Some(s) => Json::Array(s.split(delimiter).map(|p| Json::String(p.to_string())).collect()),
                    None => json!({ function: [delimiter, source.clone()] }),
                }))
            }
            "Fn::Select" => {
                let args = fixed_args(function, arg, 2)?;
                let index = match &args[0] {
                    Json::Number(n) => n.as_u64(),
                    Json::String(s) => s.parse::<u64>().ok(),
                    _ => None,
                }.ok_or_else(|| malformed(function, "index must be a non-negative integer"))?;
                let list = self.value(&args[1])?.unwrap_or(Json::Array(Vec::new()));
                match &list {
                    Json::Array(items) => usize::try_from(index).ok()
                        .and_then(|i| items.get(i))
                        .cloned()
                        .map(Some)
                        .ok_or_else(|| malformed(function, format!("index {index} out of range"))),
                    _ => Ok(Some(json!({ function: [args[0].clone(), list.clone()] }))),
                }
            }
            "Condition" => {
                let name = arg.as_str().ok_or_else(|| malformed(function, "expected a name"))?;
                Ok(Some(Json::Bool(self.condition(name)?)))
            }
            _ => Ok(Some(original.clone())),
        }
    }

    fn evaluate(&self, expr: &Json) -> Result<bool, ResolveError> {
        let Some((function, arg)) = as_intrinsic(expr) else {
            return expr.as_bool().ok_or_else(|| malformed("condition", "expected a condition function"));
        };
        match function {
            "Fn::Equals" => {
                let args = fixed_args(function, arg, 2)?;
                let left = self.value(&args[0])?;
                let right = self.value(&args[1])?;
                Ok(left == right)
            }
            "Fn::Not" => {
                let args = fixed_args(function, arg, 1)?;
                Ok(!self.evaluate(&args[0])?)
            }
            "Fn::And" | "Fn::Or" => {
                let args = arg.as_array().ok_or_else(|| malformed(function, "expected a list"))?;
                if args.is_empty() { return Err(malformed(function, "expected at least one condition")); }
                let mut results = args.iter().map(|a| self.evaluate(a));
                if function == "Fn::And" {
                    results.try_fold(true, |acc, r| r.map(|b| acc && b))
                } else {
                    results.try_fold(false, |acc, r| r.map(|b| acc || b))
                }
            }
            "Condition" => {
                let name = arg.as_str().ok_or_else(|| malformed(function, "expected a name"))?;
                self.condition(name)
            }
            other => Err(malformed(other, "not allowed in a condition")),
        }
    }
}

fn fixed_args<'a>(function: &str, arg: &'a Json, n: usize) -> Result<&'a [Json], ResolveError> {
    match arg.as_array() {
        Some(a) if a.len() == n => Ok(a.as_slice()),
        _ => Err(malformed(function, format!("expected {n} arguments"))),
    }
}

fn collect_condition_refs<'a>(expr: &'a Json, out: &mut Vec<&'a str>) {
    if let Some(("Condition", Json::String(name))) = as_intrinsic(expr) {
        out.push(name);
        return;
    }
    match expr {
        Json::Object(map) => map.values().for_each(|v| collect_condition_refs(v, out)),
        Json::Array(items) => items.iter().for_each(|v| collect_condition_refs(v, out)),
        _ => {}
    }
}

fn condition_order(template: &Template) -> Result<Vec<&str>, ResolveError> {
    let mut g: DiGraph<&str, ()> = DiGraph::new();
    let mut name_to_ix = HashMap::new();
    for name in template.conditions.keys() {
        name_to_ix.insert(name.as_str(), g.add_node(name.as_str()));
    }
    for (name, expr) in &template.conditions {
        let mut deps = Vec::new();
        collect_condition_refs(expr, &mut deps);
        for dep in deps {
            let from = *name_to_ix.get(dep).ok_or_else(|| ResolveError::UnknownCondition(dep.to_string()))?;
            g.add_edge(from, name_to_ix[name.as_str()], ());
        }
    }
    let order = toposort(&g, None)
        .map_err(|cycle| ResolveError::ConditionCycle(g[cycle.node_id()].to_string()))?;
    Ok(order.into_iter().map(|ix| g[ix]).collect())
}

impl Template {
    pub fn resolve(&self, inputs: &Inputs) -> Result<Resolved, ResolveError> {
        if let Some(name) = inputs.parameters.keys().find(|k| !self.parameters.contains_key(*k)) {
            return Err(ResolveError::UndeclaredParameter(name.clone()));
        }

        let mut parameters = BTreeMap::new();
        for (name, p) in &self.parameters {
            let raw = inputs.parameters.get(name).or(p.default.as_ref())
                .ok_or_else(|| ResolveError::MissingParameter(name.clone()))?;
            let value = match p.type_name {
                ParameterType::CommaDelimitedList => Json::Array(raw.split(',').map(|s| Json::String(s.to_string())).collect()),
                ParameterType::String | ParameterType::Number => Json::String(raw.clone()),
            };
            parameters.insert(name.clone(), value);
        }

        let partition = partition_for_region(&inputs.region);
        let mut values: HashMap<String, Json> = parameters.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        values.insert(intrinsics::PARTITION.to_string(), json!(partition));
        values.insert(intrinsics::REGION.to_string(), json!(inputs.region));
        values.insert(intrinsics::ACCOUNT_ID.to_string(), json!(inputs.account_id));
        values.insert(intrinsics::STACK_NAME.to_string(), json!(inputs.stack_name));
        values.insert(intrinsics::URL_SUFFIX.to_string(), json!(url_suffix_for_partition(partition)));
        values.insert(intrinsics::NOTIFICATION_ARNS.to_string(), json!([]));

        let mut scope = Scope {
            values,
            resources: self.resources.keys().map(String::as_str).collect(),
            conditions: BTreeMap::new(),
        };
        for name in condition_order(self)? {
            let result = scope.evaluate(&self.conditions[name])?;
            scope.conditions.insert(name.to_string(), result);
        }

        let mut resources = BTreeMap::new();
        for (name, r) in &self.resources {
            if let Some(c) = &r.condition {
                if !scope.condition(c)? { continue; }
            }
            let body = serde_json::to_value(r).map_err(|e| malformed("resource", e.to_string()))?;
            if let Some(v) = scope.value(&body)? { resources.insert(name.clone(), v); }
        }

        let mut outputs = BTreeMap::new();
        for (name, o) in &self.outputs {
            if let Some(c) = &o.condition {
                if !scope.condition(c)? { continue; }
            }
            if let Some(v) = scope.value(&o.value)? { outputs.insert(name.clone(), v); }
        }

        Ok(Resolved { parameters, conditions: scope.conditions, resources, outputs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intrinsics::*;
    use crate::template::{CfnResource, Output, Parameter};

    fn bucket(props: Json) -> CfnResource {
        let Json::Object(map) = props else { panic!("object expected") };
        CfnResource::new("AWS::S3::Bucket", map)
    }

    #[test]
    fn test_should_split_comma_delimited_list_and_use_defaults() {
        let mut t = Template::default();
        t.add_parameter("Names", Parameter::comma_delimited_list().default_value("")).unwrap();
        t.add_parameter("Alias", Parameter::string().default_value("cdn.example.com")).unwrap();
        let r = t.resolve(&Inputs::default().with_parameter("Names", "a,b")).unwrap();
        assert_eq!(r.parameters["Names"], json!(["a", "b"]));
        assert_eq!(r.parameters["Alias"], json!("cdn.example.com"));

        let r = t.resolve(&Inputs::default()).unwrap();
        assert_eq!(r.parameters["Names"], json!([""]));
    }

    #[test]
    fn test_should_fail_on_missing_or_undeclared_parameter() {
        let mut t = Template::default();
        t.add_parameter("DomainName", Parameter::string()).unwrap();
        assert_eq!(t.resolve(&Inputs::default()).unwrap_err(), ResolveError::MissingParameter("DomainName".into()));
        let inputs = Inputs::default().with_parameter("DomainName", "x").with_parameter("Typo", "y");
        assert_eq!(t.resolve(&inputs).unwrap_err(), ResolveError::UndeclaredParameter("Typo".into()));
    }

    #[test]
    fn test_should_drop_no_value_keys_and_list_items() {
        let mut t = Template::default();
        t.add_parameter("Alias", Parameter::string().default_value("")).unwrap();
        t.add_condition("NoAlias", equals(ref_("Alias"), json!(""))).unwrap();
        t.add_resource("B", bucket(json!({
            "Aliases": if_("NoAlias", no_value(), json!([ref_("Alias")])),
            "Tags": [if_("NoAlias", no_value(), json!("x")), "kept"],
        }))).unwrap();

        let r = t.resolve(&Inputs::default()).unwrap();
        assert!(r.conditions["NoAlias"]);
        assert_eq!(r.resources["B"]["Properties"], json!({ "Tags": ["kept"] }));

        let r = t.resolve(&Inputs::default().with_parameter("Alias", "media.example.com")).unwrap();
        assert_eq!(r.resources["B"]["Properties"]["Aliases"], json!(["media.example.com"]));
    }

    #[test]
    fn test_should_resolve_join_split_and_select() {
        let mut t = Template::default();
        t.add_parameter("Names", Parameter::comma_delimited_list()).unwrap();
        t.add_output("First", Output::new("d", select(0, ref_("Names")))).unwrap();
        t.add_output("Joined", Output::new("d", join(";", ref_("Names")))).unwrap();
        t.add_output("Split", Output::new("d", split(";", join(";", ref_("Names"))))).unwrap();
        t.add_output("Arn", Output::new("d", join("", vec![json!("arn:"), ref_(PARTITION)]))).unwrap();
        let r = t.resolve(&Inputs::default().with_parameter("Names", "a,b").with_region("us-gov-west-1")).unwrap();
        assert_eq!(r.outputs["First"], json!("a"));
        assert_eq!(r.outputs["Joined"], json!("a;b"));
        assert_eq!(r.outputs["Split"], json!(["a", "b"]));
        assert_eq!(r.outputs["Arn"], json!("arn:aws-us-gov"));
    }

    #[test]
    fn test_should_leave_resource_references_unresolved() {
        let mut t = Template::default();
        t.add_resource("B", bucket(json!({}))).unwrap();
        let arn = join("", vec![json!("arn:"), ref_(PARTITION), json!(":s3:::"), ref_("B")]);
        t.add_output("Arn", Output::new("d", arn)).unwrap();
        t.add_output("Domain", Output::new("d", get_att("B", "DomainName"))).unwrap();
        let r = t.resolve(&Inputs::default()).unwrap();
        assert_eq!(r.outputs["Arn"], json!({ "Fn::Join": ["", ["arn:", "aws", ":s3:::", { "Ref": "B" }]] }));
        assert_eq!(r.outputs["Domain"], get_att("B", "DomainName"));
    }

    #[test]
    fn test_should_evaluate_conditions_in_dependency_order() {
        let mut t = Template::default();
        t.add_parameter("A", Parameter::string().default_value("")).unwrap();
        // Defined alphabetically before the condition it depends on.
        t.add_condition("AHasValue", not(condition("NoA"))).unwrap();
        t.add_condition("Both", and(vec![condition("AHasValue"), equals(ref_("A"), json!("x"))])).unwrap();
        t.add_condition("NoA", equals(ref_("A"), json!(""))).unwrap();
        t.add_condition("Either", or(vec![condition("NoA"), condition("Both")])).unwrap();
        let r = t.resolve(&Inputs::default().with_parameter("A", "x")).unwrap();
        assert!(!r.conditions["NoA"]);
        assert!(r.conditions["AHasValue"]);
        assert!(r.conditions["Both"]);
        assert!(r.conditions["Either"]);
    }

    #[test]
    fn test_should_reject_condition_cycles_and_unknown_conditions() {
        let mut t = Template::default();
        t.add_condition("A", condition("B")).unwrap();
        t.add_condition("B", condition("A")).unwrap();
        assert!(matches!(t.resolve(&Inputs::default()), Err(ResolveError::ConditionCycle(_))));

        let mut t = Template::default();
        t.add_condition("A", not(condition("Missing"))).unwrap();
        assert_eq!(t.resolve(&Inputs::default()).unwrap_err(), ResolveError::UnknownCondition("Missing".into()));

        let mut t = Template::default();
        t.add_output("O", Output::new("d", if_("Missing", json!(1), json!(2)))).unwrap();
        assert_eq!(t.resolve(&Inputs::default()).unwrap_err(), ResolveError::UnknownCondition("Missing".into()));
    }

    #[test]
    fn test_should_skip_conditional_resources_and_outputs() {
        let mut t = Template::default();
        t.add_condition("Off", json!({ "Fn::Equals": ["a", "b"] })).unwrap();
        t.add_resource("B", bucket(json!({})).with_condition("Off")).unwrap();
        let mut o = Output::new("d", get_att("B", "DomainName"));
        o.condition = Some("Off".into());
        t.add_output("D", o).unwrap();
        let r = t.resolve(&Inputs::default()).unwrap();
        assert!(r.resources.is_empty());
        assert!(r.outputs.is_empty());
    }

    #[test]
    fn test_should_report_unknown_reference() {
        let mut t = Template::default();
        t.add_output("O", Output::new("d", ref_("Nope"))).unwrap();
        assert_eq!(t.resolve(&Inputs::default()).unwrap_err(), ResolveError::UnknownReference("Nope".into()));
    }

    #[test]
    fn test_should_map_regions_to_partitions() {
        assert_eq!(partition_for_region("us-east-1"), "aws");
        assert_eq!(partition_for_region("us-gov-west-1"), "aws-us-gov");
        assert_eq!(partition_for_region("cn-north-1"), "aws-cn");
    }
}
