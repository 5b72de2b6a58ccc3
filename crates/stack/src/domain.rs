use assetstack_cfn::intrinsics::{equals, join};
use assetstack_cfn::{Parameter, Template};
use serde_json::{json, Value as Json};

use crate::error::StackResult;

/// Source of the primary domain and its alternates.
pub trait DomainNames {
    /// Expression yielding the primary domain name.
    fn primary(&self) -> Json;
    /// Expression yielding the list of alternate domain names.
    fn alternates(&self) -> Json;
    /// Name of the condition that holds when there are no alternates.
    fn no_alternates(&self) -> &str;
}

/// Domain names supplied as stack parameters.
#[derive(Debug, Clone)]
pub struct DomainParameters {
    primary: Json,
    alternates: Json,
    no_alternates: String,
}

impl DomainParameters {
    pub fn register(t: &mut Template) -> StackResult<Self> {
        let primary = t.add_parameter("DomainName", Parameter::string()
            .description("The fully-qualified domain name for the application."))?;
        let alternates = t.add_parameter("DomainNameAlternates", Parameter::comma_delimited_list()
            .description("A comma-separated list of alternate domain names for the application \
                          (e.g. www.example.com), or blank for none.")
            .default_value(""))?;
        let no_alternates = t.add_condition("NoAlternateDomains",
            equals(join("", alternates.clone()), json!("")))?;
        Ok(Self { primary, alternates, no_alternates })
    }
}

impl DomainNames for DomainParameters {
    fn primary(&self) -> Json { self.primary.clone() }
    fn alternates(&self) -> Json { self.alternates.clone() }
    fn no_alternates(&self) -> &str { &self.no_alternates }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetstack_cfn::Inputs;

    #[test]
    fn test_should_register_parameters_and_condition() {
        let mut t = Template::default();
        let d = DomainParameters::register(&mut t).unwrap();
        assert_eq!(d.primary(), json!({ "Ref": "DomainName" }));
        assert_eq!(d.no_alternates(), "NoAlternateDomains");
        assert!(t.parameters.contains_key("DomainNameAlternates"));

        let r = t.resolve(&Inputs::default().with_parameter("DomainName", "example.com")).unwrap();
        assert!(r.conditions["NoAlternateDomains"]);
        let r = t.resolve(&Inputs::default()
            .with_parameter("DomainName", "example.com")
            .with_parameter("DomainNameAlternates", "www.example.com")).unwrap();
        assert!(!r.conditions["NoAlternateDomains"]);
    }
}
