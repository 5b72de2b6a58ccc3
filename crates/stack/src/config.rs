//! Stack configuration, read once from the process environment.

pub const DEFAULT_DESCRIPTION: &str =
    "Static and media asset storage: S3 buckets with optional CloudFront distributions";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackConfig {
    /// Target is GovCloud, where CloudFront is unavailable.
    pub use_govcloud: bool,
    pub description: Option<String>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self { use_govcloud: false, description: Some(DEFAULT_DESCRIPTION.to_string()) }
    }
}

impl StackConfig {
    /// `USE_GOVCLOUD=on` selects GovCloud; any other value leaves it off.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(v) = lookup("USE_GOVCLOUD") {
            config.use_govcloud = v == "on";
        }
        if let Some(v) = lookup("STACK_DESCRIPTION") {
            config.description = Some(v);
        }
        config
    }
}
