use assetstack_cfn::TemplateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("serialize resource: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type StackResult<T> = Result<T, StackError>;
