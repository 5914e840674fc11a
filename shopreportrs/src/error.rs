use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("sql generation error: {0}")]
    Sql(String),
    #[error("execution error: {0}")]
    Execution(String),
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error("No organization in session context")]
    MissingOrg,
    #[error("Report not found")]
    ReportNotFound,
    #[error("Base record type not found")]
    BaseRecordNotFound,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
