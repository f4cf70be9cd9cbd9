use thiserror::Error;

pub type KpiResult<T> = Result<T, KpiError>;

#[derive(Error, Debug)]
pub enum KpiError {
    #[error("Empty workbook: {0}")]
    EmptyWorkbook(String),

    #[error("No usable data: {0}")]
    NoUsableData(String),

    #[error("Workbook read error: {0}")]
    Workbook(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Import error: {0}")]
    Import(String),
}

impl KpiError {
    /// True when the error rejects a single workbook outright.
    ///
    /// Batch hosts report these per file and keep going.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            KpiError::EmptyWorkbook(_) | KpiError::NoUsableData(_) | KpiError::Workbook(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_classification() {
        assert!(KpiError::EmptyWorkbook("no sheets".to_string()).is_rejection());
        assert!(KpiError::NoUsableData("no numbers".to_string()).is_rejection());
        assert!(KpiError::Workbook("bad zip".to_string()).is_rejection());
        assert!(!KpiError::Export("disk full".to_string()).is_rejection());
        assert!(!KpiError::Import("missing kpis".to_string()).is_rejection());
    }

    #[test]
    fn test_error_messages() {
        let err = KpiError::NoUsableData("no column carries numeric data".to_string());
        assert_eq!(
            err.to_string(),
            "No usable data: no column carries numeric data"
        );
    }
}
