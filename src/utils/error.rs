use thiserror::Error;

#[derive(Error, Debug)]
pub enum WarehouseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV export error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Ledger error: {message}")]
    StoreError { message: String },

    #[error("Slot {slot_id} is no longer available: {reason}")]
    SlotConflict { slot_id: u64, reason: String },

    #[error("Item {item_id} is not held by any slot")]
    ItemMissing { item_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    Storage,
    Concurrency,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl WarehouseError {
    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreError {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::ValidationError { .. } => ErrorCategory::Validation,
            Self::StoreError { .. } | Self::ItemMissing { .. } => ErrorCategory::Storage,
            Self::SlotConflict { .. } => ErrorCategory::Concurrency,
            Self::IoError(_) | Self::SerializationError(_) | Self::CsvError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation => ErrorSeverity::Low,
            // 衝突可重試
            ErrorCategory::Concurrency => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Storage => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the TOML configuration file and CLI flags",
            ErrorCategory::Validation => "Correct the command arguments and try again",
            ErrorCategory::Storage => "Verify the ledger file is readable and run `reload`",
            ErrorCategory::Concurrency => "Another writer touched the slot; run `reload` and retry",
            ErrorCategory::System => "Check disk space and file permissions",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::SlotConflict { slot_id, .. } => {
                format!("Slot {} was taken by someone else, nothing was changed", slot_id)
            }
            Self::ValidationError { message } => format!("Invalid input: {}", message),
            other => format!("System Error: {}", other),
        }
    }
}

pub type Result<T> = std::result::Result<T, WarehouseError>;
