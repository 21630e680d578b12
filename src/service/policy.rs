use crate::error::ConfigError;
use axum::http::StatusCode;

/// How store faults on writes are reported to the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StoreFaultPolicy {
    /// Every store fault is 500.
    #[default]
    Uniform,
    /// A failed create is 404; update and delete faults are 500.
    Legacy,
}

impl StoreFaultPolicy {
    pub fn create_fault_status(self) -> StatusCode {
        match self {
            StoreFaultPolicy::Uniform => StatusCode::INTERNAL_SERVER_ERROR,
            StoreFaultPolicy::Legacy => StatusCode::NOT_FOUND,
        }
    }

    pub fn write_fault_status(self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl std::str::FromStr for StoreFaultPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uniform" => Ok(StoreFaultPolicy::Uniform),
            "legacy" => Ok(StoreFaultPolicy::Legacy),
            _ => Err(ConfigError::InvalidValue {
                key: "STORE_FAULT_POLICY",
                value: s.to_string(),
            }),
        }
    }
}
