use thiserror::Error;

use crate::domain::price_table::ItemType;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("invalid `{field}`: {message}")]
    Validation { field: String, message: String },
    #[error("{item_type} `{name}` was not found in the price tables")]
    NotFound { item_type: ItemType, name: String },
    #[error("price tables unavailable from {source_name}: {reason}")]
    DataUnavailable { source_name: String, reason: String },
    #[error("price table `{table}` is invalid: {reason}")]
    InvalidTable { table: String, reason: String },
    #[error("{operation} timed out after {millis}ms")]
    Timeout { operation: String, millis: u64 },
    #[error("batch task failed: {0}")]
    TaskFailed(String),
}

impl PricingError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::NotFound { .. } => "not_found",
            Self::DataUnavailable { .. } | Self::Timeout { .. } => "data_unavailable",
            Self::InvalidTable { .. } => "invalid_table",
            Self::TaskFailed(_) => "internal",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "Pricing data is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = || "unassigned".to_owned();
        match value {
            ApplicationError::Pricing(
                error @ (PricingError::Validation { .. } | PricingError::NotFound { .. }),
            ) => Self::BadRequest { message: error.to_string(), correlation_id: unassigned() },
            ApplicationError::Pricing(
                error @ (PricingError::DataUnavailable { .. } | PricingError::Timeout { .. }),
            ) => Self::ServiceUnavailable {
                message: error.to_string(),
                correlation_id: unassigned(),
            },
            ApplicationError::Pricing(
                error @ (PricingError::InvalidTable { .. } | PricingError::TaskFailed(_)),
            ) => Self::Internal { message: error.to_string(), correlation_id: unassigned() },
            ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id: unassigned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: unassigned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::price_table::ItemType;
    use crate::errors::{ApplicationError, InterfaceError, PricingError};

    #[test]
    fn validation_error_maps_to_bad_request_interface_error() {
        let interface =
            ApplicationError::from(PricingError::validation("quantity", "must be greater than 0"))
                .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert!(interface.message().contains("quantity"));
    }

    #[test]
    fn bad_request_has_user_safe_message() {
        let interface = ApplicationError::from(PricingError::NotFound {
            item_type: ItemType::Product,
            name: "Tier 9".to_owned(),
        })
        .into_interface("req-2");

        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn data_unavailable_maps_to_service_unavailable() {
        let interface = ApplicationError::from(PricingError::DataUnavailable {
            source_name: "sqlite".to_owned(),
            reason: "database lock timeout".to_owned(),
        })
        .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(interface.correlation_id(), "req-3");
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface = ApplicationError::Configuration("bad tables path".to_owned())
            .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }

    #[test]
    fn timeouts_share_the_data_unavailable_class() {
        let error = PricingError::Timeout { operation: "table refresh".to_owned(), millis: 250 };
        assert_eq!(error.error_class(), "data_unavailable");
        assert_eq!(error.to_string(), "table refresh timed out after 250ms");
    }
}
