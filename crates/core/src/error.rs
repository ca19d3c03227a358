use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Classification a connection provider attaches to a low-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Could not open or configure a connection.
    Connection,
    /// The procedure call itself failed.
    Query,
    /// A result row did not have the expected shape.
    Decode,
    /// The call violated a uniqueness constraint.
    UniqueViolation,
}

/// Failure reported by a store, already translated out of driver-specific codes.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct StoreError {
    kind: StoreErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    pub fn is_unique_violation(&self) -> bool {
        self.kind == StoreErrorKind::UniqueViolation
    }
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Error initializing database connection: {0}")]
    Initialization(#[source] StoreError),

    #[error("An employee with employee number {employee_number} already exists.")]
    DuplicateKey {
        employee_number: String,
        #[source]
        source: StoreError,
    },

    #[error("{operation}")]
    Persistence {
        operation: String,
        #[source]
        source: StoreError,
    },
}

impl GatewayError {
    pub(crate) fn persistence(operation: impl Into<String>, source: StoreError) -> Self {
        Self::Persistence {
            operation: operation.into(),
            source,
        }
    }
}
