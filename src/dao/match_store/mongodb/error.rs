use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

/// Convenient result alias returning [`MongoDaoError`] failures.
pub type MongoResult<T> = Result<T, MongoDaoError>;

/// Failures that can occur while interacting with MongoDB.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save {kind} `{id}`")]
    Save {
        kind: &'static str,
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load {kind} `{id}`")]
    Load {
        kind: &'static str,
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list {kind} of `{parent}`")]
    List {
        kind: &'static str,
        parent: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("stored document `{id}` is invalid: {reason}")]
    InvalidDocument { id: Uuid, reason: String },
}
