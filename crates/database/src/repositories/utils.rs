use services::common::RepositoryError;
use tokio_postgres::error::SqlState;

/// Convert tokio_postgres::Error to RepositoryError
pub fn map_db_error(err: tokio_postgres::Error) -> RepositoryError {
    // Handle database-level errors (connection, auth, etc.)
    if err.is_closed() {
        return RepositoryError::ConnectionFailed("Connection closed".to_string());
    }

    // Handle SQL state errors
    if let Some(db_err) = err.as_db_error() {
        let message = db_err.message();

        match db_err.code() {
            &SqlState::UNDEFINED_TABLE => RepositoryError::NotFound(message.to_string()),

            // Rows rejected by the table's constraints
            &SqlState::CHECK_VIOLATION
            | &SqlState::NOT_NULL_VIOLATION
            | &SqlState::STRING_DATA_RIGHT_TRUNCATION => {
                RepositoryError::ValidationFailed(message.to_string())
            }

            // Connection/auth errors
            &SqlState::INVALID_PASSWORD | &SqlState::INVALID_AUTHORIZATION_SPECIFICATION => {
                RepositoryError::AuthenticationFailed
            }
            &SqlState::CONNECTION_EXCEPTION
            | &SqlState::CONNECTION_DOES_NOT_EXIST
            | &SqlState::CONNECTION_FAILURE => {
                RepositoryError::ConnectionFailed(message.to_string())
            }

            // Default case - wrap in generic database error
            _ => RepositoryError::DatabaseError(anyhow::anyhow!(
                "Database error ({}): {}",
                db_err.code().code(),
                message
            )),
        }
    } else {
        // Non-SQL errors (connection issues, etc.)
        RepositoryError::DatabaseError(err.into())
    }
}
