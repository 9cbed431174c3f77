//! Mapping of AWS SDK failures onto [`SecretError`]

use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use secman_secrets::SecretError;

/// How a Secrets Manager error code should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ServiceClass {
    NotFound,
    Duplicate,
    InvalidInput,
    /// Credentials missing, expired or rejected
    Auth,
    /// Worth another attempt
    Transient,
    Fatal,
}

/// Classify a service error by its AWS error code and message.
pub(crate) fn classify_code(operation: &str, code: Option<&str>, message: &str) -> ServiceClass {
    match code.unwrap_or_default() {
        "ResourceNotFoundException" => ServiceClass::NotFound,
        "ResourceExistsException" => ServiceClass::Duplicate,
        // A secret pending deletion still holds its name but cannot be read
        "InvalidRequestException" if message.contains("deletion") => {
            if operation == "CreateSecret" {
                ServiceClass::Duplicate
            } else {
                ServiceClass::NotFound
            }
        }
        "InvalidRequestException" | "InvalidParameterException" | "ValidationException" => {
            ServiceClass::InvalidInput
        }
        "AccessDeniedException"
        | "UnrecognizedClientException"
        | "InvalidSignatureException"
        | "IncompleteSignature"
        | "MissingAuthenticationToken"
        | "ExpiredTokenException"
        | "InvalidClientTokenId" => ServiceClass::Auth,
        "ThrottlingException"
        | "TooManyRequestsException"
        | "RequestLimitExceeded"
        | "InternalServiceError"
        | "InternalFailure"
        | "ServiceUnavailable" => ServiceClass::Transient,
        _ => ServiceClass::Fatal,
    }
}

/// Whether a non-service failure came from credential resolution
fn is_credentials_failure(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("credentials") || lower.contains("no identity")
}

/// Translate an SDK error for `operation` on secret `id`.
pub(crate) fn classify<E, R>(operation: &'static str, id: &str, err: SdkError<E, R>) -> SecretError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let context = DisplayErrorContext(&err).to_string();

    match &err {
        SdkError::ServiceError(_) => {
            let code = err.code().map(str::to_string);
            let message = err.message().unwrap_or(&context).to_string();
            let summary = format!("{}: {message}", code.as_deref().unwrap_or("UnknownError"));

            match classify_code(operation, code.as_deref(), &message) {
                ServiceClass::NotFound => SecretError::not_found(id),
                ServiceClass::Duplicate => SecretError::DuplicateName {
                    name: id.to_string(),
                },
                ServiceClass::InvalidInput => SecretError::invalid_input(summary),
                ServiceClass::Auth => SecretError::service_with_source(
                    operation,
                    format!("authentication or authorization failed ({summary})"),
                    false,
                    err,
                ),
                ServiceClass::Transient => {
                    SecretError::service_with_source(operation, summary, true, err)
                }
                ServiceClass::Fatal => {
                    SecretError::service_with_source(operation, summary, false, err)
                }
            }
        }
        SdkError::TimeoutError(_) | SdkError::ResponseError(_) => {
            SecretError::service_with_source(operation, context, true, err)
        }
        SdkError::DispatchFailure(failure) => {
            if is_credentials_failure(&context) {
                return SecretError::configuration(context);
            }
            let retryable = failure.is_io() || failure.is_timeout();
            SecretError::service_with_source(operation, context, retryable, err)
        }
        _ => {
            if is_credentials_failure(&context) {
                SecretError::configuration(context)
            } else {
                SecretError::service_with_source(operation, context, false, err)
            }
        }
    }
}
