//! Normalization of AWS SDK error shapes into provider errors.
//!
//! Service errors are rendered into a single descriptive message embedding
//! the error code, message, HTTP status, and request id. Every other SDK
//! failure shape (dispatch, timeout, construction) passes through with the
//! SDK's own display chain. Nothing here is classified as retryable; waiting
//! policy lives entirely in the manager's reconciliation loop.

use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::operation::RequestId;

use crate::api::ProviderError;

pub(super) fn normalize<E>(err: SdkError<E>) -> ProviderError
where
    E: ProvideErrorMetadata + RequestId + std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::ServiceError(context) => {
            let code = err.code().unwrap_or("unknown");
            let message = err.message().unwrap_or("no message");
            let status = context.raw().status().as_u16();
            let request_id = context.err().request_id();
            ProviderError::new(render_service_error(code, message, status, request_id))
        }
        _ => ProviderError::new(DisplayErrorContext(&err).to_string()),
    }
}

fn render_service_error(
    code: &str,
    message: &str,
    status: u16,
    request_id: Option<&str>,
) -> String {
    let mut rendered = format!("EC2 error: {code}: {message} (status {status}");
    if let Some(id) = request_id {
        rendered.push_str(", request id ");
        rendered.push_str(id);
    }
    rendered.push(')');
    rendered
}

#[cfg(test)]
mod tests {
    use super::render_service_error;

    #[test]
    fn service_errors_embed_code_message_status_and_request_id() {
        let rendered = render_service_error(
            "VolumeInUse",
            "vol-1 is currently attached to i-0abc",
            400,
            Some("req-42"),
        );

        assert_eq!(
            rendered,
            "EC2 error: VolumeInUse: vol-1 is currently attached to i-0abc \
             (status 400, request id req-42)"
        );
    }

    #[test]
    fn missing_request_id_is_omitted() {
        let rendered = render_service_error("Throttling", "rate exceeded", 503, None);

        assert_eq!(rendered, "EC2 error: Throttling: rate exceeded (status 503)");
    }
}
