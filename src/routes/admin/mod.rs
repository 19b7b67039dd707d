//! Placement cell operations. Every route in here sits behind
//! [`require_operator`].

mod companies;
mod drives;
mod mailbot;
mod students;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::web;
use actix_web_lab::middleware::Next;
use anyhow::anyhow;

use crate::authentication::{basic_authentication, validate_credentials};
use crate::configuration::OperatorSettings;
use crate::routes::ApiError;

pub use companies::approve_company;
pub use drives::{create_drive, notify_drive};
pub use mailbot::{generate_draft, send_mailbot_notification};
pub use students::{send_bulk_welcome, set_student_flags};

/// Rejects requests that do not carry the operator's basic auth credentials.
pub async fn require_operator(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let operator = req
        .app_data::<web::Data<OperatorSettings>>()
        .cloned()
        .ok_or_else(|| ApiError::Unexpected(anyhow!("operator settings are not registered")))?;

    let credentials = basic_authentication(req.headers()).map_err(ApiError::Unauthorized)?;

    validate_credentials(credentials, &operator)
        .await
        .map_err(ApiError::from)?;

    next.call(req).await
}
