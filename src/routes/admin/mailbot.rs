use actix_web::{web, HttpResponse};

use crate::domain::RecipientEmail;
use crate::draft::{extract_subject, DraftGenerator};
use crate::notifications::Notifier;
use crate::records::RecordStore;
use crate::routes::ApiError;

#[derive(serde::Deserialize)]
pub struct DraftData {
    company_name: String,
    role: String,
    #[serde(default)]
    raw_context: String,
}

/// Always answers 200: when the provider fails, `draft` holds a fixed
/// message for the operator and `generated` is false.
#[tracing::instrument(
    name = "drafting a notification",
    skip(data, drafts),
    fields(company_name = %data.company_name, role = %data.role)
)]
pub async fn generate_draft(
    data: web::Json<DraftData>,
    drafts: web::Data<DraftGenerator>,
) -> HttpResponse {
    let (draft, generated) = match drafts
        .draft(&data.company_name, &data.role, &data.raw_context)
        .await
    {
        Ok(draft) => (draft, true),
        Err(e) => {
            tracing::warn!(
                error.cause_chain = ?e,
                error.message = %e,
                "draft generation failed"
            );
            (e.user_message().to_string(), false)
        }
    };

    HttpResponse::Ok().json(serde_json::json!({
        "draft": draft,
        "generated": generated,
    }))
}

#[derive(serde::Deserialize)]
pub struct SendData {
    draft: String,
    company_name: String,
    role: String,
}

/// Broadcasts a reviewed draft to every registered student.
#[tracing::instrument(
    name = "sending mail bot notification",
    skip(data, records, notifier),
    fields(company_name = %data.company_name, role = %data.role)
)]
pub async fn send_mailbot_notification(
    data: web::Json<SendData>,
    records: web::Data<dyn RecordStore>,
    notifier: web::Data<Notifier>,
) -> Result<HttpResponse, ApiError> {
    if data.draft.trim().is_empty() {
        return Err(ApiError::Validation("The draft must not be empty.".into()));
    }

    let recipients: Vec<RecipientEmail> = records
        .list_students()
        .await?
        .into_iter()
        .map(|student| student.email)
        .collect();
    let subject = extract_subject(&data.draft, &data.company_name, &data.role);

    let result = notifier
        .send_bulk_notification(&recipients, &subject, &data.draft)
        .await;
    Ok(HttpResponse::Ok().json(result))
}
