//! Driver KYC documents and the gate on going online.
//!
//! `not_uploaded → pending_review → verified | rejected`, and a re-upload from
//! any state goes back to `pending_review`.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::driver::{self, ApprovalStatus, DocumentStatus};
use crate::entities::notification::NotificationKind;
use crate::error::{AppError, AppResult};
use crate::AppState;

const REUPLOAD_REQUIRED: &str = "Documents are already rejected. Wait for the driver to re-upload new documents before reviewing again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Verify,
    Reject,
}

impl ReviewAction {
    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw {
            "verify" => Ok(ReviewAction::Verify),
            "reject" => Ok(ReviewAction::Reject),
            _ => Err(AppError::BadRequest(
                "Action must be 'verify' or 'reject'".to_string(),
            )),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct DocumentUpload {
    pub license_image: Option<String>,
    pub aadhaar_image: Option<String>,
    pub id_proof_image: Option<String>,
    pub aadhaar_number: Option<String>,
    pub license_number: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Strip whitespace and require exactly 12 digits
pub fn normalize_aadhaar(raw: &str) -> AppResult<String> {
    let digits: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::BadRequest(
            "Aadhaar number must be 12 digits".to_string(),
        ));
    }

    Ok(digits)
}

/// A new license or Aadhaar image always sends the driver back to review.
pub fn status_after_upload(current: DocumentStatus, new_image: bool) -> DocumentStatus {
    if new_image {
        DocumentStatus::PendingReview
    } else {
        current
    }
}

/// Admin review is only possible while documents await it.
pub fn review_outcome(current: DocumentStatus, action: ReviewAction) -> AppResult<DocumentStatus> {
    match (current, action) {
        (DocumentStatus::NotUploaded, _) => Err(AppError::BadRequest(
            "Driver has not uploaded any documents yet".to_string(),
        )),
        (DocumentStatus::Rejected, _) => Err(AppError::BadRequest(REUPLOAD_REQUIRED.to_string())),
        (DocumentStatus::Verified, _) => Err(AppError::BadRequest(
            "Documents are already verified".to_string(),
        )),
        (DocumentStatus::PendingReview, ReviewAction::Verify) => Ok(DocumentStatus::Verified),
        (DocumentStatus::PendingReview, ReviewAction::Reject) => Ok(DocumentStatus::Rejected),
    }
}

pub fn ensure_can_go_online(driver: &driver::Model) -> AppResult<()> {
    if driver.is_approved != ApprovalStatus::Approved {
        return Err(AppError::BadRequest(
            "Profile not yet approved by admin".to_string(),
        ));
    }

    let refusal = match driver.document_status {
        DocumentStatus::Verified => return Ok(()),
        DocumentStatus::NotUploaded => "Please upload your Aadhaar card and driving license first",
        DocumentStatus::PendingReview => "Your documents are pending admin review",
        DocumentStatus::Rejected => {
            "Your documents were rejected. Please re-upload with correct documents"
        }
    };

    Err(AppError::BadRequest(refusal.to_string()))
}

async fn find_driver(state: &AppState, driver_id: Uuid) -> AppResult<driver::Model> {
    driver::Entity::find_by_id(driver_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver not found".to_string()))
}

pub async fn upload(
    state: &AppState,
    driver: driver::Model,
    upload: DocumentUpload,
) -> AppResult<driver::Model> {
    let aadhaar_number = non_empty(upload.aadhaar_number)
        .map(|raw| normalize_aadhaar(&raw))
        .transpose()?;
    let license_number = non_empty(upload.license_number);
    let license_image = non_empty(upload.license_image);
    let aadhaar_image = non_empty(upload.aadhaar_image);
    let id_proof_image = non_empty(upload.id_proof_image);

    if aadhaar_number.is_none()
        && license_number.is_none()
        && license_image.is_none()
        && aadhaar_image.is_none()
        && id_proof_image.is_none()
    {
        return Err(AppError::BadRequest("No documents provided".to_string()));
    }

    let new_image = license_image.is_some() || aadhaar_image.is_some();
    let status = status_after_upload(driver.document_status, new_image);
    let driver_id = driver.id;

    let mut active: driver::ActiveModel = driver.into();
    if let Some(number) = aadhaar_number {
        active.aadhaar_number = Set(number);
    }
    if let Some(number) = license_number {
        active.license_number = Set(number);
    }
    if let Some(url) = license_image {
        active.license_image = Set(url);
    }
    if let Some(url) = aadhaar_image {
        active.aadhaar_image = Set(url);
    }
    if let Some(url) = id_proof_image {
        active.id_proof_image = Set(url);
    }
    if new_image {
        active.document_status = Set(status);
        active.verification_remarks = Set(String::new());
        active.verified_at = Set(None);
        // Unverified drivers cannot stay online
        active.is_online = Set(false);
    }

    let driver = active.update(&state.db).await?;

    tracing::info!(%driver_id, status = ?driver.document_status, "Driver documents uploaded");

    Ok(driver)
}

pub async fn review(
    state: &AppState,
    driver_id: Uuid,
    action: ReviewAction,
    remarks: Option<String>,
) -> AppResult<driver::Model> {
    let driver = find_driver(state, driver_id).await?;
    let status = review_outcome(driver.document_status, action)?;
    let user_id = driver.user_id;

    let mut active: driver::ActiveModel = driver.into();
    active.document_status = Set(status);

    let (kind, title, remarks) = match action {
        ReviewAction::Verify => {
            let remarks = non_empty(remarks).unwrap_or_else(|| "Documents verified successfully".to_string());
            active.verified_at = Set(Some(Utc::now().into()));
            active.is_approved = Set(ApprovalStatus::Approved);
            (NotificationKind::DocsVerified, "Documents Verified", remarks)
        }
        ReviewAction::Reject => {
            let remarks = non_empty(remarks).unwrap_or_else(|| "Documents rejected".to_string());
            active.is_online = Set(false);
            (NotificationKind::DocsRejected, "Documents Rejected", remarks)
        }
    };
    active.verification_remarks = Set(remarks.clone());

    let driver = active.update(&state.db).await?;

    tracing::info!(%driver_id, ?action, "Driver documents reviewed");

    let message = match action {
        ReviewAction::Verify => format!("Your documents have been verified. {}", remarks),
        ReviewAction::Reject => format!(
            "Your documents were rejected. Reason: {}. Please re-upload.",
            remarks
        ),
    };
    state
        .notifier
        .notify(user_id, kind, title, message, "/driver/documents");

    Ok(driver)
}

/// Flip availability. Only going online is gated.
pub async fn toggle_online(state: &AppState, driver: driver::Model) -> AppResult<driver::Model> {
    let going_online = !driver.is_online;
    if going_online {
        ensure_can_go_online(&driver)?;
    }

    let driver_id = driver.id;
    let mut active: driver::ActiveModel = driver.into();
    active.is_online = Set(going_online);
    let driver = active.update(&state.db).await?;

    tracing::info!(%driver_id, is_online = going_online, "Driver availability changed");

    Ok(driver)
}

pub async fn set_approval(
    state: &AppState,
    driver_id: Uuid,
    approval: ApprovalStatus,
) -> AppResult<driver::Model> {
    let driver = find_driver(state, driver_id).await?;
    let user_id = driver.user_id;

    let mut active: driver::ActiveModel = driver.into();
    active.is_approved = Set(approval);
    if approval != ApprovalStatus::Approved {
        active.is_online = Set(false);
    }
    let driver = active.update(&state.db).await?;

    tracing::info!(%driver_id, ?approval, "Driver approval changed");

    match approval {
        ApprovalStatus::Approved => state.notifier.notify(
            user_id,
            NotificationKind::ProfileApproved,
            "Profile Approved",
            "Your driver profile has been approved. You can go online once your documents are verified.",
            "/driver/profile",
        ),
        ApprovalStatus::Rejected => state.notifier.notify(
            user_id,
            NotificationKind::ProfileRejected,
            "Profile Rejected",
            "Your driver profile was rejected by the admin. Contact support for details.",
            "/driver/profile",
        ),
        ApprovalStatus::Pending => {}
    }

    Ok(driver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::driver::{Languages, VehicleTypes};

    fn driver(approval: ApprovalStatus, documents: DocumentStatus) -> driver::Model {
        driver::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            license_number: String::new(),
            license_image: String::new(),
            id_proof_image: String::new(),
            aadhaar_number: String::new(),
            aadhaar_image: String::new(),
            document_status: documents,
            verification_remarks: String::new(),
            verified_at: None,
            experience: 3,
            languages: Languages::default(),
            vehicle_types: VehicleTypes::default(),
            city: "Pune".to_string(),
            is_approved: approval,
            is_online: false,
            rating: 0.0,
            total_reviews: 0,
            total_earnings: 0,
            completed_jobs: 0,
            created_at: Utc::now().into(),
        }
    }

    fn bad_request(result: AppResult<impl std::fmt::Debug>) -> String {
        match result {
            Err(AppError::BadRequest(msg)) => msg,
            other => panic!("expected bad request, got {:?}", other),
        }
    }

    #[test]
    fn test_aadhaar_normalization() {
        assert_eq!(normalize_aadhaar("1234 5678 9012").unwrap(), "123456789012");
        assert_eq!(
            bad_request(normalize_aadhaar("1234 5678")),
            "Aadhaar number must be 12 digits"
        );
        assert!(normalize_aadhaar("12345678901a").is_err());
        assert!(normalize_aadhaar("1234567890123").is_err());
    }

    #[test]
    fn test_image_upload_resets_review() {
        for current in [
            DocumentStatus::NotUploaded,
            DocumentStatus::Verified,
            DocumentStatus::Rejected,
        ] {
            assert_eq!(status_after_upload(current, true), DocumentStatus::PendingReview);
            assert_eq!(status_after_upload(current, false), current);
        }
    }

    #[test]
    fn test_review_from_pending() {
        assert_eq!(
            review_outcome(DocumentStatus::PendingReview, ReviewAction::Verify).unwrap(),
            DocumentStatus::Verified
        );
        assert_eq!(
            review_outcome(DocumentStatus::PendingReview, ReviewAction::Reject).unwrap(),
            DocumentStatus::Rejected
        );
    }

    #[test]
    fn test_review_guards() {
        assert_eq!(
            bad_request(review_outcome(DocumentStatus::Rejected, ReviewAction::Reject)),
            REUPLOAD_REQUIRED
        );
        assert_eq!(
            bad_request(review_outcome(DocumentStatus::Rejected, ReviewAction::Verify)),
            REUPLOAD_REQUIRED
        );
        assert_eq!(
            bad_request(review_outcome(DocumentStatus::Verified, ReviewAction::Verify)),
            "Documents are already verified"
        );
        for action in [ReviewAction::Verify, ReviewAction::Reject] {
            assert_eq!(
                bad_request(review_outcome(DocumentStatus::NotUploaded, action)),
                "Driver has not uploaded any documents yet"
            );
        }
    }

    #[test]
    fn test_online_gate_messages() {
        assert_eq!(
            bad_request(ensure_can_go_online(&driver(ApprovalStatus::Pending, DocumentStatus::Verified))),
            "Profile not yet approved by admin"
        );
        assert_eq!(
            bad_request(ensure_can_go_online(&driver(ApprovalStatus::Approved, DocumentStatus::NotUploaded))),
            "Please upload your Aadhaar card and driving license first"
        );
        assert_eq!(
            bad_request(ensure_can_go_online(&driver(ApprovalStatus::Approved, DocumentStatus::PendingReview))),
            "Your documents are pending admin review"
        );
        assert_eq!(
            bad_request(ensure_can_go_online(&driver(ApprovalStatus::Approved, DocumentStatus::Rejected))),
            "Your documents were rejected. Please re-upload with correct documents"
        );
        assert!(ensure_can_go_online(&driver(ApprovalStatus::Approved, DocumentStatus::Verified)).is_ok());
    }

    #[test]
    fn test_review_action_parsing() {
        assert_eq!(ReviewAction::parse("verify").unwrap(), ReviewAction::Verify);
        assert_eq!(ReviewAction::parse("reject").unwrap(), ReviewAction::Reject);
        assert_eq!(
            bad_request(ReviewAction::parse("approve")),
            "Action must be 'verify' or 'reject'"
        );
    }
}
