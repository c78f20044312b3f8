use crate::models::User;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

// DTOs define the shapes exchanged with clients. They are kept separate from
// the database models so the API never leaks password hashes or tokens.

// ============================================================================
// Authentication DTOs
// ============================================================================

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterUserDto {
    #[validate(length(min = 1, message = "Name is required"))]
    pub username: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(custom(function = "validate_phone"))]
    pub mobile_phone: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(
        length(min = 1, message = "Confirm Password is required"),
        must_match(other = "password", message = "passwords do not match")
    )]
    #[serde(rename = "confirmPassword")]
    pub password_confirm: String,
}

/// Phone numbers follow the Egyptian mobile format: 11 digits, `01` prefix,
/// third digit selecting the carrier.
fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let valid = phone.len() == 11
        && phone.starts_with("01")
        && matches!(phone.as_bytes()[2], b'0' | b'1' | b'2' | b'5')
        && phone.bytes().all(|b| b.is_ascii_digit());

    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_phone")
            .with_message("A valid Egyptian mobile number is required".into()))
    }
}

/// Login accepts either email or username as the identifier.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(length(min = 1, message = "Email or username is required"))]
    pub identifier: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Password re-check for destructive operations (account deletion).
#[derive(Validate, Serialize, Deserialize)]
pub struct DoubleCheckDto {
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Serialize, Deserialize, Validate, Debug)]
pub struct ActivateQueryDto {
    #[validate(length(min = 1, message = "Token is required."))]
    pub token: String,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct ForgotPasswordRequestDto {
    #[validate(length(min = 1, message = "Identifier is required"))]
    pub identifier: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ResetPasswordRequestDto {
    #[validate(length(min = 1, message = "Token is required."))]
    pub token: String,

    #[validate(length(min = 6, message = "new password must be at least 6 characters"))]
    pub new_password: String,

    #[validate(
        length(
            min = 6,
            message = "new password confirm must be at least 6 characters"
        ),
        must_match(other = "new_password", message = "new passwords do not match")
    )]
    pub new_password_confirm: String,
}

// ============================================================================
// User response & update DTOs
// ============================================================================

/// Client-safe user projection (no hash, no tokens).
#[derive(Debug, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "mobilePhone")]
    pub mobile_phone: String,
    pub role: String,
    pub verified: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            name: user.username.to_owned(),
            email: user.email.to_owned(),
            mobile_phone: user.mobile_phone.to_owned(),
            verified: user.verified,
            role: user.role.to_str().to_string(),
            created_at: user.created_at.unwrap(),
            updated_at: user.updated_at.unwrap(),
        }
    }

    pub fn filter_users(users: &[User]) -> Vec<FilterUserDto> {
        users.iter().map(FilterUserDto::filter_user).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserData {
    pub user: FilterUserDto,
}

/// Profile plus activity counters for the dashboard header.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserMeData {
    pub user: FilterUserDto,
    pub project_count: i64,
    pub donation_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserMeResponseDto {
    pub status: String,
    pub data: UserMeData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub status: String,
    pub data: UserData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponseDto {
    pub status: String,
    pub users: Vec<FilterUserDto>,
    pub results: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginResponseDto {
    pub status: String,
    pub access_token: String,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponseDto {
    pub status: String,
    pub access_token: String,
}

/// Generic success envelope.
#[derive(Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct NameUpdateDto {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct PhoneUpdateDto {
    #[validate(custom(function = "validate_phone"))]
    pub mobile_phone: String,
}

#[derive(Debug, Validate, Default, Clone, Serialize, Deserialize)]
pub struct UserPasswordUpdateDto {
    #[validate(length(min = 6, message = "new password must be at least 6 characters"))]
    pub new_password: String,

    #[validate(
        length(
            min = 6,
            message = "new password confirm must be at least 6 characters"
        ),
        must_match(other = "new_password", message = "new passwords do not match")
    )]
    pub new_password_confirm: String,

    #[validate(length(min = 6, message = "Old password must be at least 6 characters"))]
    pub old_password: String,
}

// ============================================================================
// Pagination
// ============================================================================

#[derive(Serialize, Deserialize, Validate, Debug)]
pub struct RequestQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<usize>,

    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginationDto {
    pub page: i32,
    pub limit: i32,
    pub total: i32,
    #[serde(rename = "totalPages")]
    pub total_pages: i32,
}

// ============================================================================
// Project DTOs
// ============================================================================

/// Project create/edit payload. Tags arrive as one comma-separated string
/// and are split server-side.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_project_times"))]
pub struct SaveProjectDto {
    #[validate(length(min = 1, max = 200, message = "Title is required."))]
    pub title: String,

    #[validate(length(min = 1, message = "Details are required."))]
    pub details: String,

    pub category_id: i32,

    #[validate(custom(function = "validate_target"))]
    pub total_target: Decimal,

    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    pub tags: Option<String>,
}

impl SaveProjectDto {
    /// Split the raw tag string into trimmed, non-empty names.
    pub fn tag_names(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn validate_target(total_target: &Decimal) -> Result<(), ValidationError> {
    if *total_target >= Decimal::ONE {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_target")
            .with_message("Target amount must be at least 1".into()))
    }
}

fn validate_project_times(dto: &SaveProjectDto) -> Result<(), ValidationError> {
    if dto.end_time > dto.start_time {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_times")
            .with_message("End time must be later than start time.".into()))
    }
}

/// Full project row joined with category and creator names.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectDto {
    pub id: i32,
    pub title: String,
    pub details: String,
    pub category_id: i32,
    #[serde(rename = "categoryName")]
    pub category_name: String,
    #[serde(rename = "creatorUsername")]
    pub creator_username: String,
    #[serde(rename = "totalTarget")]
    pub total_target: Decimal,
    #[serde(rename = "startTime")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "endTime")]
    pub end_time: DateTime<Utc>,
    #[serde(rename = "isFeatured")]
    pub is_featured: bool,
    #[serde(rename = "isCancelled")]
    pub is_cancelled: bool,
    pub slug: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Trimmed row for listings; carries the donation sum so cards can render a
/// progress bar without another round trip.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectSummaryDto {
    pub id: i32,
    pub title: String,
    #[serde(rename = "categoryName")]
    pub category_name: String,
    #[serde(rename = "creatorUsername")]
    pub creator_username: String,
    #[serde(rename = "totalTarget")]
    pub total_target: Decimal,
    #[serde(rename = "totalDonations")]
    pub total_donations: Decimal,
    #[serde(rename = "endTime")]
    pub end_time: DateTime<Utc>,
    #[serde(rename = "isFeatured")]
    pub is_featured: bool,
    #[serde(rename = "isCancelled")]
    pub is_cancelled: bool,
    pub slug: String,
}

/// Detail view: project plus every derived figure the page shows.
#[derive(Debug, Serialize)]
pub struct ProjectDetailDto {
    #[serde(flatten)]
    pub project: ProjectDto,
    pub tags: Vec<String>,
    #[serde(rename = "totalDonations")]
    pub total_donations: Decimal,
    #[serde(rename = "donationPercentage")]
    pub donation_percentage: Decimal,
    #[serde(rename = "averageRating")]
    pub average_rating: Decimal,
    #[serde(rename = "recentDonations")]
    pub recent_donations: Vec<DonationDto>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponseDto {
    pub status: String,
    pub data: ProjectDto,
}

#[derive(Debug, Serialize)]
pub struct ProjectDetailResponseDto {
    pub status: String,
    pub data: ProjectDetailDto,
}

#[derive(Debug, Serialize)]
pub struct ProjectListResponseDto {
    pub status: String,
    pub data: Vec<ProjectSummaryDto>,
    pub pagination: Option<PaginationDto>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProjectsQueryParams {
    #[validate(range(min = 1))]
    pub page: Option<i32>,

    #[validate(range(min = 1, max = 50))]
    pub limit: Option<i32>,

    pub category: Option<i32>,

    #[validate(length(min = 1))]
    pub q: Option<String>,
}

// ============================================================================
// Donation DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SaveDonationDto {
    #[validate(custom(function = "validate_amount"))]
    pub amount: Decimal,
}

fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_amount")
            .with_message("Donation amount must be positive".into()))
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct DonationDto {
    pub id: i32,
    #[serde(rename = "userUsername")]
    pub user_username: String,
    pub amount: Decimal,
    #[serde(rename = "donatedAt")]
    pub donated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DonationListResponse {
    pub status: String,
    pub data: Vec<DonationDto>,
    pub pagination: PaginationDto,
}

#[derive(Debug, Serialize)]
pub struct SingleDonationResponse {
    pub status: String,
    pub data: DonationDto,
}

// ============================================================================
// Comment DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct SaveCommentDto {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Content must be between 1 and 1000 characters"
    ))]
    pub content: String,

    #[serde(rename = "parentId")]
    pub parent_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentDto {
    pub id: i32,
    #[serde(rename = "userUsername")]
    pub user_username: String,
    pub content: String,
    #[serde(rename = "parentId")]
    pub parent_id: Option<i32>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Top-level comment with its replies attached underneath.
#[derive(Debug, Serialize)]
pub struct CommentThreadDto {
    #[serde(flatten)]
    pub comment: CommentDto,
    pub replies: Vec<CommentDto>,
}

#[derive(Debug, Serialize)]
pub struct CommentListResponse {
    pub status: String,
    pub data: Vec<CommentThreadDto>,
    pub pagination: PaginationDto,
}

#[derive(Debug, Serialize)]
pub struct SingleCommentResponse {
    pub status: String,
    pub data: CommentDto,
}

// ============================================================================
// Rating DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SaveRatingDto {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub value: i32,
}

#[derive(Debug, Serialize)]
pub struct RatingResponseDto {
    pub status: String,
    pub value: i32,
    #[serde(rename = "averageRating")]
    pub average_rating: Decimal,
}

// ============================================================================
// Report DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SaveReportDto {
    #[validate(length(min = 1, max = 2000, message = "Reason is required"))]
    pub reason: String,
}

// ============================================================================
// Category DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    pub status: String,
    pub data: Vec<crate::models::Category>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn project_dto(start_offset: i64, end_offset: i64) -> SaveProjectDto {
        let now = Utc::now();
        SaveProjectDto {
            title: "Clean Water".to_string(),
            details: "Wells for three villages".to_string(),
            category_id: 1,
            total_target: Decimal::from(1000),
            start_time: now + Duration::hours(start_offset),
            end_time: now + Duration::hours(end_offset),
            tags: Some("water, infrastructure ,water".to_string()),
        }
    }

    #[test]
    fn project_with_end_after_start_is_valid() {
        assert!(project_dto(0, 48).validate().is_ok());
    }

    #[test]
    fn project_with_end_before_start_is_rejected() {
        assert!(project_dto(48, 0).validate().is_err());
    }

    #[test]
    fn project_with_end_equal_start_is_rejected() {
        let mut dto = project_dto(0, 48);
        dto.end_time = dto.start_time;
        assert!(dto.validate().is_err());
    }

    #[test]
    fn project_target_below_one_is_rejected() {
        let mut dto = project_dto(0, 48);
        dto.total_target = Decimal::ZERO;
        assert!(dto.validate().is_err());
        dto.total_target = Decimal::new(5, 1); // 0.5
        assert!(dto.validate().is_err());
    }

    #[test]
    fn tag_names_are_trimmed_and_non_empty() {
        let dto = project_dto(0, 48);
        assert_eq!(dto.tag_names(), vec!["water", "infrastructure", "water"]);

        let mut empty = project_dto(0, 48);
        empty.tags = None;
        assert!(empty.tag_names().is_empty());
    }

    #[test]
    fn donation_amount_must_be_positive() {
        let ok = SaveDonationDto {
            amount: Decimal::new(1, 2), // 0.01
        };
        assert!(ok.validate().is_ok());

        let zero = SaveDonationDto {
            amount: Decimal::ZERO,
        };
        assert!(zero.validate().is_err());

        let negative = SaveDonationDto {
            amount: Decimal::from(-5),
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn rating_value_is_bounded() {
        assert!(SaveRatingDto { value: 1 }.validate().is_ok());
        assert!(SaveRatingDto { value: 5 }.validate().is_ok());
        assert!(SaveRatingDto { value: 0 }.validate().is_err());
        assert!(SaveRatingDto { value: 6 }.validate().is_err());
    }

    #[test]
    fn phone_format_is_enforced() {
        let mut dto = RegisterUserDto {
            username: "amira".to_string(),
            email: "amira@example.com".to_string(),
            mobile_phone: "01012345678".to_string(),
            password: "secret1".to_string(),
            password_confirm: "secret1".to_string(),
        };
        assert!(dto.validate().is_ok());

        dto.mobile_phone = "01312345678".to_string(); // bad carrier digit
        assert!(dto.validate().is_err());

        dto.mobile_phone = "0101234567".to_string(); // too short
        assert!(dto.validate().is_err());

        dto.mobile_phone = "0101234567a".to_string(); // non-digit
        assert!(dto.validate().is_err());
    }
}
