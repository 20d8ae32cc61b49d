//! crates/study_hub_core/src/domain.rs
//!
//! Defines the pure, core data structures for the study hub.
//! These structs are independent of any database or wire format; the `serde`
//! derives only exist so adapters can embed answers and echo records back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Doubts
//=========================================================================================

/// Lifecycle of a doubt. New doubts always start out as `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoubtStatus {
    Pending,
    Resolved,
}

impl DoubtStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoubtStatus::Pending => "pending",
            DoubtStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for DoubtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoubtStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DoubtStatus::Pending),
            "resolved" => Ok(DoubtStatus::Resolved),
            other => Err(format!("unknown doubt status '{}'", other)),
        }
    }
}

/// A peer answer. Only ever lives inside a [`Doubt`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub answer_text: String,
    pub answered_by: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// A student-submitted question awaiting peer answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doubt {
    pub id: Uuid,
    pub question_text: String,
    pub subject: String,
    pub asked_by: Uuid,
    pub status: DoubtStatus,
    pub answers: Vec<Answer>,
    pub timestamp: DateTime<Utc>,
}

/// A doubt as handed to the store, before it has been assigned an id.
#[derive(Debug, Clone)]
pub struct NewDoubt {
    pub question_text: String,
    pub subject: String,
    pub asked_by: Uuid,
    pub status: DoubtStatus,
    pub answers: Vec<Answer>,
    pub timestamp: DateTime<Utc>,
}

/// Whitelisted partial update of a doubt. `id` and `timestamp` are not part
/// of it, so they cannot be rewritten after creation.
#[derive(Debug, Clone, Default)]
pub struct DoubtUpdate {
    pub question_text: Option<String>,
    pub subject: Option<String>,
    pub status: Option<DoubtStatus>,
    pub answers: Option<Vec<Answer>>,
}

impl DoubtUpdate {
    pub fn is_empty(&self) -> bool {
        self.question_text.is_none()
            && self.subject.is_none()
            && self.status.is_none()
            && self.answers.is_none()
    }
}

/// Filter for multi-reads over the `doubts` collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoubtFilter {
    All,
    Subject(String),
    AskedBy(Uuid),
}

//=========================================================================================
// Resources
//=========================================================================================

/// Classification of an uploaded resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceCategory {
    Notes,
    #[serde(rename = "PYQ")]
    Pyq,
    Syllabus,
    Links,
}

impl ResourceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceCategory::Notes => "Notes",
            ResourceCategory::Pyq => "PYQ",
            ResourceCategory::Syllabus => "Syllabus",
            ResourceCategory::Links => "Links",
        }
    }
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Notes" => Ok(ResourceCategory::Notes),
            "PYQ" => Ok(ResourceCategory::Pyq),
            "Syllabus" => Ok(ResourceCategory::Syllabus),
            "Links" => Ok(ResourceCategory::Links),
            other => Err(format!("unknown resource category '{}'", other)),
        }
    }
}

/// Metadata of an uploaded file (notes, papers, reference material).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: Uuid,
    /// Display title, not the name of the uploaded file.
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
    pub subject: String,
    pub category: ResourceCategory,
    pub uploaded_by: Uuid,
    pub uploaded_by_name: String,
    pub description: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Caller-supplied resource metadata. `uploaded_at` is assigned by the repository.
#[derive(Debug, Clone)]
pub struct ResourceMetadata {
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
    pub subject: String,
    pub category: ResourceCategory,
    pub uploaded_by: Uuid,
    pub uploaded_by_name: String,
    pub description: Option<String>,
}

/// A resource as handed to the store, before it has been assigned an id.
#[derive(Debug, Clone)]
pub struct NewResource {
    pub metadata: ResourceMetadata,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceFilter {
    All,
    Subject(String),
    Category(ResourceCategory),
}

//=========================================================================================
// Users
//=========================================================================================

/// Profile document kept in the `users` collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub uid: Uuid,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub profile_picture_url: Option<String>,
    pub class: Option<String>,
    pub semester: Option<String>,
    pub karma_points: i64,
}

/// Partial profile fields, used both for profile creation and updates.
#[derive(Debug, Clone, Default)]
pub struct UserProfileUpdate {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub profile_picture_url: Option<String>,
    pub class: Option<String>,
    pub semester: Option<String>,
    pub karma_points: Option<i64>,
}

// Represents an account - used by the auth boundary
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

//=========================================================================================
// AI doubt solver
//=========================================================================================

#[derive(Debug, Clone)]
pub struct DoubtSolverInput {
    pub doubt_text: String,
    pub subject_material: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoubtSolverOutput {
    pub suggestions: String,
}
