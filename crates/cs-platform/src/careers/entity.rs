//! Careers Entities
//!
//! Job postings and the applications submitted against them. A posting is
//! open to applicants while it is active, in `open` status and its deadline
//! (if any) has not passed. The first move to `open` stamps `publishedAt`.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::display::{format_price_range, format_vnd};
use crate::shared::middleware::ClientMeta;
use crate::shared::query::{to_bson_datetime, PublicVisibility};
use crate::shared::slug::slugify;
use crate::shared::types::{to_rfc3339_opt, Note, NoteResponse};
use crate::shared::validation::{clean, clean_list, clean_opt, normalize_phone, Validation};
use crate::{Result, TsidGenerator};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    #[default]
    FullTime,
    PartTime,
    Contract,
    Internship,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Entry,
    Junior,
    #[default]
    Mid,
    Senior,
    Lead,
    Manager,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Draft,
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Submitted,
    Reviewing,
    Shortlisted,
    Interviewed,
    Offered,
    Hired,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SalaryRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default)]
    pub negotiable: bool,
}

impl SalaryRange {
    fn validate(&self, v: &mut Validation) {
        if let Some(min) = self.min {
            v.at_least("salaryRange.min", min, 0.0);
        }
        if let Some(max) = self.max {
            v.at_least("salaryRange.max", max, 0.0);
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            v.min_max("salaryRange", min, max);
        }
    }

    /// `"15 triệu - 25 triệu"`, `"Thỏa thuận"` when negotiable without figures.
    pub fn display(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format_price_range(min, max),
            (Some(min), None) => format!("Từ {}", format_vnd(min)),
            (None, Some(max)) => format!("Đến {}", format_vnd(max)),
            (None, None) => "Thỏa thuận".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    #[serde(rename = "_id")]
    pub id: String,

    pub title: String,

    pub slug: String,

    pub department: String,

    pub location: String,

    pub employment_type: EmploymentType,

    pub experience_level: ExperienceLevel,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_range: Option<SalaryRange>,

    pub description: String,

    #[serde(default)]
    pub requirements: Vec<String>,

    #[serde(default)]
    pub benefits: Vec<String>,

    /// Number of openings
    pub positions: u32,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub published_at: Option<DateTime<Utc>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub deadline: Option<DateTime<Utc>>,

    pub status: JobStatus,

    pub is_active: bool,

    #[serde(default)]
    pub application_count: u64,

    #[serde(default)]
    pub view_count: u64,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl PublicVisibility for JobPosting {
    fn public_filter(now: DateTime<Utc>) -> Document {
        doc! {
            "isActive": true,
            "status": "open",
            "$or": [
                { "deadline": Bson::Null },
                { "deadline": { "$gte": to_bson_datetime(now) } },
            ],
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateJobInput {
    pub title: String,
    pub slug: Option<String>,
    pub department: String,
    pub location: String,
    pub employment_type: Option<EmploymentType>,
    pub experience_level: Option<ExperienceLevel>,
    pub salary_range: Option<SalaryRange>,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    pub positions: Option<u32>,
    pub published_at: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: Option<JobStatus>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateJobInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<EmploymentType>,
    pub experience_level: Option<ExperienceLevel>,
    pub salary_range: Option<SalaryRange>,
    pub description: Option<String>,
    pub requirements: Option<Vec<String>>,
    pub benefits: Option<Vec<String>>,
    pub positions: Option<u32>,
    pub published_at: Option<DateTime<Utc>>,
    /// `null` removes the deadline
    #[serde(default, deserialize_with = "crate::shared::types::nullable")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub status: Option<JobStatus>,
    pub is_active: Option<bool>,
}

fn slug_or_derived(slug: Option<String>, title: &str) -> String {
    clean_opt(slug)
        .map(|s| s.to_lowercase())
        .unwrap_or_else(|| slugify(title))
}

impl JobPosting {
    pub fn create(input: CreateJobInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        let title = clean(input.title);
        let mut job = Self {
            id: TsidGenerator::generate(),
            slug: slug_or_derived(input.slug, &title),
            title,
            department: clean(input.department),
            location: clean(input.location),
            employment_type: input.employment_type.unwrap_or_default(),
            experience_level: input.experience_level.unwrap_or_default(),
            salary_range: input.salary_range,
            description: input.description.trim().to_string(),
            requirements: clean_list(input.requirements),
            benefits: clean_list(input.benefits),
            positions: input.positions.unwrap_or(1),
            published_at: input.published_at,
            deadline: input.deadline,
            status: JobStatus::Draft,
            is_active: input.is_active.unwrap_or(true),
            application_count: 0,
            view_count: 0,
            created_at: now,
            updated_at: now,
            created_by: actor.map(String::from),
            updated_by: actor.map(String::from),
        };
        job.set_status(input.status.unwrap_or_default(), now);
        job.validate()?;
        Ok(job)
    }

    pub fn apply(&mut self, patch: UpdateJobInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        if let Some(title) = patch.title {
            self.title = clean(title);
        }
        if let Some(slug) = patch.slug {
            self.slug = clean(slug).to_lowercase();
        }
        if let Some(department) = patch.department {
            self.department = clean(department);
        }
        if let Some(location) = patch.location {
            self.location = clean(location);
        }
        if let Some(kind) = patch.employment_type {
            self.employment_type = kind;
        }
        if let Some(level) = patch.experience_level {
            self.experience_level = level;
        }
        if let Some(salary) = patch.salary_range {
            self.salary_range = Some(salary);
        }
        if let Some(description) = patch.description {
            self.description = description.trim().to_string();
        }
        if let Some(requirements) = patch.requirements {
            self.requirements = clean_list(requirements);
        }
        if let Some(benefits) = patch.benefits {
            self.benefits = clean_list(benefits);
        }
        if let Some(positions) = patch.positions {
            self.positions = positions;
        }
        if let Some(published_at) = patch.published_at {
            self.published_at = Some(published_at);
        }
        if let Some(deadline) = patch.deadline {
            self.deadline = deadline;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        if let Some(status) = patch.status {
            self.set_status(status, now);
        }
        self.validate()?;
        self.updated_at = now;
        self.updated_by = actor.map(String::from).or(self.updated_by.take());
        Ok(())
    }

    pub fn set_status(&mut self, status: JobStatus, now: DateTime<Utc>) {
        if status == JobStatus::Open && self.published_at.is_none() {
            self.published_at = Some(now);
        }
        self.status = status;
    }

    /// Same predicate as [`PublicVisibility::public_filter`], evaluated in memory.
    pub fn is_accepting(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.status == JobStatus::Open && self.deadline.map_or(true, |d| d >= now)
    }

    fn validate(&self) -> Result<()> {
        let mut v = Validation::new();
        v.text("title", &self.title, 5, 200);
        v.slug("slug", &self.slug);
        v.text("department", &self.department, 2, 100);
        v.text("location", &self.location, 2, 200);
        v.text("description", &self.description, 20, 20000);
        v.max_items("requirements", self.requirements.len(), 50);
        v.each_text("requirements", &self.requirements, 500);
        v.max_items("benefits", self.benefits.len(), 50);
        v.each_text("benefits", &self.benefits, 500);
        if self.positions < 1 {
            v.record("positions", "must be at least 1");
        }
        if let Some(salary) = &self.salary_range {
            salary.validate(&mut v);
        }
        v.date_order("deadline", self.published_at, self.deadline);
        v.into_result()
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub department: String,
    pub location: String,
    pub employment_type: EmploymentType,
    pub experience_level: ExperienceLevel,
    pub salary_range: Option<SalaryRange>,
    pub salary_display: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
    pub positions: u32,
    pub published_at: Option<String>,
    pub deadline: Option<String>,
    pub status: JobStatus,
    pub is_active: bool,
    pub is_expired: bool,
    pub application_count: u64,
    pub view_count: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<JobPosting> for JobResponse {
    fn from(j: JobPosting) -> Self {
        let is_expired = j.deadline.is_some_and(|d| d < Utc::now());
        Self {
            salary_display: j
                .salary_range
                .map(|s| s.display())
                .unwrap_or_else(|| "Thỏa thuận".to_string()),
            id: j.id,
            title: j.title,
            slug: j.slug,
            department: j.department,
            location: j.location,
            employment_type: j.employment_type,
            experience_level: j.experience_level,
            salary_range: j.salary_range,
            description: j.description,
            requirements: j.requirements,
            benefits: j.benefits,
            positions: j.positions,
            published_at: to_rfc3339_opt(j.published_at),
            deadline: to_rfc3339_opt(j.deadline),
            status: j.status,
            is_active: j.is_active,
            is_expired,
            application_count: j.application_count,
            view_count: j.view_count,
            created_at: j.created_at.to_rfc3339(),
            updated_at: j.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    #[serde(rename = "_id")]
    pub id: String,

    pub job_id: String,

    /// Posting title at the time of applying
    pub job_title: String,

    pub full_name: String,

    pub email: String,

    pub phone: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,

    pub resume_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portfolio_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_salary: Option<f64>,

    pub status: ApplicationStatus,

    #[serde(default)]
    pub notes: Vec<Note>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub reviewed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApplyInput {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub cover_letter: Option<String>,
    pub resume_url: String,
    pub portfolio_url: Option<String>,
    pub expected_salary: Option<f64>,
}

impl JobApplication {
    pub fn create(job: &JobPosting, input: ApplyInput, client: ClientMeta, now: DateTime<Utc>) -> Result<Self> {
        let application = Self {
            id: TsidGenerator::generate(),
            job_id: job.id.clone(),
            job_title: job.title.clone(),
            full_name: clean(input.full_name),
            email: clean(input.email).to_lowercase(),
            phone: normalize_phone(&input.phone),
            cover_letter: clean_opt(input.cover_letter),
            resume_url: clean(input.resume_url),
            portfolio_url: clean_opt(input.portfolio_url),
            expected_salary: input.expected_salary,
            status: ApplicationStatus::Submitted,
            notes: Vec::new(),
            reviewed_by: None,
            reviewed_at: None,
            ip_address: client.ip_address,
            user_agent: client.user_agent,
            created_at: now,
            updated_at: now,
            updated_by: None,
        };
        application.validate()?;
        Ok(application)
    }

    /// Staff status changes record who reviewed the application and when.
    pub fn change_status(&mut self, status: ApplicationStatus, actor: Option<&str>, now: DateTime<Utc>) {
        self.status = status;
        if let Some(actor) = actor {
            self.reviewed_by = Some(actor.to_string());
        }
        self.reviewed_at = Some(now);
        self.touch(actor, now);
    }

    pub fn add_note(&mut self, content: String, actor: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        self.notes.push(Note::new(content, actor, now)?);
        self.touch(actor, now);
        Ok(())
    }

    fn touch(&mut self, actor: Option<&str>, now: DateTime<Utc>) {
        self.updated_at = now;
        self.updated_by = actor.map(String::from).or(self.updated_by.take());
    }

    fn validate(&self) -> Result<()> {
        let mut v = Validation::new();
        v.text("fullName", &self.full_name, 2, 100);
        v.email("email", &self.email);
        v.phone("phone", &self.phone);
        v.text_opt("coverLetter", self.cover_letter.as_deref(), 5000);
        if self.resume_url.is_empty() {
            v.record("resumeUrl", "is required");
        } else {
            v.url("resumeUrl", Some(&self.resume_url));
        }
        v.url("portfolioUrl", self.portfolio_url.as_deref());
        if let Some(salary) = self.expected_salary {
            v.at_least("expectedSalary", salary, 0.0);
        }
        v.into_result()
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    pub id: String,
    pub job_id: String,
    pub job_title: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub cover_letter: Option<String>,
    pub resume_url: String,
    pub portfolio_url: Option<String>,
    pub expected_salary: Option<f64>,
    pub status: ApplicationStatus,
    pub notes: Vec<NoteResponse>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<JobApplication> for ApplicationResponse {
    fn from(a: JobApplication) -> Self {
        Self {
            id: a.id,
            job_id: a.job_id,
            job_title: a.job_title,
            full_name: a.full_name,
            email: a.email,
            phone: a.phone,
            cover_letter: a.cover_letter,
            resume_url: a.resume_url,
            portfolio_url: a.portfolio_url,
            expected_salary: a.expected_salary,
            status: a.status,
            notes: a.notes.into_iter().map(Into::into).collect(),
            reviewed_by: a.reviewed_by,
            reviewed_at: to_rfc3339_opt(a.reviewed_at),
            created_at: a.created_at.to_rfc3339(),
            updated_at: a.updated_at.to_rfc3339(),
        }
    }
}

/// What the applicant gets back
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationReceipt {
    pub id: String,
    pub job_title: String,
    pub status: ApplicationStatus,
    pub created_at: String,
}

impl From<&JobApplication> for ApplicationReceipt {
    fn from(a: &JobApplication) -> Self {
        Self {
            id: a.id.clone(),
            job_title: a.job_title.clone(),
            status: a.status,
            created_at: a.created_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn job_input() -> CreateJobInput {
        CreateJobInput {
            title: "Chuyên viên Kinh doanh Bất động sản".to_string(),
            slug: None,
            department: "Sales".to_string(),
            location: "TP. Hồ Chí Minh".to_string(),
            employment_type: None,
            experience_level: Some(ExperienceLevel::Junior),
            salary_range: Some(SalaryRange { min: Some(10_000_000.0), max: Some(20_000_000.0), negotiable: true }),
            description: "Tư vấn và bán các sản phẩm bất động sản của công ty.".to_string(),
            requirements: vec!["Tốt nghiệp cao đẳng".to_string(), "  ".to_string()],
            benefits: vec![],
            positions: None,
            published_at: None,
            deadline: None,
            status: None,
            is_active: None,
        }
    }

    fn apply_input() -> ApplyInput {
        ApplyInput {
            full_name: "Lê Văn C".to_string(),
            email: "C.Le@Example.com".to_string(),
            phone: "0987 654 321".to_string(),
            cover_letter: None,
            resume_url: "https://cdn.example.com/cv.pdf".to_string(),
            portfolio_url: None,
            expected_salary: Some(15_000_000.0),
        }
    }

    #[test]
    fn test_create_defaults() {
        let job = JobPosting::create(job_input(), Some("U1"), Utc::now()).unwrap();
        assert_eq!(job.slug, "chuyen-vien-kinh-doanh-bat-dong-san");
        assert_eq!(job.status, JobStatus::Draft);
        assert_eq!(job.positions, 1);
        assert_eq!(job.requirements.len(), 1);
        assert!(job.published_at.is_none());
        assert_eq!(job.employment_type, EmploymentType::FullTime);
    }

    #[test]
    fn test_open_stamps_published_at_once() {
        let t0 = Utc::now();
        let mut job = JobPosting::create(job_input(), None, t0).unwrap();
        job.set_status(JobStatus::Open, t0);
        assert_eq!(job.published_at, Some(t0));
        job.set_status(JobStatus::Closed, t0 + Duration::days(1));
        job.set_status(JobStatus::Open, t0 + Duration::days(2));
        assert_eq!(job.published_at, Some(t0));
    }

    #[test]
    fn test_deadline_must_follow_publication() {
        let now = Utc::now();
        let mut input = job_input();
        input.published_at = Some(now);
        input.deadline = Some(now - Duration::days(1));
        assert!(JobPosting::create(input, None, now).is_err());
    }

    #[test]
    fn test_positions_and_salary_rules() {
        let mut input = job_input();
        input.positions = Some(0);
        input.salary_range = Some(SalaryRange { min: Some(20.0), max: Some(10.0), negotiable: false });
        let err = JobPosting::create(input, None, Utc::now()).unwrap_err().to_string();
        assert!(err.contains("positions"));
        assert!(err.contains("salaryRange"));
    }

    #[test]
    fn test_accepting_predicate() {
        let now = Utc::now();
        let mut input = job_input();
        input.status = Some(JobStatus::Open);
        let mut job = JobPosting::create(input, None, now).unwrap();
        assert!(job.is_accepting(now));
        job.deadline = Some(now + Duration::hours(1));
        assert!(job.is_accepting(now));
        assert!(!job.is_accepting(now + Duration::hours(2)));
        job.deadline = None;
        job.is_active = false;
        assert!(!job.is_accepting(now));
    }

    #[test]
    fn test_clear_deadline() {
        let now = Utc::now();
        let mut input = job_input();
        input.deadline = Some(now + Duration::days(30));
        let mut job = JobPosting::create(input, None, now).unwrap();
        job.apply(UpdateJobInput { deadline: Some(None), ..Default::default() }, None, now).unwrap();
        assert!(job.deadline.is_none());
    }

    #[test]
    fn test_salary_display() {
        let negotiable = SalaryRange { min: None, max: None, negotiable: true };
        assert_eq!(negotiable.display(), "Thỏa thuận");
        let range = SalaryRange { min: Some(10_000_000.0), max: Some(20_000_000.0), negotiable: false };
        assert_eq!(range.display(), "10 triệu - 20 triệu");
    }

    #[test]
    fn test_application_create_and_review() {
        let now = Utc::now();
        let job = JobPosting::create(job_input(), None, now).unwrap();
        let mut application = JobApplication::create(&job, apply_input(), ClientMeta::default(), now).unwrap();
        assert_eq!(application.job_id, job.id);
        assert_eq!(application.email, "c.le@example.com");
        assert_eq!(application.phone, "0987654321");
        assert_eq!(application.status, ApplicationStatus::Submitted);

        application.change_status(ApplicationStatus::Shortlisted, Some("U9"), now);
        assert_eq!(application.reviewed_by.as_deref(), Some("U9"));
        assert_eq!(application.reviewed_at, Some(now));
    }

    #[test]
    fn test_application_requires_resume() {
        let job = JobPosting::create(job_input(), None, Utc::now()).unwrap();
        let mut input = apply_input();
        input.resume_url = " ".to_string();
        input.cover_letter = Some("x".repeat(5001));
        let err = JobApplication::create(&job, input, ClientMeta::default(), Utc::now())
            .unwrap_err()
            .to_string();
        assert!(err.contains("resumeUrl"));
        assert!(err.contains("coverLetter"));
    }
}
