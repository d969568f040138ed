//! Turning an uploaded roster into students enrolled in a new class.

use std::collections::HashSet;

use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::db::Store;
use crate::error::{PaddyError, PaddyResult};
use crate::models::class::Class;
use crate::models::student::Student;

/// A roster row as it appears in the file. Everything is optional here so
/// that incomplete rows can be dropped instead of failing the whole upload.
#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "ID")]
    id: Option<String>,
    #[serde(rename = "FirstName")]
    first_name: Option<String>,
    #[serde(rename = "LastName")]
    last_name: Option<String>,
    #[serde(rename = "Email")]
    email: Option<String>,
    #[serde(rename = "Username")]
    username: Option<String>,
    #[serde(rename = "Department")]
    department: Option<String>,
}

impl RosterRow {
    fn into_student(self) -> Option<Student> {
        let id = present(self.id)?.parse::<i64>().ok().filter(|id| *id > 0)?;
        let mut student = Student::new(id, present(self.first_name)?, present(self.last_name)?);
        student.email = present(self.email).unwrap_or_default();
        student.username = present(self.username).unwrap_or_default();
        student.department = present(self.department).unwrap_or_default();

        Some(student)
    }
}

fn present(field: Option<String>) -> Option<String> {
    field
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Parses a CSV roster, dropping rows without a usable ID, first name or
/// last name. Repeated IDs keep their first row.
pub fn parse_roster(contents: &[u8]) -> PaddyResult<Vec<Student>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(contents);

    let mut seen = HashSet::new();
    let mut students = Vec::new();
    for (index, row) in reader.deserialize::<RosterRow>().enumerate() {
        match row?.into_student() {
            Some(student) => {
                if seen.insert(student.id) {
                    students.push(student);
                } else {
                    warn!(row = index + 1, id = student.id, "dropping duplicate roster row");
                }
            }
            None => warn!(row = index + 1, "dropping incomplete roster row"),
        }
    }

    Ok(students)
}

/// The details of a class being created from a roster.
#[derive(Debug, Clone)]
pub struct ClassUpload {
    pub class_id: i64,
    pub name: String,
    pub subject: String,
    pub section: String,
    pub submission_deadline: Option<OffsetDateTime>,
    pub roster: Vec<u8>,
}

impl ClassUpload {
    /// Builds an upload out of loosely-typed form fields, rejecting it
    /// before any parsing if something required is missing.
    pub fn from_fields(
        class_id: Option<String>,
        name: Option<String>,
        subject: Option<String>,
        section: Option<String>,
        submission_deadline: Option<String>,
        roster: Option<Vec<u8>>,
    ) -> PaddyResult<Self> {
        let required = |field: Option<String>, name: &str| {
            present(field).ok_or_else(|| PaddyError::InvalidInput(format!("{} is required", name)))
        };

        let class_id = required(class_id, "ClassID")?;
        let class_id = class_id
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| PaddyError::InvalidInput(format!("{} is not a valid ID", class_id)))?;
        let submission_deadline = present(submission_deadline)
            .map(|deadline| {
                OffsetDateTime::parse(&deadline, &time::format_description::well_known::Rfc3339)
                    .map_err(|err| {
                        PaddyError::InvalidInput(format!("invalid submissionDeadline: {}", err))
                    })
            })
            .transpose()?;
        let roster = roster
            .filter(|contents| !contents.is_empty())
            .ok_or_else(|| PaddyError::InvalidInput("a roster file is required".to_owned()))?;

        Ok(Self {
            class_id,
            name: required(name, "Name")?,
            subject: required(subject, "Subject")?,
            section: required(section, "Section")?,
            submission_deadline,
            roster,
        })
    }
}

/// What a roster upload did.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub class: Class,
    pub new_students: usize,
    pub existing_students: usize,
}

/// Creates a class from a roster, inserting only the students that aren't
/// already known and enrolling everyone listed.
///
/// Uploads for a class owned by someone else are rejected before anything is
/// written. Otherwise nothing is rolled back on failure: students inserted
/// before an error stay, and uploading the same roster again finishes the job.
pub async fn ingest_roster(
    upload: ClassUpload,
    instructor_id: i64,
    store: &dyn Store,
) -> PaddyResult<IngestReport> {
    if let Some(existing) = store.class(upload.class_id).await? {
        if !existing.taught_by(instructor_id) {
            return Err(PaddyError::forbidden(format!(
                "class {} belongs to another instructor",
                upload.class_id
            )));
        }
    }

    let parsed = parse_roster(&upload.roster)?;
    let ids: Vec<i64> = parsed.iter().map(|student| student.id).collect();

    let existing: HashSet<i64> = store
        .students(&ids)
        .await?
        .into_iter()
        .map(|student| student.id)
        .collect();
    let new_students: Vec<Student> = parsed
        .into_iter()
        .filter(|student| !existing.contains(&student.id))
        .collect();
    let new_count = new_students.len();
    store.insert_students(new_students).await?;

    let class = Class {
        id: upload.class_id,
        name: upload.name,
        subject: upload.subject,
        section: upload.section,
        instructor: instructor_id,
        students: ids,
        groups: Vec::new(),
        submission_deadline: upload.submission_deadline,
    };
    Class::create_or_resume(class.clone(), store).await?;

    info!(
        class = class.id,
        new = new_count,
        existing = existing.len(),
        "ingested roster"
    );

    Ok(IngestReport {
        class: Class::with_id(class.id, store).await?,
        new_students: new_count,
        existing_students: existing.len(),
    })
}
