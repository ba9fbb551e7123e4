//! Application form schema.
//!
//! Runs twice per submission: once before any upload, where an attached file
//! stands in for the resume URL, and again in the repository right before the
//! insert, where the resume URL must be present.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::FieldErrors;

/// Raw submitted fields. Missing fields deserialize as empty strings so the
/// schema can report them instead of the extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationForm {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub phone: String,
    pub nationality: String,
    pub coverletter: String,
    pub resume: String,
}

/// A form that passed the schema. Strings are trimmed and the email lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidApplication {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub phone: String,
    pub nationality: String,
    pub coverletter: String,
    /// Empty only when validated with a pending upload.
    pub resume: String,
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
            .expect("email pattern compiles")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

fn required(errors: &mut FieldErrors, field: &'static str, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(field, format!("{field} is required"));
    }
    trimmed.to_string()
}

impl ApplicationForm {
    /// Validates every field and reports all failures at once.
    ///
    /// `resume_pending` is set when a new file is attached; the resume URL is
    /// then filled after upload and may be empty here.
    pub fn validate(&self, resume_pending: bool) -> Result<ValidApplication, FieldErrors> {
        let mut errors = FieldErrors::new();

        let firstname = required(&mut errors, "firstname", &self.firstname);
        let lastname = required(&mut errors, "lastname", &self.lastname);

        let email = self.email.trim().to_lowercase();
        if email.is_empty() {
            errors.push("email", "email is required");
        } else if !is_valid_email(&email) {
            errors.push("email", "email must be a valid address");
        }

        let phone = required(&mut errors, "phone", &self.phone);
        let nationality = required(&mut errors, "nationality", &self.nationality);
        let coverletter = required(&mut errors, "coverletter", &self.coverletter);

        let resume = self.resume.trim().to_string();
        if resume.is_empty() && !resume_pending {
            errors.push("resume", "resume is required");
        }

        errors.into_result(ValidApplication {
            firstname,
            lastname,
            email,
            phone,
            nationality,
            coverletter,
            resume,
        })
    }
}

impl ValidApplication {
    pub fn with_resume(mut self, resume: String) -> Self {
        self.resume = resume;
        self
    }

    /// Hands the normalised values back as a form, for the server-side pass.
    pub fn into_form(self) -> ApplicationForm {
        ApplicationForm {
            firstname: self.firstname,
            lastname: self.lastname,
            email: self.email,
            phone: self.phone,
            nationality: self.nationality,
            coverletter: self.coverletter,
            resume: self.resume,
        }
    }
}
