use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::{ClientError, FieldErrors};
use crate::models::{CreateTemplateRequest, LoginRequest, RegisterRequest, Visibility};

/// `type` sent for templates created from the client.
pub const USER_TEMPLATE_TYPE: &str = "user";

const DEFAULT_LANGUAGE: &str = "en";
const MIN_PASSWORD_LEN: usize = 8;

lazy_static! {
    static ref USER_ID_PATTERN: Regex = Regex::new(r"^[a-zA-Z0-9_]+$").unwrap();
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Comma-separated tag input: trimmed, blanks dropped, order kept.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Category picked in the create dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryChoice {
    Existing(String),
    /// "Create new" with whatever was typed as the custom name.
    CreateNew(String),
}

#[derive(Debug, Clone, Default)]
pub struct NewTemplateForm {
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: Option<CategoryChoice>,
    pub tags: String,
    pub visibility: Visibility,
    pub language: String,
}

impl NewTemplateForm {
    /// Check required fields and build the create payload.
    /// All failures are reported together, keyed by field.
    pub fn validate(&self) -> Result<CreateTemplateRequest, ClientError> {
        let mut errors = FieldErrors::default();
        if is_blank(&self.title) {
            errors.insert("title", "Title is required");
        }
        if is_blank(&self.content) {
            errors.insert("content", "Content is required");
        }
        let category = match &self.category {
            None => {
                errors.insert("category", "Select a category");
                String::new()
            }
            Some(CategoryChoice::Existing(name)) if is_blank(name) => {
                errors.insert("category", "Select a category");
                String::new()
            }
            Some(CategoryChoice::Existing(name)) => name.clone(),
            Some(CategoryChoice::CreateNew(name)) => {
                if is_blank(name) {
                    errors.insert("custom_category", "Category name is required");
                }
                name.trim().to_string()
            }
        };
        errors.into_result()?;

        let language = if is_blank(&self.language) {
            DEFAULT_LANGUAGE.to_string()
        } else {
            // "en-US" -> "en"
            self.language.split('-').next().unwrap_or(DEFAULT_LANGUAGE).to_string()
        };

        Ok(CreateTemplateRequest {
            title: self.title.trim().to_string(),
            description: self.description.clone(),
            content: self.content.clone(),
            visibility: self.visibility,
            category,
            tags: parse_tags(&self.tags),
            template_type: USER_TEMPLATE_TYPE.to_string(),
            language,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub id: String,
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub verification_code: Option<String>,
}

/// At least eight characters with a letter and a digit.
fn password_problem(password: &str) -> Option<&'static str> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        Some("Password must be at least 8 characters")
    } else if !password.chars().any(|c| c.is_alphabetic()) {
        Some("Password must contain a letter")
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        Some("Password must contain a digit")
    } else {
        None
    }
}

impl RegisterForm {
    pub fn validate(&self) -> Result<RegisterRequest, ClientError> {
        let mut errors = FieldErrors::default();
        if is_blank(&self.id) {
            errors.insert("id", "User ID is required");
        } else if !USER_ID_PATTERN.is_match(&self.id) {
            errors.insert("id", "Only letters, digits and underscores are allowed");
        }
        if is_blank(&self.email) {
            errors.insert("email", "Email is required");
        }
        if is_blank(&self.display_name) {
            errors.insert("display_name", "Display name is required");
        }
        if let Some(problem) = password_problem(&self.password) {
            errors.insert("password", problem);
        }
        errors.into_result()?;

        Ok(RegisterRequest {
            id: self.id.clone(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            display_name: self.display_name.trim().to_string(),
            verification_code: self
                .verification_code
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        })
    }
}

/// `identifier` is an email address or a user id.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub identifier: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<LoginRequest, ClientError> {
        let mut errors = FieldErrors::default();
        if is_blank(&self.identifier) {
            errors.insert("identifier", "Email or user ID is required");
        }
        if self.password.is_empty() {
            errors.insert("password", "Password is required");
        }
        errors.into_result()?;

        Ok(LoginRequest {
            email: self.identifier.trim().to_string(),
            password: self.password.clone(),
        })
    }
}
