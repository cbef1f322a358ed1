//! Template content helpers: `$$` placeholders and form validation.

pub mod placeholder;
pub mod validation;

pub use placeholder::{TemplateContent, PLACEHOLDER};
pub use validation::{parse_tags, CategoryChoice, LoginForm, NewTemplateForm, RegisterForm};
