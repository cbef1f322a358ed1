pub mod catalog;
pub mod prompt;
pub mod template;
pub mod user;

pub use catalog::{CategoryStat, TagStat};
pub use prompt::{CreatePromptRequest, Prompt};
pub use template::{
    CreateTemplateRequest, SocialKind, SocialState, TemplateItem, TemplateVersion,
    UpdateTemplateRequest, Visibility,
};
pub use user::{
    AuthResponse, LoginRequest, RegisterRequest, SendVerificationCodeRequest, UpdateProfileRequest,
    UpdatedProfile, UserProfile,
};
