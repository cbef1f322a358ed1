use reqwest::Method;
use serde::Deserialize;
use tracing::info;

use super::HttpApi;
use crate::errors::ClientError;
use crate::models::{
    CreateTemplateRequest, TemplateItem, TemplateVersion, UpdateTemplateRequest, Visibility,
};

/// `GET /templates/{id}`: the template plus its newest version, when known.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateDetails {
    pub template: TemplateItem,
    #[serde(default)]
    pub latest_version: Option<TemplateVersion>,
}

impl TemplateDetails {
    /// Newest content, falling back to the version embedded in the template row.
    pub fn current_version(&self) -> Option<&TemplateVersion> {
        self.latest_version
            .as_ref()
            .or(self.template.latest_version.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTemplateResponse {
    #[serde(default)]
    pub template: Option<TemplateItem>,
    #[serde(default)]
    pub new_version: Option<TemplateVersion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForkResponse {
    pub template: TemplateItem,
    #[serde(default)]
    pub version: Option<TemplateVersion>,
}

#[derive(Debug, Deserialize)]
struct TemplateEnvelope {
    template: TemplateItem,
}

#[derive(Debug, Deserialize)]
struct VersionsEnvelope {
    #[serde(default)]
    versions: Option<Vec<TemplateVersion>>,
}

impl HttpApi {
    pub async fn get_template(&self, template_id: &str) -> Result<TemplateDetails, ClientError> {
        let path = format!("/templates/{template_id}");
        self.send_json(self.request(Method::GET, &path)).await
    }

    pub async fn create_template(&self, request: &CreateTemplateRequest) -> Result<TemplateItem, ClientError> {
        let body: TemplateEnvelope = self
            .send_json(self.request(Method::POST, "/templates").json(request))
            .await?;
        info!("Created template {} ({})", body.template.id, body.template.title);
        Ok(body.template)
    }

    /// Full update. A changed `content` comes back as `new_version`.
    pub async fn update_template(&self, request: &UpdateTemplateRequest) -> Result<UpdateTemplateResponse, ClientError> {
        let path = format!("/templates/{}", request.template_id);
        self.send_json(self.request(Method::PUT, &path).json(request)).await
    }

    /// Share or unshare: an update that only flips visibility.
    pub async fn set_visibility(
        &self,
        template: &TemplateItem,
        content: &str,
        visibility: Visibility,
    ) -> Result<UpdateTemplateResponse, ClientError> {
        let mut request = UpdateTemplateRequest::from_template(template, content);
        request.visibility = visibility;
        self.update_template(&request).await
    }

    /// Versions newest first.
    pub async fn list_versions(&self, template_id: &str, page_size: u32) -> Result<Vec<TemplateVersion>, ClientError> {
        let path = format!("/templates/{template_id}/versions");
        let builder = self
            .request(Method::GET, &path)
            .query(&[("page_size", page_size.to_string())]);
        let body: VersionsEnvelope = self.send_json(builder).await?;
        Ok(body.versions.unwrap_or_default())
    }
}
