use reqwest::Method;
use serde::Deserialize;

use super::HttpApi;
use crate::errors::ClientError;
use crate::models::{CreatePromptRequest, Prompt};

#[derive(Debug, Deserialize)]
struct PromptEnvelope {
    prompt: Prompt,
}

#[derive(Debug, Deserialize)]
struct PromptsEnvelope {
    #[serde(default)]
    prompts: Option<Vec<Prompt>>,
}

impl HttpApi {
    pub async fn create_prompt(&self, request: &CreatePromptRequest) -> Result<Prompt, ClientError> {
        let body: PromptEnvelope = self
            .send_json(self.request(Method::POST, "/prompts").json(request))
            .await?;
        Ok(body.prompt)
    }

    /// Saved prompts, optionally narrowed to one template and/or owner.
    pub async fn list_prompts(&self, template_id: Option<&str>, owner_id: Option<&str>) -> Result<Vec<Prompt>, ClientError> {
        let mut query = Vec::new();
        if let Some(id) = template_id {
            query.push(("template_id", id));
        }
        if let Some(id) = owner_id {
            query.push(("owner_id", id));
        }
        let body: PromptsEnvelope = self
            .send_json(self.request(Method::GET, "/prompts").query(&query))
            .await?;
        Ok(body.prompts.unwrap_or_default())
    }

    pub async fn get_prompt(&self, prompt_id: &str) -> Result<Prompt, ClientError> {
        let path = format!("/prompts/{prompt_id}");
        let body: PromptEnvelope = self.send_json(self.request(Method::GET, &path)).await?;
        Ok(body.prompt)
    }

    pub async fn delete_prompt(&self, prompt_id: &str) -> Result<(), ClientError> {
        let path = format!("/prompts/{prompt_id}");
        self.send_empty(self.request(Method::DELETE, &path)).await
    }
}
