use anyhow::Context as _;
use memorybook_core::{Image, ImageId, ImageKind};
use reqwest::Url;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::parse_listing;

/// Client for the studio's single script endpoint. Reads use `?action=..`,
/// writes POST a JSON body carrying `action`.
#[derive(Debug, Clone)]
pub struct ScriptEndpoint {
    client: reqwest::blocking::Client,
    base: Url,
}

/// Reply to a write action. The endpoint is loose about which fields it sets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActionResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ActionResponse {
    pub fn into_result(self) -> anyhow::Result<Self> {
        if self.success == Some(false) || (self.success.is_none() && self.error.is_some()) {
            let reason = self
                .error
                .clone()
                .or_else(|| self.message.clone())
                .unwrap_or_else(|| "request rejected".to_string());
            anyhow::bail!("endpoint rejected request: {reason}");
        }
        Ok(self)
    }
}

impl ScriptEndpoint {
    pub fn new(api_url: &str) -> anyhow::Result<Self> {
        let base = Url::parse(api_url.trim())
            .with_context(|| format!("invalid api url: {api_url}"))?;
        if !matches!(base.scheme(), "http" | "https") {
            anyhow::bail!("api url must be http(s): {api_url}");
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("build http client")?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn action_url(&self, action: &str) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut().append_pair("action", action);
        url
    }

    fn get_action(&self, action: &str) -> anyhow::Result<Value> {
        let url = self.action_url(action);
        let value = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("request action={action}"))?
            .error_for_status()
            .with_context(|| format!("request action={action}"))?
            .json::<Value>()
            .with_context(|| format!("decode action={action} response"))?;
        Ok(value)
    }

    fn post_action(&self, body: Value) -> anyhow::Result<ActionResponse> {
        let action = body
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let response = self
            .client
            .post(self.base.clone())
            .body(serde_json::to_string(&body)?)
            .send()
            .with_context(|| format!("post action={action}"))?
            .error_for_status()
            .with_context(|| format!("post action={action}"))?;
        let text = response
            .text()
            .with_context(|| format!("read action={action} response"))?;
        let reply = if text.trim().is_empty() {
            ActionResponse::default()
        } else {
            serde_json::from_str::<ActionResponse>(&text)
                .with_context(|| format!("decode action={action} response"))?
        };
        reply.into_result()
    }

    /// Gallery listing in delivery order (oldest first).
    pub fn gallery(&self) -> anyhow::Result<Vec<Image>> {
        let images = parse_listing(self.get_action("gallery")?)?;
        info!(count = images.len(), "gallery listing fetched");
        Ok(images)
    }

    pub fn backgrounds(&self) -> anyhow::Result<Vec<Image>> {
        parse_listing(self.get_action("backgrounds")?)
    }

    pub fn add_image(&self, kind: ImageKind, image_url: &str) -> anyhow::Result<ActionResponse> {
        let image_url = image_url.trim();
        if image_url.is_empty() {
            anyhow::bail!("image url is empty");
        }
        let reply = self.post_action(add_image_payload(kind, image_url))?;
        info!(%kind, image_url, "image added");
        Ok(reply)
    }

    pub fn add_images(&self, kind: ImageKind, image_urls: &[String]) -> anyhow::Result<usize> {
        let payload = add_images_payload(kind, image_urls)?;
        let count = payload["imageUrls"].as_array().map_or(0, Vec::len);
        self.post_action(payload)?;
        info!(%kind, count, "images added");
        Ok(count)
    }

    pub fn delete_image(&self, kind: ImageKind, id: &ImageId) -> anyhow::Result<ActionResponse> {
        if id.is_empty() {
            anyhow::bail!("image id is empty");
        }
        let reply = self.post_action(delete_image_payload(kind, id))?;
        info!(%kind, %id, "image deleted");
        Ok(reply)
    }
}

fn add_image_payload(kind: ImageKind, image_url: &str) -> Value {
    json!({
        "action": "addImage",
        "type": kind.as_str(),
        "imageUrl": image_url,
    })
}

/// Blank entries are dropped; at least one URL must remain.
fn add_images_payload(kind: ImageKind, image_urls: &[String]) -> anyhow::Result<Value> {
    let urls: Vec<&str> = image_urls
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .collect();
    if urls.is_empty() {
        anyhow::bail!("please enter at least one image url");
    }
    Ok(json!({
        "action": "addMultipleImages",
        "type": kind.as_str(),
        "imageUrls": urls,
    }))
}

fn delete_image_payload(kind: ImageKind, id: &ImageId) -> Value {
    json!({
        "action": "deleteImage",
        "type": kind.as_str(),
        "id": id.as_str(),
    })
}
