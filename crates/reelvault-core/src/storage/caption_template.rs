//! Per-admin caption templates with a configured fallback.

use anyhow::Result;
use reelvault_storage::CaptionTemplateStorage;

#[derive(Debug, Clone)]
pub struct CaptionTemplateStore {
    inner: CaptionTemplateStorage,
    default_template: String,
}

impl CaptionTemplateStore {
    pub fn new(inner: CaptionTemplateStorage, default_template: impl Into<String>) -> Self {
        Self {
            inner,
            default_template: default_template.into(),
        }
    }

    pub fn set(&self, user_id: i64, template: &str) -> Result<()> {
        self.inner.set(user_id, template.trim())
    }

    /// The admin's own template, if one is stored.
    pub fn get(&self, user_id: i64) -> Result<Option<String>> {
        self.inner.get(user_id)
    }

    pub fn remove(&self, user_id: i64) -> Result<bool> {
        self.inner.remove(user_id)
    }

    /// The template to render with: the admin's, else the default.
    ///
    /// Read failures are logged and fall back to the default.
    pub fn effective(&self, user_id: i64) -> String {
        match self.inner.get(user_id) {
            Ok(Some(template)) if !template.trim().is_empty() => template,
            Ok(_) => self.default_template.clone(),
            Err(e) => {
                tracing::warn!("Failed to load caption template for {}: {}", user_id, e);
                self.default_template.clone()
            }
        }
    }

    pub fn default_template(&self) -> &str {
        &self.default_template
    }
}
