use tokio::sync::Mutex;
use tracing::{info, warn};

use shared::{
    domain::{BlockType, TemplateCategory, TemplateId},
    protocol::{BlockTemplate, CreateTemplateRequest},
};

use crate::{
    http::ClientError,
    services::{TemplateFilter, TemplateService},
};

const TEMPLATE_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default)]
pub struct TemplateState {
    pub templates: Vec<BlockTemplate>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub category: Option<TemplateCategory>,
    pub block_type: Option<BlockType>,
}

/// Template library cache. Same shape as the draft store, narrower scope:
/// mutations reconcile through a re-fetch of the last used filter.
pub struct TemplateStore {
    service: TemplateService,
    state: Mutex<TemplateState>,
}

impl TemplateStore {
    pub fn new(service: TemplateService) -> Self {
        Self {
            service,
            state: Mutex::new(TemplateState::default()),
        }
    }

    pub async fn snapshot(&self) -> TemplateState {
        self.state.lock().await.clone()
    }

    pub async fn fetch_templates(
        &self,
        category: Option<TemplateCategory>,
        block_type: Option<BlockType>,
    ) {
        {
            let mut state = self.state.lock().await;
            state.is_loading = true;
            state.error = None;
            state.category = category;
            state.block_type = block_type;
        }

        let filter = TemplateFilter {
            category,
            block_type,
            ..TemplateFilter::sized(TEMPLATE_PAGE_SIZE)
        };
        match self.service.list(&filter).await {
            Ok(page) => {
                let mut state = self.state.lock().await;
                state.templates = page.content;
                state.is_loading = false;
            }
            Err(err) => {
                warn!("template list fetch failed: {err}");
                let mut state = self.state.lock().await;
                state.error = Some(err.to_string());
                state.is_loading = false;
            }
        }
    }

    pub async fn create_template(
        &self,
        data: CreateTemplateRequest,
    ) -> Result<BlockTemplate, ClientError> {
        {
            let mut state = self.state.lock().await;
            state.is_loading = true;
            state.error = None;
        }

        match self.service.create(&data).await {
            Ok(template) => {
                info!(template_id = %template.id, "template created");
                let (category, block_type) = {
                    let mut state = self.state.lock().await;
                    state.is_loading = false;
                    (state.category, state.block_type)
                };
                // Reconcile through the server like the draft store does;
                // usage counters and audit fields are computed there.
                self.fetch_templates(category, block_type).await;
                Ok(template)
            }
            Err(err) => {
                let mut state = self.state.lock().await;
                state.error = Some(err.to_string());
                state.is_loading = false;
                Err(err)
            }
        }
    }

    pub async fn delete_template(&self, id: TemplateId) -> Result<(), ClientError> {
        {
            let mut state = self.state.lock().await;
            state.is_loading = true;
            state.error = None;
        }

        match self.service.delete(id).await {
            Ok(()) => {
                info!(template_id = %id, "template deleted");
                let mut state = self.state.lock().await;
                state.templates.retain(|template| template.id != id);
                state.is_loading = false;
                Ok(())
            }
            Err(err) => {
                let mut state = self.state.lock().await;
                state.error = Some(err.to_string());
                state.is_loading = false;
                Err(err)
            }
        }
    }

    pub async fn clear_error(&self) {
        self.state.lock().await.error = None;
    }
}

#[cfg(test)]
#[path = "tests/template_store_tests.rs"]
mod tests;
