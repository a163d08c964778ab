use std::sync::Arc;

use serde::Serialize;

use shared::{
    domain::{BlockType, DraftId, TemplateCategory, TemplateId, VersionId},
    protocol::{
        AuthResponse, BlockTemplate, CreateDraftRequest, CreateTemplateRequest,
        CreateVersionRequest, DraftDetail, DraftSummary, DraftVersion, LoginRequest, Page,
        PageQuery, PublishDraftRequest, RegisterRequest, UpdateDraftRequest,
        UpdateTemplateRequest, ValidationResult,
    },
};

use crate::http::{ApiClient, ClientError};

const DRAFTS_BASE: &str = "/editor/drafts";
const TEMPLATES_BASE: &str = "/editor/templates/blocks";

/// 1:1 mapping of draft operations onto REST endpoints. No caching, no
/// retries, no business logic; that is the stores' job.
#[derive(Clone)]
pub struct DraftService {
    api: Arc<ApiClient>,
}

impl DraftService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn list(&self, query: &PageQuery) -> Result<Page<DraftSummary>, ClientError> {
        self.api.get_with(DRAFTS_BASE, query).await
    }

    pub async fn get(&self, id: DraftId) -> Result<DraftDetail, ClientError> {
        self.api.get(&format!("{DRAFTS_BASE}/{id}")).await
    }

    pub async fn create(&self, request: &CreateDraftRequest) -> Result<DraftDetail, ClientError> {
        self.api.post(DRAFTS_BASE, request).await
    }

    pub async fn update(
        &self,
        id: DraftId,
        request: &UpdateDraftRequest,
    ) -> Result<DraftDetail, ClientError> {
        self.api.put(&format!("{DRAFTS_BASE}/{id}"), request).await
    }

    pub async fn delete(&self, id: DraftId) -> Result<(), ClientError> {
        self.api.delete(&format!("{DRAFTS_BASE}/{id}")).await
    }

    pub async fn validate(&self, id: DraftId) -> Result<ValidationResult, ClientError> {
        self.api
            .post_empty(&format!("{DRAFTS_BASE}/{id}/validate"))
            .await
    }

    pub async fn publish(
        &self,
        id: DraftId,
        request: &PublishDraftRequest,
    ) -> Result<(), ClientError> {
        self.api
            .post_unit(&format!("{DRAFTS_BASE}/{id}/publish"), request)
            .await
    }

    pub async fn versions(&self, id: DraftId) -> Result<Vec<DraftVersion>, ClientError> {
        self.api.get(&format!("{DRAFTS_BASE}/{id}/versions")).await
    }

    pub async fn create_version(
        &self,
        id: DraftId,
        change_description: Option<String>,
    ) -> Result<DraftVersion, ClientError> {
        self.api
            .post(
                &format!("{DRAFTS_BASE}/{id}/versions"),
                &CreateVersionRequest { change_description },
            )
            .await
    }

    pub async fn restore_version(
        &self,
        draft_id: DraftId,
        version_id: VersionId,
    ) -> Result<DraftDetail, ClientError> {
        self.api
            .post_empty(&format!("{DRAFTS_BASE}/{draft_id}/versions/{version_id}/restore"))
            .await
    }
}

/// Query parameters for template listing; paging fields ride along in the
/// same parameter set the backend binds.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<TemplateCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_type: Option<BlockType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

impl TemplateFilter {
    pub fn sized(size: u32) -> Self {
        Self {
            size: Some(size),
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub struct TemplateService {
    api: Arc<ApiClient>,
}

impl TemplateService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn list(&self, filter: &TemplateFilter) -> Result<Page<BlockTemplate>, ClientError> {
        self.api.get_with(TEMPLATES_BASE, filter).await
    }

    pub async fn get(&self, id: TemplateId) -> Result<BlockTemplate, ClientError> {
        self.api.get(&format!("{TEMPLATES_BASE}/{id}")).await
    }

    pub async fn create(
        &self,
        request: &CreateTemplateRequest,
    ) -> Result<BlockTemplate, ClientError> {
        self.api.post(TEMPLATES_BASE, request).await
    }

    pub async fn update(
        &self,
        id: TemplateId,
        request: &UpdateTemplateRequest,
    ) -> Result<BlockTemplate, ClientError> {
        self.api
            .put(&format!("{TEMPLATES_BASE}/{id}"), request)
            .await
    }

    pub async fn delete(&self, id: TemplateId) -> Result<(), ClientError> {
        self.api.delete(&format!("{TEMPLATES_BASE}/{id}")).await
    }

    pub async fn by_category(
        &self,
        category: TemplateCategory,
    ) -> Result<Vec<BlockTemplate>, ClientError> {
        let filter = TemplateFilter {
            category: Some(category),
            ..TemplateFilter::sized(100)
        };
        Ok(self.list(&filter).await?.content)
    }

    pub async fn by_block_type(
        &self,
        block_type: BlockType,
    ) -> Result<Vec<BlockTemplate>, ClientError> {
        let filter = TemplateFilter {
            block_type: Some(block_type),
            ..TemplateFilter::sized(100)
        };
        Ok(self.list(&filter).await?.content)
    }

    pub async fn search(&self, term: &str) -> Result<Vec<BlockTemplate>, ClientError> {
        let filter = TemplateFilter {
            search: Some(term.to_string()),
            ..TemplateFilter::sized(50)
        };
        Ok(self.list(&filter).await?.content)
    }
}

#[derive(Clone)]
pub struct AuthService {
    api: Arc<ApiClient>,
}

impl AuthService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError> {
        self.api.post("/auth/login", request).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        self.api.post("/auth/register", request).await
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.api.post_empty_unit("/auth/logout").await
    }

    /// Explicit token rotation; the client also refreshes transparently on a
    /// 401. Returns false when the backend declines.
    pub async fn refresh(&self) -> Result<bool, ClientError> {
        self.api.refresh_tokens().await
    }
}

#[cfg(test)]
#[path = "tests/services_tests.rs"]
mod tests;
