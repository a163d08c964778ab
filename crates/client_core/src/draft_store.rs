use tokio::sync::Mutex;
use tracing::{info, warn};

use shared::{
    domain::DraftId,
    protocol::{
        CreateDraftRequest, DraftDetail, DraftSummary, PageQuery, PublishDraftRequest,
        UpdateDraftRequest, ValidationResult,
    },
};

use crate::{http::ClientError, services::DraftService};

const DRAFT_PAGE_SIZE: u32 = 100;

/// In-memory mirror of the most recent server responses for drafts. The list
/// projection is always re-fetched, never derived from a detail response,
/// because the two representations may diverge in server-computed fields.
#[derive(Debug, Clone, Default)]
pub struct DraftState {
    pub drafts: Vec<DraftSummary>,
    pub current_draft: Option<DraftDetail>,
    pub validation_result: Option<ValidationResult>,
    pub is_loading: bool,
    pub error: Option<String>,
    detail_seq: u64,
}

impl DraftState {
    /// Advisory publish gate: disabled only while the last known validation
    /// verdict is negative.
    pub fn publish_allowed(&self) -> bool {
        self.validation_result
            .as_ref()
            .map_or(true, |result| result.is_valid)
    }
}

pub struct DraftStore {
    service: DraftService,
    state: Mutex<DraftState>,
}

impl DraftStore {
    pub fn new(service: DraftService) -> Self {
        Self {
            service,
            state: Mutex::new(DraftState::default()),
        }
    }

    pub async fn snapshot(&self) -> DraftState {
        self.state.lock().await.clone()
    }

    /// Direct access for operations the store does not cache, such as the
    /// version history endpoints.
    pub fn service(&self) -> &DraftService {
        &self.service
    }

    /// Loads one page of the draft list. On failure the previous list stays
    /// untouched; the error is recorded for display and not propagated.
    pub async fn fetch_drafts(&self) {
        {
            let mut state = self.state.lock().await;
            state.is_loading = true;
            state.error = None;
        }

        match self
            .service
            .list(&PageQuery::sized(DRAFT_PAGE_SIZE))
            .await
        {
            Ok(page) => {
                let mut state = self.state.lock().await;
                state.drafts = page.content;
                state.is_loading = false;
            }
            Err(err) => {
                warn!("draft list fetch failed: {err}");
                let mut state = self.state.lock().await;
                state.error = Some(err.to_string());
                state.is_loading = false;
            }
        }
    }

    /// Loads the full form of one draft. Each call stamps a monotonic
    /// sequence number; only the newest request may write `current_draft`, so
    /// a slow stale response never overwrites a newer navigation.
    pub async fn fetch_draft_by_id(&self, id: DraftId) {
        let seq = {
            let mut state = self.state.lock().await;
            state.is_loading = true;
            state.error = None;
            state.detail_seq += 1;
            state.detail_seq
        };

        match self.service.get(id).await {
            Ok(draft) => {
                let mut state = self.state.lock().await;
                if state.detail_seq == seq {
                    state.current_draft = Some(draft);
                    state.validation_result = None;
                }
                state.is_loading = false;
            }
            Err(err) => {
                warn!(draft_id = %id, "draft fetch failed: {err}");
                let mut state = self.state.lock().await;
                if state.detail_seq == seq {
                    state.error = Some(err.to_string());
                }
                state.is_loading = false;
            }
        }
    }

    pub async fn create_draft(
        &self,
        data: CreateDraftRequest,
    ) -> Result<DraftDetail, ClientError> {
        {
            let mut state = self.state.lock().await;
            state.is_loading = true;
            state.error = None;
        }

        match self.service.create(&data).await {
            Ok(draft) => {
                info!(draft_id = %draft.id, "draft created");
                {
                    let mut state = self.state.lock().await;
                    state.current_draft = Some(draft.clone());
                    state.is_loading = false;
                }
                // The lightweight list projection comes from the server; a
                // failed refresh here is ignorable since the create resolved.
                self.fetch_drafts().await;
                Ok(draft)
            }
            Err(err) => {
                let mut state = self.state.lock().await;
                state.error = Some(err.to_string());
                state.is_loading = false;
                Err(err)
            }
        }
    }

    pub async fn update_draft(
        &self,
        id: DraftId,
        data: UpdateDraftRequest,
    ) -> Result<(), ClientError> {
        {
            let mut state = self.state.lock().await;
            state.is_loading = true;
            state.error = None;
        }

        match self.service.update(id, &data).await {
            Ok(updated) => {
                {
                    let mut state = self.state.lock().await;
                    // Guard against a stale response landing after the user
                    // navigated to a different draft.
                    if state
                        .current_draft
                        .as_ref()
                        .is_some_and(|current| current.id == id)
                    {
                        state.current_draft = Some(updated);
                    }
                    state.is_loading = false;
                }
                self.fetch_drafts().await;
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

    pub async fn delete_draft(&self, id: DraftId) -> Result<(), ClientError> {
        {
            let mut state = self.state.lock().await;
            state.is_loading = true;
            state.error = None;
        }

        match self.service.delete(id).await {
            Ok(()) => {
                info!(draft_id = %id, "draft deleted");
                let mut state = self.state.lock().await;
                state.drafts.retain(|draft| draft.id != id);
                if state
                    .current_draft
                    .as_ref()
                    .is_some_and(|current| current.id == id)
                {
                    state.current_draft = None;
                }
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

    /// Asks the backend for a validation verdict. Only `validation_result`
    /// changes; the draft's persisted validity flag is updated server-side
    /// and shows up on the next fetch.
    pub async fn validate_draft(&self, id: DraftId) -> Result<ValidationResult, ClientError> {
        {
            let mut state = self.state.lock().await;
            state.is_loading = true;
            state.error = None;
        }

        match self.service.validate(id).await {
            Ok(result) => {
                let mut state = self.state.lock().await;
                state.validation_result = Some(result.clone());
                state.is_loading = false;
                Ok(result)
            }
            Err(err) => {
                let mut state = self.state.lock().await;
                state.error = Some(err.to_string());
                state.is_loading = false;
                Err(err)
            }
        }
    }

    pub async fn publish_draft(&self, id: DraftId, course_slug: &str) -> Result<(), ClientError> {
        {
            let mut state = self.state.lock().await;
            state.is_loading = true;
            state.error = None;
        }

        let request = PublishDraftRequest {
            course_slug: course_slug.to_string(),
            is_active: None,
        };
        match self.service.publish(id, &request).await {
            Ok(()) => {
                info!(draft_id = %id, course_slug, "draft published");
                // Pick up the server-assigned status and publish timestamp.
                self.fetch_draft_by_id(id).await;
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

    /// Local navigation; clears the transient validation verdict along with
    /// the selection.
    pub async fn set_current_draft(&self, draft: Option<DraftDetail>) {
        let mut state = self.state.lock().await;
        state.current_draft = draft;
        state.validation_result = None;
    }

    pub async fn clear_error(&self) {
        self.state.lock().await.error = None;
    }
}

#[cfg(test)]
#[path = "tests/draft_store_tests.rs"]
mod tests;
