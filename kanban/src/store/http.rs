//! HTTP client store for the `kanban-server` API.
//!
//! Maps the [`TaskStore`] contract onto the REST surface:
//!
//! | Call | Request | Success |
//! |------|---------|---------|
//! | `list_tasks` | `GET /api/tasks` | 200 |
//! | `create_task` | `POST /api/tasks` | 201 |
//! | `update_task` | `PATCH /api/tasks/{id}` | 200 |
//! | `delete_task` | `DELETE /api/tasks/{id}` | 204 |
//!
//! A 404 on an id-addressed call becomes [`StoreError::NotFound`]; every
//! other non-success status becomes [`StoreError::Http`].

use std::time::Duration;

use kanban_proto::codec::ErrorBody;
use kanban_proto::{NewTask, Task, TaskId, TaskPatch};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use super::{StoreError, TaskStore};

/// Task store backed by a remote `kanban-server`.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base: Url,
}

impl HttpStore {
    /// Creates a client for the server at `base_url` (e.g.
    /// `http://127.0.0.1:3001`). Each request gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Transport`] if the URL is invalid or cannot
    /// carry a path, or if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let base = Url::parse(base_url)
            .map_err(|e| StoreError::Transport(format!("invalid server url {base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(StoreError::Transport(format!(
                "server url cannot carry a path: {base_url}"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self { client, base })
    }

    /// Returns the server base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// Builds `{base}/api/tasks` or `{base}/api/tasks/{id}` with the id
    /// percent-encoded as a single path segment.
    fn tasks_url(&self, id: Option<&TaskId>) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["api", "tasks"]);
            if let Some(id) = id {
                segments.push(id.as_str());
            }
        }
        url
    }
}

/// Converts a non-success response into a [`StoreError`].
async fn check(response: Response, id: Option<&TaskId>) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND
        && let Some(id) = id
    {
        return Err(StoreError::NotFound(id.clone()));
    }
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };
    Err(StoreError::Http {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    response
        .json::<T>()
        .await
        .map_err(|e| StoreError::Decode(e.to_string()))
}

fn transport(e: &reqwest::Error) -> StoreError {
    StoreError::Transport(e.to_string())
}

impl TaskStore for HttpStore {
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let response = self
            .client
            .get(self.tasks_url(None))
            .send()
            .await
            .map_err(|e| transport(&e))?;
        decode(check(response, None).await?).await
    }

    async fn create_task(&self, new: NewTask) -> Result<Task, StoreError> {
        let response = self
            .client
            .post(self.tasks_url(None))
            .json(&new)
            .send()
            .await
            .map_err(|e| transport(&e))?;
        decode(check(response, None).await?).await
    }

    async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        let response = self
            .client
            .patch(self.tasks_url(Some(id)))
            .json(&patch)
            .send()
            .await
            .map_err(|e| transport(&e))?;
        decode(check(response, Some(id)).await?).await
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.tasks_url(Some(id)))
            .send()
            .await
            .map_err(|e| transport(&e))?;
        check(response, Some(id)).await?;
        Ok(())
    }
}
