use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::errors::ClientError;
use crate::models::{
    DeleteAck, FieldError, NewTask, ProjectBoard, ProjectEnvelope, ProjectId, TaskAck, TaskId,
    TaskPatch,
};
use crate::server::auth::{USER_EMAIL_HEADER, USER_ID_HEADER};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote persistence for one user's boards.
///
/// Every call is authoritative: the server's answer is the truth the
/// reconciliation controller converges to.
#[async_trait]
pub trait BoardApi: Send + Sync + 'static {
    async fn fetch_board(&self, project_id: ProjectId) -> Result<ProjectBoard, ClientError>;

    async fn create_task(&self, project_id: ProjectId, task: &NewTask)
    -> Result<TaskAck, ClientError>;

    async fn update_task(
        &self,
        project_id: ProjectId,
        task_id: TaskId,
        patch: &TaskPatch,
    ) -> Result<TaskAck, ClientError>;

    async fn delete_task(&self, project_id: ProjectId, task_id: TaskId)
    -> Result<DeleteAck, ClientError>;
}

/// Who the requests are made on behalf of.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
}

/// [`BoardApi`] over the JSON HTTP surface served by `server::api`.
#[derive(Debug, Clone)]
pub struct HttpBoardApi {
    client: reqwest::Client,
    base_url: String,
    identity: Identity,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<FieldError>,
}

impl HttpBoardApi {
    pub fn new(base_url: &str, identity: Identity) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            identity,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, self.url(path))
            .header("Accept", "application/json")
            .header(USER_ID_HEADER, &self.identity.user_id);
        match &self.identity.email {
            Some(email) => builder.header(USER_EMAIL_HEADER, email),
            None => builder,
        }
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json::<T>().await?);
        }

        let body = resp.json::<ErrorBody>().await.unwrap_or(ErrorBody {
            message: status.canonical_reason().unwrap_or("error").to_string(),
            errors: Vec::new(),
        });
        Err(match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
            StatusCode::NOT_FOUND => ClientError::NotFound(body.message),
            StatusCode::BAD_REQUEST => ClientError::Validation {
                message: body.message,
                errors: body.errors,
            },
            _ => ClientError::Server {
                status: status.as_u16(),
                message: body.message,
            },
        })
    }
}

#[async_trait]
impl BoardApi for HttpBoardApi {
    async fn fetch_board(&self, project_id: ProjectId) -> Result<ProjectBoard, ClientError> {
        let envelope: ProjectEnvelope<ProjectBoard> = self
            .send(self.request(
                reqwest::Method::GET,
                &format!("/api/projects/{}", project_id),
            ))
            .await?;
        Ok(envelope.project)
    }

    async fn create_task(
        &self,
        project_id: ProjectId,
        task: &NewTask,
    ) -> Result<TaskAck, ClientError> {
        self.send(
            self.request(
                reqwest::Method::POST,
                &format!("/api/projects/{}/tasks", project_id),
            )
            .json(task),
        )
        .await
    }

    async fn update_task(
        &self,
        project_id: ProjectId,
        task_id: TaskId,
        patch: &TaskPatch,
    ) -> Result<TaskAck, ClientError> {
        self.send(
            self.request(
                reqwest::Method::PATCH,
                &format!("/api/projects/{}/tasks/{}", project_id, task_id),
            )
            .json(patch),
        )
        .await
    }

    async fn delete_task(
        &self,
        project_id: ProjectId,
        task_id: TaskId,
    ) -> Result<DeleteAck, ClientError> {
        self.send(self.request(
            reqwest::Method::DELETE,
            &format!("/api/projects/{}/tasks/{}", project_id, task_id),
        ))
        .await
    }
}
