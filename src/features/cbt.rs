//! CBT programs, lessons and the user's progress through them.

use crate::{
    client::{ApiClient, ApiError},
    features::Listing,
};
use serde::{Deserialize, Serialize};

pub const CONTENT_PATH: &str = "cbt-content/";
pub const PROGRESS_PATH: &str = "cbt-progress/";
pub const CREATE_OR_UPDATE_PATH: &str = "cbt-progress/create_or_update/";
pub const RESET_ALL_PATH: &str = "cbt-progress/reset_all/";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Foundations,
    Techniques,
    Conditions,
    Exercises,
    #[serde(other)]
    Other,
}

/// A program, or a lesson when `parent` is set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CbtContent {
    pub id: u64,
    pub title: String,
    pub category: Category,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub parent: Option<u64>,
    #[serde(default)]
    pub lessons: Vec<CbtContent>,
    /// Set by the server for programs beyond the plan's limit.
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CbtProgress {
    pub id: u64,
    #[serde(default)]
    pub user: Option<u64>,
    pub content: CbtContent,
    pub completed: bool,
    pub progress_percentage: f64,
    #[serde(default)]
    pub last_accessed: String,
    #[serde(default)]
    pub completed_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ResetSummary {
    pub message: String,
    pub deleted_count: u64,
}

/// Which record a progress update lands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressTarget {
    /// An existing progress row.
    Progress(u64),
    /// Content without a progress row yet; the server creates one.
    Content(u64),
}

#[derive(Serialize)]
struct ProgressUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    content_id: Option<u64>,
    progress_percentage: u8,
    completed: bool,
}

pub async fn list_content(api: &ApiClient) -> Result<Vec<CbtContent>, ApiError> {
    api.get_json::<Listing<CbtContent>>(CONTENT_PATH)
        .await
        .map(Listing::into_vec)
}

pub async fn list_progress(api: &ApiClient) -> Result<Vec<CbtProgress>, ApiError> {
    api.get_json::<Listing<CbtProgress>>(PROGRESS_PATH)
        .await
        .map(Listing::into_vec)
}

/// Writes progress, clamping the percentage to 100.
pub async fn save_progress(
    api: &ApiClient,
    target: ProgressTarget,
    percentage: u8,
    completed: bool,
) -> Result<CbtProgress, ApiError> {
    let progress_percentage = percentage.min(100);
    match target {
        ProgressTarget::Progress(id) => {
            let body = ProgressUpdate {
                content_id: None,
                progress_percentage,
                completed,
            };
            api.post_json(&format!("{PROGRESS_PATH}{id}/update_progress/"), &body)
                .await
        }
        ProgressTarget::Content(id) => {
            let body = ProgressUpdate {
                content_id: Some(id),
                progress_percentage,
                completed,
            };
            api.post_json(CREATE_OR_UPDATE_PATH, &body).await
        }
    }
}

pub async fn reset_all(api: &ApiClient) -> Result<ResetSummary, ApiError> {
    api.post_empty_json(RESET_ALL_PATH).await
}

/// Finds a program or lesson by id. A lesson inherits its program's lock.
#[must_use]
pub fn find_content(programs: &[CbtContent], id: u64) -> Option<CbtContent> {
    if let Some(program) = programs.iter().find(|program| program.id == id) {
        return Some(program.clone());
    }
    programs.iter().find_map(|program| {
        program
            .lessons
            .iter()
            .find(|lesson| lesson.id == id)
            .map(|lesson| CbtContent {
                is_locked: lesson.is_locked || program.is_locked,
                ..lesson.clone()
            })
    })
}

/// Progress row for `content_id`, if the user started it.
#[must_use]
pub fn progress_for(progress: &[CbtProgress], content_id: u64) -> Option<&CbtProgress> {
    progress.iter().find(|row| row.content.id == content_id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{client::ClientConfig, storage::CookieJar};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use wiremock::{
        matchers::{body_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn client(server: &MockServer) -> ApiClient {
        let config = ClientConfig::new(&format!("{}/api", server.uri())).unwrap();
        let api = ApiClient::new(config, Arc::new(CookieJar::new())).unwrap();
        api.cookies().set("csrftoken", "tok", None);
        api
    }

    fn program(id: u64, locked: bool) -> Value {
        json!({"id": id, "title": "Thoughts", "category": "foundations", "order": 1,
               "is_active": true, "is_locked": locked,
               "lessons": [{"id": id * 10, "title": "Lesson", "category": "foundations",
                            "parent": id, "order": 1, "is_active": true}]})
    }

    fn progress_row(id: u64, content: u64) -> Value {
        json!({"id": id, "user": 1, "completed": false, "progress_percentage": 40,
               "content": {"id": content, "title": "Lesson", "category": "exercises"}})
    }

    #[tokio::test]
    async fn listings_accept_pages_and_bare_arrays() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cbt-content/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"count": 2, "results": [program(1, false), program(2, true)]}),
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/cbt-progress/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([progress_row(5, 10)])))
            .mount(&server)
            .await;

        let api = client(&server);
        let content = list_content(&api).await.unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0].lessons[0].parent, Some(1));

        let progress = list_progress(&api).await.unwrap();
        assert_eq!(progress_for(&progress, 10).unwrap().id, 5);
        assert!(progress_for(&progress, 11).is_none());
    }

    #[tokio::test]
    async fn progress_goes_to_the_row_or_the_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/cbt-progress/5/update_progress/"))
            .and(body_json(json!({"progress_percentage": 100, "completed": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(progress_row(5, 10)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/cbt-progress/create_or_update/"))
            .and(body_json(
                json!({"content_id": 20, "progress_percentage": 50, "completed": false}),
            ))
            .respond_with(ResponseTemplate::new(201).set_body_json(progress_row(6, 20)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/cbt-progress/reset_all/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"message": "Progress reset", "deleted_count": 2})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server);
        save_progress(&api, ProgressTarget::Progress(5), 120, true)
            .await
            .unwrap();
        let created = save_progress(&api, ProgressTarget::Content(20), 50, false)
            .await
            .unwrap();
        assert_eq!(created.id, 6);
        assert_eq!(reset_all(&api).await.unwrap().deleted_count, 2);
    }

    #[test]
    fn lessons_inherit_the_program_lock() {
        let programs: Vec<CbtContent> =
            serde_json::from_value(json!([program(1, false), program(2, true)])).unwrap();
        assert!(!find_content(&programs, 10).unwrap().is_locked);
        assert!(find_content(&programs, 20).unwrap().is_locked);
        assert!(find_content(&programs, 2).unwrap().is_locked);
        assert!(find_content(&programs, 99).is_none());
    }

    #[test]
    fn unknown_categories_still_decode() {
        let content: CbtContent =
            serde_json::from_value(json!({"id": 1, "title": "x", "category": "sleep"})).unwrap();
        assert_eq!(content.category, Category::Other);
    }
}
