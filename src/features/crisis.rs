use crate::{
    client::{ApiClient, ApiError},
    features::Listing,
};
use serde::{Deserialize, Serialize};

pub const RESOURCES_PATH: &str = "crisis-resources/";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrisisResource {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub is_emergency: bool,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub is_active: bool,
}

/// Active resources, emergency lines first, then by `order`.
pub async fn list_resources(api: &ApiClient) -> Result<Vec<CrisisResource>, ApiError> {
    let mut resources = api
        .get_json::<Listing<CrisisResource>>(RESOURCES_PATH)
        .await?
        .into_vec();
    resources.retain(|resource| resource.is_active);
    resources.sort_by_key(|resource| (!resource.is_emergency, resource.order));
    Ok(resources)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{client::ClientConfig, storage::CookieJar};
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn emergency_lines_come_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/crisis-resources/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": [
                {"id": 1, "title": "Chat", "order": 1, "is_active": true, "is_emergency": false},
                {"id": 2, "title": "Old", "order": 0, "is_active": false, "is_emergency": true},
                {"id": 3, "title": "Hotline", "order": 2, "is_active": true,
                 "is_emergency": true, "phone_number": "112"}
            ]})))
            .mount(&server)
            .await;

        let config = ClientConfig::new(&format!("{}/api", server.uri())).unwrap();
        let api = ApiClient::new(config, Arc::new(CookieJar::new())).unwrap();
        let resources = list_resources(&api).await.unwrap();
        let ids: Vec<u64> = resources.iter().map(|resource| resource.id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(resources[0].phone_number.as_deref(), Some("112"));
    }
}
