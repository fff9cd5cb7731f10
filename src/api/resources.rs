//! One call per remote resource.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ApiClient, ApiError, ApiResponse, Filters};
use crate::records::{
    id_as_string, AllotmentRecord, AuthenticatedUser, ChoiceList, ClosingRankRecord,
    CollegeRecord, ExamLevel, FeeStipendBondRecord, Priority, SeatMatrixRecord,
};

#[derive(Clone, Debug, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    #[serde(rename = "neetRank", skip_serializing_if = "Option::is_none")]
    pub neet_rank: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "neetRank", skip_serializing_if = "Option::is_none")]
    pub neet_rank: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone.is_none()
            && self.neet_rank.is_none()
            && self.category.is_none()
            && self.state.is_none()
            && self.avatar.is_none()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: AuthenticatedUser,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct CollegeSearch {
    pub query: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "type")]
    pub college_type: Option<String>,
    pub quota: Option<String>,
    #[serde(rename = "minRank")]
    pub min_rank: Option<u32>,
    #[serde(rename = "maxRank")]
    pub max_rank: Option<u32>,
    #[serde(rename = "minFees")]
    pub min_fees: Option<u64>,
    #[serde(rename = "maxFees")]
    pub max_fees: Option<u64>,
}

impl CollegeSearch {
    /// Query parameters with unset and empty values dropped.
    pub fn to_filters(&self) -> Filters {
        let mut out = Filters::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(v) = value.filter(|v| !v.is_empty()) {
                out.insert(key.to_string(), v);
            }
        };
        put("query", self.query.clone());
        put("state", self.state.clone());
        put("type", self.college_type.clone());
        put("quota", self.quota.clone());
        put("minRank", self.min_rank.map(|v| v.to_string()));
        put("maxRank", self.max_rank.map(|v| v.to_string()));
        put("minFees", self.min_fees.map(|v| v.to_string()));
        put("maxFees", self.max_fees.map(|v| v.to_string()));
        out
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct NewChoiceList {
    pub name: String,
    pub counselling_type: String,
    pub priority: Priority,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ChoiceListUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

/// What the server echoes back after creating a list.
#[derive(Clone, Debug, Deserialize)]
pub struct CreatedChoiceList {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Faq {
    pub question: String,
    pub answer: String,
    pub category: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportTicket {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub subject: String,
    pub message: String,
    pub status: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewTicket {
    pub subject: String,
    pub message: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct TicketUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ApiClient {
    // auth

    pub async fn login(&self, credentials: &Credentials) -> Result<ApiResponse<AuthPayload>, ApiError> {
        self.post("/auth/login/", Some(credentials)).await
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<ApiResponse<AuthPayload>, ApiError> {
        self.post("/auth/signup/", Some(request)).await
    }

    pub async fn logout(&self) -> Result<ApiResponse<Value>, ApiError> {
        self.post::<Value, ()>("/auth/logout/", None).await
    }

    pub async fn profile(&self) -> Result<ApiResponse<AuthenticatedUser>, ApiError> {
        self.get("/auth/profile/", None).await
    }

    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
    ) -> Result<ApiResponse<AuthenticatedUser>, ApiError> {
        self.put("/auth/profile/", update).await
    }

    // datasets

    pub async fn allotments(
        &self,
        level: ExamLevel,
        filters: &Filters,
    ) -> Result<ApiResponse<Vec<AllotmentRecord>>, ApiError> {
        let path = format!("/allotments/{}/", level.path_segment());
        self.get(&path, Some(filters)).await
    }

    pub async fn closing_ranks(
        &self,
        level: ExamLevel,
        filters: &Filters,
    ) -> Result<ApiResponse<Vec<ClosingRankRecord>>, ApiError> {
        let path = format!("/closing-ranks/{}/", level.path_segment());
        self.get(&path, Some(filters)).await
    }

    pub async fn seat_matrix(
        &self,
        level: ExamLevel,
        filters: &Filters,
    ) -> Result<ApiResponse<Vec<SeatMatrixRecord>>, ApiError> {
        let path = format!("/seat-matrix/{}/", level.path_segment());
        self.get(&path, Some(filters)).await
    }

    pub async fn fee_data(
        &self,
        level: ExamLevel,
        filters: &Filters,
    ) -> Result<ApiResponse<Vec<FeeStipendBondRecord>>, ApiError> {
        let path = format!("/fee-stipend-bond/{}/", level.path_segment());
        self.get(&path, Some(filters)).await
    }

    pub async fn colleges(&self, filters: &Filters) -> Result<ApiResponse<Vec<CollegeRecord>>, ApiError> {
        self.get("/colleges/", Some(filters)).await
    }

    pub async fn college(&self, id: &str) -> Result<ApiResponse<CollegeRecord>, ApiError> {
        self.get(&format!("/colleges/{id}/"), None).await
    }

    pub async fn search_colleges(
        &self,
        search: &CollegeSearch,
    ) -> Result<ApiResponse<Vec<CollegeRecord>>, ApiError> {
        self.get("/colleges/search/", Some(&search.to_filters())).await
    }

    // choice lists

    pub async fn choice_lists(&self) -> Result<ApiResponse<Vec<ChoiceList>>, ApiError> {
        self.get("/choice-lists/", None).await
    }

    pub async fn create_choice_list(
        &self,
        list: &NewChoiceList,
    ) -> Result<ApiResponse<CreatedChoiceList>, ApiError> {
        self.post("/choice-lists/", Some(list)).await
    }

    pub async fn update_choice_list(
        &self,
        id: &str,
        update: &ChoiceListUpdate,
    ) -> Result<ApiResponse<Value>, ApiError> {
        self.put(&format!("/choice-lists/{id}/"), update).await
    }

    pub async fn delete_choice_list(&self, id: &str) -> Result<ApiResponse<Value>, ApiError> {
        self.delete(&format!("/choice-lists/{id}/")).await
    }

    pub async fn add_to_choice_list(
        &self,
        list_id: &str,
        college_id: &str,
    ) -> Result<ApiResponse<Value>, ApiError> {
        let body = serde_json::json!({ "collegeId": college_id });
        self.post(&format!("/choice-lists/{list_id}/colleges/"), Some(&body))
            .await
    }

    pub async fn remove_from_choice_list(
        &self,
        list_id: &str,
        college_id: &str,
    ) -> Result<ApiResponse<Value>, ApiError> {
        self.delete(&format!("/choice-lists/{list_id}/colleges/{college_id}/"))
            .await
    }

    // counselling

    pub async fn counselling(&self, filters: &Filters) -> Result<ApiResponse<Value>, ApiError> {
        self.get("/counselling/", Some(filters)).await
    }

    pub async fn inicet(&self, filters: &Filters) -> Result<ApiResponse<Value>, ApiError> {
        self.get("/counselling/inicet/", Some(filters)).await
    }

    pub async fn counselling_timeline(&self) -> Result<ApiResponse<Value>, ApiError> {
        self.get("/counselling/timeline/", None).await
    }

    // predictors; the response shape is owned by the server

    pub async fn predict_ug_colleges(&self, input: &Value) -> Result<ApiResponse<Value>, ApiError> {
        self.post("/predictor/ug/", Some(input)).await
    }

    pub async fn predict_pg_specialties(&self, input: &Value) -> Result<ApiResponse<Value>, ApiError> {
        self.post("/predictor/pg/", Some(input)).await
    }

    pub async fn predict_rank(&self, input: &Value) -> Result<ApiResponse<Value>, ApiError> {
        self.post("/predictor/rank/", Some(input)).await
    }

    // faq

    pub async fn faqs(&self, category: Option<&str>) -> Result<ApiResponse<Vec<Faq>>, ApiError> {
        let query = category
            .filter(|c| !c.trim().is_empty())
            .map(|c| super::filters([("category", c)]));
        self.get("/faq/", query.as_ref()).await
    }

    // support

    pub async fn create_ticket(&self, ticket: &NewTicket) -> Result<ApiResponse<SupportTicket>, ApiError> {
        self.post("/support/tickets/", Some(ticket)).await
    }

    pub async fn tickets(&self) -> Result<ApiResponse<Vec<SupportTicket>>, ApiError> {
        self.get("/support/tickets/", None).await
    }

    pub async fn update_ticket(
        &self,
        id: &str,
        update: &TicketUpdate,
    ) -> Result<ApiResponse<SupportTicket>, ApiError> {
        self.put(&format!("/support/tickets/{id}/"), update).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use mockito::{Matcher, Server};
    use std::time::Duration;

    fn api(url: &str) -> ApiClient {
        ApiClient::new(url, Duration::from_secs(5), Session::in_memory()).unwrap()
    }

    #[test]
    fn college_search_drops_empty_params() {
        let search = CollegeSearch {
            query: Some("aiims".into()),
            state: Some(String::new()),
            max_rank: Some(5000),
            ..Default::default()
        };
        let f = search.to_filters();
        assert_eq!(f.get("query").map(String::as_str), Some("aiims"));
        assert_eq!(f.get("maxRank").map(String::as_str), Some("5000"));
        assert!(!f.contains_key("state"));
        assert!(!f.contains_key("minRank"));
    }

    #[tokio::test]
    async fn per_level_routes_are_used() {
        let mut server = Server::new_async().await;
        let ug = server
            .mock("GET", "/seat-matrix/ug/")
            .with_body("[]")
            .create_async()
            .await;
        let pg = server
            .mock("GET", "/fee-stipend-bond/pg/")
            .with_body("[]")
            .create_async()
            .await;

        let api = api(&server.url());
        api.seat_matrix(ExamLevel::Ug, &Filters::new()).await.unwrap();
        api.fee_data(ExamLevel::Pg, &Filters::new()).await.unwrap();
        ug.assert_async().await;
        pg.assert_async().await;
    }

    #[tokio::test]
    async fn add_to_choice_list_posts_college_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/choice-lists/42/colleges/")
            .match_body(Matcher::Json(serde_json::json!({ "collegeId": "c-9" })))
            .with_status(201)
            .with_body(r#"{"success":true,"data":{}}"#)
            .create_async()
            .await;

        api(&server.url())
            .add_to_choice_list("42", "c-9")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_accepts_empty_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/choice-lists/7/")
            .with_status(204)
            .create_async()
            .await;

        let resp = api(&server.url()).delete_choice_list("7").await.unwrap();
        mock.assert_async().await;
        assert!(resp.success);
    }

    #[tokio::test]
    async fn faq_category_is_a_query_param() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/faq/")
            .match_query(Matcher::UrlEncoded("category".into(), "fees".into()))
            .with_body(r#"[{"question":"Q","answer":"A","category":"fees"}]"#)
            .create_async()
            .await;

        let resp = api(&server.url()).faqs(Some("fees")).await.unwrap();
        mock.assert_async().await;
        assert_eq!(resp.data[0].answer, "A");
    }
}
