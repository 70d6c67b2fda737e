use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    domain::{
        AppError, Author, Category, Comment, Discussion, DiscussionDetail, ListOptions, RepoId,
    },
    ports::DiscussionsClient,
};

pub const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";
pub const USER_AGENT_VALUE: &str = "gh-discussions-cli";

/// Comments fetched inline with a discussion. Later comments are not paginated.
pub const MAX_COMMENTS_PER_FETCH: u32 = 100;

const CATEGORY_LOOKUP_LIMIT: u32 = 10;

const LIST_DISCUSSIONS: &str = r#"
    query GetDiscussions($owner: String!, $name: String!, $first: Int!, $after: String, $orderBy: DiscussionOrder) {
        repository(owner: $owner, name: $name) {
            discussions(first: $first, after: $after, orderBy: $orderBy) {
                nodes {
                    id
                    title
                    createdAt
                    updatedAt
                    url
                    locked
                    comments {
                        totalCount
                    }
                    author {
                        login
                        avatarUrl
                    }
                    category {
                        id
                        name
                    }
                }
            }
        }
    }
"#;

const GET_DISCUSSION: &str = r#"
    query GetDiscussion($owner: String!, $name: String!, $number: Int!, $commentLimit: Int!) {
        repository(owner: $owner, name: $name) {
            discussion(number: $number) {
                id
                title
                body
                createdAt
                updatedAt
                url
                locked
                author {
                    login
                    avatarUrl
                }
                category {
                    id
                    name
                }
                comments(first: $commentLimit) {
                    totalCount
                    nodes {
                        id
                        body
                        createdAt
                        url
                        author {
                            login
                            avatarUrl
                        }
                    }
                }
            }
        }
    }
"#;

const ADD_COMMENT: &str = r#"
    mutation AddDiscussionComment($discussionId: ID!, $body: String!) {
        addDiscussionComment(input: { discussionId: $discussionId, body: $body }) {
            comment {
                id
                body
                createdAt
                url
                author {
                    login
                    avatarUrl
                }
            }
        }
    }
"#;

const GET_CATEGORIES: &str = r#"
    query GetCategories($owner: String!, $name: String!, $first: Int!) {
        repository(owner: $owner, name: $name) {
            discussionCategories(first: $first) {
                nodes {
                    id
                    name
                }
            }
        }
    }
"#;

const GET_REPOSITORY_ID: &str = r#"
    query GetRepositoryId($owner: String!, $name: String!) {
        repository(owner: $owner, name: $name) {
            id
        }
    }
"#;

const CREATE_DISCUSSION: &str = r#"
    mutation CreateDiscussion($repositoryId: ID!, $categoryId: ID!, $title: String!, $body: String!) {
        createDiscussion(input: { repositoryId: $repositoryId, categoryId: $categoryId, title: $title, body: $body }) {
            discussion {
                id
                title
                createdAt
                updatedAt
                url
                locked
                author {
                    login
                    avatarUrl
                }
                category {
                    id
                    name
                }
                comments {
                    totalCount
                }
            }
        }
    }
"#;

#[derive(Debug, Serialize)]
struct GraphQLRequest<'a> {
    query: &'a str,
    variables: Value,
}

// Both halves stay untyped until the error list has been checked, so a
// partial `data` payload cannot mask the remote's own error.
#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    data: Option<Value>,
    errors: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorNode {
    login: String,
    avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CategoryNode {
    id: String,
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentCount {
    total_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscussionNode {
    id: String,
    title: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    url: String,
    locked: bool,
    comments: CommentCount,
    author: AuthorNode,
    category: Option<CategoryNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentNode {
    id: String,
    body: String,
    created_at: DateTime<Utc>,
    url: String,
    author: AuthorNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentConnection {
    total_count: u32,
    nodes: Vec<CommentNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscussionDetailNode {
    id: String,
    title: String,
    body: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    url: String,
    locked: bool,
    author: AuthorNode,
    category: Option<CategoryNode>,
    comments: CommentConnection,
}

#[derive(Debug, Deserialize)]
struct Nodes<T> {
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RepositoryData<T> {
    repository: Option<T>,
}

#[derive(Debug, Deserialize)]
struct DiscussionsField {
    discussions: Nodes<DiscussionNode>,
}

#[derive(Debug, Deserialize)]
struct DiscussionField {
    discussion: Option<DiscussionDetailNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoriesField {
    discussion_categories: Nodes<CategoryNode>,
}

#[derive(Debug, Deserialize)]
struct RepositoryIdField {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddCommentData {
    add_discussion_comment: AddCommentPayload,
}

#[derive(Debug, Deserialize)]
struct AddCommentPayload {
    comment: CommentNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateDiscussionData {
    create_discussion: CreateDiscussionPayload,
}

#[derive(Debug, Deserialize)]
struct CreateDiscussionPayload {
    discussion: DiscussionNode,
}

impl From<AuthorNode> for Author {
    fn from(node: AuthorNode) -> Self {
        Author {
            login: node.login,
            avatar_url: node.avatar_url,
        }
    }
}

impl From<CategoryNode> for Category {
    fn from(node: CategoryNode) -> Self {
        Category {
            id: node.id,
            name: node.name,
        }
    }
}

impl From<DiscussionNode> for Discussion {
    fn from(node: DiscussionNode) -> Self {
        Discussion {
            id: node.id,
            title: node.title,
            author: node.author.into(),
            created_at: node.created_at,
            updated_at: node.updated_at,
            comment_count: node.comments.total_count,
            category: node.category.map(Category::from),
            url: node.url,
            locked: node.locked,
        }
    }
}

impl From<CommentNode> for Comment {
    fn from(node: CommentNode) -> Self {
        Comment {
            id: node.id,
            author: node.author.into(),
            body: node.body,
            created_at: node.created_at,
            url: node.url,
        }
    }
}

impl From<DiscussionDetailNode> for DiscussionDetail {
    fn from(node: DiscussionDetailNode) -> Self {
        DiscussionDetail {
            discussion: Discussion {
                id: node.id,
                title: node.title,
                author: node.author.into(),
                created_at: node.created_at,
                updated_at: node.updated_at,
                comment_count: node.comments.total_count,
                category: node.category.map(Category::from),
                url: node.url,
                locked: node.locked,
            },
            body: node.body,
            comments: node.comments.nodes.into_iter().map(Comment::from).collect(),
        }
    }
}

/// Maps a non-empty GraphQL error list onto the error taxonomy.
fn classify_graphql_errors(errors: Vec<Value>) -> AppError {
    let first = errors.first();
    if first.and_then(|e| e.get("type")).and_then(Value::as_str) == Some("UNAUTHORIZED") {
        return AppError::unauthorized();
    }

    let message = first
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("GitHub API returned an error")
        .to_string();
    AppError::api_with_details(message, Value::Array(errors))
}

/// Prefers a category named "general" (any case), else the first one.
fn select_default_category(categories: &[CategoryNode]) -> Option<&CategoryNode> {
    categories
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case("general"))
        .or_else(|| categories.first())
}

fn parse_discussion_number(number: &str) -> Result<u32, AppError> {
    number.trim().parse::<u32>().map_err(|_| {
        AppError::validation(format!(
            "Invalid discussion number '{}': expected a positive integer",
            number
        ))
    })
}

fn repository_not_found(repo: &RepoId) -> AppError {
    AppError::api(format!("Repository {} not found", repo))
}

pub struct GitHubAdapter {
    client: reqwest::Client,
    endpoint: String,
    comment_limit: u32,
}

impl GitHubAdapter {
    pub fn new(token: &str) -> Result<Self, AppError> {
        Self::with_endpoint(token, GITHUB_GRAPHQL_URL)
    }

    pub fn with_endpoint(token: &str, endpoint: impl Into<String>) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("token {}", token)).map_err(|_| {
                AppError::validation("GitHub token contains characters not allowed in a header")
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            comment_limit: MAX_COMMENTS_PER_FETCH,
        })
    }

    /// Lowers the inline comment ceiling; values are clamped to what one page allows.
    pub fn with_comment_limit(mut self, limit: u32) -> Self {
        self.comment_limit = limit.clamp(1, MAX_COMMENTS_PER_FETCH);
        self
    }

    async fn execute_graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, AppError> {
        let request = GraphQLRequest { query, variables };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        debug!(%status, endpoint = %self.endpoint, "GraphQL response received");

        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::unauthorized());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::api_with_details(
                format!("GitHub API returned {}", status),
                json!({ "status": status.as_u16(), "body": body }),
            ));
        }

        let graphql_response: GraphQLResponse = response.json().await?;

        if let Some(errors) = graphql_response.errors.filter(|e| !e.is_empty()) {
            return Err(classify_graphql_errors(errors));
        }

        let data = graphql_response
            .data
            .ok_or_else(|| AppError::api("No data in GitHub response"))?;

        Ok(serde_json::from_value(data)?)
    }

    async fn default_category(&self, repo: &RepoId) -> Result<String, AppError> {
        let variables = json!({
            "owner": repo.owner,
            "name": repo.name,
            "first": CATEGORY_LOOKUP_LIMIT,
        });

        let data: RepositoryData<CategoriesField> =
            self.execute_graphql(GET_CATEGORIES, variables).await?;
        let categories = data
            .repository
            .ok_or_else(|| repository_not_found(repo))?
            .discussion_categories
            .nodes;

        let category = select_default_category(&categories).ok_or_else(|| {
            AppError::api(format!(
                "No discussion categories found for {}; are Discussions enabled?",
                repo
            ))
        })?;

        debug!(category = %category.name, "selected default discussion category");
        Ok(category.id.clone())
    }

    async fn repository_id(&self, repo: &RepoId) -> Result<String, AppError> {
        let variables = json!({ "owner": repo.owner, "name": repo.name });
        let data: RepositoryData<RepositoryIdField> =
            self.execute_graphql(GET_REPOSITORY_ID, variables).await?;

        Ok(data.repository.ok_or_else(|| repository_not_found(repo))?.id)
    }
}

#[async_trait]
impl DiscussionsClient for GitHubAdapter {
    async fn list_discussions(
        &self,
        repo: &str,
        options: &ListOptions,
    ) -> Result<Vec<Discussion>, AppError> {
        let repo = RepoId::parse(repo)?;

        let variables = json!({
            "owner": repo.owner,
            "name": repo.name,
            "first": options.first,
            "after": options.after,
            "orderBy": options.order_by,
        });

        debug!(%repo, first = options.first, "listing discussions");
        let data: RepositoryData<DiscussionsField> =
            self.execute_graphql(LIST_DISCUSSIONS, variables).await?;

        let discussions = data
            .repository
            .ok_or_else(|| repository_not_found(&repo))?
            .discussions
            .nodes
            .into_iter()
            .map(Discussion::from)
            .collect();

        Ok(discussions)
    }

    async fn get_discussion(&self, repo: &str, number: &str) -> Result<DiscussionDetail, AppError> {
        let repo = RepoId::parse(repo)?;
        let number = parse_discussion_number(number)?;

        let variables = json!({
            "owner": repo.owner,
            "name": repo.name,
            "number": number,
            "commentLimit": self.comment_limit,
        });

        debug!(%repo, number, "fetching discussion");
        let data: RepositoryData<DiscussionField> =
            self.execute_graphql(GET_DISCUSSION, variables).await?;

        let node = data
            .repository
            .ok_or_else(|| repository_not_found(&repo))?
            .discussion
            .ok_or_else(|| {
                AppError::api(format!("Discussion #{} not found in {}", number, repo))
            })?;

        Ok(node.into())
    }

    async fn create_comment(
        &self,
        repo: &str,
        discussion_id: &str,
        body: &str,
    ) -> Result<Comment, AppError> {
        let repo = RepoId::parse(repo)?;
        if body.trim().is_empty() {
            return Err(AppError::validation("Comment cannot be empty"));
        }

        let variables = json!({ "discussionId": discussion_id, "body": body });

        debug!(%repo, discussion_id, "adding discussion comment");
        let data: AddCommentData = self.execute_graphql(ADD_COMMENT, variables).await?;

        Ok(data.add_discussion_comment.comment.into())
    }

    async fn create_discussion(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        category_id: Option<&str>,
    ) -> Result<Discussion, AppError> {
        let repo = RepoId::parse(repo)?;

        let category_id = match category_id {
            Some(id) => id.to_string(),
            None => self.default_category(&repo).await?,
        };
        let repository_id = self.repository_id(&repo).await?;

        let variables = json!({
            "repositoryId": repository_id,
            "categoryId": category_id,
            "title": title,
            "body": body,
        });

        debug!(%repo, %category_id, "creating discussion");
        let data: CreateDiscussionData =
            self.execute_graphql(CREATE_DISCUSSION, variables).await?;

        Ok(data.create_discussion.discussion.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DiscussionOrder, ErrorKind, OrderDirection, OrderField};
    use wiremock::matchers::{body_partial_json, body_string_contains, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn discussion_node(id: &str) -> Value {
        json!({
            "id": id,
            "title": "Test Discussion",
            "createdAt": "2023-01-01T00:00:00Z",
            "updatedAt": "2023-01-02T00:00:00Z",
            "url": "https://github.com/test/repo/discussions/1",
            "locked": false,
            "comments": { "totalCount": 5 },
            "author": { "login": "testuser", "avatarUrl": "https://avatar.url" },
            "category": { "id": "cat-1", "name": "General" }
        })
    }

    fn comment_node(id: &str, created_at: &str) -> Value {
        json!({
            "id": id,
            "body": format!("body of {}", id),
            "createdAt": created_at,
            "url": format!("https://github.com/test/repo/discussions/1#{}", id),
            "author": { "login": "commenter", "avatarUrl": null }
        })
    }

    async fn adapter(server: &MockServer) -> GitHubAdapter {
        GitHubAdapter::with_endpoint("test-token", server.uri()).unwrap()
    }

    #[tokio::test]
    async fn list_discussions_normalizes_nodes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("Authorization", "token test-token"))
            .and(body_partial_json(json!({
                "variables": {
                    "owner": "o",
                    "name": "r",
                    "first": 1,
                    "orderBy": { "field": "UPDATED_AT", "direction": "DESC" }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "repository": { "discussions": { "nodes": [discussion_node("D_1")] } } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let options = ListOptions {
            first: 1,
            ..ListOptions::default()
        };
        let discussions = adapter(&server)
            .await
            .list_discussions("o/r", &options)
            .await
            .unwrap();

        assert_eq!(discussions.len(), 1);
        let discussion = &discussions[0];
        assert_eq!(discussion.id, "D_1");
        assert_eq!(discussion.comment_count, 5);
        assert_eq!(discussion.author.avatar_url.as_deref(), Some("https://avatar.url"));
        assert_eq!(discussion.category.as_ref().unwrap().name, "General");
        assert_eq!(discussion.created_at.to_rfc3339(), "2023-01-01T00:00:00+00:00");
        assert!(discussion.updated_at > discussion.created_at);
    }

    #[tokio::test]
    async fn list_discussions_passes_explicit_order_and_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "variables": {
                    "after": "Y3Vyc29y",
                    "orderBy": { "field": "CREATED_AT", "direction": "ASC" }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "repository": { "discussions": { "nodes": [] } } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let options = ListOptions {
            first: 10,
            after: Some("Y3Vyc29y".to_string()),
            order_by: DiscussionOrder {
                field: OrderField::CreatedAt,
                direction: OrderDirection::Asc,
            },
        };
        let discussions = adapter(&server)
            .await
            .list_discussions("o/r", &options)
            .await
            .unwrap();
        assert!(discussions.is_empty());
    }

    #[tokio::test]
    async fn missing_category_stays_absent() {
        let server = MockServer::start().await;
        let mut node = discussion_node("D_2");
        node["category"] = Value::Null;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "repository": { "discussions": { "nodes": [node] } } }
            })))
            .mount(&server)
            .await;

        let discussions = adapter(&server)
            .await
            .list_discussions("o/r", &ListOptions::default())
            .await
            .unwrap();
        assert!(discussions[0].category.is_none());
    }

    #[tokio::test]
    async fn malformed_repo_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = adapter(&server).await;
        for repo in ["norepo", "/r", "o/"] {
            let err = client
                .list_discussions(repo, &ListOptions::default())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValidationError);

            let err = client.get_discussion(repo, "1").await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValidationError);
        }
    }

    #[tokio::test]
    async fn unauthorized_error_list_is_an_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{ "type": "UNAUTHORIZED", "message": "Bad credentials" }]
            })))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .await
            .list_discussions("test/repo", &ListOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AuthenticationError);
        assert_eq!(err.message(), "Invalid or expired GitHub token");
        assert!(!err.suggestions().is_empty());
    }

    #[tokio::test]
    async fn http_401_is_an_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })),
            )
            .mount(&server)
            .await;

        let err = adapter(&server)
            .await
            .get_discussion("test/repo", "1")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationError);
    }

    #[tokio::test]
    async fn other_remote_errors_keep_message_and_details() {
        let server = MockServer::start().await;
        let errors = json!([
            {
                "type": "NOT_FOUND",
                "path": ["repository"],
                "message": "Could not resolve to a Repository with the name 'test/missing'."
            }
        ]);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "repository": null },
                "errors": errors.clone()
            })))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .await
            .list_discussions("test/missing", &ListOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ApiError);
        assert_eq!(
            err.message(),
            "Could not resolve to a Repository with the name 'test/missing'."
        );
        assert_eq!(err.details(), Some(&errors));
    }

    #[tokio::test]
    async fn server_errors_are_api_errors_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .await
            .list_discussions("o/r", &ListOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ApiError);
        assert!(err.message().contains("502"));
        assert_eq!(err.details().unwrap()["body"], "bad gateway");
    }

    #[tokio::test]
    async fn missing_fields_are_api_errors() {
        let server = MockServer::start().await;
        let mut node = discussion_node("D_3");
        node.as_object_mut().unwrap().remove("url");
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "repository": { "discussions": { "nodes": [node] } } }
            })))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .await
            .list_discussions("o/r", &ListOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ApiError);
    }

    #[tokio::test]
    async fn refused_connection_is_a_network_error() {
        // Port 1 is reserved and nothing listens on it in the test environment.
        let client = GitHubAdapter::with_endpoint("test-token", "http://127.0.0.1:1/graphql").unwrap();

        let err = client
            .list_discussions("o/r", &ListOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NetworkError);
        assert_eq!(err.suggestions()[0], "Check your internet connection");
    }

    #[tokio::test]
    async fn get_discussion_preserves_comment_order() {
        let server = MockServer::start().await;
        let comments = vec![
            comment_node("c-3", "2023-01-05T00:00:00Z"),
            comment_node("c-1", "2023-01-03T00:00:00Z"),
            comment_node("c-2", "2023-01-04T00:00:00Z"),
        ];
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "variables": { "owner": "test", "name": "repo", "number": 42, "commentLimit": 100 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "repository": { "discussion": {
                    "id": "D_42",
                    "title": "Test Discussion",
                    "body": "Discussion body",
                    "createdAt": "2023-01-01T00:00:00Z",
                    "updatedAt": "2023-01-02T00:00:00Z",
                    "url": "https://github.com/test/repo/discussions/42",
                    "locked": true,
                    "author": { "login": "testuser", "avatarUrl": "https://avatar.url" },
                    "category": null,
                    "comments": { "totalCount": 3, "nodes": comments }
                } } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let detail = adapter(&server)
            .await
            .get_discussion("test/repo", "42")
            .await
            .unwrap();

        assert_eq!(detail.discussion.id, "D_42");
        assert_eq!(detail.body, "Discussion body");
        assert!(detail.discussion.locked);
        assert!(detail.discussion.category.is_none());
        let ids: Vec<_> = detail.comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c-3", "c-1", "c-2"]);
        assert_eq!(detail.comments[0].author.avatar_url, None);
    }

    #[tokio::test]
    async fn comment_limit_is_configurable_and_clamped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "variables": { "commentLimit": 100 } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "repository": { "discussion": null } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = adapter(&server)
            .await
            .with_comment_limit(500)
            .get_discussion("o/r", "9")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ApiError);
        assert_eq!(err.message(), "Discussion #9 not found in o/r");
    }

    #[tokio::test]
    async fn unparseable_discussion_number_is_a_validation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = adapter(&server)
            .await
            .get_discussion("o/r", "twelve")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[tokio::test]
    async fn create_comment_posts_to_node_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("addDiscussionComment"))
            .and(body_partial_json(json!({
                "variables": { "discussionId": "D_kwDOABC", "body": "Hello" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "addDiscussionComment": {
                    "comment": comment_node("c-new", "2023-02-01T00:00:00Z")
                } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let comment = adapter(&server)
            .await
            .create_comment("o/r", "D_kwDOABC", "Hello")
            .await
            .unwrap();

        assert_eq!(comment.id, "c-new");
        assert_eq!(comment.author.login, "commenter");
    }

    async fn mount_create_flow(server: &MockServer, categories: Value, expected_category: &str) {
        Mock::given(method("POST"))
            .and(body_string_contains("GetCategories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "repository": { "discussionCategories": { "nodes": categories } } }
            })))
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(body_string_contains("GetRepositoryId"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "repository": { "id": "R_1" } }
            })))
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(body_string_contains("CreateDiscussion"))
            .and(body_partial_json(json!({
                "variables": {
                    "repositoryId": "R_1",
                    "categoryId": expected_category,
                    "title": "T",
                    "body": "B"
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "createDiscussion": { "discussion": discussion_node("D_new") } }
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn create_discussion_prefers_general_category() {
        let server = MockServer::start().await;
        mount_create_flow(
            &server,
            json!([{ "id": "c1", "name": "Off-topic" }, { "id": "c2", "name": "General" }]),
            "c2",
        )
        .await;

        let discussion = adapter(&server)
            .await
            .create_discussion("o/r", "T", "B", None)
            .await
            .unwrap();
        assert_eq!(discussion.id, "D_new");
    }

    #[tokio::test]
    async fn create_discussion_falls_back_to_first_category() {
        let server = MockServer::start().await;
        mount_create_flow(
            &server,
            json!([{ "id": "c1", "name": "Ideas" }, { "id": "c2", "name": "Q&A" }]),
            "c1",
        )
        .await;

        adapter(&server)
            .await
            .create_discussion("o/r", "T", "B", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_discussion_without_categories_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("GetCategories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "repository": { "discussionCategories": { "nodes": [] } } }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("CreateDiscussion"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = adapter(&server)
            .await
            .create_discussion("o/r", "T", "B", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ApiError);
    }

    #[tokio::test]
    async fn explicit_category_skips_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("GetCategories"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("GetRepositoryId"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "repository": { "id": "R_1" } }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "variables": { "categoryId": "c9" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "createDiscussion": { "discussion": discussion_node("D_new") } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        adapter(&server)
            .await
            .create_discussion("o/r", "T", "B", Some("c9"))
            .await
            .unwrap();
    }

    #[test]
    fn normalizing_the_same_node_twice_is_stable() {
        let raw = discussion_node("D_1");
        let first: Discussion = serde_json::from_value::<DiscussionNode>(raw.clone())
            .unwrap()
            .into();
        let second: Discussion = serde_json::from_value::<DiscussionNode>(raw).unwrap().into();
        assert_eq!(first, second);
    }

    #[test]
    fn default_category_selection() {
        let categories = vec![
            CategoryNode { id: "c1".into(), name: "Announcements".into() },
            CategoryNode { id: "c2".into(), name: "GENERAL".into() },
        ];
        assert_eq!(select_default_category(&categories).unwrap().id, "c2");
        assert_eq!(select_default_category(&categories[..1]).unwrap().id, "c1");
        assert!(select_default_category(&[]).is_none());
    }
}
