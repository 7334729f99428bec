use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_RANGE;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::rows::{
    BlogPostInsert, BlogPostPatch, BlogPostRow, NoteInsert, NoteRow, RoutineItemInsert,
    RoutineItemPatch, RoutineItemRow, BLOG_POSTS, ROUTINE_ITEMS, ROUTINE_NOTES,
};
use super::{BlogRemote, RemoteResult, RoutineRemote};
use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::model::{
    BlogPost, BlogPostUpdate, NewBlogPost, NewRoutineItem, Note, RoutineItem, RoutineItemUpdate,
};
use crate::pagination::{PageOf, PageRequest};

/// Client for a PostgREST-style endpoint (`{url}/rest/v1/{table}`).
pub struct HttpRemote {
    rest_url: String,
    api_key: String,
    bearer: String,
    http: Client,
}

impl HttpRemote {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("weekly-routine/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            rest_url: format!("{}/rest/v1", config.url),
            api_key: config.api_key.clone(),
            bearer: config.bearer().to_string(),
            http,
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer)
    }

    fn returning(&self, method: Method, table: &str) -> RequestBuilder {
        self.request(method, table)
            .header("Prefer", "return=representation")
    }

    async fn send(&self, action: &str, request: RequestBuilder) -> RemoteResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|err| RemoteError::transport(action, err))?;
        Self::accept(action, response).await
    }

    async fn accept(action: &str, response: Response) -> RemoteResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(action, status = status.as_u16(), "remote call rejected");
        Err(RemoteError::status(action, status.as_u16(), &body))
    }

    async fn rows<T: DeserializeOwned>(
        &self,
        action: &str,
        request: RequestBuilder,
    ) -> RemoteResult<Vec<T>> {
        let response = self.send(action, request).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|err| RemoteError::decode(action, err))
    }

    async fn single<T: DeserializeOwned>(
        &self,
        action: &str,
        request: RequestBuilder,
    ) -> RemoteResult<T> {
        self.rows::<T>(action, request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::new(format!("{action} returned no rows")))
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

/// Total row count from `Content-Range: 0-7/20` (or `*/0` for an empty table).
pub(crate) fn parse_content_range(header: &str) -> Option<u64> {
    let (_, total) = header.trim().rsplit_once('/')?;
    total.trim().parse().ok()
}

/// A range starting beyond the table is answered with 416 and `Content-Range: */N`. That is an
/// empty page with a known total, not a failed call.
fn range_past_end(status: StatusCode, total: Option<u64>) -> Option<u64> {
    if status == StatusCode::RANGE_NOT_SATISFIABLE {
        total
    } else {
        None
    }
}

#[async_trait]
impl RoutineRemote for HttpRemote {
    async fn fetch_items(&self) -> RemoteResult<Vec<RoutineItem>> {
        let request = self
            .request(Method::GET, ROUTINE_ITEMS)
            .query(&[("select", "*"), ("order", "time_range.asc")]);
        let rows: Vec<RoutineItemRow> = self.rows("fetch routine items", request).await?;
        Ok(rows.into_iter().map(RoutineItem::from).collect())
    }

    async fn create_item(&self, item: &NewRoutineItem) -> RemoteResult<RoutineItem> {
        let request = self
            .returning(Method::POST, ROUTINE_ITEMS)
            .json(&RoutineItemInsert::from(item));
        let row: RoutineItemRow = self.single("add routine item", request).await?;
        Ok(row.into())
    }

    async fn update_item(&self, id: &str, update: &RoutineItemUpdate) -> RemoteResult<()> {
        let filter = eq(id);
        let request = self
            .request(Method::PATCH, ROUTINE_ITEMS)
            .query(&[("id", filter.as_str())])
            .json(&RoutineItemPatch::from(update));
        self.send("update routine item", request).await?;
        Ok(())
    }

    async fn delete_item(&self, id: &str) -> RemoteResult<()> {
        let filter = eq(id);
        let request = self
            .request(Method::DELETE, ROUTINE_ITEMS)
            .query(&[("id", filter.as_str())]);
        self.send("delete routine item", request).await?;
        Ok(())
    }

    async fn fetch_notes(&self, item_id: &str) -> RemoteResult<Vec<Note>> {
        let filter = eq(item_id);
        let request = self.request(Method::GET, ROUTINE_NOTES).query(&[
            ("select", "*"),
            ("routine_item_id", filter.as_str()),
            ("order", "created_at.desc"),
        ]);
        let rows: Vec<NoteRow> = self.rows("fetch notes", request).await?;
        Ok(rows.into_iter().map(Note::from).collect())
    }

    async fn add_note(&self, item_id: &str, content: &str) -> RemoteResult<Note> {
        let request = self
            .returning(Method::POST, ROUTINE_NOTES)
            .json(&NoteInsert {
                routine_item_id: item_id,
                content,
            });
        let row: NoteRow = self.single("add note", request).await?;
        Ok(row.into())
    }

    async fn delete_note(&self, note_id: &str) -> RemoteResult<()> {
        let filter = eq(note_id);
        let request = self
            .request(Method::DELETE, ROUTINE_NOTES)
            .query(&[("id", filter.as_str())]);
        self.send("delete note", request).await?;
        Ok(())
    }

    async fn set_completed(&self, id: &str, completed: bool) -> RemoteResult<()> {
        let filter = eq(id);
        let request = self
            .request(Method::PATCH, ROUTINE_ITEMS)
            .query(&[("id", filter.as_str())])
            .json(&json!({ "completed": completed }));
        self.send("toggle completed status", request).await?;
        Ok(())
    }
}

#[async_trait]
impl BlogRemote for HttpRemote {
    async fn fetch_posts(&self, page: PageRequest) -> RemoteResult<PageOf<BlogPost>> {
        let request = self
            .request(Method::GET, BLOG_POSTS)
            .header("Prefer", "count=exact")
            .header("Range-Unit", "items")
            .header("Range", format!("{}-{}", page.offset(), page.range_end()))
            .query(&[("select", "*"), ("order", "date.desc")]);
        let action = "fetch blog posts";
        let response = request
            .send()
            .await
            .map_err(|err| RemoteError::transport(action, err))?;
        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range);
        if let Some(total) = range_past_end(response.status(), total) {
            tracing::debug!(page = page.page, total, "requested range starts past the last post");
            return Ok(PageOf {
                items: Vec::new(),
                total,
            });
        }
        let response = Self::accept(action, response).await?;
        let rows = response
            .json::<Vec<BlogPostRow>>()
            .await
            .map_err(|err| RemoteError::decode(action, err))?;
        let items: Vec<BlogPost> = rows.into_iter().map(BlogPost::from).collect();
        let total = total.unwrap_or_else(|| page.offset() + items.len() as u64);
        Ok(PageOf { items, total })
    }

    async fn fetch_post(&self, id: &str) -> RemoteResult<BlogPost> {
        let filter = eq(id);
        let request = self
            .request(Method::GET, BLOG_POSTS)
            .query(&[("select", "*"), ("id", filter.as_str())]);
        let rows: Vec<BlogPostRow> = self.rows("fetch blog post", request).await?;
        rows.into_iter()
            .next()
            .map(BlogPost::from)
            .ok_or_else(|| RemoteError::new(format!("Blog post {id} not found")))
    }

    async fn create_post(&self, post: &NewBlogPost) -> RemoteResult<BlogPost> {
        let request = self
            .returning(Method::POST, BLOG_POSTS)
            .json(&BlogPostInsert::from(post));
        let row: BlogPostRow = self.single("create blog post", request).await?;
        Ok(row.into())
    }

    async fn update_post(&self, id: &str, update: &BlogPostUpdate) -> RemoteResult<()> {
        let filter = eq(id);
        let request = self
            .request(Method::PATCH, BLOG_POSTS)
            .query(&[("id", filter.as_str())])
            .json(&BlogPostPatch::from(update));
        self.send("update blog post", request).await?;
        Ok(())
    }

    async fn delete_post(&self, id: &str) -> RemoteResult<()> {
        let filter = eq(id);
        let request = self
            .request(Method::DELETE, BLOG_POSTS)
            .query(&[("id", filter.as_str())]);
        self.send("delete blog post", request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote() -> HttpRemote {
        let config = RemoteConfig::new("https://demo.supabase.co/", "anon-key")
            .unwrap()
            .with_access_token(Some("session-token".into()));
        HttpRemote::new(&config).unwrap()
    }

    #[test]
    fn parses_content_range_totals() {
        assert_eq!(parse_content_range("0-7/20"), Some(20));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-7/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[test]
    fn unsatisfiable_range_carries_the_total() {
        assert_eq!(
            range_past_end(StatusCode::RANGE_NOT_SATISFIABLE, parse_content_range("*/20")),
            Some(20)
        );
        assert_eq!(range_past_end(StatusCode::RANGE_NOT_SATISFIABLE, None), None);
        assert_eq!(range_past_end(StatusCode::PARTIAL_CONTENT, Some(20)), None);
    }

    #[test]
    fn requests_target_table_with_auth_headers() {
        let request = remote()
            .request(Method::GET, ROUTINE_ITEMS)
            .query(&[("id", eq("abc").as_str())])
            .build()
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "https://demo.supabase.co/rest/v1/routine_items?id=eq.abc"
        );
        assert_eq!(request.headers()["apikey"], "anon-key");
        assert_eq!(request.headers()["authorization"], "Bearer session-token");
    }

    #[test]
    fn inserts_ask_for_the_created_row() {
        let request = remote()
            .returning(Method::POST, ROUTINE_NOTES)
            .build()
            .unwrap();
        assert_eq!(request.headers()["prefer"], "return=representation");
        assert_eq!(request.method(), &Method::POST);
    }
}
