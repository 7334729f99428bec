use std::sync::Arc;

use parking_lot::Mutex;

use super::{log_failure, MutationOutcome, Operation};
use crate::error::{StoreError, StoreResult};
use crate::model::{BlogPost, BlogPostUpdate, NewBlogPost};
use crate::pagination::{total_pages, PageOf, PageRequest, DEFAULT_PAGE_SIZE};
use crate::remote::BlogRemote;
use crate::state::BlogState;

/// Paginated post listing plus the focused post. Writes refetch the current page afterwards.
pub struct BlogService {
    remote: Arc<dyn BlogRemote>,
    state: Mutex<BlogState>,
}

impl BlogService {
    pub fn new(remote: Arc<dyn BlogRemote>) -> Self {
        Self::with_page_size(remote, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(remote: Arc<dyn BlogRemote>, page_size: u32) -> Self {
        Self {
            remote,
            state: Mutex::new(BlogState::with_page_size(page_size.max(1))),
        }
    }

    pub fn snapshot(&self) -> BlogState {
        self.state.lock().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().posts.is_loading()
    }

    /// Posts of the current page, newest first.
    pub fn posts(&self) -> Vec<BlogPost> {
        self.state.lock().sorted_posts()
    }

    pub fn selected(&self) -> Option<BlogPost> {
        self.state.lock().selected.current().cloned()
    }

    pub fn current_page(&self) -> u32 {
        self.state.lock().page
    }

    pub fn total_pages(&self) -> u32 {
        self.state.lock().total_pages()
    }

    /// Loads `page` (1-based). Pages past the last known page are rejected without a remote
    /// call; a page the remote reports as out of range is rejected and state is unchanged.
    pub async fn fetch_posts(&self, page: u32) -> StoreResult<MutationOutcome<PageOf<BlogPost>>> {
        let request = {
            let state = self.state.lock();
            PageRequest::new(page, state.page_size).and_then(|request| match state.total {
                Some(total) => request.check_against(total).map(|_| request),
                None => Ok(request),
            })
        };
        let request = match request {
            Ok(request) => request,
            Err(err) => return fail(Operation::LoadPosts, None, err),
        };
        self.load_page(request).await
    }

    /// Refetches the page being shown, stepping back to the new last page if it vanished
    /// (page 1 once the blog is empty).
    pub async fn refresh(&self) -> StoreResult<MutationOutcome<PageOf<BlogPost>>> {
        let (page, page_size) = {
            let state = self.state.lock();
            (state.page, state.page_size)
        };
        let request = PageRequest::new(page.max(1), page_size)?;
        match self.load_page(request).await {
            Err(StoreError::PageOutOfRange { total_pages, .. }) => {
                let fallback = total_pages.max(1);
                tracing::debug!(page, fallback, "current page vanished, showing last page");
                self.load_page(PageRequest::new(fallback, page_size)?).await
            }
            other => other,
        }
    }

    pub async fn get_post(&self, id: &str) -> StoreResult<MutationOutcome<BlogPost>> {
        self.state.lock().posts.begin_load();
        let fetched = self.remote.fetch_post(id).await;
        let mut state = self.state.lock();
        state.posts.fail_load();
        match fetched {
            Ok(post) => {
                state.selected.select(Some(post.clone()));
                Ok(MutationOutcome::new(Operation::LoadPost, post))
            }
            Err(err) => {
                drop(state);
                fail(Operation::LoadPost, Some(id), err)
            }
        }
    }

    pub async fn add_post(&self, post: NewBlogPost) -> StoreResult<MutationOutcome<BlogPost>> {
        let post = NewBlogPost {
            title: post.title.trim().to_string(),
            ..post
        };
        if post.title.is_empty() {
            return fail(
                Operation::AddPost,
                None,
                StoreError::InvalidInput("Title is required".into()),
            );
        }

        let created = self.with_loading(self.remote.create_post(&post)).await;
        match created {
            Ok(created) => {
                tracing::info!(id = %created.id, "blog post created");
                self.refresh_after(Operation::AddPost).await;
                Ok(MutationOutcome::new(Operation::AddPost, created)
                    .with_notice("Blog post created successfully"))
            }
            Err(err) => fail(Operation::AddPost, None, err),
        }
    }

    /// The listed copy and the selection are patched before the page is refetched.
    pub async fn edit_post(&self, id: &str, update: BlogPostUpdate) -> StoreResult<MutationOutcome> {
        let update = update.normalized();
        if update.is_empty() {
            return fail(
                Operation::EditPost,
                Some(id),
                StoreError::InvalidInput("Nothing to update".into()),
            );
        }

        if let Err(err) = self
            .with_loading(self.remote.update_post(id, &update))
            .await
        {
            return fail(Operation::EditPost, Some(id), err);
        }
        let applied = {
            let mut state = self.state.lock();
            let listed = state.posts.patch(id, |post| update.apply_to(post));
            let selected = state
                .selected
                .patch_if_selected(id, |post| update.apply_to(post));
            listed || selected
        };
        self.refresh_after(Operation::EditPost).await;
        Ok(MutationOutcome::new(Operation::EditPost, ())
            .applied(applied)
            .with_notice("Blog post updated successfully"))
    }

    pub async fn remove_post(&self, id: &str) -> StoreResult<MutationOutcome> {
        if let Err(err) = self.with_loading(self.remote.delete_post(id)).await {
            return fail(Operation::RemovePost, Some(id), err);
        }
        let applied = {
            let mut state = self.state.lock();
            let listed = state.posts.remove(id).is_some();
            let selected = state.selected.clear_if_selected(id);
            listed || selected
        };
        self.refresh_after(Operation::RemovePost).await;
        Ok(MutationOutcome::new(Operation::RemovePost, ())
            .applied(applied)
            .with_notice("Blog post deleted successfully"))
    }

    async fn load_page(
        &self,
        request: PageRequest,
    ) -> StoreResult<MutationOutcome<PageOf<BlogPost>>> {
        self.state.lock().posts.begin_load();
        let fetched = self.remote.fetch_posts(request).await;
        let mut state = self.state.lock();
        let page = match fetched {
            Ok(page) => page,
            Err(err) => {
                state.posts.fail_load();
                drop(state);
                return fail(Operation::LoadPosts, None, err);
            }
        };
        if let Err(err) = request.check_against(page.total) {
            state.posts.fail_load();
            drop(state);
            return fail(Operation::LoadPosts, None, err);
        }

        state.posts.finish_load(page.items.clone());
        state.total = Some(page.total);
        state.page = request.page;
        tracing::debug!(
            page = request.page,
            total = page.total,
            pages = total_pages(page.total, request.page_size),
            "loaded blog posts"
        );
        Ok(MutationOutcome::new(Operation::LoadPosts, page))
    }

    /// A failed refetch after a successful write is logged; the write itself still succeeded.
    async fn refresh_after(&self, operation: Operation) {
        if let Err(err) = self.refresh().await {
            tracing::warn!(?operation, error = %err, "refetch after write failed");
        }
    }

    async fn with_loading<T>(
        &self,
        call: impl std::future::Future<Output = T>,
    ) -> T {
        self.state.lock().posts.begin_load();
        let result = call.await;
        self.state.lock().posts.fail_load();
        result
    }
}

fn fail<T>(operation: Operation, id: Option<&str>, err: impl Into<StoreError>) -> StoreResult<T> {
    let err = err.into();
    log_failure(operation, id, &err);
    Err(err)
}
