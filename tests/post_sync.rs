//! End-to-end tests of the post synchronization protocol against in-memory
//! fakes of the record store and search index, plus the real listing cache.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::macros::datetime;
use time::{Duration as TimeDuration, OffsetDateTime};
use uuid::Uuid;

use folio::application::pagination::{Page, PageRequest};
use folio::application::posts::{CreatePostCommand, PostService, PostServiceError, UpdatePostCommand};
use folio::application::repos::{
    CreatePostParams, PostsRepo, PostsWriteRepo, RepoError,
};
use folio::application::search::{DocumentPatch, SearchError, SearchIndex, SearchPage};
use folio::domain::posts::{PostPatch, PostRecord, SearchDocument};
use folio::infra::cache::MemoryListingCache;

const EPOCH: OffsetDateTime = datetime!(2026-01-01 00:00:00 UTC);

/// Record store fake with a deterministic, strictly increasing clock.
#[derive(Default)]
struct MemoryStore {
    posts: Mutex<Vec<PostRecord>>,
    ticks: AtomicI64,
    list_calls: AtomicUsize,
}

impl MemoryStore {
    fn next_time(&self) -> OffsetDateTime {
        EPOCH + TimeDuration::seconds(self.ticks.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn list_call_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Remove the row without telling anyone, simulating store/index drift.
    fn drop_row(&self, id: Uuid) {
        self.posts.lock().unwrap().retain(|post| post.id != id);
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .find(|post| post.id == id)
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<PostRecord>, RepoError> {
        let posts = self.posts.lock().unwrap();
        let mut found: Vec<PostRecord> = posts
            .iter()
            .filter(|post| ids.contains(&post.id))
            .cloned()
            .collect();
        // Deliberately not the ranked order the index returned; the service
        // must re-sort.
        found.reverse();
        Ok(found)
    }

    async fn find_by_paragraph(&self, paragraph: &str) -> Result<Vec<PostRecord>, RepoError> {
        let posts = self.posts.lock().unwrap();
        Ok(posts
            .iter()
            .filter(|post| post.paragraphs.iter().any(|p| p == paragraph))
            .cloned()
            .collect())
    }

    async fn list_posts(&self, page: PageRequest) -> Result<Page<PostRecord>, RepoError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let posts = self.posts.lock().unwrap();
        let total = posts.len() as u64;

        let mut items: Vec<PostRecord> = posts.clone();
        items.sort_by_key(|post| (post.created_at, post.id));
        if let Some(cursor) = page.cursor {
            items.retain(|post| post.id > cursor);
        }
        let items = items
            .into_iter()
            .skip(page.effective_offset() as usize)
            .take(page.effective_limit() as usize)
            .collect();

        Ok(Page::new(items, total))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let now = self.next_time();
        let post = PostRecord {
            id: Uuid::new_v4(),
            title: params.title,
            content: params.content,
            paragraphs: params.paragraphs,
            author_id: params.author_id,
            created_at: now,
            updated_at: now,
        };
        self.posts.lock().unwrap().push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: Uuid, patch: &PostPatch) -> Result<PostRecord, RepoError> {
        let now = self.next_time();
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|post| post.id == id)
            .ok_or(RepoError::NotFound)?;

        if let Some(title) = &patch.title {
            post.title = title.clone();
        }
        if let Some(content) = &patch.content {
            post.content = content.clone();
        }
        if let Some(paragraphs) = &patch.paragraphs {
            post.paragraphs = paragraphs.clone();
        }
        post.updated_at = now;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|post| post.id != id);
        if posts.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

/// Search index fake: case-insensitive substring match over title and
/// content, with a switch to make every write fail.
#[derive(Default)]
struct MemoryIndex {
    docs: Mutex<Vec<SearchDocument>>,
    fail_writes: AtomicBool,
}

impl MemoryIndex {
    fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn write_guard(&self) -> Result<(), SearchError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SearchError::Transport("index unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn index_post(&self, document: &SearchDocument) -> Result<(), SearchError> {
        self.write_guard()?;
        self.docs.lock().unwrap().push(document.clone());
        Ok(())
    }

    async fn update_post(&self, id: Uuid, patch: &DocumentPatch) -> Result<(), SearchError> {
        self.write_guard()?;
        let mut docs = self.docs.lock().unwrap();
        for doc in docs.iter_mut().filter(|doc| doc.id == id) {
            if let Some(title) = &patch.title {
                doc.title = title.clone();
            }
            if let Some(content) = &patch.content {
                doc.content = content.clone();
            }
        }
        Ok(())
    }

    async fn search(&self, text: &str, page: PageRequest) -> Result<SearchPage, SearchError> {
        let docs = self.docs.lock().unwrap();
        let needle = text.to_lowercase();
        let mut matches: Vec<&SearchDocument> = docs
            .iter()
            .filter(|doc| {
                doc.title.to_lowercase().contains(&needle)
                    || doc.content.to_lowercase().contains(&needle)
            })
            .collect();
        matches.sort_by_key(|doc| (doc.created_at, doc.id));

        // The unfiltered hit total, regardless of cursor (dual-mode rule).
        let total = matches.len() as u64;

        let ids = matches
            .into_iter()
            .filter(|doc| page.cursor.is_none_or(|cursor| doc.id > cursor))
            .skip(page.effective_offset() as usize)
            .take(page.effective_limit() as usize)
            .map(|doc| doc.id)
            .collect();

        Ok(SearchPage { ids, total })
    }

    async fn remove(&self, id: Uuid) -> Result<(), SearchError> {
        self.write_guard()?;
        self.docs.lock().unwrap().retain(|doc| doc.id != id);
        Ok(())
    }
}

struct Harness {
    service: PostService,
    store: Arc<MemoryStore>,
    index: Arc<MemoryIndex>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::default());
    let index = Arc::new(MemoryIndex::default());
    let cache = Arc::new(MemoryListingCache::new());
    let service = PostService::new(store.clone(), store.clone(), index.clone(), cache);
    Harness {
        service,
        store,
        index,
    }
}

fn create_command(title: &str, content: &str) -> CreatePostCommand {
    CreatePostCommand {
        title: title.to_string(),
        content: content.to_string(),
        paragraphs: None,
        author_id: Uuid::new_v4(),
    }
}

#[tokio::test]
async fn create_assigns_fresh_id_and_matching_timestamps() {
    let h = harness();

    let first = h
        .service
        .create_post(create_command("Go", "systems"))
        .await
        .unwrap();
    let second = h
        .service
        .create_post(create_command("Rust", "systems"))
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(first.created_at, first.updated_at);
    assert_eq!(second.created_at, second.updated_at);
}

#[tokio::test]
async fn create_rejects_blank_title_before_touching_the_store() {
    let h = harness();

    let result = h.service.create_post(create_command("  ", "body")).await;

    assert!(matches!(result, Err(PostServiceError::Validation(_))));
    assert!(h.store.posts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn listing_is_cached_until_a_mutation_invalidates_it() {
    let h = harness();
    let page = PageRequest::default().with_limit(10);

    h.service
        .create_post(create_command("First", "body"))
        .await
        .unwrap();

    let initial = h.service.list_posts(page).await.unwrap();
    assert_eq!(initial.total, 1);
    assert_eq!(h.store.list_call_count(), 1);

    // Identical query parameters hit the cache, not the store.
    let cached = h.service.list_posts(page).await.unwrap();
    assert_eq!(cached, initial);
    assert_eq!(h.store.list_call_count(), 1);

    // A create must be observable through the same query immediately.
    let second = h
        .service
        .create_post(create_command("Second", "body"))
        .await
        .unwrap();
    let refreshed = h.service.list_posts(page).await.unwrap();
    assert_eq!(h.store.list_call_count(), 2);
    assert_eq!(refreshed.total, 2);
    assert!(refreshed.items.iter().any(|post| post.id == second.id));
}

#[tokio::test]
async fn update_merges_fields_and_strictly_bumps_updated_at() {
    let h = harness();
    let created = h
        .service
        .create_post(create_command("Original title", "original content"))
        .await
        .unwrap();

    let updated = h
        .service
        .update_post(
            created.id,
            UpdatePostCommand {
                content: Some("revised content".to_string()),
                ..UpdatePostCommand::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Original title");
    assert_eq!(updated.content, "revised content");
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);

    // The projection followed the store.
    let docs = h.index.docs.lock().unwrap();
    assert_eq!(docs[0].content, "revised content");
}

#[tokio::test]
async fn update_of_missing_post_is_not_found() {
    let h = harness();

    let result = h
        .service
        .update_post(
            Uuid::new_v4(),
            UpdatePostCommand {
                title: Some("anything".to_string()),
                ..UpdatePostCommand::default()
            },
        )
        .await;

    assert!(matches!(result, Err(err) if err.is_not_found()));
}

#[tokio::test]
async fn second_delete_reports_not_found() {
    let h = harness();
    let post = h
        .service
        .create_post(create_command("Doomed", "body"))
        .await
        .unwrap();

    h.service.delete_post(post.id).await.unwrap();
    assert!(h.index.docs.lock().unwrap().is_empty());

    let again = h.service.delete_post(post.id).await;
    assert!(matches!(again, Err(err) if err.is_not_found()));
}

#[tokio::test]
async fn total_ignores_the_cursor_filter() {
    let h = harness();
    for n in 0..10 {
        h.service
            .create_post(create_command(&format!("Post {n}"), "body"))
            .await
            .unwrap();
    }

    let offset_page = h
        .service
        .list_posts(PageRequest::default().with_limit(3))
        .await
        .unwrap();
    assert_eq!(offset_page.items.len(), 3);
    assert_eq!(offset_page.total, 10);

    let fifth = h
        .service
        .list_posts(PageRequest::offset(4).with_limit(1))
        .await
        .unwrap()
        .items[0]
        .id;
    let keyset_page = h
        .service
        .list_posts(PageRequest::keyset(fifth).with_limit(3))
        .await
        .unwrap();
    // Not "how many remain past the cursor".
    assert_eq!(keyset_page.total, 10);
    assert!(keyset_page.items.iter().all(|post| post.id > fifth));
}

#[tokio::test]
async fn index_failure_surfaces_but_the_store_row_is_durable() {
    let h = harness();
    h.index.fail_writes();

    let result = h
        .service
        .create_post(create_command("Unindexed", "body"))
        .await;
    assert!(matches!(&result, Err(err) if err.is_downstream()));

    // The store committed regardless; the post is retrievable by key.
    let listing = h
        .service
        .list_posts(PageRequest::default().with_limit(10))
        .await
        .unwrap();
    assert_eq!(listing.total, 1);
    let id = listing.items[0].id;
    assert!(h.service.get_post(id).await.is_ok());

    // Search legitimately misses it until reconciliation.
    let hits = h
        .service
        .search_posts("Unindexed", PageRequest::default())
        .await
        .unwrap();
    assert!(hits.items.is_empty());
}

#[tokio::test]
async fn search_matches_title_and_content_fields() {
    let h = harness();
    let a = h
        .service
        .create_post(create_command("Go", "systems"))
        .await
        .unwrap();
    let b = h
        .service
        .create_post(create_command("Rust", "systems"))
        .await
        .unwrap();
    let c = h
        .service
        .create_post(create_command("Go", "web"))
        .await
        .unwrap();

    let go = h.service.search_posts("Go", PageRequest::default()).await.unwrap();
    let go_ids: Vec<Uuid> = go.items.iter().map(|post| post.id).collect();
    assert_eq!(go_ids, vec![a.id, c.id]);
    assert_eq!(go.total, 2);

    let systems = h
        .service
        .search_posts("systems", PageRequest::default())
        .await
        .unwrap();
    let systems_ids: Vec<Uuid> = systems.items.iter().map(|post| post.id).collect();
    assert_eq!(systems_ids, vec![a.id, b.id]);
    assert_eq!(systems.total, 2);
}

#[tokio::test]
async fn hydrated_results_follow_the_index_order_and_drop_dangling_ids() {
    let h = harness();
    let first = h
        .service
        .create_post(create_command("Alpha systems", "body"))
        .await
        .unwrap();
    let second = h
        .service
        .create_post(create_command("Beta systems", "body"))
        .await
        .unwrap();
    let third = h
        .service
        .create_post(create_command("Gamma systems", "body"))
        .await
        .unwrap();

    // The store fake hydrates in reverse; ranked order must still win.
    let ranked = h
        .service
        .search_posts("systems", PageRequest::default())
        .await
        .unwrap();
    let ids: Vec<Uuid> = ranked.items.iter().map(|post| post.id).collect();
    assert_eq!(ids, vec![first.id, second.id, third.id]);

    // A row that vanished from the store while its document lingers is a
    // dangling reference: dropped from items, still counted by the index.
    h.store.drop_row(second.id);
    let after_drift = h
        .service
        .search_posts("systems", PageRequest::default())
        .await
        .unwrap();
    let ids: Vec<Uuid> = after_drift.items.iter().map(|post| post.id).collect();
    assert_eq!(ids, vec![first.id, third.id]);
    assert_eq!(after_drift.total, 3);
}

#[tokio::test]
async fn search_count_rule_matches_the_store_rule() {
    let h = harness();
    let mut ids = Vec::new();
    for n in 0..6 {
        let post = h
            .service
            .create_post(create_command(&format!("systems {n}"), "body"))
            .await
            .unwrap();
        ids.push(post.id);
    }
    ids.sort();

    let keyset = h
        .service
        .search_posts("systems", PageRequest::keyset(ids[3]).with_limit(2))
        .await
        .unwrap();
    assert_eq!(keyset.total, 6);
    assert!(keyset.items.iter().all(|post| post.id > ids[3]));
}

#[tokio::test]
async fn paragraph_lookup_matches_verbatim_entries() {
    let h = harness();
    h.service
        .create_post(CreatePostCommand {
            title: "With paragraphs".to_string(),
            content: "body".to_string(),
            paragraphs: Some(vec!["lorem".to_string(), "ipsum".to_string()]),
            author_id: Uuid::new_v4(),
        })
        .await
        .unwrap();
    h.service
        .create_post(create_command("Without", "body"))
        .await
        .unwrap();

    let hits = h.service.posts_with_paragraph("ipsum").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "With paragraphs");

    assert!(h.service.posts_with_paragraph("ipsu").await.unwrap().is_empty());
}
