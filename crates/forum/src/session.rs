//! Forum index session
//!
//! [`ForumIndex`] owns all state of one open forum view: the merged
//! discussion list, the page cursor, the selection and the event
//! subscription. Every operation takes `&mut self`, so fetch results and
//! events are applied one at a time.

use anyhow::Result;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::sync::Arc;

use crate::config::{ForumSettings, Layout};
use crate::error::{ForumError, ForumResult};
use crate::events::{
    EventBus, EventFilter, EventTarget, ForumEvent, Subscription, SubscriptionError, SyncedEvent,
};
use crate::fetch::{
    FetchedPage, ForumContext, detect_track_posts, fetch_discussion_page, fetch_forum_context,
    fetch_metadata, fetch_offline_discussions,
};
use crate::list::{DiscussionList, LoadMoreRejection, PageMode, PageRequest, Pagination};
use crate::models::{
    CourseId, CourseModuleId, DiscussionItem, ForumData, ItemKey, SortOrder, UserId,
};
use crate::provider::{
    DiscussionQuery, ForumProvider, InMemoryForumProvider, Navigator, OfflineStore,
    PreferenceStore,
};
use crate::reconcile::{
    PendingSelection, ReconcileContext, ReconcileOutcome, RefreshKind, SelectionDirective,
    reconcile,
};
use crate::selection::{NavigationParams, NavigationRequest, PathResolver, RouteParams, Selection};

/// Collaborators of a forum index
#[derive(Clone)]
pub struct Providers {
    pub forum: Arc<dyn ForumProvider>,
    pub offline: Arc<dyn OfflineStore>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub navigator: Arc<dyn Navigator>,
}

impl Providers {
    /// Use one in-memory provider for the server, the offline queue and the
    /// preferences
    pub fn in_memory(provider: Arc<InMemoryForumProvider>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            forum: provider.clone(),
            offline: provider.clone(),
            preferences: provider,
            navigator,
        }
    }
}

/// Load state of the discussion list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ListStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    /// Last load failed. The previous list is still shown.
    Errored(String),
}

/// Result of a load-more request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMoreOutcome {
    /// Page appended, with the number of new discussions
    Loaded { added: usize },
    /// Nothing fetched
    Rejected(LoadMoreRejection),
    /// Fetched, but a refresh superseded the request
    Discarded,
}

/// Summary of one [`ForumIndex::process_events`] run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessedEvents {
    pub handled: usize,
    pub refresh: RefreshKind,
    /// Item selected as a consequence of the events
    pub selected: Option<ItemKey>,
}

/// State and operations of one forum index view
pub struct ForumIndex {
    settings: ForumSettings,
    providers: Providers,
    course_id: CourseId,
    cm_id: CourseModuleId,
    user_id: Option<UserId>,
    forum: Option<ForumData>,
    context: ForumContext,
    sort_order: SortOrder,
    list: DiscussionList,
    pagination: Pagination,
    selection: Selection,
    paths: PathResolver,
    track_posts: bool,
    has_offline: bool,
    status: ListStatus,
    subscription: Option<Subscription>,
}

impl ForumIndex {
    pub fn new(
        settings: ForumSettings,
        providers: Providers,
        course_id: CourseId,
        cm_id: CourseModuleId,
    ) -> Self {
        let paths = PathResolver::new(settings.path_prefix.clone());
        Self {
            settings,
            providers,
            course_id,
            cm_id,
            user_id: None,
            forum: None,
            context: ForumContext::default(),
            sort_order: SortOrder::default(),
            list: DiscussionList::new(),
            pagination: Pagination::new(),
            selection: Selection::new(),
            paths,
            track_posts: false,
            has_offline: false,
            status: ListStatus::Idle,
            subscription: None,
        }
    }

    /// Set the user of the session. Sync events of other users are then
    /// ignored.
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    // === Accessors ===

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn list(&self) -> &DiscussionList {
        &self.list
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_item(&self) -> Option<&DiscussionItem> {
        self.selection.selected_item(&self.list)
    }

    /// Path of the selected item
    pub fn selected_path(&self) -> Option<String> {
        self.selection
            .selected()
            .map(|key| self.paths.path_for_key(key))
    }

    pub fn paths(&self) -> &PathResolver {
        &self.paths
    }

    pub fn forum(&self) -> Option<&ForumData> {
        self.forum.as_ref()
    }

    pub fn context(&self) -> &ForumContext {
        &self.context
    }

    pub fn settings(&self) -> &ForumSettings {
        &self.settings
    }

    pub fn layout(&self) -> Layout {
        self.settings.layout
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    /// Sort orders the user can pick from
    pub fn sort_orders(&self) -> Vec<SortOrder> {
        SortOrder::available(self.settings.sorting_available)
    }

    pub fn status(&self) -> &ListStatus {
        &self.status
    }

    pub fn track_posts(&self) -> bool {
        self.track_posts
    }

    /// Whether anything of this forum waits in the offline queue
    pub fn has_offline(&self) -> bool {
        self.has_offline
    }

    pub fn can_load_more(&self) -> bool {
        self.pagination.can_load_more()
    }

    pub fn load_more_error(&self) -> bool {
        self.pagination.load_more_error()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    // === Loading ===

    /// Load forum, context and the first page.
    ///
    /// When a cached load fails it is retried once without cache. When a
    /// refresh fails the previous list is kept and further automatic
    /// loading stops until [`ForumIndex::retry_load_more`].
    pub async fn load_content(&mut self, refresh: bool) -> ForumResult<()> {
        self.status = ListStatus::Loading;

        let mut result = if refresh {
            self.invalidate_and_fetch().await
        } else {
            self.fetch_content().await
        };

        if !refresh && let Err(e) = &result {
            warn!("Loading forum failed, retrying without cache: {:#}", e);
            result = self.invalidate_and_fetch().await;
        }

        self.finish_load(result)
    }

    /// Invalidate cached data and reload
    pub async fn refresh_content(&mut self) -> ForumResult<()> {
        self.load_content(true).await
    }

    /// Fetch and append the next page
    pub async fn load_more(&mut self) -> ForumResult<LoadMoreOutcome> {
        let forum = self.forum.clone().ok_or(ForumError::NotLoaded)?;

        let request = match self.pagination.begin_load_more(self.sort_order) {
            Ok(request) => request,
            Err(rejection) => {
                debug!("Load more rejected: {}", rejection);
                return Ok(LoadMoreOutcome::Rejected(rejection));
            }
        };

        let query = DiscussionQuery {
            sort_order: request.sort_order,
            page: request.page,
        };
        let result = fetch_discussion_page(
            self.providers.forum.as_ref(),
            self.providers.offline.as_ref(),
            &forum,
            &self.context,
            query,
        )
        .await;

        match result {
            Ok(page) => {
                let before = self.list.len();
                if self.apply_page(&forum, &request, page) {
                    let added = self.list.len() - before;
                    info!("Loaded page {} with {} discussions", request.page, added);
                    Ok(LoadMoreOutcome::Loaded { added })
                } else {
                    Ok(LoadMoreOutcome::Discarded)
                }
            }
            Err(e) => {
                error!("Loading more discussions failed: {:#}", e);
                self.pagination.fail(&request);
                Err(ForumError::fetch(&e))
            }
        }
    }

    /// Clear the load-more error and try the next page again
    pub async fn retry_load_more(&mut self) -> ForumResult<LoadMoreOutcome> {
        self.pagination.clear_error();
        self.load_more().await
    }

    /// Store a new sort order and reload the first page with it.
    ///
    /// If the preference cannot be stored the current order stays active.
    pub async fn set_sort_order(&mut self, order: SortOrder) -> ForumResult<()> {
        if order == self.sort_order {
            return Ok(());
        }
        if !self.sort_orders().contains(&order) {
            return Err(ForumError::Config {
                message: format!("Sort order {:?} is not available", order),
            });
        }
        let forum = self.forum.clone().ok_or(ForumError::NotLoaded)?;

        if let Err(e) = self.providers.preferences.set_sort_order(order).await {
            error!("Storing sort order {:?} failed: {:#}", order, e);
            return Err(ForumError::PreferenceUpdate {
                message: format!("{:#}", e),
            });
        }

        info!("Sort order changed to {:?}", order);
        self.sort_order = order;
        self.status = ListStatus::Loading;
        let result = self.fetch_first_page(&forum).await;
        self.finish_load(result)
    }

    async fn invalidate_and_fetch(&mut self) -> Result<()> {
        let forum_id = self.forum.as_ref().map(|forum| forum.id);
        if let Err(e) = self.providers.forum.invalidate(forum_id).await {
            debug!("Invalidating forum data failed: {:#}", e);
        }
        self.fetch_content().await
    }

    async fn fetch_content(&mut self) -> Result<()> {
        let metadata = fetch_metadata(
            self.providers.forum.as_ref(),
            self.providers.preferences.as_ref(),
            self.course_id,
            self.cm_id,
            self.settings.sorting_available,
        )
        .await?;

        let context = fetch_forum_context(
            self.providers.forum.as_ref(),
            &metadata.forum,
            self.settings.pin_state_available,
            Utc::now(),
        )
        .await?;

        debug!(
            "Loaded forum {} ({:?}), sorted by {:?}",
            metadata.forum.id, metadata.forum.forum_type, metadata.sort_order
        );
        self.forum = Some(metadata.forum.clone());
        self.sort_order = metadata.sort_order;
        self.context = context;

        self.fetch_first_page(&metadata.forum).await
    }

    /// Fetch the offline queue and page 0 together and merge both
    async fn fetch_first_page(&mut self, forum: &ForumData) -> Result<()> {
        let request = self.pagination.begin_refresh(self.sort_order);
        let query = DiscussionQuery {
            sort_order: request.sort_order,
            page: request.page,
        };

        let (offline, page) = tokio::join!(
            fetch_offline_discussions(
                self.providers.forum.as_ref(),
                self.providers.offline.as_ref(),
                forum,
                &self.context,
            ),
            fetch_discussion_page(
                self.providers.forum.as_ref(),
                self.providers.offline.as_ref(),
                forum,
                &self.context,
                query,
            ),
        );

        let (offline, page) = match (offline, page) {
            (Ok(offline), Ok(page)) => (offline, page),
            (Err(e), _) | (_, Err(e)) => {
                self.pagination.fail(&request);
                return Err(e);
            }
        };

        self.has_offline = !offline.is_empty();
        self.list.set_offline_discussions(offline);
        self.apply_page(forum, &request, page);
        Ok(())
    }

    /// Merge a fetched page. Returns false if the request went stale.
    fn apply_page(&mut self, forum: &ForumData, request: &PageRequest, page: FetchedPage) -> bool {
        if !self.pagination.complete(request, page.can_load_more) {
            return false;
        }

        self.track_posts = detect_track_posts(forum, self.track_posts, &page.discussions);
        self.has_offline |= page.has_offline_replies;

        match request.mode {
            PageMode::Replace => self.list.set_online_discussions(page.discussions),
            PageMode::Append => {
                self.list.append_online_discussions(page.discussions);
            }
        }
        true
    }

    fn finish_load(&mut self, result: Result<()>) -> ForumResult<()> {
        match result {
            Ok(()) => {
                self.status = ListStatus::Loaded;
                Ok(())
            }
            Err(e) => {
                error!("Error getting forum data: {:#}", e);
                self.pagination.set_error();
                let error = ForumError::fetch(&e);
                self.status = ListStatus::Errored(error.to_string());
                Err(error)
            }
        }
    }

    // === Selection ===

    /// Select an item and navigate to it
    pub fn select(&mut self, key: ItemKey) -> ForumResult<()> {
        let request = self.navigation_request(&key)?;
        self.providers
            .navigator
            .navigate(&request)
            .map_err(|e| ForumError::Navigation {
                message: format!("{:#}", e),
            })?;
        debug!("Selected {}", request.path);
        self.selection.select(key);
        Ok(())
    }

    /// Select the new discussion form
    pub fn open_new_discussion(&mut self) -> ForumResult<()> {
        self.select(ItemKey::NewDiscussion)
    }

    /// Select the first item of the list. Returns false when the list is
    /// empty.
    pub fn select_first(&mut self) -> ForumResult<bool> {
        let Some(key) = self.list.first().map(DiscussionItem::key) else {
            return Ok(false);
        };
        self.select(key)?;
        Ok(true)
    }

    /// Sync the selection with a route the host navigated to.
    ///
    /// Returns the path of the selected item, `None` for the list-only
    /// view.
    pub fn enter_route(&mut self, params: &RouteParams) -> Option<String> {
        match self.paths.key_for_params(params) {
            Some(key) => {
                let path = self.paths.path_for_key(&key);
                self.selection.select(key);
                Some(path)
            }
            None => {
                self.selection.clear();
                None
            }
        }
    }

    /// Navigation request for an item of the list
    pub fn navigation_request(&self, key: &ItemKey) -> ForumResult<NavigationRequest> {
        let forum = self.forum.as_ref().ok_or(ForumError::NotLoaded)?;

        let discussion = match key {
            ItemKey::NewDiscussion => None,
            key => {
                let item = self.list.get(key).ok_or_else(|| ForumError::NotFound {
                    item: format!("{:?}", key),
                })?;
                item.as_online().cloned()
            }
        };
        let track_posts = discussion.as_ref().map(|_| self.track_posts);

        Ok(NavigationRequest {
            path: self.paths.path_for_key(key),
            params: NavigationParams {
                course_id: self.course_id,
                cm_id: self.cm_id,
                forum_id: forum.id,
                discussion,
                track_posts,
            },
        })
    }

    // === Events ===

    /// Listen to forum events on `bus`. Replaces any earlier subscription.
    pub fn attach(&mut self, bus: &EventBus) {
        self.subscription = Some(bus.subscribe(EventFilter::all()));
        debug!("Forum index of module {} subscribed to events", self.cm_id);
    }

    /// Stop listening to events
    pub fn detach(&mut self) {
        if self.subscription.take().is_some() {
            debug!("Forum index of module {} unsubscribed", self.cm_id);
        }
    }

    /// Close the view and release its subscription
    pub fn teardown(mut self) {
        self.detach();
    }

    /// Event announcing that this index synced the forum's offline data.
    /// The index itself ignores it.
    pub fn sync_event(&self) -> ForumResult<ForumEvent> {
        let forum = self.forum.as_ref().ok_or(ForumError::NotLoaded)?;
        Ok(ForumEvent::Synced(SyncedEvent::from_index(
            EventTarget::forum(forum.id),
            self.user_id,
        )))
    }

    /// Apply an event to the list. Events that cannot be applied request a
    /// full refresh.
    pub fn handle_event(&mut self, event: &ForumEvent) -> ReconcileOutcome {
        let context = ReconcileContext {
            forum_id: self.forum.as_ref().map(|forum| forum.id),
            cm_id: self.cm_id,
            layout: self.settings.layout,
            user_id: self.user_id,
        };

        match reconcile(&mut self.list, event, &context) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Could not apply {:?} event, refreshing: {}", event.kind(), e);
                ReconcileOutcome::full_refresh()
            }
        }
    }

    /// Handle every queued event.
    ///
    /// Refresh requests are coalesced into at most one full refresh. A
    /// selection requested by a new discussion is applied after it. A
    /// failed navigation does not stop the batch; the first error is
    /// returned once every event is handled and the refresh has run.
    pub async fn process_events(&mut self) -> ForumResult<ProcessedEvents> {
        let mut summary = ProcessedEvents::default();
        let Some(subscription) = self.subscription.as_mut() else {
            return Ok(summary);
        };

        let mut events = Vec::new();
        let mut closed = false;
        loop {
            match subscription.try_next() {
                Ok(Some(event)) => events.push(event),
                Ok(None) => break,
                Err(SubscriptionError::Lagged { skipped }) => {
                    warn!("Missed {} forum events, refreshing", skipped);
                    summary.refresh = RefreshKind::Full;
                }
                Err(SubscriptionError::Closed) => {
                    closed = true;
                    break;
                }
            }
        }
        if closed {
            debug!("Event bus closed");
            self.subscription = None;
        }

        let mut first_error: Option<ForumError> = None;
        let mut pending: Option<PendingSelection> = None;
        for event in &events {
            let outcome = self.handle_event(event);
            if outcome.is_ignored() {
                continue;
            }
            summary.handled += 1;
            summary.refresh = summary.refresh.max(outcome.refresh);

            match outcome.selection {
                SelectionDirective::Keep => {}
                SelectionDirective::SelectFirst => match self.select_first() {
                    Ok(true) => summary.selected = self.selection.selected().copied(),
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Selecting the first discussion failed: {}", e);
                        first_error.get_or_insert(e);
                    }
                },
                SelectionDirective::AfterRefresh(selection) => pending = Some(selection),
            }
        }

        if summary.refresh == RefreshKind::Full
            && let Err(e) = self.refresh_content().await
        {
            first_error.get_or_insert(e);
        }

        if let Some(pending) = pending
            && let Some(key) = pending.resolve(&self.list)
        {
            match self.select(key) {
                Ok(()) => summary.selected = Some(key),
                Err(e) => {
                    warn!("Opening the new discussion failed: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }
}
