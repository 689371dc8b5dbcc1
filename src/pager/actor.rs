//! The paginator worker.
//!
//! One thread owns the cursor, the flags and all writes to the item list.
//! Scroll reports, fetch completions and live events all reach it as
//! messages, so a page merge and a live insert never run at the same time.
//! The live subscription is additionally detached while a load-more fetch
//! is outstanding and reattached after the merge.

use super::listener::{ListChange, PageListener};
use super::merge::merge_page;
use super::state::{Cursor, PagingState};
use crate::collection::{RangeQuery, RemoteCollection};
use crate::config::{FetchErrorPolicy, PagerConfig};
use crate::error::{PagerError, Result};
use crate::subscriptions::{ChildEvent, DropReason, SubscriptionConfig, SubscriptionHandle};
use crate::types::{Boundary, Pageable, Record};
use crossbeam_channel::{never, select, unbounded, Receiver, Sender, TryRecvError};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Which fetch a completed query belongs to.
#[derive(Clone, Debug)]
pub(crate) enum Fetch {
    Initial,
    More { boundary: Boundary },
}

/// A finished range query.
pub(crate) struct Completion {
    fetch: Fetch,
    result: Result<Vec<Record>>,
}

/// Messages sent by the paginator handle.
pub(crate) enum Command {
    Scrolled {
        visible_count: usize,
        last_visible_index: usize,
    },
    LoadMore,
    State(Sender<PagingState>),
    Sync(Sender<()>),
    Shutdown,
}

pub(crate) struct PagerActor<T, F> {
    collection: Arc<dyn RemoteCollection>,
    config: PagerConfig,
    convert: F,
    listener: Box<dyn PageListener>,
    items: Arc<RwLock<Vec<T>>>,
    state: PagingState,
    live: Option<SubscriptionHandle>,
    /// Query callbacks report here.
    completed_tx: Sender<Completion>,
    completed_rx: Receiver<Completion>,
}

impl<T, F> PagerActor<T, F>
where
    T: Pageable + Send + Sync + 'static,
    F: Fn(&Record) -> T + Send + 'static,
{
    pub(crate) fn new(
        collection: Arc<dyn RemoteCollection>,
        config: PagerConfig,
        convert: F,
        listener: Box<dyn PageListener>,
        items: Arc<RwLock<Vec<T>>>,
    ) -> Self {
        let (completed_tx, completed_rx) = unbounded();
        Self {
            collection,
            config,
            convert,
            listener,
            items,
            state: PagingState::default(),
            live: None,
            completed_tx,
            completed_rx,
        }
    }

    /// Issue the first fetch, then serve messages until shutdown.
    pub(crate) fn run(mut self, inbox: Receiver<Command>) {
        debug!(
            path = %self.config.path,
            page_size = self.config.page_size,
            order_by = %self.config.order_by,
            "creating pager"
        );
        self.load_initial();

        loop {
            let live = match &self.live {
                Some(handle) => handle.receiver.clone(),
                None => never(),
            };

            let completed = self.completed_rx.clone();

            let running = select! {
                recv(inbox) -> msg => match msg {
                    Ok(command) => {
                        // Fetches and live events already delivered happened
                        // before this command.
                        self.drain_completed();
                        self.drain_live();
                        self.handle(command)
                    }
                    Err(_) => false,
                },
                recv(completed) -> done => {
                    if let Ok(done) = done {
                        self.on_page_loaded(done.fetch, done.result);
                    }
                    true
                },
                recv(live) -> event => {
                    match event {
                        Ok(event) => self.on_child_event(event),
                        Err(_) => self.on_live_disconnected(),
                    }
                    true
                },
            };
            if !running {
                break;
            }
        }

        self.detach_live();
        debug!(path = %self.config.path, "pager stopped");
    }

    /// Returns false when the worker should stop.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Scrolled {
                visible_count,
                last_visible_index,
            } => {
                if self.state.wants_more(
                    visible_count,
                    last_visible_index,
                    self.config.visible_threshold,
                ) {
                    self.load_more();
                }
            }
            Command::LoadMore => {
                if !self.state.loading && !self.state.is_last_page() {
                    self.load_more();
                }
            }
            Command::State(reply) => {
                let _ = reply.send(self.state.clone());
            }
            Command::Sync(reply) => {
                let _ = reply.send(());
            }
            Command::Shutdown => return false,
        }
        true
    }

    fn load_initial(&mut self) {
        let query = RangeQuery::new(self.config.path.clone(), self.config.order_by.clone())
            .limit_to_last(self.config.fetch_limit());
        self.issue(query, Fetch::Initial);
    }

    fn load_more(&mut self) {
        let Some(boundary) = self.state.cursor.take_known() else {
            debug!(cursor = ?self.state.cursor, "load more: nothing to do");
            return;
        };

        debug!(end_at = %boundary.order, "load more");
        self.state.loading = true;
        self.listener.loading_more_started();

        // No live inserts while the page is in flight.
        self.detach_live();

        let query = RangeQuery::new(self.config.path.clone(), self.config.order_by.clone())
            .end_at(boundary.clone())
            .limit_to_last(self.config.fetch_limit());
        self.issue(query, Fetch::More { boundary });
    }

    fn issue(&self, query: RangeQuery, fetch: Fetch) {
        let completed = self.completed_tx.clone();
        self.collection.range_query(
            query,
            Box::new(move |result| {
                // The worker may already be gone; nothing left to update then.
                let _ = completed.send(Completion { fetch, result });
            }),
        );
    }

    fn on_page_loaded(&mut self, fetch: Fetch, result: Result<Vec<Record>>) {
        if matches!(fetch, Fetch::More { .. }) {
            self.state.loading = false;
        }

        let batch = match result {
            Ok(batch) => batch,
            Err(error) => {
                self.on_fetch_failed(fetch, error);
                return;
            }
        };

        let outcome = {
            let mut items = self.items.write();
            let at = match fetch {
                Fetch::Initial => 0,
                Fetch::More { .. } => items.len(),
            };
            merge_page(
                &mut *items,
                &batch,
                at,
                self.config.page_len(),
                &self.convert,
            )
        };
        self.state.cursor = outcome.cursor;

        if outcome.added > 0 {
            self.listener.list_changed(ListChange::Inserted {
                index: outcome.index,
                count: outcome.added,
            });
            if outcome.was_empty {
                self.listener.list_is_not_empty();
            } else {
                self.listener.loading_more_finished();
            }
        }

        self.attach_live();

        if matches!(fetch, Fetch::Initial) && self.items.read().is_empty() {
            self.listener.list_is_empty();
        }
    }

    fn on_fetch_failed(&mut self, fetch: Fetch, error: PagerError) {
        warn!(path = %self.config.path, %error, "page fetch failed");
        self.listener.database_error(&error);

        if let Fetch::More { boundary } = fetch {
            if self.config.on_fetch_error == FetchErrorPolicy::RestoreCursor {
                self.state.cursor = Cursor::Known(boundary);
            }
            // The head of the list is unaffected; keep following it.
            self.attach_live();
        }
    }

    /// (Re)attach the live subscription. The first `Added` it delivers is
    /// a replay of the newest child, which the last merge already covers.
    fn attach_live(&mut self) {
        self.detach_live();
        self.state.suspend_live_insert = true;

        let config = SubscriptionConfig {
            buffer_size: self.config.subscription_buffer,
            ..SubscriptionConfig::last_one(self.config.path.clone(), self.config.order_by.clone())
        };
        match self.collection.subscribe(config) {
            Ok(handle) => self.live = Some(handle),
            Err(error) => {
                warn!(path = %self.config.path, %error, "live subscription failed");
                self.listener.database_error(&error);
            }
        }
    }

    fn detach_live(&mut self) {
        if let Some(handle) = self.live.take() {
            self.collection.unsubscribe(handle.id);
        }
    }

    fn drain_completed(&mut self) {
        while let Ok(done) = self.completed_rx.try_recv() {
            self.on_page_loaded(done.fetch, done.result);
        }
    }

    fn drain_live(&mut self) {
        loop {
            let next = self.live.as_ref().map(|handle| handle.try_recv());
            match next {
                Some(Ok(event)) => self.on_child_event(event),
                Some(Err(TryRecvError::Disconnected)) => {
                    self.on_live_disconnected();
                    break;
                }
                Some(Err(TryRecvError::Empty)) | None => break,
            }
        }
    }

    /// The transport closed the live stream without saying why.
    fn on_live_disconnected(&mut self) {
        warn!(path = %self.config.path, "live subscription disconnected");
        self.live = None;
        self.listener.database_error(&PagerError::SubscriptionDropped);
    }

    fn on_child_event(&mut self, event: ChildEvent) {
        match event {
            ChildEvent::Added { record } => {
                if self.state.suspend_live_insert {
                    self.state.suspend_live_insert = false;
                    debug!(key = %record.key, "live insert ignored");
                    return;
                }

                debug!(key = %record.key, "live insert");
                let item = (self.convert)(&record);
                self.listener.list_is_not_empty();
                self.items.write().insert(0, item);
                self.listener
                    .list_changed(ListChange::Inserted { index: 0, count: 1 });
            }
            ChildEvent::Changed { .. } | ChildEvent::Removed { .. } | ChildEvent::Moved { .. } => {
                trace!("live event not applied");
            }
            ChildEvent::Cancelled { reason } => {
                warn!(path = %self.config.path, %reason, "live subscription cancelled");
                self.live = None;
                self.listener
                    .database_error(&PagerError::SubscriptionCancelled(reason));
            }
            ChildEvent::Dropped { reason } => {
                self.live = None;
                if !matches!(reason, DropReason::Unsubscribed) {
                    warn!(path = %self.config.path, ?reason, "live subscription dropped");
                    self.listener.database_error(&PagerError::SubscriptionDropped);
                }
            }
        }
    }
}
