//! Debounced coin search
//!
//! A `SearchSession` receives keystroke-level query updates and only calls
//! the data source once the query has been stable for the debounce period.
//! New input cancels an in-flight search, so a superseded response is never
//! published.

use crate::{constants::SEARCH_DEBOUNCE_MS, source::MarketDataSource, types::SearchCoin};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Observable state of a search session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    /// Latest query typed, settled or not
    pub query: String,
    /// Results of the last completed search
    pub results: Vec<SearchCoin>,
    /// True while a request is in flight
    pub is_loading: bool,
    /// Message of the last failed search, cleared by the next success
    pub error: Option<String>,
}

enum Command {
    Query(String),
    Close,
}

/// Handle to a running search session; dropping it stops the session
pub struct SearchSession {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SearchState>,
    task: JoinHandle<()>,
}

impl SearchSession {
    /// Starts a session with the default 500 ms debounce
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self::spawn(source, Duration::from_millis(SEARCH_DEBOUNCE_MS))
    }

    /// Starts a session with a custom debounce period
    pub fn spawn(source: Arc<dyn MarketDataSource>, debounce: Duration) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(SearchState::default());
        let task = tokio::spawn(run(source, debounce, rx, state_tx));

        Self {
            commands,
            state,
            task,
        }
    }

    /// Replaces the current query
    pub fn set_query(&self, query: impl Into<String>) {
        let _ = self.commands.send(Command::Query(query.into()));
    }

    /// Clears query and results and cancels any pending search
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }

    /// Current state snapshot
    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.clone()
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    source: Arc<dyn MarketDataSource>,
    debounce: Duration,
    mut commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<SearchState>,
) {
    let mut next: Option<Command> = None;
    // last query whose results are currently shown
    let mut settled: Option<String> = None;

    'session: loop {
        let command = match next.take() {
            Some(command) => command,
            None => match commands.recv().await {
                Some(command) => command,
                None => return,
            },
        };

        let mut query = match command {
            Command::Close => {
                settled = None;
                state.send_replace(SearchState::default());
                continue;
            }
            Command::Query(query) => query,
        };
        state.send_modify(|s| s.query = query.clone());

        // wait for the input to go quiet
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    None => return,
                    Some(Command::Query(q)) => {
                        query = q;
                        state.send_modify(|s| s.query = query.clone());
                    }
                    Some(Command::Close) => {
                        next = Some(Command::Close);
                        continue 'session;
                    }
                },
                _ = sleep(debounce) => break,
            }
        }

        if query.trim().is_empty() {
            settled = None;
            state.send_modify(|s| {
                s.results.clear();
                s.error = None;
                s.is_loading = false;
            });
            continue;
        }

        // results on screen already match; drop any error from a later failure
        if settled.as_deref() == Some(query.as_str()) {
            state.send_if_modified(|s| {
                let modified = s.error.is_some() || s.is_loading;
                s.error = None;
                s.is_loading = false;
                modified
            });
            continue;
        }

        state.send_modify(|s| s.is_loading = true);
        tracing::debug!(query = %query, "Searching coins");

        let search = source.search_coins(&query);
        tokio::pin!(search);

        tokio::select! {
            result = &mut search => match result {
                Ok(coins) => {
                    settled = Some(query.clone());
                    state.send_modify(|s| {
                        s.results = coins;
                        s.error = None;
                        s.is_loading = false;
                    });
                }
                Err(e) => {
                    tracing::warn!(query = %query, error = %e, "Search failed");
                    state.send_modify(|s| {
                        s.error = Some(e.to_string());
                        s.is_loading = false;
                    });
                }
            },
            command = commands.recv() => match command {
                None => return,
                Some(command) => {
                    tracing::debug!(query = %query, "Superseded search cancelled");
                    state.send_modify(|s| s.is_loading = false);
                    next = Some(command);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::MockSource;

    fn coin(id: &str) -> SearchCoin {
        SearchCoin {
            id: id.to_string(),
            name: id.to_uppercase(),
            api_symbol: id.to_string(),
            symbol: id[..3].to_uppercase(),
            market_cap_rank: Some(1),
            thumb: String::new(),
            large: String::new(),
        }
    }

    fn session(source: &Arc<MockSource>) -> SearchSession {
        SearchSession::spawn(source.clone(), Duration::from_millis(500))
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_input_issues_one_search() {
        let source = Arc::new(MockSource::new());
        source.set_search("btc", vec![coin("bitcoin")]);
        let session = session(&source);

        for q in ["b", "bt", "btc"] {
            session.set_query(q);
            sleep(Duration::from_millis(100)).await;
        }
        sleep(Duration::from_millis(300)).await;
        assert!(source.search_calls().is_empty());

        let mut rx = session.subscribe();
        rx.wait_for(|s| !s.results.is_empty()).await.unwrap();

        assert_eq!(source.search_calls(), vec!["btc".to_string()]);
        let state = session.state();
        assert_eq!(state.query, "btc");
        assert_eq!(state.results[0].id, "bitcoin");
        assert!(!state.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_query_clears_without_request() {
        let source = Arc::new(MockSource::new());
        source.set_search("eth", vec![coin("ethereum")]);
        let session = session(&source);
        let mut rx = session.subscribe();

        session.set_query("eth");
        rx.wait_for(|s| s.results.len() == 1).await.unwrap();

        session.set_query("");
        rx.wait_for(|s| s.results.is_empty()).await.unwrap();
        assert_eq!(source.search_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_input_cancels_in_flight_search() {
        let source = Arc::new(MockSource::new());
        source.set_delay(Duration::from_secs(1));
        source.set_search("eth", vec![coin("ethereum")]);
        source.set_search("sol", vec![coin("solana")]);
        let session = session(&source);

        session.set_query("eth");
        sleep(Duration::from_millis(700)).await;
        assert!(session.state().is_loading);

        session.set_query("sol");
        // the eth request would have completed at 1500 ms
        sleep(Duration::from_millis(900)).await;
        assert!(session.state().results.is_empty());

        let mut rx = session.subscribe();
        rx.wait_for(|s| !s.results.is_empty()).await.unwrap();
        assert_eq!(session.state().results[0].id, "solana");
        assert_eq!(
            source.search_calls(),
            vec!["eth".to_string(), "sol".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_search_keeps_previous_results() {
        let source = Arc::new(MockSource::new());
        source.set_search("ada", vec![coin("cardano")]);
        source.fail_search("doge", 500);
        let session = session(&source);
        let mut rx = session.subscribe();

        session.set_query("ada");
        rx.wait_for(|s| !s.results.is_empty()).await.unwrap();

        session.set_query("doge");
        rx.wait_for(|s| s.error.is_some()).await.unwrap();
        let state = session.state();
        assert_eq!(state.results[0].id, "cardano");
        assert!(!state.is_loading);
        assert!(state.error.unwrap().contains("500"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_query_after_failure_clears_error() {
        let source = Arc::new(MockSource::new());
        source.set_search("ada", vec![coin("cardano")]);
        source.fail_search("doge", 500);
        let session = session(&source);
        let mut rx = session.subscribe();

        session.set_query("ada");
        rx.wait_for(|s| !s.results.is_empty()).await.unwrap();
        session.set_query("doge");
        rx.wait_for(|s| s.error.is_some()).await.unwrap();

        session.set_query("ada");
        rx.wait_for(|s| s.query == "ada" && s.error.is_none())
            .await
            .unwrap();
        let state = session.state();
        assert_eq!(state.results[0].id, "cardano");
        assert!(!state.is_loading);
        assert_eq!(
            source.search_calls(),
            vec!["ada".to_string(), "doge".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_resets_state() {
        let source = Arc::new(MockSource::new());
        source.set_search("xrp", vec![coin("ripple")]);
        let session = session(&source);
        let mut rx = session.subscribe();

        session.set_query("xrp");
        rx.wait_for(|s| !s.results.is_empty()).await.unwrap();

        session.close();
        rx.wait_for(|s| s.results.is_empty()).await.unwrap();
        assert_eq!(session.state(), SearchState::default());

        // the same query is searched again after a close
        session.set_query("xrp");
        rx.wait_for(|s| !s.results.is_empty()).await.unwrap();
        assert_eq!(source.search_calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_settled_query_is_not_refetched() {
        let source = Arc::new(MockSource::new());
        source.set_search("dot", vec![coin("polkadot")]);
        let session = session(&source);
        let mut rx = session.subscribe();

        session.set_query("dot");
        rx.wait_for(|s| !s.results.is_empty()).await.unwrap();

        session.set_query("do");
        session.set_query("dot");
        sleep(Duration::from_secs(2)).await;
        assert_eq!(source.search_calls().len(), 1);
    }
}
