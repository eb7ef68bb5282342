//! Board controller.
//!
//! Owns the session's board snapshot, runs commands through the engine and
//! mirrors every applied change to the gateway without waiting for it. The
//! local snapshot stays authoritative: failed saves are logged and never
//! rolled back or retried.

use crate::{
    config::{SavePolicy, SyncConfig},
    domain::{Board, CardId, ColumnId, Priority},
    engine::{self, Transition},
    storage::BoardGateway,
};
use std::sync::Arc;
use tokio::{runtime::Handle, sync::watch, task::JoinHandle};
use tracing::{debug, error, info, warn};

/// A user command against the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddColumn,
    RenameColumn {
        column_id: ColumnId,
        title: String,
    },
    DeleteColumn {
        column_id: ColumnId,
    },
    AddCard {
        column_id: ColumnId,
        title: String,
    },
    RenameCard {
        card_id: CardId,
        title: String,
    },
    SetPriority {
        card_id: CardId,
        priority: Priority,
    },
    DeleteCard {
        card_id: CardId,
    },
    MoveCard {
        card_id: CardId,
        target_column_id: ColumnId,
        after_card_id: Option<CardId>,
    },
}

/// Trims a user-entered title; blank titles are rejected
fn normalize_title(title: &str) -> Option<&str> {
    let trimmed = title.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

impl Command {
    /// Runs the command through the engine.
    ///
    /// Renaming to the title already held is a no-op and never reaches the
    /// store.
    pub fn apply(&self, board: &Board, config: &SyncConfig) -> Transition {
        match self {
            Self::AddColumn => engine::insert_column(
                board,
                ColumnId::generate(),
                config.new_column_title.as_str(),
            ),
            Self::RenameColumn { column_id, title } => match normalize_title(title) {
                Some(title)
                    if board.find_column(column_id).map(|c| c.title.as_str()) != Some(title) =>
                {
                    engine::rename_column(board, column_id, title)
                }
                _ => Transition::unchanged(board),
            },
            Self::DeleteColumn { column_id } => engine::delete_column(board, column_id),
            Self::AddCard { column_id, title } => match normalize_title(title) {
                Some(title) => engine::add_card(board, column_id, title),
                None => Transition::unchanged(board),
            },
            Self::RenameCard { card_id, title } => match normalize_title(title) {
                Some(title)
                    if board.find_card(card_id).map(|c| c.title.as_str()) != Some(title) =>
                {
                    engine::rename_card(board, card_id, title)
                }
                _ => Transition::unchanged(board),
            },
            Self::SetPriority { card_id, priority } => {
                engine::set_priority(board, card_id, *priority)
            }
            Self::DeleteCard { card_id } => engine::delete_card(board, card_id),
            Self::MoveCard {
                card_id,
                target_column_id,
                after_card_id,
            } => engine::move_card(board, card_id, target_column_id, after_card_id.as_ref()),
        }
    }
}

enum Persistence {
    /// One spawned save per applied command
    Detached { in_flight: Vec<JoinHandle<()>> },
    /// A single writer following the snapshot channel
    Coalescing { writer: JoinHandle<()> },
}

/// Single writer of the board snapshot.
///
/// `dispatch` takes `&mut self`, so commands are applied one at a time and
/// observers only ever read published snapshots.
pub struct BoardController {
    board: Arc<Board>,
    config: SyncConfig,
    gateway: Arc<dyn BoardGateway>,
    publisher: watch::Sender<Arc<Board>>,
    persistence: Persistence,
    runtime: Handle,
}

impl BoardController {
    /// Loads the saved board, or the configured default when the store has
    /// nothing usable, and starts the session
    pub async fn start(gateway: Arc<dyn BoardGateway>, config: SyncConfig) -> Self {
        let board = match gateway.load().await {
            Some(board) => {
                info!(
                    columns = board.columns.len(),
                    cards = board.cards.len(),
                    "Starting from saved board"
                );
                board
            }
            None => {
                info!("No saved board, starting from default layout");
                config.default_board()
            }
        };

        Self::with_board(gateway, config, board)
    }

    /// Starts a session from an already known board.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn with_board(gateway: Arc<dyn BoardGateway>, config: SyncConfig, board: Board) -> Self {
        let runtime = Handle::current();
        let board = Arc::new(board);
        let (publisher, _) = watch::channel(Arc::clone(&board));

        let persistence = match config.save_policy {
            SavePolicy::Detached => Persistence::Detached {
                in_flight: Vec::new(),
            },
            SavePolicy::Coalescing => Persistence::Coalescing {
                writer: runtime.spawn(write_latest(Arc::clone(&gateway), publisher.subscribe())),
            },
        };

        Self {
            board,
            config,
            gateway,
            publisher,
            persistence,
            runtime,
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<Board> {
        Arc::clone(&self.board)
    }

    /// Receiver that sees every snapshot published from now on
    pub fn subscribe(&self) -> watch::Receiver<Arc<Board>> {
        self.publisher.subscribe()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Applies a command and returns whether it changed the board.
    ///
    /// The new snapshot is held and published before this returns; saving it
    /// happens in the background.
    pub fn dispatch(&mut self, command: Command) -> bool {
        let transition = command.apply(&self.board, &self.config);
        if !transition.applied {
            debug!(?command, "Command left the board unchanged");
            return false;
        }

        let board = Arc::new(transition.board);
        self.board = Arc::clone(&board);
        self.publisher.send_replace(Arc::clone(&board));
        debug!(?command, "Applied command");

        if let Persistence::Detached { in_flight } = &mut self.persistence {
            in_flight.retain(|handle| !handle.is_finished());
            let gateway = Arc::clone(&self.gateway);
            in_flight.push(self.runtime.spawn(async move {
                save_logged(gateway.as_ref(), &board).await;
            }));
        }

        true
    }

    /// Ends the session, waiting for outstanding saves to reach the store
    pub async fn shutdown(self) {
        let Self {
            publisher,
            persistence,
            ..
        } = self;
        drop(publisher);

        let handles = match persistence {
            Persistence::Detached { in_flight } => in_flight,
            Persistence::Coalescing { writer } => vec![writer],
        };
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Save task ended abnormally");
            }
        }
        info!("Board session closed");
    }
}

async fn save_logged(gateway: &dyn BoardGateway, board: &Board) {
    if let Err(e) = gateway.save(board).await {
        error!(error = %e, "Failed to save board");
    }
}

/// Saves the newest published snapshot until the publisher goes away
async fn write_latest(gateway: Arc<dyn BoardGateway>, mut snapshots: watch::Receiver<Arc<Board>>) {
    while snapshots.changed().await.is_ok() {
        let board = Arc::clone(&snapshots.borrow_and_update());
        save_logged(gateway.as_ref(), &board).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{check_invariants, BoardConfig},
        error::{Result, SyncError},
    };
    use async_trait::async_trait;
    use std::sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    };
    use tokio::sync::Notify;

    /// Gateway that records saves and can hold back saves of a given size
    #[derive(Default)]
    struct RecordingGateway {
        saved: Option<Board>,
        history: Mutex<Vec<Board>>,
        started: AtomicUsize,
        fail: AtomicBool,
        hold: Option<(usize, Arc<Notify>)>,
    }

    impl RecordingGateway {
        fn holding(card_count: usize, gate: Arc<Notify>) -> Self {
            Self {
                hold: Some((card_count, gate)),
                ..Self::default()
            }
        }

        fn history(&self) -> Vec<Board> {
            self.history.lock().unwrap().clone()
        }

        fn last_saved(&self) -> Option<Board> {
            self.history().last().cloned()
        }
    }

    #[async_trait]
    impl BoardGateway for RecordingGateway {
        async fn load(&self) -> Option<Board> {
            self.saved.clone()
        }

        async fn save(&self, board: &Board) -> Result<()> {
            self.started.fetch_add(1, Ordering::SeqCst);
            if let Some((count, gate)) = &self.hold {
                if board.cards.len() == *count {
                    gate.notified().await;
                }
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(SyncError::Store("offline".to_string()));
            }
            self.history.lock().unwrap().push(board.clone());
            Ok(())
        }
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        for _ in 0..1000 {
            if condition() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not reached");
    }

    fn add_card(column: &str, title: &str) -> Command {
        Command::AddCard {
            column_id: ColumnId::new(column),
            title: title.to_string(),
        }
    }

    #[tokio::test]
    async fn test_start_falls_back_to_default_board() {
        let gateway = Arc::new(RecordingGateway::default());

        let controller = BoardController::start(gateway, SyncConfig::default()).await;

        assert!(controller
            .snapshot()
            .same_content(&Board::from_config(&BoardConfig::default())));
    }

    #[tokio::test]
    async fn test_start_uses_saved_board() {
        let saved = engine::rename_column(
            &Board::from_config(&BoardConfig::default()),
            &ColumnId::new("col-1"),
            "Backlog",
        )
        .board;
        let gateway = Arc::new(RecordingGateway {
            saved: Some(saved.clone()),
            ..RecordingGateway::default()
        });

        let controller = BoardController::start(gateway, SyncConfig::default()).await;

        assert!(controller.snapshot().same_content(&saved));
    }

    #[tokio::test]
    async fn test_dispatch_publishes_before_returning() {
        let gateway = Arc::new(RecordingGateway::default());
        let mut controller = BoardController::start(gateway, SyncConfig::default()).await;
        let observer = controller.subscribe();

        assert!(controller.dispatch(add_card("col-1", "Write docs")));

        let seen = observer.borrow().clone();
        assert_eq!(seen.cards.len(), 1);
        assert_eq!(seen.cards[0].title, "Write docs");
        assert!(Arc::ptr_eq(&seen, &controller.snapshot()));
    }

    #[tokio::test]
    async fn test_detached_saves_every_applied_command() {
        let gateway = Arc::new(RecordingGateway::default());
        let mut controller = BoardController::start(gateway.clone(), SyncConfig::default()).await;

        controller.dispatch(add_card("col-1", "A"));
        controller.dispatch(add_card("col-1", "B"));
        controller.dispatch(Command::AddColumn);
        let last = controller.snapshot();
        controller.shutdown().await;

        let history = gateway.history();
        assert_eq!(history.len(), 3);
        assert!(history.iter().any(|board| board.same_content(&last)));
    }

    #[tokio::test]
    async fn test_noop_command_is_not_saved() {
        let gateway = Arc::new(RecordingGateway::default());
        let mut controller = BoardController::start(gateway.clone(), SyncConfig::default()).await;
        let before = controller.snapshot();

        assert!(!controller.dispatch(add_card("missing", "A")));
        assert!(!controller.dispatch(Command::DeleteCard {
            card_id: CardId::new("nope"),
        }));
        assert!(Arc::ptr_eq(&before, &controller.snapshot()));

        controller.shutdown().await;
        assert_eq!(gateway.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_titles_are_trimmed_and_blank_rejected() {
        let gateway = Arc::new(RecordingGateway::default());
        let mut controller = BoardController::start(gateway, SyncConfig::default()).await;

        assert!(!controller.dispatch(add_card("col-1", "   ")));
        assert!(controller.dispatch(add_card("col-1", "  Ship it  ")));
        let card_id = controller.snapshot().cards[0].id.clone();

        assert!(!controller.dispatch(Command::RenameCard {
            card_id: card_id.clone(),
            title: "\t".to_string(),
        }));
        assert!(!controller.dispatch(Command::RenameColumn {
            column_id: ColumnId::new("col-1"),
            title: String::new(),
        }));

        assert_eq!(controller.snapshot().cards[0].title, "Ship it");
    }

    #[tokio::test]
    async fn test_rename_to_current_title_is_not_saved() {
        let gateway = Arc::new(RecordingGateway::default());
        let mut controller = BoardController::start(gateway.clone(), SyncConfig::default()).await;
        assert!(controller.dispatch(add_card("col-1", "Ship it")));
        let card_id = controller.snapshot().cards[0].id.clone();
        let before = controller.snapshot();

        assert!(!controller.dispatch(Command::RenameColumn {
            column_id: ColumnId::new("col-1"),
            title: " To Do ".to_string(),
        }));
        assert!(!controller.dispatch(Command::RenameCard {
            card_id: card_id.clone(),
            title: "Ship it\n".to_string(),
        }));
        assert!(Arc::ptr_eq(&before, &controller.snapshot()));

        assert!(controller.dispatch(Command::RenameCard {
            card_id,
            title: "Shipped".to_string(),
        }));
        controller.shutdown().await;

        assert_eq!(gateway.started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_add_column_uses_configured_title() {
        let gateway = Arc::new(RecordingGateway::default());
        let config = SyncConfig {
            new_column_title: "Untitled".to_string(),
            ..SyncConfig::default()
        };
        let mut controller = BoardController::start(gateway, config).await;

        controller.dispatch(Command::AddColumn);

        let board = controller.snapshot();
        let added = board.columns.last().unwrap();
        assert_eq!(added.title, "Untitled");
        assert_eq!(added.order, 3);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_local_state() {
        let gateway = Arc::new(RecordingGateway::default());
        gateway.fail.store(true, Ordering::SeqCst);
        let mut controller = BoardController::start(gateway.clone(), SyncConfig::default()).await;

        assert!(controller.dispatch(add_card("col-2", "Offline edit")));
        let after = controller.snapshot();
        controller.shutdown().await;

        assert_eq!(gateway.started.load(Ordering::SeqCst), 1);
        assert!(gateway.history().is_empty());
        assert_eq!(after.cards.len(), 1);
    }

    #[tokio::test]
    async fn test_detached_saves_can_land_out_of_order() {
        let gate = Arc::new(Notify::new());
        let gateway = Arc::new(RecordingGateway::holding(1, gate.clone()));
        let mut controller = BoardController::start(gateway.clone(), SyncConfig::default()).await;

        controller.dispatch(add_card("col-1", "first"));
        controller.dispatch(add_card("col-1", "second"));
        let newest = controller.snapshot();

        let probe = gateway.clone();
        wait_until(move || probe.history().len() == 1).await;
        assert!(gateway.last_saved().unwrap().same_content(&newest));

        gate.notify_one();
        controller.shutdown().await;

        // The older snapshot finished last and is what the store keeps
        let stored = gateway.last_saved().unwrap();
        assert_eq!(stored.cards.len(), 1);
    }

    #[tokio::test]
    async fn test_coalescing_saves_only_the_latest_snapshot() {
        let gate = Arc::new(Notify::new());
        let gateway = Arc::new(RecordingGateway::holding(1, gate.clone()));
        let config = SyncConfig {
            save_policy: SavePolicy::Coalescing,
            ..SyncConfig::default()
        };
        let mut controller = BoardController::start(gateway.clone(), config).await;

        controller.dispatch(add_card("col-1", "first"));
        let probe = gateway.clone();
        wait_until(move || probe.started.load(Ordering::SeqCst) == 1).await;

        controller.dispatch(add_card("col-1", "second"));
        controller.dispatch(add_card("col-2", "third"));
        let newest = controller.snapshot();

        gate.notify_one();
        controller.shutdown().await;

        let saved_sizes: Vec<_> = gateway.history().iter().map(|b| b.cards.len()).collect();
        assert_eq!(saved_sizes, vec![1, 3]);
        assert!(gateway.last_saved().unwrap().same_content(&newest));
    }

    #[tokio::test]
    async fn test_coalescing_without_commands_saves_nothing() {
        let gateway = Arc::new(RecordingGateway::default());
        let config = SyncConfig {
            save_policy: SavePolicy::Coalescing,
            ..SyncConfig::default()
        };
        let controller = BoardController::start(gateway.clone(), config).await;

        controller.shutdown().await;

        assert_eq!(gateway.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_move_command_keeps_invariants() {
        let gateway = Arc::new(RecordingGateway::default());
        let mut controller = BoardController::start(gateway, SyncConfig::default()).await;

        for title in ["a", "b", "c"] {
            controller.dispatch(add_card("col-1", title));
        }
        controller.dispatch(add_card("col-2", "x"));
        let board = controller.snapshot();
        let b = board.cards.iter().find(|c| c.title == "b").unwrap().id.clone();
        let x = board.cards.iter().find(|c| c.title == "x").unwrap().id.clone();

        assert!(controller.dispatch(Command::MoveCard {
            card_id: b.clone(),
            target_column_id: ColumnId::new("col-2"),
            after_card_id: Some(x),
        }));
        assert!(!controller.dispatch(Command::MoveCard {
            card_id: b,
            target_column_id: ColumnId::new("col-2"),
            after_card_id: None,
        }));

        assert!(check_invariants(&controller.snapshot(), true).is_empty());
    }
}
