//! Room state synchronization.
//!
//! The server is the authority; this controller polls it on a fixed cadence,
//! reconciles the local view, and exposes the derived state a frontend
//! renders (`my_marker`, `is_my_turn`, `opponent_connected`, sync status).
//!
//! Ordering guarantee: every poll response carries a server timestamp, and a
//! response that is not strictly newer than the last accepted one is
//! discarded, since overlapping in-flight fetches can resolve out of order.
//! A move response is treated as at least as authoritative as a poll of the
//! same timestamp.

use std::future::Future;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use tictactoe_core::engine::{GameSnapshot, GameStatus};
use tictactoe_core::protocol::{Marker, MoveResponse, StateResponse};
use tictactoe_core::room::RoomInfo;

use crate::api::{ApiClient, ApiError};

/// How often the server is polled while a game is running.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_millis(1_500);

/// Consecutive fetch failures tolerated before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// The slice of the server API the controller needs.
///
/// [`ApiClient`] implements it for production; tests drive the controller
/// with a scripted fake.
pub trait RoomApi: Send {
    /// Fetch the authoritative room state.
    fn fetch_state(
        &self,
        room_id: &str,
    ) -> impl Future<Output = Result<StateResponse, ApiError>> + Send;

    /// Submit a move.
    fn submit_move(
        &self,
        room_id: &str,
        position: usize,
    ) -> impl Future<Output = Result<MoveResponse, ApiError>> + Send;
}

impl RoomApi for ApiClient {
    fn fetch_state(
        &self,
        room_id: &str,
    ) -> impl Future<Output = Result<StateResponse, ApiError>> + Send {
        self.room_state(room_id)
    }

    fn submit_move(
        &self,
        room_id: &str,
        position: usize,
    ) -> impl Future<Output = Result<MoveResponse, ApiError>> + Send {
        self.make_move(room_id, position)
    }
}

/// Connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No room identifier: terminal idle state, no network activity.
    Disconnected,
    /// First fetch not yet answered.
    Connecting,
    /// Last fetch succeeded.
    Connected,
    /// A fetch or move is in flight, or a fetch failed below the retry
    /// ceiling.
    Syncing,
    /// The retry ceiling was reached; only [`RoomSyncController::refresh`]
    /// re-arms polling.
    Error,
}

/// Tunables, mirroring the frontend defaults.
#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    pub polling_interval: Duration,
    pub max_retries: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            polling_interval: DEFAULT_POLLING_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// A cloneable snapshot of everything a frontend renders.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncView {
    pub game: GameSnapshot,
    pub room: Option<RoomInfo>,
    pub status: SyncStatus,
    pub error: Option<String>,
    pub my_marker: Option<Marker>,
    pub is_my_turn: bool,
    pub opponent_connected: bool,
}

/// Client-side synchronization controller for one room view.
pub struct RoomSyncController<A: RoomApi> {
    api: A,
    room_id: Option<String>,
    player_id: String,
    config: SyncConfig,
    game: GameSnapshot,
    room: Option<RoomInfo>,
    status: SyncStatus,
    error: Option<String>,
    last_timestamp: i64,
    retry_count: u32,
}

impl<A: RoomApi> RoomSyncController<A> {
    /// With no `room_id` the controller idles in
    /// [`SyncStatus::Disconnected`] and never touches the network.
    pub fn new(api: A, room_id: Option<String>, player_id: &str) -> Self {
        Self::with_config(api, room_id, player_id, SyncConfig::default())
    }

    pub fn with_config(
        api: A,
        room_id: Option<String>,
        player_id: &str,
        config: SyncConfig,
    ) -> Self {
        let status = if room_id.is_some() {
            SyncStatus::Connecting
        } else {
            SyncStatus::Disconnected
        };
        Self {
            api,
            room_id,
            player_id: player_id.to_string(),
            config,
            game: GameSnapshot::initial(),
            room: None,
            status,
            error: None,
            last_timestamp: 0,
            retry_count: 0,
        }
    }

    /// One poll step: fetch the room state and reconcile.
    ///
    /// Success resets the failure counter and lands in
    /// [`SyncStatus::Connected`] even when the payload was stale (the
    /// connection worked; the state just wasn't newer). Failures count
    /// toward the retry ceiling, with the polling cadence as backoff.
    pub async fn sync_once(&mut self) -> bool {
        let Some(room_id) = self.room_id.clone() else {
            return false;
        };

        match self.api.fetch_state(&room_id).await {
            Ok(response) => {
                self.accept(response.state, Some(response.room), response.timestamp, false);
                self.status = SyncStatus::Connected;
                self.error = None;
                self.retry_count = 0;
                true
            }
            Err(_) => {
                self.retry_count += 1;
                if self.retry_count >= self.config.max_retries {
                    self.status = SyncStatus::Error;
                    self.error = Some("Connection lost. Please check your network.".to_string());
                } else {
                    self.status = SyncStatus::Syncing;
                }
                false
            }
        }
    }

    /// Manual retry: the only way out of [`SyncStatus::Error`].
    pub async fn refresh(&mut self) -> bool {
        if self.room_id.is_none() {
            return false;
        }
        self.status = SyncStatus::Syncing;
        // A deliberate refresh starts a fresh failure budget.
        self.retry_count = 0;
        self.sync_once().await
    }

    /// Submit a move at `position`.
    ///
    /// Short-circuits without a network call when it is not locally believed
    /// to be the caller's turn. This is an optimistic guard only; the server
    /// re-validates turn ownership, occupancy and membership.
    pub async fn make_move(&mut self, position: usize) -> bool {
        let Some(room_id) = self.room_id.clone() else {
            return false;
        };
        if !self.is_my_turn() {
            return false;
        }

        self.status = SyncStatus::Syncing;
        match self.api.submit_move(&room_id, position).await {
            Ok(response) => {
                let accepted = response.success;
                self.accept(response.state, response.room, response.timestamp, true);
                self.status = SyncStatus::Connected;
                self.retry_count = 0;
                self.error = if accepted {
                    None
                } else {
                    Some(response.message)
                };
                accepted
            }
            Err(err) if err.is_rejection() => {
                // The server said no (not our turn after all, room gone...).
                // The next poll will reconcile; this is not a network fault.
                self.error = Some(err.to_string());
                self.status = SyncStatus::Connected;
                false
            }
            Err(_) => {
                self.error = Some("Failed to make move. Please try again.".to_string());
                self.status = SyncStatus::Error;
                false
            }
        }
    }

    /// Whether the polling timer should fire: a room is set, polling has not
    /// halted on error, and the locally-known game is still running
    /// (polling stops automatically once the game is over).
    pub fn should_poll(&self) -> bool {
        self.room_id.is_some()
            && !matches!(self.status, SyncStatus::Error | SyncStatus::Disconnected)
            && self.game.status == GameStatus::Playing
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn game_state(&self) -> &GameSnapshot {
        &self.game
    }

    pub fn room_info(&self) -> Option<&RoomInfo> {
        self.room.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_timestamp(&self) -> i64 {
        self.last_timestamp
    }

    /// Which seat, if any, this session holds.
    pub fn my_marker(&self) -> Option<Marker> {
        let room = self.room.as_ref()?;
        if room
            .player_x
            .as_ref()
            .is_some_and(|slot| slot.player_id == self.player_id)
        {
            return Some(Marker::X);
        }
        if room
            .player_o
            .as_ref()
            .is_some_and(|slot| slot.player_id == self.player_id)
        {
            return Some(Marker::O);
        }
        None
    }

    pub fn is_my_turn(&self) -> bool {
        self.game.status == GameStatus::Playing
            && self
                .my_marker()
                .is_some_and(|marker| marker == self.game.current_player)
    }

    /// Connectivity of whichever seat is not ours. Spectators (no seat) get
    /// `false`.
    pub fn opponent_connected(&self) -> bool {
        let Some(room) = self.room.as_ref() else {
            return false;
        };
        let opponent = match self.my_marker() {
            Some(Marker::X) => room.player_o.as_ref(),
            Some(Marker::O) => room.player_x.as_ref(),
            None => return false,
        };
        opponent.is_some_and(|slot| slot.connected)
    }

    /// Snapshot for the frontend.
    pub fn view(&self) -> SyncView {
        SyncView {
            game: self.game.clone(),
            room: self.room.clone(),
            status: self.status,
            error: self.error.clone(),
            my_marker: self.my_marker(),
            is_my_turn: self.is_my_turn(),
            opponent_connected: self.opponent_connected(),
        }
    }

    /// Adopt a server payload if it is fresh enough. `from_move` responses
    /// win ties; poll responses must be strictly newer. Move responses may
    /// omit the room payload; the last-known room info is kept then.
    fn accept(
        &mut self,
        state: GameSnapshot,
        room: Option<RoomInfo>,
        timestamp: i64,
        from_move: bool,
    ) {
        let fresh = if from_move {
            timestamp >= self.last_timestamp
        } else {
            timestamp > self.last_timestamp
        };
        if !fresh {
            return;
        }
        self.last_timestamp = timestamp;
        self.game = state;
        if let Some(room) = room {
            self.room = Some(room);
        }
    }
}

// ---------------------------------------------------------------------------
// Background polling task
// ---------------------------------------------------------------------------

/// Commands a frontend can send to a spawned controller.
#[derive(Debug, Clone)]
pub enum SyncCommand {
    MakeMove(usize),
    Refresh,
    Stop,
}

/// Handle to a controller running on its own task.
///
/// Dropping the handle (or sending [`SyncCommand::Stop`]) tears the polling
/// loop down; a result that arrives for a torn-down controller is simply
/// dropped.
pub struct SyncHandle {
    /// Latest [`SyncView`]; `changed().await` to react to updates.
    pub updates: watch::Receiver<SyncView>,
    commands: mpsc::UnboundedSender<SyncCommand>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    pub fn make_move(&self, position: usize) {
        let _ = self.commands.send(SyncCommand::MakeMove(position));
    }

    pub fn refresh(&self) {
        let _ = self.commands.send(SyncCommand::Refresh);
    }

    pub fn stop(&self) {
        let _ = self.commands.send(SyncCommand::Stop);
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Run a controller on a tokio task: one polling timer per room view,
/// commands and view updates over channels.
pub fn spawn<A>(mut controller: RoomSyncController<A>) -> SyncHandle
where
    A: RoomApi + 'static,
{
    let (view_tx, view_rx) = watch::channel(controller.view());
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(controller.config.polling_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            let command = if controller.should_poll() {
                tokio::select! {
                    // The first tick completes immediately and doubles as
                    // the initial fetch.
                    _ = ticker.tick() => {
                        controller.sync_once().await;
                        let _ = view_tx.send(controller.view());
                        continue;
                    }
                    command = cmd_rx.recv() => command,
                }
            } else {
                // Game over, halted on error, or no room: the timer stays
                // torn down until the frontend asks for something.
                cmd_rx.recv().await
            };

            match command {
                Some(SyncCommand::MakeMove(position)) => {
                    controller.make_move(position).await;
                    let _ = view_tx.send(controller.view());
                }
                Some(SyncCommand::Refresh) => {
                    ticker.reset();
                    controller.refresh().await;
                    let _ = view_tx.send(controller.view());
                }
                Some(SyncCommand::Stop) | None => break,
            }
        }
    });

    SyncHandle {
        updates: view_rx,
        commands: cmd_tx,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tictactoe_core::protocol::ErrorCode;
    use tictactoe_core::room::{PlayerSlot, RoomStatus};

    const ROOM: &str = "room-abc123";

    /// Scripted API: pops one pre-baked result per call.
    #[derive(Default)]
    struct FakeApi {
        states: Mutex<VecDeque<Result<StateResponse, ApiError>>>,
        moves: Mutex<VecDeque<Result<MoveResponse, ApiError>>>,
        move_calls: AtomicUsize,
    }

    impl FakeApi {
        fn push_state(&self, result: Result<StateResponse, ApiError>) {
            self.states.lock().unwrap().push_back(result);
        }

        fn push_move(&self, result: Result<MoveResponse, ApiError>) {
            self.moves.lock().unwrap().push_back(result);
        }

        fn move_calls(&self) -> usize {
            self.move_calls.load(Ordering::SeqCst)
        }
    }

    impl RoomApi for &FakeApi {
        fn fetch_state(
            &self,
            _room_id: &str,
        ) -> impl Future<Output = Result<StateResponse, ApiError>> + Send {
            let next = self
                .states
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Transport("script exhausted".to_string())));
            async move { next }
        }

        fn submit_move(
            &self,
            _room_id: &str,
            _position: usize,
        ) -> impl Future<Output = Result<MoveResponse, ApiError>> + Send {
            self.move_calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .moves
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Transport("script exhausted".to_string())));
            async move { next }
        }
    }

    fn slot(player_id: &str, marker: Marker, connected: bool) -> PlayerSlot {
        let mut slot = PlayerSlot::new(player_id, player_id, marker, 0);
        slot.connected = connected;
        slot
    }

    fn room_info(status: RoomStatus) -> RoomInfo {
        RoomInfo {
            room_id: ROOM.to_string(),
            status,
            player_x: Some(slot("alice", Marker::X, true)),
            player_o: Some(slot("bob", Marker::O, true)),
            created_at: 0,
            last_activity: 0,
        }
    }

    fn state_response(timestamp: i64, mark_at: Option<usize>) -> StateResponse {
        let mut state = GameSnapshot::initial();
        if let Some(position) = mark_at {
            state.board[position] = Some(Marker::X);
            state.current_player = Marker::O;
        }
        StateResponse {
            success: true,
            state,
            room: room_info(RoomStatus::Playing),
            timestamp,
        }
    }

    fn transport_error() -> ApiError {
        ApiError::Transport("connection refused".to_string())
    }

    fn controller<'a>(api: &'a FakeApi, player: &str) -> RoomSyncController<&'a FakeApi> {
        RoomSyncController::with_config(
            api,
            Some(ROOM.to_string()),
            player,
            SyncConfig {
                polling_interval: Duration::from_millis(10),
                max_retries: 3,
            },
        )
    }

    #[tokio::test]
    async fn no_room_id_means_disconnected() {
        let api = FakeApi::default();
        let mut ctrl = RoomSyncController::new(&api, None, "alice");
        assert_eq!(ctrl.status(), SyncStatus::Disconnected);
        assert!(!ctrl.should_poll());
        assert!(!ctrl.sync_once().await);
        assert!(!ctrl.make_move(0).await);
        assert_eq!(api.move_calls(), 0);
    }

    #[tokio::test]
    async fn successful_fetch_connects_and_derives_state() {
        let api = FakeApi::default();
        api.push_state(Ok(state_response(100, None)));

        let mut ctrl = controller(&api, "alice");
        assert_eq!(ctrl.status(), SyncStatus::Connecting);
        assert!(ctrl.sync_once().await);

        assert_eq!(ctrl.status(), SyncStatus::Connected);
        assert_eq!(ctrl.last_timestamp(), 100);
        assert_eq!(ctrl.my_marker(), Some(Marker::X));
        assert!(ctrl.is_my_turn());
        assert!(ctrl.opponent_connected());
        assert!(ctrl.should_poll());
    }

    #[tokio::test]
    async fn stale_response_is_discarded() {
        let api = FakeApi::default();
        api.push_state(Ok(state_response(100, Some(0))));
        // An overlapping in-flight fetch resolving late, with older state.
        api.push_state(Ok(state_response(50, None)));

        let mut ctrl = controller(&api, "alice");
        ctrl.sync_once().await;
        ctrl.sync_once().await;

        // The stale payload did not roll the board back.
        assert_eq!(ctrl.game_state().board[0], Some(Marker::X));
        assert_eq!(ctrl.last_timestamp(), 100);
        // But the fetch itself succeeded, so the connection stays healthy.
        assert_eq!(ctrl.status(), SyncStatus::Connected);
    }

    #[tokio::test]
    async fn equal_timestamp_poll_is_also_discarded() {
        let api = FakeApi::default();
        api.push_state(Ok(state_response(100, Some(0))));
        api.push_state(Ok(state_response(100, None)));

        let mut ctrl = controller(&api, "alice");
        ctrl.sync_once().await;
        ctrl.sync_once().await;
        assert_eq!(ctrl.game_state().board[0], Some(Marker::X));
    }

    #[tokio::test]
    async fn retry_ceiling_halts_polling_until_refresh() {
        let api = FakeApi::default();
        for _ in 0..3 {
            api.push_state(Err(transport_error()));
        }

        let mut ctrl = controller(&api, "alice");
        assert!(!ctrl.sync_once().await);
        assert_eq!(ctrl.status(), SyncStatus::Syncing);
        assert!(ctrl.should_poll());

        assert!(!ctrl.sync_once().await);
        assert!(!ctrl.sync_once().await);
        assert_eq!(ctrl.status(), SyncStatus::Error);
        assert!(ctrl.error().unwrap().contains("Connection lost"));
        assert!(!ctrl.should_poll());

        // Manual refresh is the only way back.
        api.push_state(Ok(state_response(10, None)));
        assert!(ctrl.refresh().await);
        assert_eq!(ctrl.status(), SyncStatus::Connected);
        assert!(ctrl.error().is_none());
        assert!(ctrl.should_poll());
    }

    #[tokio::test]
    async fn success_resets_the_failure_counter() {
        let api = FakeApi::default();
        api.push_state(Err(transport_error()));
        api.push_state(Err(transport_error()));
        api.push_state(Ok(state_response(10, None)));
        api.push_state(Err(transport_error()));
        api.push_state(Err(transport_error()));

        let mut ctrl = controller(&api, "alice");
        ctrl.sync_once().await;
        ctrl.sync_once().await;
        ctrl.sync_once().await; // success clears the two failures
        ctrl.sync_once().await;
        ctrl.sync_once().await;
        // Two fresh failures stay below the ceiling of three.
        assert_eq!(ctrl.status(), SyncStatus::Syncing);
    }

    #[tokio::test]
    async fn off_turn_move_never_hits_the_network() {
        let api = FakeApi::default();
        api.push_state(Ok(state_response(100, None)));

        // Bob holds O; X is on turn.
        let mut ctrl = controller(&api, "bob");
        ctrl.sync_once().await;
        assert!(!ctrl.is_my_turn());

        assert!(!ctrl.make_move(4).await);
        assert_eq!(api.move_calls(), 0);
    }

    #[tokio::test]
    async fn accepted_move_applies_equal_timestamp_state() {
        let api = FakeApi::default();
        api.push_state(Ok(state_response(100, None)));
        let moved = state_response(100, Some(4));
        api.push_move(Ok(MoveResponse {
            success: true,
            message: "Player O's turn".to_string(),
            state: moved.state,
            room: Some(moved.room),
            timestamp: moved.timestamp,
        }));

        let mut ctrl = controller(&api, "alice");
        ctrl.sync_once().await;
        assert!(ctrl.make_move(4).await);
        assert_eq!(api.move_calls(), 1);

        // Same timestamp as the poll, but move responses win ties.
        assert_eq!(ctrl.game_state().board[4], Some(Marker::X));
        assert!(!ctrl.is_my_turn());
        assert_eq!(ctrl.status(), SyncStatus::Connected);
    }

    #[tokio::test]
    async fn move_response_without_room_keeps_known_seats() {
        let api = FakeApi::default();
        api.push_state(Ok(state_response(100, None)));
        let moved = state_response(101, Some(4));
        api.push_move(Ok(MoveResponse {
            success: true,
            message: "Player O's turn".to_string(),
            state: moved.state,
            room: None,
            timestamp: 101,
        }));

        let mut ctrl = controller(&api, "alice");
        ctrl.sync_once().await;
        assert!(ctrl.make_move(4).await);

        // The board advanced, and the seat assignments from the last poll
        // survive the room-less payload.
        assert_eq!(ctrl.game_state().board[4], Some(Marker::X));
        assert_eq!(ctrl.my_marker(), Some(Marker::X));
        assert!(ctrl.room_info().is_some());
        assert_eq!(ctrl.last_timestamp(), 101);
    }

    #[tokio::test]
    async fn rejected_move_keeps_connection_and_reports_error() {
        let api = FakeApi::default();
        api.push_state(Ok(state_response(100, None)));
        api.push_move(Err(ApiError::Api {
            code: ErrorCode::NotYourTurn,
            message: "Not your turn".to_string(),
            status: 403,
        }));

        let mut ctrl = controller(&api, "alice");
        ctrl.sync_once().await;
        assert!(!ctrl.make_move(0).await);
        assert_eq!(ctrl.status(), SyncStatus::Connected);
        assert!(ctrl.error().unwrap().contains("Not your turn"));
    }

    #[tokio::test]
    async fn failed_move_transport_surfaces_error_state() {
        let api = FakeApi::default();
        api.push_state(Ok(state_response(100, None)));
        api.push_move(Err(transport_error()));

        let mut ctrl = controller(&api, "alice");
        ctrl.sync_once().await;
        assert!(!ctrl.make_move(0).await);
        assert_eq!(ctrl.status(), SyncStatus::Error);
        assert!(ctrl.error().unwrap().contains("Failed to make move"));
    }

    #[tokio::test]
    async fn polling_stops_once_the_game_is_over() {
        let api = FakeApi::default();
        let mut finished = state_response(100, Some(0));
        finished.state.status = GameStatus::Won;
        finished.state.winner = Some(Marker::X);
        api.push_state(Ok(finished));

        let mut ctrl = controller(&api, "alice");
        ctrl.sync_once().await;
        assert_eq!(ctrl.status(), SyncStatus::Connected);
        assert!(!ctrl.should_poll());
        assert!(!ctrl.is_my_turn());
    }

    #[tokio::test]
    async fn spectators_derive_nothing() {
        let api = FakeApi::default();
        api.push_state(Ok(state_response(100, None)));

        let mut ctrl = controller(&api, "carol");
        ctrl.sync_once().await;
        assert_eq!(ctrl.my_marker(), None);
        assert!(!ctrl.is_my_turn());
        assert!(!ctrl.opponent_connected());
    }

    #[tokio::test]
    async fn spawned_task_fetches_and_takes_commands() {
        // `spawn` needs an owned api; leaking the fake gives it 'static.
        let api: &'static FakeApi = Box::leak(Box::new(FakeApi::default()));
        api.push_state(Ok(state_response(100, None)));
        let moved = state_response(101, Some(4));
        api.push_move(Ok(MoveResponse {
            success: true,
            message: "Player O's turn".to_string(),
            state: moved.state,
            room: Some(moved.room),
            timestamp: moved.timestamp,
        }));

        let ctrl = RoomSyncController::with_config(
            api,
            Some(ROOM.to_string()),
            "alice",
            SyncConfig {
                // Long enough that only the immediate first tick fires.
                polling_interval: Duration::from_secs(60),
                max_retries: 3,
            },
        );
        let handle = spawn(ctrl);
        let mut updates = handle.updates.clone();

        let view = updates
            .wait_for(|view| view.status == SyncStatus::Connected)
            .await
            .unwrap()
            .clone();
        assert_eq!(view.my_marker, Some(Marker::X));
        assert!(view.is_my_turn);

        handle.make_move(4);
        let view = updates
            .wait_for(|view| view.game.board[4].is_some())
            .await
            .unwrap()
            .clone();
        assert_eq!(view.game.board[4], Some(Marker::X));
        assert_eq!(api.move_calls(), 1);

        handle.stop();
    }

    #[tokio::test]
    async fn view_mirrors_derived_state() {
        let api = FakeApi::default();
        api.push_state(Ok(state_response(100, None)));

        let mut ctrl = controller(&api, "alice");
        ctrl.sync_once().await;
        let view = ctrl.view();
        assert_eq!(view.status, SyncStatus::Connected);
        assert_eq!(view.my_marker, Some(Marker::X));
        assert!(view.is_my_turn);
        assert!(view.opponent_connected);
        assert_eq!(view.room.unwrap().room_id, ROOM);
    }
}
