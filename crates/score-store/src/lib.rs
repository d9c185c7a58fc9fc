use common::{GameId, StoreConfig, UserId};
use parking_lot::{Mutex, RwLock};
use score_ledger::{
    GameLedger, GameStatsSummary, LeaderboardEntry, ScoreRecord, ScoreSubmission,
    SubmissionSequencer, UserGameStats,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// The only recoverable error the engine raises: a malformed submission.
/// Query paths never fail; absence is an empty result.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum ValidationError {
    #[error("submission is missing a user id")]
    MissingUserId,
    #[error("submission is missing a game id")]
    MissingGameId,
    #[error("submitted score must be a finite number")]
    NonFiniteScore,
}

type LedgerMap = HashMap<GameId, Arc<RwLock<GameLedger>>, ahash::RandomState>;

/// Concurrency-safe score store: one bounded, rank-ordered ledger per game.
///
/// Locking is per ledger; submissions and reads for different games never
/// contend. Each ledger's insert-then-truncate runs under its write lock, so
/// readers always observe a sorted ledger within the retention bound. Share
/// across callers as `Arc<ScoreStore>`.
pub struct ScoreStore {
    config: StoreConfig,
    games: RwLock<LedgerMap>,
    sequencer: Mutex<SubmissionSequencer>,
}

impl Default for ScoreStore {
    fn default() -> Self {
        Self::with_config(StoreConfig::default())
    }
}

impl ScoreStore {
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            games: RwLock::new(LedgerMap::default()),
            sequencer: Mutex::new(SubmissionSequencer::default()),
        }
    }

    pub fn config(&self) -> StoreConfig {
        self.config
    }

    /// Accepts a submission: validates it, stamps acceptance time and
    /// sequence, and splices it into the game's ledger. Tail eviction past
    /// the retention bound is a silent side effect. Once this returns, every
    /// subsequent read observes the record.
    pub fn submit(&self, submission: ScoreSubmission) -> Result<(), ValidationError> {
        if let Err(err) = validate(&submission) {
            tracing::warn!(
                error = %err,
                game = %submission.game_id,
                "rejected score submission",
            );
            return Err(err);
        }

        let (submission_seq, submitted_at_unix_ms) = {
            let mut sequencer = self.sequencer.lock();
            (sequencer.next_seq(), now_unix_ms())
        };
        let record = ScoreRecord::from_submission(submission, submitted_at_unix_ms, submission_seq);
        let game_id = record.game_id.clone();
        let user_id = record.user_id.clone();
        let score = record.score;

        let ledger = self.ledger_or_create(&game_id);
        let outcome = ledger.write().insert(record);

        tracing::debug!(
            game = %game_id,
            user = %user_id,
            score,
            submission_seq,
            outcome = ?outcome,
            "score submission accepted",
        );
        Ok(())
    }

    /// Top entries for a game, ranked 1..N within the optionally
    /// difficulty-filtered view. Unknown games and zero limits yield an empty
    /// board. Callers without a limit of their own pass
    /// `config().default_limit`.
    pub fn leaderboard(
        &self,
        game_id: &GameId,
        limit: usize,
        difficulty: Option<&str>,
    ) -> Vec<LeaderboardEntry> {
        match self.ledger(game_id) {
            Some(ledger) => ledger.read().ranked_entries(limit, difficulty),
            None => Vec::new(),
        }
    }

    /// The user's best entry for a game: highest score, earliest submission
    /// on ties, `None` when the user holds no matching slot.
    pub fn user_best_score(
        &self,
        user_id: &str,
        game_id: &GameId,
        difficulty: Option<&str>,
    ) -> Option<LeaderboardEntry> {
        self.ledger(game_id)
            .and_then(|ledger| ledger.read().best_for_user(user_id, difficulty))
    }

    /// Per-game aggregates for one user across every tracked game. Games
    /// where the user holds no slot are omitted entirely.
    pub fn user_stats(&self, user_id: &str) -> BTreeMap<GameId, UserGameStats> {
        let ledgers = self
            .games
            .read()
            .iter()
            .map(|(game_id, ledger)| (game_id.clone(), Arc::clone(ledger)))
            .collect::<Vec<_>>();

        let mut stats = BTreeMap::new();
        for (game_id, ledger) in ledgers {
            if let Some(summary) = ledger.read().user_summary(user_id) {
                stats.insert(game_id, summary);
            }
        }
        stats
    }

    /// Whole-ledger aggregates for a game, difficulty ignored. All zero for
    /// an unknown or empty game.
    pub fn game_stats(&self, game_id: &GameId) -> GameStatsSummary {
        self.ledger(game_id)
            .map(|ledger| ledger.read().stats_summary())
            .unwrap_or_default()
    }

    /// Games with a ledger, sorted. A game appears once its first submission
    /// is accepted and is never removed.
    pub fn tracked_games(&self) -> Vec<GameId> {
        let mut games = self.games.read().keys().cloned().collect::<Vec<_>>();
        games.sort_unstable();
        games
    }

    fn ledger(&self, game_id: &GameId) -> Option<Arc<RwLock<GameLedger>>> {
        self.games.read().get(game_id).map(Arc::clone)
    }

    /// Optimistic read probe, then a double-checked insert under the write
    /// lock: two racing first submissions for one game land in one ledger.
    fn ledger_or_create(&self, game_id: &GameId) -> Arc<RwLock<GameLedger>> {
        if let Some(ledger) = self.games.read().get(game_id) {
            return Arc::clone(ledger);
        }
        let mut games = self.games.write();
        Arc::clone(games.entry(game_id.clone()).or_insert_with(|| {
            Arc::new(RwLock::new(GameLedger::new(self.config.retain_bound)))
        }))
    }
}

fn validate(submission: &ScoreSubmission) -> Result<(), ValidationError> {
    if submission.user_id.trim().is_empty() {
        return Err(ValidationError::MissingUserId);
    }
    if submission.game_id.as_str().trim().is_empty() {
        return Err(ValidationError::MissingGameId);
    }
    if !submission.score.is_finite() {
        return Err(ValidationError::NonFiniteScore);
    }
    Ok(())
}

fn now_unix_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Submission builder for callers that resolve identity upstream: the store
/// trusts `user_id` as given.
pub fn submission(user_id: impl Into<UserId>, game_id: impl Into<String>, score: f64) -> ScoreSubmission {
    ScoreSubmission {
        user_id: user_id.into(),
        game_id: GameId::new(game_id),
        score,
        difficulty: None,
        elapsed_time_secs: None,
        mistakes: None,
    }
}
