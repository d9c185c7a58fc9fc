use common::{GameId, UserId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Caller-supplied result of one finished game, before the store stamps it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub user_id: UserId,
    pub game_id: GameId,
    pub score: f64,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub elapsed_time_secs: Option<f64>,
    #[serde(default)]
    pub mistakes: Option<u32>,
}

/// An accepted submission. Immutable once inserted; corrections are new
/// submissions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub user_id: UserId,
    pub game_id: GameId,
    pub score: f64,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub elapsed_time_secs: Option<f64>,
    #[serde(default)]
    pub mistakes: Option<u32>,
    pub submitted_at_unix_ms: i64,
    pub submission_seq: u64,
}

impl ScoreRecord {
    pub fn from_submission(
        submission: ScoreSubmission,
        submitted_at_unix_ms: i64,
        submission_seq: u64,
    ) -> Self {
        Self {
            user_id: submission.user_id,
            game_id: submission.game_id,
            score: submission.score,
            difficulty: submission.difficulty,
            elapsed_time_secs: submission.elapsed_time_secs,
            mistakes: submission.mistakes,
            submitted_at_unix_ms,
            submission_seq,
        }
    }

    fn matches_difficulty(&self, difficulty: Option<&str>) -> bool {
        match difficulty {
            Some(wanted) => self.difficulty.as_deref() == Some(wanted),
            None => true,
        }
    }
}

/// Presentation projection of a record. Rank is 1-based within the queried
/// (possibly filtered) view, never a global property of the record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: UserId,
    pub game_id: GameId,
    pub score: f64,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub elapsed_time_secs: Option<f64>,
    pub submitted_at_unix_ms: i64,
}

impl LeaderboardEntry {
    fn project(record: &ScoreRecord, rank: u32) -> Self {
        Self {
            rank,
            user_id: record.user_id.clone(),
            game_id: record.game_id.clone(),
            score: record.score,
            difficulty: record.difficulty.clone(),
            elapsed_time_secs: record.elapsed_time_secs,
            submitted_at_unix_ms: record.submitted_at_unix_ms,
        }
    }
}

/// Allocates the per-store submission sequence backing the tie-break rule.
/// Resumable so a persistence collaborator can replay records without
/// re-issuing sequence numbers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubmissionSequencer {
    next_seq: u64,
}

impl Default for SubmissionSequencer {
    fn default() -> Self {
        Self { next_seq: 1 }
    }
}

impl SubmissionSequencer {
    pub fn from_latest_seq(latest_seq: Option<u64>) -> Self {
        let next_seq = latest_seq.unwrap_or(0).saturating_add(1).max(1);
        Self { next_seq }
    }

    pub fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        seq
    }
}

/// Ranking order: score descending, earlier submission first on equal scores.
/// Total for every record a ledger can hold (scores are validated finite
/// before insertion, sequence numbers are unique).
pub fn cmp_ranking(a: &ScoreRecord, b: &ScoreRecord) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.submission_seq.cmp(&b.submission_seq))
}

/// What happened to a record handed to [`GameLedger::insert`]. Eviction and
/// discard are size-bounding side effects, not errors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InsertOutcome {
    Inserted,
    /// Inserted, and the previous lowest-ranked record fell off the tail.
    EvictedTail,
    /// The ledger was full and the record ranked below every retained entry.
    Discarded,
}

impl InsertOutcome {
    pub fn retained(self) -> bool {
        !matches!(self, InsertOutcome::Discarded)
    }
}

/// The bounded, rank-ordered collection of score records for one game.
///
/// Records are kept sorted by [`cmp_ranking`] at all times; insertion is a
/// binary-search splice followed by a truncate to the bound, so readers never
/// depend on a separate sort pass.
#[derive(Clone, Debug, PartialEq)]
pub struct GameLedger {
    bound: usize,
    records: Vec<ScoreRecord>,
}

impl GameLedger {
    pub fn new(bound: usize) -> Self {
        Self {
            bound: bound.max(1),
            records: Vec::new(),
        }
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Retained records in ranking order.
    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    pub fn insert(&mut self, record: ScoreRecord) -> InsertOutcome {
        let position = self
            .records
            .partition_point(|existing| cmp_ranking(existing, &record).is_lt());
        if position >= self.bound {
            return InsertOutcome::Discarded;
        }
        self.records.insert(position, record);
        if self.records.len() > self.bound {
            self.records.truncate(self.bound);
            return InsertOutcome::EvictedTail;
        }
        InsertOutcome::Inserted
    }

    /// Top entries of the (optionally difficulty-filtered) view, ranked 1..N
    /// within that view. A zero limit yields nothing; a limit beyond the
    /// filtered size yields everything available.
    pub fn ranked_entries(&self, limit: usize, difficulty: Option<&str>) -> Vec<LeaderboardEntry> {
        self.records
            .iter()
            .filter(|record| record.matches_difficulty(difficulty))
            .take(limit)
            .enumerate()
            .map(|(index, record)| LeaderboardEntry::project(record, index as u32 + 1))
            .collect()
    }

    /// The user's highest-scoring record (earliest submission wins ties),
    /// ranked against the full difficulty-filtered view of this ledger.
    pub fn best_for_user(&self, user_id: &str, difficulty: Option<&str>) -> Option<LeaderboardEntry> {
        self.records
            .iter()
            .filter(|record| record.matches_difficulty(difficulty))
            .enumerate()
            .find(|(_, record)| record.user_id == user_id)
            .map(|(index, record)| LeaderboardEntry::project(record, index as u32 + 1))
    }

    /// Whole-ledger aggregates, difficulty ignored. All zero for an empty
    /// ledger.
    pub fn stats_summary(&self) -> GameStatsSummary {
        let Some(top) = self.records.first() else {
            return GameStatsSummary::default();
        };
        let total_games = self.records.len() as u64;
        let sum = self.records.iter().map(|record| record.score).sum::<f64>();
        GameStatsSummary {
            total_games,
            top_score: top.score,
            average_score: round_half_up(sum / total_games as f64),
        }
    }

    /// Aggregates over one user's records, or `None` when the user holds no
    /// slot in this ledger.
    pub fn user_summary(&self, user_id: &str) -> Option<UserGameStats> {
        let mut total_games = 0_u64;
        let mut best_score = f64::MIN;
        let mut sum = 0.0_f64;
        for record in self.records.iter().filter(|record| record.user_id == user_id) {
            total_games += 1;
            best_score = best_score.max(record.score);
            sum += record.score;
        }
        if total_games == 0 {
            return None;
        }
        Some(UserGameStats {
            total_games,
            best_score,
            average_score: round_half_up(sum / total_games as f64),
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameStatsSummary {
    pub total_games: u64,
    pub top_score: f64,
    pub average_score: i64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserGameStats {
    pub total_games: u64,
    pub best_score: f64,
    pub average_score: i64,
}

/// Round half-up to the nearest integer: exactly `floor(x + 0.5)`.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
