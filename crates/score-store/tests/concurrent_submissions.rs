use common::{GameId, StoreConfig};
use score_store::{ScoreStore, submission};
use std::sync::Arc;

fn assert_sorted_descending(scores: &[f64]) {
    for pair in scores.windows(2) {
        assert!(pair[0] > pair[1], "board out of order: {pair:?}");
    }
}

#[test]
fn concurrent_submissions_to_one_game_lose_nothing() {
    let store = Arc::new(ScoreStore::default());
    let game = GameId::new("snake");
    let writers = 8_u64;
    let per_writer = 10_u64;

    std::thread::scope(|scope| {
        for writer in 0..writers {
            let store = Arc::clone(&store);
            scope.spawn(move || {
                for step in 0..per_writer {
                    let score = (writer * per_writer + step) as f64;
                    store
                        .submit(submission(format!("u{writer}"), "snake", score))
                        .expect("valid submission");
                }
            });
        }
    });

    let total = writers * per_writer;
    let board = store.leaderboard(&game, total as usize, None);
    assert_eq!(board.len(), total as usize);

    let scores = board.iter().map(|entry| entry.score).collect::<Vec<_>>();
    assert_sorted_descending(&scores);
    assert_eq!(scores.first().copied(), Some(total as f64 - 1.0));
    assert_eq!(scores.last().copied(), Some(0.0));
    assert_eq!(
        board.iter().map(|entry| entry.rank).collect::<Vec<_>>(),
        (1..=total as u32).collect::<Vec<_>>()
    );
}

#[test]
fn concurrent_submissions_beyond_bound_retain_exactly_the_top() {
    let bound = 16;
    let store = Arc::new(ScoreStore::with_config(StoreConfig {
        retain_bound: bound,
        default_limit: 10,
    }));
    let game = GameId::new("chess");
    let total = 60_u64;

    std::thread::scope(|scope| {
        for writer in 0..6_u64 {
            let store = Arc::clone(&store);
            scope.spawn(move || {
                for step in 0..10_u64 {
                    let score = (writer * 10 + step) as f64;
                    store
                        .submit(submission("u1", "chess", score))
                        .expect("eviction is not an error");
                }
            });
        }
    });

    // Regardless of interleaving, the survivors are the top `bound` scores.
    let board = store.leaderboard(&game, total as usize, None);
    assert_eq!(board.len(), bound);
    let expected = (0..total)
        .rev()
        .take(bound)
        .map(|score| score as f64)
        .collect::<Vec<_>>();
    assert_eq!(
        board.iter().map(|entry| entry.score).collect::<Vec<_>>(),
        expected
    );
}

#[test]
fn submissions_to_different_games_do_not_interfere() {
    let store = Arc::new(ScoreStore::default());
    let games = ["sudoku", "snake", "chess", "arcade"];

    std::thread::scope(|scope| {
        for game in games {
            let store = Arc::clone(&store);
            scope.spawn(move || {
                for step in 0..25_u64 {
                    store
                        .submit(submission("u1", game, step as f64))
                        .expect("valid submission");
                }
            });
        }
    });

    for game in games {
        let stats = store.game_stats(&GameId::new(game));
        assert_eq!(stats.total_games, 25);
        assert_eq!(stats.top_score, 24.0);
    }
    assert_eq!(store.tracked_games().len(), games.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn async_callers_observe_their_own_writes() {
    let store = Arc::new(ScoreStore::default());
    let game = GameId::new("arcade");
    let tasks = 32_u64;

    let mut handles = Vec::with_capacity(tasks as usize);
    for task in 0..tasks {
        let store = Arc::clone(&store);
        handles.push(tokio::task::spawn_blocking(move || {
            let score = task as f64 * 2.0;
            store
                .submit(submission(format!("u{task}"), "arcade", score))
                .expect("valid submission");
            // Submit returns only after the record is observable.
            store
                .user_best_score(&format!("u{task}"), &GameId::new("arcade"), None)
                .expect("own write visible")
                .score
        }));
    }

    for (task, handle) in handles.into_iter().enumerate() {
        let observed = handle.await.expect("task completed");
        assert_eq!(observed, task as f64 * 2.0);
    }

    let board = store.leaderboard(&game, tasks as usize, None);
    assert_eq!(board.len(), tasks as usize);
    let scores = board.iter().map(|entry| entry.score).collect::<Vec<_>>();
    assert_sorted_descending(&scores);
}
