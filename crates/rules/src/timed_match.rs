//! Timeout-guarded regular expression matching.
//!
//! Regex evaluation cannot be cooperatively cancelled, so matches run on a
//! dedicated worker thread and the caller waits on the reply under a hard
//! wall-clock limit. A worker that misses the deadline is replaced eagerly
//! (the old thread drains on its own and exits when it observes the closed
//! channel) and the offending `(patterns, input)` pair is recorded in a
//! bounded blacklist so repeated lookups fail fast.

use std::collections::VecDeque;
use std::sync::Mutex as StdMutex;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use regex::Regex;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, warn};

const DEFAULT_MAX_BLACKLISTED: usize = 100;
const DEFAULT_TIME_LIMIT: Duration = Duration::from_millis(3000);

/// How long `shutdown` waits for the worker to acknowledge the drain
/// signal before detaching it.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// A pattern/input pair known to time out or fail.
#[derive(Debug, Clone)]
struct BlacklistEntry {
    patterns: Vec<String>,
    input: String,
}

enum Job {
    Match {
        patterns: Vec<String>,
        input: String,
        full_match: bool,
        reply: oneshot::Sender<Result<bool, String>>,
    },
    Drain(oneshot::Sender<()>),
}

struct Worker {
    tx: mpsc::Sender<Job>,
}

impl Worker {
    fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<Job>();
        thread::Builder::new()
            .name("switcher-timed-match".to_string())
            .spawn(move || worker_loop(&rx))
            .expect("spawning the timed-match worker thread should not fail");
        Self { tx }
    }
}

fn worker_loop(rx: &mpsc::Receiver<Job>) {
    while let Ok(job) = rx.recv() {
        match job {
            Job::Match {
                patterns,
                input,
                full_match,
                reply,
            } => {
                let _ = reply.send(run_match(&patterns, &input, full_match));
            }
            Job::Drain(ack) => {
                let _ = ack.send(());
                break;
            }
        }
    }
}

fn run_match(patterns: &[String], input: &str, full_match: bool) -> Result<bool, String> {
    for pattern in patterns {
        let compiled = if full_match {
            Regex::new(&format!("^(?:{pattern})$"))
        } else {
            Regex::new(pattern)
        };
        let regex = compiled.map_err(|e| e.to_string())?;
        if regex.is_match(input) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Regex matcher with a hard time limit and a blacklist of pathological
/// pattern/input pairs.
///
/// A single worker serves match jobs sequentially; callers are never
/// blocked past the configured time limit.
pub struct TimedMatch {
    worker: Mutex<Worker>,
    blacklist: StdMutex<VecDeque<BlacklistEntry>>,
    max_blacklisted: usize,
    time_limit: Duration,
}

impl Default for TimedMatch {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BLACKLISTED, DEFAULT_TIME_LIMIT)
    }
}

impl TimedMatch {
    /// Create a matcher with the given blacklist bound and time limit,
    /// spawning its worker eagerly.
    pub fn new(max_blacklisted: usize, time_limit: Duration) -> Self {
        Self {
            worker: Mutex::new(Worker::spawn()),
            blacklist: StdMutex::new(VecDeque::new()),
            max_blacklisted,
            time_limit,
        }
    }

    /// Match `input` against each pattern, bounded by the time limit.
    ///
    /// Returns `true` when any pattern matches. Timeouts, worker failures
    /// and malformed patterns all return `false` and blacklist the pair.
    pub async fn try_match(&self, patterns: &[String], input: &str, full_match: bool) -> bool {
        if self.is_blacklisted(patterns, input) {
            debug!(input, "regex match skipped, pair is blacklisted");
            return false;
        }

        let mut worker = self.worker.lock().await;
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = Job::Match {
            patterns: patterns.to_vec(),
            input: input.to_string(),
            full_match,
            reply: reply_tx,
        };

        if worker.tx.send(job).is_err() {
            // Worker is gone (drained or crashed); replace it and retry once.
            *worker = Worker::spawn();
            let (retry_tx, retry_rx) = oneshot::channel();
            let retry = Job::Match {
                patterns: patterns.to_vec(),
                input: input.to_string(),
                full_match,
                reply: retry_tx,
            };
            if worker.tx.send(retry).is_err() {
                self.add_to_blacklist(patterns, input);
                return false;
            }
            return self
                .await_reply(retry_rx, &mut worker, patterns, input)
                .await;
        }

        self.await_reply(reply_rx, &mut worker, patterns, input)
            .await
    }

    async fn await_reply(
        &self,
        reply: oneshot::Receiver<Result<bool, String>>,
        worker: &mut Worker,
        patterns: &[String],
        input: &str,
    ) -> bool {
        match tokio::time::timeout(self.time_limit, reply).await {
            Ok(Ok(Ok(matched))) => matched,
            Ok(Ok(Err(error))) => {
                warn!(error = %error, "regex match failed, blacklisting pair");
                self.add_to_blacklist(patterns, input);
                false
            }
            Ok(Err(_)) => {
                warn!("regex worker dropped the reply, blacklisting pair");
                *worker = Worker::spawn();
                self.add_to_blacklist(patterns, input);
                false
            }
            Err(_) => {
                warn!(limit = ?self.time_limit, "regex match timed out, blacklisting pair");
                // Eager replacement; the old thread finishes its job and
                // exits on the closed channel.
                *worker = Worker::spawn();
                self.add_to_blacklist(patterns, input);
                false
            }
        }
    }

    /// Returns `true` when the pair shares a pattern with a blacklisted
    /// entry and either input is a substring of the other.
    fn is_blacklisted(&self, patterns: &[String], input: &str) -> bool {
        let blacklist = self.blacklist.lock().expect("blacklist lock poisoned");
        blacklist.iter().any(|entry| {
            (entry.input.contains(input) || input.contains(&entry.input))
                && patterns.iter().any(|p| entry.patterns.contains(p))
        })
    }

    fn add_to_blacklist(&self, patterns: &[String], input: &str) {
        if self.max_blacklisted == 0 {
            return;
        }
        let mut blacklist = self.blacklist.lock().expect("blacklist lock poisoned");
        if blacklist.len() >= self.max_blacklisted {
            blacklist.pop_front();
        }
        blacklist.push_back(BlacklistEntry {
            patterns: patterns.to_vec(),
            input: input.to_string(),
        });
    }

    /// Drop every blacklist entry.
    pub fn clear_blacklist(&self) {
        self.blacklist
            .lock()
            .expect("blacklist lock poisoned")
            .clear();
    }

    /// Number of blacklisted pairs currently held.
    pub fn blacklisted(&self) -> usize {
        self.blacklist.lock().expect("blacklist lock poisoned").len()
    }

    /// Drain the worker: send the stop signal and wait briefly for the
    /// acknowledgement. A straggling worker is detached; the next match
    /// request spawns a replacement.
    pub async fn shutdown(&self) {
        let worker = self.worker.lock().await;
        let (ack_tx, ack_rx) = oneshot::channel();
        if worker.tx.send(Job::Drain(ack_tx)).is_ok()
            && tokio::time::timeout(DRAIN_TIMEOUT, ack_rx).await.is_err()
        {
            warn!("regex worker did not acknowledge drain in time");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const OK_PATTERN: &str = "[a-z]";

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    /// Valid patterns that force a full scan of a multi-megabyte input,
    /// well past a single-millisecond limit when applied as a set.
    fn slow_patterns() -> Vec<String> {
        (0..64).map(|i| format!("a{{{i}}}[0-9]{{3}}z")).collect()
    }

    #[tokio::test]
    async fn matches_simple_pattern() {
        let matcher = TimedMatch::default();
        assert!(matcher.try_match(&patterns(&[OK_PATTERN]), "a", false).await);
        assert!(!matcher.try_match(&patterns(&["[0-9]"]), "a", false).await);
        matcher.shutdown().await;
    }

    #[tokio::test]
    async fn full_match_anchors_the_pattern() {
        let matcher = TimedMatch::default();
        assert!(matcher.try_match(&patterns(&["[a-z]+"]), "abc", true).await);
        assert!(!matcher.try_match(&patterns(&["[a-z]+"]), "abc1", true).await);
        // Substring search still accepts the same input.
        assert!(matcher.try_match(&patterns(&["[a-z]+"]), "abc1", false).await);
        matcher.shutdown().await;
    }

    #[tokio::test]
    async fn any_pattern_in_the_set_may_match() {
        let matcher = TimedMatch::default();
        assert!(
            matcher
                .try_match(&patterns(&["[0-9]", "[a-z]"]), "a", false)
                .await
        );
        matcher.shutdown().await;
    }

    #[tokio::test]
    async fn malformed_pattern_is_false_and_blacklisted() {
        let matcher = TimedMatch::default();
        assert!(!matcher.try_match(&patterns(&["*invalid("]), "abc", false).await);
        assert_eq!(matcher.blacklisted(), 1);
        matcher.shutdown().await;
    }

    #[tokio::test]
    async fn timeout_blacklists_and_repeat_is_warm() {
        // A large input scanned by many patterns cannot finish within an
        // aggressive limit; the pair must be blacklisted and the repeat
        // call must short-circuit.
        let matcher = TimedMatch::new(50, Duration::from_millis(1));
        let many = slow_patterns();
        let input = "ab".repeat(1_000_000);

        assert!(!matcher.try_match(&many, &input, false).await);
        assert_eq!(matcher.blacklisted(), 1);

        let start = Instant::now();
        assert!(!matcher.try_match(&many, &input, false).await);
        assert!(start.elapsed() < Duration::from_millis(50));
        matcher.shutdown().await;
    }

    #[tokio::test]
    async fn worker_is_replaced_after_timeout() {
        let matcher = TimedMatch::new(50, Duration::from_millis(1));
        let many = slow_patterns();
        let input = "ab".repeat(1_000_000);
        assert!(!matcher.try_match(&many, &input, false).await);

        // The replacement worker serves fresh jobs normally.
        assert!(matcher.try_match(&patterns(&[OK_PATTERN]), "a", false).await);
        matcher.shutdown().await;
    }

    #[tokio::test]
    async fn blacklist_matches_on_substring_inputs() {
        let matcher = TimedMatch::default();
        assert!(!matcher.try_match(&patterns(&["*bad("]), "abcdef", false).await);

        // Same pattern, input contained in the blacklisted input.
        assert!(!matcher.try_match(&patterns(&["*bad("]), "abc", false).await);
        // Same pattern, input containing the blacklisted input.
        assert!(!matcher.try_match(&patterns(&["*bad("]), "abcdefgh", false).await);
        assert_eq!(matcher.blacklisted(), 1);
        matcher.shutdown().await;
    }

    #[tokio::test]
    async fn unrelated_pattern_is_not_blacklisted() {
        let matcher = TimedMatch::default();
        assert!(!matcher.try_match(&patterns(&["*bad("]), "abc", false).await);
        // Different pattern set, same input: evaluated normally.
        assert!(matcher.try_match(&patterns(&["[a-z]+"]), "abc", false).await);
        matcher.shutdown().await;
    }

    #[tokio::test]
    async fn blacklist_evicts_oldest_entry() {
        let matcher = TimedMatch::new(2, DEFAULT_TIME_LIMIT);
        assert!(!matcher.try_match(&patterns(&["*one("]), "first", false).await);
        assert!(!matcher.try_match(&patterns(&["*two("]), "second", false).await);
        assert!(!matcher.try_match(&patterns(&["*three("]), "third", false).await);
        assert_eq!(matcher.blacklisted(), 2);

        // The first entry was evicted, so the pair runs again (and fails
        // again, re-entering the blacklist).
        assert!(!matcher.try_match(&patterns(&["*one("]), "first", false).await);
        assert_eq!(matcher.blacklisted(), 2);
        matcher.shutdown().await;
    }

    #[tokio::test]
    async fn clear_blacklist_resets_state() {
        let matcher = TimedMatch::default();
        assert!(!matcher.try_match(&patterns(&["*bad("]), "abc", false).await);
        assert_eq!(matcher.blacklisted(), 1);
        matcher.clear_blacklist();
        assert_eq!(matcher.blacklisted(), 0);
        matcher.shutdown().await;
    }

    #[tokio::test]
    async fn worker_respawns_after_shutdown() {
        let matcher = TimedMatch::default();
        matcher.shutdown().await;
        assert!(matcher.try_match(&patterns(&[OK_PATTERN]), "a", false).await);
        matcher.shutdown().await;
    }
}
