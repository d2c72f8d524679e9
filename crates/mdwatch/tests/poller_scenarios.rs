//! End-to-end poller scenarios against a real file and a scripted requester.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mdwatch::api::CompletionFuture;
use mdwatch::prelude::*;
use tokio::sync::watch;

/// Requester that replays queued results and records every prompt.
#[derive(Default)]
struct FakeRequester {
    queued: Mutex<Vec<Result<String, WatchError>>>,
    prompts: Mutex<Vec<(String, u32)>>,
}

impl FakeRequester {
    fn queue(&self, result: Result<String, WatchError>) {
        self.queued.lock().unwrap().insert(0, result);
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn last_prompt(&self) -> (String, u32) {
        self.prompts.lock().unwrap().last().cloned().unwrap()
    }
}

impl Completer for FakeRequester {
    fn complete<'a>(&'a self, prompt: &'a str, max_tokens: u32) -> CompletionFuture<'a> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), max_tokens));
        let result = self
            .queued
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Ok("# Rewritten".to_string()));
        Box::pin(async move { result })
    }
}

fn write(path: &Path, chars: usize) -> String {
    let text: String = "abcdefghij".chars().cycle().take(chars).collect();
    std::fs::write(path, &text).unwrap();
    text
}

fn config_for(path: &Path) -> WatchConfig {
    WatchConfig::new(path)
        .with_poll_interval(Duration::ZERO)
        .with_instruction("Rewrite as Markdown")
}

#[tokio::test]
async fn growth_past_threshold_requests_and_advances_cursor() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "").unwrap();

    let requester = FakeRequester::default();
    let mut poller = Poller::new(&requester, config_for(&path));

    assert_eq!(poller.poll_once().await.unwrap(), PollOutcome::Unchanged);
    assert_eq!(poller.cursor().last_observed_length(), 0);

    // Empty -> 80 chars: 80 > 0 + 50.
    let content = write(&path, 80);
    let outcome = poller.poll_once().await.unwrap();
    assert_eq!(
        outcome,
        PollOutcome::Completed {
            length: 80,
            text: "# Rewritten".into()
        }
    );
    assert_eq!(poller.cursor().last_observed_length(), 80);

    let (prompt, max_tokens) = requester.last_prompt();
    assert_eq!(prompt, format!("Rewrite as Markdown:\n\n{content}\n\n---\n\n"));
    assert_eq!(max_tokens, 150);

    // 80 -> 100: delta 20, no request.
    write(&path, 100);
    assert_eq!(poller.poll_once().await.unwrap(), PollOutcome::Unchanged);
    assert_eq!(poller.cursor().last_observed_length(), 80);
    assert_eq!(requester.calls(), 1);

    // Truncated to 10: reset, no request.
    write(&path, 10);
    assert_eq!(
        poller.poll_once().await.unwrap(),
        PollOutcome::Reset { from: 80, to: 10 }
    );
    assert_eq!(poller.cursor().last_observed_length(), 10);
    assert_eq!(requester.calls(), 1);
}

#[tokio::test]
async fn exactly_threshold_growth_does_not_trigger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    write(&path, 50);

    let requester = FakeRequester::default();
    let mut poller = Poller::new(&requester, config_for(&path));
    assert_eq!(poller.poll_once().await.unwrap(), PollOutcome::Unchanged);

    write(&path, 51);
    assert!(matches!(
        poller.poll_once().await.unwrap(),
        PollOutcome::Completed { length: 51, .. }
    ));
}

#[tokio::test]
async fn unchanged_file_never_requests_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    write(&path, 120);

    let requester = FakeRequester::default();
    let mut poller = Poller::new(&requester, config_for(&path));
    poller.poll_once().await.unwrap();
    assert_eq!(requester.calls(), 1);

    for _ in 0..25 {
        assert_eq!(poller.poll_once().await.unwrap(), PollOutcome::Unchanged);
    }
    assert_eq!(requester.calls(), 1);
    assert_eq!(poller.cursor().last_observed_length(), 120);
}

#[tokio::test]
async fn rate_limit_keeps_cursor_and_retries_same_growth() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    let content = write(&path, 80);

    let requester = FakeRequester::default();
    requester.queue(Err(WatchError::RateLimited {
        retry_after: Some(Duration::from_secs(9)),
    }));
    requester.queue(Ok("## Notes".into()));

    let mut poller = Poller::new(&requester, config_for(&path))
        .with_backoff(FixedDelay(Duration::from_millis(5)));

    assert_eq!(
        poller.poll_once().await.unwrap(),
        PollOutcome::RateLimited {
            delay: Duration::from_millis(5)
        }
    );
    assert_eq!(poller.cursor().last_observed_length(), 0);

    assert_eq!(
        poller.poll_once().await.unwrap(),
        PollOutcome::Completed {
            length: 80,
            text: "## Notes".into()
        }
    );
    assert_eq!(requester.calls(), 2);
    assert!(requester.last_prompt().0.contains(&content));
}

#[tokio::test]
async fn multibyte_content_is_measured_in_characters() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    // 40 characters, 120 bytes.
    std::fs::write(&path, "日本語".repeat(13) + "語").unwrap();

    let requester = FakeRequester::default();
    let mut poller = Poller::new(&requester, config_for(&path));
    assert_eq!(poller.poll_once().await.unwrap(), PollOutcome::Unchanged);
    assert_eq!(requester.calls(), 0);
}

#[tokio::test]
async fn oversized_file_is_bounded_in_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, format!("{}{}", "old ".repeat(100), "NEWEST")).unwrap();

    let requester = FakeRequester::default();
    let config = config_for(&path).with_max_input_chars(10);
    let mut poller = Poller::new(&requester, config);
    poller.poll_once().await.unwrap();

    let (prompt, _) = requester.last_prompt();
    assert_eq!(prompt, "Rewrite as Markdown:\n\nold NEWEST\n\n---\n\n");
    // The cursor still tracks the full file length.
    assert_eq!(poller.cursor().last_observed_length(), 406);
}

#[tokio::test]
async fn run_prints_completions_and_stops_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    write(&path, 80);

    let requester = FakeRequester::default();
    let (stop_tx, stop_rx) = watch::channel(false);

    let completions = Arc::new(Mutex::new(Vec::new()));
    let polls = Arc::new(Mutex::new(0usize));
    let (c, p) = (completions.clone(), polls.clone());
    let handler = FnEventHandler::new(move |event| match event {
        PollEvent::Completion(text) => c.lock().unwrap().push(text.to_string()),
        PollEvent::Polled { .. } => {
            let mut n = p.lock().unwrap();
            *n += 1;
            if *n == 5 {
                let _ = stop_tx.send(true);
            }
        }
        _ => {}
    });

    let mut poller = Poller::new(&requester, config_for(&path))
        .with_event_handler(&handler)
        .with_backoff(FixedDelay(Duration::ZERO));

    tokio::time::timeout(Duration::from_secs(5), poller.run(stop_rx))
        .await
        .expect("run should stop after shutdown")
        .unwrap();

    assert_eq!(*completions.lock().unwrap(), vec!["# Rewritten".to_string()]);
    assert_eq!(*polls.lock().unwrap(), 5);
    assert_eq!(requester.calls(), 1);
}

#[tokio::test]
async fn run_backs_off_after_rate_limit_then_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    write(&path, 80);

    let requester = FakeRequester::default();
    requester.queue(Err(WatchError::RateLimited { retry_after: None }));
    requester.queue(Ok("# After backoff".into()));

    let (stop_tx, stop_rx) = watch::channel(false);
    let rate_limits = Arc::new(Mutex::new(0u32));
    let r = rate_limits.clone();
    let handler = FnEventHandler::new(move |event| match event {
        PollEvent::RateLimited { .. } => *r.lock().unwrap() += 1,
        PollEvent::Completion(_) => {
            let _ = stop_tx.send(true);
        }
        _ => {}
    });

    let mut poller = Poller::new(&requester, config_for(&path))
        .with_event_handler(&handler)
        .with_backoff(FixedDelay(Duration::ZERO));

    tokio::time::timeout(Duration::from_secs(5), poller.run(stop_rx))
        .await
        .expect("run should stop after completion")
        .unwrap();

    assert_eq!(*rate_limits.lock().unwrap(), 1);
    assert_eq!(requester.calls(), 2);
    assert_eq!(poller.cursor().last_observed_length(), 80);
}

#[tokio::test]
async fn run_propagates_fatal_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    write(&path, 80);

    let requester = FakeRequester::default();
    requester.queue(Err(WatchError::Transport("connection reset".into())));

    let (_stop_tx, stop_rx) = watch::channel(false);
    let mut poller = Poller::new(&requester, config_for(&path));

    let err = tokio::time::timeout(Duration::from_secs(5), poller.run(stop_rx))
        .await
        .expect("fatal error should end the loop")
        .unwrap_err();
    assert!(matches!(err, WatchError::Transport(_)));
}

#[tokio::test]
async fn run_fails_when_file_disappears() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");

    let requester = FakeRequester::default();
    let (_stop_tx, stop_rx) = watch::channel(false);
    let mut poller = Poller::new(&requester, config_for(&path));

    let err = poller.run(stop_rx).await.unwrap_err();
    assert!(matches!(err, WatchError::Io { .. }));
}
