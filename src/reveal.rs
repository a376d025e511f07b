//! Typewriter reveal of a formatted answer.
//!
//! Word `i` is released `i * interval` after the reveal starts. The timing is
//! cosmetic; ordering is not, so a single task sends the words in sequence.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// Delay between two consecutive words.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(75);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealEvent {
    Word { generation: u64, word: String },
    Done { generation: u64 },
}

/// Split markup into the pieces appended one at a time. Each piece keeps a
/// trailing space so the concatenation restores the original spacing.
pub fn words(markup: &str) -> Vec<String> {
    markup.split(' ').map(|word| format!("{word} ")).collect()
}

/// Start revealing `words` for the given request generation.
///
/// The task ends on its own once every word is sent, or early when the
/// receiving side is dropped. Abort the handle to cancel a running reveal.
pub fn spawn(
    generation: u64,
    words: Vec<String>,
    interval: Duration,
    sender: UnboundedSender<RevealEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = Instant::now();
        for (index, word) in words.into_iter().enumerate() {
            // Offsets past what the clock can represent are sent right away.
            let deadline = u32::try_from(index)
                .ok()
                .and_then(|index| interval.checked_mul(index))
                .and_then(|offset| start.checked_add(offset));
            if let Some(deadline) = deadline {
                sleep_until(deadline).await;
            }
            if sender.send(RevealEvent::Word { generation, word }).is_err() {
                return;
            }
        }
        let _ = sender.send(RevealEvent::Done { generation });
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn words_keep_spacing() {
        assert_eq!(words("a <b>b</b>"), vec!["a ", "<b>b</b> "]);
        assert_eq!(words("x  y"), vec!["x ", " ", "y "]);
        assert_eq!(words(""), vec![" "]);
    }

    #[tokio::test(start_paused = true)]
    async fn words_arrive_at_staggered_offsets() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let start = Instant::now();
        spawn(7, words("one two three"), Duration::from_millis(75), tx);

        let mut received = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                RevealEvent::Word { generation, word } => {
                    assert_eq!(generation, 7);
                    received.push((word, start.elapsed()));
                }
                RevealEvent::Done { generation } => {
                    assert_eq!(generation, 7);
                    break;
                }
            }
        }

        assert_eq!(
            received,
            vec![
                ("one ".to_string(), Duration::ZERO),
                ("two ".to_string(), Duration::from_millis(75)),
                ("three ".to_string(), Duration::from_millis(150)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn huge_interval_does_not_kill_the_task() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn(3, words("a b c"), Duration::MAX, tx);

        let mut received = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                RevealEvent::Word { word, .. } => received.push(word),
                RevealEvent::Done { generation } => {
                    assert_eq!(generation, 3);
                    break;
                }
            }
        }

        assert_eq!(received, vec!["a ", "b ", "c "]);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_reveal_stops_sending() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn(1, words("a b c d"), Duration::from_millis(75), tx);

        assert_eq!(
            rx.recv().await,
            Some(RevealEvent::Word {
                generation: 1,
                word: "a ".to_string()
            })
        );
        handle.abort();

        // The sender is dropped with the task, closing the channel.
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_receiver_ends_task() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = spawn(1, words("a b c"), Duration::from_millis(75), tx);
        drop(rx);
        handle.await.unwrap();
    }
}
