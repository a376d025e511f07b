use anyhow::Result;
use chrono::{DateTime, Local};
use tracing::{debug, error};

use crate::llm::LlmClient;
use crate::markup;
use crate::reveal;

/// Shown in place of an answer whenever the request fails.
pub const ERROR_MESSAGE: &str = "Sorry, something went wrong.";

/// One answered prompt.
#[derive(Debug, Clone)]
pub struct Turn {
    pub prompt: String,
    pub response: String,
    pub answered_at: DateTime<Local>,
}

/// A submission waiting for its answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending {
    pub generation: u64,
    pub prompt: String,
}

/// Chat screen state
#[derive(Debug, Default)]
pub struct ChatState {
    pub input: String,
    pub recent_prompt: String,
    /// Newest first.
    pub prev_prompts: Vec<String>,
    pub show_result: bool,
    pub loading: bool,
    /// Markup revealed so far.
    pub result_data: String,
    pub turns: Vec<Turn>,
    generation: u64,
    history_index: usize,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a request for `prompt`. Blank prompts and submissions while a
    /// request is in flight are ignored and leave the state untouched.
    pub fn begin(&mut self, prompt: &str) -> Option<Pending> {
        if prompt.trim().is_empty() || self.loading {
            return None;
        }

        self.generation += 1;
        self.result_data.clear();
        self.loading = true;
        self.show_result = true;
        self.recent_prompt = prompt.to_string();
        debug!(generation = self.generation, "prompt submitted");

        Some(Pending {
            generation: self.generation,
            prompt: prompt.to_string(),
        })
    }

    /// Record the service's answer for `generation`.
    ///
    /// On success returns the words to reveal; the displayed result starts
    /// empty and grows through [`ChatState::append_word`]. On failure the
    /// result becomes [`ERROR_MESSAGE`]. Answers for a superseded generation
    /// are dropped.
    pub fn finish(&mut self, generation: u64, result: Result<String>) -> Option<Vec<String>> {
        if generation != self.generation || !self.loading {
            debug!(generation, current = self.generation, "dropping stale answer");
            return None;
        }
        self.loading = false;

        match result {
            Ok(text) => {
                let formatted = markup::format_response(&text);
                self.turns.push(Turn {
                    prompt: self.recent_prompt.clone(),
                    response: formatted.clone(),
                    answered_at: Local::now(),
                });
                self.prev_prompts.insert(0, self.recent_prompt.clone());
                self.history_index = 0;
                self.input.clear();
                Some(reveal::words(&formatted))
            }
            Err(err) => {
                error!(error = ?err, "chat request failed");
                self.result_data = ERROR_MESSAGE.to_string();
                None
            }
        }
    }

    /// Append one revealed word. Returns false for words of an older request.
    pub fn append_word(&mut self, generation: u64, word: &str) -> bool {
        if generation != self.generation {
            return false;
        }
        self.result_data.push_str(word);
        true
    }

    /// Send `prompt` to `client` and wait for the answer. Returns the words
    /// to reveal, or `None` when nothing is to be revealed.
    pub async fn submit(&mut self, client: &dyn LlmClient, prompt: &str) -> Option<Vec<String>> {
        let pending = self.begin(prompt)?;
        let result = client.generate(&pending.prompt).await;
        self.finish(pending.generation, result)
    }

    /// Back to the greeting screen. Previous prompts are kept.
    pub fn new_chat(&mut self) {
        self.generation += 1;
        self.loading = false;
        self.show_result = false;
        self.recent_prompt.clear();
        self.result_data.clear();
        self.input.clear();
        self.history_index = 0;
    }

    pub fn handle_input(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn backspace(&mut self) {
        self.input.pop();
    }

    /// Step back to an older prompt.
    pub fn previous_input(&mut self) {
        if self.history_index < self.prev_prompts.len() {
            self.input = self.prev_prompts[self.history_index].clone();
            self.history_index += 1;
        }
    }

    /// Step forward to a newer prompt, clearing the input past the newest.
    pub fn next_input(&mut self) {
        if self.history_index <= 1 {
            self.history_index = 0;
            self.input.clear();
            return;
        }

        self.history_index -= 1;
        self.input = self.prev_prompts[self.history_index - 1].clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockClient;

    fn reveal_all(state: &mut ChatState, words: Vec<String>) {
        let generation = state.generation();
        for word in words {
            assert!(state.append_word(generation, &word));
        }
    }

    fn assert_initial(state: &ChatState) {
        assert_eq!(state.input, "");
        assert_eq!(state.recent_prompt, "");
        assert!(!state.show_result);
        assert!(!state.loading);
        assert_eq!(state.result_data, "");
    }

    #[tokio::test]
    async fn blank_prompts_are_ignored() {
        let client = MockClient::answering("unused");
        let mut state = ChatState::new();
        state.input = "   ".to_string();

        for prompt in ["", "   ", "\n\t "] {
            assert!(state.submit(&client, prompt).await.is_none());
        }

        assert!(client.prompts().is_empty());
        assert_eq!(state.input, "   ");
        assert_eq!(state.generation(), 0);
        assert!(state.turns.is_empty());
        assert!(state.prev_prompts.is_empty());
        assert!(!state.show_result);
        assert!(!state.loading);
    }

    #[test]
    fn begin_sets_loading_and_show_result() {
        let mut state = ChatState::new();
        state.result_data = "old".to_string();

        let pending = state.begin("hello").unwrap();
        assert_eq!(pending.prompt, "hello");
        assert!(state.loading);
        assert!(state.show_result);
        assert_eq!(state.recent_prompt, "hello");
        assert_eq!(state.result_data, "");
    }

    #[test]
    fn second_submission_while_loading_is_ignored() {
        let mut state = ChatState::new();
        let first = state.begin("one").unwrap();
        assert!(state.begin("two").is_none());
        assert_eq!(state.recent_prompt, "one");
        assert_eq!(state.generation(), first.generation);
    }

    #[tokio::test]
    async fn successful_answer_is_formatted_and_revealed() {
        let client = MockClient::answering("Rust is **fast** and *safe*.");
        let mut state = ChatState::new();
        state.input = "What is Rust?".to_string();

        let words = state.submit(&client, "What is Rust?").await.unwrap();
        assert_eq!(client.prompts(), vec!["What is Rust?"]);
        assert!(!state.loading);
        assert!(state.show_result);
        assert_eq!(state.input, "");
        assert_eq!(state.result_data, "");

        reveal_all(&mut state, words);
        assert_eq!(state.result_data, "Rust is <b>fast</b> and </br>safe</br>. ");
        assert_eq!(state.prev_prompts, vec!["What is Rust?"]);
        assert_eq!(state.turns.len(), 1);
        assert_eq!(state.turns[0].prompt, "What is Rust?");
        assert_eq!(
            state.turns[0].response,
            "Rust is <b>fast</b> and </br>safe</br>."
        );
    }

    #[tokio::test]
    async fn failure_shows_fixed_message() {
        let client = MockClient::failing("401 unauthorized");
        let mut state = ChatState::new();
        state.input = "hi".to_string();

        assert!(state.submit(&client, "hi").await.is_none());
        assert_eq!(state.result_data, ERROR_MESSAGE);
        assert!(!state.loading);
        assert!(state.show_result);
        assert_eq!(state.recent_prompt, "hi");
        assert_eq!(state.input, "hi");
        assert!(state.prev_prompts.is_empty());
        assert!(state.turns.is_empty());
    }

    #[tokio::test]
    async fn new_chat_resets_state() {
        let client = MockClient::answering("answer");
        let mut state = ChatState::new();
        let words = state.submit(&client, "question").await.unwrap();
        reveal_all(&mut state, words);
        state.input = "draft".to_string();

        state.new_chat();
        assert_initial(&state);
        assert_eq!(state.prev_prompts, vec!["question"]);
    }

    #[test]
    fn new_chat_while_loading_drops_late_answer() {
        let mut state = ChatState::new();
        let pending = state.begin("slow").unwrap();
        state.new_chat();

        assert!(state
            .finish(pending.generation, Ok("late".to_string()))
            .is_none());
        assert_initial(&state);
        assert!(state.turns.is_empty());
    }

    #[tokio::test]
    async fn stale_reveal_words_are_ignored() {
        let client = MockClient::new(
            "mock",
            vec![Ok("first answer".to_string()), Ok("second".to_string())],
        );
        let mut state = ChatState::new();
        let old_words = state.submit(&client, "one").await.unwrap();
        let old_generation = state.generation();
        assert!(state.append_word(old_generation, &old_words[0]));

        let new_words = state.submit(&client, "two").await.unwrap();
        for word in &old_words[1..] {
            assert!(!state.append_word(old_generation, word));
        }
        reveal_all(&mut state, new_words);
        assert_eq!(state.result_data, "second ");
        assert_eq!(state.prev_prompts, vec!["two", "one"]);
    }

    #[test]
    fn loading_implies_show_result() {
        let mut state = ChatState::new();
        let check = |state: &ChatState| assert!(!state.loading || state.show_result);

        check(&state);
        let pending = state.begin("a").unwrap();
        check(&state);
        state.finish(pending.generation, Err(anyhow::anyhow!("boom")));
        check(&state);
        state.begin("b").unwrap();
        check(&state);
        state.new_chat();
        check(&state);
    }

    #[test]
    fn history_walks_previous_prompts() {
        let mut state = ChatState::new();
        state.prev_prompts = vec!["newest".to_string(), "older".to_string()];

        state.previous_input();
        assert_eq!(state.input, "newest");
        state.previous_input();
        assert_eq!(state.input, "older");
        state.previous_input();
        assert_eq!(state.input, "older");

        state.next_input();
        assert_eq!(state.input, "newest");
        state.next_input();
        assert_eq!(state.input, "");
        state.next_input();
        assert_eq!(state.input, "");
    }

    #[test]
    fn typing_edits_input() {
        let mut state = ChatState::new();
        for c in "hey".chars() {
            state.handle_input(c);
        }
        state.backspace();
        assert_eq!(state.input, "he");
    }
}
