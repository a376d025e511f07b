mod ui;

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    io,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tracing::debug;

use crate::chat::ChatState;
use crate::config::Config;
use crate::llm::LlmClient;
use crate::reveal::{self, RevealEvent};

/// Input mode for the TUI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Answer of a finished request, tagged with its generation.
struct Answer {
    generation: u64,
    result: Result<String>,
}

/// TUI Application state
pub struct CerebroApp {
    client: Arc<dyn LlmClient>,
    chat: ChatState,
    reveal_interval: Duration,

    answers_tx: UnboundedSender<Answer>,
    answers_rx: UnboundedReceiver<Answer>,
    words_tx: UnboundedSender<RevealEvent>,
    words_rx: UnboundedReceiver<RevealEvent>,

    request_task: Option<JoinHandle<()>>,
    reveal_task: Option<JoinHandle<()>>,
    revealing: bool,
}

impl CerebroApp {
    pub fn new(client: Arc<dyn LlmClient>, reveal_interval: Duration) -> Self {
        let (answers_tx, answers_rx) = mpsc::unbounded_channel();
        let (words_tx, words_rx) = mpsc::unbounded_channel();

        Self {
            client,
            chat: ChatState::new(),
            reveal_interval,
            answers_tx,
            answers_rx,
            words_tx,
            words_rx,
            request_task: None,
            reveal_task: None,
            revealing: false,
        }
    }

    pub fn chat(&self) -> &ChatState {
        &self.chat
    }

    pub fn model_name(&self) -> &str {
        self.client.model()
    }

    pub fn is_revealing(&self) -> bool {
        self.revealing
    }

    /// Submit the current input. The request runs in its own task so the
    /// screen keeps redrawing while waiting.
    fn submit_input(&mut self) {
        let prompt = self.chat.input.clone();
        let Some(pending) = self.chat.begin(&prompt) else {
            return;
        };
        self.stop_reveal();

        let client = Arc::clone(&self.client);
        let tx = self.answers_tx.clone();
        self.request_task = Some(tokio::spawn(async move {
            let result = client.generate(&pending.prompt).await;
            let _ = tx.send(Answer {
                generation: pending.generation,
                result,
            });
        }));
    }

    fn new_chat(&mut self) {
        if let Some(task) = self.request_task.take() {
            task.abort();
        }
        self.stop_reveal();
        self.chat.new_chat();
    }

    fn stop_reveal(&mut self) {
        if let Some(task) = self.reveal_task.take() {
            task.abort();
        }
        self.revealing = false;
    }

    /// Drain finished requests and revealed words.
    fn process_events(&mut self) {
        while let Ok(answer) = self.answers_rx.try_recv() {
            if answer.generation == self.chat.generation() {
                self.request_task = None;
            }
            if let Some(words) = self.chat.finish(answer.generation, answer.result) {
                debug!(words = words.len(), "revealing answer");
                self.revealing = true;
                self.reveal_task = Some(reveal::spawn(
                    answer.generation,
                    words,
                    self.reveal_interval,
                    self.words_tx.clone(),
                ));
            }
        }

        while let Ok(event) = self.words_rx.try_recv() {
            match event {
                RevealEvent::Word { generation, word } => {
                    self.chat.append_word(generation, &word);
                }
                RevealEvent::Done { generation } => {
                    if generation == self.chat.generation() {
                        self.reveal_task = None;
                        self.revealing = false;
                    }
                }
            }
        }
    }

    /// Apply one key press. Returns false when the app should quit.
    fn handle_key(&mut self, state: &mut TuiState, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => return false,
                KeyCode::Char('n') => self.new_chat(),
                _ => {}
            }
            return true;
        }

        match state.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('e') | KeyCode::Char('i') => {
                    state.input_mode = InputMode::Editing;
                }
                KeyCode::Char('n') => self.new_chat(),
                KeyCode::Char('q') => return false,
                _ => {}
            },
            InputMode::Editing => match key.code {
                KeyCode::Enter => self.submit_input(),
                KeyCode::Esc => {
                    state.input_mode = InputMode::Normal;
                }
                KeyCode::Char(c) => self.chat.handle_input(c),
                KeyCode::Backspace => self.chat.backspace(),
                KeyCode::Up => self.chat.previous_input(),
                KeyCode::Down => self.chat.next_input(),
                _ => {}
            },
        }
        true
    }
}

/// TUI-specific state
pub struct TuiState {
    pub input_mode: InputMode,
    pub frame: usize,
    last_tick: Instant,
}

impl Default for TuiState {
    fn default() -> Self {
        Self {
            input_mode: InputMode::Editing, // Start in editing mode
            frame: 0,
            last_tick: Instant::now(),
        }
    }
}

/// Run the TUI application
pub async fn run(client: Arc<dyn LlmClient>, config: &Config) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = CerebroApp::new(client, config.reveal_interval);
    let mut state = TuiState::default();

    // Short ticks keep the reveal smooth
    let tick_rate = Duration::from_millis(25);
    let result = run_app(&mut terminal, &mut app, &mut state, tick_rate).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

/// Main application loop
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut CerebroApp,
    state: &mut TuiState,
    tick_rate: Duration,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::render_ui(f, app, state))?;

        let timeout = tick_rate
            .checked_sub(state.last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && !app.handle_key(state, key) {
                    return Ok(());
                }
            }
        }

        // Let the request and reveal tasks run between polls
        tokio::task::yield_now().await;
        app.process_events();

        if state.last_tick.elapsed() >= tick_rate {
            state.last_tick = Instant::now();
            state.frame = state.frame.wrapping_add(1);
        }
    }
}
