mod logging;

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use polisense_rag::{
    Config, DocumentIndex, GroqClient, LlmClient, Phase, PdfSource, RagError, Role, Session,
    WELCOME_MESSAGE, build_index, describe_employee, format_policy_context,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Margin};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const TITLE: &str = "PoliSense AI - Intelligent Employee Policy Assistant";
const CAPTION: &str = "RAG-based assistant using company policy PDF";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Arc::new(Config::from_env());
    let _log_guard = logging::init_logging(&cfg.log_dir);
    cfg.validate()?;

    println!("Indexing policy documents from {} ...", cfg.default_pdf_path.display());
    let boot_cfg = Arc::clone(&cfg);
    // Blocking HTTP clients must be built and used off the async workers.
    let (index, llm) = tokio::task::spawn_blocking(move || -> Result<_, RagError> {
        let llm: Arc<dyn LlmClient> = Arc::new(GroqClient::from_config(&boot_cfg)?);
        let source = PdfSource::Path(boot_cfg.default_pdf_path.clone());
        let index = build_index(&boot_cfg, &source)?;
        Ok((index, llm))
    })
    .await??;

    let session = Session::new(
        index,
        llm,
        cfg.employee.clone(),
        cfg.generation(),
        cfg.top_k,
    );
    info!(source = session.source_name(), "session started");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(cfg, session);
    let res = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("session ended");
    res?;
    Ok(())
}

struct App {
    input: String,
    cursor: usize,
    session: Session,
    cfg: Arc<Config>,
    input_mode: InputMode,
    output_focus: OutputFocus,
    in_flight: Option<InFlight>,
    last_context: Option<String>,
    status: Option<String>,
    chat_scroll: usize,
    chat_content_len: usize,
    chat_view_height: usize,
    chat_auto_scroll: bool,
    side_scroll: usize,
    side_content_len: usize,
    side_view_height: usize,
    spinner_idx: usize,
}

/// The turn currently being answered, shown before it is committed to the session.
struct InFlight {
    user_text: String,
    response: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InputMode {
    Chat,
    Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFocus {
    Chat,
    Sidebar,
}

enum Response {
    Context(String),
    Fragment(String),
    Finished,
    Failed(RagError),
    Indexed(Result<DocumentIndex, RagError>),
}

impl App {
    fn new(cfg: Arc<Config>, session: Session) -> Self {
        Self {
            input: String::new(),
            cursor: 0,
            session,
            cfg,
            input_mode: InputMode::Chat,
            output_focus: OutputFocus::Chat,
            in_flight: None,
            last_context: None,
            status: None,
            chat_scroll: 0,
            chat_content_len: 0,
            chat_view_height: 0,
            chat_auto_scroll: false,
            side_scroll: 0,
            side_content_len: 0,
            side_view_height: 0,
            spinner_idx: 0,
        }
    }

    fn is_busy(&self) -> bool {
        self.session.phase() != Phase::Idle
    }

    fn insert_char(&mut self, c: char) {
        let at = byte_offset(&self.input, self.cursor);
        self.input.insert(at, c);
        self.cursor += 1;
    }

    fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = byte_offset(&self.input, self.cursor);
        self.input.remove(at);
    }

    fn move_left(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    fn move_right(&mut self) {
        if self.cursor < self.input.chars().count() {
            self.cursor += 1;
        }
    }

    fn submit(&mut self, tx: mpsc::UnboundedSender<Response>) {
        if self.input.trim().is_empty() || self.is_busy() {
            return;
        }

        let text = self.input.trim().to_string();
        self.input.clear();
        self.cursor = 0;

        match self.input_mode {
            InputMode::Chat => self.ask(text, tx),
            InputMode::Command => self.run_command(&text, tx),
        }
    }

    fn ask(&mut self, text: String, tx: mpsc::UnboundedSender<Response>) {
        let request = match self.session.begin_turn(&text) {
            Ok(request) => request,
            Err(err) => {
                self.status = Some(format!("Error: {}", err));
                return;
            }
        };
        self.in_flight = Some(InFlight {
            user_text: text,
            response: String::new(),
        });
        self.status = None;
        self.chat_auto_scroll = true;

        tokio::task::spawn_blocking(move || {
            let turn = match request.open() {
                Ok(turn) => turn,
                Err(err) => {
                    let _ = tx.send(Response::Failed(err));
                    return;
                }
            };
            let _ = tx.send(Response::Context(format_policy_context(&turn.hits)));
            for fragment in turn.stream {
                match fragment {
                    Ok(text) => {
                        if tx.send(Response::Fragment(text)).is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(Response::Failed(err));
                        return;
                    }
                }
            }
            let _ = tx.send(Response::Finished);
        });
    }

    fn run_command(&mut self, line: &str, tx: mpsc::UnboundedSender<Response>) {
        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (line, ""),
        };
        match name {
            "upload" if !arg.is_empty() => self.upload(arg.to_string(), tx),
            "temp" => match arg.parse::<f32>() {
                Ok(value) => {
                    let stored = self.session.set_temperature(value);
                    self.status = Some(format!("LLM creativity set to {:.2}", stored));
                }
                Err(_) => self.status = Some("Usage: temp <0.0-1.0>".to_string()),
            },
            "reset" => {
                self.status = Some(match self.session.clear_history() {
                    Ok(()) => "Conversation cleared.".to_string(),
                    Err(err) => format!("Error: {}", err),
                });
            }
            "help" => self.status = Some(COMMAND_HELP.to_string()),
            _ => self.status = Some(format!("Unknown command. {}", COMMAND_HELP)),
        }
    }

    fn upload(&mut self, path: String, tx: mpsc::UnboundedSender<Response>) {
        if let Err(err) = self.session.begin_reindex() {
            self.status = Some(format!("Error: {}", err));
            return;
        }
        let name = Path::new(&path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.clone());
        self.status = Some(format!("Processing: {}", name));

        let cfg = Arc::clone(&self.cfg);
        tokio::task::spawn_blocking(move || {
            let result = std::fs::read(&path)
                .map_err(|e| RagError::SourceUnreadable(format!("{}: {}", path, e)))
                .and_then(|bytes| build_index(&cfg, &PdfSource::upload(name, bytes)));
            let _ = tx.send(Response::Indexed(result));
        });
    }

    fn handle_response(&mut self, response: Response) {
        match response {
            Response::Context(context) => {
                self.last_context = Some(context);
                self.side_scroll = 0;
            }
            Response::Fragment(text) => {
                if let Some(in_flight) = self.in_flight.as_mut() {
                    in_flight.response.push_str(&text);
                }
                self.chat_auto_scroll = true;
            }
            Response::Finished => {
                if let Some(done) = self.in_flight.take() {
                    if let Err(err) = self.session.complete_turn(done.user_text, done.response) {
                        warn!(error = %err, "finished response had no open turn");
                    }
                }
                self.chat_auto_scroll = true;
            }
            Response::Failed(err) => {
                error!(error = %err, "turn failed");
                self.in_flight = None;
                if let Err(state_err) = self.session.fail_turn() {
                    warn!(error = %state_err, "failed response had no open turn");
                }
                self.status = Some(format!("Error: {}", err));
                self.chat_auto_scroll = true;
            }
            Response::Indexed(result) => match self.session.finish_reindex(result) {
                Ok(()) => {
                    self.last_context = None;
                    self.chat_scroll = 0;
                    self.status = Some(format!(
                        "Successfully loaded: {}. You can now ask questions about the uploaded document!",
                        self.session.source_name()
                    ));
                }
                Err(err) => {
                    self.status = Some(format!(
                        "Error: {} (still using {})",
                        err,
                        self.session.source_name()
                    ));
                }
            },
        }
    }

    fn scroll_up(&mut self, by: usize) {
        match self.output_focus {
            OutputFocus::Chat => self.chat_scroll = self.chat_scroll.saturating_sub(by),
            OutputFocus::Sidebar => self.side_scroll = self.side_scroll.saturating_sub(by),
        }
    }

    fn scroll_down(&mut self, by: usize) {
        match self.output_focus {
            OutputFocus::Chat => {
                let max_scroll = self.chat_content_len.saturating_sub(self.chat_view_height);
                self.chat_scroll = (self.chat_scroll + by).min(max_scroll);
            }
            OutputFocus::Sidebar => {
                let max_scroll = self.side_content_len.saturating_sub(self.side_view_height);
                self.side_scroll = (self.side_scroll + by).min(max_scroll);
            }
        }
    }

    fn scroll_to_start(&mut self) {
        match self.output_focus {
            OutputFocus::Chat => self.chat_scroll = 0,
            OutputFocus::Sidebar => self.side_scroll = 0,
        }
    }

    fn scroll_to_end(&mut self) {
        match self.output_focus {
            OutputFocus::Chat => {
                self.chat_scroll = self.chat_content_len.saturating_sub(self.chat_view_height);
            }
            OutputFocus::Sidebar => {
                self.side_scroll = self.side_content_len.saturating_sub(self.side_view_height);
            }
        }
    }

    fn focused_view_height(&self) -> usize {
        match self.output_focus {
            OutputFocus::Chat => self.chat_view_height,
            OutputFocus::Sidebar => self.side_view_height,
        }
    }

    fn chat_lines(&self) -> Vec<Line<'static>> {
        let user_style = Style::default().fg(Color::Green).add_modifier(Modifier::BOLD);
        let ai_style = Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD);

        let mut lines = Vec::new();
        if self.session.messages().is_empty() && self.in_flight.is_none() {
            lines.extend(WELCOME_MESSAGE.lines().map(|l| Line::from(l.to_string())));
            return lines;
        }

        let mut push_turn = |label: &'static str, style: Style, content: &str| {
            lines.push(Line::from(Span::styled(label, style)));
            lines.extend(content.lines().map(|l| Line::from(l.to_string())));
            lines.push(Line::from(""));
        };
        for message in self.session.messages() {
            match message.role {
                Role::User => push_turn("You", user_style, &message.content),
                Role::Assistant => push_turn("PoliSense", ai_style, &message.content),
                Role::System => {}
            }
        }
        if let Some(in_flight) = &self.in_flight {
            push_turn("You", user_style, &in_flight.user_text);
            let spinner = ["|", "/", "-", "\\"][self.spinner_idx];
            let body = if in_flight.response.is_empty() {
                spinner.to_string()
            } else {
                format!("{} {}", in_flight.response, spinner)
            };
            push_turn("PoliSense", ai_style, &body);
        }
        lines
    }

    fn sidebar_text(&self) -> String {
        let generation = self.session.generation();
        let index = self.session.index();
        let phase = match self.session.phase() {
            Phase::Idle => "idle",
            Phase::AwaitingCompletion => "answering...",
            Phase::Reindexing => "indexing uploaded PDF...",
        };
        let mut text = format!(
            "Model: {}\nLLM Creativity: {:.2}  [F3 -  F4 +]\nUsing: {} ({} chunks, {} embeddings)\nEmployee: {}\nState: {}",
            generation.model,
            generation.temperature,
            index.source_name(),
            index.len(),
            index.embedder_name(),
            describe_employee(self.session.employee()),
            phase,
        );
        if let Some(status) = &self.status {
            text.push_str("\n\n");
            text.push_str(status);
        }
        if let Some(context) = &self.last_context {
            text.push_str("\n\nRetrieved policy information:\n");
            text.push_str(context);
        }
        text
    }
}

const COMMAND_HELP: &str = "Commands: upload <file.pdf> | temp <0.0-1.0> | reset | help";

fn byte_offset(s: &str, char_idx: usize) -> usize {
    s.char_indices().nth(char_idx).map(|(i, _)| i).unwrap_or(s.len())
}

fn inner_width(area: ratatui::layout::Rect) -> usize {
    area.width.saturating_sub(2) as usize
}

fn inner_height(area: ratatui::layout::Rect) -> usize {
    area.height.saturating_sub(2) as usize
}

fn line_count(text: &str) -> usize {
    let count = text.lines().count();
    if count == 0 { 1 } else { count }
}

/// Visible slice of the input and the cursor column inside it.
fn input_view(input: &str, cursor: usize, max_width: usize) -> (String, usize) {
    if max_width == 0 {
        return (String::new(), 0);
    }
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let cursor = cursor.min(len);
    if len <= max_width {
        return (input.to_string(), cursor);
    }
    let mut start = cursor.saturating_sub(max_width / 2);
    if start + max_width > len {
        start = len - max_width;
    }
    let view = chars[start..start + max_width].iter().collect();
    (view, cursor.saturating_sub(start).min(max_width))
}

fn draw_ui(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> io::Result<()> {
    let chat_lines = app.chat_lines();
    let sidebar_text = app.sidebar_text();

    terminal.draw(|frame| {
        let title_style = Style::default().fg(Color::Black).add_modifier(Modifier::BOLD);
        let info_border = Style::default().fg(Color::Black);
        let input_border = Style::default().fg(Color::DarkGray);
        let help_text_style = Style::default().fg(Color::DarkGray);
        let side_text_style = Style::default().fg(Color::Blue);

        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(area);
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(68), Constraint::Percentage(32)])
            .split(chunks[1]);

        let header = Paragraph::new(CAPTION).style(help_text_style).block(
            Block::bordered()
                .title(TITLE)
                .title_style(title_style)
                .border_style(info_border),
        );
        frame.render_widget(header, chunks[0]);

        let (chat_mark, side_mark) = match app.output_focus {
            OutputFocus::Chat => (" *", ""),
            OutputFocus::Sidebar => ("", " *"),
        };

        app.chat_content_len = chat_lines.len().max(1);
        app.chat_view_height = inner_height(body[0]);
        let max_chat = app.chat_content_len.saturating_sub(app.chat_view_height);
        if app.chat_auto_scroll {
            app.chat_scroll = max_chat;
            app.chat_auto_scroll = false;
        } else if app.chat_scroll > max_chat {
            app.chat_scroll = max_chat;
        }

        let chat = Paragraph::new(chat_lines)
            .scroll((app.chat_scroll as u16, 0))
            .wrap(Wrap { trim: false })
            .block(
                Block::bordered()
                    .title(format!("Chat{}", chat_mark))
                    .title_style(title_style)
                    .border_style(info_border),
            );
        frame.render_widget(chat, body[0]);

        let mut chat_scrollbar = ScrollbarState::new(app.chat_content_len).position(app.chat_scroll);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .track_style(Style::default().fg(Color::DarkGray))
                .thumb_style(Style::default().fg(Color::Blue)),
            body[0].inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut chat_scrollbar,
        );

        app.side_content_len = line_count(&sidebar_text);
        app.side_view_height = inner_height(body[1]);
        let max_side = app.side_content_len.saturating_sub(app.side_view_height);
        if app.side_scroll > max_side {
            app.side_scroll = max_side;
        }
        let sidebar = Paragraph::new(sidebar_text)
            .style(side_text_style)
            .scroll((app.side_scroll as u16, 0))
            .wrap(Wrap { trim: true })
            .block(
                Block::bordered()
                    .title(format!("Settings{}", side_mark))
                    .title_style(title_style)
                    .border_style(info_border),
            );
        frame.render_widget(sidebar, body[1]);

        let input_title = match app.input_mode {
            InputMode::Chat => "Type here...",
            InputMode::Command => "Command (upload <file.pdf> | temp <value> | reset | help)",
        };
        let (view, cursor_x) = input_view(&app.input, app.cursor, inner_width(chunks[2]));
        let input = Paragraph::new(view).style(help_text_style).block(
            Block::bordered()
                .title(input_title)
                .title_style(title_style)
                .border_style(input_border),
        );
        frame.render_widget(input, chunks[2]);
        frame.set_cursor_position((chunks[2].x + 1 + cursor_x as u16, chunks[2].y + 1));

        let help_text = "Enter: Send | Tab: Chat/Command | F3/F4: Creativity | Ctrl+O: Focus | Up/Down/PgUp/PgDn/Home/End: Scroll | Esc/Ctrl+C: Quit";
        let help = Paragraph::new(help_text)
            .style(help_text_style)
            .wrap(Wrap { trim: true })
            .block(
                Block::bordered()
                    .title("Controls")
                    .title_style(title_style)
                    .border_style(input_border),
            );
        frame.render_widget(help, chunks[3]);
    })?;

    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> io::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Response>();
    let mut events = EventStream::new();
    let mut spinner_tick = tokio::time::interval(Duration::from_millis(100));
    spinner_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    draw_ui(terminal, app)?;

    loop {
        tokio::select! {
            _ = spinner_tick.tick() => {
                if app.is_busy() {
                    app.spinner_idx = (app.spinner_idx + 1) % 4;
                    draw_ui(terminal, app)?;
                }
            }
            maybe_response = rx.recv() => {
                if let Some(response) = maybe_response {
                    app.handle_response(response);
                    draw_ui(terminal, app)?;
                }
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        match key.code {
                            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
                            KeyCode::Esc => return Ok(()),
                            KeyCode::Enter => app.submit(tx.clone()),
                            KeyCode::F(3) => {
                                app.session.nudge_temperature(-1);
                            }
                            KeyCode::F(4) => {
                                app.session.nudge_temperature(1);
                            }
                            KeyCode::Up => app.scroll_up(1),
                            KeyCode::Down => app.scroll_down(1),
                            KeyCode::PageUp => app.scroll_up(app.focused_view_height().max(1)),
                            KeyCode::PageDown => app.scroll_down(app.focused_view_height().max(1)),
                            KeyCode::Home => app.scroll_to_start(),
                            KeyCode::End => app.scroll_to_end(),
                            KeyCode::Char('o') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                                app.output_focus = match app.output_focus {
                                    OutputFocus::Chat => OutputFocus::Sidebar,
                                    OutputFocus::Sidebar => OutputFocus::Chat,
                                };
                            }
                            KeyCode::Tab => {
                                app.input_mode = match app.input_mode {
                                    InputMode::Chat => InputMode::Command,
                                    InputMode::Command => InputMode::Chat,
                                };
                                app.input.clear();
                                app.cursor = 0;
                            }
                            KeyCode::Left => app.move_left(),
                            KeyCode::Right => app.move_right(),
                            KeyCode::Backspace => app.delete_char(),
                            KeyCode::Char(ch) => app.insert_char(ch),
                            _ => {}
                        }
                        draw_ui(terminal, app)?;
                    }
                    Some(Ok(Event::Resize(_, _))) => draw_ui(terminal, app)?,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => {}
                    None => return Ok(()),
                }
            }
        }
    }
}
