// ============================================
// src/main.rs (メインファイル)
// ============================================

use std::io::{self, stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use whatthename::cache::SymbolCache;
use whatthename::config::{Config, data_dir};
use whatthename::logging;
use whatthename::provider::SymbolProvider;
use whatthename::round::{GuessOutcome, Round, RoundEngine, RoundError};
use whatthename::session::{QuizSession, SessionError};
use whatthename::source::{FetchError, ReleaseNotesSource};
use whatthename::symbols::SymbolCollection;

use crossterm::{
    ExecutableCommand,
    cursor::{Hide, Show},
    event::{self, Event, KeyCode},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};

use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{error, info};

/// 不正解のときに画面を赤くする時間
const FLASH_DURATION: Duration = Duration::from_millis(500);

type LoadResult = Result<SymbolCollection, FetchError>;

// --------------------------------------------------
// データ構造
// --------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Home,
    Quiz,
    /// 終了確認ダイアログ (後ろにクイズ画面)
    ConfirmExit,
}

/// アプリ全体の状態を管理する
struct App {
    screen: Screen,
    provider: Arc<SymbolProvider>,
    session: QuizSession,

    /// 取得中の一覧 (画面を閉じたら受け取らずに捨てる)
    pending: Option<oneshot::Receiver<LoadResult>>,

    selected: usize, // 選択中の選択肢
    solved: u32,
    misses: u32,

    /// 画面に出すエラー
    error: Option<String>,
    /// 次の読み込みはキャッシュを飛ばして取り直す (一覧を使い切ったとき)
    force_refresh: bool,
    flash_until: Option<Instant>,
    should_quit: bool,
}

impl App {
    fn new(provider: Arc<SymbolProvider>) -> Self {
        Self {
            screen: Screen::Home,
            provider,
            session: QuizSession::new(RoundEngine::new()),
            pending: None,
            selected: 0,
            solved: 0,
            misses: 0,
            error: None,
            force_refresh: false,
            flash_until: None,
            should_quit: false,
        }
    }

    /// ホームからゲームを始める
    fn start_game(&mut self) {
        self.screen = Screen::Quiz;
        self.session = QuizSession::new(RoundEngine::new());
        self.solved = 0;
        self.misses = 0;
        self.start_loading();
    }

    /// 一覧の取得を裏で始める (画面は止めない)
    fn start_loading(&mut self) {
        if !self.session.begin_loading() {
            return;
        }
        self.error = None;

        let refresh = std::mem::take(&mut self.force_refresh);
        let provider = Arc::clone(&self.provider);
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let result = if refresh {
                provider.refresh().await
            } else {
                provider.load_symbols().await
            };
            // 受け取り側がいなければ結果は捨てる
            let _ = tx.send(result);
        });
        self.pending = Some(rx);
    }

    /// 取得が終わっていたらセッションに渡す
    fn poll_loading(&mut self) {
        let Some(rx) = self.pending.as_mut() else {
            return;
        };
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Closed) => Err(FetchError::Network(
                "symbol loading stopped unexpectedly".to_string(),
            )),
        };
        self.pending = None;

        match self.session.finish_loading(result) {
            Ok(round) => {
                info!(choices = round.choices().len(), "First round ready");
                self.selected = 0;
            }
            Err(e) => {
                error!(error = %e, "Failed to prepare symbols");
                self.report(e);
            }
        }
    }

    /// エラーを画面に出す。一覧が尽きたなら次のリトライで取り直す
    fn report(&mut self, error: SessionError) {
        self.force_refresh = matches!(error, SessionError::Round(RoundError::EmptyPool));
        self.error = Some(error.to_string());
    }

    fn choice_count(&self) -> usize {
        self.session
            .current_round()
            .map_or(0, |round| round.choices().len())
    }

    fn move_selection(&mut self, down: bool) {
        let count = self.choice_count();
        if count == 0 {
            return;
        }
        self.selected = if down {
            (self.selected + 1) % count
        } else {
            (self.selected + count - 1) % count
        };
    }

    /// 選択中の名前で回答する
    fn submit(&mut self) {
        let Some(name) = self
            .session
            .current_round()
            .and_then(|round| round.choices().get(self.selected))
            .cloned()
        else {
            return;
        };

        match self.session.guess(&name) {
            Some(GuessOutcome::Correct) => {
                self.solved += 1;
                info!(name = %name, solved = self.solved, "Correct");
                match self.session.advance() {
                    Ok(_) => self.selected = 0,
                    Err(e) => {
                        error!(error = %e, "Failed to prepare next round");
                        self.report(e);
                    }
                }
            }
            Some(GuessOutcome::Incorrect) => {
                self.misses += 1;
                self.flash_until = Some(Instant::now() + FLASH_DURATION);
            }
            // 準備中は何もしない
            None => {}
        }
    }

    fn is_flashing(&self) -> bool {
        self.flash_until.is_some_and(|until| Instant::now() < until)
    }

    /// キー入力の処理
    fn handle_key(&mut self, code: KeyCode) {
        match self.screen {
            Screen::Home => match code {
                KeyCode::Enter | KeyCode::Char(' ') => self.start_game(),
                KeyCode::Esc | KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            },
            Screen::Quiz => match code {
                KeyCode::Esc => self.screen = Screen::ConfirmExit,
                KeyCode::Up | KeyCode::Char('k') => self.move_selection(false),
                KeyCode::Down | KeyCode::Char('j') => self.move_selection(true),
                KeyCode::Enter => self.submit(),
                KeyCode::Char(c @ '1'..='5') => {
                    let index = c as usize - '1' as usize;
                    if index < self.choice_count() {
                        self.selected = index;
                        self.submit();
                    }
                }
                KeyCode::Char('r') if self.error.is_some() => self.start_loading(),
                _ => {}
            },
            Screen::ConfirmExit => match code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    // セッションを捨ててホームへ
                    self.pending = None;
                    self.session = QuizSession::new(RoundEngine::new());
                    self.error = None;
                    self.force_refresh = false;
                    self.screen = Screen::Home;
                }
                KeyCode::Char('n') | KeyCode::Esc => self.screen = Screen::Quiz,
                _ => {}
            },
        }
    }
}

// --------------------------------------------------
// メイン関数 (TUIセットアップと実行ループ)
// --------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    let log_dir = data_dir();
    std::fs::create_dir_all(&log_dir)?;
    let _log_guard = logging::init(&config.log_level, &log_dir)?;

    let source = ReleaseNotesSource::new(config.endpoint.clone());
    let cache = SymbolCache::at(config.cache_path());
    info!(
        endpoint = source.endpoint(),
        cache = %cache.path().display(),
        "Starting WhatTheName"
    );
    let provider = Arc::new(SymbolProvider::new(Box::new(source), cache));

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, provider);
    restore_terminal(&mut terminal)?;
    result?;
    Ok(())
}

fn setup_terminal() -> io::Result<Terminal<impl Backend>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?; // 代替スクリーンを使用
    stdout().execute(Hide)?; // カーソルを非表示
    let backend = CrosstermBackend::new(stdout());
    Terminal::new(backend)
}

fn restore_terminal(terminal: &mut Terminal<impl Backend>) -> io::Result<()> {
    terminal.clear()?;
    stdout().execute(Show)?; // カーソルを再表示
    stdout().execute(LeaveAlternateScreen)?; // 代替スクリーンを終了
    disable_raw_mode()
}

fn run_app(terminal: &mut Terminal<impl Backend>, provider: Arc<SymbolProvider>) -> io::Result<()> {
    let mut app = App::new(provider);

    while !app.should_quit {
        app.poll_loading();
        terminal.draw(|f| ui(f, &app))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == event::KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }
    }

    Ok(())
}

// --------------------------------------------------
// UI描画
// --------------------------------------------------

fn ui(f: &mut Frame, app: &App) {
    match app.screen {
        Screen::Home => draw_home(f),
        Screen::Quiz => draw_quiz(f, app),
        Screen::ConfirmExit => {
            draw_quiz(f, app);
            draw_exit_dialog(f);
        }
    }
}

fn draw_home(f: &mut Frame) {
    let size = f.area();
    let block = Block::default().borders(Borders::ALL).title("What The Name?");
    let inner_area = block.inner(size);
    f.render_widget(block, size);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Length(1), // タイトル
            Constraint::Length(1),
            Constraint::Length(1), // 説明
            Constraint::Length(2),
            Constraint::Length(1), // 操作
            Constraint::Min(0),
        ])
        .split(inner_area);

    f.render_widget(
        Paragraph::new("What The Name?")
            .style(Style::default().fg(Color::White).bold())
            .centered(),
        chunks[1],
    );
    f.render_widget(
        Paragraph::new("Guess the symbol from five names")
            .style(Style::default().fg(Color::Gray))
            .centered(),
        chunks[3],
    );
    f.render_widget(
        Paragraph::new("Enter: Start   q: Quit")
            .style(Style::default().fg(Color::Yellow))
            .centered(),
        chunks[5],
    );
}

fn draw_quiz(f: &mut Frame, app: &App) {
    let size = f.area();
    let mut block = Block::default().borders(Borders::ALL).title("What The Name?");
    if app.is_flashing() {
        block = block.style(Style::default().bg(Color::Red));
    }
    let inner_area = block.inner(size);
    f.render_widget(block, size);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // [0] ステータス
            Constraint::Length(1), // [1] 空白
            Constraint::Length(3), // [2] お題のシンボル
            Constraint::Length(1), // [3] 空白
            Constraint::Min(5),    // [4] 選択肢
            Constraint::Length(1), // [5] 操作説明
        ])
        .split(inner_area);

    let status = format!(
        "Solved: {} / Miss: {} / Symbols: {}",
        app.solved,
        app.misses,
        app.session.pool_len()
    );
    f.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::Yellow)),
        chunks[0],
    );

    if let Some(message) = &app.error {
        f.render_widget(
            Paragraph::new(vec![
                Line::from(message.as_str()).style(Style::default().fg(Color::Red)),
                Line::from("r: Retry   Esc: Exit").style(Style::default().fg(Color::Gray)),
            ])
            .centered(),
            chunks[2],
        );
        return;
    }

    let Some(round) = app.session.current_round().filter(|_| !app.session.is_busy()) else {
        f.render_widget(
            Paragraph::new("Loading symbols...")
                .style(Style::default().fg(Color::Gray))
                .centered(),
            chunks[2],
        );
        return;
    };

    f.render_widget(
        Paragraph::new(silhouette(round.target_name()))
            .style(Style::default().fg(Color::White).bold())
            .block(Block::default().borders(Borders::ALL).title("Symbol"))
            .centered(),
        chunks[2],
    );

    f.render_widget(Paragraph::new(choice_lines(round, app.selected)), chunks[4]);

    f.render_widget(
        Paragraph::new("↑↓/1-5: Select   Enter: Answer   Esc: Exit")
            .style(Style::default().fg(Color::DarkGray))
            .centered(),
        chunks[5],
    );
}

fn choice_lines(round: &Round, selected: usize) -> Vec<Line<'_>> {
    round
        .choices()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let style = if i == selected {
                Style::default().fg(Color::Black).bg(Color::White)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(vec![
                Span::styled(format!(" {}. ", i + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(name.as_str(), style),
            ])
        })
        .collect()
}

fn draw_exit_dialog(f: &mut Frame) {
    let area = centered(f.area(), 44, 5);
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(vec![
            Line::from("Are you sure you want to exit the game?"),
            Line::from(""),
            Line::from(vec![
                Span::styled("y: Yes", Style::default().fg(Color::Red).bold()),
                Span::raw("   "),
                Span::raw("n: Cancel"),
            ]),
        ])
        .block(Block::default().borders(Borders::ALL).title("Exit Confirmation"))
        .centered(),
        area,
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

/// 端末ではシンボル画像を出せないので、名前の形だけ見せる
fn silhouette(name: &str) -> String {
    name.chars()
        .map(|c| if c == '.' || c == ' ' { c } else { '•' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use whatthename::source::SymbolSource;
    use whatthename::symbols::Symbol;

    /// 呼ばれた回数を数える取得元 (None なら失敗する)
    struct CountingSource {
        names: Option<Vec<&'static str>>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SymbolSource for CountingSource {
        async fn fetch_symbols(&self) -> Result<SymbolCollection, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.names {
                Some(names) => Ok(names.iter().filter_map(Symbol::new).collect()),
                None => Err(FetchError::Network("offline".into())),
            }
        }
    }

    async fn app_with(
        dir: &tempfile::TempDir,
        cached: &[&str],
        network: Option<Vec<&'static str>>,
    ) -> (App, Arc<AtomicUsize>) {
        let cache = SymbolCache::at(dir.path().join("symbols.json"));
        if !cached.is_empty() {
            let symbols: SymbolCollection = cached.iter().filter_map(Symbol::new).collect();
            cache.save(&symbols).await.unwrap();
        }
        let calls = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            names: network,
            calls: Arc::clone(&calls),
        };
        let provider = SymbolProvider::new(Box::new(source), cache);
        (App::new(Arc::new(provider)), calls)
    }

    // 裏の読み込みが終わるまで待つ
    async fn settle(app: &mut App) {
        while app.pending.is_some() {
            tokio::time::sleep(Duration::from_millis(1)).await;
            app.poll_loading();
        }
    }

    #[tokio::test]
    async fn retry_after_running_out_of_symbols_fetches_again() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, calls) = app_with(&dir, &["only"], Some(vec!["only", "fresh"])).await;

        app.handle_key(KeyCode::Enter);
        settle(&mut app).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // 唯一の正解を当てると次の問題が作れない
        app.handle_key(KeyCode::Char('1'));
        assert_eq!(app.solved, 1);
        assert!(app.error.is_some());

        app.handle_key(KeyCode::Char('r'));
        settle(&mut app).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(app.error.is_none());
        assert_eq!(
            app.session.current_round().unwrap().target_name(),
            "fresh"
        );
    }

    #[tokio::test]
    async fn retry_after_network_failure_goes_through_cache_again() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, calls) = app_with(&dir, &[], None).await;

        app.handle_key(KeyCode::Enter);
        settle(&mut app).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(app.error.is_some());
        assert!(!app.force_refresh);

        app.handle_key(KeyCode::Char('r'));
        settle(&mut app).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(app.error.is_some());
    }

    #[test]
    fn silhouette_keeps_separators() {
        assert_eq!(silhouette("star.fill"), "••••.••••");
        assert_eq!(silhouette("Baz Icon"), "••• ••••");
    }

    #[test]
    fn centered_fits_inside_small_areas() {
        let area = Rect::new(0, 0, 20, 3);
        let popup = centered(area, 44, 5);
        assert_eq!(popup, Rect::new(0, 0, 20, 3));
    }
}
