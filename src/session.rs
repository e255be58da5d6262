// ============================================
// src/session.rs
// 1回のプレイ (セッション) の状態管理
// ============================================

use rand::Rng;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::debug;

use crate::provider::SymbolProvider;
use crate::round::{GuessOutcome, Round, RoundEngine, RoundError, evaluate_guess};
use crate::source::FetchError;
use crate::symbols::SymbolCollection;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Round(#[from] RoundError),

    #[error("No round transition is in progress")]
    NotTransitioning,

    #[error("Symbols are already being prepared")]
    Busy,
}

/// セッションの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 何も用意されていない (起動直後、エラー後)
    Idle,
    /// 一覧の取得中、または次の問題の準備中
    Fetching,
    /// 問題が出ていて回答を受け付ける
    Ready,
}

/// 一覧・直前の正解・今の問題をまとめて持つ
///
/// `Fetching` の間に来た回答はすべて無視する
pub struct QuizSession<R = StdRng> {
    engine: RoundEngine<R>,
    pool: SymbolCollection,
    previous_target: Option<String>,
    round: Option<Round>,
    state: SessionState,
    // 正解して次の問題を待っている
    awaiting_advance: bool,
}

impl<R: Rng> QuizSession<R> {
    pub fn new(engine: RoundEngine<R>) -> Self {
        Self {
            engine,
            pool: SymbolCollection::new(),
            previous_target: None,
            round: None,
            state: SessionState::Idle,
            awaiting_advance: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == SessionState::Fetching
    }

    pub fn current_round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    /// 一覧の取得を始める。すでに取得中なら false
    pub fn begin_loading(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        self.state = SessionState::Fetching;
        self.round = None;
        true
    }

    /// 取得結果を受け取り、最初の問題を作る
    pub fn finish_loading(
        &mut self,
        result: Result<SymbolCollection, FetchError>,
    ) -> Result<&Round, SessionError> {
        self.awaiting_advance = false;
        match result {
            Ok(pool) => {
                self.pool = pool;
                self.assemble_round()
            }
            Err(e) => {
                self.state = SessionState::Idle;
                Err(e.into())
            }
        }
    }

    /// 取得から最初の問題までを一気に行う (準備中なら何もしない)
    pub async fn start(&mut self, provider: &SymbolProvider) -> Result<&Round, SessionError> {
        if !self.begin_loading() {
            return Err(SessionError::Busy);
        }
        let result = provider.load_symbols().await;
        self.finish_loading(result)
    }

    /// MARK:回答を受け付ける
    ///
    /// 準備中は None (何もしない)。正解すると次の問題ができるまで準備中になる
    pub fn guess(&mut self, guessed_name: &str) -> Option<GuessOutcome> {
        if self.state != SessionState::Ready {
            debug!(guessed_name, "Ignoring guess while busy");
            return None;
        }
        let round = self.round.as_ref()?;

        let outcome = evaluate_guess(round, guessed_name);
        if outcome == GuessOutcome::Correct {
            self.previous_target = self.round.take().map(|r| r.target_name().to_string());
            self.state = SessionState::Fetching;
            self.awaiting_advance = true;
        }
        Some(outcome)
    }

    /// 正解のあとに次の問題を作る (1回の正解につき1回だけ)
    pub fn advance(&mut self) -> Result<&Round, SessionError> {
        if !self.awaiting_advance {
            return Err(SessionError::NotTransitioning);
        }
        self.awaiting_advance = false;
        self.assemble_round()
    }

    fn assemble_round(&mut self) -> Result<&Round, SessionError> {
        match self
            .engine
            .start_round(&self.pool, self.previous_target.as_deref())
        {
            Ok(round) => {
                debug!(choices = round.choices().len(), "Round ready");
                self.state = SessionState::Ready;
                Ok(self.round.insert(round))
            }
            Err(e) => {
                self.state = SessionState::Idle;
                Err(e.into())
            }
        }
    }
}
