use lru::LruCache;
use parking_lot::Mutex;
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::Serialize;
use std::fmt;
use std::num::NonZeroUsize;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::debug;

const MAX_SESSION_COUNT: usize = 4096;
const SESSION_ID_LEN: usize = 24;
pub const WEIGHT_RANGE_KG: RangeInclusive<f64> = 30.0..=300.0;
pub const DEFAULT_WEIGHT_KG: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Speaker::User)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub role: Speaker,
    pub content: String,
}

/// Doctor-chat transcript. Turns are only ever added in user/assistant pairs.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ChatHistory {
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    pub fn record_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.turns.reserve(2);
        self.turns.push(ChatTurn {
            role: Speaker::User,
            content: user.into(),
        });
        self.turns.push(ChatTurn {
            role: Speaker::Assistant,
            content: assistant.into(),
        });
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightOutOfRange(pub f64);

impl fmt::Display for WeightOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Weight must be between {} and {} kg (got {}).",
            WEIGHT_RANGE_KG.start(),
            WEIGHT_RANGE_KG.end(),
            self.0
        )
    }
}

impl std::error::Error for WeightOutOfRange {}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct WeightLog {
    entries: Vec<f64>,
}

impl WeightLog {
    pub fn log(&mut self, kg: f64) -> Result<f64, WeightOutOfRange> {
        if !kg.is_finite() || !WEIGHT_RANGE_KG.contains(&kg) {
            return Err(WeightOutOfRange(kg));
        }
        self.entries.push(kg);
        Ok(kg)
    }

    pub fn entries(&self) -> &[f64] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct NutritionPlans {
    plans: Vec<String>,
}

impl NutritionPlans {
    pub fn push(&mut self, plan: impl Into<String>) {
        self.plans.push(plan.into());
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// All plans in generation order, blank-line separated, for export.
    pub fn combined(&self) -> String {
        self.plans.join("\n\n")
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionState {
    pub chat: ChatHistory,
    pub weights: WeightLog,
    pub nutrition_plans: NutritionPlans,
}

/// In-memory session containers keyed by the session cookie.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<LruCache<String, SessionState>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_capacity(MAX_SESSION_COUNT)
    }
}

impl SessionStore {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Runs `f` against the session, creating it on first use.
    pub fn with_session<R>(&self, session_id: &str, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut guard = self.inner.lock();
        if !guard.contains(session_id) {
            if let Some((evicted, _)) = guard.push(session_id.to_string(), SessionState::default())
            {
                if evicted != session_id {
                    debug!(session = %evicted, "evicted least recently used session");
                }
            }
        }
        let state = guard.get_mut(session_id);
        match state {
            Some(state) => f(state),
            None => f(&mut SessionState::default()),
        }
    }

    pub fn snapshot(&self, session_id: &str) -> SessionState {
        self.inner
            .lock()
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

pub fn generate_session_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

pub fn is_valid_session_id(candidate: &str) -> bool {
    candidate.len() == SESSION_ID_LEN && candidate.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_history_alternates_in_append_order() {
        let mut history = ChatHistory::default();
        for idx in 0..5 {
            history.record_exchange(format!("q{idx}"), format!("a{idx}"));
        }
        assert_eq!(history.len(), 10);
        for (idx, turn) in history.turns().iter().enumerate() {
            let expected_role = if idx % 2 == 0 {
                Speaker::User
            } else {
                Speaker::Assistant
            };
            assert_eq!(turn.role, expected_role);
            let prefix = if idx % 2 == 0 { 'q' } else { 'a' };
            assert_eq!(turn.content, format!("{prefix}{}", idx / 2));
        }
    }

    #[test]
    fn weight_log_keeps_order_and_bounds() {
        let mut log = WeightLog::default();
        for kg in [82.5, 81.0, 81.4, 30.0, 300.0] {
            log.log(kg).unwrap();
        }
        assert_eq!(log.entries(), &[82.5, 81.0, 81.4, 30.0, 300.0]);
        assert_eq!(log.log(29.9), Err(WeightOutOfRange(29.9)));
        assert!(log.log(f64::NAN).is_err());
        assert!(log.log(300.1).is_err());
        assert_eq!(log.entries().len(), 5);
    }

    #[test]
    fn nutrition_plans_combine_in_order() {
        let mut plans = NutritionPlans::default();
        assert!(plans.is_empty());
        plans.push("Plan A");
        plans.push("Plan B");
        assert_eq!(plans.combined(), "Plan A\n\nPlan B");
    }

    #[test]
    fn sessions_are_isolated() {
        let store = SessionStore::default();
        store.with_session("alpha", |state| state.weights.log(70.0).map(|_| ()).unwrap());
        store.with_session("beta", |state| state.chat.record_exchange("hi", "hello"));
        assert_eq!(store.snapshot("alpha").weights.entries(), &[70.0]);
        assert!(store.snapshot("alpha").chat.is_empty());
        assert_eq!(store.snapshot("beta").chat.len(), 2);
        assert!(store.snapshot("missing").weights.is_empty());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn least_recently_used_session_is_evicted() {
        let store = SessionStore::with_capacity(2);
        assert!(store.is_empty());
        store.with_session("one", |state| state.nutrition_plans.push("a"));
        store.with_session("two", |state| state.nutrition_plans.push("b"));
        store.with_session("one", |_| ());
        store.with_session("three", |_| ());
        assert_eq!(store.len(), 2);
        assert!(store.snapshot("two").nutrition_plans.is_empty());
        assert_eq!(store.snapshot("one").nutrition_plans.len(), 1);
    }

    #[test]
    fn session_ids_are_alphanumeric() {
        let id = generate_session_id();
        assert!(is_valid_session_id(&id));
        assert_ne!(id, generate_session_id());
        assert!(!is_valid_session_id("short"));
        assert!(!is_valid_session_id("abcdefghijklmnopqrstuvw!"));
    }
}
