use core::fmt;

use ahash::RandomState;
use hashbrown::HashMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::RingBuffer;

/// Separator of the symbols of a [`Sequence`]; symbols must not contain it.
pub const DELIMITER: &str = ":";

/// Outcome counts per key, as stored by the model.
pub type StateMap = HashMap<Sequence, HashMap<Sequence, State, RandomState>, RandomState>;

/// Delimiter-joined n-gram of symbols, used as a lookup key.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequence(String);

impl Sequence {
    /// Joins the given symbols.
    pub fn new<S: AsRef<str>>(symbols: &[S]) -> Self {
        let symbols: Vec<&str> = symbols.iter().map(AsRef::as_ref).collect();
        Self(symbols.join(DELIMITER))
    }

    /// Returns the symbols of the sequence
    pub fn values(&self) -> Vec<&str> {
        if self.0.is_empty() {
            return Vec::new();
        }
        self.0.split(DELIMITER).collect()
    }

    /// Returns the number of symbols
    pub fn len(&self) -> usize {
        self.values().len()
    }

    /// Returns `true` for the sequence of no symbols
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the joined form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Sequence {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Sequence {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One n-gram configuration of a [`SequenceModel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HmmConfig {
    /// Length of the key n-gram
    #[serde(rename = "lookback")]
    pub look_back: usize,
    /// Length of the outcome n-gram
    #[serde(rename = "lookahead")]
    pub look_ahead: usize,
    /// Outcomes left out of [`Status::samples`]
    #[serde(default)]
    pub ignore_values: Vec<Sequence>,
}

impl HmmConfig {
    /// Creates a configuration predicting `look_ahead` symbols from the previous `look_back`.
    pub fn new(look_back: usize, look_ahead: usize) -> Self {
        Self {
            look_back,
            look_ahead,
            ignore_values: Vec::new(),
        }
    }

    /// Sets the outcomes excluded from the sample diagnostics.
    pub fn with_ignore_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Sequence>,
    {
        self.ignore_values = values.into_iter().map(Into::into).collect();
        self
    }

    fn window(&self) -> usize {
        self.look_back + self.look_ahead
    }
}

/// Observations of one outcome after one key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Number of times the outcome followed the key
    pub count: usize,
    /// Accumulated popularity weight
    pub emp: f64,
}

/// Global bookkeeping of a [`SequenceModel`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
    /// Number of symbols added
    pub count: u64,
    /// Observations per outcome, then per key
    #[serde(rename = "sample")]
    pub samples: HashMap<Sequence, HashMap<Sequence, usize, RandomState>, RandomState>,
}

/// A candidate outcome of a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// The outcome n-gram
    pub value: Sequence,
    /// Times the outcome was observed after the key
    pub count: usize,
    /// `count / sample`
    pub probability: f64,
    /// `emp / sample^2`
    pub emp: f64,
}

/// All known outcomes of a key, most frequent first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    /// The key, truncated to the configuration look back
    pub key: Sequence,
    /// Total observations of the key
    pub sample: usize,
    /// Number of distinct outcomes of the key
    pub groups: usize,
    /// Number of symbols added to the model
    pub count: u64,
    /// Outcomes ordered by count, then emp, descending
    pub values: Vec<Prediction>,
}

/// Serializable state of a [`SequenceModel`], without its symbol history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    /// Model configurations
    pub config: Vec<HmmConfig>,
    /// Outcome counts per key
    pub state: StateMap,
    /// Global bookkeeping
    pub status: Status,
}

/// Multi-order n-gram model over string symbols.
///
/// Every configuration maps the `look_back` symbols preceding the last
/// `look_ahead` ones to those `look_ahead` symbols. All configurations share
/// one state map. Not synchronized; callers sharing a model across tasks
/// must wrap it in a lock.
#[derive(Debug, Clone)]
pub struct SequenceModel {
    max: usize,
    sequence: RingBuffer<String>,
    config: Vec<HmmConfig>,
    state: StateMap,
    status: Status,
}

impl SequenceModel {
    /// Creates a model evaluating all the given configurations on every add.
    ///
    /// # Panics
    ///
    /// If no configuration is given, or one has a zero look back or look ahead.
    pub fn new(config: Vec<HmmConfig>) -> Self {
        Self::with_state(config, HashMap::with_hasher(RandomState::default()), Status::default())
    }

    /// Restores a model from a snapshot. The symbol history starts empty.
    ///
    /// # Panics
    ///
    /// For the same reasons as [`SequenceModel::new`].
    pub fn from_snapshot(snapshot: ModelSnapshot) -> Self {
        Self::with_state(snapshot.config, snapshot.state, snapshot.status)
    }

    fn with_state(config: Vec<HmmConfig>, state: StateMap, status: Status) -> Self {
        assert!(!config.is_empty(), "at least one configuration is required");
        assert!(
            config.iter().all(|c| c.look_back > 0 && c.look_ahead > 0),
            "look back and look ahead must be positive"
        );
        let max = config.iter().map(HmmConfig::window).max().unwrap_or(1);
        Self {
            max,
            sequence: RingBuffer::new(max),
            config,
            state,
            status,
        }
    }

    /// Returns the model configurations
    pub fn config(&self) -> &[HmmConfig] {
        &self.config
    }

    /// Returns the longest configured n-gram window
    #[inline]
    pub fn max(&self) -> usize {
        self.max
    }

    /// Returns the outcome counts per key
    pub fn state(&self) -> &StateMap {
        &self.state
    }

    /// Returns the global bookkeeping
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Adds a symbol and, once the history holds the longest window, records
    /// the latest key and outcome of every configuration.
    ///
    /// # Panics
    ///
    /// If `symbol` contains [`DELIMITER`].
    pub fn add(&mut self, symbol: &str) -> &Status {
        assert!(
            !symbol.contains(DELIMITER),
            "illegal character '{DELIMITER}' in '{symbol}'"
        );
        self.status.count += 1;
        self.sequence.push(symbol.to_string());
        if !self.sequence.is_full() {
            return &self.status;
        }

        let history: Vec<&str> = self.sequence.iter().map(String::as_str).collect();
        for config in &self.config {
            record(&mut self.state, &mut self.status, config, &history);
        }
        &self.status
    }

    /// Predicts the outcomes following `key`, for every configuration.
    ///
    /// The key is truncated to the last `look_back` symbols of each
    /// configuration and the result is keyed by that truncated key. An unseen
    /// key yields empty values; configurations needing more symbols than
    /// `key` has are skipped.
    pub fn predict(&self, key: &Sequence) -> HashMap<Sequence, Predictions, RandomState> {
        let symbols = key.values();
        let mut predictions = HashMap::with_hasher(RandomState::default());
        for config in &self.config {
            if symbols.len() < config.look_back {
                continue;
            }
            let key = Sequence::new(&symbols[symbols.len() - config.look_back..]);
            let prediction = self.predictions(key.clone());
            predictions.insert(key, prediction);
        }
        predictions
    }

    fn predictions(&self, key: Sequence) -> Predictions {
        let Some(outcomes) = self.state.get(&key) else {
            return Predictions {
                key,
                sample: 0,
                groups: 0,
                count: self.status.count,
                values: Vec::new(),
            };
        };

        let sample: usize = outcomes.values().map(|s| s.count).sum();
        let total = sample as f64;
        let mut values: Vec<Prediction> = outcomes
            .iter()
            .map(|(value, state)| Prediction {
                value: value.clone(),
                count: state.count,
                probability: state.count as f64 / total,
                emp: state.emp / (total * total),
            })
            .collect();
        values.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| OrderedFloat(b.emp).cmp(&OrderedFloat(a.emp)))
                .then_with(|| a.value.cmp(&b.value))
        });

        Predictions {
            key,
            sample,
            groups: outcomes.len(),
            count: self.status.count,
            values,
        }
    }

    /// Returns a serializable copy of the model
    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            config: self.config.clone(),
            state: self.state.clone(),
            status: self.status.clone(),
        }
    }
}

fn record(state: &mut StateMap, status: &mut Status, config: &HmmConfig, history: &[&str]) {
    let n = history.len();
    if n < config.window() {
        return;
    }
    let key = Sequence::new(&history[n - config.window()..n - config.look_ahead]);
    let value = Sequence::new(&history[n - config.look_ahead..]);

    let outcomes = state
        .entry(key.clone())
        .or_insert_with(|| HashMap::with_hasher(RandomState::default()));
    // prior observations of the key, excluding this one
    let count: usize = outcomes.values().map(|s| s.count).sum();
    let outcome = outcomes.entry(value.clone()).or_default();
    outcome.count += 1;
    outcome.emp += 2.0 * count as f64;

    if !config.ignore_values.contains(&value) {
        *status
            .samples
            .entry(value)
            .or_insert_with(|| HashMap::with_hasher(RandomState::default()))
            .entry(key)
            .or_default() += 1;
    }
}
