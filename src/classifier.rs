//! Sentiment classifiers.
//!
//! The pre-computation step only needs `classify(text) -> (label, score)`.
//! Everything behind that call is swappable: the built-in lexicon scorer,
//! the hosted inference client, or either wrapped in an on-disk cache.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::Settings;
use crate::data_store::write_json_atomic;
use crate::inference_client::InferenceClassifier;
use crate::models::{Sentiment, SentimentLabel};
use crate::word_freq::split_words;

pub const LEXICON_MODEL_ID: &str = "lexicon-en-v1";

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("malformed input text: {0}")]
    MalformedInput(String),
    #[error("inference request failed: {0}")]
    Transport(String),
    #[error("inference endpoint returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("unexpected inference response: {0}")]
    UnexpectedResponse(String),
    #[error("unknown sentiment label '{0}'")]
    UnknownLabel(String),
}

pub trait Classifier {
    /// Identifier of the model behind this classifier.
    fn model_id(&self) -> &str;

    fn classify(&self, text: &str) -> Result<Sentiment, ClassifyError>;

    /// Persists any state accumulated while classifying.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn classify(&self, text: &str) -> Result<Sentiment, ClassifyError> {
        (**self).classify(text)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }
}

/// Builds the classifier named by `settings.model_id`, wrapped in the result
/// cache when a cache directory is configured.
pub fn build(settings: &Settings) -> Result<Box<dyn Classifier>> {
    let inner: Box<dyn Classifier> = if settings.model_id == LEXICON_MODEL_ID {
        info!("Using built-in lexicon classifier ({}).", LEXICON_MODEL_ID);
        Box::new(LexiconClassifier::new())
    } else {
        info!(
            "Using hosted inference classifier '{}' at {}.",
            settings.model_id, settings.inference_base_url
        );
        Box::new(InferenceClassifier::from_settings(settings)?)
    };

    match &settings.cache_dir {
        Some(dir) => Ok(Box::new(CachedClassifier::open(inner, dir)?)),
        None => Ok(inner),
    }
}

/// Truncates `text` to at most `max_chars` characters without splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Rule-based scorer over a product-review lexicon.
pub struct LexiconClassifier {
    words: HashMap<&'static str, f64>,
    negations: Vec<&'static str>,
    intensifiers: HashMap<&'static str, f64>,
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconClassifier {
    pub fn new() -> Self {
        let positive_words = [
            ("great", 0.8),
            ("excellent", 0.9),
            ("amazing", 0.9),
            ("awesome", 0.8),
            ("love", 0.8),
            ("loved", 0.8),
            ("loves", 0.8),
            ("perfect", 0.9),
            ("good", 0.6),
            ("nice", 0.5),
            ("best", 0.8),
            ("fantastic", 0.9),
            ("wonderful", 0.9),
            ("happy", 0.6),
            ("pleased", 0.6),
            ("recommend", 0.7),
            ("recommended", 0.7),
            ("delicious", 0.8),
            ("tasty", 0.7),
            ("fast", 0.4),
            ("quick", 0.4),
            ("comfortable", 0.6),
            ("beautiful", 0.7),
            ("satisfied", 0.6),
            ("worth", 0.5),
            ("fresh", 0.5),
            ("enjoy", 0.6),
            ("enjoyed", 0.6),
            ("favorite", 0.7),
            ("favourite", 0.7),
            ("sturdy", 0.5),
            ("reliable", 0.6),
            ("fun", 0.5),
            ("smooth", 0.4),
        ];

        let negative_words = [
            ("bad", -0.7),
            ("terrible", -0.9),
            ("awful", -0.9),
            ("horrible", -0.9),
            ("worst", -0.9),
            ("poor", -0.7),
            ("broken", -0.8),
            ("broke", -0.7),
            ("disappointed", -0.8),
            ("disappointing", -0.8),
            ("hate", -0.8),
            ("hated", -0.8),
            ("waste", -0.8),
            ("useless", -0.8),
            ("cheap", -0.4),
            ("slow", -0.5),
            ("late", -0.5),
            ("defective", -0.8),
            ("damaged", -0.7),
            ("refund", -0.5),
            ("return", -0.3),
            ("returned", -0.5),
            ("stale", -0.7),
            ("bland", -0.5),
            ("overpriced", -0.6),
            ("uncomfortable", -0.6),
            ("flimsy", -0.6),
            ("fake", -0.8),
            ("scam", -0.9),
            ("problem", -0.5),
            ("issue", -0.4),
            ("fail", -0.7),
            ("failed", -0.7),
            ("meh", -0.3),
        ];

        let mut words = HashMap::new();
        for (word, score) in positive_words.into_iter().chain(negative_words) {
            words.insert(word, score);
        }

        let negations = vec![
            "not", "no", "never", "neither", "nobody", "nothing", "none", "cannot", "cant",
            "dont", "doesnt", "didnt", "wont", "wouldnt", "shouldnt", "couldnt", "isnt",
            "arent", "wasnt", "werent", "hardly", "barely",
        ];

        let intensifiers = HashMap::from([
            ("very", 1.5),
            ("really", 1.4),
            ("extremely", 2.0),
            ("super", 1.5),
            ("so", 1.3),
            ("incredibly", 1.8),
            ("absolutely", 1.8),
            ("totally", 1.5),
            ("slightly", 0.5),
            ("somewhat", 0.7),
            ("pretty", 0.8),
        ]);

        LexiconClassifier {
            words,
            negations,
            intensifiers,
        }
    }

    /// Mean lexicon score of the matched words, in `[-1, 1]`. Zero when nothing matches.
    pub fn polarity(&self, text: &str) -> f64 {
        let mut scores: Vec<f64> = Vec::new();
        let mut negate_next = false;
        let mut intensifier = 1.0;

        for word in split_words(text) {
            let word = word.as_str();
            if self.negations.iter().any(|n| *n == word) {
                negate_next = true;
                continue;
            }
            if let Some(mult) = self.intensifiers.get(word) {
                intensifier = *mult;
                continue;
            }
            if let Some(base) = self.words.get(word) {
                let mut score = *base;
                if negate_next {
                    score = -score;
                    negate_next = false;
                }
                score *= intensifier;
                intensifier = 1.0;
                scores.push(score);
            } else {
                negate_next = false;
                intensifier = 1.0;
            }
        }

        if scores.is_empty() {
            return 0.0;
        }
        (scores.iter().sum::<f64>() / scores.len() as f64).clamp(-1.0, 1.0)
    }
}

fn check_well_formed(text: &str) -> Result<(), ClassifyError> {
    if text.contains('\u{FFFD}') {
        return Err(ClassifyError::MalformedInput(
            "text contains U+FFFD replacement characters".to_string(),
        ));
    }
    if let Some(c) = text.chars().find(|c| c.is_control() && !c.is_whitespace()) {
        return Err(ClassifyError::MalformedInput(format!(
            "text contains control character U+{:04X}",
            c as u32
        )));
    }
    Ok(())
}

impl Classifier for LexiconClassifier {
    fn model_id(&self) -> &str {
        LEXICON_MODEL_ID
    }

    fn classify(&self, text: &str) -> Result<Sentiment, ClassifyError> {
        check_well_formed(text)?;
        let polarity = self.polarity(text);
        let label = if polarity < 0.0 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Positive
        };
        Ok(Sentiment::new(label, 0.5 + 0.5 * polarity.abs()))
    }
}

/// Memoises another classifier's results in `<cache_dir>/<model>.json`.
pub struct CachedClassifier<C> {
    inner: C,
    path: PathBuf,
    entries: RefCell<BTreeMap<String, Sentiment>>,
    dirty: Cell<bool>,
}

impl<C: Classifier> CachedClassifier<C> {
    pub fn open(inner: C, cache_dir: &Path) -> Result<Self> {
        let file_name = format!("{}.json", sanitize_model_id(inner.model_id()));
        let path = cache_dir.join(file_name);
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read classifier cache {:?}", path))?;
            match serde_json::from_str::<BTreeMap<String, Sentiment>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Ignoring unreadable classifier cache {:?}: {}", path, e);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };
        info!("Classifier cache {:?} holds {} entries.", path, entries.len());
        Ok(CachedClassifier {
            inner,
            path,
            entries: RefCell::new(entries),
            dirty: Cell::new(false),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C: Classifier> Classifier for CachedClassifier<C> {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn classify(&self, text: &str) -> Result<Sentiment, ClassifyError> {
        if let Some(hit) = self.entries.borrow().get(text) {
            debug!("Classifier cache hit");
            return Ok(*hit);
        }
        let sentiment = self.inner.classify(text)?;
        self.entries.borrow_mut().insert(text.to_string(), sentiment);
        self.dirty.set(true);
        Ok(sentiment)
    }

    fn flush(&self) -> Result<()> {
        self.inner.flush()?;
        if !self.dirty.get() {
            return Ok(());
        }
        write_json_atomic(&self.path, &*self.entries.borrow())?;
        self.dirty.set(false);
        info!("Persisted classifier cache to {:?}.", self.path);
        Ok(())
    }
}

fn sanitize_model_id(model_id: &str) -> String {
    model_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}
