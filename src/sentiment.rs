use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use serde::Serialize;
use std::path::Path;

use crate::classifier::{truncate_chars, Classifier};
use crate::data_store::{load_collection, write_json_atomic};
use crate::models::{Review, Sentiment, SentimentLabel};

/// Counts from one pre-computation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrecomputeReport {
    pub total: usize,
    pub scored: usize,
    pub skipped_empty: usize,
    pub failed: usize,
    pub malformed_dropped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SentimentSummary {
    pub positive_count: usize,
    pub negative_count: usize,
    pub positive_avg_confidence: f64,
    pub negative_avg_confidence: f64,
    pub total: usize,
}

impl SentimentSummary {
    pub fn from_sentiments<'a, I>(sentiments: I) -> Self
    where
        I: IntoIterator<Item = &'a Sentiment>,
    {
        let mut summary = SentimentSummary::default();
        let mut positive_sum = 0.0;
        let mut negative_sum = 0.0;
        for s in sentiments {
            match s.label {
                SentimentLabel::Positive => {
                    summary.positive_count += 1;
                    positive_sum += s.score;
                }
                SentimentLabel::Negative => {
                    summary.negative_count += 1;
                    negative_sum += s.score;
                }
            }
        }
        summary.total = summary.positive_count + summary.negative_count;
        if summary.positive_count > 0 {
            summary.positive_avg_confidence = positive_sum / summary.positive_count as f64;
        }
        if summary.negative_count > 0 {
            summary.negative_avg_confidence = negative_sum / summary.negative_count as f64;
        }
        summary
    }

    pub fn share(&self, label: SentimentLabel) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let count = match label {
            SentimentLabel::Positive => self.positive_count,
            SentimentLabel::Negative => self.negative_count,
        };
        count as f64 / self.total as f64 * 100.0
    }
}

pub fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} reviews {msg}")
    {
        bar.set_style(style);
    }
    bar
}

/// Attaches a sentiment to every review with a non-blank body. Blank bodies
/// and per-review classification failures leave the sentiment unset.
pub fn enrich_reviews<C: Classifier + ?Sized>(
    reviews: &mut [Review],
    classifier: &C,
    max_input_chars: usize,
    progress: &ProgressBar,
) -> PrecomputeReport {
    let mut report = PrecomputeReport {
        total: reviews.len(),
        ..Default::default()
    };

    for (index, review) in reviews.iter_mut().enumerate() {
        progress.inc(1);
        if !review.has_body() {
            review.sentiment = None;
            report.skipped_empty += 1;
            continue;
        }
        let input = truncate_chars(&review.text, max_input_chars);
        match classifier.classify(input) {
            Ok(sentiment) => {
                review.sentiment = Some(sentiment.normalized());
                report.scored += 1;
            }
            Err(e) => {
                warn!(
                    "Classification failed for review #{} (id {:?}): {}",
                    index, review.id, e
                );
                review.sentiment = None;
                report.failed += 1;
            }
        }
    }
    progress.finish_and_clear();
    report
}

/// Reads raw reviews from `input`, classifies them and atomically writes the
/// enriched collection to `output`.
pub fn run_precompute<C: Classifier + ?Sized>(
    input: &Path,
    output: &Path,
    classifier: &C,
    max_input_chars: usize,
    progress: &ProgressBar,
) -> Result<(PrecomputeReport, SentimentSummary)> {
    info!("Loading reviews from {:?}...", input);
    let loaded = load_collection::<Review>(input)
        .with_context(|| format!("Cannot run sentiment analysis without {:?}", input))?;
    let mut reviews = loaded.records;
    info!(
        "Running sentiment analysis on {} reviews with model '{}'...",
        reviews.len(),
        classifier.model_id()
    );

    progress.set_length(reviews.len() as u64);
    let mut report = enrich_reviews(&mut reviews, classifier, max_input_chars, progress);
    report.malformed_dropped = loaded.malformed;

    if let Err(e) = classifier.flush() {
        warn!("Failed to persist classifier state: {:#}", e);
    }

    write_json_atomic(output, &reviews)
        .with_context(|| format!("Failed to write analyzed reviews to {:?}", output))?;
    info!("Saved analyzed reviews to {:?}", output);

    let summary = SentimentSummary::from_sentiments(reviews.iter().filter_map(|r| r.sentiment.as_ref()));
    info!(
        "Sentiment run complete: {} scored, {} skipped (empty), {} failed, {} malformed dropped.",
        report.scored, report.skipped_empty, report.failed, report.malformed_dropped
    );
    Ok((report, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ClassifyError, LexiconClassifier};

    fn review(id: &str, text: &str) -> Review {
        Review {
            id: Some(id.to_string()),
            product_id: None,
            text: text.to_string(),
            rating: None,
            date: Some("2024-01-10".to_string()),
            sentiment: None,
        }
    }

    struct FailsOn(&'static str);

    impl Classifier for FailsOn {
        fn model_id(&self) -> &str {
            "fails-on"
        }

        fn classify(&self, text: &str) -> Result<Sentiment, ClassifyError> {
            if text.contains(self.0) {
                Err(ClassifyError::MalformedInput("boom".to_string()))
            } else {
                Ok(Sentiment::new(SentimentLabel::Negative, 0.333_333_3))
            }
        }
    }

    struct Echo;

    impl Classifier for Echo {
        fn model_id(&self) -> &str {
            "echo"
        }

        fn classify(&self, text: &str) -> Result<Sentiment, ClassifyError> {
            Ok(Sentiment::new(SentimentLabel::Positive, text.chars().count() as f64 / 1000.0))
        }
    }

    #[test]
    fn blank_bodies_are_skipped() {
        let mut reviews = vec![review("1", "Great product"), review("2", ""), review("3", "  \n\t ")];
        reviews[1].sentiment = Some(Sentiment::new(SentimentLabel::Positive, 0.9));
        let report = enrich_reviews(&mut reviews, &LexiconClassifier::new(), 512, &ProgressBar::hidden());
        assert_eq!(report.scored, 1);
        assert_eq!(report.skipped_empty, 2);
        assert!(reviews[0].sentiment.is_some());
        assert!(reviews[1].sentiment.is_none());
        assert!(reviews[2].sentiment.is_none());
    }

    #[test]
    fn failures_do_not_abort_the_batch() {
        let mut reviews = vec![review("1", "fine"), review("2", "explode here"), review("3", "also fine")];
        let report = enrich_reviews(&mut reviews, &FailsOn("explode"), 512, &ProgressBar::hidden());
        assert_eq!(report.failed, 1);
        assert_eq!(report.scored, 2);
        assert!(reviews[1].sentiment.is_none());
        assert_eq!(reviews[2].sentiment.unwrap().score, 0.3333);
    }

    #[test]
    fn bodies_are_truncated_before_classification() {
        let mut reviews = vec![review("1", &"é".repeat(900))];
        enrich_reviews(&mut reviews, &Echo, 512, &ProgressBar::hidden());
        assert_eq!(reviews[0].sentiment.unwrap().score, 0.512);
        // original text is kept untouched
        assert_eq!(reviews[0].text.chars().count(), 900);
    }

    #[test]
    fn summary_averages_per_label() {
        let sentiments = [
            Sentiment::new(SentimentLabel::Positive, 0.9),
            Sentiment::new(SentimentLabel::Positive, 0.7),
            Sentiment::new(SentimentLabel::Negative, 0.6),
        ];
        let summary = SentimentSummary::from_sentiments(sentiments.iter());
        assert_eq!(summary.positive_count, 2);
        assert_eq!(summary.negative_count, 1);
        assert!((summary.positive_avg_confidence - 0.8).abs() < 1e-9);
        assert!((summary.share(SentimentLabel::Negative) - 100.0 / 3.0).abs() < 1e-9);

        let empty = SentimentSummary::from_sentiments(std::iter::empty());
        assert_eq!(empty.total, 0);
        assert_eq!(empty.share(SentimentLabel::Positive), 0.0);
    }
}
