use anyhow::Result;
use log::info;

use review_sentiment::classifier;
use review_sentiment::config::Settings;
use review_sentiment::env_loader;
use review_sentiment::models::SentimentLabel;
use review_sentiment::sentiment::{progress_bar, run_precompute};

// Blocking HTTP inside the classifier must not run on an async runtime, so
// this entry point stays synchronous.
fn main() -> Result<()> {
    env_loader::load_env();
    env_logger::init();

    info!("Starting sentiment pre-computation.");
    let settings = Settings::from_env();

    let classifier = classifier::build(&settings)?;
    let input = settings.raw_reviews_path();
    let output = settings.analyzed_reviews_path();

    let bar = progress_bar(0);
    let (report, summary) = run_precompute(
        &input,
        &output,
        classifier.as_ref(),
        settings.max_input_chars,
        &bar,
    )?;

    println!("\n✅ Sentiment analysis complete!");
    println!("📁 Results saved to {:?}", output);
    println!("\n📊 Summary:");
    println!("   Total reviews: {}", report.total);
    println!(
        "   Positive: {} ({:.1}%)",
        summary.positive_count,
        summary.share(SentimentLabel::Positive)
    );
    println!(
        "   Negative: {} ({:.1}%)",
        summary.negative_count,
        summary.share(SentimentLabel::Negative)
    );
    if report.skipped_empty > 0 || report.failed > 0 || report.malformed_dropped > 0 {
        println!(
            "   Unscored: {} empty, {} failed, {} malformed records dropped",
            report.skipped_empty, report.failed, report.malformed_dropped
        );
    }

    Ok(())
}
