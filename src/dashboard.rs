use anyhow::{Context, Result};
use log::info;
use serde::Serialize;
use std::collections::HashMap;

use crate::config::Settings;
use crate::data_store::{load_collection, load_optional_collection};
use crate::filters::{available_categories, available_months, FilterSelection};
use crate::models::{Product, Review, SentimentLabel, Testimonial, YearMonth};
use crate::sentiment::SentimentSummary;
use crate::word_freq::{top_words, WordCount, STOPWORDS_VERSION};

pub const UNKNOWN_PRODUCT: &str = "Unknown product";

/// Everything the dashboard reads, loaded once at startup and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub products: Vec<Product>,
    pub reviews: Vec<Review>,
    pub testimonials: Vec<Testimonial>,
    product_index: HashMap<String, usize>,
}

impl Dataset {
    pub fn new(products: Vec<Product>, reviews: Vec<Review>, testimonials: Vec<Testimonial>) -> Self {
        let mut product_index = HashMap::new();
        for (idx, product) in products.iter().enumerate() {
            if let Some(id) = &product.id {
                product_index.entry(id.clone()).or_insert(idx);
            }
        }
        Dataset {
            products,
            reviews,
            testimonials,
            product_index,
        }
    }

    /// Loads the collections named by `settings`. Only the analyzed review
    /// file is required.
    pub fn load(settings: &Settings) -> Result<Self> {
        let reviews_path = settings.analyzed_reviews_path();
        let reviews = load_collection::<Review>(&reviews_path).with_context(|| {
            format!(
                "Dashboard needs {:?}; run the `analyze` step first",
                reviews_path
            )
        })?;
        let products = load_optional_collection::<Product>(&settings.products_path())?;
        let testimonials = load_optional_collection::<Testimonial>(&settings.testimonials_path())?;

        let dataset = Dataset::new(products.records, reviews.records, testimonials.records);
        info!(
            "Dataset loaded: {} products | {} reviews | {} testimonials",
            dataset.products.len(),
            dataset.reviews.len(),
            dataset.testimonials.len()
        );
        Ok(dataset)
    }

    pub fn product_for(&self, review: &Review) -> Option<&Product> {
        review
            .product_id
            .as_ref()
            .and_then(|id| self.product_index.get(id))
            .map(|&idx| &self.products[idx])
    }

    pub fn product_name_for(&self, review: &Review) -> &str {
        self.product_for(review)
            .map(Product::display_name)
            .unwrap_or(UNKNOWN_PRODUCT)
    }

    pub fn months(&self) -> Vec<YearMonth> {
        available_months(&self.reviews)
    }

    pub fn categories(&self) -> Vec<String> {
        available_categories(&self.products)
    }

    /// Reviews passing `selection`, in file order.
    pub fn filter_reviews(&self, selection: &FilterSelection) -> Vec<&Review> {
        self.reviews
            .iter()
            .filter(|r| selection.matches(r, self.product_for(r)))
            .collect()
    }

    pub fn aggregate(&self, selection: &FilterSelection, top_k: usize) -> ReviewAggregate<'_> {
        let reviews = self.filter_reviews(selection);
        let distribution = SentimentDistribution::from_reviews(&reviews);
        let words = top_words(reviews.iter().map(|r| r.text.as_str()), top_k);
        ReviewAggregate {
            selection: selection.clone(),
            reviews,
            distribution,
            words,
        }
    }
}

/// Label counts over a filtered set. Unscored reviews are kept out of the
/// denominator and reported on their own.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SentimentDistribution {
    pub positive: usize,
    pub negative: usize,
    pub unscored: usize,
    pub positive_avg_confidence: f64,
    pub negative_avg_confidence: f64,
    pub positive_share: f64,
    pub negative_share: f64,
}

impl SentimentDistribution {
    pub fn from_reviews(reviews: &[&Review]) -> Self {
        let summary =
            SentimentSummary::from_sentiments(reviews.iter().filter_map(|r| r.sentiment.as_ref()));
        let unscored = reviews.iter().filter(|r| r.sentiment.is_none()).count();
        SentimentDistribution {
            positive: summary.positive_count,
            negative: summary.negative_count,
            unscored,
            positive_avg_confidence: summary.positive_avg_confidence,
            negative_avg_confidence: summary.negative_avg_confidence,
            positive_share: summary.share(SentimentLabel::Positive),
            negative_share: summary.share(SentimentLabel::Negative),
        }
    }

    pub fn scored(&self) -> usize {
        self.positive + self.negative
    }
}

#[derive(Debug, Clone)]
pub struct ReviewAggregate<'a> {
    pub selection: FilterSelection,
    pub reviews: Vec<&'a Review>,
    pub distribution: SentimentDistribution,
    pub words: Vec<WordCount>,
}

impl ReviewAggregate<'_> {
    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewRow<'a> {
    #[serde(flatten)]
    pub review: &'a Review,
    pub product_name: &'a str,
}

/// JSON shape served by `/api/reviews`.
#[derive(Debug, Serialize)]
pub struct AggregateResponse<'a> {
    pub selection: &'a FilterSelection,
    pub available_months: Vec<YearMonth>,
    pub available_categories: Vec<String>,
    pub distribution: &'a SentimentDistribution,
    pub stopwords_version: &'static str,
    pub words: &'a [WordCount],
    pub reviews: Vec<ReviewRow<'a>>,
}

impl<'a> AggregateResponse<'a> {
    pub fn new(dataset: &'a Dataset, aggregate: &'a ReviewAggregate<'a>) -> Self {
        AggregateResponse {
            selection: &aggregate.selection,
            available_months: dataset.months(),
            available_categories: dataset.categories(),
            distribution: &aggregate.distribution,
            stopwords_version: STOPWORDS_VERSION,
            words: &aggregate.words,
            reviews: aggregate
                .reviews
                .iter()
                .map(|&r| ReviewRow {
                    review: r,
                    product_name: dataset.product_name_for(r),
                })
                .collect(),
        }
    }
}
