//! Static HTML rendering of the dashboard page.

use chrono::Local;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write;
use std::str::FromStr;

use crate::classifier::truncate_chars;
use crate::dashboard::{Dataset, ReviewAggregate, SentimentDistribution};
use crate::filters::{same_category, FilterSelection};
use crate::models::SentimentLabel;
use crate::word_freq::WordCount;

const DESCRIPTION_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    Products,
    Reviews,
    Testimonials,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Products, Section::Reviews, Section::Testimonials];

    pub fn slug(&self) -> &'static str {
        match self {
            Section::Products => "products",
            Section::Reviews => "reviews",
            Section::Testimonials => "testimonials",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Section::Products => "Products",
            Section::Reviews => "Reviews",
            Section::Testimonials => "Testimonials",
        }
    }
}

impl FromStr for Section {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "products" => Ok(Section::Products),
            "reviews" => Ok(Section::Reviews),
            "testimonials" => Ok(Section::Testimonials),
            other => Err(anyhow::anyhow!("unknown section '{}'", other)),
        }
    }
}

const STYLE: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; margin: 0; display: flex; color: #222; }
aside { width: 240px; min-height: 100vh; background: #f4f5f7; padding: 20px; box-sizing: border-box; }
aside a { display: block; padding: 6px 0; color: #333; text-decoration: none; }
aside a.active { font-weight: bold; color: #d6336c; }
aside .caption { color: #777; font-size: 0.85em; margin-top: 16px; }
main { flex: 1; padding: 24px 40px; }
.cards { display: flex; gap: 16px; margin: 16px 0; }
.card { flex: 1; background: #fff; border: 1px solid #e3e3e3; border-radius: 8px; padding: 12px 16px; }
.card .value { font-size: 1.8em; font-weight: bold; }
.placeholder { background: #fff8e1; border: 1px solid #ffe08a; padding: 12px 16px; border-radius: 6px; }
.cloud span { display: inline-block; margin: 4px 8px; }
table { border-collapse: collapse; width: 100%; }
th, td { border-bottom: 1px solid #eee; padding: 6px 8px; text-align: left; vertical-align: top; }
.POSITIVE { color: #2f9e44; } .NEGATIVE { color: #e03131; }
.item { border-bottom: 1px solid #eee; padding: 10px 0; }
.item img { max-height: 80px; float: right; }
.muted { color: #777; font-size: 0.9em; }
"#;

/// Renders the full dashboard page for one section and filter selection.
pub fn render_page(
    dataset: &Dataset,
    section: Section,
    selection: &FilterSelection,
    top_k: usize,
) -> String {
    let mut html = String::with_capacity(16 * 1024);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>E-commerce Sentiment Analyzer</title>\n<style>");
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n");

    render_sidebar(&mut html, dataset, section, selection);

    html.push_str("<main>\n<h1>E-commerce Sentiment Analyzer</h1>\n");
    match section {
        Section::Products => render_products(&mut html, dataset),
        Section::Reviews => {
            let aggregate = dataset.aggregate(selection, top_k);
            render_reviews(&mut html, dataset, &aggregate);
        }
        Section::Testimonials => render_testimonials(&mut html, dataset),
    }
    let _ = writeln!(
        html,
        "<p class=\"muted\">Generated {}</p>",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn page_link(section: Section, selection: &FilterSelection) -> String {
    let mut link = format!("/?section={}", section.slug());
    if let Some(month) = selection.month {
        let _ = write!(link, "&month={}", month);
    }
    if let Some(category) = &selection.category {
        let _ = write!(link, "&category={}", urlencoding::encode(category));
    }
    link
}

fn render_sidebar(html: &mut String, dataset: &Dataset, current: Section, selection: &FilterSelection) {
    html.push_str("<aside>\n<h3>Navigation</h3>\n");
    for section in Section::ALL {
        let class = if section == current { " class=\"active\"" } else { "" };
        let _ = writeln!(
            html,
            "<a href=\"{}\"{}>{}</a>",
            encode_double_quoted_attribute(&page_link(section, selection)),
            class,
            section.title()
        );
    }

    if current == Section::Reviews && !dataset.reviews.is_empty() {
        html.push_str("<form method=\"get\" action=\"/\">\n<input type=\"hidden\" name=\"section\" value=\"reviews\">\n");
        html.push_str("<p><label>Month<br><select name=\"month\" onchange=\"this.form.submit()\">\n");
        let _ = writeln!(
            html,
            "<option value=\"\"{}>All months</option>",
            if selection.month.is_none() { " selected" } else { "" }
        );
        for month in dataset.months() {
            let selected = if selection.month == Some(month) { " selected" } else { "" };
            let _ = writeln!(html, "<option value=\"{0}\"{1}>{0}</option>", month, selected);
        }
        html.push_str("</select></label></p>\n");

        let categories = dataset.categories();
        if !categories.is_empty() {
            html.push_str("<p><label>Category<br><select name=\"category\" onchange=\"this.form.submit()\">\n");
            let _ = writeln!(
                html,
                "<option value=\"\"{}>All categories</option>",
                if selection.category.is_none() { " selected" } else { "" }
            );
            for category in categories {
                let selected = match &selection.category {
                    Some(c) if same_category(c, &category) => " selected",
                    _ => "",
                };
                let _ = writeln!(
                    html,
                    "<option value=\"{}\"{}>{}</option>",
                    encode_double_quoted_attribute(&category),
                    selected,
                    encode_text(&category)
                );
            }
            html.push_str("</select></label></p>\n");
        }
        html.push_str("<noscript><button type=\"submit\">Apply</button></noscript>\n</form>\n");
    }

    let _ = writeln!(
        html,
        "<p class=\"caption\">{} products | {} reviews | {} testimonials</p>\n</aside>",
        dataset.products.len(),
        dataset.reviews.len(),
        dataset.testimonials.len()
    );
}

fn placeholder(html: &mut String, message: &str) {
    let _ = writeln!(html, "<div class=\"placeholder\">{}</div>", encode_text(message));
}

fn render_products(html: &mut String, dataset: &Dataset) {
    html.push_str("<h2>Products</h2>\n");
    if dataset.products.is_empty() {
        placeholder(html, "No products found");
        return;
    }
    for product in &dataset.products {
        html.push_str("<div class=\"item\">\n");
        if let Some(image) = product.image.as_deref().filter(|i| !i.trim().is_empty()) {
            let _ = writeln!(
                html,
                "<img src=\"{}\" alt=\"{}\">",
                encode_double_quoted_attribute(image),
                encode_double_quoted_attribute(product.display_name())
            );
        }
        let _ = writeln!(
            html,
            "<strong>{}</strong> - {}",
            encode_text(product.display_name()),
            encode_text(product.price.as_deref().unwrap_or("N/A"))
        );
        if let Some(category) = product.category.as_deref() {
            let _ = writeln!(html, " <span class=\"muted\">[{}]</span>", encode_text(category));
        }
        let description = product.description.as_deref().unwrap_or("");
        let _ = writeln!(
            html,
            "<p class=\"muted\">{}</p>\n</div>",
            encode_text(truncate_chars(description, DESCRIPTION_PREVIEW_CHARS))
        );
    }
}

fn render_testimonials(html: &mut String, dataset: &Dataset) {
    html.push_str("<h2>Testimonials</h2>\n");
    if dataset.testimonials.is_empty() {
        placeholder(html, "No testimonials found");
        return;
    }
    for testimonial in &dataset.testimonials {
        let _ = writeln!(
            html,
            "<div class=\"item\">{} - {}<p>{}</p></div>",
            "&#11088;".repeat(testimonial.stars() as usize),
            encode_text(testimonial.display_author()),
            encode_text(&testimonial.text)
        );
    }
}

fn render_reviews(html: &mut String, dataset: &Dataset, aggregate: &ReviewAggregate<'_>) {
    html.push_str("<h2>Reviews &amp; Sentiment Analysis</h2>\n");
    if dataset.reviews.is_empty() {
        placeholder(html, "No reviews found");
        return;
    }
    let _ = writeln!(
        html,
        "<h3>Analyzing {} reviews ({})</h3>",
        aggregate.reviews.len(),
        encode_text(&aggregate.selection.describe())
    );
    if aggregate.is_empty() {
        placeholder(html, "No reviews match the selected filters");
        return;
    }

    render_cards(html, &aggregate.distribution);
    html.push_str(&distribution_chart_svg(&aggregate.distribution));

    html.push_str("<h3>Word Cloud</h3>\n");
    if aggregate.words.is_empty() {
        placeholder(html, "Not enough text for a word cloud");
    } else {
        html.push_str(&word_cloud_html(&aggregate.words));
    }

    html.push_str("<h3>Review Details</h3>\n<table>\n<tr><th>Date</th><th>Product</th><th>Text</th><th>Rating</th><th>Sentiment</th><th>Confidence</th></tr>\n");
    for review in &aggregate.reviews {
        let (label, confidence, class) = match review.sentiment {
            Some(s) => (s.label.as_str(), format!("{:.1}%", s.score * 100.0), s.label.as_str()),
            None => ("-", "-".to_string(), "muted"),
        };
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"{}\">{}</td><td>{}</td></tr>",
            encode_text(review.date.as_deref().unwrap_or("")),
            encode_text(dataset.product_name_for(review)),
            encode_text(&review.text),
            review.rating.map(|r| r.to_string()).unwrap_or_default(),
            class,
            label,
            confidence
        );
    }
    html.push_str("</table>\n");
}

fn render_cards(html: &mut String, distribution: &SentimentDistribution) {
    html.push_str("<div class=\"cards\">\n");
    let cards = [
        ("Positive", distribution.positive.to_string(), format!("{:.1}% avg confidence", distribution.positive_avg_confidence * 100.0)),
        ("Negative", distribution.negative.to_string(), format!("{:.1}% avg confidence", distribution.negative_avg_confidence * 100.0)),
        ("Unscored", distribution.unscored.to_string(), "not counted in the distribution".to_string()),
    ];
    for (title, value, note) in cards {
        let _ = writeln!(
            html,
            "<div class=\"card\"><div>{}</div><div class=\"value\">{}</div><div class=\"muted\">{}</div></div>",
            title, value, note
        );
    }
    html.push_str("</div>\n");
}

/// Two-bar SVG chart of positive and negative counts.
pub fn distribution_chart_svg(distribution: &SentimentDistribution) -> String {
    const WIDTH: u32 = 480;
    const HEIGHT: u32 = 300;
    const BAR_WIDTH: u32 = 120;
    const PLOT_HEIGHT: f64 = 230.0;

    let max = distribution.positive.max(distribution.negative).max(1) as f64;
    let mut svg = format!(
        "<svg class=\"chart\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" role=\"img\" aria-label=\"Sentiment distribution\">\n",
        w = WIDTH,
        h = HEIGHT
    );
    let bars = [
        (SentimentLabel::Positive, "Positive", distribution.positive, "green", 80u32),
        (SentimentLabel::Negative, "Negative", distribution.negative, "red", 280u32),
    ];
    for (label, title, count, color, x) in bars {
        let bar_height = (count as f64 / max * PLOT_HEIGHT).round();
        let y = 250.0 - bar_height;
        let _ = writeln!(
            svg,
            "<rect class=\"{}\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\"></rect>",
            label.as_str(),
            x,
            y,
            BAR_WIDTH,
            bar_height,
            color
        );
        let _ = writeln!(
            svg,
            "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\">{}</text>",
            x + BAR_WIDTH / 2,
            (y - 6.0).max(12.0),
            count
        );
        let _ = writeln!(
            svg,
            "<text x=\"{}\" y=\"275\" text-anchor=\"middle\">{}</text>",
            x + BAR_WIDTH / 2,
            title
        );
    }
    svg.push_str("</svg>\n");
    svg
}

/// Word cloud as inline spans, font size scaled linearly with frequency.
pub fn word_cloud_html(words: &[WordCount]) -> String {
    const MIN_PX: f64 = 12.0;
    const MAX_PX: f64 = 48.0;

    let max = words.iter().map(|w| w.count).max().unwrap_or(1) as f64;
    let min = words.iter().map(|w| w.count).min().unwrap_or(1) as f64;
    let spread = (max - min).max(1.0);

    let mut html = String::from("<div class=\"cloud\">\n");
    for word in words {
        let size = MIN_PX + (word.count as f64 - min) / spread * (MAX_PX - MIN_PX);
        let _ = writeln!(
            html,
            "<span style=\"font-size: {:.0}px\" title=\"{} mentions\">{}</span>",
            size,
            word.count,
            encode_text(&word.word)
        );
    }
    html.push_str("</div>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Product, Review, Sentiment, Testimonial};

    fn dataset() -> Dataset {
        let products = vec![Product {
            id: Some("1".into()),
            name: Some("<Cat-Ear Beanie>".into()),
            price: Some("$14.99".into()),
            category: Some("apparel".into()),
            image: Some("https://web-scraping.dev/assets/products/cat-ear-beanie.webp".into()),
            url: None,
            description: Some("x".repeat(300)),
        }];
        let reviews = vec![Review {
            id: Some("1".into()),
            product_id: Some("1".into()),
            text: "Love it & it's warm".into(),
            rating: Some(5),
            date: Some("2023-02-01".into()),
            sentiment: Some(Sentiment::new(SentimentLabel::Positive, 0.9876)),
        }];
        let testimonials = vec![Testimonial {
            id: None,
            text: "Quick delivery".into(),
            author: None,
            rating: Some(3),
        }];
        Dataset::new(products, reviews, testimonials)
    }

    #[test]
    fn section_parsing() {
        assert_eq!("".parse::<Section>().unwrap(), Section::Products);
        assert_eq!("Reviews".parse::<Section>().unwrap(), Section::Reviews);
        assert!("admin".parse::<Section>().is_err());
    }

    #[test]
    fn products_page_escapes_and_truncates() {
        let html = render_page(&dataset(), Section::Products, &FilterSelection::all(), 10);
        assert!(html.contains("&lt;Cat-Ear Beanie&gt;"));
        assert!(!html.contains("<Cat-Ear Beanie>"));
        assert!(html.contains(&"x".repeat(200)));
        assert!(!html.contains(&"x".repeat(201)));
        assert!(html.contains("1 products | 1 reviews | 1 testimonials"));
    }

    #[test]
    fn reviews_page_shows_cards_chart_and_table() {
        let html = render_page(&dataset(), Section::Reviews, &FilterSelection::all(), 10);
        assert!(html.contains("<svg class=\"chart\""));
        assert!(html.contains("98.8%"));
        assert!(html.contains("Love it &amp; it's warm"));
        assert!(html.contains("<option value=\"2023-02\">2023-02</option>"));
        assert!(html.contains("class=\"cloud\""));
    }

    #[test]
    fn reviews_page_placeholder_for_empty_selection() {
        let selection = FilterSelection::parse(Some("2030-01"), None).unwrap();
        let html = render_page(&dataset(), Section::Reviews, &selection, 10);
        assert!(html.contains("No reviews match the selected filters"));
        assert!(!html.contains("<svg"));
    }

    #[test]
    fn testimonials_default_author_and_stars() {
        let html = render_page(&dataset(), Section::Testimonials, &FilterSelection::all(), 10);
        assert!(html.contains("Anonymous"));
        assert_eq!(html.matches("&#11088;").count(), 3);
    }

    #[test]
    fn links_keep_the_current_filters() {
        let selection = FilterSelection::parse(Some("2023-02"), Some("home & garden")).unwrap();
        assert_eq!(
            page_link(Section::Reviews, &selection),
            "/?section=reviews&month=2023-02&category=home%20%26%20garden"
        );
        let selection = FilterSelection::parse(None, Some("Électronique")).unwrap();
        assert_eq!(
            page_link(Section::Products, &selection),
            "/?section=products&category=%C3%89lectronique"
        );
    }

    #[test]
    fn category_select_marks_selection_regardless_of_case() {
        let selection = FilterSelection::parse(None, Some("APPAREL")).unwrap();
        let html = render_page(&dataset(), Section::Reviews, &selection, 10);
        assert!(html.contains("<option value=\"apparel\" selected>apparel</option>"));
        assert!(html.contains("Love it &amp; it's warm"));
    }

    #[test]
    fn word_cloud_scales_font_sizes() {
        let words = vec![
            WordCount { word: "warm".into(), count: 4 },
            WordCount { word: "soft".into(), count: 1 },
        ];
        let html = word_cloud_html(&words);
        assert!(html.contains("font-size: 48px"));
        assert!(html.contains("font-size: 12px"));
    }
}
