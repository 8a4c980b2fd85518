use anyhow::Result;
use log::info;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;

use crate::dashboard::{Dataset, ReviewAggregate};
use crate::word_freq::{WordCount, STOPWORDS_VERSION};

/// Writes the filtered review report to an Excel file with multiple sheets.
pub fn write_excel_file(file_path: &Path, dataset: &Dataset, aggregate: &ReviewAggregate<'_>) -> Result<()> {
    info!("Initializing Excel workbook for file: {:?}", file_path);
    let mut workbook = build_workbook(dataset, aggregate)?;
    info!("Saving Excel workbook...");
    workbook.save(file_path)?;
    info!("Excel file saved successfully to {:?}", file_path);
    Ok(())
}

/// Same workbook as [`write_excel_file`], serialised in memory for downloads.
pub fn excel_bytes(dataset: &Dataset, aggregate: &ReviewAggregate<'_>) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(dataset, aggregate)?;
    Ok(workbook.save_to_buffer()?)
}

fn build_workbook(dataset: &Dataset, aggregate: &ReviewAggregate<'_>) -> Result<Workbook> {
    let mut workbook = Workbook::new();

    let summary_sheet = workbook.add_worksheet();
    write_summary_sheet(summary_sheet, aggregate)?;

    let reviews_sheet = workbook.add_worksheet();
    write_reviews_sheet(reviews_sheet, dataset, aggregate)?;

    let words_sheet = workbook.add_worksheet();
    write_words_sheet(words_sheet, &aggregate.words)?;

    Ok(workbook)
}

/// Helper function to write the "Summary" sheet.
fn write_summary_sheet(sheet: &mut Worksheet, aggregate: &ReviewAggregate<'_>) -> Result<()> {
    sheet.set_name("Summary")?;
    sheet.set_column_width(0, 28)?;
    sheet.set_column_width(1, 18)?;

    let percentage_format = Format::new().set_num_format("0.0");
    let dist = &aggregate.distribution;
    let mut current_row = 0u32;

    sheet.write_string(current_row, 0, "SENTIMENT SUMMARY")?;
    current_row += 2;

    let month = aggregate
        .selection
        .month
        .map(|m| m.to_string())
        .unwrap_or_else(|| "All months".to_string());
    let category = aggregate
        .selection
        .category
        .clone()
        .unwrap_or_else(|| "All categories".to_string());
    sheet.write_string(current_row, 0, "Month")?;
    sheet.write_string(current_row, 1, &month)?;
    current_row += 1;
    sheet.write_string(current_row, 0, "Category")?;
    sheet.write_string(current_row, 1, &category)?;
    current_row += 2;

    let count_rows = [
        ("Reviews in selection", aggregate.reviews.len()),
        ("Positive", dist.positive),
        ("Negative", dist.negative),
        ("Unscored", dist.unscored),
    ];
    for (metric, value) in count_rows {
        sheet.write_string(current_row, 0, metric)?;
        sheet.write_number(current_row, 1, value as f64)?;
        current_row += 1;
    }

    let percentage_rows = [
        ("Positive %", dist.positive_share),
        ("Negative %", dist.negative_share),
        ("Positive avg confidence %", dist.positive_avg_confidence * 100.0),
        ("Negative avg confidence %", dist.negative_avg_confidence * 100.0),
    ];
    for (metric, value) in percentage_rows {
        sheet.write_string(current_row, 0, metric)?;
        sheet.write_number_with_format(current_row, 1, value, &percentage_format)?;
        current_row += 1;
    }

    current_row += 1;
    sheet.write_string(current_row, 0, "Stopword set")?;
    sheet.write_string(current_row, 1, STOPWORDS_VERSION)?;
    current_row += 1;
    sheet.write_string(current_row, 0, "Generated")?;
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    sheet.write_string(current_row, 1, &timestamp)?;

    info!("'Summary' sheet written for selection: {}.", aggregate.selection.describe());
    Ok(())
}

/// Helper function to write the "Reviews" sheet.
fn write_reviews_sheet(sheet: &mut Worksheet, dataset: &Dataset, aggregate: &ReviewAggregate<'_>) -> Result<()> {
    sheet.set_name("Reviews")?;
    sheet.set_column_width(3, 60)?;

    let headers = vec!["id", "date", "product", "text", "rating", "sentiment", "confidence"];
    for (col_num, header) in headers.iter().enumerate() {
        sheet.write_string(0, col_num as u16, *header)?;
    }

    for (row_num, review) in aggregate.reviews.iter().enumerate() {
        let current_row = (row_num + 1) as u32; // +1 for header row
        if let Some(id) = &review.id {
            sheet.write_string(current_row, 0, id)?;
        }
        if let Some(date) = &review.date {
            sheet.write_string(current_row, 1, date)?;
        }
        sheet.write_string(current_row, 2, dataset.product_name_for(review))?;
        if review.has_body() {
            sheet.write_string(current_row, 3, &review.text)?;
        }
        if let Some(rating) = review.rating {
            sheet.write_number(current_row, 4, rating as f64)?;
        }
        if let Some(sentiment) = review.sentiment {
            sheet.write_string(current_row, 5, sentiment.label.as_str())?;
            sheet.write_number(current_row, 6, sentiment.score)?;
        }
    }
    info!("'Reviews' sheet written with {} rows.", aggregate.reviews.len());
    Ok(())
}

/// Helper function to write the "Word Frequencies" sheet.
fn write_words_sheet(sheet: &mut Worksheet, words: &[WordCount]) -> Result<()> {
    sheet.set_name("Word Frequencies")?;
    sheet.write_string(0, 0, "word")?;
    sheet.write_string(0, 1, "count")?;
    for (row_num, word) in words.iter().enumerate() {
        let current_row = (row_num + 1) as u32;
        sheet.write_string(current_row, 0, &word.word)?;
        sheet.write_number(current_row, 1, word.count as f64)?;
    }
    info!("'Word Frequencies' sheet written with {} rows.", words.len());
    Ok(())
}
