use serde::Serialize;
use std::collections::BTreeSet;

use crate::models::{Product, Review, YearMonth};

/// User-selected dashboard filters. `None` means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSelection {
    pub month: Option<YearMonth>,
    pub category: Option<String>,
}

impl FilterSelection {
    pub fn all() -> Self {
        FilterSelection::default()
    }

    pub fn month(month: YearMonth) -> Self {
        FilterSelection {
            month: Some(month),
            category: None,
        }
    }

    /// Builds a selection from raw request values; blank strings mean "all".
    pub fn parse(month: Option<&str>, category: Option<&str>) -> anyhow::Result<Self> {
        let month = match month.map(str::trim) {
            Some(m) if !m.is_empty() => Some(m.parse::<YearMonth>()?),
            _ => None,
        };
        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        Ok(FilterSelection { month, category })
    }

    pub fn is_all(&self) -> bool {
        self.month.is_none() && self.category.is_none()
    }

    pub fn describe(&self) -> String {
        let month = self
            .month
            .map(|m| m.to_string())
            .unwrap_or_else(|| "all months".to_string());
        let category = self.category.as_deref().unwrap_or("all categories");
        format!("{}, {}", month, category)
    }

    /// `product` is the product the review references, if it is known.
    pub fn matches(&self, review: &Review, product: Option<&Product>) -> bool {
        if let Some(month) = self.month {
            if review.month() != Some(month) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            let product_category = product.and_then(|p| p.category.as_deref());
            match product_category {
                Some(c) if same_category(c, category) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Case-insensitive category comparison, ignoring surrounding whitespace.
pub fn same_category(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Sorted, de-duplicated months present in `reviews`.
pub fn available_months(reviews: &[Review]) -> Vec<YearMonth> {
    reviews
        .iter()
        .filter_map(Review::month)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sorted, de-duplicated non-empty product categories.
pub fn available_categories(products: &[Product]) -> Vec<String> {
    products
        .iter()
        .filter_map(|p| p.category.as_deref())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(date: Option<&str>) -> Review {
        Review {
            id: None,
            product_id: Some("p1".into()),
            text: "text".into(),
            rating: None,
            date: date.map(str::to_string),
            sentiment: None,
        }
    }

    fn product(category: Option<&str>) -> Product {
        Product {
            id: Some("p1".into()),
            name: Some("Box of Chocolate Candy".into()),
            price: Some("24.99".into()),
            category: category.map(str::to_string),
            image: None,
            url: None,
            description: None,
        }
    }

    #[test]
    fn parse_treats_blank_as_all() {
        assert!(FilterSelection::parse(Some(""), Some("  ")).unwrap().is_all());
        assert!(FilterSelection::parse(None, None).unwrap().is_all());
        let sel = FilterSelection::parse(Some("2023-04"), Some("Apparel")).unwrap();
        assert_eq!(sel.month, YearMonth::new(2023, 4));
        assert_eq!(sel.category.as_deref(), Some("Apparel"));
        assert!(FilterSelection::parse(Some("April"), None).is_err());
    }

    #[test]
    fn month_filter_drops_undated_reviews() {
        let sel = FilterSelection::month(YearMonth::new(2023, 4).unwrap());
        assert!(sel.matches(&review(Some("2023-04-30")), None));
        assert!(!sel.matches(&review(Some("2023-05-01")), None));
        assert!(!sel.matches(&review(None), None));
        assert!(FilterSelection::all().matches(&review(None), None));
    }

    #[test]
    fn category_filter_is_case_insensitive_and_needs_a_product() {
        let sel = FilterSelection::parse(None, Some("consumables")).unwrap();
        let p = product(Some("Consumables"));
        assert!(sel.matches(&review(None), Some(&p)));
        assert!(!sel.matches(&review(None), Some(&product(Some("apparel")))));
        assert!(!sel.matches(&review(None), Some(&product(None))));
        assert!(!sel.matches(&review(None), None));
    }

    #[test]
    fn category_filter_folds_non_ascii_case() {
        let sel = FilterSelection::parse(None, Some("électronique")).unwrap();
        assert!(sel.matches(&review(None), Some(&product(Some("Électronique")))));
        assert!(sel.matches(&review(None), Some(&product(Some(" ÉLECTRONIQUE ")))));
        assert!(!sel.matches(&review(None), Some(&product(Some("Électroménager")))));
        assert!(same_category("ΟΙΚΙΑΚΑ", "οικιακα"));
    }

    #[test]
    fn available_lists_are_sorted_and_unique() {
        let reviews = vec![
            review(Some("2023-05-02")),
            review(Some("2023-01-15")),
            review(Some("2023-05-20")),
            review(Some("garbage")),
        ];
        let months: Vec<String> = available_months(&reviews).iter().map(|m| m.to_string()).collect();
        assert_eq!(months, vec!["2023-01", "2023-05"]);

        let products = vec![product(Some("toys")), product(Some("apparel")), product(Some(" toys ")), product(None)];
        assert_eq!(available_categories(&products), vec!["apparel", "toys"]);
    }
}
