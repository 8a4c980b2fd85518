//! Word frequencies for the dashboard word cloud.

use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Bumped whenever [`STOPWORDS`] changes, since rankings depend on it.
pub const STOPWORDS_VERSION: &str = "en-v1";

static WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+(?:['’][\p{L}\p{N}]+)*").expect("valid word regex"));

pub const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "arent", "as", "at", "be", "because", "been", "before", "being", "below", "between",
    "both", "but", "by", "can", "cant", "could", "couldnt", "did", "didnt", "do", "does",
    "doesnt", "doing", "dont", "down", "during", "each", "even", "ever", "few", "for", "from",
    "further", "get", "got", "had", "hadnt", "has", "hasnt", "have", "havent", "having", "he",
    "hed", "hell", "her", "here", "heres", "hers", "herself", "hes", "him", "himself", "his",
    "how", "hows", "however", "i", "id", "if", "ill", "im", "in", "into", "is", "isnt", "it",
    "its", "itself", "ive", "just", "lets", "me", "more", "most", "much", "my", "myself", "no",
    "nor", "not", "of", "off", "on", "once", "one", "only", "or", "other", "ought", "our",
    "ours", "ourselves", "out", "over", "own", "really", "same", "she", "shed", "shell",
    "shes", "should", "shouldnt", "so", "some", "such", "than", "that", "thats", "the",
    "their", "theirs", "them", "themselves", "then", "there", "theres", "these", "they",
    "theyd", "theyll", "theyre", "theyve", "this", "those", "through", "to", "too", "under",
    "until", "up", "us", "very", "was", "wasnt", "we", "wed", "well", "were", "werent", "weve",
    "what", "whats", "when", "whens", "where", "wheres", "which", "while", "who", "whom",
    "whos", "why", "whys", "will", "with", "wont", "would", "wouldnt", "you", "youd", "youll",
    "your", "youre", "yours", "yourself", "yourselves", "youve",
];

static STOPWORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOPWORDS.iter().copied().collect());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

/// Lowercased words of `text`. Internal apostrophes are dropped ("don't" -> "dont");
/// any other punctuation separates words.
pub fn split_words(text: &str) -> impl Iterator<Item = String> + '_ {
    WORD_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase().replace(['\'', '’'], ""))
}

pub fn is_stopword(word: &str) -> bool {
    STOPWORD_SET.contains(word)
}

/// Words that count towards the word cloud.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    split_words(text).filter(|w| {
        w.chars().count() >= 2 && !w.chars().all(|c| c.is_numeric()) && !is_stopword(w)
    })
}

/// Top `k` tokens across `texts`, by count descending. Ties keep the order in
/// which the tokens first appeared.
pub fn top_words<'a, I>(texts: I, k: usize) -> Vec<WordCount>
where
    I: IntoIterator<Item = &'a str>,
{
    // word -> (count, first occurrence)
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut position = 0usize;
    for text in texts {
        for token in tokenize(text) {
            counts
                .entry(token)
                .and_modify(|(count, _)| *count += 1)
                .or_insert((1, position));
            position += 1;
        }
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked.truncate(k);
    ranked
        .into_iter()
        .map(|(word, count, _)| WordCount { word, count })
        .collect()
}
