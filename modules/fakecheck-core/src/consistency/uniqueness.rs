//! Internal sentence similarity of a single document.
//!
//! Sentences are vectorized with TF-IDF (fit on the document's own sentences)
//! and the score is the mean pairwise cosine similarity, excluding each
//! sentence's similarity with itself.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

/// Vocabulary cap, keeping the most frequent terms.
const MAX_FEATURES: usize = 5000;

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "an",
    "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere", "are",
    "around", "as", "at", "back", "be", "became", "because", "become", "becomes", "becoming",
    "been", "before", "beforehand", "behind", "being", "below", "beside", "besides", "between",
    "beyond", "both", "but", "by", "can", "cannot", "could", "did", "do", "does", "done", "down",
    "due", "during", "each", "eg", "either", "else", "elsewhere", "enough", "etc", "even", "ever",
    "every", "everyone", "everything", "everywhere", "except", "few", "for", "former", "formerly",
    "from", "further", "had", "has", "have", "he", "hence", "her", "here", "hereafter", "hereby",
    "herein", "hers", "herself", "him", "himself", "his", "how", "however", "ie", "if", "in",
    "indeed", "into", "is", "it", "its", "itself", "just", "last", "latter", "latterly", "least",
    "less", "many", "may", "me", "meanwhile", "might", "mine", "more", "moreover", "most",
    "mostly", "much", "must", "my", "myself", "namely", "neither", "never", "nevertheless",
    "next", "no", "nobody", "none", "noone", "nor", "not", "nothing", "now", "nowhere", "of",
    "off", "often", "on", "once", "one", "only", "onto", "or", "other", "others", "otherwise",
    "our", "ours", "ourselves", "out", "over", "own", "per", "perhaps", "please", "rather", "re",
    "same", "see", "seem", "seemed", "seeming", "seems", "several", "she", "should", "since",
    "so", "some", "somehow", "someone", "something", "sometime", "sometimes", "somewhere",
    "still", "such", "than", "that", "the", "their", "them", "themselves", "then", "thence",
    "there", "thereafter", "thereby", "therefore", "therein", "thereupon", "these", "they",
    "this", "those", "though", "through", "throughout", "thru", "thus", "to", "together", "too",
    "toward", "towards", "under", "until", "up", "upon", "us", "very", "via", "was", "we", "well",
    "were", "what", "whatever", "when", "whence", "whenever", "where", "whereafter", "whereas",
    "whereby", "wherein", "whereupon", "wherever", "whether", "which", "while", "whither", "who",
    "whoever", "whole", "whom", "whose", "why", "will", "with", "within", "without", "would",
    "yet", "you", "your", "yours", "yourself", "yourselves",
];

fn token_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("static token regex"))
}

fn stop_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

/// Mean off-diagonal cosine similarity of the document's sentences, in [0, 1].
/// Zero for documents with fewer than two sentences or no usable terms.
pub fn uniqueness_score(text: &str) -> f64 {
    let sentences = split_sentences(text);
    let n = sentences.len();
    if n < 2 {
        return 0.0;
    }

    let vectors = tfidf_vectors(&sentences);
    if vectors.iter().all(|v| v.is_empty()) {
        return 0.0;
    }

    let mut total = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            total += 2.0 * sparse_dot(&vectors[i], &vectors[j]);
        }
    }
    let pairs = (n * (n - 1)) as f64;
    (total / pairs).clamp(0.0, 1.0)
}

/// Split on whitespace that follows `.` or `?`, unless the terminator
/// closes an initialism (`e.g.`, `U.S.`) or a title abbreviation (`Mr.`, `Dr.`).
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0;

    for i in 1..chars.len() {
        if !chars[i].is_whitespace() || !matches!(chars[i - 1], '.' | '?') {
            continue;
        }
        if is_abbreviation(&chars[..i]) {
            continue;
        }
        push_sentence(&mut sentences, &chars[start..i]);
        start = i + 1;
    }
    if start < chars.len() {
        push_sentence(&mut sentences, &chars[start..]);
    }
    sentences
}

fn push_sentence(out: &mut Vec<String>, chars: &[char]) {
    let sentence: String = chars.iter().collect();
    let trimmed = sentence.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_abbreviation(before: &[char]) -> bool {
    let n = before.len();
    // x.y. style initialism
    if n >= 4 && is_word_char(before[n - 4]) && before[n - 3] == '.' && is_word_char(before[n - 2]) {
        return true;
    }
    // Xx. style title
    n >= 3 && before[n - 1] == '.' && before[n - 3].is_uppercase() && before[n - 2].is_lowercase()
}

fn tokenize(sentence: &str) -> Vec<String> {
    let lower = sentence.to_lowercase();
    let stop = stop_words();
    token_pattern()
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| !stop.contains(t))
        .map(str::to_string)
        .collect()
}

/// Sparse, L2-normalized TF-IDF vectors (term index -> weight), one per sentence.
/// Uses smoothed idf: `ln((1 + n) / (1 + df)) + 1`.
fn tfidf_vectors(sentences: &[String]) -> Vec<HashMap<usize, f64>> {
    let tokenized: Vec<Vec<String>> = sentences.iter().map(|s| tokenize(s)).collect();

    let mut frequency: HashMap<&str, usize> = HashMap::new();
    for tokens in &tokenized {
        for t in tokens {
            *frequency.entry(t.as_str()).or_insert(0) += 1;
        }
    }

    let mut terms: Vec<(&str, usize)> = frequency.into_iter().collect();
    terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    terms.truncate(MAX_FEATURES);
    let vocabulary: HashMap<&str, usize> = terms
        .iter()
        .enumerate()
        .map(|(i, (t, _))| (*t, i))
        .collect();

    let mut document_frequency = vec![0usize; vocabulary.len()];
    let counts: Vec<HashMap<usize, f64>> = tokenized
        .iter()
        .map(|tokens| {
            let mut tf: HashMap<usize, f64> = HashMap::new();
            for t in tokens {
                if let Some(&idx) = vocabulary.get(t.as_str()) {
                    *tf.entry(idx).or_insert(0.0) += 1.0;
                }
            }
            for idx in tf.keys() {
                document_frequency[*idx] += 1;
            }
            tf
        })
        .collect();

    let n = sentences.len() as f64;
    let idf: Vec<f64> = document_frequency
        .iter()
        .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
        .collect();

    counts
        .into_iter()
        .map(|tf| {
            let mut v: HashMap<usize, f64> =
                tf.into_iter().map(|(i, c)| (i, c * idf[i])).collect();
            let norm = v.values().map(|x| x * x).sum::<f64>().sqrt();
            if norm > 0.0 {
                for x in v.values_mut() {
                    *x /= norm;
                }
            }
            v
        })
        .collect()
}

fn sparse_dot(a: &HashMap<usize, f64>, b: &HashMap<usize, f64>) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(i, x)| large.get(i).map(|y| x * y))
        .sum()
}
