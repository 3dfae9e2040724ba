//! Text normalization and tokenization for similarity scoring.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use storymap_core::Language;

static PUNCTUATION_REGEX: OnceLock<Regex> = OnceLock::new();
static WHITESPACE_REGEX: OnceLock<Regex> = OnceLock::new();
/// Word tokens of at least two characters
static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();

fn punctuation_regex() -> &'static Regex {
    PUNCTUATION_REGEX.get_or_init(|| Regex::new(r"[^\w\s]").expect("Invalid regex pattern"))
}

fn whitespace_regex() -> &'static Regex {
    WHITESPACE_REGEX.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"))
}

fn token_regex() -> &'static Regex {
    TOKEN_REGEX.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("Invalid regex pattern"))
}

const ENGLISH: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been", "before", "being",
    "but", "by", "can", "could", "do", "does", "each", "for", "from", "get", "had", "has", "have", "he", "her",
    "his", "how", "i", "if", "in", "into", "is", "it", "its", "me", "more", "my", "no", "not", "of", "on", "only",
    "or", "other", "our", "out", "she", "should", "so", "some", "such", "than", "that", "the", "their", "them",
    "then", "there", "these", "they", "this", "those", "to", "up", "us", "was", "we", "were", "what", "when",
    "which", "who", "will", "with", "would", "you", "your",
    // user story filler
    "able", "user", "users", "system", "want", "wants", "need", "needs",
];

const RUSSIAN: &[&str] = &[
    "и", "в", "во", "не", "что", "он", "на", "я", "с", "со", "как", "а", "то", "все", "она", "так", "его", "но",
    "да", "ты", "к", "у", "же", "вы", "за", "бы", "по", "только", "ее", "мне", "было", "вот", "от", "меня", "еще",
    "нет", "о", "из", "ему", "теперь", "когда", "даже", "ну", "вдруг", "ли", "если", "уже", "или", "ни", "быть",
    "был", "него", "до", "вас", "нибудь", "опять", "уж", "вам", "ведь", "там", "потом", "себя", "ничего", "ей",
    "может", "они", "тут", "где", "есть", "надо", "ней", "для", "мы", "тебя", "их", "чем", "была", "сам", "чтоб",
    "без", "будто", "чего", "раз", "тоже", "себе", "под", "будет", "ж", "тогда", "кто", "этот", "того", "потому",
    "этого", "какой", "совсем", "ним", "здесь", "этом", "один", "почти", "мой", "тем", "чтобы", "нее", "сейчас",
    "были", "куда", "зачем", "всех", "никогда", "можно", "при", "наконец", "два", "об", "другой", "хоть", "после",
    "над", "больше", "тот", "через", "эти", "нас", "про", "всего", "них", "какая", "много", "разве", "три", "эту",
    "моя", "впрочем", "хорошо", "свою", "этой", "перед", "иногда", "лучше", "чуть", "том", "нельзя", "такой",
    "им", "более", "всегда", "конечно", "всю", "между",
    // user story filler
    "хочу", "могу", "пользователь", "система", "должен", "должна",
];

/// Stop words for one or more languages.
#[derive(Debug, Clone)]
pub struct StopWords {
    words: HashSet<&'static str>,
}

impl StopWords {
    pub fn for_language(language: Language) -> Self {
        let list = match language {
            Language::English => ENGLISH,
            Language::Russian => RUSSIAN,
        };
        Self { words: list.iter().copied().collect() }
    }

    /// English and Russian combined, for maps of unknown language.
    pub fn all() -> Self {
        Self { words: ENGLISH.iter().chain(RUSSIAN).copied().collect() }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }
}

impl Default for StopWords {
    fn default() -> Self {
        Self::all()
    }
}

/// Lowercase, replace punctuation with spaces and collapse whitespace.
///
/// ```rust
/// use storymap_quality::similarity::text::normalize;
///
/// assert_eq!(normalize("  Add-to-Cart,  NOW! "), "add to cart now");
/// ```
pub fn normalize(text: &str) -> String {
    let lower = text.to_lowercase();
    let stripped = punctuation_regex().replace_all(&lower, " ");
    whitespace_regex().replace_all(stripped.trim(), " ").into_owned()
}

/// Word tokens of two or more characters, stop words removed.
pub fn tokens<'a>(normalized: &'a str, stop_words: &'a StopWords) -> impl Iterator<Item = &'a str> + 'a {
    token_regex().find_iter(normalized).map(|m| m.as_str()).filter(move |t| !stop_words.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_drop_stop_words_and_single_chars() {
        let stop = StopWords::all();
        let text = normalize("As a user, I want to pay by card so that I can checkout");
        let found: Vec<_> = tokens(&text, &stop).collect();
        assert_eq!(found, vec!["pay", "card", "checkout"]);
    }

    #[test]
    fn test_russian_filler_words() {
        let stop = StopWords::for_language(Language::Russian);
        let text = normalize("Как пользователь, я хочу оплатить заказ картой");
        let found: Vec<_> = tokens(&text, &stop).collect();
        assert_eq!(found, vec!["оплатить", "заказ", "картой"]);
    }
}
