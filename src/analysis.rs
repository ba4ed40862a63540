use std::collections::HashSet;

/// Text analysis collaborator.
///
/// Turns text into the ordered token stream used both for query atoms and
/// for document statistics. Any external analyzer can be plugged in; a
/// closure `Fn(&str) -> Vec<String>` works too.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

impl<F> Tokenizer for F
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    fn tokenize(&self, text: &str) -> Vec<String> {
        self(text)
    }
}

/// Lowercasing tokenizer that splits on anything not alphanumeric.
///
/// Close to a standard search analyzer without stemming: `"Big-House's"`
/// becomes `["big", "house", "s"]`. Optional stop words are dropped after
/// lowercasing; tokens longer than `max_token_len` chars are skipped.
#[derive(Debug, Clone)]
pub struct StandardTokenizer {
    stop_words: HashSet<String>,
    max_token_len: usize,
}

impl Default for StandardTokenizer {
    fn default() -> Self {
        Self {
            stop_words: HashSet::new(),
            max_token_len: 255,
        }
    }
}

impl StandardTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stop_words = words
            .into_iter()
            .map(|w| w.as_ref().to_lowercase())
            .collect();
        self
    }

    pub fn with_max_token_len(mut self, max_token_len: usize) -> Self {
        self.max_token_len = max_token_len;
        self
    }
}

impl Tokenizer for StandardTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|raw| !raw.is_empty())
            .map(|raw| raw.to_lowercase())
            .filter(|tok| tok.chars().count() <= self.max_token_len)
            .filter(|tok| !self.stop_words.contains(tok))
            .collect()
    }
}
