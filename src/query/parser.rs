use crate::query::{Phrase, QueryAtom, StructuredQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    OutsidePhrase,
    InsidePhrase,
}

/// Split raw query text into phrases and basic atoms without analysis.
///
/// Tokens are whitespace separated:
/// - `"w` or `~"w` opens a phrase (`~` negates the phrase)
/// - inside a phrase, `~w` negates that atom and `w"` closes the phrase
/// - outside a phrase, `w` is a basic atom and `~w` a negated one
///
/// Quote and `~` markers are stripped from the stored words.
///
/// Two malformed-looking inputs are kept rather than dropped:
/// - a phrase still open at the end of the text is kept as if closed there,
///   not dropped
/// - `"w"` opens and closes on the same token, so it is a one-word phrase
///   instead of swallowing the tokens after it
pub fn parse_unfiltered(text: &str) -> StructuredQuery {
    let mut state = State::OutsidePhrase;
    let mut phrases = Vec::new();
    let mut basic = Vec::new();
    let mut current = Phrase::new(false);

    for token in text.split_whitespace() {
        match state {
            State::OutsidePhrase => {
                let (phrase_negated, rest) = match token.strip_prefix('~') {
                    Some(rest) if rest.starts_with('"') => (true, rest),
                    Some(rest) => {
                        basic.push(QueryAtom::new(rest, true));
                        continue;
                    }
                    None => (false, token),
                };
                match rest.strip_prefix('"') {
                    Some(body) => {
                        current = Phrase::new(phrase_negated);
                        let closes = body.ends_with('"');
                        current.atoms.push(phrase_atom(body));
                        if closes {
                            phrases.push(std::mem::replace(&mut current, Phrase::new(false)));
                        } else {
                            state = State::InsidePhrase;
                        }
                    }
                    None => basic.push(QueryAtom::new(rest, false)),
                }
            }
            State::InsidePhrase => {
                let closes = token.ends_with('"');
                current.atoms.push(phrase_atom(token));
                if closes {
                    phrases.push(std::mem::replace(&mut current, Phrase::new(false)));
                    state = State::OutsidePhrase;
                }
            }
        }
    }

    if state == State::InsidePhrase {
        phrases.push(current);
    }
    StructuredQuery::new(phrases, basic)
}

/// `~w"` -> negated `w`
fn phrase_atom(token: &str) -> QueryAtom {
    let (negated, word) = match token.strip_prefix('~') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    QueryAtom::new(word.trim_matches('"'), negated)
}
