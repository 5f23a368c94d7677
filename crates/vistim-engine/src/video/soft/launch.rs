//! Parser for textual pipeline descriptions.
//!
//! Grammar: `element ( "!" element )*` where each element is a factory name
//! followed by whitespace separated `key=value` pairs. `name=` sets the
//! instance name; unnamed elements get `<factory><index>`. Values may be
//! double quoted to contain spaces or `!`.

use crate::video::{BackendError, ElementSpec};

pub fn parse(description: &str) -> Result<Vec<ElementSpec>, BackendError> {
    let tokens = tokenize(description)?;
    let mut elements = Vec::new();
    let mut current: Option<ElementSpec> = None;

    for token in tokens {
        match token {
            Token::Bang => {
                let element = current
                    .take()
                    .ok_or_else(|| BackendError::Parse("`!` without a preceding element".into()))?;
                elements.push(element);
            }
            Token::Word(word) => {
                if current.is_none() {
                    if word.contains('=') {
                        return Err(BackendError::Parse(format!("property `{word}` before any element")));
                    }
                    let name = format!("{word}{}", elements.len());
                    current = Some(ElementSpec::new(word, name));
                    continue;
                }
                let Some(element) = current.as_mut() else {
                    continue;
                };
                match word.split_once('=') {
                    Some(("name", value)) => element.name = value.to_string(),
                    Some((key, value)) => element.props.push((key.to_string(), value.to_string())),
                    None => {
                        return Err(BackendError::Parse(format!(
                            "expected `key=value` or `!` after `{}`, found `{word}`",
                            element.factory
                        )));
                    }
                }
            }
        }
    }

    match current {
        Some(element) => elements.push(element),
        None if elements.is_empty() => return Err(BackendError::Parse("empty description".into())),
        None => return Err(BackendError::Parse("description ends with `!`".into())),
    }
    Ok(elements)
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Word(String),
    Bang,
}

fn tokenize(input: &str) -> Result<Vec<Token>, BackendError> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut quoted = false;

    let flush = |word: &mut String, tokens: &mut Vec<Token>| {
        if !word.is_empty() {
            tokens.push(Token::Word(std::mem::take(word)));
        }
    };

    for ch in input.chars() {
        match ch {
            '"' => quoted = !quoted,
            c if quoted => word.push(c),
            '!' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::Bang);
            }
            c if c.is_whitespace() => flush(&mut word, &mut tokens),
            c => word.push(c),
        }
    }
    if quoted {
        return Err(BackendError::Parse("unterminated quote".into()));
    }
    flush(&mut word, &mut tokens);
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chain_with_properties() {
        let elements = parse("videotestsrc pattern=checkers width=64 ! videoconvert").unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].factory, "videotestsrc");
        assert_eq!(elements[0].name, "videotestsrc0");
        assert_eq!(
            elements[0].props,
            vec![("pattern".to_string(), "checkers".to_string()), ("width".to_string(), "64".to_string())]
        );
        assert_eq!(elements[1].name, "videoconvert1");
    }

    #[test]
    fn name_property_renames_and_quotes_keep_spaces() {
        let elements = parse(r#"filesrc name=src location="my clip.gif"!decodebin"#).unwrap();
        assert_eq!(elements[0].name, "src");
        assert_eq!(elements[0].props, vec![("location".to_string(), "my clip.gif".to_string())]);
        assert_eq!(elements[1].factory, "decodebin");
    }

    #[test]
    fn malformed_descriptions_fail() {
        assert!(parse("").is_err());
        assert!(parse("! videotestsrc").is_err());
        assert!(parse("videotestsrc !").is_err());
        assert!(parse("width=3").is_err());
        assert!(parse("videotestsrc videoconvert").is_err());
        assert!(parse("filesrc location=\"open").is_err());
    }
}
