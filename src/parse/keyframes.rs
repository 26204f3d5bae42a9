use crate::{
    ast::KeyframesSelector,
    error::CompileResult,
    lexer::{Lexer, Token},
};

/// Parses the selector of a rule inside `@keyframes`: `from`, `to`, or a
/// comma-separated list of percentages.
pub fn parse_keyframes_selectors(mut toks: Lexer) -> CompileResult<Vec<KeyframesSelector>> {
    let mut selectors = Vec::new();

    loop {
        toks.skip_ws()?;

        if toks.at_identifier() {
            if toks.eat_ident("to", false)? {
                selectors.push(KeyframesSelector::To);
            } else if toks.eat_ident("from", false)? {
                selectors.push(KeyframesSelector::From);
            } else {
                return Err(("Expected \"to\" or \"from\".", toks.current_span()).into());
            }
        } else {
            selectors.push(percentage_selector(&mut toks)?);
        }

        toks.skip_ws()?;

        if !toks.eat_char(',') {
            break;
        }
    }

    Ok(selectors)
}

fn percentage_selector(toks: &mut Lexer) -> CompileResult<KeyframesSelector> {
    let mut number = String::new();

    if toks.eat_char('+') {
        number.push('+');
    }

    if !matches!(
        toks.peek(),
        Some(Token {
            kind: '0'..='9' | '.',
            ..
        })
    ) {
        return Err(("Expected number.", toks.current_span()).into());
    }

    digits_into(toks, &mut number);

    if toks.eat_char('.') {
        number.push('.');
        digits_into(toks, &mut number);
    }

    if toks.eat_ident_char('e', false)? {
        number.push('e');

        if matches!(
            toks.peek(),
            Some(Token {
                kind: '+' | '-',
                ..
            })
        ) {
            number.push(toks.next().unwrap().kind);
        }

        if !matches!(toks.peek(), Some(Token { kind: '0'..='9', .. })) {
            return Err(("Expected digit.", toks.current_span()).into());
        }

        digits_into(toks, &mut number);
    }

    toks.expect_char('%')?;

    Ok(KeyframesSelector::Percent(number.into_boxed_str()))
}

fn digits_into(toks: &mut Lexer, buffer: &mut String) {
    while matches!(toks.peek(), Some(Token { kind: '0'..='9', .. })) {
        buffer.push(toks.next().unwrap().kind);
    }
}
