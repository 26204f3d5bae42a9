use crate::{ast::MediaQuery, error::CompileResult, lexer::Lexer};

/// Parses the fully-interpolated text of an `@media` query list.
pub fn parse_media_queries(mut toks: Lexer) -> CompileResult<Vec<MediaQuery>> {
    let mut queries = Vec::new();

    loop {
        toks.skip_ws()?;
        queries.push(media_query(&mut toks)?);
        toks.skip_ws()?;

        if !toks.eat_char(',') {
            break;
        }
    }

    toks.expect_done()?;

    Ok(queries)
}

fn media_query(toks: &mut Lexer) -> CompileResult<MediaQuery> {
    if toks.next_char_is('(') {
        let mut conditions = vec![condition_in_parens(toks)?];
        toks.skip_ws()?;

        let mut conjunction = true;

        if toks.eat_ident("and", false)? {
            toks.expect_ws()?;
            condition_sequence(toks, "and", &mut conditions)?;
        } else if toks.eat_ident("or", false)? {
            toks.expect_ws()?;
            conjunction = false;
            condition_sequence(toks, "or", &mut conditions)?;
        }

        return Ok(MediaQuery::condition(conditions, conjunction));
    }

    let first_word = toks.ident(false, false)?;

    if first_word.eq_ignore_ascii_case("not") {
        toks.expect_ws()?;
        if !toks.at_identifier() {
            let inner = condition_in_parens(toks)?;
            return Ok(MediaQuery::condition(
                vec![format!("(not {})", inner)],
                true,
            ));
        }
    }

    toks.skip_ws()?;

    if !toks.at_identifier() {
        return Ok(MediaQuery::media_type(Some(first_word), None, None));
    }

    let second_word = toks.ident(false, false)?;

    let (modifier, media_type);

    if second_word.eq_ignore_ascii_case("and") {
        toks.expect_ws()?;
        modifier = None;
        media_type = Some(first_word);
    } else {
        toks.skip_ws()?;
        modifier = Some(first_word);
        media_type = Some(second_word);
        if toks.eat_ident("and", false)? {
            // "@media only screen and ..."
            toks.expect_ws()?;
        } else {
            // "@media only screen {"
            return Ok(MediaQuery::media_type(media_type, modifier, None));
        }
    }

    // Either `TYPE "and"` or `MODIFIER TYPE "and"` has been consumed.

    if toks.eat_ident("not", false)? {
        // "@media screen and not (...) {"
        toks.expect_ws()?;
        let inner = condition_in_parens(toks)?;
        return Ok(MediaQuery::media_type(
            media_type,
            modifier,
            Some(vec![format!("(not {})", inner)]),
        ));
    }

    let mut conditions = Vec::new();
    condition_sequence(toks, "and", &mut conditions)?;

    Ok(MediaQuery::media_type(media_type, modifier, Some(conditions)))
}

fn condition_in_parens(toks: &mut Lexer) -> CompileResult<String> {
    toks.expect_char('(')?;
    let contents = toks.balanced_text(false)?;
    toks.expect_char(')')?;
    Ok(format!("({})", contents))
}

fn condition_sequence(
    toks: &mut Lexer,
    operator: &'static str,
    out: &mut Vec<String>,
) -> CompileResult<()> {
    loop {
        out.push(condition_in_parens(toks)?);
        toks.skip_ws()?;
        if !toks.eat_ident(operator, false)? {
            return Ok(());
        }
        toks.expect_ws()?;
    }
}
