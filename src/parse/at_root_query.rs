use std::collections::HashSet;

use crate::{ast::AtRootQuery, error::CompileResult, lexer::Lexer};

/// Parses the interpolated text of an `@at-root (with: ...)` query.
pub fn parse_at_root_query(mut toks: Lexer) -> CompileResult<AtRootQuery> {
    toks.expect_char('(')?;
    toks.skip_ws()?;

    let include = toks.eat_ident("with", false)?;
    if !include {
        toks.expect_ident("without", false)?;
    }

    toks.skip_ws()?;
    toks.expect_char(':')?;
    toks.skip_ws()?;

    let mut names = HashSet::new();

    loop {
        names.insert(toks.ident(false, false)?.to_ascii_lowercase());
        toks.skip_ws()?;

        if !toks.at_identifier() {
            break;
        }
    }

    toks.expect_char(')')?;
    toks.expect_done()?;

    Ok(AtRootQuery::new(include, names))
}
