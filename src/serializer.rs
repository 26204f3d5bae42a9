use codemap::{CodeMap, Span};

use crate::{
    ast::{CssStmt, MediaQuery, Style, SupportsRule, UnknownAtRule},
    color::{Color, ColorFormat, NAMED_COLORS},
    common::{Brackets, ListSeparator, QuoteKind},
    error::CompileResult,
    selector::{
        Combinator, ComplexSelector, ComplexSelectorComponent, CompoundSelector, Namespace, Pseudo,
        SelectorList, SimpleSelector,
    },
    utils::hex_char_for,
    value::{fuzzy_equals, ArgList, Dimension, Function, Value, ValueMap},
    Options, OutputStyle,
};

/// One recorded correspondence between a byte offset of the output and a
/// span of the input, feeding the source map.
#[derive(Debug, Clone, Copy)]
pub struct SourceMapping {
    pub offset: usize,
    pub span: Span,
}

/// What the writer is producing: CSS output, or the `inspect()` form that
/// parses back to the same value (maps, nulls, quoted strings).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Css,
    Inspect,
}

/// Blank-line and semicolon bookkeeping between top-level statements.
#[derive(Debug, Default, Clone, Copy)]
struct GroupState {
    wrote_any: bool,
    open_semicolon: bool,
    after_group_end: bool,
}

/// Serializes a full resolved tree, returning the CSS text and the source
/// mappings gathered along the way.
pub(crate) fn render(
    stmts: Vec<CssStmt>,
    options: &Options,
    map: &CodeMap,
    span: Span,
    allows_charset: bool,
) -> CompileResult<(String, Vec<SourceMapping>)> {
    let mut css = CssWriter::new(options, map, Mode::Css, span);
    let mut state = GroupState::default();

    for stmt in stmts {
        if stmt.is_invisible() {
            continue;
        }

        let ends_group = stmt.is_group_end();
        let wants_semicolon = CssWriter::needs_semicolon(&stmt);

        if state.open_semicolon {
            css.out.push(';');
        }

        if state.wrote_any {
            css.newline();
            if state.after_group_end && !css.compressed() {
                css.out.push('\n');
            }
        }

        css.write_stmt(stmt)?;

        state = GroupState {
            wrote_any: true,
            open_semicolon: wants_semicolon,
            after_group_end: ends_group,
        };
    }

    Ok(css.into_document(state, allows_charset))
}

pub(crate) fn serialize_value(val: &Value, options: &Options, span: Span) -> CompileResult<String> {
    let map = CodeMap::new();
    let mut css = CssWriter::new(options, &map, Mode::Css, span);

    css.write_value(val, span)?;

    Ok(css.out)
}

pub(crate) fn inspect_value(val: &Value, options: &Options, span: Span) -> CompileResult<String> {
    let map = CodeMap::new();
    let mut css = CssWriter::new(options, &map, Mode::Inspect, span);

    css.write_value(val, span)?;

    Ok(css.out)
}

pub(crate) fn inspect_dimension(
    dimension: &Dimension,
    options: &Options,
    span: Span,
) -> CompileResult<String> {
    let map = CodeMap::new();
    let mut css = CssWriter::new(options, &map, Mode::Inspect, span);

    css.write_dimension(dimension)?;

    Ok(css.out)
}

pub(crate) fn inspect_map(map: &ValueMap, options: &Options, span: Span) -> CompileResult<String> {
    let code_map = CodeMap::new();
    let mut css = CssWriter::new(options, &code_map, Mode::Inspect, span);

    css.write_map(map, span)?;

    Ok(css.out)
}

pub(crate) fn inspect_function_ref(
    func: &Function,
    options: &Options,
    span: Span,
) -> CompileResult<String> {
    let code_map = CodeMap::new();
    let mut css = CssWriter::new(options, &code_map, Mode::Inspect, span);

    css.write_function_ref(func, span)?;

    Ok(css.out)
}

/// How a color will be spelled, decided before any text is emitted.
enum ColorForm<'a> {
    Name(&'static str),
    ShortHex(u8, u8, u8),
    LongHex(u8, u8, u8),
    RgbFunction,
    Literal(&'a str),
}

struct CssWriter<'a> {
    out: String,
    mappings: Vec<SourceMapping>,
    options: &'a Options<'a>,
    mode: Mode,
    /// Indentation in levels, two spaces each.
    indent: usize,
    map: &'a CodeMap,
    span: Span,
}

impl<'a> CssWriter<'a> {
    fn new(options: &'a Options<'a>, map: &'a CodeMap, mode: Mode, span: Span) -> Self {
        Self {
            out: String::new(),
            mappings: Vec::new(),
            options,
            mode,
            indent: 0,
            map,
            span,
        }
    }

    fn inspecting(&self) -> bool {
        self.mode == Mode::Inspect
    }

    fn compressed(&self) -> bool {
        self.options.style == OutputStyle::Compressed
    }

    fn mark(&mut self, span: Span) {
        self.mappings.push(SourceMapping {
            offset: self.out.len(),
            span,
        });
    }

    fn indentation(&mut self) {
        match self.options.style {
            OutputStyle::Compressed | OutputStyle::Compact => {}
            OutputStyle::Expanded | OutputStyle::Nested => {
                for _ in 0..self.indent {
                    self.out.push_str("  ");
                }
            }
        }
    }

    fn space(&mut self) {
        if !self.compressed() {
            self.out.push(' ');
        }
    }

    fn newline(&mut self) {
        if !self.compressed() {
            self.out.push('\n');
        }
    }

    fn into_document(mut self, state: GroupState, allows_charset: bool) -> (String, Vec<SourceMapping>) {
        let has_non_ascii = self.out.bytes().any(|b| !b.is_ascii());

        if state.open_semicolon && !self.compressed() {
            self.out.push(';');
        }

        if !self.out.is_empty() {
            self.newline();
        }

        let mut prefix_len = 0;

        if has_non_ascii && allows_charset {
            if self.compressed() {
                self.out.insert(0, '\u{FEFF}');
                prefix_len = '\u{FEFF}'.len_utf8();
            } else {
                let charset = "@charset \"UTF-8\";\n";
                self.out.insert_str(0, charset);
                prefix_len = charset.len();
            }
        }

        for mapping in &mut self.mappings {
            mapping.offset += prefix_len;
        }

        (self.out, self.mappings)
    }

    // ===================== selectors =====================

    fn write_namespace(&mut self, namespace: &Namespace) {
        match namespace {
            Namespace::Empty => self.out.push('|'),
            Namespace::Asterisk => self.out.push_str("*|"),
            Namespace::Other(namespace) => {
                self.out.push_str(namespace);
                self.out.push('|');
            }
            Namespace::None => {}
        }
    }

    fn write_pseudo(&mut self, pseudo: &Pseudo) {
        if let Some(sel) = &pseudo.selector {
            if pseudo.name == "not" && sel.is_invisible() {
                return;
            }
        }

        self.out.push(':');
        if !pseudo.is_syntactic_class {
            self.out.push(':');
        }
        self.out.push_str(&pseudo.name);

        if pseudo.argument.is_none() && pseudo.selector.is_none() {
            return;
        }

        self.out.push('(');

        if let Some(arg) = &pseudo.argument {
            self.out.push_str(arg);
            if pseudo.selector.is_some() {
                self.out.push(' ');
            }
        }

        if let Some(sel) = &pseudo.selector {
            self.write_selector_list(sel);
        }

        self.out.push(')');
    }

    fn write_simple(&mut self, simple: &SimpleSelector) {
        match simple {
            SimpleSelector::Id(name) => {
                self.out.push('#');
                self.out.push_str(name);
            }
            SimpleSelector::Class(name) => {
                self.out.push('.');
                self.out.push_str(name);
            }
            SimpleSelector::Placeholder(name) => {
                self.out.push('%');
                self.out.push_str(name);
            }
            SimpleSelector::Universal(namespace) => {
                self.write_namespace(namespace);
                self.out.push('*');
            }
            SimpleSelector::Pseudo(pseudo) => self.write_pseudo(pseudo),
            SimpleSelector::Type(name) => {
                self.write_namespace(&name.namespace);
                self.out.push_str(&name.ident);
            }
            SimpleSelector::Attribute(attr) => self.out.push_str(&attr.to_string()),
            SimpleSelector::Parent(..) => unreachable!("`&` should never be serialized"),
        }
    }

    fn write_compound(&mut self, compound: &CompoundSelector) {
        let start = self.out.len();

        for simple in &compound.components {
            self.write_simple(simple);
        }

        // Everything in the compound was invisible-but-matching; emit the
        // universal selector rather than nothing.
        if self.out.len() == start {
            self.out.push('*');
        }
    }

    fn write_complex(&mut self, complex: &ComplexSelector) {
        for (i, component) in complex.components.iter().enumerate() {
            if i > 0 {
                self.out.push(' ');
            }

            match component {
                ComplexSelectorComponent::Combinator(Combinator::NextSibling) => {
                    self.out.push('+');
                }
                ComplexSelectorComponent::Combinator(Combinator::Child) => self.out.push('>'),
                ComplexSelectorComponent::Combinator(Combinator::FollowingSibling) => {
                    self.out.push('~');
                }
                ComplexSelectorComponent::Compound(compound) => self.write_compound(compound),
            }
        }
    }

    fn write_selector_list(&mut self, list: &SelectorList) {
        let mut first = true;

        for complex in &list.components {
            if complex.is_invisible() {
                continue;
            }

            if !first {
                self.out.push(',');
                match self.options.style {
                    OutputStyle::Compressed => {}
                    OutputStyle::Compact => self.out.push(' '),
                    OutputStyle::Expanded | OutputStyle::Nested => {
                        self.out.push('\n');
                        self.indentation();
                    }
                }
            }
            first = false;

            self.write_complex(complex);
        }
    }

    // ===================== values =====================

    fn color_form<'c>(&self, color: &'c Color) -> ColorForm<'c> {
        let red = color.red().0.round() as u8;
        let green = color.green().0.round() as u8;
        let blue = color.blue().0.round() as u8;

        let opaque = fuzzy_equals(color.alpha().0, 1.0);

        let name = if opaque {
            NAMED_COLORS.get_by_rgba([red, green, blue])
        } else {
            None
        };

        let symmetrical =
            |c: u8| -> bool { c & 0xF == c >> 4 };
        let can_shorten = symmetrical(red) && symmetrical(green) && symmetrical(blue);

        if self.compressed() {
            if !opaque {
                return ColorForm::RgbFunction;
            }

            let hex_len = if can_shorten { 4 } else { 7 };
            return match name {
                Some(name) if name.len() <= hex_len => ColorForm::Name(name),
                _ if can_shorten => ColorForm::ShortHex(red, green, blue),
                _ => ColorForm::LongHex(red, green, blue),
            };
        }

        if let ColorFormat::Literal(text) = &color.format {
            return ColorForm::Literal(text);
        }

        // Generated transparent colors always use rgba notation; some
        // browsers mishandle the `transparent` keyword in gradients.
        match name {
            Some(name) if !fuzzy_equals(color.alpha().0, 0.0) => ColorForm::Name(name),
            _ if opaque => ColorForm::LongHex(red, green, blue),
            _ => ColorForm::RgbFunction,
        }
    }

    fn write_color(&mut self, color: &Color) {
        match self.color_form(color) {
            ColorForm::Name(name) => self.out.push_str(name),
            ColorForm::ShortHex(r, g, b) => {
                self.out.push('#');
                self.out.push(hex_char_for(u32::from(r) & 0xF));
                self.out.push(hex_char_for(u32::from(g) & 0xF));
                self.out.push(hex_char_for(u32::from(b) & 0xF));
            }
            ColorForm::LongHex(r, g, b) => {
                self.out.push('#');
                self.write_hex_pair(u32::from(r));
                self.write_hex_pair(u32::from(g));
                self.write_hex_pair(u32::from(b));
            }
            ColorForm::RgbFunction => self.write_rgb_function(color),
            ColorForm::Literal(text) => self.out.push_str(text),
        }
    }

    fn write_hex_pair(&mut self, channel: u32) {
        debug_assert!(channel < 256);
        self.out.push(hex_char_for(channel >> 4));
        self.out.push(hex_char_for(channel & 0xF));
    }

    fn write_rgb_function(&mut self, color: &Color) {
        let opaque = fuzzy_equals(color.alpha().0, 1.0);

        self.out.push_str(if opaque { "rgb(" } else { "rgba(" });
        self.write_number(color.red().0);
        self.out.push(',');
        self.space();
        self.write_number(color.green().0);
        self.out.push(',');
        self.space();
        self.write_number(color.blue().0);

        if !opaque {
            self.out.push(',');
            self.space();
            self.write_number(color.alpha().0);
        }

        self.out.push(')');
    }

    fn write_dimension(&mut self, dimension: &Dimension) -> CompileResult<()> {
        if let Some(as_slash) = &dimension.as_slash {
            self.write_dimension(&as_slash.0)?;
            self.out.push('/');
            self.write_dimension(&as_slash.1)?;
            return Ok(());
        }

        if !self.inspecting() && dimension.unit.is_complex() {
            return Err((
                format!(
                    "{} isn't a valid CSS value.",
                    inspect_dimension(dimension, self.options, self.span)?
                ),
                self.span,
            )
                .into());
        }

        self.write_number(dimension.num.0);
        self.out.push_str(&dimension.unit.to_string());

        Ok(())
    }

    fn write_number(&mut self, number: f64) {
        if number.is_infinite() {
            self.out
                .push_str(if number.is_sign_negative() { "-Infinity" } else { "Infinity" });
            return;
        }

        let negative = number < 0.0;
        let rendered = format!("{:.*}", self.options.precision, number.abs());
        let mut rendered = rendered.trim_end_matches('0').trim_end_matches('.');

        // `0.5` compresses to `.5`.
        if self.compressed() && number.abs() < 1.0 {
            rendered = rendered.strip_prefix('0').unwrap_or(rendered);
        }

        if rendered.is_empty() || rendered == "0" {
            self.out.push('0');
            return;
        }

        if negative {
            self.out.push('-');
        }
        self.out.push_str(rendered);
    }

    fn write_separator(&mut self, sep: ListSeparator) {
        match sep {
            ListSeparator::Space | ListSeparator::Undecided => self.out.push(' '),
            ListSeparator::Comma => {
                self.out.push(',');
                self.space();
            }
            ListSeparator::Slash => {
                self.space();
                self.out.push('/');
                self.space();
            }
        }
    }

    fn elem_needs_parens(sep: ListSeparator, elem: &Value) -> bool {
        match elem {
            Value::List(elems, inner_sep, brackets) => {
                if elems.len() < 2 || *brackets == Brackets::Bracketed {
                    return false;
                }

                match sep {
                    ListSeparator::Comma => *inner_sep == ListSeparator::Comma,
                    ListSeparator::Slash => {
                        *inner_sep == ListSeparator::Comma || *inner_sep == ListSeparator::Slash
                    }
                    _ => *inner_sep != ListSeparator::Undecided,
                }
            }
            _ => false,
        }
    }

    fn write_list(
        &mut self,
        all_elems: &[Value],
        sep: ListSeparator,
        brackets: Brackets,
        span: Span,
    ) -> CompileResult<()> {
        let bracketed = brackets == Brackets::Bracketed;

        if bracketed {
            self.out.push('[');
        } else if all_elems.is_empty() {
            if !self.inspecting() {
                return Err(("() isn't a valid CSS value.", span).into());
            }

            self.out.push_str("()");
            return Ok(());
        }

        // `inspect()` keeps blank elements so the result parses back.
        let elems: Vec<&Value> = if self.inspecting() {
            all_elems.iter().collect()
        } else {
            all_elems.iter().filter(|elem| !elem.is_blank()).collect()
        };

        let singleton = self.inspecting()
            && all_elems.len() == 1
            && matches!(sep, ListSeparator::Comma | ListSeparator::Slash);

        if singleton && !bracketed {
            self.out.push('(');
        }

        for (i, elem) in elems.iter().enumerate() {
            if i > 0 {
                self.write_separator(sep);
            }

            let parens = self.inspecting() && Self::elem_needs_parens(sep, elem);
            if parens {
                self.out.push('(');
            }
            self.write_value(elem, span)?;
            if parens {
                self.out.push(')');
            }
        }

        if singleton {
            self.out.push(match sep {
                ListSeparator::Comma => ',',
                ListSeparator::Slash => '/',
                _ => unreachable!(),
            });

            if !bracketed {
                self.out.push(')');
            }
        }

        if bracketed {
            self.out.push(']');
        }

        Ok(())
    }

    fn write_map_entry_half(&mut self, value: &Value, span: Span) -> CompileResult<()> {
        let parens = matches!(value, Value::List(_, ListSeparator::Comma, Brackets::None));

        if parens {
            self.out.push('(');
        }
        self.write_value(value, span)?;
        if parens {
            self.out.push(')');
        }

        Ok(())
    }

    fn write_map(&mut self, map: &ValueMap, span: Span) -> CompileResult<()> {
        if !self.inspecting() {
            return Err((
                format!(
                    "{} isn't a valid CSS value.",
                    inspect_map(map, self.options, span)?
                ),
                span,
            )
                .into());
        }

        self.out.push('(');

        for (i, (key, value)) in map.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }

            self.write_map_entry_half(&key.node, key.span)?;
            self.out.push_str(": ");
            self.write_map_entry_half(value, key.span)?;
        }

        self.out.push(')');

        Ok(())
    }

    fn write_unquoted_string(&mut self, string: &str) {
        self.out.reserve(string.len());

        let mut after_newline = false;

        for c in string.chars() {
            match c {
                '\n' => {
                    self.out.push(' ');
                    after_newline = true;
                }
                ' ' => {
                    if !after_newline {
                        self.out.push(' ');
                    }
                }
                _ => {
                    self.out.push(c);
                    after_newline = false;
                }
            }
        }
    }

    /// Chooses the quote character up front: double quotes, unless the
    /// string contains a double quote and no single quote.
    fn preferred_quote(string: &str) -> char {
        let mut has_double = false;

        for c in string.chars() {
            match c {
                '\'' => return '"',
                '"' => has_double = true,
                _ => {}
            }
        }

        if has_double {
            '\''
        } else {
            '"'
        }
    }

    fn write_quoted_string(&mut self, string: &str) {
        let quote = Self::preferred_quote(string);

        self.out.push(quote);

        let mut chars = string.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '"' if quote == '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\x00'..='\x08' | '\x0A'..='\x1F' => {
                    self.out.push('\\');
                    let code = c as u32;
                    if code > 0xF {
                        self.out.push(hex_char_for(code >> 4));
                    }
                    self.out.push(hex_char_for(code & 0xF));

                    // A following hex digit or space would be read as part
                    // of the escape; pad with a space.
                    if let Some(&next) = chars.peek() {
                        if next.is_ascii_hexdigit() || next == ' ' || next == '\t' {
                            self.out.push(' ');
                        }
                    }
                }
                _ => self.out.push(c),
            }
        }

        self.out.push(quote);
    }

    fn write_function_ref(&mut self, func: &Function, span: Span) -> CompileResult<()> {
        if !self.inspecting() {
            return Err((
                format!(
                    "{} isn't a valid CSS value.",
                    inspect_function_ref(func, self.options, span)?
                ),
                span,
            )
                .into());
        }

        self.out.push_str("get-function(");
        self.write_quoted_string(func.name().as_str());
        self.out.push(')');

        Ok(())
    }

    fn write_arglist(&mut self, arglist: &ArgList, span: Span) -> CompileResult<()> {
        self.write_list(&arglist.elems, ListSeparator::Comma, Brackets::None, span)
    }

    fn write_value(&mut self, value: &Value, span: Span) -> CompileResult<()> {
        match value {
            Value::Dimension(dimension) => self.write_dimension(dimension)?,
            Value::Color(color) => self.write_color(color),
            Value::List(elems, sep, brackets) => self.write_list(elems, *sep, *brackets, span)?,
            Value::True => self.out.push_str("true"),
            Value::False => self.out.push_str("false"),
            Value::Null => {
                if self.inspecting() {
                    self.out.push_str("null");
                }
            }
            Value::Map(map) => self.write_map(map, span)?,
            Value::FunctionRef(func) => self.write_function_ref(func, span)?,
            Value::MixinRef(mixin) => {
                if !self.inspecting() {
                    return Err((
                        format!("get-mixin(\"{}\") isn't a valid CSS value.", mixin.name),
                        span,
                    )
                        .into());
                }

                self.out.push_str("get-mixin(");
                self.write_quoted_string(mixin.name.as_str());
                self.out.push(')');
            }
            Value::String(s, QuoteKind::Quoted) => self.write_quoted_string(s),
            Value::String(s, QuoteKind::None) => self.write_unquoted_string(s),
            Value::ArgList(arglist) => self.write_arglist(arglist, span)?,
        }

        Ok(())
    }

    // ===================== statements =====================

    fn needs_semicolon(stmt: &CssStmt) -> bool {
        match stmt {
            CssStmt::Style(_) | CssStmt::Import(..) => true,
            CssStmt::UnknownAtRule(rule, _) => !rule.has_body,
            _ => false,
        }
    }

    /// Writes `children` surrounded by braces, following the active style's
    /// layout: expanded puts each child on its own line; nested additionally
    /// hangs the closing brace on the final child; compact lays everything
    /// on one line.
    fn write_block(&mut self, mut children: Vec<CssStmt>) -> CompileResult<()> {
        match self.options.style {
            OutputStyle::Compressed => self.out.push('{'),
            OutputStyle::Compact => self.out.push_str(" { "),
            OutputStyle::Expanded | OutputStyle::Nested => self.out.push_str(" {\n"),
        }

        self.indent += 1;

        let last = children.pop();

        for child in children {
            let semicolon = Self::needs_semicolon(&child);

            if !self.write_stmt(child)? {
                continue;
            }

            if semicolon {
                self.out.push(';');
            }

            if self.options.style == OutputStyle::Compact {
                self.out.push(' ');
            } else {
                self.newline();
            }
        }

        if let Some(last) = last {
            let semicolon = Self::needs_semicolon(&last);

            if self.write_stmt(last)? {
                if semicolon && !self.compressed() {
                    self.out.push(';');
                }

                match self.options.style {
                    OutputStyle::Compact | OutputStyle::Nested => self.out.push(' '),
                    OutputStyle::Expanded => self.out.push('\n'),
                    OutputStyle::Compressed => {}
                }
            }
        }

        self.indent -= 1;

        if self.options.style == OutputStyle::Expanded {
            self.indentation();
        }
        self.out.push('}');

        Ok(())
    }

    fn write_style(&mut self, style: Style) -> CompileResult<()> {
        self.mark(style.value.span);
        self.indentation();

        self.out.push_str(style.property.resolve_ref());
        self.out.push(':');

        if !style.declared_as_custom_property && !self.compressed() {
            self.out.push(' ');
        }

        self.write_value(&style.value.node, style.value.span)
    }

    fn write_comment(&mut self, comment: &str, span: Span) -> CompileResult<()> {
        if self.compressed() && !comment.starts_with("/*!") {
            return Ok(());
        }

        self.indentation();

        // Continuation lines keep their indentation relative to the
        // comment's source column.
        let col = self.map.look_up_pos(span.low()).position.column;
        let mut lines = comment.lines();

        if let Some(first) = lines.next() {
            self.out.push_str(first.trim_start());
        }

        for line in lines {
            let trimmed = line.trim_start();
            let depth = (line.len() - trimmed.len()).saturating_sub(col);

            self.out.push('\n');
            for _ in 0..depth {
                self.out.push(' ');
            }
            self.out.push_str(trimmed);
        }

        Ok(())
    }

    fn write_media_query(&mut self, query: &MediaQuery) {
        if let Some(modifier) = &query.modifier {
            self.out.push_str(modifier);
            self.out.push(' ');
        }

        if let Some(media_type) = &query.media_type {
            self.out.push_str(media_type);
            if !query.conditions.is_empty() {
                self.out.push_str(" and ");
            }
        }

        match query.conditions.as_slice() {
            // A lone negated condition unwraps to a `not` query.
            [condition] if condition.starts_with("(not ") => {
                self.out.push_str("not ");
                self.out
                    .push_str(&condition["(not ".len()..condition.len() - 1]);
            }
            conditions => {
                let joiner = if query.conjunction { " and " } else { " or " };
                self.out.push_str(&conditions.join(joiner));
            }
        }
    }

    fn write_rule_set(
        &mut self,
        selector: SelectorList,
        body: Vec<CssStmt>,
        depth: usize,
        span: Span,
    ) -> CompileResult<()> {
        self.mark(span);

        // The nested style indents rules one step per level of source
        // nesting.
        let nested = self.options.style == OutputStyle::Nested;
        if nested {
            self.indent += depth;
        }

        self.indentation();
        self.write_selector_list(&selector);
        self.write_block(body)?;

        if nested {
            self.indent -= depth;
        }

        Ok(())
    }

    fn write_media_rule(
        &mut self,
        queries: &[MediaQuery],
        body: Vec<CssStmt>,
        span: Span,
    ) -> CompileResult<()> {
        self.mark(span);
        self.indentation();
        self.out.push_str("@media ");

        for (i, query) in queries.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
                self.space();
            }
            self.write_media_query(query);
        }

        self.write_block(body)
    }

    fn write_unknown_at_rule(&mut self, rule: UnknownAtRule) -> CompileResult<()> {
        self.mark(rule.span);
        self.indentation();
        self.out.push('@');
        self.out.push_str(&rule.name);

        if !rule.params.is_empty() {
            self.out.push(' ');
            self.out.push_str(&rule.params);
        }

        if !rule.has_body {
            debug_assert!(rule.body.is_empty());
            return Ok(());
        }

        if rule.body.iter().all(CssStmt::is_invisible) {
            self.out.push_str(" {}");
            return Ok(());
        }

        self.write_block(rule.body)
    }

    fn write_supports_rule(&mut self, rule: SupportsRule) -> CompileResult<()> {
        self.mark(rule.span);
        self.indentation();
        self.out.push_str("@supports");

        if !rule.params.is_empty() {
            self.out.push(' ');
            self.out.push_str(&rule.params);
        }

        self.write_block(rule.body)
    }

    fn write_import(&mut self, import: &str, modifiers: Option<String>) {
        self.indentation();
        self.out.push_str("@import ");
        self.out.push_str(import);

        if let Some(modifiers) = modifiers {
            self.out.push(' ');
            self.out.push_str(&modifiers);
        }
    }

    /// Returns whether any text was written.
    fn write_stmt(&mut self, stmt: CssStmt) -> CompileResult<bool> {
        if stmt.is_invisible() {
            return Ok(false);
        }

        match stmt {
            CssStmt::RuleSet {
                selector,
                body,
                depth,
                span,
                ..
            } => self.write_rule_set(selector.into_selector().0, body, depth, span)?,
            CssStmt::Media(media_rule, _, span) => {
                self.write_media_rule(&media_rule.query, media_rule.body, span)?;
            }
            CssStmt::UnknownAtRule(rule, ..) => self.write_unknown_at_rule(rule)?,
            CssStmt::Style(style) => self.write_style(style)?,
            CssStmt::Comment(comment, span) => {
                self.mark(span);
                self.write_comment(&comment, span)?;
            }
            CssStmt::KeyframesRuleSet(keyframes) => {
                self.mark(keyframes.span);
                self.indentation();

                for (i, selector) in keyframes.selector.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(&selector.to_string());
                }

                self.write_block(keyframes.body)?;
            }
            CssStmt::Import(import, modifier) => self.write_import(&import, modifier),
            CssStmt::Supports(supports_rule, _) => self.write_supports_rule(supports_rule)?,
        }

        Ok(true)
    }
}
