//! Expression evaluation: the `AstExpr` → [`Value`] half of the evaluator,
//! plus interpolation and the small serialization helpers it needs.

use codemap::{Span, Spanned};

use crate::{
    ast::{
        AstExpr, AstMapExpr, AstSupportsCondition, BinaryOpExpr, FunctionCallExpr,
        InterpolatedFunction, InterpolatedText, ListExpr, StringExpr, Ternary,
    },
    common::{BinaryOp, Identifier, QuoteKind, UnaryOp},
    context_flags::ContextFlags,
    error::{CompileResult, ErrorKind},
    lexer::Lexer,
    selector::{SelectorList, SelectorParser},
    value::{Dimension, Value, ValueMap},
};

use super::{
    bin_op::{add, cmp, div, mul, rem, single_eq, sub},
    evaluator::Evaluator,
};

impl<'a> Evaluator<'a> {
    pub fn eval(&mut self, expr: AstExpr) -> CompileResult<Value> {
        match expr {
            AstExpr::Null => Ok(Value::Null),
            AstExpr::True => Ok(Value::True),
            AstExpr::False => Ok(Value::False),
            AstExpr::Color(color) => Ok(Value::Color(color)),
            AstExpr::Number { n, unit } => Ok(Value::Dimension(Dimension::new(n, unit))),
            AstExpr::String(StringExpr(text, quote), ..) => self.eval_string_literal(text, quote),
            AstExpr::List(list) => self.eval_list(list),
            AstExpr::Map(map) => self.eval_map(map),
            AstExpr::Paren(inner) => self.eval((*inner).clone()),
            AstExpr::ParentSelector => Ok(self.parent_selector_value()),
            AstExpr::Variable { name, namespace } => self.env.get_var(name, namespace),
            AstExpr::UnaryOp(op, operand, span) => self.eval_unary(op, (*operand).clone(), span),
            AstExpr::BinaryOp(binop) => self.eval_binary(&binop),
            AstExpr::FunctionCall(call) => self.eval_function_call(call),
            AstExpr::InterpolatedFunction(call) => self.eval_interpolated_call((*call).clone()),
            AstExpr::If(ternary) => self.eval_ternary((*ternary).clone()),
            AstExpr::Supports(condition) => Ok(Value::String(
                self.eval_supports_condition((*condition).clone())?,
                QuoteKind::None,
            )),
        }
    }

    fn eval_list(&mut self, list: ListExpr) -> CompileResult<Value> {
        let mut elems = Vec::with_capacity(list.elems.len());
        for elem in list.elems {
            elems.push(self.eval(elem.node)?);
        }

        Ok(Value::List(elems, list.separator, list.brackets))
    }

    fn eval_map(&mut self, map: AstMapExpr) -> CompileResult<Value> {
        let mut result = ValueMap::new();

        for (key_expr, value_expr) in map.0 {
            let key = Spanned {
                span: key_expr.span,
                node: self.eval(key_expr.node)?,
            };
            let value = self.eval(value_expr)?;

            if result.key_exists(&key) {
                return Err((ErrorKind::DuplicateKey, "Duplicate key.", key.span).into());
            }

            result.insert(key, value);
        }

        Ok(Value::Map(result))
    }

    fn parent_selector_value(&self) -> Value {
        match &self.current_rule {
            Some(rule) => rule.as_selector_list().clone().to_sass_list(),
            None => Value::Null,
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: AstExpr, span: Span) -> CompileResult<Value> {
        let value = self.eval(operand)?;

        match op {
            UnaryOp::Plus => value.unary_plus(self.options, span),
            UnaryOp::Neg => value.unary_neg(self.options, span),
            UnaryOp::Div => value.unary_div(self.options, span),
            UnaryOp::Not => Ok(value.unary_not()),
        }
    }

    fn eval_binary(&mut self, binop: &BinaryOpExpr) -> CompileResult<Value> {
        let span = binop.span;
        let left = self.eval(binop.lhs.clone())?;

        // `and`/`or` short-circuit before the right side is touched.
        match binop.op {
            BinaryOp::Or => {
                return if left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval(binop.rhs.clone())
                };
            }
            BinaryOp::And => {
                return if left.is_truthy() {
                    self.eval(binop.rhs.clone())
                } else {
                    Ok(left)
                };
            }
            _ => {}
        }

        let right = self.eval(binop.rhs.clone())?;

        match binop.op {
            BinaryOp::SingleEq => single_eq(&left, &right, self.options, span),
            BinaryOp::Equal => Ok(Value::bool(left == right)),
            BinaryOp::NotEqual => Ok(Value::bool(left != right)),
            BinaryOp::GreaterThan
            | BinaryOp::GreaterThanEqual
            | BinaryOp::LessThan
            | BinaryOp::LessThanEqual => cmp(&left, &right, self.options, span, binop.op),
            BinaryOp::Plus => add(left, right, self.options, span),
            BinaryOp::Minus => sub(left, right, self.options, span),
            BinaryOp::Mul => mul(left, right, self.options, span),
            BinaryOp::Rem => rem(left, right, self.options, span),
            BinaryOp::Div => self.eval_division(left, right, binop.allows_slash, span),
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    /// `/` between two literal numbers is a slash-separated value; anywhere
    /// else it divides, with a deprecation warning for bare `/` division.
    fn eval_division(
        &mut self,
        left: Value,
        right: Value,
        allows_slash: bool,
        span: Span,
    ) -> CompileResult<Value> {
        let both_numbers =
            matches!(left, Value::Dimension(..)) && matches!(right, Value::Dimension(..));

        if both_numbers && allows_slash {
            let result = div(left.clone(), right.clone(), self.options, span)?;
            return result.with_slash(
                left.assert_number(span)?,
                right.assert_number(span)?,
                span,
            );
        }

        if both_numbers && self.warnings_emitted.insert(span) {
            self.emit_warning(
                "Using / for division outside of calc() is deprecated. \
                 Recommendation: math.div",
                span,
            );
        }

        div(left, right, self.options, span)
    }

    fn eval_function_call(&mut self, call: FunctionCallExpr) -> CompileResult<Value> {
        let func = self.resolve_function(call.name, call.namespace, call.span)?;

        let was_in_function = self.flags.in_function();
        self.flags.set(ContextFlags::IN_FUNCTION, true);
        let value = self.call_function(func, (*call.arguments).clone().into(), call.span);
        self.flags.set(ContextFlags::IN_FUNCTION, was_in_function);

        value
    }

    fn eval_interpolated_call(&mut self, call: InterpolatedFunction) -> CompileResult<Value> {
        let InterpolatedFunction {
            name,
            arguments,
            span,
        } = call;

        let name = self.eval_text(name)?;
        self.render_plain_call(name, arguments, span)
    }

    fn eval_ternary(&mut self, ternary: Ternary) -> CompileResult<Value> {
        let invocation = ternary.0;
        let span = invocation.span;

        if invocation.rest.is_some() || invocation.keyword_rest.is_some() {
            return Err(("if() does not support rest arguments.", span).into());
        }

        let mut positional = invocation.positional;
        let mut named = invocation.named;

        let mut pick = |name: &str| -> CompileResult<AstExpr> {
            if let Some(expr) = named.remove(&Identifier::from(name)) {
                return Ok(expr);
            }
            if positional.is_empty() {
                return Err((
                    ErrorKind::MissingArgument,
                    format!("Missing argument ${}.", name),
                    span,
                )
                    .into());
            }
            Ok(positional.remove(0))
        };

        let condition = pick("condition")?;
        let if_true = pick("if-true")?;
        let if_false = pick("if-false")?;

        if !positional.is_empty() || !named.is_empty() {
            return Err((
                "Only 3 arguments allowed, but more were passed.",
                span,
            )
                .into());
        }

        let chosen = if self.eval(condition)?.is_truthy() {
            if_true
        } else {
            if_false
        };

        Ok(self.eval(chosen)?.without_slash())
    }

    // ===================== strings and interpolation =====================

    /// Evaluates a (possibly interpolated) string literal. Inner strings
    /// contribute their raw text, not their quoted form.
    fn eval_string_literal(
        &mut self,
        text: InterpolatedText,
        quote: QuoteKind,
    ) -> CompileResult<Value> {
        let (mut result, pairs) = text.into_parts();

        for (expr, literal) in pairs {
            let Spanned { node, span } = expr;
            match self.eval(node)? {
                Value::String(raw, ..) => result.push_str(&raw),
                other => result.push_str(&self.serialize(other, QuoteKind::None, span)?),
            }
            result.push_str(&literal);
        }

        Ok(Value::String(result, quote))
    }

    /// Resolves `#{…}` blocks, serializing each expression unquoted.
    pub(crate) fn eval_text(&mut self, text: InterpolatedText) -> CompileResult<String> {
        let (mut result, pairs) = text.into_parts();

        for (expr, literal) in pairs {
            let Spanned { node, span } = expr;
            let value = self.eval(node)?;
            result.push_str(&self.serialize(value, QuoteKind::None, span)?);
            result.push_str(&literal);
        }

        Ok(result)
    }

    pub(crate) fn eval_text_trimmed(&mut self, text: InterpolatedText) -> CompileResult<String> {
        Ok(crate::utils::trim_ascii(&self.eval_text(text)?, true).to_owned())
    }

    pub(crate) fn eval_to_css(
        &mut self,
        expr: AstExpr,
        quote: QuoteKind,
        span: Span,
    ) -> CompileResult<String> {
        let value = self.eval(expr)?;
        self.serialize(value, quote, span)
    }

    pub(crate) fn serialize(
        &mut self,
        mut value: Value,
        quote: QuoteKind,
        span: Span,
    ) -> CompileResult<String> {
        if quote == QuoteKind::None {
            value = value.unquote();
        }

        value.to_css_string(span, self.options.is_compressed())
    }

    // ===================== selectors =====================

    pub fn selector_from_text(
        &mut self,
        text: &str,
        allows_parent: bool,
        allows_placeholder: bool,
        span: Span,
    ) -> CompileResult<SelectorList> {
        let toks = Lexer::new_from_string(text, span);

        SelectorParser::new(toks, allows_parent, allows_placeholder, span).parse()
    }

    // ===================== @supports conditions =====================

    pub(super) fn eval_supports_condition(
        &mut self,
        condition: AstSupportsCondition,
    ) -> CompileResult<String> {
        match condition {
            AstSupportsCondition::Operation {
                left,
                operator,
                right,
            } => {
                let operator_text = operator.clone().unwrap_or_default();
                Ok(format!(
                    "{} {} {}",
                    self.parenthesized_condition(*left, operator.as_deref())?,
                    operator_text,
                    self.parenthesized_condition(*right, operator.as_deref())?
                ))
            }
            AstSupportsCondition::Negation(inner) => Ok(format!(
                "not {}",
                self.parenthesized_condition(*inner, None)?
            )),
            AstSupportsCondition::Interpolation(expr) => {
                self.eval_to_css(expr, QuoteKind::None, self.blank_span)
            }
            AstSupportsCondition::Declaration { name, value } => {
                let was_in_decl = self.flags.in_supports_declaration();
                self.flags.set(ContextFlags::IN_SUPPORTS_DECLARATION, true);

                let is_custom_property = matches!(
                    &name,
                    AstExpr::String(StringExpr(text, QuoteKind::None), ..)
                        if text.leading_text().starts_with("--")
                );

                let rendered = format!(
                    "({}:{}{})",
                    self.eval_to_css(name, QuoteKind::Quoted, self.blank_span)?,
                    if is_custom_property { "" } else { " " },
                    self.eval_to_css(value, QuoteKind::Quoted, self.blank_span)?,
                );

                self.flags
                    .set(ContextFlags::IN_SUPPORTS_DECLARATION, was_in_decl);

                Ok(rendered)
            }
            AstSupportsCondition::Function { name, args } => Ok(format!(
                "{}({})",
                self.eval_text(name)?,
                self.eval_text(args)?
            )),
            AstSupportsCondition::Anything { contents } => {
                Ok(format!("({})", self.eval_text(contents)?))
            }
        }
    }

    fn parenthesized_condition(
        &mut self,
        condition: AstSupportsCondition,
        operator: Option<&str>,
    ) -> CompileResult<String> {
        let needs_parens = match &condition {
            AstSupportsCondition::Negation(..) => true,
            AstSupportsCondition::Operation {
                operator: inner, ..
            } => inner.is_none() || inner.as_deref() != operator,
            _ => false,
        };

        let rendered = self.eval_supports_condition(condition)?;

        Ok(if needs_parens {
            format!("({})", rendered)
        } else {
            rendered
        })
    }
}
