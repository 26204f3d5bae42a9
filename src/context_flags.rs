/// Bit set of contextual facts threaded through the parser and evaluator.
#[derive(Debug, Copy, Clone)]
pub struct ContextFlags(u16);

#[derive(Debug, Copy, Clone)]
pub struct ContextFlag(u16);

impl ContextFlags {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn set(&mut self, flag: ContextFlag, on: bool) {
        if on {
            self.0 |= flag.0;
        } else {
            self.unset(flag);
        }
    }

    pub fn unset(&mut self, flag: ContextFlag) {
        self.0 &= !flag.0;
    }
}

macro_rules! context_flags {
    ($($getter:ident / $name:ident = $bit:literal,)*) => {
        impl ContextFlags {
            $(pub const $name: ContextFlag = ContextFlag(1 << $bit);)*

            $(
                pub fn $getter(self) -> bool {
                    self.0 & Self::$name.0 != 0
                }
            )*
        }
    };
}

context_flags! {
    in_mixin / IN_MIXIN = 0,
    in_function / IN_FUNCTION = 1,
    in_control_flow / IN_CONTROL_FLOW = 2,
    in_keyframes / IN_KEYFRAMES = 3,
    found_content_rule / FOUND_CONTENT_RULE = 4,
    in_style_rule / IN_STYLE_RULE = 5,
    in_unknown_at_rule / IN_UNKNOWN_AT_RULE = 6,
    in_content_block / IN_CONTENT_BLOCK = 7,
    is_use_allowed / IS_USE_ALLOWED = 8,
    in_parens / IN_PARENS = 9,
    at_root_excluding_style_rule / AT_ROOT_EXCLUDING_STYLE_RULE = 10,
    in_supports_declaration / IN_SUPPORTS_DECLARATION = 11,
    in_semi_global_scope / IN_SEMI_GLOBAL_SCOPE = 12,
}
