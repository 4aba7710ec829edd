//! Forbids duplicated keys within the same mapping.
//!
//! Tracks the stack of open mappings and sequences from the container
//! start/end tokens; a key is a duplicate when its scalar text was already
//! seen in the innermost open mapping. The `<<` merge key is exempt unless
//! `forbid-duplicated-merge-keys` is set.

use std::any::Any;

use crate::linter::LintProblem;
use crate::parser::{TokenKind, TokenView};
use crate::rules::{OptionKind, OptionSpec, OptionValue, Rule, RuleCategory, RuleOptions};

pub struct KeyDuplicates;

static OPTIONS: &[OptionSpec] = &[OptionSpec::new(
    "forbid-duplicated-merge-keys",
    OptionKind::Bool,
    OptionValue::Bool(false),
)];

#[derive(Debug, Default)]
struct Context {
    stack: Vec<Parent>,
}

#[derive(Debug)]
struct Parent {
    is_mapping: bool,
    keys: Vec<String>,
}

impl Rule for KeyDuplicates {
    fn id(&self) -> &'static str {
        "key-duplicates"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Token
    }

    fn options(&self) -> &'static [OptionSpec] {
        OPTIONS
    }

    fn new_context(&self) -> Option<Box<dyn Any + Send>> {
        Some(Box::new(Context::default()))
    }

    fn check_token(
        &self,
        opts: &RuleOptions,
        _buffer: &str,
        token: &TokenView<'_>,
        context: &mut (dyn Any + Send),
    ) -> Vec<LintProblem> {
        let ctx = match context.downcast_mut::<Context>() {
            Some(ctx) => ctx,
            None => return Vec::new(),
        };

        match token.curr.kind() {
            TokenKind::BlockMappingStart | TokenKind::FlowMappingStart => {
                ctx.stack.push(Parent {
                    is_mapping: true,
                    keys: Vec::new(),
                });
            }
            TokenKind::BlockSequenceStart | TokenKind::FlowSequenceStart => {
                ctx.stack.push(Parent {
                    is_mapping: false,
                    keys: Vec::new(),
                });
            }
            TokenKind::BlockEnd | TokenKind::FlowMappingEnd | TokenKind::FlowSequenceEnd => {
                ctx.stack.pop();
            }
            TokenKind::Key => {
                let scalar = token.next.and_then(|next| next.scalar());
                let (value, _) = match scalar {
                    Some(s) => s,
                    None => return Vec::new(),
                };
                let parent = match ctx.stack.last_mut() {
                    Some(parent) if parent.is_mapping => parent,
                    _ => return Vec::new(),
                };
                let merge_key_exempt =
                    value == "<<" && !opts.bool("forbid-duplicated-merge-keys");
                if parent.keys.iter().any(|k| k == value) && !merge_key_exempt {
                    let next = token.next.unwrap_or(token.curr);
                    return vec![LintProblem::new(
                        next.start_mark.line + 1,
                        next.start_mark.column + 1,
                        format!("duplication of key \"{value}\" in mapping"),
                    )];
                }
                parent.keys.push(value.to_string());
            }
            _ => {}
        }
        Vec::new()
    }
}
