//! Helper macros: named, parameterized rule templates.
//!
//! Templates are parsed once at registration. A call site expands by
//! substituting argument ASTs for parameter names in the parsed template, so
//! substitution never rescans text.

use super::ast::Ast;
use super::error::CompileError;
use super::parser::parse_rule;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Helper {
    pub name: String,
    pub params: Vec<String>,
    pub body: Ast,
}

impl Helper {
    /// The template with `args` bound to the parameters. Arity is checked by
    /// the caller, which knows the spot to blame.
    pub(crate) fn instantiate(&self, args: &[Ast]) -> Ast {
        if self.params.is_empty() {
            return self.body.clone();
        }
        let bindings: HashMap<&str, &Ast> = self.params.iter().map(String::as_str).zip(args).collect();
        substitute(&self.body, &bindings)
    }
}

fn substitute(ast: &Ast, bindings: &HashMap<&str, &Ast>) -> Ast {
    let sub = |ast: &Ast| substitute(ast, bindings);
    match ast {
        Ast::Name(name) => bindings.get(name.as_str()).map_or_else(|| ast.clone(), |&arg| arg.clone()),
        Ast::Str(_) | Ast::Int(_) | Ast::Decimal(_) | Ast::Bool(_) => ast.clone(),
        Ast::Tuple(items) => Ast::Tuple(items.iter().map(sub).collect()),
        Ast::Call { func, args } => Ast::Call { func: func.clone(), args: args.iter().map(sub).collect() },
        Ast::Subscript { value, key } => {
            let value = match bindings.get(value.as_str()) {
                Some(Ast::Name(bound)) => bound.clone(),
                _ => value.clone(),
            };
            Ast::Subscript { value, key: Box::new(sub(key)) }
        }
        Ast::BoolOp { op, values } => Ast::BoolOp { op: *op, values: values.iter().map(sub).collect() },
        Ast::Not(inner) => Ast::Not(Box::new(sub(inner))),
        Ast::Compare { left, rest } => Ast::Compare {
            left: Box::new(sub(left)),
            rest: rest.iter().map(|(op, right)| (*op, sub(right))).collect(),
        },
        Ast::BinOp { op, left, right } => Ast::BinOp { op: *op, left: Box::new(sub(left)), right: Box::new(sub(right)) },
        Ast::Neg(inner) => Ast::Neg(Box::new(sub(inner))),
    }
}

#[derive(Debug, Clone, Default)]
pub struct HelperRegistry {
    helpers: HashMap<String, Helper>,
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `("name(a, b)", "template")` pairs.
    pub fn from_pairs<I, S, T>(pairs: I) -> Result<Self, CompileError>
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mut registry = Self::new();
        for (signature, template) in pairs {
            registry.define(signature.as_ref(), template.as_ref())?;
        }
        Ok(registry)
    }

    /// Register (or replace) one helper.
    pub fn define(&mut self, signature: &str, template: &str) -> Result<(), CompileError> {
        let invalid = || CompileError::HelperSignature(signature.to_string());
        let caps = regex!(r"^\s*([A-Za-z_]\w*)\s*(?:\(([^()]*)\))?\s*$").captures(signature).ok_or_else(invalid)?;
        let name = caps[1].to_string();
        let params: Vec<String> = match caps.get(2) {
            Some(list) if !list.as_str().trim().is_empty() => {
                list.as_str().split(',').map(|param| param.trim().to_string()).collect()
            }
            _ => Vec::new(),
        };
        if params.iter().any(|param| !regex!(r"^[A-Za-z_]\w*$").is_match(param)) {
            return Err(invalid());
        }
        let body = parse_rule(template)?;
        self.helpers.insert(name.clone(), Helper { name, params, body });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Helper> {
        self.helpers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.helpers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.helpers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_with_and_without_params() {
        let registry = HelperRegistry::from_pairs([
            ("is_adult", "age == 'adult'"),
            ("can_play(song)", "has(Ocarina) and has_all_notes_for_song(song)"),
            ("can_use( item , n )", "has(item, n)"),
        ])
        .unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.get("is_adult").unwrap().params.is_empty());
        assert_eq!(registry.get("can_use").unwrap().params, vec!["item", "n"]);
    }

    #[test]
    fn bad_signatures_are_rejected() {
        let mut registry = HelperRegistry::new();
        assert_eq!(registry.define("can use(x)", "True"), Err(CompileError::HelperSignature("can use(x)".into())));
        assert!(registry.define("f(a b)", "True").is_err());
        assert!(matches!(registry.define("f(a)", "a and"), Err(CompileError::Syntax { .. })));
    }

    #[test]
    fn instantiate_substitutes_whole_identifiers_only() {
        let mut registry = HelperRegistry::new();
        registry.define("can_play(song)", "has(Ocarina) and has_all_notes_for_song(song) and songs_known").unwrap();
        let expanded = registry.get("can_play").unwrap().instantiate(&[Ast::Name("Suns_Song".into())]);
        assert_eq!(
            expanded.to_string(),
            "has(Ocarina) and has_all_notes_for_song(Suns_Song) and songs_known"
        );
    }

    #[test]
    fn subscripted_parameter_is_renamed() {
        let mut registry = HelperRegistry::new();
        registry.define("mq(table, key)", "table[key]").unwrap();
        let expanded =
            registry.get("mq").unwrap().instantiate(&[Ast::Name("dungeon_mq".into()), Ast::Str("Ice Cavern".into())]);
        assert_eq!(expanded.to_string(), "dungeon_mq['Ice Cavern']");
    }
}
