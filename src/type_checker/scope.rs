//! Lexical scopes for the semantic analyzer.
//!
//! Scopes live in a stack owned by [`ScopeChain`]. Each scope refers to its
//! parent by index, so a parent always outlives the children pushed on top
//! of it and nothing is shared.

use std::collections::HashMap;

use log::trace;

use crate::{
    ast::types::Type,
    errors::errors::{Error, ErrorImpl},
    Position,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
}

/// Name to symbol bindings of one block, in declaration order.
#[derive(Debug, Default)]
pub struct Scope {
    symbols: Vec<Symbol>,
    lookup: HashMap<String, usize>,
    parent: Option<usize>,
}

impl Scope {
    pub fn new(parent: Option<usize>) -> Self {
        Scope {
            symbols: vec![],
            lookup: HashMap::new(),
            parent,
        }
    }

    pub fn declare(&mut self, name: &str, ty: Type, position: Position) -> Result<(), Error> {
        if self.lookup.contains_key(name) {
            return Err(Error::new(
                ErrorImpl::DuplicateDeclaration {
                    name: name.to_string(),
                },
                position,
            ));
        }

        self.lookup.insert(name.to_string(), self.symbols.len());
        self.symbols.push(Symbol {
            name: name.to_string(),
            ty,
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.lookup.get(name).map(|index| &self.symbols[*index])
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }
}

#[derive(Debug, Default)]
pub struct ScopeChain {
    scopes: Vec<Scope>,
}

impl ScopeChain {
    pub fn new() -> Self {
        ScopeChain { scopes: vec![] }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn enter_scope(&mut self) {
        let parent = self.scopes.len().checked_sub(1);
        self.scopes.push(Scope::new(parent));
        trace!("entered scope at depth {}", self.scopes.len());
    }

    /// Panics when no scope is active: enter/exit pairs are the caller's
    /// responsibility, not something user input can break.
    pub fn exit_scope(&mut self) {
        if self.scopes.pop().is_none() {
            panic!("exit_scope called with no active scope");
        }
        trace!("left scope, depth now {}", self.scopes.len());
    }

    /// Declares `name` in the innermost scope only.
    pub fn declare(&mut self, name: &str, ty: Type, position: Position) -> Result<(), Error> {
        let Some(scope) = self.scopes.last_mut() else {
            panic!("declare called with no active scope");
        };

        trace!("declare {}: {}", name, ty);
        scope.declare(name, ty, position)
    }

    /// Walks from the innermost scope out to the root; the first hit wins.
    pub fn resolve(&self, name: &str, position: Position) -> Result<&Type, Error> {
        let mut index = self.scopes.len().checked_sub(1);

        while let Some(current) = index {
            let scope = &self.scopes[current];
            if let Some(symbol) = scope.get(name) {
                return Ok(&symbol.ty);
            }
            index = scope.parent();
        }

        Err(Error::new(
            ErrorImpl::UndefinedName {
                name: name.to_string(),
            },
            position,
        ))
    }
}
