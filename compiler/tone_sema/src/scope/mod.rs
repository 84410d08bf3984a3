//! Scopes and name resolution.
//!
//! Scopes form a tree: the root scope holds native modules, each file gets a
//! global scope under the root, and module bodies and blocks nest below their
//! file. Lookup walks from a scope towards the root.
//!
//! Modules may be overloaded, so resolving a module name yields every
//! same-named module visible from the lookup point, innermost first, and
//! leaves the choice to the call site.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tone_ir::{Name, Span};
use tone_types::StructId;

use crate::decl::{ModuleId, ScopeId, ValueId};

/// Something a name can be bound to in a scope.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ScopeItem {
    /// `import "path" as alias;`
    ImportedScope(ScopeId),
    Value(ValueId),
    Module(ModuleId),
    Struct(StructId),
}

impl ScopeItem {
    /// Whether adding `self` next to an `existing` item of the same name is an error.
    pub fn conflicts_with(self, existing: ScopeItem) -> bool {
        use ScopeItem::{ImportedScope, Module, Struct, Value};
        match self {
            ImportedScope(_) | Value(_) => {
                matches!(existing, ImportedScope(_) | Value(_) | Module(_))
            }
            Struct(_) => matches!(existing, Struct(_)),
            Module(_) => matches!(existing, ImportedScope(_) | Value(_)),
        }
    }

    /// Noun used in conflict messages.
    pub fn describe(self) -> &'static str {
        match self {
            ScopeItem::ImportedScope(_) => "imported scope",
            ScopeItem::Value(_) => "value",
            ScopeItem::Module(_) => "module",
            ScopeItem::Struct(_) => "struct",
        }
    }
}

/// Result of resolving a name in value or callee position.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Reference {
    Value(ValueId),
    /// All visible overloads, innermost scope first, declaration order within a scope.
    ModuleGroup(SmallVec<[ModuleId; 4]>),
    /// An imported scope alias; only usable as the left side of `.`.
    Scope(ScopeId),
}

/// An existing binding that blocks a new one.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Conflict {
    pub existing: ScopeItem,
    pub span: Span,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
struct Entry {
    item: ScopeItem,
    span: Span,
}

#[derive(Clone, Debug, Default)]
pub struct Scope {
    parent: Option<ScopeId>,
    entries: FxHashMap<Name, SmallVec<[Entry; 1]>>,
    /// Global scopes of files imported without an alias, searched after own items.
    imports: Vec<ScopeId>,
}

impl Scope {
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }
}

#[derive(Clone, Debug, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let raw = u32::try_from(self.scopes.len())
            .unwrap_or_else(|_| panic!("scope tree exceeded u32::MAX scopes"));
        self.scopes.push(Scope {
            parent,
            ..Scope::default()
        });
        ScopeId::from_raw(raw)
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Drop every scope created after the tree had `len` scopes.
    pub fn truncate(&mut self, len: usize) {
        self.scopes.truncate(len);
    }

    #[inline]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    /// Make the own items of `target` visible from `scope` without qualification.
    pub fn add_unaliased_import(&mut self, scope: ScopeId, target: ScopeId) {
        let imports = &mut self.scopes[scope.index()].imports;
        if !imports.contains(&target) {
            imports.push(target);
        }
    }

    /// Bind `name` in `scope`, checking only that scope for conflicts.
    ///
    /// Inner scopes may shadow outer ones.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: Name,
        item: ScopeItem,
        span: Span,
    ) -> Result<(), Conflict> {
        let entries = self.scopes[scope.index()].entries.entry(name).or_default();
        if let Some(existing) = entries.iter().find(|entry| item.conflicts_with(entry.item)) {
            return Err(Conflict {
                existing: existing.item,
                span: existing.span,
            });
        }
        entries.push(Entry { item, span });
        Ok(())
    }

    /// Items bound to `name` directly in `scope`.
    fn own_items(&self, scope: ScopeId, name: Name) -> impl Iterator<Item = ScopeItem> + '_ {
        self.scopes[scope.index()]
            .entries
            .get(&name)
            .into_iter()
            .flat_map(|entries| entries.iter().map(|entry| entry.item))
    }

    /// Items bound to `name` in `scope` or in its unaliased imports.
    fn level_items(&self, scope: ScopeId, name: Name) -> impl Iterator<Item = ScopeItem> + '_ {
        let imported = self.scopes[scope.index()]
            .imports
            .iter()
            .flat_map(move |&import| self.own_items(import, name));
        self.own_items(scope, name).chain(imported)
    }

    /// Resolve `name` from `scope`, walking towards the root.
    ///
    /// Struct names are skipped; they are only found by [`lookup_struct`](Self::lookup_struct).
    pub fn lookup(&self, scope: ScopeId, name: Name) -> Option<Reference> {
        let mut group = SmallVec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(found) = Self::collect_level(self.level_items(id, name), &mut group) {
                return Some(found);
            }
            current = self.scopes[id.index()].parent;
        }
        (!group.is_empty()).then_some(Reference::ModuleGroup(group))
    }

    /// Resolve `name` among the items of `scope` itself (`alias.name`).
    pub fn lookup_member(&self, scope: ScopeId, name: Name) -> Option<Reference> {
        let mut group = SmallVec::new();
        if let Some(found) = Self::collect_level(self.level_items(scope, name), &mut group) {
            return Some(found);
        }
        (!group.is_empty()).then_some(Reference::ModuleGroup(group))
    }

    /// Add one scope level's modules to `group`.
    ///
    /// Returns the final reference when a value or alias ends the search.
    fn collect_level(
        items: impl Iterator<Item = ScopeItem>,
        group: &mut SmallVec<[ModuleId; 4]>,
    ) -> Option<Reference> {
        for item in items {
            match item {
                ScopeItem::Module(module) => group.push(module),
                ScopeItem::Value(value) => {
                    return Some(if group.is_empty() {
                        Reference::Value(value)
                    } else {
                        Reference::ModuleGroup(std::mem::take(group))
                    });
                }
                ScopeItem::ImportedScope(target) => {
                    return Some(if group.is_empty() {
                        Reference::Scope(target)
                    } else {
                        Reference::ModuleGroup(std::mem::take(group))
                    });
                }
                ScopeItem::Struct(_) => {}
            }
        }
        None
    }

    /// Resolve a struct type name from a file's global scope.
    ///
    /// All but the last path component must be imported-scope aliases.
    pub fn lookup_struct(&self, global: ScopeId, path: &[Name]) -> Option<StructId> {
        match path {
            [] => None,
            [name] => self.level_items(global, *name).find_map(|item| match item {
                ScopeItem::Struct(id) => Some(id),
                _ => None,
            }),
            [alias, rest @ ..] => {
                let target = self.level_items(global, *alias).find_map(|item| match item {
                    ScopeItem::ImportedScope(target) => Some(target),
                    _ => None,
                })?;
                self.lookup_struct(target, rest)
            }
        }
    }

    /// Modules declared directly in `scope` under `name`, in declaration order.
    pub fn own_modules(&self, scope: ScopeId, name: Name) -> SmallVec<[ModuleId; 4]> {
        self.own_items(scope, name)
            .filter_map(|item| match item {
                ScopeItem::Module(id) => Some(id),
                _ => None,
            })
            .collect()
    }
}
