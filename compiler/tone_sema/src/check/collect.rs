//! Native registration and declaration collection (passes 0 and 1).

use rustc_hash::FxHashMap;
use tone_diagnostic::DiagnosticId;
use tone_ir::{Item, Name, Span};
use tone_types::AstDataType;

use super::{Checker, GlobalSource, ScriptModule, ScriptStruct};
use crate::decl::{
    FileId, ModuleDefinition, ModuleKind, ModuleParameter, StructDefinition, ValueDefinition,
    ValueKind,
};
use crate::native::{NativeModuleRegistry, NativeName};
use crate::scope::ScopeItem;

impl<'a> Checker<'a> {
    /// Pass 0: make native modules visible.
    #[tracing::instrument(level = "debug", skip_all)]
    pub(super) fn register_natives(&mut self, registry: &dyn NativeModuleRegistry) {
        for signature in registry.signatures() {
            let (name, display_name, kind) = match &signature.name {
                NativeName::Identifier(ident) => {
                    (self.interner.intern(ident), ident.clone(), ModuleKind::Native)
                }
                NativeName::Operator(op) => (
                    self.interner.intern(op.symbol()),
                    format!("operator{}", op.symbol()),
                    ModuleKind::Operator(*op),
                ),
            };

            let module = self.decls.add_module(ModuleDefinition {
                name,
                display_name,
                kind,
                params: Vec::new(),
                return_type: signature.return_type,
                span: Span::DUMMY,
                scope: self.root_scope,
            });
            for param in &signature.params {
                self.decls.add_param(ModuleParameter {
                    module,
                    direction: param.direction,
                    name: self.interner.intern(&param.name),
                    ty: param.ty,
                    default: None,
                    span: Span::DUMMY,
                    value: None,
                });
            }

            match kind {
                ModuleKind::Operator(op) => self.operators.entry(op).or_default().push(module),
                _ => self.declare(self.root_scope, name, ScopeItem::Module(module), Span::DUMMY),
            }
        }
        tracing::debug!(
            modules = self.decls.module_ids().count(),
            operators = self.operators.len(),
            "registered natives"
        );
    }

    /// Pass 1: file scopes, imports and top-level declarations.
    #[tracing::instrument(level = "debug", skip_all)]
    pub(super) fn collect_declarations(&mut self) {
        let mut by_path: FxHashMap<Name, FileId> = FxHashMap::default();
        for (index, file) in self.files.iter().enumerate() {
            let id = FileId::from_raw(u32::try_from(index).unwrap_or(u32::MAX));
            self.file_scopes.push(self.scopes.new_scope(Some(self.root_scope)));
            by_path.entry(file.path).or_insert(id);
        }

        let files = self.files;
        for (index, file) in files.iter().enumerate() {
            let file_id = FileId::from_raw(u32::try_from(index).unwrap_or(u32::MAX));
            let scope = self.file_scope(file_id);

            for item in &file.items {
                match item {
                    Item::Import(import) => {
                        let Some(&target) = by_path.get(&import.path) else {
                            self.error(
                                DiagnosticId::UnresolvedImport,
                                import.span,
                                format!("no file `{}` in this compilation unit", self.name(import.path)),
                            );
                            continue;
                        };
                        let target_scope = self.file_scope(target);
                        match import.alias {
                            Some(alias) => self.declare(
                                scope,
                                alias,
                                ScopeItem::ImportedScope(target_scope),
                                import.span,
                            ),
                            None => self.scopes.add_unaliased_import(scope, target_scope),
                        }
                    }
                    Item::Struct(decl) => {
                        let id = self.decls.add_struct(StructDefinition {
                            name: decl.name,
                            file: file_id,
                            scope,
                            fields: Vec::new(),
                            span: decl.span,
                        });
                        self.declare(scope, decl.name, ScopeItem::Struct(id), decl.span);
                        self.script_structs.push(ScriptStruct {
                            id,
                            file: file_id,
                            decl,
                        });
                    }
                    Item::Module(decl) => {
                        let id = self.decls.add_module(ModuleDefinition {
                            name: decl.name,
                            display_name: self.name(decl.name).to_string(),
                            kind: ModuleKind::Script { file: file_id },
                            params: Vec::new(),
                            return_type: AstDataType::ERROR,
                            span: decl.span,
                            scope,
                        });
                        self.declare(scope, decl.name, ScopeItem::Module(id), decl.span);
                        let body_scope = self.scopes.new_scope(Some(scope));
                        self.script_modules.push(ScriptModule {
                            id,
                            file: file_id,
                            body_scope,
                            decl,
                        });
                    }
                    Item::Value(decl) => {
                        let id = self.decls.add_value(ValueDefinition {
                            name: decl.name,
                            kind: ValueKind::Global,
                            ty: AstDataType::ERROR,
                            span: decl.span,
                            scope,
                        });
                        self.declare(scope, decl.name, ScopeItem::Value(id), decl.span);
                        self.globals.insert(
                            id,
                            GlobalSource {
                                file: file_id,
                                decl,
                                declared: None,
                            },
                        );
                    }
                }
            }
        }

        tracing::debug!(
            files = self.files.len(),
            modules = self.script_modules.len(),
            structs = self.script_structs.len(),
            globals = self.globals.len(),
            "collected declarations"
        );
    }
}
