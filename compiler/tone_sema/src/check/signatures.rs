//! Type resolution and signature collection (pass 2).

use tone_diagnostic::{Diagnostic, DiagnosticId};
use tone_ir::{
    Item, MutabilityQualifier, ParamDirection, ParsedBaseType, ParsedType, Span, TypeKeyword,
};
use tone_types::{AstDataType, DataKind, PrimitiveType, RuntimeMutability};

use super::Checker;
use crate::decl::{FileId, ModuleId, ModuleParameter, StructField, ValueDefinition, ValueKind};
use crate::defaults::DefaultValueSite;
use crate::scope::ScopeItem;

/// Where a written type appears; decides which legality rule applies.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(super) enum TypePosition {
    Value,
    Parameter,
    Return,
}

pub(super) fn primitive(keyword: TypeKeyword) -> PrimitiveType {
    match keyword {
        TypeKeyword::Float => PrimitiveType::Float,
        TypeKeyword::Double => PrimitiveType::Double,
        TypeKeyword::Int => PrimitiveType::Int,
        TypeKeyword::Bool => PrimitiveType::Bool,
        TypeKeyword::String => PrimitiveType::String,
    }
}

impl<'a> Checker<'a> {
    /// Resolve a written type from `file`'s global scope.
    ///
    /// Reports unknown struct names and bad upsample factors; legality is
    /// checked separately by [`check_legal`](Self::check_legal).
    pub(super) fn resolve_type(&mut self, file: FileId, parsed: &ParsedType) -> AstDataType {
        let mutability = match parsed.mutability {
            None => RuntimeMutability::Variable,
            Some(MutabilityQualifier::Const) => RuntimeMutability::Constant,
            Some(MutabilityQualifier::DependentConst) => RuntimeMutability::DependentConstant,
        };

        let kind = match &parsed.base {
            ParsedBaseType::Void => return AstDataType::VOID,
            ParsedBaseType::Primitive(keyword) => DataKind::Primitive(primitive(*keyword)),
            ParsedBaseType::Named(path) => {
                match self.scopes.lookup_struct(self.file_scope(file), path) {
                    Some(id) => DataKind::Struct(id),
                    None => {
                        let written: Vec<&str> = path.iter().map(|&name| self.name(name)).collect();
                        self.error(
                            DiagnosticId::UnresolvedType,
                            parsed.span,
                            format!("unknown type `{}`", written.join(".")),
                        );
                        return AstDataType::ERROR;
                    }
                }
            }
        };

        let mut upsample_factor = 1;
        if let Some(factor) = parsed.upsample_factor {
            if factor == 0 {
                self.error(
                    DiagnosticId::InvalidUpsampleFactor,
                    parsed.span,
                    "upsample factor must be at least 1",
                );
                return AstDataType::ERROR;
            }
            if mutability == RuntimeMutability::Constant && factor != 1 {
                self.error(
                    DiagnosticId::InvalidUpsampleFactor,
                    parsed.span,
                    "constant types cannot have an upsample factor",
                );
                return AstDataType::ERROR;
            }
            upsample_factor = factor;
        }

        AstDataType::new(mutability, kind, upsample_factor, parsed.is_array)
    }

    /// Report `ty` if it is not allowed in `position`; illegal types become the error type.
    pub(super) fn check_legal(&mut self, ty: AstDataType, position: TypePosition, span: Span) -> AstDataType {
        if ty.is_error() || (position == TypePosition::Return && ty.is_void()) {
            return ty;
        }
        let Some(reason) = ty.illegal_value_reason() else {
            return ty;
        };
        let (id, what) = match position {
            TypePosition::Value => (DiagnosticId::IllegalValueType, "value"),
            TypePosition::Parameter => (DiagnosticId::IllegalParameterType, "parameter"),
            TypePosition::Return => (DiagnosticId::IllegalReturnType, "return"),
        };
        let message = format!("`{}` is not a legal {what} type: {reason}", self.type_name(ty));
        self.error(id, span, message);
        AstDataType::ERROR
    }

    /// Pass 2: struct fields, module signatures and declared global types.
    #[tracing::instrument(level = "debug", skip_all)]
    pub(super) fn resolve_signatures(&mut self) {
        for index in 0..self.script_structs.len() {
            let script = self.script_structs[index];
            let mut fields: Vec<StructField> = Vec::with_capacity(script.decl.fields.len());
            for field in &script.decl.fields {
                let ty = self.resolve_type(script.file, &field.ty);
                let ty = self.check_legal(ty, TypePosition::Value, field.ty.span);
                if let Some(previous) = fields.iter().find(|f| f.name == field.name) {
                    let previous_span = previous.span;
                    let message = format!("field `{}` is declared more than once", self.name(field.name));
                    self.emit(
                        Diagnostic::error(DiagnosticId::NameConflict, field.span)
                            .with_message(message)
                            .with_label(previous_span, "first declared here"),
                    );
                    continue;
                }
                fields.push(StructField {
                    name: field.name,
                    ty,
                    default: field.default,
                    span: field.span,
                });
            }
            self.decls.structure_mut(script.id).fields = fields;
        }

        for index in 0..self.script_modules.len() {
            let script = self.script_modules[index];
            let decl = script.decl;

            let return_type = self.resolve_type(script.file, &decl.return_type);
            let return_type = self.check_legal(return_type, TypePosition::Return, decl.return_type.span);
            self.decls.module_mut(script.id).return_type = return_type;

            for param in &decl.params {
                let ty = self.resolve_type(script.file, &param.ty);
                let ty = self.check_legal(ty, TypePosition::Parameter, param.ty.span);
                let mut default = param.default;
                if param.direction == ParamDirection::Out && default.is_some() {
                    self.error(
                        DiagnosticId::OutParameterDefaultValue,
                        param.span,
                        format!("output parameter `{}` cannot have a default value", self.name(param.name)),
                    );
                    default = None;
                }

                let id = self.decls.add_param(ModuleParameter {
                    module: script.id,
                    direction: param.direction,
                    name: param.name,
                    ty,
                    default,
                    span: param.span,
                    value: None,
                });
                let value = self.decls.add_value(ValueDefinition {
                    name: param.name,
                    kind: ValueKind::Parameter {
                        param: id,
                        direction: param.direction,
                    },
                    ty,
                    span: param.span,
                    scope: script.body_scope,
                });
                self.decls.param_mut(id).value = Some(value);
                self.declare(script.body_scope, param.name, ScopeItem::Value(value), param.span);
            }
        }

        let globals: Vec<_> = self.globals.iter().map(|(&id, source)| (id, *source)).collect();
        for (id, source) in globals {
            let Some(parsed) = &source.decl.ty else {
                continue;
            };
            let ty = self.resolve_type(source.file, parsed);
            let ty = self.check_legal(ty, TypePosition::Value, parsed.span);
            let ty = if !ty.is_error() && ty.mutability() != RuntimeMutability::Constant {
                self.error(
                    DiagnosticId::IllegalGlobalValueType,
                    parsed.span,
                    format!(
                        "global value `{}` must be `const`, found `{}`",
                        self.name(source.decl.name),
                        self.type_name(ty)
                    ),
                );
                AstDataType::ERROR
            } else {
                ty
            };
            self.decls.value_mut(id).ty = ty;
            if let Some(global) = self.globals.get_mut(&id) {
                global.declared = Some(ty);
            }
        }

        self.check_duplicate_overloads();
        self.collect_default_sites();
    }

    /// Same scope, same name, identical parameter directions and types.
    fn check_duplicate_overloads(&mut self) {
        for index in 0..self.script_modules.len() {
            let id = self.script_modules[index].id;
            let module = self.decls.module(id);
            let siblings = self.scopes.own_modules(module.scope, module.name);
            let duplicate = siblings
                .iter()
                .take_while(|&&other| other != id)
                .copied()
                .find(|&other| self.same_signature(id, other));
            if let Some(other) = duplicate {
                let message = format!(
                    "module `{}` is already declared with the same parameters",
                    self.module_name(id)
                );
                let diagnostic = Diagnostic::error(
                    DiagnosticId::DuplicateModuleOverload,
                    self.decls.module(id).span,
                )
                .with_message(message)
                .with_label(self.decls.module(other).span, "previous declaration");
                self.emit(diagnostic);
            }
        }
    }

    fn same_signature(&self, a: ModuleId, b: ModuleId) -> bool {
        let a = &self.decls.module(a).params;
        let b = &self.decls.module(b).params;
        a.len() == b.len()
            && a.iter().zip(b).all(|(&pa, &pb)| {
                let (pa, pb) = (self.decls.param(pa), self.decls.param(pb));
                pa.direction == pb.direction && pa.ty.is_identical_to(&pb.ty)
            })
    }

    /// Record every default-value site in source order.
    fn collect_default_sites(&mut self) {
        let mut structs = self.script_structs.iter();
        let mut modules = self.script_modules.iter();
        let mut global_ids: Vec<_> = self.globals.keys().copied().collect();
        global_ids.sort_unstable();
        let mut globals = global_ids.into_iter();

        let mut sites = Vec::new();
        for file in self.files {
            for item in &file.items {
                match item {
                    Item::Import(_) => {}
                    Item::Value(_) => {
                        if let Some(id) = globals.next() {
                            sites.push(DefaultValueSite::GlobalValue(id));
                        }
                    }
                    Item::Struct(_) => {
                        let Some(script) = structs.next() else { continue };
                        let structure = self.decls.structure(script.id);
                        for (field, def) in structure.fields.iter().enumerate() {
                            if def.default.is_some() {
                                sites.push(DefaultValueSite::StructField {
                                    structure: script.id,
                                    field: u32::try_from(field).unwrap_or(u32::MAX),
                                });
                            }
                        }
                    }
                    Item::Module(_) => {
                        let Some(script) = modules.next() else { continue };
                        for &param in &self.decls.module(script.id).params {
                            if self.decls.param(param).default.is_some() {
                                sites.push(DefaultValueSite::Parameter(param));
                            }
                        }
                    }
                }
            }
        }
        self.default_sites = sites;
    }
}
