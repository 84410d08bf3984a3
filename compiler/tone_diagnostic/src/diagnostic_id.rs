//! Stable identifiers for every diagnostic the analyzer can emit.
//!
//! The identifier string (e.g. `ValueMaybeNotInitialized`) is the contract
//! golden-file and unit tests match on; the human-readable message may change
//! freely.

use std::fmt;

/// Broad classification of a diagnostic.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum DiagnosticCategory {
    NameResolution,
    Type,
    Initialization,
    Overload,
    ControlFlow,
    CyclicDependency,
    ResourceLimit,
}

macro_rules! diagnostic_ids {
    ($($category:ident => [$($(#[$doc:meta])* $id:ident),* $(,)?]),* $(,)?) => {
        /// Identifier of a diagnostic kind.
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
        pub enum DiagnosticId {
            $($($(#[$doc])* $id,)*)*
        }

        impl DiagnosticId {
            /// Every identifier, in declaration order.
            pub const ALL: &'static [DiagnosticId] = &[$($(DiagnosticId::$id,)*)*];

            /// The stable identifier string.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $($(DiagnosticId::$id => stringify!($id),)*)*
                }
            }

            pub const fn category(self) -> DiagnosticCategory {
                match self {
                    $($(DiagnosticId::$id => DiagnosticCategory::$category,)*)*
                }
            }
        }
    };
}

diagnostic_ids! {
    NameResolution => [
        UnresolvedIdentifier,
        /// Unknown struct field or unknown name inside an imported scope.
        UnresolvedMember,
        UnresolvedType,
        UnresolvedImport,
        /// Value, module or import alias collides with an existing item.
        NameConflict,
        StructNameConflict,
        /// Two overloads with identical parameter lists in one scope.
        DuplicateModuleOverload,
        /// A module group or imported scope used where a value is expected.
        NotAValue,
        /// Call target is not a module.
        NotAModule,
    ],
    Type => [
        IllegalValueType,
        IllegalParameterType,
        IllegalReturnType,
        IllegalGlobalValueType,
        IllegalArrayIndexResultType,
        InvalidUpsampleFactor,
        InvalidAssignment,
        ValueTypeNotInferable,
        IllegalConversion,
        ArrayLiteralNoCommonType,
        TernaryNoCommonType,
        ConditionNotBool,
        ArrayIndexNotInt,
        NotAnArray,
        NotAStruct,
        ArrayConcatTypeMismatch,
        ArrayRepeatCountNotConstantInt,
        ArrayRepeatCountNegative,
        StructValueMissingField,
        DuplicateStructValueField,
        ReturnTypeMismatch,
        ReturnValueInVoidModule,
        MissingReturnValue,
        ModuleMissingReturn,
        AssignmentTargetNotWritable,
        InvalidAssignmentTarget,
        OutParameterDefaultValue,
        InvalidDefaultValue,
        ExpressionHasNoEffect,
    ],
    Initialization => [
        ValueNotInitialized,
        ValueMaybeNotInitialized,
        OutputParameterNotInitialized,
        OutputParameterMaybeNotInitialized,
    ],
    Overload => [
        ModuleCallNoMatchingOverload,
        ModuleCallAmbiguous,
        ModuleCallPositionalAfterNamed,
        ModuleCallDuplicateArgument,
        ModuleCallUnknownArgument,
        ModuleCallTooManyArguments,
        ModuleCallDirectionMismatch,
        ModuleCallMissingArgument,
        ModuleCallArgumentTypeMismatch,
        ModuleCallOutArgumentNotWritable,
        ModuleCallUpsampleFactorNotIntegral,
        ModuleCallInvalidUpsampleFactor,
        NoMatchingOperatorOverload,
    ],
    ControlFlow => [
        IllegalBreak,
        IllegalContinue,
        UnreachableCode,
    ],
    CyclicDependency => [
        ModuleParameterDefaultValueCyclicDependency,
        StructFieldDefaultValueCyclicDependency,
        GlobalValueCyclicDependency,
    ],
    ResourceLimit => [
        MaxArrayElementCountExceeded,
    ],
}

impl fmt::Display for DiagnosticId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
