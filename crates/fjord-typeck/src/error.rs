//! Error types produced by the checker.
//!
//! Errors are grouped by the layer that detects them:
//!
//! - [`ExprError`]: an expression cannot be given the required type
//! - [`TypeError`]: a type expression is malformed or violates a bound
//! - [`TypeDeclError`]: a type declaration is invalid
//! - [`KmdError`]: a data-tagged type cannot be serialized
//! - [`FunctionError`]: a function or constant signature is invalid
//! - [`ProgramError`]: the module structure of the program is invalid
//!
//! Every error carries the [`TextRange`] of the offending source.
//! [`CheckError`] wraps all of them for reporting.

use std::fmt;

use rowan::TextRange;

// ── Type errors ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct TypeError {
    pub kind: TypeErrorKind,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeErrorKind {
    TypeNotFound { name: String },
    WrongParameterQuantity {
        type_name: String,
        required: usize,
        given: usize,
    },
    TooManyUnionItems { defined: usize, limit: usize },
    TooManyProductItems { defined: usize, limit: usize },
    CaseBadVariance { case_name: String, union_name: String },
    CaseBadBounds { case_name: String, union_name: String },
    BoxedBadVariance { bad_params: Vec<String> },
    /// `kind` is `'<'` for an upper bound and `'>'` for a lower bound.
    BoundNotSatisfied { kind: char, bound: String },
    BadTypeArg {
        index: usize,
        name: String,
        detail: Box<TypeError>,
    },
    InvalidBoundType { ty: String },
    InvalidFieldName { name: String },
    DuplicateField { name: String },
}

impl TypeError {
    pub fn new(kind: TypeErrorKind, span: TextRange) -> Self {
        Self { kind, span }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeErrorKind::TypeNotFound { name } => write!(f, "no such type: {}", name),
            TypeErrorKind::WrongParameterQuantity {
                type_name,
                required,
                given,
            } => write!(
                f,
                "wrong parameter quantity for {}: {} required but {} given",
                type_name, required, given
            ),
            TypeErrorKind::TooManyUnionItems { defined, limit } => write!(
                f,
                "too many union cases: {} defined, the limit is {}",
                defined, limit
            ),
            TypeErrorKind::TooManyProductItems { defined, limit } => write!(
                f,
                "too many tuple or bundle items: {} defined, the limit is {}",
                defined, limit
            ),
            TypeErrorKind::CaseBadVariance {
                case_name,
                union_name,
            } => write!(
                f,
                "variance of case type {} does not match its union {}",
                case_name, union_name
            ),
            TypeErrorKind::CaseBadBounds {
                case_name,
                union_name,
            } => write!(
                f,
                "bounds of case type {} do not match its union {}",
                case_name, union_name
            ),
            TypeErrorKind::BoxedBadVariance { bad_params } => write!(
                f,
                "inner type uses parameters against their declared variance: {}",
                bad_params.join(", ")
            ),
            TypeErrorKind::BoundNotSatisfied { kind, bound } => {
                write!(f, "type parameter bound {} {} not satisfied", kind, bound)
            }
            TypeErrorKind::BadTypeArg {
                index,
                name,
                detail,
            } => write!(f, "bad type argument #{} ({}): {}", index, name, detail),
            TypeErrorKind::InvalidBoundType { ty } => {
                write!(f, "invalid bound type {}: a bound cannot be a type parameter", ty)
            }
            TypeErrorKind::InvalidFieldName { name } => write!(f, "invalid field name: {}", name),
            TypeErrorKind::DuplicateField { name } => write!(f, "duplicate field: {}", name),
        }
    }
}

impl std::error::Error for TypeError {}

// ── Declaration errors ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDeclError {
    pub kind: TypeDeclErrorKind,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDeclErrorKind {
    DuplicateTypeDecl { name: String },
    InvalidTypeName { name: String },
    DuplicateTypeParam { name: String },
    InvalidCaseTypeParam { name: String },
    TypeCircularDependency { path: Vec<String> },
    InvalidTypeDecl { type_name: String, detail: TypeError },
    InvalidTypeTag { tag: String, info: String },
}

impl TypeDeclError {
    pub fn new(kind: TypeDeclErrorKind, span: TextRange) -> Self {
        Self { kind, span }
    }
}

impl fmt::Display for TypeDeclError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeDeclErrorKind::DuplicateTypeDecl { name } => {
                write!(f, "duplicate type declaration: {}", name)
            }
            TypeDeclErrorKind::InvalidTypeName { name } => {
                write!(f, "invalid type name: {}", name)
            }
            TypeDeclErrorKind::DuplicateTypeParam { name } => {
                write!(f, "duplicate type parameter: {}", name)
            }
            TypeDeclErrorKind::InvalidCaseTypeParam { name } => write!(
                f,
                "type parameter {} of a case type must also be a parameter of its union",
                name
            ),
            TypeDeclErrorKind::TypeCircularDependency { path } => write!(
                f,
                "dependency cycle found among types: {}",
                path.join(" -> ")
            ),
            TypeDeclErrorKind::InvalidTypeDecl { type_name, detail } => {
                write!(f, "invalid declaration of {}: {}", type_name, detail)
            }
            TypeDeclErrorKind::InvalidTypeTag { tag, info } => {
                write!(f, "invalid type tag `{}`: {}", tag, info)
            }
        }
    }
}

impl std::error::Error for TypeDeclError {}

// ── Expression errors ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ExprError {
    pub kind: ExprErrorKind,
    pub span: TextRange,
}

/// A rejected overload candidate and why it was rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateError {
    pub desc: String,
    pub error: ExprError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprErrorKind {
    NotAssignable { from: String, to: String },
    ExplicitTypeRequired,
    ExplicitTypeParamsRequired,
    TypeErrorInExpr(TypeError),
    NotCaseType { ty: String, union: String },
    BoxNonBoxedType { name: String },
    BoxProtectedType { name: String },
    BoxOpaqueType { name: String },
    FunctionWrongTypeParamsQuantity {
        name: String,
        given: usize,
        required: usize,
    },
    NoneOfFunctionsCallable { candidates: Vec<CandidateError> },
    NoneOfFunctionsAssignable {
        to: String,
        candidates: Vec<CandidateError>,
    },
    AmbiguousCall { candidates: Vec<String> },
    AmbiguousFunctionAssign { candidates: Vec<String> },
    LambdaAssignedToNonFuncType { non_func: String },
    ExprTypeNotCallable { ty: String },
    ExprNotCallable,
    TupleSizeNotMatching {
        required: usize,
        given: usize,
        given_type: String,
    },
    TupleAssignedToNonTupleType { non_tuple: String },
    BundleAssignedToNonBundleType { non_bundle: String },
    MissingField { field: String, ty: String },
    SuperfluousField { field: String, ty: String },
    DuplicateField { field: String },
    FieldDoesNotExist { field: String, target: String },
    GetFromLiteralBundle,
    GetFromOpaqueBundle,
    GetFromNonBundle,
    SetToLiteralBundle,
    SetToOpaqueBundle,
    SetToNonBundle,
    MatchingNonTupleType,
    MatchingOpaqueTupleType,
    MatchingNonBundleType,
    MatchingOpaqueBundleType,
    DuplicateBinding { name: String },
    EntireValueIgnored,
    InvalidSwitchArgType { arg_type: String },
    TypeParametersUnnecessary,
    NotBranchType { union: String, type_name: String },
    CheckedBranch,
    DuplicateDefaultBranch,
    SuperfluousDefaultBranch,
    IncompleteMatch { missing: Vec<String> },
    WrongMultiBranchTypeQuantity { required: usize, given: usize },
    MultiBranchTypesAllDefault,
    IncompleteMultiMatch { missing: usize },
    ArrayAssignedToNonArrayType { non_array: String },
    IntegerAssignedToNonIntegerType { non_integer: String },
    IntegerOverflow { kind: String },
    InvalidInteger { literal: String },
    TypeOrValueNotFound { name: String },
    TypeParamInExpr { name: String },
    SuperfluousTypeArgs,
    TypeUsedAsValue { name: String },
    RecursiveMarkUsedOnNonLambda,
    /// A consistency check of the checker itself failed.
    Internal { detail: String },
}

impl ExprError {
    pub fn new(kind: ExprErrorKind, span: TextRange) -> Self {
        Self { kind, span }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self.kind, ExprErrorKind::Internal { .. })
    }
}

impl From<TypeError> for ExprError {
    fn from(err: TypeError) -> Self {
        let span = err.span;
        ExprError::new(ExprErrorKind::TypeErrorInExpr(err), span)
    }
}

fn write_candidates(f: &mut fmt::Formatter<'_>, candidates: &[CandidateError]) -> fmt::Result {
    for c in candidates {
        write!(f, "\n  {}: {}", c.desc, c.error)?;
    }
    Ok(())
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ExprErrorKind::*;
        match &self.kind {
            NotAssignable { from, to } => write!(
                f,
                "value of type {} cannot be assigned to type {}",
                from, to
            ),
            ExplicitTypeRequired => write!(f, "explicit type required"),
            ExplicitTypeParamsRequired => write!(f, "explicit type parameters required"),
            TypeErrorInExpr(err) => write!(f, "{}", err),
            NotCaseType { ty, union } => {
                write!(f, "type {} is not a case type of {}", ty, union)
            }
            BoxNonBoxedType { name } => write!(f, "cannot box a value into non-boxed type {}", name),
            BoxProtectedType { name } => {
                write!(f, "cannot box a value into protected type {}", name)
            }
            BoxOpaqueType { name } => write!(f, "cannot box a value into opaque type {}", name),
            FunctionWrongTypeParamsQuantity {
                name,
                given,
                required,
            } => write!(
                f,
                "wrong type parameter quantity for {}: {} required but {} given",
                name, required, given
            ),
            NoneOfFunctionsCallable { candidates } => {
                write!(f, "none of the functions are callable")?;
                write_candidates(f, candidates)
            }
            NoneOfFunctionsAssignable { to, candidates } => {
                write!(f, "none of the functions can be assigned to type {}", to)?;
                write_candidates(f, candidates)
            }
            AmbiguousCall { candidates } => write!(
                f,
                "ambiguous call, candidates: {}",
                candidates.join("; ")
            ),
            AmbiguousFunctionAssign { candidates } => write!(
                f,
                "ambiguous function reference, candidates: {}",
                candidates.join("; ")
            ),
            LambdaAssignedToNonFuncType { non_func } => {
                write!(f, "lambda cannot be assigned to non-function type {}", non_func)
            }
            ExprTypeNotCallable { ty } => write!(f, "value of type {} is not callable", ty),
            ExprNotCallable => write!(f, "expression is not callable"),
            TupleSizeNotMatching {
                required,
                given,
                given_type,
            } => write!(
                f,
                "tuple size not matching: {} required but {} given ({})",
                required, given, given_type
            ),
            TupleAssignedToNonTupleType { non_tuple } => {
                write!(f, "tuple cannot be assigned to non-tuple type {}", non_tuple)
            }
            BundleAssignedToNonBundleType { non_bundle } => {
                write!(f, "bundle cannot be assigned to non-bundle type {}", non_bundle)
            }
            MissingField { field, ty } => write!(f, "missing field {} of type {}", field, ty),
            SuperfluousField { field, ty } => {
                write!(f, "superfluous field {} for type {}", field, ty)
            }
            DuplicateField { field } => write!(f, "duplicate field: {}", field),
            FieldDoesNotExist { field, target } => {
                write!(f, "field {} does not exist on {}", field, target)
            }
            GetFromLiteralBundle => write!(f, "cannot get a field from a bundle literal"),
            GetFromOpaqueBundle => write!(f, "cannot get a field from an opaque bundle"),
            GetFromNonBundle => write!(f, "cannot get a field from a non-bundle value"),
            SetToLiteralBundle => write!(f, "cannot update a bundle literal"),
            SetToOpaqueBundle => write!(f, "cannot update an opaque bundle"),
            SetToNonBundle => write!(f, "cannot update a non-bundle value"),
            MatchingNonTupleType => write!(f, "cannot match a non-tuple type as a tuple"),
            MatchingOpaqueTupleType => write!(f, "cannot match an opaque tuple type"),
            MatchingNonBundleType => write!(f, "cannot match a non-bundle type as a bundle"),
            MatchingOpaqueBundleType => write!(f, "cannot match an opaque bundle type"),
            DuplicateBinding { name } => write!(f, "duplicate binding: {}", name),
            EntireValueIgnored => write!(f, "entire value ignored"),
            InvalidSwitchArgType { arg_type } => {
                write!(f, "cannot switch over a value of non-union type {}", arg_type)
            }
            TypeParametersUnnecessary => write!(f, "type parameters unnecessary here"),
            NotBranchType { union, type_name } => {
                write!(f, "type {} is not a case of the union {}", type_name, union)
            }
            CheckedBranch => write!(f, "this case is already checked by another branch"),
            DuplicateDefaultBranch => write!(f, "duplicate default branch"),
            SuperfluousDefaultBranch => write!(f, "superfluous default branch"),
            IncompleteMatch { missing } => {
                write!(f, "incomplete match: missing {}", missing.join(", "))
            }
            WrongMultiBranchTypeQuantity { required, given } => write!(
                f,
                "wrong branch type quantity: {} required but {} given",
                required, given
            ),
            MultiBranchTypesAllDefault => write!(f, "all branch types are `_`, use a default branch"),
            IncompleteMultiMatch { missing } => {
                write!(f, "incomplete match: {} combination(s) missing", missing)
            }
            ArrayAssignedToNonArrayType { non_array } => {
                write!(f, "array cannot be assigned to non-array type {}", non_array)
            }
            IntegerAssignedToNonIntegerType { non_integer } => write!(
                f,
                "integer literal cannot be assigned to non-integer type {}",
                non_integer
            ),
            IntegerOverflow { kind } => write!(f, "integer literal overflows {}", kind),
            InvalidInteger { literal } => write!(f, "invalid integer literal: {}", literal),
            TypeOrValueNotFound { name } => write!(f, "no such type or value: {}", name),
            TypeParamInExpr { name } => {
                write!(f, "type parameter {} cannot be used as a value", name)
            }
            SuperfluousTypeArgs => write!(f, "superfluous type arguments"),
            TypeUsedAsValue { name } => write!(f, "type {} cannot be used as a value", name),
            RecursiveMarkUsedOnNonLambda => {
                write!(f, "recursive binding requires a typed lambda")
            }
            Internal { detail } => write!(f, "internal checker error: {}", detail),
        }
    }
}

impl std::error::Error for ExprError {}

// ── Serialization errors ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct KmdError {
    pub kind: KmdErrorKind,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum KmdErrorKind {
    OnNative,
    OnGeneric,
    DuplicateType { id: String },
    ElementNotSerializable { index: usize },
    FieldNotSerializable { name: String },
    CaseNotSerializable { name: String },
}

impl KmdError {
    pub fn new(kind: KmdErrorKind, span: TextRange) -> Self {
        Self { kind, span }
    }
}

impl fmt::Display for KmdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            KmdErrorKind::OnNative => write!(f, "native type cannot be a data type"),
            KmdErrorKind::OnGeneric => write!(f, "generic type cannot be a data type"),
            KmdErrorKind::DuplicateType { id } => write!(f, "duplicate data type id: {}", id),
            KmdErrorKind::ElementNotSerializable { index } => {
                write!(f, "tuple element #{} is not serializable", index)
            }
            KmdErrorKind::FieldNotSerializable { name } => {
                write!(f, "field {} is not serializable", name)
            }
            KmdErrorKind::CaseNotSerializable { name } => {
                write!(f, "case type {} is not a data type", name)
            }
        }
    }
}

impl std::error::Error for KmdError {}

// ── Function errors ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionError {
    pub kind: FunctionErrorKind,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionErrorKind {
    InvalidOverload { name: String, existing_module: String },
    InvalidName { name: String },
    DuplicateConstant { name: String },
    DuplicateTypeParam { name: String },
    Signature(TypeError),
}

impl FunctionError {
    pub fn new(kind: FunctionErrorKind, span: TextRange) -> Self {
        Self { kind, span }
    }
}

impl fmt::Display for FunctionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FunctionErrorKind::InvalidOverload {
                name,
                existing_module,
            } => write!(
                f,
                "invalid overload of {}: same signature already declared in {}",
                name, existing_module
            ),
            FunctionErrorKind::InvalidName { name } => write!(f, "invalid name: {}", name),
            FunctionErrorKind::DuplicateConstant { name } => {
                write!(f, "duplicate constant: {}", name)
            }
            FunctionErrorKind::DuplicateTypeParam { name } => {
                write!(f, "duplicate type parameter: {}", name)
            }
            FunctionErrorKind::Signature(err) => write!(f, "invalid signature: {}", err),
        }
    }
}

impl std::error::Error for FunctionError {}

// ── Program errors ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ProgramError {
    DuplicateModule { name: String },
    UnknownModule { name: String, imported_by: String, span: TextRange },
    ImportCycle { path: Vec<String> },
    DependencyFailed { module: String, dependency: String },
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramError::DuplicateModule { name } => write!(f, "duplicate module: {}", name),
            ProgramError::UnknownModule {
                name, imported_by, ..
            } => write!(f, "module {} imports unknown module {}", imported_by, name),
            ProgramError::ImportCycle { path } => {
                write!(f, "import cycle: {}", path.join(" -> "))
            }
            ProgramError::DependencyFailed { module, dependency } => write!(
                f,
                "module {} skipped: its dependency {} has errors",
                module, dependency
            ),
        }
    }
}

impl std::error::Error for ProgramError {}

// ── Umbrella ───────────────────────────────────────────────────────────

/// Any error the checker reports.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckError {
    Expr(ExprError),
    Type(TypeError),
    Decl(TypeDeclError),
    Data(KmdError),
    Function(FunctionError),
    Program(ProgramError),
}

impl CheckError {
    pub fn span(&self) -> Option<TextRange> {
        match self {
            CheckError::Expr(e) => Some(e.span),
            CheckError::Type(e) => Some(e.span),
            CheckError::Decl(e) => Some(e.span),
            CheckError::Data(e) => Some(e.span),
            CheckError::Function(e) => Some(e.span),
            CheckError::Program(ProgramError::UnknownModule { span, .. }) => Some(*span),
            CheckError::Program(_) => None,
        }
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::Expr(e) => e.fmt(f),
            CheckError::Type(e) => e.fmt(f),
            CheckError::Decl(e) => e.fmt(f),
            CheckError::Data(e) => e.fmt(f),
            CheckError::Function(e) => e.fmt(f),
            CheckError::Program(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for CheckError {}

impl From<ExprError> for CheckError {
    fn from(e: ExprError) -> Self {
        CheckError::Expr(e)
    }
}

impl From<TypeError> for CheckError {
    fn from(e: TypeError) -> Self {
        CheckError::Type(e)
    }
}

impl From<TypeDeclError> for CheckError {
    fn from(e: TypeDeclError) -> Self {
        CheckError::Decl(e)
    }
}

impl From<KmdError> for CheckError {
    fn from(e: KmdError) -> Self {
        CheckError::Data(e)
    }
}

impl From<FunctionError> for CheckError {
    fn from(e: FunctionError) -> Self {
        CheckError::Function(e)
    }
}

impl From<ProgramError> for CheckError {
    fn from(e: ProgramError) -> Self {
        CheckError::Program(e)
    }
}
