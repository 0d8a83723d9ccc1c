//! Ariadne-based rendering of checker errors.
//!
//! Every error gets a stable code, its message, a label on its span and,
//! where an obvious fix exists, a help line. Output is colorless so that
//! it can be snapshot tested.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use crate::error::{
    CheckError, ExprErrorKind, FunctionErrorKind, KmdErrorKind, ProgramError, TypeDeclErrorKind, TypeErrorKind,
};

// ── Error Codes ────────────────────────────────────────────────────────

fn type_error_code(kind: &TypeErrorKind) -> &'static str {
    match kind {
        TypeErrorKind::TypeNotFound { .. } => "E0101",
        TypeErrorKind::WrongParameterQuantity { .. } => "E0102",
        TypeErrorKind::TooManyUnionItems { .. } => "E0103",
        TypeErrorKind::TooManyProductItems { .. } => "E0104",
        TypeErrorKind::CaseBadVariance { .. } => "E0105",
        TypeErrorKind::CaseBadBounds { .. } => "E0106",
        TypeErrorKind::BoxedBadVariance { .. } => "E0107",
        TypeErrorKind::BoundNotSatisfied { .. } => "E0108",
        TypeErrorKind::BadTypeArg { .. } => "E0109",
        TypeErrorKind::InvalidBoundType { .. } => "E0110",
        TypeErrorKind::InvalidFieldName { .. } => "E0111",
        TypeErrorKind::DuplicateField { .. } => "E0112",
    }
}

fn expr_error_code(kind: &ExprErrorKind) -> &'static str {
    use ExprErrorKind::*;
    match kind {
        NotAssignable { .. } => "E0301",
        ExplicitTypeRequired => "E0302",
        ExplicitTypeParamsRequired => "E0303",
        TypeErrorInExpr(inner) => type_error_code(&inner.kind),
        NotCaseType { .. } => "E0304",
        BoxNonBoxedType { .. } => "E0305",
        BoxProtectedType { .. } => "E0306",
        BoxOpaqueType { .. } => "E0307",
        FunctionWrongTypeParamsQuantity { .. } => "E0308",
        NoneOfFunctionsCallable { .. } => "E0309",
        NoneOfFunctionsAssignable { .. } => "E0310",
        AmbiguousCall { .. } => "E0311",
        AmbiguousFunctionAssign { .. } => "E0312",
        LambdaAssignedToNonFuncType { .. } => "E0313",
        ExprTypeNotCallable { .. } => "E0314",
        ExprNotCallable => "E0315",
        TupleSizeNotMatching { .. } => "E0316",
        TupleAssignedToNonTupleType { .. } => "E0317",
        BundleAssignedToNonBundleType { .. } => "E0318",
        MissingField { .. } => "E0319",
        SuperfluousField { .. } => "E0320",
        DuplicateField { .. } => "E0321",
        FieldDoesNotExist { .. } => "E0322",
        GetFromLiteralBundle | GetFromOpaqueBundle | GetFromNonBundle => "E0323",
        SetToLiteralBundle | SetToOpaqueBundle | SetToNonBundle => "E0324",
        MatchingNonTupleType | MatchingOpaqueTupleType => "E0325",
        MatchingNonBundleType | MatchingOpaqueBundleType => "E0326",
        DuplicateBinding { .. } => "E0327",
        EntireValueIgnored => "E0328",
        InvalidSwitchArgType { .. } => "E0329",
        TypeParametersUnnecessary => "E0330",
        NotBranchType { .. } => "E0331",
        CheckedBranch => "E0332",
        DuplicateDefaultBranch => "E0333",
        SuperfluousDefaultBranch => "E0334",
        IncompleteMatch { .. } => "E0335",
        WrongMultiBranchTypeQuantity { .. } => "E0336",
        MultiBranchTypesAllDefault => "E0337",
        IncompleteMultiMatch { .. } => "E0338",
        ArrayAssignedToNonArrayType { .. } => "E0339",
        IntegerAssignedToNonIntegerType { .. } => "E0340",
        IntegerOverflow { .. } => "E0341",
        InvalidInteger { .. } => "E0342",
        TypeOrValueNotFound { .. } => "E0343",
        TypeParamInExpr { .. } => "E0344",
        SuperfluousTypeArgs => "E0345",
        TypeUsedAsValue { .. } => "E0346",
        RecursiveMarkUsedOnNonLambda => "E0347",
        Internal { .. } => "E0999",
    }
}

/// The stable code of an error, e.g. `E0335` for an incomplete match.
pub fn error_code(err: &CheckError) -> &'static str {
    match err {
        CheckError::Type(e) => type_error_code(&e.kind),
        CheckError::Decl(e) => match &e.kind {
            TypeDeclErrorKind::DuplicateTypeDecl { .. } => "E0201",
            TypeDeclErrorKind::InvalidTypeName { .. } => "E0202",
            TypeDeclErrorKind::DuplicateTypeParam { .. } => "E0203",
            TypeDeclErrorKind::InvalidCaseTypeParam { .. } => "E0204",
            TypeDeclErrorKind::TypeCircularDependency { .. } => "E0205",
            TypeDeclErrorKind::InvalidTypeDecl { .. } => "E0206",
            TypeDeclErrorKind::InvalidTypeTag { .. } => "E0207",
        },
        CheckError::Expr(e) => expr_error_code(&e.kind),
        CheckError::Data(e) => match &e.kind {
            KmdErrorKind::OnNative => "E0401",
            KmdErrorKind::OnGeneric => "E0402",
            KmdErrorKind::DuplicateType { .. } => "E0403",
            KmdErrorKind::ElementNotSerializable { .. } => "E0404",
            KmdErrorKind::FieldNotSerializable { .. } => "E0405",
            KmdErrorKind::CaseNotSerializable { .. } => "E0406",
        },
        CheckError::Function(e) => match &e.kind {
            FunctionErrorKind::InvalidOverload { .. } => "E0501",
            FunctionErrorKind::InvalidName { .. } => "E0502",
            FunctionErrorKind::DuplicateConstant { .. } => "E0503",
            FunctionErrorKind::DuplicateTypeParam { .. } => "E0504",
            FunctionErrorKind::Signature(inner) => type_error_code(&inner.kind),
        },
        CheckError::Program(e) => match e {
            ProgramError::DuplicateModule { .. } => "E0601",
            ProgramError::UnknownModule { .. } => "E0602",
            ProgramError::ImportCycle { .. } => "E0603",
            ProgramError::DependencyFailed { .. } => "E0604",
        },
    }
}

// ── Help ───────────────────────────────────────────────────────────────

fn help(err: &CheckError) -> Option<&'static str> {
    let CheckError::Expr(e) = err else {
        return match err {
            CheckError::Program(ProgramError::ImportCycle { .. }) => {
                Some("move the shared declarations into a module of their own")
            }
            _ => None,
        };
    };
    match &e.kind {
        ExprErrorKind::ExplicitTypeRequired => Some("add a type annotation, or cast with `as`"),
        ExprErrorKind::ExplicitTypeParamsRequired => Some("pass the type arguments explicitly"),
        ExprErrorKind::IncompleteMatch { .. } | ExprErrorKind::IncompleteMultiMatch { .. } => {
            Some("add the missing branches, or a default branch")
        }
        ExprErrorKind::SuperfluousDefaultBranch => Some("remove the default branch"),
        ExprErrorKind::AmbiguousCall { .. } | ExprErrorKind::AmbiguousFunctionAssign { .. } => {
            Some("cast the result with `as` to pick one")
        }
        ExprErrorKind::Internal { .. } => Some("this is a bug in the checker"),
        _ => None,
    }
}

// ── Rendering ──────────────────────────────────────────────────────────

fn text_range_to_range(range: rowan::TextRange) -> Range<usize> {
    let start: usize = range.start().into();
    let end: usize = range.end().into();
    start..end
}

fn render_plain(err: &CheckError) -> String {
    let mut out = format!("error[{}]: {}", error_code(err), err);
    if let Some(help) = help(err) {
        out.push_str("\nhelp: ");
        out.push_str(help);
    }
    out
}

/// Render one error against the source of the module it was found in.
/// Without a source there is nothing to label, and the error is rendered
/// as a single line plus its help.
pub fn render_diagnostic(err: &CheckError, source: &str, filename: &str) -> String {
    if source.is_empty() {
        return render_plain(err);
    }
    let source_len = source.len();
    let span = err.span().map(text_range_to_range).unwrap_or(0..0);
    let start = span.start.min(source_len);
    let end = span.end.min(source_len).max(start);
    let span = if start == end {
        start..(end + 1).min(source_len)
    } else {
        start..end
    };
    let msg = err.to_string();
    let label = msg.lines().next().unwrap_or_default().to_string();

    let mut builder = Report::build(ReportKind::Error, span.clone())
        .with_code(error_code(err))
        .with_message(&msg)
        .with_config(Config::default().with_color(false))
        .with_label(Label::new(span).with_message(label).with_color(Color::Red));
    if let Some(help) = help(err) {
        builder.set_help(help);
    }
    if !filename.is_empty() {
        builder.set_note(format!("in {}", filename));
    }

    let mut buf = Vec::new();
    if builder.finish().write(Source::from(source), &mut buf).is_err() {
        return render_plain(err);
    }
    String::from_utf8(buf).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}
