//! Checking whole programs.
//!
//! A program is checked module by module, each after all of its imports.
//! Type declarations of all modules go into one registry up front; the
//! rest (signatures, bodies, `do` effects) is checked per module against
//! the signatures that module can see. Errors accumulate: checking goes on
//! past a failed declaration, but a module with any error yields no
//! [`CheckedModule`], and the modules importing it are skipped.

use std::collections::BTreeMap;

use fjord_ast::item::{DoStmt, Module, Program};
use fjord_common::module_graph::{topological_sort, ModuleGraph, ModuleId};
use fjord_common::symbol::CORE_MODULE;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, instrument};

use crate::builtins::{core_module, effect_of};
use crate::config::TypeckConfig;
use crate::data::{check_data_types, DataTable};
use crate::declare::declare_types;
use crate::diagnostics::{error_code, render_diagnostic};
use crate::error::{CheckError, ExprError, ProgramError};
use crate::expr::{check_and_assign, Expr};
use crate::function::{
    check_constant, check_function, collect_scope, overload_indices, BodyEnv, CheckedConstant, CheckedFunction,
};
use crate::infer::TypeArgsInferringContext;
use crate::ty::{Type, TypeBounds, TypeRegistry};

/// A module whose every declaration checked.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedModule {
    pub name: String,
    /// Directly imported modules, `Core` excluded.
    pub imported: Vec<String>,
    pub constants: Vec<CheckedConstant>,
    pub functions: Vec<CheckedFunction>,
    pub effects: Vec<Expr>,
}

/// An error and the module it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleError {
    pub module: String,
    pub error: CheckError,
}

#[derive(Debug, Default)]
pub struct CheckResult {
    /// Modules in checking order.
    pub order: Vec<String>,
    pub modules: BTreeMap<String, CheckedModule>,
    pub registry: TypeRegistry,
    pub data: DataTable,
    pub errors: Vec<ModuleError>,
}

impl CheckResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors_of<'a>(&'a self, module: &'a str) -> impl Iterator<Item = &'a CheckError> + 'a {
        self.errors.iter().filter(move |e| e.module == module).map(|e| &e.error)
    }

    /// Render every error against its module's source text; modules with
    /// no source in `sources` render against an empty one.
    pub fn render_errors(&self, sources: &FxHashMap<String, String>) -> String {
        self.errors
            .iter()
            .map(|e| {
                let source = sources.get(&e.module).map_or("", String::as_str);
                render_diagnostic(&e.error, source, &e.module)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The errors as JSON, for tooling.
    pub fn errors_json(&self) -> serde_json::Value {
        let errors: Vec<serde_json::Value> = self
            .errors
            .iter()
            .map(|e| {
                let span = e.error.span().map(|r| {
                    let (start, end): (u32, u32) = (r.start().into(), r.end().into());
                    serde_json::json!({ "start": start, "end": end })
                });
                serde_json::json!({
                    "module": e.module,
                    "code": error_code(&e.error),
                    "message": e.error.to_string(),
                    "span": span,
                })
            })
            .collect();
        serde_json::Value::Array(errors)
    }
}

// ── Import graph ───────────────────────────────────────────────────────

struct Graph {
    graph: ModuleGraph,
    /// Module index in the program, per graph id.
    modules: FxHashMap<ModuleId, usize>,
}

fn build_graph(program: &Program, errors: &mut Vec<ModuleError>) -> Graph {
    let mut graph = ModuleGraph::new();
    let mut added = Vec::with_capacity(program.modules.len());
    for (i, m) in program.modules.iter().enumerate() {
        if m.name == CORE_MODULE || graph.resolve(&m.name).is_some() {
            errors.push(ModuleError {
                module: m.name.clone(),
                error: ProgramError::DuplicateModule { name: m.name.clone() }.into(),
            });
            continue;
        }
        added.push((graph.add_module(m.name.as_str()), i));
    }
    for &(id, i) in &added {
        let m = &program.modules[i];
        for import in &m.imports {
            if import.name == CORE_MODULE {
                continue;
            }
            match graph.resolve(&import.name) {
                Some(to) => graph.add_import(id, to),
                None => errors.push(ModuleError {
                    module: m.name.clone(),
                    error: ProgramError::UnknownModule {
                        name: import.name.clone(),
                        imported_by: m.name.clone(),
                        span: import.span,
                    }
                    .into(),
                }),
            }
        }
    }
    Graph {
        graph,
        modules: added.into_iter().collect(),
    }
}

// ── Program ────────────────────────────────────────────────────────────

/// Check every module of `program`.
pub fn check_program(program: &Program, config: &TypeckConfig) -> CheckResult {
    let mut result = CheckResult::default();
    let Graph { graph, modules } = build_graph(program, &mut result.errors);
    let order = match topological_sort(&graph) {
        Ok(order) => order,
        Err(cycle) => {
            let module = cycle.cycle_path.first().cloned().unwrap_or_default();
            result.errors.push(ModuleError {
                module,
                error: ProgramError::ImportCycle {
                    path: cycle.cycle_path,
                }
                .into(),
            });
            return result;
        }
    };

    let core = core_module();
    let mut all: Vec<&Module> = vec![&core];
    all.extend(program.modules.iter());
    let declared = declare_types(&all, &config.limits);
    let (data, data_errors) = check_data_types(&declared.registry);

    // Modules that failed, directly or through an import.
    let mut failed: FxHashSet<String> = FxHashSet::default();
    // Modules with a duplicate name or an unknown import.
    let mut broken_imports: FxHashSet<String> = result.errors.iter().map(|e| e.module.clone()).collect();

    for id in order {
        let Some(&i) = modules.get(&id) else { continue };
        let module = &program.modules[i];
        result.order.push(module.name.clone());

        let imports: Vec<&Module> = graph
            .get(id)
            .imports
            .iter()
            .filter_map(|to| modules.get(to).map(|&j| &program.modules[j]))
            .collect();
        if let Some(dep) = imports.iter().find(|m| failed.contains(&m.name)) {
            debug!(module = %module.name, dependency = %dep.name, "skipping module");
            result.errors.push(ModuleError {
                module: module.name.clone(),
                error: ProgramError::DependencyFailed {
                    module: module.name.clone(),
                    dependency: dep.name.clone(),
                }
                .into(),
            });
            failed.insert(module.name.clone());
            continue;
        }

        let mut errors: Vec<CheckError> = declared.errors_of(&module.name).cloned().collect();
        errors.extend(
            data_errors
                .iter()
                .filter(|(symbol, _)| symbol.module == module.name)
                .map(|(_, e)| e.clone().into()),
        );
        let mut visible = vec![&core];
        visible.extend(imports.iter().copied());
        let checked = check_module(module, &visible, &declared.registry, config, &mut errors);

        if broken_imports.remove(&module.name) || !errors.is_empty() {
            failed.insert(module.name.clone());
        }
        result.errors.extend(errors.into_iter().map(|error| ModuleError {
            module: module.name.clone(),
            error,
        }));
        if !failed.contains(&module.name) {
            result.modules.insert(module.name.clone(), checked);
        }
    }
    result.registry = declared.registry;
    result.data = data;
    result
}

#[instrument(skip_all, fields(module = %module.name))]
fn check_module(
    module: &Module,
    imported: &[&Module],
    registry: &TypeRegistry,
    config: &TypeckConfig,
    errors: &mut Vec<CheckError>,
) -> CheckedModule {
    debug!("checking module");
    let (scope, scope_errors) = collect_scope(module, imported, registry, &config.limits);
    errors.extend(scope_errors);
    let env = BodyEnv {
        registry,
        scope: &scope,
        limits: &config.limits,
    };

    let mut functions = Vec::with_capacity(module.functions.len());
    for (decl, index) in module.functions.iter().zip(overload_indices(module)) {
        // A function without a signature has had its error reported.
        let Some(sig) = scope.own_function(&decl.name.name, index) else { continue };
        match check_function(decl, sig, env) {
            Ok(f) => functions.push(f),
            Err(err) => errors.push(err.into()),
        }
    }

    let mut constants = Vec::with_capacity(module.constants.len());
    for decl in &module.constants {
        let symbol = fjord_common::Symbol::new(module.name.as_str(), decl.name.name.as_str());
        let Some(sig) = scope.constants.get(&symbol) else { continue };
        match check_constant(decl, sig, env) {
            Ok(c) => constants.push(c),
            Err(err) => errors.push(err.into()),
        }
    }

    let mut effects = Vec::with_capacity(module.effects.len());
    for stmt in &module.effects {
        match check_effect(stmt, env) {
            Ok(e) => effects.push(e),
            Err(err) => errors.push(err.into()),
        }
    }

    debug!(errors = errors.len(), "module checked");
    CheckedModule {
        name: module.name.clone(),
        imported: imported
            .iter()
            .filter(|m| m.name != CORE_MODULE)
            .map(|m| m.name.clone())
            .collect(),
        constants,
        functions,
        effects,
    }
}

/// `do e`: `e` must be an `Effect[()]`.
fn check_effect(stmt: &DoStmt, env: BodyEnv<'_>) -> Result<Expr, ExprError> {
    let bounds = TypeBounds::default();
    let ctx = env.ctx(&[], &bounds);
    let expected = effect_of(Type::unit());
    check_and_assign(Some(&expected), &stmt.value, &ctx, &mut TypeArgsInferringContext::disabled())
}
