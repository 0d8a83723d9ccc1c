//! Import graph of a program.
//!
//! Modules are checked in dependency order: every module's imports are
//! checked before the module itself. [`topological_sort`] produces that
//! order and reports an import cycle as a [`CycleError`].

use std::collections::VecDeque;
use std::fmt;

use rustc_hash::FxHashMap;

/// Index of a module in a [`ModuleGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(pub u32);

/// A module node and the modules it imports.
#[derive(Debug)]
pub struct ModuleNode {
    pub id: ModuleId,
    pub name: String,
    pub imports: Vec<ModuleId>,
}

/// An import cycle, e.g. `["A", "B", "A"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    pub cycle_path: Vec<String>,
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cycle_path.join(" -> "))
    }
}

impl std::error::Error for CycleError {}

#[derive(Debug, Default)]
pub struct ModuleGraph {
    pub modules: Vec<ModuleNode>,
    by_name: FxHashMap<String, ModuleId>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module, returning the existing id if the name is already known.
    pub fn add_module(&mut self, name: impl Into<String>) -> ModuleId {
        let name = name.into();
        if let Some(id) = self.by_name.get(&name) {
            return *id;
        }
        let id = ModuleId(self.modules.len() as u32);
        self.by_name.insert(name.clone(), id);
        self.modules.push(ModuleNode {
            id,
            name,
            imports: Vec::new(),
        });
        id
    }

    pub fn resolve(&self, name: &str) -> Option<ModuleId> {
        self.by_name.get(name).copied()
    }

    /// Record that `from` imports `to`. Duplicate edges are ignored; a
    /// self-import is kept so that sorting reports it as a cycle.
    pub fn add_import(&mut self, from: ModuleId, to: ModuleId) {
        let imports = &mut self.modules[from.0 as usize].imports;
        if !imports.contains(&to) {
            imports.push(to);
        }
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn get(&self, id: ModuleId) -> &ModuleNode {
        &self.modules[id.0 as usize]
    }

    pub fn name(&self, id: ModuleId) -> &str {
        &self.get(id).name
    }
}

/// Order modules so that every module follows all of its imports (Kahn's
/// algorithm, ties broken alphabetically).
pub fn topological_sort(graph: &ModuleGraph) -> Result<Vec<ModuleId>, CycleError> {
    let n = graph.modules.len();
    // pending[i] = imports of module i not yet emitted.
    let mut pending: Vec<usize> = graph.modules.iter().map(|m| m.imports.len()).collect();

    let by_name = |ids: &mut Vec<ModuleId>| ids.sort_by(|a, b| graph.name(*a).cmp(graph.name(*b)));

    let mut ready: Vec<ModuleId> = (0..n)
        .filter(|&i| pending[i] == 0)
        .map(|i| ModuleId(i as u32))
        .collect();
    by_name(&mut ready);

    let mut queue = VecDeque::from(ready);
    let mut order = Vec::with_capacity(n);

    while let Some(id) = queue.pop_front() {
        order.push(id);
        let mut unlocked = Vec::new();
        for (i, module) in graph.modules.iter().enumerate() {
            if pending[i] > 0 && module.imports.contains(&id) {
                pending[i] -= 1;
                if pending[i] == 0 {
                    unlocked.push(ModuleId(i as u32));
                }
            }
        }
        by_name(&mut unlocked);
        queue.extend(unlocked);
    }

    if order.len() == n {
        Ok(order)
    } else {
        Err(CycleError {
            cycle_path: find_cycle(graph, &pending),
        })
    }
}

/// Walk import edges among the modules left unsorted until one repeats.
fn find_cycle(graph: &ModuleGraph, pending: &[usize]) -> Vec<String> {
    let Some(start) = (0..graph.modules.len()).find(|&i| pending[i] > 0) else {
        return Vec::new();
    };

    let mut path: Vec<usize> = Vec::new();
    let mut current = start;
    loop {
        if let Some(pos) = path.iter().position(|&p| p == current) {
            let mut cycle: Vec<String> = path[pos..]
                .iter()
                .map(|&i| graph.modules[i].name.clone())
                .collect();
            cycle.push(graph.modules[current].name.clone());
            return cycle;
        }
        path.push(current);
        match graph.modules[current]
            .imports
            .iter()
            .find(|dep| pending[dep.0 as usize] > 0)
        {
            Some(dep) => current = dep.0 as usize,
            None => {
                return path
                    .iter()
                    .map(|&i| graph.modules[i].name.clone())
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(graph: &ModuleGraph, order: &[ModuleId]) -> Vec<String> {
        order.iter().map(|id| graph.name(*id).to_string()).collect()
    }

    #[test]
    fn add_module_is_idempotent() {
        let mut graph = ModuleGraph::new();
        let a = graph.add_module("Geometry");
        let b = graph.add_module("Geometry");
        assert_eq!(a, b);
        assert_eq!(graph.module_count(), 1);
        assert_eq!(graph.resolve("Geometry"), Some(a));
        assert_eq!(graph.resolve("Missing"), None);
    }

    #[test]
    fn imports_come_first() {
        let mut graph = ModuleGraph::new();
        let main = graph.add_module("Main");
        let shapes = graph.add_module("Shapes");
        let core = graph.add_module("Core");
        graph.add_import(main, shapes);
        graph.add_import(shapes, core);
        graph.add_import(main, core);
        graph.add_import(main, core);
        assert_eq!(graph.get(main).imports.len(), 2);

        let order = topological_sort(&graph).unwrap();
        assert_eq!(names(&graph, &order), vec!["Core", "Shapes", "Main"]);
    }

    #[test]
    fn independent_modules_sort_alphabetically() {
        let mut graph = ModuleGraph::new();
        graph.add_module("Zeta");
        graph.add_module("Alpha");
        graph.add_module("Mid");
        let order = topological_sort(&graph).unwrap();
        assert_eq!(names(&graph, &order), vec!["Alpha", "Mid", "Zeta"]);
    }

    #[test]
    fn two_module_cycle() {
        let mut graph = ModuleGraph::new();
        let a = graph.add_module("A");
        let b = graph.add_module("B");
        graph.add_import(a, b);
        graph.add_import(b, a);
        let err = topological_sort(&graph).unwrap_err();
        assert_eq!(err.to_string(), "A -> B -> A");
    }

    #[test]
    fn self_import_is_a_cycle() {
        let mut graph = ModuleGraph::new();
        let a = graph.add_module("Loop");
        graph.add_import(a, a);
        let err = topological_sort(&graph).unwrap_err();
        assert_eq!(err.cycle_path, vec!["Loop".to_string(), "Loop".to_string()]);
    }

    #[test]
    fn cycle_behind_a_sorted_prefix() {
        let mut graph = ModuleGraph::new();
        let base = graph.add_module("Base");
        let x = graph.add_module("X");
        let y = graph.add_module("Y");
        let z = graph.add_module("Z");
        graph.add_import(x, base);
        graph.add_import(x, y);
        graph.add_import(y, z);
        graph.add_import(z, x);
        let err = topological_sort(&graph).unwrap_err();
        assert_eq!(err.to_string(), "X -> Y -> Z -> X");
    }
}
