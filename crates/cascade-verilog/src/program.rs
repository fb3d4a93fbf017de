//! The running program: declared modules plus the items of the implicit root
//! module.

use std::collections::HashMap;

use cascade_core::ROOT_MODULE;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::trace;

use crate::ast::{ModuleDecl, ModuleItem};
use crate::typecheck::{declare_item, module_info, reserved_names, Checker, Issue, ModuleInfo, Scope};

#[derive(Debug, Clone)]
pub struct Program {
    modules: Vec<ModuleDecl>,
    infos: HashMap<String, ModuleInfo>,
    root_items: Vec<ModuleItem>,
    root_scope: Scope,
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

fn instantiated(items: &[ModuleItem]) -> impl Iterator<Item = &str> {
    items.iter().filter_map(|i| match i {
        ModuleItem::Instantiation(inst) => Some(inst.module.name.as_str()),
        _ => None,
    })
}

impl Program {
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        nodes.insert(ROOT_MODULE.to_string(), graph.add_node(ROOT_MODULE.to_string()));
        Self {
            modules: Vec::new(),
            infos: HashMap::new(),
            root_items: Vec::new(),
            root_scope: Scope::default(),
            graph,
            nodes,
        }
    }

    /// Typecheck and add a module declaration. On error the program is
    /// unchanged and every issue (errors and warnings) is returned.
    pub fn declare(&mut self, decl: ModuleDecl) -> Result<Vec<Issue>, Vec<Issue>> {
        let mut issues = Vec::new();
        let name = decl.name.name.clone();
        if name == ROOT_MODULE || self.infos.contains_key(&name) {
            issues.push(Issue::error(
                decl.name.span,
                format!("a module named `{name}` has already been declared"),
            ));
            return Err(issues);
        }

        let info = module_info(&decl, &mut issues);
        Checker::new(&info.scope, &self.infos, Some(&name), &mut issues).check_module(&decl);

        let mut graph = self.graph.clone();
        let mut nodes = self.nodes.clone();
        let node = graph.add_node(name.clone());
        nodes.insert(name.clone(), node);
        for target in instantiated(&decl.items) {
            if let Some(&t) = nodes.get(target) {
                graph.update_edge(node, t, ());
            }
        }
        if is_cyclic_directed(&graph) {
            issues.push(Issue::error(
                decl.name.span,
                format!("recursive instantiation of module `{name}`"),
            ));
        }

        if issues.iter().any(Issue::is_error) {
            return Err(issues);
        }
        trace!(module = %name, "declared module");
        self.graph = graph;
        self.nodes = nodes;
        self.infos.insert(name, info);
        self.modules.push(decl);
        Ok(issues)
    }

    /// Typecheck and append an item to the root module. On error the program
    /// is unchanged.
    pub fn eval(&mut self, item: ModuleItem) -> Result<Vec<Issue>, Vec<Issue>> {
        let mut issues = Vec::new();
        let mut added = Vec::new();
        declare_item(&mut self.root_scope, &item, false, &[], &mut issues, &mut added);
        Checker::new(&self.root_scope, &self.infos, Some(ROOT_MODULE), &mut issues).item(&item);
        for name in reserved_names(&item) {
            issues.push(Issue::warning(
                name.span,
                format!("names beginning with `__` are reserved: `{}`", name.name),
            ));
        }

        if issues.iter().any(Issue::is_error) {
            for name in &added {
                self.root_scope.remove(name);
            }
            return Err(issues);
        }

        if let Some(&root) = self.nodes.get(ROOT_MODULE) {
            for target in instantiated(std::slice::from_ref(&item)) {
                if let Some(&t) = self.nodes.get(target) {
                    self.graph.update_edge(root, t, ());
                }
            }
        }
        trace!(index = self.root_items.len(), "evaluated root item");
        self.root_items.push(item);
        Ok(issues)
    }

    pub fn module(&self, name: &str) -> Option<&ModuleDecl> {
        self.modules.iter().find(|m| m.name.name == name)
    }

    /// Declared modules in declaration order.
    pub fn modules(&self) -> &[ModuleDecl] {
        &self.modules
    }

    pub fn info(&self, name: &str) -> Option<&ModuleInfo> {
        self.infos.get(name)
    }

    pub fn root_items(&self) -> &[ModuleItem] {
        &self.root_items
    }

    pub fn root_scope(&self) -> &Scope {
        &self.root_scope
    }
}
