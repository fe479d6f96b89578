//! classes command - Show the class tree from the root class, plus root aspects

use anyhow::{Context as _, Result};
use serde::Serialize;

use super::{load_registry, Context};
use crate::core::registry::MetamodelRegistry;
use crate::core::schema::ClassDescriptor;
use crate::ui::output::{self, TreeNode};

#[derive(Debug, Serialize)]
struct ClassesOutput {
    root: TreeNode,
    aspects: Vec<String>,
}

/// Print the class hierarchy.
///
/// Hidden classes are skipped unless `all` is set.
pub fn classes(ctx: &Context, all: bool) -> Result<()> {
    let registry = load_registry(ctx)?;
    let root = registry
        .root_class()
        .context("metamodel has no root class")?;

    let tree = class_tree(&registry, root, all)?;
    let aspects: Vec<String> = registry
        .root_aspects()
        .into_iter()
        .filter(|a| all || !a.is_hidden())
        .map(|a| label(a))
        .collect();

    if ctx.json {
        return output::json(&ClassesOutput {
            root: tree,
            aspects,
        });
    }

    output::print(output::render_tree(&tree), ctx.verbosity);
    if !aspects.is_empty() {
        output::print("", ctx.verbosity);
        output::print("Aspects:", ctx.verbosity);
        output::print(output::format_list(&aspects, "  "), ctx.verbosity);
    }
    Ok(())
}

fn class_tree(registry: &MetamodelRegistry, class: &ClassDescriptor, all: bool) -> Result<TreeNode> {
    let mut children = Vec::new();
    for sub in registry.sub_classes(class.name())? {
        if all || !sub.is_hidden() {
            children.push(class_tree(registry, &sub, all)?);
        }
    }
    Ok(TreeNode {
        label: label(class),
        children,
    })
}

fn label(class: &ClassDescriptor) -> String {
    let mut label = class.name().to_string();
    if !class.is_aspect() && !class.is_instantiable() {
        label.push_str(" [abstract]");
    }
    if class.is_system() {
        label.push_str(" [system]");
    }
    if !class.aspects().is_empty() {
        let names: Vec<String> = class.aspects().iter().map(|a| a.name().to_string()).collect();
        label.push_str(&format!(" + {}", names.join(", ")));
    }
    label
}
