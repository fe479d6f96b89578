//! describe command - Show one class or aspect in full

use anyhow::Result;
use serde::Serialize;

use super::{load_registry, parse_name, Context, PropertyView};
use crate::core::schema::ClassDescriptor;
use crate::ui::output;

#[derive(Debug, Serialize)]
struct ClassView {
    name: String,
    display_name: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    super_class: Option<String>,
    aspects: Vec<String>,
    instantiable: bool,
    hidden: bool,
    system: bool,
    retrievable: bool,
    searchable: bool,
    declared_properties: Vec<PropertyView>,
    effective_properties: Vec<PropertyView>,
    sub_classes: Vec<String>,
    /// Transitive sub-classes, nearest first.
    descendants: Vec<String>,
    aspect_usages: Vec<String>,
}

fn names(classes: &[std::sync::Arc<ClassDescriptor>]) -> Vec<String> {
    classes.iter().map(|c| c.name().to_string()).collect()
}

/// Describe the class named `raw`.
pub fn describe(ctx: &Context, raw: &str) -> Result<()> {
    let name = parse_name(raw)?;
    let registry = load_registry(ctx)?;
    let class = registry.class(&name)?;

    let view = ClassView {
        name: class.name().to_string(),
        display_name: class.display_name().to_string(),
        kind: class.kind().as_str(),
        id: class.id().map(ToString::to_string),
        guid: class
            .identity()
            .map(|identity| identity.guid.to_uuid().to_string()),
        fingerprint: class.identity().map(|identity| identity.guid.fingerprint()),
        super_class: class.super_class().map(|c| c.name().to_string()),
        aspects: names(class.aspects()),
        instantiable: class.is_instantiable(),
        hidden: class.is_hidden(),
        system: class.is_system(),
        retrievable: class.is_retrievable(),
        searchable: class.is_searchable(),
        declared_properties: class
            .declared_properties()
            .iter()
            .map(|p| PropertyView::from(p.as_ref()))
            .collect(),
        effective_properties: class
            .effective_properties()
            .iter()
            .map(|p| PropertyView::from(p.as_ref()))
            .collect(),
        sub_classes: names(&registry.sub_classes(&name)?),
        descendants: names(&registry.descendants(&name)?),
        aspect_usages: names(&registry.aspect_usages(&name)?),
    };

    if ctx.json {
        return output::json(&view);
    }

    let v = ctx.verbosity;
    output::print(format!("{} ({})", view.name, view.kind), v);
    output::print(format!("Display name: {}", view.display_name), v);
    if let Some(id) = &view.id {
        output::print(format!("Id: {id}"), v);
    }
    if let Some(guid) = &view.guid {
        output::print(format!("Guid: {guid}"), v);
    }
    if let Some(fingerprint) = &view.fingerprint {
        output::print(format!("Fingerprint: {fingerprint}"), v);
    }
    if let Some(parent) = &view.super_class {
        output::print(format!("Super-class: {parent}"), v);
    }
    if !view.aspects.is_empty() {
        output::print(format!("Aspects: {}", view.aspects.join(", ")), v);
    }
    output::print(
        format!(
            "Flags: instantiable={} hidden={} system={} retrievable={} searchable={}",
            view.instantiable, view.hidden, view.system, view.retrievable, view.searchable
        ),
        v,
    );

    output::print("Declared properties:", v);
    output::print(output::format_list(&view.declared_properties, "  "), v);
    output::print(
        format!("Effective properties ({}):", view.effective_properties.len()),
        v,
    );
    output::print(output::format_list(&view.effective_properties, "  "), v);

    if !view.sub_classes.is_empty() {
        output::print(format!("Sub-classes: {}", view.sub_classes.join(", ")), v);
    }
    if view.descendants.len() > view.sub_classes.len() {
        output::print(format!("All descendants: {}", view.descendants.join(", ")), v);
    }
    if !view.aspect_usages.is_empty() {
        output::print(format!("Used by: {}", view.aspect_usages.join(", ")), v);
    }
    Ok(())
}
