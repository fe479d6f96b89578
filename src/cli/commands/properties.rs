//! properties command - List property descriptors

use anyhow::Result;

use super::{load_registry, parse_name, Context, PropertyView};
use crate::ui::output;

/// List every property, or the effective properties of one class.
pub fn properties(ctx: &Context, class: Option<&str>) -> Result<()> {
    let registry = load_registry(ctx)?;

    let views: Vec<PropertyView> = match class {
        Some(raw) => {
            let name = parse_name(raw)?;
            registry
                .class(&name)?
                .effective_properties()
                .iter()
                .map(|p| PropertyView::from(p.as_ref()))
                .collect()
        }
        None => registry
            .properties()
            .map(|p| PropertyView::from(p.as_ref()))
            .collect(),
    };

    if ctx.json {
        return output::json(&views);
    }
    output::print(output::format_list(&views, ""), ctx.verbosity);
    Ok(())
}
