//! `fastblocks list`

use fastblocks_core::domain::ModuleDescriptor;

use crate::{
    cli::{ListArgs, ListFormat, global::GlobalArgs},
    commands::open_registry,
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

pub fn execute(
    args: ListArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let registry = open_registry(&global, &config)?;
    let modules: Vec<&ModuleDescriptor> = match args.search.as_deref() {
        Some(query) => registry.search(query),
        None => registry.list().iter().collect(),
    };

    let format = if output.is_json() { ListFormat::Json } else { args.format };
    match format {
        ListFormat::Table => {
            if modules.is_empty() {
                match args.search.as_deref() {
                    Some(query) => output.warning(&format!("No modules found matching '{query}'"))?,
                    None => output.warning("The registry has no modules")?,
                }
                return Ok(());
            }
            match args.search.as_deref() {
                Some(query) => output.header(&format!("Modules matching '{query}':"))?,
                None => output.header("Available modules:")?,
            }
            output.print("")?;
            for line in table(&modules) {
                output.print(&line)?;
            }
            output.print("")?;
            output.dim("Use 'fastblocks info <module>' for details, 'fastblocks add <module>' to install.")?;
        }
        ListFormat::Json => output.json(&modules)?,
        // data formats bypass OutputManager so they survive --quiet
        ListFormat::List => {
            for m in &modules {
                println!("{}", m.id);
            }
        }
        ListFormat::Csv => {
            println!("id,name,version,description");
            for m in &modules {
                println!(
                    "{},{},{},{}",
                    csv_field(&m.id),
                    csv_field(&m.name),
                    csv_field(&m.version),
                    csv_field(&m.description)
                );
            }
        }
    }
    Ok(())
}

fn table(modules: &[&ModuleDescriptor]) -> Vec<String> {
    let id_w = column(modules.iter().map(|m| m.id.chars().count()), "MODULE");
    let name_w = column(modules.iter().map(|m| m.name.chars().count()), "NAME");
    let ver_w = column(modules.iter().map(|m| m.version.chars().count()), "VERSION");

    let mut lines = vec![format!(
        "  {:id_w$}  {:name_w$}  {:ver_w$}  DESCRIPTION",
        "MODULE", "NAME", "VERSION"
    )];
    lines.extend(modules.iter().map(|m| {
        format!(
            "  {:id_w$}  {:name_w$}  {:ver_w$}  {}",
            m.id, m.name, m.version, m.description
        )
    }));
    lines
}

fn column(widths: impl Iterator<Item = usize>, title: &str) -> usize {
    widths.chain(std::iter::once(title.len())).max().unwrap_or(0)
}

/// Quote a CSV field when it holds a separator, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
