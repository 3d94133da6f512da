use humansize::{file_size_opts as options, FileSize};
use ork_format::document::Component;

use crate::cli::InfoArgs;
use crate::error::{Error, Result};

fn human(bytes: u64) -> String {
    bytes
        .file_size(options::BINARY)
        .unwrap_or_else(|_| format!("{} B", bytes))
}

fn print_component(component: &Component, depth: usize) {
    let mut line = format!("{:indent$}{} ({})", "", component.name, component.kind, indent = depth * 2);
    if let Some(decal) = component.appearance.as_ref().and_then(|a| a.decal.as_ref()) {
        line.push_str(&format!(" [decal: {}]", decal.name()));
    }
    println!("{}", line);

    for placement in &component.motors {
        let descriptor = placement.effective_descriptor();
        println!(
            "{:indent$}motor {} {}{}",
            "",
            descriptor.manufacturer.as_deref().unwrap_or("-"),
            descriptor.designation.as_deref().unwrap_or("-"),
            if placement.motor.is_some() { "" } else { " (unresolved)" },
            indent = depth * 2 + 2
        );
    }

    for child in &component.children {
        print_component(child, depth + 1);
    }
}

pub fn run(args: InfoArgs) -> Result<()> {
    let loader = super::loader(args.motors.as_deref())?;
    let loaded = loader.load_file(&args.path).map_err(|source| Error::Load {
        path: args.path.clone(),
        source,
    })?;
    let document = &loaded.document;

    let size = std::fs::metadata(&args.path).map(|m| m.len()).unwrap_or(0);
    println!("File:        {}", args.path.display());
    println!("Size:        {}", human(size));
    println!("Format:      {}", loaded.detection.file_type);
    for container in &loaded.detection.containers {
        println!("Container:   {}", container);
    }
    println!("Rocket:      {}", document.rocket.name);
    println!("Components:  {}", document.rocket.components().count());
    println!("Simulations: {}", document.simulations.len());
    println!(
        "Estimated native size: {}",
        human(ork_format::estimate_file_size(document, &Default::default()))
    );
    println!();

    for component in &document.rocket.children {
        print_component(component, 0);
    }

    super::print_warnings(&loaded.warnings);
    Ok(())
}
