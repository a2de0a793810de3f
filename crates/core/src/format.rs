use crate::{
    config::{ConfigSource, Configuration, WorkflowDefinition},
    environment::{Environment, REQUIRED_CREDENTIALS},
    plan::RunPlan,
};

const ARROW: &str = " → ";
const MAX_ID_WIDTH: usize = 20;

fn steps_line(definition: &WorkflowDefinition) -> String {
    definition.steps.as_deref().unwrap_or_default().join(ARROW)
}

fn truncate_id(id: &str) -> String {
    if id.chars().count() > MAX_ID_WIDTH {
        let head: String = id.chars().take(MAX_ID_WIDTH).collect();
        format!("{head}...")
    } else {
        id.to_string()
    }
}

/// Format the configured workflows as a listing
pub fn format_workflows(config: &Configuration) -> String {
    if config.workflows.is_empty() {
        return "No workflows configured\n".into();
    }

    let mut output = String::from("Available workflows:\n");
    for (name, definition) in &config.workflows {
        let description = definition.description.as_deref().unwrap_or("No description");
        output.push_str(&format!("  {name}: {description}\n"));
        output.push_str(&format!("    Steps: {}\n\n", steps_line(definition)));
    }
    output
}

/// Format the configured database mappings as a listing
pub fn format_databases(config: &Configuration) -> String {
    if config.databases.is_empty() {
        return "No databases configured\n".into();
    }

    let mut output = String::from("Available databases:\n");
    for (name, id) in &config.databases {
        output.push_str(&format!("  {name}: {id}\n"));
    }
    output.push('\n');
    output
}

/// Format the loaded configuration, resolved directories and credential
/// status as a readable report
pub fn format_config(config: &Configuration, source: &ConfigSource, env: &Environment) -> String {
    let mut output = String::new();

    output.push_str("Loaded Configuration\n");
    output.push_str(&"=".repeat(50));
    output.push('\n');
    output.push_str(&format!("Config Source: {source}\n\n"));

    let defaults = &config.defaults;
    output.push_str("Default Settings:\n");
    output.push_str(&format!("   output_dir: {}\n", defaults.output_dir));
    output.push_str(&format!("   temp_dir: {}\n", defaults.temp_dir));
    output.push_str(&format!("   database: {}\n", defaults.database));
    output.push_str(&format!("   workflow: {}\n", defaults.workflow));
    output.push_str(&format!("   keep_files: {}\n\n", defaults.keep_files));

    if !config.databases.is_empty() {
        output.push_str("Database Mappings:\n");
        for (name, id) in &config.databases {
            output.push_str(&format!("   {name}: {}\n", truncate_id(id)));
        }
        output.push('\n');
    }

    if !config.workflows.is_empty() {
        output.push_str("Available Workflows:\n");
        for (name, definition) in &config.workflows {
            let description = definition.description.as_deref().unwrap_or("No description");
            output.push_str(&format!("   {name}: {description}\n"));
            output.push_str(&format!("     Steps: {}\n", steps_line(definition)));
            if let Some(model) = &definition.deepcast_model {
                output.push_str(&format!("     Model: {model}\n"));
            }
            if let Some(temperature) = definition.deepcast_temperature {
                output.push_str(&format!("     Temperature: {temperature}\n"));
            }
            output.push('\n');
        }
    }

    let paths = config.resolve_paths(env);
    output.push_str("File Locations:\n");
    output.push_str(&format!("   Output Directory: {}\n", paths.output_dir.display()));
    output.push_str(&format!("   Temp Directory: {}\n\n", paths.temp_dir.display()));

    output.push_str("Environment Variables:\n");
    for name in REQUIRED_CREDENTIALS {
        let status = if env.var(name).is_some() { "Set" } else { "Missing" };
        output.push_str(&format!("   {name}: {status}\n"));
    }

    output
}

/// Format the steps of a plan as `a → b → c`
pub fn format_steps(plan: &RunPlan) -> String {
    plan.steps
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(ARROW)
}
