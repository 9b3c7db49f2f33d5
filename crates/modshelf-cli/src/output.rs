//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use modshelf_core::ModuleRecord;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a single module with its history
    pub fn print_module(&self, module: &ModuleRecord) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:        {}", module.id);
                println!("Label:     {}", module.label);
                println!("Category:  {}", module.category);
                if let Some(ref thumbnail) = module.thumbnail {
                    println!("Thumbnail: {}", thumbnail);
                }
                println!("Version:   {}", module.version);
                println!(
                    "Updated:   {}",
                    module.updated_at.format("%Y-%m-%d %H:%M:%S")
                );

                let extra: Vec<String> = module
                    .metadata
                    .iter()
                    .map(|(key, value)| match value.as_str() {
                        Some(s) => format!("{}={}", key, s),
                        None => format!("{}={}", key, value),
                    })
                    .collect();
                if !extra.is_empty() {
                    println!("Metadata:  {}", extra.join(", "));
                }

                println!();
                println!("{}", module.markup);

                if !module.history.is_empty() {
                    println!();
                    println!("History ({}):", module.history.len());
                    for snapshot in &module.history {
                        println!(
                            "  v{:<4} {}  {} | {}",
                            snapshot.version,
                            snapshot.updated_at.format("%Y-%m-%d %H:%M"),
                            truncate(&snapshot.label, 30),
                            truncate_line(&snapshot.markup, 40)
                        );
                    }
                }
            }
            OutputFormat::Json => print_json(module),
            OutputFormat::Quiet => {
                println!("{}", module.id);
            }
        }
    }

    /// Print a list of modules
    pub fn print_modules(&self, modules: &[ModuleRecord]) {
        match self.format {
            OutputFormat::Human => {
                if modules.is_empty() {
                    println!("No modules found.");
                    return;
                }
                for module in modules {
                    println!(
                        "{} | {} | {} | v{}",
                        truncate(&module.id, 30),
                        truncate(&module.label, 30),
                        truncate(&module.category, 20),
                        module.version
                    );
                }
                println!("\n{} module(s)", modules.len());
            }
            OutputFormat::Json => print_json(modules),
            OutputFormat::Quiet => {
                for module in modules {
                    println!("{}", module.id);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("ééééééééééé", 5), "éé...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("<mjml>", 20), "<mjml>");
        assert_eq!(truncate_line("<mjml>\n<mj-body>", 20), "<mjml>");
        assert_eq!(truncate_line("", 20), "");
    }
}
