use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use schema_doc_core::{generate_from_filename, GenerationConfig};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "schema-doc")]
#[command(about = "Generate human-readable documentation from a JSON Schema")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate documentation for a schema
    Generate {
        /// Input schema file (JSON or YAML)
        schema_file: PathBuf,

        /// Output documentation file
        #[arg(default_value = "schema_doc.html")]
        result_file: PathBuf,

        /// Configuration file (JSON or YAML)
        #[arg(long)]
        config_file: Option<PathBuf>,

        /// Configuration override, as KEY=VALUE or a bare flag name
        /// (prefix with no_ to disable), repeatable
        #[arg(long = "config", value_name = "KEY=VALUE")]
        config: Vec<String>,

        /// Minify the output document
        #[arg(long, overrides_with = "no_minify")]
        minify: bool,

        /// Keep the output document readable
        #[arg(long)]
        no_minify: bool,

        /// Read deprecation status from a "[Deprecated" marker at the start
        /// of descriptions
        #[arg(long)]
        deprecated_from_description: bool,

        /// Read default values from a "[Default - `value`]" marker in
        /// descriptions
        #[arg(long)]
        default_from_description: bool,

        /// Add Expand all / Collapse all buttons to HTML output
        #[arg(long)]
        expand_buttons: bool,

        /// Render a definition used from several places once, linking to it
        /// elsewhere
        #[arg(long, overrides_with = "no_link_to_reused_ref")]
        link_to_reused_ref: bool,

        /// Render every use of a reused definition in full
        #[arg(long)]
        no_link_to_reused_ref: bool,

        /// Copy the CSS file next to the HTML output
        #[arg(long, overrides_with = "no_copy_css")]
        copy_css: bool,

        #[arg(long)]
        no_copy_css: bool,

        /// Copy the JS file next to the HTML output
        #[arg(long, overrides_with = "no_copy_js")]
        copy_js: bool,

        #[arg(long)]
        no_copy_js: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean
    let log_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate {
            schema_file,
            result_file,
            config_file,
            config,
            minify,
            no_minify,
            deprecated_from_description,
            default_from_description,
            expand_buttons,
            link_to_reused_ref,
            no_link_to_reused_ref,
            copy_css,
            no_copy_css,
            copy_js,
            no_copy_js,
        } => {
            let mut generation_config = match config_file {
                Some(path) => GenerationConfig::from_file(&path)
                    .with_context(|| format!("Failed to load config from: {}", path.display()))?,
                None => GenerationConfig::default(),
            };
            generation_config = generation_config
                .apply_overrides(&config)
                .context("Invalid --config override")?;

            // Dedicated flags win over the config file and --config overrides
            apply_flag(&mut generation_config.minify, minify, no_minify);
            apply_flag(
                &mut generation_config.link_to_reused_ref,
                link_to_reused_ref,
                no_link_to_reused_ref,
            );
            apply_flag(&mut generation_config.copy_css, copy_css, no_copy_css);
            apply_flag(&mut generation_config.copy_js, copy_js, no_copy_js);
            if deprecated_from_description {
                generation_config.deprecated_from_description = true;
            }
            if default_from_description {
                generation_config.default_from_description = true;
            }
            if expand_buttons {
                generation_config.expand_buttons = true;
            }

            let start = Instant::now();
            generate_from_filename(&schema_file, &result_file, &generation_config).with_context(
                || {
                    format!(
                        "Failed to generate documentation for: {}",
                        schema_file.display()
                    )
                },
            )?;

            println!(
                "Generated doc in {:.2}s: {}",
                start.elapsed().as_secs_f64(),
                result_file.display()
            );
        }
    }

    Ok(())
}

fn apply_flag(setting: &mut bool, enable: bool, disable: bool) {
    if disable {
        *setting = false;
    } else if enable {
        *setting = true;
    }
}
