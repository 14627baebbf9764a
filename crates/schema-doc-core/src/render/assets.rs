//! Companion CSS/JS assets copied next to the generated HTML.

use std::path::Path;

use crate::config::GenerationConfig;
use crate::error::GenerateError;

pub const CSS_FILE_NAME: &str = "schema_doc.css";
pub const JS_FILE_NAME: &str = "schema_doc.min.js";

const CSS_CONTENT: &str = "\
body { font-family: sans-serif; margin: 0 auto; max-width: 60rem; padding: 0 1rem; }
.schema-section { border-left: 2px solid #e0e0e0; margin: 0.5rem 0; padding-left: 1rem; }
.breadcrumbs { color: #777; font-size: 0.85rem; margin-bottom: 0.25rem; }
.badge { border-radius: 3px; font-size: 0.75rem; margin-left: 0.4rem; padding: 0.1rem 0.4rem; }
.badge-required { background: #c62828; color: #fff; }
.badge-deprecated { background: #ef6c00; color: #fff; }
.badge-type { background: #1565c0; color: #fff; }
.description-collapsed summary { color: #1565c0; cursor: pointer; }
pre.example { background: #f5f5f5; overflow-x: auto; padding: 0.5rem; }
.expand-controls button { margin-right: 0.5rem; }
.same-as { font-style: italic; }
footer { color: #999; font-size: 0.8rem; margin: 2rem 0 1rem; }
";

const JS_CONTENT: &str = "\
document.addEventListener('DOMContentLoaded',function(){\
var e=document.getElementById('expand-all');\
var c=document.getElementById('collapse-all');\
function t(o){document.querySelectorAll('details').forEach(function(d){d.open=o;});}\
if(e){e.addEventListener('click',function(){t(true);});}\
if(c){c.addEventListener('click',function(){t(false);});}\
});
";

/// Copy the CSS and JS files needed by the HTML output into the directory of
/// the result file, honoring `copy_css` / `copy_js`.
pub fn copy_assets_to_target(
    result_file_path: &Path,
    config: &GenerationConfig,
) -> Result<(), GenerateError> {
    let target_directory = result_file_path.parent().unwrap_or_else(|| Path::new("."));

    let mut files = Vec::new();
    if config.copy_css {
        files.push((CSS_FILE_NAME, CSS_CONTENT));
    }
    if config.copy_js {
        files.push((JS_FILE_NAME, JS_CONTENT));
    }

    for (name, content) in files {
        let path = target_directory.join(name);
        std::fs::write(&path, content).map_err(|e| GenerateError::Output {
            path: path.display().to_string(),
            source: e,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copies_only_requested_assets() {
        let dir = tempfile::tempdir().unwrap();
        let result = dir.path().join("out.html");

        let config = GenerationConfig {
            copy_css: true,
            copy_js: false,
            ..GenerationConfig::default()
        };
        copy_assets_to_target(&result, &config).unwrap();

        assert!(dir.path().join(CSS_FILE_NAME).exists());
        assert!(!dir.path().join(JS_FILE_NAME).exists());
    }
}
