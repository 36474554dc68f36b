//! Project fixtures shared by command tests.

use std::fs;
use std::path::Path;

use crate::pipeline::Project;

/// Writes a `shop` project with one component: a template, an scss
/// stylesheet importing `_vars.scss`, and one inline style.
pub fn write_project(root: &Path, extra_config: &str) {
    fs::write(
        root.join("quill.toml"),
        format!("[project]\nname = \"shop\"\nversion = \"0.1.0\"\n{extra_config}"),
    )
    .unwrap();
    let app = root.join("src").join("app");
    fs::create_dir_all(&app).unwrap();
    fs::write(
        app.join("button.ts"),
        "@Component({\n  templateUrl: './button.html',\n  styleUrls: ['./button.scss'],\n  styles: [`.inline { margin: 0; }`],\n})\nexport class Button {}\n",
    )
    .unwrap();
    fs::write(app.join("button.html"), "<button class=\"btn\"></button>").unwrap();
    fs::write(app.join("button.scss"), "@import 'vars';\n.btn { color: $primary; }\n").unwrap();
    fs::write(app.join("_vars.scss"), "$primary: teal;\n").unwrap();
}

/// Loads and resolves the project at `root`.
pub fn load(root: &Path) -> Project {
    let config = quill_config::load_config(root).unwrap();
    let resolved = quill_config::resolve_project(&config, root).unwrap();
    Project { config, resolved }
}
