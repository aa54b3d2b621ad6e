//! Theme Linter: validates theme template files.
//!
//! Usage: theme_linter <themes_dir | theme.ron>
//!
//! Each file must be named after its theme tag (e.g. `magic-school.ron`).

use std::collections::HashSet;
use std::path::Path;
use std::process;
use std::str::FromStr;

use storybook_engine::core::catalog::ThemeTemplate;
use storybook_engine::core::template::ProfileField;
use storybook_engine::schema::profile::Theme;
use strum::IntoEnumIterator;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: theme_linter <themes_dir | theme.ron>");
        process::exit(0);
    }

    let path = Path::new(&args[1]);
    let files = if path.is_file() {
        vec![path.to_path_buf()]
    } else if path.is_dir() {
        match ron_files(path) {
            Ok(files) => files,
            Err(e) => {
                eprintln!("ERROR: Failed to read directory: {}", e);
                process::exit(1);
            }
        }
    } else {
        eprintln!("ERROR: Path '{}' does not exist", args[1]);
        process::exit(1);
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();

    for file in &files {
        let stem = file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let Ok(theme) = Theme::from_str(stem) else {
            errors.push(format!("{}: '{}' is not a theme tag", file.display(), stem));
            continue;
        };
        seen.insert(theme);
        match ThemeTemplate::load_from_ron(theme, file) {
            Ok(template) => warnings.extend(lint_template(&template)),
            Err(e) => errors.push(format!("{}: {}", file.display(), e)),
        }
    }

    if path.is_dir() {
        for theme in Theme::iter().filter(|t| !seen.contains(t)) {
            errors.push(format!("no template file for theme '{}'", theme.tag()));
        }
    }

    println!("Checked {} theme files", files.len());
    println!("\n=== Theme Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }
    for warning in &warnings {
        println!("WARNING: {}", warning);
    }
    for error in &errors {
        println!("ERROR: {}", error);
    }
    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if !errors.is_empty() {
        process::exit(1);
    }
}

fn ron_files(dir: &Path) -> std::io::Result<Vec<std::path::PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "ron") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Style checks that do not stop a template from loading.
fn lint_template(template: &ThemeTemplate) -> Vec<String> {
    let tag = template.theme.tag();
    let mut warnings = Vec::new();

    if !template.title.fields().any(|f| f == ProfileField::Name) {
        warnings.push(format!("{tag}: title does not mention the child's name"));
    }

    let used: HashSet<ProfileField> = template
        .pages
        .iter()
        .flat_map(|page| page.text.fields())
        .collect();
    for field in [ProfileField::Name, ProfileField::FavoritePlace] {
        if !used.contains(&field) {
            warnings.push(format!("{tag}: no page text uses {field:?}"));
        }
    }

    let mut glyphs = HashSet::new();
    for (index, page) in template.pages.iter().enumerate() {
        if !glyphs.insert(page.glyph.as_str()) {
            warnings.push(format!("{tag}: page {} repeats glyph {}", index + 1, page.glyph));
        }
    }
    warnings
}
