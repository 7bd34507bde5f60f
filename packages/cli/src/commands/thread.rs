use crate::render::{summary, TreePrinter};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use pin_common::{CommentSource, JsonFileSource};
use pin_engine::{assemble_records, Forest};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct ThreadArgs {
    /// Comment listing (JSON array as returned by the comments endpoint)
    pub input: PathBuf,

    /// Print the assembled forest as JSON
    #[arg(long)]
    pub json: bool,
}

/// Read a comment dump and assemble it into a forest
pub fn load_thread(path: &Path) -> Result<Forest> {
    let records = JsonFileSource::new(path)
        .fetch()
        .with_context(|| format!("Failed to read comments from {}", path.display()))?;

    tracing::debug!(records = records.len(), "Assembling thread");
    Ok(assemble_records(records))
}

pub fn thread(args: ThreadArgs, cwd: &str) -> Result<()> {
    let forest = load_thread(&PathBuf::from(cwd).join(&args.input))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&forest)?);
        return Ok(());
    }

    println!("{} {}", "Thread".green().bold(), summary(&forest).dimmed());
    println!();
    if forest.is_empty() {
        println!("  (no comments)");
    } else {
        println!("{}", TreePrinter::render(&forest));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_and_render_dump() {
        colored::control::set_override(false);

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("comments.json");
        std::fs::write(
            &path,
            r#"[
                { "id": "c1", "parent_id": "", "content": "Best tacos in town" },
                { "id": "c2", "parent_id": "c1", "content": "Agreed",
                  "user": { "id": "u2", "username": "sam" } },
                { "id": "c3", "parent_id": "deleted", "content": "Orphan" }
            ]"#,
        )
        .unwrap();

        let forest = load_thread(&path).unwrap();
        assert_eq!(forest.len_roots(), 2);
        assert_eq!(forest.depth_of(&"c2".into()), Some(1));

        let text = TreePrinter::render(&forest);
        assert!(text.contains("c1 anonymous Best tacos in town"));
        assert!(text.contains("  c2 "));
        assert!(text.contains("Agreed"));
        assert!(text.contains("c3 anonymous Orphan"));
        assert_eq!(summary(&forest), "3 comments, 2 threads, 0 pending, depth 1");
    }

    #[test]
    fn test_missing_dump_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.json");

        let err = load_thread(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("absent.json"));
    }
}
