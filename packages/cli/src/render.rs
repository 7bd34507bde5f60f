use colored::Colorize;
use pin_common::{walk_item, Forest, Item, ThreadStats, Visitor};

/// Indented text view of a forest, one line per comment
pub struct TreePrinter {
    lines: Vec<String>,
}

impl TreePrinter {
    pub fn render(forest: &Forest) -> String {
        let mut printer = TreePrinter { lines: Vec::new() };
        printer.visit_forest(forest);
        printer.lines.join("\n")
    }
}

impl Visitor for TreePrinter {
    fn visit_item(&mut self, item: &Item, depth: usize) {
        let indent = "  ".repeat(depth);
        let author = item
            .payload
            .author
            .as_ref()
            .map(|a| a.label().to_string())
            .unwrap_or_else(|| "anonymous".to_string());

        let id = if item.is_provisional() {
            format!("{} (pending)", item.id).yellow().to_string()
        } else {
            item.id.to_string().bright_white().to_string()
        };

        self.lines.push(format!(
            "{}{} {} {}",
            indent,
            id,
            author.dimmed(),
            item.payload.content
        ));
        walk_item(self, item, depth);
    }
}

pub fn summary(forest: &Forest) -> String {
    let stats = ThreadStats::of(forest);
    format!(
        "{} comments, {} threads, {} pending, depth {}",
        stats.total, stats.roots, stats.provisional, stats.max_depth
    )
}
