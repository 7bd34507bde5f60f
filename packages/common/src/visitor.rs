use crate::model::{Forest, Item};

/// Visitor pattern for traversing a comment forest immutably
///
/// The default implementations walk the entire tree depth-first.
/// Override `visit_item` to act on each node; call `walk_item` from the
/// override to keep descending.
pub trait Visitor: Sized {
    fn visit_forest(&mut self, forest: &Forest) {
        walk_forest(self, forest);
    }

    fn visit_item(&mut self, item: &Item, depth: usize) {
        walk_item(self, item, depth);
    }
}

pub fn walk_forest<V: Visitor>(visitor: &mut V, forest: &Forest) {
    for root in &forest.roots {
        visitor.visit_item(root, 0);
    }
}

pub fn walk_item<V: Visitor>(visitor: &mut V, item: &Item, depth: usize) {
    for child in &item.children {
        visitor.visit_item(child, depth + 1);
    }
}

/// Per-thread tallies gathered in one walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadStats {
    pub total: usize,
    pub roots: usize,
    pub provisional: usize,
    pub max_depth: usize,
}

impl ThreadStats {
    pub fn of(forest: &Forest) -> Self {
        let mut stats = ThreadStats::default();
        stats.visit_forest(forest);
        stats
    }
}

impl Visitor for ThreadStats {
    fn visit_item(&mut self, item: &Item, depth: usize) {
        self.total += 1;
        if depth == 0 {
            self.roots += 1;
        }
        if item.is_provisional() {
            self.provisional += 1;
        }
        self.max_depth = self.max_depth.max(depth);
        walk_item(self, item, depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemId, Payload};

    #[test]
    fn test_stats_walks_every_depth() {
        let forest = Forest::new(vec![
            Item::new("A", Payload::text("a")).with_children(vec![Item::reply(
                ItemId::Provisional(1),
                "A",
                Payload::text("p"),
            )
            .with_children(vec![Item::reply(
                ItemId::Provisional(2),
                ItemId::Provisional(1),
                Payload::text("q"),
            )])]),
            Item::new("B", Payload::text("b")),
        ]);

        let stats = ThreadStats::of(&forest);
        assert_eq!(
            stats,
            ThreadStats {
                total: 4,
                roots: 2,
                provisional: 2,
                max_depth: 2,
            }
        );
    }

    #[test]
    fn test_custom_visitor_can_stop_descending() {
        struct RootsOnly(Vec<String>);

        impl Visitor for RootsOnly {
            fn visit_item(&mut self, item: &Item, _depth: usize) {
                self.0.push(item.id.to_string());
            }
        }

        let forest = Forest::new(vec![Item::new("A", Payload::text("a"))
            .with_children(vec![Item::reply("B", "A", Payload::text("b"))])]);

        let mut visitor = RootsOnly(Vec::new());
        visitor.visit_forest(&forest);
        assert_eq!(visitor.0, vec!["A"]);
    }
}
