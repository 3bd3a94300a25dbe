use crate::ast::tree_sitter::TSNode;

/// What to do with a node while re-printing a tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeAction {
    /// Copy the node through, visiting its children
    Descend,
    /// Print this text instead of the node
    Replace(String),
    /// Drop the node and its subtree. Horizontal whitespace and a `;` directly after it are
    /// dropped too, and if nothing else was on its line, so is the line.
    Skip,
}

/// Re-print `text` (the source of the tree rooted at `root`), asking `decide` about every node in
/// preorder. Text between decided nodes (whitespace, comments, unvisited tokens) is copied
/// verbatim.
pub fn process_tree<'tree>(
    text: &str,
    root: TSNode<'tree>,
    mut decide: impl FnMut(TSNode<'tree>) -> NodeAction
) -> String {
    let mut printer = Printer {
        text,
        out: String::with_capacity(text.len()),
        cursor: 0
    };
    printer.visit(root, &mut decide);
    printer.copy_until(text.len());
    printer.out
}

struct Printer<'a> {
    text: &'a str,
    out: String,
    /// Byte offset in `text` up to which everything has been printed or dropped
    cursor: usize,
}

impl<'a> Printer<'a> {
    fn visit<'tree, F: FnMut(TSNode<'tree>) -> NodeAction>(&mut self, node: TSNode<'tree>, decide: &mut F) {
        match decide(node) {
            NodeAction::Descend => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    self.visit(child, decide);
                }
            }
            NodeAction::Replace(replacement) => {
                self.copy_until(node.start_byte());
                self.out.push_str(&replacement);
                self.cursor = self.cursor.max(node.end_byte());
            }
            NodeAction::Skip => {
                self.copy_until(node.start_byte());
                self.skip_from(node.end_byte());
            }
        }
    }

    fn copy_until(&mut self, position: usize) {
        if position > self.cursor {
            self.out.push_str(&self.text[self.cursor..position]);
            self.cursor = position;
        }
    }

    fn skip_from(&mut self, end: usize) {
        let end = end.max(self.cursor);
        let mut next = skip_horizontal_whitespace(self.text, end);
        if self.text[next..].starts_with(';') {
            next = skip_horizontal_whitespace(self.text, next + 1);
        }

        let rest = &self.text[next..];
        let line_break = if rest.starts_with("\r\n") {
            Some(2)
        } else if rest.starts_with('\n') {
            Some(1)
        } else if rest.is_empty() {
            Some(0)
        } else {
            None
        };
        let indented_len = self.out.trim_end_matches(is_horizontal_whitespace).len();
        let owns_line = indented_len == 0 || self.out[..indented_len].ends_with('\n');
        if let (true, Some(line_break)) = (owns_line, line_break) {
            self.out.truncate(indented_len);
            next += line_break;
        }
        self.cursor = next;
    }
}

fn is_horizontal_whitespace(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn skip_horizontal_whitespace(text: &str, from: usize) -> usize {
    let rest = &text[from..];
    from + (rest.len() - rest.trim_start_matches(is_horizontal_whitespace).len())
}
