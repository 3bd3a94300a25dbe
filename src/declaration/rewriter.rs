use log::debug;

use crate::ast::{DeclarationFile, NodeAction, process_tree};
use crate::ast::tree_sitter::TSNode;
use crate::declaration::{ModuleIdTable, ModuleLayout, ModuleLocation};
use crate::misc::path::{dirname, join, normalize_separators, resolve};

/// Indent of the body of each `declare module` block
pub const INDENT: &str = "  ";
const EOL: &str = "\n";
/// Indent of compiler-emitted declaration files
const SOURCE_INDENT: &str = "    ";
const INTERNAL_TAGS: [&str; 2] = ["@internal", "@private"];

/// Render `file` as a `declare module "<id>" { ... }` block, rewriting relative module
/// specifiers into flat ids. Records the file's id in `table` first.
///
/// Returns `None` for an empty file.
pub fn rewrite_declaration(
    file: &DeclarationFile,
    layout: &ModuleLayout,
    table: &mut ModuleIdTable
) -> Option<String> {
    if file.text().is_empty() {
        return None
    }

    let location = layout.locate(file.file_name());
    table.insert(&location.file_name_without_ext, location.id.clone());
    debug!("{} -> declare module \"{}\" ({} statements)", file.file_name(), location.id, file.statements().count());

    let rewriter = FileRewriter {
        file,
        layout,
        table,
        location: &location,
        file_dir: dirname(&normalize_separators(file.file_name())).to_string(),
    };
    let body = process_tree(file.text(), file.root(), |node| rewriter.decide(node));
    let body = format_body(&body);

    let mut rendered = format!("declare module \"{}\" {{{}{}", location.id, EOL, INDENT);
    rendered.push_str(&body);
    if !body.ends_with('\n') {
        rendered.push_str(EOL);
    }
    rendered.push('}');
    rendered.push_str(EOL);
    rendered.push_str(EOL);
    Some(rendered)
}

struct FileRewriter<'a> {
    file: &'a DeclarationFile,
    layout: &'a ModuleLayout,
    table: &'a ModuleIdTable,
    location: &'a ModuleLocation,
    /// Directory of the file on disk, forward slashes
    file_dir: String,
}

impl<'a> FileRewriter<'a> {
    fn decide(&self, node: TSNode<'_>) -> NodeAction {
        if !node.is_named() {
            return match node.kind() {
                // Already inside `declare module`
                "declare" => NodeAction::Skip,
                _ => NodeAction::Descend
            }
        }
        if self.is_private_or_internal(node) {
            return NodeAction::Skip
        }
        match node.kind() {
            "import_statement" if is_side_effect_import(node) => NodeAction::Skip,
            "string" => match node.parent().map(|parent| parent.kind()) {
                Some("import_require_clause") => self.rewrite_require(node),
                Some("import_statement" | "export_statement") => self.rewrite_specifier(node),
                _ => NodeAction::Descend
            },
            _ => NodeAction::Descend
        }
    }

    /// `import x = require("./y")`: join with the directory of this file's id
    fn rewrite_require(&self, node: TSNode<'_>) -> NodeAction {
        let specifier = unquote(self.file.node_text(node));
        if !specifier.starts_with('.') {
            return NodeAction::Descend
        }
        let target = join(dirname(&self.location.id), &specifier);
        NodeAction::Replace(format!("'{}'", target))
    }

    /// `import ... from "./x"` and `export ... from "../x"`
    fn rewrite_specifier(&self, node: TSNode<'_>) -> NodeAction {
        let specifier = unquote(self.file.node_text(node));
        if !specifier.starts_with('.') {
            return NodeAction::Descend
        }

        let id = if specifier[1..].starts_with('.') {
            let target = resolve(&self.file_dir, &specifier);
            match self.table.get(&target) {
                Some(id) => id.to_string(),
                // Not visited yet: best effort
                None => format!("{}/{}", self.location.base_name, specifier.get(3..).unwrap_or(""))
            }
        } else {
            let sibling = specifier.get(2..).unwrap_or("");
            if specifier[1..].starts_with('/') && self.layout.main_basename() == Some(sibling) {
                self.layout.module_name().unwrap_or_default().to_string()
            } else {
                format!("{}/{}", self.location.parent_dir, sibling)
            }
        };
        NodeAction::Replace(format!("\"{}\"", id))
    }

    /// Private class members, and anything documented `@internal` or `@private` (including the
    /// doc comment itself)
    fn is_private_or_internal(&self, node: TSNode<'_>) -> bool {
        if node.kind() == "comment" {
            return self.is_internal_doc(node) && node.next_named_sibling()
                .map_or(false, |next| next.kind() != "comment")
        }
        if node.prev_named_sibling().map_or(false, |previous| previous.kind() == "comment" && self.is_internal_doc(previous)) {
            return true
        }
        node.parent().map_or(false, |parent| parent.kind() == "class_body") && self.has_private_modifier(node)
    }

    fn is_internal_doc(&self, comment: TSNode<'_>) -> bool {
        let text = self.file.node_text(comment);
        text.starts_with("/**") && INTERNAL_TAGS.iter().any(|tag| text.contains(tag))
    }

    fn has_private_modifier(&self, member: TSNode<'_>) -> bool {
        let mut cursor = member.walk();
        // Bound so the iterator is dropped before `cursor`
        let has_private = member.children(&mut cursor)
            .any(|child| child.kind() == "accessibility_modifier" && self.file.node_text(child) == "private");
        has_private
    }
}

/// `import "./polyfill"` binds nothing, so it has no place in a declaration
fn is_side_effect_import(import: TSNode<'_>) -> bool {
    let mut cursor = import.walk();
    let binds_names = import.children(&mut cursor)
        .any(|child| matches!(child.kind(), "import_clause" | "import_require_clause"));
    !binds_names
}

fn unquote(literal: &str) -> String {
    enquote::unquote(literal).unwrap_or_else(|_| literal.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string())
}

/// Indent every line break followed by more text, drop `;`, and re-indent from the compiler's
/// four spaces to [INDENT]
fn format_body(body: &str) -> String {
    let mut formatted = String::with_capacity(body.len() + body.len() / 8);
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        formatted.push(c);
        if c == '\n' && chars.peek().map_or(false, |next| *next != '\n') {
            formatted.push_str(INDENT);
        }
    }
    let formatted = formatted.replace(';', "");
    if INDENT != SOURCE_INDENT {
        formatted.replace(SOURCE_INDENT, INDENT)
    } else {
        formatted
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use crate::ast::DeclarationFile;
    use crate::declaration::{ModuleIdTable, ModuleLayout};
    use super::{format_body, rewrite_declaration};

    fn layout() -> ModuleLayout {
        ModuleLayout::new("/proj/dir", "dir").with_module_name("pkg")
    }

    fn rewrite(layout: &ModuleLayout, table: &mut ModuleIdTable, file_name: &str, text: &str) -> String {
        let file = DeclarationFile::parse(file_name, text).unwrap();
        rewrite_declaration(&file, layout, table).unwrap()
    }

    #[test]
    fn wraps_in_declare_module_and_rewrites_siblings() {
        let mut table = ModuleIdTable::new();
        let rendered = rewrite(
            &layout(),
            &mut table,
            "/proj/dir/file.d.ts",
            "export declare function foo(): void;\nexport * from \"./sibling\";\n"
        );
        assert_eq!(
            rendered,
            "declare module \"pkg/dir/file\" {\n  export function foo(): void\n  export * from \"pkg/dir/sibling\"\n}\n\n"
        );
        assert_eq!(table.get("/proj/dir/file"), Some("pkg/dir/file"));
    }

    #[test]
    fn sibling_in_a_subdirectory_keeps_the_subdirectory() {
        let mut table = ModuleIdTable::new();
        let rendered = rewrite(
            &layout(),
            &mut table,
            "/proj/dir/sub/file.d.ts",
            "import { A } from './a';\nexport declare const b: A;\n"
        );
        assert!(rendered.starts_with("declare module \"pkg/dir/sub/file\" {\n"));
        assert!(rendered.contains("import { A } from \"pkg/dir/sub/a\""), "{}", rendered);
    }

    #[test]
    fn parent_specifier_uses_the_table_when_the_target_was_visited() {
        let layout = layout();
        let mut table = ModuleIdTable::new();
        rewrite(&layout, &mut table, "/proj/dir/other/mod.d.ts", "export declare class X {\n}\n");
        let rendered = rewrite(
            &layout,
            &mut table,
            "/proj/dir/a/b/file.d.ts",
            "export { X } from \"../../other/mod\";\n"
        );
        assert!(rendered.contains("export { X } from \"pkg/dir/other/mod\""), "{}", rendered);
    }

    #[test]
    fn parent_specifier_falls_back_when_the_target_was_not_visited() {
        let layout = layout();
        let mut table = ModuleIdTable::new();
        let rendered = rewrite(
            &layout,
            &mut table,
            "/proj/dir/a/b/file.d.ts",
            "export { X } from \"../../other/mod\";\n"
        );
        assert!(rendered.contains("export { X } from \"pkg/dir/../other/mod\""), "{}", rendered);
    }

    #[test]
    fn require_references_are_joined_with_the_id_directory() {
        let mut table = ModuleIdTable::new();
        let rendered = rewrite(
            &layout(),
            &mut table,
            "/proj/dir/sub/file.d.ts",
            "import foo = require(\"./foo\");\nimport up = require(\"../up\");\nimport fs = require(\"fs\");\nexport = foo;\n"
        );
        assert!(rendered.contains("import foo = require('pkg/dir/sub/foo')"), "{}", rendered);
        assert!(rendered.contains("import up = require('pkg/dir/up')"), "{}", rendered);
        assert!(rendered.contains("import fs = require(\"fs\")"), "{}", rendered);
    }

    #[test]
    fn main_file_and_references_to_it_collapse_to_the_module_name() {
        let layout = layout().with_main_file(Some("dir/api.js"));
        let mut table = ModuleIdTable::new();
        let main = rewrite(&layout, &mut table, "/proj/dir/api.d.ts", "export declare const version: string;\n");
        assert!(main.starts_with("declare module \"pkg\" {"), "{}", main);

        let other = rewrite(&layout, &mut table, "/proj/dir/util.d.ts", "export { version } from \"./api\";\n");
        assert!(other.contains("export { version } from \"pkg\""), "{}", other);
    }

    #[test]
    fn bare_specifiers_are_kept() {
        let mut table = ModuleIdTable::new();
        let rendered = rewrite(
            &layout(),
            &mut table,
            "/proj/dir/file.d.ts",
            "import { EventEmitter } from \"events\";\nexport declare class E extends EventEmitter {\n}\n"
        );
        assert!(rendered.contains("import { EventEmitter } from \"events\""), "{}", rendered);
        assert!(rendered.contains("export class E extends EventEmitter {"), "{}", rendered);
    }

    #[test]
    fn drops_private_members_internal_declarations_and_side_effect_imports() {
        let mut table = ModuleIdTable::new();
        let rendered = rewrite(
            &layout(),
            &mut table,
            "/proj/dir/file.d.ts",
            concat!(
                "import \"./polyfill\";\n",
                "/** @internal */\n",
                "export declare function hidden(): void;\n",
                "/** Shown to everyone */\n",
                "export declare function shown(): void;\n",
                "export declare class Foo {\n",
                "    private secret;\n",
                "    visible: number;\n",
                "}\n",
            )
        );
        assert!(!rendered.contains("polyfill"), "{}", rendered);
        assert!(!rendered.contains("hidden"), "{}", rendered);
        assert!(!rendered.contains("@internal"), "{}", rendered);
        assert!(!rendered.contains("secret"), "{}", rendered);
        assert!(rendered.contains("/** Shown to everyone */"), "{}", rendered);
        assert!(rendered.contains("export function shown(): void"), "{}", rendered);
        assert!(rendered.contains("visible: number"), "{}", rendered);
        assert!(!rendered.contains(';'), "{}", rendered);
    }

    #[test]
    fn empty_file_is_not_emitted() {
        let mut table = ModuleIdTable::new();
        let file = DeclarationFile::parse("/proj/dir/empty.d.ts", "").unwrap();
        assert!(rewrite_declaration(&file, &layout(), &mut table).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn body_formatting() {
        assert_eq!(format_body("a;\nb;\n\nc;\n"), "a\n  b\n\n  c\n");
        assert_eq!(format_body("x {\n    y;\n}"), "x {\n    y\n  }");
    }
}
