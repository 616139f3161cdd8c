//! Code-generation contract: per-target file listings.
//!
//! Content emission is out of scope; given a validated grammar, this
//! module answers "which artifacts would generation produce" for each
//! supported runtime target.

use gramspect_core::reports::{CodegenReport, GeneratedFile, GrammarKind};

/// Supported runtime target labels.
pub const TARGETS: &[&str] = &[
    "java",
    "python",
    "javascript",
    "typescript",
    "cpp",
    "csharp",
    "go",
];

/// Produces the artifact listing for one target, or `None` for an
/// unsupported target label.
pub fn generate(name: &str, kind: GrammarKind, target: &str) -> Option<CodegenReport> {
    let extension = match target {
        "java" => "java",
        "python" => "py",
        "javascript" => "js",
        "typescript" => "ts",
        "cpp" => "cpp",
        "csharp" => "cs",
        "go" => "go",
        _ => return None,
    };

    let mut files = Vec::new();
    let mut push = |stem: String, role: &str| {
        let file_name = if target == "go" {
            format!("{}_{}.{extension}", name.to_lowercase(), role.to_lowercase())
        } else {
            format!("{stem}.{extension}")
        };
        files.push(GeneratedFile {
            name: file_name,
            role: role.to_owned(),
        });
    };

    if kind != GrammarKind::ParserOnly {
        push(format!("{name}Lexer"), "lexer");
    }
    if kind != GrammarKind::LexerOnly {
        push(format!("{name}Parser"), "parser");
        push(format!("{name}Listener"), "listener");
        push(format!("{name}Visitor"), "visitor");
        if target == "java" || target == "csharp" || target == "cpp" {
            push(format!("{name}BaseListener"), "base-listener");
            push(format!("{name}BaseVisitor"), "base-visitor");
        }
    }
    if target == "cpp" {
        // Headers accompany every C++ source file.
        let headers: Vec<GeneratedFile> = files
            .iter()
            .map(|f| GeneratedFile {
                name: f.name.replace(".cpp", ".h"),
                role: format!("{}-header", f.role),
            })
            .collect();
        files.extend(headers);
    }
    files.push(GeneratedFile {
        name: format!("{name}.tokens"),
        role: "token-map".to_owned(),
    });

    Some(CodegenReport {
        target: target.to_owned(),
        files,
    })
}
